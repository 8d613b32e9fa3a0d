// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! ChromaHint colorizes grayscale video from sparse color hints.
//!
//! Hints placed on one frame are carried to the next with pyramidal
//! Lucas-Kanade tracking, and each frame is colorized either by a locally
//! loaded network or by a remote server speaking the same JSON protocol
//! that [`backend::handler`] serves.

pub mod app;
pub mod backend;
pub mod colorize;
pub mod config;
pub mod io;
pub mod models;
pub mod tracking;
pub mod ui;
pub mod util;
