// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: hints, frames and the project that ties them together.

pub mod color_point;
pub mod frame;
pub mod project;
