// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for media, project files and exported sequences.

pub mod cache;
pub mod export;
pub mod media;
pub mod serialization;
