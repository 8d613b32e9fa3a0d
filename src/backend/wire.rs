// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! JSON bodies exchanged with a remote colorization server.
//!
//! Images travel as base64-encoded PNG. Points travel as `{x, y, color}`
//! objects; coordinates are read as signed so a misbehaving peer cannot
//! smuggle out-of-frame points past the bounds filter.

use crate::models::color_point::{ColorPoint, FramePointSet, Rgb};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

pub const COLORIZE_ENDPOINT: &str = "colorize/";
pub const EXTRAPOLATE_ENDPOINT: &str = "extrapolate_points/";
/// Spelling matches the deployed servers.
pub const AUTH_ENDPOINT: &str = "autentication_check/";

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid image: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: i64,
    pub y: i64,
    pub color: Rgb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorizeRequest {
    pub image: String,
    pub color_points: Vec<WirePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrapolateRequest {
    pub image_from: String,
    pub image_to: String,
    pub color_points: Vec<WirePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrapolateResponse {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub color_points: Vec<WirePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageBody {
    image: String,
}

pub fn encode_png(image: &RgbImage) -> Result<String, WireError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(STANDARD.encode(bytes))
}

/// Decode any image format `image` understands, not only PNG.
pub fn decode_image(encoded: &str) -> Result<RgbImage, WireError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(image::load_from_memory(&bytes)?.to_rgb8())
}

/// The colorize reply is either the bare base64 body or `{"image": ...}`.
pub fn parse_colorize_response(body: &str) -> Result<RgbImage, WireError> {
    let body = body.trim();
    if body.starts_with('{') {
        let parsed: ImageBody = serde_json::from_str(body)?;
        return decode_image(&parsed.image);
    }
    if body.starts_with('"') {
        let unquoted: String = serde_json::from_str(body)?;
        return decode_image(&unquoted);
    }
    decode_image(body)
}

pub fn points_to_wire(points: &FramePointSet) -> Vec<WirePoint> {
    points
        .iter()
        .map(|p| WirePoint {
            x: p.x as i64,
            y: p.y as i64,
            color: p.color,
        })
        .collect()
}

/// Points that fall inside a `width x height` frame; the rest are dropped.
pub fn points_from_wire(points: &[WirePoint], width: u32, height: u32) -> FramePointSet {
    points
        .iter()
        .filter_map(|p| ColorPoint::checked(p.x, p.y, p.color, width, height))
        .collect()
}
