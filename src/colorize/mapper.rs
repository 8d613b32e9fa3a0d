// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate mapping between frame pixels and network input pixels.
//!
//! The network always runs on a fixed square, so each axis is scaled on
//! its own and the source aspect ratio is not preserved.

/// Map a frame pixel into network space, truncating toward zero.
pub fn to_network_space(point: (u32, u32), original: (u32, u32), network: u32) -> (u32, u32) {
    (
        scale_axis(point.0, original.0, network),
        scale_axis(point.1, original.1, network),
    )
}

/// Map a network pixel back into frame space, truncating toward zero.
pub fn to_frame_space(point: (u32, u32), original: (u32, u32), network: u32) -> (u32, u32) {
    (
        scale_axis(point.0, network, original.0),
        scale_axis(point.1, network, original.1),
    )
}

/// Half-width, in network pixels, of the square drawn around each hint.
pub fn hint_half_width(original: (u32, u32), network: u32) -> u32 {
    original.0.max(original.1) / network.max(1)
}

fn scale_axis(v: u32, from: u32, to: u32) -> u32 {
    if from == 0 {
        return 0;
    }
    (v as u64 * to as u64 / from as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_sizes_match() {
        assert_eq!(to_network_space((100, 100), (256, 256), 256), (100, 100));
        assert_eq!(hint_half_width((256, 256), 256), 1);
    }

    #[test]
    fn test_non_square_scales_each_axis() {
        assert_eq!(to_network_space((512, 384), (1024, 768), 256), (128, 128));
        assert_eq!(to_network_space((1023, 767), (1024, 768), 256), (255, 255));
        assert_eq!(hint_half_width((1024, 768), 256), 4);
    }

    #[test]
    fn test_small_frames_have_zero_half_width() {
        assert_eq!(hint_half_width((200, 120), 256), 0);
    }

    #[test]
    fn test_roundtrip_within_scale_step() {
        for &(w, h, net) in &[(1024u32, 768u32, 256u32), (640, 480, 256), (300, 300, 300)] {
            // One network pixel covers ceil(w / net) frame pixels.
            let step_x = (w + net - 1) / net;
            let step_y = (h + net - 1) / net;
            for x in (0..w).step_by(37) {
                for y in (0..h).step_by(29) {
                    let mapped = to_network_space((x, y), (w, h), net);
                    assert!(mapped.0 < net && mapped.1 < net);
                    let (bx, by) = to_frame_space(mapped, (w, h), net);
                    assert!(x >= bx && x - bx <= step_x, "x {} -> {}", x, bx);
                    assert!(y >= by && y - by <= step_y, "y {} -> {}", y, by);
                }
            }
        }
    }

    #[test]
    fn test_roundtrip_exact_at_equal_resolution() {
        for x in [0u32, 1, 100, 255] {
            let mapped = to_network_space((x, 255 - x), (256, 256), 256);
            assert_eq!(to_frame_space(mapped, (256, 256), 256), (x, 255 - x));
        }
    }
}
