/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Rate and distortion metrics
//!
//! Distortion compares a reconstruction against its reference, rate
//! describes the compressed frame alone. Neither affects bitstream
//! compatibility, they exist so quality sweeps can be scored.

use serde::Serialize;

/// Pixel-level error between a reference and its reconstruction
#[derive(Debug, Serialize)]
pub struct DistortionMetrics {
    pub mse:     f64,
    pub rmse:    f64,
    /// `20·log10(max / rmse)`, infinite for identical images
    pub psnr_db: f64
}

/// Size figures for one compressed frame
#[derive(Debug, Serialize)]
pub struct RateMetrics {
    pub compressed_bytes: usize,
    pub bits_per_pixel:   f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>
}

/// Full report the metrics command emits
#[derive(Debug, Serialize)]
pub struct MetricsReport {
    pub distortion: DistortionMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateMetrics>
}

/// Compare two images sample by sample
///
/// Both buffers must have the same length, the caller sizes them from
/// the same width and height arguments.
pub fn distortion(original: &[u16], reconstructed: &[u16], bit_depth: u8) -> DistortionMetrics {
    let mse = original
        .iter()
        .zip(reconstructed)
        .map(|(a, b)| {
            let diff = f64::from(*a) - f64::from(*b);
            diff * diff
        })
        .sum::<f64>()
        / original.len() as f64;

    let rmse = mse.sqrt();
    let max_value = f64::from((1_u32 << bit_depth) - 1);

    let psnr_db = if mse == 0.0 {
        f64::INFINITY
    } else {
        20.0 * (max_value / rmse).log10()
    };

    DistortionMetrics { mse, rmse, psnr_db }
}

/// Rate figures for a frame of `compressed_bytes` covering a
/// `width` by `height` image
pub fn rate(
    compressed_bytes: usize, width: usize, height: usize, original_bytes: Option<usize>
) -> RateMetrics {
    let num_pixels = (width * height) as f64;

    RateMetrics {
        compressed_bytes,
        bits_per_pixel: (compressed_bytes * 8) as f64 / num_pixels,
        compression_ratio: original_bytes.map(|original| original as f64 / compressed_bytes as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::{distortion, rate};

    #[test]
    fn identical_images_have_infinite_psnr() {
        let image = [500_u16; 100];
        let report = distortion(&image, &image, 16);

        assert_eq!(report.mse, 0.0);
        assert!(report.psnr_db.is_infinite());
    }

    #[test]
    fn uniform_error_matches_hand_computation() {
        let original = [10_u16; 4];
        let reconstructed = [12_u16; 4];

        let report = distortion(&original, &reconstructed, 8);
        assert_eq!(report.mse, 4.0);
        assert_eq!(report.rmse, 2.0);
        // 20 * log10(255 / 2)
        assert!((report.psnr_db - 42.110).abs() < 1e-3);
    }

    #[test]
    fn rate_figures() {
        let report = rate(1024, 64, 64, Some(8192));

        assert_eq!(report.compressed_bytes, 1024);
        assert_eq!(report.bits_per_pixel, 2.0);
        assert_eq!(report.compression_ratio, Some(8.0));
    }
}
