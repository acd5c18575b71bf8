/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Scalar quantization of transform coefficients
//!
//! The quantization matrix is derived from a single quality knob in
//! `1..=100`, the transform block size and the sample bit depth. The
//! derivation is part of the frame contract, the encoder stores the
//! resulting matrix verbatim in the frame so decoders never re-derive
//! it.

/// The canonical JPEG style luminance table for 8x8 blocks
///
/// Entries are row major, the derivation scales them by quality and
/// bit depth before clipping into `1..=65535`.
#[rustfmt::skip]
const BASE_TABLE_8X8: [u16; 64] = [
    16, 11, 10, 16,  24,  40,  51,  61,
    12, 12, 14, 19,  26,  58,  60,  55,
    14, 13, 16, 24,  40,  57,  69,  56,
    14, 17, 22, 29,  51,  87,  80,  62,
    18, 22, 37, 56,  68, 109, 103,  77,
    24, 35, 55, 64,  81, 104, 113,  92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103,  99
];

/// Resample the 8x8 base table onto a `block_size` square grid
///
/// Bilinear interpolation over the base entries, with the corner
/// samples pinned so an 8x8 request reproduces the table exactly.
fn base_table(block_size: usize) -> Vec<f64> {
    if block_size == 8 {
        return BASE_TABLE_8X8.iter().map(|v| f64::from(*v)).collect();
    }

    let n = block_size;
    let mut table = vec![0.0_f64; n * n];

    for i in 0..n {
        for j in 0..n {
            // map the target cell onto base coordinates in [0, 7]
            let (y, x) = if n == 1 {
                (0.0, 0.0)
            } else {
                (
                    i as f64 * 7.0 / (n - 1) as f64,
                    j as f64 * 7.0 / (n - 1) as f64
                )
            };

            let y0 = y.floor() as usize;
            let x0 = x.floor() as usize;
            let y1 = (y0 + 1).min(7);
            let x1 = (x0 + 1).min(7);

            let fy = y - y0 as f64;
            let fx = x - x0 as f64;

            let top = f64::from(BASE_TABLE_8X8[y0 * 8 + x0]) * (1.0 - fx)
                + f64::from(BASE_TABLE_8X8[y0 * 8 + x1]) * fx;
            let bottom = f64::from(BASE_TABLE_8X8[y1 * 8 + x0]) * (1.0 - fx)
                + f64::from(BASE_TABLE_8X8[y1 * 8 + x1]) * fx;

            table[i * n + j] = top * (1.0 - fy) + bottom * fy;
        }
    }

    table
}

/// Derive the quantization matrix for `(quality, block_size, bit_depth)`
///
/// Entry by entry:
///
/// `Q[i,j] = clip(⌊(base[i,j] · scale · bit_scale + 50) / 100⌋, 1, 65535)`
///
/// where `scale` is `5000 / quality` below quality 50 and
/// `200 − 2·quality` from 50 up, and `bit_scale = 2^bit_depth / 256`
/// widens the steps for deeper samples.
///
/// At quality 100 the scale reaches zero and every entry clips up to 1,
/// which leaves a minimum distortion floor even at maximum quality.
pub(crate) fn quant_matrix(quality: u8, block_size: u8, bit_depth: u8) -> Vec<u16> {
    let base = base_table(usize::from(block_size));

    let bit_scale = f64::from(1_u32 << bit_depth) / 256.0;
    let scale = if quality < 50 {
        5000.0 / f64::from(quality)
    } else {
        f64::from(200 - 2 * u16::from(quality))
    };

    base.iter()
        .map(|entry| {
            let value = ((entry * scale * bit_scale + 50.0) / 100.0).floor();
            value.clamp(1.0, 65535.0) as u16
        })
        .collect()
}

/// Quantize transform coefficients element-wise
///
/// Rounds half away from zero, the rule only matters on the encode
/// side since decoders multiply back without rounding. Values beyond
/// the `i16` range saturate.
#[inline]
pub(crate) fn quantize(coeffs: &[f64], matrix: &[u16], out: &mut [i16]) {
    for ((coeff, step), slot) in coeffs.iter().zip(matrix).zip(out.iter_mut()) {
        *slot = (coeff / f64::from(*step)).round() as i16;
    }
}

/// Multiply quantized levels back to coefficient magnitudes
///
/// Promoted to `i32`, the product of an `i16` level and a `u16` step
/// does not fit 16 bits.
#[inline]
pub(crate) fn dequantize(levels: &[i16], matrix: &[u16], out: &mut [i32]) {
    for ((level, step), slot) in levels.iter().zip(matrix).zip(out.iter_mut()) {
        *slot = i32::from(*level) * i32::from(*step);
    }
}

#[cfg(test)]
mod tests {
    use super::{dequantize, quant_matrix, quantize, BASE_TABLE_8X8};

    #[test]
    fn quality_50_at_8_bits_is_the_base_table() {
        // scale = 100 and bit_scale = 1, the derivation becomes
        // floor((base * 100 + 50) / 100) = base
        let matrix = quant_matrix(50, 8, 8);
        assert_eq!(&matrix[..], &BASE_TABLE_8X8[..]);
    }

    #[test]
    fn quality_100_clips_up_to_one() {
        let matrix = quant_matrix(100, 8, 16);
        assert!(matrix.iter().all(|v| *v == 1));
    }

    #[test]
    fn bit_scale_widens_steps() {
        let eight = quant_matrix(75, 8, 8);
        let sixteen = quant_matrix(75, 8, 16);

        // 2^16 / 256 = 256 times coarser, up to the +50 floor bias
        for (narrow, wide) in eight.iter().zip(&sixteen) {
            assert!(wide >= narrow);
        }
        assert_eq!(u32::from(sixteen[0]), 16 * 50 * 256 / 100);
    }

    #[test]
    fn lower_quality_is_coarser() {
        let q30 = quant_matrix(30, 8, 12);
        let q90 = quant_matrix(90, 8, 12);

        for (coarse, fine) in q30.iter().zip(&q90) {
            assert!(coarse >= fine);
        }
    }

    #[test]
    fn resampled_table_spans_base_range() {
        for block_size in [2_u8, 4, 16, 32] {
            let matrix = quant_matrix(50, block_size, 8);
            let area = usize::from(block_size) * usize::from(block_size);

            assert_eq!(matrix.len(), area);
            // corners of the base table survive resampling
            assert_eq!(matrix[0], 16);
            assert_eq!(matrix[area - 1], 99);
        }
    }

    #[test]
    fn quantize_rounds_and_dequantize_scales_back() {
        let matrix = [10_u16, 10, 10, 10];
        let coeffs = [24.9_f64, 25.0, -25.0, -4.9];
        let mut levels = [0_i16; 4];

        quantize(&coeffs, &matrix, &mut levels);
        assert_eq!(levels, [2, 3, -3, 0]);

        let mut restored = [0_i32; 4];
        dequantize(&levels, &matrix, &mut restored);
        assert_eq!(restored, [20, 30, -30, 0]);
    }
}
