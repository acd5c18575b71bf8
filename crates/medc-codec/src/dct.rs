/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Separable orthonormal 2-D DCT-II and its inverse
//!
//! The one dimensional transform matrix `C` satisfies `Cᵀ C = I`, row
//! zero is scaled by `√(1/N)` and every other row by `√(2/N)`. The two
//! dimensional transform applies `C` along columns and then rows, the
//! inverse applies `Cᵀ` in the same pattern, so a forward/inverse pair
//! reproduces the input up to floating point rounding.
//!
//! The basis is materialized once per block size, the per-block work is
//! two small matrix multiplies in `f64`.

use std::f64::consts::PI;

/// A 2-D DCT-II/IDCT-II engine for one block size
pub(crate) struct Dct2D {
    size:  usize,
    /// `size * size` row-major transform matrix, `basis[k][n]` is the
    /// weight of sample `n` in coefficient `k`
    basis: Vec<f64>
}

impl Dct2D {
    /// Build the orthonormal basis for `block_size` square blocks
    pub fn new(block_size: usize) -> Dct2D {
        let n = block_size;
        let mut basis = vec![0.0_f64; n * n];

        let dc_scale = (1.0 / n as f64).sqrt();
        let ac_scale = (2.0 / n as f64).sqrt();

        for k in 0..n {
            let scale = if k == 0 { dc_scale } else { ac_scale };

            for x in 0..n {
                let angle = ((2 * x + 1) as f64) * (k as f64) * PI / ((2 * n) as f64);
                basis[k * n + x] = scale * angle.cos();
            }
        }

        Dct2D { size: n, basis }
    }

    /// Forward transform, `coeffs = C · block · Cᵀ`
    ///
    /// Both slices are `size * size` row-major.
    pub fn forward(&self, block: &[f64], coeffs: &mut [f64]) {
        self.apply(block, coeffs, false);
    }

    /// Inverse transform, `block = Cᵀ · coeffs · C`
    pub fn inverse(&self, coeffs: &[f64], block: &mut [f64]) {
        self.apply(coeffs, block, true);
    }

    /// Shared separable pass, `transpose` selects `Cᵀ` instead of `C`
    fn apply(&self, input: &[f64], output: &mut [f64], transpose: bool) {
        let n = self.size;
        debug_assert_eq!(input.len(), n * n);
        debug_assert_eq!(output.len(), n * n);

        let weight = |k: usize, x: usize| {
            if transpose {
                self.basis[x * n + k]
            } else {
                self.basis[k * n + x]
            }
        };

        // column pass into the output buffer
        for k in 0..n {
            for j in 0..n {
                let mut acc = 0.0;
                for x in 0..n {
                    acc += weight(k, x) * input[x * n + j];
                }
                output[k * n + j] = acc;
            }
        }

        // row pass in place, one row of scratch
        let mut row = vec![0.0_f64; n];
        for i in 0..n {
            row.copy_from_slice(&output[i * n..(i + 1) * n]);
            for k in 0..n {
                let mut acc = 0.0;
                for x in 0..n {
                    acc += weight(k, x) * row[x];
                }
                output[i * n + k] = acc;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use nanorand::{Rng, WyRand};

    use super::Dct2D;

    #[test]
    fn constant_block_concentrates_in_dc() {
        let dct = Dct2D::new(8);
        let block = [100.0_f64; 64];
        let mut coeffs = [0.0_f64; 64];

        dct.forward(&block, &mut coeffs);

        // orthonormal DC gain over a constant block is exactly N
        assert!((coeffs[0] - 800.0).abs() < 1e-9);
        for value in &coeffs[1..] {
            assert!(value.abs() < 1e-9);
        }
    }

    #[test]
    fn inverse_recovers_random_blocks() {
        let mut rng = WyRand::new_seed(0x6D65_6463);

        for block_size in [2_usize, 4, 8, 13, 16] {
            let dct = Dct2D::new(block_size);
            let area = block_size * block_size;

            // unit scale keeps the absolute error at a few ULPs
            let block: Vec<f64> = (0..area)
                .map(|_| f64::from(rng.generate::<u16>()) / 65536.0)
                .collect();

            let mut coeffs = vec![0.0_f64; area];
            let mut rebuilt = vec![0.0_f64; area];

            dct.forward(&block, &mut coeffs);
            dct.inverse(&coeffs, &mut rebuilt);

            for (original, recovered) in block.iter().zip(&rebuilt) {
                assert!(
                    (original - recovered).abs() < 1e-9,
                    "{original} became {recovered} for block size {block_size}"
                );
            }
        }
    }

    #[test]
    fn transform_is_deterministic() {
        let dct = Dct2D::new(8);
        let block: Vec<f64> = (0..64).map(f64::from).collect();

        let mut first = [0.0_f64; 64];
        let mut second = [0.0_f64; 64];

        dct.forward(&block, &mut first);
        dct.forward(&block, &mut second);

        assert_eq!(first, second);
    }
}
