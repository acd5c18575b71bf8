/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The frame encoder
//!
//! Runs the full pipeline over one image: edge padding, block DCT,
//! quantization, zig-zag flattening, Huffman coding and finally the
//! framed container. Frames are built once, fully, and immutable once
//! emitted.

use log::trace;
use medc_core::bytestream::ByteWriter;
use medc_core::options::EncoderOptions;

use crate::bitstream::BitWriter;
use crate::constants::{
    MAX_BIT_DEPTH, MAX_DIMENSION, MAX_QUALITY, MEDC_MAGIC, MEDC_VERSION, MIN_BIT_DEPTH,
    MIN_BLOCK_SIZE, MIN_QUALITY
};
use crate::dct::Dct2D;
use crate::errors::MedcEncodeErrors;
use crate::huffman::{build_code_table, encode_stream, histogram, serialize_code_table};
use crate::quantizer::{quant_matrix, quantize};
use crate::zigzag::{flatten, scan_order};

/// Replicate the last row and column of `pixels` until both dimensions
/// are multiples of `block_size`
///
/// Edge extension keeps smooth images smooth across the padded
/// boundary, zero fill would put a DC step right at the image edge.
fn pad_to_blocks(
    pixels: &[u16], width: usize, height: usize, block_size: usize
) -> (Vec<u16>, usize, usize) {
    let padded_width = width.div_ceil(block_size) * block_size;
    let padded_height = height.div_ceil(block_size) * block_size;

    if padded_width == width && padded_height == height {
        return (pixels.to_vec(), padded_width, padded_height);
    }

    let mut padded = vec![0_u16; padded_width * padded_height];

    for y in 0..padded_height {
        let source_y = y.min(height - 1);
        let source_row = &pixels[source_y * width..(source_y + 1) * width];
        let dest_row = &mut padded[y * padded_width..y * padded_width + width];

        dest_row.copy_from_slice(source_row);

        let last = source_row[width - 1];
        padded[y * padded_width + width..(y + 1) * padded_width].fill(last);
    }

    (padded, padded_width, padded_height)
}

/// The medc frame encoder
///
/// # Example
/// - Encode an 8x8 gradient at quality 50
///
/// ```
/// use medc_codec::MedcEncoder;
/// use medc_core::options::EncoderOptions;
///
/// let pixels: Vec<u16> = (0..64).map(|i| 16 * (i / 8) + (i % 8)).collect();
/// let options = EncoderOptions::new(8, 8, 8).set_quality(50);
///
/// let frame = MedcEncoder::new(&pixels, options).encode().unwrap();
/// assert_eq!(&frame[..4], b"MEDC");
/// ```
pub struct MedcEncoder<'a> {
    pixels:  &'a [u16],
    options: EncoderOptions
}

impl<'a> MedcEncoder<'a> {
    /// Create a new encoder over a row-major pixel buffer
    ///
    /// # Arguments
    /// - `pixels`: Row-major samples, length must equal
    ///   `options.width() * options.height()`
    /// - `options`: Image dimensions, bit depth, quality and block size
    pub const fn new(pixels: &'a [u16], options: EncoderOptions) -> MedcEncoder<'a> {
        MedcEncoder { pixels, options }
    }

    /// Validate every argument before touching a single pixel
    fn sanity_check(&self) -> Result<(), MedcEncodeErrors> {
        let options = &self.options;

        if !(MIN_QUALITY..=MAX_QUALITY).contains(&options.quality()) {
            return Err(MedcEncodeErrors::ArgumentOutOfRange(
                "quality",
                usize::from(options.quality()),
                usize::from(MIN_QUALITY),
                usize::from(MAX_QUALITY)
            ));
        }
        if options.block_size() < MIN_BLOCK_SIZE {
            return Err(MedcEncodeErrors::ArgumentOutOfRange(
                "block size",
                usize::from(options.block_size()),
                usize::from(MIN_BLOCK_SIZE),
                usize::from(u8::MAX)
            ));
        }
        if !(MIN_BIT_DEPTH..=MAX_BIT_DEPTH).contains(&options.bit_depth()) {
            return Err(MedcEncodeErrors::ArgumentOutOfRange(
                "bit depth",
                usize::from(options.bit_depth()),
                usize::from(MIN_BIT_DEPTH),
                usize::from(MAX_BIT_DEPTH)
            ));
        }
        if options.width() == 0 || options.width() > MAX_DIMENSION {
            return Err(MedcEncodeErrors::ArgumentOutOfRange(
                "width",
                options.width(),
                1,
                MAX_DIMENSION
            ));
        }
        if options.height() == 0 || options.height() > MAX_DIMENSION {
            return Err(MedcEncodeErrors::ArgumentOutOfRange(
                "height",
                options.height(),
                1,
                MAX_DIMENSION
            ));
        }

        let expected = options.width() * options.height();
        if self.pixels.len() != expected {
            return Err(MedcEncodeErrors::LengthMismatch(expected, self.pixels.len()));
        }

        let max_value = ((1_u32 << options.bit_depth()) - 1) as u16;
        if let Some(out_of_range) = self.pixels.iter().find(|p| **p > max_value) {
            return Err(MedcEncodeErrors::ArgumentOutOfRange(
                "pixel value",
                usize::from(*out_of_range),
                0,
                usize::from(max_value)
            ));
        }

        Ok(())
    }

    /// Encode the image returning the frame bytes
    ///
    /// # Returns
    /// - `Ok(Vec<u8>)`: A self-describing frame, decodable without any
    ///   out-of-band metadata
    /// - An error if any argument is out of range, nothing is emitted
    ///   on error paths
    pub fn encode(&self) -> Result<Vec<u8>, MedcEncodeErrors> {
        self.sanity_check()?;

        let options = &self.options;
        let width = options.width();
        let height = options.height();
        let block_size = usize::from(options.block_size());

        let (padded, padded_width, padded_height) =
            pad_to_blocks(self.pixels, width, height, block_size);

        trace!("Image width: {width}");
        trace!("Image height: {height}");
        trace!("Padded to: {padded_width}x{padded_height}");

        let matrix = quant_matrix(options.quality(), options.block_size(), options.bit_depth());

        let dct = Dct2D::new(block_size);
        let order = scan_order(block_size);

        let blocks_x = padded_width / block_size;
        let blocks_y = padded_height / block_size;
        let area = block_size * block_size;

        let mut stream = Vec::with_capacity(padded_width * padded_height);

        let mut block = vec![0.0_f64; area];
        let mut coeffs = vec![0.0_f64; area];
        let mut levels = vec![0_i16; area];
        let mut flat = vec![0_i16; area];

        // blocks walk in raster order, the decoder relies on it
        for block_y in 0..blocks_y {
            for block_x in 0..blocks_x {
                let origin = block_y * block_size * padded_width + block_x * block_size;

                for row in 0..block_size {
                    let start = origin + row * padded_width;
                    for (slot, pixel) in block[row * block_size..(row + 1) * block_size]
                        .iter_mut()
                        .zip(&padded[start..start + block_size])
                    {
                        *slot = f64::from(*pixel);
                    }
                }

                dct.forward(&block, &mut coeffs);
                quantize(&coeffs, &matrix, &mut levels);
                flatten(&levels, &order, &mut flat);

                stream.extend_from_slice(&flat);
            }
        }

        trace!("Coefficient stream length: {}", stream.len());

        let frequencies = histogram(&stream);
        let table = build_code_table(&frequencies)?;

        trace!("Alphabet size: {}", table.len());

        let mut bits = BitWriter::new();
        encode_stream(&stream, &table, &mut bits)?;

        let num_bits = bits.bits_written();
        if num_bits > u64::from(u32::MAX) {
            return Err(MedcEncodeErrors::TooLargeOutput("payload"));
        }
        let payload = bits.into_bytes();

        let table_bytes = serialize_code_table(&table)?;
        if table_bytes.len() > usize::from(u16::MAX) {
            return Err(MedcEncodeErrors::TooLargeOutput("huffman table"));
        }

        let mut writer =
            ByteWriter::with_capacity(14 + 2 * matrix.len() + table_bytes.len() + payload.len() + 8);

        writer.write_all(&MEDC_MAGIC);
        writer.write_u8(MEDC_VERSION);
        writer.write_u16_be(width as u16);
        writer.write_u16_be(height as u16);
        writer.write_u8(options.bit_depth());
        writer.write_u8(options.block_size());
        writer.write_u8(options.quality());

        writer.write_u16_be(matrix.len() as u16);
        for entry in &matrix {
            writer.write_u16_be(*entry);
        }

        writer.write_u16_be(table_bytes.len() as u16);
        writer.write_all(&table_bytes);

        writer.write_u32_be(num_bits as u32);
        writer.write_u32_be(payload.len() as u32);
        writer.write_all(&payload);

        trace!("Frame size: {} bytes", writer.bytes_written());

        Ok(writer.into_inner())
    }
}
