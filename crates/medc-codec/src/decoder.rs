/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The frame decoder
//!
//! Parses the container, restores the Huffman code, runs the inverse
//! pipeline and crops the padded canvas back to the declared
//! dimensions. Every parse step that underruns its section or finds
//! disagreeing sizes fails fast, no partial image is ever returned.

use log::{trace, warn};
use medc_core::bytestream::ByteReader;
use medc_core::options::DecoderOptions;

use crate::bitstream::BitReader;
use crate::constants::{
    MAX_BIT_DEPTH, MAX_QUALITY, MEDC_MAGIC, MEDC_VERSION, MIN_BIT_DEPTH, MIN_BLOCK_SIZE,
    MIN_QUALITY
};
use crate::dct::Dct2D;
use crate::errors::MedcDecodeErrors;
use crate::huffman::{deserialize_code_table, HuffmanTree};
use crate::quantizer::dequantize;
use crate::zigzag::{scan_order, unflatten};

/// The medc frame decoder
///
/// The decoder is initialized with the frame bytes, either
/// [`decode_headers`] parses the fixed header and quantization matrix
/// or [`decode`] runs the whole pipeline and returns pixels.
///
/// Width, height, bit depth and quality are accessible once headers
/// are decoded.
///
/// [`decode_headers`]: MedcDecoder::decode_headers
/// [`decode`]: MedcDecoder::decode
pub struct MedcDecoder<'a> {
    stream:          ByteReader<'a>,
    options:         DecoderOptions,
    width:           usize,
    height:          usize,
    bit_depth:       u8,
    block_size:      u8,
    quality:         u8,
    quant_matrix:    Vec<u16>,
    decoded_headers: bool
}

impl<'a> MedcDecoder<'a> {
    /// Create a new decoder with the default options
    ///
    /// # Arguments
    /// - `data`: The frame bytes
    pub fn new(data: &'a [u8]) -> MedcDecoder<'a> {
        MedcDecoder::new_with_options(data, DecoderOptions::default())
    }

    /// Create a new decoder that obeys specified restrictions
    ///
    /// E.g. can be used to set width and height limits to prevent OOM
    /// attacks from hostile frames
    pub fn new_with_options(data: &'a [u8], options: DecoderOptions) -> MedcDecoder<'a> {
        MedcDecoder {
            stream: ByteReader::new(data),
            options,
            width: 0,
            height: 0,
            bit_depth: 0,
            block_size: 0,
            quality: 0,
            quant_matrix: Vec::new(),
            decoded_headers: false
        }
    }

    /// Parse the fixed header and the quantization matrix section
    ///
    /// # Returns
    /// - On success: Nothing, image properties become accessible
    /// - On error: Why the frame cannot be decoded
    pub fn decode_headers(&mut self) -> Result<(), MedcDecodeErrors> {
        let magic = self.stream.read_fixed_bytes::<4>()?;
        if magic != MEDC_MAGIC {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "wrong magic bytes {magic:?}, expected `MEDC` as frame start"
            )));
        }

        let version = self.stream.read_u8()?;
        if version != MEDC_VERSION {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "unsupported version {version}, this crate understands version {MEDC_VERSION}"
            )));
        }

        let width = usize::from(self.stream.read_u16_be()?);
        let height = usize::from(self.stream.read_u16_be()?);

        if width == 0 || height == 0 {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "impossible dimensions {width}x{height}"
            )));
        }
        if width > self.options.max_width() {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "width {width} greater than max configured width {}",
                self.options.max_width()
            )));
        }
        if height > self.options.max_height() {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "height {height} greater than max configured height {}",
                self.options.max_height()
            )));
        }

        let bit_depth = self.stream.read_u8()?;
        if !(MIN_BIT_DEPTH..=MAX_BIT_DEPTH).contains(&bit_depth) {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "bit depth {bit_depth} outside {MIN_BIT_DEPTH}..={MAX_BIT_DEPTH}"
            )));
        }

        let block_size = self.stream.read_u8()?;
        if block_size < MIN_BLOCK_SIZE {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "block size {block_size} below the minimum of {MIN_BLOCK_SIZE}"
            )));
        }

        // informational only, the quantization matrix travels in full
        let quality = self.stream.read_u8()?;
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            warn!("quality field {quality} outside 1..=100, continuing");
        }

        let quant_len = usize::from(self.stream.read_u16_be()?);
        let expected = usize::from(block_size) * usize::from(block_size);
        if quant_len != expected {
            return Err(MedcDecodeErrors::DimensionMismatch(expected, quant_len));
        }

        let mut quant_matrix = Vec::with_capacity(quant_len);
        for _ in 0..quant_len {
            let entry = self.stream.read_u16_be()?;
            if entry == 0 {
                return Err(MedcDecodeErrors::MalformedFrame(
                    "zero quantization entry".to_string()
                ));
            }
            quant_matrix.push(entry);
        }

        self.width = width;
        self.height = height;
        self.bit_depth = bit_depth;
        self.block_size = block_size;
        self.quality = quality;
        self.quant_matrix = quant_matrix;
        self.decoded_headers = true;

        trace!("Image width: {}", self.width);
        trace!("Image height: {}", self.height);
        trace!("Image bit depth: {}", self.bit_depth);
        trace!("Block size: {}", self.block_size);

        Ok(())
    }

    /// Decode the frame returning the reconstructed pixels
    ///
    /// Pixels come back row-major, cropped to the declared dimensions
    /// and clipped to `[0, 2^bit_depth - 1]` in a `u16` container
    /// regardless of the declared depth.
    ///
    /// # Returns
    /// - On success: The decoded pixels
    /// - On error: An instance of [`MedcDecodeErrors`] naming the kind
    ///   of corruption encountered
    pub fn decode(&mut self) -> Result<Vec<u16>, MedcDecodeErrors> {
        if !self.decoded_headers {
            self.decode_headers()?;
        }

        let huff_len = usize::from(self.stream.read_u16_be()?);
        let table_section = self.stream.read_slice(huff_len)?;

        let mut table_reader = ByteReader::new(table_section);
        let codes = deserialize_code_table(&mut table_reader)?;

        if table_reader.remaining() != 0 {
            if self.options.strict_mode() {
                return Err(MedcDecodeErrors::MalformedFrame(format!(
                    "{} trailing bytes after the huffman table",
                    table_reader.remaining()
                )));
            }
            warn!(
                "{} trailing bytes after the huffman table, ignoring",
                table_reader.remaining()
            );
        }

        let num_bits = self.stream.read_u32_be()? as usize;
        let payload_len = self.stream.read_u32_be()? as usize;

        if payload_len != num_bits.div_ceil(8) {
            return Err(MedcDecodeErrors::MalformedFrame(format!(
                "payload of {payload_len} bytes cannot hold {num_bits} bits"
            )));
        }

        let payload = self.stream.read_slice(payload_len)?;

        let block_size = usize::from(self.block_size);
        let area = block_size * block_size;

        let blocks_x = self.width.div_ceil(block_size);
        let blocks_y = self.height.div_ceil(block_size);
        let num_blocks = blocks_x * blocks_y;
        let num_coeffs = num_blocks * area;

        trace!("Number of blocks: {num_blocks}");

        let tree = HuffmanTree::from_codes(&codes)?;
        let mut bits = BitReader::new(payload, num_bits);
        let symbols = tree.decode_stream(&mut bits, num_coeffs)?;

        let padded_width = blocks_x * block_size;
        let padded_height = blocks_y * block_size;

        let dct = Dct2D::new(block_size);
        let order = scan_order(block_size);

        let mut canvas = vec![0.0_f64; padded_width * padded_height];

        let mut levels = vec![0_i16; area];
        let mut restored = vec![0_i32; area];
        let mut coeffs = vec![0.0_f64; area];
        let mut block = vec![0.0_f64; area];

        for (index, vector) in symbols.chunks_exact(area).enumerate() {
            let block_y = index / blocks_x;
            let block_x = index % blocks_x;

            unflatten(vector, &order, &mut levels);
            dequantize(&levels, &self.quant_matrix, &mut restored);

            for (slot, value) in coeffs.iter_mut().zip(&restored) {
                *slot = f64::from(*value);
            }

            dct.inverse(&coeffs, &mut block);

            let origin = block_y * block_size * padded_width + block_x * block_size;
            for row in 0..block_size {
                let start = origin + row * padded_width;
                canvas[start..start + block_size]
                    .copy_from_slice(&block[row * block_size..(row + 1) * block_size]);
            }
        }

        // crop away the padding and clip into the sample range,
        // fractional parts truncate toward zero
        let max_value = f64::from((1_u32 << self.bit_depth) - 1);
        let mut pixels = Vec::with_capacity(self.width * self.height);

        for y in 0..self.height {
            let row = &canvas[y * padded_width..y * padded_width + self.width];
            pixels.extend(row.iter().map(|v| v.clamp(0.0, max_value) as u16));
        }

        trace!("Finished decoding frame");

        Ok(pixels)
    }

    /// Return the width and height of the image
    ///
    /// Or `None` if the headers have not been decoded
    pub const fn dimensions(&self) -> Option<(usize, usize)> {
        if self.decoded_headers {
            return Some((self.width, self.height));
        }
        None
    }

    /// Declared bits per sample, or `None` before header decoding
    pub const fn bit_depth(&self) -> Option<u8> {
        if self.decoded_headers {
            return Some(self.bit_depth);
        }
        None
    }

    /// Transform block size used by the frame
    pub const fn block_size(&self) -> Option<u8> {
        if self.decoded_headers {
            return Some(self.block_size);
        }
        None
    }

    /// The quality knob the encoder was run with, informational
    pub const fn quality(&self) -> Option<u8> {
        if self.decoded_headers {
            return Some(self.quality);
        }
        None
    }

    /// Quantization matrix carried by the frame, row-major
    pub fn quant_matrix(&self) -> Option<&[u16]> {
        if self.decoded_headers {
            return Some(&self.quant_matrix);
        }
        None
    }

    /// Number of pixels a decoded frame will hold
    pub const fn output_buffer_size(&self) -> Option<usize> {
        if self.decoded_headers {
            return Some(self.width * self.height);
        }
        None
    }
}
