/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A lossy codec for single channel, high bit depth medical raster
//! images
//!
//! The pipeline is classical transform coding: edge padding, block
//! DCT, scalar quantization, zig-zag scanning, Huffman entropy coding
//! and a framed container. A single integer quality knob in `1..=100`
//! trades reconstruction fidelity for size, sample depths from 8 to
//! 16 bits are supported.
//!
//! Frames are self describing, everything a decoder needs, including
//! the quantization matrix and the full Huffman table, travels inside
//! the frame.
//!
//! # Usage
//! Add medc-codec to the dependencies in the project Cargo.toml
//!
//! ```toml
//! [dependencies]
//! medc-codec = "0.1"
//! ```
//!
//! # Examples
//!
//! ## Encode a 16 bit CT slice and decode it back
//! ```
//! use medc_codec::{MedcDecoder, MedcEncoder};
//! use medc_core::options::EncoderOptions;
//!
//! let pixels = vec![1024_u16; 512 * 512];
//! let options = EncoderOptions::new(512, 512, 16).set_quality(80);
//!
//! let frame = MedcEncoder::new(&pixels, options).encode().unwrap();
//!
//! let mut decoder = MedcDecoder::new(&frame);
//! let decoded = decoder.decode().unwrap();
//! assert_eq!(decoder.dimensions(), Some((512, 512)));
//! assert_eq!(decoded.len(), pixels.len());
//! ```
//!
//! ## Inspect a frame without decoding pixels
//! ```no_run
//! use medc_codec::MedcDecoder;
//!
//! let frame = std::fs::read("scan.medc").unwrap();
//! let mut decoder = MedcDecoder::new(&frame);
//! decoder.decode_headers().unwrap();
//!
//! let (width, height) = decoder.dimensions().unwrap();
//! println!("{width}x{height}, {:?} bits", decoder.bit_depth());
//! ```
#![warn(
    clippy::correctness,
    clippy::perf,
    clippy::missing_errors_doc,
    clippy::panic
)]
#![allow(
    clippy::needless_return,
    clippy::similar_names,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub use decoder::MedcDecoder;
pub use encoder::MedcEncoder;
pub use errors::{MedcDecodeErrors, MedcEncodeErrors};
pub use medc_core;

mod bitstream;
mod constants;
mod dct;
mod decoder;
mod encoder;
pub mod errors;
mod huffman;
mod quantizer;
mod zigzag;
