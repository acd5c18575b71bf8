/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Error types surfaced by the encoder and decoder
//!
//! Decode failures carry the kind of corruption encountered, no error
//! ever carries partially reconstructed pixels. Encode failures are
//! argument validation, the encoder emits nothing on any error path.

use core::fmt::{Debug, Display, Formatter};

use medc_core::bytestream::ByteIoError;

/// Possible errors that may occur during decoding
pub enum MedcDecodeErrors {
    /// The frame container is structurally invalid
    ///
    /// Magic or version mismatch, a truncated section or length
    /// fields that disagree with each other
    MalformedFrame(String),
    /// The Huffman table or payload cannot be resolved to symbols
    ///
    /// An empty or contradictory code table, or payload bits that do
    /// not lead to a leaf within the declared bit budget
    InvalidCode(String),
    /// A declared size disagrees with the decoded content
    ///
    /// # Arguments
    /// - 1st argument is the number of entries expected
    /// - 2nd argument is the number of entries found
    DimensionMismatch(usize, usize)
}

impl Debug for MedcDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            MedcDecodeErrors::MalformedFrame(reason) => {
                writeln!(f, "Malformed frame: {reason}")
            }
            MedcDecodeErrors::InvalidCode(reason) => {
                writeln!(f, "Invalid Huffman code: {reason}")
            }
            MedcDecodeErrors::DimensionMismatch(expected, found) => {
                writeln!(
                    f,
                    "Dimension mismatch, expected {expected} entries but found {found}"
                )
            }
        }
    }
}

impl Display for MedcDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{self:?}")
    }
}

impl std::error::Error for MedcDecodeErrors {}

impl From<ByteIoError> for MedcDecodeErrors {
    fn from(value: ByteIoError) -> Self {
        MedcDecodeErrors::MalformedFrame(format!("truncated frame, {value:?}"))
    }
}

/// Errors encountered during encoding
pub enum MedcEncodeErrors {
    /// A codec parameter is outside its legal range
    ///
    /// # Arguments
    /// - parameter name
    /// - the offending value
    /// - the inclusive minimum
    /// - the inclusive maximum
    ArgumentOutOfRange(&'static str, usize, usize, usize),
    /// The pixel buffer does not match the declared dimensions
    ///
    /// # Arguments
    /// - 1st argument is the expected length
    /// - 2nd argument is the length actually given
    LengthMismatch(usize, usize),
    /// A frame section outgrew its length field
    TooLargeOutput(&'static str),
    /// Generic message
    Generic(&'static str)
}

impl Debug for MedcEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            MedcEncodeErrors::ArgumentOutOfRange(name, value, min, max) => {
                writeln!(f, "{name} is {value}, expected a value in {min}..={max}")
            }
            MedcEncodeErrors::LengthMismatch(expected, found) => {
                writeln!(
                    f,
                    "Expected a pixel buffer of length {expected} but found {found}"
                )
            }
            MedcEncodeErrors::TooLargeOutput(section) => {
                writeln!(f, "The {section} section outgrew its frame length field")
            }
            MedcEncodeErrors::Generic(msg) => {
                writeln!(f, "{msg}")
            }
        }
    }
}

impl Display for MedcEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{self:?}")
    }
}

impl std::error::Error for MedcEncodeErrors {}
