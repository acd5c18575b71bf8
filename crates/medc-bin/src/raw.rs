/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Raw image adapter
//!
//! Pixels travel as row-major little-endian `u16` samples with no
//! header, dimensions come from the command line. This is the common
//! interchange format the original evaluation tooling used.

use std::fs;
use std::io;
use std::path::Path;

/// Read a raw image, validating the file length against the declared
/// dimensions
pub fn read_raw_u16(path: &Path, width: usize, height: usize) -> io::Result<Vec<u16>> {
    let bytes = fs::read(path)?;
    let expected = width * height * 2;

    if bytes.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} holds {} bytes, {width}x{height} u16 samples need {expected}",
                path.display(),
                bytes.len()
            )
        ));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Write pixels as raw little-endian `u16` samples
pub fn write_raw_u16(path: &Path, pixels: &[u16]) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(pixels.len() * 2);
    for pixel in pixels {
        bytes.extend_from_slice(&pixel.to_le_bytes());
    }
    fs::write(path, bytes)
}
