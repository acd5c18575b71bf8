/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Core routines shared by the medc family of crates
//!
//! This crate provides the plumbing shared by the medc
//! encoder, decoder and command line tools
//!
//! It currently contains
//!
//! - An endian aware in-memory bytestream reader and writer
//! - Encoder and decoder options shared by the codec
//!
//! This library is `#[no_std]` with the `alloc` feature needed for
//! defining `Vec` which we need for storing encoded bytes.
#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;
extern crate core;

pub mod bytestream;
pub mod options;
