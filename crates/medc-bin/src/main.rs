/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Command line front-end for the medc codec
//!
//! Three subcommands: `encode` turns a raw image into a frame,
//! `decode` turns a frame back into a raw image and `metrics` scores
//! a reconstruction against its reference.

use std::error::Error;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ArgMatches;
use log::{error, info, LevelFilter};
use medc_codec::{MedcDecoder, MedcEncoder};
use medc_core::options::EncoderOptions;
use simple_logger::SimpleLogger;

mod cmd_args;
mod metrics;
mod raw;

fn main() {
    let matches = cmd_args::create_cmd_args().get_matches();

    let level = match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("could not set up logging: {e}");
    }

    let result = match matches.subcommand() {
        Some(("encode", args)) => encode_command(args),
        Some(("decode", args)) => decode_command(args),
        Some(("metrics", args)) => metrics_command(args),
        _ => unreachable!("a subcommand is required")
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn path_of(args: &ArgMatches, name: &str) -> PathBuf {
    // required args, clap has already rejected their absence
    args.get_one::<OsString>(name)
        .map(PathBuf::from)
        .unwrap_or_default()
}

fn encode_command(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = path_of(args, "in");
    let output = path_of(args, "out");

    let width = usize::from(*args.get_one::<u16>("width").unwrap_or(&0));
    let height = usize::from(*args.get_one::<u16>("height").unwrap_or(&0));
    let bit_depth = *args.get_one::<u8>("bit-depth").unwrap_or(&16);
    let quality = *args.get_one::<u8>("quality").unwrap_or(&75);
    let block_size = *args.get_one::<u8>("block-size").unwrap_or(&8);

    let pixels = raw::read_raw_u16(&input, width, height)?;
    info!("read {}, {width}x{height}, {bit_depth} bits", input.display());

    let options = EncoderOptions::new(width, height, bit_depth)
        .set_quality(quality)
        .set_block_size(block_size);

    let frame = MedcEncoder::new(&pixels, options).encode()?;
    fs::write(&output, &frame)?;

    let original_bytes = width * height * 2;
    let report = metrics::rate(frame.len(), width, height, Some(original_bytes));

    println!("Encoding complete");
    println!("  original size:   {original_bytes} bytes");
    println!("  compressed size: {} bytes", report.compressed_bytes);
    if let Some(ratio) = report.compression_ratio {
        println!("  ratio:           {ratio:.2}:1");
    }
    println!("  bits per pixel:  {:.3}", report.bits_per_pixel);
    println!("  output:          {}", output.display());

    Ok(())
}

fn decode_command(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = path_of(args, "in");
    let output = path_of(args, "out");

    let frame = fs::read(&input)?;

    let mut decoder = MedcDecoder::new(&frame);
    let pixels = decoder.decode()?;

    // headers are decoded by now
    let (width, height) = decoder.dimensions().unwrap_or((0, 0));
    info!(
        "decoded {}, {width}x{height}, {:?} bits",
        input.display(),
        decoder.bit_depth()
    );

    raw::write_raw_u16(&output, &pixels)?;

    println!("Decoding complete");
    println!("  dimensions: {width}x{height}");
    println!("  output:     {}", output.display());

    Ok(())
}

fn metrics_command(args: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let original_path = path_of(args, "original");
    let reconstructed_path = path_of(args, "reconstructed");

    let width = usize::from(*args.get_one::<u16>("width").unwrap_or(&0));
    let height = usize::from(*args.get_one::<u16>("height").unwrap_or(&0));
    let bit_depth = *args.get_one::<u8>("bit-depth").unwrap_or(&16);

    let original = raw::read_raw_u16(&original_path, width, height)?;
    let reconstructed = raw::read_raw_u16(&reconstructed_path, width, height)?;

    let distortion = metrics::distortion(&original, &reconstructed, bit_depth);

    let rate = match args.get_one::<OsString>("frame") {
        Some(frame_path) => {
            let frame_bytes = fs::metadata(Path::new(frame_path))?.len() as usize;
            Some(metrics::rate(
                frame_bytes,
                width,
                height,
                Some(width * height * 2)
            ))
        }
        None => None
    };

    let report = metrics::MetricsReport { distortion, rate };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Distortion");
        println!("  MSE:  {:.4}", report.distortion.mse);
        println!("  RMSE: {:.4}", report.distortion.rmse);
        println!("  PSNR: {:.2} dB", report.distortion.psnr_db);
        if let Some(rate) = &report.rate {
            println!("Rate");
            println!("  compressed bytes: {}", rate.compressed_bytes);
            println!("  bits per pixel:   {:.3}", rate.bits_per_pixel);
            if let Some(ratio) = rate.compression_ratio {
                println!("  ratio:            {ratio:.2}:1");
            }
        }
    }

    Ok(())
}
