/*
 * Copyright (c) 2024.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::ffi::OsString;

use clap::{value_parser, Arg, ArgAction, Command};

pub fn create_cmd_args() -> Command {
    Command::new("medc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lossy compression for single channel high bit depth medical images")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Raise the log level, repeat for more detail")
                .action(ArgAction::Count)
                .global(true)
        )
        .subcommand(
            Command::new("encode")
                .about("Compress a raw little-endian u16 image into a medc frame")
                .arg(input_arg("Raw image to read pixels from"))
                .arg(output_arg("File the frame is written to"))
                .arg(width_arg())
                .arg(height_arg())
                .arg(bit_depth_arg())
                .arg(
                    Arg::new("quality")
                        .short('q')
                        .long("quality")
                        .help("Quality knob, 1-100, higher is finer")
                        .default_value("75")
                        .value_parser(value_parser!(u8).range(1..=100))
                )
                .arg(
                    Arg::new("block-size")
                        .long("block-size")
                        .help("Transform block size")
                        .default_value("8")
                        .value_parser(value_parser!(u8).range(2..))
                )
        )
        .subcommand(
            Command::new("decode")
                .about("Decompress a medc frame back to a raw little-endian u16 image")
                .arg(input_arg("Frame to decode"))
                .arg(output_arg("File the raw pixels are written to"))
        )
        .subcommand(
            Command::new("metrics")
                .about("Rate and distortion figures between two raw images")
                .arg(
                    Arg::new("original")
                        .long("original")
                        .help("Raw image used as the reference")
                        .value_parser(value_parser!(OsString))
                        .required(true)
                )
                .arg(
                    Arg::new("reconstructed")
                        .long("reconstructed")
                        .help("Raw image to score against the reference")
                        .value_parser(value_parser!(OsString))
                        .required(true)
                )
                .arg(width_arg())
                .arg(height_arg())
                .arg(bit_depth_arg())
                .arg(
                    Arg::new("frame")
                        .long("frame")
                        .help("Compressed frame, adds rate figures to the report")
                        .value_parser(value_parser!(OsString))
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Emit the report as JSON on stdout")
                        .action(ArgAction::SetTrue)
                )
        )
}

fn input_arg(help: &'static str) -> Arg {
    Arg::new("in")
        .short('i')
        .long("input")
        .help(help)
        .value_parser(value_parser!(OsString))
        .required(true)
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("out")
        .short('o')
        .long("out")
        .help(help)
        .value_parser(value_parser!(OsString))
        .required(true)
}

fn width_arg() -> Arg {
    Arg::new("width")
        .long("width")
        .help("Image width in pixels")
        .value_parser(value_parser!(u16).range(1..))
        .required(true)
}

fn height_arg() -> Arg {
    Arg::new("height")
        .long("height")
        .help("Image height in pixels")
        .value_parser(value_parser!(u16).range(1..))
        .required(true)
}

fn bit_depth_arg() -> Arg {
    Arg::new("bit-depth")
        .long("bit-depth")
        .help("Significant bits per sample, 8-16")
        .default_value("16")
        .value_parser(value_parser!(u8).range(8..=16))
}
