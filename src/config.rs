//! Configuration module.
//!
//! This module defines the command-line interface (CLI) for the converter using `clap`.
//! It handles the input image, the output path and the container options.

use clap::Parser;
use std::path::PathBuf;

/// Extension given to the container when no output path is supplied.
pub const DEFAULT_EXTENSION: &str = "cdc";

/// Converts a Teak DSP ELF image into a DSP1 firmware container.
///
/// With `--addr2line` or `--line2addr` the image's `.debug_line` section is
/// queried instead and nothing is written.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Input ELF image
    pub input: PathBuf,

    /// Output file (defaults to the input path with a .cdc extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Set the sync-load flag in the container header
    #[arg(short, long)]
    pub sync_load: bool,

    /// Print the source location of an address
    #[arg(long, value_name = "ADDR", value_parser = parse_u32_with_hex)]
    pub addr2line: Option<u32>,

    /// Print the address of a source location
    #[arg(long, value_name = "FILE:LINE", value_parser = parse_location)]
    pub line2addr: Option<(String, u32)>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}

impl Config {
    /// The container path: `-o` if given, otherwise the input with its
    /// extension replaced.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension(DEFAULT_EXTENSION))
    }

    /// Whether a debug-line query replaces the conversion.
    pub fn is_query(&self) -> bool {
        self.addr2line.is_some() || self.line2addr.is_some()
    }
}

fn parse_u32_with_hex(input: &str) -> Result<u32, String> {
    let s = input.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex value '{input}': {e}"))
    } else {
        s.parse::<u32>()
            .map_err(|e| format!("invalid decimal value '{input}': {e}"))
    }
}

fn parse_location(input: &str) -> Result<(String, u32), String> {
    let (file, line) = input
        .rsplit_once(':')
        .ok_or_else(|| format!("expected FILE:LINE, got '{input}'"))?;
    if file.is_empty() {
        return Err(format!("missing file name in '{input}'"));
    }
    let line = line
        .parse::<u32>()
        .map_err(|e| format!("invalid line number in '{input}': {e}"))?;
    Ok((file.to_string(), line))
}
