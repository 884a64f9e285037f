//! Entry point for the elf2dsp converter.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Map the input image and parse its sections.
//! 3. Either answer a `.debug_line` query or build the DSP1 container
//!    with the Teak backend (the only supported architecture).
//! 4. Write the container next to the input or to `-o`.
//!
//! Error handling is done via `anyhow`.

use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;
use std::fs::File;
use tracing_subscriber::EnvFilter;

use elf2dsp::arch::teak::Teak;
use elf2dsp::config::Config;
use elf2dsp::converter::Converter;
use elf2dsp::dwarf::DebugLine;
use elf2dsp::elf::{parse_object, ObjectFile};

fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log level {:?}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file = File::open(&config.input)
        .with_context(|| format!("failed to open {}", config.input.display()))?;
    let mmap = unsafe { Mmap::map(&file)? };
    let object = parse_object(&mmap)
        .with_context(|| format!("failed to parse {}", config.input.display()))?;

    if config.is_query() {
        return query(&config, &object);
    }

    let container = Converter::new(Teak)
        .sync_load(config.sync_load)
        .convert(&object);
    let bytes = container
        .serialize()
        .context("failed to build DSP1 container")?;

    let output = config.output_path();
    std::fs::write(&output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Wrote {} segment(s), {} bytes to {}",
        container.segments().len(),
        bytes.len(),
        output.display()
    );
    Ok(())
}

fn query(config: &Config, object: &ObjectFile) -> Result<()> {
    let section = object
        .section_by_name(".debug_line")
        .context("input has no .debug_line section")?;
    let debug_line = DebugLine::parse(section.data());

    if let Some(address) = config.addr2line {
        match debug_line
            .lookup_by_address(address)
            .context("failed to decode .debug_line")?
        {
            Some(location) => println!(
                "{:#x}: {}:{}:{}",
                address,
                location.path(),
                location.line,
                location.column
            ),
            None => println!("{address:#x}: ??"),
        }
    }

    if let Some((file, line)) = &config.line2addr {
        match debug_line
            .lookup_by_location(file, *line)
            .context("failed to decode .debug_line")?
        {
            Some(address) => println!("{file}:{line}: {address:#x}"),
            None => println!("{file}:{line}: ??"),
        }
    }

    Ok(())
}
