//! ELF to DSP1 conversion library.
//!
//! This library provides the core components for the `elf2dsp` tool.
//! It is organized into several modules:
//! - `cursor`: Little-endian reader/writer with LEB128 support.
//! - `elf`, `symbol`: ELF32 section and symbol table model.
//! - `dsp1`, `layout`, `writer`: The checksummed DSP1 firmware container.
//! - `dwarf`: `.debug_line` decoding and address/source lookups.
//! - `arch`: Architecture-specific address mapping.
//! - `converter`: Turning an ELF image into a container.
//! - `config`: CLI configuration.
//!
//! Everything except `config` works on in-memory buffers only.

pub mod arch;
pub mod config;
pub mod converter;
pub mod cursor;
pub mod dsp1;
pub mod dwarf;
pub mod elf;
pub mod error;
pub mod layout;
pub mod symbol;
pub mod writer;

pub use error::{FormatError, Result};
