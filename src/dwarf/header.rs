//! Line program header and prologue tables.
//!
//! Covers the DWARF 2–4 layout: a fixed header, then the include directory
//! table and the file name table, both terminated by an empty entry.

use crate::cursor::Reader;
use crate::error::{FormatError, Result};

/// Offset of the first prologue byte, after `unit_length`, `version` and
/// `header_length`.
const PROLOGUE_START: usize = 4 + 2 + 4;

/// Fixed fields at the start of a line program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProgramHeader {
    /// Length of the program after this field.
    pub unit_length: u32,
    pub version: u16,
    /// Bytes between the end of this field and the first opcode.
    pub prologue_length: u32,
    pub minimum_instruction_length: u8,
    /// Present from version 4 on; 1 before that.
    pub maximum_operations_per_instruction: u8,
    pub default_is_stmt: bool,
    pub line_base: i8,
    pub line_range: u8,
    pub opcode_base: u8,
    /// Operand counts of standard opcodes `1..opcode_base`.
    pub standard_opcode_lengths: Vec<u8>,
}

impl LineProgramHeader {
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let unit_length = reader.read_u32()?;
        let version = reader.read_u16()?;
        if !(2..=4).contains(&version) {
            return Err(FormatError::UnsupportedLineVersion(version));
        }
        let prologue_length = reader.read_u32()?;
        let minimum_instruction_length = reader.read_u8()?;
        let maximum_operations_per_instruction = if version >= 4 {
            reader.read_u8()?
        } else {
            1
        };
        let default_is_stmt = reader.read_u8()? != 0;
        let line_base = reader.read_i8()?;
        let line_range = reader.read_u8()?;
        if line_range == 0 {
            return Err(FormatError::ZeroLineRange);
        }
        let opcode_base = reader.read_u8()?;
        let standard_opcode_lengths = reader
            .read_bytes(usize::from(opcode_base.saturating_sub(1)))?
            .to_vec();

        Ok(Self {
            unit_length,
            version,
            prologue_length,
            minimum_instruction_length,
            maximum_operations_per_instruction,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            standard_opcode_lengths,
        })
    }

    /// Total bytes of the program including the length field itself.
    pub fn total_length(&self) -> usize {
        4 + self.unit_length as usize
    }

    /// Offset of the first opcode from the start of the program.
    pub fn program_offset(&self) -> usize {
        PROLOGUE_START + self.prologue_length as usize
    }

    /// Operand count of a standard opcode, zero if the table omits it.
    pub fn standard_opcode_length(&self, opcode: u8) -> u8 {
        usize::from(opcode)
            .checked_sub(1)
            .and_then(|index| self.standard_opcode_lengths.get(index))
            .copied()
            .unwrap_or(0)
    }
}

/// An entry of the file name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// 1-based index into the directory table.
    pub directory_index: u64,
    pub modified: u64,
    pub size: u64,
}

impl FileEntry {
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            name: reader.read_cstr()?,
            directory_index: reader.read_uleb128()?,
            modified: reader.read_uleb128()?,
            size: reader.read_uleb128()?,
        })
    }
}

/// Reads include directories up to the empty terminating string.
pub(crate) fn read_directories(reader: &mut Reader<'_>) -> Result<Vec<String>> {
    let mut directories = Vec::new();
    loop {
        let directory = reader.read_cstr()?;
        if directory.is_empty() {
            return Ok(directories);
        }
        directories.push(directory);
    }
}

/// Reads file entries up to the terminating zero byte.
pub(crate) fn read_files(reader: &mut Reader<'_>) -> Result<Vec<FileEntry>> {
    let mut files = Vec::new();
    while reader.peek_u8()? != 0 {
        files.push(FileEntry::read(reader)?);
    }
    reader.skip(1)?;
    Ok(files)
}
