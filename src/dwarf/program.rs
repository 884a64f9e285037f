//! Line number program state machine.
//!
//! Executes the opcode stream of one program and collects every row it
//! emits. The machine state is a [`LineRow`] value that is copied out on
//! each emission and reset after each end of sequence.

use super::header::{FileEntry, LineProgramHeader};
use crate::cursor::Reader;
use crate::error::Result;

const DW_LNS_EXTENDED: u8 = 0;
const DW_LNS_COPY: u8 = 1;
const DW_LNS_ADVANCE_PC: u8 = 2;
const DW_LNS_ADVANCE_LINE: u8 = 3;
const DW_LNS_SET_FILE: u8 = 4;
const DW_LNS_SET_COLUMN: u8 = 5;
const DW_LNS_NEGATE_STMT: u8 = 6;
const DW_LNS_SET_BASIC_BLOCK: u8 = 7;
const DW_LNS_CONST_ADD_PC: u8 = 8;
const DW_LNS_FIXED_ADVANCE_PC: u8 = 9;

const DW_LNE_END_SEQUENCE: u8 = 1;
const DW_LNE_SET_ADDRESS: u8 = 2;
const DW_LNE_DEFINE_FILE: u8 = 3;

/// One row of the line number matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRow {
    pub address: u32,
    /// 1-based index into the file table.
    pub file: u64,
    pub line: u32,
    pub column: u64,
    pub is_stmt: bool,
    pub basic_block: bool,
    /// Set on the row that closes a sequence; its address is one past the
    /// last instruction.
    pub end_sequence: bool,
}

impl LineRow {
    /// Register values at the start of every sequence.
    pub fn initial(default_is_stmt: bool) -> Self {
        Self {
            address: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: default_is_stmt,
            basic_block: false,
            end_sequence: false,
        }
    }

    fn advance_address(&mut self, operation_advance: u64, header: &LineProgramHeader) {
        let max_ops = u64::from(header.maximum_operations_per_instruction.max(1));
        let delta = operation_advance / max_ops * u64::from(header.minimum_instruction_length);
        self.address = self.address.wrapping_add(delta as u32);
    }

    fn advance_line(&mut self, delta: i64) {
        self.line = i64::from(self.line).wrapping_add(delta) as u32;
    }
}

/// Runs the opcodes from the reader's position to its end.
///
/// `DW_LNE_define_file` appends to `files`. Unknown extended opcodes are
/// skipped by their declared length.
pub(crate) fn run(
    reader: &mut Reader<'_>,
    header: &LineProgramHeader,
    files: &mut Vec<FileEntry>,
) -> Result<Vec<LineRow>> {
    let mut rows = Vec::new();
    let mut state = LineRow::initial(header.default_is_stmt);

    while !reader.is_eof() {
        let opcode = reader.read_u8()?;

        if opcode >= header.opcode_base {
            let adjusted = opcode - header.opcode_base;
            state.advance_address(u64::from(adjusted / header.line_range), header);
            state.advance_line(i64::from(header.line_base) + i64::from(adjusted % header.line_range));
            rows.push(state);
            state.basic_block = false;
            continue;
        }

        match opcode {
            DW_LNS_EXTENDED => {
                // An unrepresentable length can never fit the buffer.
                let length = usize::try_from(reader.read_uleb128()?).unwrap_or(usize::MAX);
                if length == 0 {
                    continue;
                }
                let sub_opcode = reader.read_u8()?;
                let operands = length - 1;
                match sub_opcode {
                    DW_LNE_END_SEQUENCE => {
                        state.end_sequence = true;
                        rows.push(state);
                        state = LineRow::initial(header.default_is_stmt);
                        reader.skip(operands)?;
                    }
                    DW_LNE_SET_ADDRESS => {
                        let bytes = reader.read_bytes(operands)?;
                        let mut address = [0u8; 4];
                        let len = bytes.len().min(4);
                        address[..len].copy_from_slice(&bytes[..len]);
                        state.address = u32::from_le_bytes(address);
                    }
                    DW_LNE_DEFINE_FILE => {
                        let operand_bytes = reader.read_bytes(operands)?;
                        files.push(FileEntry::read(&mut Reader::new(operand_bytes))?);
                    }
                    other => {
                        tracing::debug!("skipping extended opcode {other:#x} ({operands} bytes)");
                        reader.skip(operands)?;
                    }
                }
            }
            DW_LNS_COPY => {
                rows.push(state);
                state.basic_block = false;
            }
            DW_LNS_ADVANCE_PC => {
                let advance = reader.read_uleb128()?;
                state.advance_address(advance, header);
            }
            DW_LNS_ADVANCE_LINE => {
                let delta = reader.read_sleb128()?;
                state.advance_line(delta);
            }
            DW_LNS_SET_FILE => state.file = reader.read_uleb128()?,
            DW_LNS_SET_COLUMN => state.column = reader.read_uleb128()?,
            DW_LNS_NEGATE_STMT => state.is_stmt = !state.is_stmt,
            DW_LNS_SET_BASIC_BLOCK => state.basic_block = true,
            DW_LNS_CONST_ADD_PC => {
                let adjusted = 255 - header.opcode_base;
                state.advance_address(u64::from(adjusted / header.line_range), header);
            }
            DW_LNS_FIXED_ADVANCE_PC => {
                let advance = reader.read_u16()?;
                state.address = state.address.wrapping_add(u32::from(advance));
            }
            _ => {
                for _ in 0..header.standard_opcode_length(opcode) {
                    reader.read_uleb128()?;
                }
            }
        }
    }

    Ok(rows)
}
