//! DWARF `.debug_line` decoding.
//!
//! A `.debug_line` section is a run of independent line programs. Each
//! program is decoded on demand, on every query, and queries stop at the
//! first program that answers:
//!
//! - by address: the row at exactly that address, otherwise the nearest
//!   row before it in the same sequence, at most [`MAX_ADDRESS_GAP`] away;
//! - by file and line: the row for exactly that line, otherwise the
//!   nearest row before it in the same file, at most [`MAX_LINE_GAP`]
//!   lines away.

pub mod header;
pub mod program;

pub use header::{FileEntry, LineProgramHeader};
use header::{read_directories, read_files};
pub use program::LineRow;

use crate::cursor::Reader;
use crate::error::{FormatError, Result};

/// Largest backward address distance accepted by an address lookup.
pub const MAX_ADDRESS_GAP: u32 = 0x20;
/// Largest backward line distance accepted by a location lookup.
pub const MAX_LINE_GAP: u32 = 8;

/// Source position found for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressLocation {
    /// Address of the row that matched.
    pub address: u32,
    pub directory: String,
    pub file: String,
    pub line: u32,
    pub column: u64,
}

impl AddressLocation {
    pub fn path(&self) -> String {
        join_path(&self.directory, &self.file)
    }
}

/// One decoded line program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProgram {
    header: LineProgramHeader,
    directories: Vec<String>,
    files: Vec<FileEntry>,
    rows: Vec<LineRow>,
}

impl LineProgram {
    /// Decodes the program at the start of `data`. Bytes past the
    /// program's declared length are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let unit_length = Reader::new(data).read_u32()?;
        let total = 4 + unit_length as usize;
        if total > data.len() {
            return Err(FormatError::OutOfBounds {
                offset: 0,
                len: total,
                size: data.len(),
            });
        }

        let mut reader = Reader::new(&data[..total]);
        let header = LineProgramHeader::read(&mut reader)?;
        let directories = read_directories(&mut reader)?;
        let mut files = read_files(&mut reader)?;

        let program_offset = header.program_offset();
        if reader.position() > program_offset {
            return Err(FormatError::PrologueOverrun {
                end: program_offset,
                tables_end: reader.position(),
            });
        }
        reader.seek(program_offset)?;
        let rows = program::run(&mut reader, &header, &mut files)?;

        Ok(Self {
            header,
            directories,
            files,
            rows,
        })
    }

    pub fn header(&self) -> &LineProgramHeader {
        &self.header
    }

    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn rows(&self) -> &[LineRow] {
        &self.rows
    }

    /// File entry for a 1-based file index.
    pub fn file(&self, index: u64) -> Result<&FileEntry> {
        one_based(&self.files, index).ok_or(FormatError::InvalidFileIndex(index))
    }

    /// Directory for a 1-based directory index.
    pub fn directory(&self, index: u64) -> Result<&str> {
        one_based(&self.directories, index)
            .map(String::as_str)
            .ok_or(FormatError::InvalidDirectoryIndex(index))
    }

    /// Looks up the source position of `address` in this program.
    ///
    /// # Errors
    /// Returns `FormatError` when the matching row names a file or
    /// directory that is not in the tables.
    pub fn lookup_by_address(&self, address: u32) -> Result<Option<AddressLocation>> {
        let Some(row) = self.row_for_address(address) else {
            return Ok(None);
        };
        let file = self.file(row.file)?;
        let directory = self.directory(file.directory_index)?;
        Ok(Some(AddressLocation {
            address: row.address,
            directory: directory.to_string(),
            file: file.name.clone(),
            line: row.line,
            column: row.column,
        }))
    }

    /// Looks up the address of `line` in `file` in this program.
    ///
    /// `file` matches either the bare file name or the directory-joined
    /// path.
    pub fn lookup_by_location(&self, file: &str, line: u32) -> Option<u32> {
        let in_file = |row: &LineRow| !row.end_sequence && self.file_matches(row.file, file);

        if let Some(row) = self.rows.iter().find(|row| in_file(*row) && row.line == line) {
            return Some(row.address);
        }

        self.rows
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .filter(|(prev, next)| {
                in_file(*prev)
                    && next.file == prev.file
                    && prev.line < line
                    && line < next.line
                    && line - prev.line < MAX_LINE_GAP
            })
            .min_by_key(|(prev, _)| line - prev.line)
            .map(|(prev, _)| prev.address)
    }

    fn row_for_address(&self, address: u32) -> Option<&LineRow> {
        if let Some(row) = self
            .rows
            .iter()
            .find(|row| !row.end_sequence && row.address == address)
        {
            return Some(row);
        }

        // A row that ends a sequence never starts a range.
        self.rows
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .filter(|(prev, next)| {
                !prev.end_sequence
                    && prev.address < address
                    && address < next.address
                    && address - prev.address < MAX_ADDRESS_GAP
            })
            .min_by_key(|(prev, _)| address - prev.address)
            .map(|(prev, _)| prev)
    }

    fn file_matches(&self, index: u64, query: &str) -> bool {
        let Ok(entry) = self.file(index) else {
            return false;
        };
        if entry.name == query {
            return true;
        }
        self.directory(entry.directory_index)
            .is_ok_and(|directory| join_path(directory, &entry.name) == query)
    }
}

/// A `.debug_line` section holding one or more concatenated programs.
#[derive(Debug, Clone, Copy)]
pub struct DebugLine<'a> {
    data: &'a [u8],
}

impl<'a> DebugLine<'a> {
    /// Wraps the section bytes. Programs are decoded lazily per query.
    pub fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn programs(&self) -> Programs<'a> {
        Programs {
            data: self.data,
            offset: 0,
            failed: false,
        }
    }

    /// Source position of `address`, from the first program that has one.
    pub fn lookup_by_address(&self, address: u32) -> Result<Option<AddressLocation>> {
        for program in self.programs() {
            if let Some(location) = program?.lookup_by_address(address)? {
                return Ok(Some(location));
            }
        }
        Ok(None)
    }

    /// Address of `line` in `file`, from the first program that has one.
    pub fn lookup_by_location(&self, file: &str, line: u32) -> Result<Option<u32>> {
        for program in self.programs() {
            if let Some(address) = program?.lookup_by_location(file, line) {
                return Ok(Some(address));
            }
        }
        Ok(None)
    }
}

/// Iterator over the programs of a [`DebugLine`]. Stops after the first
/// error.
#[derive(Debug, Clone)]
pub struct Programs<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for Programs<'_> {
    type Item = Result<LineProgram>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        match LineProgram::parse(&self.data[self.offset..]) {
            Ok(program) => {
                self.offset += program.header.total_length();
                Some(Ok(program))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn one_based<T>(items: &[T], index: u64) -> Option<&T> {
    let index = usize::try_from(index).ok()?.checked_sub(1)?;
    items.get(index)
}

fn join_path(directory: &str, file: &str) -> String {
    if directory.is_empty() || file.starts_with('/') {
        file.to_string()
    } else if directory.ends_with('/') || directory.ends_with('\\') {
        format!("{directory}{file}")
    } else {
        format!("{directory}/{file}")
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressLocation, DebugLine, LineProgram};
    use crate::cursor::Writer;
    use crate::error::FormatError;
    use pretty_assertions::assert_eq;

    const OPCODE_BASE: u8 = 13;
    const LINE_BASE: i8 = -5;
    const LINE_RANGE: u8 = 14;

    /// Builds one version 2 program with the given tables and opcode bytes.
    fn program(directories: &[&str], files: &[(&str, u64)], opcodes: &[u8]) -> Vec<u8> {
        let mut prologue = Writer::new();
        prologue.write_u8(1); // minimum_instruction_length
        prologue.write_u8(1); // default_is_stmt
        prologue.write_i8(LINE_BASE);
        prologue.write_u8(LINE_RANGE);
        prologue.write_u8(OPCODE_BASE);
        prologue.write_bytes(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        for directory in directories {
            prologue.write_cstr(directory);
        }
        prologue.write_u8(0);
        for (name, directory) in files {
            prologue.write_cstr(name);
            prologue.write_uleb128(*directory);
            prologue.write_uleb128(0);
            prologue.write_uleb128(0);
        }
        prologue.write_u8(0);
        let prologue = prologue.into_inner();

        let mut w = Writer::new();
        w.write_u32((2 + 4 + prologue.len() + opcodes.len()) as u32);
        w.write_u16(2);
        w.write_u32(prologue.len() as u32);
        w.write_bytes(&prologue);
        w.write_bytes(opcodes);
        w.into_inner()
    }

    fn set_address(w: &mut Writer, address: u32) {
        w.write_u8(0);
        w.write_uleb128(5);
        w.write_u8(2);
        w.write_u32(address);
    }

    fn advance_pc(w: &mut Writer, delta: u64) {
        w.write_u8(2);
        w.write_uleb128(delta);
    }

    fn advance_line(w: &mut Writer, delta: i64) {
        w.write_u8(3);
        w.write_sleb128(delta);
    }

    fn end_sequence(w: &mut Writer) {
        w.write_u8(0);
        w.write_uleb128(1);
        w.write_u8(1);
    }

    /// Rows (0x100, line 10), (0x110, line 12), end of sequence at 0x120.
    fn single_sequence(file_index: u64) -> Vec<u8> {
        let mut w = Writer::new();
        if file_index != 1 {
            w.write_u8(4);
            w.write_uleb128(file_index);
        }
        set_address(&mut w, 0x100);
        advance_line(&mut w, 9);
        w.write_u8(1);
        advance_pc(&mut w, 0x10);
        advance_line(&mut w, 2);
        w.write_u8(1);
        advance_pc(&mut w, 0x10);
        end_sequence(&mut w);
        w.into_inner()
    }

    fn sample() -> Vec<u8> {
        program(&["/src"], &[("fileA.c", 1)], &single_sequence(1))
    }

    #[test]
    fn decodes_tables_and_rows() {
        let program = LineProgram::parse(&sample()).expect("sample decodes");
        assert_eq!(program.directories(), &["/src".to_string()]);
        assert_eq!(program.files()[0].name, "fileA.c");
        let rows: Vec<(u32, u32, bool)> = program
            .rows()
            .iter()
            .map(|row| (row.address, row.line, row.end_sequence))
            .collect();
        assert_eq!(
            rows,
            vec![(0x100, 10, false), (0x110, 12, false), (0x120, 12, true)]
        );
    }

    #[test]
    fn address_lookup_exact_and_nearest() {
        let data = sample();
        let debug_line = DebugLine::parse(&data);

        let exact = debug_line.lookup_by_address(0x110).expect("decodes");
        assert_eq!(exact.map(|l| l.line), Some(12));

        let nearest = debug_line.lookup_by_address(0x108).expect("decodes");
        assert_eq!(
            nearest,
            Some(AddressLocation {
                address: 0x100,
                directory: "/src".to_string(),
                file: "fileA.c".to_string(),
                line: 10,
                column: 0,
            })
        );
        assert_eq!(nearest.map(|l| l.path()).as_deref(), Some("/src/fileA.c"));
    }

    #[test]
    fn address_lookup_respects_gap_and_sequence_end() {
        let data = sample();
        let debug_line = DebugLine::parse(&data);
        assert_eq!(debug_line.lookup_by_address(0x200), Ok(None));
        assert_eq!(debug_line.lookup_by_address(0x0f0), Ok(None));
        // The end-of-sequence row is not an instruction.
        assert_eq!(debug_line.lookup_by_address(0x120), Ok(None));
    }

    #[test]
    fn address_lookup_gap_is_bounded() {
        let mut w = Writer::new();
        set_address(&mut w, 0x100);
        w.write_u8(1);
        advance_pc(&mut w, 0x40);
        w.write_u8(1);
        end_sequence(&mut w);
        let data = program(&["/src"], &[("a.c", 1)], &w.into_inner());
        let debug_line = DebugLine::parse(&data);
        assert_eq!(
            debug_line.lookup_by_address(0x11f).expect("decodes").map(|l| l.address),
            Some(0x100)
        );
        assert_eq!(debug_line.lookup_by_address(0x120), Ok(None));
    }

    #[test]
    fn location_lookup_exact_and_nearest() {
        let data = sample();
        let debug_line = DebugLine::parse(&data);
        assert_eq!(debug_line.lookup_by_location("fileA.c", 12), Ok(Some(0x110)));
        assert_eq!(debug_line.lookup_by_location("fileA.c", 11), Ok(Some(0x100)));
        assert_eq!(debug_line.lookup_by_location("/src/fileA.c", 11), Ok(Some(0x100)));
        assert_eq!(debug_line.lookup_by_location("other.c", 11), Ok(None));
        assert_eq!(debug_line.lookup_by_location("fileA.c", 40), Ok(None));
    }

    #[test]
    fn location_lookup_gap_is_bounded() {
        let mut w = Writer::new();
        set_address(&mut w, 0x100);
        w.write_u8(1);
        advance_pc(&mut w, 4);
        advance_line(&mut w, 20);
        w.write_u8(1);
        end_sequence(&mut w);
        let data = program(&["/src"], &[("a.c", 1)], &w.into_inner());
        let debug_line = DebugLine::parse(&data);
        assert_eq!(debug_line.lookup_by_location("a.c", 8), Ok(Some(0x100)));
        assert_eq!(debug_line.lookup_by_location("a.c", 9), Ok(None));
    }

    #[test]
    fn queries_walk_concatenated_programs() {
        let mut data = program(&["/lib"], &[("other.c", 1)], &{
            let mut w = Writer::new();
            set_address(&mut w, 0x4000);
            w.write_u8(1);
            advance_pc(&mut w, 2);
            end_sequence(&mut w);
            w.into_inner()
        });
        data.extend_from_slice(&sample());

        let debug_line = DebugLine::parse(&data);
        assert_eq!(debug_line.programs().count(), 2);
        let location = debug_line
            .lookup_by_address(0x108)
            .expect("decodes")
            .expect("second program matches");
        assert_eq!(location.file, "fileA.c");
        let location = debug_line
            .lookup_by_address(0x4000)
            .expect("decodes")
            .expect("first program matches");
        assert_eq!(location.path(), "/lib/other.c");
    }

    #[test]
    fn invalid_file_index_is_reported() {
        let data = program(&["/src"], &[("fileA.c", 1)], &single_sequence(3));
        let debug_line = DebugLine::parse(&data);
        assert_eq!(
            debug_line.lookup_by_address(0x100),
            Err(FormatError::InvalidFileIndex(3))
        );
        assert_eq!(debug_line.lookup_by_location("fileA.c", 10), Ok(None));
    }

    #[test]
    fn invalid_directory_index_is_reported() {
        let data = program(&["/src"], &[("fileA.c", 0)], &single_sequence(1));
        let debug_line = DebugLine::parse(&data);
        assert_eq!(
            debug_line.lookup_by_address(0x100),
            Err(FormatError::InvalidDirectoryIndex(0))
        );
        // The bare name still matches without a directory.
        assert_eq!(debug_line.lookup_by_location("fileA.c", 10), Ok(Some(0x100)));
    }

    #[test]
    fn truncated_program_stops_iteration() {
        let mut data = sample();
        data.truncate(data.len() - 3);
        let debug_line = DebugLine::parse(&data);
        let programs: Vec<_> = debug_line.programs().collect();
        assert_eq!(programs.len(), 1);
        assert!(matches!(programs[0], Err(FormatError::OutOfBounds { .. })));
        assert!(debug_line.lookup_by_address(0x100).is_err());
    }

    #[test]
    fn empty_section_has_no_answers() {
        let debug_line = DebugLine::parse(&[]);
        assert_eq!(debug_line.lookup_by_address(0), Ok(None));
        assert_eq!(debug_line.lookup_by_location("a.c", 1), Ok(None));
    }
}
