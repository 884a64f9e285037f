//! Error taxonomy shared by every binary-format engine.
//!
//! Every structural violation surfaces as a [`FormatError`] and aborts the
//! parse that hit it. Lookup misses are not errors; they are `Ok(None)`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("access of {len} bytes at offset {offset:#x} is outside a {size:#x}-byte buffer")]
    OutOfBounds { offset: usize, len: usize, size: usize },
    #[error("unterminated string at offset {0:#x}")]
    UnterminatedString(usize),
    #[error("LEB128 value at offset {0:#x} does not fit in 64 bits")]
    LebOverflow(usize),
    #[error("not an ELF image")]
    NotElf,
    #[error("unsupported ELF image: {0}")]
    UnsupportedElf(&'static str),
    #[error("malformed ELF image: {0}")]
    MalformedElf(String),
    #[error("section header table references missing section {0}")]
    MissingSection(usize),
    #[error("section {0} is not a string table")]
    NotAStringTable(usize),
    #[error("symbol table `{name}` is {len:#x} bytes, not a multiple of {entry_size}")]
    SymbolTableLength {
        name: String,
        len: usize,
        entry_size: usize,
    },
    #[error("bad container magic {found:02x?}, expected {expected:02x?}")]
    BadMagic { found: [u8; 4], expected: [u8; 4] },
    #[error("unknown segment type {0}")]
    UnknownSegmentType(u8),
    #[error("{count} segments do not fit in the container header (max {max})")]
    TooManySegments { count: usize, max: usize },
    #[error("segment payload of {0:#x} bytes does not fit the container")]
    SegmentTooLarge(usize),
    #[error("unsupported line program version {0}")]
    UnsupportedLineVersion(u16),
    #[error("line program declares a zero line range")]
    ZeroLineRange,
    #[error("line program prologue ends at {end:#x} but its tables run to {tables_end:#x}")]
    PrologueOverrun { end: usize, tables_end: usize },
    #[error("invalid file index {0}")]
    InvalidFileIndex(u64),
    #[error("invalid directory index {0}")]
    InvalidDirectoryIndex(u64),
}

pub type Result<T> = std::result::Result<T, FormatError>;
