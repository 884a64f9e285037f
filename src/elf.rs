//! ELF32 object section model.
//!
//! The whole input image is parsed once into an [`ObjectFile`]: the file
//! header plus every section from the section header table, each tagged by
//! its declared type. String tables answer lookups by offset, symbol tables
//! are decoded into [`Symbol`] records up front, everything else is kept as
//! an opaque blob. Nothing is modified after construction.
//!
//! `object`'s ELF reader validates the header and walks the section table;
//! this module only decides what each section holds.

use object::elf::{
    FileHeader32, SectionHeader32, ELFCLASS32, ELFDATA2LSB, ELFMAG, SHN_UNDEF, SHT_DYNSYM,
    SHT_STRTAB, SHT_SYMTAB,
};
use object::read::elf::{FileHeader as _, SectionHeader as _, SectionTable};
use object::read::StringTable as RawStrings;
use object::LittleEndian as LE;

use crate::cursor::Reader;
use crate::error::{FormatError, Result};
use crate::symbol::{Symbol, SYMBOL_SIZE};

/// Fields of the ELF file header that survive parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    /// `e_type`: relocatable, executable, ...
    pub kind: u16,
    pub machine: u16,
    pub entry: u32,
    pub flags: u32,
}

/// One entry of the section header table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionHeader {
    pub name_offset: u32,
    /// Declared `sh_type`; selects the [`SectionContents`] variant.
    pub kind: u32,
    pub flags: u32,
    pub address: u32,
    pub offset: u32,
    pub size: u32,
    pub link: u32,
    pub info: u32,
    pub align: u32,
    pub entry_size: u32,
}

impl From<&SectionHeader32<LE>> for SectionHeader {
    fn from(sh: &SectionHeader32<LE>) -> Self {
        Self {
            name_offset: sh.sh_name.get(LE),
            kind: sh.sh_type.get(LE),
            flags: sh.sh_flags.get(LE),
            address: sh.sh_addr.get(LE),
            offset: sh.sh_offset.get(LE),
            size: sh.sh_size.get(LE),
            link: sh.sh_link.get(LE),
            info: sh.sh_info.get(LE),
            align: sh.sh_addralign.get(LE),
            entry_size: sh.sh_entsize.get(LE),
        }
    }
}

/// A string table section: null-terminated strings addressed by offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    data: Vec<u8>,
}

impl StringTable {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the string starting at `offset`.
    ///
    /// An offset that lands on a terminator yields the empty string; an
    /// offset at or past the end, or a string with no terminator before the
    /// end, is an error.
    pub fn get(&self, offset: u32) -> Result<String> {
        let mut reader = Reader::new(&self.data);
        reader.seek(offset as usize)?;
        reader.read_cstr()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A symbol table section, decoded at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    data: Vec<u8>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn parse(name: &str, data: Vec<u8>) -> Result<Self> {
        if data.len() % SYMBOL_SIZE != 0 {
            return Err(FormatError::SymbolTableLength {
                name: name.to_string(),
                len: data.len(),
                entry_size: SYMBOL_SIZE,
            });
        }
        let mut reader = Reader::new(&data);
        let symbols = (0..data.len() / SYMBOL_SIZE)
            .map(|_| Symbol::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { data, symbols })
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Section payload, typed by the declared section type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionContents {
    Generic(Vec<u8>),
    StringTable(StringTable),
    SymbolTable(SymbolTable),
}

impl SectionContents {
    /// Picks the variant for `header.kind` and decodes `data` accordingly.
    pub fn new(name: &str, header: &SectionHeader, data: Vec<u8>) -> Result<Self> {
        Ok(match header.kind {
            SHT_STRTAB => Self::StringTable(StringTable::new(data)),
            SHT_SYMTAB | SHT_DYNSYM => Self::SymbolTable(SymbolTable::parse(name, data)?),
            _ => Self::Generic(data),
        })
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Self::Generic(data) => data,
            Self::StringTable(table) => table.data(),
            Self::SymbolTable(table) => table.data(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    header: SectionHeader,
    contents: SectionContents,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    pub fn contents(&self) -> &SectionContents {
        &self.contents
    }

    /// Raw file bytes of the section. Empty for `SHT_NOBITS`.
    pub fn data(&self) -> &[u8] {
        self.contents.data()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    pub fn as_string_table(&self) -> Option<&StringTable> {
        match &self.contents {
            SectionContents::StringTable(table) => Some(table),
            _ => None,
        }
    }

    pub fn symbols(&self) -> Option<&[Symbol]> {
        match &self.contents {
            SectionContents::SymbolTable(table) => Some(table.symbols()),
            _ => None,
        }
    }
}

/// A parsed ELF32 little-endian image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    header: ElfHeader,
    sections: Vec<Section>,
}

impl ObjectFile {
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// First section called `name`, if any.
    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Resolves a symbol's name through the string table linked from `table`.
    pub fn symbol_name(&self, table: &Section, symbol: &Symbol) -> Result<String> {
        let link = table.header.link as usize;
        let strings = self
            .section(link)
            .ok_or(FormatError::MissingSection(link))?
            .as_string_table()
            .ok_or(FormatError::NotAStringTable(link))?;
        strings.get(symbol.name_offset)
    }

    /// Every symbol of every symbol table, paired with its name.
    pub fn symbols(&self) -> Result<Vec<(String, Symbol)>> {
        let mut out = Vec::new();
        for table in &self.sections {
            let Some(symbols) = table.symbols() else {
                continue;
            };
            for symbol in symbols {
                out.push((self.symbol_name(table, symbol)?, *symbol));
            }
        }
        Ok(out)
    }
}

/// Parses a whole ELF32 little-endian image.
///
/// The section table walk, including extended numbering, is done by
/// `object`; each section is then copied into the typed model.
///
/// # Errors
/// Returns `FormatError` for a bad identification, a truncated header or
/// section, or a malformed symbol table. No partial model is returned.
pub fn parse_object(data: &[u8]) -> Result<ObjectFile> {
    if !data.starts_with(&ELFMAG) {
        return Err(FormatError::NotElf);
    }
    // `Ident` is not `Pod`; read its 16 bytes raw (class at 4, data at 5).
    let ident = Reader::new(data).read_pod::<[u8; 16]>()?;
    if ident[4] != ELFCLASS32 {
        return Err(FormatError::UnsupportedElf("not a 32-bit image"));
    }
    if ident[5] != ELFDATA2LSB {
        return Err(FormatError::UnsupportedElf("not little-endian"));
    }

    let file_header = FileHeader32::<LE>::parse(data).map_err(malformed)?;
    let endian = file_header.endian().map_err(malformed)?;
    let header = ElfHeader {
        kind: file_header.e_type(endian),
        machine: file_header.e_machine(endian),
        entry: file_header.e_entry(endian),
        flags: file_header.e_flags(endian),
    };

    // Without a name table every section is unnamed.
    let named = file_header.e_shstrndx(endian) != SHN_UNDEF;
    let table: SectionTable<'_, FileHeader32<LE>> = if named {
        file_header.sections(endian, data).map_err(malformed)?
    } else {
        let headers = file_header.section_headers(endian, data).map_err(malformed)?;
        SectionTable::new(headers, RawStrings::default())
    };

    let mut sections = Vec::with_capacity(table.len());
    for raw in table.iter() {
        let name = if named {
            let bytes = table.section_name(endian, raw).map_err(malformed)?;
            bytes.iter().copied().map(char::from).collect()
        } else {
            String::new()
        };
        let header = SectionHeader::from(raw);
        let bytes = raw.data(endian, data).map_err(malformed)?;
        let contents = SectionContents::new(&name, &header, bytes.to_vec())?;
        tracing::trace!(
            "section {} type={:#x} addr={:#x} size={:#x}",
            name,
            header.kind,
            header.address,
            header.size
        );
        sections.push(Section {
            name,
            header,
            contents,
        });
    }

    Ok(ObjectFile { header, sections })
}

fn malformed(err: object::read::Error) -> FormatError {
    FormatError::MalformedElf(err.to_string())
}
