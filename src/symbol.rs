//! ELF32 symbol records.
//!
//! Symbol tables are decoded eagerly into [`Symbol`] values when the object
//! model is built. Names stay as offsets into the linked string table until
//! a caller asks for them.

use object::elf::{Sym32, SHN_UNDEF, STB_GLOBAL, STB_LOCAL, STB_WEAK};
use object::LittleEndian as LE;

use crate::cursor::Reader;
use crate::error::Result;

/// Size of one `Elf32_Sym` record.
pub const SYMBOL_SIZE: usize = std::mem::size_of::<Sym32<LE>>();

/// A symbol defined or referenced by the input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Offset of the name in the linked string table.
    pub name_offset: u32,
    pub value: u32,
    pub size: u32,
    /// Binding in the high nibble, type in the low nibble.
    pub info: u8,
    /// Visibility in the low two bits.
    pub other: u8,
    pub section_index: u16,
}

impl From<&Sym32<LE>> for Symbol {
    fn from(sym: &Sym32<LE>) -> Self {
        Self {
            name_offset: sym.st_name.get(LE),
            value: sym.st_value.get(LE),
            size: sym.st_size.get(LE),
            info: sym.st_info,
            other: sym.st_other,
            section_index: sym.st_shndx.get(LE),
        }
    }
}

impl Symbol {
    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_pod::<Sym32<LE>>().map(Self::from)
    }

    pub fn binding(&self) -> u8 {
        self.info >> 4
    }

    pub fn kind(&self) -> u8 {
        self.info & 0xf
    }

    pub fn visibility(&self) -> u8 {
        self.other & 0x3
    }

    pub fn is_undefined(&self) -> bool {
        self.section_index == SHN_UNDEF
    }

    pub fn is_local(&self) -> bool {
        self.binding() == STB_LOCAL
    }

    pub fn is_global(&self) -> bool {
        self.binding() == STB_GLOBAL
    }

    pub fn is_weak(&self) -> bool {
        self.binding() == STB_WEAK
    }
}
