//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use elf2dsp::cursor::Writer;
use object::elf::{
    FileHeader32, Ident, SectionHeader32, ELFCLASS32, ELFDATA2LSB, ELFMAG, ELFOSABI_SYSV,
    ET_EXEC, EV_CURRENT, SHT_NOBITS, SHT_NULL, SHT_STRTAB,
};
use object::endian::{LittleEndian as LE, U16, U32};
use object::pod::bytes_of;

pub const FILE_HEADER_SIZE: usize = std::mem::size_of::<FileHeader32<LE>>();
pub const SECTION_HEADER_SIZE: usize = std::mem::size_of::<SectionHeader32<LE>>();

fn le16(v: u16) -> U16<LE> {
    U16::new(LE, v)
}
fn le32(v: u32) -> U32<LE> {
    U32::new(LE, v)
}

struct FixtureSection {
    name: String,
    kind: u32,
    address: u32,
    data: Vec<u8>,
    link: u32,
    entry_size: u32,
}

/// Lays out a small ELF32 little-endian image: file header, section
/// contents, `.shstrtab`, then the section header table.
#[derive(Default)]
pub struct ElfBuilder {
    machine: u16,
    entry: u32,
    sections: Vec<FixtureSection>,
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn entry(mut self, entry: u32) -> Self {
        self.entry = entry;
        self
    }

    /// Adds a section; its index is its position plus one.
    pub fn section(mut self, name: &str, kind: u32, address: u32, data: &[u8]) -> Self {
        self.sections.push(FixtureSection {
            name: name.to_string(),
            kind,
            address,
            data: data.to_vec(),
            link: 0,
            entry_size: 0,
        });
        self
    }

    /// Adds a section linked to another section index.
    pub fn linked(mut self, name: &str, kind: u32, data: &[u8], link: u32) -> Self {
        self.sections.push(FixtureSection {
            name: name.to_string(),
            kind,
            address: 0,
            data: data.to_vec(),
            link,
            entry_size: 16,
        });
        self
    }

    /// Index the builder gives `.shstrtab`.
    pub fn shstrtab_index(&self) -> u16 {
        self.sections.len() as u16 + 1
    }

    pub fn build(&self) -> Vec<u8> {
        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for section in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(section.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let mut buffer = vec![0u8; FILE_HEADER_SIZE];
        let mut offsets = Vec::new();
        for section in &self.sections {
            offsets.push(buffer.len() as u32);
            if section.kind != SHT_NOBITS {
                buffer.extend_from_slice(&section.data);
            }
        }
        let shstrtab_offset = buffer.len() as u32;
        buffer.extend_from_slice(&shstrtab);
        while buffer.len() % 4 != 0 {
            buffer.push(0);
        }

        let shoff = buffer.len() as u32;
        let shnum = self.sections.len() as u16 + 2;
        buffer.extend_from_slice(bytes_of(&section_header(0, SHT_NULL, 0, 0, 0, 0, 0)));
        for (i, section) in self.sections.iter().enumerate() {
            buffer.extend_from_slice(bytes_of(&section_header(
                name_offsets[i],
                section.kind,
                section.address,
                offsets[i],
                section.data.len() as u32,
                section.link,
                section.entry_size,
            )));
        }
        buffer.extend_from_slice(bytes_of(&section_header(
            shstrtab_name,
            SHT_STRTAB,
            0,
            shstrtab_offset,
            shstrtab.len() as u32,
            0,
            0,
        )));

        let file_header = FileHeader32::<LE> {
            e_ident: Ident {
                magic: ELFMAG,
                class: ELFCLASS32,
                data: ELFDATA2LSB,
                version: EV_CURRENT,
                os_abi: ELFOSABI_SYSV,
                abi_version: 0,
                padding: [0; 7],
            },
            e_type: le16(ET_EXEC),
            e_machine: le16(self.machine),
            e_version: le32(u32::from(EV_CURRENT)),
            e_entry: le32(self.entry),
            e_phoff: le32(0),
            e_shoff: le32(shoff),
            e_flags: le32(0),
            e_ehsize: le16(FILE_HEADER_SIZE as u16),
            e_phentsize: le16(0),
            e_phnum: le16(0),
            e_shentsize: le16(SECTION_HEADER_SIZE as u16),
            e_shnum: le16(shnum),
            e_shstrndx: le16(shnum - 1),
        };
        buffer[..FILE_HEADER_SIZE].copy_from_slice(bytes_of(&file_header));
        buffer
    }
}

fn section_header(
    name: u32,
    kind: u32,
    address: u32,
    offset: u32,
    size: u32,
    link: u32,
    entry_size: u32,
) -> SectionHeader32<LE> {
    SectionHeader32 {
        sh_name: le32(name),
        sh_type: le32(kind),
        sh_flags: le32(0),
        sh_addr: le32(address),
        sh_offset: le32(offset),
        sh_size: le32(size),
        sh_link: le32(link),
        sh_info: le32(0),
        sh_addralign: le32(if kind == SHT_NULL { 0 } else { 1 }),
        sh_entsize: le32(entry_size),
    }
}

/// One 16-byte symbol record.
pub fn symbol(name: u32, value: u32, size: u32, info: u8, section: u16) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_u32(name);
    w.write_u32(value);
    w.write_u32(size);
    w.write_u8(info);
    w.write_u8(0);
    w.write_u16(section);
    w.into_inner()
}

/// A version 2 line program for `dir/file` with rows at (0x100, line 10)
/// and (0x110, line 12), closed at 0x120.
pub fn line_program(dir: &str, file: &str) -> Vec<u8> {
    let mut prologue = Writer::new();
    prologue.write_u8(1); // minimum_instruction_length
    prologue.write_u8(1); // default_is_stmt
    prologue.write_i8(-5);
    prologue.write_u8(14);
    prologue.write_u8(10);
    prologue.write_bytes(&[0, 1, 1, 1, 1, 0, 0, 0, 1]);
    prologue.write_cstr(dir);
    prologue.write_u8(0);
    prologue.write_cstr(file);
    prologue.write_uleb128(1);
    prologue.write_uleb128(0);
    prologue.write_uleb128(0);
    prologue.write_u8(0);
    let prologue = prologue.into_inner();

    let mut ops = Writer::new();
    ops.write_bytes(&[0, 5, 2]); // set_address
    ops.write_u32(0x100);
    ops.write_u8(3); // advance_line +9
    ops.write_sleb128(9);
    ops.write_u8(1); // copy
    ops.write_u8(2); // advance_pc 0x10
    ops.write_uleb128(0x10);
    ops.write_u8(3); // advance_line +2
    ops.write_sleb128(2);
    ops.write_u8(1);
    ops.write_u8(2);
    ops.write_uleb128(0x10);
    ops.write_bytes(&[0, 1, 1]); // end_sequence
    let ops = ops.into_inner();

    let mut w = Writer::new();
    w.write_u32((2 + 4 + prologue.len() + ops.len()) as u32);
    w.write_u16(2);
    w.write_u32(prologue.len() as u32);
    w.write_bytes(&prologue);
    w.write_bytes(&ops);
    w.into_inner()
}
