//! DSP1 firmware container.
//!
//! A container is a fixed 0x300-byte header followed by segment payloads.
//! The header opens with an opaque 0x100-byte signature, then the container
//! fields, then one 48-byte descriptor per segment:
//!
//! ```text
//! 0x000  signature[0x100]
//! 0x100  magic "DSP1"       0x104  file_size
//! 0x108  memory_layout      0x10a  reserved[2]
//! 0x10c  unknown            0x10d  filter_segment_type
//! 0x10e  segment_count      0x10f  flags
//! 0x110  filter_segment_address
//! 0x114  filter_segment_size
//! 0x118  reserved[8]
//! 0x120  descriptors: offset, address, size, reserved[3], type, sha256[32]
//! 0x300  payloads
//! ```
//!
//! Offsets, sizes, the segment count, the file size and every digest are
//! derived when the container is serialized. Reading never checks digests.

use bitflags::bitflags;
use sha2::{Digest as _, Sha256};

use crate::cursor::{Reader, Writer};
use crate::error::{FormatError, Result};
use crate::layout::PAYLOAD_BASE;
use crate::writer;

pub const MAGIC: [u8; 4] = *b"DSP1";
pub const SIGNATURE_SIZE: usize = 0x100;
pub const HEADER_SIZE: usize = PAYLOAD_BASE as usize;
/// End of the container fields; descriptors start here.
pub const FIXED_HEADER_SIZE: usize = 0x120;
pub const DESCRIPTOR_SIZE: usize = 48;
/// Descriptors that fit before the payload base.
pub const MAX_SEGMENTS: usize = (HEADER_SIZE - FIXED_HEADER_SIZE) / DESCRIPTOR_SIZE;
pub const DEFAULT_MEMORY_LAYOUT: u16 = 0xFFFF;

/// SHA-256 of a segment payload.
pub type Digest = [u8; 32];

pub fn sha256(data: &[u8]) -> Digest {
    Sha256::digest(data).into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SegmentType {
    #[default]
    Prog0 = 0,
    Prog1 = 1,
    Data = 2,
}

impl TryFrom<u8> for SegmentType {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Prog0),
            1 => Ok(Self::Prog1),
            2 => Ok(Self::Data),
            other => Err(FormatError::UnknownSegmentType(other)),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContainerFlags: u8 {
        /// Loader blocks until the segments are in place.
        const SYNC_LOAD = 1 << 0;
        const LOAD_FILTER_SEGMENT = 1 << 1;
    }
}

/// Header fields the caller controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Passed through untouched; never computed here.
    pub signature: Box<[u8; SIGNATURE_SIZE]>,
    pub memory_layout: u16,
    pub unknown: u8,
    /// Raw type byte; only meaningful with `LOAD_FILTER_SEGMENT` set.
    pub filter_segment_type: u8,
    pub flags: ContainerFlags,
    pub filter_segment_address: u32,
    pub filter_segment_size: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            signature: Box::new([0; SIGNATURE_SIZE]),
            memory_layout: DEFAULT_MEMORY_LAYOUT,
            unknown: 0,
            filter_segment_type: SegmentType::Prog0 as u8,
            flags: ContainerFlags::empty(),
            filter_segment_address: 0,
            filter_segment_size: 0,
        }
    }
}

/// Header fields that are derived from the segment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DerivedFields {
    pub file_size: u32,
    pub segment_count: u8,
}

impl Header {
    /// The filter segment type, if the byte names a known one.
    pub fn filter_segment(&self) -> Option<SegmentType> {
        SegmentType::try_from(self.filter_segment_type).ok()
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<(Self, DerivedFields)> {
        let signature = Box::new(reader.read_array::<SIGNATURE_SIZE>()?);
        let magic = reader.read_array::<4>()?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic {
                found: magic,
                expected: MAGIC,
            });
        }
        let file_size = reader.read_u32()?;
        let memory_layout = reader.read_u16()?;
        reader.skip(2)?;
        let unknown = reader.read_u8()?;
        let filter_segment_type = reader.read_u8()?;
        let segment_count = reader.read_u8()?;
        let flags = ContainerFlags::from_bits_retain(reader.read_u8()?);
        let filter_segment_address = reader.read_u32()?;
        let filter_segment_size = reader.read_u32()?;
        reader.skip(8)?;

        let header = Self {
            signature,
            memory_layout,
            unknown,
            filter_segment_type,
            flags,
            filter_segment_address,
            filter_segment_size,
        };
        Ok((
            header,
            DerivedFields {
                file_size,
                segment_count,
            },
        ))
    }

    pub(crate) fn write(&self, w: &mut Writer, derived: DerivedFields) {
        w.write_bytes(&self.signature[..]);
        w.write_bytes(&MAGIC);
        w.write_u32(derived.file_size);
        w.write_u16(self.memory_layout);
        w.write_u16(0);
        w.write_u8(self.unknown);
        w.write_u8(self.filter_segment_type);
        w.write_u8(derived.segment_count);
        w.write_u8(self.flags.bits());
        w.write_u32(self.filter_segment_address);
        w.write_u32(self.filter_segment_size);
        w.write_u64(0);
    }
}

/// One fixed-size descriptor record of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SegmentDescriptor {
    pub offset: u32,
    pub address: u32,
    pub size: u32,
    pub kind: SegmentType,
    pub digest: Digest,
}

impl SegmentDescriptor {
    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.read_u32()?;
        let address = reader.read_u32()?;
        let size = reader.read_u32()?;
        reader.skip(3)?;
        let kind = SegmentType::try_from(reader.read_u8()?)?;
        let digest = reader.read_array()?;
        Ok(Self {
            offset,
            address,
            size,
            kind,
            digest,
        })
    }

    pub(crate) fn write(&self, w: &mut Writer) {
        w.write_u32(self.offset);
        w.write_u32(self.address);
        w.write_u32(self.size);
        w.write_bytes(&[0; 3]);
        w.write_u8(self.kind as u8);
        w.write_bytes(&self.digest);
    }
}

/// A typed, hashed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    kind: SegmentType,
    address: u32,
    data: Vec<u8>,
    offset: u32,
    digest: Digest,
}

impl Segment {
    pub fn new(kind: SegmentType, address: u32, data: Vec<u8>) -> Self {
        let digest = sha256(&data);
        Self {
            kind,
            address,
            data,
            offset: 0,
            digest,
        }
    }

    pub fn kind(&self) -> SegmentType {
        self.kind
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// File offset the payload was read from; zero for a segment that was
    /// never parsed.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The digest as stored in the descriptor, or as computed for a new
    /// segment.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn digest_matches(&self) -> bool {
        sha256(&self.data) == self.digest
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Container {
    pub header: Header,
    segments: Vec<Segment>,
    file_size: u32,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, kind: SegmentType, address: u32, data: Vec<u8>) {
        self.segments.push(Segment::new(kind, address, data));
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// File size declared by a parsed container; zero for a new one.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn set_sync_load(&mut self, enabled: bool) {
        self.header.flags.set(ContainerFlags::SYNC_LOAD, enabled);
    }

    /// Checks every stored digest against its payload.
    pub fn verify_digests(&self) -> bool {
        self.segments.iter().all(Segment::digest_matches)
    }

    /// Parses a serialized container.
    ///
    /// # Errors
    /// Returns `FormatError` for a bad magic, an unknown segment type, or a
    /// descriptor pointing outside the buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);
        let (header, derived) = Header::read(&mut reader)?;
        if derived.file_size as usize != data.len() {
            tracing::warn!(
                "container declares {:#x} bytes but {:#x} were supplied",
                derived.file_size,
                data.len()
            );
        }

        let descriptors = (0..derived.segment_count)
            .map(|_| SegmentDescriptor::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;

        let mut segments = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            reader.seek(descriptor.offset as usize)?;
            let payload = reader.read_bytes(descriptor.size as usize)?;
            segments.push(Segment {
                kind: descriptor.kind,
                address: descriptor.address,
                data: payload.to_vec(),
                offset: descriptor.offset,
                digest: descriptor.digest,
            });
        }

        Ok(Self {
            header,
            segments,
            file_size: derived.file_size,
        })
    }

    /// Serializes the container, deriving every size, offset and digest.
    ///
    /// # Errors
    /// Returns `FormatError` when the segments do not fit the format.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        writer::write_container(&self.header, &self.segments)
    }
}
