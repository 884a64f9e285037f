//! DSP1 container writer.
//!
//! Emission happens in two passes over one growable buffer. The first pass
//! writes the header with a provisional file size, the descriptors and the
//! payloads. Once the total length is known the header is written again
//! over the first one with the real size.

use crate::cursor::Writer;
use crate::dsp1::{
    sha256, DerivedFields, Header, Segment, SegmentDescriptor, FIXED_HEADER_SIZE, MAX_SEGMENTS,
};
use crate::error::{FormatError, Result};
use crate::layout::layout_payloads;

/// Serialize a container header and its segments.
pub fn write_container(header: &Header, segments: &[Segment]) -> Result<Vec<u8>> {
    if segments.len() > MAX_SEGMENTS {
        return Err(FormatError::TooManySegments {
            count: segments.len(),
            max: MAX_SEGMENTS,
        });
    }
    // MAX_SEGMENTS is well below u8::MAX.
    let segment_count = segments.len() as u8;
    let placements = layout_payloads(segments.iter().map(|s| s.data().len()))?;
    let total = placements
        .last()
        .map_or(FIXED_HEADER_SIZE, |p| p.end() as usize);

    let mut w = Writer::with_capacity(total);
    header.write(
        &mut w,
        DerivedFields {
            file_size: 0,
            segment_count,
        },
    );

    for (segment, placement) in segments.iter().zip(&placements) {
        SegmentDescriptor {
            offset: placement.offset,
            address: segment.address(),
            size: placement.size,
            kind: segment.kind(),
            digest: sha256(segment.data()),
        }
        .write(&mut w);
    }

    for (segment, placement) in segments.iter().zip(&placements) {
        tracing::trace!(
            "segment {:?} addr={:#x} at {:#x}..{:#x}",
            segment.kind(),
            segment.address(),
            placement.offset,
            placement.end()
        );
        w.seek(placement.offset as usize);
        w.write_bytes(segment.data());
    }

    // Patch the file size now that the length is final.
    let file_size = u32::try_from(w.len()).map_err(|_| FormatError::SegmentTooLarge(w.len()))?;
    w.seek(0);
    header.write(
        &mut w,
        DerivedFields {
            file_size,
            segment_count,
        },
    );

    Ok(w.into_inner())
}
