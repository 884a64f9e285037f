//! Container payload layout.
//!
//! Segment payloads follow the fixed header back to back, in segment order,
//! with no padding between them.

use crate::error::{FormatError, Result};

/// File offset of the first segment payload.
pub const PAYLOAD_BASE: u32 = 0x300;

/// Where one segment payload lives in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset: u32,
    pub size: u32,
}

impl Placement {
    /// One past the last payload byte.
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// Assigns contiguous file ranges to payloads of the given sizes.
///
/// # Errors
/// Returns `FormatError::SegmentTooLarge` when a payload would push the
/// container past the 32-bit offset space.
pub fn layout_payloads<I>(sizes: I) -> Result<Vec<Placement>>
where
    I: IntoIterator<Item = usize>,
{
    let mut offset = PAYLOAD_BASE;
    let mut placements = Vec::new();
    for size in sizes {
        let size32 = u32::try_from(size).map_err(|_| FormatError::SegmentTooLarge(size))?;
        let end = offset
            .checked_add(size32)
            .ok_or(FormatError::SegmentTooLarge(size))?;
        placements.push(Placement {
            offset,
            size: size32,
        });
        offset = end;
    }
    Ok(placements)
}
