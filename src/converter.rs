//! ELF to DSP1 conversion.
//!
//! The `Converter` pulls the loadable sections out of a parsed
//! [`ObjectFile`] and turns each one into a container segment:
//! 1. Look up `.text`, `.rodata` and `.data` by name.
//! 2. Skip any that are missing or carry no bytes.
//! 3. Map the section address through the target architecture.
//! 4. Append the segment in that order.

use crate::arch::Architecture;
use crate::dsp1::{Container, SegmentType};
use crate::elf::ObjectFile;

/// Sections copied into the container, in segment order.
pub const SEGMENT_SOURCES: &[(&str, SegmentType)] = &[
    (".text", SegmentType::Prog0),
    (".rodata", SegmentType::Data),
    (".data", SegmentType::Data),
];

pub struct Converter<A: Architecture> {
    arch: A,
    sync_load: bool,
}

impl<A: Architecture> Converter<A> {
    pub fn new(arch: A) -> Self {
        Self {
            arch,
            sync_load: false,
        }
    }

    /// Ask the loader to block until the segments are loaded.
    pub fn sync_load(mut self, enabled: bool) -> Self {
        self.sync_load = enabled;
        self
    }

    pub fn convert(&self, object: &ObjectFile) -> Container {
        let mut container = Container::new();
        container.set_sync_load(self.sync_load);

        for &(name, kind) in SEGMENT_SOURCES {
            let Some(section) = object.section_by_name(name).filter(|s| !s.is_empty()) else {
                tracing::debug!("no {} to emit", name);
                continue;
            };
            let address = self.arch.load_address(section.header().address);
            tracing::debug!(
                "{} -> {:?} segment at {:#x} ({} bytes, {})",
                name,
                kind,
                address,
                section.data().len(),
                self.arch.name()
            );
            container.add_segment(kind, address, section.data().to_vec());
        }

        container
    }
}
