//! Target architecture abstraction.
//!
//! The converter stays generic over the DSP it targets. A backend knows how
//! the toolchain addresses code and data in its ELF output and how the
//! coprocessor loader expects segment addresses in the container.

pub mod teak;

/// A target DSP architecture.
pub trait Architecture {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Maps an ELF section address to the load address stored in a
    /// container segment descriptor.
    fn load_address(&self, section_address: u32) -> u32;
}
