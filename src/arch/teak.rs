//! Teak DSP backend.
//!
//! The Teak toolchain places code and data in a 24-bit byte-addressed space
//! while the loader counts 16-bit words.

use super::Architecture;

const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// The Teak architecture backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Teak;

impl Architecture for Teak {
    fn name(&self) -> &'static str {
        "teak"
    }

    fn load_address(&self, section_address: u32) -> u32 {
        (section_address & ADDRESS_MASK) >> 1
    }
}

#[cfg(test)]
mod tests {
    use super::Teak;
    use crate::arch::Architecture;

    #[test]
    fn byte_addresses_become_word_addresses() {
        assert_eq!(Teak.load_address(0x0000_0200), 0x100);
        assert_eq!(Teak.load_address(0x0100_0200), 0x100);
        assert_eq!(Teak.load_address(0x00FF_FFFF), 0x7F_FFFF);
    }
}
