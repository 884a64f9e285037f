//! Little-endian binary cursor.
//!
//! [`Reader`] walks a borrowed byte slice with an explicit position and
//! [`Writer`] builds a growable buffer the same way. Both speak the
//! encodings used by the ELF, DWARF and DSP1 formats: fixed-width integers,
//! raw byte runs, null-terminated strings and LEB128.

use object::pod::{bytes_of, from_bytes, Pod};

use crate::error::{FormatError, Result};

/// Sequential reader over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(<$ty>::from_le_bytes(self.read_array()?))
            }
        )*
    };
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes left between the current position and the end of the buffer.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Moves to an absolute position. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.out_of_bounds(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.out_of_bounds(self.pos, len))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a plain-old-data struct (e.g. an `object::elf` header) in place.
    pub fn read_pod<T: Pod>(&mut self) -> Result<&'a T> {
        let start = self.pos;
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        from_bytes::<T>(bytes)
            .map(|(value, _)| value)
            .map_err(|()| self.out_of_bounds(start, std::mem::size_of::<T>()))
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.remaining()
            .first()
            .copied()
            .ok_or_else(|| self.out_of_bounds(self.pos, 1))
    }

    read_le! {
        read_u8 => u8,
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_i8 => i8,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
    }

    /// Reads a null-terminated string, consuming the terminator.
    ///
    /// Bytes are taken one-to-one as characters, so ASCII comes back
    /// unchanged and nothing is rejected.
    pub fn read_cstr(&mut self) -> Result<String> {
        let start = self.pos;
        let rest = self.remaining();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(FormatError::UnterminatedString(start))?;
        let text = rest[..len].iter().copied().map(char::from).collect();
        self.pos += len + 1;
        Ok(text)
    }

    pub fn read_uleb128(&mut self) -> Result<u64> {
        let start = self.pos;
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let low = u64::from(byte & 0x7f);
            if shift >= 64 {
                if low != 0 {
                    return Err(FormatError::LebOverflow(start));
                }
            } else {
                if shift > 0 && low >> (64 - shift) != 0 {
                    return Err(FormatError::LebOverflow(start));
                }
                result |= low << shift;
            }
            shift = shift.saturating_add(7);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
    }

    pub fn read_sleb128(&mut self) -> Result<i64> {
        let start = self.pos;
        let mut result = 0i64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let low = i64::from(byte & 0x7f);
            if shift < 64 {
                result |= low << shift;
            } else if low != 0 && low != 0x7f {
                return Err(FormatError::LebOverflow(start));
            }
            shift = shift.saturating_add(7);
            if byte & 0x80 == 0 {
                // Sign-extend from the last byte.
                if shift < 64 && byte & 0x40 != 0 {
                    result |= !0i64 << shift;
                }
                return Ok(result);
            }
        }
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> FormatError {
        FormatError::OutOfBounds {
            offset,
            len,
            size: self.data.len(),
        }
    }
}

/// Sequential writer into a growable buffer.
///
/// Writes land at the current position: existing bytes are overwritten and
/// the buffer grows as needed. Seeking past the end is allowed; the gap is
/// zero-filled by the next write.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
    pos: usize,
}

macro_rules! write_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                self.write_bytes(&value.to_le_bytes());
            }
        )*
    };
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    pub fn write_pod<T: Pod>(&mut self, value: &T) {
        self.write_bytes(bytes_of(value));
    }

    write_le! {
        write_u8 => u8,
        write_u16 => u16,
        write_u32 => u32,
        write_u64 => u64,
        write_i8 => i8,
        write_i16 => i16,
        write_i32 => i32,
        write_i64 => i64,
    }

    pub fn write_cstr(&mut self, text: &str) {
        self.write_bytes(text.as_bytes());
        self.write_u8(0);
    }

    pub fn write_uleb128(&mut self, mut value: u64) {
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.write_u8(byte);
            if value == 0 {
                return;
            }
        }
    }

    pub fn write_sleb128(&mut self, mut value: i64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
            if done {
                self.write_u8(byte);
                return;
            }
            self.write_u8(byte | 0x80);
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
