//! Bit-packed boolean flag stream for tight encoding.
//!
//! During the tight flags pass every boolean-producing field appends flags in
//! field order; the packed block is written once per top-level structure,
//! immediately before its payload bytes, and the payload pass (and the
//! decoder) replay the flags in the same order.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use brokerwire_core::error::{ErrorKind, Result};

/// Size-marker value introducing a one-byte count.
const SIZE_U8_MARKER: u8 = 0xC0;
/// Size-marker value introducing a two-byte count.
const SIZE_U16_MARKER: u8 = 0x80;

/// An ordered sequence of booleans packed eight to a byte.
///
/// Flags are appended with [`write`](Self::write) and consumed in FIFO order
/// with [`read`](Self::read). Reading past the end is [`ErrorKind::StreamExhausted`],
/// which always indicates a version or schema mismatch between the peers and
/// is fatal to the connection.
#[derive(Debug, Default)]
pub struct BitFlagStream {
    data: Vec<u8>,
    /// Number of flags written (or, after [`read_from`](Self::read_from),
    /// readable: eight per transmitted byte).
    bit_len: usize,
    /// Next flag to be returned by [`read`](Self::read).
    read_pos: usize,
}

impl BitFlagStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one flag.
    pub fn write(&mut self, flag: bool) {
        let byte = self.bit_len / 8;
        if byte == self.data.len() {
            self.data.push(0);
        }
        if flag {
            self.data[byte] |= 1 << (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Consumes the next flag in write order.
    pub fn read(&mut self) -> Result<bool> {
        if self.read_pos >= self.bit_len {
            return Err(ErrorKind::StreamExhausted);
        }
        let bit = self.data[self.read_pos / 8] & (1 << (self.read_pos % 8)) != 0;
        self.read_pos += 1;
        Ok(bit)
    }

    /// Number of flags currently held.
    pub fn len(&self) -> usize {
        self.bit_len
    }

    /// True if no flags have been written.
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Number of bytes needed to bit-pack the current flag count.
    pub fn serialized_size(&self) -> usize {
        (self.bit_len + 7) / 8
    }

    /// Writes the size marker and packed bits.
    ///
    /// Byte counts below 64 fit the marker byte itself; larger counts use a
    /// `0xC0`-prefixed u8 or a `0x80`-prefixed big-endian u16.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let bytes = self.serialized_size();
        if bytes < 64 {
            out.write_u8(bytes as u8)?;
        } else if bytes < 256 {
            out.write_u8(SIZE_U8_MARKER)?;
            out.write_u8(bytes as u8)?;
        } else {
            out.write_u8(SIZE_U16_MARKER)?;
            out.write_u16::<BigEndian>(bytes as u16)?;
        }
        out.extend_from_slice(&self.data[..bytes]);
        Ok(())
    }

    /// Reads a flag block from the input, positioned for replay.
    ///
    /// The readable flag count is eight per transmitted byte; a block
    /// shorter than the decoder's field walk demands will underrun as
    /// [`ErrorKind::StreamExhausted`] rather than yield misaligned values.
    pub fn read_from(input: &mut Cursor<&[u8]>) -> Result<Self> {
        let marker = input.read_u8()?;
        let bytes = match marker {
            SIZE_U8_MARKER => input.read_u8()? as usize,
            SIZE_U16_MARKER => input.read_u16::<BigEndian>()? as usize,
            b if b < 0x80 => b as usize,
            b => {
                return Err(ErrorKind::MalformedField(format!(
                    "invalid flag block size marker: {b:#04x}"
                )))
            }
        };
        let mut data = vec![0u8; bytes];
        input.read_exact(&mut data)?;
        Ok(Self { data, bit_len: bytes * 8, read_pos: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut flags = BitFlagStream::new();
        let pattern = [true, false, true, true, false, false, true, false, true, true];
        for &flag in &pattern {
            flags.write(flag);
        }
        assert_eq!(flags.len(), pattern.len());
        assert_eq!(flags.serialized_size(), 2);
        for &expected in &pattern {
            assert_eq!(flags.read().unwrap(), expected);
        }
        assert!(matches!(flags.read(), Err(ErrorKind::StreamExhausted)));
    }

    #[test]
    fn test_wire_round_trip() {
        let mut flags = BitFlagStream::new();
        for i in 0..21 {
            flags.write(i % 3 == 0);
        }
        let mut out = Vec::new();
        flags.write_to(&mut out).unwrap();

        let mut cursor = Cursor::new(out.as_slice());
        let mut decoded = BitFlagStream::read_from(&mut cursor).unwrap();
        for i in 0..21 {
            assert_eq!(decoded.read().unwrap(), i % 3 == 0);
        }
        // Trailing pad bits of the last byte read back as false.
        assert!(!decoded.read().unwrap());
    }

    #[test]
    fn test_large_block_size_markers() {
        for count in [64usize * 8, 300 * 8] {
            let mut flags = BitFlagStream::new();
            for _ in 0..count {
                flags.write(true);
            }
            let mut out = Vec::new();
            flags.write_to(&mut out).unwrap();
            let mut cursor = Cursor::new(out.as_slice());
            let mut decoded = BitFlagStream::read_from(&mut cursor).unwrap();
            for _ in 0..count {
                assert!(decoded.read().unwrap());
            }
        }
    }

    #[test]
    fn test_truncated_block_is_truncated_stream() {
        let mut flags = BitFlagStream::new();
        for _ in 0..32 {
            flags.write(true);
        }
        let mut out = Vec::new();
        flags.write_to(&mut out).unwrap();
        out.truncate(out.len() - 2);

        let mut cursor = Cursor::new(out.as_slice());
        assert!(matches!(
            BitFlagStream::read_from(&mut cursor),
            Err(ErrorKind::TruncatedStream)
        ));
    }

    #[test]
    fn test_invalid_size_marker() {
        let bytes = [0x9Au8, 0, 0];
        let mut cursor = Cursor::new(bytes.as_slice());
        assert!(matches!(
            BitFlagStream::read_from(&mut cursor),
            Err(ErrorKind::MalformedField(_))
        ));
    }
}
