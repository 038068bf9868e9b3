//! Primitive field encodings shared by every marshaller.
//!
//! Fixed-width values are big-endian. Tight mode moves presence and size
//! information into the flag stream: booleans cost one flag and zero bytes,
//! longs shrink to 0/2/4/8 bytes behind two flags, and optional strings and
//! byte arrays spend one presence flag. Loose mode writes everything inline
//! with explicit one-byte presence markers and full-width longs.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use brokerwire_core::error::{ErrorKind, Result};

use super::bit_flags::BitFlagStream;

/// Copies `len` bytes out of the cursor, bounds-checked up front so a bogus
/// length prefix cannot trigger an oversized allocation.
pub fn take_bytes(input: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let pos = input.position() as usize;
    let buf = *input.get_ref();
    if len > buf.len().saturating_sub(pos) {
        return Err(ErrorKind::TruncatedStream);
    }
    let bytes = buf[pos..pos + len].to_vec();
    input.set_position((pos + len) as u64);
    Ok(bytes)
}

// ----- long: two flags select the 0 / 2 / 4 / 8 byte form -----------------

/// Tight flags pass for an i64; returns the payload byte count.
pub fn tight_long_flags(value: i64, flags: &mut BitFlagStream) -> usize {
    let v = value as u64;
    if v == 0 {
        flags.write(false);
        flags.write(false);
        0
    } else if v & 0xFFFF_FFFF_FFFF_0000 == 0 {
        flags.write(false);
        flags.write(true);
        2
    } else if v & 0xFFFF_FFFF_0000_0000 == 0 {
        flags.write(true);
        flags.write(false);
        4
    } else {
        flags.write(true);
        flags.write(true);
        8
    }
}

/// Tight payload pass for an i64; replays the two flags written by
/// [`tight_long_flags`].
pub fn tight_long_payload(
    value: i64,
    out: &mut Vec<u8>,
    flags: &mut BitFlagStream,
) -> Result<()> {
    if flags.read()? {
        if flags.read()? {
            out.write_i64::<BigEndian>(value)?;
        } else {
            out.write_u32::<BigEndian>(value as u32)?;
        }
    } else if flags.read()? {
        out.write_u16::<BigEndian>(value as u16)?;
    }
    Ok(())
}

/// Tight decode of an i64. Short forms zero-extend, matching the masks the
/// encoder selected the form with.
pub fn tight_long_decode(input: &mut Cursor<&[u8]>, flags: &mut BitFlagStream) -> Result<i64> {
    if flags.read()? {
        if flags.read()? {
            Ok(input.read_i64::<BigEndian>()?)
        } else {
            Ok(input.read_u32::<BigEndian>()? as i64)
        }
    } else if flags.read()? {
        Ok(input.read_u16::<BigEndian>()? as i64)
    } else {
        Ok(0)
    }
}

/// Loose encode of an i64: always the full 8 bytes.
pub fn loose_write_long(value: i64, out: &mut Vec<u8>) -> Result<()> {
    out.write_i64::<BigEndian>(value)?;
    Ok(())
}

/// Loose decode of an i64.
pub fn loose_read_long(input: &mut Cursor<&[u8]>) -> Result<i64> {
    Ok(input.read_i64::<BigEndian>()?)
}

// ----- strings: u16 length prefix + UTF-8 ---------------------------------

fn utf8_len_checked(value: &str) -> Result<usize> {
    let len = value.len();
    if len > u16::MAX as usize {
        return Err(ErrorKind::MalformedField(format!(
            "string of {len} bytes exceeds the u16 length prefix"
        )));
    }
    Ok(len)
}

fn write_string_body(value: &str, out: &mut Vec<u8>) -> Result<()> {
    out.write_u16::<BigEndian>(utf8_len_checked(value)? as u16)?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn read_string_body(input: &mut Cursor<&[u8]>) -> Result<String> {
    let len = input.read_u16::<BigEndian>()? as usize;
    let bytes = take_bytes(input, len)?;
    String::from_utf8(bytes)
        .map_err(|e| ErrorKind::MalformedField(format!("invalid UTF-8 in string field: {e}")))
}

/// Tight flags pass for an optional string; returns the payload byte count.
pub fn tight_string_flags(value: Option<&str>, flags: &mut BitFlagStream) -> Result<usize> {
    match value {
        None => {
            flags.write(false);
            Ok(0)
        }
        Some(s) => {
            flags.write(true);
            Ok(2 + utf8_len_checked(s)?)
        }
    }
}

/// Tight payload pass for an optional string.
pub fn tight_string_payload(
    value: Option<&str>,
    out: &mut Vec<u8>,
    flags: &mut BitFlagStream,
) -> Result<()> {
    if flags.read()? {
        // The flags pass already validated presence and length.
        write_string_body(value.unwrap_or_default(), out)?;
    }
    Ok(())
}

/// Tight decode of an optional string.
pub fn tight_string_decode(
    input: &mut Cursor<&[u8]>,
    flags: &mut BitFlagStream,
) -> Result<Option<String>> {
    if flags.read()? {
        Ok(Some(read_string_body(input)?))
    } else {
        Ok(None)
    }
}

/// Loose encode of an optional string: presence byte, then the body.
pub fn loose_write_string(value: Option<&str>, out: &mut Vec<u8>) -> Result<()> {
    match value {
        None => loose_write_bool(false, out),
        Some(s) => {
            loose_write_bool(true, out)?;
            write_string_body(s, out)
        }
    }
}

/// Loose decode of an optional string.
pub fn loose_read_string(input: &mut Cursor<&[u8]>) -> Result<Option<String>> {
    if loose_read_bool(input)? {
        Ok(Some(read_string_body(input)?))
    } else {
        Ok(None)
    }
}

// ----- byte arrays: u32 length prefix, or none when the schema fixes the size

/// Tight flags pass for an optional byte array; returns the payload count.
pub fn tight_bytes_flags(value: Option<&[u8]>, flags: &mut BitFlagStream) -> usize {
    match value {
        None => {
            flags.write(false);
            0
        }
        Some(b) => {
            flags.write(true);
            4 + b.len()
        }
    }
}

/// Tight payload pass for an optional byte array.
pub fn tight_bytes_payload(
    value: Option<&[u8]>,
    out: &mut Vec<u8>,
    flags: &mut BitFlagStream,
) -> Result<()> {
    if flags.read()? {
        let bytes = value.unwrap_or_default();
        out.write_u32::<BigEndian>(bytes.len() as u32)?;
        out.extend_from_slice(bytes);
    }
    Ok(())
}

/// Tight decode of an optional byte array.
pub fn tight_bytes_decode(
    input: &mut Cursor<&[u8]>,
    flags: &mut BitFlagStream,
) -> Result<Option<Vec<u8>>> {
    if flags.read()? {
        let len = input.read_u32::<BigEndian>()? as usize;
        Ok(Some(take_bytes(input, len)?))
    } else {
        Ok(None)
    }
}

/// Loose encode of an optional byte array.
pub fn loose_write_bytes(value: Option<&[u8]>, out: &mut Vec<u8>) -> Result<()> {
    match value {
        None => loose_write_bool(false, out),
        Some(b) => {
            loose_write_bool(true, out)?;
            out.write_u32::<BigEndian>(b.len() as u32)?;
            out.extend_from_slice(b);
            Ok(())
        }
    }
}

/// Loose decode of an optional byte array.
pub fn loose_read_bytes(input: &mut Cursor<&[u8]>) -> Result<Option<Vec<u8>>> {
    if loose_read_bool(input)? {
        let len = input.read_u32::<BigEndian>()? as usize;
        Ok(Some(take_bytes(input, len)?))
    } else {
        Ok(None)
    }
}

/// Writes a constant-length byte array; the schema-declared size stands in
/// for a length prefix.
pub fn write_fixed_bytes(value: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(value);
}

/// Reads a constant-length byte array into the provided buffer.
pub fn read_fixed_bytes(input: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<()> {
    let bytes = take_bytes(input, buf.len())?;
    buf.copy_from_slice(&bytes);
    Ok(())
}

// ----- loose booleans ------------------------------------------------------

/// Loose encode of a bool as one byte.
pub fn loose_write_bool(value: bool, out: &mut Vec<u8>) -> Result<()> {
    out.write_u8(u8::from(value))?;
    Ok(())
}

/// Loose decode of a bool; any nonzero byte is true.
pub fn loose_read_bool(input: &mut Cursor<&[u8]>) -> Result<bool> {
    Ok(input.read_u8()? != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_long_round_trip(value: i64) -> (usize, i64) {
        let mut flags = BitFlagStream::new();
        let size = tight_long_flags(value, &mut flags);
        let mut out = Vec::new();
        tight_long_payload(value, &mut out, &mut flags).unwrap();
        assert_eq!(out.len(), size);

        let mut replay = BitFlagStream::new();
        tight_long_flags(value, &mut replay);
        let mut cursor = Cursor::new(out.as_slice());
        (size, tight_long_decode(&mut cursor, &mut replay).unwrap())
    }

    #[test]
    fn test_tight_long_forms() {
        assert_eq!(tight_long_round_trip(0), (0, 0));
        assert_eq!(tight_long_round_trip(1), (2, 1));
        assert_eq!(tight_long_round_trip(0xFFFF), (2, 0xFFFF));
        assert_eq!(tight_long_round_trip(0x1_0000), (4, 0x1_0000));
        assert_eq!(tight_long_round_trip(0xFFFF_FFFF), (4, 0xFFFF_FFFF));
        assert_eq!(tight_long_round_trip(0x1_0000_0000), (8, 0x1_0000_0000));
        assert_eq!(tight_long_round_trip(i64::MAX), (8, i64::MAX));
        // Negatives have high bits set and take the full form.
        assert_eq!(tight_long_round_trip(-1), (8, -1));
        assert_eq!(tight_long_round_trip(i64::MIN), (8, i64::MIN));
    }

    #[test]
    fn test_tight_string_round_trip() {
        for value in [None, Some(""), Some("orders.eu"), Some("päivää")] {
            let mut flags = BitFlagStream::new();
            let size = tight_string_flags(value, &mut flags).unwrap();
            let mut out = Vec::new();
            tight_string_payload(value, &mut out, &mut flags).unwrap();
            assert_eq!(out.len(), size);

            let mut replay = BitFlagStream::new();
            tight_string_flags(value, &mut replay).unwrap();
            let mut cursor = Cursor::new(out.as_slice());
            let decoded = tight_string_decode(&mut cursor, &mut replay).unwrap();
            assert_eq!(decoded.as_deref(), value);
        }
    }

    #[test]
    fn test_oversized_string_rejected() {
        let big = "x".repeat(u16::MAX as usize + 1);
        let mut flags = BitFlagStream::new();
        assert!(matches!(
            tight_string_flags(Some(&big), &mut flags),
            Err(ErrorKind::MalformedField(_))
        ));
        let mut out = Vec::new();
        assert!(matches!(
            loose_write_string(Some(&big), &mut out),
            Err(ErrorKind::MalformedField(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        // present, length 2, invalid UTF-8 bytes
        let bytes = [1u8, 0, 2, 0xFF, 0xFE];
        let mut cursor = Cursor::new(bytes.as_slice());
        assert!(matches!(
            loose_read_string(&mut cursor),
            Err(ErrorKind::MalformedField(_))
        ));
    }

    #[test]
    fn test_bogus_length_prefix_is_truncated_stream() {
        // present, claims 1000 bytes, provides 2
        let bytes = [1u8, 0, 0, 3, 0xE8, 1, 2];
        let mut cursor = Cursor::new(bytes.as_slice());
        assert!(matches!(
            loose_read_bytes(&mut cursor),
            Err(ErrorKind::TruncatedStream)
        ));
    }

    #[test]
    fn test_loose_round_trips() {
        let mut out = Vec::new();
        loose_write_bool(true, &mut out).unwrap();
        loose_write_long(-42, &mut out).unwrap();
        loose_write_string(Some("adapter"), &mut out).unwrap();
        loose_write_string(None, &mut out).unwrap();
        loose_write_bytes(Some(&[9, 8, 7]), &mut out).unwrap();

        let mut cursor = Cursor::new(out.as_slice());
        assert!(loose_read_bool(&mut cursor).unwrap());
        assert_eq!(loose_read_long(&mut cursor).unwrap(), -42);
        assert_eq!(loose_read_string(&mut cursor).unwrap().as_deref(), Some("adapter"));
        assert_eq!(loose_read_string(&mut cursor).unwrap(), None);
        assert_eq!(loose_read_bytes(&mut cursor).unwrap(), Some(vec![9, 8, 7]));
    }

    #[test]
    fn test_fixed_bytes() {
        let magic = *b"BrkrWire";
        let mut out = Vec::new();
        write_fixed_bytes(&magic, &mut out);
        assert_eq!(out.len(), 8);

        let mut buf = [0u8; 8];
        let mut cursor = Cursor::new(out.as_slice());
        read_fixed_bytes(&mut cursor, &mut buf).unwrap();
        assert_eq!(buf, magic);
    }
}
