//! Wire primitives: the fixed-width and length-prefixed encodings every
//! codec is ultimately built from.
//!
//! # Wire format
//!
//! | Rust type          | Encoding                                          |
//! |--------------------|---------------------------------------------------|
//! | `u8` / `i8`        | 1 byte                                            |
//! | `u16` / `i16`      | 2 bytes, big-endian                               |
//! | `u32` / `i32`      | 4 bytes, big-endian                               |
//! | `u64` / `i64`      | 8 bytes, big-endian                               |
//! | `f32` / `f64`      | IEEE-754 bits, big-endian                         |
//! | `bool`             | 1 byte (`0x00` = false, `0x01` = true)            |
//! | string             | `[len][utf-8 bytes]`, `len = -1` null, `0` empty  |
//!
//! String lengths are signed and come in three widths ([`PrefixWidth`]):
//! the default 32-bit prefix and the narrower 16-bit and 8-bit prefixes
//! for space-constrained fields. All three share the null/empty sentinels.
//!
//! All multi-byte values are **big-endian**, the byte order of the classic
//! data-stream convention, so payloads are portable across hosts.


use std::io::{Read, Write};

use crate::error::{DecodeError, EncodeError};

// ------------------------------------------------------------------------------------------------
// Fixed-width primitives
// ------------------------------------------------------------------------------------------------

/// A fixed-width value with a big-endian wire representation.
pub trait Primitive: Sized + Copy {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Write `self` to `out`.
    fn put<W: Write + ?Sized>(self, out: &mut W) -> Result<(), EncodeError>;

    /// Read one value from `input`.
    fn take<R: Read + ?Sized>(input: &mut R) -> Result<Self, DecodeError>;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put<W: Write + ?Sized>(self, out: &mut W) -> Result<(), EncodeError> {
                    out.write_all(&self.to_be_bytes())?;
                    Ok(())
                }

                #[inline]
                fn take<R: Read + ?Sized>(input: &mut R) -> Result<Self, DecodeError> {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    input.read_exact(&mut bytes)?;
                    Ok(<$ty>::from_be_bytes(bytes))
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

// ------------------------------------------------------------------------------------------------
// Booleans
// ------------------------------------------------------------------------------------------------

/// Write a boolean as a single byte.
#[inline]
pub fn write_bool<W: Write + ?Sized>(out: &mut W, value: bool) -> Result<(), EncodeError> {
    u8::from(value).put(out)
}

/// Read a boolean, rejecting any byte other than `0` or `1`.
#[inline]
pub fn read_bool<R: Read + ?Sized>(input: &mut R) -> Result<bool, DecodeError> {
    match u8::take(input)? {
        0 => Ok(false),
        1 => Ok(true),
        got => Err(DecodeError::InvalidBooleanTag { got }),
    }
}

// ------------------------------------------------------------------------------------------------
// Strings
// ------------------------------------------------------------------------------------------------

/// Length-prefix width of an encoded string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixWidth {
    /// Signed 8-bit prefix, at most 127 bytes.
    Byte,
    /// Signed 16-bit prefix, at most 32 767 bytes.
    Short,
    /// Signed 32-bit prefix (the default).
    Int,
}

impl PrefixWidth {
    /// Largest byte length the prefix can carry.
    pub const fn max_len(self) -> usize {
        match self {
            PrefixWidth::Byte => i8::MAX as usize,
            PrefixWidth::Short => i16::MAX as usize,
            PrefixWidth::Int => i32::MAX as usize,
        }
    }

    fn write_len<W: Write + ?Sized>(self, out: &mut W, len: i32) -> Result<(), EncodeError> {
        // `len` is either -1, 0 or already checked against `max_len`.
        match self {
            PrefixWidth::Byte => (len as i8).put(out),
            PrefixWidth::Short => (len as i16).put(out),
            PrefixWidth::Int => len.put(out),
        }
    }

    fn read_len<R: Read + ?Sized>(self, input: &mut R) -> Result<i32, DecodeError> {
        Ok(match self {
            PrefixWidth::Byte => i32::from(i8::take(input)?),
            PrefixWidth::Short => i32::from(i16::take(input)?),
            PrefixWidth::Int => i32::take(input)?,
        })
    }
}

/// Write an optional string: `-1` for `None`, `0` for `""`, otherwise the
/// UTF-8 byte length followed by the bytes.
///
/// Fails with [`EncodeError::StringTooLong`] if the UTF-8 length does not
/// fit the prefix width.
pub fn write_string<W: Write + ?Sized>(
    out: &mut W,
    value: Option<&str>,
    width: PrefixWidth,
) -> Result<(), EncodeError> {
    let Some(s) = value else {
        return width.write_len(out, -1);
    };
    if s.is_empty() {
        return width.write_len(out, 0);
    }

    let bytes = s.as_bytes();
    if bytes.len() > width.max_len() {
        return Err(EncodeError::StringTooLong {
            len: bytes.len(),
            max: width.max_len(),
        });
    }
    width.write_len(out, bytes.len() as i32)?;
    out.write_all(bytes)?;
    Ok(())
}

/// Read an optional string written by [`write_string`] with the same width.
///
/// A declared length above `max_len` fails with
/// [`DecodeError::LengthOverflow`] before any allocation; a stream shorter
/// than the declared length fails with [`DecodeError::UnexpectedEndOfStream`].
pub fn read_string<R: Read + ?Sized>(
    input: &mut R,
    width: PrefixWidth,
    max_len: u32,
) -> Result<Option<String>, DecodeError> {
    let len = width.read_len(input)?;
    match len {
        -1 => return Ok(None),
        0 => return Ok(Some(String::new())),
        n if n < 0 => return Err(DecodeError::NegativeSize(n)),
        _ => {}
    }

    let len = len as u32;
    if len > max_len {
        return Err(DecodeError::LengthOverflow {
            len: u64::from(len),
            max: max_len,
        });
    }
    let bytes = read_bytes(input, len as usize)?;
    Ok(Some(String::from_utf8(bytes)?))
}

// ------------------------------------------------------------------------------------------------
// Raw bytes
// ------------------------------------------------------------------------------------------------

/// Read exactly `len` raw bytes.
///
/// The buffer grows with the bytes actually read, not with `len`.
pub fn read_bytes<R: Read + ?Sized>(input: &mut R, len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::with_capacity(len.min(8 * 1024));
    let read = Read::take(&mut *input, len as u64).read_to_end(&mut buf)?;
    if read < len {
        return Err(DecodeError::UnexpectedEndOfStream);
    }
    Ok(buf)
}
