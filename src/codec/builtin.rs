//! Codecs for the scalar types every registry knows out of the box.

use uuid::Uuid;

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};

macro_rules! scalar_codec {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $read:ident, $write:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Codec<$ty> for $name {
            #[inline]
            fn read(&self, ctx: &mut ReadContext<'_>) -> Result<$ty, DecodeError> {
                ctx.$read()
            }

            #[inline]
            fn write(&self, value: &$ty, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
                ctx.$write(*value)
            }
        }
    };
}

scalar_codec!(
    /// Signed byte.
    I8Codec, i8, read_i8, write_i8
);
scalar_codec!(
    /// Big-endian 16-bit integer.
    I16Codec, i16, read_i16, write_i16
);
scalar_codec!(
    /// Big-endian 32-bit integer.
    I32Codec, i32, read_i32, write_i32
);
scalar_codec!(
    /// Big-endian 64-bit integer.
    I64Codec, i64, read_i64, write_i64
);
scalar_codec!(
    /// Big-endian IEEE-754 single.
    F32Codec, f32, read_f32, write_f32
);
scalar_codec!(
    /// Big-endian IEEE-754 double.
    F64Codec, f64, read_f64, write_f64
);
scalar_codec!(
    /// One byte, `1` or `0`.
    BoolCodec, bool, read_bool, write_bool
);
scalar_codec!(
    /// One 16-bit code unit.
    CharCodec, char, read_char, write_char
);

/// A non-null string with a 32-bit length prefix.
///
/// Reading the null sentinel fails with [`DecodeError::UnexpectedNull`];
/// use [`NullableStringCodec`] for fields that may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<String, DecodeError> {
        ctx.read_string()?.ok_or(DecodeError::UnexpectedNull {
            type_name: "String",
        })
    }

    fn write(&self, value: &String, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_str(value)
    }
}

/// A string that may be null, encoded with the `-1` length sentinel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullableStringCodec;

impl Codec<Option<String>> for NullableStringCodec {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Option<String>, DecodeError> {
        ctx.read_string()
    }

    fn write(&self, value: &Option<String>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_string(value.as_deref())
    }
}

/// A UUID as two big-endian 64-bit halves, most significant first.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl Codec<Uuid> for UuidCodec {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Uuid, DecodeError> {
        let high = ctx.read_i64()? as u64;
        let low = ctx.read_i64()? as u64;
        Ok(Uuid::from_u64_pair(high, low))
    }

    fn write(&self, value: &Uuid, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        let (high, low) = value.as_u64_pair();
        ctx.write_i64(high as i64)?;
        ctx.write_i64(low as i64)
    }
}
