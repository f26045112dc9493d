//! Ordinal-based enum encoding.
//!
//! An enum is written as the zero-based index of its variant in declaration
//! order, as a big-endian `i16`. Wire compatibility is therefore bound to
//! declaration order: reordering or inserting variants anywhere but at the
//! end changes the meaning of existing payloads.

use std::marker::PhantomData;

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};

/// A field-less enum with a fixed, ordered list of variants.
///
/// ```rust
/// use binio::OrdinalEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Mode {
///     Survival,
///     Creative,
///     Spectator,
/// }
///
/// impl OrdinalEnum for Mode {
///     const VARIANTS: &'static [Self] = &[Mode::Survival, Mode::Creative, Mode::Spectator];
///
///     fn ordinal(&self) -> usize {
///         *self as usize
///     }
/// }
/// ```
pub trait OrdinalEnum: Copy + Send + Sync + 'static {
    /// Every variant, in declaration order.
    const VARIANTS: &'static [Self];

    /// Position of `self` in [`Self::VARIANTS`].
    fn ordinal(&self) -> usize;

    /// Variant at `ordinal`, if in range.
    fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::VARIANTS.get(ordinal).copied()
    }
}

/// Write `value`'s ordinal as an `i16`.
pub(crate) fn write_ordinal<E: OrdinalEnum>(
    value: &E,
    ctx: &mut WriteContext<'_>,
) -> Result<(), EncodeError> {
    let ordinal = value.ordinal();
    let wire = i16::try_from(ordinal).map_err(|_| EncodeError::OrdinalOverflow(ordinal))?;
    ctx.write_i16(wire)
}

/// Read an `i16` ordinal and map it back to a variant.
pub(crate) fn read_ordinal<E: OrdinalEnum>(ctx: &mut ReadContext<'_>) -> Result<E, DecodeError> {
    let got = ctx.read_i16()?;
    let max = E::VARIANTS.len();
    if got < 0 {
        return Err(DecodeError::InvalidOrdinal { got, max });
    }
    E::from_ordinal(got as usize).ok_or(DecodeError::InvalidOrdinal { got, max })
}

/// Codec for any [`OrdinalEnum`].
pub struct EnumCodec<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> EnumCodec<E> {
    /// Creates the codec.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E> Default for EnumCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: OrdinalEnum> Codec<E> for EnumCodec<E> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<E, DecodeError> {
        read_ordinal(ctx)
    }

    fn write(&self, value: &E, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        write_ordinal(value, ctx)
    }
}
