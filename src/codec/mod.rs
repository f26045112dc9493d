//! The codec contract and the codecs that ship with the framework.
//!
//! A [`Codec<T>`] knows how to write one logical type `T` to a
//! [`WriteContext`] and read it back from a [`ReadContext`]. There is no
//! schema: the wire format of `T` is exactly the sequence of context calls
//! its codec makes, so `read` must mirror `write` call for call.
//!
//! Codecs are stateless by convention and shared as `Arc<dyn Codec<T>>`,
//! which is why the trait requires `Send + Sync`.
//!
//! ```rust
//! use binio::{Codec, DecodeError, EncodeError, ReadContext, WriteContext};
//!
//! struct Rgb {
//!     r: i16,
//!     g: i16,
//!     b: i16,
//! }
//!
//! struct RgbCodec;
//!
//! impl Codec<Rgb> for RgbCodec {
//!     fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Rgb, DecodeError> {
//!         Ok(Rgb {
//!             r: ctx.read_i16()?,
//!             g: ctx.read_i16()?,
//!             b: ctx.read_i16()?,
//!         })
//!     }
//!
//!     fn write(&self, value: &Rgb, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
//!         ctx.write_i16(value.r)?;
//!         ctx.write_i16(value.g)?;
//!         ctx.write_i16(value.b)
//!     }
//! }
//! ```

#[cfg(test)]
mod tests;

pub mod builtin;
pub mod collections;
pub mod enums;
pub mod value;

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};

pub use collections::{ListCodec, MapCodec, SetCodec, VecCodec};
pub use enums::{EnumCodec, OrdinalEnum};
pub use value::{Value, ValueCodec};

// ------------------------------------------------------------------------------------------------
// Codec trait
// ------------------------------------------------------------------------------------------------

/// Reads and writes one logical type.
pub trait Codec<T>: Send + Sync {
    /// Decode one `T` from the context.
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<T, DecodeError>;

    /// Encode `value` into the context.
    fn write(&self, value: &T, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError>;
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Arc<C> {
    #[inline]
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<T, DecodeError> {
        (**self).read(ctx)
    }

    #[inline]
    fn write(&self, value: &T, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        (**self).write(value, ctx)
    }
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for Box<C> {
    #[inline]
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<T, DecodeError> {
        (**self).read(ctx)
    }

    #[inline]
    fn write(&self, value: &T, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        (**self).write(value, ctx)
    }
}

// ------------------------------------------------------------------------------------------------
// Type keys
// ------------------------------------------------------------------------------------------------

/// Identifies a logical type in the registry.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for the static type `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Key for the concrete type behind a `&dyn Any`.
    ///
    /// The name of an erased value is not recoverable, so it reads
    /// `"<dynamic>"` until the registry maps the id back to a known name.
    pub fn of_val(value: &dyn Any) -> Self {
        Self {
            id: value.type_id(),
            name: "<dynamic>",
        }
    }

    pub(crate) fn with_name(self, name: &'static str) -> Self {
        Self { id: self.id, name }
    }

    /// The underlying type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
