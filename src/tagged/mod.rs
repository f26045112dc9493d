//! Tagged-union codec.
//!
//! An [`IdCodec<T>`] serializes a value whose static type `T` stands for
//! several concrete variant types. Each variant is registered with a small
//! integer tag and its own codec; the wire form is
//!
//! ```text
//! [tag: 8/16/32-bit][variant payload]
//! ```
//!
//! A value of an unregistered variant is written with the fallback codec
//! and the reserved tag `-1`. Reading a tag nobody claimed also goes to the
//! fallback, so a fallback codec must be able to read whatever it writes
//! without help from the tag.
//!
//! `T` exposes its concrete variant through [`Polymorphic`]. The usual
//! shape is an enum with one payload type per variant:
//!
//! ```rust
//! use std::any::Any;
//!
//! use binio::codec::builtin::{I32Codec, StringCodec};
//! use binio::{IdCodec, Polymorphic};
//!
//! #[derive(Debug, PartialEq)]
//! enum Field {
//!     Text(String),
//!     Number(i32),
//! }
//!
//! impl Polymorphic for Field {
//!     fn concrete(&self) -> &dyn Any {
//!         match self {
//!             Field::Text(s) => s,
//!             Field::Number(n) => n,
//!         }
//!     }
//! }
//!
//! let codec = IdCodec::<Field>::builder()
//!     .variant(0, StringCodec, Field::Text)
//!     .variant(1, I32Codec, Field::Number)
//!     .build()
//!     .unwrap();
//! let bytes = binio::encode_to_vec(&binio::Registry::new(), &codec, &Field::Number(7)).unwrap();
//! assert_eq!(bytes, [1, 0, 0, 0, 7]);
//! ```

#[cfg(test)]
mod tests;

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::codec::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{BuildError, DecodeError, EncodeError};

/// Tag written in front of a value handled by the fallback codec.
pub const FALLBACK_TAG: i32 = -1;

// ------------------------------------------------------------------------------------------------
// Token width
// ------------------------------------------------------------------------------------------------

/// Width of the tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenWidth {
    /// Signed 8-bit tag.
    #[default]
    Byte,
    /// Signed 16-bit tag.
    Short,
    /// Signed 32-bit tag.
    Int,
}

impl TokenWidth {
    /// Largest tag this width can carry.
    pub fn max_tag(self) -> i32 {
        match self {
            TokenWidth::Byte => i32::from(i8::MAX),
            TokenWidth::Short => i32::from(i16::MAX),
            TokenWidth::Int => i32::MAX,
        }
    }

    /// Writes `tag`, which must fit the width.
    pub fn write(self, tag: i32, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        match self {
            // Builders reject tags that do not fit, and -1 fits every width.
            TokenWidth::Byte => ctx.write_i8(tag as i8),
            TokenWidth::Short => ctx.write_i16(tag as i16),
            TokenWidth::Int => ctx.write_i32(tag),
        }
    }

    /// Reads a tag, sign-extended to `i32`.
    pub fn read(self, ctx: &mut ReadContext<'_>) -> Result<i32, DecodeError> {
        Ok(match self {
            TokenWidth::Byte => i32::from(ctx.read_i8()?),
            TokenWidth::Short => i32::from(ctx.read_i16()?),
            TokenWidth::Int => ctx.read_i32()?,
        })
    }
}

impl fmt::Display for TokenWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenWidth::Byte => "byte",
            TokenWidth::Short => "short",
            TokenWidth::Int => "int",
        };
        f.write_str(name)
    }
}

// ------------------------------------------------------------------------------------------------
// Polymorphic values
// ------------------------------------------------------------------------------------------------

/// A value that stands for one of several concrete types.
pub trait Polymorphic: Any {
    /// The concrete variant value; its type selects the tag.
    fn concrete(&self) -> &dyn Any;
}

impl Polymorphic for Box<dyn Any + Send + Sync> {
    fn concrete(&self) -> &dyn Any {
        &**self
    }
}

// ------------------------------------------------------------------------------------------------
// IdCodec
// ------------------------------------------------------------------------------------------------

/// One registered variant, erased over its payload type.
trait VariantCodec<T>: Send + Sync {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<T, DecodeError>;
    fn write(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError>;
}

struct Typed<V, W> {
    codec: Arc<dyn Codec<V>>,
    wrap: W,
}

impl<T, V, W> VariantCodec<T> for Typed<V, W>
where
    V: Any,
    W: Fn(V) -> T + Send + Sync,
{
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<T, DecodeError> {
        self.codec.read(ctx).map(&self.wrap)
    }

    fn write(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        let value = value.downcast_ref::<V>().ok_or(EncodeError::TypeMismatch {
            expected: type_name::<V>(),
        })?;
        self.codec.write(value, ctx)
    }
}

struct Variant<T> {
    tag: i32,
    type_name: &'static str,
    codec: Box<dyn VariantCodec<T>>,
}

/// Codec for a closed family of variant types, discriminated by a tag.
pub struct IdCodec<T> {
    width: TokenWidth,
    variants: Vec<Variant<T>>,
    by_tag: HashMap<i32, usize>,
    by_type: HashMap<TypeId, usize>,
    fallback: Option<Arc<dyn Codec<T>>>,
}

impl<T: Polymorphic> IdCodec<T> {
    /// Starts a builder with 8-bit tags and no fallback.
    pub fn builder() -> IdCodecBuilder<T> {
        IdCodecBuilder {
            width: TokenWidth::default(),
            variants: Vec::new(),
            fallback: None,
        }
    }

    /// Tag width on the wire.
    pub fn token_width(&self) -> TokenWidth {
        self.width
    }

    /// Tag registered for values whose concrete type is `V`.
    pub fn tag_of<V: Any>(&self) -> Option<i32> {
        self.by_type
            .get(&TypeId::of::<V>())
            .map(|&index| self.variants[index].tag)
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = i32> + '_ {
        self.variants.iter().map(|variant| variant.tag)
    }

    /// Whether a fallback codec is configured.
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

impl<T: Polymorphic> Codec<T> for IdCodec<T> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<T, DecodeError> {
        let tag = self.width.read(ctx)?;
        let result = match self.by_tag.get(&tag) {
            Some(&index) => {
                trace!(tag, variant = self.variants[index].type_name, "reading variant");
                self.variants[index].codec.read(ctx)
            }
            None => match &self.fallback {
                Some(fallback) => {
                    trace!(tag, "reading with fallback codec");
                    fallback.read(ctx)
                }
                None => return Err(DecodeError::UnknownTag { tag }),
            },
        };
        result.map_err(|e| DecodeError::Variant {
            tag,
            source: Box::new(e),
        })
    }

    fn write(&self, value: &T, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        let concrete = value.concrete();
        let (tag, result) = match self.by_type.get(&concrete.type_id()) {
            Some(&index) => {
                let variant = &self.variants[index];
                trace!(tag = variant.tag, variant = variant.type_name, "writing variant");
                self.width.write(variant.tag, ctx)?;
                (variant.tag, variant.codec.write(concrete, ctx))
            }
            None => {
                let fallback = self.fallback.as_ref().ok_or(EncodeError::NoFallback {
                    type_name: type_name::<T>(),
                })?;
                trace!("writing with fallback codec");
                self.width.write(FALLBACK_TAG, ctx)?;
                (FALLBACK_TAG, fallback.write(value, ctx))
            }
        };
        result.map_err(|e| EncodeError::Variant {
            tag,
            source: Box::new(e),
        })
    }
}

impl<T> fmt::Debug for IdCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdCodec")
            .field("width", &self.width)
            .field(
                "variants",
                &self
                    .variants
                    .iter()
                    .map(|v| (v.tag, v.type_name))
                    .collect::<Vec<_>>(),
            )
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

// ------------------------------------------------------------------------------------------------
// Builder
// ------------------------------------------------------------------------------------------------

/// Collects variants for an [`IdCodec`]; all checks run in
/// [`build`](IdCodecBuilder::build).
pub struct IdCodecBuilder<T> {
    width: TokenWidth,
    variants: Vec<(i32, TypeId, Variant<T>)>,
    fallback: Option<Arc<dyn Codec<T>>>,
}

impl<T: Polymorphic> IdCodecBuilder<T> {
    /// Registers variant type `V` under `tag`. Decoded payloads are turned
    /// into a `T` with `wrap`.
    pub fn variant<V, C, W>(mut self, tag: i32, codec: C, wrap: W) -> Self
    where
        V: Any,
        C: Codec<V> + 'static,
        W: Fn(V) -> T + Send + Sync + 'static,
    {
        self.variants.push((
            tag,
            TypeId::of::<V>(),
            Variant {
                tag,
                type_name: type_name::<V>(),
                codec: Box::new(Typed {
                    codec: Arc::new(codec) as Arc<dyn Codec<V>>,
                    wrap,
                }),
            },
        ));
        self
    }

    /// Codec for values of unregistered variant types and for unknown tags.
    pub fn fallback(mut self, codec: impl Codec<T> + 'static) -> Self {
        self.fallback = Some(Arc::new(codec));
        self
    }

    /// Tag width; defaults to [`TokenWidth::Byte`].
    pub fn token_width(mut self, width: TokenWidth) -> Self {
        self.width = width;
        self
    }

    /// Validates the variants and builds the codec.
    ///
    /// # Errors
    ///
    /// - [`BuildError::ReservedTag`] for tag `-1`
    /// - [`BuildError::NegativeTag`] for any other negative tag
    /// - [`BuildError::TagOutOfRange`] if the tag does not fit the width
    /// - [`BuildError::DuplicateTag`] / [`BuildError::DuplicateType`]
    pub fn build(self) -> Result<IdCodec<T>, BuildError> {
        let mut by_tag = HashMap::with_capacity(self.variants.len());
        let mut by_type = HashMap::with_capacity(self.variants.len());
        let mut variants = Vec::with_capacity(self.variants.len());

        for (index, (tag, type_id, variant)) in self.variants.into_iter().enumerate() {
            if tag == FALLBACK_TAG {
                return Err(BuildError::ReservedTag);
            }
            if tag < 0 {
                return Err(BuildError::NegativeTag(tag));
            }
            if tag > self.width.max_tag() {
                return Err(BuildError::TagOutOfRange {
                    tag,
                    width: self.width,
                });
            }
            if by_tag.insert(tag, index).is_some() {
                return Err(BuildError::DuplicateTag(tag));
            }
            if by_type.insert(type_id, index).is_some() {
                return Err(BuildError::DuplicateType {
                    type_name: variant.type_name,
                });
            }
            variants.push(variant);
        }

        Ok(IdCodec {
            width: self.width,
            variants,
            by_tag,
            by_type,
            fallback: self.fallback,
        })
    }
}

impl IdCodecBuilder<Box<dyn Any + Send + Sync>> {
    /// Registers `V` under `tag` for a codec over boxed values.
    pub fn boxed<V>(self, tag: i32, codec: impl Codec<V> + 'static) -> Self
    where
        V: Any + Send + Sync,
    {
        self.variant(tag, codec, |value: V| Box::new(value) as Box<dyn Any + Send + Sync>)
    }
}
