//! Sequence and map codecs.
//!
//! Two flavours exist:
//!
//! - [`ListCodec`] carries its own element codec. Pair it with an
//!   [`IdCodec`](crate::tagged::IdCodec) element codec to round-trip
//!   heterogeneous lists: every element is tagged with its variant.
//! - [`VecCodec`], [`SetCodec`] and [`MapCodec`] resolve element codecs
//!   through the registry of the context they run in. They are what
//!   [`Registry::register_list`](crate::registry::Registry::register_list)
//!   and friends install.
//!
//! Both flavours share the wire layout `[i32 count][elements…]`
//! (maps: `[i32 count][key value]…`).

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};

// ------------------------------------------------------------------------------------------------
// ListCodec
// ------------------------------------------------------------------------------------------------

/// List codec with a fixed element codec.
pub struct ListCodec<T> {
    element: Arc<dyn Codec<T>>,
}

impl<T> ListCodec<T> {
    /// Creates a list codec writing every element with `element`.
    pub fn new(element: impl Codec<T> + 'static) -> Self {
        Self {
            element: Arc::new(element),
        }
    }

    /// Creates a list codec sharing an existing element codec.
    pub fn from_arc(element: Arc<dyn Codec<T>>) -> Self {
        Self { element }
    }
}

impl<T> Codec<Vec<T>> for ListCodec<T> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Vec<T>, DecodeError> {
        let count = ctx.read_count()?;
        let mut items = Vec::with_capacity(count.min(1024));
        for index in 0..count {
            let item = self
                .element
                .read(ctx)
                .map_err(|e| DecodeError::ListElement {
                    index,
                    source: Box::new(e),
                })?;
            items.push(item);
        }
        Ok(items)
    }

    fn write(&self, value: &Vec<T>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_count(value.len())?;
        for (index, item) in value.iter().enumerate() {
            self.element
                .write(item, ctx)
                .map_err(|e| EncodeError::ListElement {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Registry-backed collections
// ------------------------------------------------------------------------------------------------

/// `Vec<T>` codec resolving the element codec through the registry.
pub struct VecCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> VecCodec<T> {
    /// Creates the codec.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for VecCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any> Codec<Vec<T>> for VecCodec<T> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Vec<T>, DecodeError> {
        ctx.read_list::<T>()
    }

    fn write(&self, value: &Vec<T>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_list(value)
    }
}

/// `HashSet<T>` codec; same layout as a list.
pub struct SetCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SetCodec<T> {
    /// Creates the codec.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SetCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Eq + Hash> Codec<HashSet<T>> for SetCodec<T> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<HashSet<T>, DecodeError> {
        ctx.read_set::<T>()
    }

    fn write(&self, value: &HashSet<T>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_collection(value.iter().map(|item| item as &dyn Any))
    }
}

/// `HashMap<K, V>` codec resolving key and value codecs through the registry.
pub struct MapCodec<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MapCodec<K, V> {
    /// Creates the codec.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for MapCodec<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Any + Eq + Hash, V: Any> Codec<HashMap<K, V>> for MapCodec<K, V> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<HashMap<K, V>, DecodeError> {
        ctx.read_map::<K, V>()
    }

    fn write(&self, value: &HashMap<K, V>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_map(value.iter())
    }
}
