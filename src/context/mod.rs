//! Read and write contexts.
//!
//! A context is created for one top-level encode or decode, wraps exactly
//! one byte source or sink for its lifetime, and borrows the shared
//! [`Registry`]. Codecs receive the context and use it for everything:
//! the wire primitives, dispatch of nested objects through the registry,
//! and the [`SideData`] bank used to pass out-of-band state between nested
//! codec calls.
//!
//! Contexts are not `Sync`: a context is single-threaded
//! state. Run independent operations on separate threads with separate
//! contexts over a shared `&Registry`.

#[cfg(test)]
mod tests;

mod side_data;

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::io::{Read, Write};

use tracing::{trace, warn};

use crate::codec::enums::{read_ordinal, write_ordinal};
use crate::codec::{OrdinalEnum, TypeKey};
use crate::config::RegistryConfig;
use crate::error::{DecodeError, EncodeError};
use crate::registry::Registry;
use crate::wire::{self, PrefixWidth, Primitive};

pub use side_data::SideData;

// ------------------------------------------------------------------------------------------------
// WriteContext
// ------------------------------------------------------------------------------------------------

/// Encoding state for one top-level write.
pub struct WriteContext<'a> {
    registry: &'a Registry,
    out: &'a mut dyn Write,
    data: SideData,
}

impl<'a> WriteContext<'a> {
    /// Creates a context writing to `out` and dispatching through `registry`.
    pub fn new(registry: &'a Registry, out: &'a mut dyn Write) -> Self {
        Self {
            registry,
            out,
            data: SideData::new(),
        }
    }

    /// The registry this context dispatches through.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The underlying sink, for codecs that emit raw bytes.
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// Side data shared by the codecs of this write.
    pub fn data(&self) -> &SideData {
        &self.data
    }

    /// Mutable side data shared by the codecs of this write.
    pub fn data_mut(&mut self) -> &mut SideData {
        &mut self.data
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<(), EncodeError> {
        self.out.flush()?;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Primitives
    // --------------------------------------------------------------------------------------------

    /// Writes one unsigned byte.
    pub fn write_u8(&mut self, v: u8) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes one signed byte.
    pub fn write_i8(&mut self, v: i8) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `u16`.
    pub fn write_u16(&mut self, v: u16) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `i16`.
    pub fn write_i16(&mut self, v: i16) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `u32`.
    pub fn write_u32(&mut self, v: u32) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `i32`.
    pub fn write_i32(&mut self, v: i32) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `u64`.
    pub fn write_u64(&mut self, v: u64) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `i64`.
    pub fn write_i64(&mut self, v: i64) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `f32`.
    pub fn write_f32(&mut self, v: f32) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a big-endian `f64`.
    pub fn write_f64(&mut self, v: f64) -> Result<(), EncodeError> {
        v.put(&mut *self.out)
    }

    /// Writes a boolean as `1` or `0`.
    pub fn write_bool(&mut self, v: bool) -> Result<(), EncodeError> {
        wire::write_bool(&mut *self.out, v)
    }

    /// Writes a boolean and hands it back, for `if ctx.write_and_return_bool(x)? { … }`.
    pub fn write_and_return_bool(&mut self, v: bool) -> Result<bool, EncodeError> {
        self.write_bool(v)?;
        Ok(v)
    }

    /// Writes a character as one big-endian 16-bit code unit.
    pub fn write_char(&mut self, v: char) -> Result<(), EncodeError> {
        let unit = u16::try_from(u32::from(v)).map_err(|_| EncodeError::CharOutOfRange(v.into()))?;
        unit.put(&mut *self.out)
    }

    /// Writes raw bytes with no prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Strings
    // --------------------------------------------------------------------------------------------

    /// Writes a nullable string with a 32-bit prefix.
    pub fn write_string(&mut self, s: Option<&str>) -> Result<(), EncodeError> {
        wire::write_string(&mut *self.out, s, PrefixWidth::Int)
    }

    /// Writes a non-null string with a 32-bit prefix.
    pub fn write_str(&mut self, s: &str) -> Result<(), EncodeError> {
        self.write_string(Some(s))
    }

    /// Writes a nullable string with a 16-bit prefix (at most 32 767 bytes).
    pub fn write_short_string(&mut self, s: Option<&str>) -> Result<(), EncodeError> {
        wire::write_string(&mut *self.out, s, PrefixWidth::Short)
    }

    /// Writes a nullable string with an 8-bit prefix (at most 127 bytes).
    pub fn write_byte_string(&mut self, s: Option<&str>) -> Result<(), EncodeError> {
        wire::write_string(&mut *self.out, s, PrefixWidth::Byte)
    }

    // --------------------------------------------------------------------------------------------
    // Registry dispatch
    // --------------------------------------------------------------------------------------------

    /// Writes `value` with the codec resolved for `T` or, failing that,
    /// for the nearest declared ancestor of `T`.
    pub fn write_object<T: Any>(&mut self, value: &T) -> Result<(), EncodeError> {
        self.write_keyed(TypeKey::of::<T>(), value)
    }

    /// Writes a type-erased value, resolving the codec from its runtime type.
    pub fn write_dyn(&mut self, value: &dyn Any) -> Result<(), EncodeError> {
        let key = self.registry.name_key(TypeKey::of_val(value));
        self.write_keyed(key, value)
    }

    fn write_keyed(&mut self, key: TypeKey, value: &dyn Any) -> Result<(), EncodeError> {
        let resolution = self
            .registry
            .resolve_for_write(key)
            .ok_or(EncodeError::NoCodec {
                type_name: key.name(),
            })?;
        resolution.write(value, self)
    }

    /// Writes an enum's declaration-order ordinal as an `i16`.
    pub fn write_enum<E: OrdinalEnum>(&mut self, value: &E) -> Result<(), EncodeError> {
        write_ordinal(value, self)
    }

    /// Writes a collection count as an `i32`.
    pub fn write_count(&mut self, len: usize) -> Result<(), EncodeError> {
        let count = i32::try_from(len).map_err(|_| EncodeError::LengthOverflow(len))?;
        self.write_i32(count)
    }

    /// Writes a homogeneous list: the element codec is resolved once for `T`.
    pub fn write_list<T: Any>(&mut self, items: &[T]) -> Result<(), EncodeError> {
        let key = TypeKey::of::<T>();
        let resolution = self
            .registry
            .resolve_for_write(key)
            .ok_or(EncodeError::NoCodec {
                type_name: key.name(),
            })?;

        self.write_count(items.len())?;
        for (index, item) in items.iter().enumerate() {
            resolution
                .write(item, self)
                .map_err(|e| EncodeError::ListElement {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Writes a list that may be null: `None` is the count `-1`.
    pub fn write_nullable_list<T: Any>(&mut self, items: Option<&[T]>) -> Result<(), EncodeError> {
        match items {
            Some(items) => self.write_list(items),
            None => self.write_i32(-1),
        }
    }

    /// Writes a heterogeneous collection: every element resolves its own
    /// codec from its runtime type and must find one.
    ///
    /// Nothing on the wire records which codec was used, so reading this
    /// back with [`ReadContext::read_list`] is only lossless when every
    /// element has the declared element type.
    pub fn write_collection<'v, I>(&mut self, items: I) -> Result<(), EncodeError>
    where
        I: IntoIterator<Item = &'v dyn Any>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        self.write_count(items.len())?;
        for (index, item) in items.enumerate() {
            self.write_dyn(item).map_err(|e| EncodeError::ListElement {
                index,
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    /// Writes a typed map: `[i32 count][key value]…`.
    pub fn write_map<'v, K, V, I>(&mut self, entries: I) -> Result<(), EncodeError>
    where
        K: Any,
        V: Any,
        I: IntoIterator<Item = (&'v K, &'v V)>,
        I::IntoIter: ExactSizeIterator,
    {
        let entries = entries.into_iter();
        self.write_count(entries.len())?;
        for (index, (key, value)) in entries.enumerate() {
            self.write_object(key)
                .and_then(|()| self.write_object(value))
                .map_err(|e| EncodeError::MapEntry {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Writes a heterogeneous map: every key and value resolves its own
    /// codec from its runtime type.
    pub fn write_dyn_map<'v, I>(&mut self, entries: I) -> Result<(), EncodeError>
    where
        I: IntoIterator<Item = (&'v dyn Any, &'v dyn Any)>,
        I::IntoIter: ExactSizeIterator,
    {
        let entries = entries.into_iter();
        self.write_count(entries.len())?;
        for (index, (key, value)) in entries.enumerate() {
            self.write_dyn(key)
                .and_then(|()| self.write_dyn(value))
                .map_err(|e| EncodeError::MapEntry {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// ReadContext
// ------------------------------------------------------------------------------------------------

/// Decoding state for one top-level read.
pub struct ReadContext<'a> {
    registry: &'a Registry,
    input: &'a mut dyn Read,
    data: SideData,
    limits: RegistryConfig,
    depth: u32,
}

impl<'a> ReadContext<'a> {
    /// Creates a context reading from `input` and dispatching through `registry`.
    pub fn new(registry: &'a Registry, input: &'a mut dyn Read) -> Self {
        Self {
            registry,
            input,
            data: SideData::new(),
            limits: registry.config().clone(),
            depth: 0,
        }
    }

    /// The registry this context dispatches through.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The underlying source, for codecs that consume raw bytes.
    pub fn input(&mut self) -> &mut dyn Read {
        &mut *self.input
    }

    /// Side data shared by the codecs of this read.
    pub fn data(&self) -> &SideData {
        &self.data
    }

    /// Mutable side data shared by the codecs of this read.
    pub fn data_mut(&mut self) -> &mut SideData {
        &mut self.data
    }

    // --------------------------------------------------------------------------------------------
    // Primitives
    // --------------------------------------------------------------------------------------------

    /// Reads one unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        u8::take(&mut *self.input)
    }

    /// Reads one signed byte.
    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        i8::take(&mut *self.input)
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        u16::take(&mut *self.input)
    }

    /// Reads a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        i16::take(&mut *self.input)
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        u32::take(&mut *self.input)
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        i32::take(&mut *self.input)
    }

    /// Reads a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        u64::take(&mut *self.input)
    }

    /// Reads a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        i64::take(&mut *self.input)
    }

    /// Reads a big-endian `f32`.
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        f32::take(&mut *self.input)
    }

    /// Reads a big-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        f64::take(&mut *self.input)
    }

    /// Reads a boolean; any byte other than `0` or `1` is an error.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        wire::read_bool(&mut *self.input)
    }

    /// Reads one 16-bit code unit as a character.
    pub fn read_char(&mut self) -> Result<char, DecodeError> {
        let got = self.read_u16()?;
        char::from_u32(u32::from(got)).ok_or(DecodeError::InvalidChar { got })
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        wire::read_bytes(&mut *self.input, len)
    }

    // --------------------------------------------------------------------------------------------
    // Strings
    // --------------------------------------------------------------------------------------------

    /// Reads a nullable string with a 32-bit prefix.
    pub fn read_string(&mut self) -> Result<Option<String>, DecodeError> {
        wire::read_string(&mut *self.input, PrefixWidth::Int, self.limits.max_string_len)
    }

    /// Reads a nullable string with a 16-bit prefix.
    pub fn read_short_string(&mut self) -> Result<Option<String>, DecodeError> {
        wire::read_string(&mut *self.input, PrefixWidth::Short, self.limits.max_string_len)
    }

    /// Reads a nullable string with an 8-bit prefix.
    pub fn read_byte_string(&mut self) -> Result<Option<String>, DecodeError> {
        wire::read_string(&mut *self.input, PrefixWidth::Byte, self.limits.max_string_len)
    }

    // --------------------------------------------------------------------------------------------
    // Registry dispatch
    // --------------------------------------------------------------------------------------------

    /// Reads a `T` with the codec registered for exactly `T`.
    ///
    /// Each call counts as one nesting level against `max_depth`.
    pub fn read_object<T: Any>(&mut self) -> Result<T, DecodeError> {
        let codec = self
            .registry
            .resolve_for_read::<T>()
            .ok_or(DecodeError::NoCodec {
                type_name: std::any::type_name::<T>(),
            })?;
        self.nested(|ctx| codec.read(ctx))
    }

    /// Runs `read` one nesting level deeper.
    ///
    /// Fails with [`DecodeError::DepthExceeded`] before running `read` when
    /// the context is already at the configured `max_depth`. Codecs that
    /// recurse into themselves without going through
    /// [`read_object`](Self::read_object) wrap each level in this.
    pub fn nested<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let max = self.limits.max_depth;
        if self.depth >= max {
            warn!(max, "nesting depth exceeded");
            return Err(DecodeError::DepthExceeded { max });
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    /// Current nesting level; `0` outside any nested read.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Reads an enum ordinal; no registration needed.
    pub fn read_enum<E: OrdinalEnum>(&mut self) -> Result<E, DecodeError> {
        read_ordinal(self)
    }

    /// Reads a collection count, rejecting negative counts and counts above
    /// the configured limit.
    pub fn read_count(&mut self) -> Result<usize, DecodeError> {
        let count = self.read_i32()?;
        self.check_count(count)
    }

    fn check_count(&self, count: i32) -> Result<usize, DecodeError> {
        if count < 0 {
            return Err(DecodeError::NegativeSize(count));
        }
        let max = self.limits.max_collection_len;
        if count as u32 > max {
            return Err(DecodeError::LengthOverflow {
                len: count as u64,
                max,
            });
        }
        Ok(count as usize)
    }

    /// Reads a list whose elements all use the codec registered for `T`.
    pub fn read_list<T: Any>(&mut self) -> Result<Vec<T>, DecodeError> {
        let count = self.read_count_for::<T>()?;
        self.read_elements::<T>(count)
    }

    /// Reads a list that may be null: the count `-1` yields `None`.
    pub fn read_nullable_list<T: Any>(&mut self) -> Result<Option<Vec<T>>, DecodeError> {
        let codec_known = self.registry.resolve_for_read::<T>().is_some();
        let count = self.read_i32()?;
        if count == -1 {
            return Ok(None);
        }
        if !codec_known {
            return Err(DecodeError::NoCodec {
                type_name: std::any::type_name::<T>(),
            });
        }
        let count = self.check_count(count)?;
        self.read_elements::<T>(count).map(Some)
    }

    /// Reads a list encoding into a set.
    pub fn read_set<T: Any + Eq + Hash>(&mut self) -> Result<HashSet<T>, DecodeError> {
        Ok(self.read_list::<T>()?.into_iter().collect())
    }

    /// Reads a map whose keys use `K`'s codec and values use `V`'s codec.
    pub fn read_map<K: Any + Eq + Hash, V: Any>(&mut self) -> Result<HashMap<K, V>, DecodeError> {
        let key_codec = self
            .registry
            .resolve_for_read::<K>()
            .ok_or(DecodeError::NoCodec {
                type_name: std::any::type_name::<K>(),
            })?;
        let value_codec = self
            .registry
            .resolve_for_read::<V>()
            .ok_or(DecodeError::NoCodec {
                type_name: std::any::type_name::<V>(),
            })?;

        let count = self.read_count()?;
        trace!(count, "reading map");
        let mut map = HashMap::with_capacity(count.min(1024));
        for index in 0..count {
            let key = key_codec.read(self).map_err(|e| DecodeError::MapEntry {
                index,
                source: Box::new(e),
            })?;
            let value = value_codec.read(self).map_err(|e| DecodeError::MapEntry {
                index,
                source: Box::new(e),
            })?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Fails with `NoCodec` before consuming anything if `T` is unknown,
    /// then reads the count.
    fn read_count_for<T: Any>(&mut self) -> Result<usize, DecodeError> {
        if self.registry.resolve_for_read::<T>().is_none() {
            return Err(DecodeError::NoCodec {
                type_name: std::any::type_name::<T>(),
            });
        }
        self.read_count()
    }

    fn read_elements<T: Any>(&mut self, count: usize) -> Result<Vec<T>, DecodeError> {
        let codec = self
            .registry
            .resolve_for_read::<T>()
            .ok_or(DecodeError::NoCodec {
                type_name: std::any::type_name::<T>(),
            })?;
        trace!(count, element = std::any::type_name::<T>(), "reading list");

        let mut items = Vec::with_capacity(count.min(1024));
        for index in 0..count {
            let item = codec.read(self).map_err(|e| DecodeError::ListElement {
                index,
                source: Box::new(e),
            })?;
            items.push(item);
        }
        Ok(items)
    }
}
