//! Out-of-band key/value state shared by the codecs of one operation.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::error::DecodeError;

/// String-keyed, type-erased values attached to a context.
///
/// An outer codec stashes state (e.g. the other end of a pair, a shared
/// palette) before delegating to nested codecs, which look it up by key.
/// The bank lives exactly as long as the context it belongs to.
#[derive(Default)]
pub struct SideData {
    entries: HashMap<String, Box<dyn Any>>,
}

impl SideData {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, returning the previous value if any.
    pub fn set<T: Any>(&mut self, key: impl Into<String>, value: T) -> Option<Box<dyn Any>> {
        self.entries.insert(key.into(), Box::new(value))
    }

    /// The value under `key`, if present and of type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// The value under `key` as a `T`, or
    /// [`DecodeError::MissingSideData`] if absent or of another type.
    pub fn require<T: Any>(&self, key: &str) -> Result<&T, DecodeError> {
        self.get(key).ok_or_else(|| DecodeError::MissingSideData {
            key: key.to_owned(),
        })
    }

    /// Mutable access to the value under `key`, if present and of type `T`.
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Box<dyn Any>> {
        self.entries.remove(key)
    }

    /// Removes the value under `key` and downcasts it to `T`.
    ///
    /// A value of another type is left in place.
    pub fn take<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.entries.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.entries
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Whether anything is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the stored keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for SideData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideData")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
