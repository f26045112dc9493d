//! Short-id bank.
//!
//! A [`DataBank<E>`] is a bidirectional map between non-zero `i16` ids and
//! values. Encoders that repeat the same large value many times intern it
//! once with [`DataBank::get_or_insert`] and write the two-byte id instead;
//! the bank itself is serialized alongside with [`DataBankCodec`].
//!
//! ## Id allocation
//!
//! Ids are handed out by a counter that starts at `1`, runs up to
//! `i16::MAX`, continues from `i16::MIN` up to `-1` and is exhausted when
//! it would reach `0`, giving 65 535 ids per bank. Removed ids are not
//! reused. An explicit [`insert`](DataBank::insert) advances the counter
//! past the inserted id, so later allocations never collide with ids
//! restored from a stream.
//!
//! ## Wire format
//!
//! ```text
//! ([id: i16 != 0][element])* [0: i16]
//! ```
//!
//! Entries are written in ascending id order.

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::trace;

use crate::codec::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{BankError, DecodeError, EncodeError};

/// Terminates a serialized bank.
pub const END_OF_BANK: i16 = 0;

/// Counter position one past the last allocatable id.
const EXHAUSTED: u32 = 1 << 16;

/// Position of `id` in allocation order: `1..=32767`, then `-32768..=-1`.
fn position(id: i16) -> u32 {
    if id > 0 {
        id as u32
    } else {
        (i32::from(id) + (1 << 16)) as u32
    }
}

fn id_at(position: u32) -> i16 {
    // Truncation maps 32768..=65535 onto -32768..=-1.
    position as u16 as i16
}

// ------------------------------------------------------------------------------------------------
// DataBank
// ------------------------------------------------------------------------------------------------

/// Bidirectional `i16` id ↔ value map.
#[derive(Clone)]
pub struct DataBank<E> {
    by_id: BTreeMap<i16, E>,
    by_value: HashMap<E, i16>,
    next: u32,
}

impl<E: Eq + Hash + Clone> DataBank<E> {
    /// Creates an empty bank whose first allocated id is `1`.
    pub fn new() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_value: HashMap::new(),
            next: 1,
        }
    }

    /// Id of `value`, inserting it under a fresh id if absent.
    pub fn get_or_insert(&mut self, value: E) -> Result<i16, BankError> {
        if let Some(&id) = self.by_value.get(&value) {
            return Ok(id);
        }
        let id = self.next_id()?;
        self.by_value.insert(value.clone(), id);
        self.by_id.insert(id, value);
        Ok(id)
    }

    /// Stores `value` under `id`.
    ///
    /// # Errors
    ///
    /// - [`BankError::ReservedId`] for id `0`
    /// - [`BankError::DuplicateKey`] if `id` is taken
    /// - [`BankError::DuplicateValue`] if `value` is already stored
    pub fn insert(&mut self, id: i16, value: E) -> Result<(), BankError> {
        if id == END_OF_BANK {
            return Err(BankError::ReservedId { id });
        }
        if self.by_id.contains_key(&id) {
            return Err(BankError::DuplicateKey { id });
        }
        if let Some(&existing) = self.by_value.get(&value) {
            return Err(BankError::DuplicateValue { id: existing });
        }

        self.next = self.next.max(position(id) + 1);
        self.by_value.insert(value.clone(), id);
        self.by_id.insert(id, value);
        Ok(())
    }

    fn next_id(&mut self) -> Result<i16, BankError> {
        if self.next >= EXHAUSTED {
            return Err(BankError::IdSpaceExhausted);
        }
        let id = id_at(self.next);
        self.next += 1;
        Ok(id)
    }

    /// Value stored under `id`.
    pub fn get(&self, id: i16) -> Option<&E> {
        self.by_id.get(&id)
    }

    /// Id of `value`.
    pub fn id_of(&self, value: &E) -> Option<i16> {
        self.by_value.get(value).copied()
    }

    /// Whether an entry is stored under `id`.
    pub fn contains_id(&self, id: i16) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Whether `value` is stored.
    pub fn contains_value(&self, value: &E) -> bool {
        self.by_value.contains_key(value)
    }

    /// Removes the entry under `id`, returning its value.
    pub fn remove_by_key(&mut self, id: i16) -> Option<E> {
        let value = self.by_id.remove(&id)?;
        self.by_value.remove(&value);
        Some(value)
    }

    /// Removes `value`, returning the id it was stored under.
    pub fn remove_by_value(&mut self, value: &E) -> Option<i16> {
        let id = self.by_value.remove(value)?;
        self.by_id.remove(&id);
        Some(id)
    }

    /// Read-only view of every entry, ordered by id.
    pub fn all(&self) -> &BTreeMap<i16, E> {
        &self.by_id
    }

    /// Iterates `(id, value)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (i16, &E)> {
        self.by_id.iter().map(|(&id, value)| (id, value))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the bank holds no entries.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Removes every entry. The id counter keeps its position.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_value.clear();
    }
}

impl<E: Eq + Hash + Clone> Default for DataBank<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Two banks are equal when they hold the same entries; the allocation
/// counter is not compared.
impl<E: PartialEq> PartialEq for DataBank<E> {
    fn eq(&self, other: &Self) -> bool {
        self.by_id == other.by_id
    }
}

impl<E: Eq> Eq for DataBank<E> {}

impl<E: fmt::Debug> fmt::Debug for DataBank<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.by_id.iter()).finish()
    }
}

// ------------------------------------------------------------------------------------------------
// DataBankCodec
// ------------------------------------------------------------------------------------------------

/// Codec for a [`DataBank<E>`], parametrized by the element codec.
pub struct DataBankCodec<E> {
    element: Arc<dyn Codec<E>>,
}

impl<E> DataBankCodec<E> {
    /// Creates a bank codec writing every element with `element`.
    pub fn new(element: impl Codec<E> + 'static) -> Self {
        Self {
            element: Arc::new(element),
        }
    }

    /// Creates a bank codec sharing an existing element codec.
    pub fn from_arc(element: Arc<dyn Codec<E>>) -> Self {
        Self { element }
    }
}

impl<E: Eq + Hash + Clone> Codec<DataBank<E>> for DataBankCodec<E> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<DataBank<E>, DecodeError> {
        let mut bank = DataBank::new();
        loop {
            let id = ctx.read_i16()?;
            if id == END_OF_BANK {
                break;
            }
            let value = self
                .element
                .read(ctx)
                .map_err(|e| DecodeError::ElementFailed {
                    id,
                    source: Box::new(e),
                })?;
            bank.insert(id, value)?;
        }
        trace!(entries = bank.len(), "bank read");
        Ok(bank)
    }

    fn write(&self, bank: &DataBank<E>, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        for (id, value) in bank.iter() {
            ctx.write_i16(id)?;
            self.element
                .write(value, ctx)
                .map_err(|e| EncodeError::ElementFailed {
                    id,
                    source: Box::new(e),
                })?;
        }
        trace!(entries = bank.len(), "bank written");
        ctx.write_i16(END_OF_BANK)
    }
}
