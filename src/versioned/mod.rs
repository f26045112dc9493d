//! Versioned codec.
//!
//! A [`VersionedCodec<T>`] keeps one codec per schema version of `T`. Every
//! value is written as
//!
//! ```text
//! [version: i32][payload written by that version's codec]
//! ```
//!
//! Reads dispatch on the stored version, so data written by any registered
//! version stays readable after the write version moves on. The write
//! version is mutable at runtime and scoped to the codec instance.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use tracing::{debug, trace};

use crate::codec::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{BuildError, DecodeError, EncodeError};

/// Codec that prefixes each value with its schema version.
pub struct VersionedCodec<T> {
    codecs: BTreeMap<i32, Arc<dyn Codec<T>>>,
    write_version: AtomicI32,
}

impl<T> VersionedCodec<T> {
    /// Starts an empty builder.
    pub fn builder() -> VersionedCodecBuilder<T> {
        VersionedCodecBuilder {
            codecs: Vec::new(),
        }
    }

    /// Version written by subsequent writes.
    pub fn write_version(&self) -> i32 {
        self.write_version.load(Ordering::Acquire)
    }

    /// Changes the version written by subsequent writes.
    ///
    /// The version is not checked here: writing with a version that has no
    /// codec fails with [`EncodeError::NoAdapterForVersion`].
    pub fn set_write_version(&self, version: i32) {
        let previous = self.write_version.swap(version, Ordering::AcqRel);
        debug!(previous, version, "write version changed");
    }

    /// Whether `version` has a codec.
    pub fn supports(&self, version: i32) -> bool {
        self.codecs.contains_key(&version)
    }

    /// Registered versions in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = i32> + '_ {
        self.codecs.keys().copied()
    }
}

impl<T> Codec<T> for VersionedCodec<T> {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<T, DecodeError> {
        let version = ctx.read_i32()?;
        let codec = self
            .codecs
            .get(&version)
            .ok_or(DecodeError::NoAdapterForVersion { version })?;
        trace!(version, "reading versioned value");
        codec.read(ctx).map_err(|e| DecodeError::Version {
            version,
            source: Box::new(e),
        })
    }

    fn write(&self, value: &T, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        let version = self.write_version();
        let codec = self
            .codecs
            .get(&version)
            .ok_or(EncodeError::NoAdapterForVersion { version })?;
        trace!(version, "writing versioned value");
        ctx.write_i32(version)?;
        codec.write(value, ctx).map_err(|e| EncodeError::Version {
            version,
            source: Box::new(e),
        })
    }
}

impl<T> fmt::Debug for VersionedCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedCodec")
            .field("versions", &self.codecs.keys().collect::<Vec<_>>())
            .field("write_version", &self.write_version())
            .finish()
    }
}

/// Collects per-version codecs for a [`VersionedCodec`].
pub struct VersionedCodecBuilder<T> {
    codecs: Vec<(i32, Arc<dyn Codec<T>>)>,
}

impl<T> VersionedCodecBuilder<T> {
    /// Adds the codec for `version`.
    pub fn version(mut self, version: i32, codec: impl Codec<T> + 'static) -> Self {
        let codec: Arc<dyn Codec<T>> = Arc::new(codec);
        self.codecs.push((version, codec));
        self
    }

    /// Builds the codec, writing `write_version` until told otherwise.
    ///
    /// The write version need not be registered yet; see
    /// [`VersionedCodec::set_write_version`].
    ///
    /// # Errors
    ///
    /// [`BuildError::DuplicateVersion`] if a version was added twice.
    pub fn build(self, write_version: i32) -> Result<VersionedCodec<T>, BuildError> {
        let mut codecs = BTreeMap::new();
        for (version, codec) in self.codecs {
            if codecs.insert(version, codec).is_some() {
                return Err(BuildError::DuplicateVersion(version));
            }
        }
        Ok(VersionedCodec {
            codecs,
            write_version: AtomicI32::new(write_version),
        })
    }
}
