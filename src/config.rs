//! Registry configuration: decode safety limits.

use crate::error::ConfigError;

/// Default upper bound on a decoded string length (256 MiB).
pub const DEFAULT_MAX_STRING_LEN: u32 = 256 * 1024 * 1024;

/// Default upper bound on a decoded list, set or map count (16 M).
pub const DEFAULT_MAX_COLLECTION_LEN: u32 = 16 * 1024 * 1024;

/// Default upper bound on nested object and container reads.
pub const DEFAULT_MAX_DEPTH: u32 = 128;

/// Configuration for a [`Registry`](crate::registry::Registry).
///
/// The limits are enforced by every [`ReadContext`](crate::context::ReadContext)
/// created from the registry. A length or count read from the stream that
/// exceeds its limit is rejected before anything is allocated, so a crafted
/// or corrupted stream cannot trigger an allocation bomb. Nesting deeper than
/// `max_depth` is rejected before the next level is entered, which keeps
/// recursive decoding off the end of the stack.
///
/// # Example
///
/// ```rust
/// use binio::{Registry, RegistryConfig};
///
/// let registry = Registry::with_config(RegistryConfig {
///     max_string_len: 64 * 1024,
///     ..RegistryConfig::default()
/// })
/// .unwrap();
/// # drop(registry);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum UTF-8 byte length of a decoded string.
    ///
    /// Default: 256 MiB. Must be ≥ 1.
    pub max_string_len: u32,

    /// Maximum element count of a decoded list, set or map.
    ///
    /// Default: 16 M. Must be ≥ 1.
    pub max_collection_len: u32,

    /// Maximum nesting of `read_object` calls and dynamic containers.
    ///
    /// Default: 128. Must be ≥ 1.
    pub max_depth: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_string_len: DEFAULT_MAX_STRING_LEN,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RegistryConfig {
    /// Validates all configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_string_len == 0 {
            return Err(ConfigError::Invalid("max_string_len must be >= 1".into()));
        }
        if self.max_collection_len == 0 {
            return Err(ConfigError::Invalid(
                "max_collection_len must be >= 1".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be >= 1".into()));
        }
        Ok(())
    }
}
