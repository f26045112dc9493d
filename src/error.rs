//! Error types shared by every layer of the framework.
//!
//! Encoding and decoding fail with distinct types so a caller always knows
//! which direction broke. Composite codecs (lists, maps, tagged unions,
//! versioned codecs, banks) never swallow a child failure: they wrap it in
//! a context variant carrying the offending index, tag, version or id, and
//! [`DecodeError::root_cause`] / [`EncodeError::root_cause`] walk back to
//! the innermost error.

use std::io;

use thiserror::Error;

use crate::tagged::TokenWidth;

// ------------------------------------------------------------------------------------------------
// Encode errors
// ------------------------------------------------------------------------------------------------

/// Errors produced while writing a value.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No codec is registered for the runtime type or any of its ancestors.
    #[error("no codec registered for type {type_name}")]
    NoCodec {
        /// Name of the type that failed to resolve.
        type_name: &'static str,
    },

    /// A tagged-union codec has no variant for the value and no fallback.
    #[error("no variant registered for type {type_name} and no fallback codec configured")]
    NoFallback {
        /// Static type of the rejected value.
        type_name: &'static str,
    },

    /// The configured write version has no codec.
    #[error("no codec for write version {version}")]
    NoAdapterForVersion {
        /// The configured write version.
        version: i32,
    },

    /// A string does not fit the narrow length prefix requested.
    #[error("string of {len} bytes does not fit a prefix limited to {max}")]
    StringTooLong {
        /// UTF-8 byte length of the string.
        len: usize,
        /// Largest length the prefix can hold.
        max: usize,
    },

    /// A length or count does not fit the 32-bit prefix.
    #[error("length {0} does not fit a 32-bit prefix")]
    LengthOverflow(usize),

    /// A `char` outside the 16-bit code unit range.
    #[error("character U+{0:04X} does not fit a 16-bit code unit")]
    CharOutOfRange(u32),

    /// An enum declares more variants than a 16-bit ordinal can address.
    #[error("ordinal {0} does not fit 16 bits")]
    OrdinalOverflow(usize),

    /// A type-erased codec was handed a value of the wrong type.
    #[error("type mismatch: codec expects {expected}")]
    TypeMismatch {
        /// Type the codec was registered for.
        expected: &'static str,
    },

    /// Failure while writing element `index` of a list or set.
    #[error("list element {index}: {source}")]
    ListElement {
        /// Zero-based element position.
        index: usize,
        /// The element's error.
        source: Box<EncodeError>,
    },

    /// Failure while writing entry `index` of a map.
    #[error("map entry {index}: {source}")]
    MapEntry {
        /// Zero-based entry position.
        index: usize,
        /// The entry's error.
        source: Box<EncodeError>,
    },

    /// Failure inside the variant codec selected by `tag`.
    #[error("variant tag {tag}: {source}")]
    Variant {
        /// Tag that was written (`-1` for the fallback).
        tag: i32,
        /// The variant codec's error.
        source: Box<EncodeError>,
    },

    /// Failure inside the codec for schema `version`.
    #[error("version {version}: {source}")]
    Version {
        /// Version that was written.
        version: i32,
        /// The versioned codec's error.
        source: Box<EncodeError>,
    },

    /// Failure while writing a bank element.
    #[error("could not write bank element with id {id}: {source}")]
    ElementFailed {
        /// Id of the offending element.
        id: i16,
        /// The element codec's error.
        source: Box<EncodeError>,
    },

    /// The sink failed (disk full, broken pipe, …).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EncodeError {
    /// Returns the innermost error, skipping every context wrapper.
    pub fn root_cause(&self) -> &EncodeError {
        match self {
            EncodeError::ListElement { source, .. }
            | EncodeError::MapEntry { source, .. }
            | EncodeError::Variant { source, .. }
            | EncodeError::Version { source, .. }
            | EncodeError::ElementFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Decode errors
// ------------------------------------------------------------------------------------------------

/// Errors produced while reading a value.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No codec is registered for the declared type.
    #[error("no codec registered for type {type_name}")]
    NoCodec {
        /// Declared type that failed to resolve.
        type_name: &'static str,
    },

    /// An enum ordinal outside `0..max`.
    #[error("invalid enum ordinal {got}, expected 0..{max}")]
    InvalidOrdinal {
        /// Ordinal read from the stream.
        got: i16,
        /// Number of declared variants.
        max: usize,
    },

    /// A boolean byte other than `0` or `1`.
    #[error("invalid boolean tag {got}, expected 0 or 1")]
    InvalidBooleanTag {
        /// Byte read from the stream.
        got: u8,
    },

    /// A tagged-union tag with no registered variant and no fallback.
    #[error("unknown tag {tag} and no fallback codec configured")]
    UnknownTag {
        /// Tag read from the stream.
        tag: i32,
    },

    /// A schema version with no codec.
    #[error("no codec for version {version}")]
    NoAdapterForVersion {
        /// Version read from the stream.
        version: i32,
    },

    /// A negative map or list count.
    #[error("negative size {0}")]
    NegativeSize(i32),

    /// The source ended before the declared number of bytes.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,

    /// A bank id seen twice while rebuilding a bank.
    #[error("duplicate bank key {id}")]
    DuplicateKey {
        /// The repeated id.
        id: i16,
    },

    /// A bank value seen twice while rebuilding a bank.
    #[error("duplicate bank value (already stored under id {id})")]
    DuplicateValue {
        /// Id already holding the value.
        id: i16,
    },

    /// The bank has handed out every non-zero 16-bit id.
    #[error("bank id space exhausted")]
    IdSpaceExhausted,

    /// The terminator id `0` used as a bank entry id.
    #[error("reserved bank id {id}")]
    ReservedId {
        /// The offending id.
        id: i16,
    },

    /// A length or count above the configured limit.
    #[error("length {len} exceeds limit {max}")]
    LengthOverflow {
        /// Length read from the stream.
        len: u64,
        /// Configured limit.
        max: u32,
    },

    /// Nested reads went deeper than the configured limit.
    #[error("nesting depth exceeds limit {max}")]
    DepthExceeded {
        /// Configured limit.
        max: u32,
    },

    /// A string payload that is not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The null sentinel where a non-null value was declared.
    #[error("unexpected null for non-null {type_name}")]
    UnexpectedNull {
        /// The declared type.
        type_name: &'static str,
    },

    /// A 16-bit code unit that is not a scalar value (lone surrogate).
    #[error("invalid character code unit 0x{got:04X}")]
    InvalidChar {
        /// Code unit read from the stream.
        got: u16,
    },

    /// A codec needed side data that no enclosing codec provided.
    #[error("missing side data '{key}'")]
    MissingSideData {
        /// Key that was looked up.
        key: String,
    },

    /// Failure while reading element `index` of a list or set.
    #[error("list element {index}: {source}")]
    ListElement {
        /// Zero-based element position.
        index: usize,
        /// The element's error.
        source: Box<DecodeError>,
    },

    /// Failure while reading entry `index` of a map.
    #[error("map entry {index}: {source}")]
    MapEntry {
        /// Zero-based entry position.
        index: usize,
        /// The entry's error.
        source: Box<DecodeError>,
    },

    /// Failure inside the variant codec selected by `tag`.
    #[error("variant tag {tag}: {source}")]
    Variant {
        /// Tag read from the stream.
        tag: i32,
        /// The variant codec's error.
        source: Box<DecodeError>,
    },

    /// Failure inside the codec for schema `version`.
    #[error("version {version}: {source}")]
    Version {
        /// Version read from the stream.
        version: i32,
        /// The versioned codec's error.
        source: Box<DecodeError>,
    },

    /// Failure while reading the bank element stored under `id`.
    #[error("could not read bank element with id {id}: {source}")]
    ElementFailed {
        /// Id preceding the element.
        id: i16,
        /// The element codec's error.
        source: Box<DecodeError>,
    },

    /// Application-level rejection of a well-formed value.
    #[error("{0}")]
    Custom(String),

    /// The source failed.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl DecodeError {
    /// Returns the innermost error, skipping every context wrapper.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            DecodeError::ListElement { source, .. }
            | DecodeError::MapEntry { source, .. }
            | DecodeError::Variant { source, .. }
            | DecodeError::Version { source, .. }
            | DecodeError::ElementFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::UnexpectedEndOfStream
        } else {
            DecodeError::Io(err)
        }
    }
}

impl From<BankError> for DecodeError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::DuplicateKey { id } => DecodeError::DuplicateKey { id },
            BankError::DuplicateValue { id } => DecodeError::DuplicateValue { id },
            BankError::IdSpaceExhausted => DecodeError::IdSpaceExhausted,
            BankError::ReservedId { id } => DecodeError::ReservedId { id },
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Bank errors
// ------------------------------------------------------------------------------------------------

/// Errors returned by direct [`DataBank`](crate::bank::DataBank) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    /// The id is already mapped.
    #[error("duplicate bank key {id}")]
    DuplicateKey {
        /// The repeated id.
        id: i16,
    },

    /// The value is already mapped.
    #[error("duplicate bank value (already stored under id {id})")]
    DuplicateValue {
        /// Id already holding the value.
        id: i16,
    },

    /// Every non-zero 16-bit id has been handed out.
    #[error("bank id space exhausted")]
    IdSpaceExhausted,

    /// `0` terminates a serialized bank and is never a valid id.
    #[error("reserved bank id {id}")]
    ReservedId {
        /// The offending id.
        id: i16,
    },
}

// ------------------------------------------------------------------------------------------------
// Builder errors
// ------------------------------------------------------------------------------------------------

/// Errors returned when assembling a tagged-union or versioned codec.
///
/// Every misconfiguration is caught at build time so encode and decode
/// never see an ambiguous table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Two variants claim the same tag.
    #[error("tag {0} is already assigned")]
    DuplicateTag(i32),

    /// Tag `-1` is reserved for the fallback codec.
    #[error("tag -1 is reserved for the fallback codec")]
    ReservedTag,

    /// Tags must be non-negative.
    #[error("tag {0} is negative")]
    NegativeTag(i32),

    /// The tag cannot be represented by the configured token width.
    #[error("tag {tag} does not fit a {width:?} token")]
    TagOutOfRange {
        /// The offending tag.
        tag: i32,
        /// The configured token width.
        width: TokenWidth,
    },

    /// Two variants claim the same concrete type.
    #[error("type {type_name} is already registered")]
    DuplicateType {
        /// Name of the repeated type.
        type_name: &'static str,
    },

    /// Two codecs claim the same schema version.
    #[error("version {0} already has a codec")]
    DuplicateVersion(i32),
}

// ------------------------------------------------------------------------------------------------
// Config errors
// ------------------------------------------------------------------------------------------------

/// Errors returned when a [`RegistryConfig`](crate::config::RegistryConfig) is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration parameter is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
