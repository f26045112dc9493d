//! # binio
//!
//! A typed binary serialization framework. Domain types get a
//! [`Codec`] each; a shared [`Registry`] finds the right codec for a value
//! at runtime, including through declared supertype/interface chains; and
//! compact big-endian bytes come out the other end. There is no schema:
//! the wire format of a type is exactly the sequence of context calls its
//! codec makes.
//!
//! ## Quick Start
//!
//! ```rust
//! use binio::{Codec, DecodeError, EncodeError, ReadContext, Registry, WriteContext};
//!
//! #[derive(Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! struct PointCodec;
//!
//! impl Codec<Point> for PointCodec {
//!     fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Point, DecodeError> {
//!         Ok(Point { x: ctx.read_i32()?, y: ctx.read_i32()? })
//!     }
//!
//!     fn write(&self, p: &Point, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
//!         ctx.write_i32(p.x)?;
//!         ctx.write_i32(p.y)
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry.register::<Point, _>(PointCodec);
//!
//! let bytes = binio::encode_object_to_vec(&registry, &Point { x: 1, y: -1 }).unwrap();
//! assert_eq!(bytes, [0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]);
//!
//! let (point, read) = binio::decode_object_from_slice::<Point>(&registry, &bytes).unwrap();
//! assert_eq!(point, Point { x: 1, y: -1 });
//! assert_eq!(read, bytes.len());
//! ```
//!
//! ## Features
//!
//! - **Runtime dispatch**: built-in and user codec tables, with write-side
//!   fallback along an explicit [`Lineage`].
//! - **Tagged unions**: [`IdCodec`] writes a small tag in front of each
//!   variant, with an optional fallback codec.
//! - **Schema versions**: [`VersionedCodec`] prefixes values with their
//!   format version and reads every registered version.
//! - **Short-id interning**: [`DataBank`] maps repeated values to 16-bit ids.
//! - **Decode limits**: [`RegistryConfig`] caps string lengths, collection
//!   counts and nesting depth read from untrusted input.

pub mod bank;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod stream;
pub mod tagged;
pub mod versioned;
pub mod wire;

pub use bank::{DataBank, DataBankCodec};
pub use codec::{Codec, EnumCodec, ListCodec, OrdinalEnum, TypeKey, Value, ValueCodec};
pub use config::RegistryConfig;
pub use context::{ReadContext, SideData, WriteContext};
pub use error::{BankError, BuildError, ConfigError, DecodeError, EncodeError};
pub use registry::{Lineage, Registry, WriteResolution};
pub use stream::{
    decode_from_file, decode_from_slice, decode_object_from_slice, encode_object_to_vec,
    encode_to_file, encode_to_vec,
};
pub use tagged::{IdCodec, IdCodecBuilder, Polymorphic, TokenWidth};
pub use versioned::{VersionedCodec, VersionedCodecBuilder};
