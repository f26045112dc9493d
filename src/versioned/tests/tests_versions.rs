//! Version prefixes, version dispatch and write-version changes.

use super::init_tracing;
use crate::codec::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::{BuildError, DecodeError, EncodeError};
use crate::registry::Registry;
use crate::stream::{decode_from_slice, encode_object_to_vec, encode_to_vec};
use crate::versioned::VersionedCodec;

#[derive(Debug, PartialEq)]
struct Profile {
    name: String,
    age: i32,
}

/// v1: name only.
struct ProfileV1;

impl Codec<Profile> for ProfileV1 {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Profile, DecodeError> {
        let name = ctx.read_string()?.unwrap_or_default();
        Ok(Profile { name, age: 0 })
    }

    fn write(&self, value: &Profile, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_str(&value.name)
    }
}

/// v2: name and age.
struct ProfileV2;

impl Codec<Profile> for ProfileV2 {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Profile, DecodeError> {
        let name = ctx.read_string()?.unwrap_or_default();
        let age = ctx.read_i32()?;
        Ok(Profile { name, age })
    }

    fn write(&self, value: &Profile, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_str(&value.name)?;
        ctx.write_i32(value.age)
    }
}

fn codec(write_version: i32) -> VersionedCodec<Profile> {
    VersionedCodec::builder()
        .version(1, ProfileV1)
        .version(2, ProfileV2)
        .build(write_version)
        .unwrap()
}

fn profile() -> Profile {
    Profile {
        name: "ab".to_owned(),
        age: 30,
    }
}

fn decode(codec: &VersionedCodec<Profile>, bytes: &[u8]) -> Result<Profile, DecodeError> {
    decode_from_slice(&Registry::new(), codec, bytes).map(|(value, _)| value)
}

#[test]
fn writes_version_prefix() {
    init_tracing();

    let codec = codec(2);
    let bytes = encode_to_vec(&Registry::new(), &codec, &profile()).unwrap();
    assert_eq!(bytes, [0, 0, 0, 2, 0, 0, 0, 2, b'a', b'b', 0, 0, 0, 30]);
    assert_eq!(decode(&codec, &bytes).unwrap(), profile());
}

#[test]
fn reads_older_version() {
    init_tracing();

    let codec = codec(2);
    let old: [u8; 10] = [0, 0, 0, 1, 0, 0, 0, 2, b'a', b'b'];
    assert_eq!(
        decode(&codec, &old).unwrap(),
        Profile {
            name: "ab".to_owned(),
            age: 0,
        }
    );
}

#[test]
fn unknown_stored_version() {
    init_tracing();

    let codec = codec(2);
    let bytes: [u8; 4] = [0, 0, 0, 3];
    let err = decode(&codec, &bytes).unwrap_err();
    assert!(
        matches!(err, DecodeError::NoAdapterForVersion { version: 3 }),
        "expected NoAdapterForVersion, got: {err:?}"
    );
}

#[test]
fn switching_write_version() {
    init_tracing();

    let codec = codec(2);
    assert_eq!(codec.write_version(), 2);

    codec.set_write_version(1);
    let bytes = encode_to_vec(&Registry::new(), &codec, &profile()).unwrap();
    assert_eq!(bytes, [0, 0, 0, 1, 0, 0, 0, 2, b'a', b'b']);

    codec.set_write_version(7);
    assert_eq!(codec.write_version(), 7);
    let err = encode_to_vec(&Registry::new(), &codec, &profile()).unwrap_err();
    assert!(
        matches!(err, EncodeError::NoAdapterForVersion { version: 7 }),
        "expected NoAdapterForVersion, got: {err:?}"
    );
}

#[test]
fn nothing_written_for_unsupported_version() {
    init_tracing();

    let codec = codec(5);
    let mut buf = Vec::new();
    let registry = Registry::new();
    let mut ctx = WriteContext::new(&registry, &mut buf);
    assert!(codec.write(&profile(), &mut ctx).is_err());
    drop(ctx);
    assert!(buf.is_empty());
}

#[test]
fn duplicate_version_rejected() {
    init_tracing();

    let err = VersionedCodec::builder()
        .version(1, ProfileV1)
        .version(1, ProfileV2)
        .build(1)
        .unwrap_err();
    assert_eq!(err, BuildError::DuplicateVersion(1));
}

#[test]
fn payload_errors_carry_version() {
    init_tracing();

    let codec = codec(2);
    let bytes: [u8; 8] = [0, 0, 0, 2, 0, 0, 0, 9];
    let err = decode(&codec, &bytes).unwrap_err();
    assert!(
        matches!(err, DecodeError::Version { version: 2, .. }),
        "expected Version, got: {err:?}"
    );
    assert!(matches!(err.root_cause(), DecodeError::UnexpectedEndOfStream));
}

#[test]
fn introspection() {
    let codec = codec(1);
    assert!(codec.supports(2));
    assert!(!codec.supports(3));
    assert_eq!(codec.versions().collect::<Vec<_>>(), [1, 2]);
}

#[test]
fn registered_in_registry() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<Profile, _>(codec(1));

    let bytes = encode_object_to_vec(&registry, &profile()).unwrap();
    assert_eq!(&bytes[..4], [0, 0, 0, 1]);
}
