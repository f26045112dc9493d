//! The dynamic `Value` codec.

use uuid::Uuid;

use super::init_tracing;
use crate::codec::{Value, ValueCodec};
use crate::error::DecodeError;
use crate::registry::Registry;
use crate::stream::{decode_from_slice, encode_to_vec};

fn encode(value: &Value) -> Vec<u8> {
    encode_to_vec(&Registry::new(), &ValueCodec, value).unwrap()
}

fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    decode_from_slice(&Registry::new(), &ValueCodec, bytes).map(|(value, _)| value)
}

#[test]
fn scalar_tags() {
    init_tracing();

    assert_eq!(encode(&Value::from("hi")), [0, 0, 0, 0, 2, b'h', b'i']);
    assert_eq!(encode(&Value::Byte(-1)), [1, 0xFF]);
    assert_eq!(encode(&Value::Short(2)), [2, 0, 2]);
    assert_eq!(encode(&Value::from(3_i32)), [3, 0, 0, 0, 3]);
    assert_eq!(encode(&Value::from(true)), [8, 1]);
    assert_eq!(encode(&Value::Char('a')), [9, 0, 0x61]);
}

#[test]
fn uuid_value() {
    init_tracing();

    let id = Uuid::from_u64_pair(1, 2);
    let bytes = encode(&Value::from(id));
    assert_eq!(bytes.len(), 17);
    assert_eq!(bytes[0], 7);
    assert_eq!(decode(&bytes).unwrap(), Value::Uuid(id));
}

#[test]
fn nested_containers() {
    init_tracing();

    let value = Value::Map(vec![
        (Value::from("xs"), Value::List(vec![Value::from(1_i32), Value::from(2_i64)])),
        (Value::from(0.5), Value::Set(vec![])),
    ]);
    let bytes = encode(&value);
    assert_eq!(&bytes[..5], &[12, 0, 0, 0, 2]);
    assert_eq!(decode(&bytes).unwrap(), value);
}

#[test]
fn unknown_tag() {
    init_tracing();

    let err = decode(&[13]).unwrap_err();
    assert!(
        matches!(err, DecodeError::UnknownTag { tag: 13 }),
        "expected UnknownTag, got: {err:?}"
    );
}

#[test]
fn container_errors_carry_tag() {
    init_tracing();

    // A list holding one element with an unknown tag.
    let err = decode(&[10, 0, 0, 0, 1, 42]).unwrap_err();
    assert!(matches!(err, DecodeError::Variant { tag: 10, .. }));
    assert!(matches!(err.root_cause(), DecodeError::UnknownTag { tag: 42 }));
}

fn nested_lists(levels: usize) -> Value {
    (0..levels).fold(Value::List(vec![]), |inner, _| Value::List(vec![inner]))
}

#[test]
fn nesting_up_to_limit_reads() {
    init_tracing();

    let registry = Registry::with_config(crate::config::RegistryConfig {
        max_depth: 4,
        ..Default::default()
    })
    .unwrap();

    let value = nested_lists(3);
    let bytes = encode(&value);
    let (decoded, read) = decode_from_slice(&registry, &ValueCodec, &bytes).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(read, bytes.len());

    let bytes = encode(&nested_lists(4));
    let err = decode_from_slice(&registry, &ValueCodec, &bytes).unwrap_err();
    assert!(matches!(err, DecodeError::Variant { tag: 10, .. }));
    assert!(
        matches!(err.root_cause(), DecodeError::DepthExceeded { max: 4 }),
        "expected DepthExceeded, got: {err:?}"
    );
}

#[test]
fn hostile_nesting_is_an_error() {
    init_tracing();

    // Every level declares one element that is itself a list.
    let bytes = [10_u8, 0, 0, 0, 1].repeat(200_000);
    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(
            err.root_cause(),
            DecodeError::DepthExceeded {
                max: crate::config::DEFAULT_MAX_DEPTH
            }
        ),
        "expected DepthExceeded, got: {:?}",
        err.root_cause()
    );
}
