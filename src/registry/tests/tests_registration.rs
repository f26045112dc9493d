//! Registration, replacement and exact read lookup.

use std::collections::{HashMap, HashSet};

use super::{Marker, init_tracing, write_object};
use crate::codec::{TypeKey, Value};
use crate::error::{DecodeError, EncodeError};
use crate::registry::Registry;
use crate::stream::{decode_object_from_slice, encode_object_to_vec};

#[derive(Debug, PartialEq)]
struct Widget;

#[test]
fn builtins_are_preinstalled() {
    let registry = Registry::new();
    assert!(registry.contains::<String>());
    assert!(registry.contains::<Option<String>>());
    assert!(registry.contains::<i8>());
    assert!(registry.contains::<f64>());
    assert!(registry.contains::<char>());
    assert!(registry.contains::<uuid::Uuid>());
    assert!(registry.contains::<Value>());
    assert!(!registry.contains::<Widget>());
    assert!(registry.user_codecs().is_empty());
}

#[test]
fn register_returns_replaced_codec() {
    init_tracing();

    let registry = Registry::new();
    assert!(registry.register::<Widget, _>(Marker(1)).is_none());
    assert!(registry.register::<Widget, _>(Marker(2)).is_some());

    // Last registration wins.
    assert_eq!(write_object(&registry, &Widget).unwrap(), [2]);
    assert_eq!(registry.user_codecs(), [TypeKey::of::<Widget>()]);
}

#[test]
fn unregister_removes_user_codec() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<Widget, _>(Marker(1));
    assert!(registry.unregister::<Widget>().is_some());
    assert!(registry.unregister::<Widget>().is_none());

    let err = write_object(&registry, &Widget).unwrap_err();
    assert!(matches!(err, EncodeError::NoCodec { .. }));
}

#[test]
fn builtins_win_over_user_codecs() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<i32, _>(Marker(9));

    assert_eq!(write_object(&registry, &1_i32).unwrap(), [0, 0, 0, 1]);
    let (value, _) = decode_object_from_slice::<i32>(&registry, &[0, 0, 0, 4]).unwrap();
    assert_eq!(value, 4);
}

#[test]
fn read_lookup_is_exact() {
    init_tracing();

    let registry = Registry::new();
    assert!(registry.resolve_for_read::<Widget>().is_none());

    registry.register::<Widget, _>(Marker(1));
    assert!(registry.resolve_for_read::<Widget>().is_some());
    assert!(registry.resolve_for_read::<Vec<Widget>>().is_none());

    let err = decode_object_from_slice::<Vec<Widget>>(&registry, &[0, 0, 0, 0]).unwrap_err();
    assert!(matches!(err, DecodeError::NoCodec { .. }));
}

#[test]
fn generic_collection_helpers() {
    init_tracing();

    let registry = Registry::new();
    registry.register_list::<String>();
    registry.register_set::<i16>();
    registry.register_map::<String, i32>();

    let list = vec!["a".to_owned()];
    let bytes = encode_object_to_vec(&registry, &list).unwrap();
    assert_eq!(decode_object_from_slice::<Vec<String>>(&registry, &bytes).unwrap().0, list);

    let set = HashSet::from([1_i16, 2]);
    let bytes = encode_object_to_vec(&registry, &set).unwrap();
    assert_eq!(decode_object_from_slice::<HashSet<i16>>(&registry, &bytes).unwrap().0, set);

    let map = HashMap::from([("Key!".to_owned(), 5), ("other".to_owned(), 2000)]);
    let bytes = encode_object_to_vec(&registry, &map).unwrap();
    assert_eq!(
        decode_object_from_slice::<HashMap<String, i32>>(&registry, &bytes).unwrap().0,
        map
    );
}

#[test]
fn nested_registered_lists() {
    init_tracing();

    let registry = Registry::new();
    registry.register_list::<i8>();
    registry.register_list::<Vec<i8>>();

    let nested = vec![vec![1_i8], vec![], vec![2, 3]];
    let bytes = encode_object_to_vec(&registry, &nested).unwrap();
    assert_eq!(
        bytes,
        [0, 0, 0, 3, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 2, 2, 3]
    );
    let (decoded, _) = decode_object_from_slice::<Vec<Vec<i8>>>(&registry, &bytes).unwrap();
    assert_eq!(decoded, nested);
}

#[test]
fn registry_is_shared_across_threads() {
    init_tracing();

    let registry = Registry::new();
    std::thread::scope(|scope| {
        for marker in 0..4_u8 {
            let registry = &registry;
            scope.spawn(move || {
                registry.register::<Widget, _>(Marker(marker));
                let bytes = write_object(registry, &Widget).unwrap();
                assert_eq!(bytes.len(), 1);
                assert!(bytes[0] < 4);
            });
        }
    });
    assert_eq!(registry.user_codecs().len(), 1);
}

#[test]
fn config_is_exposed() {
    let registry = Registry::new();
    assert_eq!(registry.config(), &crate::config::RegistryConfig::default());
}
