//! Write-side resolution along declared lineages.

use super::{Marker, init_tracing, write_object};
use crate::codec::{Codec, TypeKey, Value};
use crate::context::{ReadContext, WriteContext};
use crate::error::{DecodeError, EncodeError};
use crate::registry::{Lineage, Registry};

// A small hierarchy:
//
//   Number            (superclass, has a payload)
//     └─ Quantity     (extends Number)
//   Ordered           (interface view)
//     └─ Ranked       (interface extending Ordered)
//   Sortable          (implements Ranked, nothing registered for itself)

struct Number {
    value: f64,
}

struct Quantity {
    number: Number,
    unit: &'static str,
}

struct Ordered(i64);

struct Ranked(i64);

struct Sortable {
    rank: i64,
}

struct NumberCodec;

impl Codec<Number> for NumberCodec {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Number, DecodeError> {
        Ok(Number {
            value: ctx.read_f64()?,
        })
    }

    fn write(&self, value: &Number, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_f64(value.value)
    }
}

struct OrderedCodec;

impl Codec<Ordered> for OrderedCodec {
    fn read(&self, ctx: &mut ReadContext<'_>) -> Result<Ordered, DecodeError> {
        Ok(Ordered(ctx.read_i64()?))
    }

    fn write(&self, value: &Ordered, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        ctx.write_i64(value.0)
    }
}

fn declare_hierarchy(registry: &Registry) {
    registry.declare(Lineage::<Quantity>::new().extends(|q: &Quantity| &q.number));
    registry.declare(Lineage::<Ranked>::new().implements(|r: &Ranked| Ordered(r.0)));
    registry.declare(Lineage::<Sortable>::new().implements(|s: &Sortable| Ranked(s.rank)));
}

fn quantity() -> Quantity {
    Quantity {
        number: Number { value: 1.5 },
        unit: "m",
    }
}

// ------------------------------------------------------------------------------------------------
// Superclass
// ------------------------------------------------------------------------------------------------

#[test]
fn falls_back_to_superclass_codec() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<Number, _>(NumberCodec);
    declare_hierarchy(&registry);

    let resolution = registry.resolve_for_write(TypeKey::of::<Quantity>()).unwrap();
    assert_eq!(resolution.resolved_type(), TypeKey::of::<Number>());
    assert_eq!(resolution.depth(), 1);

    let q = quantity();
    assert_eq!(q.unit, "m");
    assert_eq!(write_object(&registry, &q).unwrap(), 1.5_f64.to_be_bytes());
}

#[test]
fn read_never_walks_lineage() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<Number, _>(NumberCodec);
    declare_hierarchy(&registry);

    assert!(registry.resolve_for_read::<Quantity>().is_none());
}

#[test]
fn exact_match_beats_ancestors() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<Number, _>(NumberCodec);
    registry.register::<Quantity, _>(Marker(7));
    declare_hierarchy(&registry);

    assert_eq!(write_object(&registry, &quantity()).unwrap(), [7]);
}

// ------------------------------------------------------------------------------------------------
// Interfaces
// ------------------------------------------------------------------------------------------------

#[test]
fn resolves_transitive_interface() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<Ordered, _>(OrderedCodec);
    declare_hierarchy(&registry);

    let resolution = registry.resolve_for_write(TypeKey::of::<Sortable>()).unwrap();
    assert_eq!(resolution.resolved_type(), TypeKey::of::<Ordered>());
    assert_eq!(resolution.depth(), 2);

    let bytes = write_object(&registry, &Sortable { rank: -3 }).unwrap();
    assert_eq!(bytes, (-3_i64).to_be_bytes());
}

#[test]
fn mirrors_double_number_comparable() {
    init_tracing();

    // Double and Number both registered, plus a "comparable" interface;
    // a type that only implements the interface resolves to it.
    struct Double(f64);
    struct Comparable;
    struct SomethingComparable;

    let registry = Registry::new();
    registry.register::<Double, _>(Marker(1));
    registry.register::<Number, _>(Marker(2));
    registry.register::<Comparable, _>(Marker(3));
    registry.declare(Lineage::<Double>::new().implements(|d: &Double| Number { value: d.0 }));
    registry.declare(Lineage::<SomethingComparable>::new().implements(|_: &SomethingComparable| Comparable));

    let resolution = registry
        .resolve_for_write(TypeKey::of::<SomethingComparable>())
        .unwrap();
    assert_eq!(resolution.resolved_type(), TypeKey::of::<Comparable>());
    assert_eq!(write_object(&registry, &SomethingComparable).unwrap(), [3]);
    assert_eq!(write_object(&registry, &Double(0.0)).unwrap(), [1]);
}

#[test]
fn interfaces_are_probed_before_superclass() {
    init_tracing();

    struct Both {
        number: Number,
    }

    let registry = Registry::new();
    registry.register::<Number, _>(Marker(1));
    registry.register::<Ordered, _>(Marker(2));
    registry.declare(
        Lineage::<Both>::new()
            .extends(|b: &Both| &b.number)
            .implements(|_: &Both| Ordered(0)),
    );

    let value = Both {
        number: Number { value: 0.0 },
    };
    assert_eq!(write_object(&registry, &value).unwrap(), [2]);
}

#[test]
fn interfaces_are_depth_first_in_declaration_order() {
    init_tracing();

    struct Multi;
    struct Plain;

    let registry = Registry::new();
    registry.register::<Ordered, _>(Marker(1));
    registry.register::<Plain, _>(Marker(2));
    declare_hierarchy(&registry);
    // Ranked itself has no codec, but its parent Ordered does, and Ranked
    // is declared before Plain.
    registry.declare(
        Lineage::<Multi>::new()
            .implements(|_: &Multi| Ranked(0))
            .implements(|_: &Multi| Plain),
    );

    assert_eq!(write_object(&registry, &Multi).unwrap(), [1]);
    assert_eq!(
        registry.ancestors(TypeKey::of::<Multi>()),
        [
            TypeKey::of::<Multi>(),
            TypeKey::of::<Ranked>(),
            TypeKey::of::<Ordered>(),
            TypeKey::of::<Plain>(),
        ]
    );
}

#[test]
fn superclass_interfaces_are_reached() {
    init_tracing();

    struct Base;
    struct Derived {
        base: Base,
    }

    let registry = Registry::new();
    registry.register::<Ordered, _>(Marker(4));
    registry.declare(Lineage::<Base>::new().implements(|_: &Base| Ordered(1)));
    registry.declare(Lineage::<Derived>::new().extends(|d: &Derived| &d.base));

    let resolution = registry.resolve_for_write(TypeKey::of::<Derived>()).unwrap();
    assert_eq!(resolution.depth(), 2);
    assert_eq!(write_object(&registry, &Derived { base: Base }).unwrap(), [4]);
}

#[test]
fn borrowed_interface_view() {
    init_tracing();

    struct Labelled {
        label: String,
    }

    let registry = Registry::new();
    registry.declare(Lineage::<Labelled>::new().implements_ref(|l: &Labelled| &l.label));

    let bytes = write_object(
        &registry,
        &Labelled {
            label: "ok".to_owned(),
        },
    )
    .unwrap();
    assert_eq!(bytes, [0, 0, 0, 2, b'o', b'k']);
}

// ------------------------------------------------------------------------------------------------
// Built-in "any object" entry
// ------------------------------------------------------------------------------------------------

#[test]
fn user_codec_overrides_value_fallback() {
    init_tracing();

    struct Reading(i32);

    let registry = Registry::new();
    registry.declare(
        Lineage::<Reading>::new()
            .implements(|r: &Reading| Value::Int(r.0))
            .implements(|_: &Reading| Ordered(0)),
    );

    // Only the built-in Value entry matches.
    assert_eq!(write_object(&registry, &Reading(5)).unwrap(), [3, 0, 0, 0, 5]);

    // A user codec found later on the same walk takes precedence.
    registry.register::<Ordered, _>(Marker(8));
    assert_eq!(write_object(&registry, &Reading(5)).unwrap(), [8]);
}

#[test]
fn concrete_builtin_beats_user_ancestor() {
    init_tracing();

    struct Celsius(f64);

    let registry = Registry::new();
    registry.register::<Ordered, _>(Marker(8));
    registry.declare(
        Lineage::<Celsius>::new()
            .implements(|_: &Celsius| Ordered(0))
            .implements(|c: &Celsius| c.0),
    );

    // The built-in f64 codec is found on the built-in pass.
    assert_eq!(write_object(&registry, &Celsius(2.0)).unwrap(), 2.0_f64.to_be_bytes());
}

// ------------------------------------------------------------------------------------------------
// Degenerate lineages
// ------------------------------------------------------------------------------------------------

#[test]
fn cycles_terminate() {
    init_tracing();

    struct Left {
        right: Box<Right>,
    }
    struct Right {
        left: Option<Box<Left>>,
    }

    let registry = Registry::new();
    registry.declare(Lineage::<Left>::new().extends(|l: &Left| &*l.right));
    registry.declare(Lineage::<Right>::new().implements(|_: &Right| Left {
        right: Box::new(Right { left: None }),
    }));

    assert!(registry.resolve_for_write(TypeKey::of::<Left>()).is_none());
    assert_eq!(
        registry.ancestors(TypeKey::of::<Left>()),
        [TypeKey::of::<Left>(), TypeKey::of::<Right>()]
    );

    let value = Left {
        right: Box::new(Right { left: None }),
    };
    assert!(value.right.left.is_none());
    let err = write_object(&registry, &value).unwrap_err();
    assert!(matches!(err, EncodeError::NoCodec { .. }));
}

#[test]
fn superclass_seen_as_interface_keeps_climbing() {
    init_tracing();

    struct Base;
    struct Middle {
        base: Base,
    }
    struct Leaf {
        middle: Middle,
    }

    let registry = Registry::new();
    registry.register::<Base, _>(Marker(5));
    registry.declare(
        Lineage::<Leaf>::new()
            .implements_ref(|l: &Leaf| &l.middle)
            .extends(|l: &Leaf| &l.middle),
    );
    registry.declare(Lineage::<Middle>::new().extends(|m: &Middle| &m.base));

    assert_eq!(
        registry.ancestors(TypeKey::of::<Leaf>()),
        [
            TypeKey::of::<Leaf>(),
            TypeKey::of::<Middle>(),
            TypeKey::of::<Base>()
        ]
    );

    let resolution = registry.resolve_for_write(TypeKey::of::<Leaf>()).unwrap();
    assert_eq!(resolution.resolved_type(), TypeKey::of::<Base>());
    assert_eq!(resolution.depth(), 2);

    let leaf = Leaf {
        middle: Middle { base: Base },
    };
    assert_eq!(write_object(&registry, &leaf).unwrap(), [5]);
}

#[test]
fn superclass_cycle_terminates() {
    struct Ping;
    struct Pong;

    let registry = Registry::new();
    registry.declare(Lineage::<Ping>::new().extends(|_: &Ping| &Pong));
    registry.declare(Lineage::<Pong>::new().extends(|_: &Pong| &Ping));

    assert_eq!(
        registry.ancestors(TypeKey::of::<Ping>()),
        [TypeKey::of::<Ping>(), TypeKey::of::<Pong>()]
    );
    assert!(registry.resolve_for_write(TypeKey::of::<Ping>()).is_none());
}

#[test]
fn undeclared_type_has_only_itself() {
    struct Lonely;

    let registry = Registry::new();
    assert_eq!(
        registry.ancestors(TypeKey::of::<Lonely>()),
        [TypeKey::of::<Lonely>()]
    );
    assert!(registry.resolve_for_write(TypeKey::of::<Lonely>()).is_none());
}

#[test]
fn redeclaring_replaces_lineage() {
    init_tracing();

    let registry = Registry::new();
    registry.register::<Number, _>(NumberCodec);
    declare_hierarchy(&registry);
    registry.declare(Lineage::<Quantity>::new());

    assert!(registry.resolve_for_write(TypeKey::of::<Quantity>()).is_none());
}
