#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;
use crate::{ArgumentState, Kind, StrategyKind, Value};

fn object(pool: &ShapePool, id: ShapeId) -> &crate::ObjectShape {
    match &pool.shape(id).unwrap().data {
        ShapeData::Object(obj) => obj,
        other => panic!("expected object, found {:?}", other.kind()),
    }
}

// ── Registration ───────────────────────────────────────────────

#[test]
fn primitives_are_preregistered() {
    let pool = ShapePool::new();
    for kind in PrimitiveKind::ALL {
        let id = ShapeId::of_primitive(kind);
        let shape = pool.shape(id).unwrap();
        assert_eq!(&*shape.name, kind.name());
        assert_eq!(pool.resolve(kind.name()), Some(id));
    }
    assert_eq!(pool.shape(ShapeId::from_raw(12)).map(|s| s.kind()), None);
}

#[test]
fn pools_have_distinct_provider_ids() {
    assert_ne!(ShapePool::new().id(), ShapePool::new().id());
}

#[test]
fn reserved_shapes_are_invisible_until_defined() {
    let mut pool = ShapePool::new();
    let id = pool.reserve("Later").unwrap();
    assert_eq!(pool.resolve("Later"), Some(id));
    assert!(pool.shape(id).is_none());
    assert_eq!(pool.name(id), Some("Later"));

    pool.define(id, ShapeData::Primitive(PrimitiveKind::Int))
        .unwrap();
    assert!(pool.is_defined(id));
    assert_eq!(
        pool.define(id, ShapeData::Primitive(PrimitiveKind::Int)),
        Err(ShapeError::NotReserved { id })
    );
}

#[test]
fn duplicate_names_are_rejected() {
    let mut pool = ShapePool::new();
    pool.reserve("Thing").unwrap();
    assert_eq!(
        pool.reserve("Thing"),
        Err(ShapeError::DuplicateName(Arc::from("Thing")))
    );
}

// ── Stock constructors ─────────────────────────────────────────

#[test]
fn stock_shapes_are_interned() {
    let mut pool = ShapePool::new();
    let a = pool.list(ShapeId::INT);
    let b = pool.list(ShapeId::INT);
    assert_eq!(a, b);
    assert_eq!(pool.name(a), Some("List<int>"));

    let m = pool.map(ShapeId::STR, a);
    assert_eq!(pool.name(m), Some("Map<str, List<int>>"));
    assert_eq!(pool.resolve_generic("Map", &[ShapeId::STR, a]), Some(m));
}

#[test]
fn collection_strategies_match_constructor() {
    let mut pool = ShapePool::new();
    let cases = [
        (pool.list(ShapeId::INT), StrategyKind::Mutable),
        (pool.frozen_list(ShapeId::INT), StrategyKind::BufferedSpan),
        (pool.lazy_list(ShapeId::INT), StrategyKind::LazySequence),
        (pool.read_only_list(ShapeId::INT), StrategyKind::Unsupported),
        (pool.grid(ShapeId::INT, 2).unwrap(), StrategyKind::BufferedSpan),
    ];
    for (id, expected) in cases {
        match &pool.shape(id).unwrap().data {
            ShapeData::Enumerable(e) => assert_eq!(e.construction.kind(), expected),
            other => panic!("expected enumerable, found {:?}", other.kind()),
        }
    }
    assert!(pool.grid(ShapeId::INT, 1).is_err());
}

#[test]
fn generic_templates_instantiate_once() {
    let mut pool = ShapePool::new();
    let a = pool.instantiate("Option", &[ShapeId::STR]).unwrap();
    let b = pool.instantiate("Option", &[ShapeId::STR]).unwrap();
    assert_eq!(a, b);
    assert_eq!(pool.shape(a).unwrap().kind(), Kind::Optional);
    assert_eq!(pool.option(ShapeId::STR), a);

    assert!(matches!(
        pool.instantiate("Map", &[ShapeId::STR]),
        Err(ShapeError::Arity { expected: 2, .. })
    ));
    assert_eq!(
        pool.instantiate("Nope", &[]),
        Err(ShapeError::UnknownTemplate(Arc::from("Nope")))
    );
}

#[test]
fn custom_generic_template() {
    let mut pool = ShapePool::new();
    pool.register_generic("Pair", |pool, args| {
        RecordBuilder::new(format!(
            "Pair<{}, {}>",
            pool.display(args[0]),
            pool.display(args[1])
        ))
        .field("first", args[0])
        .field("second", args[1])
        .build(pool)
    });
    let pair = pool.instantiate("Pair", &[ShapeId::INT, ShapeId::STR]).unwrap();
    assert_eq!(pool.name(pair), Some("Pair<int, str>"));
    assert_eq!(
        pool.resolve_generic("Pair", &[ShapeId::INT, ShapeId::STR]),
        Some(pair)
    );
}

#[test]
fn enumeration_validates_ordinals() {
    let mut pool = ShapePool::new();
    let color = pool
        .enumeration("Color", &[("Red", 0), ("Green", 1), ("Blue", 4)])
        .unwrap();
    let ShapeData::Enum(shape) = &pool.shape(color).unwrap().data else {
        panic!("expected enum");
    };
    assert_eq!(
        (shape.from_ordinal)(4).unwrap(),
        Value::enumeration("Color", 4)
    );
    assert_eq!(
        (shape.from_ordinal)(2),
        Err(ShapeError::UnknownOrdinal {
            type_name: Arc::from("Color"),
            ordinal: 2,
        })
    );
    assert_eq!(
        (shape.ordinal_of)(&Value::enumeration("Color", 1)).unwrap(),
        1
    );
    assert!((shape.ordinal_of)(&Value::enumeration("Shade", 1)).is_err());
    assert_eq!(shape.member_by_ordinal(4).map(|m| &*m.name), Some("Blue"));
}

#[test]
fn union_selects_case_by_record_type() {
    let mut pool = ShapePool::new();
    let base = RecordBuilder::new("Shape").build(&mut pool).unwrap();
    let circle = RecordBuilder::new("Circle")
        .field("r", ShapeId::FLOAT)
        .build(&mut pool)
        .unwrap();
    let square = RecordBuilder::new("Square")
        .field("side", ShapeId::FLOAT)
        .build(&mut pool)
        .unwrap();
    let union = pool
        .union("AnyShape", base, &[(1, circle), (2, square)])
        .unwrap();

    let ShapeData::Union(shape) = &pool.shape(union).unwrap().data else {
        panic!("expected union");
    };
    let pick = |v: &Value| (shape.selector)(v);
    assert_eq!(pick(&Value::record("Square", vec![Value::Float(1.0)])), Some(1));
    assert_eq!(pick(&Value::record("Circle", vec![Value::Float(1.0)])), Some(0));
    assert_eq!(pick(&Value::record("Shape", vec![])), None);
    assert_eq!(shape.case_by_tag(2).map(|(i, _)| i), Some(1));
}

// ── Records ────────────────────────────────────────────────────

#[test]
fn setter_records_start_from_defaults() {
    let mut pool = ShapePool::new();
    let id = RecordBuilder::new("Config")
        .field("host", ShapeId::STR)
        .optional("port", ShapeId::INT, Value::Int(80))
        .build(&mut pool)
        .unwrap();
    let obj = object(&pool, id);

    let mut value = (obj.create_default.as_ref().unwrap())();
    assert_eq!(
        value,
        Value::record("Config", vec![Value::Unit, Value::Int(80)])
    );

    let (index, host) = obj.property("host").unwrap();
    assert_eq!(index, 0);
    assert!(host.is_required() && host.is_writable());
    (host.setter.as_ref().unwrap())(&mut value, Value::string("example.org")).unwrap();
    assert_eq!(host.get(&value).unwrap().unwrap(), Value::string("example.org"));

    let (_, port) = obj.property("port").unwrap();
    assert!(!port.is_required());
}

#[test]
fn constructor_records_build_in_one_call() {
    let mut pool = ShapePool::new();
    let id = RecordBuilder::new("Point")
        .field("x", ShapeId::INT)
        .optional("y", ShapeId::INT, Value::Int(0))
        .constructor()
        .build(&mut pool)
        .unwrap();
    let obj = object(&pool, id);
    assert!(obj.create_default.is_none());
    assert!(obj.properties.iter().all(|p| !p.is_writable()));

    let ctor = obj.constructor.as_ref().unwrap();
    let mut args = ArgumentState::new(ctor.params.len());
    args.set(0, Value::Int(3));
    assert_eq!(
        (ctor.construct)(args).unwrap(),
        Value::record("Point", vec![Value::Int(3), Value::Int(0)])
    );
    assert!((ctor.construct)(ArgumentState::new(2)).is_err());
    assert_eq!(ctor.param_for_property(1), Some(1));
}

#[test]
fn getters_reject_foreign_records() {
    let mut pool = ShapePool::new();
    let id = RecordBuilder::new("A")
        .field("n", ShapeId::INT)
        .build(&mut pool)
        .unwrap();
    let (_, n) = object(&pool, id).property("n").unwrap();
    assert_eq!(
        n.get(&Value::record("B", vec![Value::Int(1)])).unwrap(),
        Err(ShapeError::WrongRecord {
            expected: Arc::from("A"),
            found: Arc::from("B"),
        })
    );
}

#[test]
fn self_referential_record() {
    let mut pool = ShapePool::new();
    let node = pool.reserve("Node").unwrap();
    let children = pool.list(node);
    RecordBuilder::new("Node")
        .field("value", ShapeId::INT)
        .field("children", children)
        .define(&mut pool, node)
        .unwrap();

    assert_eq!(pool.name(children), Some("List<Node>"));
    let obj = object(&pool, node);
    assert_eq!(obj.properties[1].shape, children);
}

#[test]
fn function_shapes_invoke_function_values() {
    let mut pool = ShapePool::new();
    let id = pool.function(&[("a", ShapeId::INT)], Some(ShapeId::INT));
    assert_eq!(pool.name(id), Some("fn(a: int) -> int"));
    let ShapeData::Function(shape) = &pool.shape(id).unwrap().data else {
        panic!("expected function");
    };
    let double = Value::function(crate::FunctionValue::new("double", 1, |args| {
        Ok(Value::Int(args[0].as_int()? * 2))
    }));
    assert_eq!((shape.invoke)(&double, &[Value::Int(21)]).unwrap(), Value::Int(42));
    assert!(!shape.is_async);

    let async_id = pool.async_function(&[], None);
    assert_eq!(pool.name(async_id), Some("async fn()"));
}
