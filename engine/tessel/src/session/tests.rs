#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;
use tessel_gen::{DuplicateKeyPolicy, GenError};
use tessel_shape::{FunctionValue, RecordBuilder, ShapePool};

use super::*;

fn point(x: i64, y: i64) -> Value {
    Value::record("Point", vec![Value::Int(x), Value::Int(y)])
}

fn session() -> (Session, ShapeId, ShapeId) {
    let mut pool = ShapePool::new();
    let point = RecordBuilder::new("Point")
        .field("x", ShapeId::INT)
        .field("y", ShapeId::INT)
        .build(&mut pool)
        .unwrap();
    let path = pool.list(point);
    (Session::new(pool), point, path)
}

// ── Caching ───

#[test]
fn artifacts_are_built_once() {
    let (mut session, point, path) = session();
    session.cloner(path).unwrap();
    // List<Point>, Point, int.
    assert_eq!(session.cached(), 3);
    session.cloner(point).unwrap();
    session.cloner(path).unwrap();
    assert_eq!(session.cached(), 3);
    session.encoder(point).unwrap();
    assert_eq!(session.cached(), 5);
}

#[test]
fn resolves_types_by_name() {
    let (session, point, path) = session();
    assert_eq!(session.resolve("Point"), Some(point));
    assert_eq!(session.resolve("List<Point>"), Some(path));
    assert_eq!(session.resolve("Line"), None);
}

// ── One-shot operations ───

#[test]
fn one_shot_operations_agree() {
    let (mut session, _, path) = session();
    let value = Value::list(vec![point(0, 0), point(1, 2)]);

    let doc = session.encode(path, &value).unwrap();
    let decoded = session.decode(path, &doc).unwrap();
    assert_eq!(decoded, value);
    assert!(session.equals(path, &value, &decoded).unwrap());
    assert_eq!(
        session.hash(path, &value).unwrap(),
        session.hash(path, &decoded).unwrap()
    );
    assert_eq!(session.deep_clone(path, &value).unwrap(), value);
    assert_eq!(
        session.print(path, &value).unwrap(),
        "[Point { x: 0, y: 0 }, Point { x: 1, y: 2 }]"
    );
}

#[test]
fn generation_is_seeded() {
    let (mut session, _, path) = session();
    assert_eq!(
        session.generate(path, 99).unwrap(),
        session.generate(path, 99).unwrap()
    );
}

#[test]
fn codecs_with_converters_replace_the_cache() {
    let (session, point, _) = session();
    let mut session = session.with_codecs(
        Encoder::new().with_converter("Point", |_| Ok(Document::string("point"))),
        Decoder::default(),
    );
    assert_eq!(session.cached(), 0);
    assert_eq!(
        session.encode(point, &self::point(1, 1)).unwrap(),
        Document::string("point")
    );
}

#[test]
fn options_flow_into_decoders() {
    let mut pool = ShapePool::new();
    let scores = pool.map(ShapeId::STR, ShapeId::INT);
    let doc = Document::Map(vec![
        (Document::string("a"), Document::Int(1)),
        (Document::string("a"), Document::Int(2)),
    ]);

    let mut strict = Session::new(pool);
    assert!(matches!(
        strict.decode(scores, &doc),
        Err(GenError::DuplicateKey { .. })
    ));

    let provider = Arc::clone(&strict.provider);
    let mut lenient = Session::with_options(
        provider,
        GenOptions::default().with_duplicate_keys(DuplicateKeyPolicy::LastWins),
    );
    assert!(lenient.decode(scores, &doc).is_ok());
}

// ── Functions and mapping ───

#[test]
fn marshal_leaves_the_session_cache_alone() {
    let mut pool = ShapePool::new();
    let point = RecordBuilder::new("Point")
        .field("x", ShapeId::INT)
        .field("y", ShapeId::INT)
        .build(&mut pool)
        .unwrap();
    let norm = pool.function(&[("p", point)], Some(ShapeId::INT));
    let session = Session::new(pool);

    let invoke = session.marshal(norm).unwrap();
    let manhattan = Value::function(FunctionValue::new("manhattan", 1, |args| {
        let p = args[0].as_record()?;
        Ok(Value::Int(p.field(0)?.as_int()?.abs() + p.field(1)?.as_int()?.abs()))
    }));
    let doc = Document::record([("x", Document::Int(-3)), ("y", Document::Int(4))]);
    assert_eq!(invoke(&manhattan, &[doc]).unwrap(), Document::Int(7));
    assert_eq!(session.cached(), 0);
}

#[test]
fn maps_into_another_provider() {
    let (mut session, point, _) = session();
    let (target, _, _) = self::session();
    let mapper = session.mapper_to(Arc::clone(&target.provider));
    let value = session.generate(point, 3).unwrap();
    assert_eq!(mapper.map(session.provider(), point, &value).unwrap(), value);
}
