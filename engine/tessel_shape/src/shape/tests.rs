#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use super::*;

fn no_entries(_: &Value) -> Result<EntryIter<'_>, ShapeError> {
    Ok(Box::new(std::iter::empty()))
}

fn params() -> Vec<ParameterShape> {
    vec![
        ParameterShape {
            name: Arc::from("x"),
            shape: ShapeId::INT,
            property: Some(0),
            required: true,
        },
        ParameterShape {
            name: Arc::from("label"),
            shape: ShapeId::STR,
            property: Some(1),
            required: false,
        },
        ParameterShape {
            name: Arc::from("y"),
            shape: ShapeId::INT,
            property: Some(2),
            required: true,
        },
    ]
}

// ── ArgumentState ──────────────────────────────────────────────

#[test]
fn missing_required_lists_every_gap_in_order() {
    let params = params();
    let args = ArgumentState::new(params.len());
    let missing: Vec<String> = args
        .missing_required(&params)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(missing, vec!["x".to_string(), "y".to_string()]);
}

#[test]
fn set_reports_repeat_assignment() {
    let mut args = ArgumentState::new(2);
    assert!(args.set(0, Value::Int(1)));
    assert!(!args.set(0, Value::Int(2)));
    assert_eq!(args.get(0), Some(&Value::Int(2)));
    assert!(!args.set(5, Value::Unit));
}

#[test]
fn take_empties_slot() {
    let mut args = ArgumentState::new(1);
    args.set(0, Value::Bool(true));
    assert_eq!(args.take(0), Some(Value::Bool(true)));
    assert!(!args.is_set(0));
}

// ── Construction strategies ────────────────────────────────────

#[test]
fn strategy_kinds() {
    let mutable: ConstructionStrategy<Value> =
        ConstructionStrategy::mutable(|_| Value::list(Vec::new()), |_, _| Ok(()));
    let buffered: ConstructionStrategy<Value> =
        ConstructionStrategy::buffered(|buffer| Ok(Value::list(buffer.into_items())));
    let lazy: ConstructionStrategy<Value> =
        ConstructionStrategy::lazy(|items| Ok(Value::list(items.collect())));

    assert_eq!(mutable.kind(), StrategyKind::Mutable);
    assert_eq!(buffered.kind(), StrategyKind::BufferedSpan);
    assert_eq!(lazy.clone().kind(), StrategyKind::LazySequence);
    assert_eq!(
        ConstructionStrategy::<Value>::Unsupported.kind().to_string(),
        "unsupported"
    );
}

#[test]
fn span_buffer_validates_dimensions() {
    let ok = SpanBuffer::shaped(vec![1, 2, 3, 4, 5, 6], smallvec::smallvec![2, 3]).unwrap();
    assert_eq!(ok.dims(), &[2, 3]);
    assert_eq!(ok.len(), 6);

    let err = SpanBuffer::shaped(vec![1, 2, 3], smallvec::smallvec![2, 2]).unwrap_err();
    assert_eq!(
        err,
        ShapeError::GridSize {
            dims: vec![2, 2],
            expected: 4,
            found: 3,
        }
    );

    let linear = SpanBuffer::linear(vec!['a', 'b']);
    assert_eq!(linear.dims(), &[2]);
}

// ── Shape ──────────────────────────────────────────────────────

#[test]
fn children_cover_every_reference() {
    let dict = Shape::new(
        "Map<str, int>",
        ShapeData::Dictionary(DictionaryShape {
            key: ShapeId::STR,
            value: ShapeId::INT,
            construction: ConstructionStrategy::Unsupported,
            entries: Arc::new(no_entries),
            len: Arc::new(|_: &Value| -> Result<usize, ShapeError> { Ok(0) }),
        }),
    );
    assert_eq!(dict.kind(), Kind::Dictionary);
    assert_eq!(dict.children().as_slice(), &[ShapeId::STR, ShapeId::INT]);

    let func = Shape::new(
        "fn(a: int) -> bool",
        ShapeData::Function(FunctionShape {
            params: vec![FunctionParam {
                name: Arc::from("a"),
                shape: ShapeId::INT,
            }],
            returns: Some(ShapeId::BOOL),
            is_async: false,
            invoke: Arc::new(|_: &Value, _: &[Value]| -> Result<Value, ShapeError> {
                Ok(Value::Unit)
            }),
        }),
    );
    assert_eq!(func.children().as_slice(), &[ShapeId::INT, ShapeId::BOOL]);

    let prim = Shape::new("int", ShapeData::Primitive(PrimitiveKind::Int));
    assert!(prim.children().is_empty());
}
