//! Shared type graph for builder unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tessel_shape::{
    RecordBuilder, ShapeData, ShapeError, ShapeId, ShapePool, ShapeProvider, UnionCase,
    UnionShape, Value,
};

/// A pool holding one of every shape kind, with the ids tests refer to.
pub struct Fixture {
    pub pool: ShapePool,
    /// `Point { x: int, y: int }`, built through setters.
    pub point: ShapeId,
    /// `Person { name: str, age: int, nickname: Option<str> = None }`, built
    /// through a constructor.
    pub person: ShapeId,
    /// `Color { Red = 0, Green = 1, Blue = 2 }`.
    pub color: ShapeId,
    /// `Tree { value: int, children: List<Tree> }`.
    pub tree: ShapeId,
    /// `Celsius`, a record carried as its `float` reading.
    pub celsius: ShapeId,
    /// `Figure` over `Label { text: str }` with cases
    /// `Circle { radius: float }` (1), `Square { side: float }` (2) and
    /// `Segment { from: Point, to: Point }` (3).
    pub figure: ShapeId,
    pub ints: ShapeId,
    pub frozen_ints: ShapeId,
    pub stream: ShapeId,
    pub scores: ShapeId,
    pub frozen_scores: ShapeId,
    pub matrix: ShapeId,
    pub maybe_int: ShapeId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut pool = ShapePool::new();

        let point = RecordBuilder::new("Point")
            .field("x", ShapeId::INT)
            .field("y", ShapeId::INT)
            .build(&mut pool)
            .unwrap();

        let maybe_str = pool.option(ShapeId::STR);
        let person = RecordBuilder::new("Person")
            .field("name", ShapeId::STR)
            .field("age", ShapeId::INT)
            .optional("nickname", maybe_str, Value::None)
            .constructor()
            .build(&mut pool)
            .unwrap();

        let color = pool
            .enumeration("Color", &[("Red", 0), ("Green", 1), ("Blue", 2)])
            .unwrap();

        let tree = pool.reserve("Tree").unwrap();
        let children = pool.list(tree);
        RecordBuilder::new("Tree")
            .field("value", ShapeId::INT)
            .field("children", children)
            .define(&mut pool, tree)
            .unwrap();

        let celsius = pool
            .surrogate(
                "Celsius",
                ShapeId::FLOAT,
                |value| Ok(value.as_record()?.field(0)?.clone()),
                |reading| match reading {
                    Value::Float(_) => Ok(Value::record("Celsius", vec![reading])),
                    other => Err(ShapeError::Mismatch {
                        expected: "float",
                        found: other.kind_name(),
                    }),
                },
            )
            .unwrap();

        let label = RecordBuilder::new("Label")
            .field("text", ShapeId::STR)
            .build(&mut pool)
            .unwrap();
        let circle = RecordBuilder::new("Circle")
            .field("radius", ShapeId::FLOAT)
            .build(&mut pool)
            .unwrap();
        let square = RecordBuilder::new("Square")
            .field("side", ShapeId::FLOAT)
            .build(&mut pool)
            .unwrap();
        let segment = RecordBuilder::new("Segment")
            .field("from", point)
            .field("to", point)
            .build(&mut pool)
            .unwrap();
        let figure = pool
            .union("Figure", label, &[(1, circle), (2, square), (3, segment)])
            .unwrap();

        let ints = pool.list(ShapeId::INT);
        let frozen_ints = pool.frozen_list(ShapeId::INT);
        let stream = pool.lazy_list(ShapeId::INT);
        let scores = pool.map(ShapeId::STR, ShapeId::INT);
        let frozen_scores = pool.frozen_map(ShapeId::STR, ShapeId::INT);
        let matrix = pool.grid(ShapeId::INT, 2).unwrap();
        let maybe_int = pool.option(ShapeId::INT);

        Fixture {
            pool,
            point,
            person,
            color,
            tree,
            celsius,
            figure,
            ints,
            frozen_ints,
            stream,
            scores,
            frozen_scores,
            matrix,
            maybe_int,
        }
    }
}

pub fn point(x: i64, y: i64) -> Value {
    Value::record("Point", vec![Value::Int(x), Value::Int(y)])
}

pub fn person(name: &str, age: i64, nickname: Option<&str>) -> Value {
    let nickname = nickname.map_or(Value::None, |n| Value::some(Value::string(n)));
    Value::record("Person", vec![Value::string(name), Value::Int(age), nickname])
}

/// A tree whose node `value`s count up from `value` along one spine.
pub fn spine(value: i64, depth: usize) -> Value {
    let children = if depth == 0 {
        Vec::new()
    } else {
        vec![spine(value + 1, depth - 1)]
    };
    Value::record("Tree", vec![Value::Int(value), Value::list(children)])
}

pub fn celsius(reading: f64) -> Value {
    Value::record("Celsius", vec![Value::Float(reading)])
}

pub fn square(side: f64) -> Value {
    Value::record("Square", vec![Value::Float(side)])
}

pub fn circle(radius: f64) -> Value {
    Value::record("Circle", vec![Value::Float(radius)])
}

pub fn label(text: &str) -> Value {
    Value::record("Label", vec![Value::string(text)])
}

pub fn segment(from: Value, to: Value) -> Value {
    Value::record("Segment", vec![from, to])
}

pub fn ints(items: &[i64]) -> Value {
    Value::list(items.iter().copied().map(Value::Int).collect())
}

pub fn scores(entries: &[(&str, i64)]) -> Value {
    let map: BTreeMap<Value, Value> = entries
        .iter()
        .map(|&(k, v)| (Value::string(k), Value::Int(v)))
        .collect();
    Value::map(map)
}

/// Entry counts for the options of [`Fixture::tallied_figure`]: the base,
/// then each case in declaration order.
#[derive(Clone, Default)]
pub struct Tally(Arc<[AtomicUsize; 4]>);

impl Tally {
    pub fn counts(&self) -> [usize; 4] {
        [0, 1, 2, 3].map(|slot| self.0[slot].load(Ordering::Relaxed))
    }
}

impl Fixture {
    /// `Figure` with every option wrapped in a pass-through surrogate that
    /// records each time it is entered.
    pub fn tallied_figure(&mut self) -> (ShapeId, Tally) {
        let tally = Tally::default();
        let ShapeData::Union(figure) = self.pool.shape(self.figure).unwrap().data.clone() else {
            panic!("Figure is a union");
        };

        let pool = &mut self.pool;
        let mut counted = |slot: usize, shape: ShapeId| {
            let tally = tally.clone();
            pool.surrogate(
                &format!("Tallied{slot}"),
                shape,
                move |value: &Value| {
                    tally.0[slot].fetch_add(1, Ordering::Relaxed);
                    Ok(value.clone())
                },
                Ok,
            )
            .unwrap()
        };
        let base = counted(0, figure.base);
        let cases: Vec<UnionCase> = figure
            .cases
            .iter()
            .enumerate()
            .map(|(index, case)| UnionCase {
                shape: counted(index + 1, case.shape),
                ..case.clone()
            })
            .collect();

        let id = self
            .pool
            .insert(
                "TalliedFigure",
                ShapeData::Union(UnionShape {
                    base,
                    cases,
                    selector: figure.selector,
                }),
            )
            .unwrap();
        (id, tally)
    }
}
