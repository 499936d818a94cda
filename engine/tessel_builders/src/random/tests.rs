#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tessel_gen::{build, ArtifactCache};
use tessel_shape::{RecordBuilder, ShapeId, ShapePool, ShapeProvider};

use super::*;
use crate::test_helpers::Fixture;

fn generator(pool: &ShapePool, random: &RandomGenerator, shape: ShapeId) -> GenerateFn {
    let mut cache = ArtifactCache::for_provider(pool);
    build(pool, random, &mut cache, shape).unwrap()
}

/// Nesting depth of a tree value.
fn depth(tree: &Value) -> usize {
    let record = tree.as_record().unwrap();
    let children = record.field(1).unwrap().as_list().unwrap();
    1 + children.iter().map(depth).max().unwrap_or(0)
}

// ── Budget ───

#[test]
fn budget_halves_per_level() {
    let budget = Budget::new(&GenOptions::default().with_max_collection_len(8).with_max_depth(3));
    assert_eq!(budget.size, 8);
    let child = budget.child();
    assert_eq!((child.size, child.depth), (4, 1));
    assert!(!child.exhausted());
    assert!(child.child().child().exhausted());
}

// ── Determinism ───

#[test]
fn same_seed_same_values() {
    let fx = Fixture::new();
    let random = RandomGenerator::default();
    for shape in [fx.person, fx.tree, fx.figure, fx.scores, fx.matrix] {
        let generate = generator(&fx.pool, &random, shape);
        let name = fx.pool.type_name(shape);
        assert_eq!(
            random.samples(&generate, 42, 5).unwrap(),
            random.samples(&generate, 42, 5).unwrap(),
            "{name}"
        );
    }
}

#[test]
fn different_seeds_differ() {
    let fx = Fixture::new();
    let random = RandomGenerator::default();
    let generate = generator(&fx.pool, &random, fx.ints);
    let a = random.samples(&generate, 1, 8).unwrap();
    let b = random.samples(&generate, 2, 8).unwrap();
    assert_ne!(a, b);
}

// ── Termination and bounds ───

#[test]
fn recursive_types_terminate_within_depth() {
    let fx = Fixture::new();
    let random = RandomGenerator::new(GenOptions::default().with_max_depth(4));
    let generate = generator(&fx.pool, &random, fx.tree);
    for tree in random.samples(&generate, 7, 50).unwrap() {
        // Each tree level nests a record inside a list: two budget levels.
        assert!(depth(&tree) <= 3, "{tree}");
    }
}

/// `Expr` over `BinOp { lhs: Expr, rhs: Expr }` with the case `Lit { n: int }`.
fn expressions() -> (ShapePool, ShapeId) {
    let mut pool = ShapePool::new();
    let expr = pool.reserve("Expr").unwrap();
    let bin_op = RecordBuilder::new("BinOp")
        .field("lhs", expr)
        .field("rhs", expr)
        .build(&mut pool)
        .unwrap();
    let lit = RecordBuilder::new("Lit")
        .field("n", ShapeId::INT)
        .build(&mut pool)
        .unwrap();
    pool.define_union(expr, bin_op, &[(1, lit)]).unwrap();
    (pool, expr)
}

fn expr_height(expr: &Value) -> usize {
    let record = expr.as_record().unwrap();
    match &*record.type_name {
        "Lit" => 1,
        _ => 1 + expr_height(record.field(0).unwrap()).max(expr_height(record.field(1).unwrap())),
    }
}

#[test]
fn recursive_union_base_terminates() {
    let (pool, expr) = expressions();
    let random = RandomGenerator::new(GenOptions::default().with_max_depth(5));
    let generate = generator(&pool, &random, expr);
    let exprs = random.samples(&generate, 1, 50).unwrap();
    for expr in &exprs {
        assert!(expr_height(expr) <= 6, "{expr}");
    }
    assert!(exprs.iter().any(|e| e.record_type().unwrap() == "BinOp"));
}

#[test]
fn exhausted_union_takes_a_leaf() {
    let (pool, expr) = expressions();
    let random = RandomGenerator::new(GenOptions::default().with_max_collection_len(0));
    let generate = generator(&pool, &random, expr);
    for expr in random.samples(&generate, 9, 20).unwrap() {
        assert_eq!(expr.record_type().unwrap(), "Lit");
    }
}

#[test]
fn union_without_a_leaf_fails() {
    let mut pool = ShapePool::new();
    let chain = pool.reserve("Chain").unwrap();
    let link = RecordBuilder::new("Link")
        .field("next", chain)
        .build(&mut pool)
        .unwrap();
    pool.define_union(chain, link, &[]).unwrap();

    let random = RandomGenerator::default();
    let generate = generator(&pool, &random, chain);
    let err = random.sample(&generate, 0).unwrap_err();
    assert!(matches!(err, GenError::ConstructionUnsupported { .. }), "{err}");
}

#[test]
fn grid_size_stays_within_the_length_bound() {
    let mut fx = Fixture::new();
    let cube = fx.pool.grid(ShapeId::INT, 3).unwrap();
    let random = RandomGenerator::new(GenOptions::default().with_max_collection_len(4));
    let generate = generator(&fx.pool, &random, cube);
    for seed in 0..200 {
        let value = random.sample(&generate, seed).unwrap();
        let grid = value.as_grid().unwrap();
        assert_eq!(grid.dims.len(), 3);
        assert!(grid.items.len() <= 4, "{value}");
        assert_eq!(grid.items.len(), grid.dims.iter().product::<usize>());
    }
}

#[test]
fn zero_budget_yields_empty_collections() {
    let fx = Fixture::new();
    let random = RandomGenerator::new(GenOptions::default().with_max_collection_len(0));
    let generate = generator(&fx.pool, &random, fx.scores);
    for value in random.samples(&generate, 3, 10).unwrap() {
        assert!(value.as_map().unwrap().is_empty());
    }
}

#[test]
fn generated_values_have_their_shape() {
    let fx = Fixture::new();
    let random = RandomGenerator::default();

    let colors = random
        .samples(&generator(&fx.pool, &random, fx.color), 11, 30)
        .unwrap();
    for color in &colors {
        assert!(matches!(color, Value::Enum { ordinal: 0..=2, .. }));
    }

    let figures = random
        .samples(&generator(&fx.pool, &random, fx.figure), 11, 60)
        .unwrap();
    for figure in &figures {
        let name = figure.record_type().unwrap();
        assert!(["Label", "Circle", "Square", "Segment"].contains(&name), "{name}");
    }

    let grids = random
        .samples(&generator(&fx.pool, &random, fx.matrix), 11, 20)
        .unwrap();
    for grid in &grids {
        let Value::Grid(grid) = grid else {
            panic!("expected a grid, got {grid}");
        };
        assert_eq!(grid.dims.len(), 2);
        assert_eq!(grid.items.len(), grid.dims.iter().product::<usize>());
    }
}

#[test]
fn functions_cannot_be_generated() {
    let mut fx = Fixture::new();
    let f = fx.pool.function(&[], None);
    let mut cache = ArtifactCache::for_provider(&fx.pool);
    let err = build(&fx.pool, &RandomGenerator::default(), &mut cache, f).err().unwrap();
    assert!(matches!(err, GenError::Unsupported { .. }));
}

proptest! {
    #[test]
    fn lists_respect_the_length_bound(seed in any::<u64>(), len in 0_usize..16) {
        let fx = Fixture::new();
        let random = RandomGenerator::new(GenOptions::default().with_max_collection_len(len));
        let generate = generator(&fx.pool, &random, fx.ints);
        let value = random.sample(&generate, seed).unwrap();
        prop_assert!(value.as_list().unwrap().len() <= len);
    }
}
