#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use super::*;
use crate::{RecordBuilder, ShapePool};

/// Records the kind of every node it is asked to visit.
struct KindLog;

impl ShapeVisitor<Vec<String>> for KindLog {
    type Output = Kind;

    fn visit_primitive(&self, node: Node<'_, PrimitiveKind>, log: &mut Vec<String>) -> Kind {
        log.push(format!("primitive {}", node.name()));
        Kind::Primitive
    }
    fn visit_object(&self, node: Node<'_, ObjectShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("object {} ({} props)", node.name, node.properties.len()));
        Kind::Object
    }
    fn visit_enum(&self, node: Node<'_, EnumShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("enum {}", node.name));
        Kind::Enum
    }
    fn visit_optional(&self, node: Node<'_, OptionalShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("optional {}", node.name));
        Kind::Optional
    }
    fn visit_enumerable(&self, node: Node<'_, EnumerableShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("enumerable {} rank {}", node.name, node.rank));
        Kind::Enumerable
    }
    fn visit_dictionary(&self, node: Node<'_, DictionaryShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("dictionary {}", node.name));
        Kind::Dictionary
    }
    fn visit_surrogate(&self, node: Node<'_, SurrogateShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("surrogate {}", node.name));
        Kind::Surrogate
    }
    fn visit_union(&self, node: Node<'_, UnionShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("union {} ({} cases)", node.name, node.cases.len()));
        Kind::Union
    }
    fn visit_function(&self, node: Node<'_, FunctionShape>, log: &mut Vec<String>) -> Kind {
        log.push(format!("function {}", node.name));
        Kind::Function
    }
}

#[test]
fn accept_dispatches_on_kind() {
    let mut pool = ShapePool::new();
    let list = pool.list(ShapeId::STR);
    let opt = pool.option(ShapeId::INT);
    let point = RecordBuilder::new("Point")
        .field("x", ShapeId::INT)
        .field("y", ShapeId::INT)
        .build(&mut pool)
        .unwrap();

    let mut log = Vec::new();
    for id in [ShapeId::BOOL, list, opt, point] {
        let node = pool.node(id).unwrap();
        let kind = KindLog.invoke(node, &mut log);
        assert_eq!(kind, node.kind());
    }
    assert_eq!(
        log,
        vec![
            "primitive bool".to_string(),
            "enumerable List<str> rank 1".to_string(),
            "optional Option<int>".to_string(),
            "object Point (2 props)".to_string(),
        ]
    );
}

#[test]
fn node_exposes_id_and_data_lifetime() {
    let mut pool = ShapePool::new();
    let map = pool.map(ShapeId::STR, ShapeId::INT);
    let node = pool.node(map).unwrap();
    assert_eq!(node.id(), map);
    assert_eq!(node.name(), "Map<str, int>");
    assert_eq!(node.shape().children().as_slice(), &[ShapeId::STR, ShapeId::INT]);
}

#[test]
fn reachable_visits_cycles_once() {
    let mut pool = ShapePool::new();
    let node = pool.reserve("Node").unwrap();
    let children = pool.list(node);
    let label = pool.option(ShapeId::STR);
    RecordBuilder::new("Node")
        .field("label", label)
        .field("children", children)
        .define(&mut pool, node)
        .unwrap();

    assert_eq!(
        reachable(&pool, node, Edges::All),
        vec![node, label, ShapeId::STR, children]
    );
}

#[test]
fn required_edges_skip_omittable_children() {
    let mut pool = ShapePool::new();
    let node = pool.reserve("Node").unwrap();
    let children = pool.list(node);
    let parent = pool.option(node);
    RecordBuilder::new("Node")
        .field("id", ShapeId::INT)
        .field("parent", parent)
        .field("children", children)
        .define(&mut pool, node)
        .unwrap();

    // Lists and options may be empty, so `Node` does not require itself.
    assert_eq!(
        reachable(&pool, node, Edges::Required),
        vec![node, ShapeId::INT, parent, children]
    );

    let pair = RecordBuilder::new("Pair")
        .field("left", node)
        .field("right", node)
        .build(&mut pool)
        .unwrap();
    assert!(reachable(&pool, pair, Edges::Required).contains(&node));
}

#[test]
fn reachable_lists_unknown_ids_without_expanding() {
    let pool = ShapePool::new();
    let ghost = ShapeId::from_raw(999);
    assert_eq!(reachable(&pool, ghost, Edges::Required), vec![ghost]);
}
