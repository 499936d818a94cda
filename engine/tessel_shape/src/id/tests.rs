use pretty_assertions::assert_eq;

use super::*;

#[test]
fn primitive_ids_are_fixed() {
    assert_eq!(ShapeId::UNIT.raw(), 0);
    assert_eq!(ShapeId::BOOL.raw(), 1);
    assert_eq!(ShapeId::INT.raw(), 2);
    assert_eq!(ShapeId::UINT.raw(), 3);
    assert_eq!(ShapeId::FLOAT.raw(), 4);
    assert_eq!(ShapeId::CHAR.raw(), 5);
    assert_eq!(ShapeId::STR.raw(), 6);
    assert_eq!(ShapeId::BYTES.raw(), 7);
    assert_eq!(ShapeId::TIMESTAMP.raw(), 8);
}

#[test]
fn primitive_kind_round_trips_through_id() {
    for kind in PrimitiveKind::ALL {
        let id = ShapeId::of_primitive(kind);
        assert!(id.is_primitive());
        assert_eq!(id.as_primitive(), Some(kind));
    }
    assert_eq!(ShapeId::from_raw(ShapeId::FIRST_DYNAMIC).as_primitive(), None);
    assert!(!ShapeId::from_raw(ShapeId::FIRST_DYNAMIC).is_primitive());
}

#[test]
fn none_sentinel() {
    assert!(ShapeId::NONE.is_none());
    assert!(!ShapeId::INT.is_none());
    assert_eq!(format!("{}", ShapeId::NONE), "<none>");
}

#[test]
fn display_and_debug() {
    assert_eq!(format!("{}", ShapeId::STR), "str");
    assert_eq!(format!("{:?}", ShapeId::STR), "ShapeId::STR");
    assert_eq!(format!("{}", ShapeId::from_raw(40)), "shape#40");
    assert_eq!(format!("{:?}", ShapeId::from_raw(40)), "ShapeId(40)");
}

#[test]
fn provider_ids_are_unique() {
    let a = ProviderId::fresh();
    let b = ProviderId::fresh();
    assert_ne!(a, b);
}
