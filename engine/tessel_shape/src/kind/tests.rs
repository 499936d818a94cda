use super::*;

#[test]
fn primitive_names_are_unique() {
    let mut names: Vec<_> = PrimitiveKind::ALL.iter().map(|k| k.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), PrimitiveKind::ALL.len());
}

#[test]
fn primitive_from_raw_matches_discriminant() {
    for kind in PrimitiveKind::ALL {
        assert_eq!(PrimitiveKind::from_raw(kind as u32), Some(kind));
    }
    assert_eq!(PrimitiveKind::from_raw(9), None);
}

#[test]
fn collection_kinds() {
    let collections: Vec<_> = Kind::ALL.into_iter().filter(|k| k.is_collection()).collect();
    assert_eq!(collections, vec![Kind::Enumerable, Kind::Dictionary]);
    assert!(!Kind::Primitive.has_children());
    assert!(Kind::Union.has_children());
}
