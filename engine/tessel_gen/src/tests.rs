#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rayon::prelude::*;
use tessel_shape::{
    DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Node, ObjectShape,
    OptionalShape, PrimitiveKind, RecordBuilder, ShapeId, ShapePool, ShapeProvider,
    ShapeVisitor, SurrogateShape, UnionShape,
};

use super::*;

/// Renders a type's structure, e.g. `Map<str, List<int>>(str, List<int>(int))`.
type Render = Arc<dyn Fn() -> String + Send + Sync>;

struct Renderer;

impl Builder for Renderer {
    type Artifact = Render;
    const KIND: ArtifactKind = ArtifactKind::new("render");

    fn delayed(&self, delayed: Delayed<Render>) -> Render {
        Arc::new(move || (delayed.get())())
    }
}

fn render<'a>(id: ShapeId, cx: &mut GenerationContext<'a, Renderer>) -> GenResult<Render> {
    let shape = cx.shape(id)?;
    let name = Arc::clone(&shape.name);
    let children = cx.get_all(&shape.children())?;
    Ok(Arc::new(move || {
        if children.is_empty() {
            return name.to_string();
        }
        let inner: Vec<String> = children.iter().map(|child| child()).collect();
        format!("{name}({})", inner.join(", "))
    }))
}

impl<'a> ShapeVisitor<GenerationContext<'a, Renderer>> for Renderer {
    type Output = GenResult<Render>;

    fn visit_primitive(
        &self,
        node: Node<'_, PrimitiveKind>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        render(node.id, cx)
    }

    fn visit_function(
        &self,
        node: Node<'_, FunctionShape>,
        cx: &mut GenerationContext<'a, Renderer>,
    ) -> GenResult<Render> {
        Err(cx.unsupported(node.id, "functions are not rendered"))
    }
}

// ── Scoped caches ──────────────────────────────────────────────

#[test]
fn scoped_cache_reads_through_to_parent() {
    let mut pool = ShapePool::new();
    let list = pool.list(ShapeId::INT);
    let map = pool.map(ShapeId::STR, list);

    let mut parent = ArtifactCache::for_provider(&pool);
    build(&pool, &Renderer, &mut parent, list).unwrap();
    assert_eq!(parent.len(), 2);

    {
        let mut scope = ScopedCache::new(&parent);
        let rendered = build(&pool, &Renderer, &mut scope, map).unwrap();
        assert_eq!(rendered(), "Map<str, List<int>>(str, List<int>(int))");
        // `int` and `List<int>` came from the parent.
        assert_eq!(scope.len(), 2);
        assert!(lookup::<Render>(&scope, &CacheKey::new(Renderer::KIND, list)).is_some());
    }

    assert_eq!(parent.len(), 2);
    assert!(parent.get::<Renderer>(map).is_none());
}

#[test]
fn scoped_eviction_leaves_parent_alone() {
    let mut pool = ShapePool::new();
    let list = pool.list(ShapeId::INT);

    let mut parent = ArtifactCache::for_provider(&pool);
    build(&pool, &Renderer, &mut parent, list).unwrap();

    let key = CacheKey::new(Renderer::KIND, list);
    let mut scope = ScopedCache::new(&parent);
    assert!(!scope.evict(&key));
    assert!(scope.lookup(&key).is_some());
    assert!(scope.parent().lookup(&key).is_some());
}

#[test]
fn function_failure_inside_scope_keeps_parent_intact() {
    let mut pool = ShapePool::new();
    let point = RecordBuilder::new("Point")
        .field("x", ShapeId::INT)
        .build(&mut pool)
        .unwrap();
    let func = pool.function(&[("p", point)], Some(ShapeId::INT));

    let mut parent = ArtifactCache::for_provider(&pool);
    build(&pool, &Renderer, &mut parent, point).unwrap();
    let before = parent.len();

    let mut scope = ScopedCache::new(&parent);
    let err = build(&pool, &Renderer, &mut scope, func).err().unwrap();
    assert!(matches!(err, GenError::Unsupported { .. }));
    assert!(scope.is_empty());
    assert_eq!(parent.len(), before);
}

// ── Registry ───────────────────────────────────────────────────

#[test]
fn registry_keeps_providers_apart() {
    let mut first = ShapePool::new();
    let a = RecordBuilder::new("Item")
        .field("id", ShapeId::INT)
        .build(&mut first)
        .unwrap();
    let mut second = ShapePool::new();
    let b = RecordBuilder::new("Item")
        .field("label", ShapeId::STR)
        .build(&mut second)
        .unwrap();

    let registry = ArtifactRegistry::new();
    let ra = registry.get_or_build(&first, &Renderer, a).unwrap();
    let rb = registry.get_or_build(&second, &Renderer, b).unwrap();
    assert_eq!(ra(), "Item(int)");
    assert_eq!(rb(), "Item(str)");
    assert_eq!(registry.len(), 2);

    assert!(registry.remove(first.id()));
    assert!(!registry.remove(first.id()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn registry_serves_concurrent_requests() {
    let pools: Vec<(ShapePool, ShapeId)> = (0..4)
        .map(|_| {
            let mut pool = ShapePool::new();
            let list = pool.list(ShapeId::INT);
            let map = pool.map(ShapeId::STR, list);
            (pool, map)
        })
        .collect();

    let registry = ArtifactRegistry::new();
    let rendered: Vec<String> = (0..64)
        .into_par_iter()
        .map(|i| {
            let (pool, map) = &pools[i % pools.len()];
            registry.get_or_build(pool, &Renderer, *map).unwrap()()
        })
        .collect();

    assert!(rendered
        .iter()
        .all(|r| r == "Map<str, List<int>>(str, List<int>(int))"));
    assert_eq!(registry.len(), pools.len());
    for (pool, _) in &pools {
        assert_eq!(registry.cache_for(pool.id()).lock().len(), 4);
    }
}

// ── Options ────────────────────────────────────────────────────

#[test]
fn options_default_and_override() {
    let options = GenOptions::default();
    assert_eq!(options.duplicate_keys, DuplicateKeyPolicy::Reject);
    assert_eq!(options.max_collection_len, 8);
    assert_eq!(options.max_depth, 6);

    let options = options
        .with_duplicate_keys(DuplicateKeyPolicy::LastWins)
        .with_max_collection_len(2)
        .with_max_depth(1);
    assert_eq!(options.duplicate_keys, DuplicateKeyPolicy::LastWins);
    assert_eq!(options.max_collection_len, 2);
    assert_eq!(options.max_depth, 1);
}
