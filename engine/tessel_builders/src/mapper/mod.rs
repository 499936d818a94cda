//! Mapping values between providers.
//!
//! Two providers may describe the same logical types independently (two
//! builds of one schema, an old and a new version). A [`Mapper`] converts a
//! value described by a source provider into the value of the same-named
//! type in its target provider, member by member:
//!
//! - objects match properties by name; target members with no source are
//!   left to the target's defaults, and missing required ones are reported
//! - enums match members by name, not by ordinal
//! - unions match cases by name
//! - collections are rebuilt through the target's construction strategy
//!
//! Type names can be redirected with [`Mapper::with_alias`].

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tessel_gen::construct::{self, ObjectAssembler};
use tessel_gen::{
    ArtifactKind, ArtifactRegistry, Builder, Delayed, GenError, GenOptions, GenResult,
    GenerationContext,
};
use tessel_shape::{
    DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Getter, Node, ObjectShape,
    OptionalShape, PrimitiveKind, Shape, ShapeData, ShapeId, ShapeProvider, ShapeVisitor,
    SurrogateShape, UnionShape, Value,
};
use tessel_stack::ensure_sufficient_stack;

pub type MapFn = Arc<dyn Fn(&Value) -> GenResult<Value> + Send + Sync>;

fn map_fn(f: impl Fn(&Value) -> GenResult<Value> + Send + Sync + 'static) -> MapFn {
    Arc::new(f)
}

/// Builds source-to-target converters for one target provider.
///
/// Artifacts depend on the target, so the mapper keeps its own caches (one
/// per source provider) instead of sharing a session cache.
pub struct Mapper {
    target: Arc<dyn ShapeProvider>,
    aliases: FxHashMap<Arc<str>, Arc<str>>,
    options: GenOptions,
    artifacts: ArtifactRegistry,
}

impl Mapper {
    pub fn new(target: Arc<dyn ShapeProvider>, options: GenOptions) -> Self {
        Mapper {
            target,
            aliases: FxHashMap::default(),
            options,
            artifacts: ArtifactRegistry::new(),
        }
    }

    /// Map source type `source` to target type `target` instead of the
    /// target type with the same name.
    #[must_use]
    pub fn with_alias(mut self, source: &str, target: &str) -> Self {
        self.aliases.insert(Arc::from(source), Arc::from(target));
        self
    }

    pub fn target(&self) -> &dyn ShapeProvider {
        &*self.target
    }

    /// The converter for source type `shape`, built on first request.
    pub fn mapping(&self, source: &dyn ShapeProvider, shape: ShapeId) -> GenResult<MapFn> {
        self.artifacts.get_or_build(source, self, shape)
    }

    pub fn map(&self, source: &dyn ShapeProvider, shape: ShapeId, value: &Value) -> GenResult<Value> {
        self.mapping(source, shape)?(value)
    }

    /// Target type corresponding to source type `id`.
    fn counterpart(
        &self,
        cx: &GenerationContext<'_, Mapper>,
        id: ShapeId,
    ) -> GenResult<(ShapeId, &Shape)> {
        let name = cx.type_name(id);
        let target_name = self.aliases.get(&name).map_or(&*name, |alias| &**alias);
        let Some(target_id) = self.target.resolve(target_name) else {
            return Err(cx.unsupported(id, format!("target has no type `{target_name}`")));
        };
        let shape = self.target.shape(target_id).ok_or(GenError::UnknownShape {
            provider: self.target.id(),
            id: target_id,
        })?;
        Ok((target_id, shape))
    }

    /// Check that source child `source` maps onto target child `expected`.
    fn check_child(
        &self,
        cx: &GenerationContext<'_, Mapper>,
        owner: ShapeId,
        what: &str,
        source: ShapeId,
        expected: ShapeId,
    ) -> GenResult<()> {
        let (found, _) = self.counterpart(cx, source)?;
        if found == expected {
            return Ok(());
        }
        Err(cx.unsupported(
            owner,
            format!(
                "{what} is `{}` in the source but `{}` in the target",
                cx.type_name(source),
                self.target.type_name(expected),
            ),
        ))
    }
}

fn kind_mismatch(cx: &GenerationContext<'_, Mapper>, id: ShapeId, target: &Shape) -> GenError {
    cx.unsupported(
        id,
        format!("target `{}` is of kind {}", target.name, target.kind().name()),
    )
}

impl Builder for Mapper {
    type Artifact = MapFn;
    const KIND: ArtifactKind = ArtifactKind::new("mapper");

    fn delayed(&self, delayed: Delayed<MapFn>) -> MapFn {
        map_fn(move |value| ensure_sufficient_stack(|| (delayed.get())(value)))
    }
}

impl<'a> ShapeVisitor<GenerationContext<'a, Mapper>> for Mapper {
    type Output = GenResult<MapFn>;

    fn visit_primitive(
        &self,
        node: Node<'_, PrimitiveKind>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        match &target.data {
            ShapeData::Primitive(kind) if kind == node.data() => {
                Ok(map_fn(|value| Ok(value.clone())))
            }
            _ => Err(kind_mismatch(cx, node.id, target)),
        }
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        let ShapeData::Object(target_obj) = &target.data else {
            return Err(kind_mismatch(cx, node.id, target));
        };
        let type_name = Arc::clone(&target.name);
        construct::check_object(target_obj, &type_name)?;

        let mut members: Vec<(usize, Getter, MapFn)> = Vec::new();
        for (index, target_prop) in target_obj.properties.iter().enumerate() {
            if !construct::is_assignable(target_obj, index) {
                continue;
            }
            let Some((_, source_prop)) = node.property(&target_prop.name) else {
                continue;
            };
            let Some(getter) = source_prop.getter.clone() else {
                continue;
            };
            let what = format!("member `{}`", target_prop.name);
            self.check_child(cx, node.id, &what, source_prop.shape, target_prop.shape)?;
            members.push((index, getter, cx.get_or_add(source_prop.shape)?));
        }

        let shape = Arc::new(target_obj.clone());
        Ok(map_fn(move |value| {
            let mut assembler = ObjectAssembler::new(&shape, &type_name);
            for (index, getter, map) in &members {
                assembler.set(*index, map(&getter(value)?)?)?;
            }
            assembler.finish()
        }))
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        let ShapeData::Enum(target_enum) = &target.data else {
            return Err(kind_mismatch(cx, node.id, target));
        };
        let ordinals: FxHashMap<i64, i64> = node
            .members
            .iter()
            .filter_map(|m| {
                target_enum
                    .member_by_name(&m.name)
                    .map(|t| (m.ordinal, t.ordinal))
            })
            .collect();
        let type_name = Arc::clone(&target.name);
        let ordinal_of = Arc::clone(&node.ordinal_of);
        let from_ordinal = Arc::clone(&target_enum.from_ordinal);
        Ok(map_fn(move |value| {
            let ordinal = ordinal_of(value)?;
            match ordinals.get(&ordinal) {
                Some(&mapped) => Ok(from_ordinal(mapped)?),
                None => Err(GenError::mismatch(
                    Arc::clone(&type_name),
                    "enum member",
                    format!("source ordinal {ordinal}"),
                )),
            }
        }))
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        let ShapeData::Optional(target_opt) = &target.data else {
            return Err(kind_mismatch(cx, node.id, target));
        };
        self.check_child(cx, node.id, "element", node.element, target_opt.element)?;
        let inner = cx.get_or_add(node.element)?;
        let deconstruct = Arc::clone(&node.deconstruct);
        let target_opt = target_opt.clone();
        Ok(map_fn(move |value| match deconstruct(value)? {
            Some(present) => Ok((target_opt.some)(inner(&present)?)),
            None => Ok((target_opt.none)()),
        }))
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        let ShapeData::Enumerable(target_seq) = &target.data else {
            return Err(kind_mismatch(cx, node.id, target));
        };
        if target_seq.rank != node.rank {
            return Err(cx.unsupported(
                node.id,
                format!("rank {} in the source, {} in the target", node.rank, target_seq.rank),
            ));
        }
        let type_name = Arc::clone(&target.name);
        construct::check_strategy(&target_seq.construction, &type_name)?;
        self.check_child(cx, node.id, "element", node.element, target_seq.element)?;
        let element = cx.get_or_add(node.element)?;

        let source_name = cx.type_name(node.id);
        let source = node.data().clone();
        let target_seq = target_seq.clone();
        Ok(map_fn(move |value| {
            let dims = construct::dimensions(&source, &source_name, value)?;
            let items = construct::elements(&source, value)?.map(|item| element(&item));
            construct::collect_enumerable(&target_seq, &type_name, dims, items)
        }))
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        let ShapeData::Dictionary(target_dict) = &target.data else {
            return Err(kind_mismatch(cx, node.id, target));
        };
        let type_name = Arc::clone(&target.name);
        construct::check_strategy(&target_dict.construction, &type_name)?;
        self.check_child(cx, node.id, "key", node.key, target_dict.key)?;
        self.check_child(cx, node.id, "value", node.value, target_dict.value)?;
        let key = cx.get_or_add(node.key)?;
        let val = cx.get_or_add(node.value)?;

        let entries = Arc::clone(&node.entries);
        let target_dict = target_dict.clone();
        let policy = self.options.duplicate_keys;
        Ok(map_fn(move |value| {
            let mapped = entries(value)?
                .map(|(k, v)| -> GenResult<(Value, Value)> { Ok((key(&k)?, val(&v)?)) });
            construct::collect_dictionary(&target_dict, &type_name, policy, mapped)
        }))
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        let ShapeData::Surrogate(target_sur) = &target.data else {
            return Err(kind_mismatch(cx, node.id, target));
        };
        self.check_child(cx, node.id, "surrogate", node.surrogate, target_sur.surrogate)?;
        let inner = cx.get_or_add(node.surrogate)?;
        let to = Arc::clone(&node.to_surrogate);
        let from = Arc::clone(&target_sur.from_surrogate);
        Ok(map_fn(move |value| Ok(from(inner(&to(value)?)?)?)))
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        let (_, target) = self.counterpart(cx, node.id)?;
        let ShapeData::Union(target_union) = &target.data else {
            return Err(kind_mismatch(cx, node.id, target));
        };
        self.check_child(cx, node.id, "base", node.base, target_union.base)?;
        let base = cx.get_or_add(node.base)?;

        // Source case position to (downcast, mapper, target upcast).
        let mut cases = Vec::with_capacity(node.cases.len());
        for case in &node.cases {
            let Some(target_case) = target_union.cases.iter().find(|t| t.name == case.name) else {
                return Err(cx.unsupported(
                    node.id,
                    format!("target has no case `{}`", case.name),
                ));
            };
            let what = format!("case `{}`", case.name);
            self.check_child(cx, node.id, &what, case.shape, target_case.shape)?;
            cases.push((
                Arc::clone(&case.downcast),
                cx.get_or_add(case.shape)?,
                Arc::clone(&target_case.upcast),
            ));
        }

        let selector = Arc::clone(&node.selector);
        Ok(map_fn(move |value| {
            match selector(value).and_then(|index| cases.get(index)) {
                Some((downcast, map, upcast)) => Ok(upcast(map(&downcast(value)?)?)?),
                None => base(value),
            }
        }))
    }

    fn visit_function(
        &self,
        node: Node<'_, FunctionShape>,
        cx: &mut GenerationContext<'a, Mapper>,
    ) -> GenResult<MapFn> {
        Err(cx.unsupported(node.id, "functions are not mapped"))
    }
}
