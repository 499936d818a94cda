//! Deep structural clone.
//!
//! A clone is rebuilt, not copied: every record goes back through its
//! constructor or default factory, and every collection through its declared
//! construction strategy. The result is the value a decoder would produce for
//! the same data.

use std::sync::Arc;

use tessel_gen::construct::{self, ObjectAssembler};
use tessel_gen::{
    ArtifactKind, Builder, Delayed, GenError, GenOptions, GenResult, GenerationContext,
};
use tessel_shape::{
    DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Node, ObjectShape,
    OptionalShape, PrimitiveKind, ShapeVisitor, SurrogateShape, UnionShape, Value,
};
use tessel_stack::ensure_sufficient_stack;

pub type CloneFn = Arc<dyn Fn(&Value) -> GenResult<Value> + Send + Sync>;

fn clone_fn(f: impl Fn(&Value) -> GenResult<Value> + Send + Sync + 'static) -> CloneFn {
    Arc::new(f)
}

#[derive(Clone, Debug, Default)]
pub struct Cloner {
    options: GenOptions,
}

impl Cloner {
    pub fn new(options: GenOptions) -> Self {
        Cloner { options }
    }
}

impl Builder for Cloner {
    type Artifact = CloneFn;
    const KIND: ArtifactKind = ArtifactKind::new("cloner");

    fn delayed(&self, delayed: Delayed<CloneFn>) -> CloneFn {
        clone_fn(move |value| ensure_sufficient_stack(|| (delayed.get())(value)))
    }
}

impl<'a> ShapeVisitor<GenerationContext<'a, Cloner>> for Cloner {
    type Output = GenResult<CloneFn>;

    fn visit_primitive(
        &self,
        _: Node<'_, PrimitiveKind>,
        _: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        // Scalars and strings are immutable; sharing is a clone.
        Ok(clone_fn(|value| Ok(value.clone())))
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        let type_name = cx.type_name(node.id);
        construct::check_object(node.data(), &type_name)?;

        // Properties that are read but cannot be written back are derived
        // state and are recomputed by the constructor.
        let mut members = Vec::new();
        for (index, prop) in node.properties.iter().enumerate() {
            let Some(getter) = prop.getter.clone() else {
                continue;
            };
            if !construct::is_assignable(node.data(), index) {
                continue;
            }
            members.push((index, getter, cx.get_or_add(prop.shape)?));
        }

        let shape = Arc::new(node.data().clone());
        Ok(clone_fn(move |value| {
            let mut assembler = ObjectAssembler::new(&shape, &type_name);
            for (index, getter, clone) in &members {
                assembler.set(*index, clone(&getter(value)?)?)?;
            }
            assembler.finish()
        }))
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        _: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        let ordinal_of = Arc::clone(&node.ordinal_of);
        let from_ordinal = Arc::clone(&node.from_ordinal);
        Ok(clone_fn(move |value| Ok(from_ordinal(ordinal_of(value)?)?)))
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        let inner = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(clone_fn(move |value| match (shape.deconstruct)(value)? {
            Some(present) => Ok((shape.some)(inner(&present)?)),
            None => Ok((shape.none)()),
        }))
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        let type_name = cx.type_name(node.id);
        construct::check_strategy(&node.construction, &type_name)?;
        let element = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(clone_fn(move |value| {
            let dims = construct::dimensions(&shape, &type_name, value)?;
            let items = construct::elements(&shape, value)?.map(|item| element(&item));
            construct::collect_enumerable(&shape, &type_name, dims, items)
        }))
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        let type_name = cx.type_name(node.id);
        construct::check_strategy(&node.construction, &type_name)?;
        let key = cx.get_or_add(node.key)?;
        let val = cx.get_or_add(node.value)?;
        let shape = node.data().clone();
        let policy = self.options.duplicate_keys;
        Ok(clone_fn(move |value| {
            let entries = (shape.entries)(value)?
                .map(|(k, v)| -> GenResult<(Value, Value)> { Ok((key(&k)?, val(&v)?)) });
            construct::collect_dictionary(&shape, &type_name, policy, entries)
        }))
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        let inner = cx.get_or_add(node.surrogate)?;
        let shape = node.data().clone();
        Ok(clone_fn(move |value| {
            let surrogate = inner(&(shape.to_surrogate)(value)?)?;
            Ok((shape.from_surrogate)(surrogate)?)
        }))
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        let type_name = cx.type_name(node.id);
        let base = cx.get_or_add(node.base)?;
        let mut cases = Vec::with_capacity(node.cases.len());
        for case in &node.cases {
            let clone = cx.get_or_add(case.shape)?;
            cases.push((Arc::clone(&case.downcast), Arc::clone(&case.upcast), clone));
        }
        let selector = Arc::clone(&node.selector);
        Ok(clone_fn(move |value| {
            let Some(index) = selector(value) else {
                return base(value);
            };
            let Some((downcast, upcast, clone)) = cases.get(index) else {
                return Err(GenError::construction(
                    Arc::clone(&type_name),
                    format!("selector chose case {index} of {}", cases.len()),
                ));
            };
            Ok(upcast(clone(&downcast(value)?)?)?)
        }))
    }

    fn visit_function(
        &self,
        _: Node<'_, FunctionShape>,
        _: &mut GenerationContext<'a, Cloner>,
    ) -> GenResult<CloneFn> {
        // Function values are immutable handles.
        Ok(clone_fn(|value| Ok(value.clone())))
    }
}
