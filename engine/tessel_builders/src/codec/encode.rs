use std::sync::Arc;

use rustc_hash::FxHashMap;
use tessel_gen::construct;
use tessel_gen::{ArtifactKind, Builder, Delayed, GenError, GenResult, GenerationContext};
use tessel_shape::{
    DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Getter, Node, ObjectShape,
    OptionalShape, PrimitiveKind, ShapeError, ShapeNode, ShapeVisitor, SurrogateShape,
    UnionShape, Value,
};
use tessel_stack::ensure_sufficient_stack;
use tracing::trace;

use super::{Document, GRID_DIMS, GRID_ITEMS};

pub type EncodeFn = Arc<dyn Fn(&Value) -> GenResult<Document> + Send + Sync>;

fn encode_fn(f: impl Fn(&Value) -> GenResult<Document> + Send + Sync + 'static) -> EncodeFn {
    Arc::new(f)
}

/// Builds value-to-document encoders.
///
/// Converters registered by type name replace the shape-derived encoder for
/// that type, wherever it appears in a graph. Artifacts depend on the
/// converter set, so encoders with different converters need separate
/// caches.
#[derive(Clone, Default)]
pub struct Encoder {
    converters: FxHashMap<Arc<str>, EncodeFn>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_converter(
        mut self,
        type_name: &str,
        convert: impl Fn(&Value) -> GenResult<Document> + Send + Sync + 'static,
    ) -> Self {
        self.converters
            .insert(Arc::from(type_name), encode_fn(convert));
        self
    }
}

impl Builder for Encoder {
    type Artifact = EncodeFn;
    const KIND: ArtifactKind = ArtifactKind::new("encoder");

    fn delayed(&self, delayed: Delayed<EncodeFn>) -> EncodeFn {
        encode_fn(move |value| ensure_sufficient_stack(|| (delayed.get())(value)))
    }
}

fn encode_scalar(kind: PrimitiveKind, type_name: &str, value: &Value) -> GenResult<Document> {
    let doc = match (kind, value) {
        (PrimitiveKind::Unit, Value::Unit) => Document::Null,
        (PrimitiveKind::Bool, Value::Bool(b)) => Document::Bool(*b),
        (PrimitiveKind::Int, Value::Int(n)) | (PrimitiveKind::Timestamp, Value::Timestamp(n)) => {
            Document::Int(*n)
        }
        (PrimitiveKind::UInt, Value::UInt(n)) => Document::UInt(*n),
        (PrimitiveKind::Float, Value::Float(x)) => Document::Float(*x),
        (PrimitiveKind::Char, Value::Char(c)) => Document::Str(c.to_string()),
        (PrimitiveKind::Str, Value::Str(s)) => Document::Str(s.to_string()),
        (PrimitiveKind::Bytes, Value::Bytes(b)) => Document::Bytes(b.to_vec()),
        _ => {
            return Err(GenError::mismatch(
                type_name,
                kind.name(),
                value.kind_name(),
            ))
        }
    };
    Ok(doc)
}

impl<'a> ShapeVisitor<GenerationContext<'a, Encoder>> for Encoder {
    type Output = GenResult<EncodeFn>;

    fn invoke(
        &self,
        node: ShapeNode<'_>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        if let Some(convert) = self.converters.get(node.name()) {
            trace!(type_name = node.name(), "custom encoder");
            return Ok(Arc::clone(convert));
        }
        node.accept(self, cx)
    }

    fn visit_primitive(
        &self,
        node: Node<'_, PrimitiveKind>,
        _: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let kind = *node.data();
        let type_name: Arc<str> = Arc::from(node.name);
        Ok(encode_fn(move |value| encode_scalar(kind, &type_name, value)))
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let mut members: Vec<(String, Getter, EncodeFn)> = Vec::new();
        for prop in &node.properties {
            if let Some(getter) = &prop.getter {
                members.push((
                    prop.name.to_string(),
                    Arc::clone(getter),
                    cx.get_or_add(prop.shape)?,
                ));
            }
        }
        Ok(encode_fn(move |value| {
            let mut out = Vec::with_capacity(members.len());
            for (name, get, encode) in &members {
                out.push((name.clone(), encode(&get(value)?)?));
            }
            Ok(Document::Record(out))
        }))
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let type_name = cx.type_name(node.id);
        let names: FxHashMap<i64, String> = node
            .members
            .iter()
            .map(|m| (m.ordinal, m.name.to_string()))
            .collect();
        let ordinal_of = Arc::clone(&node.ordinal_of);
        Ok(encode_fn(move |value| {
            let ordinal = ordinal_of(value)?;
            match names.get(&ordinal) {
                Some(name) => Ok(Document::Str(name.clone())),
                None => Err(ShapeError::UnknownOrdinal {
                    type_name: Arc::clone(&type_name),
                    ordinal,
                }
                .into()),
            }
        }))
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let inner = cx.get_or_add(node.element)?;
        let deconstruct = Arc::clone(&node.deconstruct);
        Ok(encode_fn(move |value| match deconstruct(value)? {
            Some(present) => inner(&present),
            None => Ok(Document::Null),
        }))
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let type_name = cx.type_name(node.id);
        let element = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(encode_fn(move |value| {
            let items = construct::elements(&shape, value)?
                .map(|item| element(&item))
                .collect::<GenResult<Vec<_>>>()?;
            match construct::dimensions(&shape, &type_name, value)? {
                None => Ok(Document::Seq(items)),
                Some(dims) => {
                    let dims = dims.iter().map(|&d| Document::UInt(d as u64)).collect();
                    Ok(Document::record([
                        (GRID_DIMS, Document::Seq(dims)),
                        (GRID_ITEMS, Document::Seq(items)),
                    ]))
                }
            }
        }))
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let key = cx.get_or_add(node.key)?;
        let val = cx.get_or_add(node.value)?;
        let entries = Arc::clone(&node.entries);
        Ok(encode_fn(move |value| {
            let mut out = Vec::new();
            for (k, v) in entries(value)? {
                out.push((key(&k)?, val(&v)?));
            }
            Ok(Document::Map(out))
        }))
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let inner = cx.get_or_add(node.surrogate)?;
        let to = Arc::clone(&node.to_surrogate);
        Ok(encode_fn(move |value| inner(&to(value)?)))
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        let base = cx.get_or_add(node.base)?;
        let mut cases = Vec::with_capacity(node.cases.len());
        for case in &node.cases {
            cases.push((case.tag, Arc::clone(&case.downcast), cx.get_or_add(case.shape)?));
        }
        let selector = Arc::clone(&node.selector);
        Ok(encode_fn(move |value| {
            match selector(value).and_then(|index| cases.get(index)) {
                Some((tag, downcast, encode)) => {
                    Ok(Document::tagged(*tag, encode(&downcast(value)?)?))
                }
                None => base(value),
            }
        }))
    }

    fn visit_function(
        &self,
        node: Node<'_, FunctionShape>,
        cx: &mut GenerationContext<'a, Encoder>,
    ) -> GenResult<EncodeFn> {
        Err(cx.unsupported(node.id, "functions have no document form"))
    }
}
