use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tessel_gen::construct::{self, ObjectAssembler};
use tessel_gen::{
    ArtifactKind, Builder, Delayed, GenError, GenOptions, GenResult, GenerationContext,
};
use tessel_shape::{
    Dims, DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Node, ObjectShape,
    OptionalShape, PrimitiveKind, ShapeNode, ShapeVisitor, SurrogateShape, UnionShape, Value,
};
use tessel_stack::ensure_sufficient_stack;
use tracing::trace;

use super::{Document, GRID_DIMS, GRID_ITEMS};

pub type DecodeFn = Arc<dyn Fn(&Document) -> GenResult<Value> + Send + Sync>;

fn decode_fn(f: impl Fn(&Document) -> GenResult<Value> + Send + Sync + 'static) -> DecodeFn {
    Arc::new(f)
}

/// Builds document-to-value decoders.
///
/// Decoding constructs values the way the shapes declare: records through
/// their constructor or default factory, collections through their
/// construction strategy. Record members the shape does not know are
/// skipped.
#[derive(Clone, Default)]
pub struct Decoder {
    options: GenOptions,
    converters: FxHashMap<Arc<str>, DecodeFn>,
}

impl Decoder {
    pub fn new(options: GenOptions) -> Self {
        Decoder {
            options,
            converters: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_converter(
        mut self,
        type_name: &str,
        convert: impl Fn(&Document) -> GenResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.converters
            .insert(Arc::from(type_name), decode_fn(convert));
        self
    }
}

impl Builder for Decoder {
    type Artifact = DecodeFn;
    const KIND: ArtifactKind = ArtifactKind::new("decoder");

    fn delayed(&self, delayed: Delayed<DecodeFn>) -> DecodeFn {
        decode_fn(move |doc| ensure_sufficient_stack(|| (delayed.get())(doc)))
    }
}

fn mismatch(type_name: &str, expected: &'static str, found: &Document) -> GenError {
    GenError::mismatch(type_name, expected, found.kind_name())
}

#[expect(clippy::cast_precision_loss, reason = "integers are valid float input")]
fn decode_scalar(kind: PrimitiveKind, type_name: &str, doc: &Document) -> GenResult<Value> {
    let value = match (kind, doc) {
        (PrimitiveKind::Unit, Document::Null) => Value::Unit,
        (PrimitiveKind::Bool, Document::Bool(b)) => Value::Bool(*b),
        (PrimitiveKind::Int, Document::Int(n)) => Value::Int(*n),
        (PrimitiveKind::Int, Document::UInt(n)) => match i64::try_from(*n) {
            Ok(n) => Value::Int(n),
            Err(_) => return Err(GenError::mismatch(type_name, "int", n.to_string())),
        },
        (PrimitiveKind::UInt, Document::UInt(n)) => Value::UInt(*n),
        (PrimitiveKind::UInt, Document::Int(n)) => match u64::try_from(*n) {
            Ok(n) => Value::UInt(n),
            Err(_) => return Err(GenError::mismatch(type_name, "uint", n.to_string())),
        },
        (PrimitiveKind::Float, Document::Float(x)) => Value::Float(*x),
        (PrimitiveKind::Float, Document::Int(n)) => Value::Float(*n as f64),
        (PrimitiveKind::Char, Document::Str(s)) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(GenError::mismatch(type_name, "one character", s.as_str())),
            }
        }
        (PrimitiveKind::Str, Document::Str(s)) => Value::string(s),
        (PrimitiveKind::Bytes, Document::Bytes(b)) => Value::bytes(b),
        (PrimitiveKind::Timestamp, Document::Int(n)) => Value::Timestamp(*n),
        _ => return Err(mismatch(type_name, kind.name(), doc)),
    };
    Ok(value)
}

/// Split a grid document into its dimensions and row-major items.
fn grid_parts<'d>(type_name: &str, doc: &'d Document) -> GenResult<(Dims, &'d [Document])> {
    let (Some(Document::Seq(dims)), Some(Document::Seq(items))) =
        (doc.member(GRID_DIMS), doc.member(GRID_ITEMS))
    else {
        return Err(mismatch(type_name, "grid record", doc));
    };
    let mut out: Dims = SmallVec::new();
    for dim in dims {
        match dim {
            Document::UInt(d) => out.push(usize::try_from(*d).map_err(|_| {
                GenError::mismatch(type_name, "grid dimension", d.to_string())
            })?),
            other => return Err(mismatch(type_name, "grid dimension", other)),
        }
    }
    Ok((out, items))
}

impl<'a> ShapeVisitor<GenerationContext<'a, Decoder>> for Decoder {
    type Output = GenResult<DecodeFn>;

    fn invoke(
        &self,
        node: ShapeNode<'_>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        if let Some(convert) = self.converters.get(node.name()) {
            trace!(type_name = node.name(), "custom decoder");
            return Ok(Arc::clone(convert));
        }
        node.accept(self, cx)
    }

    fn visit_primitive(
        &self,
        node: Node<'_, PrimitiveKind>,
        _: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let kind = *node.data();
        let type_name: Arc<str> = Arc::from(node.name);
        Ok(decode_fn(move |doc| decode_scalar(kind, &type_name, doc)))
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let type_name = cx.type_name(node.id);
        construct::check_object(node.data(), &type_name)?;

        let mut members: FxHashMap<Arc<str>, (usize, DecodeFn)> = FxHashMap::default();
        for (index, prop) in node.properties.iter().enumerate() {
            if construct::is_assignable(node.data(), index) {
                members.insert(Arc::clone(&prop.name), (index, cx.get_or_add(prop.shape)?));
            }
        }

        let shape = Arc::new(node.data().clone());
        Ok(decode_fn(move |doc| {
            let Document::Record(fields) = doc else {
                return Err(mismatch(&type_name, "record", doc));
            };
            let mut assembler = ObjectAssembler::new(&shape, &type_name);
            for (name, field) in fields {
                let Some((index, decode)) = members.get(name.as_str()) else {
                    trace!(type_name = &*type_name, member = name.as_str(), "skipping unknown member");
                    continue;
                };
                // Checked before decoding so the error names the member, not
                // whatever its second value failed on.
                if assembler.is_set(*index) {
                    return Err(GenError::DuplicateProperty {
                        type_name: Arc::clone(&type_name),
                        property: Arc::from(name.as_str()),
                    });
                }
                assembler.set(*index, decode(field)?)?;
            }
            assembler.finish()
        }))
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let type_name = cx.type_name(node.id);
        let ordinals: FxHashMap<String, i64> = node
            .members
            .iter()
            .map(|m| (m.name.to_string(), m.ordinal))
            .collect();
        let from_ordinal = Arc::clone(&node.from_ordinal);
        Ok(decode_fn(move |doc| {
            let ordinal = match doc {
                Document::Str(name) => match ordinals.get(name) {
                    Some(&ordinal) => ordinal,
                    None => {
                        return Err(GenError::mismatch(
                            Arc::clone(&type_name),
                            "enum member",
                            name.as_str(),
                        ))
                    }
                },
                Document::Int(ordinal) => *ordinal,
                other => return Err(mismatch(&type_name, "enum member", other)),
            };
            Ok(from_ordinal(ordinal)?)
        }))
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let inner = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(decode_fn(move |doc| match doc {
            Document::Null => Ok((shape.none)()),
            present => Ok((shape.some)(inner(present)?)),
        }))
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let type_name = cx.type_name(node.id);
        construct::check_strategy(&node.construction, &type_name)?;
        let element = cx.get_or_add(node.element)?;
        let shape = node.data().clone();
        Ok(decode_fn(move |doc| {
            let (dims, items) = if shape.rank > 1 {
                let (dims, items) = grid_parts(&type_name, doc)?;
                (Some(dims), items)
            } else {
                match doc {
                    Document::Seq(items) => (None, items.as_slice()),
                    other => return Err(mismatch(&type_name, "sequence", other)),
                }
            };
            let values = items.iter().map(|item| element(item));
            construct::collect_enumerable(&shape, &type_name, dims, values)
        }))
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let type_name = cx.type_name(node.id);
        construct::check_strategy(&node.construction, &type_name)?;
        let key = cx.get_or_add(node.key)?;
        let val = cx.get_or_add(node.value)?;
        let shape = node.data().clone();
        let policy = self.options.duplicate_keys;
        Ok(decode_fn(move |doc| {
            let Document::Map(entries) = doc else {
                return Err(mismatch(&type_name, "map", doc));
            };
            let decoded = entries
                .iter()
                .map(|(k, v)| -> GenResult<(Value, Value)> { Ok((key(k)?, val(v)?)) });
            construct::collect_dictionary(&shape, &type_name, policy, decoded)
        }))
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let inner = cx.get_or_add(node.surrogate)?;
        let from = Arc::clone(&node.from_surrogate);
        Ok(decode_fn(move |doc| Ok(from(inner(doc)?)?)))
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        let type_name = cx.type_name(node.id);
        let base = cx.get_or_add(node.base)?;
        let mut cases: FxHashMap<i32, (tessel_shape::Rebuild, DecodeFn)> = FxHashMap::default();
        for case in &node.cases {
            cases.insert(case.tag, (Arc::clone(&case.upcast), cx.get_or_add(case.shape)?));
        }
        Ok(decode_fn(move |doc| match doc {
            Document::Tagged { tag, value } => match cases.get(tag) {
                Some((upcast, decode)) => Ok(upcast(decode(&**value)?)?),
                None => Err(GenError::mismatch(
                    Arc::clone(&type_name),
                    "known union tag",
                    tag.to_string(),
                )),
            },
            untagged => base(untagged),
        }))
    }

    fn visit_function(
        &self,
        node: Node<'_, FunctionShape>,
        cx: &mut GenerationContext<'a, Decoder>,
    ) -> GenResult<DecodeFn> {
        Err(cx.unsupported(node.id, "functions have no document form"))
    }
}
