//! Structural equality and hashing.
//!
//! Two values are equal when every readable member is equal under the
//! member type's own comparer. Hashes agree with equality: equal values hash
//! the same, including dictionaries whose entries were produced in different
//! orders.

use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

use rustc_hash::{FxBuildHasher, FxHashMap, FxHasher};
use tessel_gen::construct;
use tessel_gen::{ArtifactKind, Builder, Delayed, GenResult, GenerationContext};
use tessel_shape::{
    DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Getter, Node, ObjectShape,
    OptionalShape, PrimitiveKind, ShapeVisitor, SurrogateShape, UnionShape, Value,
};
use tessel_stack::ensure_sufficient_stack;

type EqFn = Arc<dyn Fn(&Value, &Value) -> GenResult<bool> + Send + Sync>;
type HashFn = Arc<dyn Fn(&Value) -> GenResult<u64> + Send + Sync>;

/// Equality and hash for one type.
#[derive(Clone)]
pub struct EqualityArtifact {
    eq: EqFn,
    hash: HashFn,
}

impl EqualityArtifact {
    fn new(
        eq: impl Fn(&Value, &Value) -> GenResult<bool> + Send + Sync + 'static,
        hash: impl Fn(&Value) -> GenResult<u64> + Send + Sync + 'static,
    ) -> Self {
        EqualityArtifact {
            eq: Arc::new(eq),
            hash: Arc::new(hash),
        }
    }

    pub fn eq(&self, a: &Value, b: &Value) -> GenResult<bool> {
        (self.eq)(a, b)
    }

    pub fn hash(&self, value: &Value) -> GenResult<u64> {
        (self.hash)(value)
    }
}

fn combine(parts: impl IntoIterator<Item = u64>) -> u64 {
    let mut hasher = FxHasher::default();
    for part in parts {
        hasher.write_u64(part);
    }
    hasher.finish()
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Comparer;

impl Builder for Comparer {
    type Artifact = EqualityArtifact;
    const KIND: ArtifactKind = ArtifactKind::new("comparer");

    fn delayed(&self, delayed: Delayed<EqualityArtifact>) -> EqualityArtifact {
        let hash_target = delayed.clone();
        EqualityArtifact::new(
            move |a, b| ensure_sufficient_stack(|| delayed.get().eq(a, b)),
            move |value| ensure_sufficient_stack(|| hash_target.get().hash(value)),
        )
    }
}

/// Values compared directly; floats by total order, matching `Value`'s hash.
fn native() -> EqualityArtifact {
    EqualityArtifact::new(
        |a, b| Ok(a == b),
        |value| Ok(FxBuildHasher.hash_one(value)),
    )
}

impl<'a> ShapeVisitor<GenerationContext<'a, Comparer>> for Comparer {
    type Output = GenResult<EqualityArtifact>;

    fn visit_primitive(
        &self,
        _: Node<'_, PrimitiveKind>,
        _: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        Ok(native())
    }

    fn visit_object(
        &self,
        node: Node<'_, ObjectShape>,
        cx: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        let mut members: Vec<(Getter, EqualityArtifact)> = Vec::new();
        for prop in &node.properties {
            if let Some(getter) = &prop.getter {
                members.push((Arc::clone(getter), cx.get_or_add(prop.shape)?));
            }
        }
        let members = Arc::new(members);
        let hash_members = Arc::clone(&members);

        Ok(EqualityArtifact::new(
            move |a, b| {
                for (get, member) in members.iter() {
                    if !member.eq(&get(a)?, &get(b)?)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
            move |value| {
                let mut parts = Vec::with_capacity(hash_members.len());
                for (get, member) in hash_members.iter() {
                    parts.push(member.hash(&get(value)?)?);
                }
                Ok(combine(parts))
            },
        ))
    }

    fn visit_enum(
        &self,
        node: Node<'_, EnumShape>,
        _: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        let ordinal_of = Arc::clone(&node.ordinal_of);
        let hash_ordinal = Arc::clone(&node.ordinal_of);
        Ok(EqualityArtifact::new(
            move |a, b| Ok(ordinal_of(a)? == ordinal_of(b)?),
            move |value| Ok(FxBuildHasher.hash_one(hash_ordinal(value)?)),
        ))
    }

    fn visit_optional(
        &self,
        node: Node<'_, OptionalShape>,
        cx: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        let inner = cx.get_or_add(node.element)?;
        let hash_inner = inner.clone();
        let deconstruct = Arc::clone(&node.deconstruct);
        let hash_deconstruct = Arc::clone(&node.deconstruct);
        Ok(EqualityArtifact::new(
            move |a, b| match (deconstruct(a)?, deconstruct(b)?) {
                (Some(a), Some(b)) => inner.eq(&a, &b),
                (None, None) => Ok(true),
                _ => Ok(false),
            },
            move |value| match hash_deconstruct(value)? {
                Some(present) => Ok(combine([1, hash_inner.hash(&present)?])),
                None => Ok(combine([0])),
            },
        ))
    }

    fn visit_enumerable(
        &self,
        node: Node<'_, EnumerableShape>,
        cx: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        let type_name = cx.type_name(node.id);
        let element = cx.get_or_add(node.element)?;
        let hash_element = element.clone();
        let shape = Arc::new(node.data().clone());
        let hash_shape = Arc::clone(&shape);
        let hash_name = Arc::clone(&type_name);

        Ok(EqualityArtifact::new(
            move |a, b| {
                if construct::dimensions(&shape, &type_name, a)?
                    != construct::dimensions(&shape, &type_name, b)?
                {
                    return Ok(false);
                }
                let mut left = (shape.elements)(a)?;
                let mut right = (shape.elements)(b)?;
                loop {
                    match (left.next(), right.next()) {
                        (Some(x), Some(y)) => {
                            if !element.eq(&x, &y)? {
                                return Ok(false);
                            }
                        }
                        (None, None) => return Ok(true),
                        _ => return Ok(false),
                    }
                }
            },
            move |value| {
                let mut parts = Vec::new();
                if let Some(dims) = construct::dimensions(&hash_shape, &hash_name, value)? {
                    parts.extend(dims.iter().map(|&d| d as u64));
                }
                let mut len = 0u64;
                for item in (hash_shape.elements)(value)? {
                    parts.push(hash_element.hash(&item)?);
                    len += 1;
                }
                parts.push(len);
                Ok(combine(parts))
            },
        ))
    }

    fn visit_dictionary(
        &self,
        node: Node<'_, DictionaryShape>,
        cx: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        let key = cx.get_or_add(node.key)?;
        let value = cx.get_or_add(node.value)?;
        let (hash_key, hash_value) = (key.clone(), value.clone());
        let entries = Arc::clone(&node.entries);
        let hash_entries = Arc::clone(&node.entries);

        Ok(EqualityArtifact::new(
            move |a, b| {
                let left: Vec<(Value, Value)> = entries(a)?.collect();
                let right: Vec<(Value, Value)> = entries(b)?.collect();
                if left.len() != right.len() {
                    return Ok(false);
                }

                let mut buckets: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
                for (index, (k, _)) in right.iter().enumerate() {
                    buckets.entry(key.hash(k)?).or_default().push(index);
                }
                let mut used = vec![false; right.len()];

                for (k, v) in &left {
                    let Some(candidates) = buckets.get(&key.hash(k)?) else {
                        return Ok(false);
                    };
                    let mut matched = None;
                    for &index in candidates {
                        if !used[index] && key.eq(k, &right[index].0)? {
                            matched = Some(index);
                            break;
                        }
                    }
                    let Some(index) = matched else {
                        return Ok(false);
                    };
                    used[index] = true;
                    if !value.eq(v, &right[index].1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
            move |dict| {
                // Order-independent: a wrapping sum of per-entry hashes.
                let mut sum = 0u64;
                let mut len = 0u64;
                for (k, v) in hash_entries(dict)? {
                    sum = sum.wrapping_add(combine([hash_key.hash(&k)?, hash_value.hash(&v)?]));
                    len += 1;
                }
                Ok(combine([len, sum]))
            },
        ))
    }

    fn visit_surrogate(
        &self,
        node: Node<'_, SurrogateShape>,
        cx: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        let inner = cx.get_or_add(node.surrogate)?;
        let hash_inner = inner.clone();
        let to = Arc::clone(&node.to_surrogate);
        let hash_to = Arc::clone(&node.to_surrogate);
        Ok(EqualityArtifact::new(
            move |a, b| inner.eq(&to(a)?, &to(b)?),
            move |value| hash_inner.hash(&hash_to(value)?),
        ))
    }

    fn visit_union(
        &self,
        node: Node<'_, UnionShape>,
        cx: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        let base = cx.get_or_add(node.base)?;
        let mut cases = Vec::with_capacity(node.cases.len());
        for case in &node.cases {
            cases.push((case.tag, Arc::clone(&case.downcast), cx.get_or_add(case.shape)?));
        }
        let cases = Arc::new(cases);
        let hash_cases = Arc::clone(&cases);
        let hash_base = base.clone();
        let selector = Arc::clone(&node.selector);
        let hash_selector = Arc::clone(&node.selector);

        Ok(EqualityArtifact::new(
            move |a, b| match (selector(a), selector(b)) {
                (None, None) => base.eq(a, b),
                (Some(i), Some(j)) if i == j => match cases.get(i) {
                    Some((_, downcast, case)) => case.eq(&downcast(a)?, &downcast(b)?),
                    None => Ok(false),
                },
                _ => Ok(false),
            },
            move |value| match hash_selector(value).and_then(|i| hash_cases.get(i)) {
                Some((tag, downcast, case)) => {
                    Ok(combine([FxBuildHasher.hash_one(tag), case.hash(&downcast(value)?)?]))
                }
                None => hash_base.hash(value),
            },
        ))
    }

    fn visit_function(
        &self,
        _: Node<'_, FunctionShape>,
        _: &mut GenerationContext<'a, Comparer>,
    ) -> GenResult<EqualityArtifact> {
        // Functions compare by identity.
        Ok(native())
    }
}
