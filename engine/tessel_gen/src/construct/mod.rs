//! Building values through a shape's declared construction protocol.
//!
//! Every builder that produces values (clone, decode, generate, map) funnels
//! collection and object construction through this module, so the strategy
//! branch exists once:
//!
//! | Strategy       | Enumerable                      | Dictionary                      |
//! |----------------|---------------------------------|---------------------------------|
//! | `Mutable`      | create, then `add` each element | create, then `add` each entry   |
//! | `BufferedSpan` | collect, build from the buffer  | collect, build from the buffer  |
//! | `LazySequence` | hand the source to the builder  | hand the source to the builder  |
//! | `Unsupported`  | error                           | error                           |
//!
//! Dictionaries built through `Mutable` or `BufferedSpan` are checked for
//! duplicate keys afterwards: if the built dictionary is smaller than the
//! number of entries fed in, the first repeated key is found by a second pass
//! and reported.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tessel_shape::{
    ArgumentState, ConstructionStrategy, ConstructorShape, Dims, DictionaryShape,
    EnumerableShape, ObjectShape, SpanBuffer, Value, ValueIter,
};

use crate::{DuplicateKeyPolicy, GenError, GenResult};

/// Adapts a fallible source to the infallible iterator a lazy constructor
/// expects. The first error ends the sequence and is kept for the caller.
struct UntilError<'e, I> {
    inner: I,
    error: &'e mut Option<GenError>,
}

impl<T, I> Iterator for UntilError<'_, I>
where
    I: Iterator<Item = GenResult<T>>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.error.is_some() {
            return None;
        }
        match self.inner.next()? {
            Ok(item) => Some(item),
            Err(err) => {
                *self.error = Some(err);
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

/// Run a lazy constructor over a fallible source.
fn drain_lazy<T>(
    build: &(dyn Fn(&mut dyn Iterator<Item = T>) -> Result<Value, tessel_shape::ShapeError>
          + Send
          + Sync),
    source: impl Iterator<Item = GenResult<T>>,
) -> GenResult<Value> {
    let mut failure = None;
    let built = {
        let mut items = UntilError {
            inner: source,
            error: &mut failure,
        };
        build(&mut items)
    };
    if let Some(err) = failure {
        return Err(err);
    }
    Ok(built?)
}

/// Fail at build time for shapes whose values can never be produced.
///
/// Builders that construct values call this before composing an artifact, so
/// an unsupported collection is reported once, when the artifact is built,
/// rather than on every call.
pub fn check_strategy<T>(strategy: &ConstructionStrategy<T>, type_name: &str) -> GenResult<()> {
    match strategy {
        ConstructionStrategy::Unsupported => Err(GenError::construction(
            type_name,
            "construction strategy is unsupported",
        )),
        _ => Ok(()),
    }
}

/// Fail at build time for objects with neither a constructor nor a default
/// factory.
pub fn check_object(shape: &ObjectShape, type_name: &str) -> GenResult<()> {
    if shape.constructor.is_none() && shape.create_default.is_none() {
        return Err(GenError::construction(
            type_name,
            "no constructor or default factory",
        ));
    }
    Ok(())
}

/// Whether `finish` can place property `index`, either through a
/// constructor parameter or a setter.
pub fn is_assignable(shape: &ObjectShape, index: usize) -> bool {
    let via_ctor = shape
        .constructor
        .as_ref()
        .is_some_and(|ctor| ctor.param_for_property(index).is_some());
    via_ctor || shape.properties.get(index).is_some_and(|p| p.is_writable())
}

/// Elements of an enumerable value, in encounter order.
pub fn elements<'v>(shape: &EnumerableShape, value: &'v Value) -> GenResult<ValueIter<'v>> {
    Ok((shape.elements)(value)?)
}

/// Dimensions of a multi-rank enumerable value; `None` for rank 1.
pub fn dimensions(
    shape: &EnumerableShape,
    type_name: &str,
    value: &Value,
) -> GenResult<Option<Dims>> {
    if shape.rank <= 1 {
        return Ok(None);
    }
    match &shape.dimensions {
        Some(dims) => Ok(Some(dims(value)?)),
        None => Err(GenError::construction(
            type_name,
            format!("rank {} enumerable has no dimensions accessor", shape.rank),
        )),
    }
}

/// Build an enumerable from `items` through its declared strategy.
///
/// `dims` is required for rank > 1 and describes the row-major layout of
/// `items`.
pub fn collect_enumerable<I>(
    shape: &EnumerableShape,
    type_name: &str,
    dims: Option<Dims>,
    items: I,
) -> GenResult<Value>
where
    I: IntoIterator<Item = GenResult<Value>>,
{
    let items = items.into_iter();

    if shape.rank > 1 && !matches!(shape.construction, ConstructionStrategy::BufferedSpan(_)) {
        return Err(GenError::construction(
            type_name,
            format!(
                "rank {} enumerable must be buffered, declared {}",
                shape.rank,
                shape.construction.kind()
            ),
        ));
    }

    match &shape.construction {
        ConstructionStrategy::Mutable { create, add } => {
            let mut collection = create(items.size_hint().0);
            for item in items {
                add(&mut collection, item?)?;
            }
            Ok(collection)
        }
        ConstructionStrategy::BufferedSpan(build) => {
            let buffer = items.collect::<GenResult<Vec<_>>>()?;
            let span = if shape.rank > 1 {
                let dims = dims.ok_or_else(|| {
                    GenError::construction(type_name, "grid dimensions were not supplied")
                })?;
                SpanBuffer::shaped(buffer, dims)?
            } else {
                SpanBuffer::linear(buffer)
            };
            Ok(build(span)?)
        }
        ConstructionStrategy::LazySequence(build) => drain_lazy(&**build, items),
        ConstructionStrategy::Unsupported => Err(GenError::construction(
            type_name,
            "construction strategy is unsupported",
        )),
    }
}

/// Build a dictionary from `entries` through its declared strategy.
pub fn collect_dictionary<I>(
    shape: &DictionaryShape,
    type_name: &str,
    policy: DuplicateKeyPolicy,
    entries: I,
) -> GenResult<Value>
where
    I: IntoIterator<Item = GenResult<(Value, Value)>>,
{
    let entries = entries.into_iter();
    let check = policy == DuplicateKeyPolicy::Reject;

    match &shape.construction {
        ConstructionStrategy::Mutable { create, add } => {
            let mut dictionary = create(entries.size_hint().0);
            let mut keys = Vec::new();
            for entry in entries {
                let (key, value) = entry?;
                if check {
                    keys.push(key.clone());
                }
                add(&mut dictionary, (key, value))?;
            }
            if check {
                check_duplicates(shape, type_name, &dictionary, &keys)?;
            }
            Ok(dictionary)
        }
        ConstructionStrategy::BufferedSpan(build) => {
            let buffer = entries.collect::<GenResult<Vec<_>>>()?;
            let keys: Vec<Value> = if check {
                buffer.iter().map(|(k, _)| k.clone()).collect()
            } else {
                Vec::new()
            };
            let dictionary = build(SpanBuffer::linear(buffer))?;
            if check {
                check_duplicates(shape, type_name, &dictionary, &keys)?;
            }
            Ok(dictionary)
        }
        ConstructionStrategy::LazySequence(build) => drain_lazy(&**build, entries),
        ConstructionStrategy::Unsupported => Err(GenError::construction(
            type_name,
            "construction strategy is unsupported",
        )),
    }
}

/// Compare the built size against the keys fed in; on a shortfall, find the
/// first key that repeats.
fn check_duplicates(
    shape: &DictionaryShape,
    type_name: &str,
    dictionary: &Value,
    keys: &[Value],
) -> GenResult<()> {
    let built = (shape.len)(dictionary)?;
    if built >= keys.len() {
        return Ok(());
    }

    let mut seen = FxHashSet::default();
    for key in keys {
        if !seen.insert(key) {
            return Err(GenError::DuplicateKey {
                type_name: Arc::from(type_name),
                key: key.clone(),
            });
        }
    }

    // The collection dropped entries for a reason other than equal keys.
    Err(GenError::construction(
        type_name,
        format!("built {built} entries from {} inputs", keys.len()),
    ))
}

/// Required members a constructor-built object lacks, in property order.
/// Parameters bound to no property follow in parameter order.
fn missing_with_constructor(
    shape: &ObjectShape,
    ctor: &ConstructorShape,
    args: &ArgumentState,
    deferred: &[(usize, Value)],
) -> Vec<Arc<str>> {
    let mut missing = Vec::new();
    for (index, prop) in shape.properties.iter().enumerate() {
        let absent = match ctor.param_for_property(index) {
            Some(param) => ctor.params[param].required && !args.is_set(param),
            None => prop.is_required() && !deferred.iter().any(|(i, _)| *i == index),
        };
        if absent {
            missing.push(Arc::clone(&prop.name));
        }
    }
    for (param, shape) in ctor.params.iter().enumerate() {
        if shape.property.is_none() && shape.required && !args.is_set(param) {
            missing.push(Arc::clone(&shape.name));
        }
    }
    missing
}

/// Collects property values for one object, then builds it through the
/// object's constructor or its default factory and setters.
pub struct ObjectAssembler<'s> {
    shape: &'s ObjectShape,
    type_name: &'s str,
    values: Vec<Option<Value>>,
}

impl<'s> ObjectAssembler<'s> {
    pub fn new(shape: &'s ObjectShape, type_name: &'s str) -> Self {
        ObjectAssembler {
            shape,
            type_name,
            values: vec![None; shape.properties.len()],
        }
    }

    /// Supply property `index`. Fails if it was already supplied.
    pub fn set(&mut self, index: usize, value: Value) -> GenResult<()> {
        let Some(slot) = self.values.get_mut(index) else {
            return Err(GenError::construction(
                self.type_name,
                format!("no property at index {index}"),
            ));
        };
        if slot.is_some() {
            return Err(GenError::DuplicateProperty {
                type_name: Arc::from(self.type_name),
                property: Arc::clone(&self.shape.properties[index].name),
            });
        }
        *slot = Some(value);
        Ok(())
    }

    pub fn is_set(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    /// Build the object. Reports every missing required member at once.
    pub fn finish(self) -> GenResult<Value> {
        let ObjectAssembler {
            shape,
            type_name,
            values,
        } = self;

        if let Some(ctor) = &shape.constructor {
            let mut args = ArgumentState::new(ctor.params.len());
            let mut deferred = Vec::new();
            for (index, value) in values.into_iter().enumerate() {
                let Some(value) = value else { continue };
                match ctor.param_for_property(index) {
                    Some(param) => {
                        args.set(param, value);
                    }
                    None => deferred.push((index, value)),
                }
            }

            let missing = missing_with_constructor(shape, ctor, &args, &deferred);
            if !missing.is_empty() {
                return Err(GenError::MissingRequired {
                    type_name: Arc::from(type_name),
                    missing,
                });
            }

            let mut object = (ctor.construct)(args)?;
            for (index, value) in deferred {
                let prop = &shape.properties[index];
                let Some(setter) = &prop.setter else {
                    return Err(GenError::construction(
                        type_name,
                        format!("property `{}` has no setter", prop.name),
                    ));
                };
                setter(&mut object, value)?;
            }
            return Ok(object);
        }

        let Some(create) = &shape.create_default else {
            return Err(GenError::construction(
                type_name,
                "no constructor or default factory",
            ));
        };

        let missing: Vec<Arc<str>> = shape
            .properties
            .iter()
            .zip(&values)
            .filter(|(prop, value)| prop.is_required() && value.is_none())
            .map(|(prop, _)| Arc::clone(&prop.name))
            .collect();
        if !missing.is_empty() {
            return Err(GenError::MissingRequired {
                type_name: Arc::from(type_name),
                missing,
            });
        }

        let mut object = create();
        for (prop, value) in shape.properties.iter().zip(values) {
            if let (Some(setter), Some(value)) = (&prop.setter, value) {
                setter(&mut object, value)?;
            }
        }
        Ok(object)
    }
}
