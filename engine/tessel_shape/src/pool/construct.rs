//! Stock shape constructors.
//!
//! Each constructor interns its shape under a derived type name and records
//! the generic instance, so `resolve_generic("List", &[INT])` finds what
//! `list(INT)` created. The value forms match [`Value`]'s collection variants.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::ShapePool;
use crate::{
    ConstructionStrategy, Dims, DictionaryShape, EntryIter, EnumMember, EnumShape,
    EnumerableShape, FunctionParam, FunctionShape, OptionalShape, ShapeData, ShapeError, ShapeId,
    SpanBuffer, SurrogateShape, UnionCase, UnionShape, Value, ValueIter,
};

// Accessors are plain fns rather than closures so their signatures are
// higher-ranked over the borrowed value.

fn list_elements(value: &Value) -> Result<ValueIter<'_>, ShapeError> {
    Ok(Box::new(value.as_list()?.iter().cloned()))
}

fn set_elements(value: &Value) -> Result<ValueIter<'_>, ShapeError> {
    Ok(Box::new(value.as_set()?.iter().cloned()))
}

fn grid_elements(value: &Value) -> Result<ValueIter<'_>, ShapeError> {
    Ok(Box::new(value.as_grid()?.items.iter().cloned()))
}

fn grid_dimensions(value: &Value) -> Result<Dims, ShapeError> {
    Ok(value.as_grid()?.dims.clone())
}

fn map_entries(value: &Value) -> Result<EntryIter<'_>, ShapeError> {
    Ok(Box::new(
        value
            .as_map()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    ))
}

fn map_len(value: &Value) -> Result<usize, ShapeError> {
    Ok(value.as_map()?.len())
}

fn push_element(list: &mut Value, item: Value) -> Result<(), ShapeError> {
    list.as_list_mut()?.push(item);
    Ok(())
}

fn insert_entry(map: &mut Value, (key, value): (Value, Value)) -> Result<(), ShapeError> {
    map.as_map_mut()?.insert(key, value);
    Ok(())
}

fn identity_cast(value: &Value) -> Result<Value, ShapeError> {
    Ok(value.clone())
}

fn identity_rebuild(value: Value) -> Result<Value, ShapeError> {
    Ok(value)
}

fn call_function(target: &Value, args: &[Value]) -> Result<Value, ShapeError> {
    target.as_function()?.call(args)
}

fn check_arity(name: &str, args: &[ShapeId], expected: usize) -> Result<(), ShapeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ShapeError::Arity {
            name: Arc::from(name),
            expected,
            found: args.len(),
        })
    }
}

impl ShapePool {
    /// Register templates for the stock generics.
    pub(super) fn register_stock_templates(&mut self) {
        self.register_generic("List", |pool, args| {
            check_arity("List", args, 1)?;
            Ok(pool.list(args[0]))
        });
        self.register_generic("FrozenList", |pool, args| {
            check_arity("FrozenList", args, 1)?;
            Ok(pool.frozen_list(args[0]))
        });
        self.register_generic("Stream", |pool, args| {
            check_arity("Stream", args, 1)?;
            Ok(pool.lazy_list(args[0]))
        });
        self.register_generic("Set", |pool, args| {
            check_arity("Set", args, 1)?;
            Ok(pool.set(args[0]))
        });
        self.register_generic("Map", |pool, args| {
            check_arity("Map", args, 2)?;
            Ok(pool.map(args[0], args[1]))
        });
        self.register_generic("FrozenMap", |pool, args| {
            check_arity("FrozenMap", args, 2)?;
            Ok(pool.frozen_map(args[0], args[1]))
        });
        self.register_generic("MapStream", |pool, args| {
            check_arity("MapStream", args, 2)?;
            Ok(pool.lazy_map(args[0], args[1]))
        });
        self.register_generic("Option", |pool, args| {
            check_arity("Option", args, 1)?;
            Ok(pool.option(args[0]))
        });
    }

    fn generic_name(&self, base: &str, args: &[ShapeId]) -> String {
        let args: Vec<String> = args.iter().map(|&id| self.display(id)).collect();
        format!("{base}<{}>", args.join(", "))
    }

    fn interned_generic(
        &mut self,
        base: &str,
        args: &[ShapeId],
        make: impl FnOnce(&mut Self) -> ShapeData,
    ) -> ShapeId {
        let name = self.generic_name(base, args);
        let id = self.intern(&name, make);
        self.record_instance(base, args, id);
        id
    }

    // === Enumerables ===

    /// Growable list, built by appending.
    pub fn list(&mut self, element: ShapeId) -> ShapeId {
        self.interned_generic("List", &[element], |_| {
            ShapeData::Enumerable(EnumerableShape {
                element,
                rank: 1,
                construction: ConstructionStrategy::mutable(
                    |capacity| Value::list(Vec::with_capacity(capacity)),
                    push_element,
                ),
                elements: Arc::new(list_elements),
                dimensions: None,
            })
        })
    }

    /// Immutable list, built from a complete buffer.
    pub fn frozen_list(&mut self, element: ShapeId) -> ShapeId {
        self.interned_generic("FrozenList", &[element], |_| {
            ShapeData::Enumerable(EnumerableShape {
                element,
                rank: 1,
                construction: ConstructionStrategy::buffered(|buffer: SpanBuffer<Value>| {
                    Ok(Value::list(buffer.into_items()))
                }),
                elements: Arc::new(list_elements),
                dimensions: None,
            })
        })
    }

    /// List built by draining a lazy sequence.
    pub fn lazy_list(&mut self, element: ShapeId) -> ShapeId {
        self.interned_generic("Stream", &[element], |_| {
            ShapeData::Enumerable(EnumerableShape {
                element,
                rank: 1,
                construction: ConstructionStrategy::lazy(
                    |items: &mut dyn Iterator<Item = Value>| Ok(Value::list(items.collect())),
                ),
                elements: Arc::new(list_elements),
                dimensions: None,
            })
        })
    }

    /// Ordered set, built by inserting.
    pub fn set(&mut self, element: ShapeId) -> ShapeId {
        self.interned_generic("Set", &[element], |_| {
            ShapeData::Enumerable(EnumerableShape {
                element,
                rank: 1,
                construction: ConstructionStrategy::mutable(
                    |_| Value::set(BTreeSet::new()),
                    |set: &mut Value, item: Value| {
                        set.as_set_mut()?.insert(item);
                        Ok(())
                    },
                ),
                elements: Arc::new(set_elements),
                dimensions: None,
            })
        })
    }

    /// Fixed-rank row-major grid. `rank` must be at least 2.
    pub fn grid(&mut self, element: ShapeId, rank: u8) -> Result<ShapeId, ShapeError> {
        if rank < 2 {
            return Err(ShapeError::custom(format!(
                "grid rank must be at least 2, got {rank}"
            )));
        }
        let name = format!("Grid<{}, {rank}>", self.display(element));
        Ok(self.intern(&name, |_| {
            ShapeData::Enumerable(EnumerableShape {
                element,
                rank,
                construction: ConstructionStrategy::buffered(|buffer: SpanBuffer<Value>| {
                    let (items, dims) = buffer.into_parts();
                    Ok(Value::grid(&dims, items))
                }),
                elements: Arc::new(grid_elements),
                dimensions: Some(Arc::new(grid_dimensions)),
            })
        }))
    }

    /// An enumerable that cannot be constructed; only read.
    pub fn read_only_list(&mut self, element: ShapeId) -> ShapeId {
        self.interned_generic("ReadOnlyList", &[element], |_| {
            ShapeData::Enumerable(EnumerableShape {
                element,
                rank: 1,
                construction: ConstructionStrategy::Unsupported,
                elements: Arc::new(list_elements),
                dimensions: None,
            })
        })
    }

    // === Dictionaries ===

    /// Ordered map, built by inserting. Later duplicates overwrite earlier ones.
    pub fn map(&mut self, key: ShapeId, value: ShapeId) -> ShapeId {
        self.interned_generic("Map", &[key, value], |_| {
            ShapeData::Dictionary(DictionaryShape {
                key,
                value,
                construction: ConstructionStrategy::mutable(
                    |_| Value::map(BTreeMap::new()),
                    insert_entry,
                ),
                entries: Arc::new(map_entries),
                len: Arc::new(map_len),
            })
        })
    }

    /// Immutable map, built from a complete buffer of entries.
    pub fn frozen_map(&mut self, key: ShapeId, value: ShapeId) -> ShapeId {
        self.interned_generic("FrozenMap", &[key, value], |_| {
            ShapeData::Dictionary(DictionaryShape {
                key,
                value,
                construction: ConstructionStrategy::buffered(
                    |buffer: SpanBuffer<(Value, Value)>| {
                        Ok(Value::map(buffer.into_items().into_iter().collect()))
                    },
                ),
                entries: Arc::new(map_entries),
                len: Arc::new(map_len),
            })
        })
    }

    /// Map built by draining a lazy entry sequence.
    pub fn lazy_map(&mut self, key: ShapeId, value: ShapeId) -> ShapeId {
        self.interned_generic("MapStream", &[key, value], |_| {
            ShapeData::Dictionary(DictionaryShape {
                key,
                value,
                construction: ConstructionStrategy::lazy(
                    |entries: &mut dyn Iterator<Item = (Value, Value)>| {
                        Ok(Value::map(entries.collect()))
                    },
                ),
                entries: Arc::new(map_entries),
                len: Arc::new(map_len),
            })
        })
    }

    // === Optional ===

    pub fn option(&mut self, element: ShapeId) -> ShapeId {
        self.interned_generic("Option", &[element], |_| {
            ShapeData::Optional(OptionalShape {
                element,
                deconstruct: Arc::new(|value: &Value| match value {
                    Value::Some(inner) => Ok(Some((**inner).clone())),
                    Value::None => Ok(None),
                    other => Err(ShapeError::Mismatch {
                        expected: "option",
                        found: other.kind_name(),
                    }),
                }),
                none: Arc::new(|| Value::None),
                some: Arc::new(Value::some),
            })
        })
    }

    // === Named shapes ===

    /// Enum whose values are `Value::Enum` tagged with `name`.
    pub fn enumeration(
        &mut self,
        name: &str,
        members: &[(&str, i64)],
    ) -> Result<ShapeId, ShapeError> {
        let type_name: Arc<str> = Arc::from(name);
        let members: Vec<EnumMember> = members
            .iter()
            .map(|&(member, ordinal)| EnumMember {
                name: Arc::from(member),
                ordinal,
            })
            .collect();
        let ordinals: Vec<i64> = members.iter().map(|m| m.ordinal).collect();

        let read_name = Arc::clone(&type_name);
        let ordinal_of = Arc::new(move |value: &Value| match value {
            Value::Enum {
                type_name: found,
                ordinal,
            } if *found == read_name => Ok(*ordinal),
            Value::Enum {
                type_name: found, ..
            } => Err(ShapeError::WrongRecord {
                expected: Arc::clone(&read_name),
                found: Arc::clone(found),
            }),
            other => Err(ShapeError::Mismatch {
                expected: "enum",
                found: other.kind_name(),
            }),
        });

        let build_name = Arc::clone(&type_name);
        let from_ordinal = Arc::new(move |ordinal: i64| {
            if ordinals.contains(&ordinal) {
                Ok(Value::enumeration(Arc::clone(&build_name), ordinal))
            } else {
                Err(ShapeError::UnknownOrdinal {
                    type_name: Arc::clone(&build_name),
                    ordinal,
                })
            }
        });

        self.insert(
            type_name,
            ShapeData::Enum(EnumShape {
                underlying: ShapeId::INT,
                members,
                ordinal_of,
                from_ordinal,
            }),
        )
    }

    /// A type represented through `surrogate`.
    pub fn surrogate(
        &mut self,
        name: &str,
        surrogate: ShapeId,
        to_surrogate: impl Fn(&Value) -> Result<Value, ShapeError> + Send + Sync + 'static,
        from_surrogate: impl Fn(Value) -> Result<Value, ShapeError> + Send + Sync + 'static,
    ) -> Result<ShapeId, ShapeError> {
        self.insert(
            name,
            ShapeData::Surrogate(SurrogateShape {
                surrogate,
                to_surrogate: Arc::new(to_surrogate),
                from_surrogate: Arc::new(from_surrogate),
            }),
        )
    }

    /// Union over record types.
    ///
    /// A value belongs to the case whose shape name equals its record type
    /// name; any other value is treated as the base. Casts are identity: a
    /// case value is already a valid base value.
    pub fn union(
        &mut self,
        name: &str,
        base: ShapeId,
        cases: &[(i32, ShapeId)],
    ) -> Result<ShapeId, ShapeError> {
        let data = self.union_data(base, cases);
        self.insert(name, data)
    }

    /// [`union`](Self::union) for a reserved id, so cases and the base can
    /// refer back to the union.
    pub fn define_union(
        &mut self,
        id: ShapeId,
        base: ShapeId,
        cases: &[(i32, ShapeId)],
    ) -> Result<(), ShapeError> {
        let data = self.union_data(base, cases);
        self.define(id, data)
    }

    fn union_data(&self, base: ShapeId, cases: &[(i32, ShapeId)]) -> ShapeData {
        let cases: Vec<UnionCase> = cases
            .iter()
            .map(|&(tag, shape)| UnionCase {
                tag,
                name: Arc::from(self.display(shape)),
                shape,
                downcast: Arc::new(identity_cast),
                upcast: Arc::new(identity_rebuild),
            })
            .collect();
        let names: Vec<Arc<str>> = cases.iter().map(|c| Arc::clone(&c.name)).collect();

        ShapeData::Union(UnionShape {
            base,
            cases,
            selector: Arc::new(move |value: &Value| {
                let record = value.record_type()?;
                names.iter().position(|n| &**n == record)
            }),
        })
    }

    /// Synchronous function over `Value::Function` values.
    pub fn function(&mut self, params: &[(&str, ShapeId)], returns: Option<ShapeId>) -> ShapeId {
        self.function_shape("fn", params, returns, false)
    }

    /// Asynchronous function signature. Registered so providers can describe
    /// it; generators that cannot await reject it.
    pub fn async_function(
        &mut self,
        params: &[(&str, ShapeId)],
        returns: Option<ShapeId>,
    ) -> ShapeId {
        self.function_shape("async fn", params, returns, true)
    }

    fn function_shape(
        &mut self,
        prefix: &str,
        params: &[(&str, ShapeId)],
        returns: Option<ShapeId>,
        is_async: bool,
    ) -> ShapeId {
        let rendered: Vec<String> = params
            .iter()
            .map(|&(n, s)| format!("{n}: {}", self.display(s)))
            .collect();
        let mut name = format!("{prefix}({})", rendered.join(", "));
        if let Some(ret) = returns {
            name.push_str(" -> ");
            name.push_str(&self.display(ret));
        }
        let params: Vec<FunctionParam> = params
            .iter()
            .map(|&(n, shape)| FunctionParam {
                name: Arc::from(n),
                shape,
            })
            .collect();

        self.intern(&name, |_| {
            ShapeData::Function(FunctionShape {
                params,
                returns,
                is_async,
                invoke: Arc::new(call_function),
            })
        })
    }
}
