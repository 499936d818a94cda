//! Builder for record-backed object shapes.
//!
//! Record values are `Value::Record` with positional fields. The builder
//! derives the property accessors from field positions, and picks one of two
//! construction protocols:
//!
//! - **setters** (default): a default factory fills every field with its
//!   default, then properties are assigned through setters
//! - **constructor**: properties are read-only and the object is built in one
//!   call from an argument state, one parameter per field

use std::sync::Arc;

use super::ShapePool;
use crate::{
    ArgumentState, ConstructFn, ConstructorShape, Factory, Getter, ObjectShape, ParameterShape,
    PropertyFlags, PropertyShape, Setter, ShapeData, ShapeError, ShapeId, Value,
};

struct FieldSpec {
    name: Arc<str>,
    shape: ShapeId,
    default: Option<Value>,
}

impl FieldSpec {
    fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declares the fields of a record type.
pub struct RecordBuilder {
    name: Arc<str>,
    fields: Vec<FieldSpec>,
    use_constructor: bool,
}

impl RecordBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        RecordBuilder {
            name: name.into(),
            fields: Vec::new(),
            use_constructor: false,
        }
    }

    /// A required field.
    #[must_use]
    pub fn field(mut self, name: &str, shape: ShapeId) -> Self {
        self.fields.push(FieldSpec {
            name: Arc::from(name),
            shape,
            default: None,
        });
        self
    }

    /// An optional field, `default` when absent.
    #[must_use]
    pub fn optional(mut self, name: &str, shape: ShapeId, default: Value) -> Self {
        self.fields.push(FieldSpec {
            name: Arc::from(name),
            shape,
            default: Some(default),
        });
        self
    }

    /// Build through a constructor instead of a default factory and setters.
    #[must_use]
    pub fn constructor(mut self) -> Self {
        self.use_constructor = true;
        self
    }

    /// Reserve a new id for the record and define it.
    pub fn build(self, pool: &mut ShapePool) -> Result<ShapeId, ShapeError> {
        let id = pool.reserve(Arc::clone(&self.name))?;
        self.define(pool, id)?;
        Ok(id)
    }

    /// Define a previously reserved id; use this for self-referential records.
    pub fn define(self, pool: &mut ShapePool, id: ShapeId) -> Result<(), ShapeError> {
        pool.define(id, self.into_data())
    }

    pub fn into_data(self) -> ShapeData {
        let properties = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| self.property(index, field))
            .collect();

        let object = if self.use_constructor {
            ObjectShape {
                properties,
                constructor: Some(self.constructor_shape()),
                create_default: None,
            }
        } else {
            let name = Arc::clone(&self.name);
            let defaults: Vec<Value> = self
                .fields
                .iter()
                .map(|f| f.default.clone().unwrap_or(Value::Unit))
                .collect();
            let create_default: Factory =
                Arc::new(move || Value::record(Arc::clone(&name), defaults.clone()));
            ObjectShape {
                properties,
                constructor: None,
                create_default: Some(create_default),
            }
        };

        ShapeData::Object(object)
    }

    fn property(&self, index: usize, field: &FieldSpec) -> PropertyShape {
        let type_name = Arc::clone(&self.name);
        let getter: Getter = Arc::new(move |value: &Value| {
            let record = value.as_record()?;
            if record.type_name != type_name {
                return Err(ShapeError::WrongRecord {
                    expected: Arc::clone(&type_name),
                    found: Arc::clone(&record.type_name),
                });
            }
            record.field(index).cloned()
        });

        let mut flags = PropertyFlags::READABLE;
        if field.is_required() {
            flags |= PropertyFlags::REQUIRED;
        }

        let setter = if self.use_constructor {
            None
        } else {
            flags |= PropertyFlags::WRITABLE;
            let setter: Setter = Arc::new(move |target: &mut Value, value: Value| {
                target.as_record_mut()?.set_field(index, value)
            });
            Some(setter)
        };

        PropertyShape {
            name: Arc::clone(&field.name),
            shape: field.shape,
            getter: Some(getter),
            setter,
            flags,
        }
    }

    fn constructor_shape(&self) -> ConstructorShape {
        let params = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| ParameterShape {
                name: Arc::clone(&field.name),
                shape: field.shape,
                property: Some(index),
                required: field.is_required(),
            })
            .collect();

        let name = Arc::clone(&self.name);
        let slots: Vec<(Arc<str>, Option<Value>)> = self
            .fields
            .iter()
            .map(|f| (Arc::clone(&f.name), f.default.clone()))
            .collect();

        let construct: ConstructFn = Arc::new(move |mut args: ArgumentState| {
            let mut fields = Vec::with_capacity(slots.len());
            for (index, (field, default)) in slots.iter().enumerate() {
                let value = match (args.take(index), default) {
                    (Some(value), _) => value,
                    (None, Some(default)) => default.clone(),
                    (None, None) => {
                        return Err(ShapeError::custom(format!(
                            "`{name}` requires `{field}`"
                        )))
                    }
                };
                fields.push(value);
            }
            Ok(Value::record(Arc::clone(&name), fields))
        });

        ConstructorShape { params, construct }
    }
}
