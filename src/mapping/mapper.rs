// ABOUTME: Applies field tables to JSON objects in both directions.
// ABOUTME: consume() renames wire keys, produce() writes wire keys back.

use serde::Serialize;
use serde_json::Value;

use super::catalog::{Catalog, Table};
use super::field::{FieldSpec, FieldTable, Object, Transform};
use super::transforms::{TransformError, type_name};

/// Result of mapping one object: the fields a table claimed, and every key it
/// did not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mapped {
    pub normalized: Object,
    pub remainder: Object,
}

/// Errors while mapping an object.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("table {0} is not registered")]
    UnknownTable(Table),

    #[error("{table} expects a JSON {expected}, got {found}")]
    UnexpectedShape {
        table: Table,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{table}.{field}: {source}")]
    Transform {
        table: Table,
        field: &'static str,
        #[source]
        source: TransformError,
    },

    #[error("{table}.{field}: {source}")]
    Nested {
        table: Table,
        field: &'static str,
        #[source]
        source: Box<MappingError>,
    },

    #[error("unmapped key {key} collides with a mapped field")]
    KeyCollision { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Consume,
    Produce,
}

/// Maps objects through the tables of one catalog.
#[derive(Debug, Clone, Copy)]
pub struct ModelMapper<'a> {
    catalog: &'a Catalog,
}

impl Default for ModelMapper<'static> {
    fn default() -> Self {
        Self::new(Catalog::standard())
    }
}

impl<'a> ModelMapper<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    fn table(&self, table: Table) -> Result<&'a FieldTable, MappingError> {
        self.catalog
            .get(table)
            .ok_or(MappingError::UnknownTable(table))
    }

    /// Rename and transform the wire keys a table declares.
    ///
    /// For each field in table order, the first alias present is removed from
    /// the object and its transformed value stored under the field name.
    /// Whatever is left over is returned as the remainder.
    pub fn consume(&self, table: Table, wire: Object) -> Result<Mapped, MappingError> {
        let table = self.table(table)?;
        let mut working = wire;
        let mut normalized = Object::new();

        for field in table.fields() {
            let Some(value) = field.aliases().iter().find_map(|alias| working.remove(*alias))
            else {
                continue;
            };
            let value = self.apply(table.id(), field, value, Pass::Consume)?;
            normalized.insert(field.name().to_string(), value);
        }

        Ok(Mapped {
            normalized,
            remainder: working,
        })
    }

    /// Write domain fields back under their first alias.
    ///
    /// When two fields share a wire key, the one declared first wins and the
    /// other domain key is left in the remainder.
    pub fn produce(&self, table: Table, domain: Object) -> Result<Mapped, MappingError> {
        let table = self.table(table)?;
        let mut working = domain;
        let mut wire = Object::new();

        for field in table.fields() {
            if wire.contains_key(field.primary_alias()) {
                continue;
            }
            let Some(value) = working.remove(field.name()) else {
                continue;
            };
            let value = self.apply(table.id(), field, value, Pass::Produce)?;
            wire.insert(field.primary_alias().to_string(), value);
        }

        Ok(Mapped {
            normalized: wire,
            remainder: working,
        })
    }

    /// `consume` for a value that must be a JSON object.
    pub fn consume_value(&self, table: Table, wire: Value) -> Result<Mapped, MappingError> {
        self.consume(table, expect_object(table, wire)?)
    }

    /// `produce` for a value that must be a JSON object.
    pub fn produce_value(&self, table: Table, domain: Value) -> Result<Mapped, MappingError> {
        self.produce(table, expect_object(table, domain)?)
    }

    fn apply(
        &self,
        table: Table,
        field: &FieldSpec,
        value: Value,
        pass: Pass,
    ) -> Result<Value, MappingError> {
        match field.transform() {
            Transform::Identity => Ok(value),
            Transform::Value(f) => f(value).map_err(|source| MappingError::Transform {
                table,
                field: field.name(),
                source,
            }),
            Transform::Nested(nested) => self
                .map_nested(nested, value, pass)
                .map_err(|e| nest_error(table, field, e)),
            Transform::NestedList(nested) => match value {
                Value::Null => Ok(Value::Null),
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| self.map_nested(nested, item, pass))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
                    .map_err(|e| nest_error(table, field, e)),
                other => Err(nest_error(
                    table,
                    field,
                    MappingError::UnexpectedShape {
                        table: nested,
                        expected: "array",
                        found: type_name(&other),
                    },
                )),
            },
        }
    }

    /// Nested objects keep their own remainder merged back in. A remainder
    /// key that collides with a mapped field is an error.
    fn map_nested(&self, table: Table, value: Value, pass: Pass) -> Result<Value, MappingError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let mapped = match pass {
            Pass::Consume => self.consume_value(table, value)?,
            Pass::Produce => self.produce_value(table, value)?,
        };
        mapped.merged().map(Value::Object)
    }
}

impl Mapped {
    /// Normalized fields followed by the remainder keys.
    pub fn merged(self) -> Result<Object, MappingError> {
        let mut merged = self.normalized;
        for (key, value) in self.remainder {
            if merged.contains_key(&key) {
                return Err(MappingError::KeyCollision { key });
            }
            merged.insert(key, value);
        }
        Ok(merged)
    }
}

fn nest_error(table: Table, field: &FieldSpec, source: MappingError) -> MappingError {
    MappingError::Nested {
        table,
        field: field.name(),
        source: Box::new(source),
    }
}

pub(crate) fn expect_object(table: Table, value: Value) -> Result<Object, MappingError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(MappingError::UnexpectedShape {
            table,
            expected: "object",
            found: type_name(&other),
        }),
    }
}

pub(crate) fn expect_array(table: Table, value: Value) -> Result<Vec<Value>, MappingError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(MappingError::UnexpectedShape {
            table,
            expected: "array",
            found: type_name(&other),
        }),
    }
}
