// ABOUTME: Declarative field descriptors and per-entity field tables.
// ABOUTME: Each field names its domain key, wire aliases and value transform.

use nonempty::NonEmpty;
use serde_json::Value;

use super::catalog::Table;
use super::transforms::TransformError;

/// A JSON object, on either side of the mapping.
pub type Object = serde_json::Map<String, Value>;

/// A value conversion applied to one field.
pub type TransformFn = fn(Value) -> Result<Value, TransformError>;

/// How a field's value is converted when it is mapped.
#[derive(Debug, Clone, Copy)]
pub enum Transform {
    /// Value is carried over unchanged.
    Identity,
    /// Value is passed through a conversion function.
    Value(TransformFn),
    /// Value is an object mapped through another table.
    Nested(Table),
    /// Value is an array of objects, each mapped through another table.
    NestedList(Table),
}

impl Transform {
    /// The table this transform descends into, if any.
    pub fn nested_table(&self) -> Option<Table> {
        match self {
            Transform::Nested(table) | Transform::NestedList(table) => Some(*table),
            _ => None,
        }
    }
}

/// One logical field and the wire keys it may appear under.
///
/// Aliases are tried in declaration order; when encoding, the first alias is
/// the key written.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: &'static str,
    aliases: NonEmpty<&'static str>,
    transform: Transform,
}

impl FieldSpec {
    /// A field with a single wire key.
    pub fn new(name: &'static str, alias: &'static str) -> Self {
        Self::aliased(name, NonEmpty::new(alias))
    }

    /// A field known under several wire keys.
    pub fn aliased(name: &'static str, aliases: NonEmpty<&'static str>) -> Self {
        Self {
            name,
            aliases,
            transform: Transform::Identity,
        }
    }

    pub fn with(mut self, f: TransformFn) -> Self {
        self.transform = Transform::Value(f);
        self
    }

    pub fn nested(mut self, table: Table) -> Self {
        self.transform = Transform::Nested(table);
        self
    }

    pub fn nested_list(mut self, table: Table) -> Self {
        self.transform = Transform::NestedList(table);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn aliases(&self) -> &NonEmpty<&'static str> {
        &self.aliases
    }

    pub fn primary_alias(&self) -> &'static str {
        *self.aliases.first()
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }
}

/// Ordered field descriptors for one entity in one direction.
#[derive(Debug, Clone)]
pub struct FieldTable {
    id: Table,
    fields: Vec<FieldSpec>,
}

impl FieldTable {
    pub fn new(id: Table, fields: Vec<FieldSpec>) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> Table {
        self.id
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Tables referenced by nested transforms, in declaration order.
    pub fn nested_tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.fields.iter().filter_map(|f| f.transform.nested_table())
    }
}
