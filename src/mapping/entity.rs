// ABOUTME: Container and image domain values with identity matching.
// ABOUTME: matches() compares by id prefix, then names or tags, read-only.

use serde::Serialize;
use serde_json::Value;

use super::field::Object;
use super::mapper::Mapped;

/// Why two entities could not be compared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// The other side names none of the identifying fields, or names one with
    /// a value of the wrong type.
    #[error("cannot compare: {reason}")]
    Comparison { reason: String },

    /// The receiver lacks a field the other side compares by.
    #[error("receiver is too sparse to compare by {field}")]
    SparseData { field: &'static str },
}

/// Identifying fields of an entity, in priority order.
struct Identity {
    id: &'static str,
    single: &'static str,
    list: &'static str,
}

const CONTAINER_IDENTITY: Identity = Identity {
    id: "id",
    single: "name",
    list: "names",
};

const IMAGE_IDENTITY: Identity = Identity {
    id: "id",
    single: "repo_tag",
    list: "repo_tags",
};

impl Identity {
    fn matches(&self, own: &Object, other: &Object) -> Result<bool, MatchError> {
        if ![self.id, self.single, self.list]
            .iter()
            .any(|k| other.contains_key(*k))
        {
            return Err(MatchError::Comparison {
                reason: format!(
                    "one of {}, {} or {} is required",
                    self.id, self.single, self.list
                ),
            });
        }

        if let Some(theirs) = other.get(self.id) {
            let theirs = theirs
                .as_str()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| MatchError::Comparison {
                    reason: format!("{} must be a non-empty string", self.id),
                })?;
            let ours = own
                .get(self.id)
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .ok_or(MatchError::SparseData { field: self.id })?;
            if !id_prefix_match(ours, theirs) {
                return Ok(false);
            }
        }

        let wanted = self.wanted(other)?;
        if !wanted.is_empty() {
            let candidates = self.candidates(own);
            if candidates.is_empty() {
                return Err(MatchError::SparseData { field: self.list });
            }
            if !wanted.iter().any(|w| candidates.contains(w)) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Names (or tags) the other side asks about.
    ///
    /// A key that is present must carry at least one non-empty string.
    fn wanted<'a>(&self, other: &'a Object) -> Result<Vec<&'a str>, MatchError> {
        let mut wanted = Vec::new();
        if let Some(single) = other.get(self.single) {
            wanted.push(self.name(self.single, single)?);
        }
        if let Some(list) = other.get(self.list) {
            let items = list
                .as_array()
                .filter(|items| !items.is_empty())
                .ok_or_else(|| MatchError::Comparison {
                    reason: format!("{} must be a non-empty array", self.list),
                })?;
            for item in items {
                wanted.push(self.name(self.list, item)?);
            }
        }
        Ok(wanted)
    }

    fn name<'a>(&self, key: &str, value: &'a Value) -> Result<&'a str, MatchError> {
        value
            .as_str()
            .map(trim_name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MatchError::Comparison {
                reason: format!("{key} must hold non-empty strings"),
            })
    }

    /// The receiver's own names: its list plus its single value.
    fn candidates<'a>(&self, own: &'a Object) -> Vec<&'a str> {
        let mut candidates: Vec<&str> = own
            .get(self.list)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if let Some(single) = own.get(self.single).and_then(Value::as_str) {
            candidates.push(single);
        }
        candidates.into_iter().map(trim_name).collect()
    }
}

/// The shorter id must prefix the longer one.
fn id_prefix_match(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.starts_with(short)
}

/// The engine reports container names with a leading slash.
fn trim_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

macro_rules! entity {
    ($(#[$doc:meta])* $name:ident, $identity:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, Serialize)]
        pub struct $name {
            fields: Object,
            #[serde(skip_serializing_if = "Object::is_empty")]
            remainder: Object,
        }

        impl $name {
            pub fn new(fields: Object) -> Self {
                Self {
                    fields,
                    remainder: Object::new(),
                }
            }

            pub fn fields(&self) -> &Object {
                &self.fields
            }

            /// Wire keys no field claimed.
            pub fn remainder(&self) -> &Object {
                &self.remainder
            }

            pub fn get(&self, field: &str) -> Option<&Value> {
                self.fields.get(field)
            }

            pub fn id(&self) -> Option<&str> {
                self.get("id").and_then(Value::as_str)
            }

            /// Compare identities with a (possibly partial) description.
            ///
            /// Neither side is modified.
            pub fn matches(&self, other: &Object) -> Result<bool, MatchError> {
                $identity.matches(&self.fields, other)
            }

            /// Compare identities with another entity of the same kind.
            pub fn matches_entity(&self, other: &Self) -> Result<bool, MatchError> {
                self.matches(&other.fields)
            }

            pub fn into_fields(self) -> Object {
                self.fields
            }
        }

        impl From<Mapped> for $name {
            fn from(mapped: Mapped) -> Self {
                Self {
                    fields: mapped.normalized,
                    remainder: mapped.remainder,
                }
            }
        }
    };
}

entity!(
    /// A container as listed or inspected.
    Container,
    CONTAINER_IDENTITY
);

entity!(
    /// An image as listed or inspected.
    Image,
    IMAGE_IDENTITY
);

impl Container {
    /// Names with the leading slash removed, single `name` last.
    pub fn names(&self) -> Vec<&str> {
        CONTAINER_IDENTITY.candidates(&self.fields)
    }
}

impl Image {
    pub fn repo_tags(&self) -> Vec<&str> {
        IMAGE_IDENTITY.candidates(&self.fields)
    }
}
