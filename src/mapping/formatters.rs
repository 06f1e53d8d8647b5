// ABOUTME: Entity-level entry points over the standard tables.
// ABOUTME: Also parses process listings and registry search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::Table;
use super::entity::{Container, Image};
use super::field::Object;
use super::mapper::{Mapped, MappingError, ModelMapper, expect_array};
use super::transforms::{TransformError, type_name};

impl ModelMapper<'_> {
    fn each<T>(
        &self,
        table: Table,
        wire: Value,
        f: impl Fn(&Self, Value) -> Result<T, MappingError>,
    ) -> Result<Vec<T>, MappingError> {
        expect_array(table, wire)?
            .into_iter()
            .map(|item| f(self, item))
            .collect()
    }

    /// One entry of a container listing.
    pub fn container(&self, wire: Value) -> Result<Container, MappingError> {
        self.consume_value(Table::Container, wire).map(Container::from)
    }

    /// A container listing.
    pub fn containers(&self, wire: Value) -> Result<Vec<Container>, MappingError> {
        self.each(Table::Container, wire, Self::container)
    }

    /// A full container inspect response, nested config, host config,
    /// network settings and state included.
    pub fn container_inspect(&self, wire: Value) -> Result<Container, MappingError> {
        self.consume_value(Table::ContainerInspect, wire)
            .map(Container::from)
    }

    pub fn exec_inspect(&self, wire: Value) -> Result<Mapped, MappingError> {
        self.consume_value(Table::ExecInspect, wire)
    }

    /// One entry of an image listing.
    pub fn image(&self, wire: Value) -> Result<Image, MappingError> {
        self.consume_value(Table::Image, wire).map(Image::from)
    }

    pub fn images(&self, wire: Value) -> Result<Vec<Image>, MappingError> {
        self.each(Table::Image, wire, Self::image)
    }

    pub fn image_inspect(&self, wire: Value) -> Result<Image, MappingError> {
        self.consume_value(Table::ImageInspect, wire).map(Image::from)
    }

    pub fn history(&self, wire: Value) -> Result<Vec<Mapped>, MappingError> {
        self.each(Table::HistoryEntry, wire, |m, item| {
            m.consume_value(Table::HistoryEntry, item)
        })
    }

    pub fn info(&self, wire: Value) -> Result<Mapped, MappingError> {
        self.consume_value(Table::Info, wire)
    }

    pub fn version(&self, wire: Value) -> Result<Mapped, MappingError> {
        self.consume_value(Table::Version, wire)
    }

    /// Body for a container create request. Keys the table does not know are
    /// passed through unchanged unless they collide with a mapped key.
    pub fn container_config_request(&self, domain: Object) -> Result<Object, MappingError> {
        self.produce(Table::ContainerConfigRequest, domain)
            .and_then(Mapped::merged)
    }

    /// Body for a host config update or the `HostConfig` of a create request.
    pub fn host_config_request(&self, domain: Object) -> Result<Object, MappingError> {
        self.produce(Table::HostConfigRequest, domain)
            .and_then(Mapped::merged)
    }
}

/// Rows of a container process listing, keyed by normalized column title.
///
/// Titles are lower-cased and a leading `%` becomes a `_pers` suffix
/// (`%CPU` is `cpu_pers`). A row longer than the title list is folded into
/// the last column.
pub fn container_top(wire: &Value) -> Result<Vec<Object>, TransformError> {
    let titles: Vec<String> = wire
        .get("Titles")
        .and_then(Value::as_array)
        .ok_or(TransformError::MissingKey("Titles"))?
        .iter()
        .map(|t| {
            t.as_str()
                .map(normalize_title)
                .ok_or_else(|| TransformError::UnexpectedType {
                    expected: "string",
                    found: type_name(t),
                })
        })
        .collect::<Result<_, _>>()?;

    let rows = match wire.get("Processes") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return Err(TransformError::UnexpectedType {
                expected: "array",
                found: type_name(other),
            });
        }
    };

    rows.iter()
        .map(|row| {
            let columns: Vec<&str> = row
                .as_array()
                .ok_or_else(|| TransformError::UnexpectedType {
                    expected: "array",
                    found: type_name(row),
                })?
                .iter()
                .map(|column| {
                    column
                        .as_str()
                        .ok_or_else(|| TransformError::UnexpectedType {
                            expected: "string",
                            found: type_name(column),
                        })
                })
                .collect::<Result<_, _>>()?;
            if columns.len() < titles.len() {
                return Err(TransformError::ShortRow {
                    expected: titles.len(),
                    found: columns.len(),
                });
            }

            let last = titles.len().saturating_sub(1);
            let mut process = Object::new();
            for (i, title) in titles.iter().enumerate() {
                let value = if i == last {
                    columns[i..].join(" ")
                } else {
                    columns[i].to_string()
                };
                process.insert(title.clone(), Value::String(value));
            }
            Ok(process)
        })
        .collect()
}

fn normalize_title(title: &str) -> String {
    let title = title.to_lowercase();
    match title.strip_prefix('%') {
        Some(rest) => format!("{}_pers", rest),
        None => title,
    }
}

/// One registry search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default, alias = "is_trusted")]
    pub is_automated: bool,
    #[serde(default)]
    pub star_count: u64,
}

pub fn search_results(wire: Value) -> Result<Vec<SearchResult>, serde_json::Error> {
    serde_json::from_value(wire)
}
