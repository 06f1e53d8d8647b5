// ABOUTME: Bidirectional field mapping between engine JSON and domain objects.
// ABOUTME: Declarative tables, a validated catalog, and the mapper applying them.

mod catalog;
mod entity;
mod field;
mod formatters;
mod mapper;
mod transforms;

pub use catalog::{Catalog, CatalogError, Direction, Table, standard_tables};
pub use entity::{Container, Image, MatchError};
pub use field::{FieldSpec, FieldTable, Object, Transform, TransformFn};
pub use formatters::{SearchResult, container_top, search_results};
pub use mapper::{Mapped, MappingError, ModelMapper};
pub use transforms::{TransformError, type_name};

/// Value conversions usable in custom tables.
pub mod convert {
    pub use super::transforms::{
        from_colon_pairs, from_env, from_exposed_ports, from_iso_time, from_port_bindings,
        from_unix_time, from_volumes, from_volumes_from, to_binds, to_env, to_exposed_ports,
        to_extra_hosts, to_links, to_port_bindings, to_volumes, to_volumes_from,
    };
}
