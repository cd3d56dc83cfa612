//! Schema Catalog and manifest loading

pub mod catalog;
pub mod loader;

pub use catalog::{Catalog, ColumnMeta, EnumDefinition, TableDescriptor};
pub use loader::{load_catalog, parse_manifest, SchemaLoader};
