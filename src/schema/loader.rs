//! Schema Manifest Loader
//!
//! Parses the manifest document (`Tables` + `definitions`) into a [`Catalog`].
//! Loading is soft: a missing or malformed manifest yields an empty catalog and a warning.

use crate::error::{QueryError, Result};
use crate::schema::catalog::{Catalog, ColumnMeta, TableDescriptor};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct ManifestJson {
    #[serde(rename = "Tables", default)]
    tables: Vec<TableJson>,
    #[serde(default)]
    definitions: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TableJson {
    #[serde(rename = "TableName")]
    table_name: String,
    #[serde(default)]
    enabled: Option<EnabledFlag>,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Columns", default)]
    columns: Vec<ColumnJson>,
}

/// The manifest writes the flag as "true"/"false"; plain booleans are accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnabledFlag {
    Text(String),
    Bool(bool),
}

impl EnabledFlag {
    fn is_enabled(&self) -> bool {
        match self {
            EnabledFlag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            EnabledFlag::Bool(b) => *b,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ColumnJson {
    #[serde(rename = "ColumnName")]
    column_name: String,
    #[serde(rename = "$ref", default)]
    reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DefinitionJson {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    declared_type: Option<String>,
    #[serde(rename = "enum", default)]
    enum_values: Option<Vec<String>>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    minimum: Option<f64>,
}

impl DefinitionJson {
    fn into_meta(self, fallback_title: &str) -> ColumnMeta {
        ColumnMeta {
            title: self.title.unwrap_or_else(|| fallback_title.to_string()),
            description: self.description.unwrap_or_default(),
            declared_type: self.declared_type.unwrap_or_else(|| "string".to_string()),
            enum_values: self.enum_values,
            pattern: self.pattern,
            format: self.format,
            minimum: self.minimum,
        }
    }
}

/// Parse a manifest document. Errors here are recovered by [`load_catalog`].
pub fn parse_manifest(json_str: &str) -> Result<Catalog> {
    let manifest: ManifestJson = serde_json::from_str(json_str)
        .map_err(|e| QueryError::Schema(format!("Failed to parse schema manifest: {}", e)))?;

    let mut definitions = Vec::with_capacity(manifest.definitions.len());
    for (name, raw) in &manifest.definitions {
        let def: DefinitionJson = match serde_json::from_value(raw.clone()) {
            Ok(def) => def,
            Err(e) => {
                warn!("Skipping malformed definition {}: {}", name, e);
                continue;
            }
        };
        definitions.push((name.clone(), def.into_meta(name)));
    }

    let tables = manifest
        .tables
        .into_iter()
        .map(|table| {
            let enabled = table.enabled.as_ref().map_or(true, EnabledFlag::is_enabled);
            let mut descriptor = TableDescriptor::new(table.table_name, table.description);
            descriptor.enabled = enabled;
            for column in table.columns {
                let def_name = column
                    .reference
                    .as_deref()
                    .map(|r| r.trim_start_matches("#/definitions/").to_string())
                    .unwrap_or_else(|| column.column_name.clone());
                let meta = definitions
                    .iter()
                    .find(|(name, _)| name == &def_name)
                    .map(|(_, meta)| meta.clone())
                    .unwrap_or_else(|| ColumnMeta {
                        title: column.column_name.clone(),
                        declared_type: "string".to_string(),
                        ..ColumnMeta::default()
                    });
                descriptor = descriptor.with_column(column.column_name, meta);
            }
            descriptor
        })
        .collect();

    Ok(Catalog::new(tables, definitions))
}

/// Read and parse a manifest file, degrading to an empty catalog on any failure
pub fn load_catalog(path: &Path) -> Catalog {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("⚠️ Could not read schema manifest {}: {}", path.display(), e);
            return Catalog::empty();
        }
    };

    match parse_manifest(&contents) {
        Ok(catalog) => {
            info!(
                "📚 Loaded schema manifest {} ({} tables, {} enums)",
                path.display(),
                catalog.tables().len(),
                catalog.enums().len()
            );
            catalog
        }
        Err(e) => {
            warn!("⚠️ {} ({}), continuing with an empty schema", e, path.display());
            Catalog::empty()
        }
    }
}

/// Lazily loads the manifest once; every later call returns the same catalog
pub struct SchemaLoader {
    path: PathBuf,
    catalog: OnceLock<Arc<Catalog>>,
}

impl SchemaLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            catalog: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(self.catalog.get_or_init(|| Arc::new(load_catalog(&self.path))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r##"{
        "Tables": [
            {
                "TableName": "UsageByMonth",
                "enabled": "true",
                "Description": "Monthly request counts per product",
                "Columns": [
                    {"ColumnName": "Month", "$ref": "#/definitions/Month"},
                    {"ColumnName": "Product", "$ref": "#/definitions/Product"},
                    {"ColumnName": "RequestCount", "$ref": "#/definitions/RequestCount"}
                ]
            },
            {
                "TableName": "Legacy",
                "enabled": "false",
                "Description": "Retired",
                "Columns": [{"ColumnName": "Month", "$ref": "#/definitions/Month"}]
            }
        ],
        "definitions": {
            "Month": {"title": "Month", "type": "string", "pattern": "^\\d{4}-\\d{2}$"},
            "Product": {"title": "Product", "type": "string", "enum": ["Go-SDK", "Python-SDK"]},
            "RequestCount": {"title": "Request Count", "type": "integer", "minimum": 0}
        }
    }"##;

    #[test]
    fn test_parse_manifest() {
        let catalog = parse_manifest(MANIFEST).unwrap();
        assert_eq!(catalog.tables().len(), 2);
        assert_eq!(catalog.get_enabled_tables().len(), 1);

        let table = catalog.get_table("usagebymonth").unwrap();
        assert_eq!(table.columns, vec!["Month", "Product", "RequestCount"]);
        assert_eq!(table.meta("RequestCount").unwrap().minimum, Some(0.0));
        assert!(table.meta("RequestCount").unwrap().is_numeric());
        assert_eq!(catalog.get_enum("Product"), vec!["Go-SDK", "Python-SDK"]);
    }

    #[test]
    fn test_malformed_manifest_is_schema_error() {
        let err = parse_manifest("{ not json").unwrap_err();
        assert!(matches!(err, QueryError::Schema(_)));
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let catalog = load_catalog(Path::new("/definitely/not/here.json"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_loader_memoizes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();

        let loader = SchemaLoader::new(file.path());
        let first = loader.catalog();

        // Rewriting the file must not change what the loader hands out
        std::fs::write(file.path(), "{}").unwrap();
        let second = loader.catalog();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.tables().len(), 2);
    }
}
