//! Schema Catalog
//!
//! Read-only table, column and enum metadata used by every translation stage.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Metadata for one column, resolved from the manifest `definitions`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ColumnMeta {
    pub title: String,
    pub description: String,
    pub declared_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
}

impl ColumnMeta {
    pub fn is_numeric(&self) -> bool {
        matches!(self.declared_type.as_str(), "integer" | "number")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    pub enabled: bool,
    pub description: String,
    /// Column names in manifest order
    pub columns: Vec<String>,
    pub column_meta: HashMap<String, ColumnMeta>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            description: description.into(),
            columns: Vec::new(),
            column_meta: HashMap::new(),
        }
    }

    /// Append a column; a repeated name keeps the first definition
    pub fn with_column(mut self, name: impl Into<String>, meta: ColumnMeta) -> Self {
        let name = name.into();
        if self.columns.iter().any(|c| c == &name) {
            warn!("Duplicate column {} in table {}, keeping the first", name, self.name);
            return self;
        }
        self.column_meta.insert(name.clone(), meta);
        self.columns.push(name);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Lower-cased lookup key
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Canonical spelling of a column, matched case-insensitively
    pub fn find_column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name))
            .map(|c| c.as_str())
    }

    pub fn meta(&self, column: &str) -> Option<&ColumnMeta> {
        self.column_meta.get(column)
    }
}

/// A named, ordered list of canonical literals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<String>,
}

/// The loaded schema. Tables keep manifest order; lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<TableDescriptor>,
    index: HashMap<String, usize>,
    enums: Vec<EnumDefinition>,
    definitions: Vec<(String, ColumnMeta)>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(tables: Vec<TableDescriptor>, definitions: Vec<(String, ColumnMeta)>) -> Self {
        let mut catalog = Self::default();
        for table in tables {
            catalog.insert_table(table);
        }
        for (name, meta) in definitions {
            if let Some(values) = &meta.enum_values {
                catalog.enums.push(EnumDefinition {
                    name: name.clone(),
                    values: values.clone(),
                });
            }
            catalog.definitions.push((name, meta));
        }
        catalog
    }

    fn insert_table(&mut self, table: TableDescriptor) {
        let key = table.key();
        if self.index.contains_key(&key) {
            warn!("Duplicate table name {} in schema, keeping the first", table.name);
            return;
        }
        self.index.insert(key, self.tables.len());
        self.tables.push(table);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get_table(&self, name: &str) -> Option<&TableDescriptor> {
        self.index
            .get(&name.to_lowercase())
            .map(|&idx| &self.tables[idx])
    }

    /// All tables, disabled ones included, in manifest order
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Tables eligible for resolution, in manifest order
    pub fn get_enabled_tables(&self) -> Vec<&TableDescriptor> {
        self.tables.iter().filter(|t| t.enabled).collect()
    }

    /// Literals of a named enum definition; empty when undefined
    pub fn get_enum(&self, name: &str) -> Vec<String> {
        self.enums
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.values.clone())
            .unwrap_or_default()
    }

    pub fn enums(&self) -> &[EnumDefinition] {
        &self.enums
    }

    pub fn definitions(&self) -> &[(String, ColumnMeta)] {
        &self.definitions
    }

    /// Canonical values for a column: its own enum, else the definition named after it
    pub fn column_enum(&self, table: &TableDescriptor, column: &str) -> Vec<String> {
        match table.meta(column).and_then(|m| m.enum_values.as_ref()) {
            Some(values) => values.clone(),
            None => self.get_enum(column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enum_meta(values: &[&str]) -> ColumnMeta {
        ColumnMeta {
            declared_type: "string".to_string(),
            enum_values: Some(values.iter().map(|v| v.to_string()).collect()),
            ..ColumnMeta::default()
        }
    }

    #[test]
    fn test_table_lookup_is_case_insensitive() {
        let catalog = Catalog::new(vec![TableDescriptor::new("UsageByMonth", "")], vec![]);
        assert!(catalog.get_table("usagebymonth").is_some());
        assert!(catalog.get_table("USAGEBYMONTH").is_some());
        assert!(catalog.get_table("other").is_none());
    }

    #[test]
    fn test_duplicate_table_names_keep_first() {
        let catalog = Catalog::new(
            vec![
                TableDescriptor::new("Usage", "first"),
                TableDescriptor::new("usage", "second"),
            ],
            vec![],
        );
        assert_eq!(catalog.tables().len(), 1);
        assert_eq!(catalog.get_table("USAGE").unwrap().description, "first");
    }

    #[test]
    fn test_disabled_tables_are_kept_but_not_enabled() {
        let catalog = Catalog::new(
            vec![
                TableDescriptor::new("Old", "").disabled(),
                TableDescriptor::new("New", ""),
            ],
            vec![],
        );
        let enabled: Vec<_> = catalog.get_enabled_tables().iter().map(|t| t.name.clone()).collect();
        assert_eq!(enabled, vec!["New"]);
        assert!(catalog.get_table("Old").is_some());
    }

    #[test]
    fn test_get_enum_unknown_is_empty() {
        let catalog = Catalog::new(vec![], vec![("OS".to_string(), enum_meta(&["Windows", "Linux"]))]);
        assert_eq!(catalog.get_enum("OS"), vec!["Windows", "Linux"]);
        assert!(catalog.get_enum("Product").is_empty());
    }

    #[test]
    fn test_duplicate_column_keeps_first() {
        let table = TableDescriptor::new("T", "")
            .with_column("Month", ColumnMeta::default())
            .with_column("Month", enum_meta(&["x"]));
        assert_eq!(table.columns.len(), 1);
        assert!(table.meta("Month").unwrap().enum_values.is_none());
    }
}
