//! Column Selector
//!
//! Infers output columns for a question. Literal mentions of a column (name, title or
//! description words) come first and are topped up with intent-keyword columns; without
//! literal mentions the intent columns plus the table's key columns are used; failing
//! that, a fixed priority list capped at five.

use crate::schema::{Catalog, TableDescriptor};
use crate::translate::roles::{columns_with_role, role_column, ColumnRole};
use crate::translate::text::{compact, contains_term, mentions_word, tokens};

const MAX_PRIORITY_COLUMNS: usize = 5;

const INTENT_BUCKETS: &[(ColumnRole, &[&str])] = &[
    (ColumnRole::Product, &["product", "sdk", "tool"]),
    (ColumnRole::Track, &["track", "version"]),
    (ColumnRole::Provider, &["provider", "service"]),
    (ColumnRole::Resource, &["resource", "type"]),
    (ColumnRole::HttpMethod, &["method", "http", "get", "post", "put", "delete"]),
    (ColumnRole::Os, &["os", "operating", "system", "windows", "linux", "mac"]),
];

const STOPWORDS: &[&str] = &[
    "about", "which", "where", "there", "their", "these", "those", "please", "under", "above",
    "below", "between", "during", "total", "number", "exactly", "greater", "fewer",
];

pub struct ColumnSelector<'a> {
    catalog: &'a Catalog,
}

impl<'a> ColumnSelector<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Output columns for `question` against `table_name`; `["*"]` only for an unknown table
    pub fn select(&self, question: &str, table_name: &str) -> Vec<String> {
        match self.catalog.get_table(table_name) {
            Some(table) => select_columns(question, table),
            None => vec!["*".to_string()],
        }
    }
}

/// Column selection against a concrete descriptor.
///
/// A descriptor with no columns also yields `["*"]`; `Translator::parse` rejects such
/// tables before selection.
pub fn select_columns(question: &str, table: &TableDescriptor) -> Vec<String> {
    let literal = literal_mentions(question, table);
    let intent = intent_columns(question, table);

    let chosen: Vec<&str> = if !literal.is_empty() {
        union(&literal, &intent)
    } else {
        let mut key_columns: Vec<&str> = Vec::new();
        key_columns.extend(role_column(table, ColumnRole::Temporal));
        key_columns.extend(columns_with_role(table, ColumnRole::Measure));
        union(&intent, &key_columns)
    };

    if !chosen.is_empty() {
        return in_table_order(table, &chosen);
    }

    let mut priority: Vec<&str> = Vec::new();
    priority.extend(role_column(table, ColumnRole::Temporal));
    priority.extend(role_column(table, ColumnRole::Product));
    priority.extend(columns_with_role(table, ColumnRole::Measure));
    priority.extend(role_column(table, ColumnRole::Track));
    if priority.is_empty() {
        priority.extend(table.columns.iter().map(String::as_str));
    }
    priority.truncate(MAX_PRIORITY_COLUMNS);

    if priority.is_empty() {
        vec!["*".to_string()]
    } else {
        priority.into_iter().map(str::to_string).collect()
    }
}

fn literal_mentions<'t>(question: &str, table: &'t TableDescriptor) -> Vec<&'t str> {
    let q = question.to_lowercase();
    let q_compact = compact(question);
    let q_tokens: Vec<String> = tokens(question)
        .into_iter()
        .filter(|t| t.len() >= 5 && !STOPWORDS.contains(&t.as_str()))
        .collect();

    table
        .columns
        .iter()
        .filter(|column| {
            let name = column.to_lowercase();
            let name_hit = if name.len() >= 4 {
                q_compact.contains(&name)
            } else {
                contains_term(&q, &name)
            };
            if name_hit {
                return true;
            }

            let Some(meta) = table.meta(column) else {
                return false;
            };
            let title = meta.title.to_lowercase();
            if title.len() >= 3 && title != name && contains_term(&q, &title) {
                return true;
            }
            let description = tokens(&meta.description);
            q_tokens.iter().any(|t| description.contains(t))
        })
        .map(String::as_str)
        .collect()
}

fn intent_columns<'t>(question: &str, table: &'t TableDescriptor) -> Vec<&'t str> {
    let words = tokens(question);
    INTENT_BUCKETS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| mentions_word(&words, k)))
        .filter_map(|(role, _)| role_column(table, *role))
        .collect()
}

fn union<'t>(first: &[&'t str], second: &[&'t str]) -> Vec<&'t str> {
    let mut out = first.to_vec();
    for c in second {
        if !out.contains(c) {
            out.push(c);
        }
    }
    out
}

fn in_table_order(table: &TableDescriptor, chosen: &[&str]) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|c| chosen.contains(&c.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMeta;

    fn integer() -> ColumnMeta {
        ColumnMeta { declared_type: "integer".into(), ..Default::default() }
    }

    fn usage_table() -> TableDescriptor {
        TableDescriptor::new("Usage", "")
            .with_column("Month", ColumnMeta { title: "Month".into(), ..Default::default() })
            .with_column("Product", ColumnMeta { title: "Product".into(), ..Default::default() })
            .with_column("TrackInfo", ColumnMeta { title: "Track".into(), ..Default::default() })
            .with_column("OS", ColumnMeta { title: "Operating System".into(), ..Default::default() })
            .with_column("RequestCount", integer())
            .with_column("SubscriptionCount", integer())
    }

    #[test]
    fn test_literal_column_mentions() {
        let cols = select_columns("requestcount by month", &usage_table());
        assert_eq!(cols, vec!["Month", "RequestCount"]);
    }

    #[test]
    fn test_literal_mentions_are_topped_up_with_intent_columns() {
        let cols = select_columns("Go-SDK request counts this month", &usage_table());
        assert_eq!(cols, vec!["Month", "Product", "RequestCount"]);
    }

    #[test]
    fn test_intent_buckets_add_key_columns() {
        let cols = select_columns("usage for windows users", &usage_table());
        assert_eq!(cols, vec!["Month", "OS", "RequestCount", "SubscriptionCount"]);
    }

    #[test]
    fn test_title_mention() {
        let cols = select_columns("split by operating system", &usage_table());
        assert!(cols.contains(&"OS".to_string()));
    }

    #[test]
    fn test_priority_fallback_capped() {
        let table = TableDescriptor::new("Misc", "")
            .with_column("A", ColumnMeta::default())
            .with_column("B", ColumnMeta::default())
            .with_column("C", ColumnMeta::default())
            .with_column("D", ColumnMeta::default())
            .with_column("E", ColumnMeta::default())
            .with_column("F", ColumnMeta::default());
        assert_eq!(select_columns("hello", &table), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_unknown_table_selects_star() {
        let catalog = Catalog::empty();
        assert_eq!(ColumnSelector::new(&catalog).select("anything", "nope"), vec!["*"]);
    }

    #[test]
    fn test_never_empty_for_known_table() {
        let table = TableDescriptor::new("Empty", "");
        assert_eq!(select_columns("anything", &table), vec!["*"]);
        assert!(!select_columns("anything", &usage_table()).is_empty());
    }
}
