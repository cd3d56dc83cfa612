//! Table Resolver
//!
//! Picks the table a question is about:
//! 1. a direct mention of an enabled table's name (first in catalog order wins),
//! 2. otherwise the best keyword score (ties go to the earlier table),
//! 3. otherwise the first enabled table.
//!
//! Same question + same catalog always gives the same table.

use crate::schema::{Catalog, TableDescriptor};
use crate::translate::aliases::AliasResolver;
use crate::translate::roles::{role_column, ColumnRole};
use crate::translate::text::contains_term;
use serde::Serialize;
use tracing::debug;

const STRONG_HINT: u32 = 3;
const ENTITY_HINT: u32 = 2;
const GENERIC_HINT: u32 = 1;
const COLUMN_HINT: u32 = 1;

/// Why a table was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TableMatch {
    DirectMention,
    Scored { score: u32 },
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableResolution {
    pub table: String,
    #[serde(flatten)]
    pub matched_by: TableMatch,
}

pub struct TableResolver<'a> {
    catalog: &'a Catalog,
    aliases: &'a AliasResolver,
}

impl<'a> TableResolver<'a> {
    pub fn new(catalog: &'a Catalog, aliases: &'a AliasResolver) -> Self {
        Self { catalog, aliases }
    }

    /// The table name, or `None` when no table is enabled
    pub fn resolve(&self, question: &str) -> Option<String> {
        self.resolve_explained(question).map(|r| r.table)
    }

    pub fn resolve_explained(&self, question: &str) -> Option<TableResolution> {
        let q = question.to_lowercase();
        let enabled = self.catalog.get_enabled_tables();

        for table in &enabled {
            if q.contains(&table.key()) {
                debug!("Table {} mentioned directly", table.name);
                return Some(TableResolution {
                    table: table.name.clone(),
                    matched_by: TableMatch::DirectMention,
                });
            }
        }

        let mut best: Option<(&TableDescriptor, u32)> = None;
        for table in &enabled {
            let score = self.score(&q, table);
            debug!("Table {} scored {}", table.name, score);
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((table, score));
            }
        }
        if let Some((table, score)) = best {
            return Some(TableResolution {
                table: table.name.clone(),
                matched_by: TableMatch::Scored { score },
            });
        }

        enabled.first().map(|table| TableResolution {
            table: table.name.clone(),
            matched_by: TableMatch::Fallback,
        })
    }

    /// Keyword score of `table` for the lower-cased question `q`
    pub fn score(&self, q: &str, table: &TableDescriptor) -> u32 {
        let name = table.key();
        let description = table.description.to_lowercase();
        let mut score = 0;

        // Strong domain hints
        if contains_term(q, "go") && name.contains("gosdk") {
            score += STRONG_HINT;
        }
        if let Some(product_col) = role_column(table, ColumnRole::Product) {
            let products = self.catalog.column_enum(table, product_col);
            if !products.is_empty() && !self.aliases.resolve(q, &products).is_empty() {
                score += STRONG_HINT;
            }
        }

        // Named entities in the table name
        for entity in ["product", "customer", "subscription"] {
            if q.contains(entity) && name.contains(entity) {
                score += ENTITY_HINT;
            }
        }

        // Generic hints
        if q.contains("request") && (name.contains("req") || description.contains("request")) {
            score += GENERIC_HINT;
        }
        for hint in ["count", "track", "api", "version", "language", "provider"] {
            if q.contains(hint) && name.contains(hint) {
                score += GENERIC_HINT;
            }
        }
        if contains_term(q, "os") && name.contains("os") {
            score += GENERIC_HINT;
        }

        // Column availability
        let has = |role: ColumnRole| role_column(table, role).is_some();
        if q.contains("provider") && has(ColumnRole::Provider) {
            score += COLUMN_HINT;
        }
        if q.contains("resource") && has(ColumnRole::Resource) {
            score += COLUMN_HINT;
        }
        if q.contains("http") && has(ColumnRole::HttpMethod) {
            score += COLUMN_HINT;
        }
        if q.contains("method") && has(ColumnRole::HttpMethod) {
            score += COLUMN_HINT;
        }
        if contains_term(q, "os") && has(ColumnRole::Os) {
            score += COLUMN_HINT;
        }

        score
    }
}
