//! Translation pipeline
//!
//! question → table → columns + predicate + ordering → [`ParsedIntent`] → query text.
//! The resolution stages are shared by the SQL assembler and the Kusto template engine;
//! only the final rendering differs.

pub mod aliases;
pub mod assembler;
pub mod column_selector;
pub mod intent;
pub mod ordering;
pub mod predicate;
pub mod roles;
pub mod table_resolver;
pub mod text;

pub use aliases::AliasResolver;
pub use assembler::{assemble, assemble_intent, assemble_parameterized, outline, ParameterizedQuery, QueryOutline};
pub use intent::{Clause, CompareOp, Dialect, OrderBy, OrderDirection, ParsedIntent, Predicate, TimeWindow};
pub use table_resolver::{TableMatch, TableResolution};

use crate::error::{QueryError, Result};
use crate::schema::{Catalog, TableDescriptor};
use chrono::{NaiveDate, Utc};
use column_selector::select_columns;
use predicate::PredicateBuilder;
use serde::Serialize;
use std::sync::Arc;
use table_resolver::TableResolver;
use tracing::{debug, info};

/// A translated question
#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub question: String,
    pub intent: ParsedIntent,
    pub resolution: TableResolution,
    pub sql: String,
    pub parameterized: ParameterizedQuery,
}

pub struct Translator {
    catalog: Arc<Catalog>,
    aliases: AliasResolver,
    reference_date: Option<NaiveDate>,
}

impl Translator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            aliases: AliasResolver::new(),
            reference_date: None,
        }
    }

    pub fn with_aliases(mut self, aliases: AliasResolver) -> Self {
        self.aliases = aliases;
        self
    }

    /// Pin "today" for relative periods; the current UTC date otherwise
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn aliases(&self) -> &AliasResolver {
        &self.aliases
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn resolve_table(&self, question: &str) -> Option<TableResolution> {
        TableResolver::new(&self.catalog, &self.aliases).resolve_explained(question)
    }

    /// Resolve a question against an explicit table descriptor
    pub fn parse_for_table(&self, question: &str, table: &TableDescriptor) -> ParsedIntent {
        let columns = select_columns(question, table);
        let predicate = PredicateBuilder::new(&self.catalog, &self.aliases, self.today())
            .build_for(question, table);
        let ordering = ordering::derive(question, Some(table));

        ParsedIntent {
            table: table.name.clone(),
            columns,
            predicate,
            limit: ordering.limit,
            order: ordering.order,
        }
    }

    pub fn parse(&self, question: &str) -> Result<(ParsedIntent, TableResolution)> {
        if question.trim().is_empty() {
            return Err(QueryError::Translation("Question is empty".to_string()));
        }

        let resolution = self.resolve_table(question).ok_or_else(|| {
            QueryError::Translation(
                "Could not identify a relevant table from your question".to_string(),
            )
        })?;
        let table = self.catalog.get_table(&resolution.table).ok_or_else(|| {
            QueryError::Translation(format!("Table {} is not in the schema", resolution.table))
        })?;

        if table.columns.is_empty() {
            return Err(QueryError::Translation(format!(
                "Table {} has no columns in the schema",
                table.name
            )));
        }

        debug!("Resolved table {} ({:?})", table.name, resolution.matched_by);
        Ok((self.parse_for_table(question, table), resolution))
    }

    pub fn translate(&self, question: &str) -> Result<Translation> {
        let (intent, resolution) = self.parse(question)?;
        let sql = assemble_intent(&intent);
        let parameterized = assemble_parameterized(&intent);
        info!("🔍 Translated question to: {}", sql);

        Ok(Translation {
            question: question.to_string(),
            intent,
            resolution,
            sql,
            parameterized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMeta;

    fn translator() -> Translator {
        let integer = ColumnMeta { declared_type: "integer".into(), ..Default::default() };
        let products = ColumnMeta {
            enum_values: Some(vec!["Go-SDK".into(), "Python-SDK".into()]),
            ..Default::default()
        };
        let catalog = Catalog::new(
            vec![TableDescriptor::new("ProductUsage", "Monthly product requests")
                .with_column("Month", ColumnMeta::default())
                .with_column("Product", products)
                .with_column("RequestCount", integer.clone())
                .with_column("SubscriptionCount", integer)],
            vec![],
        );
        Translator::new(Arc::new(catalog))
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 8, 20).unwrap())
    }

    #[test]
    fn test_translate() {
        let translation = translator().translate("Show me Go-SDK request counts this month").unwrap();
        assert_eq!(
            translation.sql,
            "SELECT Month, Product, RequestCount FROM ProductUsage WHERE Month LIKE '2025-08%' AND Product = 'Go-SDK' ORDER BY RequestCount DESC"
        );
        assert_eq!(translation.parameterized.params.len(), 2);
    }

    #[test]
    fn test_empty_question_is_a_translation_error() {
        assert!(matches!(translator().translate("  "), Err(QueryError::Translation(_))));
    }

    #[test]
    fn test_table_without_columns_is_a_translation_error() {
        let catalog = Catalog::new(vec![TableDescriptor::new("Hollow", "")], vec![]);
        let translator = Translator::new(Arc::new(catalog));
        assert!(matches!(translator.translate("show hollow"), Err(QueryError::Translation(_))));
    }

    #[test]
    fn test_empty_catalog_is_a_translation_error() {
        let translator = Translator::new(Arc::new(Catalog::empty()));
        assert!(matches!(translator.translate("anything"), Err(QueryError::Translation(_))));
    }
}
