//! Query Service
//!
//! The external operations: translate, translate-and-execute, execute-raw,
//! list-schema, get-enum and Kusto generation. Each returns a serializable
//! response; failures are reported inside the response, never as `Err`.

use crate::config::Config;
use crate::error::{QueryError, Result};
use crate::execution::{check_statement, ErrorClass, ErrorClassifier, ExecutionClient, QueryResult};
use crate::kusto::{validate_kusto, KustoQuery, KustoTemplate, KustoValidation};
use crate::schema::{Catalog, ColumnMeta, EnumDefinition};
use crate::translate::{Dialect, ParameterizedQuery, TableMatch, Translation, Translator};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

pub const TRANSLATION_SUGGESTIONS: &[&str] = &[
    "Try asking about products, or request counts",
    "Include specific dates like '2024-01' or time periods",
    "Mention specific products like 'Python-SDK' or 'Java Fluent Premium'",
    "Ask for top/bottom N results",
    "Filter by providers like 'Microsoft.Compute' or OS like 'Windows'",
];

/// Field name → enum definition
const ENUM_FIELDS: &[(&str, &str)] = &[
    ("product", "Product"),
    ("trackinfo", "TrackInfo"),
    ("track", "TrackInfo"),
    ("httpmethod", "HttpMethod"),
    ("method", "HttpMethod"),
    ("os", "OS"),
    ("operatingsystem", "OS"),
];

/// Fields that take any value the database holds
const OPEN_FIELDS: &[(&str, &str)] = &[
    ("provider", "Azure resource provider names (e.g., Microsoft.Compute, Microsoft.Storage, etc.)"),
    ("resource", "Azure resource types (e.g., virtualMachines, storageAccounts, etc.)"),
    ("apiversion", "Azure API versions (e.g., 2021-04-01, 2020-12-01, etc.)"),
];

const SUGGESTION_THRESHOLD: f64 = 0.8;
const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub success: bool,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<TableMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// Empty when every row passes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_clause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameterized: Option<ParameterizedQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Set when the generated query would be refused at execution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TranslateResponse {
    fn from_translation(translation: Translation) -> Self {
        let intent = &translation.intent;
        let where_clause = (!intent.predicate.is_tautology())
            .then(|| intent.predicate.render(Dialect::Sql));
        let order_clause = intent
            .order
            .as_ref()
            .map(|o| format!("ORDER BY {} {}", o.column, o.direction.as_sql()));
        let warnings = match check_statement(&translation.sql) {
            Ok(()) => Vec::new(),
            Err(e) => vec![format!("{}; translate-and-execute will refuse this query", e)],
        };

        Self {
            success: true,
            table: Some(intent.table.clone()),
            matched_by: Some(translation.resolution.matched_by.clone()),
            columns: intent.columns.clone(),
            where_clause,
            order_clause,
            limit: intent.limit,
            sql: Some(translation.sql.clone()),
            parameterized: Some(translation.parameterized.clone()),
            error: None,
            error_message: None,
            suggestions: Vec::new(),
            warnings,
            question: translation.question,
        }
    }

    fn failure(question: &str, class: ErrorClass, message: String) -> Self {
        Self {
            success: false,
            question: question.to_string(),
            table: None,
            matched_by: None,
            columns: Vec::new(),
            where_clause: None,
            order_clause: None,
            limit: None,
            sql: None,
            parameterized: None,
            error: Some(class),
            error_message: Some(message),
            suggestions: TRANSLATION_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub translation: TranslateResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    #[serde(flatten)]
    pub meta: ColumnMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub enabled: bool,
    pub description: String,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaResponse {
    pub table_count: usize,
    pub enabled_count: usize,
    pub tables: Vec<TableSummary>,
    pub enums: Vec<EnumDefinition>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnumResponse {
    pub success: bool,
    pub field_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_fields: Vec<String>,
    /// Closest known fields to an unknown one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KustoResponse {
    #[serde(flatten)]
    pub query: KustoQuery,
    pub validation: KustoValidation,
}

pub struct QueryService {
    translator: Translator,
    kusto: KustoTemplate,
    client: OnceCell<Arc<ExecutionClient>>,
    /// Settings for building the client on first execution
    config: Option<Config>,
    classifier: ErrorClassifier,
}

impl QueryService {
    pub fn new(catalog: Arc<Catalog>, client: Arc<ExecutionClient>) -> Self {
        Self {
            translator: Translator::new(catalog),
            kusto: KustoTemplate::new(),
            client: OnceCell::new_with(Some(client)),
            config: None,
            classifier: ErrorClassifier::new(),
        }
    }

    /// Service whose execution client is built from `config` when a query first runs
    pub fn with_config(catalog: Arc<Catalog>, config: Config) -> Self {
        Self {
            translator: Translator::new(catalog),
            kusto: KustoTemplate::new(),
            client: OnceCell::new(),
            config: Some(config),
            classifier: ErrorClassifier::new(),
        }
    }

    /// Pin "today" for both SQL and Kusto rendering
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.translator = self.translator.with_reference_date(date);
        self.kusto = self.kusto.with_reference_date(date);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        self.translator.catalog()
    }

    /// The execution client, if one has been created
    pub fn client(&self) -> Option<&Arc<ExecutionClient>> {
        self.client.get()
    }

    async fn execution_client(&self) -> Result<&Arc<ExecutionClient>> {
        self.client
            .get_or_try_init(|| async {
                match &self.config {
                    Some(config) => ExecutionClient::from_config(config).map(Arc::new),
                    None => Err(QueryError::Config(
                        "no execution client configured".to_string(),
                    )),
                }
            })
            .await
    }

    async fn run(&self, sql: &str) -> QueryResult {
        match self.execution_client().await {
            Ok(client) => client.execute(sql).await,
            Err(e) => {
                warn!("❌ Could not create execution client: {}", e);
                QueryResult::failure(sql, self.classifier.classify(&e), e.to_string(), None)
            }
        }
    }

    /// The would-be query and its components, without executing
    pub fn translate(&self, question: &str) -> TranslateResponse {
        match self.translator.translate(question) {
            Ok(translation) => TranslateResponse::from_translation(translation),
            Err(e) => {
                warn!("⚠️  Could not translate {:?}: {}", question, e);
                TranslateResponse::failure(question, self.classifier.classify(&e), e.to_string())
            }
        }
    }

    pub async fn translate_and_execute(&self, question: &str) -> AskResponse {
        let translation = self.translate(question);
        let sql = match &translation.sql {
            Some(sql) if translation.success => sql.clone(),
            _ => {
                return AskResponse {
                    success: false,
                    translation,
                    result: None,
                }
            }
        };

        let result = self.run(&sql).await;
        AskResponse {
            success: result.success,
            translation,
            result: Some(result),
        }
    }

    /// Run caller-supplied SQL; it goes through the same statement check
    pub async fn execute_raw(&self, sql: &str) -> QueryResult {
        info!("📊 Executing raw query");
        self.run(sql).await
    }

    pub fn list_schema(&self) -> SchemaResponse {
        let catalog = self.catalog();
        let tables: Vec<TableSummary> = catalog
            .tables()
            .iter()
            .map(|table| TableSummary {
                name: table.name.clone(),
                enabled: table.enabled,
                description: table.description.clone(),
                columns: table
                    .columns
                    .iter()
                    .map(|column| ColumnSummary {
                        name: column.clone(),
                        meta: table.meta(column).cloned().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        SchemaResponse {
            table_count: tables.len(),
            enabled_count: tables.iter().filter(|t| t.enabled).count(),
            tables,
            enums: catalog.enums().to_vec(),
        }
    }

    pub fn get_enum(&self, field_name: &str) -> EnumResponse {
        let field = field_name.trim().to_lowercase();
        let catalog = self.catalog();

        if let Some((_, enum_name)) = ENUM_FIELDS.iter().find(|(f, _)| *f == field) {
            let values = catalog.get_enum(enum_name);
            if !values.is_empty() {
                return EnumResponse {
                    success: true,
                    field_name: field_name.to_string(),
                    count: values.len(),
                    enum_values: values,
                    ..Default::default()
                };
            }
        }

        if let Some((_, description)) = OPEN_FIELDS.iter().find(|(f, _)| *f == field) {
            return EnumResponse {
                success: true,
                field_name: field_name.to_string(),
                description: Some(description.to_string()),
                message: Some(format!(
                    "No enum restriction for {}; any value in the database is accepted",
                    field_name
                )),
                ..Default::default()
            };
        }

        let definition = catalog
            .definitions()
            .iter()
            .find(|(name, meta)| name.to_lowercase() == field && meta.enum_values.is_some());
        if let Some((name, meta)) = definition {
            let values = meta.enum_values.clone().unwrap_or_default();
            return EnumResponse {
                success: true,
                field_name: name.clone(),
                count: values.len(),
                enum_values: values,
                description: (!meta.description.is_empty()).then(|| meta.description.clone()),
                ..Default::default()
            };
        }

        let available_fields: Vec<String> = ENUM_FIELDS
            .iter()
            .chain(OPEN_FIELDS.iter())
            .map(|(f, _)| f.to_string())
            .collect();
        let suggestions = closest_fields(&field, &available_fields, catalog);
        warn!("⚠️  No enum information for field {}", field_name);

        EnumResponse {
            success: false,
            field_name: field_name.to_string(),
            error: Some(format!("No enum information found for field '{}'", field_name)),
            available_fields,
            suggestions,
            ..Default::default()
        }
    }

    pub fn generate_kusto(&self, question: &str) -> KustoResponse {
        let query = self.kusto.generate(question);
        let validation = validate_kusto(&query.kql);
        if !validation.valid {
            warn!("⚠️  Generated Kusto query failed validation: {:?}", validation.errors);
        }
        info!("📊 Generated {:?} Kusto query ({} lines)", query.kind, validation.line_count);
        KustoResponse { query, validation }
    }
}

/// Known fields and enum definitions ranked by Jaro-Winkler similarity
fn closest_fields(field: &str, available: &[String], catalog: &Catalog) -> Vec<String> {
    available
        .iter()
        .cloned()
        .chain(catalog.enums().iter().map(|e| e.name.clone()))
        .map(|name| (strsim::jaro_winkler(field, &name.to_lowercase()), name))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .sorted_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, name)| name)
        .unique_by(|name| name.to_lowercase())
        .take(MAX_SUGGESTIONS)
        .collect()
}
