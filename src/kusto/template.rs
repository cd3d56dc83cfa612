//! Kusto query template
//!
//! Produces an analytics query over the request event stream by filling a fixed
//! template: time bounds, enrichment functions, the base filter chain, one `| where`
//! per resolved clause, and an aggregation picked from the question's shape.

use crate::schema::{Catalog, ColumnMeta, TableDescriptor};
use crate::translate::intent::{Clause, Dialect, ParsedIntent, TimeWindow};
use crate::translate::ordering;
use crate::translate::predicate::PredicateBuilder;
use crate::translate::text::{mentions_word, tokens};
use crate::translate::AliasResolver;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

pub const EVENT_TABLE: &str = "RequestEvents";
const DEFAULT_RANKING_LIMIT: u32 = 10;

pub const PRODUCTS: &[&str] = &[
    "Terraform",
    "Ansible",
    "Java Fluent Lite",
    "Java Fluent Premium",
    ".Net Fluent",
    ".Net Code-gen",
    "Python-SDK",
    "JavaScript (Node.JS)",
    "JavaScript RLC",
    "JavaScript",
    "Ruby-SDK",
    "Go-SDK",
    "PHP-SDK",
];

const ENRICHMENT_FUNCTIONS: &str = r#"let GetProduct = (UAString: string)
{
    let userAgent = tolower(trim(" ", UAString));
    let goSdkException = dynamic(["kubernetes-cloudprovider", "cluster-api-provider-azure", "cilium", "azure-metrics-exporter", "azure_prometheus_exporter", "cluster-image-registry-operator", "aad-pod-identity", "azure-service-operator"]);
    let netReg = extract(@"(microsoft\.windowsazure\.management|microsoft\.azure\.management)", 1, userAgent);
    let jsRlcReg = "azsdk-js-arm-[a-z0-9]+-rest";
    case(
        isempty(UAString), "",
        userAgent has "terraform", "Terraform",
        userAgent has "ansible", "Ansible",
        (userAgent has "azure-sdk-for-java" or userAgent has "azsdk-java") and userAgent has "auto-generated", "Java Fluent Lite",
        userAgent has "azure-sdk-for-java" or userAgent has "azsdk-java", "Java Fluent Premium",
        netReg != "" and userAgent has "fluent", ".Net Fluent",
        netReg != "" or userAgent has "azsdk-net", ".Net Code-gen",
        userAgent has "azure-sdk-for-python" or userAgent has "azsdk-python", "Python-SDK",
        userAgent has "azure-sdk-for-node", "JavaScript (Node.JS)",
        userAgent matches regex jsRlcReg, "JavaScript RLC",
        (userAgent has "ms-rest-js" and userAgent startswith "@azure/arm") or userAgent has "azsdk-js-arm", "JavaScript",
        userAgent has "azure-sdk-for-ruby", "Ruby-SDK",
        (userAgent has "azure-sdk-for-go" or userAgent has "azsdk-go") and array_index_of(goSdkException, userAgent) == -1, "Go-SDK",
        userAgent has "azure-sdk-for-php", "PHP-SDK",
        ""
    )
};
let GetTrackInfo = (UAString: string)
{
    let userAgent = tolower(trim(" ", UAString));
    case(
        userAgent has "azsdk-net", "Track2",
        userAgent has "azsdk-python", "Track2",
        userAgent has "azsdk-java", "Track2",
        userAgent has "azsdk-go", "Track2",
        userAgent has "azsdk-js", "Track2",
        "Track1"
    )
};
let GetOSInfo = (UAString: string)
{
    let userAgent = tolower(trim(" ", UAString));
    case(
        userAgent has "windows", "Windows",
        userAgent has "linux", "Linux",
        userAgent has "macos", "MacOS",
        userAgent has "mac os", "MacOS",
        "Unknown"
    )
};
let GetProvider = (uriString: string)
{
    let lowerURI = tolower(uriString);
    let providerMatch = extract("/providers/([^?/]*)", 1, lowerURI);
    iff(lowerURI contains "/resource-manager-rest-api/" or lowerURI contains "/providers?" or lowerURI contains "/resourcegroups/", "resourcemanager", providerMatch)
};
let GetResource = (operationName: string)
{
    let lowerOperationName = tolower(operationName);
    let resourceMatch = extract("/providers/microsoft.([a-z]+)/([a-z]+)/", 2, lowerOperationName);
    let elements = split(lowerOperationName, "/");
    tolower(iff(resourceMatch != "", resourceMatch, tostring(elements[-1])))
};"#;

const BASE_FILTERS: &str = r#"Unionizer("Requests", "HttpIncomingRequests")
| where TIMESTAMP >= startDateTime and TIMESTAMP < endDateTime
| where TaskName == "HttpIncomingRequestEndWithSuccess"
| where isnotempty(subscriptionId)
| extend Product = GetProduct(userAgent)
| extend Track = GetTrackInfo(userAgent)
| extend OS = GetOSInfo(userAgent)
| extend Provider = GetProvider(operationName)
| extend Resource = GetResource(operationName)
| where isnotempty(Product)"#;

/// The shape of answer a question asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Count,
    Trend,
    Ranking,
    Percentage,
    Summary,
}

impl QueryKind {
    pub fn detect(question: &str) -> Self {
        let q = question.to_lowercase();
        let words = tokens(&q);
        let cue = |cues: &[&str]| {
            cues.iter().any(|c| {
                if c.contains(' ') {
                    q.contains(c)
                } else {
                    mentions_word(&words, c)
                }
            })
        };

        if cue(&["count", "number", "how many", "quantity", "amount"]) {
            QueryKind::Count
        } else if cue(&["trend", "over time", "change", "daily"]) {
            QueryKind::Trend
        } else if cue(&["top", "bottom", "most", "highest", "lowest", "ranking"]) {
            QueryKind::Ranking
        } else if cue(&["percent", "proportion", "ratio", "share"]) {
            QueryKind::Percentage
        } else {
            QueryKind::Summary
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KustoQuery {
    pub question: String,
    pub kind: QueryKind,
    pub start: NaiveDate,
    /// Exclusive upper bound
    pub end: NaiveDate,
    pub filters: Vec<String>,
    pub group_by: Vec<String>,
    pub limit: Option<u32>,
    pub kql: String,
}

/// The request event stream as a table the shared resolution stages understand
pub fn event_table() -> TableDescriptor {
    let enumerated = |values: &[&str]| ColumnMeta {
        declared_type: "string".into(),
        enum_values: Some(values.iter().map(|v| v.to_string()).collect()),
        ..Default::default()
    };
    let text = |description: &str| ColumnMeta {
        declared_type: "string".into(),
        description: description.into(),
        ..Default::default()
    };

    TableDescriptor::new(EVENT_TABLE, "Successful incoming management requests")
        .with_column(
            "TIMESTAMP",
            ColumnMeta {
                declared_type: "string".into(),
                format: Some("date-time".into()),
                ..Default::default()
            },
        )
        .with_column("Product", enumerated(PRODUCTS))
        .with_column("Track", enumerated(&["Track1", "Track2"]))
        .with_column("OS", enumerated(&["Windows", "Linux", "MacOS"]))
        .with_column("Provider", text("Resource provider namespace"))
        .with_column("Resource", text("Resource type"))
        .with_column("httpMethod", enumerated(&["GET", "PUT", "POST", "DELETE", "PATCH"]))
        .with_column("apiVersion", text("API version"))
        .with_column("subscriptionId", text("Subscription id"))
        .with_column(
            "RequestCount",
            ColumnMeta {
                declared_type: "integer".into(),
                ..Default::default()
            },
        )
}

pub struct KustoTemplate {
    table: TableDescriptor,
    /// Enum lookups fall back to the catalog; the event table carries its own
    catalog: Catalog,
    aliases: AliasResolver,
    reference_date: Option<NaiveDate>,
}

impl Default for KustoTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl KustoTemplate {
    pub fn new() -> Self {
        Self {
            table: event_table(),
            catalog: Catalog::empty(),
            aliases: AliasResolver::new(),
            reference_date: None,
        }
    }

    pub fn with_aliases(mut self, aliases: AliasResolver) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Intent against the event table, resolved by the same stages as SQL
    pub fn parse(&self, question: &str) -> ParsedIntent {
        let table = &self.table;
        let predicate = PredicateBuilder::new(&self.catalog, &self.aliases, self.today())
            .build_for(question, table);
        let ordering = ordering::derive(question, Some(table));
        ParsedIntent {
            table: table.name.clone(),
            columns: Vec::new(),
            predicate,
            limit: ordering.limit,
            order: ordering.order,
        }
    }

    pub fn generate(&self, question: &str) -> KustoQuery {
        let today = self.today();
        let intent = self.parse(question);
        let kind = QueryKind::detect(question);

        let mut windows: Vec<TimeWindow> = Vec::new();
        let mut row_filters = Vec::new();
        let mut aggregate_filters = Vec::new();
        for clause in intent.predicate.clauses() {
            match clause {
                Clause::Temporal { windows: w, .. } => {
                    if w.len() > 1 {
                        row_filters.push(clause.render(Dialect::Kusto));
                    }
                    windows.extend(w.iter().copied());
                }
                Clause::Compare { .. } => aggregate_filters.push(clause.render(Dialect::Kusto)),
                _ => row_filters.push(clause.render(Dialect::Kusto)),
            }
        }

        let (start, end) = if windows.is_empty() {
            let this_month = TimeWindow::month_of(today);
            (this_month.start(), today.succ_opt().unwrap_or(today))
        } else {
            let start = windows.iter().map(TimeWindow::start).min().unwrap_or(today);
            let end = windows.iter().map(TimeWindow::end_exclusive).max().unwrap_or(today);
            (start, end)
        };

        let direction = intent
            .order
            .as_ref()
            .map_or_else(|| ordering::direction(&question.to_lowercase()), |o| o.direction);
        let limit = match (intent.limit, kind) {
            (Some(n), _) => Some(n),
            (None, QueryKind::Ranking) => Some(DEFAULT_RANKING_LIMIT),
            _ => None,
        };
        let group_by = grouping(question, kind);

        let mut kql = format!(
            "// Generated KQL for: {}\nlet currentDateTime = datetime(\"{}\");\nlet startDateTime = datetime(\"{}\");\nlet endDateTime = datetime(\"{}\");\n\n{}\n\n{}\n",
            question.replace('\n', " "),
            today.format("%Y-%m-%d"),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            ENRICHMENT_FUNCTIONS,
            BASE_FILTERS,
        );
        for filter in &row_filters {
            kql.push_str(&format!("| where {}\n", filter));
        }
        kql.push_str(&format!(
            "| summarize RequestCount = count() by {}\n",
            group_by.join(", ")
        ));
        for filter in &aggregate_filters {
            kql.push_str(&format!("| where {}\n", filter));
        }
        match kind {
            QueryKind::Percentage => {
                kql.push_str("| as Counts\n");
                kql.push_str("| extend Percentage = round(100.0 * RequestCount / toscalar(Counts | summarize sum(RequestCount)), 2)\n");
                kql.push_str(&format!("| order by Percentage {}\n", direction.as_kusto()));
            }
            QueryKind::Trend => kql.push_str("| order by TIMESTAMP asc\n"),
            _ => {}
        }
        if kind != QueryKind::Percentage && kind != QueryKind::Trend {
            match limit {
                Some(n) => kql.push_str(&format!("| top {} by RequestCount {}\n", n, direction.as_kusto())),
                None => kql.push_str(&format!("| order by RequestCount {}\n", direction.as_kusto())),
            }
        } else if let Some(n) = limit {
            kql.push_str(&format!("| take {}\n", n));
        }

        let mut filters = row_filters;
        filters.extend(aggregate_filters);
        info!("📊 Generated {:?} KQL with {} filter(s)", kind, filters.len());

        KustoQuery {
            question: question.to_string(),
            kind,
            start,
            end,
            filters,
            group_by,
            limit,
            kql: kql.trim_end().to_string(),
        }
    }
}

/// Grouping dimensions for the aggregation
fn grouping(question: &str, kind: QueryKind) -> Vec<String> {
    let q = question.to_lowercase();
    let words = tokens(&q);
    let any = |cues: &[&str]| cues.iter().any(|c| mentions_word(&words, c));
    let dims = |list: &[&str]| list.iter().map(|d| d.to_string()).collect::<Vec<_>>();

    let leading = if any(&["provider"]) {
        "Provider"
    } else if any(&["resource"]) {
        "Resource"
    } else {
        "Product"
    };

    if kind == QueryKind::Trend {
        return vec!["bin(TIMESTAMP, 1d)".to_string(), leading.to_string()];
    }
    if kind == QueryKind::Percentage || kind == QueryKind::Ranking {
        return vec![leading.to_string()];
    }
    if any(&["subscription", "customer", "subscriber", "tenant"]) {
        dims(&["subscriptionId", "Product", "Provider"])
    } else if any(&["api", "version", "endpoint"]) {
        dims(&["Product", "apiVersion", "Provider"])
    } else if any(&["os", "platform", "windows", "linux", "mac", "macos"]) {
        dims(&["Product", "OS", "Provider"])
    } else if any(&["track"]) {
        dims(&["Product", "Track", "Provider"])
    } else if any(&["detail", "breakdown", "analysis", "analyze"]) {
        dims(&[
            "subscriptionId",
            "Product",
            "apiVersion",
            "Track",
            "OS",
            "Provider",
            "Resource",
            "httpMethod",
        ])
    } else {
        vec![leading.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::roles::{role_column, ColumnRole};

    fn template() -> KustoTemplate {
        KustoTemplate::new().with_reference_date(NaiveDate::from_ymd_opt(2025, 9, 4).unwrap())
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(QueryKind::detect("how many requests"), QueryKind::Count);
        assert_eq!(QueryKind::detect("Go-SDK trend"), QueryKind::Trend);
        assert_eq!(QueryKind::detect("top providers"), QueryKind::Ranking);
        assert_eq!(QueryKind::detect("share of each product"), QueryKind::Percentage);
        assert_eq!(QueryKind::detect("python usage"), QueryKind::Summary);
    }

    #[test]
    fn test_default_window_is_current_month_to_date() {
        let query = template().generate("python usage");
        assert_eq!(query.start, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert_eq!(query.end, NaiveDate::from_ymd_opt(2025, 9, 5).unwrap());
        assert!(query.kql.contains("let startDateTime = datetime(\"2025-09-01\");"));
        assert!(query.kql.contains("| where Product == \"Python-SDK\""));
        assert!(query.kql.contains("| summarize RequestCount = count() by Product"));
    }

    #[test]
    fn test_last_month_window() {
        let query = template().generate("Go-SDK requests last month by os");
        assert_eq!(query.start, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
        assert_eq!(query.end, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert_eq!(query.group_by, vec!["Product", "OS", "Provider"]);
    }

    #[test]
    fn test_ranking_uses_top() {
        let query = template().generate("top 5 providers for java");
        assert_eq!(query.kind, QueryKind::Ranking);
        assert_eq!(query.limit, Some(5));
        assert!(query.kql.contains("| where Product in (\"Java Fluent Lite\", \"Java Fluent Premium\")"));
        assert!(query.kql.contains("| summarize RequestCount = count() by Provider"));
        assert!(query.kql.ends_with("| top 5 by RequestCount desc"));
    }

    #[test]
    fn test_bottom_ranking_sorts_ascending() {
        let query = template().generate("bottom 5 providers");
        assert_eq!(query.kind, QueryKind::Ranking);
        assert_eq!(query.limit, Some(5));
        assert!(query.kql.ends_with("| top 5 by RequestCount asc"));
    }

    #[test]
    fn test_numeric_filter_applies_after_aggregation() {
        let query = template().generate("products with more than 1000 requests");
        let summarize = query.kql.find("| summarize").unwrap();
        let filter = query.kql.find("| where RequestCount > 1000").unwrap();
        assert!(filter > summarize);
    }

    #[test]
    fn test_event_table_roles() {
        let table = event_table();
        assert_eq!(role_column(&table, ColumnRole::HttpMethod), Some("httpMethod"));
        assert_eq!(role_column(&table, ColumnRole::Temporal), Some("TIMESTAMP"));
        assert_eq!(role_column(&table, ColumnRole::ApiVersion), Some("apiVersion"));
    }
}
