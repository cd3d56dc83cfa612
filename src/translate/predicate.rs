//! Predicate Builder
//!
//! Derives filter clauses from a question. Each stage looks at the question on its own
//! and produces at most one clause for its column, so dropping the words that triggered
//! one clause never changes another. Stages run in a fixed order:
//! date → product → track → provider → resource → api version → http method → os → numeric.

use crate::schema::{Catalog, TableDescriptor};
use crate::translate::aliases::AliasResolver;
use crate::translate::intent::{Clause, CompareOp, Predicate, TimeWindow};
use crate::translate::roles::{columns_with_role, role_column, ColumnRole};
use crate::translate::text::contains_term;
use chrono::{Datelike, Months, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref DATE_LITERAL: Regex =
        Regex::new(r"\b(\d{4})[-/](\d{2})(?:-(\d{2}))?\b").unwrap();
    static ref API_VERSION: Regex =
        Regex::new(r"\bapi[\s-]?versions?\s*[:=]?\s*(\d{4}-\d{2}-\d{2}(?:-preview)?)").unwrap();
    static ref TRACK_SHORTHAND: Regex = Regex::new(r"\btrack\s?([12])\b").unwrap();
    static ref PROVIDER_NAMESPACE: Regex = Regex::new(r"\bmicrosoft\.(\w+)").unwrap();
    static ref PROVIDER_WORDS: Regex = Regex::new(r"\bmicrosoft\s+(\w+)").unwrap();
    static ref NUMERIC_TEMPLATES: Vec<(Regex, CompareOp)> = vec![
        (numeric_template("more than|greater than|above|over"), CompareOp::Gt),
        (numeric_template("less than|fewer than|below|under"), CompareOp::Lt),
        (numeric_template("at least|minimum of"), CompareOp::Ge),
        (numeric_template("at most|maximum of"), CompareOp::Le),
        (numeric_template("exactly|equal to"), CompareOp::Eq),
    ];
}

fn numeric_template(phrases: &str) -> Regex {
    Regex::new(&format!(r"\b(?:{})\s+(\d[\d,]*)(?:\s+([a-z]+))?", phrases)).unwrap()
}

const PROVIDER_KEYWORDS: &[&str] = &[
    "compute",
    "storage",
    "network",
    "web",
    "sql",
    "keyvault",
    "resources",
    "container",
    "documentdb",
    "authorization",
];

/// Resource phrases and the resource-type fragment they stand for, in match order.
/// Bare provider keywords stay out of this list so one word yields one clause.
const RESOURCE_KEYWORDS: &[(&str, &str)] = &[
    ("virtualmachines", "virtualMachines"),
    ("virtual machines", "virtualMachines"),
    ("vm", "virtualMachines"),
    ("vms", "virtualMachines"),
    ("storageaccounts", "storageAccounts"),
    ("storage accounts", "storageAccounts"),
    ("virtualnetworks", "virtualNetworks"),
    ("virtual networks", "virtualNetworks"),
    ("vnet", "virtualNetworks"),
    ("webapps", "webApps"),
    ("web apps", "webApps"),
    ("webapp", "webApps"),
    ("sqlservers", "sqlServers"),
    ("sql servers", "sqlServers"),
    ("keyvaults", "keyVaults"),
    ("key vaults", "keyVaults"),
    ("resourcegroups", "resourceGroups"),
    ("resource groups", "resourceGroups"),
    ("kubernetesclusters", "kubernetesClusters"),
    ("kubernetes", "kubernetesClusters"),
    ("aks", "kubernetesClusters"),
    ("cosmosdbaccounts", "cosmosDbAccounts"),
    ("cosmosdb", "cosmosDbAccounts"),
    ("cosmos", "cosmosDbAccounts"),
    ("roleassignments", "roleAssignments"),
    ("role assignments", "roleAssignments"),
];

const DEFAULT_HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD"];

pub struct PredicateBuilder<'a> {
    catalog: &'a Catalog,
    aliases: &'a AliasResolver,
    today: NaiveDate,
}

impl<'a> PredicateBuilder<'a> {
    /// `today` anchors relative phrases like "this month"
    pub fn new(catalog: &'a Catalog, aliases: &'a AliasResolver, today: NaiveDate) -> Self {
        Self {
            catalog,
            aliases,
            today,
        }
    }

    /// Predicate for `table_name`; the tautology for an unknown table
    pub fn build(&self, question: &str, table_name: &str) -> Predicate {
        match self.catalog.get_table(table_name) {
            Some(table) => self.build_for(question, table),
            None => Predicate::tautology(),
        }
    }

    pub fn build_for(&self, question: &str, table: &TableDescriptor) -> Predicate {
        let q = question.to_lowercase();
        let mut clauses = Vec::new();

        clauses.extend(self.date_clause(&q, table));
        clauses.extend(self.product_clause(&q, table));
        clauses.extend(self.track_clause(&q, table));
        clauses.extend(self.provider_clause(&q, table));
        clauses.extend(self.resource_clause(&q, table));
        clauses.extend(self.api_version_clause(&q, table));
        clauses.extend(self.http_method_clause(question, &q, table));
        clauses.extend(self.os_clause(&q, table));
        clauses.extend(numeric_clauses(&q, table));

        debug!("Built {} filter clause(s) for {}", clauses.len(), table.name);
        Predicate::new(clauses)
    }

    fn date_clause(&self, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::Temporal)?;
        let windows = time_windows(q, self.today);
        if windows.is_empty() {
            return None;
        }
        Some(Clause::Temporal {
            column: column.to_string(),
            windows,
        })
    }

    fn product_clause(&self, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::Product)?;
        let products = self.catalog.column_enum(table, column);
        let mut matched = self.aliases.resolve(q, &products);
        match matched.len() {
            0 => None,
            1 => Some(Clause::Equals {
                column: column.to_string(),
                value: matched.remove(0),
            }),
            _ => Some(Clause::AnyOf {
                column: column.to_string(),
                values: matched,
            }),
        }
    }

    fn track_clause(&self, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::Track)?;
        let tracks = self.catalog.column_enum(table, column);

        let value = first_enum_literal(q, &tracks).or_else(|| {
            let n = TRACK_SHORTHAND.captures(q)?.get(1)?.as_str().to_string();
            let shorthand = format!("Track{}", n);
            (tracks.is_empty() || tracks.contains(&shorthand)).then_some(shorthand)
        })?;

        Some(Clause::Equals {
            column: column.to_string(),
            value,
        })
    }

    fn provider_clause(&self, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::Provider)?;
        let providers = self.catalog.column_enum(table, column);
        if !providers.is_empty() {
            return first_enum_literal(q, &providers).map(|value| Clause::Equals {
                column: column.to_string(),
                value,
            });
        }

        let needle = [&*PROVIDER_NAMESPACE, &*PROVIDER_WORDS]
            .iter()
            .find_map(|re| re.captures(q))
            .and_then(|caps| caps.get(1))
            .map(|service| format!("Microsoft.{}", capitalize(service.as_str())))
            .or_else(|| {
                PROVIDER_KEYWORDS
                    .iter()
                    .find(|kw| contains_term(q, kw))
                    .map(|kw| kw.to_string())
            })?;

        Some(Clause::Contains {
            column: column.to_string(),
            needle,
        })
    }

    fn resource_clause(&self, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::Resource)?;
        let resources = self.catalog.column_enum(table, column);
        if !resources.is_empty() {
            return first_enum_literal(q, &resources).map(|value| Clause::Equals {
                column: column.to_string(),
                value,
            });
        }

        RESOURCE_KEYWORDS
            .iter()
            .find(|(phrase, _)| contains_term(q, phrase))
            .map(|(_, fragment)| Clause::Contains {
                column: column.to_string(),
                needle: fragment.to_string(),
            })
    }

    fn api_version_clause(&self, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::ApiVersion)?;
        let versions = self.catalog.column_enum(table, column);
        if !versions.is_empty() {
            return first_enum_literal(q, &versions).map(|value| Clause::Equals {
                column: column.to_string(),
                value,
            });
        }

        let version = API_VERSION.captures(q)?.get(1)?.as_str().to_string();
        Some(Clause::Contains {
            column: column.to_string(),
            needle: version,
        })
    }

    /// Methods match when written in their canonical case ("GET") or named as
    /// "get requests" / "post calls", so ordinary verbs do not filter.
    fn http_method_clause(&self, question: &str, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::HttpMethod)?;
        let mut methods = self.catalog.column_enum(table, column);
        if methods.is_empty() {
            methods = DEFAULT_HTTP_METHODS.iter().map(|m| m.to_string()).collect();
        }

        let value = methods.into_iter().find(|method| {
            let lower = method.to_lowercase();
            contains_term(question, method)
                || ["request", "requests", "call", "calls", "method", "methods"]
                    .iter()
                    .any(|suffix| contains_term(q, &format!("{} {}", lower, suffix)))
        })?;

        Some(Clause::Equals {
            column: column.to_string(),
            value,
        })
    }

    fn os_clause(&self, q: &str, table: &TableDescriptor) -> Option<Clause> {
        let column = role_column(table, ColumnRole::Os)?;
        let systems = self.catalog.column_enum(table, column);
        let value = first_enum_literal(q, &systems)?;
        Some(Clause::Equals {
            column: column.to_string(),
            value,
        })
    }
}

/// Every calendar window the question names: date literals first, then relative phrases
pub fn time_windows(q: &str, today: NaiveDate) -> Vec<TimeWindow> {
    // Dates inside an API version are not time filters
    let masked = API_VERSION.replace_all(q, " ");
    let mut windows = Vec::new();

    for caps in DATE_LITERAL.captures_iter(&masked) {
        let year: i32 = match caps[1].parse() {
            Ok(y) => y,
            Err(_) => continue,
        };
        let month: u32 = match caps[2].parse() {
            Ok(m) if (1..=12).contains(&m) => m,
            _ => continue,
        };
        let window = match caps.get(3) {
            Some(day) => {
                let day: u32 = day.as_str().parse().unwrap_or(0);
                match NaiveDate::from_ymd_opt(year, month, day) {
                    Some(date) => TimeWindow::Day { date },
                    None => continue,
                }
            }
            None => TimeWindow::Month { year, month },
        };
        push_unique(&mut windows, window);
    }

    if masked.contains("this month") {
        push_unique(&mut windows, TimeWindow::month_of(today));
    }
    if masked.contains("last month") || masked.contains("previous month") {
        let previous = today.checked_sub_months(Months::new(1)).unwrap_or(today);
        push_unique(&mut windows, TimeWindow::month_of(previous));
    }
    if masked.contains("this year") {
        push_unique(&mut windows, TimeWindow::Year { year: today.year() });
    }
    if masked.contains("last year") || masked.contains("previous year") {
        push_unique(&mut windows, TimeWindow::Year { year: today.year() - 1 });
    }
    if contains_term(&masked, "today") {
        push_unique(&mut windows, TimeWindow::Day { date: today });
    }
    if contains_term(&masked, "yesterday") {
        if let Some(date) = today.pred_opt() {
            push_unique(&mut windows, TimeWindow::Day { date });
        }
    }

    windows
}

fn push_unique(windows: &mut Vec<TimeWindow>, window: TimeWindow) {
    if !windows.contains(&window) {
        windows.push(window);
    }
}

/// Numeric comparisons; each measure column takes the first template that binds to it
fn numeric_clauses(q: &str, table: &TableDescriptor) -> Vec<Clause> {
    let measures = columns_with_role(table, ColumnRole::Measure);
    if measures.is_empty() {
        return Vec::new();
    }

    let mut clauses: Vec<Clause> = Vec::new();
    for (template, op) in NUMERIC_TEMPLATES.iter() {
        for caps in template.captures_iter(q) {
            let Ok(value) = caps[1].replace(',', "").parse::<i64>() else {
                continue;
            };
            let column = caps
                .get(2)
                .and_then(|unit| measure_for_unit(unit.as_str(), &measures))
                .unwrap_or(measures[0]);
            if clauses.iter().any(|c| c.column() == column) {
                continue;
            }
            clauses.push(Clause::Compare {
                column: column.to_string(),
                op: *op,
                value,
            });
        }
    }
    clauses
}

/// "1000 subscriptions" binds to SubscriptionCount
fn measure_for_unit<'t>(unit: &str, measures: &[&'t str]) -> Option<&'t str> {
    let stem = unit.trim_end_matches('s');
    if stem.len() < 3 {
        return None;
    }
    measures
        .iter()
        .find(|m| m.to_lowercase().starts_with(stem))
        .copied()
}

fn first_enum_literal(q: &str, values: &[String]) -> Option<String> {
    values
        .iter()
        .find(|v| contains_term(q, &v.to_lowercase()))
        .cloned()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
