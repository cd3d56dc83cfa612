//! Parsed intent
//!
//! The backend-neutral result of resolving a question: table, output columns,
//! structured filter clauses, limit and ordering. Rendering into a concrete query
//! language happens later, per [`Dialect`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TAUTOLOGY: &str = "1=1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    Sql,
    Kusto,
}

/// A calendar window a temporal filter selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "grain", rename_all = "snake_case")]
pub enum TimeWindow {
    Day { date: NaiveDate },
    Month { year: i32, month: u32 },
    Year { year: i32 },
}

impl TimeWindow {
    pub fn month_of(date: NaiveDate) -> Self {
        TimeWindow::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Text prefix shared by every value inside the window
    pub fn prefix(&self) -> String {
        match self {
            TimeWindow::Day { date } => date.format("%Y-%m-%d").to_string(),
            TimeWindow::Month { year, month } => format!("{:04}-{:02}", year, month),
            TimeWindow::Year { year } => format!("{:04}", year),
        }
    }

    pub fn start(&self) -> NaiveDate {
        match *self {
            TimeWindow::Day { date } => date,
            TimeWindow::Month { year, month } => {
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
            }
            TimeWindow::Year { year } => NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }

    /// First day after the window
    pub fn end_exclusive(&self) -> NaiveDate {
        match *self {
            TimeWindow::Day { date } => date.succ_opt().unwrap_or(NaiveDate::MAX),
            TimeWindow::Month { year, month } => {
                let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(NaiveDate::MAX)
            }
            TimeWindow::Year { year } => {
                NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap_or(NaiveDate::MAX)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
}

impl CompareOp {
    pub fn symbol(&self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (CompareOp::Gt, _) => ">",
            (CompareOp::Lt, _) => "<",
            (CompareOp::Ge, _) => ">=",
            (CompareOp::Le, _) => "<=",
            (CompareOp::Eq, Dialect::Sql) => "=",
            (CompareOp::Eq, Dialect::Kusto) => "==",
        }
    }
}

/// One independent filter; clauses are AND-ed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Clause {
    /// Several windows form an OR group
    Temporal { column: String, windows: Vec<TimeWindow> },
    Equals { column: String, value: String },
    /// OR group of equalities
    AnyOf { column: String, values: Vec<String> },
    Contains { column: String, needle: String },
    Compare { column: String, op: CompareOp, value: i64 },
}

impl Clause {
    pub fn column(&self) -> &str {
        match self {
            Clause::Temporal { column, .. }
            | Clause::Equals { column, .. }
            | Clause::AnyOf { column, .. }
            | Clause::Contains { column, .. }
            | Clause::Compare { column, .. } => column,
        }
    }

    pub fn render(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Sql => self.render_sql(&mut None),
            Dialect::Kusto => self.render_kusto(),
        }
    }

    /// SQL text; when `params` is given, literals become `@pN` placeholders
    fn render_sql(&self, params: &mut Option<&mut Vec<serde_json::Value>>) -> String {
        match self {
            Clause::Temporal { column, windows } => {
                let parts: Vec<String> = windows
                    .iter()
                    .map(|w| match w {
                        TimeWindow::Day { .. } => {
                            format!("{} = {}", column, sql_literal(&w.prefix(), params))
                        }
                        _ => format!(
                            "{} LIKE {}",
                            column,
                            sql_literal(&format!("{}%", w.prefix()), params)
                        ),
                    })
                    .collect();
                or_group(parts)
            }
            Clause::Equals { column, value } => {
                format!("{} = {}", column, sql_literal(value, params))
            }
            Clause::AnyOf { column, values } => {
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| format!("{} = {}", column, sql_literal(v, params)))
                    .collect();
                or_group(parts)
            }
            Clause::Contains { column, needle } => {
                format!("{} LIKE {}", column, sql_literal(&format!("%{}%", needle), params))
            }
            Clause::Compare { column, op, value } => match params {
                Some(list) => {
                    list.push(serde_json::Value::from(*value));
                    format!("{} {} @p{}", column, op.symbol(Dialect::Sql), list.len() - 1)
                }
                None => format!("{} {} {}", column, op.symbol(Dialect::Sql), value),
            },
        }
    }

    fn render_kusto(&self) -> String {
        match self {
            Clause::Temporal { column, windows } => {
                let parts: Vec<String> = windows
                    .iter()
                    .map(|w| {
                        format!(
                            "{col} >= datetime({}) and {col} < datetime({})",
                            w.start().format("%Y-%m-%d"),
                            w.end_exclusive().format("%Y-%m-%d"),
                            col = column
                        )
                    })
                    .collect();
                if parts.len() == 1 {
                    parts.into_iter().collect()
                } else {
                    parts
                        .iter()
                        .map(|p| format!("({})", p))
                        .collect::<Vec<_>>()
                        .join(" or ")
                }
            }
            Clause::Equals { column, value } => format!("{} == {}", column, kusto_string(value)),
            Clause::AnyOf { column, values } => {
                let list: Vec<String> = values.iter().map(|v| kusto_string(v)).collect();
                format!("{} in ({})", column, list.join(", "))
            }
            Clause::Contains { column, needle } => {
                format!("{} contains {}", column, kusto_string(needle))
            }
            Clause::Compare { column, op, value } => {
                format!("{} {} {}", column, op.symbol(Dialect::Kusto), value)
            }
        }
    }
}

fn or_group(parts: Vec<String>) -> String {
    if parts.len() == 1 {
        parts.into_iter().collect()
    } else {
        format!("({})", parts.join(" OR "))
    }
}

fn sql_literal(value: &str, params: &mut Option<&mut Vec<serde_json::Value>>) -> String {
    match params {
        Some(list) => {
            list.push(serde_json::Value::String(value.to_string()));
            format!("@p{}", list.len() - 1)
        }
        None => format!("'{}'", value.replace('\'', "''")),
    }
}

fn kusto_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// AND-ed filter clauses; empty means the tautology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn tautology() -> Self {
        Self::default()
    }

    pub fn is_tautology(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn clause_for(&self, column: &str) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.column() == column)
    }

    /// Rendered SQL condition, `1=1` when there is nothing to filter
    pub fn render(&self, dialect: Dialect) -> String {
        if self.clauses.is_empty() {
            return match dialect {
                Dialect::Sql => TAUTOLOGY.to_string(),
                Dialect::Kusto => "true".to_string(),
            };
        }
        let joiner = match dialect {
            Dialect::Sql => " AND ",
            Dialect::Kusto => " and ",
        };
        self.clauses
            .iter()
            .map(|c| c.render(dialect))
            .collect::<Vec<_>>()
            .join(joiner)
    }

    /// SQL condition with literals lifted into `params`
    pub fn render_parameterized(&self, params: &mut Vec<serde_json::Value>) -> String {
        if self.clauses.is_empty() {
            return TAUTOLOGY.to_string();
        }
        let mut sink = Some(params);
        self.clauses
            .iter()
            .map(|c| c.render_sql(&mut sink))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(Dialect::Sql))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }

    pub fn as_kusto(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub table: String,
    /// Never empty; `["*"]` only when the table has no known columns
    pub columns: Vec<String>,
    pub predicate: Predicate,
    pub limit: Option<u32>,
    pub order: Option<OrderBy>,
}
