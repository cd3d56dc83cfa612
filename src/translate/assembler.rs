//! Query Assembler
//!
//! Renders a [`ParsedIntent`] as `SELECT [TOP N] cols FROM table [WHERE ...] [ORDER BY ...]`.
//! Pure and deterministic. [`outline`] reads the same structure back out of SQL text.

use crate::translate::intent::{Dialect, OrderBy, OrderDirection, ParsedIntent, Predicate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref SELECT_SHAPE: Regex = Regex::new(
        r"(?is)^\s*select\s+(?:top\s+(\d+)\s+)?(.+?)\s+from\s+([\w\.\[\]]+)(?:\s+where\s+(.+?))?(?:\s+order\s+by\s+([\w\.\[\]]+)(?:\s+(asc|desc))?)?\s*;?\s*$"
    )
    .unwrap();
}

pub fn assemble(
    table: &str,
    columns: &[String],
    predicate: &Predicate,
    order: Option<&OrderBy>,
    limit: Option<u32>,
) -> String {
    let condition = (!predicate.is_tautology()).then(|| predicate.render(Dialect::Sql));
    render(table, columns, condition, order, limit)
}

pub fn assemble_intent(intent: &ParsedIntent) -> String {
    assemble(
        &intent.table,
        &intent.columns,
        &intent.predicate,
        intent.order.as_ref(),
        intent.limit,
    )
}

/// Query text with literals replaced by `@p0, @p1, ...` and their values alongside
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterizedQuery {
    pub text: String,
    pub params: Vec<serde_json::Value>,
}

pub fn assemble_parameterized(intent: &ParsedIntent) -> ParameterizedQuery {
    let mut params = Vec::new();
    let condition = (!intent.predicate.is_tautology())
        .then(|| intent.predicate.render_parameterized(&mut params));
    ParameterizedQuery {
        text: render(
            &intent.table,
            &intent.columns,
            condition,
            intent.order.as_ref(),
            intent.limit,
        ),
        params,
    }
}

fn render(
    table: &str,
    columns: &[String],
    condition: Option<String>,
    order: Option<&OrderBy>,
    limit: Option<u32>,
) -> String {
    let mut sql = String::from("SELECT ");
    if let Some(n) = limit {
        sql.push_str(&format!("TOP {} ", n));
    }
    if columns.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&columns.join(", "));
    }
    sql.push_str(&format!(" FROM {}", table));
    if let Some(condition) = condition {
        sql.push_str(&format!(" WHERE {}", condition));
    }
    if let Some(order) = order {
        sql.push_str(&format!(" ORDER BY {} {}", order.column, order.direction.as_sql()));
    }
    sql
}

/// SELECT structure recovered from query text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutline {
    pub table: String,
    pub columns: Vec<String>,
    pub limit: Option<u32>,
    pub condition: Option<String>,
    pub order: Option<OrderBy>,
}

impl QueryOutline {
    pub fn has_filter(&self) -> bool {
        self.condition.is_some()
    }
}

/// Parse a single-table SELECT; `None` when the text does not have that shape
pub fn outline(sql: &str) -> Option<QueryOutline> {
    let caps = SELECT_SHAPE.captures(sql)?;

    let columns = caps[2]
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    let table = caps[3].trim_matches(|c| c == '[' || c == ']').to_string();
    let condition = caps
        .get(4)
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| c != crate::translate::intent::TAUTOLOGY);
    let order = caps.get(5).map(|column| OrderBy {
        column: column.as_str().to_string(),
        direction: match caps.get(6).map(|d| d.as_str().to_ascii_uppercase()) {
            Some(d) if d == "ASC" => OrderDirection::Asc,
            _ => OrderDirection::Desc,
        },
    });

    Some(QueryOutline {
        table,
        columns,
        limit: caps.get(1).and_then(|m| m.as_str().parse().ok()),
        condition,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::intent::{Clause, CompareOp};

    fn intent(predicate: Predicate) -> ParsedIntent {
        ParsedIntent {
            table: "Usage".into(),
            columns: vec!["Product".into(), "RequestCount".into()],
            predicate,
            limit: Some(5),
            order: Some(OrderBy { column: "RequestCount".into(), direction: OrderDirection::Desc }),
        }
    }

    fn filtered() -> Predicate {
        Predicate::new(vec![
            Clause::Equals { column: "Product".into(), value: "Go-SDK".into() },
            Clause::Compare { column: "RequestCount".into(), op: CompareOp::Gt, value: 1000 },
        ])
    }

    #[test]
    fn test_assemble_full_query() {
        assert_eq!(
            assemble_intent(&intent(filtered())),
            "SELECT TOP 5 Product, RequestCount FROM Usage WHERE Product = 'Go-SDK' AND RequestCount > 1000 ORDER BY RequestCount DESC"
        );
    }

    #[test]
    fn test_tautology_omits_where() {
        let sql = assemble("Usage", &["Month".to_string()], &Predicate::tautology(), None, None);
        assert_eq!(sql, "SELECT Month FROM Usage");
    }

    #[test]
    fn test_parameterized() {
        let query = assemble_parameterized(&intent(filtered()));
        assert_eq!(
            query.text,
            "SELECT TOP 5 Product, RequestCount FROM Usage WHERE Product = @p0 AND RequestCount > @p1 ORDER BY RequestCount DESC"
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_outline_round_trip() {
        for predicate in [filtered(), Predicate::tautology()] {
            let original = intent(predicate);
            let parsed = outline(&assemble_intent(&original)).unwrap();
            assert_eq!(parsed.table, original.table);
            assert_eq!(parsed.columns, original.columns);
            assert_eq!(parsed.has_filter(), !original.predicate.is_tautology());
            assert_eq!(parsed.limit, original.limit);
            assert_eq!(parsed.order, original.order);
        }
    }

    #[test]
    fn test_outline_of_hand_written_sql() {
        let parsed = outline("select * from dbo.Usage where OS = 'Linux' order by Month asc;").unwrap();
        assert_eq!(parsed.table, "dbo.Usage");
        assert_eq!(parsed.columns, vec!["*"]);
        assert_eq!(parsed.condition.as_deref(), Some("OS = 'Linux'"));
        assert_eq!(parsed.order.unwrap().direction, OrderDirection::Asc);
        assert!(outline("DELETE FROM Usage").is_none());
    }
}
