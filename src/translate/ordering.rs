//! Ordering/Limit Deriver
//!
//! `top N` / `bottom N` set the limit. The sort column follows what the question
//! talks about (counts → measure, dates → temporal column); `bottom N` always sorts
//! ascending, on the measure column when nothing else is named. Direction defaults to
//! descending; when both ascending and descending cues appear, the earliest cue in
//! the question wins.

use crate::schema::TableDescriptor;
use crate::translate::intent::{OrderBy, OrderDirection};
use crate::translate::roles::{role_column, ColumnRole};
use crate::translate::text::{find_term, tokens};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOP_N: Regex = Regex::new(r"\btop\s+(\d+)\b").unwrap();
    static ref BOTTOM_N: Regex = Regex::new(r"\bbottom\s+(\d+)\b").unwrap();
    /// Comparison phrases that carry ordering words without meaning an ordering
    static ref COMPARISON_PHRASES: Regex =
        Regex::new(r"\b(?:at least|at most|minimum of|maximum of)\b").unwrap();
}

const ASCENDING_CUES: &[&str] = &[
    "lowest", "least", "minimum", "oldest", "asc", "ascending", "fewest", "bottom",
];
const DESCENDING_CUES: &[&str] = &[
    "highest", "most", "maximum", "newest", "latest", "desc", "descending",
];

const MEASURE_WORDS: &[&str] = &["count", "request", "usage"];
const TEMPORAL_WORDS: &[&str] = &["date", "time"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    pub limit: Option<u32>,
    pub order: Option<OrderBy>,
}

/// Limit and sort order for `question` against `table`
pub fn derive(question: &str, table: Option<&TableDescriptor>) -> Ordering {
    let q = question.to_lowercase();

    let bottom = BOTTOM_N.captures(&q);
    let ascending = bottom.is_some();
    let limit = TOP_N
        .captures(&q)
        .or(bottom)
        .and_then(|caps| caps[1].parse::<u32>().ok());

    let column = table.and_then(|t| {
        order_column(&q, t).or_else(|| {
            ascending
                .then(|| role_column(t, ColumnRole::Measure))
                .flatten()
                .map(str::to_string)
        })
    });
    let order = column.map(|column| OrderBy {
        column,
        direction: if ascending { OrderDirection::Asc } else { direction(&q) },
    });

    Ordering { limit, order }
}

fn order_column(q: &str, table: &TableDescriptor) -> Option<String> {
    let words = tokens(q);
    let mentions = |stems: &[&str]| words.iter().any(|w| stems.iter().any(|s| w.starts_with(s)));

    let column = if mentions(MEASURE_WORDS) {
        role_column(table, ColumnRole::Measure)
    } else if mentions(TEMPORAL_WORDS) {
        role_column(table, ColumnRole::Temporal)
    } else {
        None
    };
    column.map(str::to_string)
}

/// Earliest cue wins; descending when there is none
pub fn direction(q: &str) -> OrderDirection {
    let masked = COMPARISON_PHRASES.replace_all(q, " ");
    let earliest = |cues: &[&str]| cues.iter().filter_map(|c| find_term(&masked, c)).min();

    match (earliest(ASCENDING_CUES), earliest(DESCENDING_CUES)) {
        (Some(asc), Some(desc)) if asc < desc => OrderDirection::Asc,
        (Some(_), None) => OrderDirection::Asc,
        _ => OrderDirection::Desc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMeta;

    fn table() -> TableDescriptor {
        let integer = ColumnMeta { declared_type: "integer".into(), ..Default::default() };
        TableDescriptor::new("Usage", "")
            .with_column("Month", ColumnMeta::default())
            .with_column("Product", ColumnMeta::default())
            .with_column("RequestCount", integer.clone())
            .with_column("SubscriptionCount", integer)
    }

    #[test]
    fn test_top_n_limit() {
        let ordering = derive("Top 5 products by requests", Some(&table()));
        assert_eq!(ordering.limit, Some(5));
        assert_eq!(
            ordering.order,
            Some(OrderBy { column: "RequestCount".into(), direction: OrderDirection::Desc })
        );
    }

    #[test]
    fn test_bottom_n_sorts_ascending() {
        let ordering = derive("bottom 3 products by usage", Some(&table()));
        assert_eq!(ordering.limit, Some(3));
        assert_eq!(ordering.order.unwrap().direction, OrderDirection::Asc);
    }

    #[test]
    fn test_bottom_n_defaults_to_measure() {
        let ordering = derive("bottom 3 products", Some(&table()));
        assert_eq!(ordering.limit, Some(3));
        assert_eq!(
            ordering.order,
            Some(OrderBy { column: "RequestCount".into(), direction: OrderDirection::Asc })
        );
    }

    #[test]
    fn test_bottom_n_wins_over_descending_cue() {
        let ordering = derive("bottom 2 of the most used products", Some(&table()));
        assert_eq!(ordering.order.unwrap().direction, OrderDirection::Asc);
    }

    #[test]
    fn test_temporal_order() {
        let ordering = derive("products sorted by date, oldest first", Some(&table()));
        assert_eq!(
            ordering.order,
            Some(OrderBy { column: "Month".into(), direction: OrderDirection::Asc })
        );
    }

    #[test]
    fn test_no_order_without_cues() {
        let ordering = derive("which products exist", Some(&table()));
        assert_eq!(ordering, Ordering::default());
    }

    #[test]
    fn test_earliest_cue_wins() {
        assert_eq!(direction("lowest first, not the highest"), OrderDirection::Asc);
        assert_eq!(direction("most used, ignore the least"), OrderDirection::Desc);
        assert_eq!(direction("plain"), OrderDirection::Desc);
    }

    #[test]
    fn test_comparison_phrases_do_not_set_direction() {
        assert_eq!(direction("at least 100 requests"), OrderDirection::Desc);
        assert_eq!(direction("at most 100 requests, lowest first"), OrderDirection::Asc);
    }
}
