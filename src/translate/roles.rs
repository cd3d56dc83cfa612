//! Column roles
//!
//! Maps the columns of a table onto the roles the resolution stages reason about
//! (temporal key, measure, product, ...). Well-known names come first, then columns
//! whose declared metadata implies the role.

use crate::schema::TableDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Temporal,
    Measure,
    Product,
    Track,
    Provider,
    Resource,
    HttpMethod,
    Os,
    ApiVersion,
    Subscription,
}

impl ColumnRole {
    fn known_names(&self) -> &'static [&'static str] {
        match self {
            ColumnRole::Temporal => &["Month", "RequestsDate", "Date", "Day", "TIMESTAMP"],
            ColumnRole::Measure => &["RequestCount", "SubscriptionCount", "RequestCounts", "CCIDCount"],
            ColumnRole::Product => &["Product"],
            ColumnRole::Track => &["TrackInfo", "Track"],
            ColumnRole::Provider => &["Provider", "targetResourceProvider"],
            ColumnRole::Resource => &["Resource"],
            ColumnRole::HttpMethod => &["HttpMethod"],
            ColumnRole::Os => &["OS"],
            ColumnRole::ApiVersion => &["ApiVersion"],
            ColumnRole::Subscription => &["SubscriptionId"],
        }
    }

    fn implied_by_metadata(&self, table: &TableDescriptor, column: &str) -> bool {
        let lower = column.to_lowercase();
        let meta = table.meta(column);
        match self {
            ColumnRole::Temporal => {
                let date_format = meta
                    .and_then(|m| m.format.as_deref())
                    .map_or(false, |f| f.starts_with("date"));
                date_format || lower.ends_with("date") || lower.ends_with("month")
            }
            ColumnRole::Measure => {
                meta.map_or(false, |m| m.is_numeric())
                    && (lower.ends_with("count") || lower.ends_with("counts"))
            }
            _ => false,
        }
    }
}

/// Every column of `table` holding `role`, well-known names first
pub fn columns_with_role<'a>(table: &'a TableDescriptor, role: ColumnRole) -> Vec<&'a str> {
    let mut found: Vec<&str> = role
        .known_names()
        .iter()
        .filter_map(|name| table.find_column(name))
        .collect();

    for column in &table.columns {
        if !found.contains(&column.as_str()) && role.implied_by_metadata(table, column) {
            found.push(column.as_str());
        }
    }
    found
}

/// The preferred column for `role`, if the table has one
pub fn role_column(table: &TableDescriptor, role: ColumnRole) -> Option<&str> {
    columns_with_role(table, role).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMeta;

    #[test]
    fn test_known_names_take_precedence() {
        let table = TableDescriptor::new("T", "")
            .with_column("SubscriptionCount", ColumnMeta { declared_type: "integer".into(), ..Default::default() })
            .with_column("RequestCount", ColumnMeta { declared_type: "integer".into(), ..Default::default() });
        assert_eq!(
            columns_with_role(&table, ColumnRole::Measure),
            vec!["RequestCount", "SubscriptionCount"]
        );
    }

    #[test]
    fn test_metadata_implies_role() {
        let table = TableDescriptor::new("T", "")
            .with_column("EventDay", ColumnMeta { format: Some("date".into()), ..Default::default() })
            .with_column("ErrorCount", ColumnMeta { declared_type: "integer".into(), ..Default::default() })
            .with_column("Label", ColumnMeta::default());
        assert_eq!(role_column(&table, ColumnRole::Temporal), Some("EventDay"));
        assert_eq!(role_column(&table, ColumnRole::Measure), Some("ErrorCount"));
        assert_eq!(role_column(&table, ColumnRole::Product), None);
    }
}
