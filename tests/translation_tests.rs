mod common;

use nlq_bridge::translate::{outline, Clause, CompareOp, Dialect, TableMatch, Translator};

fn translator() -> Translator {
    Translator::new(common::catalog()).with_reference_date(common::august_20())
}

#[test]
fn test_product_question_this_month() {
    let translation = translator()
        .translate("Show me Go-SDK request counts this month")
        .unwrap();
    let intent = &translation.intent;

    assert_eq!(intent.table, "ProductUsage");
    assert!(intent.columns.contains(&"Product".to_string()));
    assert!(intent.columns.contains(&"RequestCount".to_string()));
    assert_eq!(
        intent.predicate.clause_for("Product"),
        Some(&Clause::Equals {
            column: "Product".to_string(),
            value: "Go-SDK".to_string()
        })
    );
    assert_eq!(
        intent.predicate.clause_for("Month").map(|c| c.render(Dialect::Sql)),
        Some("Month LIKE '2025-08%'".to_string())
    );
    assert_eq!(intent.limit, None);
    assert!(!translation.sql.contains("TOP"));
}

#[test]
fn test_top_products_over_threshold() {
    let translation = translator()
        .translate("Top 5 products with more than 1000 requests")
        .unwrap();
    let intent = &translation.intent;

    assert_eq!(intent.table, "ProductUsage");
    assert_eq!(intent.limit, Some(5));
    assert_eq!(
        intent.predicate.clause_for("RequestCount"),
        Some(&Clause::Compare {
            column: "RequestCount".to_string(),
            op: CompareOp::Gt,
            value: 1000
        })
    );
    assert!(translation.sql.starts_with("SELECT TOP 5 "));
    assert!(translation.sql.contains("RequestCount > 1000"));
}

#[test]
fn test_bottom_products_sort_ascending_by_measure() {
    let translation = translator().translate("bottom 3 products").unwrap();

    assert_eq!(translation.intent.table, "ProductUsage");
    assert_eq!(translation.intent.limit, Some(3));
    assert!(translation.sql.starts_with("SELECT TOP 3 "));
    assert!(translation.sql.ends_with(" ORDER BY RequestCount ASC"));
}

#[test]
fn test_exact_table_name_wins() {
    let translator = translator();
    for table in ["MonthlyRequests", "ProductUsage", "ProviderOsRequests"] {
        let question = format!("show all rows of {} for Go-SDK", table.to_lowercase());
        let resolution = translator.resolve_table(&question).unwrap();
        assert_eq!(resolution.table, table);
        assert_eq!(resolution.matched_by, TableMatch::DirectMention);
    }
}

#[test]
fn test_unrecognized_question_falls_back_to_first_enabled_table() {
    let translator = translator();
    let first = translator.resolve_table("hello there").unwrap();
    let again = translator.resolve_table("what is going on").unwrap();

    assert_eq!(first.table, "MonthlyRequests");
    assert_eq!(first.matched_by, TableMatch::Fallback);
    assert_eq!(again.table, first.table);
}

#[test]
fn test_disabled_table_is_not_resolved_by_name() {
    let resolution = translator().resolve_table("show legacyusage").unwrap();
    assert_ne!(resolution.table, "LegacyUsage");
}

#[test]
fn test_removing_a_trigger_removes_only_its_clause() {
    let translator = translator();
    let catalog = common::catalog();
    let table = catalog.get_table("ProductUsage").unwrap();

    let full = translator.parse_for_table("Go-SDK usage in 2025-01 with more than 10 requests", table);
    let without_product = translator.parse_for_table("usage in 2025-01 with more than 10 requests", table);
    let without_date = translator.parse_for_table("Go-SDK usage with more than 10 requests", table);

    assert_eq!(full.predicate.clauses().len(), 3);

    let expected: Vec<&Clause> = full
        .predicate
        .clauses()
        .iter()
        .filter(|c| c.column() != "Product")
        .collect();
    assert_eq!(without_product.predicate.clauses().iter().collect::<Vec<_>>(), expected);

    let expected: Vec<&Clause> = full
        .predicate
        .clauses()
        .iter()
        .filter(|c| c.column() != "Month")
        .collect();
    assert_eq!(without_date.predicate.clauses().iter().collect::<Vec<_>>(), expected);
}

#[test]
fn test_columns_never_empty() {
    let translator = translator();
    let catalog = common::catalog();
    for table in catalog.get_enabled_tables() {
        for question in ["", "anything at all", "top 3 by request count"] {
            assert!(!translator.parse_for_table(question, table).columns.is_empty());
        }
    }
}

#[test]
fn test_assembled_sql_reparses_to_same_structure() {
    let translator = translator();
    let questions = [
        "Show me Go-SDK request counts this month",
        "Top 5 products with more than 1000 requests",
        "bottom 3 providers on linux",
        "hello there",
        "requests per month in 2025-01 or 2025-02",
    ];

    for question in questions {
        let translation = translator.translate(question).unwrap();
        let parsed = outline(&translation.sql).unwrap();

        assert_eq!(parsed.table, translation.intent.table, "{}", question);
        assert_eq!(parsed.columns, translation.intent.columns, "{}", question);
        assert_eq!(
            parsed.has_filter(),
            !translation.intent.predicate.is_tautology(),
            "{}",
            question
        );
        assert_eq!(parsed.limit, translation.intent.limit, "{}", question);
    }
}

#[test]
fn test_parameterized_query_keeps_literals_out_of_text() {
    let translation = translator()
        .translate("Show me Go-SDK request counts this month")
        .unwrap();
    let query = &translation.parameterized;

    assert!(!query.text.contains("Go-SDK"));
    assert!(query.text.contains("@p0"));
    assert!(query.params.contains(&serde_json::json!("Go-SDK")));
}
