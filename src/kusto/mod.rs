//! Analytics Template Engine (Kusto)

pub mod template;
pub mod validate;

pub use template::{event_table, KustoQuery, KustoTemplate, QueryKind, EVENT_TABLE};
pub use validate::{validate_kusto, KustoValidation};
