#![allow(dead_code)]

use chrono::NaiveDate;
use nlq_bridge::schema::{parse_manifest, Catalog};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const MANIFEST: &str = r##"{
    "Tables": [
        {
            "TableName": "LegacyUsage",
            "enabled": "false",
            "Description": "Retired usage rollup",
            "Columns": [
                {"ColumnName": "Month", "$ref": "#/definitions/Month"},
                {"ColumnName": "RequestCount", "$ref": "#/definitions/RequestCount"}
            ]
        },
        {
            "TableName": "MonthlyRequests",
            "enabled": "true",
            "Description": "Monthly totals",
            "Columns": [
                {"ColumnName": "Month", "$ref": "#/definitions/Month"},
                {"ColumnName": "RequestCount", "$ref": "#/definitions/RequestCount"}
            ]
        },
        {
            "TableName": "ProductUsage",
            "enabled": "true",
            "Description": "Monthly request counts per product",
            "Columns": [
                {"ColumnName": "Month", "$ref": "#/definitions/Month"},
                {"ColumnName": "Product", "$ref": "#/definitions/Product"},
                {"ColumnName": "RequestCount", "$ref": "#/definitions/RequestCount"},
                {"ColumnName": "SubscriptionCount", "$ref": "#/definitions/SubscriptionCount"}
            ]
        },
        {
            "TableName": "ProviderOsRequests",
            "enabled": "true",
            "Description": "Requests by provider and operating system",
            "Columns": [
                {"ColumnName": "Month", "$ref": "#/definitions/Month"},
                {"ColumnName": "Provider", "$ref": "#/definitions/Provider"},
                {"ColumnName": "OS", "$ref": "#/definitions/OS"},
                {"ColumnName": "HttpMethod", "$ref": "#/definitions/HttpMethod"},
                {"ColumnName": "RequestCount", "$ref": "#/definitions/RequestCount"}
            ]
        }
    ],
    "definitions": {
        "Month": {"title": "Month", "type": "string", "pattern": "^\\d{4}-\\d{2}$"},
        "Product": {
            "title": "Product",
            "description": "SDK product name",
            "type": "string",
            "enum": ["Go-SDK", "Python-SDK", "Java Fluent Premium", "JavaScript"]
        },
        "RequestCount": {"title": "Request Count", "type": "integer", "minimum": 0},
        "SubscriptionCount": {"title": "Subscription Count", "type": "integer", "minimum": 0},
        "Provider": {"title": "Provider", "type": "string"},
        "OS": {"title": "Operating System", "type": "string", "enum": ["Windows", "Linux", "MacOS"]},
        "HttpMethod": {"title": "HTTP Method", "type": "string", "enum": ["GET", "PUT", "POST", "DELETE"]},
        "TrackInfo": {"title": "Track", "type": "string", "enum": ["Track1", "Track2"]}
    }
}"##;

pub fn catalog() -> Arc<Catalog> {
    Arc::new(parse_manifest(MANIFEST).unwrap())
}

pub fn manifest_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

pub fn august_20() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
}
