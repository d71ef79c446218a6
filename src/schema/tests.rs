// Tests for schema discovery
//
// Realistic export shapes: mixed top-level scalars, keyed event params and
// user properties, and fixed device/geo/app/traffic objects.

use super::*;
use crate::config::{GroupConfig, SchemaConfig};
use crate::record::Record;
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

fn small_config() -> SchemaConfig {
    SchemaConfig {
        groups: vec![
            GroupConfig::keyed("event_params"),
            GroupConfig::keyed("user_properties"),
            GroupConfig::fixed("geo", &["country", "city"]),
        ],
        ..SchemaConfig::default()
    }
}

fn names(schema: &Schema) -> Vec<&str> {
    schema.names().collect()
}

#[test]
fn test_top_level_first_seen_order_with_iso_siblings() {
    let records = vec![
        record(json!({"event_date": "20180822", "event_timestamp": "1", "event_name": "a"})),
        record(json!({"event_name": "b", "user_pseudo_id": "u1", "event_timestamp": "2"})),
    ];

    let schema = discover(&records, &small_config());

    assert_eq!(
        names(&schema)[..5],
        [
            "event_date",
            "event_timestamp",
            "event_iso8601",
            "event_name",
            "user_pseudo_id"
        ]
    );
}

#[test]
fn test_offset_fields_get_no_iso_sibling() {
    let records = vec![record(json!({"event_server_timestamp_offset": "12"}))];
    let schema = discover(&records, &small_config());
    assert!(schema.contains("event_server_timestamp_offset"));
    assert!(!schema.contains("event_server_iso8601_offset"));
}

#[test]
fn test_iso_columns_know_their_timestamp_source() {
    let records = vec![record(json!({"user_first_touch_timestamp": "5"}))];
    let schema = discover(&records, &small_config());

    let pos = schema.position("user_first_touch_iso8601").unwrap();
    assert_eq!(
        schema.columns()[pos].source,
        ColumnSource::TopLevel {
            field: "user_first_touch_iso8601".to_string(),
            iso_source: Some("user_first_touch_timestamp".to_string()),
        }
    );
}

#[test]
fn test_keyed_tags_accumulate_across_records() {
    let records = vec![
        record(json!({"event_params": [
            {"key": "screen", "value": {"string_value": "home"}},
            {"key": "engaged", "value": {"int_value": "1"}}
        ]})),
        record(json!({"event_params": [
            {"key": "store_id", "value": {"string_value": "s1"}},
            {"key": "screen", "value": {"string_value": "cart"}}
        ]})),
        record(json!({"user_properties": [
            {"key": "first_open_time", "value": {"int_value": "1534950000000"}}
        ]})),
    ];

    let schema = discover(&records, &small_config());

    assert_eq!(
        names(&schema),
        vec![
            "screen",
            "engaged",
            "store_id",
            "first_open_time",
            "country",
            "city"
        ]
    );
}

#[test]
fn test_fixed_groups_present_without_data() {
    let schema = discover(&[], &small_config());
    assert_eq!(names(&schema), vec!["country", "city"]);
}

#[test]
fn test_null_structured_fields_contribute_nothing() {
    let records = vec![record(json!({
        "event_name": "a",
        "event_params": null,
        "geo": null
    }))];

    let schema = discover(&records, &small_config());
    assert_eq!(names(&schema), vec!["event_name", "country", "city"]);
}

#[test]
fn test_structured_fields_are_not_top_level_columns() {
    let records = vec![record(json!({"event_name": "a", "geo": {"country": "UK"}}))];
    let schema = discover(&records, &small_config());
    assert!(!schema.contains("geo"));
}

#[test]
fn test_colliding_group_names_are_qualified() {
    let config = SchemaConfig {
        groups: vec![
            GroupConfig::keyed("event_params"),
            GroupConfig::fixed("traffic_source", &["name", "source"]),
        ],
        ..SchemaConfig::default()
    };
    let records = vec![record(json!({
        "name": "top",
        "event_params": [{"key": "source", "value": {"string_value": "x"}}]
    }))];

    let schema = discover(&records, &config);

    assert_eq!(
        names(&schema),
        vec!["name", "source", "traffic_source.name", "traffic_source.source"]
    );
}

#[test]
fn test_default_layout_has_unique_headers() {
    let schema = discover(&[], &SchemaConfig::default());
    let all = names(&schema);
    let unique: std::collections::HashSet<_> = all.iter().collect();
    assert_eq!(all.len(), unique.len());
    assert_eq!(all.len(), 5 + 14 + 6 + 3);
    assert_eq!(all[0], "id");
}

#[test]
fn test_push_keeps_existing_column() {
    let mut schema = Schema::new();
    let first = schema.push("a".to_string(), ColumnSource::Generated);
    let again = schema.push(
        "a".to_string(),
        ColumnSource::TopLevel {
            field: "a".to_string(),
            iso_source: None,
        },
    );
    assert_eq!(first, again);
    assert_eq!(schema.len(), 1);
    assert_eq!(schema.columns()[0].source, ColumnSource::Generated);
}
