use crate::config::{GroupKind, SchemaConfig};
use crate::record::Record;
use crate::schema::{ColumnSource, Schema};
use std::collections::HashSet;

/// Ordered, de-duplicated set of names in first-seen order
#[derive(Debug, Default)]
struct FirstSeen {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl FirstSeen {
    /// Returns true when `name` was not seen before
    fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.names.push(name.to_string());
        true
    }
}

/// Build the batch schema in a single pass over all records
///
/// Keyed group tags accumulate across the whole batch; fixed groups always
/// contribute their configured sub-fields, whether or not any record has
/// them. Records missing a structured field contribute nothing from it.
///
/// # Example
/// ```
/// use aplanar::config::SchemaConfig;
/// use aplanar::record::Record;
/// use aplanar::schema::discover;
/// use serde_json::json;
///
/// let record = Record::from_value(json!({
///     "event_name": "screen_view",
///     "event_timestamp": "1534946530664000",
/// })).unwrap();
///
/// let schema = discover(&[record], &SchemaConfig::default());
/// let names: Vec<_> = schema.names().take(3).collect();
/// assert_eq!(names, vec!["event_name", "event_timestamp", "event_iso8601"]);
/// ```
pub fn discover(records: &[Record], config: &SchemaConfig) -> Schema {
    let mut top_level = FirstSeen::default();
    let mut tags: Vec<FirstSeen> = config.groups.iter().map(|_| FirstSeen::default()).collect();

    for record in records {
        for name in record.field_names() {
            if config.is_structured(name) {
                continue;
            }
            if top_level.insert(name) && config.is_timestamp_column(name) {
                top_level.insert(&config.iso_column_name(name));
            }
        }

        for (group, seen) in config.groups.iter().zip(tags.iter_mut()) {
            if group.kind != GroupKind::Keyed {
                continue;
            }
            for entry in record.keyed_entries(&group.name) {
                seen.insert(entry.key);
            }
        }
    }

    let mut schema = Schema::new();

    for name in top_level.names {
        let iso_source = if name.contains(&config.iso_marker) {
            Some(name.replace(&config.iso_marker, &config.timestamp_marker))
        } else {
            None
        };
        schema.push(
            name.clone(),
            ColumnSource::TopLevel {
                field: name,
                iso_source,
            },
        );
    }

    for (group, seen) in config.groups.iter().zip(tags) {
        match group.kind {
            GroupKind::Keyed => {
                for tag in seen.names {
                    let source = ColumnSource::Keyed {
                        group: group.name.clone(),
                        tag: tag.clone(),
                    };
                    schema.push_grouped(&group.name, &tag, source);
                }
            }
            GroupKind::Fixed => {
                for field in &group.fields {
                    let source = ColumnSource::Fixed {
                        group: group.name.clone(),
                        field: field.clone(),
                    };
                    schema.push_grouped(&group.name, field, source);
                }
            }
        }
    }

    tracing::debug!("Discovered {} columns over {} records", schema.len(), records.len());

    schema
}
