//! Attribute propagation anchored on a trigger event
//!
//! Copies a designated set of fields from each actor's anchor-event rows
//! onto that actor's other rows, in time order. The anchor event is
//! authoritative: every occurrence refreshes the actor's attribution from
//! that point on. Rows of an actor with no attribution yet receive the
//! sentinel `"<anchor event> not captured"`.
//!
//! Runs two passes over rows already sorted by timestamp:
//! 1. prime: capture each actor's first anchor attribution
//! 2. push-down: refresh on anchor rows, overwrite every other row
//!
//! Primed values only reach rows preceding an actor's first anchor when
//! [`PropagationConfig::backfill`] is set.

use crate::config::PropagationConfig;
use crate::error::{ConvertError, Result};
use crate::table::{FlatRow, Table};
use std::collections::HashMap;

/// Counters from one propagation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Anchor-event rows seen
    pub anchors: usize,
    /// Distinct actors with at least one anchor row
    pub actors_primed: usize,
    /// Non-anchor rows filled from an attribution
    pub rows_filled: usize,
    /// Non-anchor rows that received the sentinel
    pub rows_not_captured: usize,
}

fn capture(row: &FlatRow, targets: &[usize]) -> Vec<String> {
    targets.iter().map(|&pos| row.cell(pos).to_string()).collect()
}

fn column(table: &Table, name: &str) -> Result<usize> {
    table
        .schema()
        .position(name)
        .ok_or_else(|| ConvertError::MissingColumn {
            column: name.to_string(),
        })
}

/// Propagate attribution fields across each actor's rows
///
/// Fields named in the config but absent from the schema are appended as
/// columns first. An empty table is left untouched.
///
/// # Errors
/// Returns [`ConvertError::MissingColumn`] when the table has rows but no
/// actor or event column.
pub fn propagate(config: &PropagationConfig, table: &mut Table) -> Result<PropagationStats> {
    let mut stats = PropagationStats::default();
    if table.is_empty() {
        return Ok(stats);
    }

    let actor = column(table, &config.actor_field)?;
    let event = column(table, &config.event_field)?;
    let targets: Vec<usize> = config
        .fields
        .iter()
        .map(|field| table.ensure_column(field))
        .collect();
    let sentinel = config.sentinel();

    // Pass 1: prime
    let mut primed: HashMap<String, Vec<String>> = HashMap::new();
    for row in table.rows() {
        if row.cell(event) == config.anchor_event && !primed.contains_key(row.cell(actor)) {
            primed.insert(row.cell(actor).to_string(), capture(row, &targets));
        }
    }
    stats.actors_primed = primed.len();

    // Pass 2: push-down
    let mut attribution = if config.backfill {
        primed
    } else {
        HashMap::new()
    };

    for row in table.rows_mut() {
        let actor_id = row.cell(actor).to_string();

        if row.cell(event) == config.anchor_event {
            stats.anchors += 1;
            attribution.insert(actor_id, capture(row, &targets));
            continue;
        }

        match attribution.get(&actor_id) {
            Some(values) => {
                for (&pos, value) in targets.iter().zip(values) {
                    row.set(pos, value.clone());
                }
                stats.rows_filled += 1;
            }
            None => {
                for &pos in &targets {
                    row.set(pos, sentinel.clone());
                }
                stats.rows_not_captured += 1;
            }
        }
    }

    tracing::debug!(
        "Propagated {:?} from '{}': {} anchors, {} filled, {} not captured",
        config.fields,
        config.anchor_event,
        stats.anchors,
        stats.rows_filled,
        stats.rows_not_captured
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSource, Schema};

    const LOGIN: &str = "AnalyticsEventLogin";

    fn config() -> PropagationConfig {
        PropagationConfig {
            anchor_event: LOGIN.to_string(),
            fields: vec!["store_id".to_string()],
            ..PropagationConfig::default()
        }
    }

    /// Rows of (actor, event, store_id)
    fn table(rows: &[(&str, &str, &str)]) -> Table {
        let mut schema = Schema::new();
        for name in ["user_pseudo_id", "event_name", "store_id"] {
            schema.push(name.to_string(), ColumnSource::Generated);
        }
        let rows = rows
            .iter()
            .map(|(a, e, s)| FlatRow::new(vec![a.to_string(), e.to_string(), s.to_string()]))
            .collect();
        Table::new(schema, rows)
    }

    fn stores(table: &Table) -> Vec<&str> {
        (0..table.len())
            .map(|i| table.get(i, "store_id").unwrap())
            .collect()
    }

    #[test]
    fn test_anchor_refreshes_attribution() {
        let mut t = table(&[
            ("u1", LOGIN, "A"),
            ("u1", "eventX", ""),
            ("u1", "eventY", "stale"),
            ("u1", LOGIN, "B"),
            ("u1", "eventZ", ""),
        ]);

        let stats = propagate(&config(), &mut t).unwrap();

        assert_eq!(stores(&t), vec!["A", "A", "A", "B", "B"]);
        assert_eq!(stats.anchors, 2);
        assert_eq!(stats.actors_primed, 1);
        assert_eq!(stats.rows_filled, 3);
        assert_eq!(stats.rows_not_captured, 0);
    }

    #[test]
    fn test_actor_without_anchor_gets_sentinel() {
        let mut t = table(&[
            ("u1", LOGIN, "A"),
            ("u2", "screen_view", "own"),
            ("u2", "screen_view", ""),
        ]);

        let stats = propagate(&config(), &mut t).unwrap();

        let sentinel = "AnalyticsEventLogin not captured";
        assert_eq!(stores(&t), vec!["A", sentinel, sentinel]);
        assert_eq!(stats.rows_not_captured, 2);
    }

    #[test]
    fn test_rows_before_first_anchor_get_sentinel() {
        let mut t = table(&[
            ("u1", "screen_view", ""),
            ("u1", LOGIN, "store7"),
            ("u1", "screen_view", ""),
        ]);

        propagate(&config(), &mut t).unwrap();

        assert_eq!(
            stores(&t),
            vec!["AnalyticsEventLogin not captured", "store7", "store7"]
        );
    }

    #[test]
    fn test_backfill_uses_first_anchor() {
        let mut t = table(&[
            ("u1", "screen_view", ""),
            ("u1", LOGIN, "first"),
            ("u1", "screen_view", ""),
            ("u1", LOGIN, "second"),
            ("u1", "screen_view", ""),
        ]);
        let cfg = PropagationConfig {
            backfill: true,
            ..config()
        };

        propagate(&cfg, &mut t).unwrap();

        assert_eq!(
            stores(&t),
            vec!["first", "first", "first", "second", "second"]
        );
    }

    #[test]
    fn test_actors_are_independent() {
        let mut t = table(&[
            ("u1", LOGIN, "A"),
            ("u2", LOGIN, "B"),
            ("u1", "x", ""),
            ("u2", "x", ""),
        ]);

        propagate(&config(), &mut t).unwrap();

        assert_eq!(stores(&t), vec!["A", "B", "A", "B"]);
    }

    #[test]
    fn test_anchor_with_blank_value_propagates_blank() {
        let mut t = table(&[("u1", LOGIN, ""), ("u1", "x", "keep?")]);
        propagate(&config(), &mut t).unwrap();
        assert_eq!(stores(&t), vec!["", ""]);
    }

    #[test]
    fn test_missing_field_column_is_appended() {
        let mut t = table(&[("u1", LOGIN, "A"), ("u1", "x", "")]);
        let cfg = PropagationConfig {
            fields: vec!["store_id".to_string(), "region".to_string()],
            ..config()
        };

        propagate(&cfg, &mut t).unwrap();

        assert_eq!(t.schema().len(), 4);
        assert_eq!(t.get(0, "region"), Some(""));
        assert_eq!(t.get(1, "region"), Some(""));
        assert_eq!(t.get(1, "store_id"), Some("A"));
    }

    #[test]
    fn test_missing_actor_column_is_error() {
        let mut schema = Schema::new();
        schema.push("event_name".to_string(), ColumnSource::Generated);
        let mut t = Table::new(schema, vec![FlatRow::new(vec![LOGIN.to_string()])]);

        let err = propagate(&config(), &mut t).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::MissingColumn { column } if column == "user_pseudo_id"
        ));
    }

    #[test]
    fn test_empty_table_is_untouched() {
        let mut t = Table::default();
        let stats = propagate(&config(), &mut t).unwrap();
        assert_eq!(stats, PropagationStats::default());
        assert!(t.schema().is_empty());
    }
}
