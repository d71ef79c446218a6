//! End-to-end conversion of a record batch
//!
//! validate → discover schema → flatten → sort by timestamp → propagate
//! attribution → assign sessions. Each stage owns its transient state; only
//! the resulting [`Table`] outlives the call.

use crate::config::ConverterConfig;
use crate::error::{ConvertError, Result};
use crate::flatten::Flattener;
use crate::propagate::{propagate, PropagationStats};
use crate::record::{validate_required, Record};
use crate::schema::discover;
use crate::session::{assign_sessions, SessionStats};
use crate::table::Table;
use std::fmt;

/// Counters for one converted batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub records: usize,
    pub columns: usize,
    /// Derived ISO cells blanked because the source timestamp was malformed
    pub invalid_timestamps: usize,
    /// Rows without a parseable timestamp (sorted last)
    pub untimed_rows: usize,
    pub propagation: Option<PropagationStats>,
    pub sessions: Option<SessionStats>,
}

impl fmt::Display for ConversionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows x {} columns", self.records, self.columns)?;
        if let Some(p) = &self.propagation {
            write!(
                f,
                ", {} anchors, {} rows not captured",
                p.anchors, p.rows_not_captured
            )?;
        }
        if let Some(s) = &self.sessions {
            write!(f, ", {} sessions over {} keys", s.sessions_started, s.keys)?;
        }
        if self.invalid_timestamps > 0 {
            write!(f, ", {} invalid timestamps", self.invalid_timestamps)?;
        }
        Ok(())
    }
}

/// Result of converting one batch
#[derive(Debug, Clone)]
pub struct Conversion {
    pub table: Table,
    pub stats: ConversionStats,
}

/// Batch converter bound to one validated configuration
///
/// # Example
/// ```
/// use aplanar::config::ConverterConfig;
/// use aplanar::pipeline::Converter;
/// use aplanar::record::Record;
/// use serde_json::json;
///
/// let records: Vec<Record> = vec![
///     json!({"user_pseudo_id": "u1", "event_name": "screen_view", "event_timestamp": "10"}),
///     json!({"user_pseudo_id": "u1", "event_name": "AnalyticsEventLogin", "event_timestamp": "20",
///            "event_params": [{"key": "store_id", "value": {"string_value": "store7"}}]}),
/// ]
/// .into_iter()
/// .filter_map(Record::from_value)
/// .collect();
///
/// let converter = Converter::new(ConverterConfig::default()).unwrap();
/// let conversion = converter.convert(&records).unwrap();
/// assert_eq!(conversion.table.get(0, "store_id"), Some("AnalyticsEventLogin not captured"));
/// assert_eq!(conversion.table.get(1, "store_id"), Some("store7"));
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    /// Create a converter; the configuration is validated once here
    pub fn new(config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert a batch of records into one table
    ///
    /// # Errors
    /// [`ConvertError::MissingField`] when any record lacks the actor id or
    /// event name. Malformed timestamps are not errors; they blank the
    /// affected cells and are counted in the stats.
    pub fn convert(&self, records: &[Record]) -> Result<Conversion> {
        validate_required(records, &self.config.required_fields())?;

        let schema = discover(records, &self.config.schema);
        let flattened = Flattener::new(&schema, &self.config.schema).flatten_all(records);

        let mut stats = ConversionStats {
            records: records.len(),
            invalid_timestamps: flattened.invalid_timestamps,
            ..ConversionStats::default()
        };

        let mut table = Table::new(schema, flattened.rows);
        stats.untimed_rows = table.sort_by_timestamp(&self.config.session.timestamp_field);

        if self.config.propagation.enabled {
            stats.propagation = Some(propagate(&self.config.propagation, &mut table)?);
        }

        if self.config.session.enabled {
            stats.sessions = Some(assign_sessions(&self.config.session, &mut table)?);
        }

        stats.columns = table.schema().len();
        tracing::debug!("Converted batch: {}", stats);

        Ok(Conversion { table, stats })
    }
}

impl TryFrom<ConverterConfig> for Converter {
    type Error = ConvertError;

    fn try_from(config: ConverterConfig) -> Result<Self> {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<serde_json::Value>) -> Vec<Record> {
        values.into_iter().filter_map(Record::from_value).collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = ConverterConfig::default();
        config.session.window_micros = -1;
        assert!(matches!(
            Converter::new(config),
            Err(ConvertError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let converter = Converter::new(ConverterConfig::default()).unwrap();
        let batch = records(vec![json!({"user_pseudo_id": "u1"})]);
        let err = converter.convert(&batch).unwrap_err();
        assert!(matches!(err, ConvertError::MissingField { index: 0, .. }));
    }

    #[test]
    fn test_rows_sorted_by_timestamp() {
        let converter = Converter::new(ConverterConfig::default()).unwrap();
        let batch = records(vec![
            json!({"user_pseudo_id": "u1", "event_name": "late", "event_timestamp": "300"}),
            json!({"user_pseudo_id": "u1", "event_name": "early", "event_timestamp": "100"}),
        ]);

        let conversion = converter.convert(&batch).unwrap();

        assert_eq!(conversion.table.get(0, "event_name"), Some("early"));
        assert_eq!(conversion.table.get(1, "event_name"), Some("late"));
    }

    #[test]
    fn test_stages_can_be_disabled() {
        let mut config = ConverterConfig::default();
        config.propagation.enabled = false;
        config.session.enabled = false;
        let converter = Converter::new(config).unwrap();
        let batch = records(vec![
            json!({"user_pseudo_id": "u1", "event_name": "a", "event_timestamp": "1"}),
        ]);

        let conversion = converter.convert(&batch).unwrap();

        assert!(!conversion.table.schema().contains("store_id"));
        assert!(!conversion.table.schema().contains("generated_session_id"));
        assert_eq!(conversion.stats.propagation, None);
        assert_eq!(conversion.stats.sessions, None);
    }

    #[test]
    fn test_generated_columns_come_last() {
        let converter = Converter::new(ConverterConfig::default()).unwrap();
        let batch = records(vec![
            json!({"user_pseudo_id": "u1", "event_name": "a", "event_timestamp": "1"}),
        ]);

        let conversion = converter.convert(&batch).unwrap();
        let names: Vec<_> = conversion.table.schema().names().collect();

        assert_eq!(names[names.len() - 2..], ["store_id", "generated_session_id"]);
        assert_eq!(conversion.stats.columns, names.len());
    }

    #[test]
    fn test_empty_batch() {
        let converter = Converter::new(ConverterConfig::default()).unwrap();
        let conversion = converter.convert(&[]).unwrap();
        assert!(conversion.table.is_empty());
        assert_eq!(conversion.stats.records, 0);
    }

    #[test]
    fn test_stats_display() {
        let stats = ConversionStats {
            records: 3,
            columns: 40,
            invalid_timestamps: 1,
            untimed_rows: 0,
            propagation: Some(PropagationStats {
                anchors: 1,
                rows_not_captured: 1,
                ..PropagationStats::default()
            }),
            sessions: Some(SessionStats {
                sessions_started: 1,
                keys: 1,
                ..SessionStats::default()
            }),
        };
        assert_eq!(
            stats.to_string(),
            "3 rows x 40 columns, 1 anchors, 1 rows not captured, 1 sessions over 1 keys, 1 invalid timestamps"
        );
    }
}
