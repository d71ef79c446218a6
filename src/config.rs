//! Converter configuration
//!
//! Every domain constant of the analytics export layout (structured group
//! names, their sub-fields, naming markers, the attribution anchor and the
//! session rules) lives here so callers and tests can substitute their own.
//! `Default` reproduces the export layout; files are TOML:
//!
//! ```toml
//! [propagation]
//! anchor_event = "AnalyticsEventLogin"
//! fields = ["store_id"]
//!
//! [session]
//! window_micros = 1800000000
//! reset_triggers = [{ field = "event_name", value = "AnalyticsEventLogin" }]
//! ```

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// How a structured top-level field is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// List of `{ "key": .., "value": { typed slots } }` entries
    Keyed,
    /// Object with a fixed, configured set of scalar sub-fields
    Fixed,
}

/// One structured group, in column declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub kind: GroupKind,
    /// Sub-field names (fixed groups only; keyed groups discover their tags)
    #[serde(default)]
    pub fields: Vec<String>,
}

impl GroupConfig {
    pub fn keyed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: GroupKind::Keyed,
            fields: Vec::new(),
        }
    }

    pub fn fixed(name: &str, fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: GroupKind::Fixed,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Rendering of derived ISO-8601 columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsoFormat {
    /// `2018-08-22T14:02:10Z`
    #[default]
    DateTime,
    /// `2018-08-22` (UTC calendar date only)
    Date,
}

/// Column discovery and flattening rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Structured groups, in the order their columns are emitted
    pub groups: Vec<GroupConfig>,

    /// Substring marking a microsecond-epoch column
    pub timestamp_marker: String,

    /// Substring that disqualifies a timestamp-looking column (e.g. tz offsets)
    pub offset_marker: String,

    /// Replacement for `timestamp_marker` in derived column names
    pub iso_marker: String,

    /// Source timestamp units per second (exports store microseconds)
    pub micros_per_second: i64,

    pub iso_format: IsoFormat,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            groups: vec![
                GroupConfig::keyed("event_params"),
                GroupConfig::keyed("user_properties"),
                GroupConfig::fixed(
                    "app_info",
                    &[
                        "id",
                        "version",
                        "install_store",
                        "firebase_app_id",
                        "install_source",
                    ],
                ),
                GroupConfig::fixed(
                    "device",
                    &[
                        "category",
                        "mobile_brand_name",
                        "mobile_model_name",
                        "mobile_marketing_name",
                        "mobile_os_hardware_model",
                        "operating_system",
                        "operating_system_version",
                        "vendor_id",
                        "advertising_id",
                        "language",
                        "is_limited_ad_tracking",
                        "time_zone_offset_seconds",
                        "browser",
                        "browser_version",
                    ],
                ),
                GroupConfig::fixed(
                    "geo",
                    &[
                        "continent",
                        "country",
                        "region",
                        "city",
                        "sub_continent",
                        "metro",
                    ],
                ),
                GroupConfig::fixed("traffic_source", &["name", "medium", "source"]),
            ],
            timestamp_marker: "timestamp".to_string(),
            offset_marker: "offset".to_string(),
            iso_marker: "iso8601".to_string(),
            micros_per_second: 1_000_000,
            iso_format: IsoFormat::DateTime,
        }
    }
}

impl SchemaConfig {
    /// Whether `name` is one of the structured group fields
    pub fn is_structured(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.name == name)
    }

    /// Whether `name` holds a microsecond timestamp that gets an ISO sibling
    pub fn is_timestamp_column(&self, name: &str) -> bool {
        name.contains(&self.timestamp_marker) && !name.contains(&self.offset_marker)
    }

    /// `event_timestamp` → `event_iso8601`
    pub fn iso_column_name(&self, timestamp_column: &str) -> String {
        timestamp_column.replace(&self.timestamp_marker, &self.iso_marker)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.timestamp_marker.is_empty()
            || self.offset_marker.is_empty()
            || self.iso_marker.is_empty()
        {
            return Err(
                "timestamp_marker, offset_marker and iso_marker must be non-empty".to_string(),
            );
        }

        if self.timestamp_marker == self.iso_marker {
            return Err(format!(
                "iso_marker must differ from timestamp_marker, both are '{}'",
                self.iso_marker
            ));
        }

        if self.micros_per_second <= 0 {
            return Err(format!(
                "micros_per_second must be positive, got {}",
                self.micros_per_second
            ));
        }

        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.name.is_empty() {
                return Err("group name must be non-empty".to_string());
            }
            if !seen.insert(group.name.as_str()) {
                return Err(format!("duplicate group '{}'", group.name));
            }
            if group.kind == GroupKind::Keyed && !group.fields.is_empty() {
                return Err(format!(
                    "keyed group '{}' discovers its tags and cannot list fields",
                    group.name
                ));
            }
        }

        Ok(())
    }
}

/// Attribution fill anchored on a trigger event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub enabled: bool,

    /// Event whose field values become the actor's attribution
    pub anchor_event: String,

    /// Columns copied from the anchor row onto the actor's other rows
    pub fields: Vec<String>,

    /// Actor identifier column
    pub actor_field: String,

    /// Event name column
    pub event_field: String,

    /// Fill rows preceding an actor's first anchor with that anchor's values
    /// instead of the "not captured" sentinel
    pub backfill: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            anchor_event: "AnalyticsEventLogin".to_string(),
            fields: vec!["store_id".to_string()],
            actor_field: "user_pseudo_id".to_string(),
            event_field: "event_name".to_string(),
            backfill: false,
        }
    }
}

impl PropagationConfig {
    /// Value written when an actor has no attribution yet
    pub fn sentinel(&self) -> String {
        format!("{} not captured", self.anchor_event)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.actor_field.is_empty() || self.event_field.is_empty() {
            return Err("actor_field and event_field must be non-empty".to_string());
        }

        if self.enabled && self.anchor_event.is_empty() {
            return Err("anchor_event must be non-empty when propagation is enabled".to_string());
        }

        for field in &self.fields {
            if field == &self.actor_field || field == &self.event_field {
                return Err(format!(
                    "propagated field '{}' would overwrite the actor or event column",
                    field
                ));
            }
        }

        Ok(())
    }
}

/// A `(field, value)` pair that forces a new session when it matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTrigger {
    pub field: String,
    pub value: String,
}

impl ResetTrigger {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Inactivity-window sessionization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub enabled: bool,

    /// Correlation key column (one session stream per distinct value)
    pub key_field: String,

    /// Microsecond timestamp column driving ordering and the window
    pub timestamp_field: String,

    /// Generated column receiving the session id
    pub session_field: String,

    /// Inactivity threshold, same unit as `timestamp_field`
    pub window_micros: i64,

    pub reset_triggers: Vec<ResetTrigger>,

    /// Mix the correlation key into the session digest
    pub key_salted: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_field: "user_pseudo_id".to_string(),
            timestamp_field: "event_timestamp".to_string(),
            session_field: "generated_session_id".to_string(),
            window_micros: 30 * 60 * 1_000_000,
            reset_triggers: Vec::new(),
            key_salted: false,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.window_micros <= 0 {
            return Err(format!(
                "window_micros must be positive, got {}",
                self.window_micros
            ));
        }

        if self.key_field.is_empty()
            || self.timestamp_field.is_empty()
            || self.session_field.is_empty()
        {
            return Err("key_field, timestamp_field and session_field must be non-empty".to_string());
        }

        for trigger in &self.reset_triggers {
            if trigger.field.is_empty() || trigger.value.is_empty() {
                return Err(format!(
                    "reset trigger needs a non-empty field and value, got '{}={}'",
                    trigger.field, trigger.value
                ));
            }
        }

        Ok(())
    }
}

/// Complete converter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub schema: SchemaConfig,
    pub propagation: PropagationConfig,
    pub session: SessionConfig,
}

impl ConverterConfig {
    /// Load a configuration file; unspecified keys keep their defaults
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Fields every record must carry before it reaches the engine
    pub fn required_fields(&self) -> [&str; 2] {
        [
            self.propagation.actor_field.as_str(),
            self.propagation.event_field.as_str(),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        self.schema
            .validate()
            .and_then(|_| self.propagation.validate())
            .and_then(|_| self.session.validate())
            .map_err(ConvertError::InvalidConfig)
    }
}
