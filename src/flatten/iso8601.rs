//! Microsecond-epoch → ISO-8601 rendering for derived columns

use crate::config::{IsoFormat, SchemaConfig};
use crate::error::{ConvertError, Result};
use chrono::{DateTime, SecondsFormat};

/// Render a microsecond timestamp cell as ISO-8601 (UTC)
///
/// The value is truncated toward zero to whole seconds before conversion, so
/// sub-second precision is dropped rather than rounded.
///
/// # Example
/// ```
/// use aplanar::config::SchemaConfig;
/// use aplanar::flatten::micros_to_iso8601;
///
/// let iso = micros_to_iso8601("1534946530664000", &SchemaConfig::default()).unwrap();
/// assert_eq!(iso, "2018-08-22T14:02:10Z");
/// ```
pub fn micros_to_iso8601(text: &str, config: &SchemaConfig) -> Result<String> {
    let micros: i64 = text
        .trim()
        .parse()
        .map_err(|e| ConvertError::InvalidTimestamp {
            value: text.to_string(),
            reason: format!("{}", e),
        })?;

    let seconds = micros / config.micros_per_second;

    let instant =
        DateTime::from_timestamp(seconds, 0).ok_or_else(|| ConvertError::InvalidTimestamp {
            value: text.to_string(),
            reason: "out of representable range".to_string(),
        })?;

    Ok(match config.iso_format {
        IsoFormat::DateTime => instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        IsoFormat::Date => instant.date_naive().format("%Y-%m-%d").to_string(),
    })
}
