//! CLI argument parsing for aplanar

use crate::config::{ConverterConfig, IsoFormat, ResetTrigger};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Pattern used when no inputs are given
pub const DEFAULT_INPUT_PATTERN: &str = "*.json";

#[derive(Parser, Debug)]
#[command(name = "aplanar")]
#[command(version)]
#[command(
    about = "Flatten analytics export JSON into CSV with propagated attribution and synthesized sessions",
    long_about = None
)]
pub struct Cli {
    /// Input files or glob patterns (default: *.json in the current directory)
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// TOML configuration file (schema groups, propagation, session rules)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for CSV output (default: next to each input)
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Session inactivity window in seconds
    #[arg(long = "window-secs", value_name = "SECS")]
    pub window_secs: Option<u64>,

    /// Event whose fields are propagated to the actor's other events
    #[arg(long = "anchor-event", value_name = "EVENT")]
    pub anchor_event: Option<String>,

    /// Field to propagate from the anchor event (repeatable, replaces the configured list)
    #[arg(long = "propagate-field", value_name = "FIELD")]
    pub propagate_fields: Vec<String>,

    /// Start a new session when FIELD equals VALUE (repeatable, adds to the configured list)
    #[arg(long = "reset", value_name = "FIELD=VALUE", value_parser = parse_reset)]
    pub resets: Vec<ResetTrigger>,

    /// Fill events before an actor's first anchor with that anchor's values
    #[arg(long = "backfill")]
    pub backfill: bool,

    /// Mix the correlation key into session ids
    #[arg(long = "salt-sessions")]
    pub salt_sessions: bool,

    /// Render derived ISO-8601 columns as dates only
    #[arg(long = "date-only")]
    pub date_only: bool,

    /// Skip attribution propagation
    #[arg(long = "no-propagate")]
    pub no_propagate: bool,

    /// Skip session assignment
    #[arg(long = "no-sessions")]
    pub no_sessions: bool,

    /// Terminate CSV lines with LF instead of CRLF
    #[arg(long = "lf")]
    pub lf: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

fn parse_reset(value: &str) -> std::result::Result<ResetTrigger, String> {
    match value.split_once('=') {
        Some((field, expected)) if !field.is_empty() => Ok(ResetTrigger::new(field, expected)),
        _ => Err(format!("expected FIELD=VALUE, got '{}'", value)),
    }
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut ConverterConfig) {
        if let Some(secs) = self.window_secs {
            config.session.window_micros = (secs as i64).saturating_mul(1_000_000);
        }
        if let Some(anchor) = &self.anchor_event {
            config.propagation.anchor_event = anchor.clone();
        }
        if !self.propagate_fields.is_empty() {
            config.propagation.fields = self.propagate_fields.clone();
        }
        config.session.reset_triggers.extend(self.resets.iter().cloned());
        if self.backfill {
            config.propagation.backfill = true;
        }
        if self.salt_sessions {
            config.session.key_salted = true;
        }
        if self.date_only {
            config.schema.iso_format = IsoFormat::Date;
        }
        if self.no_propagate {
            config.propagation.enabled = false;
        }
        if self.no_sessions {
            config.session.enabled = false;
        }
    }

    /// Expand inputs into file paths
    ///
    /// Arguments containing glob metacharacters are expanded (no match is
    /// not an error); anything else is taken as a literal path.
    pub fn resolve_inputs(&self) -> Result<Vec<PathBuf>> {
        let patterns: Vec<&str> = if self.inputs.is_empty() {
            vec![DEFAULT_INPUT_PATTERN]
        } else {
            self.inputs.iter().map(String::as_str).collect()
        };

        let mut paths = Vec::new();
        for pattern in patterns {
            if !pattern.contains(['*', '?', '[']) {
                paths.push(PathBuf::from(pattern));
                continue;
            }

            let matches =
                glob::glob(pattern).with_context(|| format!("Invalid input pattern: {}", pattern))?;
            for entry in matches {
                let path = entry.with_context(|| format!("Failed to read match of {}", pattern))?;
                if path.is_file() {
                    paths.push(path);
                }
            }
        }

        paths.dedup();
        Ok(paths)
    }
}

/// `<dir>/<stem>.csv`, where dir defaults to the input's own directory
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}.csv", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["aplanar"]);
        assert!(cli.inputs.is_empty());
        assert!(cli.config.is_none());
        assert!(!cli.no_propagate);
        assert!(!cli.no_sessions);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_parses_inputs_and_flags() {
        let cli = Cli::parse_from([
            "aplanar",
            "a.json",
            "b.json",
            "--window-secs",
            "600",
            "--propagate-field",
            "store_id",
            "--propagate-field",
            "region",
            "--reset",
            "event_name=login",
        ]);
        assert_eq!(cli.inputs, vec!["a.json", "b.json"]);
        assert_eq!(cli.window_secs, Some(600));
        assert_eq!(cli.propagate_fields, vec!["store_id", "region"]);
        assert_eq!(cli.resets, vec![ResetTrigger::new("event_name", "login")]);
    }

    #[test]
    fn test_cli_rejects_malformed_reset() {
        assert!(Cli::try_parse_from(["aplanar", "--reset", "no_equals"]).is_err());
        assert!(Cli::try_parse_from(["aplanar", "--reset", "=value"]).is_err());
    }

    #[test]
    fn test_reset_value_may_contain_equals() {
        assert_eq!(
            parse_reset("button=a=b").unwrap(),
            ResetTrigger::new("button", "a=b")
        );
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "aplanar",
            "--window-secs",
            "60",
            "--anchor-event",
            "login",
            "--reset",
            "event_name=login",
            "--backfill",
            "--salt-sessions",
            "--date-only",
            "--no-sessions",
        ]);
        let mut config = ConverterConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.session.window_micros, 60_000_000);
        assert_eq!(config.propagation.anchor_event, "login");
        assert_eq!(config.propagation.fields, vec!["store_id"]);
        assert_eq!(config.session.reset_triggers.len(), 1);
        assert!(config.propagation.backfill);
        assert!(config.session.key_salted);
        assert_eq!(config.schema.iso_format, IsoFormat::Date);
        assert!(config.propagation.enabled);
        assert!(!config.session.enabled);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let cli = Cli::parse_from(["aplanar"]);
        let mut config = ConverterConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, ConverterConfig::default());
    }

    #[test]
    fn test_resolve_literal_paths() {
        let cli = Cli::parse_from(["aplanar", "missing.json"]);
        assert_eq!(
            cli.resolve_inputs().unwrap(),
            vec![PathBuf::from("missing.json")]
        );
    }

    #[test]
    fn test_resolve_glob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("b.json"), "[]").unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();
        let pattern = format!("{}/*.json", dir.path().display());

        let cli = Cli::parse_from(["aplanar", pattern.as_str()]);
        let mut paths = cli.resolve_inputs().unwrap();
        paths.sort();

        assert_eq!(
            paths,
            vec![dir.path().join("a.json"), dir.path().join("b.json")]
        );
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("data/export.json"), None),
            PathBuf::from("data/export.csv")
        );
        assert_eq!(
            output_path(Path::new("data/export.json"), Some(Path::new("out"))),
            PathBuf::from("out/export.csv")
        );
        assert_eq!(
            output_path(Path::new("export.json"), None),
            PathBuf::from("export.csv")
        );
    }
}
