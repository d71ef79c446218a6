use crate::config::SessionConfig;
use crate::error::{ConvertError, Result};
use crate::session::digest::session_digest;
use crate::table::{parse_timestamp, Table};
use std::collections::HashMap;

/// Why a row started a new session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartReason {
    /// First timed row seen for the key
    NewKey,
    /// Gap since the key's previous timed row reached the window
    WindowExpired,
    /// A reset trigger matched
    Reset,
}

/// Outcome of feeding one row to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continued,
    Started(StartReason),
    /// Row has no parseable timestamp; it gets no session id
    Untimed,
}

/// Active session of one correlation key
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSession {
    last_timestamp: i64,
    session_id: String,
    /// Closed by a reset on an untimed row
    closed: bool,
}

/// Counters from one assignment pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub keys: usize,
    pub sessions_started: usize,
    pub window_expiries: usize,
    pub resets: usize,
    pub untimed_rows: usize,
}

/// Per-key inactivity-window state machine
///
/// Keys with no entry have no active session. Feed rows in ascending
/// timestamp order; nothing here re-sorts.
#[derive(Debug)]
pub struct SessionAssigner<'c> {
    config: &'c SessionConfig,
    active: HashMap<String, ActiveSession>,
    stats: SessionStats,
}

impl<'c> SessionAssigner<'c> {
    pub fn new(config: &'c SessionConfig) -> Self {
        Self {
            config,
            active: HashMap::new(),
            stats: SessionStats::default(),
        }
    }

    /// Feed one row; returns its session id and the transition taken
    ///
    /// A row without a parseable timestamp gets an empty id and leaves the
    /// key's session open; a reset trigger on such a row closes it, so the
    /// key's next timed row starts a new one.
    pub fn observe(&mut self, key: &str, timestamp: &str, reset: bool) -> (String, Transition) {
        let Some(now) = parse_timestamp(timestamp) else {
            self.stats.untimed_rows += 1;
            if reset {
                if let Some(active) = self.active.get_mut(key) {
                    active.closed = true;
                }
            }
            return (String::new(), Transition::Untimed);
        };

        let reason = match self.active.get_mut(key) {
            None => StartReason::NewKey,
            Some(active) if reset || active.closed => StartReason::Reset,
            Some(active) if now.saturating_sub(active.last_timestamp) < self.config.window_micros => {
                active.last_timestamp = now;
                return (active.session_id.clone(), Transition::Continued);
            }
            Some(_) => StartReason::WindowExpired,
        };

        match reason {
            StartReason::NewKey => {
                self.stats.keys += 1;
                if reset {
                    self.stats.resets += 1;
                }
            }
            StartReason::WindowExpired => self.stats.window_expiries += 1,
            StartReason::Reset => self.stats.resets += 1,
        }
        self.stats.sessions_started += 1;

        let salt = self.config.key_salted.then_some(key);
        let session_id = session_digest(timestamp, salt);
        self.active.insert(
            key.to_string(),
            ActiveSession {
                last_timestamp: now,
                session_id: session_id.clone(),
                closed: false,
            },
        );

        (session_id, Transition::Started(reason))
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn finish(self) -> SessionStats {
        self.stats
    }
}

/// Assign a session id to every row of a time-ordered table
///
/// The session column is appended when missing. Reset triggers whose field
/// is not in the schema, or whose cell is blank, never match. Rows without a
/// parseable timestamp get a blank session id.
///
/// # Errors
/// Returns [`ConvertError::MissingColumn`] when the table has rows but no
/// correlation key column.
pub fn assign_sessions(config: &SessionConfig, table: &mut Table) -> Result<SessionStats> {
    if table.is_empty() {
        return Ok(SessionStats::default());
    }

    let key = table
        .schema()
        .position(&config.key_field)
        .ok_or_else(|| ConvertError::MissingColumn {
            column: config.key_field.clone(),
        })?;

    let timestamp = table.schema().position(&config.timestamp_field);
    if timestamp.is_none() {
        tracing::warn!(
            "Timestamp column '{}' missing, session ids left blank",
            config.timestamp_field
        );
    }

    let triggers: Vec<(usize, &str)> = config
        .reset_triggers
        .iter()
        .filter_map(|t| {
            table
                .schema()
                .position(&t.field)
                .map(|pos| (pos, t.value.as_str()))
        })
        .collect();

    let output = table.ensure_column(&config.session_field);
    let mut assigner = SessionAssigner::new(config);

    for row in table.rows_mut() {
        let reset = triggers.iter().any(|&(pos, value)| {
            let cell = row.cell(pos);
            !cell.is_empty() && cell == value
        });
        let ts = timestamp.map(|pos| row.cell(pos)).unwrap_or("").to_string();
        let (session_id, transition) = assigner.observe(row.cell(key), &ts, reset);

        if transition == Transition::Untimed && timestamp.is_some() {
            tracing::warn!(
                "Row for '{}' has no parseable timestamp ('{}'), session id left blank",
                row.cell(key),
                ts
            );
        }

        row.set(output, session_id);
    }

    let stats = assigner.finish();
    tracing::debug!(
        "Assigned {} sessions across {} keys ({} resets, {} window expiries)",
        stats.sessions_started,
        stats.keys,
        stats.resets,
        stats.window_expiries
    );

    Ok(stats)
}
