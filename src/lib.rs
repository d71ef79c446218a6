//! Aplanar - flatten analytics export records into CSV
//!
//! This library converts semi-structured analytics export records (JSON
//! objects mixing scalar fields with keyed parameter lists and fixed
//! sub-objects) into one flat table, then derives two fields across the
//! batch: an attribution value propagated from an anchor event, and a
//! session id synthesized from inactivity gaps.
//!
//! Pipeline: [`schema::discover`] → [`flatten::Flattener`] → timestamp sort
//! → [`propagate::propagate`] → [`session::assign_sessions`] →
//! [`csv_output::CsvOutput`]. [`pipeline::Converter`] runs all of it.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod flatten;
pub mod input;
pub mod pipeline;
pub mod propagate;
pub mod record;
pub mod schema;
pub mod session;
pub mod table;

pub use error::{ConvertError, Result};
