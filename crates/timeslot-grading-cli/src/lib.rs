//! Timeslot grading CLI: batch grading of restaurant-days from JSON inputs,
//! with learned patterns persisted in a snapshot file.

pub mod commands;
pub mod config;
pub mod error;
pub mod session;

pub use config::{load_grading_config, resolve_pattern_path};
pub use error::{CliError, CliResult};
pub use session::PatternSession;
