//! Error type for the command-line front end.

use timeslot_grading::GradingError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
}

pub type CliResult<T> = Result<T, CliError>;
