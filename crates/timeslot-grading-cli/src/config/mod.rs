//! Configuration loading and resolution.

use std::path::PathBuf;

use timeslot_grading::GradingConfig;

use crate::error::CliResult;

/// Env var naming the pattern snapshot file.
pub const PATTERNS_ENV: &str = "TIMESLOT_PATTERNS";

/// Env var naming a JSON grading config file.
pub const CONFIG_ENV: &str = "TIMESLOT_GRADING_CONFIG";

/// Resolve the pattern snapshot path.
pub fn resolve_pattern_path(explicit: Option<&str>) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }

    if let Ok(env_path) = std::env::var(PATTERNS_ENV) {
        return env_path;
    }

    let cwd_patterns = PathBuf::from(".timeslot/patterns.tgps");
    if cwd_patterns.exists() {
        return cwd_patterns.display().to_string();
    }

    resolve_default_pattern_path()
}

fn resolve_default_pattern_path() -> String {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    format!("{home}/.timeslot-grading/patterns.tgps")
}

/// Load the grading config: explicit path, then the env var, then defaults.
pub fn load_grading_config(explicit: Option<&str>) -> CliResult<GradingConfig> {
    let path = explicit
        .map(str::to_string)
        .or_else(|| std::env::var(CONFIG_ENV).ok());

    match path {
        Some(path) => {
            tracing::debug!("Loading grading config from {path}");
            Ok(GradingConfig::from_json_file(&PathBuf::from(path))?)
        }
        None => Ok(GradingConfig::default()),
    }
}
