//! Grading, learning and labor thresholds.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{Category, GradingError, GradingResult};

/// Fixed per-category fulfillment ceilings, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardsConfig {
    pub lobby_minutes: f64,
    pub drive_thru_minutes: f64,
    pub togo_minutes: f64,
}

impl Default for StandardsConfig {
    fn default() -> Self {
        Self {
            lobby_minutes: 15.0,
            drive_thru_minutes: 8.0,
            togo_minutes: 10.0,
        }
    }
}

impl StandardsConfig {
    pub fn ceiling(&self, category: Category) -> f64 {
        match category {
            Category::Lobby => self.lobby_minutes,
            Category::DriveThru => self.drive_thru_minutes,
            Category::Togo => self.togo_minutes,
        }
    }
}

/// When a learned baseline is trusted enough to grade against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub min_confidence: f64,
    pub min_observations: u32,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            min_observations: 4,
        }
    }
}

/// Pass-rate cut-offs for window classification and shift verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// `pass_rate >= hot_threshold` is HOT.
    pub hot_threshold: f64,
    /// `pass_rate < cold_threshold` is COLD.
    pub cold_threshold: f64,
    /// Share of passing windows a shift needs to pass.
    pub shift_pass_threshold: f64,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            hot_threshold: 0.85,
            cold_threshold: 0.70,
            shift_pass_threshold: 0.85,
        }
    }
}

/// Online-learning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Asymptotic lower bound of the smoothing factor.
    pub rate_floor: f64,
    /// Initial margin as a fraction of the first observed value.
    pub default_margin_ratio: f64,
    pub min_margin: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            rate_floor: 0.1,
            default_margin_ratio: 0.2,
            min_margin: 0.5,
        }
    }
}

/// Labor-cost bands, as a percentage of net sales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaborConfig {
    pub target_percent: f64,
    pub ceiling_percent: f64,
}

impl Default for LaborConfig {
    fn default() -> Self {
        Self {
            target_percent: 25.0,
            ceiling_percent: 30.0,
        }
    }
}

/// Complete engine configuration. Every section falls back to its defaults
/// when omitted from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub standards: StandardsConfig,
    pub reliability: ReliabilityConfig,
    pub streak: StreakConfig,
    pub learning: LearningConfig,
    pub labor: LaborConfig,
}

impl GradingConfig {
    /// Load a JSON config file.
    pub fn from_json_file(path: &Path) -> GradingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> GradingResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| GradingError::InvalidInput(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot grade with.
    pub fn validate(&self) -> GradingResult<()> {
        for category in Category::ALL {
            let ceiling = self.standards.ceiling(category);
            if !(ceiling.is_finite() && ceiling > 0.0) {
                return Err(GradingError::InvalidInput(format!(
                    "standards ceiling for {category} must be positive, got {ceiling}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.reliability.min_confidence) {
            return Err(GradingError::InvalidInput(
                "reliability.min_confidence must be within [0, 1]".into(),
            ));
        }
        if self.streak.cold_threshold > self.streak.hot_threshold {
            return Err(GradingError::InvalidInput(
                "streak.cold_threshold must not exceed streak.hot_threshold".into(),
            ));
        }
        if !(self.learning.rate_floor > 0.0 && self.learning.rate_floor < 1.0) {
            return Err(GradingError::InvalidInput(
                "learning.rate_floor must be within (0, 1)".into(),
            ));
        }
        if self.labor.target_percent > self.labor.ceiling_percent {
            return Err(GradingError::InvalidInput(
                "labor.target_percent must not exceed labor.ceiling_percent".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ceilings() {
        let standards = StandardsConfig::default();
        assert_eq!(standards.ceiling(Category::Lobby), 15.0);
        assert_eq!(standards.ceiling(Category::DriveThru), 8.0);
        assert_eq!(standards.ceiling(Category::Togo), 10.0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config =
            GradingConfig::from_json_str(r#"{"standards": {"drive_thru_minutes": 6.5}}"#).unwrap();
        assert_eq!(config.standards.drive_thru_minutes, 6.5);
        assert_eq!(config.standards.lobby_minutes, 15.0);
        assert_eq!(config.reliability.min_observations, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(GradingConfig::from_json_str(r#"{"standards": {"togo_minutes": 0}}"#).is_err());
        assert!(GradingConfig::from_json_str(r#"{"learning": {"rate_floor": 0}}"#).is_err());
        assert!(GradingConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grading.json");
        let mut config = GradingConfig::default();
        config.labor.target_percent = 22.0;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = GradingConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
