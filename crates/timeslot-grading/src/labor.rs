//! Labor-cost health for a restaurant-day.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::GradingConfig;
use crate::patterns::{PatternIdentity, PatternManager, PatternStatistic, PatternStore};
use crate::types::{GradingError, GradingResult};

/// Labor figures computed upstream for one business day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaborFigures {
    pub net_sales: f64,
    pub labor_cost: f64,
    pub labor_hours: f64,
}

impl LaborFigures {
    pub fn validate(&self) -> GradingResult<()> {
        if !(self.net_sales.is_finite() && self.net_sales > 0.0) {
            return Err(GradingError::InvalidInput(format!(
                "net sales must be positive, got {}",
                self.net_sales
            )));
        }
        if !(self.labor_cost.is_finite() && self.labor_cost >= 0.0) {
            return Err(GradingError::InvalidInput(format!(
                "labor cost must be non-negative, got {}",
                self.labor_cost
            )));
        }
        if !(self.labor_hours.is_finite() && self.labor_hours >= 0.0) {
            return Err(GradingError::InvalidInput(format!(
                "labor hours must be non-negative, got {}",
                self.labor_hours
            )));
        }
        Ok(())
    }

    /// Labor cost as a percentage of net sales.
    pub fn labor_percent(&self) -> f64 {
        self.labor_cost / self.net_sales * 100.0
    }

    /// Net sales per labor hour; `None` when no hours were worked.
    pub fn sales_per_labor_hour(&self) -> Option<f64> {
        (self.labor_hours > 0.0).then(|| self.net_sales / self.labor_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaborStatus {
    /// At or under target.
    Healthy,
    /// Over target, at or under ceiling.
    Watch,
    /// Over ceiling.
    Over,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborHealth {
    pub labor_percent: f64,
    pub sales_per_labor_hour: Option<f64>,
    pub status: LaborStatus,
    /// `Some(true)` when a reliable baseline exists and today exceeds its
    /// adaptive ceiling; `None` when no reliable baseline was available.
    pub above_baseline: Option<bool>,
    pub baseline_ceiling: Option<f64>,
}

/// Grade a day's labor against the fixed bands and, if reliable, the learned
/// daily baseline.
pub fn grade_labor(
    figures: &LaborFigures,
    baseline: Option<&PatternStatistic>,
    config: &GradingConfig,
) -> GradingResult<LaborHealth> {
    figures.validate()?;
    let labor_percent = figures.labor_percent();

    let status = if labor_percent <= config.labor.target_percent {
        LaborStatus::Healthy
    } else if labor_percent <= config.labor.ceiling_percent {
        LaborStatus::Watch
    } else {
        LaborStatus::Over
    };

    let baseline_ceiling = baseline
        .filter(|b| b.is_reliable(&config.reliability))
        .map(PatternStatistic::adaptive_ceiling);

    Ok(LaborHealth {
        labor_percent,
        sales_per_labor_hour: figures.sales_per_labor_hour(),
        status,
        above_baseline: baseline_ceiling.map(|ceiling| labor_percent > ceiling),
        baseline_ceiling,
    })
}

/// Learn today's labor percent under the restaurant's weekday identity.
pub fn observe_labor<S: PatternStore>(
    manager: &PatternManager<S>,
    restaurant_id: &str,
    business_date: NaiveDate,
    figures: &LaborFigures,
) -> GradingResult<PatternStatistic> {
    figures.validate()?;
    let identity = PatternIdentity::daily(restaurant_id, business_date.weekday());
    manager.observe(&identity, figures.labor_percent())
}
