//! Feeding a graded day's true means back into the learned baselines.
//!
//! This is the caller-driven step after grading; the grader itself never
//! writes patterns.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use crate::patterns::{PatternIdentity, PatternManager, PatternStore};
use crate::types::{Category, DayWindows, GradingError, GradingResult};

/// Counts of what a write-back touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritebackSummary {
    pub restaurant_id: String,
    pub business_date: NaiveDate,
    pub timeslot_observations: usize,
    pub hourly_observations: usize,
    pub skipped_empty_windows: usize,
}

/// Observe every non-empty window's per-category mean under its timeslot
/// identity, and every hour's per-category mean under both hourly fallback
/// identities.
///
/// All means are staged and checked before the first write, so a day with an
/// unusable value changes nothing. A store failure part-way through can still
/// leave earlier identities updated.
pub fn observe_day<S: PatternStore>(
    manager: &PatternManager<S>,
    restaurant_id: &str,
    day: &DayWindows,
) -> GradingResult<WritebackSummary> {
    let weekday = day.weekday();
    let mut summary = WritebackSummary {
        restaurant_id: restaurant_id.to_string(),
        business_date: day.business_date,
        timeslot_observations: 0,
        hourly_observations: 0,
        skipped_empty_windows: 0,
    };
    let mut staged: Vec<(PatternIdentity, f64)> = Vec::new();
    let mut hourly: BTreeMap<(Category, u32), (f64, usize)> = BTreeMap::new();

    for window in day.all() {
        if window.is_empty() {
            summary.skipped_empty_windows += 1;
            continue;
        }
        let hour = window.start_time.hour();
        for totals in window.category_means() {
            let identity = PatternIdentity::timeslot(
                restaurant_id,
                weekday,
                window.shift,
                window.time_label.as_str(),
                totals.category,
            );
            staged.push((identity, totals.mean()));
            summary.timeslot_observations += 1;

            let slot = hourly.entry((totals.category, hour)).or_insert((0.0, 0));
            slot.0 += totals.total_minutes;
            slot.1 += totals.count;
        }
    }

    for ((category, hour), (total, count)) in hourly {
        let mean = total / count as f64;
        staged.push((PatternIdentity::hourly_any_day(restaurant_id, category, hour), mean));
        staged.push((PatternIdentity::hourly_any_restaurant(category, hour), mean));
        summary.hourly_observations += 2;
    }

    if let Some((identity, value)) = staged.iter().find(|(_, v)| !v.is_finite()) {
        return Err(GradingError::InvalidInput(format!(
            "mean for {} is not finite ({value}); nothing was observed",
            identity.describe()
        )));
    }

    for (identity, value) in &staged {
        manager.observe(identity, *value)?;
    }

    tracing::info!(
        restaurant = restaurant_id,
        date = %day.business_date,
        timeslot = summary.timeslot_observations,
        hourly = summary.hourly_observations,
        "Patterns updated from business day"
    );
    Ok(summary)
}
