//! Caller-side fallback over pattern lookups.
//!
//! The lookup primitive is exact. When a caller wants an estimate for an
//! identity that has too little history, it composes several exact lookups
//! here, from most to least specific, and learns which one answered.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::patterns::{PatternIdentity, PatternLookup, PatternStatistic};
use crate::types::{Category, GradingResult, Shift};

/// How far from the requested identity an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackLevel {
    /// Same restaurant, category and hour on any weekday.
    AnyDayOfWeek,
    /// Same category and hour at any restaurant.
    AnyRestaurant,
}

/// Outcome of a fallback resolution. The three states stay distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum PatternResolution {
    Exact {
        statistic: PatternStatistic,
    },
    Fallback {
        level: FallbackLevel,
        identity: PatternIdentity,
        statistic: PatternStatistic,
    },
    Missing,
}

impl PatternResolution {
    pub fn statistic(&self) -> Option<&PatternStatistic> {
        match self {
            PatternResolution::Exact { statistic } | PatternResolution::Fallback { statistic, .. } => {
                Some(statistic)
            }
            PatternResolution::Missing => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, PatternResolution::Exact { .. })
    }
}

/// The slot a fallback search starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackQuery<'a> {
    pub restaurant_id: &'a str,
    pub day_of_week: Weekday,
    pub shift: Shift,
    pub time_label: &'a str,
    pub category: Category,
    /// Hour of day the window starts in.
    pub hour: u32,
}

impl FallbackQuery<'_> {
    /// Candidate identities in priority order.
    pub fn candidates(&self) -> [(Option<FallbackLevel>, PatternIdentity); 3] {
        [
            (
                None,
                PatternIdentity::timeslot(
                    self.restaurant_id,
                    self.day_of_week,
                    self.shift,
                    self.time_label,
                    self.category,
                ),
            ),
            (
                Some(FallbackLevel::AnyDayOfWeek),
                PatternIdentity::hourly_any_day(self.restaurant_id, self.category, self.hour),
            ),
            (
                Some(FallbackLevel::AnyRestaurant),
                PatternIdentity::hourly_any_restaurant(self.category, self.hour),
            ),
        ]
    }
}

/// Try the exact identity, then the coarser ones, accepting the first with at
/// least `min_observations` observations. Lookup errors propagate.
pub fn resolve_with_fallback<L>(
    lookup: &L,
    query: &FallbackQuery<'_>,
    min_observations: u32,
) -> GradingResult<PatternResolution>
where
    L: PatternLookup + ?Sized,
{
    for (level, identity) in query.candidates() {
        let Some(statistic) = lookup.lookup(&identity)? else {
            continue;
        };
        if statistic.observation_count < min_observations {
            continue;
        }
        return Ok(match level {
            None => PatternResolution::Exact { statistic },
            Some(level) => PatternResolution::Fallback {
                level,
                identity,
                statistic,
            },
        });
    }
    Ok(PatternResolution::Missing)
}
