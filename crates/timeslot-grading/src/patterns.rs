//! Learned baselines: pattern identities, statistics, stores and the
//! online-learning update.
//!
//! A [`PatternStatistic`] is an exponentially-weighted estimate of "normal"
//! for one [`PatternIdentity`]. The smoothing factor starts large so sparse
//! data converges quickly, then shrinks toward a floor so an established
//! baseline stays stable but can still drift with the seasons.
//!
//! [`PatternManager::get`] is an exact lookup. It never substitutes a coarser
//! identity; see [`crate::fallback`] for that.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc, Weekday};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::{LearningConfig, ReliabilityConfig};
use crate::types::{Category, GradingError, GradingResult, Shift};

/// Composite key of one learned baseline. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum PatternIdentity {
    /// Whole-day baseline for a restaurant on a weekday.
    Daily {
        restaurant_id: String,
        day_of_week: Weekday,
    },
    /// One window of one shift for one category.
    Timeslot {
        restaurant_id: String,
        day_of_week: Weekday,
        shift: Shift,
        time_label: String,
        category: Category,
    },
    /// Same restaurant, category and hour on any weekday.
    HourlyAnyDay {
        restaurant_id: String,
        category: Category,
        hour: u32,
    },
    /// Same category and hour at any restaurant.
    HourlyAnyRestaurant { category: Category, hour: u32 },
}

impl PatternIdentity {
    pub fn daily(restaurant_id: impl Into<String>, day_of_week: Weekday) -> Self {
        PatternIdentity::Daily {
            restaurant_id: restaurant_id.into(),
            day_of_week,
        }
    }

    pub fn timeslot(
        restaurant_id: impl Into<String>,
        day_of_week: Weekday,
        shift: Shift,
        time_label: impl Into<String>,
        category: Category,
    ) -> Self {
        PatternIdentity::Timeslot {
            restaurant_id: restaurant_id.into(),
            day_of_week,
            shift,
            time_label: time_label.into(),
            category,
        }
    }

    pub fn hourly_any_day(restaurant_id: impl Into<String>, category: Category, hour: u32) -> Self {
        PatternIdentity::HourlyAnyDay {
            restaurant_id: restaurant_id.into(),
            category,
            hour,
        }
    }

    pub fn hourly_any_restaurant(category: Category, hour: u32) -> Self {
        PatternIdentity::HourlyAnyRestaurant { category, hour }
    }

    /// Restaurant the identity is scoped to, if any.
    pub fn restaurant_id(&self) -> Option<&str> {
        match self {
            PatternIdentity::Daily { restaurant_id, .. }
            | PatternIdentity::Timeslot { restaurant_id, .. }
            | PatternIdentity::HourlyAnyDay { restaurant_id, .. } => Some(restaurant_id),
            PatternIdentity::HourlyAnyRestaurant { .. } => None,
        }
    }

    /// Short human-readable form, used in logs and the CLI.
    pub fn describe(&self) -> String {
        match self {
            PatternIdentity::Daily {
                restaurant_id,
                day_of_week,
            } => format!("daily {restaurant_id} {day_of_week}"),
            PatternIdentity::Timeslot {
                restaurant_id,
                day_of_week,
                shift,
                time_label,
                category,
            } => format!("timeslot {restaurant_id} {day_of_week} {shift} {time_label} {category}"),
            PatternIdentity::HourlyAnyDay {
                restaurant_id,
                category,
                hour,
            } => format!("hourly {restaurant_id} *day {hour:02}h {category}"),
            PatternIdentity::HourlyAnyRestaurant { category, hour } => {
                format!("hourly *restaurant *day {hour:02}h {category}")
            }
        }
    }
}

/// Learned estimate for one identity.
///
/// Confidence is not stored: it is derived from `observation_count` on every
/// read so the two can never disagree. Serialized output carries it anyway,
/// and it is ignored when read back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PatternStatistic {
    pub expected_value: f64,
    /// Smoothed absolute deviation around `expected_value`.
    pub margin: f64,
    pub observation_count: u32,
    pub last_updated: DateTime<Utc>,
}

impl Serialize for PatternStatistic {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("PatternStatistic", 5)?;
        state.serialize_field("expected_value", &self.expected_value)?;
        state.serialize_field("margin", &self.margin)?;
        state.serialize_field("observation_count", &self.observation_count)?;
        state.serialize_field("confidence", &self.confidence())?;
        state.serialize_field("last_updated", &self.last_updated)?;
        state.end()
    }
}

/// `1 - 1/(n + 1)`: 0.5 at one observation, approaching 1.
pub fn confidence_for(observation_count: u32) -> f64 {
    1.0 - 1.0 / (observation_count as f64 + 1.0)
}

/// Weight given to a new observation when `prior_count` observations have
/// already been folded in. Strictly decreasing in `prior_count`, always
/// above `floor`.
pub fn learning_rate(prior_count: u32, floor: f64) -> f64 {
    floor + (1.0 - floor) * 2.0 / (prior_count as f64 + 2.0)
}

impl PatternStatistic {
    /// Statistic for the first observation of an identity.
    pub fn first(value: f64, now: DateTime<Utc>, config: &LearningConfig) -> Self {
        Self {
            expected_value: value,
            margin: (value.abs() * config.default_margin_ratio).max(config.min_margin),
            observation_count: 1,
            last_updated: now,
        }
    }

    /// Fold one more observation in, returning the new statistic. The margin
    /// never drops below `min_margin`.
    pub fn updated(&self, value: f64, now: DateTime<Utc>, config: &LearningConfig) -> Self {
        let rate = learning_rate(self.observation_count, config.rate_floor);
        let deviation = (value - self.expected_value).abs();
        Self {
            expected_value: self.expected_value + rate * (value - self.expected_value),
            margin: (self.margin + rate * (deviation - self.margin)).max(config.min_margin),
            observation_count: self.observation_count.saturating_add(1),
            last_updated: now,
        }
    }

    pub fn confidence(&self) -> f64 {
        confidence_for(self.observation_count)
    }

    /// Whether the baseline is trustworthy enough to grade against.
    pub fn is_reliable(&self, reliability: &ReliabilityConfig) -> bool {
        self.confidence() >= reliability.min_confidence
            && self.observation_count >= reliability.min_observations
    }

    /// Highest value still considered normal.
    pub fn adaptive_ceiling(&self) -> f64 {
        self.expected_value + self.margin
    }
}

/// One stored identity/statistic pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    pub identity: PatternIdentity,
    pub statistic: PatternStatistic,
}

/// Durable identity → statistic mapping.
pub trait PatternStore {
    fn get(&self, identity: &PatternIdentity) -> GradingResult<Option<PatternStatistic>>;

    fn put(&self, identity: PatternIdentity, statistic: PatternStatistic) -> GradingResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, in no particular order.
    fn records(&self) -> GradingResult<Vec<PatternRecord>>;
}

/// Read-only pattern access used by the grader.
pub trait PatternLookup {
    fn lookup(&self, identity: &PatternIdentity) -> GradingResult<Option<PatternStatistic>>;
}

impl<F> PatternLookup for F
where
    F: Fn(&PatternIdentity) -> GradingResult<Option<PatternStatistic>>,
{
    fn lookup(&self, identity: &PatternIdentity) -> GradingResult<Option<PatternStatistic>> {
        self(identity)
    }
}

/// Concurrent in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    entries: DashMap<PatternIdentity, PatternStatistic>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = PatternRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|r| (r.identity, r.statistic))
            .collect();
        Self { entries }
    }
}

impl PatternStore for InMemoryPatternStore {
    fn get(&self, identity: &PatternIdentity) -> GradingResult<Option<PatternStatistic>> {
        Ok(self.entries.get(identity).map(|e| e.value().clone()))
    }

    fn put(&self, identity: PatternIdentity, statistic: PatternStatistic) -> GradingResult<()> {
        self.entries.insert(identity, statistic);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn records(&self) -> GradingResult<Vec<PatternRecord>> {
        Ok(self
            .entries
            .iter()
            .map(|e| PatternRecord {
                identity: e.key().clone(),
                statistic: e.value().clone(),
            })
            .collect())
    }
}

impl PatternLookup for InMemoryPatternStore {
    fn lookup(&self, identity: &PatternIdentity) -> GradingResult<Option<PatternStatistic>> {
        self.get(identity)
    }
}

/// Owns the learning rule and serializes updates per identity.
///
/// `observe` is read-modify-write; calls for the same identity take that
/// identity's lock, calls for different identities do not contend. A lock
/// lives in the table only while some call holds or waits on it.
pub struct PatternManager<S: PatternStore> {
    store: S,
    config: LearningConfig,
    locks: DashMap<PatternIdentity, Arc<Mutex<()>>>,
}

impl<S: PatternStore> PatternManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LearningConfig::default())
    }

    pub fn with_config(store: S, config: LearningConfig) -> Self {
        Self {
            store,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Exact lookup, no fallback.
    pub fn get(&self, identity: &PatternIdentity) -> GradingResult<Option<PatternStatistic>> {
        self.store.get(identity)
    }

    /// Record one observation, creating the statistic on first sight.
    pub fn observe(&self, identity: &PatternIdentity, value: f64) -> GradingResult<PatternStatistic> {
        self.observe_at(identity, value, Utc::now())
    }

    /// Record the mean of a day's values as one observation.
    pub fn observe_many(
        &self,
        identity: &PatternIdentity,
        values: &[f64],
    ) -> GradingResult<PatternStatistic> {
        if values.is_empty() {
            return Err(GradingError::InvalidInput(format!(
                "no values to observe for {}",
                identity.describe()
            )));
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        self.observe(identity, mean)
    }

    /// [`observe`](Self::observe) with an explicit clock.
    pub fn observe_at(
        &self,
        identity: &PatternIdentity,
        value: f64,
        now: DateTime<Utc>,
    ) -> GradingResult<PatternStatistic> {
        if !value.is_finite() {
            return Err(GradingError::InvalidInput(format!(
                "observed value for {} is not finite",
                identity.describe()
            )));
        }

        let lock = self.locks.entry(identity.clone()).or_default().clone();
        let result = self.update_locked(&lock, identity, value, now);
        drop(lock);
        // Only the table still holds the lock: nobody is waiting on it.
        self.locks
            .remove_if(identity, |_, held| Arc::strong_count(held) == 1);
        result
    }

    fn update_locked(
        &self,
        lock: &Mutex<()>,
        identity: &PatternIdentity,
        value: f64,
        now: DateTime<Utc>,
    ) -> GradingResult<PatternStatistic> {
        let _guard = lock
            .lock()
            .map_err(|_| GradingError::PatternStore("identity lock poisoned".into()))?;

        let next = match self.store.get(identity)? {
            Some(prior) => prior.updated(value, now, &self.config),
            None => PatternStatistic::first(value, now, &self.config),
        };
        self.store.put(identity.clone(), next.clone())?;

        tracing::trace!(
            identity = %identity.describe(),
            expected = next.expected_value,
            count = next.observation_count,
            "Pattern observed"
        );
        Ok(next)
    }
}

impl<S: PatternStore> PatternLookup for PatternManager<S> {
    fn lookup(&self, identity: &PatternIdentity) -> GradingResult<Option<PatternStatistic>> {
        self.get(identity)
    }
}
