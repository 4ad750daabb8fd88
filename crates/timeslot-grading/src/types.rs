//! Core data types for fulfillment events, time windows and grading results.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Service channel an order was fulfilled through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Lobby,
    DriveThru,
    Togo,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Lobby, Category::DriveThru, Category::Togo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lobby => "LOBBY",
            Category::DriveThru => "DRIVE_THRU",
            Category::Togo => "TOGO",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = GradingError;

    /// Only the canonical names are accepted (case-insensitive). Anything else
    /// is rejected instead of being folded into a default channel.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOBBY" => Ok(Category::Lobby),
            "DRIVE_THRU" => Ok(Category::DriveThru),
            "TOGO" => Ok(Category::Togo),
            _ => Err(GradingError::UnknownCategory(s.to_string())),
        }
    }
}

/// One of the two fixed operating halves of a business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shift {
    Morning,
    Evening,
}

impl Shift {
    pub const ALL: [Shift; 2] = [Shift::Morning, Shift::Evening];

    /// First hour of the shift (inclusive).
    pub fn start_hour(&self) -> u32 {
        match self {
            Shift::Morning => 6,
            Shift::Evening => 14,
        }
    }

    /// Last hour of the shift (exclusive).
    pub fn end_hour(&self) -> u32 {
        self.start_hour() + crate::windower::SHIFT_HOURS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "MORNING",
            Shift::Evening => "EVENING",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single categorized order fulfillment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentEvent {
    pub order_id: String,
    pub category: Category,
    pub timestamp: NaiveDateTime,
    pub fulfillment_minutes: f64,
}

impl FulfillmentEvent {
    /// Build an event, rejecting durations that are negative or not finite.
    pub fn new(
        order_id: impl Into<String>,
        category: Category,
        timestamp: NaiveDateTime,
        fulfillment_minutes: f64,
    ) -> GradingResult<Self> {
        let order_id = order_id.into();
        if !fulfillment_minutes.is_finite() || fulfillment_minutes < 0.0 {
            return Err(GradingError::InvalidInput(format!(
                "order {order_id}: fulfillment minutes must be a non-negative number, got {fulfillment_minutes}"
            )));
        }
        Ok(Self {
            order_id,
            category,
            timestamp,
            fulfillment_minutes,
        })
    }
}

/// An event as it arrives from the categorization step, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFulfillmentEvent {
    pub order_id: String,
    pub category: String,
    pub timestamp: String,
    pub fulfillment_minutes: f64,
}

impl TryFrom<&RawFulfillmentEvent> for FulfillmentEvent {
    type Error = GradingError;

    fn try_from(raw: &RawFulfillmentEvent) -> Result<Self, Self::Error> {
        let category: Category = raw.category.parse()?;
        let timestamp = parse_timestamp(&raw.timestamp)?;
        FulfillmentEvent::new(raw.order_id.clone(), category, timestamp, raw.fulfillment_minutes)
    }
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a local business timestamp (`YYYY-MM-DD HH:MM[:SS[.f]]`, space or `T`).
pub fn parse_timestamp(s: &str) -> GradingResult<NaiveDateTime> {
    let trimmed = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| GradingError::MalformedTimestamp(s.to_string()))
}

/// Parse a business date in `YYYY-MM-DD` form.
pub fn parse_business_date(s: &str) -> GradingResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| GradingError::InvalidBusinessDate(s.to_string()))
}

/// A fixed 15-minute slice of a shift with the events that fell into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub shift: Shift,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub time_label: String,
    pub events: Vec<FulfillmentEvent>,
    pub is_peak: bool,
}

impl TimeWindow {
    /// Half-open membership test: `start_time <= ts < end_time`.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start_time <= ts && ts < self.end_time
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn weekday(&self) -> Weekday {
        self.start_time.date().weekday()
    }

    /// Per-category mean fulfillment time, ordered by each category's first
    /// appearance in the window.
    pub fn category_means(&self) -> Vec<CategoryMean> {
        let mut means: Vec<CategoryMean> = Vec::new();
        for event in &self.events {
            match means.iter_mut().find(|m| m.category == event.category) {
                Some(m) => {
                    m.total_minutes += event.fulfillment_minutes;
                    m.count += 1;
                }
                None => means.push(CategoryMean {
                    category: event.category,
                    total_minutes: event.fulfillment_minutes,
                    count: 1,
                }),
            }
        }
        means
    }
}

/// Running total for one category inside a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMean {
    pub category: Category,
    pub total_minutes: f64,
    pub count: usize,
}

impl CategoryMean {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_minutes / self.count as f64
        }
    }
}

/// Output of partitioning one business day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayWindows {
    pub business_date: NaiveDate,
    pub morning: Vec<TimeWindow>,
    pub evening: Vec<TimeWindow>,
    /// Valid events that fell outside both shifts.
    pub dropped_events: usize,
}

impl DayWindows {
    pub fn weekday(&self) -> Weekday {
        self.business_date.weekday()
    }

    pub fn shift(&self, shift: Shift) -> &[TimeWindow] {
        match shift {
            Shift::Morning => &self.morning,
            Shift::Evening => &self.evening,
        }
    }

    /// All windows in chronological order.
    pub fn all(&self) -> impl Iterator<Item = &TimeWindow> {
        self.morning.iter().chain(self.evening.iter())
    }

    pub fn window_count(&self) -> usize {
        self.morning.len() + self.evening.len()
    }
}

/// Which comparison a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckKind {
    Standards,
    Historical,
}

/// A single exceeded threshold inside a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFailure {
    pub category: Category,
    pub kind: CheckKind,
    pub observed: f64,
    pub threshold: f64,
    pub is_first: bool,
}

/// A window's own classification from its pass rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreakType {
    #[serde(rename = "HOT")]
    Hot,
    #[serde(rename = "COLD")]
    Cold,
    #[serde(rename = "NONE")]
    Neutral,
}

/// A time window together with its verdicts. Produced from a [`TimeWindow`]
/// by the grader; the source window is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedWindow {
    #[serde(flatten)]
    pub window: TimeWindow,
    pub passed_standards: bool,
    pub passed_historical: bool,
    pub pass_rate: f64,
    pub failures: Vec<WindowFailure>,
    pub streak_type: StreakType,
    pub consecutive_pass_count: u32,
    pub consecutive_fail_count: u32,
}

impl GradedWindow {
    /// A window passes only when both axes pass.
    pub fn passed(&self) -> bool {
        self.passed_standards && self.passed_historical
    }

    pub fn first_failure(&self) -> Option<&WindowFailure> {
        self.failures.iter().find(|f| f.is_first)
    }
}

/// Errors that can occur in the grading engine.
#[derive(thiserror::Error, Debug)]
pub enum GradingError {
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Invalid business date: {0}")]
    InvalidBusinessDate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pattern store error: {0}")]
    PatternStore(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type GradingResult<T> = Result<T, GradingError>;
