//! Timeslot grading: partitions a restaurant's business day into 15-minute
//! windows, grades each against fixed service standards and learned
//! baselines, and keeps those baselines up to date.

pub mod capacity;
pub mod config;
pub mod fallback;
pub mod grader;
pub mod labor;
pub mod patterns;
pub mod storage;
pub mod types;
pub mod windower;
pub mod writeback;

pub use capacity::{busiest_windows, DayCapacity, ShiftCapacity};
pub use config::GradingConfig;
pub use fallback::{resolve_with_fallback, FallbackLevel, FallbackQuery, PatternResolution};
pub use grader::{GradedDay, ShiftVerdict, TimeslotGrader};
pub use labor::{grade_labor, observe_labor, LaborFigures, LaborHealth, LaborStatus};
pub use patterns::{
    InMemoryPatternStore, PatternIdentity, PatternLookup, PatternManager, PatternRecord,
    PatternStatistic, PatternStore,
};
pub use storage::{PatternSnapshot, TgpsReader, TgpsWriter};
pub use types::*;
pub use windower::{partition, partition_raw, WINDOWS_PER_SHIFT, WINDOW_MINUTES};
pub use writeback::{observe_day, WritebackSummary};
