//! Dual-threshold grading of time windows.
//!
//! Each window is checked against the fixed per-category standards and,
//! where a reliable baseline exists, against the learned historical ceiling.
//! Aggregation is strict: one failing category fails the window on that
//! axis. Streak counters are threaded afterwards, per shift, in
//! chronological order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::capacity::{DayCapacity, ShiftCapacity};
use crate::config::{GradingConfig, StreakConfig};
use crate::patterns::{PatternIdentity, PatternLookup};
use crate::types::{
    CheckKind, DayWindows, GradedWindow, GradingResult, Shift, StreakType, TimeWindow,
    WindowFailure,
};

/// Aggregate verdict for one shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftVerdict {
    pub shift: Shift,
    pub window_count: usize,
    pub active_window_count: usize,
    pub passed_windows: usize,
    pub failed_windows: usize,
    /// Share of active windows that passed; 1.0 for a shift with no traffic.
    pub pass_rate: f64,
    pub passed: bool,
    pub hot_windows: usize,
    pub cold_windows: usize,
    pub longest_pass_run: u32,
    pub longest_fail_run: u32,
}

/// A fully graded restaurant-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedDay {
    pub restaurant_id: String,
    pub business_date: NaiveDate,
    pub morning: Vec<GradedWindow>,
    pub evening: Vec<GradedWindow>,
    pub morning_verdict: ShiftVerdict,
    pub evening_verdict: ShiftVerdict,
    pub capacity: DayCapacity,
    pub dropped_events: usize,
}

impl GradedDay {
    pub fn windows(&self) -> impl Iterator<Item = &GradedWindow> {
        self.morning.iter().chain(self.evening.iter())
    }
}

/// Grades windows for one restaurant.
#[derive(Debug, Clone)]
pub struct TimeslotGrader {
    restaurant_id: String,
    config: GradingConfig,
}

impl TimeslotGrader {
    pub fn new(restaurant_id: impl Into<String>, config: GradingConfig) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            config,
        }
    }

    pub fn restaurant_id(&self) -> &str {
        &self.restaurant_id
    }

    pub fn config(&self) -> &GradingConfig {
        &self.config
    }

    /// Grade an ordered run of windows.
    ///
    /// Patterns are looked up fresh for every window; nothing is cached
    /// between calls. A lookup error aborts the whole call.
    pub fn grade<L>(&self, windows: &[TimeWindow], lookup: &L) -> GradingResult<Vec<GradedWindow>>
    where
        L: PatternLookup + ?Sized,
    {
        let mut graded = windows
            .iter()
            .map(|w| self.grade_window(w, lookup))
            .collect::<GradingResult<Vec<_>>>()?;
        thread_streaks(&mut graded);

        tracing::debug!(
            restaurant = %self.restaurant_id,
            "Graded {} windows, {} failed",
            graded.len(),
            graded.iter().filter(|g| !g.passed()).count()
        );
        Ok(graded)
    }

    /// Grade a single window in isolation. Streak counters are left at zero.
    pub fn grade_window<L>(&self, window: &TimeWindow, lookup: &L) -> GradingResult<GradedWindow>
    where
        L: PatternLookup + ?Sized,
    {
        if window.is_empty() {
            return Ok(self.verdict(window, true, true, 1.0, Vec::new()));
        }

        let mut failures: Vec<WindowFailure> = Vec::new();
        let mut passed_standards = true;
        let mut passed_historical = true;
        let mut checks = 0u32;
        let mut passed_checks = 0u32;

        for totals in window.category_means() {
            let category = totals.category;
            let observed = totals.mean();

            let ceiling = self.config.standards.ceiling(category);
            checks += 1;
            if observed > ceiling {
                passed_standards = false;
                failures.push(WindowFailure {
                    category,
                    kind: CheckKind::Standards,
                    observed,
                    threshold: ceiling,
                    is_first: false,
                });
            } else {
                passed_checks += 1;
            }

            let identity = PatternIdentity::timeslot(
                self.restaurant_id.as_str(),
                window.weekday(),
                window.shift,
                window.time_label.as_str(),
                category,
            );
            let Some(statistic) = lookup.lookup(&identity)? else {
                continue;
            };
            if !statistic.is_reliable(&self.config.reliability) {
                continue;
            }

            let adaptive = statistic.adaptive_ceiling();
            checks += 1;
            if observed > adaptive {
                passed_historical = false;
                failures.push(WindowFailure {
                    category,
                    kind: CheckKind::Historical,
                    observed,
                    threshold: adaptive,
                    is_first: false,
                });
            } else {
                passed_checks += 1;
            }
        }

        if let Some(first) = failures.first_mut() {
            first.is_first = true;
        }

        let pass_rate = if checks == 0 {
            1.0
        } else {
            passed_checks as f64 / checks as f64
        };

        Ok(self.verdict(window, passed_standards, passed_historical, pass_rate, failures))
    }

    fn verdict(
        &self,
        window: &TimeWindow,
        passed_standards: bool,
        passed_historical: bool,
        pass_rate: f64,
        failures: Vec<WindowFailure>,
    ) -> GradedWindow {
        GradedWindow {
            window: window.clone(),
            passed_standards,
            passed_historical,
            pass_rate,
            failures,
            streak_type: classify_streak(pass_rate, &self.config.streak),
            consecutive_pass_count: 0,
            consecutive_fail_count: 0,
        }
    }

    /// Grade both shifts of a partitioned day and attach verdicts and
    /// capacity figures.
    pub fn grade_day<L>(&self, day: &DayWindows, lookup: &L) -> GradingResult<GradedDay>
    where
        L: PatternLookup + ?Sized,
    {
        let morning = self.grade(&day.morning, lookup)?;
        let evening = self.grade(&day.evening, lookup)?;

        let morning_verdict = summarize_shift(Shift::Morning, &morning, &self.config.streak);
        let evening_verdict = summarize_shift(Shift::Evening, &evening, &self.config.streak);
        let capacity = DayCapacity::from_shifts(
            ShiftCapacity::from_graded(Shift::Morning, &morning),
            ShiftCapacity::from_graded(Shift::Evening, &evening),
        );

        tracing::info!(
            restaurant = %self.restaurant_id,
            date = %day.business_date,
            morning_passed = morning_verdict.passed,
            evening_passed = evening_verdict.passed,
            "Graded business day"
        );

        Ok(GradedDay {
            restaurant_id: self.restaurant_id.clone(),
            business_date: day.business_date,
            morning,
            evening,
            morning_verdict,
            evening_verdict,
            capacity,
            dropped_events: day.dropped_events,
        })
    }
}

/// HOT at or above the hot threshold, COLD below the cold threshold.
pub fn classify_streak(pass_rate: f64, streak: &StreakConfig) -> StreakType {
    if pass_rate >= streak.hot_threshold {
        StreakType::Hot
    } else if pass_rate < streak.cold_threshold {
        StreakType::Cold
    } else {
        StreakType::Neutral
    }
}

/// Fill in consecutive pass/fail counters in place. Counters restart whenever
/// the shift changes.
pub fn thread_streaks(graded: &mut [GradedWindow]) {
    let mut current: Option<Shift> = None;
    let mut pass_run = 0u32;
    let mut fail_run = 0u32;

    for g in graded.iter_mut() {
        if current != Some(g.window.shift) {
            current = Some(g.window.shift);
            pass_run = 0;
            fail_run = 0;
        }
        if g.passed() {
            pass_run += 1;
            fail_run = 0;
        } else {
            fail_run += 1;
            pass_run = 0;
        }
        g.consecutive_pass_count = pass_run;
        g.consecutive_fail_count = fail_run;
    }
}

/// Roll graded windows of one shift up into a verdict.
pub fn summarize_shift(shift: Shift, graded: &[GradedWindow], streak: &StreakConfig) -> ShiftVerdict {
    let active: Vec<&GradedWindow> = graded.iter().filter(|g| !g.window.is_empty()).collect();
    let passed_windows = active.iter().filter(|g| g.passed()).count();
    let failed_windows = active.len() - passed_windows;
    let pass_rate = if active.is_empty() {
        1.0
    } else {
        passed_windows as f64 / active.len() as f64
    };

    ShiftVerdict {
        shift,
        window_count: graded.len(),
        active_window_count: active.len(),
        passed_windows,
        failed_windows,
        pass_rate,
        passed: pass_rate >= streak.shift_pass_threshold,
        hot_windows: active.iter().filter(|g| g.streak_type == StreakType::Hot).count(),
        cold_windows: active.iter().filter(|g| g.streak_type == StreakType::Cold).count(),
        longest_pass_run: graded.iter().map(|g| g.consecutive_pass_count).max().unwrap_or(0),
        longest_fail_run: graded.iter().map(|g| g.consecutive_fail_count).max().unwrap_or(0),
    }
}
