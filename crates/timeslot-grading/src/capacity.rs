//! Capacity and peak metrics derived from partitioned windows.
//!
//! All figures are reductions over the exact window list handed to the
//! caller; nothing here looks at raw events.

use serde::{Deserialize, Serialize};

use crate::types::{DayWindows, GradedWindow, Shift, TimeWindow};

/// Traffic figures for one shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftCapacity {
    pub shift: Shift,
    pub total_windows: usize,
    pub active_window_count: usize,
    /// `active_window_count / total_windows`, 0.0 for no windows.
    pub utilization: f64,
    pub total_events: usize,
    /// Events that fell into peak-flagged windows.
    pub peak_event_count: usize,
    pub peak_window_count: usize,
    pub busiest_window: Option<String>,
    pub busiest_event_count: usize,
}

impl ShiftCapacity {
    pub fn from_windows<'a>(shift: Shift, windows: impl IntoIterator<Item = &'a TimeWindow>) -> Self {
        let mut capacity = ShiftCapacity {
            shift,
            total_windows: 0,
            active_window_count: 0,
            utilization: 0.0,
            total_events: 0,
            peak_event_count: 0,
            peak_window_count: 0,
            busiest_window: None,
            busiest_event_count: 0,
        };

        for window in windows {
            let count = window.event_count();
            capacity.total_windows += 1;
            capacity.total_events += count;
            if count > 0 {
                capacity.active_window_count += 1;
            }
            if window.is_peak {
                capacity.peak_window_count += 1;
                capacity.peak_event_count += count;
            }
            // strict > keeps the earliest window on ties
            if count > capacity.busiest_event_count {
                capacity.busiest_event_count = count;
                capacity.busiest_window = Some(window.time_label.clone());
            }
        }

        capacity.utilization = ratio(capacity.active_window_count, capacity.total_windows);
        capacity
    }

    pub fn from_graded(shift: Shift, graded: &[GradedWindow]) -> Self {
        Self::from_windows(shift, graded.iter().map(|g| &g.window))
    }
}

/// Whole-day traffic figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCapacity {
    pub morning: ShiftCapacity,
    pub evening: ShiftCapacity,
    pub total_windows: usize,
    pub active_window_count: usize,
    pub utilization: f64,
    pub total_events: usize,
    pub peak_event_count: usize,
}

impl DayCapacity {
    pub fn from_shifts(morning: ShiftCapacity, evening: ShiftCapacity) -> Self {
        let total_windows = morning.total_windows + evening.total_windows;
        let active_window_count = morning.active_window_count + evening.active_window_count;
        Self {
            total_windows,
            active_window_count,
            utilization: ratio(active_window_count, total_windows),
            total_events: morning.total_events + evening.total_events,
            peak_event_count: morning.peak_event_count + evening.peak_event_count,
            morning,
            evening,
        }
    }

    pub fn from_day(day: &DayWindows) -> Self {
        Self::from_shifts(
            ShiftCapacity::from_windows(Shift::Morning, &day.morning),
            ShiftCapacity::from_windows(Shift::Evening, &day.evening),
        )
    }
}

/// Top `n` windows by event count. Empty windows are never returned; ties keep
/// chronological order.
pub fn busiest_windows(windows: &[TimeWindow], n: usize) -> Vec<&TimeWindow> {
    let mut active: Vec<&TimeWindow> = windows.iter().filter(|w| !w.is_empty()).collect();
    active.sort_by(|a, b| b.event_count().cmp(&a.event_count()));
    active.truncate(n);
    active
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
