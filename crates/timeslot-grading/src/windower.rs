//! Partitioning of a business day into fixed 15-minute windows.
//!
//! Every shift is materialized as exactly [`WINDOWS_PER_SHIFT`] windows, even
//! when no traffic fell into them, so capacity analysis can see idle time.
//! Events are assigned with half-open intervals: an event stamped exactly on
//! a boundary belongs to the window that starts there.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::types::{
    DayWindows, FulfillmentEvent, GradingError, GradingResult, RawFulfillmentEvent, Shift,
    TimeWindow,
};

/// Width of one window.
pub const WINDOW_MINUTES: u32 = 15;

/// Length of one shift.
pub const SHIFT_HOURS: u32 = 8;

/// Windows per shift (8h / 15m).
pub const WINDOWS_PER_SHIFT: usize = (SHIFT_HOURS * 60 / WINDOW_MINUTES) as usize;

/// Meal periods, as `[start, end)` minutes of the day.
const PEAK_RANGES: [(u32, u32); 2] = [
    (11 * 60, 14 * 60), // midday
    (17 * 60, 20 * 60), // evening meal
];

/// Whether a `[start, end)` interval (minutes of day) overlaps a meal period.
pub fn is_peak_interval(start_minute: u32, end_minute: u32) -> bool {
    PEAK_RANGES
        .iter()
        .any(|&(peak_start, peak_end)| start_minute < peak_end && end_minute > peak_start)
}

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// `"HH:MM-HH:MM"` label for a window.
pub fn time_label(start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
}

fn shift_start(business_date: NaiveDate, shift: Shift) -> GradingResult<NaiveDateTime> {
    business_date
        .and_hms_opt(shift.start_hour(), 0, 0)
        .ok_or_else(|| GradingError::InvalidBusinessDate(business_date.to_string()))
}

/// Build the empty windows of one shift.
pub fn shift_windows(business_date: NaiveDate, shift: Shift) -> GradingResult<Vec<TimeWindow>> {
    let start = shift_start(business_date, shift)?;
    let width = Duration::minutes(WINDOW_MINUTES as i64);

    let windows = (0..WINDOWS_PER_SHIFT)
        .map(|i| {
            let start_time = start + width * i as i32;
            let end_time = start_time + width;
            let start_minute = minute_of_day(start_time.time());
            TimeWindow {
                shift,
                start_time,
                end_time,
                time_label: time_label(start_time, end_time),
                events: Vec::new(),
                is_peak: is_peak_interval(start_minute, start_minute + WINDOW_MINUTES),
            }
        })
        .collect();

    Ok(windows)
}

/// Locate the shift and window index an instant belongs to, if any.
fn locate(
    ts: NaiveDateTime,
    morning_start: NaiveDateTime,
    evening_start: NaiveDateTime,
) -> Option<(Shift, usize)> {
    let shift_len = Duration::hours(SHIFT_HOURS as i64);
    let window_secs = (WINDOW_MINUTES * 60) as i64;

    [(Shift::Morning, morning_start), (Shift::Evening, evening_start)]
        .into_iter()
        .find_map(|(shift, start)| {
            let offset = ts - start;
            if offset < Duration::zero() || offset >= shift_len {
                return None;
            }
            Some((shift, (offset.num_seconds() / window_secs) as usize))
        })
}

/// Partition a day's categorized events into 64 windows.
///
/// Events outside both shifts are counted in [`DayWindows::dropped_events`]
/// rather than failing the call. An event with an invalid duration fails the
/// whole partition.
pub fn partition(events: &[FulfillmentEvent], business_date: NaiveDate) -> GradingResult<DayWindows> {
    for event in events {
        if !event.fulfillment_minutes.is_finite() || event.fulfillment_minutes < 0.0 {
            return Err(GradingError::InvalidInput(format!(
                "order {}: fulfillment minutes must be a non-negative number, got {}",
                event.order_id, event.fulfillment_minutes
            )));
        }
    }

    let mut morning = shift_windows(business_date, Shift::Morning)?;
    let mut evening = shift_windows(business_date, Shift::Evening)?;
    let morning_start = shift_start(business_date, Shift::Morning)?;
    let evening_start = shift_start(business_date, Shift::Evening)?;

    let mut dropped_events = 0usize;
    for event in events {
        match locate(event.timestamp, morning_start, evening_start) {
            Some((Shift::Morning, idx)) => morning[idx].events.push(event.clone()),
            Some((Shift::Evening, idx)) => evening[idx].events.push(event.clone()),
            None => {
                tracing::debug!(
                    order_id = %event.order_id,
                    timestamp = %event.timestamp,
                    "Event outside shift ranges, dropping"
                );
                dropped_events += 1;
            }
        }
    }

    if dropped_events > 0 {
        tracing::warn!(
            "{dropped_events} of {} events on {business_date} fell outside both shifts",
            events.len()
        );
    }
    tracing::debug!(
        "Partitioned {} events for {business_date} into {} windows",
        events.len() - dropped_events,
        morning.len() + evening.len()
    );

    Ok(DayWindows {
        business_date,
        morning,
        evening,
        dropped_events,
    })
}

/// Validate raw events and partition them. Any malformed event fails the
/// whole call; there is no partial day.
pub fn partition_raw(
    raw_events: &[RawFulfillmentEvent],
    business_date: NaiveDate,
) -> GradingResult<DayWindows> {
    let events = raw_events
        .iter()
        .map(FulfillmentEvent::try_from)
        .collect::<GradingResult<Vec<_>>>()?;
    partition(&events, business_date)
}
