//! Integration tests for timeslot-grading-cli.
//!
//! Exercise the command layer the binary drives: pattern file lifecycle,
//! grading with write-back, malformed inputs and labor grading.

use std::io::Write;

use timeslot_grading::config::LearningConfig;
use timeslot_grading::{GradingConfig, LaborFigures, LaborStatus, RawFulfillmentEvent};
use timeslot_grading_cli::commands;
use timeslot_grading_cli::config::{load_grading_config, resolve_pattern_path};
use timeslot_grading_cli::{CliError, PatternSession};

// ─────────────────────── helpers ───────────────────────

fn temp_session(dir: &tempfile::TempDir) -> PatternSession {
    let path = dir.path().join("patterns.tgps");
    PatternSession::open(path.to_str().unwrap(), LearningConfig::default()).unwrap()
}

fn raw(id: &str, category: &str, ts: &str, minutes: f64) -> RawFulfillmentEvent {
    RawFulfillmentEvent {
        order_id: id.to_string(),
        category: category.to_string(),
        timestamp: ts.to_string(),
        fulfillment_minutes: minutes,
    }
}

fn lunch(date: &str, lobby: f64) -> Vec<RawFulfillmentEvent> {
    vec![
        raw("1", "LOBBY", &format!("{date} 12:03"), lobby),
        raw("2", "DRIVE_THRU", &format!("{date} 12:08"), 5.0),
        raw("3", "TOGO", &format!("{date} 18:30"), 7.0),
    ]
}

const MONDAYS: [&str; 5] = [
    "2024-03-04",
    "2024-03-11",
    "2024-03-18",
    "2024-03-25",
    "2024-04-01",
];

// ═══════════════════════════════════════════════════════
// PATTERN FILE LIFECYCLE
// ═══════════════════════════════════════════════════════

#[test]
fn test_01_missing_file_starts_empty_and_is_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = temp_session(&dir);
    assert_eq!(session.pattern_count(), 0);
    session.save().unwrap();
    assert!(!session.file_path().exists());
}

#[test]
fn test_02_write_back_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let config = GradingConfig::default();
    {
        let mut session = temp_session(&dir);
        let report =
            commands::grade(&mut session, &config, "R1", MONDAYS[0], &lunch(MONDAYS[0], 6.0), true)
                .unwrap();
        assert!(report.writeback.is_some());
        assert!(session.is_dirty());
        session.save().unwrap();
    }

    let session = temp_session(&dir);
    // 3 timeslot + 3 categories × 2 hourly identities
    assert_eq!(session.pattern_count(), 9);
}

#[test]
fn test_03_grade_without_write_back_leaves_patterns_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = temp_session(&dir);
    let report = commands::grade(
        &mut session,
        &GradingConfig::default(),
        "R1",
        MONDAYS[0],
        &lunch(MONDAYS[0], 6.0),
        false,
    )
    .unwrap();
    assert!(report.writeback.is_none());
    assert!(!session.is_dirty());
    assert_eq!(session.pattern_count(), 0);
}

#[test]
fn test_04_corrupt_pattern_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patterns.tgps");
    std::fs::write(&path, b"definitely not a snapshot").unwrap();
    let result = PatternSession::open(path.to_str().unwrap(), LearningConfig::default());
    assert!(matches!(result, Err(CliError::Grading(_))));
}

// ═══════════════════════════════════════════════════════
// GRADING
// ═══════════════════════════════════════════════════════

#[test]
fn test_05_history_builds_up_over_weeks() {
    let dir = tempfile::tempdir().unwrap();
    let config = GradingConfig::default();
    let mut session = temp_session(&dir);

    for date in &MONDAYS[..4] {
        let report =
            commands::grade(&mut session, &config, "R1", date, &lunch(date, 6.0), true).unwrap();
        assert!(report.graded.morning_verdict.passed);
    }

    let report =
        commands::grade(&mut session, &config, "R1", MONDAYS[4], &lunch(MONDAYS[4], 13.0), false)
            .unwrap();
    let window = report
        .graded
        .morning
        .iter()
        .find(|g| g.window.time_label == "12:00-12:15")
        .unwrap();
    assert!(window.passed_standards);
    assert!(!window.passed_historical);
    assert!(!report.graded.morning_verdict.passed);
}

#[test]
fn test_06_malformed_event_fails_whole_day() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = temp_session(&dir);
    let mut events = lunch(MONDAYS[0], 6.0);
    events.push(raw("4", "CATERING", "2024-03-04 12:10", 3.0));

    let result = commands::grade(&mut session, &GradingConfig::default(), "R1", MONDAYS[0], &events, true);
    assert!(result.is_err());
    assert_eq!(session.pattern_count(), 0);
    assert!(!session.is_dirty());
}

#[test]
fn test_07_bad_business_date() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = temp_session(&dir);
    let result = commands::grade(
        &mut session,
        &GradingConfig::default(),
        "R1",
        "03/04/2024",
        &lunch(MONDAYS[0], 6.0),
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_08_blank_restaurant_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = temp_session(&dir);
    let result = commands::grade(
        &mut session,
        &GradingConfig::default(),
        "  ",
        MONDAYS[0],
        &lunch(MONDAYS[0], 6.0),
        true,
    );
    assert!(matches!(result, Err(CliError::InvalidArgs(_))));
}

#[test]
fn test_09_dropped_events_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = temp_session(&dir);
    let mut events = lunch(MONDAYS[0], 6.0);
    events.push(raw("late", "TOGO", "2024-03-04 23:10", 3.0));
    let report =
        commands::grade(&mut session, &GradingConfig::default(), "R1", MONDAYS[0], &events, false)
            .unwrap();
    assert_eq!(report.graded.dropped_events, 1);
    assert_eq!(report.graded.capacity.total_events, 3);
}

// ═══════════════════════════════════════════════════════
// INPUT FILES AND CONFIG
// ═══════════════════════════════════════════════════════

#[test]
fn test_10_load_events_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"[{{"order_id":"A1","category":"LOBBY","timestamp":"2024-03-04 12:03","fulfillment_minutes":4.5}}]"#
    )
    .unwrap();

    let events = commands::load_events(&path).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].category, "LOBBY");
}

#[test]
fn test_11_invalid_json_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    std::fs::write(&path, "[{").unwrap();
    match commands::load_events(&path) {
        Err(CliError::Json { path: p, .. }) => assert!(p.ends_with("events.json")),
        other => panic!("expected JSON error, got {other:?}"),
    }
}

#[test]
fn test_12_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grading.json");
    std::fs::write(&path, r#"{"standards": {"lobby_minutes": 5.0}}"#).unwrap();
    let config = load_grading_config(path.to_str()).unwrap();
    assert_eq!(config.standards.lobby_minutes, 5.0);

    let mut session = temp_session(&dir);
    let report =
        commands::grade(&mut session, &config, "R1", MONDAYS[0], &lunch(MONDAYS[0], 6.0), false)
            .unwrap();
    assert!(!report.graded.morning_verdict.passed);
}

#[test]
fn test_13_explicit_pattern_path_wins() {
    assert_eq!(resolve_pattern_path(Some("/tmp/x.tgps")), "/tmp/x.tgps");
}

// ═══════════════════════════════════════════════════════
// LABOR AND INSPECT
// ═══════════════════════════════════════════════════════

#[test]
fn test_14_labor_uses_learned_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let config = GradingConfig::default();
    let mut session = temp_session(&dir);
    let steady = LaborFigures {
        net_sales: 5000.0,
        labor_cost: 1000.0,
        labor_hours: 80.0,
    };
    for date in &MONDAYS[..4] {
        let report =
            commands::observe(&mut session, &config, "R1", date, &lunch(date, 6.0), Some(&steady))
                .unwrap();
        assert!(report.labor_baseline.is_some());
    }

    let heavy = LaborFigures {
        net_sales: 5000.0,
        labor_cost: 1200.0,
        labor_hours: 95.0,
    };
    let health = commands::labor(&session, &config, "R1", MONDAYS[4], &heavy).unwrap();
    assert_eq!(health.status, LaborStatus::Healthy);
    assert_eq!(health.above_baseline, Some(true));

    // Tuesday has no baseline
    let tuesday = commands::labor(&session, &config, "R1", "2024-04-02", &heavy).unwrap();
    assert_eq!(tuesday.above_baseline, None);
}

#[test]
fn test_15_inspect_filters_by_restaurant() {
    let dir = tempfile::tempdir().unwrap();
    let config = GradingConfig::default();
    let mut session = temp_session(&dir);
    commands::observe(&mut session, &config, "R1", MONDAYS[0], &lunch(MONDAYS[0], 6.0), None).unwrap();
    commands::observe(&mut session, &config, "R2", MONDAYS[0], &lunch(MONDAYS[0], 6.0), None).unwrap();

    let all = commands::inspect(&session, &config, None).unwrap();
    let r1 = commands::inspect(&session, &config, Some("R1")).unwrap();
    // 3 timeslot + 3 hourly per restaurant, 3 shared cross-restaurant
    assert_eq!(all.len(), 15);
    assert_eq!(r1.len(), 6);
    assert!(r1.iter().all(|s| s.identity.contains("R1")));
    assert!(all.iter().all(|s| (s.confidence - 0.5).abs() < 1e-9 || s.observation_count > 1));
}
