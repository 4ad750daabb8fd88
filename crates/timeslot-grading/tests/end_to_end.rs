//! End-to-end grading and learning scenarios.
//!
//! Partition → grade → write-back over several weeks of synthetic days, with
//! the pattern store persisted between runs.

use chrono::{Duration, NaiveDate, Weekday};
use timeslot_grading::*;

// ── Helpers ──

fn monday(week: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap() + Duration::weeks(week)
}

fn event_at(date: NaiveDate, hh_mm: &str, category: Category, minutes: f64, id: usize) -> FulfillmentEvent {
    let ts = parse_timestamp(&format!("{date} {hh_mm}")).unwrap();
    FulfillmentEvent::new(format!("order-{id}"), category, ts, minutes).unwrap()
}

fn lunch_rush(date: NaiveDate, lobby_minutes: f64) -> Vec<FulfillmentEvent> {
    vec![
        event_at(date, "12:02", Category::Lobby, lobby_minutes, 1),
        event_at(date, "12:06", Category::Lobby, lobby_minutes, 2),
        event_at(date, "12:09", Category::DriveThru, 4.0, 3),
    ]
}

fn no_patterns(_: &PatternIdentity) -> GradingResult<Option<PatternStatistic>> {
    Ok(None)
}

fn lunch_window(day: &GradedDay) -> &GradedWindow {
    day.morning
        .iter()
        .find(|g| g.window.time_label == "12:00-12:15")
        .unwrap()
}

// ── Scenarios ──

#[test]
fn test_standards_only_scenario() {
    let date = monday(0);
    let events = vec![
        event_at(date, "11:05", Category::Lobby, 12.0, 1),
        event_at(date, "11:07", Category::DriveThru, 9.0, 2),
        event_at(date, "11:20", Category::Togo, 6.0, 3),
    ];
    let day = partition(&events, date).unwrap();
    assert_eq!(day.window_count(), 64);

    let grader = TimeslotGrader::new("store-7", GradingConfig::default());
    let graded = grader.grade_day(&day, &no_patterns).unwrap();

    let first = graded
        .morning
        .iter()
        .find(|g| g.window.time_label == "11:00-11:15")
        .unwrap();
    assert!(!first.passed_standards);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].category, Category::DriveThru);

    let second = graded
        .morning
        .iter()
        .find(|g| g.window.time_label == "11:15-11:30")
        .unwrap();
    assert!(second.passed_standards);

    assert_eq!(graded.capacity.active_window_count, 2);
    assert_eq!(graded.capacity.peak_event_count, 3);
}

#[test]
fn test_learned_baseline_catches_regression_within_standards() {
    let manager = PatternManager::new(InMemoryPatternStore::new());
    let grader = TimeslotGrader::new("store-7", GradingConfig::default());

    // Four Mondays of 6-minute lobby service teach a tight baseline.
    for week in 0..4 {
        let date = monday(week);
        let day = partition(&lunch_rush(date, 6.0), date).unwrap();
        let graded = grader.grade_day(&day, &manager).unwrap();
        assert!(lunch_window(&graded).passed());
        observe_day(&manager, "store-7", &day).unwrap();
    }

    // 12 minutes is inside the 15-minute standard but well above normal.
    let date = monday(4);
    let day = partition(&lunch_rush(date, 12.0), date).unwrap();
    let graded = grader.grade_day(&day, &manager).unwrap();
    let lunch = lunch_window(&graded);
    assert!(lunch.passed_standards);
    assert!(!lunch.passed_historical);
    assert_eq!(lunch.failures[0].kind, CheckKind::Historical);
    assert!(lunch.failures[0].is_first);

    // A different restaurant has no history and is only held to standards.
    let other = TimeslotGrader::new("store-8", GradingConfig::default());
    let graded_other = other.grade_day(&day, &manager).unwrap();
    assert!(lunch_window(&graded_other).passed());
}

#[test]
fn test_steady_history_tolerates_small_wobble() {
    let manager = PatternManager::new(InMemoryPatternStore::new());
    let grader = TimeslotGrader::new("store-7", GradingConfig::default());
    for week in 0..4 {
        let date = monday(week);
        let day = partition(&lunch_rush(date, 6.0), date).unwrap();
        observe_day(&manager, "store-7", &day).unwrap();
    }

    let date = monday(4);
    let day = partition(&lunch_rush(date, 6.1), date).unwrap();
    let graded = grader.grade_day(&day, &manager).unwrap();
    let lunch = lunch_window(&graded);
    assert!(lunch.passed_historical);
    assert!(lunch.failures.is_empty());
    assert_eq!(lunch.streak_type, StreakType::Hot);
}

#[test]
fn test_baseline_gated_until_reliable() {
    let manager = PatternManager::new(InMemoryPatternStore::new());
    let grader = TimeslotGrader::new("store-7", GradingConfig::default());

    for week in 0..3 {
        let date = monday(week);
        let day = partition(&lunch_rush(date, 6.0), date).unwrap();
        observe_day(&manager, "store-7", &day).unwrap();
    }

    let date = monday(3);
    let day = partition(&lunch_rush(date, 12.0), date).unwrap();
    let graded = grader.grade_day(&day, &manager).unwrap();
    // three observations: historical check skipped
    assert!(lunch_window(&graded).passed_historical);
}

#[test]
fn test_learning_scenario_first_two_observations() {
    let manager = PatternManager::new(InMemoryPatternStore::new());
    let identity =
        PatternIdentity::timeslot("store-7", Weekday::Mon, Shift::Morning, "12:00-12:15", Category::Lobby);
    assert!(manager.get(&identity).unwrap().is_none());

    let first = manager.observe(&identity, 12.0).unwrap();
    assert_eq!(first.expected_value, 12.0);
    assert_eq!(first.observation_count, 1);
    assert!((first.confidence() - 0.5).abs() < 1e-9);

    let second = manager.observe(&identity, 14.0).unwrap();
    assert_eq!(second.observation_count, 2);
    assert!(second.expected_value > 12.0 && second.expected_value < 14.0);
    assert!((second.confidence() - 0.667).abs() < 1e-3);
}

#[test]
fn test_patterns_survive_snapshot_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patterns.tgps");

    let manager = PatternManager::new(InMemoryPatternStore::new());
    for week in 0..5 {
        let date = monday(week);
        let day = partition(&lunch_rush(date, 6.0), date).unwrap();
        observe_day(&manager, "store-7", &day).unwrap();
    }
    let snapshot = PatternSnapshot::from_store(manager.store(), 0).unwrap();
    TgpsWriter::write_to_file(&snapshot, &path).unwrap();

    let reloaded = PatternManager::new(TgpsReader::read_from_file(&path).unwrap().into_store());
    let grader = TimeslotGrader::new("store-7", GradingConfig::default());
    let date = monday(5);
    let day = partition(&lunch_rush(date, 12.0), date).unwrap();
    let graded = grader.grade_day(&day, &reloaded).unwrap();
    assert!(!lunch_window(&graded).passed_historical);
}

#[test]
fn test_fallback_after_writeback_on_other_weekday() {
    let manager = PatternManager::new(InMemoryPatternStore::new());
    for week in 0..4 {
        let date = monday(week);
        let day = partition(&lunch_rush(date, 6.0), date).unwrap();
        observe_day(&manager, "store-7", &day).unwrap();
    }

    // Tuesday has no exact history; the hourly pattern answers instead.
    let query = FallbackQuery {
        restaurant_id: "store-7",
        day_of_week: Weekday::Tue,
        shift: Shift::Morning,
        time_label: "12:00-12:15",
        category: Category::Lobby,
        hour: 12,
    };
    let resolved = resolve_with_fallback(&manager, &query, 4).unwrap();
    match resolved {
        PatternResolution::Fallback { level, statistic, .. } => {
            assert_eq!(level, FallbackLevel::AnyDayOfWeek);
            assert!((statistic.expected_value - 6.0).abs() < 1e-9);
        }
        other => panic!("expected hourly fallback, got {other:?}"),
    }

    // A restaurant never seen resolves to the cross-restaurant pattern.
    let unseen = FallbackQuery {
        restaurant_id: "store-99",
        ..query
    };
    assert!(matches!(
        resolve_with_fallback(&manager, &unseen, 4).unwrap(),
        PatternResolution::Fallback {
            level: FallbackLevel::AnyRestaurant,
            ..
        }
    ));
}

#[test]
fn test_graded_day_serializes_shape() {
    let date = monday(0);
    let day = partition(&lunch_rush(date, 20.0), date).unwrap();
    let grader = TimeslotGrader::new("store-7", GradingConfig::default());
    let graded = grader.grade_day(&day, &no_patterns).unwrap();

    let json = serde_json::to_value(&graded).unwrap();
    assert_eq!(json["morning"].as_array().unwrap().len(), 32);
    let lunch = &json["morning"][24];
    assert_eq!(lunch["time_label"], "12:00-12:15");
    assert_eq!(lunch["shift"], "MORNING");
    assert_eq!(lunch["passed_standards"], false);
    assert_eq!(lunch["failures"][0]["category"], "LOBBY");
    assert_eq!(lunch["failures"][0]["kind"], "STANDARDS");
    assert_eq!(lunch["streak_type"], "COLD");
    assert_eq!(json["capacity"]["active_window_count"], 1);
}
