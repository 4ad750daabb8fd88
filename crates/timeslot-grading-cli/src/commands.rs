//! Subcommand implementations. Each returns a serializable report; printing
//! is left to the binary.

use std::path::Path;

use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use timeslot_grading::{
    grade_labor, parse_business_date, partition_raw, GradedDay, GradingConfig, LaborFigures,
    LaborHealth, PatternIdentity, PatternStatistic, PatternStore, RawFulfillmentEvent,
    TimeslotGrader, WritebackSummary,
};

use crate::error::{CliError, CliResult};
use crate::session::PatternSession;

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn require_restaurant(restaurant_id: &str) -> CliResult<()> {
    if restaurant_id.trim().is_empty() {
        return Err(CliError::InvalidArgs("restaurant id must not be empty".into()));
    }
    Ok(())
}

/// Read a JSON array of categorized events.
pub fn load_events(path: &Path) -> CliResult<Vec<RawFulfillmentEvent>> {
    read_json(path)
}

/// Read a JSON object of labor figures.
pub fn load_labor(path: &Path) -> CliResult<LaborFigures> {
    read_json(path)
}

#[derive(Debug, Serialize)]
pub struct GradeReport {
    pub graded: GradedDay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writeback: Option<WritebackSummary>,
}

/// Partition and grade one restaurant-day, optionally learning from it after.
///
/// Grading always reads the patterns as they were before this day's
/// write-back.
pub fn grade(
    session: &mut PatternSession,
    config: &GradingConfig,
    restaurant_id: &str,
    business_date: &str,
    events: &[RawFulfillmentEvent],
    write_back: bool,
) -> CliResult<GradeReport> {
    require_restaurant(restaurant_id)?;
    let date = parse_business_date(business_date)?;
    let day = partition_raw(events, date)?;

    let grader = TimeslotGrader::new(restaurant_id, *config);
    let graded = grader.grade_day(&day, session.manager())?;

    let writeback = if write_back {
        Some(session.observe_day(restaurant_id, &day)?)
    } else {
        None
    };

    Ok(GradeReport { graded, writeback })
}

#[derive(Debug, Serialize)]
pub struct ObserveReport {
    pub writeback: WritebackSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_baseline: Option<PatternSummary>,
}

/// Learn from a day without grading it.
pub fn observe(
    session: &mut PatternSession,
    config: &GradingConfig,
    restaurant_id: &str,
    business_date: &str,
    events: &[RawFulfillmentEvent],
    labor: Option<&LaborFigures>,
) -> CliResult<ObserveReport> {
    require_restaurant(restaurant_id)?;
    let date = parse_business_date(business_date)?;
    let day = partition_raw(events, date)?;
    let writeback = session.observe_day(restaurant_id, &day)?;

    let labor_baseline = match labor {
        Some(figures) => {
            let stat = session.observe_labor(restaurant_id, date, figures)?;
            let identity = PatternIdentity::daily(restaurant_id, date.weekday());
            Some(PatternSummary::new(&identity, &stat, config))
        }
        None => None,
    };

    Ok(ObserveReport {
        writeback,
        labor_baseline,
    })
}

/// Grade a day's labor against the bands and the stored weekday baseline.
pub fn labor(
    session: &PatternSession,
    config: &GradingConfig,
    restaurant_id: &str,
    business_date: &str,
    figures: &LaborFigures,
) -> CliResult<LaborHealth> {
    require_restaurant(restaurant_id)?;
    let date = parse_business_date(business_date)?;
    let identity = PatternIdentity::daily(restaurant_id, date.weekday());
    let baseline = session.manager().get(&identity)?;
    Ok(grade_labor(figures, baseline.as_ref(), config)?)
}

/// One stored pattern, as shown by `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct PatternSummary {
    pub identity: String,
    pub expected_value: f64,
    pub margin: f64,
    pub observation_count: u32,
    pub confidence: f64,
    pub reliable: bool,
    pub last_updated: DateTime<Utc>,
}

impl PatternSummary {
    pub fn new(identity: &PatternIdentity, stat: &PatternStatistic, config: &GradingConfig) -> Self {
        Self {
            identity: identity.describe(),
            expected_value: stat.expected_value,
            margin: stat.margin,
            observation_count: stat.observation_count,
            confidence: stat.confidence(),
            reliable: stat.is_reliable(&config.reliability),
            last_updated: stat.last_updated,
        }
    }
}

/// List stored patterns, optionally limited to one restaurant.
pub fn inspect(
    session: &PatternSession,
    config: &GradingConfig,
    restaurant_id: Option<&str>,
) -> CliResult<Vec<PatternSummary>> {
    let mut summaries: Vec<PatternSummary> = session
        .manager()
        .store()
        .records()?
        .iter()
        .filter(|r| restaurant_id.is_none() || r.identity.restaurant_id() == restaurant_id)
        .map(|r| PatternSummary::new(&r.identity, &r.statistic, config))
        .collect();
    summaries.sort_by(|a, b| a.identity.cmp(&b.identity));
    Ok(summaries)
}
