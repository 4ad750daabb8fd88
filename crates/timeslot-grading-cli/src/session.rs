//! Pattern snapshot lifecycle: open, learn, save.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use timeslot_grading::config::LearningConfig;
use timeslot_grading::{
    observe_day, observe_labor, DayWindows, InMemoryPatternStore, LaborFigures, PatternManager,
    PatternSnapshot, PatternStatistic, PatternStore, TgpsReader, TgpsWriter, WritebackSummary,
};

use crate::error::{CliError, CliResult};

/// Owns the pattern manager for one CLI invocation and the file it came from.
pub struct PatternSession {
    manager: PatternManager<InMemoryPatternStore>,
    file_path: PathBuf,
    created_at: u64,
    dirty: bool,
}

impl PatternSession {
    /// Open or create a pattern snapshot at the given path.
    pub fn open(path: &str, learning: LearningConfig) -> CliResult<Self> {
        let file_path = PathBuf::from(path);

        let snapshot = if file_path.exists() {
            tracing::info!("Opening pattern file: {}", file_path.display());
            TgpsReader::read_from_file(&file_path)?
        } else {
            tracing::info!("No pattern file at {}, starting empty", file_path.display());
            PatternSnapshot::new()
        };

        let created_at = snapshot.created_at;
        tracing::info!("Loaded {} learned patterns", snapshot.count());

        Ok(Self {
            manager: PatternManager::with_config(snapshot.into_store(), learning),
            file_path,
            created_at,
            dirty: false,
        })
    }

    pub fn manager(&self) -> &PatternManager<InMemoryPatternStore> {
        &self.manager
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn pattern_count(&self) -> usize {
        self.manager.store().len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Feed a partitioned day back into the patterns.
    pub fn observe_day(&mut self, restaurant_id: &str, day: &DayWindows) -> CliResult<WritebackSummary> {
        let summary = observe_day(&self.manager, restaurant_id, day)?;
        self.dirty = true;
        Ok(summary)
    }

    /// Learn a day's labor percent.
    pub fn observe_labor(
        &mut self,
        restaurant_id: &str,
        business_date: NaiveDate,
        figures: &LaborFigures,
    ) -> CliResult<PatternStatistic> {
        let stat = observe_labor(&self.manager, restaurant_id, business_date, figures)?;
        self.dirty = true;
        Ok(stat)
    }

    /// Write the snapshot if anything changed.
    pub fn save(&mut self) -> CliResult<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CliError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let snapshot = PatternSnapshot::from_store(self.manager.store(), self.created_at)?;
        TgpsWriter::write_to_file(&snapshot, &self.file_path)?;
        self.dirty = false;
        tracing::info!(
            "Saved {} patterns to {}",
            snapshot.count(),
            self.file_path.display()
        );
        Ok(())
    }
}
