//! Healthdash Core Library
//!
//! Loads exercise and fitness-tracker logs, derives lift metrics, and
//! aggregates them into the tables behind every dashboard view.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod derive;
pub mod error;
pub mod export;
pub mod fatigue;
pub mod highlights;
pub mod loader;
pub mod views;
pub mod window;

pub use aggregate::{group_by, Agg, Field, SummaryTable};
pub use config::{CatalogEntry, DashboardConfig, Source};
pub use dashboard::Dashboard;
pub use derive::{Dataset, ExerciseColumn, ExerciseEntry, TrackerColumn, TrackerEntry};
pub use error::{Error, Result};
pub use export::{ExportFormat, Exporter};
pub use fatigue::FatigueRow;
pub use highlights::Highlights;
pub use loader::{Fetcher, HttpFetcher, RawDataset};
pub use window::TimeWindow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which log a dataset was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    ExerciseLog,
    TrackerLog,
}

impl DatasetKind {
    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::ExerciseLog => "exercise log",
            DatasetKind::TrackerLog => "tracker log",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single logged exercise (one row of the exercise log)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub date: NaiveDate,
    pub muscle_group: String,
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: Option<f64>,
    pub per_arm: Option<bool>,
    pub difficulty: Option<String>,
    pub total_reps: u32,
}

impl ExerciseRecord {
    pub fn new(date: NaiveDate, muscle_group: impl Into<String>, exercise: impl Into<String>) -> Self {
        Self {
            date,
            muscle_group: muscle_group.into(),
            exercise: exercise.into(),
            sets: 0,
            reps: 0,
            weight: None,
            per_arm: None,
            difficulty: None,
            total_reps: 0,
        }
    }

    /// Set scheme and load; total reps is taken as `sets * reps`, saturating at `u32::MAX`
    pub fn with_sets(mut self, sets: u32, reps: u32, weight: Option<f64>) -> Self {
        self.sets = sets;
        self.reps = reps;
        self.weight = weight;
        self.total_reps = sets.saturating_mul(reps);
        self
    }
}

/// A single day from the fitness tracker export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerRecord {
    pub date: NaiveDate,
    pub steps: Option<f64>,
    pub weight: Option<f64>,
    pub total_sleep_minutes: Option<f64>,
    pub resting_heart_rate: Option<f64>,
}

impl TrackerRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            steps: None,
            weight: None,
            total_sleep_minutes: None,
            resting_heart_rate: None,
        }
    }
}

/// Get the config directory for Healthdash
pub fn config_dir() -> std::path::PathBuf {
    directories::ProjectDirs::from("com", "healthdash", "healthdash")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| {
            directories::BaseDirs::new()
                .map(|d| d.home_dir().join(".healthdash"))
                .unwrap_or_else(|| std::path::PathBuf::from(".healthdash"))
        })
}

/// Get the config file path
pub fn config_path() -> std::path::PathBuf {
    config_dir().join("config.json")
}
