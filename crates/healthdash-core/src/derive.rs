//! Derived metrics: lift volume, projected one-rep max, per-arm labels, sleep hours

use crate::{
    aggregate::{Column, Field, Tabular},
    error::Error,
    loader::RawDataset,
    window::Dated,
    DatasetKind, ExerciseRecord, Result, TrackerRecord,
};
use chrono::NaiveDate;
use serde::Serialize;

/// An exercise record with its derived columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseEntry {
    #[serde(flatten)]
    pub record: ExerciseRecord,
    pub volume: Option<f64>,
    pub projected_1rm: Option<f64>,
    pub per_arm_label: Option<&'static str>,
}

impl ExerciseEntry {
    pub fn from_record(record: ExerciseRecord) -> Self {
        Self {
            volume: volume(record.weight, record.total_reps),
            projected_1rm: projected_one_rep_max(record.weight, record.reps),
            per_arm_label: per_arm_label(record.per_arm),
            record,
        }
    }

    pub fn is(&self, muscle_group: &str, exercise: &str) -> bool {
        self.record.muscle_group == muscle_group && self.record.exercise == exercise
    }
}

/// A tracker record with its derived sleep columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerEntry {
    #[serde(flatten)]
    pub record: TrackerRecord,
    pub total_sleep_hours: Option<f64>,
    pub sleep_readable: Option<String>,
}

impl TrackerEntry {
    pub fn from_record(record: TrackerRecord) -> Self {
        Self {
            total_sleep_hours: record.total_sleep_minutes.map(sleep_hours),
            sleep_readable: record.total_sleep_minutes.map(format_sleep),
            record,
        }
    }
}

/// `Weight × Total Reps`
pub fn volume(weight: Option<f64>, total_reps: u32) -> Option<f64> {
    weight.map(|w| w * total_reps as f64)
}

/// Linear (Epley) estimate: `Weight × (1 + Reps / 30)`
pub fn projected_one_rep_max(weight: Option<f64>, reps: u32) -> Option<f64> {
    weight.map(|w| w * (1.0 + reps as f64 / 30.0))
}

pub fn per_arm_label(per_arm: Option<bool>) -> Option<&'static str> {
    per_arm.map(|flag| if flag { "Yes" } else { "No" })
}

pub fn sleep_hours(minutes: f64) -> f64 {
    minutes / 60.0
}

/// Sleep minutes as whole hours and minutes, e.g. `7h 30m`
pub fn format_sleep(minutes: f64) -> String {
    let hours = (minutes / 60.0).trunc();
    let mins = (minutes % 60.0).trunc();
    format!("{}h {}m", hours as i64, mins as i64)
}

pub fn derive_exercise(records: Vec<ExerciseRecord>) -> Vec<ExerciseEntry> {
    records.into_iter().map(ExerciseEntry::from_record).collect()
}

pub fn derive_tracker(records: Vec<TrackerRecord>) -> Vec<TrackerEntry> {
    records.into_iter().map(TrackerEntry::from_record).collect()
}

/// A log with derived columns appended
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Exercise(Vec<ExerciseEntry>),
    Tracker(Vec<TrackerEntry>),
}

impl Dataset {
    pub fn kind(&self) -> DatasetKind {
        match self {
            Dataset::Exercise(_) => DatasetKind::ExerciseLog,
            Dataset::Tracker(_) => DatasetKind::TrackerLog,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Exercise(rows) => rows.len(),
            Dataset::Tracker(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_exercise(self) -> Result<Vec<ExerciseEntry>> {
        match self {
            Dataset::Exercise(rows) => Ok(rows),
            other => Err(wrong_kind(DatasetKind::ExerciseLog, other.kind())),
        }
    }

    pub fn into_tracker(self) -> Result<Vec<TrackerEntry>> {
        match self {
            Dataset::Tracker(rows) => Ok(rows),
            other => Err(wrong_kind(DatasetKind::TrackerLog, other.kind())),
        }
    }
}

fn wrong_kind(expected: DatasetKind, found: DatasetKind) -> Error {
    Error::schema(found.label(), format!("expected a {}", expected))
}

/// Append derived columns, dispatching on the kind of log
pub fn derive(raw: RawDataset) -> Dataset {
    match raw {
        RawDataset::Exercise(records) => Dataset::Exercise(derive_exercise(records)),
        RawDataset::Tracker(records) => Dataset::Tracker(derive_tracker(records)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExerciseColumn {
    Date,
    MuscleGroup,
    Exercise,
    Sets,
    Reps,
    Weight,
    PerArm,
    Difficulty,
    TotalReps,
    Volume,
    ProjectedOneRepMax,
}

impl Column for ExerciseColumn {
    fn name(self) -> &'static str {
        match self {
            ExerciseColumn::Date => "Date",
            ExerciseColumn::MuscleGroup => "Muscle Groups",
            ExerciseColumn::Exercise => "Exercise",
            ExerciseColumn::Sets => "Sets",
            ExerciseColumn::Reps => "Reps",
            ExerciseColumn::Weight => "Weight",
            ExerciseColumn::PerArm => "Per Arm",
            ExerciseColumn::Difficulty => "Difficulty",
            ExerciseColumn::TotalReps => "Total Reps",
            ExerciseColumn::Volume => "Volume",
            ExerciseColumn::ProjectedOneRepMax => "Projected 1RM",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            ExerciseColumn::Sets
                | ExerciseColumn::Reps
                | ExerciseColumn::Weight
                | ExerciseColumn::TotalReps
                | ExerciseColumn::Volume
                | ExerciseColumn::ProjectedOneRepMax
        )
    }
}

impl Dated for ExerciseEntry {
    fn date(&self) -> NaiveDate {
        self.record.date
    }
}

impl Tabular for ExerciseEntry {
    type Column = ExerciseColumn;

    fn field(&self, column: ExerciseColumn) -> Option<Field> {
        let r = &self.record;
        match column {
            ExerciseColumn::Date => Some(Field::Date(r.date)),
            ExerciseColumn::MuscleGroup => Some(Field::from(r.muscle_group.as_str())),
            ExerciseColumn::Exercise => Some(Field::from(r.exercise.as_str())),
            ExerciseColumn::Sets => Some(Field::from(r.sets)),
            ExerciseColumn::Reps => Some(Field::from(r.reps)),
            ExerciseColumn::Weight => r.weight.map(Field::Number),
            ExerciseColumn::PerArm => self.per_arm_label.map(Field::from),
            ExerciseColumn::Difficulty => r.difficulty.as_deref().map(Field::from),
            ExerciseColumn::TotalReps => Some(Field::from(r.total_reps)),
            ExerciseColumn::Volume => self.volume.map(Field::Number),
            ExerciseColumn::ProjectedOneRepMax => self.projected_1rm.map(Field::Number),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerColumn {
    Date,
    Steps,
    Weight,
    TotalSleepMinutes,
    TotalSleepHours,
    RestingHeartRate,
}

impl TrackerColumn {
    /// The columns shown as highlight cards
    pub const HIGHLIGHTED: [TrackerColumn; 4] = [
        TrackerColumn::Steps,
        TrackerColumn::Weight,
        TrackerColumn::TotalSleepMinutes,
        TrackerColumn::RestingHeartRate,
    ];

    /// Parse a CSV header or a short command-line name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "date" => Some(TrackerColumn::Date),
            "steps" => Some(TrackerColumn::Steps),
            "weight" => Some(TrackerColumn::Weight),
            "total sleep (minutes)" | "sleep" | "sleep-minutes" => Some(TrackerColumn::TotalSleepMinutes),
            "total sleep (hours)" | "sleep-hours" => Some(TrackerColumn::TotalSleepHours),
            "resting heart rate" | "resting-heart-rate" | "rhr" | "heart-rate" => {
                Some(TrackerColumn::RestingHeartRate)
            }
            _ => None,
        }
    }

    pub fn units(self) -> &'static str {
        match self {
            TrackerColumn::Date => "",
            TrackerColumn::Steps => "steps / day",
            TrackerColumn::Weight => "lbs",
            TrackerColumn::TotalSleepMinutes => "minutes",
            TrackerColumn::TotalSleepHours => "hours",
            TrackerColumn::RestingHeartRate => "bpm",
        }
    }

    pub fn is_sleep(self) -> bool {
        matches!(self, TrackerColumn::TotalSleepMinutes | TrackerColumn::TotalSleepHours)
    }
}

impl Column for TrackerColumn {
    fn name(self) -> &'static str {
        match self {
            TrackerColumn::Date => "Date",
            TrackerColumn::Steps => "Steps",
            TrackerColumn::Weight => "Weight",
            TrackerColumn::TotalSleepMinutes => "Total Sleep (minutes)",
            TrackerColumn::TotalSleepHours => "Total Sleep (hours)",
            TrackerColumn::RestingHeartRate => "Resting Heart Rate",
        }
    }

    fn is_numeric(self) -> bool {
        !matches!(self, TrackerColumn::Date)
    }
}

impl std::fmt::Display for TrackerColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Dated for TrackerEntry {
    fn date(&self) -> NaiveDate {
        self.record.date
    }
}

impl Tabular for TrackerEntry {
    type Column = TrackerColumn;

    fn field(&self, column: TrackerColumn) -> Option<Field> {
        let r = &self.record;
        match column {
            TrackerColumn::Date => Some(Field::Date(r.date)),
            TrackerColumn::Steps => r.steps.map(Field::Number),
            TrackerColumn::Weight => r.weight.map(Field::Number),
            TrackerColumn::TotalSleepMinutes => r.total_sleep_minutes.map(Field::Number),
            TrackerColumn::TotalSleepHours => self.total_sleep_hours.map(Field::Number),
            TrackerColumn::RestingHeartRate => r.resting_heart_rate.map(Field::Number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_lift_formulas() {
        let mut record = ExerciseRecord::new(date(2024, 1, 1), "Chest", "Bench Press").with_sets(3, 10, Some(135.0));
        record.per_arm = Some(false);
        let entry = ExerciseEntry::from_record(record);

        assert_eq!(entry.volume, Some(135.0 * 30.0));
        assert_eq!(entry.projected_1rm, Some(135.0 * (1.0 + 10.0 / 30.0)));
        assert_eq!(entry.per_arm_label, Some("No"));
    }

    #[test]
    fn test_lift_formula_edges() {
        // Zero reps projects the lifted weight itself
        assert_eq!(projected_one_rep_max(Some(95.0), 0), Some(95.0));
        // Zero weight gives zero volume
        assert_eq!(volume(Some(0.0), 30), Some(0.0));
        // Missing weight propagates
        assert_eq!(volume(None, 30), None);
        assert_eq!(projected_one_rep_max(None, 8), None);
        assert_eq!(per_arm_label(Some(true)), Some("Yes"));
        assert_eq!(per_arm_label(None), None);
    }

    #[test]
    fn test_sleep_columns() {
        let mut record = TrackerRecord::new(date(2024, 1, 1));
        record.total_sleep_minutes = Some(450.0);
        let entry = TrackerEntry::from_record(record);

        assert_eq!(entry.total_sleep_hours, Some(7.5));
        assert_eq!(entry.sleep_readable.as_deref(), Some("7h 30m"));
        assert_eq!(format_sleep(420.0), "7h 0m");
        assert_eq!(format_sleep(59.9), "0h 59m");
    }

    #[test]
    fn test_derive_dispatches_on_kind() {
        let raw = RawDataset::Tracker(vec![TrackerRecord::new(date(2024, 1, 1))]);
        let dataset = derive(raw);
        assert_eq!(dataset.kind(), DatasetKind::TrackerLog);
        assert!(dataset.clone().into_exercise().is_err());
        assert_eq!(dataset.into_tracker().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_weight_cells() {
        let entry = ExerciseEntry::from_record(
            ExerciseRecord::new(date(2024, 1, 1), "Abs", "Russian Twists").with_sets(3, 20, None),
        );
        assert_eq!(entry.field(ExerciseColumn::Volume), None);
        assert_eq!(entry.field(ExerciseColumn::Exercise), Some(Field::from("Russian Twists")));
        assert_eq!(entry.field(ExerciseColumn::TotalReps), Some(Field::Number(60.0)));
    }

    #[test]
    fn test_tracker_column_names() {
        assert_eq!(TrackerColumn::parse("Total Sleep (minutes)"), Some(TrackerColumn::TotalSleepMinutes));
        assert_eq!(TrackerColumn::parse("rhr"), Some(TrackerColumn::RestingHeartRate));
        assert_eq!(TrackerColumn::parse("calories"), None);
    }
}
