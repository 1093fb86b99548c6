//! Export functionality for CSV and JSON formats

use crate::{
    aggregate::SummaryTable,
    dashboard::Dashboard,
    derive::{ExerciseEntry, TrackerColumn, TrackerEntry},
    fatigue::FatigueRow,
    highlights::{self, Highlights},
    window::TimeWindow,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Export data structure for JSON
#[derive(Debug, Serialize)]
pub struct ExportData {
    pub exported_at: DateTime<Utc>,
    pub reference: NaiveDate,
    pub window: TimeWindow,
    pub fatigue: Vec<FatigueRow>,
    pub records: Vec<ExerciseEntry>,
}

pub struct Exporter<'a> {
    dashboard: &'a Dashboard<'a>,
}

impl<'a> Exporter<'a> {
    pub fn new(dashboard: &'a Dashboard<'a>) -> Self {
        Self { dashboard }
    }

    /// Export derived exercise rows inside a time window
    pub fn export<W: Write>(&self, writer: W, window: TimeWindow, format: ExportFormat) -> Result<()> {
        let records = self.dashboard.exercises(window)?;

        match format {
            ExportFormat::Csv => Self::export_csv(writer, records),
            ExportFormat::Json => {
                let export_data = ExportData {
                    exported_at: Utc::now(),
                    reference: self.dashboard.reference(),
                    window,
                    fatigue: self.dashboard.fatigue()?,
                    records,
                };
                Self::write_json(writer, &export_data)
            }
        }
    }

    fn export_csv<W: Write>(writer: W, records: Vec<ExerciseEntry>) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "Date",
            "Muscle Groups",
            "Exercise",
            "Sets",
            "Reps",
            "Weight",
            "Per Arm",
            "Difficulty",
            "Total Reps",
            "Volume",
            "Projected 1RM",
        ])?;

        let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();

        // Write records
        for entry in records {
            let r = entry.record;
            csv_writer.write_record([
                r.date.format("%Y-%m-%d").to_string(),
                r.muscle_group,
                r.exercise,
                r.sets.to_string(),
                r.reps.to_string(),
                number(r.weight),
                entry.per_arm_label.unwrap_or_default().to_string(),
                r.difficulty.unwrap_or_default(),
                r.total_reps.to_string(),
                number(entry.volume),
                number(entry.projected_1rm),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Export the 48-hour fatigue table
    pub fn export_fatigue<W: Write>(&self, writer: W, format: ExportFormat) -> Result<()> {
        let rows = self.dashboard.fatigue()?;

        match format {
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                for row in &rows {
                    csv_writer.serialize(row)?;
                }
                csv_writer.flush()?;
                Ok(())
            }
            ExportFormat::Json => Self::write_json(writer, &rows),
        }
    }

    /// Export highlight cards for every highlighted tracker column; columns
    /// without any values are left out
    pub fn export_highlights<W: Write>(&self, writer: W, format: ExportFormat) -> Result<()> {
        let rows = self.dashboard.tracker_log()?;
        let mut cards: Vec<(TrackerColumn, Highlights<TrackerEntry>)> = Vec::new();
        for column in TrackerColumn::HIGHLIGHTED {
            match highlights::highlights(&rows, column) {
                Ok(card) => cards.push((column, card)),
                Err(e) if e.is_empty_result() => debug!("Skipping highlights: {}", e),
                Err(e) => return Err(e.into()),
            }
        }

        match format {
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                csv_writer.write_record(["column", "statistic", "date", "value"])?;
                for (column, card) in &cards {
                    let extremes = [
                        ("min", &card.min, card.min_value(*column)),
                        ("max", &card.max, card.max_value(*column)),
                    ];
                    for (statistic, row, value) in extremes {
                        csv_writer.write_record([
                            card.column.clone(),
                            statistic.to_string(),
                            row.record.date.format("%Y-%m-%d").to_string(),
                            value.map(|v| v.to_string()).unwrap_or_default(),
                        ])?;
                    }
                    for (statistic, value) in [("mean", card.mean), ("median", card.median), ("mode", card.mode)] {
                        csv_writer.write_record([
                            card.column.clone(),
                            statistic.to_string(),
                            String::new(),
                            value.to_string(),
                        ])?;
                    }
                }
                csv_writer.flush()?;
                Ok(())
            }
            ExportFormat::Json => {
                let cards: Vec<&Highlights<TrackerEntry>> = cards.iter().map(|(_, card)| card).collect();
                Self::write_json(writer, &cards)
            }
        }
    }

    /// Export any summary table
    pub fn export_table<W: Write>(writer: W, table: &SummaryTable, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                csv_writer.write_record(table.headers())?;
                for row in &table.rows {
                    let cells = row.keys.iter().map(|k| k.to_string()).chain(
                        row.values
                            .iter()
                            .map(|v| v.as_ref().map(|f| f.to_string()).unwrap_or_default()),
                    );
                    csv_writer.write_record(cells)?;
                }
                csv_writer.flush()?;
                Ok(())
            }
            ExportFormat::Json => Self::write_json(writer, table),
        }
    }

    fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writer.write_all(json.as_bytes())?;
        Ok(())
    }
}
