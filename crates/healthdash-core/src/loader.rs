//! Record loading: fetch a CSV log and normalize its column types

use crate::{config::Source, error::Error, DatasetKind, ExerciseRecord, Result, TrackerRecord};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Required exercise log columns; each entry lists the accepted header spellings
const EXERCISE_COLUMNS: &[&[&str]] = &[
    &["Date"],
    &["Muscle Groups", "Muscle Group"],
    &["Exercise"],
    &["Sets"],
    &["Reps"],
    &["Weight"],
    &["Total Reps"],
];

const TRACKER_COLUMNS: &[&[&str]] = &[
    &["Date"],
    &["Steps"],
    &["Weight"],
    &["Total Sleep (minutes)"],
    &["Resting Heart Rate"],
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Reads the raw text behind a source
pub trait Fetcher {
    fn fetch(&self, source: &Source) -> Result<String>;
}

/// Fetches URLs over HTTP and paths from the local filesystem
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("healthdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}, using default", e);
                Client::new()
            });

        Self { client, timeout }
    }

    fn fetch_url(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().map_err(|e| self.describe(url, e))?;
        let response = response.error_for_status().map_err(|e| self.describe(url, e))?;
        response.text().map_err(|e| self.describe(url, e))
    }

    fn describe(&self, url: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::unavailable(url, format!("timed out after {}s", self.timeout.as_secs()))
        } else {
            Error::unavailable(url, e)
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, source: &Source) -> Result<String> {
        match source {
            Source::Url(url) => self.fetch_url(url),
            Source::Path(path) => std::fs::read_to_string(path)
                .map_err(|e| Error::unavailable(path.display().to_string(), e)),
        }
    }
}

/// A freshly loaded log, before any derived columns
#[derive(Debug, Clone, PartialEq)]
pub enum RawDataset {
    Exercise(Vec<ExerciseRecord>),
    Tracker(Vec<TrackerRecord>),
}

impl RawDataset {
    pub fn kind(&self) -> DatasetKind {
        match self {
            RawDataset::Exercise(_) => DatasetKind::ExerciseLog,
            RawDataset::Tracker(_) => DatasetKind::TrackerLog,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawDataset::Exercise(rows) => rows.len(),
            RawDataset::Tracker(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetch a source and parse it as the given kind of log
pub fn load(fetcher: &dyn Fetcher, kind: DatasetKind, source: &Source) -> Result<RawDataset> {
    let text = fetcher.fetch(source)?;
    let dataset = parse(kind, &source.to_string(), text.as_bytes())?;
    info!("Loaded {} rows from {} ({})", dataset.len(), source, kind);
    Ok(dataset)
}

/// Parse CSV text as the given kind of log
pub fn parse<R: Read>(kind: DatasetKind, location: &str, reader: R) -> Result<RawDataset> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| Error::schema(location, e.to_string()))?
        .clone();

    match kind {
        DatasetKind::ExerciseLog => {
            check_columns(&headers, EXERCISE_COLUMNS, location)?;
            let mut rows = Vec::new();
            for (index, row) in reader.deserialize::<ExerciseRow>().enumerate() {
                let row = row.map_err(|e| Error::schema(location, e.to_string()))?;
                rows.push(row.into_record(line_number(index), location)?);
            }
            Ok(RawDataset::Exercise(rows))
        }
        DatasetKind::TrackerLog => {
            check_columns(&headers, TRACKER_COLUMNS, location)?;
            let mut rows = Vec::new();
            for (index, row) in reader.deserialize::<TrackerRow>().enumerate() {
                let row = row.map_err(|e| Error::schema(location, e.to_string()))?;
                rows.push(row.into_record(line_number(index), location)?);
            }
            Ok(RawDataset::Tracker(rows))
        }
    }
}

/// Header occupies line 1
fn line_number(index: usize) -> usize {
    index + 2
}

fn check_columns(headers: &StringRecord, required: &[&[&str]], location: &str) -> Result<()> {
    for names in required {
        match headers.iter().filter(|h| names.contains(h)).count() {
            0 => {
                return Err(Error::schema(
                    location,
                    format!("missing column \"{}\"", names[0]),
                ))
            }
            1 => {}
            _ => {
                return Err(Error::schema(
                    location,
                    format!("column \"{}\" appears more than once", names[0]),
                ))
            }
        }
    }
    Ok(())
}

/// Parse a date column, accepting plain dates and timestamps
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn parse_flag(raw: &str) -> std::result::Result<Option<bool>, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "yes" | "1" => Ok(Some(true)),
        "false" | "no" | "0" => Ok(Some(false)),
        other => Err(format!("expected a boolean, got {:?}", other)),
    }
}

fn parse_count(raw: &str) -> Option<u32> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

/// Whole counts may be written as "10" or "10.0"
fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_count(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("expected a non-negative whole number, got {:?}", raw))
    })
}

#[derive(Debug, Deserialize)]
struct ExerciseRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Muscle Groups", alias = "Muscle Group")]
    muscle_group: String,
    #[serde(rename = "Exercise")]
    exercise: String,
    #[serde(rename = "Sets", deserialize_with = "de_count")]
    sets: u32,
    #[serde(rename = "Reps", deserialize_with = "de_count")]
    reps: u32,
    #[serde(rename = "Weight")]
    weight: Option<f64>,
    #[serde(rename = "Per Arm", default)]
    per_arm: Option<String>,
    #[serde(rename = "Difficulty", default)]
    difficulty: Option<String>,
    #[serde(rename = "Total Reps", deserialize_with = "de_count")]
    total_reps: u32,
}

impl ExerciseRow {
    fn into_record(self, line: usize, location: &str) -> Result<ExerciseRecord> {
        let at = |detail: String| Error::schema(location, format!("line {}: {}", line, detail));

        let date = parse_date(&self.date).ok_or_else(|| at(format!("unparseable date {:?}", self.date)))?;
        if self.muscle_group.is_empty() {
            return Err(at("empty muscle group".to_string()));
        }
        if self.exercise.is_empty() {
            return Err(at("empty exercise".to_string()));
        }
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(at(format!("invalid weight {}", weight)));
            }
        }
        let per_arm = match self.per_arm.as_deref() {
            Some(raw) => parse_flag(raw).map_err(at)?,
            None => None,
        };

        Ok(ExerciseRecord {
            date,
            muscle_group: self.muscle_group,
            exercise: self.exercise,
            sets: self.sets,
            reps: self.reps,
            weight: self.weight,
            per_arm,
            difficulty: self.difficulty.filter(|d| !d.is_empty()),
            total_reps: self.total_reps,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TrackerRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Steps")]
    steps: Option<f64>,
    #[serde(rename = "Weight")]
    weight: Option<f64>,
    #[serde(rename = "Total Sleep (minutes)")]
    total_sleep_minutes: Option<f64>,
    #[serde(rename = "Resting Heart Rate")]
    resting_heart_rate: Option<f64>,
}

impl TrackerRow {
    fn into_record(self, line: usize, location: &str) -> Result<TrackerRecord> {
        let date = parse_date(&self.date).ok_or_else(|| {
            Error::schema(location, format!("line {}: unparseable date {:?}", line, self.date))
        })?;

        // NaN cells read as "no value"
        let present = |name: &str, v: Option<f64>| -> Result<Option<f64>> {
            match v.filter(|x| !x.is_nan()) {
                Some(x) if x < 0.0 || x.is_infinite() => Err(Error::schema(
                    location,
                    format!("line {}: invalid {} {}", line, name, x),
                )),
                other => Ok(other),
            }
        };

        Ok(TrackerRecord {
            date,
            steps: present("steps", self.steps)?,
            weight: present("weight", self.weight)?,
            total_sleep_minutes: present("sleep minutes", self.total_sleep_minutes)?,
            resting_heart_rate: present("resting heart rate", self.resting_heart_rate)?,
        })
    }
}
