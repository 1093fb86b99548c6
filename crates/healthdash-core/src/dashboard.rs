//! High-level dashboard API
//!
//! Every call re-runs the pipeline from the loader: fetch, derive, filter,
//! aggregate. Nothing is cached between calls.

use crate::{
    aggregate::SummaryTable,
    config::DashboardConfig,
    derive::{self, ExerciseEntry, TrackerColumn, TrackerEntry},
    fatigue::{self, FatigueRow},
    highlights::{self, Highlights},
    loader::{self, Fetcher},
    views::{self, Histogram, LiftMetric, MuscleExercises, MuscleSection, OverviewPoint, TrackerSeries},
    window::{self, TimeWindow},
    DatasetKind, Result,
};
use chrono::{Local, NaiveDate};

pub struct Dashboard<'a> {
    config: &'a DashboardConfig,
    fetcher: &'a dyn Fetcher,
    reference: NaiveDate,
}

impl<'a> Dashboard<'a> {
    /// A dashboard anchored at today's local date
    pub fn new(config: &'a DashboardConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            config,
            fetcher,
            reference: Local::now().date_naive(),
        }
    }

    /// Anchor time windows and the fatigue window at `reference` instead of today
    pub fn with_reference(mut self, reference: NaiveDate) -> Self {
        self.reference = reference;
        self
    }

    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    /// Load and derive the exercise log
    pub fn exercise_log(&self) -> Result<Vec<ExerciseEntry>> {
        let kind = DatasetKind::ExerciseLog;
        let raw = loader::load(self.fetcher, kind, self.config.source(kind))?;
        derive::derive(raw).into_exercise()
    }

    /// Load and derive the tracker log
    pub fn tracker_log(&self) -> Result<Vec<TrackerEntry>> {
        let kind = DatasetKind::TrackerLog;
        let raw = loader::load(self.fetcher, kind, self.config.source(kind))?;
        derive::derive(raw).into_tracker()
    }

    /// Derived exercise rows inside `window`
    pub fn exercises(&self, window: TimeWindow) -> Result<Vec<ExerciseEntry>> {
        Ok(window::filter(&self.exercise_log()?, window, self.reference))
    }

    /// Fatigue ratio per muscle group over the trailing 48 hours
    pub fn fatigue(&self) -> Result<Vec<FatigueRow>> {
        fatigue::fatigue_ratios(&self.exercise_log()?, self.reference)
    }

    /// Highlight card for a tracker column
    pub fn highlights(&self, column: TrackerColumn) -> Result<Highlights<TrackerEntry>> {
        highlights::highlights(&self.tracker_log()?, column)
    }

    /// Number of tracked days
    pub fn record_count(&self) -> Result<usize> {
        Ok(self.tracker_log()?.len())
    }

    /// Volume or projected 1RM charts, one per muscle group
    pub fn lift_metric(&self, window: TimeWindow, metric: LiftMetric) -> Result<Vec<MuscleSection>> {
        Ok(views::metric_by_muscle(&self.exercises(window)?, metric))
    }

    /// Sets-and-reps breakdown for every exercise inside `window`
    pub fn exercise_breakdown(&self, window: TimeWindow) -> Result<Vec<MuscleExercises>> {
        let full = self.exercise_log()?;
        let filtered = window::filter(&full, window, self.reference);
        views::exercise_breakdown(&full, &filtered, self.config)
    }

    /// Workout count per day over the whole log
    pub fn calendar(&self) -> Result<SummaryTable> {
        views::calendar(&self.exercise_log()?)
    }

    pub fn volume_overview(&self, window: TimeWindow) -> Result<Vec<OverviewPoint>> {
        views::volume_overview(&self.exercises(window)?)
    }

    pub fn one_rep_max_overview(&self, window: TimeWindow) -> Result<Vec<OverviewPoint>> {
        views::one_rep_max_overview(&self.exercises(window)?)
    }

    pub fn tracker_series(&self, window: TimeWindow, column: TrackerColumn) -> Result<TrackerSeries> {
        let rows = window::filter(&self.tracker_log()?, window, self.reference);
        views::tracker_series(&rows, column)
    }

    /// Body-weight distribution inside `window`
    pub fn weight_histogram(&self, window: TimeWindow, bins: usize) -> Result<Histogram> {
        let rows = window::filter(&self.tracker_log()?, window, self.reference);
        views::weight_histogram(&rows, bins)
    }

    /// Format a whole-number quantity with thousands separators
    pub fn format_count(value: f64) -> String {
        let whole = value.trunc() as i64;
        let digits = whole.unsigned_abs().to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if whole < 0 {
            out.push('-');
        }
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

    /// Format a measurement with up to one decimal place
    pub fn format_measure(value: f64) -> String {
        if value.fract() == 0.0 {
            Self::format_count(value)
        } else {
            format!("{:.1}", value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Source, error::Error};
    use std::collections::HashMap;

    const EXERCISE_CSV: &str = "\
Date,Muscle Groups,Exercise,Sets,Reps,Weight,Per Arm,Difficulty,Total Reps
2024-03-08,Back,Dumbbell Rows,3,10,50,True,Easy,30
2024-03-09,Chest,Bench Press,5,5,135,False,Hard,25
2024-01-02,Legs,Squat,5,5,185,False,Medium,25
2024-03-09,Abs,Russian Twists,3,20,,False,Easy,60
";

    const TRACKER_CSV: &str = "\
Date,Steps,Weight,Total Sleep (minutes),Resting Heart Rate
2024-01-01,10234,150,450,61
2024-03-01,8000,160,420,58
2024-03-02,9500,,,60
";

    struct MemoryFetcher(HashMap<String, String>);

    impl Fetcher for MemoryFetcher {
        fn fetch(&self, source: &Source) -> Result<String> {
            self.0
                .get(&source.to_string())
                .cloned()
                .ok_or_else(|| Error::unavailable(source.to_string(), "connection refused"))
        }
    }

    fn setup() -> (DashboardConfig, MemoryFetcher) {
        let config = DashboardConfig {
            exercise_source: Source::from("https://example.com/lifts.csv"),
            tracker_source: Source::from("https://example.com/fitbit.csv"),
            ..DashboardConfig::default()
        };
        let fetcher = MemoryFetcher(HashMap::from([
            ("https://example.com/lifts.csv".to_string(), EXERCISE_CSV.to_string()),
            ("https://example.com/fitbit.csv".to_string(), TRACKER_CSV.to_string()),
        ]));
        (config, fetcher)
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_fatigue_end_to_end() {
        let (config, fetcher) = setup();
        let dashboard = Dashboard::new(&config, &fetcher).with_reference(reference());

        let rows = dashboard.fatigue().unwrap();
        assert_eq!(rows.len(), 4);
        // Back: 1500 / 66.67 = 22.5, Chest: 3375 / 157.5 = 21.4
        assert_eq!(rows.last().unwrap().muscle_group, "Back");
        assert_eq!(rows[2].muscle_group, "Chest");
        assert!(rows.iter().filter(|r| !r.active).all(|r| r.ratio == 0.0));
    }

    #[test]
    fn test_highlights_end_to_end() {
        let (config, fetcher) = setup();
        let dashboard = Dashboard::new(&config, &fetcher).with_reference(reference());

        let weight = dashboard.highlights(TrackerColumn::Weight).unwrap();
        assert_eq!(weight.max.record.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(weight.max_value(TrackerColumn::Weight), Some(160.0));
        assert_eq!(dashboard.record_count().unwrap(), 3);
    }

    #[test]
    fn test_window_applies_to_views() {
        let (config, fetcher) = setup();
        let dashboard = Dashboard::new(&config, &fetcher).with_reference(reference());

        let all = dashboard.lift_metric(TimeWindow::AllTime, LiftMetric::Volume).unwrap();
        let recent = dashboard
            .lift_metric(TimeWindow::LastThreeMonths, LiftMetric::Volume)
            .unwrap();
        assert_eq!(all.len(), 4);
        // Cutoff is 2023-12-01, so everything is inside the window
        assert_eq!(recent.len(), 4);

        let later = Dashboard::new(&config, &fetcher)
            .with_reference(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        let sections = later
            .lift_metric(TimeWindow::LastThreeMonths, LiftMetric::ProjectedOneRepMax)
            .unwrap();
        let muscles: Vec<_> = sections.iter().map(|s| s.muscle_group.as_str()).collect();
        assert_eq!(muscles, vec!["Abs", "Back", "Chest"]);
    }

    #[test]
    fn test_weight_histogram_respects_window() {
        let (config, fetcher) = setup();
        let dashboard = Dashboard::new(&config, &fetcher).with_reference(reference());

        let all = dashboard.weight_histogram(TimeWindow::AllTime, 2).unwrap();
        assert_eq!(all.total(), 2);
        assert_eq!(all.bins.len(), 2);

        // Cutoff is 2024-02-01, leaving the single 160 lb weigh-in
        let later = Dashboard::new(&config, &fetcher)
            .with_reference(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        let recent = later.weight_histogram(TimeWindow::LastThreeMonths, 2).unwrap();
        assert_eq!(recent.bins.len(), 1);
        assert_eq!(recent.total(), 1);
    }

    #[test]
    fn test_unavailable_source_propagates() {
        let (mut config, fetcher) = setup();
        config.tracker_source = Source::from("https://example.com/missing.csv");
        let dashboard = Dashboard::new(&config, &fetcher);
        assert!(matches!(
            dashboard.highlights(TrackerColumn::Steps),
            Err(Error::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(Dashboard::format_count(1234567.0), "1,234,567");
        assert_eq!(Dashboard::format_count(999.9), "999");
        assert_eq!(Dashboard::format_count(-1500.0), "-1,500");
        assert_eq!(Dashboard::format_measure(180.5), "180.5");
        assert_eq!(Dashboard::format_measure(10234.0), "10,234");
    }
}
