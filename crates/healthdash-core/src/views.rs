//! Structured results for each dashboard chart and table
//!
//! Views take rows that have already been through the time-window filter.
//! Where a view also needs the unfiltered log (stable series order, recent
//! set history), it takes both.

use crate::{
    aggregate::{category_order, group_by, Agg, Column, Field, SummaryTable, Tabular},
    config::{CatalogEntry, DashboardConfig},
    derive::{ExerciseColumn, ExerciseEntry, TrackerColumn, TrackerEntry},
    error::Error,
    Result,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Trailing row count for tracker trend lines
pub const ROLLING_WINDOW: usize = 30;

/// Default bin count for the weight distribution
pub const HISTOGRAM_BINS: usize = 20;

/// The lift metrics charted per muscle group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiftMetric {
    Volume,
    ProjectedOneRepMax,
}

impl LiftMetric {
    pub fn column(self) -> ExerciseColumn {
        match self {
            LiftMetric::Volume => ExerciseColumn::Volume,
            LiftMetric::ProjectedOneRepMax => ExerciseColumn::ProjectedOneRepMax,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LiftMetric::Volume => "Lift Volume",
            LiftMetric::ProjectedOneRepMax => "Projected 1RM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub exercise: String,
    pub value: f64,
    pub per_arm: Option<&'static str>,
}

/// One muscle group's chart: exercises in axis order plus their points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuscleSection {
    pub muscle_group: String,
    pub exercise_order: Vec<String>,
    pub points: Vec<MetricPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetPoint {
    pub date: NaiveDate,
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
    pub per_arm: Option<&'static str>,
}

/// Weight over time for one exercise, faceted by sets and coloured by reps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetsRepsChart {
    pub muscle_group: String,
    pub exercise: String,
    /// Set counts present in the filtered rows
    pub sets_order: Vec<u32>,
    /// Rep counts across the whole log, so a rep count keeps its colour under any window
    pub reps_order: Vec<u32>,
    pub points: Vec<SetPoint>,
}

/// The most recent set logged for an exercise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastSet {
    pub date: NaiveDate,
    pub sets: u32,
    pub reps: u32,
    pub weight: Option<f64>,
    pub difficulty: Option<String>,
}

impl LastSet {
    /// `sets x reps x weight`, e.g. `3x10x135`
    pub fn scheme(&self) -> String {
        let weight = self
            .weight
            .map(|w| Field::Number(w).to_string())
            .unwrap_or_else(|| "-".to_string());
        format!("{}x{}x{}", self.sets, self.reps, weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseDetail {
    pub exercise: String,
    pub catalog: Option<CatalogEntry>,
    pub last_set: Option<LastSet>,
    pub recent_sets: SummaryTable,
    pub chart: SetsRepsChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuscleExercises {
    pub muscle_group: String,
    pub catalog: Option<CatalogEntry>,
    pub exercises: Vec<ExerciseDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewPoint {
    pub date: NaiveDate,
    pub exercise: String,
    pub value: f64,
    /// Running maximum per exercise, where the overview carries one
    pub trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub rolling_mean: Option<f64>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSeries {
    pub column: String,
    pub units: &'static str,
    pub points: Vec<TrackerPoint>,
}

fn texts(fields: Vec<Field>) -> Vec<String> {
    fields
        .into_iter()
        .filter_map(|f| f.as_text().map(str::to_string))
        .collect()
}

fn counts(fields: Vec<Field>) -> Vec<u32> {
    fields
        .into_iter()
        .filter_map(|f| f.as_number())
        .map(|n| n as u32)
        .collect()
}

fn rows_for_muscle(entries: &[ExerciseEntry], muscle_group: &str) -> Vec<ExerciseEntry> {
    entries
        .iter()
        .filter(|e| e.record.muscle_group == muscle_group)
        .cloned()
        .collect()
}

fn rows_for_exercise(entries: &[ExerciseEntry], muscle_group: &str, exercise: &str) -> Vec<ExerciseEntry> {
    entries
        .iter()
        .filter(|e| e.is(muscle_group, exercise))
        .cloned()
        .collect()
}

/// Sorted muscle groups present in `entries`
pub fn muscle_groups(entries: &[ExerciseEntry]) -> Vec<String> {
    texts(category_order(entries, ExerciseColumn::MuscleGroup))
}

/// One section per muscle group, each listing its exercises and metric points
pub fn metric_by_muscle(entries: &[ExerciseEntry], metric: LiftMetric) -> Vec<MuscleSection> {
    muscle_groups(entries)
        .into_iter()
        .map(|muscle_group| {
            let rows = rows_for_muscle(entries, &muscle_group);
            let exercise_order = texts(category_order(&rows, ExerciseColumn::Exercise));
            let mut points: Vec<MetricPoint> = rows
                .iter()
                .filter_map(|e| {
                    let value = e.field(metric.column())?.as_number()?;
                    Some(MetricPoint {
                        date: e.record.date,
                        exercise: e.record.exercise.clone(),
                        value,
                        per_arm: e.per_arm_label,
                    })
                })
                .collect();
            points.sort_by_key(|p| p.date);

            MuscleSection {
                muscle_group,
                exercise_order,
                points,
            }
        })
        .collect()
}

pub fn sets_reps(
    full: &[ExerciseEntry],
    filtered: &[ExerciseEntry],
    muscle_group: &str,
    exercise: &str,
) -> SetsRepsChart {
    let rows = rows_for_exercise(filtered, muscle_group, exercise);
    let mut points: Vec<SetPoint> = rows
        .iter()
        .filter_map(|e| {
            Some(SetPoint {
                date: e.record.date,
                sets: e.record.sets,
                reps: e.record.reps,
                weight: e.record.weight?,
                per_arm: e.per_arm_label,
            })
        })
        .collect();
    points.sort_by_key(|p| p.date);

    SetsRepsChart {
        muscle_group: muscle_group.to_string(),
        exercise: exercise.to_string(),
        sets_order: counts(category_order(&rows, ExerciseColumn::Sets)),
        reps_order: counts(category_order(full, ExerciseColumn::Reps)),
        points,
    }
}

/// Most recent per-arm flag, weight, and difficulty for each (sets, reps) scheme
pub fn recent_sets(full: &[ExerciseEntry], muscle_group: &str, exercise: &str) -> Result<SummaryTable> {
    group_by(
        &rows_for_exercise(full, muscle_group, exercise),
        &[ExerciseColumn::Sets, ExerciseColumn::Reps],
        &[
            (ExerciseColumn::PerArm, Agg::Last),
            (ExerciseColumn::Weight, Agg::Last),
            (ExerciseColumn::Difficulty, Agg::Last),
        ],
    )
}

pub fn last_set(entries: &[ExerciseEntry], muscle_group: &str, exercise: &str) -> Option<LastSet> {
    entries
        .iter()
        .filter(|e| e.is(muscle_group, exercise))
        .max_by_key(|e| e.record.date)
        .map(|e| LastSet {
            date: e.record.date,
            sets: e.record.sets,
            reps: e.record.reps,
            weight: e.record.weight,
            difficulty: e.record.difficulty.clone(),
        })
}

/// Per muscle group and exercise: catalog text, last set, recent sets, and chart
pub fn exercise_breakdown(
    full: &[ExerciseEntry],
    filtered: &[ExerciseEntry],
    config: &DashboardConfig,
) -> Result<Vec<MuscleExercises>> {
    muscle_groups(filtered)
        .into_iter()
        .map(|muscle_group| {
            let rows = rows_for_muscle(filtered, &muscle_group);
            let exercises = texts(category_order(&rows, ExerciseColumn::Exercise))
                .into_iter()
                .map(|exercise| {
                    Ok(ExerciseDetail {
                        catalog: config.describe(&exercise).cloned(),
                        last_set: last_set(&rows, &muscle_group, &exercise),
                        recent_sets: recent_sets(full, &muscle_group, &exercise)?,
                        chart: sets_reps(full, filtered, &muscle_group, &exercise),
                        exercise,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(MuscleExercises {
                catalog: config.describe(&muscle_group).cloned(),
                muscle_group,
                exercises,
            })
        })
        .collect()
}

/// Exercises logged per day; rows without a weight still count
pub fn calendar(entries: &[ExerciseEntry]) -> Result<SummaryTable> {
    group_by(
        entries,
        &[ExerciseColumn::Date],
        &[(ExerciseColumn::Exercise, Agg::Count)],
    )
}

/// Volume summed per day and exercise
pub fn volume_overview(entries: &[ExerciseEntry]) -> Result<Vec<OverviewPoint>> {
    let table = group_by(
        entries,
        &[ExerciseColumn::Date, ExerciseColumn::Exercise],
        &[(ExerciseColumn::Volume, Agg::Sum)],
    )?;
    Ok(overview_points(&table).collect())
}

/// Best projected 1RM per day and exercise, with each exercise's running maximum
pub fn one_rep_max_overview(entries: &[ExerciseEntry]) -> Result<Vec<OverviewPoint>> {
    let table = group_by(
        entries,
        &[ExerciseColumn::Date, ExerciseColumn::Exercise],
        &[(ExerciseColumn::ProjectedOneRepMax, Agg::Max)],
    )?;

    // Rows arrive in date order, so a running max per exercise is an expanding max
    let mut best: HashMap<String, f64> = HashMap::new();
    Ok(overview_points(&table)
        .map(|mut point| {
            let peak = best.entry(point.exercise.clone()).or_insert(point.value);
            *peak = peak.max(point.value);
            point.trend = Some(*peak);
            point
        })
        .collect())
}

fn overview_points(table: &SummaryTable) -> impl Iterator<Item = OverviewPoint> + '_ {
    table.rows.iter().filter_map(|row| {
        Some(OverviewPoint {
            date: row.keys.first()?.as_date()?,
            exercise: row.keys.get(1)?.as_text()?.to_string(),
            value: row.values.first()?.as_ref()?.as_number()?,
            trend: None,
        })
    })
}

/// Date-ordered points of a tracker column with a trailing rolling mean
pub fn tracker_series(entries: &[TrackerEntry], column: TrackerColumn) -> Result<TrackerSeries> {
    if !column.is_numeric() {
        return Err(Error::schema(
            "tracker series",
            format!("column \"{}\" is not numeric", column.name()),
        ));
    }

    let mut present: Vec<(&TrackerEntry, f64)> = entries
        .iter()
        .filter_map(|e| Some((e, e.field(column)?.as_number()?)))
        .collect();
    present.sort_by_key(|(e, _)| e.record.date);

    let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
    let trend = rolling_mean(&values, ROLLING_WINDOW);

    let points = present
        .into_iter()
        .zip(trend)
        .map(|((entry, value), rolling_mean)| TrackerPoint {
            date: entry.record.date,
            value,
            rolling_mean,
            label: if column.is_sleep() {
                entry.sleep_readable.clone()
            } else {
                None
            },
        })
        .collect();

    Ok(TrackerSeries {
        column: column.name().to_string(),
        units: column.units(),
        points,
    })
}

/// One equal-width bin; `upper` is exclusive except on the last bin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub units: &'static str,
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Distribution of a tracker column over `bins` equal-width bins spanning
/// its min to max. A zero bin count is treated as one bin, and a column
/// whose values are all equal collapses into a single bin.
pub fn histogram(entries: &[TrackerEntry], column: TrackerColumn, bins: usize) -> Result<Histogram> {
    if !column.is_numeric() {
        return Err(Error::schema(
            "histogram",
            format!("column \"{}\" is not numeric", column.name()),
        ));
    }

    let values: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.field(column)?.as_number())
        .collect();
    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Err(Error::EmptyResult(format!("no values for \"{}\"", column.name())));
    };

    let bins = if max > min { bins.max(1) } else { 1 };
    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for value in values {
        let index = if width > 0.0 {
            (((value - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        out[index].count += 1;
    }

    Ok(Histogram {
        column: column.name().to_string(),
        units: column.units(),
        bins: out,
    })
}

pub fn weight_histogram(entries: &[TrackerEntry], bins: usize) -> Result<Histogram> {
    histogram(entries, TrackerColumn::Weight, bins)
}

/// Mean of each trailing `window` values; `None` until the window fills
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let slice = &values[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{derive_exercise, derive_tracker};
    use crate::window::{filter, TimeWindow};
    use crate::{ExerciseRecord, TrackerRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lift(d: NaiveDate, muscle: &str, exercise: &str, sets: u32, reps: u32, weight: Option<f64>) -> ExerciseRecord {
        ExerciseRecord::new(d, muscle, exercise).with_sets(sets, reps, weight)
    }

    fn sample_log() -> Vec<ExerciseEntry> {
        let mut rows = vec![
            lift(date(2023, 6, 1), "Back", "Dumbbell Rows", 3, 12, Some(40.0)),
            lift(date(2024, 4, 2), "Back", "Dumbbell Rows", 3, 10, Some(50.0)),
            lift(date(2024, 5, 1), "Back", "Dumbbell Rows", 3, 10, Some(55.0)),
            lift(date(2024, 4, 20), "Back", "Pullups", 4, 8, None),
            lift(date(2024, 5, 1), "Chest", "Bench Press", 5, 5, Some(135.0)),
            lift(date(2023, 1, 10), "Legs", "Squat", 5, 3, Some(185.0)),
        ];
        rows[1].difficulty = Some("Easy".to_string());
        rows[2].difficulty = Some("Hard".to_string());
        rows[2].per_arm = Some(true);
        derive_exercise(rows)
    }

    #[test]
    fn test_metric_by_muscle_orders_categories() {
        let sections = metric_by_muscle(&sample_log(), LiftMetric::Volume);
        let muscles: Vec<_> = sections.iter().map(|s| s.muscle_group.as_str()).collect();
        assert_eq!(muscles, vec!["Back", "Chest", "Legs"]);

        let back = &sections[0];
        assert_eq!(back.exercise_order, vec!["Dumbbell Rows", "Pullups"]);
        // Pullups has no weight, so only the rows contribute points
        assert_eq!(back.points.len(), 3);
        assert_eq!(back.points[0].value, 40.0 * 36.0);
        assert!(back.points.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_reps_order_stable_across_windows() {
        let full = sample_log();
        let reference = date(2024, 5, 17);
        let recent = filter(&full, TimeWindow::LastThreeMonths, reference);

        let all_time = sets_reps(&full, &full, "Back", "Dumbbell Rows");
        let windowed = sets_reps(&full, &recent, "Back", "Dumbbell Rows");

        // 12 reps only appears before the window but keeps its slot
        assert_eq!(windowed.reps_order, vec![3, 5, 8, 10, 12]);
        assert_eq!(windowed.reps_order, all_time.reps_order);
        assert_eq!(windowed.sets_order, vec![3]);
        assert_eq!(windowed.points.len(), 2);
        assert!(windowed.points.iter().all(|p| p.reps == 10));
    }

    #[test]
    fn test_recent_sets_take_latest_per_scheme() {
        let table = recent_sets(&sample_log(), "Back", "Dumbbell Rows").unwrap();
        assert_eq!(table.len(), 2);

        let ten = [Field::from(3u32), Field::from(10u32)];
        assert_eq!(table.value(&ten, "Weight"), Some(&Field::Number(55.0)));
        assert_eq!(table.value(&ten, "Difficulty"), Some(&Field::from("Hard")));
        assert_eq!(table.value(&ten, "Per Arm"), Some(&Field::from("Yes")));
    }

    #[test]
    fn test_last_set_uses_latest_date() {
        let mut log = sample_log();
        log.reverse();
        let last = last_set(&log, "Back", "Dumbbell Rows").unwrap();
        assert_eq!(last.date, date(2024, 5, 1));
        assert_eq!(last.scheme(), "3x10x55");
        assert_eq!(last.difficulty.as_deref(), Some("Hard"));
        assert!(last_set(&log, "Back", "Deadlift").is_none());
    }

    #[test]
    fn test_exercise_breakdown_uses_catalog() {
        let full = sample_log();
        let config = DashboardConfig::default();
        let breakdown = exercise_breakdown(&full, &full, &config).unwrap();

        assert_eq!(breakdown.len(), 3);
        let back = &breakdown[0];
        assert!(back.catalog.is_some());
        assert_eq!(back.exercises.len(), 2);
        assert!(back.exercises[0].catalog.as_ref().and_then(|c| c.video.as_ref()).is_some());
        assert_eq!(back.exercises[1].exercise, "Pullups");
        assert!(back.exercises[1].chart.points.is_empty());
    }

    #[test]
    fn test_calendar_counts_weightless_rows() {
        let table = calendar(&sample_log()).unwrap();
        assert_eq!(table.value(&[Field::Date(date(2024, 4, 20))], "Exercise"), Some(&Field::Number(1.0)));
        assert_eq!(table.value(&[Field::Date(date(2024, 5, 1))], "Exercise"), Some(&Field::Number(2.0)));
    }

    #[test]
    fn test_one_rep_max_overview_trend() {
        let log = derive_exercise(vec![
            lift(date(2024, 1, 1), "Chest", "Bench Press", 5, 5, Some(135.0)),
            lift(date(2024, 1, 8), "Chest", "Bench Press", 5, 5, Some(125.0)),
            lift(date(2024, 1, 15), "Chest", "Bench Press", 5, 5, Some(145.0)),
        ]);
        let points = one_rep_max_overview(&log).unwrap();
        let trend: Vec<_> = points.iter().map(|p| p.trend.unwrap()).collect();
        let factor = 1.0 + 5.0 / 30.0;
        assert_eq!(trend, vec![135.0 * factor, 135.0 * factor, 145.0 * factor]);

        let volume = volume_overview(&log).unwrap();
        assert_eq!(volume.len(), 3);
        assert!(volume.iter().all(|p| p.trend.is_none()));
    }

    #[test]
    fn test_tracker_series_with_sleep_labels() {
        let rows: Vec<TrackerRecord> = (1..=3)
            .map(|d| {
                let mut r = TrackerRecord::new(date(2024, 1, d));
                r.total_sleep_minutes = Some(400.0 + d as f64 * 10.0);
                r
            })
            .collect();
        let series = tracker_series(&derive_tracker(rows), TrackerColumn::TotalSleepMinutes).unwrap();

        assert_eq!(series.points.len(), 3);
        assert_eq!(series.points[0].label.as_deref(), Some("6h 50m"));
        assert_eq!(series.units, "minutes");
        assert!(series.points.iter().all(|p| p.rolling_mean.is_none()));
    }

    #[test]
    fn test_rolling_mean() {
        assert_eq!(
            rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2),
            vec![None, Some(1.5), Some(2.5), Some(3.5)]
        );
        assert_eq!(rolling_mean(&[1.0], 0), vec![None]);
    }

    fn weigh_ins(weights: &[Option<f64>]) -> Vec<TrackerEntry> {
        derive_tracker(
            weights
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let mut r = TrackerRecord::new(date(2024, 1, 1 + i as u32));
                    r.weight = *w;
                    r
                })
                .collect(),
        )
    }

    #[test]
    fn test_weight_histogram_bins() {
        let rows = weigh_ins(&[Some(150.0), Some(152.0), None, Some(155.0), Some(160.0), Some(160.0)]);
        let hist = weight_histogram(&rows, 5).unwrap();

        assert_eq!(hist.bins.len(), 5);
        assert_eq!(hist.bins[0].lower, 150.0);
        assert_eq!(hist.bins[4].upper, 160.0);
        let counts: Vec<_> = hist.bins.iter().map(|b| b.count).collect();
        // The maximum lands in the last bin
        assert_eq!(counts, vec![1, 1, 1, 0, 2]);
        assert_eq!(hist.total(), 5);
        assert_eq!(hist.units, "lbs");
    }

    #[test]
    fn test_weight_histogram_degenerate_inputs() {
        let flat = weight_histogram(&weigh_ins(&[Some(170.0), Some(170.0)]), 10).unwrap();
        assert_eq!(flat.bins.len(), 1);
        assert_eq!(flat.bins[0].count, 2);
        assert_eq!((flat.bins[0].lower, flat.bins[0].upper), (170.0, 170.0));

        let one = weight_histogram(&weigh_ins(&[Some(150.0), Some(160.0)]), 0).unwrap();
        assert_eq!(one.bins.len(), 1);
        assert_eq!(one.total(), 2);

        let err = weight_histogram(&weigh_ins(&[None, None]), 10).unwrap_err();
        assert!(err.is_empty_result());
        assert!(matches!(
            histogram(&weigh_ins(&[Some(150.0)]), TrackerColumn::Date, 10),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
