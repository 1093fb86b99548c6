//! Muscle fatigue over the trailing 48 hours

use crate::{
    aggregate::{category_order, group_by, Agg, Field},
    derive::{ExerciseColumn, ExerciseEntry},
    window, Result,
};
use chrono::NaiveDate;
use serde::Serialize;

/// Days counted back from the reference date
pub const FATIGUE_WINDOW_DAYS: u64 = 2;

/// Fatigue for one muscle group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FatigueRow {
    pub muscle_group: String,
    pub total_volume: f64,
    pub mean_projected_1rm: f64,
    /// `total_volume / mean_projected_1rm`
    pub ratio: f64,
    /// False when the group had no weighed sets in the window. Such groups
    /// report a ratio of 0, which means "no recent load" rather than a
    /// computed quotient.
    pub active: bool,
}

/// Summed volume over mean projected 1RM per muscle group, for rows dated on
/// or after `reference - 2 days`.
///
/// Every muscle group seen anywhere in `entries` gets a row, so inactive
/// groups still show up (with ratio 0). Rows are sorted by ascending ratio.
pub fn fatigue_ratios(entries: &[ExerciseEntry], reference: NaiveDate) -> Result<Vec<FatigueRow>> {
    let recent = window::trailing_days(entries, FATIGUE_WINDOW_DAYS, reference);
    let table = group_by(
        &recent,
        &[ExerciseColumn::MuscleGroup],
        &[
            (ExerciseColumn::Volume, Agg::Sum),
            (ExerciseColumn::ProjectedOneRepMax, Agg::Mean),
        ],
    )?;

    let mut rows: Vec<FatigueRow> = category_order(entries, ExerciseColumn::MuscleGroup)
        .into_iter()
        .filter_map(|muscle| {
            let name = muscle.as_text()?.to_string();
            let values = table.find(&[muscle]).map(|row| &row.values);
            let total_volume = values
                .and_then(|v| v[0].as_ref())
                .and_then(Field::as_number);
            let mean_1rm = values
                .and_then(|v| v[1].as_ref())
                .and_then(Field::as_number);

            Some(match (total_volume, mean_1rm) {
                (Some(volume), Some(mean)) if mean > 0.0 => FatigueRow {
                    muscle_group: name,
                    total_volume: volume,
                    mean_projected_1rm: mean,
                    ratio: volume / mean,
                    active: true,
                },
                _ => FatigueRow {
                    muscle_group: name,
                    total_volume: 0.0,
                    mean_projected_1rm: 0.0,
                    ratio: 0.0,
                    active: false,
                },
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.ratio
            .total_cmp(&b.ratio)
            .then_with(|| a.muscle_group.cmp(&b.muscle_group))
    });
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::derive_exercise;
    use crate::ExerciseRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lift(d: NaiveDate, muscle: &str, sets: u32, reps: u32, weight: Option<f64>) -> ExerciseRecord {
        ExerciseRecord::new(d, muscle, format!("{} lift", muscle)).with_sets(sets, reps, weight)
    }

    #[test]
    fn test_every_muscle_group_present() {
        let reference = date(2024, 3, 10);
        let entries = derive_exercise(vec![
            lift(date(2024, 1, 5), "Legs", 5, 5, Some(200.0)),
            lift(date(2024, 3, 9), "Back", 3, 10, Some(60.0)),
            lift(date(2024, 3, 10), "Back", 3, 10, Some(60.0)),
            lift(date(2024, 3, 8), "Chest", 3, 0, Some(100.0)),
            lift(date(2024, 3, 7), "Shoulders", 3, 10, Some(40.0)),
        ]);

        let rows = fatigue_ratios(&entries, reference).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.muscle_group.as_str()).collect();
        // Zero ratios tie and fall back to name order
        assert_eq!(names, vec!["Chest", "Legs", "Shoulders", "Back"]);

        // Chest: zero reps, so volume is 0 and 1RM is the weight itself
        let chest = &rows[0];
        assert!(chest.active);
        assert_eq!(chest.ratio, 0.0);
        assert_eq!(chest.mean_projected_1rm, 100.0);

        let legs = &rows[1];
        assert_eq!(legs.ratio, 0.0);
        assert!(!legs.active);
        assert!(!rows[2].active);

        // Back: volume 2 * 1800, mean 1RM 80
        let back = &rows[3];
        assert!(back.active);
        assert_eq!(back.total_volume, 3600.0);
        assert_eq!(back.mean_projected_1rm, 60.0 * (1.0 + 10.0 / 30.0));
        assert_eq!(back.ratio, 3600.0 / (60.0 * (1.0 + 10.0 / 30.0)));
    }

    #[test]
    fn test_weightless_recent_rows_report_zero() {
        let reference = date(2024, 3, 10);
        let entries = derive_exercise(vec![lift(date(2024, 3, 10), "Abs", 3, 20, None)]);
        let rows = fatigue_ratios(&entries, reference).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ratio, 0.0);
        assert!(!rows[0].active);
    }

    #[test]
    fn test_empty_log() {
        assert!(fatigue_ratios(&[], date(2024, 3, 10)).unwrap().is_empty());
    }
}
