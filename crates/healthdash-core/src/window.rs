//! Time-window filtering relative to an injected reference date

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rows that carry an observation date
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// The global time-window selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    AllTime,
    LastThreeMonths,
}

impl TimeWindow {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all time" | "all" | "alltime" | "all-time" => Some(TimeWindow::AllTime),
            "last three months" | "last-three-months" | "3months" | "3m" | "quarter" => {
                Some(TimeWindow::LastThreeMonths)
            }
            _ => None,
        }
    }

    /// Parse a selector value; anything unrecognized means all time
    pub fn from_selector(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::AllTime => "All Time",
            TimeWindow::LastThreeMonths => "Last Three Months",
        }
    }

    /// Earliest date kept by this window, if any
    pub fn cutoff(&self, reference: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeWindow::AllTime => None,
            TimeWindow::LastThreeMonths => {
                first_of_month(reference).checked_sub_months(Months::new(3))
            }
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Keep the rows inside `window`, preserving their order
pub fn filter<T: Dated + Clone>(rows: &[T], window: TimeWindow, reference: NaiveDate) -> Vec<T> {
    match window.cutoff(reference) {
        None => rows.to_vec(),
        Some(cutoff) => {
            let kept = since(rows, cutoff);
            debug!("{} window kept {} of {} rows", window, kept.len(), rows.len());
            kept
        }
    }
}

/// Rows dated on or after `cutoff`
pub fn since<T: Dated + Clone>(rows: &[T], cutoff: NaiveDate) -> Vec<T> {
    rows.iter().filter(|r| r.date() >= cutoff).cloned().collect()
}

/// Rows from the trailing `days` days, counted back from `reference` (not month-aligned)
pub fn trailing_days<T: Dated + Clone>(rows: &[T], days: u64, reference: NaiveDate) -> Vec<T> {
    let cutoff = reference.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
    since(rows, cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{derive_tracker, TrackerEntry};
    use crate::TrackerRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn records(dates: &[NaiveDate]) -> Vec<TrackerEntry> {
        derive_tracker(dates.iter().map(|d| TrackerRecord::new(*d)).collect())
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(TimeWindow::parse("All Time"), Some(TimeWindow::AllTime));
        assert_eq!(TimeWindow::parse("Last Three Months"), Some(TimeWindow::LastThreeMonths));
        assert_eq!(TimeWindow::parse("3months"), Some(TimeWindow::LastThreeMonths));
        assert_eq!(TimeWindow::parse("fortnight"), None);
        assert_eq!(TimeWindow::from_selector("fortnight"), TimeWindow::AllTime);
    }

    #[test]
    fn test_cutoff_is_month_aligned() {
        let reference = date(2024, 5, 17);
        assert_eq!(TimeWindow::LastThreeMonths.cutoff(reference), Some(date(2024, 2, 1)));
        assert_eq!(TimeWindow::AllTime.cutoff(reference), None);

        // Crosses a year boundary
        assert_eq!(TimeWindow::LastThreeMonths.cutoff(date(2024, 2, 29)), Some(date(2023, 11, 1)));
    }

    #[test]
    fn test_all_time_is_identity() {
        let rows = records(&[date(2019, 1, 1), date(2024, 5, 1), date(2021, 7, 4)]);
        assert_eq!(filter(&rows, TimeWindow::AllTime, date(2024, 5, 17)), rows);
    }

    #[test]
    fn test_last_three_months_bound() {
        let reference = date(2024, 5, 17);
        let rows = records(&[
            date(2024, 1, 31),
            date(2024, 2, 1),
            date(2024, 3, 15),
            date(2023, 12, 25),
            date(2024, 5, 17),
        ]);

        let kept = filter(&rows, TimeWindow::LastThreeMonths, reference);
        let cutoff = first_of_month(reference).checked_sub_months(Months::new(3)).unwrap();
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.record.date >= cutoff));
        assert_eq!(kept[0].record.date, date(2024, 2, 1));
    }

    #[test]
    fn test_trailing_days_not_month_aligned() {
        let reference = date(2024, 3, 2);
        let rows = records(&[date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1), date(2024, 3, 2)]);
        let kept = trailing_days(&rows, 2, reference);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].record.date, date(2024, 2, 29));
    }
}
