//! Healthdash CLI
//!
//! Command-line interface for the exercise and fitness-tracker dashboard.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use healthdash_core::{
    derive::format_sleep,
    export::{ExportFormat, Exporter},
    views::{Histogram, LiftMetric, OverviewPoint, SetsRepsChart, HISTOGRAM_BINS},
    Dashboard, DashboardConfig, HttpFetcher, Source, SummaryTable, TimeWindow, TrackerColumn,
};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthdash")]
#[command(about = "Personal exercise and fitness-tracker dashboard")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exercise log URL or path, overriding the config
    #[arg(long, global = true)]
    exercise_source: Option<String>,

    /// Fitness-tracker log URL or path, overriding the config
    #[arg(long, global = true)]
    tracker_source: Option<String>,

    /// Reference date for time windows and fatigue (YYYY-MM-DD, defaults to today)
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show muscle fatigue over the last 48 hours
    Fatigue,

    /// Show highlight cards for the tracker metrics
    Highlights,

    /// Show lift volume per muscle group
    Volume {
        /// Time window (all, last-three-months)
        #[arg(short, long, default_value = "all")]
        window: String,

        /// Show the per-day overview across all exercises instead
        #[arg(long)]
        overview: bool,
    },

    /// Show projected one-rep max per muscle group
    OneRepMax {
        /// Time window (all, last-three-months)
        #[arg(short, long, default_value = "all")]
        window: String,

        /// Show the per-day overview with running maximum instead
        #[arg(long)]
        overview: bool,
    },

    /// Show per-exercise details: last set and recent sets and reps
    Exercises {
        /// Time window (all, last-three-months)
        #[arg(short, long, default_value = "all")]
        window: String,

        /// Only show this muscle group
        #[arg(short, long)]
        muscle: Option<String>,
    },

    /// Show the number of exercises logged per day
    Calendar,

    /// Show a tracker metric over time with its 30-day rolling mean
    Tracker {
        /// Column (steps, weight, sleep, sleep-hours, resting-heart-rate)
        #[arg(short, long, default_value = "steps")]
        column: String,

        /// Time window (all, last-three-months)
        #[arg(short, long, default_value = "all")]
        window: String,

        /// Number of most recent days to show
        #[arg(short, long, default_value = "14")]
        limit: usize,

        /// Show the body-weight distribution instead of a series
        #[arg(long)]
        histogram: bool,

        /// Number of histogram bins
        #[arg(long, default_value_t = HISTOGRAM_BINS)]
        bins: usize,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export (entries, fatigue, highlights, calendar)
        #[arg(short, long, default_value = "entries")]
        report: String,

        /// Output format (csv or json)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Time window for entries (all, last-three-months)
        #[arg(short, long, default_value = "all")]
        window: String,
    },
}

#[derive(Tabled)]
struct FatigueTableRow {
    #[tabled(rename = "Muscle Group")]
    muscle_group: String,
    #[tabled(rename = "Volume (48h)")]
    volume: String,
    #[tabled(rename = "Mean 1RM")]
    mean_1rm: String,
    #[tabled(rename = "Fatigue")]
    ratio: String,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Date")]
    date: String,
}

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Exercise")]
    exercise: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Per Arm")]
    per_arm: String,
}

#[derive(Tabled)]
struct OverviewRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Exercise")]
    exercise: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Best So Far")]
    trend: String,
}

#[derive(Tabled)]
struct SetRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Sets")]
    sets: u32,
    #[tabled(rename = "Reps")]
    reps: u32,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Per Arm")]
    per_arm: String,
}

#[derive(Tabled)]
struct BinRow {
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Days")]
    count: usize,
    #[tabled(rename = "")]
    bar: String,
}

#[derive(Tabled)]
struct TrackerRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "30-day Mean")]
    rolling_mean: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("healthdash=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::load_default()?,
    };
    if let Some(source) = cli.exercise_source {
        config.exercise_source = Source::from(source);
    }
    if let Some(source) = cli.tracker_source {
        config.tracker_source = Source::from(source);
    }

    let fetcher = HttpFetcher::new(config.fetch_timeout());
    let mut dashboard = Dashboard::new(&config, &fetcher);
    if let Some(today) = &cli.today {
        let reference = NaiveDate::parse_from_str(today, "%Y-%m-%d")
            .with_context(|| format!("Invalid --today date: {}", today))?;
        dashboard = dashboard.with_reference(reference);
    }
    debug!("Reference date {}", dashboard.reference());

    match cli.command {
        Commands::Fatigue => show_fatigue(&dashboard),
        Commands::Highlights => show_highlights(&dashboard),

        Commands::Volume { window, overview } => {
            let window = TimeWindow::from_selector(&window);
            if overview {
                show_overview(&dashboard.volume_overview(window)?, "Volume Overview", window)
            } else {
                show_lift_metric(&dashboard, window, LiftMetric::Volume)
            }
        }

        Commands::OneRepMax { window, overview } => {
            let window = TimeWindow::from_selector(&window);
            if overview {
                show_overview(
                    &dashboard.one_rep_max_overview(window)?,
                    "Projected 1RM Overview",
                    window,
                )
            } else {
                show_lift_metric(&dashboard, window, LiftMetric::ProjectedOneRepMax)
            }
        }

        Commands::Exercises { window, muscle } => {
            show_exercises(&dashboard, TimeWindow::from_selector(&window), muscle.as_deref())
        }

        Commands::Calendar => {
            let table = dashboard.calendar()?;
            print_heading("Workout Calendar", 40);
            print_summary_table(&table);
            Ok(())
        }

        Commands::Tracker {
            column,
            window,
            limit,
            histogram,
            bins,
        } => {
            let window = TimeWindow::from_selector(&window);
            if histogram {
                return show_histogram(&dashboard, window, bins);
            }
            let Some(column) = TrackerColumn::parse(&column) else {
                bail!("Unknown tracker column: {}", column);
            };
            show_tracker(&dashboard, column, window, limit)
        }

        Commands::Export {
            report,
            format,
            output,
            window,
        } => {
            let window = TimeWindow::from_selector(&window);
            let export_format = ExportFormat::parse(&format).unwrap_or(ExportFormat::Json);
            let exporter = Exporter::new(&dashboard);

            let writer: Box<dyn Write> = match output {
                Some(path) => Box::new(File::create(path)?),
                None => Box::new(io::stdout()),
            };

            match report.to_lowercase().as_str() {
                "entries" => exporter.export(writer, window, export_format)?,
                "fatigue" => exporter.export_fatigue(writer, export_format)?,
                "highlights" => exporter.export_highlights(writer, export_format)?,
                "calendar" => Exporter::export_table(writer, &dashboard.calendar()?, export_format)?,
                other => bail!("Unknown report: {}", other),
            }

            Ok(())
        }
    }
}

fn print_heading(title: &str, width: usize) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "─".repeat(width));
}

fn print_no_data(what: &str) {
    println!("\n{}", format!("No {} data available.", what).yellow());
}

fn number(value: f64) -> String {
    Dashboard::format_measure((value * 10.0).round() / 10.0)
}

fn print_summary_table(table: &SummaryTable) {
    if table.is_empty() {
        print_no_data("table");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(table.headers());
    for row in &table.rows {
        let cells: Vec<String> = row
            .keys
            .iter()
            .map(|k| k.to_string())
            .chain(
                row.values
                    .iter()
                    .map(|v| v.as_ref().map(|f| f.to_string()).unwrap_or_else(|| "-".to_string())),
            )
            .collect();
        builder.push_record(cells);
    }
    println!("{}", builder.build().with(Style::rounded()));
}

fn show_fatigue(dashboard: &Dashboard) -> Result<()> {
    let rows = dashboard.fatigue()?;

    if rows.is_empty() {
        print_no_data("fatigue");
        return Ok(());
    }

    print_heading(
        &format!("Muscle Fatigue (48h ending {})", dashboard.reference()),
        50,
    );

    let table_rows: Vec<FatigueTableRow> = rows
        .into_iter()
        .map(|row| FatigueTableRow {
            ratio: if row.active {
                format!("{:.2}", row.ratio)
            } else {
                "-".to_string()
            },
            volume: number(row.total_volume),
            mean_1rm: number(row.mean_projected_1rm),
            muscle_group: row.muscle_group,
        })
        .collect();

    let table = Table::new(table_rows).with(Style::rounded()).to_string();
    println!("{}", table);

    Ok(())
}

fn show_highlights(dashboard: &Dashboard) -> Result<()> {
    let days = dashboard.record_count()?;
    print_heading("Tracker Highlights", 40);
    println!("Days tracked: {}", Dashboard::format_count(days as f64).bold());

    for column in TrackerColumn::HIGHLIGHTED {
        let card = match dashboard.highlights(column) {
            Ok(card) => card,
            Err(e) if e.is_empty_result() => {
                print_no_data(&column.to_string());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let show = |value: f64| {
            if column == TrackerColumn::TotalSleepMinutes {
                format_sleep(value)
            } else {
                format!("{} {}", number(value), column.units())
            }
        };

        let extreme = |label: &str, value: Option<f64>, date: NaiveDate| StatRow {
            metric: label.to_string(),
            value: value.map(show).unwrap_or_else(|| "-".to_string()),
            date: date.to_string(),
        };

        let rows = vec![
            extreme("Max", card.max_value(column), card.max.record.date),
            extreme("Min", card.min_value(column), card.min.record.date),
            StatRow {
                metric: "Mean".to_string(),
                value: show(card.mean),
                date: String::new(),
            },
            StatRow {
                metric: "Median".to_string(),
                value: show(card.median),
                date: String::new(),
            },
            StatRow {
                metric: "Mode".to_string(),
                value: show(card.mode),
                date: String::new(),
            },
        ];

        println!("\n{}", card.column.bold());
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    Ok(())
}

fn show_lift_metric(dashboard: &Dashboard, window: TimeWindow, metric: LiftMetric) -> Result<()> {
    let sections = dashboard.lift_metric(window, metric)?;

    if sections.is_empty() {
        print_no_data(metric.label());
        return Ok(());
    }

    print_heading(&format!("{} ({})", metric.label(), window), 60);

    for section in sections {
        println!("\n{}", section.muscle_group.bold());
        if section.points.is_empty() {
            print_no_data("weighted");
            continue;
        }

        let rows: Vec<PointRow> = section
            .points
            .into_iter()
            .map(|p| PointRow {
                date: p.date.to_string(),
                exercise: p.exercise,
                value: number(p.value),
                per_arm: p.per_arm.unwrap_or("-").to_string(),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    Ok(())
}

fn show_overview(points: &[OverviewPoint], title: &str, window: TimeWindow) -> Result<()> {
    if points.is_empty() {
        print_no_data("overview");
        return Ok(());
    }

    print_heading(&format!("{} ({})", title, window), 60);

    let rows: Vec<OverviewRow> = points
        .iter()
        .map(|p| OverviewRow {
            date: p.date.to_string(),
            exercise: p.exercise.clone(),
            value: number(p.value),
            trend: p.trend.map(number).unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    Ok(())
}

fn show_exercises(dashboard: &Dashboard, window: TimeWindow, muscle: Option<&str>) -> Result<()> {
    let breakdown = dashboard.exercise_breakdown(window)?;
    let sections: Vec<_> = breakdown
        .into_iter()
        .filter(|m| muscle.map_or(true, |name| m.muscle_group.eq_ignore_ascii_case(name)))
        .collect();

    if sections.is_empty() {
        print_no_data("exercise");
        return Ok(());
    }

    for section in sections {
        print_heading(&section.muscle_group, 60);
        if let Some(entry) = &section.catalog {
            println!("{}", entry.description.dimmed());
        }

        for detail in section.exercises {
            println!("\n{}", detail.exercise.bold().green());
            if let Some(entry) = &detail.catalog {
                println!("{}", entry.description.dimmed());
                if let Some(video) = &entry.video {
                    println!("Video: {}", video);
                }
            }
            if let Some(last) = &detail.last_set {
                let difficulty = last.difficulty.as_deref().unwrap_or("-");
                println!(
                    "Last set: {} on {} ({})",
                    last.scheme().bold(),
                    last.date,
                    difficulty
                );
            }
            print_summary_table(&detail.recent_sets);
            print_sets_reps(&detail.chart);
        }
    }

    Ok(())
}

fn show_tracker(
    dashboard: &Dashboard,
    column: TrackerColumn,
    window: TimeWindow,
    limit: usize,
) -> Result<()> {
    let series = dashboard.tracker_series(window, column)?;

    if series.points.is_empty() {
        print_no_data(&series.column);
        return Ok(());
    }

    print_heading(&format!("{} ({})", series.column, window), 50);

    let skip = series.points.len().saturating_sub(limit);
    let rows: Vec<TrackerRow> = series
        .points
        .iter()
        .skip(skip)
        .map(|p| TrackerRow {
            date: p.date.to_string(),
            value: p
                .label
                .clone()
                .unwrap_or_else(|| format!("{} {}", number(p.value), series.units)),
            rolling_mean: p.rolling_mean.map(number).unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    Ok(())
}

fn print_sets_reps(chart: &SetsRepsChart) {
    if chart.points.is_empty() {
        return;
    }

    let join = |values: &[u32]| {
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!(
        "Sets: {}  Reps: {}",
        join(&chart.sets_order),
        join(&chart.reps_order)
    );

    let table = Table::new(set_rows(chart)).with(Style::rounded()).to_string();
    println!("{}", table);
}

fn set_rows(chart: &SetsRepsChart) -> Vec<SetRow> {
    chart
        .points
        .iter()
        .map(|p| SetRow {
            date: p.date.to_string(),
            sets: p.sets,
            reps: p.reps,
            weight: number(p.weight),
            per_arm: p.per_arm.unwrap_or("-").to_string(),
        })
        .collect()
}

fn show_histogram(dashboard: &Dashboard, window: TimeWindow, bins: usize) -> Result<()> {
    let histogram: Histogram = match dashboard.weight_histogram(window, bins) {
        Ok(histogram) => histogram,
        Err(e) if e.is_empty_result() => {
            print_no_data("weight");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    print_heading(&format!("{} Distribution ({})", histogram.column, window), 50);

    let peak = histogram.bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let rows: Vec<BinRow> = histogram
        .bins
        .iter()
        .map(|b| BinRow {
            range: format!("{} - {} {}", number(b.lower), number(b.upper), histogram.units),
            count: b.count,
            bar: "█".repeat(b.count * 30 / peak),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthdash_core::views::SetPoint;

    #[test]
    fn test_set_rows_follow_chart_points() {
        let chart = SetsRepsChart {
            muscle_group: "Back".to_string(),
            exercise: "Dumbbell Rows".to_string(),
            sets_order: vec![3],
            reps_order: vec![8, 10],
            points: vec![
                SetPoint {
                    date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
                    sets: 3,
                    reps: 10,
                    weight: 50.0,
                    per_arm: Some("Yes"),
                },
                SetPoint {
                    date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    sets: 3,
                    reps: 8,
                    weight: 57.5,
                    per_arm: None,
                },
            ],
        };

        let rows = set_rows(&chart);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-04-02");
        assert_eq!(rows[0].weight, "50");
        assert_eq!(rows[0].per_arm, "Yes");
        assert_eq!(rows[1].reps, 8);
        assert_eq!(rows[1].weight, "57.5");
        assert_eq!(rows[1].per_arm, "-");

        let table = Table::new(rows).to_string();
        assert!(table.contains("Per Arm"));
    }
}
