//! Group-by aggregation over in-memory rows
//!
//! Rows expose their columns through [`Tabular`]; [`group_by`] groups them on
//! key columns and reduces value columns with an [`Agg`]. Groups come back in
//! ascending key order, and every group is sorted by date before reducing so
//! that [`Agg::Last`] always means "most recent".

use crate::{error::Error, window::Dated, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// A single cell value
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Field {
    Date(NaiveDate),
    Number(f64),
    Text(String),
}

impl Field {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Field::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Field::Date(d) => Some(*d),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Field::Date(_) => 0,
            Field::Number(_) => 1,
            Field::Text(_) => 2,
        }
    }
}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Field::Date(a), Field::Date(b)) => a.cmp(b),
            (Field::Number(a), Field::Number(b)) => a.total_cmp(b),
            (Field::Text(a), Field::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Field {}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Field::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Field::Number(n) => write!(f, "{:.2}", n),
            Field::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Field {
    fn from(n: f64) -> Self {
        Field::Number(n)
    }
}

impl From<u32> for Field {
    fn from(n: u32) -> Self {
        Field::Number(n as f64)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

impl From<NaiveDate> for Field {
    fn from(d: NaiveDate) -> Self {
        Field::Date(d)
    }
}

/// A named column of some row type
pub trait Column: Copy + fmt::Debug {
    fn name(self) -> &'static str;
    fn is_numeric(self) -> bool;
}

/// Column access for a row type
pub trait Tabular: Dated {
    type Column: Column;

    /// The value in `column`, or `None` when the cell is missing
    fn field(&self, column: Self::Column) -> Option<Field>;
}

/// Reduction applied to one value column within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Agg {
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Mode,
    Last,
    Count,
}

impl Agg {
    pub fn name(&self) -> &'static str {
        match self {
            Agg::Sum => "sum",
            Agg::Mean => "mean",
            Agg::Min => "min",
            Agg::Max => "max",
            Agg::Median => "median",
            Agg::Mode => "mode",
            Agg::Last => "last",
            Agg::Count => "count",
        }
    }

    fn requires_numeric(&self) -> bool {
        matches!(self, Agg::Sum | Agg::Mean | Agg::Median)
    }
}

impl fmt::Display for Agg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueColumn {
    pub name: String,
    pub agg: Agg,
}

/// Sorted distinct values observed in a key column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryOrder {
    pub column: String,
    pub values: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub keys: Vec<Field>,
    pub values: Vec<Option<Field>>,
}

/// Result of a group-by: one row per distinct key tuple, ascending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub key_columns: Vec<String>,
    pub value_columns: Vec<ValueColumn>,
    pub rows: Vec<SummaryRow>,
    pub category_orders: Vec<CategoryOrder>,
}

impl SummaryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first value column named `name`
    pub fn value_index(&self, name: &str) -> Option<usize> {
        self.value_columns.iter().position(|c| c.name == name)
    }

    /// The row whose keys equal `keys`
    pub fn find(&self, keys: &[Field]) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.keys == keys)
    }

    /// Cell lookup by key tuple and value column name
    pub fn value(&self, keys: &[Field], name: &str) -> Option<&Field> {
        let index = self.value_index(name)?;
        self.find(keys)?.values.get(index)?.as_ref()
    }

    /// Header labels: key columns, then `column (agg)` for each value column
    pub fn headers(&self) -> Vec<String> {
        self.key_columns
            .iter()
            .cloned()
            .chain(
                self.value_columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.agg)),
            )
            .collect()
    }
}

/// Group `rows` by `keys` and reduce each `(column, agg)` pair per group.
///
/// Rows missing any key are dropped. Missing values are skipped by every
/// reduction; a group with no values left reduces to `None`, except
/// [`Agg::Count`], which reports zero.
pub fn group_by<R: Tabular>(
    rows: &[R],
    keys: &[R::Column],
    aggregations: &[(R::Column, Agg)],
) -> Result<SummaryTable> {
    for (column, agg) in aggregations {
        if agg.requires_numeric() && !column.is_numeric() {
            return Err(Error::schema(
                "aggregate",
                format!("cannot take {} of non-numeric column \"{}\"", agg, column.name()),
            ));
        }
    }

    let mut ordered: Vec<&R> = rows.iter().collect();
    ordered.sort_by_key(|r| r.date());

    let mut groups: BTreeMap<Vec<Field>, Vec<&R>> = BTreeMap::new();
    for row in ordered {
        let key: Option<Vec<Field>> = keys.iter().map(|k| row.field(*k)).collect();
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }

    let summary_rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|(keys, members)| SummaryRow {
            keys,
            values: aggregations
                .iter()
                .map(|(column, agg)| reduce(&members, *column, *agg))
                .collect(),
        })
        .collect();

    debug!(
        "Grouped {} rows into {} groups by {:?}",
        rows.len(),
        summary_rows.len(),
        keys
    );

    Ok(SummaryTable {
        key_columns: keys.iter().map(|k| k.name().to_string()).collect(),
        value_columns: aggregations
            .iter()
            .map(|(column, agg)| ValueColumn {
                name: column.name().to_string(),
                agg: *agg,
            })
            .collect(),
        rows: summary_rows,
        category_orders: keys
            .iter()
            .map(|k| CategoryOrder {
                column: k.name().to_string(),
                values: category_order(rows, *k),
            })
            .collect(),
    })
}

/// Sorted distinct non-missing values of `column`
pub fn category_order<R: Tabular>(rows: &[R], column: R::Column) -> Vec<Field> {
    rows.iter()
        .filter_map(|r| r.field(column))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `members` must already be in date order
fn reduce<R: Tabular>(members: &[&R], column: R::Column, agg: Agg) -> Option<Field> {
    let values: Vec<Field> = members.iter().filter_map(|r| r.field(column)).collect();
    let numbers = || values.iter().filter_map(Field::as_number).collect::<Vec<_>>();

    match agg {
        Agg::Count => Some(Field::Number(values.len() as f64)),
        Agg::Last => values.last().cloned(),
        Agg::Min => values.iter().min().cloned(),
        Agg::Max => values.iter().max().cloned(),
        Agg::Mode => mode(&values),
        Agg::Sum => {
            let numbers = numbers();
            if numbers.is_empty() {
                None
            } else {
                Some(Field::Number(numbers.iter().sum()))
            }
        }
        Agg::Mean => mean(&numbers()).map(Field::Number),
        Agg::Median => median(&numbers()).map(Field::Number),
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Middle value; the mean of the two middle values for an even count
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent value; ties go to the smallest
pub fn mode<T: Ord + Clone>(values: &[T]) -> Option<T> {
    let mut counts: BTreeMap<&T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut best: Option<(&T, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}
