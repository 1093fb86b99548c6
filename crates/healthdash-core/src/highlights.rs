//! Descriptive statistics for a single tracked metric

use crate::{
    aggregate::{self, Column, Field, Tabular},
    error::Error,
    Result,
};
use serde::Serialize;

/// Highlight card data; `min` and `max` carry the whole row so the date of
/// the extreme is available alongside its value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlights<R> {
    pub column: String,
    pub count: usize,
    pub min: R,
    pub max: R,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
}

impl<R: Tabular> Highlights<R> {
    pub fn min_value(&self, column: R::Column) -> Option<f64> {
        self.min.field(column).as_ref().and_then(Field::as_number)
    }

    pub fn max_value(&self, column: R::Column) -> Option<f64> {
        self.max.field(column).as_ref().and_then(Field::as_number)
    }
}

/// Min row, max row, mean, median, and mode of a numeric column. Rows missing
/// the value are skipped; the first row reaching an extreme wins.
pub fn highlights<R: Tabular + Clone>(rows: &[R], column: R::Column) -> Result<Highlights<R>> {
    if !column.is_numeric() {
        return Err(Error::schema(
            "highlights",
            format!("column \"{}\" is not numeric", column.name()),
        ));
    }

    let present: Vec<(&R, f64)> = rows
        .iter()
        .filter_map(|r| r.field(column).and_then(|f| f.as_number()).map(|v| (r, v)))
        .collect();

    let Some(&first) = present.first() else {
        return Err(Error::EmptyResult(format!("no values for \"{}\"", column.name())));
    };

    let mut min = first;
    let mut max = first;
    for &(row, value) in &present[1..] {
        if value < min.1 {
            min = (row, value);
        }
        if value > max.1 {
            max = (row, value);
        }
    }

    let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
    let numbers: Vec<Field> = values.iter().copied().map(Field::Number).collect();

    Ok(Highlights {
        column: column.name().to_string(),
        count: values.len(),
        min: min.0.clone(),
        max: max.0.clone(),
        mean: aggregate::mean(&values).unwrap_or_default(),
        median: aggregate::median(&values).unwrap_or_default(),
        mode: aggregate::mode(&numbers)
            .and_then(|f| f.as_number())
            .unwrap_or_default(),
    })
}
