use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float64Array, Int64Array},
    compute::cast,
    datatypes::DataType,
};
use std::sync::Arc;

use crate::error::{Result, StressError};
use crate::index::date_parser;

/// Cells read as missing, on top of blanks.
fn is_null_token(s: &str) -> bool {
    ["nan", "na", "n/a", "null", "none"]
        .iter()
        .any(|t| s.eq_ignore_ascii_case(t))
}

fn is_text(dt: &DataType) -> bool {
    match dt {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Dictionary(_, value) => is_text(value),
        _ => false,
    }
}

/// Run `parse` over every non-blank cell of a text column.
/// A cell that fails to parse fails the whole column.
fn parse_cells<T>(
    name: &str,
    column: &ArrayRef,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    let text = cast(column, &DataType::Utf8)?;
    text.as_string::<i32>()
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell.map(str::trim) {
            None => Ok(None),
            Some(s) if s.is_empty() || is_null_token(s) => Ok(None),
            Some(s) => parse(s).map(Some).ok_or_else(|| StressError::Parse {
                column: name.to_string(),
                row,
                value: s.to_string(),
            }),
        })
        .collect()
}

/// Normalise a ratio or index column to `Float64`.
pub fn to_f64(name: &str, column: &ArrayRef) -> Result<ArrayRef> {
    match column.data_type() {
        DataType::Float64 => Ok(Arc::clone(column)),
        dt if is_text(dt) => {
            let values = parse_cells(name, column, |s| s.parse::<f64>().ok())?;
            Ok(Arc::new(Float64Array::from(values)))
        }
        _ => Ok(cast(column, &DataType::Float64)?),
    }
}

/// Normalise an enrolment count to `Int64`; whole-valued decimals ("1200.0") are accepted.
pub fn to_i64(name: &str, column: &ArrayRef) -> Result<ArrayRef> {
    match column.data_type() {
        DataType::Int64 => Ok(Arc::clone(column)),
        dt if is_text(dt) => {
            let values = parse_cells(name, column, |s| {
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite() && v.fract() == 0.0)
                        .map(|v| v as i64)
                })
            })?;
            Ok(Arc::new(Int64Array::from(values)))
        }
        _ => Ok(cast(column, &DataType::Int64)?),
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Normalise a supplied high-stress flag to `Boolean`.
pub fn to_bool(name: &str, column: &ArrayRef) -> Result<ArrayRef> {
    match column.data_type() {
        DataType::Boolean => Ok(Arc::clone(column)),
        dt if is_text(dt) => {
            let values = parse_cells(name, column, parse_bool)?;
            Ok(Arc::new(BooleanArray::from(values)))
        }
        _ => Ok(cast(column, &DataType::Boolean)?),
    }
}

/// Parse the `month` column into `Date32`. Any malformed cell is an error.
pub fn to_date32(name: &str, column: &ArrayRef) -> Result<ArrayRef> {
    match column.data_type() {
        DataType::Date32 => Ok(Arc::clone(column)),
        dt if is_text(dt) => {
            let values = parse_cells(name, column, |s| {
                date_parser::parse_month(s).map(date_parser::date_to_days)
            })?;
            Ok(Arc::new(Date32Array::from(values)))
        }
        _ => Ok(cast(column, &DataType::Date32)?),
    }
}

/// Null count of a normalised column, for logging.
pub fn nulls(column: &ArrayRef) -> usize {
    column.null_count()
}
