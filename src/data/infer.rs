use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::dates::parse_date;
use super::model::{CellValue, ColumnType, parse_number};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds for the inference cascade. Ratios are over non-missing values
/// of the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Leading rows examined per column.
    pub sample_size: usize,
    pub numeric_threshold: f64,
    pub date_threshold: f64,
    pub boolean_threshold: f64,
    /// Advisory only, see [`is_categorical`].
    pub categorical_max_unique: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            numeric_threshold: 0.8,
            date_threshold: 0.8,
            boolean_threshold: 0.95,
            categorical_max_unique: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Inference cascade
// ---------------------------------------------------------------------------

const BOOLEAN_TOKENS: [&str; 10] = [
    "true", "false", "1", "0", "yes", "no", "y", "n", "on", "off",
];

/// Classify a column from its values in row order.
///
/// A decision list, first match wins: boolean, number, date, then string.
/// Boolean runs first so a column of `1`/`0` is not read as numeric.
pub fn infer_type<'a, I>(values: I, config: &InferenceConfig) -> ColumnType
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let sample: Vec<&CellValue> = values
        .into_iter()
        .take(config.sample_size)
        .filter(|v| !v.is_missing())
        .collect();

    if sample.is_empty() {
        return ColumnType::Unknown;
    }

    let total = sample.len() as f64;
    let ratio = |matches: fn(&CellValue) -> bool| {
        sample.iter().filter(|v| matches(v)).count() as f64 / total
    };

    if ratio(is_boolean_like) >= config.boolean_threshold {
        ColumnType::Boolean
    } else if ratio(is_numeric_like) >= config.numeric_threshold {
        ColumnType::Number
    } else if ratio(is_date_like) >= config.date_threshold {
        ColumnType::Date
    } else {
        ColumnType::String
    }
}

fn is_boolean_like(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(_) => true,
        CellValue::String(s) => BOOLEAN_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)),
        _ => false,
    }
}

fn is_numeric_like(value: &CellValue) -> bool {
    match value {
        CellValue::Number(_) => true,
        CellValue::String(s) => parse_number(s).is_some(),
        _ => false,
    }
}

fn is_date_like(value: &CellValue) -> bool {
    match value {
        CellValue::Date(_) => true,
        CellValue::String(s) => parse_date(s).is_some(),
        _ => false,
    }
}

/// Interpret one of the boolean tokens.
pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Whether a column has few enough distinct values (case-insensitive) to be
/// treated as categories. Does not influence [`infer_type`].
pub fn is_categorical<'a, I>(values: I, max_unique: usize) -> bool
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let unique: HashSet<String> = values
        .into_iter()
        .filter(|v| !v.is_missing())
        .map(|v| v.to_string().to_lowercase())
        .collect();
    unique.len() > 1 && unique.len() <= max_unique
}
