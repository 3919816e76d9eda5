//! Per-column descriptive statistics.
//!
//! Numeric columns get count/sum/mean/median/min/max/variance/stdDev,
//! string and boolean columns get a frequency table. Date and unknown
//! columns only report missing counts.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::data::model::{ColumnType, ColumnTypes, Dataset, Row};

/// Length of [`CategoricalStats::top_values`].
pub const TOP_VALUES: usize = 10;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    /// Population variance.
    pub variance: f64,
}

/// A top value as displayed: numeric-looking keys are reported as numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TopValueKey {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopValue {
    pub value: TopValueKey,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalStats {
    pub unique_count: usize,
    /// Non-missing values.
    pub total_count: usize,
    pub top_values: Vec<TopValue>,
    pub frequency: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub column_name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub total_rows: usize,
    pub missing_count: usize,
    pub missing_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_stats: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorical_stats: Option<CategoricalStats>,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// One entry per column, in `column_types` order.
pub fn compute_stats(rows: &[Row], column_types: &ColumnTypes) -> Vec<ColumnStats> {
    column_types
        .iter()
        .map(|(column, ty)| column_stats(rows, column, ty))
        .collect()
}

pub fn dataset_stats(dataset: &Dataset) -> Vec<ColumnStats> {
    compute_stats(dataset.rows(), dataset.column_types())
}

fn column_stats(rows: &[Row], column: &str, ty: ColumnType) -> ColumnStats {
    let present: Vec<&Row> = rows.iter().filter(|row| !row.get(column).is_missing()).collect();
    let total_rows = rows.len();
    let missing_count = total_rows - present.len();
    let missing_percentage = if total_rows == 0 {
        0.0
    } else {
        missing_count as f64 / total_rows as f64 * 100.0
    };

    let (numeric_stats, categorical_stats) = match ty {
        ColumnType::Number => (Some(numeric_stats(&present, column)), None),
        ColumnType::String | ColumnType::Boolean => {
            (None, Some(categorical_stats(&present, column, ty)))
        }
        ColumnType::Date | ColumnType::Unknown => (None, None),
    };

    ColumnStats {
        column_name: column.to_string(),
        column_type: ty,
        total_rows,
        missing_count,
        missing_percentage,
        numeric_stats,
        categorical_stats,
    }
}

/// Values that do not read as a number are left out of `count`.
fn numeric_stats(rows: &[&Row], column: &str) -> NumericStats {
    let mut numbers: Vec<f64> = rows.iter().filter_map(|row| row.number(column)).collect();

    if numbers.is_empty() {
        return NumericStats::default();
    }
    numbers.sort_by(f64::total_cmp);

    let count = numbers.len();
    let sum: f64 = numbers.iter().sum();
    let mean = sum / count as f64;

    let mid = count / 2;
    let median = if count % 2 == 0 {
        (numbers[mid - 1] + numbers[mid]) / 2.0
    } else {
        numbers[mid]
    };

    let variance = numbers.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    NumericStats {
        count,
        sum,
        mean,
        median,
        min: numbers[0],
        max: numbers[count - 1],
        std_dev: variance.sqrt(),
        variance,
    }
}

fn categorical_stats(rows: &[&Row], column: &str, ty: ColumnType) -> CategoricalStats {
    // First-seen order, so ties in the ranking keep encounter order.
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = row.value_as(column, ty).to_string();
        match index.get(&key) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, 1));
            }
        }
    }

    let total_count: usize = order.iter().map(|(_, count)| count).sum();
    let frequency: BTreeMap<String, usize> = order.iter().cloned().collect();

    let mut ranked = order;
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_values = ranked
        .into_iter()
        .take(TOP_VALUES)
        .map(|(key, count)| TopValue {
            value: display_key(key),
            count,
            percentage: count as f64 / total_count as f64 * 100.0,
        })
        .collect();

    CategoricalStats {
        unique_count: frequency.len(),
        total_count,
        top_values,
        frequency,
    }
}

fn display_key(key: String) -> TopValueKey {
    match key.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => TopValueKey::Number(v),
        _ => TopValueKey::Text(key),
    }
}

// ---------------------------------------------------------------------------
// Display formatting
// ---------------------------------------------------------------------------

/// Compact number for display: `1.50K`, `2.00M`, `1.23e+9`.
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "N/A".to_string();
    }
    let magnitude = value.abs();
    if magnitude >= 1e9 {
        let formatted = format!("{value:.2e}");
        // JS style exponent sign.
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        }
    } else if magnitude >= 1e6 {
        format!("{:.*}M", decimals, value / 1e6)
    } else if magnitude >= 1e3 {
        format!("{:.*}K", decimals, value / 1e3)
    } else {
        format!("{value:.decimals$}")
    }
}

pub fn format_percentage(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "N/A".to_string();
    }
    format!("{value:.decimals$}%")
}
