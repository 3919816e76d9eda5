use std::collections::HashSet;
use std::path::Path;

use super::infer::{InferenceConfig, infer_type};
use super::model::{CellValue, ColumnType, ColumnTypes, Dataset, Row, coerce_text};
use super::parser::RawTable;
use crate::config::Limits;
use crate::error::{DashError, Limit};

const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "tsv"];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Checks run before the text is parsed: file type, then size.
pub fn validate_file(filename: &str, size: u64, limits: &Limits) -> Result<(), DashError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(DashError::UnsupportedFile(filename.to_string()));
    }
    check_file_size(size, limits)
}

fn check_file_size(size: u64, limits: &Limits) -> Result<(), DashError> {
    if size > limits.max_file_size {
        return Err(DashError::LimitExceeded {
            limit: Limit::MaxFileSize,
            actual: size,
            max: limits.max_file_size,
        });
    }
    Ok(())
}

/// Header, column and row checks, stopping at the first failure.
pub fn validate_table(table: &RawTable, limits: &Limits) -> Result<(), DashError> {
    if table.headers.is_empty() || table.headers.iter().all(|h| h.is_empty()) {
        return Err(DashError::structural("No headers found in CSV file."));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = table.headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(DashError::structural(format!(
            "Duplicate column headers found: '{dup}'."
        )));
    }

    if table.headers.len() > limits.max_columns {
        return Err(DashError::LimitExceeded {
            limit: Limit::MaxColumns,
            actual: table.headers.len() as u64,
            max: limits.max_columns as u64,
        });
    }

    if table.rows.is_empty() {
        return Err(DashError::structural("No data rows found in CSV file."));
    }
    if table.rows.len() > limits.max_rows {
        return Err(DashError::LimitExceeded {
            limit: Limit::MaxRows,
            actual: table.rows.len() as u64,
            max: limits.max_rows as u64,
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Turn a parsed table into a typed [`Dataset`].
///
/// Empty cells become `Null`. Each column's type is inferred from the first
/// `sample_size` cells, then every cell in the column is coerced to that type
/// once. Cells that do not coerce keep their text.
pub fn build(
    table: RawTable,
    filename: &str,
    size: u64,
    limits: &Limits,
    config: &InferenceConfig,
) -> Result<Dataset, DashError> {
    check_file_size(size, limits)?;
    validate_table(&table, limits)?;

    let RawTable { headers, rows } = table;
    let width = headers.len();

    let raw_rows: Vec<Vec<CellValue>> = rows
        .into_iter()
        .map(|mut cells| {
            cells.resize(width, String::new());
            cells.into_iter().map(raw_cell).collect()
        })
        .collect();

    let column_types: ColumnTypes = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let ty = infer_type(raw_rows.iter().map(|r| &r[idx]), config);
            log::debug!("Column '{header}' inferred as {ty}");
            (header.clone(), ty)
        })
        .collect();

    let types: Vec<ColumnType> = column_types.iter().map(|(_, ty)| ty).collect();
    let typed_rows: Vec<Row> = raw_rows
        .into_iter()
        .map(|cells| {
            let mut row = Row::default();
            for ((header, ty), cell) in headers.iter().zip(&types).zip(cells) {
                coerce_into(&mut row, header, cell, *ty);
            }
            row
        })
        .collect();

    log::info!(
        "Built dataset '{filename}': {} rows, {} columns",
        typed_rows.len(),
        headers.len()
    );

    Dataset::from_parts(headers, typed_rows, column_types, filename.to_string(), size)
}

fn raw_cell(text: String) -> CellValue {
    if text.is_empty() {
        CellValue::Null
    } else {
        CellValue::String(text)
    }
}

/// Coerce a text cell to the column type and store it with its text.
fn coerce_into(row: &mut Row, header: &str, cell: CellValue, ty: ColumnType) {
    let CellValue::String(text) = cell else {
        row.insert_parsed(header.to_string(), cell, "");
        return;
    };
    match coerce_text(&text, ty) {
        Some(typed) => row.insert_parsed(header.to_string(), typed, &text),
        None => row.insert_parsed(header.to_string(), CellValue::String(text), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::{ParseOptions, parse};

    fn table(text: &str) -> RawTable {
        parse(text, &ParseOptions::default()).unwrap()
    }

    fn build_default(text: &str) -> Result<Dataset, DashError> {
        build(
            table(text),
            "test.csv",
            text.len() as u64,
            &Limits::default(),
            &InferenceConfig::default(),
        )
    }

    #[test]
    fn builds_typed_rows() {
        let ds = build_default(
            "name,amount,joined,active\nalice,\"$1,200\",2023-01-15,yes\nbob,30,2023-02-01,no\n",
        )
        .unwrap();
        assert_eq!(ds.column_type("name"), Some(ColumnType::String));
        assert_eq!(ds.column_type("amount"), Some(ColumnType::Number));
        assert_eq!(ds.column_type("joined"), Some(ColumnType::Date));
        assert_eq!(ds.column_type("active"), Some(ColumnType::Boolean));

        let first = &ds.rows()[0];
        assert_eq!(first.get("amount"), &CellValue::Number(1200.0));
        assert_eq!(first.get("active"), &CellValue::Bool(true));
        assert!(first.get("joined").as_date().is_some());
        assert_eq!(first.get("name"), &CellValue::String("alice".into()));

        // coerced cells still know what the file said
        assert_eq!(first.text("amount"), "$1,200");
        assert_eq!(first.text("active"), "yes");
        assert_eq!(first.text("joined"), "2023-01-15");
        assert_eq!(ds.rows()[1].text("amount"), "30");
    }

    #[test]
    fn empty_cells_become_null_and_rows_have_every_key() {
        let ds = build_default("a,b,c\n1,,x\n2\n").unwrap();
        assert_eq!(ds.headers().len(), 3);
        for row in ds.rows() {
            assert_eq!(row.len(), 3);
        }
        assert_eq!(ds.rows()[0].get("b"), &CellValue::Null);
        assert_eq!(ds.rows()[1].get("c"), &CellValue::Null);
        assert_eq!(ds.column_type("b"), Some(ColumnType::Unknown));
    }

    #[test]
    fn unparseable_cells_keep_their_text() {
        let ds = build_default("v\n1\n2\n3\n4\nn/a\n").unwrap();
        assert_eq!(ds.column_type("v"), Some(ColumnType::Number));
        assert_eq!(ds.rows()[4].get("v"), &CellValue::String("n/a".into()));
    }

    #[test]
    fn no_data_rows_is_structural() {
        let err = build_default("a,b\n").unwrap_err();
        assert_eq!(err, DashError::Structural("No data rows found in CSV file.".into()));
    }

    #[test]
    fn column_limit_names_limit_and_value() {
        let limits = Limits {
            max_columns: 2,
            ..Limits::default()
        };
        let err = build(
            table("a,b,c\n1,2,3\n"),
            "t.csv",
            10,
            &limits,
            &InferenceConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DashError::LimitExceeded {
                limit: Limit::MaxColumns,
                actual: 3,
                max: 2
            }
        );
        assert!(err.to_string().contains("maxColumns"));
    }

    #[test]
    fn row_limit_is_inclusive() {
        let limits = Limits {
            max_rows: 2,
            ..Limits::default()
        };
        let ok = build(table("a\n1\n2\n"), "t.csv", 4, &limits, &InferenceConfig::default());
        assert!(ok.is_ok());
        let err = build(table("a\n1\n2\n3\n"), "t.csv", 6, &limits, &InferenceConfig::default())
            .unwrap_err();
        assert_eq!(err.limit(), Some(Limit::MaxRows));
    }

    #[test]
    fn columns_are_checked_before_rows() {
        let limits = Limits {
            max_columns: 1,
            max_rows: 1,
            ..Limits::default()
        };
        let err = build(table("a,b\n1,2\n3,4\n"), "t.csv", 8, &limits, &InferenceConfig::default())
            .unwrap_err();
        assert_eq!(err.limit(), Some(Limit::MaxColumns));
    }

    #[test]
    fn file_size_boundary() {
        let limits = Limits {
            max_file_size: 100,
            ..Limits::default()
        };
        assert!(validate_file("data.csv", 100, &limits).is_ok());
        let err = validate_file("data.csv", 101, &limits).unwrap_err();
        assert_eq!(err.limit(), Some(Limit::MaxFileSize));
        assert!(err.to_string().contains("maxFileSize"));
    }

    #[test]
    fn file_type_is_checked_before_size() {
        let limits = Limits {
            max_file_size: 1,
            ..Limits::default()
        };
        assert_eq!(
            validate_file("notes.txt", 500, &limits),
            Err(DashError::UnsupportedFile("notes.txt".into()))
        );
        assert!(validate_file("DATA.TSV", 1, &limits).is_ok());
    }

    #[test]
    fn duplicate_headers_are_rechecked() {
        let raw = RawTable {
            headers: vec!["a".into(), "a".into()],
            rows: vec![vec!["1".into(), "2".into()]],
        };
        let err = validate_table(&raw, &Limits::default()).unwrap_err();
        assert!(matches!(err, DashError::Structural(_)));
    }
}
