use std::collections::HashSet;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};

use crate::error::DashError;

// ---------------------------------------------------------------------------
// Delimiters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Tab,
    Pipe,
    Semicolon,
}

/// Records examined when guessing the delimiter.
const DETECT_RECORDS: usize = 10;

impl Delimiter {
    /// Detection candidates, in tie-break order.
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Tab,
        Delimiter::Pipe,
        Delimiter::Semicolon,
    ];

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
            Delimiter::Semicolon => b';',
        }
    }

    /// `.tsv` files are always tab separated.
    pub fn from_filename(filename: &str) -> Option<Delimiter> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "tsv" => Some(Delimiter::Tab),
            _ => None,
        }
    }

    /// Pick the candidate whose leading records have the most consistent
    /// field count above one. Falls back to comma.
    pub fn detect(text: &str) -> Delimiter {
        let mut best: Option<(Delimiter, usize, usize)> = None;

        for delimiter in Self::ALL {
            let counts: Vec<usize> = reader(text, delimiter)
                .records()
                .filter_map(Result::ok)
                .filter(|r| !is_blank(r))
                .take(DETECT_RECORDS)
                .map(|r| r.len())
                .collect();

            let Some(&first) = counts.first() else {
                continue;
            };
            if first < 2 {
                continue;
            }
            let delta: usize = counts.iter().map(|c| c.abs_diff(first)).sum();

            let better = match best {
                None => true,
                Some((_, best_delta, best_fields)) => {
                    delta < best_delta || (delta == best_delta && first > best_fields)
                }
            };
            if better {
                best = Some((delimiter, delta, first));
            }
        }

        best.map(|(d, _, _)| d).unwrap_or(Delimiter::Comma)
    }
}

// ---------------------------------------------------------------------------
// RawTable
// ---------------------------------------------------------------------------

/// Header plus string rows, each row exactly `headers.len()` cells long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Explicit delimiter; detected from the text when `None`.
    pub delimiter: Option<Delimiter>,
}

impl ParseOptions {
    /// Options for a named upload: `.tsv` pins the tab delimiter.
    pub fn for_filename(filename: &str) -> Self {
        Self {
            delimiter: Delimiter::from_filename(filename),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split delimited text into a [`RawTable`].
///
/// Fully empty lines are skipped. The first remaining line is the header,
/// trimmed cell by cell. Short rows are padded with empty cells; surplus
/// cells are dropped when empty and rejected otherwise.
pub fn parse(raw_text: &str, options: &ParseOptions) -> Result<RawTable, DashError> {
    let text = raw_text.strip_prefix('\u{feff}').unwrap_or(raw_text);
    let delimiter = options.delimiter.unwrap_or_else(|| Delimiter::detect(text));

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in reader(text, delimiter).records() {
        let record =
            result.map_err(|e| DashError::structural(format!("CSV parsing failed: {e}")))?;
        if is_blank(&record) {
            continue;
        }

        let width = match &headers {
            Some(header) => header.len(),
            None => {
                headers = Some(record.iter().map(|h| h.trim().to_string()).collect());
                continue;
            }
        };
        if record.len() > width && record.iter().skip(width).any(|cell| !cell.is_empty()) {
            return Err(DashError::structural(format!(
                "Row {} has {} fields but the header has {}.",
                rows.len() + 1,
                record.len(),
                width
            )));
        }

        let mut cells: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        cells.resize(width, String::new());
        rows.push(cells);
    }

    let headers = headers.unwrap_or_default();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DashError::structural("No headers found in CSV file."));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(DashError::structural(format!(
            "Duplicate column headers found: '{dup}'."
        )));
    }

    log::debug!(
        "Parsed {} columns and {} rows using {:?} delimiter",
        headers.len(),
        rows.len(),
        delimiter
    );

    Ok(RawTable { headers, rows })
}

fn reader(text: &str, delimiter: Delimiter) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(text.as_bytes())
}

fn is_blank(record: &StringRecord) -> bool {
    record.is_empty() || (record.len() == 1 && record[0].is_empty())
}
