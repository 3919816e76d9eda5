use std::path::Path;

use anyhow::{Context, Result, bail};

use super::builder::{build, validate_file};
use super::model::Dataset;
use super::parser::{ParseOptions, parse};
use crate::config::AppConfig;
use crate::error::DashError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load an uploaded buffer.
///
/// Validation order: file type, size, headers, columns, rows. The buffer is
/// only parsed once type and size pass.
pub fn load_buffer(bytes: &[u8], filename: &str, config: &AppConfig) -> Result<Dataset, DashError> {
    let size = bytes.len() as u64;
    validate_file(filename, size, &config.limits)?;

    let text = String::from_utf8_lossy(bytes);
    let table = parse(&text, &ParseOptions::for_filename(filename))?;
    build(table, filename, size, &config.limits, &config.inference)
}

/// Load a local `.csv` / `.tsv` file. Dispatch by extension.
pub fn load_file(path: &Path, config: &AppConfig) -> Result<Dataset> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid file name: {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "tsv" => {}
        _ => bail!(DashError::UnsupportedFile(filename.to_string())),
    }

    // Reject oversized files before reading them into memory.
    let size = std::fs::metadata(path)
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .len();
    validate_file(filename, size, &config.limits)?;

    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let dataset = load_buffer(&bytes, filename, config)?;
    Ok(dataset)
}
