use serde::{Deserialize, Serialize};

use crate::data::infer::InferenceConfig;

// ---------------------------------------------------------------------------
// Application limits
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_MAX_ROWS: usize = 100_000;
pub const DEFAULT_MAX_COLUMNS: usize = 50;
pub const DEFAULT_MAX_CHARTS: usize = 10;

/// Ceilings applied to every load attempt.
///
/// Missing fields in a stored config fall back to the defaults, so older
/// snapshots keep working when fields are added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    /// Bytes.
    pub max_file_size: u64,
    pub max_rows: usize,
    pub max_columns: usize,
    pub max_charts: usize,
    pub enable_data_persistence: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_rows: DEFAULT_MAX_ROWS,
            max_columns: DEFAULT_MAX_COLUMNS,
            max_charts: DEFAULT_MAX_CHARTS,
            enable_data_persistence: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Everything the pipeline is configured with, passed explicitly to the
/// entry points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub limits: Limits,
    pub inference: InferenceConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_application_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_file_size, 52_428_800);
        assert_eq!(limits.max_rows, 100_000);
        assert_eq!(limits.max_columns, 50);
        assert!(limits.enable_data_persistence);
    }

    #[test]
    fn partial_config_merges_with_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"limits":{"maxRows":500}}"#).unwrap();
        assert_eq!(config.limits.max_rows, 500);
        assert_eq!(config.limits.max_columns, DEFAULT_MAX_COLUMNS);
        assert_eq!(config.inference, InferenceConfig::default());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(json["limits"]["maxFileSize"], 52_428_800);
        assert_eq!(json["inference"]["sampleSize"], 1000);
    }
}
