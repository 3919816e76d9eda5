use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Limits a load attempt can run into
// ---------------------------------------------------------------------------

/// An externally supplied ceiling checked while building a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    MaxFileSize,
    MaxRows,
    MaxColumns,
}

impl Limit {
    fn unit(self) -> &'static str {
        match self {
            Limit::MaxFileSize => "bytes",
            Limit::MaxRows => "rows",
            Limit::MaxColumns => "columns",
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::MaxFileSize => write!(f, "maxFileSize"),
            Limit::MaxRows => write!(f, "maxRows"),
            Limit::MaxColumns => write!(f, "maxColumns"),
        }
    }
}

// ---------------------------------------------------------------------------
// DashError
// ---------------------------------------------------------------------------

/// Failures of the load pipeline and contract violations of the core API.
///
/// `Display` is the human-readable message handed to the error surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashError {
    /// Malformed or empty header/data.
    #[error("{0}")]
    Structural(String),

    #[error("{limit} exceeded: {actual} {} found, the limit is {max}", .limit.unit())]
    LimitExceeded { limit: Limit, actual: u64, max: u64 },

    #[error("Invalid file type '{0}'. Please upload a CSV or TSV file.")]
    UnsupportedFile(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
}

impl DashError {
    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        DashError::Structural(msg.into())
    }

    /// The limit that was breached, if this is a limit failure.
    pub fn limit(&self) -> Option<Limit> {
        match self {
            DashError::LimitExceeded { limit, .. } => Some(*limit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_message_names_limit_and_value() {
        let err = DashError::LimitExceeded {
            limit: Limit::MaxRows,
            actual: 100_001,
            max: 100_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("maxRows"));
        assert!(msg.contains("100001"));
        assert_eq!(err.limit(), Some(Limit::MaxRows));
    }

    #[test]
    fn structural_message_is_verbatim() {
        let err = DashError::structural("No headers found in CSV file.");
        assert_eq!(err.to_string(), "No headers found in CSV file.");
        assert_eq!(err.limit(), None);
    }
}
