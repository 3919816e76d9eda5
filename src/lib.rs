//! Tabular data profiling for dashboards.
//!
//! Load a CSV/TSV buffer into a typed [`Dataset`], describe each column
//! with [`stats`], and derive chart series with [`chart`]. A [`Session`]
//! ties these together with a persistence store.

pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod session;
pub mod stats;
pub mod storage;

pub use chart::{ChartData, ChartKind, ChartSpec};
pub use config::{AppConfig, Limits};
pub use data::loader::{load_buffer, load_file};
pub use data::model::{CellValue, ColumnType, ColumnTypes, Dataset, Row};
pub use error::DashError;
pub use session::Session;
pub use stats::ColumnStats;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
