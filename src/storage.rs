//! Snapshot persistence against a string-keyed store.
//!
//! Every helper here logs and swallows failures: a broken or full store
//! behaves like an empty one and never surfaces as a user-facing error.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::chart::ChartSpec;
use crate::config::AppConfig;
use crate::data::dates::{format_iso, parse_iso_timestamp};
use crate::data::model::{ColumnTypes, Dataset};

pub const DATASET_KEY: &str = "csv-dashgen-dataset";
pub const CHART_SPEC_KEY: &str = "csv-dashgen-chart-config";
pub const COLUMN_TYPES_PREFIX: &str = "csv-dashgen-column-types-";
pub const LAST_UPDATED_KEY: &str = "csv-dashgen-last-updated";
pub const CONFIG_KEY: &str = "csv-dashgen-config";

const TEST_KEY: &str = "__storage_test__";

/// Conservative estimate of what a browser-style store holds.
pub const STORAGE_BUDGET: usize = 5 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Store abstraction
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Opaque string key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// In-process store with an optional byte quota over keys plus values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    disabled: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// A store that rejects every operation, like a browser with storage
    /// turned off.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    fn used(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.disabled {
            return Err(StorageError::Unavailable("store is disabled".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        if let Some(quota) = self.quota {
            let replaced = self.entries.get(key).map_or(0, |old| key.len() + old.len());
            let needed = self.used() - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_enabled()?;
        Ok(self.entries.keys().cloned().collect())
    }
}

/// One file per key under a directory. Keys are percent-encoded into file
/// names.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

const FILE_SUFFIX: &str = ".json";

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{FILE_SUFFIX}", urlencoding::encode(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(encoded) = name.to_str().and_then(|n| n.strip_suffix(FILE_SUFFIX)) else {
                continue;
            };
            match urlencoding::decode(encoded) {
                Ok(key) => keys.push(key.into_owned()),
                Err(_) => log::debug!("Skipping foreign file {:?} in store", name),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// Snapshot helpers
// ---------------------------------------------------------------------------

pub fn column_types_key(filename: &str) -> String {
    format!("{COLUMN_TYPES_PREFIX}{filename}")
}

fn write_json<S, T>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value).with_context(|| format!("serializing '{key}'"))?;
    store
        .set(key, &json)
        .with_context(|| format!("writing '{key}'"))?;
    Ok(())
}

fn read_json<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(json) = store.get(key).with_context(|| format!("reading '{key}'"))? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&json).with_context(|| format!("parsing '{key}'"))?;
    Ok(Some(value))
}

fn touch<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<()> {
    store
        .set(LAST_UPDATED_KEY, &format_iso(&Utc::now()))
        .context("writing last-updated timestamp")?;
    Ok(())
}

fn save_logged<S, T>(store: &mut S, key: &str, value: &T, what: &str)
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    match write_json(store, key, value).and_then(|()| touch(store)) {
        Ok(()) => log::debug!("Saved {what} under '{key}'"),
        Err(e) => log::warn!("Failed to save {what}: {e:#}"),
    }
}

fn load_logged<S, T>(store: &S, key: &str, what: &str) -> Option<T>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    read_json(store, key).unwrap_or_else(|e| {
        log::warn!("Failed to load {what}: {e:#}");
        None
    })
}

pub fn save_dataset<S: KeyValueStore + ?Sized>(store: &mut S, dataset: &Dataset) {
    save_logged(store, DATASET_KEY, dataset, "dataset");
}

/// Restore the last saved dataset, dates revived per column type.
pub fn load_dataset<S: KeyValueStore + ?Sized>(store: &S) -> Option<Dataset> {
    load_logged(store, DATASET_KEY, "dataset")
}

pub fn save_chart_spec<S: KeyValueStore + ?Sized>(store: &mut S, spec: &ChartSpec) {
    save_logged(store, CHART_SPEC_KEY, spec, "chart config");
}

pub fn load_chart_spec<S: KeyValueStore + ?Sized>(store: &S) -> Option<ChartSpec> {
    load_logged(store, CHART_SPEC_KEY, "chart config")
}

pub fn save_column_types<S: KeyValueStore + ?Sized>(
    store: &mut S,
    filename: &str,
    types: &ColumnTypes,
) {
    save_logged(store, &column_types_key(filename), types, "column types");
}

pub fn load_column_types<S: KeyValueStore + ?Sized>(
    store: &S,
    filename: &str,
) -> Option<ColumnTypes> {
    load_logged(store, &column_types_key(filename), "column types")
}

/// Config is not a snapshot, so saving it leaves the timestamp alone.
pub fn save_config<S: KeyValueStore + ?Sized>(store: &mut S, config: &AppConfig) {
    if let Err(e) = write_json(store, CONFIG_KEY, config) {
        log::warn!("Failed to save config: {e:#}");
    }
}

/// Stored config, or the defaults when none is stored or it is unreadable.
pub fn load_config<S: KeyValueStore + ?Sized>(store: &S) -> AppConfig {
    load_logged(store, CONFIG_KEY, "config").unwrap_or_default()
}

pub fn last_updated<S: KeyValueStore + ?Sized>(store: &S) -> Option<DateTime<Utc>> {
    match store.get(LAST_UPDATED_KEY) {
        Ok(raw) => raw.as_deref().and_then(parse_iso_timestamp),
        Err(e) => {
            log::warn!("Failed to get last updated timestamp: {e}");
            None
        }
    }
}

/// Remove every snapshot key, per-file column types included. The stored
/// config survives.
pub fn clear_stored_data<S: KeyValueStore + ?Sized>(store: &mut S) {
    if let Err(e) = try_clear(store) {
        log::warn!("Failed to clear stored data: {e:#}");
    }
}

fn try_clear<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<()> {
    for key in [DATASET_KEY, CHART_SPEC_KEY, LAST_UPDATED_KEY] {
        store
            .remove(key)
            .with_context(|| format!("removing '{key}'"))?;
    }
    let per_file: Vec<String> = store
        .keys()
        .context("listing keys")?
        .into_iter()
        .filter(|k| k.starts_with(COLUMN_TYPES_PREFIX))
        .collect();
    for key in &per_file {
        store
            .remove(key)
            .with_context(|| format!("removing '{key}'"))?;
    }
    log::info!("Cleared stored data ({} column type entries)", per_file.len());
    Ok(())
}

/// Write and remove a throwaway key.
pub fn is_storage_available<S: KeyValueStore + ?Sized>(store: &mut S) -> bool {
    store
        .set(TEST_KEY, TEST_KEY)
        .and_then(|()| store.remove(TEST_KEY))
        .is_ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageInfo {
    /// Bytes across all keys and values.
    pub used: usize,
    pub available: usize,
    pub percentage: f64,
}

pub fn storage_info<S: KeyValueStore + ?Sized>(store: &mut S) -> Option<StorageInfo> {
    if !is_storage_available(store) {
        return None;
    }
    let used = match usage(store) {
        Ok(used) => used,
        Err(e) => {
            log::warn!("Failed to get storage info: {e:#}");
            return None;
        }
    };
    Some(StorageInfo {
        used,
        available: STORAGE_BUDGET,
        percentage: used as f64 / STORAGE_BUDGET as f64 * 100.0,
    })
}

fn usage<S: KeyValueStore + ?Sized>(store: &S) -> Result<usize> {
    let mut used = 0;
    for key in store.keys().context("listing keys")? {
        if let Some(value) = store.get(&key).with_context(|| format!("reading '{key}'"))? {
            used += key.len() + value.len();
        }
    }
    Ok(used)
}
