use chrono::{DateTime, Utc};

use crate::chart::{self, ChartData, ChartOptions, ChartSpec};
use crate::config::{AppConfig, Limits};
use crate::data::loader;
use crate::data::model::{ColumnType, Dataset};
use crate::data::samples::SampleDataset;
use crate::error::DashError;
use crate::stats::{dataset_stats, ColumnStats};
use crate::storage::{self, KeyValueStore};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One user's dashboard: config, persistence handle and the loaded data,
/// independent of any UI.
pub struct Session<S: KeyValueStore> {
    config: AppConfig,
    store: S,

    /// Loaded dataset (None until a file or sample is loaded).
    dataset: Option<Dataset>,

    /// Active chart configuration.
    chart_spec: Option<ChartSpec>,

    /// Last user-facing error message.
    status_message: Option<String>,
}

impl<S: KeyValueStore> Session<S> {
    /// Open a session with the config stored in `store`, or the defaults.
    pub fn new(store: S) -> Self {
        let config = storage::load_config(&store);
        Self::with_config(store, config)
    }

    pub fn with_config(store: S, config: AppConfig) -> Self {
        Self {
            config,
            store,
            dataset: None,
            chart_spec: None,
            status_message: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn chart_spec(&self) -> Option<&ChartSpec> {
        self.chart_spec.as_ref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn persists(&self) -> bool {
        self.config.limits.enable_data_persistence
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Parse an uploaded buffer and make it the current dataset.
    ///
    /// Stored column-type overrides for the same filename are reapplied and
    /// a default chart is suggested. On failure the previous dataset stays
    /// and the error message is kept for display.
    pub fn load_buffer(&mut self, bytes: &[u8], filename: &str) -> Result<&Dataset, DashError> {
        match loader::load_buffer(bytes, filename, &self.config) {
            Ok(dataset) => Ok(self.set_dataset(dataset)),
            Err(e) => {
                log::error!("Failed to load {filename}: {e}");
                self.status_message = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn load_sample(&mut self, sample: SampleDataset) -> Result<&Dataset, DashError> {
        let text = sample.to_csv().map_err(|e| {
            DashError::Structural(format!("Failed to generate sample data: {e}"))
        })?;
        self.load_buffer(text.as_bytes(), sample.filename())
    }

    fn set_dataset(&mut self, mut dataset: Dataset) -> &Dataset {
        if self.persists() {
            if let Some(saved) = storage::load_column_types(&self.store, dataset.filename()) {
                log::info!("Reapplying saved column types for {}", dataset.filename());
                dataset = dataset.with_column_types(&saved);
            }
        }

        self.chart_spec = chart::suggest(&dataset);
        if self.persists() {
            storage::save_dataset(&mut self.store, &dataset);
            match &self.chart_spec {
                Some(spec) => storage::save_chart_spec(&mut self.store, spec),
                None => {
                    if let Err(e) = self.store.remove(storage::CHART_SPEC_KEY) {
                        log::warn!("Failed to drop stale chart config: {e}");
                    }
                }
            }
        }

        self.status_message = None;
        self.dataset.insert(dataset)
    }

    /// Bring back the last persisted dataset and chart. Returns whether a
    /// dataset was restored.
    pub fn restore(&mut self) -> bool {
        if !self.persists() {
            return false;
        }
        let Some(dataset) = storage::load_dataset(&self.store) else {
            return false;
        };

        // A stored chart only applies if its fields still exist.
        let spec = storage::load_chart_spec(&self.store).filter(|spec| {
            dataset.has_column(&spec.x_field) && dataset.has_column(&spec.y_field)
        });
        self.chart_spec = spec.or_else(|| chart::suggest(&dataset));

        log::info!(
            "Restored {} ({} rows) from storage",
            dataset.filename(),
            dataset.len()
        );
        self.dataset = Some(dataset);
        self.status_message = None;
        true
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Change one column's type. Row values are left as parsed.
    pub fn override_column_type(&mut self, column: &str, ty: ColumnType) -> Result<(), DashError> {
        let Some(current) = &self.dataset else {
            return Err(DashError::UnknownColumn(column.to_string()));
        };
        let updated = current.with_column_type(column, ty)?;

        if self.persists() {
            storage::save_column_types(&mut self.store, updated.filename(), updated.column_types());
            storage::save_dataset(&mut self.store, &updated);
        }
        self.dataset = Some(updated);
        Ok(())
    }

    pub fn set_chart_spec(&mut self, spec: ChartSpec) {
        if self.persists() {
            storage::save_chart_spec(&mut self.store, &spec);
        }
        self.chart_spec = Some(spec);
    }

    /// Replace the limits and store the new config. Already loaded data is
    /// not re-validated.
    pub fn update_limits(&mut self, limits: Limits) {
        self.config.limits = limits;
        storage::save_config(&mut self.store, &self.config);
    }

    pub fn reset_to_defaults(&mut self) {
        self.config = AppConfig::default();
        storage::save_config(&mut self.store, &self.config);
    }

    /// Drop the current data and every stored snapshot.
    pub fn clear(&mut self) {
        self.dataset = None;
        self.chart_spec = None;
        self.status_message = None;
        storage::clear_stored_data(&mut self.store);
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    pub fn chart_data(&self) -> Option<ChartData> {
        chart::generate(self.dataset.as_ref()?, self.chart_spec.as_ref()?)
    }

    pub fn chart_options(&self) -> Option<ChartOptions> {
        self.chart_spec.as_ref().map(ChartOptions::for_spec)
    }

    pub fn stats(&self) -> Vec<ColumnStats> {
        self.dataset.as_ref().map(dataset_stats).unwrap_or_default()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        storage::last_updated(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::storage::MemoryStore;

    const CSV: &str = "day,region,units\n2024-01-01,North,3\n2024-01-02,South,4\n";

    fn session() -> Session<MemoryStore> {
        Session::new(MemoryStore::new())
    }

    #[test]
    fn load_suggests_chart_and_persists() {
        let mut s = session();
        s.load_buffer(CSV.as_bytes(), "units.csv").unwrap();
        assert_eq!(s.chart_spec().unwrap().kind, ChartKind::Line);
        assert!(s.chart_data().is_some());
        assert_eq!(s.stats().len(), 3);
        assert!(s.store().get(storage::DATASET_KEY).unwrap().is_some());
        assert!(s.last_updated().is_some());
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut s = session();
        s.load_buffer(CSV.as_bytes(), "units.csv").unwrap();
        let err = s.load_buffer(b"a,b\n", "empty.csv").unwrap_err();
        assert_eq!(err.to_string(), "No data rows found in CSV file.");
        assert_eq!(s.status_message(), Some("No data rows found in CSV file."));
        assert_eq!(s.dataset().unwrap().filename(), "units.csv");
    }

    #[test]
    fn overrides_survive_reload_of_same_file() {
        let mut s = session();
        s.load_buffer(CSV.as_bytes(), "units.csv").unwrap();
        s.override_column_type("units", ColumnType::String).unwrap();
        assert_eq!(s.dataset().unwrap().column_type("units"), Some(ColumnType::String));

        s.load_buffer(CSV.as_bytes(), "units.csv").unwrap();
        assert_eq!(s.dataset().unwrap().column_type("units"), Some(ColumnType::String));

        s.load_buffer(CSV.as_bytes(), "other.csv").unwrap();
        assert_eq!(s.dataset().unwrap().column_type("units"), Some(ColumnType::Number));
    }

    #[test]
    fn override_without_dataset_or_column_fails() {
        let mut s = session();
        assert!(s.override_column_type("units", ColumnType::Number).is_err());
        s.load_buffer(CSV.as_bytes(), "units.csv").unwrap();
        assert_eq!(
            s.override_column_type("nope", ColumnType::Number),
            Err(DashError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn restore_brings_back_dataset_and_chart() {
        let mut first = session();
        first.load_buffer(CSV.as_bytes(), "units.csv").unwrap();
        let spec = ChartSpec::new(ChartKind::Bar, "region", "units");
        first.set_chart_spec(spec.clone());

        let mut second = Session::new(first.store().clone());
        assert!(second.restore());
        assert_eq!(second.dataset(), first.dataset());
        assert_eq!(second.chart_spec(), Some(&spec));
    }

    #[test]
    fn disabled_persistence_writes_no_snapshots() {
        let mut config = AppConfig::default();
        config.limits.enable_data_persistence = false;
        let mut s = Session::with_config(MemoryStore::new(), config);
        s.load_buffer(CSV.as_bytes(), "units.csv").unwrap();
        assert!(s.store().keys().unwrap().is_empty());
        assert!(!s.restore());
    }

    #[test]
    fn limits_are_stored_and_applied() {
        let mut s = session();
        s.update_limits(Limits {
            max_rows: 1,
            ..Limits::default()
        });
        assert!(s.load_buffer(CSV.as_bytes(), "units.csv").is_err());

        let reopened = Session::new(s.store().clone());
        assert_eq!(reopened.config().limits.max_rows, 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut s = session();
        s.load_sample(SampleDataset::Sales).unwrap();
        s.clear();
        assert!(s.dataset().is_none());
        assert!(s.chart_data().is_none());
        assert!(s.stats().is_empty());
        assert!(!s.restore());
    }
}
