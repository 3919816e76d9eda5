use dashgen::chart::{ChartKind, ChartSpec};
use dashgen::data::model::{CellValue, ColumnType};
use dashgen::data::samples::SampleDataset;
use dashgen::storage::{self, FileStore, KeyValueStore, MemoryStore};
use dashgen::Session;

#[test]
fn session_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();

    let expected = {
        let mut session = Session::new(FileStore::open(dir.path()).unwrap());
        session.load_sample(SampleDataset::Fitness).unwrap();
        session
            .override_column_type("workout", ColumnType::String)
            .unwrap();
        session.set_chart_spec(
            ChartSpec::new(ChartKind::Bar, "workout", "calories").with_title("Calories by workout"),
        );
        session.dataset().unwrap().clone()
    };

    let mut session = Session::new(FileStore::open(dir.path()).unwrap());
    assert!(session.restore());
    let restored = session.dataset().unwrap();
    assert_eq!(restored, &expected);
    assert!(matches!(restored.rows()[0].get("date"), CellValue::Date(_)));
    assert_eq!(session.chart_spec().unwrap().kind, ChartKind::Bar);
    assert!(session.chart_data().is_some());

    let keys = session.store().keys().unwrap();
    assert!(keys.contains(&storage::column_types_key("fitness.csv")));
}

#[test]
fn stale_chart_is_replaced_by_suggestion() {
    let mut store = MemoryStore::new();
    let mut session = Session::new(store.clone());
    session.load_sample(SampleDataset::Sales).unwrap();
    store = session.store().clone();
    storage::save_chart_spec(&mut store, &ChartSpec::new(ChartKind::Pie, "gone", "units"));

    let mut session = Session::new(store);
    assert!(session.restore());
    assert_eq!(session.chart_spec().unwrap().kind, ChartKind::Line);
}

#[test]
fn full_store_degrades_to_no_state() {
    let mut session = Session::new(MemoryStore::with_quota(256));
    let dataset = session.load_sample(SampleDataset::Sales).unwrap();
    assert_eq!(dataset.len(), 60);
    assert!(session.status_message().is_none());
    // the dataset snapshot did not fit, so there is nothing to restore
    assert!(!session.restore());
}

#[test]
fn storage_info_tracks_snapshots() {
    let mut store = MemoryStore::new();
    assert_eq!(storage::storage_info(&mut store).unwrap().used, 0);

    let mut session = Session::new(store);
    session.load_sample(SampleDataset::Fitness).unwrap();
    let mut store = session.store().clone();
    let info = storage::storage_info(&mut store).unwrap();
    assert!(info.used > 1000);
    assert!(info.percentage < 100.0);
}
