//! Catalog store integration tests over a temp config directory

mod helpers;

use helpers::Fixture;
use serde_json::{json, Value};
use tagshelf::services::catalog::{CatalogStore, EntryCreateRequest, EntryUpdateRequest};
use tagshelf::Error;

fn store(fixture: &Fixture) -> CatalogStore {
    CatalogStore::new(fixture.data_path().join("config"))
}

fn create_request(series: &str) -> EntryCreateRequest {
    EntryCreateRequest {
        model: None,
        audio_id: "1768543459".to_string(),
        hash: "e5e463291034471c3420ae3d433579c4".to_string(),
        series: series.to_string(),
        episodes: "Episode 1".to_string(),
        title: String::new(),
        tracks: vec!["Track 1".to_string()],
        language: "en-us".to_string(),
        pic: String::new(),
    }
}

#[test]
fn load_of_missing_file_is_empty() {
    let fixture = Fixture::new();
    assert!(store(&fixture).load().is_empty());
}

#[test]
fn load_degrades_on_invalid_json() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.data_path().join("config/catalog.custom.json"),
        "{not json",
    )
    .unwrap();
    assert!(store(&fixture).load().is_empty());
}

#[test]
fn create_assigns_sequence_and_defaults() {
    let fixture = Fixture::new();
    let store = store(&fixture);

    let first = store.create("900001".to_string(), create_request("First")).unwrap();
    assert_eq!(first.no, "0");
    assert_eq!(first.category, "custom");
    // Title falls back to the series when omitted
    assert_eq!(first.title, "First");
    assert_eq!(first.audio_id, vec!["1768543459".to_string()]);

    let second = store.create("900002".to_string(), create_request("Second")).unwrap();
    assert_eq!(second.no, "1");

    let entries = store.load();
    assert_eq!(entries.len(), 2);
}

#[test]
fn create_rejects_duplicate_model() {
    let fixture = Fixture::new();
    let store = store(&fixture);
    store.create("900001".to_string(), create_request("First")).unwrap();
    let result = store.create("900001".to_string(), create_request("Again"));
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn update_changes_only_provided_fields() {
    let fixture = Fixture::new();
    let store = store(&fixture);
    let created = store.create("900001".to_string(), create_request("First")).unwrap();

    let updated = store
        .update(
            &created.no,
            EntryUpdateRequest {
                episodes: Some("Episode 2".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.episodes, "Episode 2");
    assert_eq!(updated.series, "First");
    assert_eq!(updated.model, "900001");
}

#[test]
fn update_of_unknown_no_is_not_found() {
    let fixture = Fixture::new();
    let result = store(&fixture).update("42", EntryUpdateRequest::default());
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn delete_removes_entry() {
    let fixture = Fixture::new();
    let store = store(&fixture);
    let created = store.create("900001".to_string(), create_request("First")).unwrap();
    store.delete(&created.no).unwrap();
    assert!(store.load().is_empty());
    assert!(matches!(store.delete(&created.no), Err(Error::NotFound(_))));
}

#[test]
fn save_creates_backup_of_previous_file() {
    let fixture = Fixture::new();
    let store = store(&fixture);
    store.create("900001".to_string(), create_request("First")).unwrap();
    store.create("900002".to_string(), create_request("Second")).unwrap();

    let backups: Vec<_> = std::fs::read_dir(fixture.data_path().join("config"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("catalog.custom.backup.")
        })
        .collect();
    assert!(!backups.is_empty(), "second save should back up the first");
}

#[test]
fn save_leaves_no_temp_files_behind() {
    let fixture = Fixture::new();
    let store = store(&fixture);
    store.create("900001".to_string(), create_request("First")).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(fixture.data_path().join("config"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn missing_no_fields_are_assigned_from_position() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.data_path().join("config/catalog.custom.json"),
        serde_json::to_string(&json!([
            {"model": "900001", "audio_id": ["1"], "hash": ["aa"]},
            {"model": "900002", "audio_id": ["2"], "hash": ["bb"]}
        ]))
        .unwrap(),
    )
    .unwrap();

    let entries = store(&fixture).load();
    assert_eq!(entries[0].no, "0");
    assert_eq!(entries[1].no, "1");
}

#[test]
fn next_custom_model_continues_range() {
    let fixture = Fixture::new();
    let store = store(&fixture);
    assert_eq!(store.next_custom_model(), "900001");

    store.create("900001".to_string(), create_request("First")).unwrap();
    assert_eq!(store.next_custom_model(), "900002");

    store.create("900007".to_string(), create_request("Gap")).unwrap();
    assert_eq!(store.next_custom_model(), "900008");
}

#[test]
fn get_by_no_and_model() {
    let fixture = Fixture::new();
    let store = store(&fixture);
    let created = store.create("900001".to_string(), create_request("First")).unwrap();

    assert_eq!(store.get_by_no(&created.no).unwrap().model, "900001");
    assert_eq!(store.get_by_model("900001").unwrap().no, created.no);
    assert!(store.get_by_no("99").is_none());
    assert!(store.get_by_model("nope").is_none());
}

#[test]
fn saved_file_is_valid_json_array() {
    let fixture = Fixture::new();
    store(&fixture)
        .create("900001".to_string(), create_request("First"))
        .unwrap();
    let text =
        std::fs::read_to_string(fixture.data_path().join("config/catalog.custom.json")).unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();
    assert!(value.is_array());
    assert_eq!(value.as_array().unwrap().len(), 1);
}
