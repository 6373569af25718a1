//! Tag state store integration tests over fixture directory trees

mod helpers;

use helpers::Fixture;
use serde_json::{json, Value};
use std::thread::sleep;
use std::time::Duration;
use tagshelf::services::tags::TagStateStore;
use tagshelf::Error;

fn store(fixture: &Fixture) -> TagStateStore {
    TagStateStore::new(fixture.data_path().join("content"))
}

#[test]
fn link_tag_updates_only_owned_fields() {
    let fixture = Fixture::new();
    fixture.write_tag_state(
        "AABBCCDD11223344",
        "1A2B3C4D",
        &json!({
            "cloud_ruid": "1a2b3c4d5e6f7890",
            "model": "",
            "source": "",
            "nocloud": false,
            "otherField": {"keep": true},
            "valid": 7
        }),
    );

    let source = store(&fixture)
        .link_tag("1A2B3C4D5E6F7890", "BOX1", "900002", "folder/file.taf")
        .expect("link should succeed");
    assert_eq!(source, "lib://folder/file.taf");

    let path = fixture
        .data_path()
        .join("content/AABBCCDD11223344/1A2B3C4D/500304E0.json");
    let state: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(state["model"], "900002");
    assert_eq!(state["source"], "lib://folder/file.taf");
    assert_eq!(state["nocloud"], true);
    // Unrelated fields must survive the partial update untouched
    assert_eq!(state["otherField"], json!({"keep": true}));
    assert_eq!(state["valid"], 7);
    assert_eq!(state["cloud_ruid"], "1a2b3c4d5e6f7890");
}

#[test]
fn link_tag_matches_cloud_ruid_case_insensitively() {
    let fixture = Fixture::new();
    // cloud_ruid carries a transport prefix; only the trailing 16 hex count
    fixture.write_tag_state(
        "BOXDIR01",
        "AABBCCDD",
        &json!({
            "cloud_ruid": "04:99:AABBCCDD00112233",
            "model": "old",
            "source": "lib://old.taf"
        }),
    );

    store(&fixture)
        .link_tag("aabbccdd00112233", "ignored", "900001", "new.taf")
        .expect("case-insensitive match should succeed");

    let path = fixture
        .data_path()
        .join("content/BOXDIR01/AABBCCDD/500304E0.json");
    let state: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(state["source"], "lib://new.taf");
}

#[test]
fn link_tag_falls_back_to_supplied_box_dir() {
    let fixture = Fixture::new();
    // State file exists but its cloud_ruid does not mention the uid, so the
    // search misses and the supplied box id locates the file.
    fixture.write_tag_state(
        "BOX1",
        "1A2B3C4D",
        &json!({"model": "", "source": ""}),
    );

    store(&fixture)
        .link_tag("1A2B3C4D5E6F7890", "BOX1", "900002", "a.taf")
        .expect("fallback via box id should succeed");

    let path = fixture.data_path().join("content/BOX1/1A2B3C4D/500304E0.json");
    let state: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(state["model"], "900002");
}

#[test]
fn link_tag_without_target_is_write_failure() {
    let fixture = Fixture::new();
    let result = store(&fixture).link_tag("1A2B3C4D5E6F7890", "BOX1", "900002", "a.taf");
    assert!(matches!(result, Err(Error::WriteFailure(_))));
}

#[test]
fn link_tag_rejects_malformed_uid() {
    let fixture = Fixture::new();
    let result = store(&fixture).link_tag("nothex", "BOX1", "900002", "a.taf");
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn link_tag_rejects_path_traversal() {
    let fixture = Fixture::new();
    fixture.write_tag_state("BOX1", "1A2B3C4D", &json!({"model": ""}));
    let result = store(&fixture).link_tag(
        "1A2B3C4D5E6F7890",
        "BOX1",
        "900002",
        "../../../etc/passwd",
    );
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn latest_uid_prefers_newest_mtime() {
    let fixture = Fixture::new();
    fixture.write_tag_state("BOXDIR01", "AAAAAAAA", &json!({"model": "900001"}));
    // Coarse filesystems round mtimes; leave a visible gap
    sleep(Duration::from_millis(30));
    fixture.write_tag_state("BOXDIR01", "BBBBBBBB", &json!({"model": "900002"}));

    let uid = store(&fixture).latest_uid_on_disk("BOXDIR01");
    assert_eq!(uid.as_deref(), Some("bbbbbbbb500304e0"));
}

#[test]
fn latest_uid_ignores_placeholder_and_non_hex_dirs() {
    let fixture = Fixture::new();
    fixture.write_tag_state("BOXDIR01", "AAAAAAAA", &json!({"model": "900001"}));
    sleep(Duration::from_millis(30));
    // Newer, but placeholders and non-hex names never win
    fixture.write_tag_state("BOXDIR01", "00000001", &json!({"model": "x"}));
    fixture.write_tag_state("BOXDIR01", "00000000", &json!({"model": "x"}));
    fixture.write_tag_state("BOXDIR01", "notahexd", &json!({"model": "x"}));

    let uid = store(&fixture).latest_uid_on_disk("BOXDIR01");
    assert_eq!(uid.as_deref(), Some("aaaaaaaa500304e0"));
}

#[test]
fn latest_uid_none_without_candidates() {
    let fixture = Fixture::new();
    fixture.write_tag_state("BOXDIR01", "00000001", &json!({"model": "x"}));
    assert_eq!(store(&fixture).latest_uid_on_disk("BOXDIR01"), None);
    assert_eq!(store(&fixture).latest_uid_on_disk("MISSING"), None);
}

#[test]
fn list_tags_derives_status_from_state() {
    let fixture = Fixture::new();
    fixture.write_tag_state(
        "BOXDIR01",
        "AAAAAAAA",
        &json!({"cloud_ruid": "aaaaaaaa500304e0", "model": "", "source": ""}),
    );
    fixture.write_tag_state(
        "BOXDIR01",
        "BBBBBBBB",
        &json!({"cloud_ruid": "bbbbbbbb500304e0", "model": "900001", "source": ""}),
    );
    fixture.write_tag_state(
        "BOXDIR01",
        "CCCCCCCC",
        &json!({
            "cloud_ruid": "cccccccc500304e0",
            "model": "900002",
            "source": "lib://a.taf",
            "nocloud": true
        }),
    );

    let mut tags = store(&fixture).list_tags();
    tags.sort_by(|a, b| a.uid.cmp(&b.uid));
    assert_eq!(tags.len(), 3);

    use tagshelf::models::TagStatus;
    assert_eq!(tags[0].uid, "AAAAAAAA500304E0");
    assert_eq!(tags[0].status, TagStatus::Unconfigured);
    assert_eq!(tags[1].status, TagStatus::Unassigned);
    assert_eq!(tags[2].status, TagStatus::Assigned);
    assert!(tags[2].nocloud);
    assert!(tags[2].is_custom);
    assert_eq!(tags[2].box_id, "BOXDIR01");
    assert!(tags[2].last_modified.is_some());
}

#[test]
fn list_tag_state_files_skips_dirs_without_state() {
    let fixture = Fixture::new();
    fixture.write_tag_state("BOXDIR01", "AAAAAAAA", &json!({"model": ""}));
    std::fs::create_dir_all(
        fixture
            .data_path()
            .join("content/BOXDIR01/DDDDDDDD"),
    )
    .unwrap();

    let files = store(&fixture).list_tag_state_files("BOXDIR01");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, "AAAAAAAA500304E0");
}
