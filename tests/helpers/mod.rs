//! Shared test helpers: fixture data trees and an in-process mock hub

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use tagshelf::config::{AppConfig, CacheConfig, Config, HubConfig, VolumesConfig};

/// Temporary data directory with the hub volume layout
pub struct Fixture {
    pub data: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let data = TempDir::new().expect("create temp data dir");
        for sub in ["config", "library", "content"] {
            std::fs::create_dir_all(data.path().join(sub)).unwrap();
        }
        Self { data }
    }

    pub fn data_path(&self) -> PathBuf {
        self.data.path().to_path_buf()
    }

    /// Write a content file into the library
    pub fn write_library_file(&self, relative: &str, bytes: &[u8]) {
        let path = self.data.path().join("library").join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    /// Write a per-tag hardware state file
    pub fn write_tag_state(&self, box_dir: &str, uid_prefix: &str, state: &Value) -> PathBuf {
        let dir = self
            .data
            .path()
            .join("content")
            .join(box_dir)
            .join(uid_prefix);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("500304E0.json");
        std::fs::write(&path, serde_json::to_string_pretty(state).unwrap()).unwrap();
        path
    }

    /// Write the box registration file
    pub fn write_registrations(&self, text: &str) {
        std::fs::write(
            self.data.path().join("config").join("config.overlay.ini"),
            text,
        )
        .unwrap();
    }

    /// Service config pointing at this fixture and the given hub
    pub fn config(&self, hub_url: &str) -> Config {
        Config {
            hub: HubConfig {
                url: hub_url.to_string(),
                api_base: "/api".to_string(),
                timeout_secs: 5,
            },
            volumes: VolumesConfig {
                data_path: self.data_path(),
            },
            app: AppConfig {
                bind_addr: "127.0.0.1:0".to_string(),
                auto_reload_config: false,
            },
            cache: CacheConfig {
                content_ttl_secs: 300,
                catalog_ttl_secs: 60,
            },
        }
    }
}

/// Canned responses served by the mock hub
#[derive(Default)]
pub struct MockHub {
    /// Custom catalog entries (JSON array)
    pub custom_catalog: Value,
    /// Official catalog entries (JSON array)
    pub official_catalog: Value,
    /// Directory path -> file index payload ("" is the library root)
    pub file_indexes: HashMap<String, Value>,
    /// Box id -> tag index payload ({"tags": [...]})
    pub tag_indexes: HashMap<String, Value>,
    /// Box id -> raw last-played setting value
    pub last_played: HashMap<String, String>,
    /// Directory paths whose file index fetch fails with a server error
    pub failing_paths: Vec<String>,
    /// When set, the tag index endpoint fails with a server error
    pub tag_index_fails: bool,
}

impl MockHub {
    pub fn new() -> Self {
        Self {
            custom_catalog: json!([]),
            official_catalog: json!([]),
            ..Default::default()
        }
    }

    /// Spawn the mock hub on an ephemeral port, returning its base URL
    pub async fn spawn(self) -> String {
        let state = Arc::new(self);

        async fn file_index(
            State(hub): State<Arc<MockHub>>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Result<Json<Value>, axum::http::StatusCode> {
            let path = params.get("path").cloned().unwrap_or_default();
            if hub.failing_paths.contains(&path) {
                return Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
            }
            Ok(Json(
                hub.file_indexes
                    .get(&path)
                    .cloned()
                    .unwrap_or_else(|| json!({"files": [], "directories": []})),
            ))
        }

        async fn tag_index(
            State(hub): State<Arc<MockHub>>,
            Query(params): Query<HashMap<String, String>>,
        ) -> Result<Json<Value>, axum::http::StatusCode> {
            if hub.tag_index_fails {
                return Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
            }
            let overlay = params.get("overlay").cloned().unwrap_or_default();
            Ok(Json(
                hub.tag_indexes
                    .get(&overlay)
                    .cloned()
                    .unwrap_or_else(|| json!({"tags": []})),
            ))
        }

        async fn last_played(
            State(hub): State<Arc<MockHub>>,
            Query(params): Query<HashMap<String, String>>,
        ) -> String {
            let overlay = params.get("overlay").cloned().unwrap_or_default();
            hub.last_played.get(&overlay).cloned().unwrap_or_default()
        }

        let router = Router::new()
            .route("/web", get(|| async { "hub web ui" }))
            .route(
                "/api/catalogCustomJson",
                get(|State(hub): State<Arc<MockHub>>| async move {
                    Json(hub.custom_catalog.clone())
                }),
            )
            .route(
                "/api/catalogJson",
                get(|State(hub): State<Arc<MockHub>>| async move {
                    Json(hub.official_catalog.clone())
                }),
            )
            .route("/api/fileIndex", get(file_index))
            .route("/api/tagIndex", get(tag_index))
            .route("/api/settings/get/internal.last_played", get(last_played))
            .route("/api/triggerWriteConfig", get(|| async { "OK" }))
            .route("/api/catalogJsonUpdate", get(|| async { "OK" }))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock hub");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

/// A file index payload with headered content files
pub fn file_index_payload(files: &[(&str, u64, Option<(u64, &str, &[u32])>)]) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|(name, size, header)| match header {
            Some((audio_id, hash, tracks)) => json!({
                "name": name,
                "size": size,
                "tafHeader": {
                    "audioId": audio_id,
                    "sha1Hash": hash,
                    "trackSeconds": tracks,
                }
            }),
            None => json!({"name": name, "size": size}),
        })
        .collect();
    json!({"files": files, "directories": []})
}

/// A minimal custom catalog entry payload
pub fn catalog_entry_payload(no: &str, model: &str, audio_ids: &[&str], hashes: &[&str]) -> Value {
    json!({
        "no": no,
        "model": model,
        "audio_id": audio_ids,
        "hash": hashes,
        "title": format!("Title {model}"),
        "series": format!("Series {model}"),
        "episodes": "Episode 1",
        "tracks": [],
        "release": "0",
        "language": "en-us",
        "category": "custom",
        "pic": ""
    })
}
