//! HTTP client for the hub API
//!
//! The hub is the local device-cloud service the box talks to. It owns the
//! content file index, the vendor catalog, per-box tag indexes, and device
//! settings; this client consumes those endpoints and converts the dynamic
//! JSON payloads to typed records at the boundary. Extra fields in responses
//! are dropped.
//!
//! All methods return `Result`; whether a failure degrades the view or fails
//! the request is the caller's decision (enrichment fetches are absorbed,
//! mutations propagate).

use crate::config::HubConfig;
use crate::error::{Error, Result};
use crate::models::{CatalogEntry, CATEGORY_CUSTOM, CATEGORY_OFFICIAL};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Directory listing from the hub file index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileIndex {
    #[serde(default)]
    pub files: Vec<IndexedFile>,
    #[serde(default)]
    pub directories: Vec<IndexedDirectory>,
}

/// One file in a hub directory listing
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    /// Technical header pre-extracted by the hub; absent for non-audio files
    #[serde(rename = "tafHeader")]
    pub taf_header: Option<ContentHeader>,
}

/// One subdirectory in a hub directory listing
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedDirectory {
    pub name: String,
}

/// Pre-extracted technical header of a content file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentHeader {
    #[serde(rename = "audioId")]
    pub audio_id: Option<u64>,
    #[serde(rename = "sha1Hash", default)]
    pub sha1_hash: String,
    #[serde(rename = "trackSeconds", default)]
    pub track_seconds: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TagIndexResponse {
    #[serde(default)]
    tags: Vec<HubTag>,
}

/// One tag as reported by the hub's per-box tag index
#[derive(Debug, Clone, Deserialize)]
pub struct HubTag {
    /// Round-trip uid, 16 hex chars
    #[serde(default)]
    pub ruid: String,
    /// Source reference the box will play ("lib://..." or empty)
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub nocloud: bool,
    /// Descriptive info the hub associates with the tag; may be stale
    #[serde(rename = "contentInfo", default)]
    pub info: HubTagInfo,
}

/// Descriptive content info carried alongside a hub tag
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubTagInfo {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub episode: String,
    #[serde(default)]
    pub picture: String,
}

impl HubTagInfo {
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
            && self.series.is_empty()
            && self.episode.is_empty()
            && self.picture.is_empty()
    }
}

/// Client for the hub API
#[derive(Clone)]
pub struct HubClient {
    client: Client,
    base_url: String,
    api_base: String,
}

impl HubClient {
    /// Create a client from hub connection settings.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be built (does not happen with a
    /// valid TLS backend).
    pub fn new(config: &HubConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_base: config.api_base.clone(),
        }
    }

    /// Build a full API URL for an endpoint path.
    ///
    /// The hub serves its web UI under `/web` and its API at the root, so a
    /// configured base URL ending in `/web` is trimmed for API calls.
    fn api_url(&self, endpoint: &str) -> String {
        let base = self.base_url.strip_suffix("/web").unwrap_or(&self.base_url);
        format!("{}{}/{}", base, self.api_base, endpoint.trim_start_matches('/'))
    }

    /// Check whether the hub is reachable (GET on the web root)
    pub async fn check_connection(&self) -> bool {
        let base = self.base_url.trim_end_matches('/');
        let url = if base.ends_with("/web") {
            base.to_string()
        } else {
            format!("{}/web", base)
        };
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Hub not accessible: {}", e);
                false
            }
        }
    }

    /// Fetch the custom catalog. Entries without a category are custom.
    pub async fn custom_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let url = self.api_url("catalogCustomJson");
        let mut entries: Vec<CatalogEntry> = self.get_json(&url).await?;
        for entry in &mut entries {
            if entry.category.is_empty() {
                entry.category = CATEGORY_CUSTOM.to_string();
            }
        }
        tracing::debug!("Fetched {} custom catalog entries", entries.len());
        Ok(entries)
    }

    /// Fetch the vendor catalog. Entries without a category are official.
    pub async fn official_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let url = self.api_url("catalogJson");
        let mut entries: Vec<CatalogEntry> = self.get_json(&url).await?;
        for entry in &mut entries {
            if entry.category.is_empty() {
                entry.category = CATEGORY_OFFICIAL.to_string();
            }
        }
        tracing::debug!("Fetched {} official catalog entries", entries.len());
        Ok(entries)
    }

    /// Fetch the file index for one library directory ("" for the root)
    pub async fn file_index(&self, path: &str) -> Result<FileIndex> {
        let url = self.api_url("fileIndex");
        let mut request = self.client.get(&url).query(&[("special", "library")]);
        if !path.is_empty() {
            request = request.query(&[("path", path)]);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "file index for '{}' returned {}",
                path, status
            )));
        }
        Ok(response.json().await?)
    }

    /// Fetch the full tag index for a box (addressed by certificate id)
    pub async fn tag_index(&self, box_id: &str) -> Result<Vec<HubTag>> {
        let url = self.api_url("tagIndex");
        let response = self
            .client
            .get(&url)
            .query(&[("overlay", box_id)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "tag index for box {} returned {}",
                box_id, status
            )));
        }
        let index: TagIndexResponse = response.json().await?;
        tracing::debug!("Got {} tags for box {}", index.tags.len(), box_id);
        Ok(index.tags)
    }

    /// Read the device's live "last played" setting for a box.
    ///
    /// Returns the raw trimmed value; validation (hex shape, placeholders)
    /// belongs to the tag store's two-tier resolution.
    pub async fn last_played_setting(&self, box_id: &str) -> Result<Option<String>> {
        let url = self.api_url("settings/get/internal.last_played");
        let response = self
            .client
            .get(&url)
            .query(&[("overlay", box_id)])
            .timeout(Duration::from_secs(5))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let text = response.text().await?;
        let value = text.trim().trim_matches('"').to_lowercase();
        Ok(if value.is_empty() { None } else { Some(value) })
    }

    /// Ask the hub to write its config and reload the catalog
    pub async fn trigger_config_reload(&self) -> bool {
        let write_url = self.api_url("triggerWriteConfig");
        match self.client.get(&write_url).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!("triggerWriteConfig returned {}", response.status());
            }
            Err(e) => {
                tracing::warn!("triggerWriteConfig failed: {}", e);
            }
            _ => {}
        }

        let reload_url = self.api_url("catalogJsonUpdate");
        match self.client.get(&reload_url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Triggered hub config write and catalog reload");
                true
            }
            Ok(response) => {
                tracing::warn!("catalogJsonUpdate returned {}", response.status());
                false
            }
            Err(e) => {
                tracing::warn!("catalogJsonUpdate failed: {}", e);
                false
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("{} returned {}", url, status)));
        }
        Ok(response.json().await?)
    }
}
