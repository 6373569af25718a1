//! Custom catalog store and lookup index
//!
//! The custom catalog is a JSON array of entries living in the hub config
//! directory. The hub exposes catalog reads over HTTP but not writes, so all
//! mutations here go directly to the file: backup copy, then atomic replace
//! (temp file in the same directory + rename) so concurrent readers never
//! observe a partially written file.

use crate::error::{Error, Result};
use crate::models::{CatalogEntry, CATEGORY_CUSTOM, CUSTOM_MODEL_PREFIX};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Custom catalog filename within the hub config directory
pub const CATALOG_FILENAME: &str = "catalog.custom.json";

/// First model number in the reserved custom range
const FIRST_CUSTOM_MODEL: u64 = 900_001;

/// Request body for creating a catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct EntryCreateRequest {
    /// Model id; auto-assigned from the custom range when omitted
    #[serde(default)]
    pub model: Option<String>,
    pub audio_id: String,
    pub hash: String,
    pub series: String,
    pub episodes: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub pic: String,
}

fn default_language() -> String {
    "en-us".to_string()
}

/// Request body for a partial catalog entry update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryUpdateRequest {
    pub model: Option<String>,
    pub series: Option<String>,
    pub episodes: Option<String>,
    pub title: Option<String>,
    pub tracks: Option<Vec<String>>,
    pub language: Option<String>,
    pub pic: Option<String>,
}

/// Reads and writes the custom catalog file
pub struct CatalogStore {
    catalog_file: PathBuf,
}

impl CatalogStore {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            catalog_file: config_dir.join(CATALOG_FILENAME),
        }
    }

    /// Read all custom entries.
    ///
    /// Entries missing a sequence `no` get their list index (persisted on
    /// the next save). A missing or unparseable file degrades to an empty
    /// catalog.
    pub fn load(&self) -> Vec<CatalogEntry> {
        let text = match std::fs::read_to_string(&self.catalog_file) {
            Ok(text) => text,
            Err(_) => {
                debug!("Catalog file {} not present", self.catalog_file.display());
                return Vec::new();
            }
        };

        let mut entries: Vec<CatalogEntry> = match serde_json::from_str(&text) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Invalid JSON in {}: {}", self.catalog_file.display(), e);
                return Vec::new();
            }
        };

        for (i, entry) in entries.iter_mut().enumerate() {
            if entry.no.is_empty() {
                entry.no = i.to_string();
                debug!("Auto-assigned no={} to catalog entry {}", i, entry.model);
            }
            if entry.category.is_empty() {
                entry.category = CATEGORY_CUSTOM.to_string();
            }
        }
        entries
    }

    pub fn get_by_no(&self, no: &str) -> Option<CatalogEntry> {
        self.load().into_iter().find(|e| e.no == no)
    }

    pub fn get_by_model(&self, model: &str) -> Option<CatalogEntry> {
        self.load().into_iter().find(|e| e.model == model)
    }

    /// Create a new custom entry. The model must be resolved by the caller
    /// (auto-assignment happens at the API layer via [`next_custom_model`]).
    ///
    /// [`next_custom_model`]: CatalogStore::next_custom_model
    pub fn create(&self, model: String, request: EntryCreateRequest) -> Result<CatalogEntry> {
        let mut entries = self.load();

        if entries.iter().any(|e| e.model == model) {
            return Err(Error::InvalidInput(format!(
                "entry with model '{}' already exists",
                model
            )));
        }

        let entry = CatalogEntry {
            no: next_no(&entries),
            model,
            audio_id: vec![request.audio_id],
            hash: vec![request.hash],
            title: if request.title.is_empty() {
                request.series.clone()
            } else {
                request.title
            },
            series: request.series,
            episodes: request.episodes,
            tracks: request.tracks,
            release: "0".to_string(),
            language: request.language,
            category: CATEGORY_CUSTOM.to_string(),
            pic: request.pic,
        };

        entries.push(entry.clone());
        self.save(&entries)?;
        info!("Created catalog entry {} (no: {})", entry.model, entry.no);
        Ok(entry)
    }

    /// Partially update an existing entry by its sequence `no`
    pub fn update(&self, no: &str, request: EntryUpdateRequest) -> Result<CatalogEntry> {
        let mut entries = self.load();
        let entry = entries
            .iter_mut()
            .find(|e| e.no == no)
            .ok_or_else(|| Error::NotFound(format!("catalog entry with no '{}'", no)))?;

        if let Some(model) = request.model {
            entry.model = model;
        }
        if let Some(series) = request.series {
            entry.series = series;
        }
        if let Some(episodes) = request.episodes {
            entry.episodes = episodes;
        }
        if let Some(title) = request.title {
            entry.title = title;
        }
        if let Some(tracks) = request.tracks {
            entry.tracks = tracks;
        }
        if let Some(language) = request.language {
            entry.language = language;
        }
        if let Some(pic) = request.pic {
            entry.pic = pic;
        }

        let updated = entry.clone();
        self.save(&entries)?;
        info!("Updated catalog entry {} (no: {})", updated.model, no);
        Ok(updated)
    }

    /// Delete an entry by its sequence `no`
    pub fn delete(&self, no: &str) -> Result<()> {
        let mut entries = self.load();
        let before = entries.len();
        entries.retain(|e| e.no != no);
        if entries.len() == before {
            return Err(Error::NotFound(format!("catalog entry with no '{}'", no)));
        }
        self.save(&entries)?;
        info!("Deleted catalog entry no: {}", no);
        Ok(())
    }

    /// Next free model number in the reserved custom range
    pub fn next_custom_model(&self) -> String {
        let max = self
            .load()
            .iter()
            .filter_map(|e| {
                e.model
                    .strip_prefix(CUSTOM_MODEL_PREFIX)
                    .and_then(|_| e.model.parse::<u64>().ok())
            })
            .max();
        match max {
            Some(n) if n >= FIRST_CUSTOM_MODEL => (n + 1).to_string(),
            _ => FIRST_CUSTOM_MODEL.to_string(),
        }
    }

    /// Persist the catalog: backup the current file, then atomic replace.
    fn save(&self, entries: &[CatalogEntry]) -> Result<()> {
        let parent = self
            .catalog_file
            .parent()
            .ok_or_else(|| Error::WriteFailure("catalog file has no parent directory".into()))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::WriteFailure(format!("create {}: {}", parent.display(), e)))?;

        if self.catalog_file.exists() {
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let backup = parent.join(format!("catalog.custom.backup.{}.json", stamp));
            if let Err(e) = std::fs::copy(&self.catalog_file, &backup) {
                warn!("Could not create catalog backup {}: {}", backup.display(), e);
            } else {
                info!("Created catalog backup {}", backup.display());
            }
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::WriteFailure(format!("serialize catalog: {}", e)))?;

        let tmp = parent.join(format!(".{}.{}.tmp", CATALOG_FILENAME, std::process::id()));
        std::fs::write(&tmp, json.as_bytes())
            .map_err(|e| Error::WriteFailure(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.catalog_file).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::WriteFailure(format!("rename into {}: {}", self.catalog_file.display(), e))
        })?;

        info!("Saved {} entries to {}", entries.len(), self.catalog_file.display());
        Ok(())
    }
}

fn next_no(entries: &[CatalogEntry]) -> String {
    let max = entries.iter().filter_map(|e| e.no.parse::<u64>().ok()).max();
    match max {
        Some(n) => (n + 1).to_string(),
        None if entries.is_empty() => "0".to_string(),
        None => entries.len().to_string(),
    }
}

/// O(1) lookup maps over catalog entries.
///
/// Built from custom entries first, then official; the first writer of a key
/// wins, so custom entries take precedence over official entries sharing the
/// same key. Lookups never mutate the catalog.
#[derive(Debug, Default, PartialEq)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    by_model: HashMap<String, usize>,
    by_audio_id: HashMap<u64, usize>,
    by_hash: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Build the index from an ordered entry sequence (custom first)
    pub fn build(entries: Vec<CatalogEntry>) -> Self {
        let mut by_model = HashMap::new();
        let mut by_audio_id = HashMap::new();
        let mut by_hash = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            if !entry.model.is_empty() {
                by_model.entry(entry.model.clone()).or_insert(i);
            }
            for audio_id in &entry.audio_id {
                // Audio ids may be string or numeric in source data;
                // non-numeric values are skipped, not rejected.
                match audio_id.parse::<u64>() {
                    Ok(id) => {
                        by_audio_id.entry(id).or_insert(i);
                    }
                    Err(_) => {
                        debug!("Skipping non-numeric audio id '{}' on {}", audio_id, entry.model);
                    }
                }
            }
            for hash in &entry.hash {
                if !hash.is_empty() {
                    by_hash.entry(hash.to_lowercase()).or_insert(i);
                }
            }
        }

        Self {
            entries,
            by_model,
            by_audio_id,
            by_hash,
        }
    }

    pub fn by_model(&self, model: &str) -> Option<&CatalogEntry> {
        self.by_model.get(model).map(|&i| &self.entries[i])
    }

    pub fn by_audio_id(&self, audio_id: u64) -> Option<&CatalogEntry> {
        self.by_audio_id.get(&audio_id).map(|&i| &self.entries[i])
    }

    /// Hash lookup is case-insensitive
    pub fn by_hash(&self, hash: &str) -> Option<&CatalogEntry> {
        self.by_hash
            .get(&hash.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
