//! Domain types shared across services and the HTTP API
//!
//! Device payloads are dynamic JSON on the wire; everything is converted to
//! these typed records at the ingestion boundary. Unknown fields are dropped
//! here; the one exception is tag-state files, which round-trip through
//! `serde_json::Map` in the tag store to preserve fields we don't model.

use serde::{Deserialize, Deserializer, Serialize};

/// Model prefix reserved for custom catalog entries
pub const CUSTOM_MODEL_PREFIX: &str = "9000";

/// Category value for user-created catalog entries
pub const CATEGORY_CUSTOM: &str = "custom";
/// Category value for vendor-provided catalog entries
pub const CATEGORY_OFFICIAL: &str = "official";

/// One logical content entry in the metadata catalog.
///
/// Matches the custom catalog file's JSON shape. `audio_id` and `hash` are
/// arrays because content re-releases accumulate keys over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Sequential identifier within the custom catalog ("0", "1", ...)
    #[serde(default)]
    pub no: String,
    /// Model id the box reports for a tag programmed with this entry
    #[serde(default)]
    pub model: String,
    /// Audio ids; source JSON may carry strings or numbers
    #[serde(default, deserialize_with = "string_or_number_vec")]
    pub audio_id: Vec<String>,
    /// Content hashes (hex); matched case-insensitively
    #[serde(default)]
    pub hash: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub episodes: String,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub pic: String,
}

/// Accept `"42"`, `42`, `["42", 43]`, or null for audio id fields.
fn string_or_number_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(StringOrNumber),
        Many(Vec<StringOrNumber>),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    impl From<StringOrNumber> for String {
        fn from(v: StringOrNumber) -> String {
            match v {
                StringOrNumber::String(s) => s,
                StringOrNumber::Number(n) => n.to_string(),
            }
        }
    }

    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(OneOrMany::One(v)) => vec![v.into()],
        Some(OneOrMany::Many(vs)) => vs.into_iter().map(String::from).collect(),
    })
}

/// One audio file discovered in the content store.
///
/// Header fields are present only if directory header enrichment succeeded
/// for the file's parent directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentFile {
    /// Library-relative path with forward slashes ("folder/file.taf")
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Audio id from the content header
    pub audio_id: Option<u64>,
    /// Content hash (lowercase hex) from the content header
    pub hash: Option<String>,
    /// Per-track durations in seconds
    pub track_seconds: Vec<u32>,
}

impl ContentFile {
    pub fn new(name: String, size: u64) -> Self {
        Self {
            name,
            size,
            audio_id: None,
            hash: None,
            track_seconds: Vec::new(),
        }
    }

    /// Parent directory portion of `name` ("" for the library root)
    pub fn directory(&self) -> &str {
        match self.name.rfind('/') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }

    /// Filename portion of `name`
    pub fn filename(&self) -> &str {
        match self.name.rfind('/') {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }
}

/// Content file joined to its catalog entry (content-centric view)
#[derive(Debug, Clone, Serialize)]
pub struct ContentFileView {
    pub name: String,
    pub size: u64,
    pub audio_id: Option<u64>,
    pub hash: Option<String>,
    pub track_count: Option<usize>,
    pub track_seconds: Option<Vec<u32>>,
    pub linked_entry: Option<CatalogEntry>,
    pub is_linked: bool,
}

/// Derived tag lifecycle status. Never stored; always recomputable from
/// `(model, source)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    Unconfigured,
    Unassigned,
    Assigned,
}

impl TagStatus {
    /// unconfigured if no model, unassigned if model but no source,
    /// else assigned
    pub fn derive(model: &str, source: &str) -> Self {
        if model.is_empty() {
            TagStatus::Unconfigured
        } else if source.is_empty() {
            TagStatus::Unassigned
        } else {
            TagStatus::Assigned
        }
    }
}

/// Catalog entry summary attached to a tag or content file view
#[derive(Debug, Clone, Serialize)]
pub struct LinkedEntry {
    pub series: String,
    pub title: String,
    pub episodes: String,
    pub pic: String,
    pub category: String,
}

impl From<&CatalogEntry> for LinkedEntry {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            series: entry.series.clone(),
            title: entry.series.clone(),
            episodes: entry.episodes.clone(),
            pic: entry.pic.clone(),
            category: if entry.category.is_empty() {
                CATEGORY_CUSTOM.to_string()
            } else {
                entry.category.clone()
            },
        }
    }
}

/// One physical proximity tag as presented to callers.
///
/// Tags are created by the hardware when first presented to a box; this
/// service only reads them and, via the link operation, partially updates
/// their state files.
#[derive(Debug, Clone, Serialize)]
pub struct TagRecord {
    /// 16 hex characters, uppercase
    pub uid: String,
    pub box_id: String,
    pub model: String,
    pub source: String,
    pub status: TagStatus,
    pub is_custom: bool,
    pub nocloud: bool,
    pub linked_entry: Option<LinkedEntry>,
    /// State file mtime (seconds since epoch), when known
    pub last_modified: Option<u64>,
}

/// One box registration from the hub's registration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxRegistration {
    /// Certificate id (the hub API's "overlay" parameter)
    pub id: String,
    /// Display name
    pub name: String,
}
