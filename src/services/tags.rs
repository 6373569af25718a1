//! Per-tag hardware state files
//!
//! Each tag the hardware has seen gets a JSON state file at
//! `<content root>/<box dir>/<uid prefix>/500304E0.json`, where the uid
//! prefix is the first 8 hex characters of the tag uid and `500304E0` is the
//! fixed hardware suffix. The file is created by the hardware; this store
//! only reads it and, for the link operation, performs a partial update that
//! preserves every field it does not own.

use crate::error::{Error, Result};
use crate::models::{TagRecord, TagStatus, CUSTOM_MODEL_PREFIX};
use crate::services::hub::HubClient;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Fixed hardware suffix completing a tag uid (8 hex chars)
pub const TAG_STATE_SUFFIX: &str = "500304E0";
/// Per-tag state filename within a uid prefix directory
pub const TAG_STATE_FILENAME: &str = "500304E0.json";

/// True for a well-formed tag uid: exactly 16 hexadecimal characters
pub fn is_valid_uid(uid: &str) -> bool {
    uid.len() == 16 && uid.chars().all(|c| c.is_ascii_hexdigit())
}

/// Placeholder uids/directories the hardware writes before a tag is real:
/// all zeros, or the reserved `00000001` prefix.
fn is_placeholder(name: &str) -> bool {
    !name.is_empty()
        && (name.chars().all(|c| c == '0')
            || name.to_ascii_uppercase().starts_with("00000001"))
}

fn is_uid_prefix_dir(name: &str) -> bool {
    name.len() == 8 && name.chars().all(|c| c.is_ascii_hexdigit()) && !is_placeholder(name)
}

/// Reads and updates per-tag hardware state files
pub struct TagStateStore {
    content_root: PathBuf,
}

impl TagStateStore {
    pub fn new(content_root: PathBuf) -> Self {
        Self { content_root }
    }

    fn box_dirs(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.content_root) else {
            debug!("Content root {} not readable", self.content_root.display());
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .map(|n| !n.to_string_lossy().starts_with('.'))
                    .unwrap_or(false)
            })
            .collect();
        dirs.sort();
        dirs
    }

    /// Enumerate the tag state files under one box content directory.
    /// Returns `(uid, state file path)` pairs, uid uppercased.
    pub fn list_tag_state_files(&self, box_dir: &str) -> Vec<(String, PathBuf)> {
        let dir = self.content_root.join(box_dir);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.path().is_dir() || !is_uid_prefix_dir(&name) {
                continue;
            }
            let state_file = entry.path().join(TAG_STATE_FILENAME);
            if state_file.is_file() {
                let uid = format!("{}{}", name.to_uppercase(), TAG_STATE_SUFFIX);
                found.push((uid, state_file));
            }
        }
        found.sort();
        found
    }

    /// All tags known from state files across every box directory
    /// (filesystem-wide view; device data is not consulted).
    pub fn list_tags(&self) -> Vec<TagRecord> {
        let mut tags = Vec::new();
        for box_dir in self.box_dirs() {
            let box_id = box_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for (uid, state_file) in self.list_tag_state_files(&box_id) {
                match read_state_file(&state_file) {
                    Ok(state) => {
                        let model = field_str(&state, "model");
                        let source = field_str(&state, "source");
                        // Prefer the embedded round-trip id when present
                        let cloud_uid = trailing_uid(&field_str(&state, "cloud_ruid"));
                        let uid = cloud_uid.unwrap_or(uid);
                        let status = TagStatus::derive(&model, &source);
                        tags.push(TagRecord {
                            uid,
                            box_id: box_id.clone(),
                            is_custom: model.starts_with(CUSTOM_MODEL_PREFIX),
                            nocloud: state
                                .get("nocloud")
                                .and_then(Value::as_bool)
                                .unwrap_or(false),
                            model,
                            source,
                            status,
                            linked_entry: None,
                            last_modified: mtime_secs(&state_file),
                        });
                    }
                    Err(e) => {
                        warn!("Unreadable tag state file {}: {}", state_file.display(), e);
                    }
                }
            }
        }
        tags
    }

    /// Most recently played tag uid for a box (lowercase), two-tier:
    ///
    /// 1. The device's live "last played" setting, authoritative when it is
    ///    a well-formed, non-placeholder uid.
    /// 2. Newest state-file mtime within the box's content directory.
    pub async fn last_played(
        &self,
        hub: &HubClient,
        box_id: &str,
        box_dir: &str,
    ) -> Option<String> {
        match hub.last_played_setting(box_id).await {
            Ok(Some(value)) => {
                if is_valid_uid(&value) && !is_placeholder(&value) {
                    info!("Last played uid from device setting: {}", value);
                    return Some(value);
                }
                debug!("Device last-played setting unusable: '{}'", value);
            }
            Ok(None) => debug!("Device last-played setting empty"),
            Err(e) => debug!("Device last-played setting failed: {}, trying filesystem", e),
        }

        self.latest_uid_on_disk(box_dir)
    }

    /// Tier 2: uid of the newest tag state file under the box directory,
    /// ignoring non-hex and placeholder directory names.
    pub fn latest_uid_on_disk(&self, box_dir: &str) -> Option<String> {
        let mut latest: Option<(SystemTime, String)> = None;
        for (uid, state_file) in self.list_tag_state_files(box_dir) {
            let Ok(metadata) = std::fs::metadata(&state_file) else {
                continue;
            };
            let Ok(mtime) = metadata.modified() else {
                continue;
            };
            match &latest {
                Some((newest, _)) if *newest >= mtime => {}
                _ => latest = Some((mtime, uid.to_lowercase())),
            }
        }
        match &latest {
            Some((_, uid)) => info!("Last played uid from filesystem: {}", uid),
            None => info!("No valid tag state files under {}", box_dir),
        }
        latest.map(|(_, uid)| uid)
    }

    /// Locate the state file whose embedded `cloud_ruid` ends in `uid`
    /// (case-insensitive), searching every box directory.
    fn find_state_file(&self, uid: &str) -> Option<PathBuf> {
        let wanted = uid.to_uppercase();
        for box_dir in self.box_dirs() {
            let box_id = box_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for (_, state_file) in self.list_tag_state_files(&box_id) {
                let Ok(state) = read_state_file(&state_file) else {
                    continue;
                };
                if trailing_uid(&field_str(&state, "cloud_ruid")).as_deref() == Some(wanted.as_str()) {
                    info!("Found tag {} in {}", uid, state_file.display());
                    return Some(state_file);
                }
            }
        }
        None
    }

    /// Link a tag to a content file: partial update of the tag's state file.
    ///
    /// Only `model`, `source` (a `lib://` path over `content_path`), and the
    /// no-cloud flag change; every other field is preserved. Returns the
    /// written source reference.
    pub fn link_tag(
        &self,
        uid: &str,
        box_id: &str,
        model: &str,
        content_path: &str,
    ) -> Result<String> {
        if !is_valid_uid(uid) {
            return Err(Error::InvalidInput(format!(
                "tag uid must be 16 hex characters, got '{}'",
                uid
            )));
        }
        validate_library_path(content_path)?;

        let state_file = match self.find_state_file(uid) {
            Some(path) => path,
            None => {
                // Fall back to the supplied box id; the uid prefix names
                // the tag directory.
                let fallback = self
                    .content_root
                    .join(box_id)
                    .join(uid[..8].to_uppercase())
                    .join(TAG_STATE_FILENAME);
                warn!(
                    "No state file with cloud_ruid ending {}, trying {}",
                    uid,
                    fallback.display()
                );
                if !fallback.is_file() {
                    return Err(Error::WriteFailure(format!(
                        "tag state file for uid {} not found",
                        uid
                    )));
                }
                fallback
            }
        };

        let mut state = read_state_file(&state_file)
            .map_err(|e| Error::WriteFailure(format!("{}: {}", state_file.display(), e)))?;
        let source = format!("lib://{}", content_path);

        let map = state
            .as_object_mut()
            .ok_or_else(|| Error::WriteFailure("tag state file is not a JSON object".into()))?;
        map.insert("model".to_string(), Value::String(model.to_string()));
        map.insert("source".to_string(), Value::String(source.clone()));
        map.insert("nocloud".to_string(), Value::Bool(true));

        write_state_file(&state_file, &state)?;
        info!("Linked tag {} to {}", uid, source);
        Ok(source)
    }
}

/// Reject absolute paths and parent traversal in library-relative paths
fn validate_library_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidInput("content path is empty".into()));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(Error::InvalidInput("content path must be library-relative".into()));
    }
    if path.split(['/', '\\']).any(|part| part == "..") {
        return Err(Error::InvalidInput("content path may not traverse upward".into()));
    }
    Ok(())
}

/// Trailing 16 hex characters of a round-trip id, uppercased
fn trailing_uid(cloud_ruid: &str) -> Option<String> {
    if !cloud_ruid.is_ascii() || cloud_ruid.len() < 16 {
        return None;
    }
    let tail = &cloud_ruid[cloud_ruid.len() - 16..];
    if tail.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(tail.to_uppercase())
    } else {
        None
    }
}

/// State file mtime as seconds since the epoch
fn mtime_secs(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .and_then(|metadata| metadata.modified().ok())
        .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs())
}

fn field_str(state: &Value, field: &str) -> String {
    state
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn read_state_file(path: &Path) -> std::io::Result<Value> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Atomic replace: temp file in the same directory, then rename.
fn write_state_file(path: &Path, state: &Value) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::WriteFailure("state file has no parent directory".into()))?;
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| Error::WriteFailure(format!("serialize tag state: {}", e)))?;
    let tmp = parent.join(format!(".{}.{}.tmp", TAG_STATE_FILENAME, std::process::id()));
    std::fs::write(&tmp, json.as_bytes())
        .map_err(|e| Error::WriteFailure(format!("write {}: {}", tmp.display(), e)))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        Error::WriteFailure(format!("rename into {}: {}", path.display(), e))
    })?;
    Ok(())
}
