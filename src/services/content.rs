//! Content store scanner
//!
//! Discovers audio content files and best-effort enriches them with the
//! technical headers the hub pre-extracts (audio id, content hash, track
//! durations). Two discovery strategies, tried in order:
//!
//! 1. Local enumeration: walk the library directory on disk (fast path).
//! 2. Remote listing: iterative worklist walk of the hub file index, used
//!    only when the local walk yields zero files (e.g. the library volume is
//!    not mounted into this container).
//!
//! Header enrichment groups files by parent directory and issues one hub
//! fetch per distinct directory, all concurrently. Any subset of those
//! fetches may fail without aborting the scan; affected files simply remain
//! headerless and cannot match by audio id or hash.

use crate::error::Result;
use crate::models::ContentFile;
use crate::services::hub::{FileIndex, HubClient};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Content file extension (case-insensitive)
const CONTENT_EXTENSION: &str = "taf";

/// Scanner over one content library root
pub struct ContentScanner {
    library_root: PathBuf,
}

impl ContentScanner {
    pub fn new(library_root: PathBuf) -> Self {
        Self { library_root }
    }

    /// Cache key for this scanner's results
    pub fn cache_key(&self) -> String {
        self.library_root.to_string_lossy().into_owned()
    }

    /// Full scan: local enumeration, remote fallback, header enrichment.
    pub async fn scan(&self, hub: &HubClient) -> Vec<ContentFile> {
        let mut files = self.scan_local();

        if files.is_empty() {
            tracing::info!(
                "No content files under {}, falling back to hub file index",
                self.library_root.display()
            );
            files = scan_remote(hub).await;
        }

        enrich_headers(hub, &mut files).await;
        files
    }

    /// Strategy 1: recursively list content files on disk.
    ///
    /// Hidden (dot-prefixed) files and directories are skipped. Produces
    /// records without headers; `name` is the forward-slash relative path.
    pub fn scan_local(&self) -> Vec<ContentFile> {
        if !self.library_root.is_dir() {
            tracing::debug!(
                "Library root {} is not a directory",
                self.library_root.display()
            );
            return Vec::new();
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.library_root)
            .follow_links(false)
            .into_iter()
            // depth 0 is the root itself; only entries below it can hide
            .filter_entry(|e| {
                e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing library entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_content_file(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.library_root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(ContentFile::new(name, size));
        }

        tracing::debug!(
            "Local scan found {} content files under {}",
            files.len(),
            self.library_root.display()
        );
        files
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_content_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(CONTENT_EXTENSION))
        .unwrap_or(false)
}

/// Strategy 2: walk the hub file index with an explicit worklist.
///
/// Depth-first over subdirectories, skipping dot-prefixed names. A failed
/// listing skips that directory only.
pub async fn scan_remote(hub: &HubClient) -> Vec<ContentFile> {
    let mut files = Vec::new();
    let mut pending: Vec<String> = vec![String::new()];

    while let Some(path) = pending.pop() {
        let index = match hub.file_index(&path).await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Remote listing of '{}' failed: {}", path, e);
                continue;
            }
        };

        for file in &index.files {
            if !file.name.to_lowercase().ends_with(".taf") {
                continue;
            }
            let name = join_index_path(&path, &file.name);
            let mut record = ContentFile::new(name, file.size);
            if let Some(header) = &file.taf_header {
                apply_header(&mut record, header);
            }
            files.push(record);
        }

        for directory in &index.directories {
            if directory.name.is_empty() || is_hidden(&directory.name) {
                continue;
            }
            pending.push(join_index_path(&path, &directory.name));
        }
    }

    tracing::debug!("Remote scan found {} content files", files.len());
    files
}

fn join_index_path(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", directory, name)
    }
}

fn apply_header(file: &mut ContentFile, header: &crate::services::hub::ContentHeader) {
    file.audio_id = header.audio_id;
    if !header.sha1_hash.is_empty() {
        file.hash = Some(header.sha1_hash.to_lowercase());
    }
    file.track_seconds = header.track_seconds.clone();
}

/// Group files by parent directory for batched header fetches
fn group_by_directory(files: &[ContentFile]) -> Vec<String> {
    let mut directories: Vec<String> = files.iter().map(|f| f.directory().to_string()).collect();
    directories.sort();
    directories.dedup();
    directories
}

/// Best-effort header enrichment: one concurrent hub fetch per distinct
/// parent directory, results merged by filename. Failures are carried as
/// per-directory results and logged; the affected files stay headerless.
pub async fn enrich_headers(hub: &HubClient, files: &mut [ContentFile]) {
    let directories = group_by_directory(files);
    if directories.is_empty() {
        return;
    }

    tracing::debug!("Enriching headers from {} directories", directories.len());

    // Fire all, await all. Each fetch failure is isolated.
    let fetches = directories.iter().map(|d| hub.file_index(d));
    let results: Vec<Result<FileIndex>> = futures::future::join_all(fetches).await;

    let mut headers: HashMap<(String, String), crate::services::hub::ContentHeader> =
        HashMap::new();
    let mut failed = 0usize;
    for (directory, result) in directories.iter().zip(results) {
        match result {
            Ok(index) => {
                for file in index.files {
                    if let Some(header) = file.taf_header {
                        headers.insert((directory.clone(), file.name), header);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                tracing::warn!("Header fetch for '{}' failed: {}", directory, e);
            }
        }
    }
    if failed > 0 {
        tracing::warn!(
            "{}/{} directory header fetches failed; affected files stay headerless",
            failed,
            directories.len()
        );
    }

    for file in files.iter_mut() {
        let key = (file.directory().to_string(), file.filename().to_string());
        if let Some(header) = headers.get(&key) {
            apply_header(file, header);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"content").unwrap();
    }

    #[test]
    fn local_scan_finds_nested_content_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.taf");
        touch(dir.path(), "series/episode1.taf");
        touch(dir.path(), "series/cover.png");
        touch(dir.path(), "notes.txt");

        let scanner = ContentScanner::new(dir.path().to_path_buf());
        let mut names: Vec<String> = scanner.scan_local().into_iter().map(|f| f.name).collect();
        names.sort();
        assert_eq!(names, vec!["a.taf", "series/episode1.taf"]);
    }

    #[test]
    fn local_scan_skips_hidden_entries() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".trash/old.taf");
        touch(dir.path(), ".hidden.taf");
        touch(dir.path(), "visible.taf");

        let scanner = ContentScanner::new(dir.path().to_path_buf());
        let names: Vec<String> = scanner.scan_local().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["visible.taf"]);
    }

    #[test]
    fn local_scan_extension_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "shout.TAF");

        let scanner = ContentScanner::new(dir.path().to_path_buf());
        assert_eq!(scanner.scan_local().len(), 1);
    }

    #[test]
    fn local_scan_of_missing_root_is_empty() {
        let scanner = ContentScanner::new(PathBuf::from("/nonexistent/library"));
        assert!(scanner.scan_local().is_empty());
    }

    #[test]
    fn directories_are_grouped_and_deduped() {
        let files = vec![
            ContentFile::new("a/x.taf".to_string(), 1),
            ContentFile::new("a/y.taf".to_string(), 1),
            ContentFile::new("b/z.taf".to_string(), 1),
            ContentFile::new("root.taf".to_string(), 1),
        ];
        assert_eq!(group_by_directory(&files), vec!["", "a", "b"]);
    }

    #[test]
    fn index_path_joining() {
        assert_eq!(join_index_path("", "a.taf"), "a.taf");
        assert_eq!(join_index_path("folder", "a.taf"), "folder/a.taf");
    }
}
