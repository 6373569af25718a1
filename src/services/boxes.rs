//! Box registration records and certificate-id resolution
//!
//! Boxes register with the hub under a certificate id, but their on-disk
//! content directories are named by a hardware-derived id. The two rarely
//! match exactly, so resolution is probabilistic: exact match, then
//! case-insensitive match, then single-directory inference, then the
//! certificate id verbatim.

use crate::models::BoxRegistration;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Registration file within the hub config directory
pub const REGISTRATION_FILENAME: &str = "config.overlay.ini";

/// Reads box registrations and resolves content directory ids
pub struct BoxRegistry {
    registration_file: PathBuf,
    content_root: PathBuf,
}

impl BoxRegistry {
    pub fn new(config_dir: PathBuf, content_root: PathBuf) -> Self {
        Self {
            registration_file: config_dir.join(REGISTRATION_FILENAME),
            content_root,
        }
    }

    /// All registered boxes, sorted by display name.
    ///
    /// A missing registration file means no boxes are registered yet; that
    /// is a normal state, not an error.
    pub fn list(&self) -> Vec<BoxRegistration> {
        let text = match std::fs::read_to_string(&self.registration_file) {
            Ok(text) => text,
            Err(_) => {
                warn!(
                    "Registration file not found: {}",
                    self.registration_file.display()
                );
                return Vec::new();
            }
        };
        let mut boxes = parse_registrations(&text);
        boxes.sort_by(|a, b| a.name.cmp(&b.name));
        info!("Found {} registered boxes", boxes.len());
        boxes
    }

    /// Names of the box content directories currently on disk
    pub fn content_directory_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.content_root) else {
            debug!("Content root {} not readable", self.content_root.display());
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    /// Resolve a certificate id to the matching content directory name
    pub fn resolve_content_dir(&self, cert_id: &str) -> String {
        resolve_content_dir(cert_id, &self.content_directory_names())
    }
}

/// Parse registration records: `overlay.<certId>.boxName=<name>` lines.
/// Anything else is skipped silently (the file carries many other keys).
pub fn parse_registrations(text: &str) -> Vec<BoxRegistration> {
    let mut boxes: Vec<BoxRegistration> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with("overlay.") || !line.contains(".boxName=") {
            continue;
        }
        let Some((key, name)) = line.split_once('=') else {
            continue;
        };
        let key_parts: Vec<&str> = key.split('.').collect();
        if key_parts.len() < 3 {
            debug!("Skipping malformed registration line: {}", line);
            continue;
        }
        let cert_id = key_parts[1].to_string();
        let name = name.to_string();

        // The file is an overlay; a later line for the same box wins.
        if let Some(existing) = boxes.iter_mut().find(|b| b.id == cert_id) {
            existing.name = name;
        } else {
            boxes.push(BoxRegistration { id: cert_id, name });
        }
    }

    boxes
}

/// Resolve a certificate id to a content directory name.
///
/// Priority: exact match, case-insensitive match (returning the directory's
/// exact-cased name), single-directory inference, certificate id verbatim.
pub fn resolve_content_dir(cert_id: &str, directories: &[String]) -> String {
    if directories.iter().any(|d| d == cert_id) {
        return cert_id.to_string();
    }

    if let Some(directory) = directories
        .iter()
        .find(|d| d.eq_ignore_ascii_case(cert_id))
    {
        return directory.clone();
    }

    if directories.len() == 1 {
        info!(
            "Single box mapping inferred: {} -> {}",
            cert_id, directories[0]
        );
        return directories[0].clone();
    }

    warn!("No content directory mapping for {}, using cert id", cert_id);
    cert_id.to_string()
}
