//! Reconciliation engine
//!
//! Cross-references the three data sources (content files, catalog
//! entries, and per-tag device state) into consistent linkage views.
//! Matching uses an explicit ordered list of strategies, uniformly in both
//! query modes: audio id beats content hash beats source path beats
//! device-provided descriptive fallback. The first non-empty match wins and
//! never mutates the catalog.
//!
//! Scan and catalog results are cached per input key; a cache population
//! race is last-writer-wins and heals within one TTL window.

use crate::config::Config;
use crate::models::{
    CatalogEntry, ContentFile, ContentFileView, LinkedEntry, TagRecord, TagStatus,
    CATEGORY_CUSTOM, CATEGORY_OFFICIAL, CUSTOM_MODEL_PREFIX,
};
use crate::services::boxes::BoxRegistry;
use crate::services::cache::TtlCache;
use crate::services::catalog::CatalogIndex;
use crate::services::content::ContentScanner;
use crate::services::hub::{HubClient, HubTag};
use crate::services::tags::TagStateStore;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

const NS_CONTENT: &str = "content";
const NS_CATALOG: &str = "catalog";

/// Content-centric view: every content file with its linkage
#[derive(Debug, Default)]
pub struct ContentLinkage {
    pub files: Vec<ContentFileView>,
    pub total_count: usize,
    pub linked_count: usize,
    pub orphaned_count: usize,
}

/// Tag-centric view: the bounded tag set for one box
#[derive(Debug, Default)]
pub struct TagLinkage {
    pub tags: Vec<TagRecord>,
    pub total_count: usize,
    pub unconfigured_count: usize,
    pub unassigned_count: usize,
    pub assigned_count: usize,
}

impl TagLinkage {
    /// Compute per-status counts over a tag set
    pub fn from_tags(tags: Vec<TagRecord>) -> Self {
        let count = |status| tags.iter().filter(|t| t.status == status).count();
        Self {
            total_count: tags.len(),
            unconfigured_count: count(TagStatus::Unconfigured),
            unassigned_count: count(TagStatus::Unassigned),
            assigned_count: count(TagStatus::Assigned),
            tags,
        }
    }
}

/// Values sharing the engine cache, one namespace per variant
#[derive(Clone)]
enum Cached {
    Content(Vec<ContentFile>),
    Catalog(Vec<CatalogEntry>),
}

/// Orchestrates scanner, catalog, box registry, and tag store into
/// consistent views
pub struct ReconcileEngine {
    hub: HubClient,
    scanner: ContentScanner,
    pub tags: TagStateStore,
    pub boxes: BoxRegistry,
    cache: TtlCache<Cached>,
}

impl ReconcileEngine {
    pub fn new(config: &Config, hub: HubClient) -> Self {
        let cache = TtlCache::new(Duration::from_secs(config.cache.catalog_ttl_secs))
            .with_namespace_ttl(
                NS_CONTENT,
                Duration::from_secs(config.cache.content_ttl_secs),
            )
            .with_namespace_ttl(
                NS_CATALOG,
                Duration::from_secs(config.cache.catalog_ttl_secs),
            );
        Self {
            hub,
            scanner: ContentScanner::new(config.volumes.library_path()),
            tags: TagStateStore::new(config.volumes.content_path()),
            boxes: BoxRegistry::new(config.volumes.config_path(), config.volumes.content_path()),
            cache,
        }
    }

    /// Enumerated + enriched content files, cached by content-root key
    pub async fn content_files(&self, refresh: bool) -> Vec<ContentFile> {
        let key = self.scanner.cache_key();
        if refresh {
            self.invalidate_content_cache();
        } else if let Some(Cached::Content(files)) = self.cache.get(NS_CONTENT, &key) {
            tracing::debug!("Content cache hit ({} files)", files.len());
            return files;
        }

        info!("Content cache miss, scanning...");
        // The scan happens outside the cache lock; last writer wins.
        let files = self.scanner.scan(&self.hub).await;
        self.cache
            .set(NS_CONTENT, &key, Cached::Content(files.clone()), None);
        info!("Cached {} content files", files.len());
        files
    }

    /// Drop cached content listings; the next query rescans
    pub fn invalidate_content_cache(&self) -> usize {
        let count = self.cache.invalidate_prefix(&format!("{}:", NS_CONTENT));
        if count > 0 {
            info!("Invalidated {} content cache entries", count);
        }
        count
    }

    /// Combined catalog, custom entries first so they win key ties.
    /// Either source failing degrades to an empty half, not an error.
    pub async fn catalog_entries(&self) -> Vec<CatalogEntry> {
        let custom = self.cached_catalog("custom").await;
        let official = self.cached_catalog("official").await;
        tracing::debug!(
            "Loaded {} custom + {} official catalog entries",
            custom.len(),
            official.len()
        );
        let mut entries = custom;
        entries.extend(official);
        entries
    }

    async fn cached_catalog(&self, source: &str) -> Vec<CatalogEntry> {
        if let Some(Cached::Catalog(entries)) = self.cache.get(NS_CATALOG, source) {
            return entries;
        }
        let result = match source {
            "custom" => self.hub.custom_catalog().await,
            _ => self.hub.official_catalog().await,
        };
        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to fetch {} catalog: {}", source, e);
                Vec::new()
            }
        };
        self.cache
            .set(NS_CATALOG, source, Cached::Catalog(entries.clone()), None);
        entries
    }

    /// Content-centric query: every content file with its catalog linkage.
    ///
    /// Output is sorted linked-first, then alphabetically by name; counts
    /// cover the full unfiltered set.
    pub async fn content_linkage(&self, refresh: bool) -> ContentLinkage {
        let files = self.content_files(refresh).await;
        let index = CatalogIndex::build(self.catalog_entries().await);

        let mut views: Vec<ContentFileView> = files
            .iter()
            .map(|file| {
                let matched = match_content_file(&index, file);
                ContentFileView {
                    name: file.name.clone(),
                    size: file.size,
                    audio_id: file.audio_id,
                    hash: file.hash.clone(),
                    track_count: (!file.track_seconds.is_empty())
                        .then(|| file.track_seconds.len()),
                    track_seconds: (!file.track_seconds.is_empty())
                        .then(|| file.track_seconds.clone()),
                    linked_entry: matched.cloned(),
                    is_linked: matched.is_some(),
                }
            })
            .collect();

        views.sort_by_cached_key(|v| (!v.is_linked, v.name.to_lowercase()));

        let total_count = views.len();
        let linked_count = views.iter().filter(|v| v.is_linked).count();
        let linkage = ContentLinkage {
            total_count,
            linked_count,
            orphaned_count: total_count - linked_count,
            files: views,
        };
        info!(
            "Content linkage: {} files, {} linked, {} orphaned",
            linkage.total_count, linkage.linked_count, linkage.orphaned_count
        );
        linkage
    }

    /// Tag-centric query for one box (addressed by certificate id).
    ///
    /// The response is bounded: the most recently played tag (when
    /// resolvable) plus every tag still needing setup; fully assigned tags
    /// that were not just played are excluded. Counts cover the filtered
    /// set. A failed tag index fetch is the one error surfaced here, so
    /// callers can tell "no tags" from "failed to load"; the handler still
    /// answers with an empty, marked-failed view rather than an HTTP error.
    pub async fn tag_linkage(&self, box_id: &str) -> crate::error::Result<TagLinkage> {
        let hub_tags = match self.hub.tag_index(box_id).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Tag index for box {} unavailable: {}", box_id, e);
                return Err(e);
            }
        };
        if hub_tags.is_empty() {
            warn!("No tags returned for box {}", box_id);
            return Ok(TagLinkage::default());
        }

        let index = CatalogIndex::build(self.catalog_entries().await);
        let files = self.content_files(false).await;
        let source_map = build_source_map(&index, &files);

        // The device API is addressed by certificate id; only the
        // filesystem tier of last-played needs the directory resolution.
        let box_dir = self.boxes.resolve_content_dir(box_id);
        let last_played = self.tags.last_played(&self.hub, box_id, &box_dir).await;

        let all_tags: Vec<TagRecord> = hub_tags
            .iter()
            .map(|tag| reconcile_hub_tag(box_id, tag, &index, &source_map))
            .collect();

        let filtered = filter_tags(all_tags, last_played.as_deref());
        info!("Returning {} tags for box {}", filtered.len(), box_id);
        Ok(TagLinkage::from_tags(filtered))
    }

    /// Most recently played tag uid for a box, two-tier (device setting,
    /// then filesystem timestamps)
    pub async fn last_played(&self, box_id: &str) -> Option<String> {
        let box_dir = self.boxes.resolve_content_dir(box_id);
        self.tags.last_played(&self.hub, box_id, &box_dir).await
    }
}

/// Match one content file against the catalog.
/// Strategy order: audio id exact, then content hash (case-insensitive).
pub fn match_content_file<'a>(
    index: &'a CatalogIndex,
    file: &ContentFile,
) -> Option<&'a CatalogEntry> {
    let strategies: [&dyn Fn() -> Option<&'a CatalogEntry>; 2] = [
        &|| file.audio_id.and_then(|id| index.by_audio_id(id)),
        &|| file.hash.as_deref().and_then(|hash| index.by_hash(hash)),
    ];
    strategies.iter().find_map(|strategy| strategy())
}

/// Relink one device tag against the catalog.
/// Strategy order: model id exact, then source-key map.
pub fn relink_tag<'a>(
    index: &'a CatalogIndex,
    source_map: &HashMap<String, &'a CatalogEntry>,
    model: &str,
    source: &str,
) -> Option<&'a CatalogEntry> {
    let strategies: [&dyn Fn() -> Option<&'a CatalogEntry>; 2] = [
        &|| (!model.is_empty()).then(|| index.by_model(model)).flatten(),
        &|| (!source.is_empty()).then(|| source_map.get(source).copied()).flatten(),
    ];
    strategies.iter().find_map(|strategy| strategy())
}

/// Cross-match content files against the catalog and re-key the result by
/// library-scheme source path, so tags carrying only a raw source still
/// resolve.
pub fn build_source_map<'a>(
    index: &'a CatalogIndex,
    files: &[ContentFile],
) -> HashMap<String, &'a CatalogEntry> {
    let mut map = HashMap::new();
    for file in files {
        if let Some(entry) = match_content_file(index, file) {
            map.insert(format!("lib://{}", file.name), entry);
        }
    }
    map
}

/// Convert one hub-reported tag into the reconciled view record.
///
/// On a successful relink the view's model is overwritten and status forced
/// to assigned, since device data may be stale; persisted tag state is
/// never touched here.
fn reconcile_hub_tag(
    box_id: &str,
    tag: &HubTag,
    index: &CatalogIndex,
    source_map: &HashMap<String, &CatalogEntry>,
) -> TagRecord {
    let uid = tag.ruid.to_uppercase();
    let mut model = tag.info.model.clone();
    let source = tag.source.clone();
    let mut status = TagStatus::derive(&model, &source);

    let linked_entry = match relink_tag(index, source_map, &model, &source) {
        Some(entry) => {
            if model != entry.model {
                tracing::debug!("Relinked tag {} via source to model {}", uid, entry.model);
            }
            model = entry.model.clone();
            status = TagStatus::Assigned;
            Some(LinkedEntry::from(entry))
        }
        None if !tag.info.is_empty() => Some(LinkedEntry {
            series: tag.info.series.clone(),
            title: tag.info.series.clone(),
            episodes: tag.info.episode.clone(),
            pic: tag.info.picture.clone(),
            category: if model.starts_with(CUSTOM_MODEL_PREFIX) {
                CATEGORY_CUSTOM.to_string()
            } else {
                CATEGORY_OFFICIAL.to_string()
            },
        }),
        None => None,
    };

    TagRecord {
        is_custom: model.starts_with(CUSTOM_MODEL_PREFIX),
        nocloud: tag.nocloud,
        uid,
        box_id: box_id.to_string(),
        model,
        source,
        status,
        linked_entry,
        last_modified: None,
    }
}

/// Bound the response: the most recently played tag first (when present),
/// then every tag still needing setup.
fn filter_tags(all_tags: Vec<TagRecord>, last_played: Option<&str>) -> Vec<TagRecord> {
    let mut result: Vec<TagRecord> = Vec::new();

    if let Some(last) = last_played {
        let last_upper = last.to_uppercase();
        if let Some(tag) = all_tags.iter().find(|t| t.uid == last_upper) {
            result.push(tag.clone());
        }
    }

    for tag in all_tags {
        let is_setup = matches!(tag.status, TagStatus::Unconfigured | TagStatus::Unassigned);
        if is_setup && !result.iter().any(|t| t.uid == tag.uid) {
            result.push(tag);
        }
    }

    result
}
