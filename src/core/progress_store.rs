//! File-based progress store.
//!
//! Each content map is one pretty-printed JSON document, overwritten in
//! full on every save:
//!
//! ```text
//! {root}/{user_id}/courses/{course_slug}.json
//! {root}/{user_id}/specs/{specialization_slug}/{course_slug}.json
//! ```
//!
//! A document that cannot be read or parsed is treated as absent, so the
//! caller rebuilds the map instead of aborting. While a map is open, an
//! exclusive advisory lock on `{document}.lock` keeps a second process from
//! writing the same identity key.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::config::paths::{COURSES_DIR, SPECS_DIR};
use crate::domain::{ContentKey, ContentMap, ItemPosition, ItemStatus, ProgressSummary};

use super::classification::ClassificationPolicy;

/// Errors raised by the progress store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Progress document is in use by another process: {0}")]
    Locked(PathBuf),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Exclusive lock on one progress document, released on drop
#[derive(Debug)]
pub struct ProgressLock {
    file: std::fs::File,
    path: PathBuf,
}

impl Drop for ProgressLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(path = %self.path.display(), error = %e, "Failed to release progress lock");
        }
    }
}

/// Progress documents under one root directory
#[derive(Debug, Clone)]
pub struct ProgressStore {
    root: PathBuf,
}

impl ProgressStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for an identity key
    pub fn document_path(&self, key: &ContentKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    fn sibling(path: &Path, extension: &str) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }

    /// Take the exclusive lock for an identity key
    pub fn lock(&self, key: &ContentKey) -> Result<ProgressLock, StoreError> {
        let doc_path = self.document_path(key);
        if let Some(parent) = doc_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let path = Self::sibling(&doc_path, "lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        if file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(doc_path));
        }

        Ok(ProgressLock { file, path })
    }

    /// Load the map for a key; missing or malformed documents yield None
    pub async fn load(&self, key: &ContentKey) -> Option<ContentMap> {
        let path = self.document_path(key);
        if !path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error reading progress file");
                return None;
            }
        };

        let mut map: ContentMap = match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error parsing progress file");
                return None;
            }
        };

        if map.key() != *key {
            warn!(
                path = %path.display(),
                found = %map.key(),
                "Progress file belongs to a different identity, ignoring it"
            );
            return None;
        }

        let fixed = map.normalize();
        if fixed > 0 {
            warn!(fixed, "Queued skippable items that had no status");
        }

        info!(course = %key, "Loaded existing progress");
        Some(map)
    }

    /// Overwrite the document for a map, refreshing `updated_at`.
    ///
    /// The document is written to a temporary sibling and renamed over the
    /// original, so readers never see a partial file.
    pub async fn save(&self, map: &mut ContentMap) -> Result<PathBuf, StoreError> {
        let path = self.document_path(&map.key());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        map.touch();
        let content = serde_json::to_string_pretty(map)?;

        let tmp_path = Self::sibling(&path, "tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(path = %path.display(), "Progress saved");
        Ok(path)
    }

    /// Open a session for a key: lock it, then resume the stored map or
    /// build a fresh one. `reset` ignores any stored map.
    pub async fn open<F>(
        &self,
        key: &ContentKey,
        reset: bool,
        build: F,
    ) -> Result<ProgressSession<'_>, StoreError>
    where
        F: FnOnce() -> ContentMap,
    {
        let lock = self.lock(key)?;

        let stored = if reset {
            info!(course = %key, "Ignoring existing progress");
            None
        } else {
            self.load(key).await
        };

        let (map, resumed) = match stored {
            Some(map) => (map, true),
            None => (build(), false),
        };

        Ok(ProgressSession {
            store: self,
            map,
            resumed,
            _lock: lock,
        })
    }

    /// Every readable map under the root, optionally for one user only
    pub async fn list(&self, user_id: Option<&str>) -> Result<Vec<ContentMap>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut documents: Vec<PathBuf> = Vec::new();

        for user_dir in list_dirs(&self.root).await? {
            let matches_user = user_dir
                .file_name()
                .and_then(|n| n.to_str())
                .map(|name| user_id.map_or(true, |u| u == name))
                .unwrap_or(false);
            if !matches_user {
                continue;
            }

            collect_documents(&user_dir.join(COURSES_DIR), &mut documents).await?;

            let specs_dir = user_dir.join(SPECS_DIR);
            if specs_dir.exists() {
                for spec_dir in list_dirs(&specs_dir).await? {
                    collect_documents(&spec_dir, &mut documents).await?;
                }
            }
        }

        let mut maps = Vec::new();
        for path in documents {
            let parsed = fs::read_to_string(&path)
                .await
                .ok()
                .and_then(|content| serde_json::from_str::<ContentMap>(&content).ok());
            match parsed {
                Some(map) => maps.push(map),
                None => warn!(path = %path.display(), "Skipping unreadable progress file"),
            }
        }

        maps.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(maps)
    }
}

async fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(dir).await.map_err(|e| StoreError::io(dir, e))?;

    while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::io(dir, e))? {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        if is_dir {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

async fn collect_documents(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir).await.map_err(|e| StoreError::io(dir, e))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::io(dir, e))? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }

    Ok(())
}

/// The single live content map for one course during a run
pub struct ProgressSession<'a> {
    store: &'a ProgressStore,
    map: ContentMap,
    resumed: bool,
    _lock: ProgressLock,
}

impl<'a> ProgressSession<'a> {
    pub fn map(&self) -> &ContentMap {
        &self.map
    }

    /// Whether the map came from disk rather than a fresh build
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn update_item_status(&mut self, item_id: &str, status: ItemStatus) -> bool {
        self.map.update_item_status(item_id, status)
    }

    pub fn queued_positions(&self) -> Vec<ItemPosition> {
        self.map.queued_positions()
    }

    pub fn requeue_processing(&mut self) -> usize {
        self.map.requeue_processing()
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::from_map(&self.map)
    }

    /// Persist the map. Failures are logged and reported as false; the
    /// in-memory state stays authoritative for the rest of the run.
    pub async fn save(&mut self) -> bool {
        match self.store.save(&mut self.map).await {
            Ok(_) => true,
            Err(e) => {
                error!(course = %self.map.key(), error = %e, "Error saving progress");
                false
            }
        }
    }

    /// Reclassify every item against `policy` and persist if anything changed
    pub async fn update_skippable_status(&mut self, policy: &ClassificationPolicy) -> bool {
        let changed = self.map.reclassify(policy);
        if changed == 0 {
            return true;
        }

        info!(changed, "Updated skippable status for items based on current configuration");
        self.save().await
    }
}
