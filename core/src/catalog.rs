//! One [`TrieDictionary`] per dictionary category, loaded from disk or
//! built from a store.
//!
//! Tries are handed out as `Arc`s: the catalog lock only guards the map,
//! so loading or dropping one category never waits on a search running
//! against another. File I/O and decoding happen before the lock is taken.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use anyhow::{anyhow, Context};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::builder::build_from_store;
use crate::store::{DictionaryCategory, DictionaryStore};
use crate::trie::{MemoryStats, TrieDictionary, TrieHit, WordItem};
use crate::Config;

/// Where a loaded trie came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DictionarySource {
    /// Precompiled blob shipped with the application.
    Bundled,
    /// Blob previously built on this device.
    UserBuilt,
    /// Built in memory from store rows.
    Store,
}

/// Load state of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryStatus {
    Unloaded,
    Loaded { source: DictionarySource },
    /// A blob exists but could not be used.
    Unavailable { reason: String },
}

impl DictionaryStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, DictionaryStatus::Loaded { .. })
    }
}

/// Which blob files exist for a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStatus {
    pub bundled: bool,
    pub user_built: bool,
}

/// Registry of category tries.
#[derive(Debug)]
pub struct TrieCatalog {
    tries: RwLock<AHashMap<DictionaryCategory, Arc<TrieDictionary>>>,
    status: RwLock<AHashMap<DictionaryCategory, DictionaryStatus>>,
    bundled_dir: Option<PathBuf>,
    user_dir: Option<PathBuf>,
    capacities: AHashMap<DictionaryCategory, usize>,
    initialized: AtomicBool,
    generation: AtomicU64,
}

impl Default for TrieCatalog {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl TrieCatalog {
    /// A catalog reading bundled blobs from `bundled_dir` and user-built
    /// blobs from `user_dir`. Either may be absent.
    pub fn new(bundled_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        let capacities = DictionaryCategory::ALL
            .iter()
            .map(|c| (*c, c.default_capacity()))
            .collect();
        Self {
            tries: RwLock::new(AHashMap::new()),
            status: RwLock::new(AHashMap::new()),
            bundled_dir,
            user_dir,
            capacities,
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut catalog = Self::new(cfg.bundled_dict_dir.clone(), cfg.user_dict_dir.clone());
        for category in DictionaryCategory::ALL {
            catalog
                .capacities
                .insert(category, cfg.capacity_for(category));
        }
        catalog
    }

    /// Node capacity used when building `category` from rows.
    pub fn capacity_for(&self, category: DictionaryCategory) -> usize {
        self.capacities
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_capacity())
    }

    /// Bumped on every load, unload or install.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Try every category once, in parallel. Later calls are no-ops.
    ///
    /// Categories with no blob stay unloaded; that is not an error.
    pub fn init(&self) {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("catalog already initialized");
            return;
        }
        let loaded = DictionaryCategory::ALL
            .par_iter()
            .filter(|category| self.load_to_memory(**category))
            .count();
        info!(loaded, total = DictionaryCategory::ALL.len(), "catalog initialized");
    }

    pub fn bundled_blob_path(&self, category: DictionaryCategory) -> Option<PathBuf> {
        self.bundled_dir
            .as_ref()
            .map(|dir| dir.join(category.blob_file_name()))
    }

    pub fn user_blob_path(&self, category: DictionaryCategory) -> Option<PathBuf> {
        self.user_dir
            .as_ref()
            .map(|dir| dir.join(category.blob_file_name()))
    }

    pub fn has_bundled_blob(&self, category: DictionaryCategory) -> bool {
        self.bundled_blob_path(category).is_some_and(|p| p.is_file())
    }

    pub fn has_user_blob(&self, category: DictionaryCategory) -> bool {
        self.user_blob_path(category).is_some_and(|p| p.is_file())
    }

    pub fn file_status(&self, category: DictionaryCategory) -> FileStatus {
        FileStatus {
            bundled: self.has_bundled_blob(category),
            user_built: self.has_user_blob(category),
        }
    }

    /// Categories that have a blob on disk, loaded or not.
    pub fn available_categories(&self) -> Vec<DictionaryCategory> {
        DictionaryCategory::ALL
            .iter()
            .copied()
            .filter(|c| {
                let files = self.file_status(*c);
                files.bundled || files.user_built
            })
            .collect()
    }

    /// Load `category`, bundled blob first and user-built blob second.
    ///
    /// Returns whether the category is loaded afterwards. Failures are
    /// logged and recorded in [`status`](Self::status); they never escape.
    pub fn load_to_memory(&self, category: DictionaryCategory) -> bool {
        if self.is_loaded(category) {
            return true;
        }

        let candidates = [
            (DictionarySource::Bundled, self.bundled_blob_path(category)),
            (DictionarySource::UserBuilt, self.user_blob_path(category)),
        ];

        let mut failures: Vec<String> = Vec::new();
        for (source, path) in candidates {
            let Some(path) = path else { continue };
            if !path.is_file() {
                continue;
            }
            match load_blob(&path) {
                Ok(dict) => {
                    let stats = dict.memory_stats();
                    self.install_with_source(category, dict, source);
                    info!(
                        category = %category,
                        ?source,
                        nodes = stats.node_count,
                        words = stats.word_count,
                        "dictionary loaded"
                    );
                    return true;
                }
                Err(err) => {
                    warn!(category = %category, path = %path.display(), "dictionary unavailable: {err:#}");
                    failures.push(format!("{}: {err:#}", path.display()));
                }
            }
        }

        let status = if failures.is_empty() {
            debug!(category = %category, "no blob found, category left unloaded");
            DictionaryStatus::Unloaded
        } else {
            DictionaryStatus::Unavailable {
                reason: failures.join("; "),
            }
        };
        self.set_status(category, status);
        false
    }

    /// Drop `category` from memory. Returns whether it was loaded.
    pub fn unload(&self, category: DictionaryCategory) -> bool {
        let removed = match self.tries.write() {
            Ok(mut tries) => tries.remove(&category).is_some(),
            Err(_) => {
                error!(category = %category, "catalog lock poisoned, unload skipped");
                return false;
            }
        };
        if removed {
            self.set_status(category, DictionaryStatus::Unloaded);
            self.bump();
            info!(category = %category, "dictionary unloaded");
        }
        removed
    }

    /// Unload every category.
    pub fn release(&self) {
        for category in self.loaded_categories() {
            self.unload(category);
        }
    }

    /// Build `category` from store rows and make it live.
    pub fn build_from_store(
        &self,
        category: DictionaryCategory,
        store: &dyn DictionaryStore,
    ) -> anyhow::Result<()> {
        let dict = build_from_store(store, category, self.capacity_for(category))?;
        if dict.is_empty() {
            return Err(anyhow!("store has no rows for category `{category}`"));
        }
        self.install_with_source(category, dict, DictionarySource::Store);
        Ok(())
    }

    /// Persist a loaded category to the user blob directory.
    pub fn save_user_built(&self, category: DictionaryCategory) -> anyhow::Result<PathBuf> {
        let path = self
            .user_blob_path(category)
            .ok_or_else(|| anyhow!("no user dictionary directory configured"))?;
        let dict = self
            .get(category)
            .ok_or_else(|| anyhow!("category `{category}` is not loaded"))?;
        dict.save_to(&path)
            .with_context(|| format!("saving category `{category}`"))?;
        info!(category = %category, path = %path.display(), "user-built dictionary saved");
        Ok(path)
    }

    /// Make `dict` the live trie for `category`.
    pub fn install(&self, category: DictionaryCategory, dict: TrieDictionary) {
        self.install_with_source(category, dict, DictionarySource::Store);
    }

    fn install_with_source(
        &self,
        category: DictionaryCategory,
        dict: TrieDictionary,
        source: DictionarySource,
    ) {
        let dict = Arc::new(dict);
        match self.tries.write() {
            Ok(mut tries) => {
                tries.insert(category, dict);
            }
            Err(_) => {
                error!(category = %category, "catalog lock poisoned, install skipped");
                return;
            }
        }
        self.set_status(category, DictionaryStatus::Loaded { source });
        self.bump();
    }

    fn set_status(&self, category: DictionaryCategory, status: DictionaryStatus) {
        match self.status.write() {
            Ok(mut map) => {
                map.insert(category, status);
            }
            Err(_) => error!(category = %category, "catalog status lock poisoned"),
        }
    }

    pub fn status(&self, category: DictionaryCategory) -> DictionaryStatus {
        self.status
            .read()
            .ok()
            .and_then(|map| map.get(&category).cloned())
            .unwrap_or(DictionaryStatus::Unloaded)
    }

    pub fn is_loaded(&self, category: DictionaryCategory) -> bool {
        self.tries
            .read()
            .map(|tries| tries.contains_key(&category))
            .unwrap_or(false)
    }

    pub fn loaded_categories(&self) -> Vec<DictionaryCategory> {
        let mut out: Vec<DictionaryCategory> = self
            .tries
            .read()
            .map(|tries| tries.keys().copied().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Shared handle to a loaded trie.
    pub fn get(&self, category: DictionaryCategory) -> Option<Arc<TrieDictionary>> {
        self.tries
            .read()
            .ok()
            .and_then(|tries| tries.get(&category).cloned())
    }

    fn get_or_warn(&self, category: DictionaryCategory, query: &str) -> Option<Arc<TrieDictionary>> {
        let dict = self.get(category);
        if dict.is_none() {
            warn!(category = %category, query, "query against unloaded dictionary");
        }
        dict
    }

    /// Prefix search in one category. Unloaded categories yield nothing.
    pub fn search_by_prefix(
        &self,
        category: DictionaryCategory,
        prefix: &str,
        limit: usize,
    ) -> Vec<WordItem> {
        self.get_or_warn(category, prefix)
            .map(|dict| dict.search_by_prefix(prefix, limit))
            .unwrap_or_default()
    }

    pub fn search_hits_by_prefix(
        &self,
        category: DictionaryCategory,
        prefix: &str,
        limit: usize,
    ) -> Vec<TrieHit> {
        self.get_or_warn(category, prefix)
            .map(|dict| dict.search_hits_by_prefix(prefix, limit))
            .unwrap_or_default()
    }

    pub fn search_exact(
        &self,
        category: DictionaryCategory,
        path: &str,
        limit: usize,
    ) -> Vec<WordItem> {
        self.get_or_warn(category, path)
            .map(|dict| dict.search_exact(path, limit))
            .unwrap_or_default()
    }

    pub fn memory_stats(&self, category: DictionaryCategory) -> Option<MemoryStats> {
        self.get(category).map(|dict| dict.memory_stats())
    }
}

fn load_blob(path: &Path) -> anyhow::Result<TrieDictionary> {
    let meta = std::fs::metadata(path).with_context(|| format!("inspecting {}", path.display()))?;
    if meta.len() == 0 {
        return Err(anyhow!("blob file is empty"));
    }
    TrieDictionary::load_from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DictionaryEntry, MemoryStore};

    fn store() -> MemoryStore {
        MemoryStore::from_entries(vec![
            DictionaryEntry::new("北京", "bei jing", 9000, DictionaryCategory::Place),
            DictionaryEntry::new("上海", "shang hai", 8000, DictionaryCategory::Place),
        ])
    }

    #[test]
    fn unloaded_category_searches_empty() {
        let catalog = TrieCatalog::default();
        assert!(catalog
            .search_by_prefix(DictionaryCategory::Base, "ni", 5)
            .is_empty());
        assert_eq!(
            catalog.status(DictionaryCategory::Base),
            DictionaryStatus::Unloaded
        );
    }

    #[test]
    fn build_then_unload() {
        let catalog = TrieCatalog::default();
        catalog
            .build_from_store(DictionaryCategory::Place, &store())
            .unwrap();
        assert!(catalog.is_loaded(DictionaryCategory::Place));
        assert_eq!(
            catalog.search_by_prefix(DictionaryCategory::Place, "bei", 5)[0].word,
            "北京"
        );

        let before = catalog.generation();
        assert!(catalog.unload(DictionaryCategory::Place));
        assert!(catalog.generation() > before);
        assert!(!catalog.unload(DictionaryCategory::Place));
        assert!(catalog
            .search_by_prefix(DictionaryCategory::Place, "bei", 5)
            .is_empty());
    }

    #[test]
    fn building_empty_category_fails() {
        let catalog = TrieCatalog::default();
        assert!(catalog
            .build_from_store(DictionaryCategory::Poetry, &store())
            .is_err());
        assert!(!catalog.is_loaded(DictionaryCategory::Poetry));
    }
}
