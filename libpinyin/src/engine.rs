//! Pinyin suggestion engine
//!
//! Provides a high-level `Engine` that ties the classifier, the generation
//! layers and the ranking pipeline together behind a
//! `generate_candidates(input, limit, context) -> Vec<Candidate>` API with an
//! LRU result cache.
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use suggest_core::{
    Candidate, ConfigError, FuzzyConfig, PhoneticFuzzyRules, RankingModel, RuleKind, TrieCatalog, UserHistory,
};
use tracing::{debug, info, warn};

use crate::classifier::{InputAnalysis, InputClassifier};
use crate::config::PinyinConfig;
use crate::layers::LayerContext;
use crate::parser::{PhoneticSegmenter, PinyinSegmenter};
use crate::pipeline::CandidatePipeline;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    input: String,
    limit: usize,
    context: Option<String>,
}

struct QueryCache {
    entries: LruCache<CacheKey, Vec<Candidate>>,
    /// Catalog and settings generations the entries were computed under.
    generation: (u64, u64),
}

/// Query-key form of raw keystrokes: NFC, lowercase, no separators, tone
/// marks removed.
pub fn normalize_keystrokes(raw: &str) -> String {
    suggest_core::utils::strip_tones(&suggest_core::utils::normalize_input(raw))
        .chars()
        .filter(|c| *c != '\'')
        .collect()
}

/// Public engine for pinyin suggestions.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Engine {
    config: PinyinConfig,
    ctx: Arc<LayerContext>,
    classifier: InputClassifier,
    pipeline: CandidatePipeline,
    cache: Option<Mutex<QueryCache>>,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    /// Bumped when fuzzy settings or the history change.
    settings_generation: AtomicU64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Construct an engine over an already populated catalog.
    pub fn new(config: PinyinConfig, catalog: Arc<TrieCatalog>) -> Result<Self, ConfigError> {
        Self::with_history(config, catalog, UserHistory::new())
    }

    /// Like [`new`](Self::new), learning into an existing history.
    pub fn with_history(
        config: PinyinConfig,
        catalog: Arc<TrieCatalog>,
        history: UserHistory,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ranking = RankingModel::new(config.base.ranking)?;
        let segmenter: Arc<dyn PhoneticSegmenter> = Arc::new(PinyinSegmenter::new());

        let mut ctx = LayerContext::new(
            catalog,
            segmenter.clone(),
            PhoneticFuzzyRules::from_config(&config.base.fuzzy),
            history,
        );
        ctx.frequency_scale = config.base.frequency_scale;
        ctx.fuzzy_variant_limit = config.fuzzy_variant_limit;
        let ctx = Arc::new(ctx);

        let cache = NonZeroUsize::new(config.base.max_cache_size).map(|cap| {
            Mutex::new(QueryCache {
                entries: LruCache::new(cap),
                generation: (0, 0),
            })
        });

        Ok(Self {
            classifier: InputClassifier::new(segmenter, config.classifier()),
            pipeline: CandidatePipeline::standard(ctx.clone(), ranking, config.pipeline()),
            ctx,
            cache,
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            settings_generation: AtomicU64::new(0),
            config,
        })
    }

    /// Build the catalog from the configured directories, load every
    /// category found there and construct the engine.
    pub fn from_config(config: PinyinConfig) -> anyhow::Result<Self> {
        let catalog = Arc::new(TrieCatalog::from_config(&config.base));
        catalog.init();
        info!(
            loaded = catalog.loaded_categories().len(),
            "engine catalog ready"
        );
        Ok(Self::new(config, catalog)?)
    }

    pub fn config(&self) -> &PinyinConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<TrieCatalog> {
        &self.ctx.catalog
    }

    pub fn history(&self) -> &UserHistory {
        &self.ctx.history
    }

    pub fn classifier(&self) -> &InputClassifier {
        &self.classifier
    }

    /// Classify raw keystrokes.
    pub fn analyze(&self, raw: &str) -> InputAnalysis {
        self.classifier.analyze(&normalize_keystrokes(raw))
    }

    /// Candidates for `raw` using the configured default limit.
    pub fn suggest(&self, raw: &str) -> Vec<Candidate> {
        self.generate_candidates(raw, self.config.default_limit, None)
    }

    /// Ranked, de-duplicated candidates for `raw`, at most `limit`.
    ///
    /// `context` is the text committed just before the cursor and feeds
    /// context prediction.
    pub fn generate_candidates(&self, raw: &str, limit: usize, context: Option<&str>) -> Vec<Candidate> {
        let input = normalize_keystrokes(raw);
        if input.is_empty() || limit == 0 {
            return Vec::new();
        }
        let key = CacheKey {
            input,
            limit,
            context: context.map(str::trim).filter(|c| !c.is_empty()).map(String::from),
        };
        if let Some(hit) = self.cache_lookup(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return hit;
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let analysis = self.classifier.analyze(&key.input);
        let out = self.pipeline.run(&analysis, key.context.as_deref(), limit);
        debug!(
            input = %key.input,
            mode = ?analysis.mode,
            count = out.len(),
            "candidates generated"
        );
        self.cache_store(key, &out);
        out
    }

    fn generations(&self) -> (u64, u64) {
        (
            self.ctx.catalog.generation(),
            self.settings_generation.load(Ordering::Acquire),
        )
    }

    fn cache_lookup(&self, key: &CacheKey) -> Option<Vec<Candidate>> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().ok()?;
        let current = self.generations();
        if cache.generation != current {
            cache.entries.clear();
            cache.generation = current;
            return None;
        }
        cache.entries.get(key).cloned()
    }

    fn cache_store(&self, key: CacheKey, candidates: &[Candidate]) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        match cache.lock() {
            Ok(mut cache) => {
                let current = self.generations();
                if cache.generation != current {
                    cache.entries.clear();
                    cache.generation = current;
                }
                cache.entries.put(key, candidates.to_vec());
            }
            Err(_) => warn!("query cache lock poisoned, result not cached"),
        }
    }

    fn invalidate(&self) {
        self.settings_generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Learn from a committed candidate.
    ///
    /// `alternatives` is the list the user picked from and `position` the
    /// index of the chosen entry in it. Cached results are dropped so the
    /// next query reflects the selection.
    pub fn record_selection(&self, raw: &str, chosen: &Candidate, alternatives: &[Candidate], position: usize) {
        self.ctx
            .history
            .record_selection(&normalize_keystrokes(raw), chosen, alternatives, position);
        self.invalidate();
    }

    /// Forget the committed-word context.
    pub fn reset_context(&self) {
        self.ctx.history.reset_context();
    }

    /// Turn all initial/final/syllable fuzzy rules on or off at once.
    pub fn set_fuzzy_enabled(&self, enabled: bool) {
        match self.ctx.fuzzy.write() {
            Ok(mut rules) => rules.set_enabled(enabled),
            Err(_) => {
                warn!("fuzzy rule lock poisoned, setting ignored");
                return;
            }
        }
        self.invalidate();
    }

    /// Toggle one rule. Returns false when no such rule exists.
    pub fn set_fuzzy_rule(&self, kind: RuleKind, a: &str, b: &str, enabled: bool) -> bool {
        let changed = match self.ctx.fuzzy.write() {
            Ok(mut rules) => rules.set_rule_enabled(kind, a, b, enabled),
            Err(_) => {
                warn!("fuzzy rule lock poisoned, setting ignored");
                false
            }
        };
        if changed {
            self.invalidate();
        }
        changed
    }

    /// Current fuzzy settings, e.g. to persist them.
    pub fn fuzzy_config(&self) -> FuzzyConfig {
        self.ctx
            .with_fuzzy(|rules| rules.to_config())
            .unwrap_or_default()
    }

    /// Get cache statistics for monitoring: `(hits, misses)`.
    pub fn cache_stats(&self) -> (usize, usize) {
        (
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
        )
    }

    /// Get cache hit rate as a percentage (0.0 to 100.0).
    ///
    /// Returns None if no cache accesses have been made yet.
    pub fn cache_hit_rate(&self) -> Option<f32> {
        let (hits, misses) = self.cache_stats();
        let total = hits + misses;
        if total == 0 {
            None
        } else {
            Some(hits as f32 / total as f32 * 100.0)
        }
    }

    /// Get current cache size (number of entries).
    pub fn cache_size(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.lock().ok().map(|c| c.entries.len()))
            .unwrap_or(0)
    }

    /// Get cache capacity (maximum entries); 0 when caching is off.
    pub fn cache_capacity(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.lock().ok().map(|c| c.entries.cap().get()))
            .unwrap_or(0)
    }

    /// Clear the cache and its statistics.
    pub fn clear_cache(&self) {
        if let Some(Ok(mut cache)) = self.cache.as_ref().map(|c| c.lock()) {
            cache.entries.clear();
        }
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::test_support::rows;
    use suggest_core::{DictionaryCategory, MemoryStore};

    fn engine(config: PinyinConfig) -> Engine {
        let store = MemoryStore::from_entries(rows());
        let catalog = Arc::new(TrieCatalog::new(None, None));
        catalog.build_from_store(DictionaryCategory::Base, &store).unwrap();
        catalog.build_from_store(DictionaryCategory::Chars, &store).unwrap();
        Engine::new(config, catalog).unwrap()
    }

    #[test]
    fn keystrokes_are_normalized() {
        assert_eq!(normalize_keystrokes(" Bei'Jing "), "beijing");
        assert_eq!(normalize_keystrokes("lǜ"), "lv");
    }

    #[test]
    fn repeated_query_hits_cache() {
        let engine = engine(PinyinConfig::default());
        let first = engine.generate_candidates("beijing", 5, None);
        let second = engine.generate_candidates("BeiJing", 5, None);
        assert_eq!(first, second);
        assert_eq!(engine.cache_stats(), (1, 1));
        assert_eq!(engine.cache_hit_rate(), Some(50.0));
        assert_eq!(engine.cache_size(), 1);

        engine.clear_cache();
        assert_eq!(engine.cache_stats(), (0, 0));
        assert_eq!(engine.cache_size(), 0);
    }

    #[test]
    fn catalog_changes_invalidate_cache() {
        let engine = engine(PinyinConfig::default());
        engine.generate_candidates("zhongguo", 5, None);
        engine.catalog().unload(DictionaryCategory::Base);
        let out = engine.generate_candidates("zhongguo", 5, None);
        assert!(out.iter().all(|c| c.word() != "中国"));
        assert_eq!(engine.cache_stats(), (0, 2));
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let mut config = PinyinConfig::default();
        config.base.max_cache_size = 0;
        let engine = engine(config);
        engine.generate_candidates("beijing", 5, None);
        engine.generate_candidates("beijing", 5, None);
        assert_eq!(engine.cache_capacity(), 0);
        assert_eq!(engine.cache_stats(), (0, 2));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PinyinConfig::default();
        config.base.ranking.match_accuracy = -1.0;
        let catalog = Arc::new(TrieCatalog::new(None, None));
        assert!(Engine::new(config, catalog).is_err());
    }
}
