//! suggest-core
//!
//! Language-agnostic building blocks of the candidate engine: the concurrent
//! trie dictionary and its on-disk blob format, the per-category catalog,
//! phonetic fuzzy rules, candidate and ranking types, the dictionary row
//! store interface and the user selection history.
//!
//! Public API:
//! - `TrieDictionary` - Frequency-ranked, lock-guarded prefix tree
//! - `TrieCatalog` - One trie per `DictionaryCategory`, with load/unload
//! - `PhoneticFuzzyRules` - Toggleable initial/final/syllable equivalences
//! - `Candidate`, `WeightComponents`, `RankingModel` - Scoring
//! - `DictionaryStore` - Read-only row source used to build tries
//! - `UserHistory` - Selection learning for suggestion/context layers
//! - `Config` - Shared configuration (TOML)
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{BlobError, ConfigError};

pub mod trie;
pub use trie::{MemoryStats, TrieDictionary, TrieHit, TrieNode, WordItem};

pub mod store;
pub use store::{DictionaryCategory, DictionaryEntry, DictionaryStore, MemoryStore};

pub mod builder;
pub use builder::TrieBuilder;

pub mod catalog;
pub use catalog::{DictionarySource, DictionaryStatus, FileStatus, TrieCatalog};

pub mod fuzzy;
pub use fuzzy::{FuzzyConfig, FuzzyRule, PhoneticFuzzyRules, RuleKind};

pub mod ranking;
pub use ranking::{RankingModel, RankingWeights, WeightComponents};

pub mod candidate;
pub use candidate::{sort_candidates, Candidate, MatchKind, SourceLayer};

pub mod history;
pub use history::{FollowUp, HistoryHit, HistorySnapshot, UserHistory};

/// Shared engine configuration.
///
/// Language crates flatten this into their own config type and add their
/// specific tunables next to it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Word-list capacity per trie node for ordinary categories.
    pub default_node_capacity: usize,
    /// Word-list capacity for the single-character category.
    pub chars_node_capacity: usize,

    /// Directory holding precompiled `{category}_trie.dat` blobs.
    pub bundled_dict_dir: Option<PathBuf>,
    /// Directory for blobs built on this device (fallback on load, target on save).
    pub user_dict_dir: Option<PathBuf>,

    /// Maximum number of entries in the query cache. 0 disables the cache.
    pub max_cache_size: usize,
    /// Raw candidates requested from the layers per requested result.
    pub overfetch_factor: usize,
    /// Frequency that maps to a base-frequency score of 1.0.
    pub frequency_scale: f64,

    pub ranking: RankingWeights,
    pub fuzzy: FuzzyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_node_capacity: trie::DEFAULT_NODE_CAPACITY,
            chars_node_capacity: trie::CHARS_NODE_CAPACITY,
            bundled_dict_dir: None,
            user_dict_dir: None,
            // 1000 entries covers typical typing sessions
            max_cache_size: 1000,
            overfetch_factor: 3,
            frequency_scale: 100_000.0,
            ranking: RankingWeights::default(),
            fuzzy: FuzzyConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject settings no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_node_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.default_node_capacity));
        }
        if self.chars_node_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.chars_node_capacity));
        }
        if self.overfetch_factor == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "overfetch_factor",
            });
        }
        if !self.frequency_scale.is_finite() || self.frequency_scale <= 0.0 {
            return Err(ConfigError::InvalidWeight {
                name: "frequency_scale",
                value: self.frequency_scale as f32,
            });
        }
        self.ranking.validate()
    }

    /// Node capacity for `category`.
    pub fn capacity_for(&self, category: DictionaryCategory) -> usize {
        match category {
            DictionaryCategory::Chars => self.chars_node_capacity,
            _ => self.default_node_capacity,
        }
    }
}

pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Query-key form of raw keystrokes: NFC, lowercase, no whitespace.
    pub fn normalize_input(s: &str) -> String {
        normalize(s)
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Remove tone marks from pinyin; `ü` in any tone becomes `v`.
    pub fn strip_tones(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                'ā' | 'á' | 'ǎ' | 'à' => 'a',
                'ē' | 'é' | 'ě' | 'è' => 'e',
                'ī' | 'í' | 'ǐ' | 'ì' => 'i',
                'ō' | 'ó' | 'ǒ' | 'ò' => 'o',
                'ū' | 'ú' | 'ǔ' | 'ù' => 'u',
                'ü' | 'ǖ' | 'ǘ' | 'ǚ' | 'ǜ' => 'v',
                'Ā' | 'Á' | 'Ǎ' | 'À' => 'A',
                'Ē' | 'É' | 'Ě' | 'È' => 'E',
                'Ī' | 'Í' | 'Ǐ' | 'Ì' => 'I',
                'Ō' | 'Ó' | 'Ǒ' | 'Ò' => 'O',
                'Ū' | 'Ú' | 'Ǔ' | 'Ù' => 'U',
                'Ü' | 'Ǖ' | 'Ǘ' | 'Ǚ' | 'Ǜ' => 'V',
                other => other,
            })
            .collect()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn input_normalization() {
            assert_eq!(normalize_input("  Bei Jing "), "beijing");
            assert_eq!(normalize("  你好 "), "你好");
        }

        #[test]
        fn tones_are_stripped() {
            assert_eq!(strip_tones("běi jīng"), "bei jing");
            assert_eq!(strip_tones("lǜ"), "lv");
        }
    }
}
