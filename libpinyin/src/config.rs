//! Pinyin-specific configuration that extends the base `Config` from core.
//!
//! This configuration includes:
//! - All generic options from `suggest_core::Config` (flattened via serde)
//! - Classifier thresholds (sentence length, acronym length, mixed-part cap)
//! - Pipeline tunables (sentence fallback threshold, default result count)
//!
//! # Example
//!
//! ```rust
//! use pinyin_suggest::PinyinConfig;
//!
//! let config = PinyinConfig::from_toml_str("sentence_threshold = 5\nmax_cache_size = 10\n").unwrap();
//! assert_eq!(config.sentence_threshold, 5);
//! assert_eq!(config.base.max_cache_size, 10);
//! ```
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use suggest_core::{Config, ConfigError};

use crate::classifier::ClassifierConfig;
use crate::pipeline::PipelineOptions;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PinyinConfig {
    /// Base configuration fields (capacities, directories, cache, ranking, fuzzy)
    #[serde(flatten)]
    pub base: Config,

    /// More syllables than this read as a sentence
    pub sentence_threshold: usize,
    /// Longest unsplittable letter run read as an acronym
    pub acronym_max_len: usize,
    /// Longest acronym half of a mixed input
    pub mixed_part_max_len: usize,
    /// Run the sentence combiner below this many merged candidates
    pub sentence_fallback_threshold: usize,
    /// Result count when the caller does not ask for one
    pub default_limit: usize,
    /// Cap on fuzzy variant sequences per query
    pub fuzzy_variant_limit: usize,
}

impl Default for PinyinConfig {
    fn default() -> Self {
        let classifier = ClassifierConfig::default();
        Self {
            base: Config::default(),
            sentence_threshold: classifier.sentence_threshold,
            acronym_max_len: classifier.acronym_max_len,
            mixed_part_max_len: classifier.mixed_part_max_len,
            sentence_fallback_threshold: 3,
            default_limit: 10,
            fuzzy_variant_limit: 16,
        }
    }
}

impl PinyinConfig {
    /// Convert this pinyin config into the base config
    pub fn into_base(self) -> Config {
        self.base
    }

    /// Get a reference to the base config
    pub fn base(&self) -> &Config {
        &self.base
    }

    /// Get a mutable reference to the base config
    pub fn base_mut(&mut self) -> &mut Config {
        &mut self.base
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            sentence_threshold: self.sentence_threshold,
            acronym_max_len: self.acronym_max_len,
            mixed_part_max_len: self.mixed_part_max_len,
            ..ClassifierConfig::default()
        }
    }

    pub fn pipeline(&self) -> PipelineOptions {
        PipelineOptions {
            overfetch_factor: self.base.overfetch_factor,
            sentence_fallback_threshold: self.sentence_fallback_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base.validate()?;
        for (name, value) in [
            ("acronym_max_len", self.acronym_max_len),
            ("mixed_part_max_len", self.mixed_part_max_len),
            ("default_limit", self.default_limit),
            ("fuzzy_variant_limit", self.fuzzy_variant_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroLimit { name });
            }
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load and validate from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }
}
