//! pinyin-suggest crate root
//!
//! Pinyin front end of the candidate engine: the syllable segmenter, the
//! input classifier, the generation layers and the ranking pipeline, wired
//! together by `Engine`.
//!
//! Public API exported here:
//! - `PinyinSegmenter` / `PhoneticSegmenter` from `parser`
//! - `InputClassifier`, `InputAnalysis`, `InputMode` from `classifier`
//! - `GenerationLayer` and the five standard layers from `layers`
//! - `StrategySelector` from `strategy`, `CandidatePipeline` from `pipeline`
//! - `SentenceCombiner` from `sentence`
//! - `Engine` from `engine`, `KeystrokeSession` from `session`
//! - `PinyinConfig` from `config`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pinyin_suggest::{Engine, PinyinConfig};
//! use suggest_core::{DictionaryCategory, DictionaryEntry, MemoryStore, TrieCatalog};
//!
//! let store = MemoryStore::from_entries(vec![
//!     DictionaryEntry::new("北京", "bei jing", 9000, DictionaryCategory::Base),
//!     DictionaryEntry::new("背景", "bei jing", 500, DictionaryCategory::Base),
//! ]);
//! let catalog = Arc::new(TrieCatalog::new(None, None));
//! catalog.build_from_store(DictionaryCategory::Base, &store).unwrap();
//!
//! let engine = Engine::new(PinyinConfig::default(), catalog).unwrap();
//! let words: Vec<_> = engine
//!     .generate_candidates("bj", 5, None)
//!     .iter()
//!     .map(|c| c.word().to_string())
//!     .collect();
//! assert_eq!(words, vec!["北京", "背景"]);
//! ```

pub mod classifier;
pub mod config;
pub mod engine;
pub mod layers;
pub mod parser;
pub mod pipeline;
pub mod sentence;
pub mod session;
pub mod strategy;
pub mod syllables;

// Convenience re-exports for common types used by callers.
pub use classifier::{
    CharacterPattern, ClassifierConfig, InputAnalysis, InputClassifier, InputMode, Segment, SegmentKind,
    SyllableStructure,
};
pub use config::PinyinConfig;
pub use engine::{normalize_keystrokes, Engine};
pub use layers::{
    ContextPredictionLayer, ExactMatchLayer, FuzzyMatchLayer, GenerationLayer, LayerContext, LayerInput,
    PrefixMatchLayer, SmartSuggestionLayer,
};
pub use parser::{PhoneticSegmenter, PinyinSegmenter, SyllableTrie};
pub use pipeline::{merge_candidates, CandidatePipeline, PipelineOptions};
pub use sentence::SentenceCombiner;
pub use session::{KeystrokeSession, Ticket};
pub use strategy::{PostProcess, Strategy, StrategySelector};
pub use syllables::{is_syllable, PINYIN_SYLLABLES};

pub use suggest_core::{Candidate, MatchKind, SourceLayer};
