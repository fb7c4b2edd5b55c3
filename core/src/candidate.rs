//! Candidate types produced by the generation layers.
//!
//! A `Candidate` is built once per query by a layer and then only moved
//! around: the consuming `with_*` methods hand back a new value.
use serde::{Deserialize, Serialize};

use crate::ranking::WeightComponents;
use crate::store::DictionaryCategory;

/// Which generation layer produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayer {
    ExactMatch,
    PrefixMatch,
    FuzzyMatch,
    SmartSuggestion,
    ContextPrediction,
    /// Assembled by the sentence combiner from sub-segment lookups.
    Combination,
    /// Greedy left-to-right pass of the sentence combiner.
    Progressive,
}

/// How the candidate relates to the typed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
    Fuzzy,
    Acronym,
    Mixed,
    Prediction,
    Partial,
    Combination,
}

/// A single scored word or phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    word: String,
    pinyin: String,
    initials: String,
    frequency: u64,
    source_layer: SourceLayer,
    match_kind: MatchKind,
    weights: WeightComponents,
    composed_score: f32,
    strategy_bonus: f32,
    confidence: f32,
    dictionary: Option<DictionaryCategory>,
}

impl Candidate {
    /// A candidate whose composed score is the plain sum of `weights`.
    pub fn new<T: Into<String>>(
        word: T,
        source_layer: SourceLayer,
        match_kind: MatchKind,
        weights: WeightComponents,
    ) -> Self {
        let weights = weights.clamped();
        Self {
            word: word.into(),
            pinyin: String::new(),
            initials: String::new(),
            frequency: 0,
            source_layer,
            match_kind,
            composed_score: weights.sum(),
            weights,
            strategy_bonus: 0.0,
            confidence: 1.0,
            dictionary: None,
        }
    }

    /// Attach the syllable spelling; initials are derived from it.
    pub fn with_pinyin<T: Into<String>>(mut self, pinyin: T) -> Self {
        self.pinyin = pinyin.into();
        self.initials = self
            .pinyin
            .split_whitespace()
            .filter_map(|s| s.chars().next())
            .collect();
        self
    }

    /// Override the initials, for hits that only carry an acronym key.
    pub fn with_initials<T: Into<String>>(mut self, initials: T) -> Self {
        self.initials = initials.into();
        self
    }

    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_dictionary(mut self, category: DictionaryCategory) -> Self {
        self.dictionary = Some(category);
        self
    }

    /// Replace the composed score, e.g. with a weighted ranking model.
    pub fn with_composed_score(mut self, score: f32) -> Self {
        self.composed_score = score;
        self
    }

    /// Add a strategy post-processing bonus.
    pub fn with_bonus(mut self, bonus: f32) -> Self {
        self.strategy_bonus += bonus;
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// Space-separated syllables, empty when unknown.
    pub fn pinyin(&self) -> &str {
        &self.pinyin
    }

    /// Pinyin with separators removed.
    pub fn compact_pinyin(&self) -> String {
        self.pinyin.split_whitespace().collect()
    }

    pub fn initials(&self) -> &str {
        &self.initials
    }

    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn source_layer(&self) -> SourceLayer {
        self.source_layer
    }

    pub fn match_kind(&self) -> MatchKind {
        self.match_kind
    }

    pub fn weights(&self) -> &WeightComponents {
        &self.weights
    }

    pub fn composed_score(&self) -> f32 {
        self.composed_score
    }

    pub fn strategy_bonus(&self) -> f32 {
        self.strategy_bonus
    }

    /// Score used for the final ordering.
    pub fn final_score(&self) -> f32 {
        self.composed_score + self.strategy_bonus
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn dictionary(&self) -> Option<DictionaryCategory> {
        self.dictionary
    }

    /// Number of characters in the word.
    pub fn char_len(&self) -> usize {
        self.word.chars().count()
    }

    pub fn syllable_count(&self) -> usize {
        self.pinyin.split_whitespace().count()
    }
}

/// Order by final score, then frequency, then word, all descending except
/// the word which breaks remaining ties alphabetically.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.final_score()
            .partial_cmp(&a.final_score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.frequency.cmp(&a.frequency))
            .then_with(|| a.word.cmp(&b.word))
    });
}
