//! Mode to strategy table.
//!
//! A strategy names the layers to run for a mode, in order, and the
//! post-processing bonus applied to the merged list before the final sort.
use ahash::AHashMap;
use suggest_core::{Candidate, SourceLayer};

use crate::classifier::{InputAnalysis, InputMode};

/// Bonus policy applied after merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Plain resort by score.
    Resort,
    /// +0.3 for one-character words, +0.2 for two.
    ShortWordBonus,
    /// +0.4 when the word has one character per typed letter, +0.2 for one
    /// more.
    AcronymLengthBonus,
    /// +0.3 when the compact pinyin equals the input.
    ExactPinyinBonus,
    /// +0.2 when the compact pinyin starts with the input.
    PinyinPrefixBonus,
    /// +0.3 for four or more characters, +0.1 for two or more, and +0.2 for
    /// candidates assembled by the sentence combiner.
    SentenceBonus,
}

impl PostProcess {
    /// Bonus earned by `candidate` for `input`.
    pub fn bonus(&self, candidate: &Candidate, input: &str) -> f32 {
        let len = candidate.char_len();
        match self {
            PostProcess::Resort => 0.0,
            PostProcess::ShortWordBonus => match len {
                1 => 0.3,
                2 => 0.2,
                _ => 0.0,
            },
            PostProcess::AcronymLengthBonus => {
                let typed = input.chars().count();
                if len == typed {
                    0.4
                } else if len == typed + 1 {
                    0.2
                } else {
                    0.0
                }
            }
            PostProcess::ExactPinyinBonus => {
                if candidate.compact_pinyin() == input {
                    0.3
                } else {
                    0.0
                }
            }
            PostProcess::PinyinPrefixBonus => {
                let compact = candidate.compact_pinyin();
                if !compact.is_empty() && compact.starts_with(input) {
                    0.2
                } else {
                    0.0
                }
            }
            PostProcess::SentenceBonus => {
                let length = if len >= 4 {
                    0.3
                } else if len >= 2 {
                    0.1
                } else {
                    0.0
                };
                let assembled = match candidate.source_layer() {
                    SourceLayer::Combination | SourceLayer::Progressive => 0.2,
                    _ => 0.0,
                };
                length + assembled
            }
        }
    }

    /// Add the bonus to every candidate.
    pub fn apply(&self, candidates: Vec<Candidate>, analysis: &InputAnalysis) -> Vec<Candidate> {
        if *self == PostProcess::Resort {
            return candidates;
        }
        let input = analysis.raw_input.as_str();
        candidates
            .into_iter()
            .map(|c| {
                let bonus = self.bonus(&c, input);
                c.with_bonus(bonus)
            })
            .collect()
    }
}

/// Layers and post-processing for one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub layers: Vec<SourceLayer>,
    pub post: PostProcess,
    /// Run the sentence combiner when the layers find too little.
    pub sentence_fallback: bool,
}

impl Strategy {
    pub fn new(layers: &[SourceLayer], post: PostProcess) -> Self {
        Self {
            layers: layers.to_vec(),
            post,
            sentence_fallback: false,
        }
    }

    pub fn with_sentence_fallback(mut self) -> Self {
        self.sentence_fallback = true;
        self
    }
}

/// Lookup table from input mode to strategy.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    table: AHashMap<InputMode, Strategy>,
    fallback: Strategy,
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategySelector {
    /// The standard table.
    pub fn new() -> Self {
        use PostProcess::*;
        use SourceLayer::*;

        let mut selector = Self::empty();
        let entries = [
            (InputMode::SingleLetter, Strategy::new(&[ExactMatch, SmartSuggestion], ShortWordBonus)),
            (
                InputMode::PureAcronym,
                Strategy::new(&[ExactMatch, PrefixMatch, SmartSuggestion], AcronymLengthBonus),
            ),
            (
                InputMode::PurePinyin,
                Strategy::new(&[ExactMatch, PrefixMatch, FuzzyMatch, SmartSuggestion], ExactPinyinBonus),
            ),
            (
                InputMode::PartialPinyin,
                Strategy::new(&[PrefixMatch, FuzzyMatch, SmartSuggestion], PinyinPrefixBonus),
            ),
            (
                InputMode::AcronymPinyinMix,
                Strategy::new(&[ExactMatch, PrefixMatch, FuzzyMatch, SmartSuggestion], Resort),
            ),
            (
                InputMode::PinyinAcronymMix,
                Strategy::new(&[ExactMatch, PrefixMatch, FuzzyMatch, SmartSuggestion], Resort),
            ),
            (
                InputMode::SentenceInput,
                Strategy::new(&[ExactMatch, PrefixMatch, SmartSuggestion, ContextPrediction], SentenceBonus)
                    .with_sentence_fallback(),
            ),
            (InputMode::ProgressiveInput, Strategy::new(&[PrefixMatch, SmartSuggestion], Resort)),
        ];
        for (mode, strategy) in entries {
            selector.table.insert(mode, strategy);
        }
        selector
    }

    /// Only the fallback strategy.
    pub fn empty() -> Self {
        use SourceLayer::*;
        Self {
            table: AHashMap::new(),
            fallback: Strategy::new(&[ExactMatch, PrefixMatch, FuzzyMatch], PostProcess::Resort),
        }
    }

    /// Replace the strategy for `mode`.
    pub fn with_strategy(mut self, mode: InputMode, strategy: Strategy) -> Self {
        self.table.insert(mode, strategy);
        self
    }

    pub fn select(&self, mode: InputMode) -> &Strategy {
        self.table.get(&mode).unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &Strategy {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suggest_core::MatchKind;

    fn word(w: &str, pinyin: &str, source: SourceLayer) -> Candidate {
        Candidate::new(w, source, MatchKind::Exact, Default::default()).with_pinyin(pinyin)
    }

    #[test]
    fn every_mode_has_a_strategy() {
        let selector = StrategySelector::new();
        let sentence = selector.select(InputMode::SentenceInput);
        assert!(sentence.sentence_fallback);
        assert_eq!(sentence.layers.last(), Some(&SourceLayer::ContextPrediction));
        assert_eq!(
            selector.select(InputMode::SingleLetter).layers,
            vec![SourceLayer::ExactMatch, SourceLayer::SmartSuggestion]
        );
    }

    #[test]
    fn missing_modes_use_fallback() {
        let selector = StrategySelector::empty();
        assert_eq!(selector.select(InputMode::PurePinyin), selector.fallback());
        let custom = Strategy::new(&[SourceLayer::PrefixMatch], PostProcess::Resort);
        let selector = selector.with_strategy(InputMode::PurePinyin, custom.clone());
        assert_eq!(selector.select(InputMode::PurePinyin), &custom);
    }

    #[test]
    fn bonuses() {
        let bj = word("北京", "bei jing", SourceLayer::ExactMatch);
        assert_eq!(PostProcess::AcronymLengthBonus.bonus(&bj, "bj"), 0.4);
        assert_eq!(PostProcess::AcronymLengthBonus.bonus(&bj, "b"), 0.2);
        assert_eq!(PostProcess::ExactPinyinBonus.bonus(&bj, "beijing"), 0.3);
        assert_eq!(PostProcess::PinyinPrefixBonus.bonus(&bj, "beij"), 0.2);
        assert_eq!(PostProcess::ShortWordBonus.bonus(&bj, "b"), 0.2);

        let combined = word("我是北京人", "wo shi bei jing ren", SourceLayer::Combination);
        assert!((PostProcess::SentenceBonus.bonus(&combined, "") - 0.5).abs() < 1e-6);
    }
}
