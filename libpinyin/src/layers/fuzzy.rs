//! Fuzzy layer: exact lookups of phonetically equivalent spellings.
use std::sync::Arc;

use suggest_core::{Candidate, DictionaryCategory, MatchKind, SourceLayer};
use tracing::debug;

use super::{
    analysis_syllables, dictionary_weights, GenerationLayer, LayerContext, LayerInput, Lookup, MixedParts,
    WORD_CATEGORIES,
};
use crate::classifier::InputMode;

#[derive(Debug, Clone)]
pub struct FuzzyMatchLayer {
    ctx: Arc<LayerContext>,
}

/// Accuracy and confidence shrink with every substituted syllable.
fn penalties(changed: usize) -> (f32, f32) {
    let extra = changed.saturating_sub(1) as i32;
    let accuracy = (0.7 - 0.1 * extra as f32).max(0.3);
    let confidence = 0.85 * 0.9_f32.powi(extra);
    (accuracy, confidence)
}

impl FuzzyMatchLayer {
    pub fn new(ctx: Arc<LayerContext>) -> Self {
        Self { ctx }
    }

    /// Variant syllable sequences, without the unchanged original.
    fn variant_sequences(&self, syllables: &[String]) -> Vec<(Vec<String>, usize)> {
        let limit = self.ctx.fuzzy_variant_limit;
        self.ctx
            .with_fuzzy(|rules| rules.expand_sequence(syllables, limit))
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, changed)| *changed > 0)
            .collect()
    }

    fn syllable_lookups(&self, syllables: &[String], limit: usize) -> Vec<(Lookup, usize, Option<String>)> {
        let mut categories = WORD_CATEGORIES.to_vec();
        if syllables.len() == 1 {
            categories.insert(0, DictionaryCategory::Chars);
        }
        self.variant_sequences(syllables)
            .into_iter()
            .flat_map(|(seq, changed)| {
                self.ctx
                    .exact(&categories, &seq.concat(), limit)
                    .into_iter()
                    .map(move |hit| (hit, changed, None))
            })
            .collect()
    }

    fn mixed_lookups(&self, parts: &MixedParts, limit: usize) -> Vec<(Lookup, usize, Option<String>)> {
        self.variant_sequences(&parts.syllables)
            .into_iter()
            .flat_map(|(seq, changed)| {
                let variant = parts.with_syllables(seq);
                let pinyin = variant.display_pinyin();
                variant
                    .lookup(&self.ctx, limit, false)
                    .into_iter()
                    .map(move |hit| (hit, changed, Some(pinyin.clone())))
            })
            .collect()
    }

    /// Prefix lookups of whole-input variants, for unfinished syllables.
    fn partial_lookups(&self, text: &str, limit: usize) -> Vec<(Lookup, usize, Option<String>)> {
        let variants = self
            .ctx
            .with_fuzzy(|rules| rules.variants(text))
            .unwrap_or_default();
        variants
            .into_iter()
            .skip(1)
            .flat_map(|variant| self.ctx.prefix(&WORD_CATEGORIES, &variant, limit))
            .map(|hit| (hit, 1, None))
            .collect()
    }
}

impl GenerationLayer for FuzzyMatchLayer {
    fn source(&self) -> SourceLayer {
        SourceLayer::FuzzyMatch
    }

    fn generate(&self, input: &LayerInput<'_>, limit: usize) -> Vec<Candidate> {
        if input.analysis.is_void() || limit == 0 {
            return Vec::new();
        }
        let lookups = match input.mode() {
            InputMode::PurePinyin | InputMode::SentenceInput => {
                self.syllable_lookups(&analysis_syllables(input.analysis), limit)
            }
            InputMode::AcronymPinyinMix | InputMode::PinyinAcronymMix => {
                match MixedParts::from_analysis(input.analysis) {
                    Some(parts) => self.mixed_lookups(&parts, limit),
                    None => Vec::new(),
                }
            }
            InputMode::PartialPinyin => self.partial_lookups(input.text(), limit),
            // initials and unfinished tails have no syllables to bend
            InputMode::SingleLetter | InputMode::PureAcronym | InputMode::ProgressiveInput => Vec::new(),
        };

        let input_len = input.text().chars().count().max(1) as f32;
        let out: Vec<Candidate> = lookups
            .into_iter()
            .take(limit)
            .map(|(hit, changed, pinyin)| {
                let (accuracy, confidence) = penalties(changed);
                let efficiency = (hit.char_len() as f32 / input_len).min(2.0) / 2.0;
                let weights = dictionary_weights(self.ctx.frequency_score(hit.frequency), accuracy, efficiency);
                let candidate =
                    self.ctx
                        .candidate(&hit, SourceLayer::FuzzyMatch, MatchKind::Fuzzy, weights, confidence);
                match pinyin {
                    Some(pinyin) => candidate.with_pinyin(pinyin),
                    None => candidate,
                }
            })
            .collect();
        debug!(input = input.text(), count = out.len(), "fuzzy layer");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn layer() -> FuzzyMatchLayer {
        FuzzyMatchLayer::new(Arc::new(context()))
    }

    fn words(input: &str) -> Vec<String> {
        let analysis = analyze(input);
        layer()
            .generate(&LayerInput::new(&analysis), 10)
            .iter()
            .map(|c| c.word().to_string())
            .collect()
    }

    #[test]
    fn retroflex_variant_finds_flat_spelling() {
        // zhong -> zong
        assert_eq!(words("zhong"), vec!["宗"]);
        // zongjiao <- zhongjiao
        assert!(words("zhongjiao").contains(&"宗教".to_string()));
    }

    #[test]
    fn original_spelling_is_not_repeated() {
        assert!(!words("beijing").contains(&"北京".to_string()));
    }

    #[test]
    fn disabled_rules_produce_nothing() {
        let ctx = context();
        ctx.fuzzy.write().unwrap().set_enabled(false);
        let analysis = analyze("zhong");
        let out = FuzzyMatchLayer::new(Arc::new(ctx)).generate(&LayerInput::new(&analysis), 10);
        assert!(out.is_empty());
    }

    #[test]
    fn penalties_decay() {
        let (a1, c1) = penalties(1);
        let (a2, c2) = penalties(2);
        assert!(a2 < a1 && c2 < c1);
        assert_eq!(penalties(20).0, 0.3);
    }
}
