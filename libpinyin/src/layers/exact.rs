//! Exact-match layer: words whose stored key equals the whole input.
use std::sync::Arc;

use suggest_core::{Candidate, DictionaryCategory, MatchKind, SourceLayer};
use tracing::debug;

use super::{dictionary_weights, GenerationLayer, LayerContext, LayerInput, Lookup, MixedParts, WORD_CATEGORIES};
use crate::classifier::InputMode;

/// Sentence-exact hits shorter than this are left to the other layers.
const SENTENCE_MIN_CHARS: usize = 3;

#[derive(Debug, Clone)]
pub struct ExactMatchLayer {
    ctx: Arc<LayerContext>,
}

impl ExactMatchLayer {
    pub fn new(ctx: Arc<LayerContext>) -> Self {
        Self { ctx }
    }

    fn accuracy(mode: InputMode) -> f32 {
        match mode {
            InputMode::SingleLetter => 1.0,
            InputMode::PurePinyin => 0.95,
            InputMode::PureAcronym => 0.9,
            _ => 0.85,
        }
    }

    /// Lookups for the input with the confidence and match kind each
    /// lookup strategy earns.
    fn lookups(&self, input: &LayerInput<'_>, limit: usize) -> Vec<(Lookup, f32, MatchKind)> {
        let text = input.text();
        let initials = format!("{}{}", suggest_core::trie::INITIALS_MARKER, text);
        let tag = |hits: Vec<Lookup>, confidence: f32, kind: MatchKind| {
            hits.into_iter()
                .map(move |hit| (hit, confidence, kind))
                .collect::<Vec<_>>()
        };

        match input.mode() {
            InputMode::SingleLetter => tag(
                self.ctx.exact(&[DictionaryCategory::Chars], &initials, limit),
                1.0,
                MatchKind::Exact,
            ),
            InputMode::PureAcronym => tag(
                self.ctx.exact(&WORD_CATEGORIES, &initials, limit),
                0.95,
                MatchKind::Acronym,
            ),
            InputMode::PurePinyin => {
                let mut categories = WORD_CATEGORIES.to_vec();
                if input.analysis.syllable_structure.total() <= 1 {
                    categories.insert(0, DictionaryCategory::Chars);
                }
                tag(self.ctx.exact(&categories, text, limit), 1.0, MatchKind::Exact)
            }
            InputMode::SentenceInput => {
                let hits = self
                    .ctx
                    .exact(&WORD_CATEGORIES, text, limit)
                    .into_iter()
                    .filter(|hit| hit.char_len() >= SENTENCE_MIN_CHARS)
                    .collect();
                tag(hits, 1.0, MatchKind::Exact)
            }
            InputMode::AcronymPinyinMix | InputMode::PinyinAcronymMix => {
                match MixedParts::from_analysis(input.analysis) {
                    Some(parts) => tag(parts.lookup(&self.ctx, limit, false), 0.9, MatchKind::Mixed),
                    None => Vec::new(),
                }
            }
            InputMode::PartialPinyin | InputMode::ProgressiveInput => {
                let mut out = tag(self.ctx.exact(&WORD_CATEGORIES, text, limit), 0.9, MatchKind::Exact);
                out.extend(tag(
                    self.ctx.exact(&WORD_CATEGORIES, &initials, limit),
                    0.8,
                    MatchKind::Acronym,
                ));
                out
            }
        }
    }
}

impl GenerationLayer for ExactMatchLayer {
    fn source(&self) -> SourceLayer {
        SourceLayer::ExactMatch
    }

    fn generate(&self, input: &LayerInput<'_>, limit: usize) -> Vec<Candidate> {
        if input.analysis.is_void() || limit == 0 {
            return Vec::new();
        }
        let input_len = input.text().chars().count().max(1) as f32;
        let accuracy = Self::accuracy(input.mode());
        let mixed = MixedParts::from_analysis(input.analysis);

        let out: Vec<Candidate> = self
            .lookups(input, limit)
            .into_iter()
            .take(limit)
            .map(|(hit, confidence, kind)| {
                let efficiency = (hit.char_len() as f32 / input_len).min(2.0) / 2.0;
                let weights = dictionary_weights(self.ctx.frequency_score(hit.frequency), accuracy, efficiency);
                let candidate = self
                    .ctx
                    .candidate(&hit, SourceLayer::ExactMatch, kind, weights, confidence);
                match (&mixed, kind) {
                    (Some(parts), MatchKind::Mixed) => candidate.with_pinyin(parts.display_pinyin()),
                    _ => candidate,
                }
            })
            .collect();
        debug!(input = input.text(), count = out.len(), "exact layer");
        out
    }
}
