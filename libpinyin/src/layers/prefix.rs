//! Prefix layer: words whose stored key begins with the input.
use std::sync::Arc;

use suggest_core::{sort_candidates, Candidate, MatchKind, SourceLayer};
use tracing::debug;

use super::{dictionary_weights, GenerationLayer, LayerContext, LayerInput, Lookup, MixedParts, WORD_CATEGORIES};
use crate::classifier::InputMode;

const PREFIX_ACCURACY: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct PrefixMatchLayer {
    ctx: Arc<LayerContext>,
}

impl PrefixMatchLayer {
    pub fn new(ctx: Arc<LayerContext>) -> Self {
        Self { ctx }
    }

    fn tagged(hits: Vec<Lookup>, confidence: f32, kind: MatchKind) -> impl Iterator<Item = (Lookup, f32, MatchKind)> {
        hits.into_iter().map(move |hit| (hit, confidence, kind))
    }

    /// Pinyin prefix first; initials only when that finds fewer than half
    /// of `limit`.
    fn pinyin_then_initials(
        &self,
        text: &str,
        limit: usize,
        pinyin_confidence: f32,
        initials_confidence: f32,
    ) -> Vec<(Lookup, f32, MatchKind)> {
        let mut out: Vec<_> =
            Self::tagged(self.ctx.prefix(&WORD_CATEGORIES, text, limit), pinyin_confidence, MatchKind::Prefix).collect();
        if out.len() < limit.div_ceil(2) {
            let initials = format!("{}{}", suggest_core::trie::INITIALS_MARKER, text);
            out.extend(Self::tagged(
                self.ctx.prefix(&WORD_CATEGORIES, &initials, limit),
                initials_confidence,
                MatchKind::Acronym,
            ));
        }
        out
    }

    fn lookups(&self, input: &LayerInput<'_>, limit: usize) -> Vec<(Lookup, f32, MatchKind)> {
        let text = input.text();
        match input.mode() {
            InputMode::PurePinyin | InputMode::SentenceInput => {
                Self::tagged(self.ctx.prefix(&WORD_CATEGORIES, text, limit), 0.8, MatchKind::Prefix).collect()
            }
            InputMode::PureAcronym => {
                let initials = format!("{}{}", suggest_core::trie::INITIALS_MARKER, text);
                Self::tagged(self.ctx.prefix(&WORD_CATEGORIES, &initials, limit), 0.75, MatchKind::Acronym).collect()
            }
            InputMode::PartialPinyin | InputMode::ProgressiveInput => {
                self.pinyin_then_initials(text, limit, 0.7, 0.6)
            }
            InputMode::AcronymPinyinMix | InputMode::PinyinAcronymMix => {
                match MixedParts::from_analysis(input.analysis) {
                    Some(parts) => {
                        Self::tagged(parts.lookup(&self.ctx, limit, true), 0.7, MatchKind::Mixed).collect()
                    }
                    None => Vec::new(),
                }
            }
            InputMode::SingleLetter => self.pinyin_then_initials(text, limit, 0.7, 0.65),
        }
    }
}

impl GenerationLayer for PrefixMatchLayer {
    fn source(&self) -> SourceLayer {
        SourceLayer::PrefixMatch
    }

    fn generate(&self, input: &LayerInput<'_>, limit: usize) -> Vec<Candidate> {
        if input.analysis.is_void() || limit == 0 {
            return Vec::new();
        }
        let input_len = input.text().chars().count() as f32;
        let mut out: Vec<Candidate> = self
            .lookups(input, limit)
            .into_iter()
            .map(|(hit, confidence, kind)| {
                // how much of the stored key is typed already
                let key_len = hit.path.trim_start_matches(suggest_core::trie::INITIALS_MARKER).chars().count();
                let weights = dictionary_weights(
                    self.ctx.frequency_score(hit.frequency),
                    PREFIX_ACCURACY,
                    (input_len / key_len.max(1) as f32).min(1.0),
                );
                self.ctx
                    .candidate(&hit, SourceLayer::PrefixMatch, kind, weights, confidence)
            })
            .collect();
        // every category contributes up to `limit`
        sort_candidates(&mut out);
        out.truncate(limit);
        debug!(input = input.text(), count = out.len(), "prefix layer");
        out
    }
}
