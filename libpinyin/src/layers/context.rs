//! Context prediction: words likely to follow what was committed last.
use std::sync::Arc;

use suggest_core::{Candidate, DictionaryCategory, MatchKind, SourceLayer, WeightComponents};
use tracing::debug;

use super::{GenerationLayer, LayerContext, LayerInput};

/// Phrase dictionaries whose entries extend a preceding word.
const ASSOCIATION_CATEGORIES: [DictionaryCategory; 2] =
    [DictionaryCategory::Correlation, DictionaryCategory::Associational];

#[derive(Debug, Clone)]
pub struct ContextPredictionLayer {
    ctx: Arc<LayerContext>,
}

impl ContextPredictionLayer {
    pub fn new(ctx: Arc<LayerContext>) -> Self {
        Self { ctx }
    }

    /// Whether a word typed as `key` (input or pinyin) fits the keystrokes.
    fn fits(text: &str, input: &str, pinyin: &str) -> bool {
        let compact: String = pinyin.split_whitespace().collect();
        let initials: String = pinyin.split_whitespace().filter_map(|s| s.chars().next()).collect();
        input.starts_with(text) || (!compact.is_empty() && compact.starts_with(text)) || initials.starts_with(text)
    }

    fn from_history(&self, context: &str, text: &str, limit: usize) -> Vec<Candidate> {
        self.ctx
            .history
            .follow_ups(context, limit.saturating_mul(4))
            .into_iter()
            .filter(|f| Self::fits(text, &f.input, &f.pinyin))
            .take(limit)
            .map(|f| {
                let weights = WeightComponents {
                    base_frequency: (f.count as f32 / 10.0).min(1.0),
                    match_accuracy: 0.6,
                    context_relevance: f.relevance,
                    input_efficiency: 0.5,
                    temporal_factor: 0.5,
                    ..WeightComponents::default()
                };
                let candidate = Candidate::new(f.word, SourceLayer::ContextPrediction, MatchKind::Prediction, weights)
                    .with_frequency(f.count)
                    .with_confidence(0.5 + f.relevance / 2.0);
                if f.pinyin.is_empty() {
                    candidate.with_initials(f.input)
                } else {
                    candidate.with_pinyin(f.pinyin)
                }
            })
            .collect()
    }

    /// Phrases that start with the last known word of the context and
    /// continue with the typed syllables; the continuation is the candidate.
    fn from_associations(&self, context: &str, text: &str, limit: usize) -> Vec<Candidate> {
        let Some((lead_word, pinyin)) = self.ctx.history.trailing_word(context) else {
            return Vec::new();
        };
        let lead: String = pinyin.split_whitespace().collect();
        if lead.is_empty() {
            return Vec::new();
        }
        let lead_syllables = pinyin.split_whitespace().count();
        let path = format!("{lead}{text}");
        self.ctx
            .prefix(&ASSOCIATION_CATEGORIES, &path, limit)
            .into_iter()
            .filter_map(|hit| {
                let rest = hit.word.strip_prefix(lead_word.as_str())?;
                if rest.is_empty() {
                    return None;
                }
                let full = self.ctx.pinyin_for_path(&hit.path);
                let rest_pinyin: Vec<&str> = full.split_whitespace().skip(lead_syllables).collect();
                let weights = WeightComponents {
                    base_frequency: self.ctx.frequency_score(hit.frequency),
                    match_accuracy: 0.6,
                    context_relevance: 0.6,
                    input_efficiency: 0.5,
                    temporal_factor: 0.5,
                    ..WeightComponents::default()
                };
                Some(
                    Candidate::new(rest, SourceLayer::ContextPrediction, MatchKind::Prediction, weights)
                        .with_frequency(hit.frequency)
                        .with_confidence(0.6)
                        .with_dictionary(hit.category)
                        .with_pinyin(rest_pinyin.join(" ")),
                )
            })
            .collect()
    }
}

impl GenerationLayer for ContextPredictionLayer {
    fn source(&self) -> SourceLayer {
        SourceLayer::ContextPrediction
    }

    fn generate(&self, input: &LayerInput<'_>, limit: usize) -> Vec<Candidate> {
        let Some(context) = input.context.map(str::trim) else {
            return Vec::new();
        };
        if input.analysis.is_void() || limit == 0 {
            return Vec::new();
        }
        let text = input.text();
        let mut out = self.from_history(context, text, limit);
        if out.len() < limit {
            out.extend(self.from_associations(context, text, limit - out.len()));
        }
        debug!(input = text, context, count = out.len(), "context layer");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use suggest_core::{DictionaryEntry, MemoryStore};

    fn pick(ctx: &LayerContext, input: &str, word: &str, pinyin: &str) {
        let c = Candidate::new(word, SourceLayer::ExactMatch, MatchKind::Exact, Default::default()).with_pinyin(pinyin);
        ctx.history.record_selection(input, &c, &[], 0);
    }

    #[test]
    fn follow_ups_need_a_context() {
        let ctx = Arc::new(context());
        pick(&ctx, "beijing", "北京", "bei jing");
        pick(&ctx, "ren", "人", "ren");

        let layer = ContextPredictionLayer::new(ctx);
        let analysis = analyze("r");
        assert!(layer.generate(&LayerInput::new(&analysis), 5).is_empty());

        let out = layer.generate(&LayerInput::new(&analysis).with_context(Some("北京")), 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].word(), "人");
        assert_eq!(out[0].weights().context_relevance, 1.0);
    }

    #[test]
    fn associations_extend_the_context_word() {
        let ctx = context();
        let store = MemoryStore::from_entries(vec![DictionaryEntry::new(
            "北京大学",
            "bei jing da xue",
            600,
            DictionaryCategory::Correlation,
        )]);
        ctx.catalog
            .build_from_store(DictionaryCategory::Correlation, &store)
            .unwrap();
        pick(&ctx, "beijing", "北京", "bei jing");

        let layer = ContextPredictionLayer::new(Arc::new(ctx));
        let analysis = analyze("da");
        let out = layer.generate(&LayerInput::new(&analysis).with_context(Some("北京")), 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].word(), "大学");
        assert_eq!(out[0].pinyin(), "da xue");

        // only the trailing word of a longer context matters
        let out = layer.generate(&LayerInput::new(&analysis).with_context(Some("我们去北京")), 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].word(), "大学");
    }
}
