//! Smart suggestions from the user's selection history.
use std::sync::Arc;

use suggest_core::{Candidate, MatchKind, SourceLayer, WeightComponents};
use tracing::debug;

use super::{GenerationLayer, LayerContext, LayerInput};

/// Selections at which the history alone counts as fully frequent.
const SATURATING_COUNT: f32 = 10.0;

#[derive(Debug, Clone)]
pub struct SmartSuggestionLayer {
    ctx: Arc<LayerContext>,
}

impl SmartSuggestionLayer {
    pub fn new(ctx: Arc<LayerContext>) -> Self {
        Self { ctx }
    }
}

impl GenerationLayer for SmartSuggestionLayer {
    fn source(&self) -> SourceLayer {
        SourceLayer::SmartSuggestion
    }

    fn generate(&self, input: &LayerInput<'_>, limit: usize) -> Vec<Candidate> {
        if input.analysis.is_void() || limit == 0 {
            return Vec::new();
        }
        let text = input.text();
        let input_len = text.chars().count().max(1) as f32;

        let out: Vec<Candidate> = self
            .ctx
            .history
            .suggestions(text, limit)
            .into_iter()
            .map(|hit| {
                let exact = hit.input == text;
                let weights = WeightComponents {
                    base_frequency: (hit.count as f32 / SATURATING_COUNT).min(1.0),
                    match_accuracy: if exact { 1.0 } else { 0.8 },
                    user_preference: hit.preference,
                    context_relevance: 0.0,
                    input_efficiency: (input_len / hit.input.chars().count().max(1) as f32).min(1.0),
                    temporal_factor: hit.recency,
                };
                let kind = if exact { MatchKind::Exact } else { MatchKind::Prefix };
                let candidate = Candidate::new(hit.word, SourceLayer::SmartSuggestion, kind, weights)
                    .with_frequency(hit.count)
                    .with_confidence(0.5 + hit.preference / 2.0);
                if hit.pinyin.is_empty() {
                    candidate.with_initials(hit.input)
                } else {
                    candidate.with_pinyin(hit.pinyin)
                }
            })
            .collect();
        debug!(input = text, count = out.len(), "suggestion layer");
        out
    }
}
