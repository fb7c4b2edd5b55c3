//! Candidate pipeline: run the selected layers, merge, post-process.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use rayon::prelude::*;
use suggest_core::{sort_candidates, Candidate, RankingModel, SourceLayer};
use tracing::{debug, warn};

use crate::classifier::InputAnalysis;
use crate::layers::{
    analysis_syllables, ContextPredictionLayer, ExactMatchLayer, FuzzyMatchLayer, GenerationLayer, LayerContext,
    LayerInput, PrefixMatchLayer, SmartSuggestionLayer,
};
use crate::sentence::SentenceCombiner;
use crate::strategy::StrategySelector;

/// Pipeline tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Raw candidates requested from each layer per requested result.
    pub overfetch_factor: usize,
    /// Merged lists shorter than this trigger the sentence combiner, for
    /// strategies that allow it.
    pub sentence_fallback_threshold: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            overfetch_factor: 3,
            sentence_fallback_threshold: 3,
        }
    }
}

/// Runs layers for an analysis and returns the final ranked list.
pub struct CandidatePipeline {
    layers: AHashMap<SourceLayer, Arc<dyn GenerationLayer>>,
    selector: StrategySelector,
    combiner: SentenceCombiner,
    ranking: RankingModel,
    options: PipelineOptions,
}

impl std::fmt::Debug for CandidatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut layers: Vec<_> = self.layers.keys().collect();
        layers.sort_by_key(|l| format!("{l:?}"));
        f.debug_struct("CandidatePipeline")
            .field("layers", &layers)
            .field("selector", &self.selector)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Merge by word, keeping the candidate with the higher composed score.
/// The first one seen wins ties; output keeps first-seen order.
pub fn merge_candidates(candidates: impl IntoIterator<Item = Candidate>) -> Vec<Candidate> {
    let mut index: AHashMap<String, usize> = AHashMap::new();
    let mut merged: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        match index.get(candidate.word()) {
            Some(&i) => {
                if candidate.composed_score() > merged[i].composed_score() {
                    merged[i] = candidate;
                }
            }
            None => {
                index.insert(candidate.word().to_string(), merged.len());
                merged.push(candidate);
            }
        }
    }
    merged
}

impl CandidatePipeline {
    /// Pipeline with the five standard layers over `ctx`.
    pub fn standard(ctx: Arc<LayerContext>, ranking: RankingModel, options: PipelineOptions) -> Self {
        let layers: [Arc<dyn GenerationLayer>; 5] = [
            Arc::new(ExactMatchLayer::new(ctx.clone())),
            Arc::new(PrefixMatchLayer::new(ctx.clone())),
            Arc::new(FuzzyMatchLayer::new(ctx.clone())),
            Arc::new(SmartSuggestionLayer::new(ctx.clone())),
            Arc::new(ContextPredictionLayer::new(ctx.clone())),
        ];
        let mut pipeline = Self {
            layers: AHashMap::new(),
            selector: StrategySelector::new(),
            combiner: SentenceCombiner::new(ctx),
            ranking,
            options,
        };
        for layer in layers {
            pipeline.register(layer);
        }
        pipeline
    }

    /// Add or replace the layer serving `layer.source()`.
    pub fn register(&mut self, layer: Arc<dyn GenerationLayer>) {
        self.layers.insert(layer.source(), layer);
    }

    pub fn with_selector(mut self, selector: StrategySelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn selector(&self) -> &StrategySelector {
        &self.selector
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// One layer's output. A panicking layer contributes nothing.
    fn run_layer(layer: &dyn GenerationLayer, input: &LayerInput<'_>, limit: usize) -> Vec<Candidate> {
        let started = Instant::now();
        match catch_unwind(AssertUnwindSafe(|| layer.generate(input, limit))) {
            Ok(candidates) => {
                debug!(
                    layer = ?layer.source(),
                    count = candidates.len(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "layer finished"
                );
                candidates
            }
            Err(_) => {
                warn!(layer = ?layer.source(), input = input.text(), "layer panicked, ignoring its output");
                Vec::new()
            }
        }
    }

    fn rescore(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.ranking.weights().is_unit() {
            return candidates;
        }
        candidates
            .into_iter()
            .map(|c| {
                let score = self.ranking.compose(c.weights());
                c.with_composed_score(score)
            })
            .collect()
    }

    /// Ranked candidates for `analysis`, at most `limit`, unique by word.
    pub fn run(&self, analysis: &InputAnalysis, context: Option<&str>, limit: usize) -> Vec<Candidate> {
        if analysis.is_void() || limit == 0 {
            return Vec::new();
        }
        let strategy = self.selector.select(analysis.mode);
        let input = LayerInput::new(analysis).with_context(context);
        let per_layer = limit.saturating_mul(self.options.overfetch_factor.max(1));

        let selected: Vec<&dyn GenerationLayer> = strategy
            .layers
            .iter()
            .filter_map(|source| self.layers.get(source).map(|layer| &**layer))
            .collect();
        // collect keeps strategy order, so merge ties resolve the same way
        // on every run
        let outputs: Vec<Vec<Candidate>> = selected
            .par_iter()
            .map(|layer| Self::run_layer(*layer, &input, per_layer))
            .collect();

        let mut merged = merge_candidates(self.rescore(outputs.into_iter().flatten().collect()));

        if strategy.sentence_fallback && merged.len() < self.options.sentence_fallback_threshold {
            let syllables = analysis_syllables(analysis);
            let assembled = self.rescore(self.combiner.combine(&syllables, per_layer));
            debug!(count = assembled.len(), "sentence fallback");
            merged = merge_candidates(merged.into_iter().chain(assembled));
        }

        let mut ranked = strategy.post.apply(merged, analysis);
        sort_candidates(&mut ranked);
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::test_support::{analyze, context};
    use suggest_core::{MatchKind, WeightComponents};

    fn scored(word: &str, accuracy: f32) -> Candidate {
        let weights = WeightComponents {
            match_accuracy: accuracy,
            ..WeightComponents::default()
        };
        Candidate::new(word, SourceLayer::ExactMatch, MatchKind::Exact, weights)
    }

    #[test]
    fn merge_keeps_higher_score() {
        let merged = merge_candidates(vec![scored("北京", 0.5), scored("背景", 0.4), scored("北京", 0.9)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].word(), "北京");
        assert!((merged[0].composed_score() - 0.9).abs() < 1e-6);
    }

    struct Panicking;

    impl GenerationLayer for Panicking {
        fn source(&self) -> SourceLayer {
            SourceLayer::FuzzyMatch
        }

        fn generate(&self, _: &LayerInput<'_>, _: usize) -> Vec<Candidate> {
            panic!("broken layer")
        }
    }

    #[test]
    fn panicking_layer_is_isolated() {
        let mut pipeline = CandidatePipeline::standard(
            Arc::new(context()),
            RankingModel::default(),
            PipelineOptions::default(),
        );
        pipeline.register(Arc::new(Panicking));
        let out = pipeline.run(&analyze("beijing"), None, 5);
        assert_eq!(out.first().map(|c| c.word()), Some("北京"));
    }

    #[test]
    fn output_is_unique_and_bounded() {
        let pipeline = CandidatePipeline::standard(
            Arc::new(context()),
            RankingModel::default(),
            PipelineOptions::default(),
        );
        for input in ["b", "bj", "bei", "beijing", "zhong", "woshibeijingren"] {
            for limit in [1, 2, 5, 20] {
                let out = pipeline.run(&analyze(input), None, limit);
                assert!(out.len() <= limit, "{input} {limit}");
                let words: std::collections::BTreeSet<_> = out.iter().map(|c| c.word()).collect();
                assert_eq!(words.len(), out.len(), "{input} {limit}");
            }
        }
    }
}
