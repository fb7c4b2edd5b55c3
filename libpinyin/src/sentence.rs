//! Sentence assembly from sub-segment lookups.
//!
//! Used when a long input finds too few whole-string matches. Three passes
//! run in order: the full string, a few fixed segmentation templates, and a
//! greedy left-to-right pass.
use std::sync::Arc;

use suggest_core::{Candidate, DictionaryCategory, MatchKind, SourceLayer};
use tracing::debug;

use crate::layers::{dictionary_weights, LayerContext, Lookup, WORD_CATEGORIES};

/// Confidence kept per matched multi-syllable segment.
const SEGMENT_DECAY: f32 = 0.9;
/// Confidence kept per single-character fallback.
const CHAR_FALLBACK_DECAY: f32 = 0.7;
/// Frequency divisor for single-character fallbacks.
const CHAR_FALLBACK_FREQUENCY_DIVISOR: u64 = 10;
const PROGRESSIVE_CONFIDENCE: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct SentenceCombiner {
    ctx: Arc<LayerContext>,
    max_templates: usize,
    lookahead: usize,
}

/// One word of an assembled sentence.
struct Piece {
    word: String,
    frequency: u64,
}

struct Assembly {
    pieces: Vec<Piece>,
    syllables: Vec<String>,
    confidence: f32,
}

impl Assembly {
    fn new() -> Self {
        Self {
            pieces: Vec::new(),
            syllables: Vec::new(),
            confidence: 1.0,
        }
    }

    fn push(&mut self, lookup: Lookup, frequency: u64, syllables: &[String]) {
        self.pieces.push(Piece {
            word: lookup.word,
            frequency,
        });
        self.syllables.extend(syllables.iter().cloned());
    }

    fn word(&self) -> String {
        self.pieces.iter().map(|p| p.word.as_str()).collect()
    }

    fn average_frequency(&self) -> u64 {
        match self.pieces.len() {
            0 => 0,
            n => self.pieces.iter().map(|p| p.frequency).sum::<u64>() / n as u64,
        }
    }
}

/// Segment sizes to try for `n` syllables, at most `max` of them.
pub fn templates(n: usize, max: usize) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = Vec::new();
    if n < 2 {
        return out;
    }
    if n == 6 {
        out.push(vec![2, 2, 2]);
    }
    if n >= 6 {
        out.push(vec![1, 2, 2, n - 5]);
        out.push(vec![1, 1, 2, n - 4]);
    }
    if n != 6 {
        let mut pairs = vec![2; n / 2];
        if n % 2 == 1 {
            pairs.push(1);
        }
        out.push(pairs);
    }
    out.truncate(max);
    out
}

impl SentenceCombiner {
    pub fn new(ctx: Arc<LayerContext>) -> Self {
        Self {
            ctx,
            max_templates: 3,
            lookahead: 4,
        }
    }

    /// Most frequent word for the whole syllable run.
    fn best_word(&self, syllables: &[String]) -> Option<Lookup> {
        let path = syllables.concat();
        self.ctx
            .exact(&WORD_CATEGORIES, &path, 1)
            .into_iter()
            .max_by_key(|l| l.frequency)
    }

    /// Most frequent single character for one syllable.
    fn best_char(&self, syllable: &str) -> Option<Lookup> {
        let mut categories = vec![DictionaryCategory::Chars];
        categories.extend(WORD_CATEGORIES);
        self.ctx
            .exact(&categories, syllable, 8)
            .into_iter()
            .filter(|l| l.char_len() == 1)
            .max_by_key(|l| l.frequency)
    }

    fn candidate(&self, assembly: &Assembly, source: SourceLayer) -> Candidate {
        let frequency = assembly.average_frequency();
        let weights = dictionary_weights(self.ctx.frequency_score(frequency), assembly.confidence, 1.0);
        Candidate::new(assembly.word(), source, MatchKind::Combination, weights)
            .with_pinyin(assembly.syllables.join(" "))
            .with_frequency(frequency)
            .with_confidence(assembly.confidence)
    }

    fn apply_template(&self, syllables: &[String], sizes: &[usize]) -> Option<Assembly> {
        let mut assembly = Assembly::new();
        let mut pos = 0;
        for &size in sizes {
            let segment = syllables.get(pos..pos + size)?;
            pos += size;
            if size == 1 {
                let hit = self.best_char(&segment[0])?;
                let frequency = hit.frequency;
                assembly.push(hit, frequency, segment);
                continue;
            }
            if let Some(hit) = self.best_word(segment) {
                let frequency = hit.frequency;
                assembly.push(hit, frequency, segment);
                assembly.confidence *= SEGMENT_DECAY;
                continue;
            }
            for syllable in segment {
                let hit = self.best_char(syllable)?;
                let frequency = hit.frequency / CHAR_FALLBACK_FREQUENCY_DIVISOR;
                assembly.push(hit, frequency, std::slice::from_ref(syllable));
                assembly.confidence *= CHAR_FALLBACK_DECAY;
            }
        }
        (pos == syllables.len()).then_some(assembly)
    }

    /// Greedy longest match, skipping syllables nothing matches.
    fn progressive(&self, syllables: &[String]) -> Option<Assembly> {
        let mut assembly = Assembly::new();
        let mut pos = 0;
        while pos < syllables.len() {
            let longest = self.lookahead.min(syllables.len() - pos);
            let found = (1..=longest).rev().find_map(|len| {
                let segment = &syllables[pos..pos + len];
                let hit = if len == 1 {
                    self.best_char(&segment[0])
                } else {
                    self.best_word(segment)
                };
                hit.map(|h| (h, len))
            });
            match found {
                Some((hit, len)) => {
                    let frequency = hit.frequency;
                    assembly.push(hit, frequency, &syllables[pos..pos + len]);
                    pos += len;
                }
                None => pos += 1,
            }
        }
        assembly.confidence = PROGRESSIVE_CONFIDENCE;
        (!assembly.pieces.is_empty()).then_some(assembly)
    }

    /// Candidates for the syllable sequence, without duplicates.
    pub fn combine(&self, syllables: &[String], limit: usize) -> Vec<Candidate> {
        if syllables.is_empty() || limit == 0 {
            return Vec::new();
        }
        let mut out: Vec<Candidate> = Vec::new();
        let push = |c: Candidate, out: &mut Vec<Candidate>| {
            if !out.iter().any(|o| o.word() == c.word()) {
                out.push(c);
            }
        };

        if let Some(hit) = self.best_word(syllables) {
            let mut whole = Assembly::new();
            let frequency = hit.frequency;
            whole.push(hit, frequency, syllables);
            push(self.candidate(&whole, SourceLayer::Combination), &mut out);
        }
        for sizes in templates(syllables.len(), self.max_templates) {
            if let Some(assembly) = self.apply_template(syllables, &sizes) {
                push(self.candidate(&assembly, SourceLayer::Combination), &mut out);
            }
        }
        if let Some(assembly) = self.progressive(syllables) {
            push(self.candidate(&assembly, SourceLayer::Progressive), &mut out);
        }
        out.truncate(limit);
        debug!(syllables = syllables.len(), count = out.len(), "sentence combiner");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::test_support::context;

    fn syllables(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn template_table() {
        assert_eq!(templates(6, 3), vec![vec![2, 2, 2], vec![1, 2, 2, 1], vec![1, 1, 2, 2]]);
        assert_eq!(templates(8, 3), vec![vec![1, 2, 2, 3], vec![1, 1, 2, 4], vec![2, 2, 2, 2]]);
        assert_eq!(templates(5, 3), vec![vec![2, 2, 1]]);
        assert!(templates(1, 3).is_empty());
    }

    #[test]
    fn assembles_from_words_and_chars() {
        let combiner = SentenceCombiner::new(Arc::new(context()));
        let out = combiner.combine(&syllables("ni hao bei jing ren"), 5);
        let words: Vec<_> = out.iter().map(|c| c.word()).collect();
        assert!(words.contains(&"你好北京人"));
        assert!(out.iter().all(|c| c.match_kind() == MatchKind::Combination));
    }

    #[test]
    fn progressive_skips_unknown_syllables() {
        let combiner = SentenceCombiner::new(Arc::new(context()));
        let assembly = combiner.progressive(&syllables("ni hao xx bei jing")).unwrap();
        assert_eq!(assembly.word(), "你好北京");
        assert_eq!(assembly.syllables, syllables("ni hao bei jing"));
    }

    #[test]
    fn char_fallback_decays_confidence() {
        let combiner = SentenceCombiner::new(Arc::new(context()));
        // no word for "jing ren", so both syllables fall back to characters
        let assembly = combiner
            .apply_template(&syllables("bei jing ren"), &[1, 2])
            .unwrap();
        assert_eq!(assembly.word(), "北京人");
        assert!((assembly.confidence - 0.49).abs() < 1e-6);
    }
}
