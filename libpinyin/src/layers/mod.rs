//! Candidate generation layers.
//!
//! Every layer implements [`GenerationLayer`]: given a classified input it
//! returns candidates and nothing else. Layers read the shared
//! [`LayerContext`] but never mutate it, and report internal failures as an
//! empty result.
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use suggest_core::{
    Candidate, DictionaryCategory, PhoneticFuzzyRules, SourceLayer, TrieCatalog, TrieHit,
    UserHistory, WeightComponents, WordItem,
};
use tracing::error;

use crate::classifier::{InputAnalysis, InputMode, SegmentKind};
use crate::parser::PhoneticSegmenter;

pub mod context;
pub mod exact;
pub mod fuzzy;
pub mod prefix;
pub mod suggestion;

pub use context::ContextPredictionLayer;
pub use exact::ExactMatchLayer;
pub use fuzzy::FuzzyMatchLayer;
pub use prefix::PrefixMatchLayer;
pub use suggestion::SmartSuggestionLayer;

/// Categories searched for words and phrases, in priority order.
pub const WORD_CATEGORIES: [DictionaryCategory; 6] = [
    DictionaryCategory::Base,
    DictionaryCategory::Place,
    DictionaryCategory::People,
    DictionaryCategory::Poetry,
    DictionaryCategory::Corrections,
    DictionaryCategory::Compatible,
];

/// One query as seen by the layers.
#[derive(Debug, Clone, Copy)]
pub struct LayerInput<'a> {
    pub analysis: &'a InputAnalysis,
    /// Text committed just before the cursor, if the caller supplied it.
    pub context: Option<&'a str>,
}

impl<'a> LayerInput<'a> {
    pub fn new(analysis: &'a InputAnalysis) -> Self {
        Self {
            analysis,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Option<&'a str>) -> Self {
        self.context = context.filter(|c| !c.trim().is_empty());
        self
    }

    /// The normalized keystrokes.
    pub fn text(&self) -> &str {
        &self.analysis.raw_input
    }

    pub fn mode(&self) -> InputMode {
        self.analysis.mode
    }
}

/// A candidate generator.
pub trait GenerationLayer: Send + Sync {
    fn source(&self) -> SourceLayer;

    /// Produce up to `limit` candidates. Returns an empty list when nothing
    /// matches or the layer cannot run.
    fn generate(&self, input: &LayerInput<'_>, limit: usize) -> Vec<Candidate>;
}

/// A dictionary hit before it becomes a candidate.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub word: String,
    pub frequency: u64,
    pub path: String,
    pub category: DictionaryCategory,
}

impl Lookup {
    fn from_item(item: WordItem, path: &str, category: DictionaryCategory) -> Self {
        Self {
            word: item.word,
            frequency: item.frequency,
            path: path.to_string(),
            category,
        }
    }

    fn from_hit(hit: TrieHit, category: DictionaryCategory) -> Self {
        Self {
            word: hit.word,
            frequency: hit.frequency,
            path: hit.path,
            category,
        }
    }

    pub fn char_len(&self) -> usize {
        self.word.chars().count()
    }

    pub fn is_initials(&self) -> bool {
        self.path.starts_with(suggest_core::trie::INITIALS_MARKER)
    }
}

/// Read-only resources shared by all layers of one engine.
pub struct LayerContext {
    pub catalog: Arc<TrieCatalog>,
    pub segmenter: Arc<dyn PhoneticSegmenter>,
    pub fuzzy: RwLock<PhoneticFuzzyRules>,
    pub history: UserHistory,
    pub frequency_scale: f64,
    /// Cap on fuzzy variant sequences looked up per query.
    pub fuzzy_variant_limit: usize,
}

impl std::fmt::Debug for LayerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerContext")
            .field("catalog", &self.catalog)
            .field("frequency_scale", &self.frequency_scale)
            .finish_non_exhaustive()
    }
}

impl LayerContext {
    pub fn new(
        catalog: Arc<TrieCatalog>,
        segmenter: Arc<dyn PhoneticSegmenter>,
        fuzzy: PhoneticFuzzyRules,
        history: UserHistory,
    ) -> Self {
        Self {
            catalog,
            segmenter,
            fuzzy: RwLock::new(fuzzy),
            history,
            frequency_scale: 100_000.0,
            fuzzy_variant_limit: 16,
        }
    }

    pub fn frequency_score(&self, frequency: u64) -> f32 {
        WeightComponents::frequency_score(frequency, self.frequency_scale)
    }

    /// Terminal words at `path` in every loaded category of `categories`.
    /// Unloaded categories are skipped silently.
    pub fn exact(&self, categories: &[DictionaryCategory], path: &str, limit: usize) -> Vec<Lookup> {
        let mut out = Vec::new();
        for &category in categories {
            if let Some(dict) = self.catalog.get(category) {
                out.extend(
                    dict.search_exact(path, limit)
                        .into_iter()
                        .map(|item| Lookup::from_item(item, path, category)),
                );
            }
        }
        out
    }

    /// Prefix hits in every loaded category of `categories`.
    pub fn prefix(&self, categories: &[DictionaryCategory], prefix: &str, limit: usize) -> Vec<Lookup> {
        let mut out = Vec::new();
        for &category in categories {
            if let Some(dict) = self.catalog.get(category) {
                out.extend(
                    dict.search_hits_by_prefix(prefix, limit)
                        .into_iter()
                        .map(|hit| Lookup::from_hit(hit, category)),
                );
            }
        }
        out
    }

    /// Space-separated syllables for a stored pinyin path. Initials paths
    /// and paths with no full split give an empty string.
    pub fn pinyin_for_path(&self, path: &str) -> String {
        if path.starts_with(suggest_core::trie::INITIALS_MARKER) {
            return String::new();
        }
        self.segmenter.split(path).join(" ")
    }

    /// Turn a lookup into a candidate carrying its pinyin or initials.
    pub fn candidate(
        &self,
        lookup: &Lookup,
        source: SourceLayer,
        kind: suggest_core::MatchKind,
        weights: WeightComponents,
        confidence: f32,
    ) -> Candidate {
        let candidate = Candidate::new(lookup.word.clone(), source, kind, weights)
            .with_frequency(lookup.frequency)
            .with_confidence(confidence)
            .with_dictionary(lookup.category);
        if lookup.is_initials() {
            let initials: String = lookup.path.chars().skip(1).collect();
            candidate.with_initials(initials)
        } else {
            candidate.with_pinyin(self.pinyin_for_path(&lookup.path))
        }
    }

    /// Run `f` with the fuzzy rules read-locked.
    pub fn with_fuzzy<T>(&self, f: impl FnOnce(&PhoneticFuzzyRules) -> T) -> Option<T> {
        match self.fuzzy.read() {
            Ok(rules) => Some(f(&rules)),
            Err(_) => {
                error!("fuzzy rule lock poisoned");
                None
            }
        }
    }

    /// Single characters readable as `syllable`.
    fn chars_for(&self, syllable: &str) -> BTreeSet<char> {
        let mut categories = vec![DictionaryCategory::Chars];
        categories.extend(WORD_CATEGORIES);
        self.exact(&categories, syllable, usize::MAX)
            .into_iter()
            .filter(|l| l.char_len() == 1)
            .filter_map(|l| l.word.chars().next())
            .collect()
    }
}

/// Default weights for a dictionary hit: everything the layer does not know
/// about the user is neutral.
pub(crate) fn dictionary_weights(base: f32, accuracy: f32, efficiency: f32) -> WeightComponents {
    WeightComponents {
        base_frequency: base,
        match_accuracy: accuracy,
        input_efficiency: efficiency,
        temporal_factor: 0.5,
        ..WeightComponents::default()
    }
}

/// The two halves of a mixed acronym/pinyin input.
///
/// `bjbusan` reads as acronym `bj` + syllables `bu san`, so 不见不散
/// (`bu jian bu san`) matches: its initials are `bjbs` and its last two
/// characters read `bu` and `san`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedParts {
    pub acronym: String,
    pub syllables: Vec<String>,
    pub acronym_first: bool,
}

impl MixedParts {
    pub fn from_analysis(analysis: &InputAnalysis) -> Option<Self> {
        let acronym_first = match analysis.mode {
            InputMode::AcronymPinyinMix => true,
            InputMode::PinyinAcronymMix => false,
            _ => return None,
        };
        let acronym = analysis.acronym_text();
        let syllables = analysis.syllables();
        if acronym.is_empty() || syllables.is_empty() {
            return None;
        }
        Some(Self {
            acronym,
            syllables,
            acronym_first,
        })
    }

    /// Same acronym with different syllables, for fuzzy variants.
    pub fn with_syllables(&self, syllables: Vec<String>) -> Self {
        Self {
            syllables,
            ..self.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.acronym.chars().count() + self.syllables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initials trie path covering both halves.
    pub fn initials_path(&self) -> String {
        let syllable_initials: String = self
            .syllables
            .iter()
            .filter_map(|s| s.chars().next())
            .collect();
        let initials = if self.acronym_first {
            format!("{}{}", self.acronym, syllable_initials)
        } else {
            format!("{}{}", syllable_initials, self.acronym)
        };
        format!("{}{}", suggest_core::trie::INITIALS_MARKER, initials)
    }

    /// Char offset of the spelled-out syllables within a matching word.
    fn pinyin_offset(&self) -> usize {
        if self.acronym_first {
            self.acronym.chars().count()
        } else {
            0
        }
    }

    /// Initials-keyed words whose characters under the spelled-out
    /// syllables read as those syllables. With `prefix`, longer words that
    /// start this way qualify too.
    pub fn lookup(&self, ctx: &LayerContext, limit: usize, prefix: bool) -> Vec<Lookup> {
        let path = self.initials_path();
        let hits = if prefix {
            ctx.prefix(&WORD_CATEGORIES, &path, limit)
        } else {
            ctx.exact(&WORD_CATEGORIES, &path, limit)
        };
        if hits.is_empty() {
            return hits;
        }
        let readable: Vec<BTreeSet<char>> = self.syllables.iter().map(|s| ctx.chars_for(s)).collect();
        let offset = self.pinyin_offset();
        let total = self.len();
        hits.into_iter()
            .filter(|hit| {
                let chars: Vec<char> = hit.word.chars().collect();
                if chars.len() < total || (!prefix && chars.len() != total) {
                    return false;
                }
                readable
                    .iter()
                    .enumerate()
                    .all(|(i, set)| set.contains(&chars[offset + i]))
            })
            .collect()
    }

    /// Pinyin for a matched word: known syllables spelled out, acronym
    /// letters kept as typed.
    pub fn display_pinyin(&self) -> String {
        let acronym = self.acronym.chars().map(|c| c.to_string());
        let parts: Vec<String> = if self.acronym_first {
            acronym.chain(self.syllables.iter().cloned()).collect()
        } else {
            self.syllables.iter().cloned().chain(acronym).collect()
        };
        parts.join(" ")
    }
}

/// Syllables of the complete-syllable segments, or of the whole input when
/// the analysis carries none.
pub(crate) fn analysis_syllables(analysis: &InputAnalysis) -> Vec<String> {
    let syllables = analysis.syllables();
    if !syllables.is_empty() {
        return syllables;
    }
    analysis
        .segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Unknown)
        .map(|s| s.text.clone())
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::classifier::InputClassifier;
    use crate::parser::PinyinSegmenter;
    use suggest_core::{DictionaryEntry, MemoryStore};

    pub fn rows() -> Vec<DictionaryEntry> {
        use DictionaryCategory::*;
        vec![
            DictionaryEntry::new("北京", "bei jing", 9000, Base),
            DictionaryEntry::new("背景", "bei jing", 500, Base),
            DictionaryEntry::new("北京人", "bei jing ren", 800, Base),
            DictionaryEntry::new("我是北京人", "wo shi bei jing ren", 300, Base),
            DictionaryEntry::new("中国", "zhong guo", 12000, Base),
            DictionaryEntry::new("宗教", "zong jiao", 700, Base),
            DictionaryEntry::new("你好", "ni hao", 8000, Base),
            DictionaryEntry::new("北", "bei", 3000, Chars),
            DictionaryEntry::new("被", "bei", 2500, Chars),
            DictionaryEntry::new("不", "bu", 9000, Chars),
            DictionaryEntry::new("京", "jing", 1000, Chars),
            DictionaryEntry::new("景", "jing", 900, Chars),
            DictionaryEntry::new("人", "ren", 5000, Chars),
            DictionaryEntry::new("中", "zhong", 6000, Chars),
            DictionaryEntry::new("宗", "zong", 400, Chars),
        ]
    }

    pub fn context() -> LayerContext {
        let store = MemoryStore::from_entries(rows());
        let catalog = Arc::new(TrieCatalog::new(None, None));
        for category in [DictionaryCategory::Base, DictionaryCategory::Chars] {
            catalog
                .build_from_store(category, &store)
                .expect("test rows build");
        }
        LayerContext::new(
            catalog,
            Arc::new(PinyinSegmenter::new()),
            PhoneticFuzzyRules::default(),
            UserHistory::new(),
        )
    }

    pub fn analyze(input: &str) -> InputAnalysis {
        InputClassifier::default().analyze(input)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn mixed_parts_match_by_initials_and_readings() {
        let ctx = context();
        let analysis = analyze("bjbeijing");
        assert_eq!(analysis.mode, InputMode::AcronymPinyinMix);

        let parts = MixedParts {
            acronym: "b".into(),
            syllables: vec!["jing".into()],
            acronym_first: true,
        };
        assert_eq!(parts.initials_path(), "@bj");
        let words: Vec<_> = parts.lookup(&ctx, 10, false).into_iter().map(|l| l.word).collect();
        assert!(words.contains(&"北京".to_string()));
        assert!(words.contains(&"背景".to_string()));
        assert_eq!(parts.display_pinyin(), "b jing");
    }

    #[test]
    fn candidate_carries_pinyin_from_path() {
        let ctx = context();
        let hits = ctx.exact(&WORD_CATEGORIES, "beijing", 5);
        assert_eq!(hits.len(), 2);
        let c = ctx.candidate(
            &hits[0],
            SourceLayer::ExactMatch,
            suggest_core::MatchKind::Exact,
            dictionary_weights(0.1, 1.0, 1.0),
            1.0,
        );
        assert_eq!(c.pinyin(), "bei jing");
        assert_eq!(c.initials(), "bj");
        assert_eq!(c.dictionary(), Some(DictionaryCategory::Base));
    }
}
