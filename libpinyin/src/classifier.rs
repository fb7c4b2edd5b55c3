//! Input-mode classification.
//!
//! `InputClassifier::analyze` turns raw keystrokes into an [`InputAnalysis`]:
//! a mode chosen by an ordered rule table, a fixed per-mode confidence,
//! segments that partition the input, and alternative readings for the
//! ambiguous modes. The result depends only on the input string.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parser::{PhoneticSegmenter, PinyinSegmenter};

/// How the keystrokes are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// `b`
    SingleLetter,
    /// `bj`, `bjr`
    PureAcronym,
    /// `beijing`
    PurePinyin,
    /// `zh`, `be`
    PartialPinyin,
    /// `bjbeijing`
    AcronymPinyinMix,
    /// `nihaobj`
    PinyinAcronymMix,
    /// `woshibeijingren`
    SentenceInput,
    /// `nihaochon`
    ProgressiveInput,
}

impl InputMode {
    /// Fixed confidence for the mode.
    ///
    /// Pure pinyin drops to 0.7 when not every segment is a complete
    /// syllable.
    pub fn confidence(&self, all_complete: bool) -> f32 {
        match self {
            InputMode::SingleLetter => 1.0,
            InputMode::PurePinyin if all_complete => 0.95,
            InputMode::PurePinyin => 0.7,
            InputMode::SentenceInput => 0.9,
            InputMode::PureAcronym => 0.8,
            InputMode::AcronymPinyinMix | InputMode::PinyinAcronymMix => 0.75,
            InputMode::PartialPinyin => 0.6,
            InputMode::ProgressiveInput => 0.5,
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, InputMode::AcronymPinyinMix | InputMode::PinyinAcronymMix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    SingleLetter,
    Acronym,
    CompleteSyllable,
    PartialSyllable,
    Unknown,
}

/// A slice of the input. Offsets are character indices, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    fn new(text: &str, kind: SegmentKind, start: usize) -> Self {
        Self {
            text: text.to_string(),
            kind,
            start,
            end: start + text.chars().count(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Character composition of the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPattern {
    pub total: usize,
    /// Lowercase ASCII letters only.
    pub letters: usize,
    pub digits: usize,
    pub spaces: usize,
    pub others: usize,
    pub all_letters: bool,
}

impl CharacterPattern {
    pub fn of(input: &str) -> Self {
        let mut p = CharacterPattern::default();
        for ch in input.chars() {
            p.total += 1;
            if ch.is_ascii_lowercase() {
                p.letters += 1;
            } else if ch.is_ascii_digit() {
                p.digits += 1;
            } else if ch.is_whitespace() {
                p.spaces += 1;
            } else {
                p.others += 1;
            }
        }
        p.all_letters = p.total > 0 && p.letters == p.total;
        p
    }

    pub fn letter_ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.letters as f32 / self.total as f32
        }
    }
}

/// What the segmenter made of the whole input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllableStructure {
    /// Full cover of the input, empty when none exists.
    pub syllables: Vec<String>,
    /// More than one syllable covers the input.
    pub can_split: bool,
    /// The input is itself one valid syllable.
    pub single_syllable: bool,
    /// Syllables the input is a strict prefix of (capped).
    pub partial_matches: Vec<String>,
}

impl SyllableStructure {
    pub fn total(&self) -> usize {
        self.syllables.len()
    }

    pub fn is_multi_syllable(&self) -> bool {
        self.syllables.len() > 1
    }

    pub fn fully_covered(&self) -> bool {
        !self.syllables.is_empty()
    }
}

/// Result of classifying one input string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAnalysis {
    pub raw_input: String,
    pub mode: InputMode,
    pub confidence: f32,
    pub segments: Vec<Segment>,
    pub alternative_modes: Vec<InputMode>,
    pub character_pattern: CharacterPattern,
    pub syllable_structure: SyllableStructure,
    #[serde(skip)]
    pub processing_time: Duration,
    pub error: Option<String>,
}

impl InputAnalysis {
    /// Analysis of empty input: no segments, zero confidence.
    pub fn empty() -> Self {
        Self::failed("", None)
    }

    /// Analysis for input that could not be classified.
    pub fn error(input: &str, message: &str) -> Self {
        Self::failed(input, Some(message.to_string()))
    }

    fn failed(input: &str, error: Option<String>) -> Self {
        Self {
            raw_input: input.to_string(),
            mode: InputMode::SingleLetter,
            confidence: 0.0,
            segments: Vec::new(),
            alternative_modes: Vec::new(),
            character_pattern: CharacterPattern::default(),
            syllable_structure: SyllableStructure::default(),
            processing_time: Duration::ZERO,
            error,
        }
    }

    /// True for empty or failed analyses; such inputs produce no candidates.
    pub fn is_void(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= 0.8
    }

    pub fn is_mixed_mode(&self) -> bool {
        self.mode.is_mixed()
    }

    /// Longest segment; the first one wins ties.
    pub fn primary_segment(&self) -> Option<&Segment> {
        self.segments
            .iter()
            .fold(None, |best: Option<&Segment>, s| match best {
                Some(b) if b.len() >= s.len() => Some(b),
                _ => Some(s),
            })
    }

    pub fn syllable_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::CompleteSyllable)
    }

    pub fn acronym_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.kind == SegmentKind::Acronym)
    }

    /// Syllable texts in order.
    pub fn syllables(&self) -> Vec<String> {
        self.syllable_segments().map(|s| s.text.clone()).collect()
    }

    /// Text of the leading acronym letters, then the remaining syllables, for
    /// the acronym-first mixed mode.
    pub fn acronym_text(&self) -> String {
        self.acronym_segments().map(|s| s.text.as_str()).collect()
    }
}

/// Tunables for the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// More syllables than this make a sentence.
    pub sentence_threshold: usize,
    /// Longest unsplittable letter run still read as an acronym.
    pub acronym_max_len: usize,
    /// Longest acronym part of a mixed input.
    pub mixed_part_max_len: usize,
    /// Cap on recorded partial matches.
    pub partial_match_limit: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sentence_threshold: 4,
            acronym_max_len: 6,
            mixed_part_max_len: 3,
            partial_match_limit: 10,
        }
    }
}

/// Facts the rules are evaluated against.
struct Facts<'a> {
    chars: &'a [char],
    pattern: &'a CharacterPattern,
    structure: &'a SyllableStructure,
    mixed: Option<(InputMode, usize)>,
    progressive_head: Option<usize>,
}

type Rule = (&'static str, for<'a> fn(&Facts<'a>, &ClassifierConfig) -> bool, InputMode);

fn single_letter(f: &Facts<'_>, _: &ClassifierConfig) -> bool {
    f.chars.len() == 1 && f.pattern.all_letters
}

fn sentence(f: &Facts<'_>, c: &ClassifierConfig) -> bool {
    f.structure.can_split && f.structure.total() > c.sentence_threshold
}

fn pure_pinyin(f: &Facts<'_>, _: &ClassifierConfig) -> bool {
    f.structure.can_split || f.structure.single_syllable
}

fn partial_pinyin(f: &Facts<'_>, _: &ClassifierConfig) -> bool {
    !f.structure.partial_matches.is_empty()
}

fn short_acronym(f: &Facts<'_>, c: &ClassifierConfig) -> bool {
    f.pattern.all_letters && f.chars.len() <= c.acronym_max_len && !f.structure.can_split
}

fn acronym_then_pinyin(f: &Facts<'_>, _: &ClassifierConfig) -> bool {
    matches!(f.mixed, Some((InputMode::AcronymPinyinMix, _)))
}

fn pinyin_then_acronym(f: &Facts<'_>, _: &ClassifierConfig) -> bool {
    matches!(f.mixed, Some((InputMode::PinyinAcronymMix, _)))
}

fn progressive(f: &Facts<'_>, _: &ClassifierConfig) -> bool {
    f.progressive_head.is_some()
}

/// Rules that only need the pattern and the syllable structure.
const STRUCTURAL_RULES: usize = 5;

/// Priority-ordered rules; the first predicate that holds picks the mode.
const RULES: &[Rule] = &[
    ("single letter", single_letter, InputMode::SingleLetter),
    ("sentence", sentence, InputMode::SentenceInput),
    ("pure pinyin", pure_pinyin, InputMode::PurePinyin),
    ("partial pinyin", partial_pinyin, InputMode::PartialPinyin),
    ("short acronym", short_acronym, InputMode::PureAcronym),
    ("acronym then pinyin", acronym_then_pinyin, InputMode::AcronymPinyinMix),
    ("pinyin then acronym", pinyin_then_acronym, InputMode::PinyinAcronymMix),
    ("progressive", progressive, InputMode::ProgressiveInput),
];

/// Classifies keystrokes using a phonetic segmenter.
#[derive(Clone)]
pub struct InputClassifier {
    segmenter: Arc<dyn PhoneticSegmenter>,
    config: ClassifierConfig,
}

impl std::fmt::Debug for InputClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputClassifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for InputClassifier {
    fn default() -> Self {
        Self::new(Arc::new(PinyinSegmenter::new()), ClassifierConfig::default())
    }
}

fn slice(chars: &[char], from: usize, to: usize) -> String {
    chars[from..to].iter().collect()
}

impl InputClassifier {
    pub fn new(segmenter: Arc<dyn PhoneticSegmenter>, config: ClassifierConfig) -> Self {
        Self { segmenter, config }
    }

    pub fn segmenter(&self) -> &Arc<dyn PhoneticSegmenter> {
        &self.segmenter
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify `raw_input`. Never panics: internal failures produce an
    /// error analysis carrying the message.
    ///
    /// Surrounding whitespace is dropped first; `raw_input` of the result
    /// and every segment offset refer to the trimmed text.
    pub fn analyze(&self, raw_input: &str) -> InputAnalysis {
        let raw_input = raw_input.trim();
        if raw_input.is_empty() {
            return InputAnalysis::empty();
        }
        let started = Instant::now();
        match catch_unwind(AssertUnwindSafe(|| self.classify(raw_input))) {
            Ok(mut analysis) => {
                analysis.processing_time = started.elapsed();
                debug!(
                    input = raw_input,
                    mode = ?analysis.mode,
                    confidence = analysis.confidence,
                    segments = analysis.segments.len(),
                    "input analyzed"
                );
                analysis
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "input analysis failed".to_string());
                warn!(input = raw_input, %message, "input analysis failed");
                InputAnalysis::error(raw_input, &message)
            }
        }
    }

    fn classify(&self, input: &str) -> InputAnalysis {
        let chars: Vec<char> = input.chars().collect();
        let pattern = CharacterPattern::of(input);
        let structure = self.syllable_structure(input);

        let mut facts = Facts {
            chars: &chars,
            pattern: &pattern,
            structure: &structure,
            mixed: None,
            progressive_head: None,
        };
        // mixed and progressive facts are computed lazily
        let early = RULES
            .iter()
            .take(STRUCTURAL_RULES)
            .find(|(_, holds, _)| holds(&facts, &self.config));
        let mode = match early {
            Some((_, _, mode)) => *mode,
            None => {
                facts.mixed = self.detect_mixed(&chars);
                if facts.mixed.is_none() {
                    facts.progressive_head = self.progressive_head(&chars);
                }
                RULES
                    .iter()
                    .skip(STRUCTURAL_RULES)
                    .find(|(_, holds, _)| holds(&facts, &self.config))
                    .map(|(_, _, mode)| *mode)
                    .unwrap_or(InputMode::PureAcronym)
            }
        };

        let segments = self.segments(&chars, mode, &structure, facts.mixed, facts.progressive_head);
        let all_complete = segments
            .iter()
            .all(|s| s.kind == SegmentKind::CompleteSyllable);
        InputAnalysis {
            raw_input: input.to_string(),
            mode,
            confidence: mode.confidence(all_complete),
            alternative_modes: self.alternatives(mode, chars.len()),
            segments,
            character_pattern: pattern,
            syllable_structure: structure,
            processing_time: Duration::ZERO,
            error: None,
        }
    }

    fn syllable_structure(&self, input: &str) -> SyllableStructure {
        let syllables = self.segmenter.split(input);
        let single_syllable = self.segmenter.is_valid_syllable(input);
        let partial_matches = if single_syllable {
            Vec::new()
        } else {
            self.segmenter
                .completions(input, self.config.partial_match_limit)
        };
        SyllableStructure {
            can_split: syllables.len() > 1,
            syllables,
            single_syllable,
            partial_matches,
        }
    }

    fn is_letters(chars: &[char]) -> bool {
        !chars.is_empty() && chars.iter().all(|c| c.is_ascii_lowercase())
    }

    fn covers(&self, chars: &[char]) -> Vec<String> {
        self.segmenter.split(&chars.iter().collect::<String>())
    }

    /// First split point, scanning left to right, where an acronym part of
    /// at most `mixed_part_max_len` letters meets fully syllabic pinyin.
    /// Acronym-first splits are tried over the whole input before
    /// pinyin-first ones.
    fn detect_mixed(&self, chars: &[char]) -> Option<(InputMode, usize)> {
        let cap = self.config.mixed_part_max_len;
        let n = chars.len();

        for i in 1..n {
            let (head, tail) = chars.split_at(i);
            if head.len() <= cap && Self::is_letters(head) && !self.covers(tail).is_empty() {
                return Some((InputMode::AcronymPinyinMix, i));
            }
        }
        for i in 2..n {
            let (head, tail) = chars.split_at(i);
            if tail.len() <= cap && Self::is_letters(tail) && !self.covers(head).is_empty() {
                return Some((InputMode::PinyinAcronymMix, i));
            }
        }
        None
    }

    /// Where the unfinished syllable starts, if the input is syllables
    /// followed by the beginning of one more. The head may be empty.
    fn progressive_head(&self, chars: &[char]) -> Option<usize> {
        let n = chars.len();
        if n < 2 {
            return None;
        }
        let longest_tail = n.min(crate::syllables::MAX_SYLLABLE_LEN - 1);
        (1..=longest_tail).find_map(|len| {
            let head = n - len;
            let tail = slice(chars, head, n);
            let head_ok = head == 0 || !self.covers(&chars[..head]).is_empty();
            (head_ok && self.segmenter.is_syllable_prefix(&tail)).then_some(head)
        })
    }

    fn syllable_segments(syllables: &[String], start: usize, out: &mut Vec<Segment>) -> usize {
        let mut pos = start;
        for s in syllables {
            let seg = Segment::new(s, SegmentKind::CompleteSyllable, pos);
            pos = seg.end;
            out.push(seg);
        }
        pos
    }

    fn letter_segments(chars: &[char], start: usize, kind: SegmentKind, out: &mut Vec<Segment>) {
        for (i, ch) in chars.iter().enumerate() {
            out.push(Segment::new(&ch.to_string(), kind, start + i));
        }
    }

    fn segments(
        &self,
        chars: &[char],
        mode: InputMode,
        structure: &SyllableStructure,
        mixed: Option<(InputMode, usize)>,
        progressive_head: Option<usize>,
    ) -> Vec<Segment> {
        let whole = |kind| vec![Segment::new(&chars.iter().collect::<String>(), kind, 0)];
        let mut out = Vec::new();
        match mode {
            InputMode::SingleLetter => return whole(SegmentKind::SingleLetter),
            InputMode::PurePinyin | InputMode::SentenceInput => {
                if structure.fully_covered() {
                    Self::syllable_segments(&structure.syllables, 0, &mut out);
                } else {
                    return whole(SegmentKind::CompleteSyllable);
                }
            }
            InputMode::PureAcronym => Self::letter_segments(chars, 0, SegmentKind::Acronym, &mut out),
            InputMode::PartialPinyin => return whole(SegmentKind::PartialSyllable),
            InputMode::AcronymPinyinMix => {
                let Some((_, i)) = mixed else {
                    return whole(SegmentKind::Unknown);
                };
                Self::letter_segments(&chars[..i], 0, SegmentKind::Acronym, &mut out);
                Self::syllable_segments(&self.covers(&chars[i..]), i, &mut out);
            }
            InputMode::PinyinAcronymMix => {
                let Some((_, i)) = mixed else {
                    return whole(SegmentKind::Unknown);
                };
                Self::syllable_segments(&self.covers(&chars[..i]), 0, &mut out);
                Self::letter_segments(&chars[i..], i, SegmentKind::Acronym, &mut out);
            }
            InputMode::ProgressiveInput => {
                let Some(head) = progressive_head else {
                    return whole(SegmentKind::Unknown);
                };
                if head > 0 {
                    Self::syllable_segments(&self.covers(&chars[..head]), 0, &mut out);
                }
                out.push(Segment::new(
                    &slice(chars, head, chars.len()),
                    SegmentKind::PartialSyllable,
                    head,
                ));
            }
        }
        if out.is_empty() {
            return whole(SegmentKind::Unknown);
        }
        out
    }

    fn alternatives(&self, mode: InputMode, len: usize) -> Vec<InputMode> {
        match mode {
            InputMode::PureAcronym if len <= self.config.acronym_max_len => {
                vec![InputMode::PartialPinyin]
            }
            InputMode::PartialPinyin => vec![InputMode::PureAcronym, InputMode::ProgressiveInput],
            InputMode::ProgressiveInput => vec![InputMode::PartialPinyin, InputMode::PureAcronym],
            _ => Vec::new(),
        }
    }
}
