// libpinyin/tests/classifier_scenarios.rs
//
// Input classification scenarios through the public API.
//
// Tests cover:
// - one representative input per mode, with segments and confidence
// - first-match mixed splits
// - determinism and the never-panics contract

use pinyin_suggest::{InputClassifier, InputMode, SegmentKind};

fn classifier() -> InputClassifier {
    InputClassifier::default()
}

fn texts(input: &str) -> Vec<String> {
    classifier()
        .analyze(input)
        .segments
        .into_iter()
        .map(|s| s.text)
        .collect()
}

#[test]
fn single_letter() {
    let a = classifier().analyze("b");
    assert_eq!(a.mode, InputMode::SingleLetter);
    assert_eq!(a.confidence, 1.0);
    assert_eq!(a.segments.len(), 1);
    assert_eq!(a.segments[0].kind, SegmentKind::SingleLetter);
    assert_eq!((a.segments[0].start, a.segments[0].end), (0, 1));
}

#[test]
fn pure_pinyin_splits_into_syllables() {
    let a = classifier().analyze("beijing");
    assert_eq!(a.mode, InputMode::PurePinyin);
    assert_eq!(a.confidence, 0.95);
    assert_eq!(texts("beijing"), vec!["bei", "jing"]);
    assert!(a
        .segments
        .iter()
        .all(|s| s.kind == SegmentKind::CompleteSyllable));
    assert_eq!(a.segments[1].start, 3);
    assert_eq!(a.syllables(), vec!["bei", "jing"]);
}

#[test]
fn single_valid_syllable_is_pure_pinyin() {
    let a = classifier().analyze("zhuang");
    assert_eq!(a.mode, InputMode::PurePinyin);
    assert_eq!(texts("zhuang"), vec!["zhuang"]);
}

#[test]
fn unsplittable_short_input_is_acronym() {
    let a = classifier().analyze("bj");
    assert_eq!(a.mode, InputMode::PureAcronym);
    assert_eq!(a.confidence, 0.8);
    assert_eq!(texts("bj"), vec!["b", "j"]);
    assert!(a.segments.iter().all(|s| s.kind == SegmentKind::Acronym));
    assert_eq!(a.alternative_modes, vec![InputMode::PartialPinyin]);
}

#[test]
fn syllable_prefix_is_partial_pinyin() {
    let a = classifier().analyze("zh");
    assert_eq!(a.mode, InputMode::PartialPinyin);
    assert_eq!(a.confidence, 0.6);
    assert_eq!(a.segments[0].kind, SegmentKind::PartialSyllable);
    assert!(a
        .syllable_structure
        .partial_matches
        .iter()
        .all(|s| s.starts_with("zh") && s.len() > 2));
    assert_eq!(
        a.alternative_modes,
        vec![InputMode::PureAcronym, InputMode::ProgressiveInput]
    );
}

#[test]
fn long_syllable_run_is_a_sentence() {
    let a = classifier().analyze("woshibeijingren");
    assert_eq!(a.mode, InputMode::SentenceInput);
    assert_eq!(a.confidence, 0.9);
    assert_eq!(texts("woshibeijingren"), vec!["wo", "shi", "bei", "jing", "ren"]);

    // four syllables stay pure pinyin
    assert_eq!(classifier().analyze("woshibeijing").mode, InputMode::PurePinyin);
}

#[test]
fn acronym_then_pinyin() {
    let a = classifier().analyze("bjbeijing");
    assert_eq!(a.mode, InputMode::AcronymPinyinMix);
    assert_eq!(a.confidence, 0.75);
    assert!(a.is_mixed_mode());
    assert_eq!(texts("bjbeijing"), vec!["b", "j", "bei", "jing"]);
    assert_eq!(a.acronym_text(), "bj");
}

#[test]
fn pinyin_then_acronym_takes_first_split() {
    let a = classifier().analyze("nihaobj");
    assert_eq!(a.mode, InputMode::PinyinAcronymMix);
    // the first valid split point wins, even where a later one reads better
    assert_eq!(texts("nihaobj"), vec!["ni", "ha", "o", "b", "j"]);
}

#[test]
fn unfinished_last_syllable_is_progressive() {
    let a = classifier().analyze("nihaochon");
    assert_eq!(a.mode, InputMode::ProgressiveInput);
    assert_eq!(a.confidence, 0.5);
    assert_eq!(texts("nihaochon"), vec!["ni", "hao", "chon"]);
    assert_eq!(a.segments[2].kind, SegmentKind::PartialSyllable);
}

#[test]
fn digits_fall_back_to_acronym() {
    let a = classifier().analyze("b2b2b2b2");
    assert_eq!(a.mode, InputMode::PureAcronym);
    assert!(!a.character_pattern.all_letters);
    assert!(a.error.is_none());
}

#[test]
fn classification_is_deterministic() {
    let inputs = ["b", "bj", "beijing", "zh", "bjbeijing", "nihaochon", "woshibeijingren", "x1y"];
    for input in inputs {
        let first = classifier().analyze(input);
        for _ in 0..5 {
            let again = classifier().analyze(input);
            assert_eq!(again.mode, first.mode, "{input}");
            assert_eq!(again.segments, first.segments, "{input}");
            assert_eq!(again.confidence, first.confidence, "{input}");
        }
    }
}

#[test]
fn segments_partition_the_input() {
    let inputs = [
        "bj",
        "beijing",
        "bjbeijing",
        "nihaobj",
        "nihaochon",
        "woshibeijingren",
        " ni",
        "ni ",
        "  bj\t",
        "b2 c",
    ];
    for input in inputs {
        let a = classifier().analyze(input);
        let joined: String = a.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, a.raw_input, "{input:?}");
        let mut pos = 0;
        for s in &a.segments {
            assert_eq!(s.start, pos, "{input:?}");
            pos = s.end;
        }
        assert_eq!(pos, a.raw_input.chars().count(), "{input:?}");
    }
}

#[test]
fn surrounding_whitespace_is_dropped() {
    for input in [" ni", "ni ", "\tni\n"] {
        let a = classifier().analyze(input);
        assert_eq!(a.raw_input, "ni");
        assert_eq!(a.mode, InputMode::PurePinyin);
        assert_eq!(texts(input), vec!["ni"]);
        assert_eq!((a.segments[0].start, a.segments[0].end), (0, 2));
    }
    assert!(classifier().analyze("   ").is_void());
}

#[test]
fn very_long_input_is_classified() {
    let a = classifier().analyze(&"a".repeat(10_000));
    assert_eq!(a.mode, InputMode::SentenceInput);
    assert_eq!(a.segments.len(), 10_000);
    assert!(a.error.is_none());

    let a = classifier().analyze(&"nihao".repeat(2_000));
    assert_eq!(a.mode, InputMode::SentenceInput);
    assert_eq!(a.segments.last().map(|s| s.end), Some(10_000));
}
