// libpinyin/tests/engine_candidates.rs
//
// End-to-end candidate generation through `Engine`.
//
// Tests cover:
// - exact, acronym and mixed lookups rank the frequent word first
// - merged output is unique by word and bounded by the limit
// - sentence assembly when whole-string lookups find too little
// - fuzzy matching and its runtime switch
// - selection learning and cache invalidation
// - concurrent queries agree with sequential ones

use std::sync::Arc;
use std::thread;

use pinyin_suggest::{Engine, KeystrokeSession, PinyinConfig, SourceLayer};
use suggest_core::{DictionaryCategory, DictionaryEntry, MemoryStore, RuleKind, TrieCatalog};

fn rows() -> Vec<DictionaryEntry> {
    use DictionaryCategory::*;
    vec![
        DictionaryEntry::new("北京", "bei jing", 9000, Base),
        DictionaryEntry::new("背景", "bei jing", 500, Base),
        DictionaryEntry::new("北京人", "bei jing ren", 800, Base),
        DictionaryEntry::new("你好", "ni hao", 8000, Base),
        DictionaryEntry::new("宗教", "zong jiao", 700, Base),
        DictionaryEntry::new("不见不散", "bu jian bu san", 600, Base),
        DictionaryEntry::new("北", "bei", 3000, Chars),
        DictionaryEntry::new("京", "jing", 1000, Chars),
        DictionaryEntry::new("人", "ren", 5000, Chars),
        DictionaryEntry::new("我", "wo", 9500, Chars),
        DictionaryEntry::new("是", "shi", 9400, Chars),
        DictionaryEntry::new("宗", "zong", 400, Chars),
        DictionaryEntry::new("不", "bu", 9000, Chars),
        DictionaryEntry::new("散", "san", 300, Chars),
    ]
}

fn catalog() -> Arc<TrieCatalog> {
    let store = MemoryStore::from_entries(rows());
    let catalog = Arc::new(TrieCatalog::new(None, None));
    for category in [DictionaryCategory::Base, DictionaryCategory::Chars] {
        catalog.build_from_store(category, &store).unwrap();
    }
    catalog
}

fn engine() -> Engine {
    Engine::new(PinyinConfig::default(), catalog()).unwrap()
}

fn words(engine: &Engine, input: &str, limit: usize) -> Vec<String> {
    engine
        .generate_candidates(input, limit, None)
        .iter()
        .map(|c| c.word().to_string())
        .collect()
}

#[test]
fn acronym_ranks_by_frequency() {
    let engine = engine();
    let out = words(&engine, "bj", 5);
    assert_eq!(out[..2], ["北京", "背景"]);
    assert!(out.contains(&"北京人".to_string()));
}

#[test]
fn full_pinyin_puts_exact_match_first() {
    let engine = engine();
    let out = words(&engine, "beijing", 10);
    assert_eq!(out.first().map(String::as_str), Some("北京"));
    assert!(out.contains(&"背景".to_string()));
}

#[test]
fn mixed_input_matches_by_initials_and_reading() {
    let engine = engine();
    let out = engine.generate_candidates("bjbusan", 5, None);
    assert_eq!(out.first().map(|c| c.word()), Some("不见不散"));
    assert_eq!(out[0].pinyin(), "b j bu san");
}

#[test]
fn output_is_unique_and_bounded() {
    let engine = engine();
    for input in ["b", "bj", "bei", "beijing", "beijingren", "zhong", "woshibeijingren"] {
        for limit in [1, 3, 10] {
            let out = words(&engine, input, limit);
            assert!(out.len() <= limit, "{input} {limit}");
            let mut unique = out.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), out.len(), "{input} {limit}: {out:?}");
        }
    }
}

#[test]
fn sentence_is_assembled_from_pieces() {
    let engine = engine();
    let out = engine.generate_candidates("woshibeijingren", 5, None);
    let assembled = out
        .iter()
        .find(|c| c.word() == "我是北京人")
        .expect("assembled sentence");
    assert!(matches!(
        assembled.source_layer(),
        SourceLayer::Combination | SourceLayer::Progressive
    ));
    assert_eq!(assembled.pinyin(), "wo shi bei jing ren");
}

#[test]
fn fuzzy_rules_can_be_switched_at_runtime() {
    let engine = engine();
    let out = engine.generate_candidates("zhong", 10, None);
    let fuzzy = out.iter().find(|c| c.word() == "宗").expect("fuzzy match");
    assert_eq!(fuzzy.source_layer(), SourceLayer::FuzzyMatch);

    assert!(engine.set_fuzzy_rule(RuleKind::Initial, "z", "zh", false));
    assert!(!words(&engine, "zhong", 10).contains(&"宗".to_string()));

    engine.set_fuzzy_rule(RuleKind::Initial, "z", "zh", true);
    assert!(words(&engine, "zhong", 10).contains(&"宗".to_string()));

    engine.set_fuzzy_enabled(false);
    assert!(!engine.fuzzy_config().enabled);
    assert!(!words(&engine, "zhong", 10).contains(&"宗".to_string()));
}

#[test]
fn selection_is_learned_and_invalidates_cache() {
    let engine = engine();
    let before = engine.generate_candidates("bj", 5, None);
    let chosen = before.iter().find(|c| c.word() == "背景").unwrap().clone();
    engine.record_selection("bj", &chosen, &before, 1);
    assert_eq!(engine.history().selection_count("bj", "背景"), 1);

    engine.generate_candidates("bj", 5, None);
    assert_eq!(engine.cache_stats(), (0, 2));
    engine.generate_candidates("bj", 5, None);
    assert_eq!(engine.cache_stats(), (1, 2));
}

#[test]
fn empty_and_zero_limit_queries_are_empty() {
    let engine = engine();
    assert!(engine.generate_candidates("", 5, None).is_empty());
    assert!(engine.generate_candidates("   ", 5, None).is_empty());
    assert!(engine.generate_candidates("bj", 0, None).is_empty());
}

#[test]
fn concurrent_queries_match_sequential_results() {
    let inputs = ["b", "bj", "beijing", "bjbusan", "zhong", "nihao", "woshibeijingren"];
    let reference = engine();
    let expected: Vec<Vec<String>> = inputs.iter().map(|i| words(&reference, i, 5)).collect();

    let shared = Arc::new(engine());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = shared.clone();
            thread::spawn(move || {
                (0..inputs.len())
                    .map(|k| {
                        let i = (k + t) % inputs.len();
                        (i, words(&engine, inputs[i], 5))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        for (i, out) in handle.join().unwrap() {
            assert_eq!(out, expected[i], "{}", inputs[i]);
        }
    }
}

#[test]
fn keystroke_session_drops_superseded_queries() {
    let session = KeystrokeSession::new(Arc::new(engine()));
    let stale = session.begin();
    let current = session.begin();
    assert!(session.query_with(stale, "bj", 5, None).is_none());
    let out = session.query_with(current, "bj", 5, None).unwrap();
    assert_eq!(out[0].word(), "北京");
}
