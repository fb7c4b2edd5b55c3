//! In-memory record of what the user picked, feeding the suggestion and
//! context-prediction layers.
//!
//! Selections are keyed by the normalized input they were typed for. Each
//! selection also records which word was committed just before it, so later
//! queries can rank likely follow-ups. A logical clock (one tick per
//! selection) drives the recency signal.
use std::path::Path;
use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::candidate::Candidate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Usage {
    count: u64,
    skips: u64,
    last_used: u64,
    pinyin: String,
}

#[derive(Debug, Default)]
struct HistoryInner {
    /// input -> word -> usage
    selections: AHashMap<String, AHashMap<String, Usage>>,
    /// previous word -> next word -> count
    follow_ups: AHashMap<String, AHashMap<String, u64>>,
    /// word -> (input it was last typed with, pinyin)
    word_keys: AHashMap<String, (String, String)>,
    last_committed: Option<String>,
    clock: u64,
}

/// A past selection matching a query.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryHit {
    pub input: String,
    pub word: String,
    pub pinyin: String,
    pub count: u64,
    /// Normalized selection preference in `[0, 1]`.
    pub preference: f32,
    /// Recency in `[0, 1]`, 1 for the latest selection.
    pub recency: f32,
}

/// A word that followed the given context before.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub word: String,
    /// Input the word was last typed with.
    pub input: String,
    pub pinyin: String,
    pub count: u64,
    /// Share of all follow-ups recorded for the context, in `[0, 1]`.
    pub relevance: f32,
}

/// Serialized form of a [`UserHistory`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub clock: u64,
    pub selections: Vec<SelectionRecord>,
    pub follow_ups: Vec<FollowUpRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub input: String,
    pub word: String,
    pub pinyin: String,
    pub count: u64,
    pub skips: u64,
    pub last_used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpRecord {
    pub previous: String,
    pub word: String,
    pub count: u64,
}

/// Thread-safe selection history. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct UserHistory {
    inner: Arc<RwLock<HistoryInner>>,
}

fn preference(usage: &Usage) -> f32 {
    usage.count as f32 / (usage.count + usage.skips + 2) as f32
}

fn recency(clock: u64, last_used: u64) -> f32 {
    let age = clock.saturating_sub(last_used) as f32;
    1.0 / (1.0 + age / 10.0)
}

impl UserHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `chosen` was picked at `position` for `input`.
    ///
    /// Alternatives ranked above the chosen one count as skipped for that
    /// input. The chosen word becomes the context for the next selection.
    pub fn record_selection(
        &self,
        input: &str,
        chosen: &Candidate,
        alternatives: &[Candidate],
        position: usize,
    ) {
        let input = input.trim();
        let word = chosen.word();
        if input.is_empty() || word.is_empty() {
            return;
        }
        let Ok(mut inner) = self.inner.write() else {
            error!("history lock poisoned, selection dropped");
            return;
        };

        inner.clock += 1;
        let clock = inner.clock;
        let per_input = inner.selections.entry(input.to_string()).or_default();
        let usage = per_input.entry(word.to_string()).or_default();
        usage.count = usage.count.saturating_add(1);
        usage.last_used = clock;
        if !chosen.pinyin().is_empty() {
            usage.pinyin = chosen.pinyin().to_string();
        }
        let pinyin = usage.pinyin.clone();

        for skipped in alternatives.iter().take(position) {
            if skipped.word() == word {
                continue;
            }
            per_input
                .entry(skipped.word().to_string())
                .or_default()
                .skips += 1;
        }

        if let Some(previous) = inner.last_committed.take() {
            let counts = inner.follow_ups.entry(previous).or_default();
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
        inner
            .word_keys
            .insert(word.to_string(), (input.to_string(), pinyin));
        inner.last_committed = Some(word.to_string());
        debug!(input, word, position, "selection recorded");
    }

    /// Forget the committed-word context, e.g. when the text field changes.
    pub fn reset_context(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.last_committed = None;
        }
    }

    /// Word committed most recently, if any.
    pub fn last_committed(&self) -> Option<String> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.last_committed.clone())
    }

    /// Longest suffix of `context` that is a known word, with its pinyin.
    pub fn trailing_word(&self, context: &str) -> Option<(String, String)> {
        let inner = self.inner.read().ok()?;
        let chars: Vec<char> = context.trim().chars().collect();
        (0..chars.len()).find_map(|start| {
            let suffix: String = chars[start..].iter().collect();
            let (_, pinyin) = inner.word_keys.get(&suffix)?;
            Some((suffix, pinyin.clone()))
        })
    }

    pub fn selection_count(&self, input: &str, word: &str) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|inner| {
                inner
                    .selections
                    .get(input)
                    .and_then(|words| words.get(word))
                    .map(|u| u.count)
            })
            .unwrap_or(0)
    }

    /// Past selections for inputs equal to or starting with `prefix`,
    /// strongest preference first.
    pub fn suggestions(&self, prefix: &str, limit: usize) -> Vec<HistoryHit> {
        let Ok(guard) = self.inner.read() else {
            return Vec::new();
        };
        let inner: &HistoryInner = &guard;
        let mut hits: Vec<HistoryHit> = inner
            .selections
            .iter()
            .filter(|(input, _)| !prefix.is_empty() && input.starts_with(prefix))
            .flat_map(|(input, words)| {
                words
                    .iter()
                    .filter(|(_, usage)| usage.count > 0)
                    .map(move |(word, usage)| (input, word, usage))
            })
            .map(|(input, word, usage)| HistoryHit {
                input: input.clone(),
                word: word.clone(),
                pinyin: usage.pinyin.clone(),
                count: usage.count,
                preference: preference(usage),
                recency: recency(inner.clock, usage.last_used),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.preference
                .partial_cmp(&a.preference)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.recency.partial_cmp(&a.recency).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.word.cmp(&b.word))
        });
        // A word picked for several inputs is reported once.
        let mut seen = ahash::AHashSet::new();
        hits.retain(|h| seen.insert(h.word.clone()));
        hits.truncate(limit);
        hits
    }

    /// Words that followed `context` before.
    ///
    /// The longest suffix of `context` with recorded follow-ups is used, so a
    /// hint of "我们去北京" still finds what followed "北京".
    pub fn follow_ups(&self, context: &str, limit: usize) -> Vec<FollowUp> {
        let Ok(guard) = self.inner.read() else {
            return Vec::new();
        };
        let inner: &HistoryInner = &guard;
        let context = context.trim();
        let chars: Vec<char> = context.chars().collect();

        let followers = (0..chars.len()).find_map(|start| {
            let suffix: String = chars[start..].iter().collect();
            inner.follow_ups.get(&suffix)
        });
        let Some(followers) = followers else {
            return Vec::new();
        };

        let total: u64 = followers.values().sum();
        let mut out: Vec<FollowUp> = followers
            .iter()
            .map(|(word, count)| {
                let (input, pinyin) = inner.word_keys.get(word).cloned().unwrap_or_default();
                FollowUp {
                    word: word.clone(),
                    input,
                    pinyin,
                    count: *count,
                    relevance: if total == 0 { 0.0 } else { *count as f32 / total as f32 },
                }
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        out.truncate(limit);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .map(|inner| inner.selections.is_empty())
            .unwrap_or(true)
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = HistoryInner::default();
        }
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let Ok(inner) = self.inner.read() else {
            return HistorySnapshot::default();
        };
        let mut selections: Vec<SelectionRecord> = inner
            .selections
            .iter()
            .flat_map(|(input, words)| {
                words.iter().map(move |(word, usage)| SelectionRecord {
                    input: input.clone(),
                    word: word.clone(),
                    pinyin: usage.pinyin.clone(),
                    count: usage.count,
                    skips: usage.skips,
                    last_used: usage.last_used,
                })
            })
            .collect();
        selections.sort_by(|a, b| (&a.input, &a.word).cmp(&(&b.input, &b.word)));

        let mut follow_ups: Vec<FollowUpRecord> = inner
            .follow_ups
            .iter()
            .flat_map(|(previous, words)| {
                words.iter().map(move |(word, count)| FollowUpRecord {
                    previous: previous.clone(),
                    word: word.clone(),
                    count: *count,
                })
            })
            .collect();
        follow_ups.sort_by(|a, b| (&a.previous, &a.word).cmp(&(&b.previous, &b.word)));

        HistorySnapshot {
            clock: inner.clock,
            selections,
            follow_ups,
        }
    }

    pub fn from_snapshot(snapshot: HistorySnapshot) -> Self {
        let mut inner = HistoryInner {
            clock: snapshot.clock,
            ..HistoryInner::default()
        };
        let mut newest: AHashMap<String, u64> = AHashMap::new();
        for rec in snapshot.selections {
            let seen = newest.get(&rec.word).copied();
            if rec.count > 0 && seen.map_or(true, |t| rec.last_used >= t) {
                newest.insert(rec.word.clone(), rec.last_used);
                inner
                    .word_keys
                    .insert(rec.word.clone(), (rec.input.clone(), rec.pinyin.clone()));
            }
            inner.selections.entry(rec.input).or_default().insert(
                rec.word,
                Usage {
                    count: rec.count,
                    skips: rec.skips,
                    last_used: rec.last_used,
                    pinyin: rec.pinyin,
                },
            );
        }
        for rec in snapshot.follow_ups {
            inner
                .follow_ups
                .entry(rec.previous)
                .or_default()
                .insert(rec.word, rec.count);
        }
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let snapshot: HistorySnapshot = serde_json::from_str(&text)
            .with_context(|| format!("parsing history {}", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }
}
