//! Raw dictionary rows and the read-only store interface the catalog
//! builds tries from.
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use ahash::AHashMap;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::trie::{CHARS_NODE_CAPACITY, DEFAULT_NODE_CAPACITY};

/// The fixed set of dictionary categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryCategory {
    /// Single characters.
    Chars,
    /// Base vocabulary.
    Base,
    Correlation,
    Associational,
    Place,
    People,
    Poetry,
    Corrections,
    /// Legacy compatibility words.
    Compatible,
}

impl DictionaryCategory {
    pub const ALL: [DictionaryCategory; 9] = [
        DictionaryCategory::Chars,
        DictionaryCategory::Base,
        DictionaryCategory::Correlation,
        DictionaryCategory::Associational,
        DictionaryCategory::Place,
        DictionaryCategory::People,
        DictionaryCategory::Poetry,
        DictionaryCategory::Corrections,
        DictionaryCategory::Compatible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryCategory::Chars => "chars",
            DictionaryCategory::Base => "base",
            DictionaryCategory::Correlation => "correlation",
            DictionaryCategory::Associational => "associational",
            DictionaryCategory::Place => "place",
            DictionaryCategory::People => "people",
            DictionaryCategory::Poetry => "poetry",
            DictionaryCategory::Corrections => "corrections",
            DictionaryCategory::Compatible => "compatible",
        }
    }

    /// File name of the persisted blob, e.g. `base_trie.dat`.
    pub fn blob_file_name(&self) -> String {
        format!("{}_trie.dat", self.as_str())
    }

    /// Word-list capacity used when no override is configured.
    pub fn default_capacity(&self) -> usize {
        match self {
            DictionaryCategory::Chars => CHARS_NODE_CAPACITY,
            _ => DEFAULT_NODE_CAPACITY,
        }
    }
}

impl fmt::Display for DictionaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DictionaryCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match DictionaryCategory::ALL.iter().find(|c| c.as_str() == wanted) {
            Some(category) => Ok(*category),
            None => bail!("unknown dictionary category `{s}`"),
        }
    }
}

/// One raw dictionary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub word: String,
    /// Syllables joined by spaces, e.g. `"bei jing"`.
    pub pinyin: String,
    pub frequency: u64,
    pub category: DictionaryCategory,
}

impl DictionaryEntry {
    pub fn new(word: &str, pinyin: &str, frequency: u64, category: DictionaryCategory) -> Self {
        Self {
            word: word.to_string(),
            pinyin: pinyin.to_string(),
            frequency,
            category,
        }
    }

    /// Parse a `word<TAB>pinyin<TAB>frequency<TAB>category` line.
    pub fn parse_tsv_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 4 {
            return None;
        }
        let word = parts[0].trim();
        let pinyin = parts[1].trim();
        if word.is_empty() || pinyin.is_empty() {
            return None;
        }
        let frequency = parts[2].trim().parse::<u64>().ok()?;
        let category = parts[3].parse::<DictionaryCategory>().ok()?;
        Some(Self::new(word, pinyin, frequency, category))
    }
}

/// Read-only source of dictionary rows.
pub trait DictionaryStore: Send + Sync {
    fn entries_by_category(&self, category: DictionaryCategory) -> Vec<DictionaryEntry>;

    fn entry_count(&self, category: DictionaryCategory) -> usize;
}

/// Store holding every row in memory, grouped by category.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: AHashMap<DictionaryCategory, Vec<DictionaryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I: IntoIterator<Item = DictionaryEntry>>(entries: I) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.push(entry);
        }
        store
    }

    pub fn push(&mut self, entry: DictionaryEntry) {
        self.rows.entry(entry.category).or_default().push(entry);
    }

    /// Load rows from a tab-separated file. Blank lines and lines starting
    /// with `#` are skipped; unparseable rows are logged and skipped.
    pub fn load_tsv<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening dictionary rows {}", path.display()))?;
        let mut store = Self::new();
        let mut skipped = 0usize;
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("reading {}", path.display()))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match DictionaryEntry::parse_tsv_line(&line) {
                Some(entry) => store.push(entry),
                None => {
                    skipped += 1;
                    warn!(line = lineno + 1, file = %path.display(), "skipping malformed dictionary row");
                }
            }
        }
        debug!(rows = store.len(), skipped, "loaded dictionary rows");
        Ok(store)
    }

    /// Total rows across all categories.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DictionaryStore for MemoryStore {
    fn entries_by_category(&self, category: DictionaryCategory) -> Vec<DictionaryEntry> {
        self.rows.get(&category).cloned().unwrap_or_default()
    }

    fn entry_count(&self, category: DictionaryCategory) -> usize {
        self.rows.get(&category).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip() {
        for category in DictionaryCategory::ALL {
            assert_eq!(category.as_str().parse::<DictionaryCategory>().unwrap(), category);
        }
        assert!("klingon".parse::<DictionaryCategory>().is_err());
        assert_eq!(DictionaryCategory::Base.blob_file_name(), "base_trie.dat");
    }

    #[test]
    fn parse_row() {
        let entry = DictionaryEntry::parse_tsv_line("北京\tbei jing\t9000\tplace").unwrap();
        assert_eq!(entry.word, "北京");
        assert_eq!(entry.pinyin, "bei jing");
        assert_eq!(entry.frequency, 9000);
        assert_eq!(entry.category, DictionaryCategory::Place);

        assert!(DictionaryEntry::parse_tsv_line("北京\tbei jing\tmany\tplace").is_none());
        assert!(DictionaryEntry::parse_tsv_line("北京\tbei jing").is_none());
    }

    #[test]
    fn memory_store_groups_by_category() {
        let store = MemoryStore::from_entries(vec![
            DictionaryEntry::new("你", "ni", 100, DictionaryCategory::Chars),
            DictionaryEntry::new("你好", "ni hao", 80, DictionaryCategory::Base),
            DictionaryEntry::new("好", "hao", 90, DictionaryCategory::Chars),
        ]);
        assert_eq!(store.entry_count(DictionaryCategory::Chars), 2);
        assert_eq!(store.entry_count(DictionaryCategory::Poetry), 0);
        assert_eq!(store.entries_by_category(DictionaryCategory::Base).len(), 1);
        assert_eq!(store.len(), 3);
    }
}
