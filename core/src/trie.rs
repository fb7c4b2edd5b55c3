//! Frequency-ranked prefix tree used as the dictionary store.
//!
//! Every node owns its children and a capacity-bounded word list kept in
//! descending frequency order. A [`TrieDictionary`] wraps the root in a
//! read/write lock: inserts are exclusive, searches and statistics share.
//!
//! # Example
//! ```
//! use suggest_core::trie::TrieDictionary;
//!
//! let dict = TrieDictionary::new();
//! dict.insert("bei jing", "北京", 9000);
//! dict.insert("bei jing", "背景", 500);
//!
//! let words: Vec<String> = dict
//!     .search_by_prefix("beijing", 5)
//!     .into_iter()
//!     .map(|w| w.word)
//!     .collect();
//! assert_eq!(words, vec!["北京", "背景"]);
//! ```
use std::collections::{BTreeMap, VecDeque};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::RwLock;

use ahash::AHashSet;
use anyhow::Context;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{BlobError, ConfigError};

/// Word-list capacity used by most categories.
pub const DEFAULT_NODE_CAPACITY: usize = 50;

/// Capacity for the single-character category, large enough to keep every
/// homophone of a syllable.
pub const CHARS_NODE_CAPACITY: usize = 1000;

/// Paths starting with this marker hold initials ("bj") rather than full
/// pinyin, so acronym and pinyin queries never collide.
pub const INITIALS_MARKER: char = '@';

const BLOB_MAGIC: &[u8; 4] = b"PTRI";
const BLOB_VERSION: u32 = 1;

/// A word stored at a trie node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordItem {
    pub word: String,
    pub frequency: u64,
}

impl WordItem {
    pub fn new<W: Into<String>>(word: W, frequency: u64) -> Self {
        Self {
            word: word.into(),
            frequency,
        }
    }
}

/// A search result together with the full path it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieHit {
    pub word: String,
    pub frequency: u64,
    pub path: String,
}

/// Node and word totals for a whole tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub node_count: usize,
    pub word_count: usize,
}

impl MemoryStats {
    pub fn is_empty(&self) -> bool {
        self.node_count == 0 || self.word_count == 0
    }
}

/// One node of the dictionary tree.
///
/// Children are kept in a `BTreeMap` so that encoding a tree twice always
/// produces the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    is_end: bool,
    words: Vec<WordItem>,
}

impl TrieNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    /// Words stored at this node, highest frequency first.
    pub fn words(&self) -> &[WordItem] {
        &self.words
    }

    pub fn child(&self, ch: char) -> Option<&TrieNode> {
        self.children.get(&ch)
    }

    /// Walk down `path` one character at a time.
    pub fn descend(&self, path: &str) -> Option<&TrieNode> {
        let mut node = self;
        for ch in path.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }

    /// Add a word under the capacity rule.
    ///
    /// Below capacity the word is appended. At capacity it replaces the
    /// least frequent entry only when strictly more frequent. Re-adding a
    /// word already present keeps the higher of the two frequencies.
    /// Returns whether the list changed.
    pub fn add_word(&mut self, word: &str, frequency: u64, capacity: usize) -> bool {
        if let Some(existing) = self.words.iter_mut().find(|w| w.word == word) {
            if frequency <= existing.frequency {
                return false;
            }
            existing.frequency = frequency;
            self.sort_words();
            return true;
        }

        if self.words.len() < capacity {
            self.words.push(WordItem::new(word, frequency));
            self.sort_words();
            return true;
        }

        // The list is sorted, so the lowest-frequency entry is last.
        match self.words.last() {
            Some(lowest) if frequency > lowest.frequency => {
                self.words.pop();
                self.words.push(WordItem::new(word, frequency));
                self.sort_words();
                true
            }
            _ => false,
        }
    }

    fn sort_words(&mut self) {
        // Stable sort keeps insertion order among equal frequencies.
        self.words.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    }

    /// Count this node and every descendant.
    pub fn memory_stats(&self) -> MemoryStats {
        let mut stats = MemoryStats {
            node_count: 1,
            word_count: self.words.len(),
        };
        for child in self.children.values() {
            let sub = child.memory_stats();
            stats.node_count += sub.node_count;
            stats.word_count += sub.word_count;
        }
        stats
    }

    /// Breadth-first gather from this node, then global sort and truncate.
    ///
    /// The gather stops queueing further nodes once `limit` distinct words
    /// are collected, but every word of each visited node is considered
    /// before the final sort, so a frequent word in a small branch is never
    /// lost to per-node truncation.
    fn collect_hits(&self, base_path: &str, limit: usize) -> Vec<TrieHit> {
        let mut hits: Vec<TrieHit> = Vec::new();
        let mut seen: AHashSet<String> = AHashSet::new();
        let mut queue: VecDeque<(&TrieNode, String)> = VecDeque::new();
        queue.push_back((self, base_path.to_string()));

        while let Some((node, path)) = queue.pop_front() {
            for item in &node.words {
                if seen.insert(item.word.clone()) {
                    hits.push(TrieHit {
                        word: item.word.clone(),
                        frequency: item.frequency,
                        path: path.clone(),
                    });
                }
            }
            if hits.len() >= limit {
                break;
            }
            for (ch, child) in &node.children {
                // initials live in their own subtree, reached only by `@` queries
                if *ch == INITIALS_MARKER && !base_path.starts_with(INITIALS_MARKER) {
                    continue;
                }
                let mut child_path = path.clone();
                child_path.push(*ch);
                queue.push_back((child, child_path));
            }
        }

        hits.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        hits.truncate(limit);
        hits
    }
}

/// Canonical form of an insert or search path: lowercase, with syllable
/// separators (whitespace and apostrophes) removed.
pub fn normalize_path(path: &str) -> String {
    path.chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Path under which the initials of `pinyin` are stored.
///
/// `"bei jing"` becomes `"@bj"`. Returns `None` when `pinyin` holds no
/// syllables.
pub fn initials_path(pinyin: &str) -> Option<String> {
    let initials: String = pinyin
        .split(|c: char| c.is_whitespace() || c == '\'')
        .filter_map(|syllable| syllable.chars().next())
        .flat_map(|c| c.to_lowercase())
        .collect();
    if initials.is_empty() {
        None
    } else {
        Some(format!("{INITIALS_MARKER}{initials}"))
    }
}

/// Thread-safe prefix dictionary with a fixed per-node capacity.
#[derive(Debug)]
pub struct TrieDictionary {
    root: RwLock<TrieNode>,
    capacity: usize,
}

impl Default for TrieDictionary {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct BlobImageRef<'a> {
    capacity: u64,
    root: &'a TrieNode,
}

#[derive(Deserialize)]
struct BlobImage {
    capacity: u64,
    root: TrieNode,
}

impl TrieDictionary {
    /// An empty dictionary using [`DEFAULT_NODE_CAPACITY`].
    pub fn new() -> Self {
        Self {
            root: RwLock::new(TrieNode::new()),
            capacity: DEFAULT_NODE_CAPACITY,
        }
    }

    /// An empty dictionary with a custom capacity. Zero is rejected.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity(capacity));
        }
        Ok(Self {
            root: RwLock::new(TrieNode::new()),
            capacity,
        })
    }

    /// Wrap an already-built tree with a fresh lock.
    fn from_root(root: TrieNode, capacity: usize) -> Self {
        Self {
            root: RwLock::new(root),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert `word` at the node addressed by `path`.
    ///
    /// Separators in `path` are dropped, so `"bei jing"`, `"bei'jing"` and
    /// `"beijing"` address the same node. Malformed input is logged and
    /// ignored.
    pub fn insert(&self, path: &str, word: &str, frequency: u64) {
        let key = normalize_path(path);
        if key.is_empty() || word.trim().is_empty() {
            warn!(path, word, "ignoring trie insert with empty path or word");
            return;
        }

        let mut root = match self.root.write() {
            Ok(guard) => guard,
            Err(_) => {
                error!(path, "trie lock poisoned, insert dropped");
                return;
            }
        };

        let mut node = &mut *root;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.is_end = true;
        node.add_word(word.trim(), frequency, self.capacity);
    }

    /// Up to `limit` words stored under `prefix`, highest frequency first.
    pub fn search_by_prefix(&self, prefix: &str, limit: usize) -> Vec<WordItem> {
        self.search_hits_by_prefix(prefix, limit)
            .into_iter()
            .map(|hit| WordItem::new(hit.word, hit.frequency))
            .collect()
    }

    /// Like [`search_by_prefix`](Self::search_by_prefix), keeping each word's path.
    pub fn search_hits_by_prefix(&self, prefix: &str, limit: usize) -> Vec<TrieHit> {
        if limit == 0 {
            return Vec::new();
        }
        let key = normalize_path(prefix);
        let root = match self.root.read() {
            Ok(guard) => guard,
            Err(_) => {
                error!(prefix, "trie lock poisoned, search skipped");
                return Vec::new();
            }
        };
        match root.descend(&key) {
            Some(node) => node.collect_hits(&key, limit),
            None => Vec::new(),
        }
    }

    /// Words stored exactly at `path`, without descending further.
    pub fn search_exact(&self, path: &str, limit: usize) -> Vec<WordItem> {
        let key = normalize_path(path);
        let root = match self.root.read() {
            Ok(guard) => guard,
            Err(_) => {
                error!(path, "trie lock poisoned, lookup skipped");
                return Vec::new();
            }
        };
        root.descend(&key)
            .filter(|node| node.is_end)
            .map(|node| node.words.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any stored path starts with `prefix`.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        let key = normalize_path(prefix);
        self.root
            .read()
            .map(|root| root.descend(&key).is_some())
            .unwrap_or(false)
    }

    pub fn memory_stats(&self) -> MemoryStats {
        match self.root.read() {
            Ok(root) => root.memory_stats(),
            Err(_) => {
                error!("trie lock poisoned, reporting empty statistics");
                MemoryStats::default()
            }
        }
    }

    /// True when nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.root
            .read()
            .map(|root| root.children.is_empty())
            .unwrap_or(true)
    }

    /// Encode the whole tree: header, then gzip of the bincode image.
    pub fn to_blob(&self) -> Result<Vec<u8>, BlobError> {
        let root = self.root.read().map_err(|_| {
            BlobError::Compression(std::io::Error::new(
                std::io::ErrorKind::Other,
                "trie lock poisoned",
            ))
        })?;
        let image = BlobImageRef {
            capacity: self.capacity as u64,
            root: &root,
        };
        let payload = bincode::serialize(&image)?;
        drop(root);

        let mut out = Vec::with_capacity(payload.len() / 2 + 8);
        out.extend_from_slice(BLOB_MAGIC);
        out.extend_from_slice(&BLOB_VERSION.to_le_bytes());
        let mut encoder = GzEncoder::new(out, Compression::default());
        encoder.write_all(&payload)?;
        Ok(encoder.finish()?)
    }

    /// Decode a blob produced by [`to_blob`](Self::to_blob).
    ///
    /// A blob that decodes to a tree without nodes or words is treated as
    /// corrupt.
    pub fn from_blob(bytes: &[u8]) -> Result<Self, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }
        if bytes.len() < 8 || &bytes[..4] != BLOB_MAGIC {
            return Err(BlobError::BadMagic);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..8]);
        let version = u32::from_le_bytes(version);
        if version != BLOB_VERSION {
            return Err(BlobError::UnsupportedVersion(version));
        }

        let mut payload = Vec::new();
        GzDecoder::new(&bytes[8..]).read_to_end(&mut payload)?;
        let image: BlobImage = bincode::deserialize(&payload)?;

        // Only interior structure counts; the root itself is always present.
        let stats = image.root.memory_stats();
        let nodes = stats.node_count.saturating_sub(1);
        if nodes == 0 || stats.word_count == 0 {
            return Err(BlobError::EmptyTree {
                nodes,
                words: stats.word_count,
            });
        }
        debug!(
            nodes = stats.node_count,
            words = stats.word_count,
            "decoded trie blob"
        );
        Ok(Self::from_root(image.root, image.capacity as usize))
    }

    /// Write the blob to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let bytes = self.to_blob()?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Read and decode the blob at `path`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let dict = Self::from_blob(&bytes)
            .with_context(|| format!("decoding trie blob {}", path.display()))?;
        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_prefix_search_orders_by_frequency() {
        let dict = TrieDictionary::new();
        dict.insert("bei jing", "北京", 9000);
        dict.insert("bei jing", "背景", 500);
        dict.insert("bei", "北", 20000);

        let words: Vec<_> = dict.search_by_prefix("bei", 10).into_iter().map(|w| w.word).collect();
        assert_eq!(words, vec!["北", "北京", "背景"]);
    }

    #[test]
    fn missing_prefix_is_empty() {
        let dict = TrieDictionary::new();
        dict.insert("ni", "你", 100);
        assert!(dict.search_by_prefix("xyz", 5).is_empty());
        assert!(dict.search_by_prefix("ni", 0).is_empty());
    }

    #[test]
    fn full_node_drops_weaker_word() {
        let dict = TrieDictionary::with_capacity(2).unwrap();
        dict.insert("a", "甲", 10);
        dict.insert("a", "乙", 5);
        dict.insert("a", "丙", 5);
        dict.insert("a", "丁", 7);

        let words: Vec<_> = dict.search_exact("a", 10).into_iter().map(|w| w.word).collect();
        assert_eq!(words, vec!["甲", "丁"]);
    }

    #[test]
    fn reinserting_keeps_higher_frequency() {
        let dict = TrieDictionary::new();
        dict.insert("hao", "好", 10);
        dict.insert("hao", "好", 50);
        dict.insert("hao", "好", 20);
        assert_eq!(dict.search_exact("hao", 5), vec![WordItem::new("好", 50)]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            TrieDictionary::with_capacity(0).unwrap_err(),
            ConfigError::InvalidCapacity(0)
        );
    }

    #[test]
    fn malformed_insert_is_ignored() {
        let dict = TrieDictionary::new();
        dict.insert("   ", "空", 1);
        dict.insert("kong", "", 1);
        assert!(dict.is_empty());
    }

    #[test]
    fn hits_carry_their_paths() {
        let dict = TrieDictionary::new();
        dict.insert("zhong guo", "中国", 800);
        dict.insert("zhong", "中", 900);
        let hits = dict.search_hits_by_prefix("zho", 5);
        assert_eq!(hits[0].path, "zhong");
        assert_eq!(hits[1].path, "zhongguo");
    }

    #[test]
    fn empty_prefix_skips_initials_subtree() {
        let dict = TrieDictionary::new();
        dict.insert("bei jing", "北京", 9000);
        dict.insert("@bj", "北京", 9000);
        dict.insert("@bjr", "北京人", 800);

        let all = dict.search_hits_by_prefix("", 10);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, "beijing");

        let initials: Vec<_> = dict.search_by_prefix("@b", 10).into_iter().map(|w| w.word).collect();
        assert_eq!(initials, vec!["北京", "北京人"]);
    }

    #[test]
    fn initials_path_uses_marker() {
        assert_eq!(initials_path("bei jing").as_deref(), Some("@bj"));
        assert_eq!(initials_path("  "), None);
    }

    #[test]
    fn blob_round_trip_is_byte_identical() {
        let dict = TrieDictionary::new();
        dict.insert("ni hao", "你好", 300);
        dict.insert("ni", "你", 900);
        dict.insert("@nh", "你好", 300);

        let first = dict.to_blob().unwrap();
        let restored = TrieDictionary::from_blob(&first).unwrap();
        let second = restored.to_blob().unwrap();
        assert_eq!(first, second);
        assert_eq!(dict.memory_stats(), restored.memory_stats());
    }

    #[test]
    fn empty_tree_blob_is_rejected() {
        let dict = TrieDictionary::new();
        let blob = dict.to_blob().unwrap();
        assert!(matches!(
            TrieDictionary::from_blob(&blob),
            Err(BlobError::EmptyTree { .. })
        ));
        assert!(matches!(TrieDictionary::from_blob(&[]), Err(BlobError::Empty)));
        assert!(matches!(
            TrieDictionary::from_blob(b"nonsense"),
            Err(BlobError::BadMagic)
        ));
    }
}
