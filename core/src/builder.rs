//! Building category tries from raw dictionary rows.
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::store::{DictionaryCategory, DictionaryEntry, DictionaryStore};
use crate::trie::{initials_path, TrieDictionary};
use crate::utils::strip_tones;

/// Fills a [`TrieDictionary`] from dictionary rows.
///
/// Every row is inserted twice: under its toneless pinyin (separators are
/// dropped by the trie, so `"bei jing"` and `"beijing"` share a node) and
/// under its initials behind the [`INITIALS_MARKER`](crate::trie::INITIALS_MARKER).
#[derive(Debug)]
pub struct TrieBuilder {
    dict: TrieDictionary,
    inserted: usize,
    skipped: usize,
}

impl TrieBuilder {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            dict: TrieDictionary::with_capacity(capacity)?,
            inserted: 0,
            skipped: 0,
        })
    }

    /// Builder sized for `category`'s default capacity.
    pub fn for_category(category: DictionaryCategory) -> Self {
        Self {
            dict: TrieDictionary::with_capacity(category.default_capacity())
                .unwrap_or_default(),
            inserted: 0,
            skipped: 0,
        }
    }

    pub fn add_entry(&mut self, entry: &DictionaryEntry) {
        let pinyin = strip_tones(&entry.pinyin).to_lowercase();
        let initials = match initials_path(&pinyin) {
            Some(path) => path,
            None => {
                self.skipped += 1;
                debug!(word = %entry.word, "row without pinyin skipped");
                return;
            }
        };
        self.dict.insert(&pinyin, &entry.word, entry.frequency);
        self.dict.insert(&initials, &entry.word, entry.frequency);
        self.inserted += 1;
    }

    pub fn add_entries<'a, I: IntoIterator<Item = &'a DictionaryEntry>>(&mut self, entries: I) {
        for entry in entries {
            self.add_entry(entry);
        }
    }

    /// Rows accepted so far.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    pub fn finish(self) -> TrieDictionary {
        self.dict
    }
}

/// Build the trie for one category straight from a store.
pub fn build_from_store(
    store: &dyn DictionaryStore,
    category: DictionaryCategory,
    capacity: usize,
) -> Result<TrieDictionary, ConfigError> {
    let rows = store.entries_by_category(category);
    let mut builder = TrieBuilder::new(capacity)?;
    builder.add_entries(rows.iter());
    let stats = builder.dict.memory_stats();
    info!(
        category = %category,
        rows = rows.len(),
        inserted = builder.inserted,
        skipped = builder.skipped,
        nodes = stats.node_count,
        words = stats.word_count,
        "built trie from store"
    );
    Ok(builder.finish())
}
