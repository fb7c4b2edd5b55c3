// libpinyin/src/parser.rs
//
// Pinyin syllable segmentation.
// - SyllableTrie: prefix tree over the syllable inventory
// - PinyinSegmenter: longest-first split, solved right to left
// - PhoneticSegmenter: the seam the classifier and combiner depend on

use std::collections::BTreeMap;

use crate::syllables::PINYIN_SYLLABLES;

/// Splits keystrokes into syllables.
pub trait PhoneticSegmenter: Send + Sync {
    /// Split `text` into syllables covering all of it, preferring longer
    /// syllables first. Returns an empty list when no full cover exists.
    fn split(&self, text: &str) -> Vec<String>;

    fn is_valid_syllable(&self, text: &str) -> bool;

    /// Syllables that start with `prefix` but are longer than it.
    fn completions(&self, prefix: &str, limit: usize) -> Vec<String>;

    /// Whether `text` is a strict prefix of at least one syllable.
    fn is_syllable_prefix(&self, text: &str) -> bool {
        !self.completions(text, 1).is_empty()
    }
}

/// A prefix tree over syllables.
///
/// # Example
/// ```
/// use pinyin_suggest::parser::SyllableTrie;
///
/// let mut trie = SyllableTrie::new();
/// trie.insert("ni");
/// trie.insert("hao");
///
/// let input: Vec<char> = "nihao".chars().collect();
/// assert_eq!(trie.walk_prefixes(&input, 0), vec![(2, "ni".to_string())]);
/// ```
#[derive(Debug, Default)]
pub struct SyllableTrie {
    children: BTreeMap<char, SyllableTrie>,
    /// Set when a syllable ends here.
    word: Option<String>,
}

impl SyllableTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trie holding the whole syllable inventory.
    pub fn standard() -> Self {
        let mut trie = Self::new();
        for syllable in PINYIN_SYLLABLES.iter() {
            trie.insert(syllable);
        }
        trie
    }

    pub fn insert(&mut self, syllable: &str) {
        let mut node = self;
        for ch in syllable.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.word = Some(syllable.to_string());
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.find(word).is_some_and(|node| node.word.is_some())
    }

    fn find(&self, prefix: &str) -> Option<&SyllableTrie> {
        let mut node = self;
        for ch in prefix.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }

    /// All syllables that begin at `input[start..]`, as
    /// `(end_index, syllable)` in order of increasing length.
    pub fn walk_prefixes(&self, input: &[char], start: usize) -> Vec<(usize, String)> {
        let mut out = Vec::new();
        let mut node = self;
        for (i, ch) in input.iter().enumerate().skip(start) {
            match node.children.get(ch) {
                Some(child) => {
                    node = child;
                    if let Some(word) = &node.word {
                        out.push((i + 1, word.clone()));
                    }
                }
                None => break,
            }
        }
        out
    }

    /// Syllables below `prefix`, shortest first, excluding `prefix` itself.
    pub fn completions(&self, prefix: &str, limit: usize) -> Vec<String> {
        let Some(start) = self.find(prefix) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut level: Vec<&SyllableTrie> = start.children.values().collect();
        while !level.is_empty() && out.len() < limit {
            let mut next = Vec::new();
            for node in level {
                if let Some(word) = &node.word {
                    out.push(word.clone());
                    if out.len() >= limit {
                        break;
                    }
                }
                next.extend(node.children.values());
            }
            level = next;
        }
        out
    }
}

/// Segmenter over the standard syllable inventory.
#[derive(Debug)]
pub struct PinyinSegmenter {
    trie: SyllableTrie,
}

impl Default for PinyinSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl PinyinSegmenter {
    pub fn new() -> Self {
        Self {
            trie: SyllableTrie::standard(),
        }
    }

    /// Segmenter over a custom inventory.
    pub fn with_syllables<T: AsRef<str>>(syllables: &[T]) -> Self {
        let mut trie = SyllableTrie::new();
        for s in syllables {
            let key = s.as_ref().trim().to_ascii_lowercase();
            if !key.is_empty() {
                trie.insert(&key);
            }
        }
        Self { trie }
    }

    /// Longest-first cover of `chars`.
    ///
    /// `next[pos]` holds the longest syllable starting at `pos` whose end
    /// can itself be covered, filled right to left. Following it from 0
    /// gives the same split a longest-first backtracking search would.
    fn cover(&self, chars: &[char]) -> Option<Vec<String>> {
        let n = chars.len();
        let mut next: Vec<Option<(usize, String)>> = vec![None; n + 1];
        let mut reachable = vec![false; n + 1];
        reachable[n] = true;
        for pos in (0..n).rev() {
            next[pos] = self
                .trie
                .walk_prefixes(chars, pos)
                .into_iter()
                .rev()
                .find(|(end, _)| reachable[*end]);
            reachable[pos] = next[pos].is_some();
        }

        let mut out = Vec::new();
        let mut pos = 0;
        while pos < n {
            let (end, syllable) = next[pos].take()?;
            out.push(syllable);
            pos = end;
        }
        Some(out)
    }
}

impl PhoneticSegmenter for PinyinSegmenter {
    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.to_ascii_lowercase().chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        self.cover(&chars).unwrap_or_default()
    }

    fn is_valid_syllable(&self, text: &str) -> bool {
        self.trie.contains_word(&text.to_ascii_lowercase())
    }

    fn completions(&self, prefix: &str, limit: usize) -> Vec<String> {
        if prefix.is_empty() {
            return Vec::new();
        }
        self.trie.completions(&prefix.to_ascii_lowercase(), limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_common_words() {
        let seg = PinyinSegmenter::new();
        assert_eq!(seg.split("beijing"), vec!["bei", "jing"]);
        assert_eq!(seg.split("nihao"), vec!["ni", "hao"]);
        assert_eq!(seg.split("zhongguoren"), vec!["zhong", "guo", "ren"]);
    }

    #[test]
    fn backtracks_when_longest_fails() {
        let seg = PinyinSegmenter::new();
        assert_eq!(seg.split("xiangan"), vec!["xiang", "an"]);
        // "xian" leaves a bare "u", so the split falls back to "xia"
        assert_eq!(seg.split("xianu"), vec!["xia", "nu"]);
        // longest "fang" leaves "e", which is itself a syllable
        assert_eq!(seg.split("fange"), vec!["fang", "e"]);
        assert_eq!(seg.split("kexue"), vec!["ke", "xue"]);
    }

    #[test]
    fn no_cover_is_empty() {
        let seg = PinyinSegmenter::new();
        assert!(seg.split("bj").is_empty());
        assert!(seg.split("").is_empty());
        assert!(seg.split("beij").is_empty());
        assert!(seg.split(" ni").is_empty());
    }

    #[test]
    fn long_input_splits_without_recursion() {
        let seg = PinyinSegmenter::new();
        let split = seg.split(&"a".repeat(10_000));
        assert_eq!(split.len(), 10_000);
        assert!(split.iter().all(|s| s == "a"));

        let split = seg.split(&"nihao".repeat(2_000));
        assert_eq!(split.len(), 4_000);
        assert_eq!(split[..2], ["ni", "hao"]);

        let mut dead_end = "zhong".repeat(2_000);
        dead_end.push('v');
        assert!(seg.split(&dead_end).is_empty());
    }

    #[test]
    fn completions_exclude_exact() {
        let seg = PinyinSegmenter::new();
        let c = seg.completions("zh", 50);
        assert!(c.contains(&"zhong".to_string()));
        assert!(!c.contains(&"zh".to_string()));
        assert!(seg.is_syllable_prefix("chon"));
        assert!(!seg.is_syllable_prefix("zhuang"));
        assert!(seg.is_valid_syllable("zhuang"));
    }
}
