//! Phonetic fuzzy equivalence between syllables.
//!
//! Rules come in three shapes: initial swaps (`z=zh`), final swaps
//! (`an=ang`) and whole-syllable swaps (`hui=fei`). Each rule can be toggled
//! on its own and a master switch gates all of them. The `v`/`ü` spelling
//! substitution is not a rule: it is always applied.
use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a rule matches inside a syllable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Initial,
    Final,
    Syllable,
}

/// A symmetric equivalence pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyRule {
    pub kind: RuleKind,
    pub a: String,
    pub b: String,
    pub enabled: bool,
}

impl FuzzyRule {
    pub fn new(kind: RuleKind, a: &str, b: &str) -> Self {
        Self {
            kind,
            a: a.to_string(),
            b: b.to_string(),
            enabled: true,
        }
    }

    /// Textual form used in configuration files, e.g. `"z=zh"`.
    pub fn id(&self) -> String {
        format!("{}={}", self.a, self.b)
    }

    fn matches(&self, a: &str, b: &str) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }

    /// Push every substitution of this rule that applies to `syllable`.
    ///
    /// Both directions are tried independently, so `zhong` yields `zong`
    /// through `zh -> z` as well as `zhhong` through `z -> zh`.
    fn apply(&self, syllable: &str, out: &mut BTreeSet<String>) {
        let pairs = [(&self.a, &self.b), (&self.b, &self.a)];
        match self.kind {
            RuleKind::Initial => {
                for (from, to) in pairs {
                    if let Some(rest) = syllable.strip_prefix(from.as_str()) {
                        out.insert(format!("{to}{rest}"));
                    }
                }
            }
            RuleKind::Final => {
                for (from, to) in pairs {
                    if let Some(head) = syllable.strip_suffix(from.as_str()) {
                        out.insert(format!("{head}{to}"));
                    }
                }
            }
            RuleKind::Syllable => {
                for (from, to) in pairs {
                    if syllable == from.as_str() {
                        out.insert(to.clone());
                    }
                }
            }
        }
    }
}

/// Parse `"a=b"` into its two halves.
fn parse_pair(text: &str) -> Option<(String, String)> {
    let (a, b) = text.split_once('=')?;
    let (a, b) = (a.trim().to_ascii_lowercase(), b.trim().to_ascii_lowercase());
    if a.is_empty() || b.is_empty() || a == b {
        None
    } else {
        Some((a, b))
    }
}

/// Serializable toggle set for [`PhoneticFuzzyRules`].
///
/// Each list names the pairs that are switched on. Pairs from the standard
/// catalog that are not listed stay registered but disabled; unknown pairs
/// are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// Master switch for initial, final and whole-syllable rules.
    pub enabled: bool,
    pub initials: Vec<String>,
    pub finals: Vec<String>,
    pub syllables: Vec<String>,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initials: vec!["z=zh".into(), "c=ch".into(), "s=sh".into(), "l=n".into()],
            finals: vec!["an=ang".into(), "en=eng".into(), "in=ing".into()],
            syllables: vec![],
        }
    }
}

const STANDARD_INITIALS: &[(&str, &str)] = &[
    ("z", "zh"),
    ("c", "ch"),
    ("s", "sh"),
    ("k", "g"),
    ("f", "h"),
    ("l", "n"),
    ("r", "l"),
];

const STANDARD_FINALS: &[(&str, &str)] = &[
    ("an", "ang"),
    ("en", "eng"),
    ("in", "ing"),
    ("ian", "iang"),
    ("uan", "uang"),
    ("an", "ai"),
    ("un", "ong"),
];

const STANDARD_SYLLABLES: &[(&str, &str)] = &[
    ("hui", "fei"),
    ("huang", "wang"),
    ("feng", "hong"),
    ("fu", "hu"),
];

static JQXY_U: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^([jqxy])u(.*)$").ok());
static JQXY_V: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^([jqxy])v(.*)$").ok());

/// Add the `v`/`ü` spellings of `syllable`.
///
/// Handles `lü`/`lv` and `nü`/`nv`, the `j q x y` + `u`/`v` family where the
/// written `u` is really `ü`, and a bare `ü`/`v` swap anywhere else.
pub fn v_u_variants(syllable: &str, out: &mut BTreeSet<String>) {
    for (with_u, with_v) in [("lü", "lv"), ("nü", "nv")] {
        if let Some(rest) = syllable.strip_prefix(with_u) {
            out.insert(format!("{with_v}{rest}"));
        } else if let Some(rest) = syllable.strip_prefix(with_v) {
            out.insert(format!("{with_u}{rest}"));
        }
    }

    let jqxy_u = JQXY_U.as_ref().and_then(|re| re.captures(syllable));
    let jqxy_v = JQXY_V.as_ref().and_then(|re| re.captures(syllable));
    if let Some(caps) = jqxy_u {
        out.insert(format!("{}v{}", &caps[1], &caps[2]));
    } else if let Some(caps) = jqxy_v {
        out.insert(format!("{}u{}", &caps[1], &caps[2]));
    }

    if syllable.contains('ü') {
        out.insert(syllable.replace('ü', "v"));
    } else if syllable.contains('v') {
        out.insert(syllable.replace('v', "ü"));
    }
}

/// Configurable set of fuzzy rules.
#[derive(Debug, Clone)]
pub struct PhoneticFuzzyRules {
    rules: Vec<FuzzyRule>,
    enabled: bool,
}

impl Default for PhoneticFuzzyRules {
    fn default() -> Self {
        Self::from_config(&FuzzyConfig::default())
    }
}

impl PhoneticFuzzyRules {
    /// No rules; only the `v`/`ü` substitution applies.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            enabled: true,
        }
    }

    /// The full standard catalog with every rule switched on.
    pub fn standard() -> Self {
        let mut rules = Self::new();
        for (kind, table) in [
            (RuleKind::Initial, STANDARD_INITIALS),
            (RuleKind::Final, STANDARD_FINALS),
            (RuleKind::Syllable, STANDARD_SYLLABLES),
        ] {
            for (a, b) in table {
                rules.add_rule(kind, a, b);
            }
        }
        rules
    }

    /// The standard catalog with exactly the pairs named in `cfg` enabled.
    pub fn from_config(cfg: &FuzzyConfig) -> Self {
        let mut rules = Self::standard();
        for rule in rules.rules.iter_mut() {
            rule.enabled = false;
        }
        rules.enabled = cfg.enabled;

        for (kind, list) in [
            (RuleKind::Initial, &cfg.initials),
            (RuleKind::Final, &cfg.finals),
            (RuleKind::Syllable, &cfg.syllables),
        ] {
            for text in list {
                match parse_pair(text) {
                    Some((a, b)) => {
                        if !rules.set_rule_enabled(kind, &a, &b, true) {
                            rules.add_rule(kind, &a, &b);
                        }
                    }
                    None => debug!(rule = %text, "skipping malformed fuzzy rule"),
                }
            }
        }
        rules
    }

    /// Snapshot of the current toggles.
    pub fn to_config(&self) -> FuzzyConfig {
        let pick = |kind: RuleKind| -> Vec<String> {
            self.rules
                .iter()
                .filter(|r| r.kind == kind && r.enabled)
                .map(FuzzyRule::id)
                .collect()
        };
        FuzzyConfig {
            enabled: self.enabled,
            initials: pick(RuleKind::Initial),
            finals: pick(RuleKind::Final),
            syllables: pick(RuleKind::Syllable),
        }
    }

    /// Register an enabled rule. Duplicates are ignored.
    pub fn add_rule(&mut self, kind: RuleKind, a: &str, b: &str) {
        if self.rules.iter().any(|r| r.kind == kind && r.matches(a, b)) {
            return;
        }
        self.rules.push(FuzzyRule::new(kind, a, b));
    }

    /// Toggle one rule. Returns `false` if no such rule is registered.
    pub fn set_rule_enabled(&mut self, kind: RuleKind, a: &str, b: &str, enabled: bool) -> bool {
        match self
            .rules
            .iter_mut()
            .find(|r| r.kind == kind && r.matches(a, b))
        {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rules(&self) -> &[FuzzyRule] {
        &self.rules
    }

    /// Every spelling considered equivalent to `syllable`, including itself.
    pub fn expand(&self, syllable: &str) -> BTreeSet<String> {
        let syllable = syllable.trim().to_lowercase();
        let mut out = BTreeSet::new();
        if syllable.is_empty() {
            return out;
        }
        out.insert(syllable.clone());

        if self.enabled {
            for rule in self.rules.iter().filter(|r| r.enabled) {
                rule.apply(&syllable, &mut out);
            }
        }
        v_u_variants(&syllable, &mut out);
        out
    }

    /// Expansion as a list with the input first.
    pub fn variants(&self, syllable: &str) -> Vec<String> {
        let original = syllable.trim().to_lowercase();
        let mut out: Vec<String> = vec![original.clone()];
        out.extend(self.expand(&original).into_iter().filter(|v| *v != original));
        out
    }

    /// Cartesian product of per-syllable variants, capped at `limit`.
    ///
    /// Each sequence is paired with how many syllables were substituted.
    /// The unchanged sequence comes first; the rest are ordered by that count.
    pub fn expand_sequence(&self, seq: &[String], limit: usize) -> Vec<(Vec<String>, usize)> {
        if seq.is_empty() || limit == 0 {
            return vec![];
        }

        let mut results: Vec<(Vec<String>, usize)> = vec![(Vec::new(), 0)];
        for syllable in seq {
            let alts = self.variants(syllable);
            let mut next = Vec::with_capacity(results.len() * alts.len());
            'outer: for (prefix, changed) in &results {
                for (i, alt) in alts.iter().enumerate() {
                    let mut seq = prefix.clone();
                    seq.push(alt.clone());
                    next.push((seq, changed + usize::from(i > 0)));
                    if next.len() >= limit {
                        break 'outer;
                    }
                }
            }
            results = next;
        }

        results.sort_by_key(|(_, changed)| *changed);
        results
    }
}
