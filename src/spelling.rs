//! # Spelling Corrector
//!
//! Dictionary-based correction of OCR output, limited to a single edit.
//! Candidate generation uses the symmetric-delete scheme: every dictionary
//! word is indexed under each of its one-character deletions, and a query is
//! looked up under itself and its own deletions. Candidates are then verified
//! with optimal string alignment distance so a transposition counts as one
//! edit.
//!
//! Unknown words with no candidate are replaced by an empty string. Whether
//! those empty slots survive in the joined text is an [`EmptySlotPolicy`].

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::{IngredientReferenceList, ReferenceCorpus};
use crate::errors::{AppError, AppResult};

/// Largest edit distance a correction may have.
pub const MAX_EDIT_DISTANCE: usize = 1;

/// What happens to tokens the corrector could not place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptySlotPolicy {
    /// Keep a zero-length field for every dropped token, so the number of
    /// space-separated fields in equals the number out.
    #[default]
    Keep,
    /// Remove dropped tokens before joining.
    Compact,
}

impl FromStr for EmptySlotPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(EmptySlotPolicy::Keep),
            "compact" => Ok(EmptySlotPolicy::Compact),
            other => Err(AppError::Config(format!(
                "Unknown empty slot policy '{}', expected 'keep' or 'compact'",
                other
            ))),
        }
    }
}

/// Term-frequency dictionary with single-edit correction.
#[derive(Debug, Clone, Default)]
pub struct SpellingCorrector {
    frequencies: HashMap<String, u64>,
    deletes: HashMap<String, Vec<String>>,
    policy: EmptySlotPolicy,
}

impl SpellingCorrector {
    pub fn new(policy: EmptySlotPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Seed the dictionary from the named ingredient and language word lists.
    pub fn from_corpus(
        corpus: &ReferenceCorpus,
        word_lists: &[String],
        policy: EmptySlotPolicy,
    ) -> AppResult<Self> {
        let mut corrector = Self::new(policy);
        for name in word_lists {
            corrector.add_list(corpus.require(name)?);
        }
        debug!(
            words = corrector.frequencies.len(),
            delete_keys = corrector.deletes.len(),
            "Spelling dictionary built"
        );
        Ok(corrector)
    }

    pub fn policy(&self) -> EmptySlotPolicy {
        self.policy
    }

    pub fn word_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Add every word of every entry in a reference list.
    ///
    /// An entry of the form `word<TAB>count` adds `count` occurrences of a
    /// single word, which is how frequency dictionaries are shipped. Any
    /// other entry counts each of its words once.
    pub fn add_list(&mut self, list: &IngredientReferenceList) {
        for entry in list.entries() {
            match parse_counted_entry(entry) {
                Some((word, count)) => self.add_word_count(word, count),
                None => {
                    for word in entry.split_whitespace() {
                        self.add_word(word);
                    }
                }
            }
        }
    }

    /// Count one occurrence of `word`. Surrounding punctuation is ignored.
    pub fn add_word(&mut self, word: &str) {
        self.add_word_count(word, 1);
    }

    pub fn add_word_count(&mut self, word: &str, occurrences: u64) {
        let word = trim_punctuation(word).to_lowercase();
        if word.is_empty() || occurrences == 0 {
            return;
        }

        let count = self.frequencies.entry(word.clone()).or_insert(0);
        let first_seen = *count == 0;
        *count += occurrences;
        if !first_seen {
            return;
        }

        for key in single_deletes(&word) {
            let bucket = self.deletes.entry(key).or_default();
            if !bucket.contains(&word) {
                bucket.push(word.clone());
            }
        }
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.frequencies.contains_key(&word.to_lowercase())
    }

    /// Best dictionary word within [`MAX_EDIT_DISTANCE`] of `word`: highest
    /// frequency first, then lexical order. Known words return themselves.
    pub fn lookup(&self, word: &str) -> Option<&str> {
        let query = word.to_lowercase();
        if let Some((known, _)) = self.frequencies.get_key_value(&query) {
            return Some(known.as_str());
        }

        let mut candidates: HashSet<&str> = HashSet::new();
        // query is a deletion of a dictionary word
        if let Some(words) = self.deletes.get(&query) {
            candidates.extend(words.iter().map(String::as_str));
        }
        for key in single_deletes(&query) {
            // dictionary word is a deletion of the query
            if let Some((known, _)) = self.frequencies.get_key_value(&key) {
                candidates.insert(known.as_str());
            }
            // both lose one character: substitution or transposition
            if let Some(words) = self.deletes.get(&key) {
                candidates.extend(words.iter().map(String::as_str));
            }
        }

        candidates
            .into_iter()
            .filter(|candidate| strsim::osa_distance(&query, candidate) <= MAX_EDIT_DISTANCE)
            .max_by(|a, b| {
                self.frequencies[*a]
                    .cmp(&self.frequencies[*b])
                    .then_with(|| b.cmp(a))
            })
    }

    /// Correct one whitespace token.
    ///
    /// Leading and trailing punctuation is kept around the corrected word.
    /// Tokens without letters, and tokens mixing letters with digits, pass
    /// through untouched. An unknown word with no correction yields `""`.
    pub fn correct_token(&self, token: &str) -> String {
        let (prefix, core, suffix) = split_affixes(token);

        if !core.chars().any(char::is_alphabetic) || core.chars().any(char::is_numeric) {
            return token.to_string();
        }
        if self.is_known(core) {
            return token.to_string();
        }

        match self.lookup(core) {
            Some(word) => {
                debug!(from = %core, to = %word, "Spelling correction applied");
                format!("{}{}{}", prefix, match_case(core, word), suffix)
            }
            None => {
                debug!(token = %token, "No correction within one edit, dropping token");
                String::new()
            }
        }
    }

    /// Correct every whitespace-separated token and join with single spaces.
    pub fn correct_text(&self, text: &str) -> String {
        let corrected = text.split_whitespace().map(|token| self.correct_token(token));
        match self.policy {
            EmptySlotPolicy::Keep => corrected.collect::<Vec<_>>().join(" "),
            EmptySlotPolicy::Compact => corrected
                .filter(|token| !token.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// `word<TAB>count` with a single-word left side and a numeric count.
fn parse_counted_entry(entry: &str) -> Option<(&str, u64)> {
    let (word, count) = entry.split_once('\t')?;
    let word = word.trim();
    if word.is_empty() || word.contains(char::is_whitespace) {
        return None;
    }
    count.trim().parse().ok().map(|count| (word, count))
}

fn single_deletes(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= 1 {
        return Vec::new();
    }
    (0..chars.len())
        .map(|skip| {
            chars
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, c)| *c)
                .collect()
        })
        .collect()
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Split a token into leading punctuation, the alphanumeric core and
/// trailing punctuation.
fn split_affixes(token: &str) -> (&str, &str, &str) {
    let start = token
        .char_indices()
        .find(|(_, c)| c.is_alphanumeric())
        .map(|(i, _)| i);
    let end = token
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphanumeric())
        .map(|(i, c)| i + c.len_utf8());

    match (start, end) {
        (Some(start), Some(end)) => (&token[..start], &token[start..end], &token[end..]),
        _ => (token, "", ""),
    }
}

fn match_case(original: &str, replacement: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    replacement.to_string()
}
