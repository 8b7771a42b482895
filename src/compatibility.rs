//! # Ingredient Matcher
//!
//! Flags ingredient tokens that contain a known problematic phrase and turns
//! the flag count into a compatibility score. Matching is a case-insensitive
//! substring test so compound names like "Isopropyl Myristate (Emollient)"
//! are still caught from noisy OCR output.

use serde::Serialize;
use tracing::debug;

use crate::corpus::ReferenceCorpus;
use crate::errors::AppResult;
use crate::pipeline_errors::PipelineError;

/// A token that matched a bad phrase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedIngredient {
    pub token: String,
    pub matched: String,
}

/// Outcome of scoring one ingredient list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    /// Percentage of tokens that were not flagged, in `[0, 100]`.
    pub score: f64,
    pub total_tokens: usize,
    pub flagged: Vec<FlaggedIngredient>,
}

impl CompatibilityReport {
    pub fn bad_count(&self) -> usize {
        self.flagged.len()
    }
}

/// Matcher over the union of the configured bad reference lists.
#[derive(Debug, Clone)]
pub struct IngredientMatcher {
    bad_phrases: Vec<String>,
}

impl IngredientMatcher {
    /// Build from phrases directly. Phrases are trimmed and lowercased;
    /// blank phrases are ignored since they would match every token.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bad_phrases: Vec<String> = Vec::new();
        for phrase in phrases {
            let phrase = phrase.as_ref().trim().to_lowercase();
            if !phrase.is_empty() && !bad_phrases.contains(&phrase) {
                bad_phrases.push(phrase);
            }
        }
        Self { bad_phrases }
    }

    /// Union of the named lists. Any missing list is a configuration error.
    pub fn from_corpus(corpus: &ReferenceCorpus, list_names: &[String]) -> AppResult<Self> {
        let mut phrases = Vec::new();
        for name in list_names {
            phrases.extend(corpus.require(name)?.entries().iter().cloned());
        }
        let matcher = Self::new(phrases);
        debug!(
            lists = ?list_names,
            phrases = matcher.bad_phrases.len(),
            "Ingredient matcher built"
        );
        Ok(matcher)
    }

    pub fn phrase_count(&self) -> usize {
        self.bad_phrases.len()
    }

    /// First bad phrase contained in `token`, if any.
    pub fn find_match(&self, token: &str) -> Option<&str> {
        let needle = token.trim().to_lowercase();
        self.bad_phrases
            .iter()
            .find(|phrase| needle.contains(phrase.as_str()))
            .map(String::as_str)
    }

    /// Score a pre-tokenized ingredient list. Every element counts toward
    /// the total, including empty ones.
    pub fn score_tokens<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Result<CompatibilityReport, PipelineError> {
        if tokens.is_empty() {
            return Err(PipelineError::InvalidInput(
                "No ingredients were extracted, compatibility is undefined".to_string(),
            ));
        }

        let flagged: Vec<FlaggedIngredient> = tokens
            .iter()
            .filter_map(|token| {
                let token = token.as_ref();
                self.find_match(token).map(|matched| FlaggedIngredient {
                    token: token.trim().to_string(),
                    matched: matched.to_string(),
                })
            })
            .collect();

        let total = tokens.len();
        let score = 100.0 * (1.0 - flagged.len() as f64 / total as f64);

        Ok(CompatibilityReport {
            score,
            total_tokens: total,
            flagged,
        })
    }

    /// Score label text: fields are separated by commas or newlines, trimmed,
    /// and empty fields are discarded before scoring.
    pub fn score_text(&self, text: &str) -> Result<CompatibilityReport, PipelineError> {
        self.score_tokens(&split_ingredients(text))
    }
}

/// Split a label into non-empty, trimmed ingredient fields.
pub fn split_ingredients(text: &str) -> Vec<String> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}
