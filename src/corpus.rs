//! # Ingredient Reference Corpus
//!
//! Named, immutable ingredient lists loaded once from a directory of
//! line-delimited text files. Each `<name>.txt` becomes the list `<name>`.
//! The corpus is built explicitly at startup and handed to the matcher and
//! the spelling corrector behind an `Arc`, so tests can build synthetic
//! corpora with [`ReferenceCorpus::from_lists`].
//!
//! Word lists for the spelling corrector may hold `word<TAB>count` lines;
//! see [`crate::spelling::SpellingCorrector::add_list`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

/// A named set of lowercase ingredient names or phrases.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientReferenceList {
    name: String,
    entries: Vec<String>,
}

impl IngredientReferenceList {
    /// Build a list from raw file content. Lines are trimmed and lowercased,
    /// blank lines and duplicates are skipped, file order is kept.
    pub fn from_lines(name: impl Into<String>, content: &str) -> Self {
        let mut seen = HashSet::new();
        let entries = content
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .filter(|line| seen.insert(line.clone()))
            .collect();

        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        let needle = entry.trim().to_lowercase();
        self.entries.iter().any(|e| *e == needle)
    }
}

/// Every reference list available to the pipeline, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    lists: HashMap<String, IngredientReferenceList>,
}

impl ReferenceCorpus {
    /// Load every `*.txt` file in `dir`.
    pub fn load_dir(dir: &Path) -> AppResult<Self> {
        info!(corpus_dir = %dir.display(), "Loading ingredient reference corpus");

        let read_dir = std::fs::read_dir(dir).map_err(|e| {
            AppError::Config(format!(
                "Cannot read corpus directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut lists = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry
                .map_err(|e| AppError::Config(format!("Cannot list corpus directory: {}", e)))?
                .path();

            if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Config(format!("Cannot read corpus file {}: {}", path.display(), e))
            })?;
            let list = IngredientReferenceList::from_lines(name, &content);
            debug!(list = %name, entries = list.len(), "Loaded reference list");
            lists.push(list);
        }

        let corpus = Self::from_lists(lists);
        info!(lists = corpus.lists.len(), "Ingredient reference corpus loaded");
        Ok(corpus)
    }

    /// Build a corpus from already constructed lists. A later list with the
    /// same name replaces an earlier one.
    pub fn from_lists(lists: impl IntoIterator<Item = IngredientReferenceList>) -> Self {
        Self {
            lists: lists
                .into_iter()
                .map(|list| (list.name.clone(), list))
                .collect(),
        }
    }

    pub fn list(&self, name: &str) -> Option<&IngredientReferenceList> {
        self.lists.get(name)
    }

    /// Look up a list that the configuration says must exist.
    pub fn require(&self, name: &str) -> AppResult<&IngredientReferenceList> {
        self.lists.get(name).ok_or_else(|| {
            AppError::Config(format!("Reference list '{}' is missing from the corpus", name))
        })
    }

    /// List names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.lists.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
