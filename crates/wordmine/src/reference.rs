//! Filtering against previously saved vocabularies.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;
use wordmine_types::WordEntry;

use crate::store::load_vocabulary;

/// A reference vocabulary that could not be used.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ReferenceWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for ReferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped reference {}: {}", self.path.display(), self.reason)
    }
}

/// Entries left after reference filtering, plus the files that were skipped.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReferenceOutcome {
    pub entries: Vec<WordEntry>,
    pub warnings: Vec<ReferenceWarning>,
}

/// Lowercased word set of one reference vocabulary.
#[derive(Clone, Debug, Default)]
pub struct ReferenceSet {
    pub name: String,
    words: HashSet<String>,
}

impl ReferenceSet {
    pub fn new(name: impl Into<String>, words: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            words: words.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ReferenceWarning> {
        let vocab = load_vocabulary(path).map_err(|e| ReferenceWarning {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = if vocab.name.is_empty() {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            vocab.name
        };
        Ok(Self::new(name, vocab.entries.into_iter().map(|e| e.value)))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn contains(&self, entry: &WordEntry) -> bool {
        self.words.contains(&entry.key())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn load_all(files: &[PathBuf]) -> (Vec<ReferenceSet>, Vec<ReferenceWarning>) {
    let mut sets = Vec::new();
    let mut warnings = Vec::new();
    for path in files {
        match ReferenceSet::load(path) {
            Ok(set) => sets.push(set),
            Err(warning) => {
                warn!("{warning}");
                warnings.push(warning);
            }
        }
    }
    (sets, warnings)
}

/// Remove entries present in any of the reference vocabularies.
pub fn filter_against_references(entries: Vec<WordEntry>, files: &[PathBuf]) -> ReferenceOutcome {
    let (sets, warnings) = load_all(files);
    let entries = entries
        .into_iter()
        .filter(|e| !sets.iter().any(|set| set.contains(e)))
        .collect();
    ReferenceOutcome { entries, warnings }
}

/// Keep only entries present in at least one of the reference vocabularies.
pub fn include_references(entries: Vec<WordEntry>, files: &[PathBuf]) -> ReferenceOutcome {
    let (sets, warnings) = load_all(files);
    let entries = entries
        .into_iter()
        .filter(|e| sets.iter().any(|set| set.contains(e)))
        .collect();
    ReferenceOutcome { entries, warnings }
}

/// How many entries fall into each named reference list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SummaryCount {
    pub name: String,
    pub count: usize,
}

pub fn summarize(entries: &[WordEntry], references: &[ReferenceSet]) -> Vec<SummaryCount> {
    references
        .iter()
        .map(|set| SummaryCount {
            name: set.name.clone(),
            count: entries.iter().filter(|e| set.contains(e)).count(),
        })
        .collect()
}
