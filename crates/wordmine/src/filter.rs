//! Frequency filtering.
//!
//! Each predicate is switched on independently; an entry "matches" when any
//! enabled predicate matches it. [`FilterMode::Exclude`] drops matching
//! entries, [`FilterMode::Include`] keeps only them. Rank `0` means "not in
//! the corpus" and is never caught by a range predicate, only by the zero
//! predicates.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use wordmine_types::WordEntry;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Exclude,
    Include,
}

/// Filter switches for one run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub mode: FilterMode,
    /// Match values that parse as a number.
    pub numbers: bool,
    /// Match `0 < bnc_rank < n`.
    pub bnc_below: Option<u32>,
    /// Match `0 < coca_rank < n`.
    pub coca_below: Option<u32>,
    /// Match `bnc_rank == 0`.
    pub bnc_zero: bool,
    /// Match `coca_rank == 0`.
    pub coca_zero: bool,
    /// Fold inflected forms into their lemma.
    pub lemmas: bool,
    /// Guess lemmas with suffix rules when the dictionary declares none.
    pub rule_lemmas: bool,
}

impl FilterConfig {
    /// True when any frequency predicate is switched on.
    pub fn has_predicates(&self) -> bool {
        self.numbers
            || self.bnc_below.is_some()
            || self.coca_below.is_some()
            || self.bnc_zero
            || self.coca_zero
    }

    pub fn matches(&self, entry: &WordEntry) -> bool {
        (self.numbers && is_numeric_literal(&entry.value))
            || self.bnc_below.is_some_and(|n| in_range(entry.bnc_rank, n))
            || self.coca_below.is_some_and(|n| in_range(entry.coca_rank, n))
            || (self.bnc_zero && entry.bnc_rank == 0)
            || (self.coca_zero && entry.coca_rank == 0)
    }

    /// Whether `entry` survives this configuration.
    pub fn keeps(&self, entry: &WordEntry) -> bool {
        match self.mode {
            FilterMode::Exclude => !self.matches(entry),
            FilterMode::Include => self.matches(entry),
        }
    }
}

/// Decimal literal such as `42`, `-3.5` or `1e6`. Words the float parser
/// also accepts (`inf`, `nan`) are not numbers here.
fn is_numeric_literal(value: &str) -> bool {
    let value = value.trim();
    value.bytes().any(|b| b.is_ascii_digit())
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && value.parse::<f64>().is_ok()
}

fn in_range(rank: u32, below: u32) -> bool {
    rank > 0 && rank < below
}

/// Apply the frequency predicates, preserving order.
pub fn apply_filters(entries: Vec<WordEntry>, config: &FilterConfig) -> Vec<WordEntry> {
    if !config.has_predicates() && config.mode == FilterMode::Exclude {
        return entries;
    }
    let mut mask: BitVec = bitvec![0; entries.len()];
    for (idx, entry) in entries.iter().enumerate() {
        if !config.keeps(entry) {
            mask.set(idx, true);
        }
    }
    entries
        .into_iter()
        .zip(mask.iter().by_vals())
        .filter_map(|(entry, dropped)| (!dropped).then_some(entry))
        .collect()
}
