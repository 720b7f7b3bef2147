//! Folding inflected forms into their lemma.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;
use wordmine_dict::Dictionary;
use wordmine_morph::{InflectionTable, Morphy};
use wordmine_types::{EvidenceList, WordEntry};

use crate::filter::FilterConfig;

/// Replaces inflected entries with their dictionary lemma.
pub struct LemmaConsolidator<'a> {
    dict: &'a dyn Dictionary,
    rules: Option<&'a Morphy>,
}

impl<'a> LemmaConsolidator<'a> {
    pub fn new(dict: &'a dyn Dictionary) -> Self {
        Self { dict, rules: None }
    }

    /// Guess lemmas with `morphy` for entries that carry no inflection table.
    pub fn with_rules(mut self, morphy: &'a Morphy) -> Self {
        self.rules = Some(morphy);
        self
    }

    /// Lemma of `entry` when it is an inflected form of another word.
    pub fn lemma_of(&self, entry: &WordEntry) -> Option<String> {
        let table = InflectionTable::parse(&entry.inflections);
        let lemma = match table.lemma_of(&entry.value) {
            Some(lemma) => Some(lemma.to_lowercase()),
            None if table.is_empty() => self
                .rules
                .and_then(|m| m.guess_lemma(&entry.value, |w| self.dict.contains(w))),
            None => None,
        };
        lemma.filter(|l| !l.is_empty() && *l != entry.key())
    }

    /// Consolidate `working` in place of its inflected forms.
    ///
    /// Lemma evidence is gathered from `sources`, which may hold entries the
    /// frequency filters already removed from `working`. Each inflected entry
    /// still in `working` is removed; its lemma either absorbs its evidence
    /// or, when absent, takes the position of the first form removed, unless
    /// `config` would reject the lemma itself.
    ///
    /// The check follows `config.mode`. In exclude mode a new lemma goes in
    /// unless a predicate matches it. In
    /// [`FilterMode::Include`](crate::filter::FilterMode::Include) it goes in
    /// only when it matches an enabled predicate, so an inflected form kept
    /// for a low rank vanishes when its lemma is common.
    pub fn consolidate(
        &self,
        mut working: Vec<WordEntry>,
        sources: &[WordEntry],
        config: &FilterConfig,
    ) -> Vec<WordEntry> {
        let mut pending: Vec<(String, String)> = Vec::new();
        let mut gathered: IndexMap<String, EvidenceList> = IndexMap::new();
        let mut seen = HashSet::new();
        for entry in sources {
            let key = entry.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            let Some(lemma) = self.lemma_of(entry) else {
                continue;
            };
            gathered.entry(lemma.clone()).or_default().merge(&entry.evidence);
            pending.push((key, lemma));
        }
        if pending.is_empty() {
            return working;
        }

        let queries: Vec<String> = gathered.keys().cloned().collect();
        let resolved: HashMap<String, WordEntry> = self
            .dict
            .query_batch(&queries)
            .into_iter()
            .map(|mut lemma| {
                let key = lemma.key();
                lemma.evidence = gathered.get(&key).cloned().unwrap_or_default();
                (key, lemma)
            })
            .collect();
        debug!(
            inflected = pending.len(),
            lemmas = resolved.len(),
            "resolved lemmas"
        );

        // Lowercased keys of `working`, kept index-aligned with it.
        let mut keys: Vec<String> = working.iter().map(WordEntry::key).collect();
        for (key, lemma) in &pending {
            let Some(lemma_entry) = resolved.get(lemma) else {
                continue;
            };
            let Some(idx) = keys.iter().position(|k| k == key) else {
                continue;
            };
            keys.remove(idx);
            let removed = working.remove(idx);
            if let Some(existing) = keys.iter().position(|k| k == lemma) {
                working[existing].evidence.merge(&removed.evidence);
            } else if config.keeps(lemma_entry) {
                keys.insert(idx, lemma.clone());
                working.insert(idx, lemma_entry.clone());
            }
        }
        working
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;
    use wordmine_dict::MemoryDictionary;
    use wordmine_types::{Caption, Evidence, MAX_EVIDENCE, Timestamp};

    fn word(value: &str, inflections: &str, bnc: u32) -> WordEntry {
        let mut e = WordEntry::new(value);
        e.inflections = inflections.to_string();
        e.bnc_rank = bnc;
        e.coca_rank = bnc;
        e
    }

    fn with_line(mut entry: WordEntry, text: &str) -> WordEntry {
        entry.evidence.push(Evidence::Caption(Caption::new(
            Timestamp::from_millis(0),
            Timestamp::from_millis(1),
            text,
        )));
        entry
    }

    fn dictionary() -> MemoryDictionary {
        MemoryDictionary::from_entries([
            word("do", "p:did/d:done/i:doing/3:does", 21),
            word("did", "0:do/1:p", 0),
            word("done", "0:do/1:d", 0),
            word("doing", "0:do/1:i", 0),
            word("does", "0:do/1:3", 0),
            word("dog", "s:dogs", 1500),
            word("cat", "s:cats", 1800),
            word("the", "", 1),
            word("gonna", "0:gon/1:i", 0),
        ])
    }

    fn values(entries: &[WordEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.value.as_str()).collect()
    }

    fn inflected_run() -> Vec<WordEntry> {
        vec![
            word("the", "", 1),
            with_line(word("did", "0:do/1:p", 0), "I did it."),
            word("cat", "s:cats", 1800),
            with_line(word("done", "0:do/1:d", 0), "It is done."),
            with_line(word("doing", "0:do/1:i", 0), "What are you doing?"),
            with_line(word("does", "0:do/1:3", 0), "She does."),
        ]
    }

    #[test]
    fn merges_forms_at_first_position() {
        let dict = dictionary();
        let entries = inflected_run();
        let out = LemmaConsolidator::new(&dict).consolidate(
            entries.clone(),
            &entries,
            &FilterConfig::default(),
        );
        assert_eq!(values(&out), vec!["the", "do", "cat"]);
        let evidence: Vec<&str> = out[1].evidence.iter().map(Evidence::content).collect();
        assert_eq!(evidence, vec!["I did it.", "It is done.", "What are you doing?"]);
        assert_eq!(out[1].evidence.len(), MAX_EVIDENCE);
        assert_eq!(out[1].bnc_rank, 21);
    }

    #[test]
    fn existing_lemma_absorbs_evidence() {
        let dict = dictionary();
        let entries = vec![
            with_line(word("do", "p:did", 21), "Do it."),
            with_line(word("did", "0:do/1:p", 0), "I did it."),
        ];
        let out = LemmaConsolidator::new(&dict).consolidate(
            entries.clone(),
            &entries,
            &FilterConfig::default(),
        );
        assert_eq!(values(&out), vec!["do"]);
        let evidence: Vec<&str> = out[0].evidence.iter().map(Evidence::content).collect();
        assert_eq!(evidence, vec!["Do it.", "I did it."]);
    }

    #[test]
    fn filtered_lemma_is_dropped() {
        let dict = dictionary();
        let entries = inflected_run();
        let config = FilterConfig {
            bnc_below: Some(100),
            ..FilterConfig::default()
        };
        let out = LemmaConsolidator::new(&dict).consolidate(entries.clone(), &entries, &config);
        assert_eq!(values(&out), vec!["the", "cat"]);
    }

    #[test]
    fn include_mode_inserts_only_matching_lemmas() {
        let dict = dictionary();
        let entries = inflected_run();
        let common = FilterConfig {
            mode: FilterMode::Include,
            bnc_below: Some(100),
            ..FilterConfig::default()
        };
        let out = LemmaConsolidator::new(&dict).consolidate(entries.clone(), &entries, &common);
        assert_eq!(values(&out), vec!["the", "do", "cat"]);

        let unranked = FilterConfig {
            mode: FilterMode::Include,
            bnc_zero: true,
            ..FilterConfig::default()
        };
        let out = LemmaConsolidator::new(&dict).consolidate(entries.clone(), &entries, &unranked);
        assert_eq!(values(&out), vec!["the", "cat"]);
    }

    #[test]
    fn mixed_case_forms_fold_into_existing_lemma() {
        let dict = dictionary();
        let entries = vec![
            word("The", "", 1),
            with_line(word("Did", "0:do/1:p", 0), "Did it."),
            with_line(word("Do", "p:did", 21), "Do it."),
            with_line(word("DOES", "0:do/1:3", 0), "DOES IT."),
        ];
        let out = LemmaConsolidator::new(&dict).consolidate(
            entries.clone(),
            &entries,
            &FilterConfig::default(),
        );
        assert_eq!(values(&out), vec!["The", "Do"]);
        let evidence: Vec<&str> = out[1].evidence.iter().map(Evidence::content).collect();
        assert_eq!(evidence, vec!["Do it.", "Did it.", "DOES IT."]);
    }

    #[test]
    fn unknown_lemma_leaves_entry() {
        let dict = dictionary();
        let entries = vec![word("gonna", "0:gon/1:i", 0)];
        let out = LemmaConsolidator::new(&dict).consolidate(
            entries.clone(),
            &entries,
            &FilterConfig::default(),
        );
        assert_eq!(values(&out), vec!["gonna"]);
    }

    #[test]
    fn missing_forms_still_contribute_evidence() {
        let dict = dictionary();
        let sources = inflected_run();
        let working = vec![sources[0].clone(), sources[3].clone()];
        let out = LemmaConsolidator::new(&dict).consolidate(
            working,
            &sources,
            &FilterConfig::default(),
        );
        assert_eq!(values(&out), vec!["the", "do"]);
        assert_eq!(out[1].evidence.iter().next().map(Evidence::content), Some("I did it."));
    }

    #[test]
    fn rule_lemmas_cover_bare_entries() {
        let dict = dictionary();
        let entries = vec![word("dogs", "", 0), word("cats", "", 0)];
        let plain = LemmaConsolidator::new(&dict).consolidate(
            entries.clone(),
            &entries,
            &FilterConfig::default(),
        );
        assert_eq!(values(&plain), vec!["dogs", "cats"]);

        let morphy = Morphy::builtin();
        let ruled = LemmaConsolidator::new(&dict).with_rules(&morphy).consolidate(
            entries.clone(),
            &entries,
            &FilterConfig::default(),
        );
        assert_eq!(values(&ruled), vec!["dog", "cat"]);
    }
}
