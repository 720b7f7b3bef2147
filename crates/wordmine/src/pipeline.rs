//! The extraction pipeline.
//!
//! A run reads one source into an [`EvidenceAggregator`], joins its tokens
//! against the dictionary (unknown tokens vanish silently) and hands back
//! entries in first-appearance order. [`Extractor::refine`] then runs the
//! filter chain: frequency filters, lemma consolidation and reference
//! vocabularies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wordmine_dict::Dictionary;
use wordmine_morph::Morphy;
use wordmine_types::{Corpus, Evidence, Vocabulary, VocabularyType, WordEntry};

use crate::batch::{BatchEvent, BatchReader, BatchReport};
use crate::container::{ContainerOpener, MatroskaOpener, select_track};
use crate::document::{aggregate_document, read_document_text};
use crate::error::ExtractError;
use crate::evidence::EvidenceAggregator;
use crate::filter::{FilterConfig, FilterMode, apply_filters};
use crate::language::{LanguageDetector, WhatlangDetector};
use crate::lemma::LemmaConsolidator;
use crate::progress::Progress;
use crate::reference::{self, ReferenceOutcome};
use crate::subtitle::{aggregate_captions, read_srt};

/// Reference vocabularies applied at the end of [`Extractor::refine`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct References {
    /// Words in these vocabularies are removed.
    pub exclude: Vec<PathBuf>,
    /// When non-empty, only words in one of these vocabularies are kept.
    pub include: Vec<PathBuf>,
}

/// A single extraction input.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    Document {
        path: PathBuf,
    },
    Subtitle {
        path: PathBuf,
    },
    Container {
        path: PathBuf,
        #[serde(default)]
        track: usize,
    },
}

impl Source {
    pub fn path(&self) -> &Path {
        match self {
            Source::Document { path } | Source::Subtitle { path } | Source::Container { path, .. } => {
                path
            }
        }
    }

    pub fn vocabulary_type(&self) -> VocabularyType {
        match self {
            Source::Document { .. } => VocabularyType::Document,
            Source::Subtitle { .. } => VocabularyType::Subtitles,
            Source::Container { .. } => VocabularyType::Container,
        }
    }

    /// Wrap `entries` extracted from this source into a named vocabulary.
    pub fn vocabulary(&self, entries: Vec<WordEntry>) -> Vocabulary {
        let name = self
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut vocab = Vocabulary::new(name, self.vocabulary_type(), entries);
        if let Source::Container { path, track } = self {
            vocab.relate_video_path = path.display().to_string();
            vocab.subtitles_track_id = *track;
        }
        vocab
    }
}

pub struct Extractor {
    dict: Arc<dyn Dictionary>,
    opener: Box<dyn ContainerOpener>,
    detector: Box<dyn LanguageDetector>,
    morphy: Morphy,
}

impl Extractor {
    /// Matroska containers, `whatlang` detection and built-in suffix rules.
    pub fn new(dict: Arc<dyn Dictionary>) -> Self {
        Self {
            dict,
            opener: Box::new(MatroskaOpener),
            detector: Box::new(WhatlangDetector),
            morphy: Morphy::builtin(),
        }
    }

    pub fn with_container_opener(mut self, opener: impl ContainerOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn with_language_detector(mut self, detector: impl LanguageDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    /// Exception lists used when rule-based lemmas are switched on.
    pub fn with_morphy(mut self, morphy: Morphy) -> Self {
        self.morphy = morphy;
        self
    }

    pub fn dictionary(&self) -> &dyn Dictionary {
        self.dict.as_ref()
    }

    pub fn extract(
        &self,
        source: &Source,
        progress: &mut dyn Progress,
    ) -> Result<Vec<WordEntry>, ExtractError> {
        match source {
            Source::Document { path } => self.extract_from_document(path, progress),
            Source::Subtitle { path } => self.extract_from_subtitle(path, progress),
            Source::Container { path, track } => {
                self.extract_from_single_container(path, *track, progress)
            }
        }
    }

    pub fn extract_from_document(
        &self,
        path: &Path,
        progress: &mut dyn Progress,
    ) -> Result<Vec<WordEntry>, ExtractError> {
        let started = Instant::now();
        progress.report("loading document");
        let text = read_document_text(path)?;
        progress.report("tokenizing");
        let aggregator = aggregate_document(&text);
        let entries = self.lookup(aggregator, progress);
        info!(
            file = %path.display(),
            words = entries.len(),
            "document extracted in {} ms",
            started.elapsed().as_millis()
        );
        Ok(entries)
    }

    pub fn extract_from_subtitle(
        &self,
        path: &Path,
        progress: &mut dyn Progress,
    ) -> Result<Vec<WordEntry>, ExtractError> {
        let started = Instant::now();
        progress.report("parsing subtitle file");
        let captions = read_srt(path)?;
        progress.report("tokenizing");
        let aggregator = aggregate_captions(&captions, |c| Evidence::Caption(c.clone()));
        let entries = self.lookup(aggregator, progress);
        info!(
            file = %path.display(),
            captions = captions.len(),
            words = entries.len(),
            "subtitles extracted in {} ms",
            started.elapsed().as_millis()
        );
        Ok(entries)
    }

    /// Extract from the `track_id`-th subtitle track of a container.
    pub fn extract_from_single_container(
        &self,
        path: &Path,
        track_id: usize,
        progress: &mut dyn Progress,
    ) -> Result<Vec<WordEntry>, ExtractError> {
        let started = Instant::now();
        progress.report("parsing container");
        let tracks = self.opener.open(path)?;
        let captions = select_track(&tracks, track_id)?.captions()?;
        progress.report("tokenizing");
        let aggregator = aggregate_captions(captions, |c| Evidence::Caption(c.clone()));
        let entries = self.lookup(aggregator, progress);
        info!(
            file = %path.display(),
            track = track_id,
            words = entries.len(),
            "container extracted in {} ms",
            started.elapsed().as_millis()
        );
        Ok(entries)
    }

    /// Extract from many containers. Never fails as a whole; per-file
    /// failures are reported in [`BatchReport::statuses`].
    pub fn extract_batch(
        &self,
        paths: &[PathBuf],
        observer: &mut dyn FnMut(BatchEvent<'_>),
    ) -> BatchReport {
        let started = Instant::now();
        let reader = BatchReader {
            opener: self.opener.as_ref(),
            detector: self.detector.as_ref(),
        };
        let (aggregator, statuses) = reader.run(paths, observer);
        let entries = self.lookup(aggregator, &mut |_: &str| {});
        let report = BatchReport { entries, statuses };
        info!(
            files = paths.len(),
            succeeded = report.succeeded(),
            words = report.entries.len(),
            "batch finished in {} ms",
            started.elapsed().as_millis()
        );
        report
    }

    pub fn apply_filters(&self, entries: Vec<WordEntry>, config: &FilterConfig) -> Vec<WordEntry> {
        apply_filters(entries, config)
    }

    /// Fold inflected entries into their lemma, using `entries` both as the
    /// working list and as the evidence source.
    pub fn consolidate_lemmas(&self, entries: Vec<WordEntry>, config: &FilterConfig) -> Vec<WordEntry> {
        let sources = entries.clone();
        self.consolidator(config).consolidate(entries, &sources, config)
    }

    pub fn filter_against_references(
        &self,
        entries: Vec<WordEntry>,
        files: &[PathBuf],
    ) -> ReferenceOutcome {
        reference::filter_against_references(entries, files)
    }

    /// Full filter chain over freshly extracted entries.
    pub fn refine(
        &self,
        raw: Vec<WordEntry>,
        config: &FilterConfig,
        references: &References,
    ) -> ReferenceOutcome {
        let filtered = apply_filters(raw.clone(), config);
        debug!(before = raw.len(), after = filtered.len(), "frequency filters applied");

        let consolidated = if config.lemmas {
            // Include mode only harvests evidence from entries it kept.
            let sources = match config.mode {
                FilterMode::Exclude => raw,
                FilterMode::Include => filtered.clone(),
            };
            self.consolidator(config)
                .consolidate(filtered, &sources, config)
        } else {
            filtered
        };

        let mut outcome = reference::filter_against_references(consolidated, &references.exclude);
        if !references.include.is_empty() {
            let included = reference::include_references(outcome.entries, &references.include);
            outcome.entries = included.entries;
            outcome.warnings.extend(included.warnings);
        }
        outcome
    }

    fn consolidator(&self, config: &FilterConfig) -> LemmaConsolidator<'_> {
        let consolidator = LemmaConsolidator::new(self.dict.as_ref());
        if config.rule_lemmas {
            consolidator.with_rules(&self.morphy)
        } else {
            consolidator
        }
    }

    /// Join aggregated tokens against the dictionary, in token order.
    fn lookup(&self, mut aggregator: EvidenceAggregator, progress: &mut dyn Progress) -> Vec<WordEntry> {
        let tokens: Vec<String> = aggregator.tokens().map(str::to_string).collect();
        progress.report(&format!(
            "extracted {} words, looking them up in the dictionary",
            tokens.len()
        ));
        let mut found: HashMap<String, WordEntry> = self
            .dict
            .query_batch(&tokens)
            .into_iter()
            .map(|e| (e.key(), e))
            .collect();
        let entries: Vec<WordEntry> = tokens
            .iter()
            .filter_map(|token| {
                let mut entry = found.remove(token)?;
                entry.evidence = aggregator.take_evidence(token).unwrap_or_default();
                Some(entry)
            })
            .collect();
        progress.report(&format!("{} valid words", entries.len()));
        entries
    }
}

/// A word list of every dictionary entry ranked `lo..=hi` in `corpus`.
pub fn frequency_vocabulary(
    dict: &dyn Dictionary,
    corpus: Corpus,
    lo: u32,
    hi: u32,
) -> Result<Vocabulary, ExtractError> {
    if lo >= hi {
        return Err(ExtractError::InvalidRange { lo, hi });
    }
    let entries = dict.query_by_rank_range(corpus, lo, hi);
    Ok(Vocabulary::new(
        format!("{corpus}-{lo}-{hi}"),
        VocabularyType::Document,
        entries,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Silent;
    use wordmine_dict::MemoryDictionary;

    fn dict() -> Arc<dyn Dictionary> {
        let words = [("the", 1), ("dog", 1500), ("ran", 900), ("cat", 1800)];
        Arc::new(MemoryDictionary::from_entries(words.iter().map(|(w, r)| {
            let mut e = WordEntry::new(*w);
            e.bnc_rank = *r;
            e.coca_rank = *r;
            e
        })))
    }

    #[test]
    fn lookup_keeps_first_appearance_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        std::fs::write(&path, "The dog ran. The cat ran. Blorf!").unwrap();
        let extractor = Extractor::new(dict());
        let mut lines = Vec::new();
        let entries = extractor
            .extract_from_document(&path, &mut |m: &str| lines.push(m.to_string()))
            .unwrap();
        let values: Vec<&str> = entries.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["the", "dog", "ran", "cat"]);
        assert!(lines.iter().any(|l| l == "4 valid words"));
    }

    #[test]
    fn frequency_vocabulary_checks_range() {
        let dict = dict();
        assert!(matches!(
            frequency_vocabulary(dict.as_ref(), Corpus::Bnc, 10, 10),
            Err(ExtractError::InvalidRange { lo: 10, hi: 10 })
        ));
        let vocab = frequency_vocabulary(dict.as_ref(), Corpus::Bnc, 1, 1000).unwrap();
        let values: Vec<&str> = vocab.entries.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["the", "ran"]);
        assert_eq!(vocab.name, "bnc-1-1000");
        assert_eq!(vocab.size, 2);
    }

    #[test]
    fn container_vocabulary_remembers_track() {
        let source = Source::Container {
            path: PathBuf::from("/media/Pilot.mkv"),
            track: 2,
        };
        let vocab = source.vocabulary(Vec::new());
        assert_eq!(vocab.name, "Pilot");
        assert_eq!(vocab.kind, VocabularyType::Container);
        assert_eq!(vocab.subtitles_track_id, 2);
        assert_eq!(vocab.relate_video_path, "/media/Pilot.mkv");
    }

    #[test]
    fn unsupported_document_is_fatal() {
        let extractor = Extractor::new(dict());
        let err = extractor
            .extract_from_document(Path::new("deck.pptx"), &mut Silent)
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedDocument(_)));
    }
}
