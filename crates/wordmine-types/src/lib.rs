//! Shared types for the wordmine extraction pipeline.
//!
//! Everything a run produces is expressed with these types: [`WordEntry`] is
//! the unit of output, [`Evidence`] ties an entry back to the caption it was
//! seen in, and [`Vocabulary`] is the persisted word list handed to study
//! tools. Evidence lives in an [`EvidenceList`], which enforces the
//! three-item cap and de-duplicates by caption text no matter how it is
//! built (pushes, merges or deserialization).
//!
//! ```rust
//! use wordmine_types::{Caption, Evidence, EvidenceList, Timestamp};
//!
//! let mut list = EvidenceList::new();
//! let line = Caption::new(Timestamp::from_millis(0), Timestamp::from_millis(900), "Run!");
//! assert!(list.push(Evidence::Caption(line.clone())));
//! assert!(!list.push(Evidence::Caption(line)));
//! assert_eq!(Timestamp::from_millis(3_723_004).to_string(), "01:02:03,004");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum number of evidence items kept per entry.
pub const MAX_EVIDENCE: usize = 3;

/// Media offset in milliseconds, rendered the way SRT files spell it.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Parse `hh:mm:ss,mmm` (a `.` before the milliseconds is accepted too).
    pub fn parse_srt(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (clock, millis) = raw.split_once([',', '.']).unwrap_or((raw, "0"));
        let mut parts = clock.split(':');
        let hours: u64 = parts.next()?.trim().parse().ok()?;
        let minutes: u64 = parts.next()?.trim().parse().ok()?;
        let seconds: u64 = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
            return None;
        }
        let millis = millis.trim();
        if millis.is_empty() || millis.len() > 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // "5" after the comma means 500 ms, not 5 ms.
        let scale = 10u64.pow(3 - millis.len() as u32);
        let millis: u64 = millis.parse::<u64>().ok()? * scale;
        let secs = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
        secs.checked_mul(1000)?.checked_add(millis).map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0 % 1000;
        let total_secs = self.0 / 1000;
        let secs = total_secs % 60;
        let mins = (total_secs / 60) % 60;
        let hours = total_secs / 3600;
        write!(f, "{hours:02}:{mins:02}:{secs:02},{ms:03}")
    }
}

/// A timed caption line taken from a subtitle source.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub start: Timestamp,
    pub end: Timestamp,
    pub content: String,
}

impl Caption {
    pub fn new(start: Timestamp, end: Timestamp, content: impl Into<String>) -> Self {
        Self {
            start,
            end,
            content: content.into(),
        }
    }
}

/// A caption that points at media the owning vocabulary does not reference.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExternalCaption {
    /// Path of the video the caption was read from.
    pub source_ref: String,
    /// Index of the subtitle track inside that video.
    pub track_id: usize,
    /// Display name of the subtitle set, usually the video's file stem.
    pub subtitles_name: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub content: String,
}

/// Which evidence variant a vocabulary stores.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EvidenceKind {
    Caption,
    External,
}

/// One usage example attached to a word entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Caption(Caption),
    External(ExternalCaption),
}

impl Evidence {
    /// Caption text; the only field that takes part in de-duplication.
    pub fn content(&self) -> &str {
        match self {
            Evidence::Caption(c) => &c.content,
            Evidence::External(c) => &c.content,
        }
    }

    pub fn start(&self) -> Timestamp {
        match self {
            Evidence::Caption(c) => c.start,
            Evidence::External(c) => c.start,
        }
    }

    pub fn end(&self) -> Timestamp {
        match self {
            Evidence::Caption(c) => c.end,
            Evidence::External(c) => c.end,
        }
    }

    pub fn kind(&self) -> EvidenceKind {
        match self {
            Evidence::Caption(_) => EvidenceKind::Caption,
            Evidence::External(_) => EvidenceKind::External,
        }
    }
}

/// Insertion-ordered evidence, capped at [`MAX_EVIDENCE`] and unique by content.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Evidence>", into = "Vec<Evidence>")]
pub struct EvidenceList(Vec<Evidence>);

impl EvidenceList {
    pub fn new() -> Self {
        Self(Vec::with_capacity(MAX_EVIDENCE))
    }

    /// Append unless the list is full or already holds the same content.
    pub fn push(&mut self, evidence: Evidence) -> bool {
        if self.is_full() || self.contains_content(evidence.content()) {
            return false;
        }
        self.0.push(evidence);
        true
    }

    /// Merge another list in order, stopping once the cap is reached.
    pub fn merge(&mut self, other: &EvidenceList) {
        for evidence in &other.0 {
            if self.is_full() {
                break;
            }
            self.push(evidence.clone());
        }
    }

    pub fn contains_content(&self, content: &str) -> bool {
        self.0.iter().any(|e| e.content() == content)
    }

    pub fn is_full(&self) -> bool {
        self.0.len() >= MAX_EVIDENCE
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Evidence> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Evidence] {
        &self.0
    }
}

impl From<Vec<Evidence>> for EvidenceList {
    fn from(items: Vec<Evidence>) -> Self {
        items.into_iter().collect()
    }
}

impl From<EvidenceList> for Vec<Evidence> {
    fn from(list: EvidenceList) -> Self {
        list.0
    }
}

impl FromIterator<Evidence> for EvidenceList {
    fn from_iter<I: IntoIterator<Item = Evidence>>(iter: I) -> Self {
        let mut list = EvidenceList::new();
        for evidence in iter {
            list.push(evidence);
        }
        list
    }
}

impl<'a> IntoIterator for &'a EvidenceList {
    type Item = &'a Evidence;
    type IntoIter = std::slice::Iter<'a, Evidence>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Frequency corpus a rank refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corpus {
    /// British National Corpus.
    Bnc,
    /// Corpus of Contemporary American English.
    Coca,
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Corpus::Bnc => "bnc",
            Corpus::Coca => "coca",
        })
    }
}

impl FromStr for Corpus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bnc" => Ok(Corpus::Bnc),
            "coca" | "frq" => Ok(Corpus::Coca),
            other => Err(format!("unknown corpus: {other}")),
        }
    }
}

/// A dictionary-validated word with its study metadata.
///
/// Ranks use `0` for "not ranked in this corpus"; small positive values are
/// the most common words.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordEntry {
    pub value: String,
    pub us_phone: String,
    pub uk_phone: String,
    pub definition: String,
    pub translation: String,
    pub pos: String,
    pub collins: u8,
    pub oxford: bool,
    pub tag: String,
    pub bnc_rank: u32,
    pub coca_rank: u32,
    /// ECDICT exchange string, e.g. `p:did/d:done/i:doing/3:does/0:do`.
    pub inflections: String,
    pub evidence: EvidenceList,
}

impl WordEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Case-insensitive identity used for de-duplication and set filters.
    pub fn key(&self) -> String {
        self.value.to_lowercase()
    }

    pub fn same_word(&self, other: &WordEntry) -> bool {
        self.value == other.value || self.key() == other.key()
    }

    pub fn rank(&self, corpus: Corpus) -> u32 {
        match corpus {
            Corpus::Bnc => self.bnc_rank,
            Corpus::Coca => self.coca_rank,
        }
    }
}

/// How a vocabulary was produced; decides where its evidence points.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyType {
    /// Documents and merged batch results; evidence references other media.
    #[default]
    Document,
    /// A standalone subtitle file.
    Subtitles,
    /// One subtitle track of a video container.
    Container,
}

impl VocabularyType {
    pub fn evidence_kind(self) -> EvidenceKind {
        match self {
            VocabularyType::Document => EvidenceKind::External,
            VocabularyType::Subtitles | VocabularyType::Container => EvidenceKind::Caption,
        }
    }
}

/// Persisted word list plus the metadata study tools need to replay evidence.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub name: String,
    pub kind: VocabularyType,
    pub language: String,
    pub size: usize,
    pub relate_video_path: String,
    pub subtitles_track_id: usize,
    pub entries: Vec<WordEntry>,
}

impl Vocabulary {
    pub fn new(name: impl Into<String>, kind: VocabularyType, entries: Vec<WordEntry>) -> Self {
        Self {
            name: name.into(),
            kind,
            language: "english".to_string(),
            size: entries.len(),
            relate_video_path: String::new(),
            subtitles_track_id: 0,
            entries,
        }
    }
}

/// Presentation order a consumer may ask for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Appearance,
    Bnc,
    Coca,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "appearance" => Ok(SortOrder::Appearance),
            other => other
                .parse::<Corpus>()
                .map(|corpus| match corpus {
                    Corpus::Bnc => SortOrder::Bnc,
                    Corpus::Coca => SortOrder::Coca,
                })
                .map_err(|_| format!("unknown sort order: {other}")),
        }
    }
}

/// Stable re-sort; unranked entries go last when sorting by a corpus.
pub fn sort_entries(entries: &mut [WordEntry], order: SortOrder) {
    let corpus = match order {
        SortOrder::Appearance => return,
        SortOrder::Bnc => Corpus::Bnc,
        SortOrder::Coca => Corpus::Coca,
    };
    entries.sort_by(|a, b| match (a.rank(corpus), b.rank(corpus)) {
        (0, 0) => Ordering::Equal,
        (0, _) => Ordering::Greater,
        (_, 0) => Ordering::Less,
        (x, y) => x.cmp(&y),
    });
}
