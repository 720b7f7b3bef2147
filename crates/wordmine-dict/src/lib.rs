//! Dictionary lookups for the wordmine pipeline.
//!
//! The pipeline only relies on the [`Dictionary`] trait: batch validation of
//! tokens (unknown words are dropped, never reported), an existence check, and
//! rank-range queries for frequency word lists. Two stores implement it:
//!
//! - [`EcdictDictionary`] reads the ECDICT CSV export. The file is indexed
//!   once; text stays in the backing buffer (mmap or owned, picked at runtime
//!   via [`LoadMode`]) until an entry is materialised.
//! - [`MemoryDictionary`] holds prepared [`WordEntry`] values, for tests and
//!   for callers that already have their data in memory.
//!
//! # Example
//! ```no_run
//! use wordmine_dict::{Dictionary, EcdictDictionary, LoadMode};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dict = EcdictDictionary::load_with_mode("/path/to/ecdict.csv", LoadMode::Mmap)?;
//! let found = dict.query_batch(&["ran".to_string(), "qwzx".to_string()]);
//! for entry in found {
//!     println!("{} bnc={} exchange={}", entry.value, entry.bnc_rank, entry.inflections);
//! }
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p wordmine-dict --example stats -- <ecdict.csv>`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;
use wordmine_types::{Corpus, WordEntry};

/// Query contract the extraction pipeline consumes.
///
/// Results are a subset of the input and carry no ordering guarantee;
/// callers re-join them to their tokens by `value`.
pub trait Dictionary: Send + Sync {
    /// Resolve every known word; unknown words are silently dropped.
    fn query_batch(&self, words: &[String]) -> Vec<WordEntry>;

    /// Whether `word` has an entry.
    fn contains(&self, word: &str) -> bool;

    /// Entries with `lo <= rank <= hi` in `corpus`, most common first.
    /// Unranked entries (rank 0) never match.
    fn query_by_rank_range(&self, corpus: Corpus, lo: u32, hi: u32) -> Vec<WordEntry>;
}

/// Strategy for loading the dictionary file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the CSV (fast, zero-copy).
    Mmap,
    /// Read the CSV into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// Column a field is read from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Column {
    Word,
    UsPhone,
    UkPhone,
    Definition,
    Translation,
    Pos,
    Collins,
    Oxford,
    Tag,
    Bnc,
    Frq,
    Exchange,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "word" => Some(Column::Word),
            "phonetic" | "american_phonetic" | "us_phonetic" => Some(Column::UsPhone),
            "british_phonetic" | "uk_phonetic" => Some(Column::UkPhone),
            "definition" => Some(Column::Definition),
            "translation" => Some(Column::Translation),
            "pos" => Some(Column::Pos),
            "collins" => Some(Column::Collins),
            "oxford" => Some(Column::Oxford),
            "tag" => Some(Column::Tag),
            "bnc" => Some(Column::Bnc),
            "frq" => Some(Column::Frq),
            "exchange" => Some(Column::Exchange),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct TextRef {
    start: usize,
    len: usize,
    /// Field was quoted and contains doubled `""` quotes.
    escaped: bool,
}

struct RowData {
    word: TextRef,
    us_phone: TextRef,
    uk_phone: TextRef,
    definition: TextRef,
    translation: TextRef,
    pos: TextRef,
    tag: TextRef,
    exchange: TextRef,
    collins: u8,
    oxford: bool,
    bnc: u32,
    frq: u32,
}

/// ECDICT-backed dictionary indexed by lowercase headword.
pub struct EcdictDictionary {
    buffer: Buffer,
    rows: Vec<RowData>,
    by_word: HashMap<String, usize>,
}

impl EcdictDictionary {
    /// Load an ECDICT CSV export, memory-mapping the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap)
    }

    /// Load choosing between mmap and owned buffers at runtime.
    pub fn load_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("missing dictionary file: {}", path.display());
        }
        let buffer = load_file(path, mode)?;
        let (rows, by_word) = parse_csv(buffer.as_slice())
            .with_context(|| format!("parse dictionary {}", path.display()))?;
        Ok(Self {
            buffer,
            rows,
            by_word,
        })
    }

    /// Number of distinct headwords.
    pub fn len(&self) -> usize {
        self.by_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_word.is_empty()
    }

    /// Iterate over all entries in file order.
    pub fn iter_entries(&self) -> impl Iterator<Item = WordEntry> + '_ {
        self.rows.iter().map(|row| self.make_entry(row))
    }

    fn text(&self, r: TextRef) -> Cow<'_, str> {
        let bytes = self.buffer.as_slice();
        let raw = std::str::from_utf8(&bytes[r.start..r.start + r.len]).unwrap_or_default();
        if r.escaped {
            Cow::Owned(raw.replace("\"\"", "\""))
        } else {
            Cow::Borrowed(raw)
        }
    }

    fn make_entry(&self, row: &RowData) -> WordEntry {
        WordEntry {
            value: self.text(row.word).into_owned(),
            us_phone: self.text(row.us_phone).into_owned(),
            uk_phone: self.text(row.uk_phone).into_owned(),
            definition: unescape_newlines(&self.text(row.definition)),
            translation: unescape_newlines(&self.text(row.translation)),
            pos: self.text(row.pos).into_owned(),
            collins: row.collins,
            oxford: row.oxford,
            tag: self.text(row.tag).into_owned(),
            bnc_rank: row.bnc,
            coca_rank: row.frq,
            inflections: self.text(row.exchange).into_owned(),
            ..WordEntry::default()
        }
    }
}

impl Dictionary for EcdictDictionary {
    fn query_batch(&self, words: &[String]) -> Vec<WordEntry> {
        words
            .iter()
            .filter_map(|w| self.by_word.get(&normalize_word(w)))
            .map(|idx| self.make_entry(&self.rows[*idx]))
            .collect()
    }

    fn contains(&self, word: &str) -> bool {
        self.by_word.contains_key(&normalize_word(word))
    }

    fn query_by_rank_range(&self, corpus: Corpus, lo: u32, hi: u32) -> Vec<WordEntry> {
        let rank_of = |row: &RowData| match corpus {
            Corpus::Bnc => row.bnc,
            Corpus::Coca => row.frq,
        };
        let mut hits: Vec<&RowData> = self
            .rows
            .iter()
            .filter(|row| {
                let rank = rank_of(*row);
                rank != 0 && (lo..=hi).contains(&rank)
            })
            .collect();
        hits.sort_by_key(|row| rank_of(*row));
        hits.into_iter().map(|row| self.make_entry(row)).collect()
    }
}

/// In-memory dictionary keyed by lowercase value.
#[derive(Clone, Debug, Default)]
pub struct MemoryDictionary {
    entries: HashMap<String, WordEntry>,
}

impl MemoryDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = WordEntry>) -> Self {
        let mut dict = Self::new();
        for entry in entries {
            dict.insert(entry);
        }
        dict
    }

    /// Insert or replace an entry. Stored evidence is cleared; the
    /// dictionary only carries lexical data.
    pub fn insert(&mut self, mut entry: WordEntry) {
        entry.evidence = Default::default();
        self.entries.insert(normalize_word(&entry.value), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Dictionary for MemoryDictionary {
    fn query_batch(&self, words: &[String]) -> Vec<WordEntry> {
        words
            .iter()
            .filter_map(|w| self.entries.get(&normalize_word(w)))
            .cloned()
            .collect()
    }

    fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(&normalize_word(word))
    }

    fn query_by_rank_range(&self, corpus: Corpus, lo: u32, hi: u32) -> Vec<WordEntry> {
        let mut hits: Vec<WordEntry> = self
            .entries
            .values()
            .filter(|e| {
                let rank = e.rank(corpus);
                rank != 0 && (lo..=hi).contains(&rank)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.rank(corpus).cmp(&b.rank(corpus)).then(a.value.cmp(&b.value)));
        hits
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

type ParsedRows = (Vec<RowData>, HashMap<String, usize>);

fn parse_csv(bytes: &[u8]) -> Result<ParsedRows> {
    let text = std::str::from_utf8(bytes).context("dictionary is not valid utf8")?;
    let mut lines = text.split('\n').enumerate();

    let columns = loop {
        let Some((lineno, raw)) = lines.next() else {
            anyhow::bail!("dictionary has no header row");
        };
        let line = strip_cr(raw).trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            continue;
        }
        let header = split_record(line)
            .with_context(|| format!("line {}: malformed header", lineno + 1))?;
        break header
            .iter()
            .map(|f| Column::from_header(f.raw))
            .collect::<Vec<_>>();
    };
    if !columns.contains(&Some(Column::Word)) {
        anyhow::bail!("header is missing the `word` column");
    }

    let mut rows = Vec::new();
    let mut by_word = HashMap::new();
    for (lineno, raw) in lines {
        let line = strip_cr(raw);
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(line)
            .with_context(|| format!("line {}: unbalanced quotes", lineno + 1))?;

        let mut word = "";
        let mut row = RowData {
            word: TextRef::default(),
            us_phone: TextRef::default(),
            uk_phone: TextRef::default(),
            definition: TextRef::default(),
            translation: TextRef::default(),
            pos: TextRef::default(),
            tag: TextRef::default(),
            exchange: TextRef::default(),
            collins: 0,
            oxford: false,
            bnc: 0,
            frq: 0,
        };
        for (column, field) in columns.iter().zip(fields.iter()) {
            let Some(column) = column else { continue };
            let r = text_ref(bytes, field);
            match column {
                Column::Word => {
                    row.word = r;
                    word = field.raw;
                }
                Column::UsPhone => {
                    row.us_phone = r;
                    if row.uk_phone.len == 0 {
                        row.uk_phone = r;
                    }
                }
                Column::UkPhone => row.uk_phone = r,
                Column::Definition => row.definition = r,
                Column::Translation => row.translation = r,
                Column::Pos => row.pos = r,
                Column::Tag => row.tag = r,
                Column::Exchange => row.exchange = r,
                Column::Collins => {
                    row.collins = parse_number(field.raw)
                        .with_context(|| format!("line {}: collins", lineno + 1))?
                }
                Column::Oxford => {
                    row.oxford = parse_number::<u8>(field.raw)
                        .with_context(|| format!("line {}: oxford", lineno + 1))?
                        != 0
                }
                Column::Bnc => {
                    row.bnc = parse_number(field.raw)
                        .with_context(|| format!("line {}: bnc", lineno + 1))?
                }
                Column::Frq => {
                    row.frq = parse_number(field.raw)
                        .with_context(|| format!("line {}: frq", lineno + 1))?
                }
            }
        }

        if word.trim().is_empty() {
            continue;
        }
        // First row wins when ECDICT lists the same headword twice.
        by_word.entry(normalize_word(word)).or_insert(rows.len());
        rows.push(row);
    }

    Ok((rows, by_word))
}

struct Field<'a> {
    raw: &'a str,
    escaped: bool,
}

/// Split one CSV record; quoted fields keep their inner slice.
fn split_record(line: &str) -> Result<Vec<Field<'_>>> {
    let bytes = line.as_bytes();
    let mut fields = Vec::new();
    let mut idx = 0;
    loop {
        if bytes.get(idx) == Some(&b'"') {
            let start = idx + 1;
            let mut end = start;
            let mut escaped = false;
            loop {
                match bytes.get(end) {
                    Some(b'"') if bytes.get(end + 1) == Some(&b'"') => {
                        escaped = true;
                        end += 2;
                    }
                    Some(b'"') => break,
                    Some(_) => end += 1,
                    None => anyhow::bail!("unterminated quoted field"),
                }
            }
            fields.push(Field {
                raw: &line[start..end],
                escaped,
            });
            idx = end + 1;
        } else {
            let end = line[idx..].find(',').map_or(line.len(), |off| idx + off);
            fields.push(Field {
                raw: &line[idx..end],
                escaped: false,
            });
            idx = end;
        }

        match bytes.get(idx) {
            Some(b',') => idx += 1,
            None => break,
            Some(_) => anyhow::bail!("unexpected character after quoted field"),
        }
    }
    Ok(fields)
}

fn text_ref(root: &[u8], field: &Field<'_>) -> TextRef {
    TextRef {
        start: field.raw.as_ptr() as usize - root.as_ptr() as usize,
        len: field.raw.len(),
        escaped: field.escaped,
    }
}

fn parse_number<T: std::str::FromStr + Default>(raw: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(T::default());
    }
    Ok(trimmed.parse::<T>()?)
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn normalize_word(text: &str) -> String {
    text.trim().to_lowercase()
}
