//! Inflection tables and lemma guessing.
//!
//! Two sources of lemmas are supported:
//!
//! 1. [`InflectionTable`]: the ECDICT `exchange` field
//!    (`p:did/d:done/i:doing/3:does`), where an inflected form declares its
//!    lemma with a `0:` pair (`0:do/1:p`).
//! 2. [`Morphy`]: the classic morphy approach for words whose table is silent.
//!    Check exception lists, apply suffix rules, and verify candidates through
//!    a caller-provided existence predicate, so this crate stays ignorant of
//!    any concrete dictionary.
//!
//! # Example
//! ```
//! use wordmine_morph::{InflectionKind, InflectionTable, Morphy};
//!
//! let table = InflectionTable::parse("0:run/1:i");
//! assert_eq!(table.lemma(), Some("run"));
//! assert_eq!(table.lemma_of("running"), Some("run"));
//!
//! let forms = InflectionTable::parse("p:ran/d:run/i:running/3:runs");
//! assert_eq!(forms.forms(InflectionKind::Past), vec!["ran"]);
//!
//! let morph = Morphy::builtin();
//! let guess = morph.guess_lemma("boxes", |w| w == "box");
//! assert_eq!(guess.as_deref(), Some("box"));
//! ```

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Meaning of one `kind:forms` pair in an exchange string.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum InflectionKind {
    /// `p`
    Past,
    /// `d`
    PastParticiple,
    /// `i`
    PresentParticiple,
    /// `3`
    ThirdPerson,
    /// `r`
    Comparative,
    /// `t`
    Superlative,
    /// `s`
    Plural,
    /// `0`: this word is an inflection of the given lemma.
    Lemma,
    /// `1`: which inflections of the lemma this word is (`1:pd`).
    LemmaForms,
}

impl InflectionKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "p" => Some(InflectionKind::Past),
            "d" => Some(InflectionKind::PastParticiple),
            "i" => Some(InflectionKind::PresentParticiple),
            "3" => Some(InflectionKind::ThirdPerson),
            "r" => Some(InflectionKind::Comparative),
            "t" => Some(InflectionKind::Superlative),
            "s" => Some(InflectionKind::Plural),
            "0" => Some(InflectionKind::Lemma),
            "1" => Some(InflectionKind::LemmaForms),
            _ => None,
        }
    }
}

/// Parsed view over an exchange string. Unknown codes are ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InflectionTable<'a> {
    pairs: Vec<(InflectionKind, &'a str)>,
}

impl<'a> InflectionTable<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let pairs = raw
            .split('/')
            .filter_map(|pair| pair.split_once(':'))
            .filter_map(|(code, forms)| {
                let forms = forms.trim();
                if forms.is_empty() {
                    return None;
                }
                InflectionKind::from_code(code.trim()).map(|kind| (kind, forms))
            })
            .collect();
        Self { pairs }
    }

    /// Lemma declared by a `0:` pair, if any.
    pub fn lemma(&self) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(kind, _)| *kind == InflectionKind::Lemma)
            .map(|(_, form)| *form)
    }

    /// Declared lemma, but only when it differs from `value`.
    pub fn lemma_of(&self, value: &str) -> Option<&'a str> {
        self.lemma()
            .filter(|lemma| !lemma.eq_ignore_ascii_case(value.trim()))
    }

    /// All forms listed for `kind`; ECDICT separates alternatives with commas.
    pub fn forms(&self, kind: InflectionKind) -> Vec<&'a str> {
        self.pairs
            .iter()
            .filter(|(k, _)| *k == kind)
            .flat_map(|(_, forms)| forms.split(',').map(str::trim))
            .filter(|f| !f.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Word class a rule or exception list applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum WordClass {
    Noun,
    Verb,
    Adj,
    Adv,
}

const CLASSES: [WordClass; 4] = [
    WordClass::Noun,
    WordClass::Verb,
    WordClass::Adj,
    WordClass::Adv,
];

/// Where a candidate lemma originated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CandidateSource {
    Surface,
    Exception,
    Rule {
        suffix: &'static str,
        replacement: &'static str,
    },
}

/// A lemma candidate paired with its word class and provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LemmaCandidate<'a> {
    pub class: WordClass,
    pub lemma: Cow<'a, str>,
    pub source: CandidateSource,
}

/// Morphy-style lemma guesser parameterised by caller-provided existence checks.
#[derive(Clone, Debug, Default)]
pub struct Morphy {
    exceptions: HashMap<WordClass, HashMap<String, Vec<String>>>,
}

impl Morphy {
    /// Suffix rules only, no exception lists.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load exception lists (`noun.exc`, `verb.exc`, `adj.exc`, `adv.exc`)
    /// from a directory. Missing files are treated as empty.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            exceptions: HashMap::from([
                (WordClass::Noun, load_exc(dir.join("noun.exc"))?),
                (WordClass::Verb, load_exc(dir.join("verb.exc"))?),
                (WordClass::Adj, load_exc(dir.join("adj.exc"))?),
                (WordClass::Adv, load_exc(dir.join("adv.exc"))?),
            ]),
        })
    }

    /// Generate lemma candidates for a surface form across all word classes.
    pub fn lemmas_for<'a, F>(&'a self, surface: &str, exists: F) -> Vec<LemmaCandidate<'a>>
    where
        F: Fn(&str) -> bool,
    {
        let mut seen: HashSet<Cow<'a, str>> = HashSet::new();
        let mut out: Vec<LemmaCandidate<'a>> = Vec::new();
        let norm_surface = normalize(surface);

        for class in CLASSES {
            if exists(&norm_surface) {
                push_unique(
                    &mut out,
                    &mut seen,
                    LemmaCandidate {
                        class,
                        lemma: Cow::Owned(norm_surface.clone()),
                        source: CandidateSource::Surface,
                    },
                );
            }

            // Exceptions: may include multiple lemmas per surface form.
            if let Some(exc_map) = self.exceptions.get(&class)
                && let Some(entries) = exc_map.get(&norm_surface)
            {
                for lemma in entries {
                    if exists(lemma) {
                        push_unique(
                            &mut out,
                            &mut seen,
                            LemmaCandidate {
                                class,
                                lemma: Cow::Borrowed(lemma.as_str()),
                                source: CandidateSource::Exception,
                            },
                        );
                    }
                }
            }

            for (suffix, replacement) in rules_for(class) {
                for candidate in apply_rule(&norm_surface, suffix, replacement) {
                    if !exists(&candidate) {
                        continue;
                    }
                    push_unique(
                        &mut out,
                        &mut seen,
                        LemmaCandidate {
                            class,
                            lemma: Cow::Owned(candidate),
                            source: CandidateSource::Rule {
                                suffix,
                                replacement,
                            },
                        },
                    );
                }
            }
        }

        out
    }

    /// First candidate that is not the surface form itself.
    pub fn guess_lemma<F>(&self, surface: &str, exists: F) -> Option<String>
    where
        F: Fn(&str) -> bool,
    {
        self.lemmas_for(surface, exists)
            .into_iter()
            .find(|c| c.source != CandidateSource::Surface)
            .map(|c| c.lemma.into_owned())
    }
}

fn load_exc(path: PathBuf) -> Result<HashMap<String, Vec<String>>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file =
        File::open(&path).with_context(|| format!("open exception file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut map = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        let mut parts = line.split_whitespace();
        let surface = match parts.next() {
            Some(s) => normalize(s),
            None => continue,
        };
        let lemmas: Vec<String> = parts.map(normalize).collect();
        if !lemmas.is_empty() {
            map.insert(surface, lemmas);
        }
    }
    Ok(map)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace('_', " ")
}

fn push_unique<'a>(
    out: &mut Vec<LemmaCandidate<'a>>,
    seen: &mut HashSet<Cow<'a, str>>,
    candidate: LemmaCandidate<'a>,
) {
    if seen.insert(candidate.lemma.clone()) {
        out.push(candidate);
    }
}

/// Stems produced by one suffix rule, the plain stem first. A doubled final
/// letter ("running" -> "runn") also yields the undoubled stem.
fn apply_rule(surface: &str, suffix: &str, replacement: &str) -> Vec<String> {
    let Some(stem) = surface.strip_suffix(suffix) else {
        return Vec::new();
    };
    if stem.is_empty() {
        return Vec::new();
    }
    let candidate = format!("{stem}{replacement}");

    let mut out = Vec::with_capacity(2);
    if replacement.is_empty() {
        let mut chars = candidate.chars();
        if let (Some(a), Some(b)) = (chars.next_back(), chars.next_back())
            && a == b
        {
            let undoubled = candidate[..candidate.len() - a.len_utf8()].to_string();
            out.push(candidate);
            out.push(undoubled);
            return out;
        }
    }
    out.push(candidate);
    out
}

fn rules_for(class: WordClass) -> &'static [(&'static str, &'static str)] {
    match class {
        WordClass::Noun => &[
            ("s", ""),
            ("ses", "s"),
            ("xes", "x"),
            ("zes", "z"),
            ("ches", "ch"),
            ("shes", "sh"),
            ("men", "man"),
            ("ies", "y"),
        ],
        WordClass::Verb => &[
            ("s", ""),
            ("ies", "y"),
            ("es", "e"),
            ("es", ""),
            ("ed", "e"),
            ("ed", ""),
            ("ing", "e"),
            ("ing", ""),
        ],
        WordClass::Adj | WordClass::Adv => {
            &[("er", ""), ("er", "e"), ("est", ""), ("est", "e")]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fake_exists(words: &[&str]) -> impl Fn(&str) -> bool {
        let set: HashSet<String> = words.iter().map(|w| normalize(w)).collect();
        move |word| set.contains(&normalize(word))
    }

    #[test]
    fn reads_declared_lemma() {
        let table = InflectionTable::parse("0:do/1:p");
        assert_eq!(table.lemma(), Some("do"));
        assert_eq!(table.lemma_of("did"), Some("do"));
        assert_eq!(table.lemma_of("Do"), None);
        assert_eq!(table.forms(InflectionKind::LemmaForms), vec!["p"]);
    }

    #[test]
    fn tolerates_garbage_pairs() {
        let table = InflectionTable::parse("x:foo/s:/p:went,goed//broken");
        assert_eq!(table.lemma(), None);
        assert_eq!(table.forms(InflectionKind::Past), vec!["went", "goed"]);
        assert!(table.forms(InflectionKind::Plural).is_empty());
        assert!(InflectionTable::parse("").is_empty());
    }

    #[test]
    fn uses_exceptions_and_rules() {
        let mut morph = Morphy::builtin();
        morph.exceptions.insert(
            WordClass::Noun,
            HashMap::from([("children".into(), vec!["child".into()])]),
        );

        let candidates = morph.lemmas_for("children", fake_exists(&["child"]));
        assert_eq!(candidates.len(), 1);
        assert!(matches!(candidates[0].source, CandidateSource::Exception));
        assert_eq!(candidates[0].lemma, "child");
    }

    #[test]
    fn guess_skips_surface_form() {
        let morph = Morphy::builtin();
        let exists = fake_exists(&["running", "run"]);
        let candidates = morph.lemmas_for("running", &exists);
        assert!(matches!(candidates[0].source, CandidateSource::Surface));
        assert_eq!(morph.guess_lemma("running", &exists).as_deref(), Some("run"));
        assert_eq!(morph.guess_lemma("run", fake_exists(&["run"])), None);
    }

    #[test]
    fn plain_stem_beats_undoubled_stem() {
        let morph = Morphy::builtin();
        let exists = fake_exists(&["fall", "add", "ad", "call", "kiss", "run"]);
        assert_eq!(morph.guess_lemma("falling", &exists).as_deref(), Some("fall"));
        assert_eq!(morph.guess_lemma("added", &exists).as_deref(), Some("add"));
        assert_eq!(morph.guess_lemma("called", &exists).as_deref(), Some("call"));
        assert_eq!(morph.guess_lemma("kissed", &exists).as_deref(), Some("kiss"));
        assert_eq!(morph.guess_lemma("running", &exists).as_deref(), Some("run"));
    }

    #[test]
    fn loads_exception_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut verb = File::create(dir.path().join("verb.exc")).unwrap();
        writeln!(verb, "went go").unwrap();
        writeln!(verb).unwrap();
        let morph = Morphy::load(dir.path()).unwrap();
        assert_eq!(morph.guess_lemma("went", fake_exists(&["go"])).as_deref(), Some("go"));
    }
}
