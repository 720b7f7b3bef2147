use std::path::{Path, PathBuf};
use std::sync::Arc;

use wordmine::{
    BatchEvent, ContainerOpener, ExtractError, Extractor, FailureReason, FileStatus, FilterConfig,
    References, Silent, Source, SubtitleTrack, load_vocabulary, save_vocabulary,
};
use wordmine_dict::MemoryDictionary;
use wordmine_types::{Caption, Evidence, MAX_EVIDENCE, Timestamp, WordEntry};

fn entry(value: &str, rank: u32, inflections: &str) -> WordEntry {
    let mut e = WordEntry::new(value);
    e.bnc_rank = rank;
    e.coca_rank = rank;
    e.inflections = inflections.to_string();
    e
}

fn extractor() -> Extractor {
    let dict = MemoryDictionary::from_entries([
        entry("the", 1, ""),
        entry("river", 2100, "s:rivers"),
        entry("rivers", 0, "0:river/1:s"),
        entry("boat", 3000, "s:boats"),
        entry("night", 600, ""),
        entry("quiet", 2500, ""),
    ]);
    Extractor::new(Arc::new(dict)).with_container_opener(Episodes)
}

/// Serves five episodes; `ep3.mkv` is corrupt and `ep5.mkv` has only a
/// French track.
struct Episodes;

impl ContainerOpener for Episodes {
    fn open(&self, path: &Path) -> Result<Vec<SubtitleTrack>, ExtractError> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let line = |text: &str| {
            Caption::new(Timestamp::from_millis(0), Timestamp::from_millis(1_500), text)
        };
        match name {
            "ep3.mkv" => Err(ExtractError::NotAContainer(name.to_string())),
            "ep5.mkv" => Ok(vec![SubtitleTrack::new(
                1,
                "S_TEXT/UTF8",
                Some("fre".to_string()),
                vec![line("La rivière est très calme ce soir, nous allons rentrer à la maison avec le bateau.")],
            )]),
            _ => Ok(vec![SubtitleTrack::new(
                2,
                "S_TEXT/UTF8",
                Some("eng".to_string()),
                vec![line(&format!("The river was quiet in {name}."))],
            )]),
        }
    }
}

fn values(entries: &[WordEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.value.as_str()).collect()
}

#[test]
fn batch_isolates_failing_files() {
    let paths: Vec<PathBuf> = (1..=5).map(|i| PathBuf::from(format!("ep{i}.mkv"))).collect();
    let extractor = extractor();
    let mut started = 0;
    let mut finished = 0;
    let report = extractor.extract_batch(&paths, &mut |event| match event {
        BatchEvent::Started(_) => started += 1,
        BatchEvent::Finished(..) => finished += 1,
    });

    assert_eq!((started, finished), (5, 5));
    assert_eq!(report.succeeded(), 3);
    assert!(matches!(
        report.status_of(Path::new("ep3.mkv")),
        Some(FileStatus::Error { reason: FailureReason::NotAContainer, .. })
    ));
    assert!(matches!(
        report.status_of(Path::new("ep5.mkv")),
        Some(FileStatus::Error { reason: FailureReason::NoEnglishTrack, .. })
    ));
    assert_eq!(values(&report.entries), vec!["the", "river", "quiet"]);

    let river = &report.entries[1];
    assert_eq!(river.evidence.len(), MAX_EVIDENCE);
    let names: Vec<&str> = river
        .evidence
        .iter()
        .map(|e| match e {
            Evidence::External(ext) => ext.subtitles_name.as_str(),
            Evidence::Caption(_) => panic!("batch evidence must point at a file"),
        })
        .collect();
    assert_eq!(names, vec!["ep1", "ep2", "ep4"]);
}

#[test]
fn subtitle_evidence_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let srt = dir.path().join("night.srt");
    let blocks: String = (1..=5)
        .map(|i| {
            format!("{i}\n00:00:0{i},000 --> 00:00:0{i},900\n- Night {i} on the boat.\n\n")
        })
        .collect();
    std::fs::write(&srt, blocks).unwrap();

    let entries = extractor()
        .extract(&Source::Subtitle { path: srt }, &mut Silent)
        .unwrap();
    assert_eq!(values(&entries), vec!["night", "the", "boat"]);
    for entry in &entries {
        assert_eq!(entry.evidence.len(), MAX_EVIDENCE);
    }
    let first = entries[0].evidence.iter().next().unwrap();
    assert_eq!(first.content(), "Night 1 on the boat.");
    assert_eq!(first.start(), Timestamp::from_millis(1_000));
}

#[test]
fn refine_folds_lemmas_dropped_by_rank() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("log.md");
    std::fs::write(&doc, "Rivers at night. The boat.").unwrap();

    let extractor = extractor();
    let raw = extractor
        .extract(&Source::Document { path: doc }, &mut Silent)
        .unwrap();
    assert_eq!(values(&raw), vec!["rivers", "night", "the", "boat"]);

    let config = FilterConfig {
        bnc_below: Some(1000),
        lemmas: true,
        ..FilterConfig::default()
    };
    let outcome = extractor.refine(raw, &config, &References::default());
    assert_eq!(values(&outcome.entries), vec!["river", "boat"]);
    assert_eq!(outcome.entries[0].bnc_rank, 2100);
}

#[test]
fn saved_vocabulary_works_as_reference() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("a.txt");
    std::fs::write(&doc, "the quiet boat").unwrap();
    let source = Source::Document { path: doc };

    let extractor = extractor();
    let known = source.vocabulary(extractor.extract(&source, &mut Silent).unwrap());
    let known_path = dir.path().join("lists").join("known.json");
    save_vocabulary(&known, &known_path).unwrap();
    assert_eq!(load_vocabulary(&known_path).unwrap(), known);

    let later = dir.path().join("b.txt");
    std::fs::write(&later, "The quiet river at night").unwrap();
    let raw = extractor
        .extract(&Source::Document { path: later }, &mut Silent)
        .unwrap();
    let references = References {
        exclude: vec![known_path],
        include: Vec::new(),
    };
    let outcome = extractor.refine(raw, &FilterConfig::default(), &references);
    assert_eq!(values(&outcome.entries), vec!["river", "night"]);
    assert!(outcome.warnings.is_empty());
}
