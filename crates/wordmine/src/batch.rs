//! Batch extraction over many Matroska files.
//!
//! Files are processed one after another. Each file ends either in
//! [`FileStatus::Success`] or [`FileStatus::Error`]; a failing file never
//! stops the batch and contributes no evidence. Evidence from successful files
//! is folded into one aggregator, so the per-word cap applies across the whole
//! batch.

use std::panic::{self, AssertUnwindSafe};
use std::path::{self as stdpath, Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use wordmine_types::{Evidence, ExternalCaption, WordEntry};

use crate::container::ContainerOpener;
use crate::error::{ExtractError, FailureReason};
use crate::evidence::EvidenceAggregator;
use crate::language::{LanguageDetector, find_english_track};
use crate::subtitle::aggregate_captions;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Success,
    Error {
        reason: FailureReason,
        message: String,
    },
}

impl FileStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FileStatus::Success)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FileState {
    pub file: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Progress notifications emitted while a batch runs.
#[derive(Clone, Copy, Debug)]
pub enum BatchEvent<'a> {
    Started(&'a Path),
    Finished(&'a Path, &'a FileStatus),
}

/// Result of a batch run: enriched entries and one status per input file,
/// in input order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    pub entries: Vec<WordEntry>,
    pub statuses: Vec<FileState>,
}

impl BatchReport {
    pub fn status_of(&self, file: &Path) -> Option<&FileStatus> {
        self.statuses
            .iter()
            .find(|s| s.file == file)
            .map(|s| &s.status)
    }

    pub fn succeeded(&self) -> usize {
        self.statuses.iter().filter(|s| s.status.is_success()).count()
    }
}

pub(crate) struct BatchReader<'a> {
    pub opener: &'a dyn ContainerOpener,
    pub detector: &'a dyn LanguageDetector,
}

impl BatchReader<'_> {
    /// Evidence from the English track of one file.
    pub fn read_file(&self, path: &Path) -> Result<EvidenceAggregator, ExtractError> {
        let tracks = self.opener.open(path)?;
        if tracks.is_empty() {
            return Err(ExtractError::NoSubtitleTracks);
        }
        let track_id =
            find_english_track(&tracks, self.detector).ok_or(ExtractError::NoEnglishTrack)?;
        let captions = tracks[track_id].captions()?;

        let source_ref = stdpath::absolute(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();
        let subtitles_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(aggregate_captions(captions, |c| {
            Evidence::External(ExternalCaption {
                source_ref: source_ref.clone(),
                track_id,
                subtitles_name: subtitles_name.clone(),
                start: c.start,
                end: c.end,
                content: c.content.clone(),
            })
        }))
    }

    pub fn run(
        &self,
        paths: &[PathBuf],
        observer: &mut dyn FnMut(BatchEvent<'_>),
    ) -> (EvidenceAggregator, Vec<FileState>) {
        let mut statuses: Vec<FileState> = paths
            .iter()
            .map(|p| FileState {
                file: p.clone(),
                status: FileStatus::Pending,
            })
            .collect();
        let mut merged = EvidenceAggregator::new();

        for (path, state) in paths.iter().zip(statuses.iter_mut()) {
            observer(BatchEvent::Started(path));
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.read_file(path)))
                .unwrap_or_else(|_| Err(ExtractError::Internal("reader panicked".to_string())));
            state.status = match outcome {
                Ok(aggregator) => {
                    info!(file = %path.display(), words = aggregator.len(), "read batch file");
                    merged.absorb(aggregator);
                    FileStatus::Success
                }
                Err(err) => {
                    warn!(file = %path.display(), "batch file failed: {err}");
                    FileStatus::Error {
                        reason: err.reason(),
                        message: err.to_string(),
                    }
                }
            };
            observer(BatchEvent::Finished(path, &state.status));
        }
        (merged, statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SubtitleTrack;
    use crate::language::WhatlangDetector;
    use wordmine_types::{Caption, Timestamp};

    struct OneTrack(Option<&'static str>, &'static str);

    impl ContainerOpener for OneTrack {
        fn open(&self, _path: &Path) -> Result<Vec<SubtitleTrack>, ExtractError> {
            let caption = Caption::new(
                Timestamp::from_millis(0),
                Timestamp::from_millis(1_000),
                "Where are you going tonight, my friend?",
            );
            Ok(vec![SubtitleTrack::new(
                1,
                self.1,
                self.0.map(str::to_string),
                vec![caption],
            )])
        }
    }

    #[test]
    fn external_evidence_points_at_file() {
        let opener = OneTrack(Some("eng"), "S_TEXT/UTF8");
        let reader = BatchReader {
            opener: &opener,
            detector: &WhatlangDetector,
        };
        let agg = reader.read_file(Path::new("/videos/Pilot.mkv")).unwrap();
        let Some(Evidence::External(ext)) = agg.evidence("going").unwrap().iter().next() else {
            panic!("expected external evidence");
        };
        assert_eq!(ext.subtitles_name, "Pilot");
        assert_eq!(ext.track_id, 0);
        assert!(ext.source_ref.ends_with("Pilot.mkv"));
    }

    #[test]
    fn unsupported_english_track_fails_the_file() {
        let opener = OneTrack(Some("en"), "S_HDMV/PGS");
        let reader = BatchReader {
            opener: &opener,
            detector: &WhatlangDetector,
        };
        let mut events = Vec::new();
        let (merged, statuses) = reader.run(&[PathBuf::from("a.mkv")], &mut |event| {
            events.push(matches!(event, BatchEvent::Started(_)));
        });
        assert!(merged.is_empty());
        assert_eq!(events, vec![true, false]);
        assert!(matches!(
            &statuses[0].status,
            FileStatus::Error { reason: FailureReason::UnsupportedSubtitleFormat, .. }
        ));
    }

    #[test]
    fn status_serializes_flat() {
        let state = FileState {
            file: PathBuf::from("x.mkv"),
            status: FileStatus::Error {
                reason: FailureReason::NoEnglishTrack,
                message: "no English subtitles found".into(),
            },
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["reason"], "no_english_track");
        assert_eq!(json["file"], "x.mkv");
    }
}
