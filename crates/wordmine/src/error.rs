use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single extraction run (or of one file inside a batch).
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to extract text from {path}: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("not a valid container: {0}")]
    NotAContainer(String),
    #[error("no subtitle tracks in container")]
    NoSubtitleTracks,
    #[error("subtitle track {track} does not exist ({available} available)")]
    TrackOutOfRange { track: usize, available: usize },
    #[error("unsupported subtitle format: {0}")]
    UnsupportedSubtitleFormat(String),
    #[error("no English subtitles found")]
    NoEnglishTrack,
    #[error("invalid rank range: from {lo} must be below to {hi}")]
    InvalidRange { lo: u32, hi: u32 },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }

    /// Status category recorded for this failure when it happens inside a batch.
    pub fn reason(&self) -> FailureReason {
        match self {
            ExtractError::NotAContainer(_) => FailureReason::NotAContainer,
            ExtractError::NoSubtitleTracks => FailureReason::NoSubtitleTracks,
            ExtractError::NoEnglishTrack => FailureReason::NoEnglishTrack,
            ExtractError::UnsupportedSubtitleFormat(_) => FailureReason::UnsupportedSubtitleFormat,
            ExtractError::Io { .. } => FailureReason::Io,
            ExtractError::UnsupportedDocument(_)
            | ExtractError::Pdf { .. }
            | ExtractError::TrackOutOfRange { .. }
            | ExtractError::InvalidRange { .. }
            | ExtractError::Internal(_) => FailureReason::Internal,
        }
    }
}

/// Why a batch file ended in the error state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NotAContainer,
    NoSubtitleTracks,
    NoEnglishTrack,
    UnsupportedSubtitleFormat,
    Io,
    Internal,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid vocabulary file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
