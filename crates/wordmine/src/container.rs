//! Subtitle tracks embedded in Matroska containers.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use matroska_demuxer::{Frame, MatroskaFile, TrackType};
use tracing::debug;
use wordmine_types::{Caption, Timestamp};

use crate::error::ExtractError;
use crate::subtitle::{ass_event_text, clean_caption};

/// How a subtitle track stores its events.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubtitleFormat {
    /// `S_TEXT/UTF8`: plain text payloads.
    Text,
    /// `S_TEXT/ASS`, `S_TEXT/SSA` and their legacy ids: event lines.
    Ass,
    /// Bitmap or otherwise undecodable tracks (VobSub, PGS, ...).
    Unsupported,
}

impl SubtitleFormat {
    pub fn from_codec(codec_id: &str) -> Self {
        match codec_id {
            "S_TEXT/UTF8" | "S_TEXT/ASCII" => SubtitleFormat::Text,
            "S_TEXT/ASS" | "S_TEXT/SSA" | "S_ASS" | "S_SSA" => SubtitleFormat::Ass,
            _ => SubtitleFormat::Unsupported,
        }
    }
}

/// One subtitle track, fully read.
#[derive(Clone, Debug)]
pub struct SubtitleTrack {
    pub number: u64,
    pub codec_id: String,
    pub language: Option<String>,
    pub name: Option<String>,
    pub format: SubtitleFormat,
    captions: Vec<Caption>,
}

impl SubtitleTrack {
    pub fn new(
        number: u64,
        codec_id: impl Into<String>,
        language: Option<String>,
        captions: Vec<Caption>,
    ) -> Self {
        let codec_id = codec_id.into();
        Self {
            number,
            format: SubtitleFormat::from_codec(&codec_id),
            codec_id,
            language,
            name: None,
            captions,
        }
    }

    /// Cleaned captions in presentation order.
    pub fn captions(&self) -> Result<&[Caption], ExtractError> {
        match self.format {
            SubtitleFormat::Unsupported => Err(ExtractError::UnsupportedSubtitleFormat(
                self.codec_id.clone(),
            )),
            SubtitleFormat::Text | SubtitleFormat::Ass => Ok(&self.captions),
        }
    }
}

/// Source of subtitle tracks for a container file.
///
/// Implementations read everything they need and release the file before
/// returning, on success and on every error path.
pub trait ContainerOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Vec<SubtitleTrack>, ExtractError>;
}

/// Pick the subtitle track at `track_id` (index among subtitle tracks).
pub fn select_track(tracks: &[SubtitleTrack], track_id: usize) -> Result<&SubtitleTrack, ExtractError> {
    if tracks.is_empty() {
        return Err(ExtractError::NoSubtitleTracks);
    }
    tracks.get(track_id).ok_or(ExtractError::TrackOutOfRange {
        track: track_id,
        available: tracks.len(),
    })
}

/// [`ContainerOpener`] for Matroska/WebM files.
#[derive(Clone, Copy, Debug, Default)]
pub struct MatroskaOpener;

impl ContainerOpener for MatroskaOpener {
    fn open(&self, path: &Path) -> Result<Vec<SubtitleTrack>, ExtractError> {
        let file = File::open(path).map_err(|e| ExtractError::io(path, e))?;
        let mut mkv = MatroskaFile::open(file)
            .map_err(|e| ExtractError::NotAContainer(format!("{}: {e}", path.display())))?;

        let mut tracks: Vec<SubtitleTrack> = mkv
            .tracks()
            .iter()
            .filter(|t| t.track_type() == TrackType::Subtitle)
            .map(|t| SubtitleTrack {
                number: t.track_number().get(),
                codec_id: t.codec_id().to_string(),
                language: t.language().map(str::to_string),
                name: t.name().map(str::to_string),
                format: SubtitleFormat::from_codec(t.codec_id()),
                captions: Vec::new(),
            })
            .collect();
        if tracks.is_empty() {
            return Ok(tracks);
        }

        let scale = mkv.info().timestamp_scale().get();
        let by_number: HashMap<u64, usize> = tracks
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.number, idx))
            .collect();
        let mut events: Vec<Vec<(u64, String)>> = vec![Vec::new(); tracks.len()];

        let mut frame = Frame::default();
        while mkv
            .next_frame(&mut frame)
            .map_err(|e| ExtractError::NotAContainer(format!("{}: {e}", path.display())))?
        {
            let Some(&idx) = by_number.get(&frame.track) else {
                continue;
            };
            let payload = String::from_utf8_lossy(&frame.data);
            let text = match tracks[idx].format {
                SubtitleFormat::Text => clean_caption(&payload),
                SubtitleFormat::Ass => clean_caption(ass_event_text(&payload)),
                SubtitleFormat::Unsupported => continue,
            };
            let millis = frame.timestamp.saturating_mul(scale) / 1_000_000;
            events[idx].push((millis, text));
        }

        for (track, mut lines) in tracks.iter_mut().zip(events) {
            lines.sort_by_key(|(start, _)| *start);
            track.captions = to_captions(lines);
            debug!(
                track = track.number,
                captions = track.captions.len(),
                "read subtitle track"
            );
        }
        Ok(tracks)
    }
}

// Blocks carry no reliable duration here, so each caption ends where the next begins.
fn to_captions(lines: Vec<(u64, String)>) -> Vec<Caption> {
    let starts: Vec<u64> = lines.iter().map(|(start, _)| *start).collect();
    lines
        .into_iter()
        .enumerate()
        .filter(|(_, (_, text))| !text.is_empty())
        .map(|(i, (start, text))| {
            let end = starts.get(i + 1).copied().unwrap_or(start).max(start);
            Caption::new(Timestamp::from_millis(start), Timestamp::from_millis(end), text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_codecs() {
        assert_eq!(SubtitleFormat::from_codec("S_TEXT/UTF8"), SubtitleFormat::Text);
        assert_eq!(SubtitleFormat::from_codec("S_TEXT/ASS"), SubtitleFormat::Ass);
        assert_eq!(SubtitleFormat::from_codec("S_HDMV/PGS"), SubtitleFormat::Unsupported);
    }

    #[test]
    fn selects_tracks_by_index() {
        assert!(matches!(select_track(&[], 0), Err(ExtractError::NoSubtitleTracks)));
        let tracks = vec![SubtitleTrack::new(3, "S_VOBSUB", None, Vec::new())];
        assert!(matches!(
            select_track(&tracks, 1),
            Err(ExtractError::TrackOutOfRange { track: 1, available: 1 })
        ));
        let track = select_track(&tracks, 0).unwrap();
        assert!(matches!(
            track.captions(),
            Err(ExtractError::UnsupportedSubtitleFormat(codec)) if codec == "S_VOBSUB"
        ));
    }

    #[test]
    fn rejects_non_matroska_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        std::fs::write(&path, b"definitely not EBML").unwrap();
        assert!(matches!(
            MatroskaOpener.open(&path),
            Err(ExtractError::NotAContainer(_))
        ));
        assert!(matches!(
            MatroskaOpener.open(&dir.path().join("missing.mkv")),
            Err(ExtractError::Io { .. })
        ));
    }

    #[test]
    fn captions_end_at_next_start() {
        let captions = to_captions(vec![
            (1_000, "first".into()),
            (2_500, String::new()),
            (4_000, "last".into()),
        ]);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].end.as_millis(), 2_500);
        assert_eq!(captions[1].end.as_millis(), 4_000);
    }
}
