use whatlang::Lang;

use crate::container::SubtitleTrack;

/// Captions sampled from a track whose language tag is missing or foreign.
pub const SAMPLE_CAPTIONS: usize = 10;

const ENGLISH_TAGS: [&str; 4] = ["en", "eng", "en-us", "en-gb"];

/// Decides whether a text sample is English.
pub trait LanguageDetector: Send + Sync {
    fn is_english(&self, sample: &str) -> bool;
}

/// Trigram detector backed by `whatlang`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn is_english(&self, sample: &str) -> bool {
        whatlang::detect(sample).is_some_and(|info| info.lang() == Lang::Eng)
    }
}

pub fn is_english_tag(tag: &str) -> bool {
    ENGLISH_TAGS.contains(&tag.trim().to_ascii_lowercase().as_str())
}

/// Index of the first English track: a declared tag wins, otherwise the
/// detector looks at the first [`SAMPLE_CAPTIONS`] captions.
pub fn find_english_track(tracks: &[SubtitleTrack], detector: &dyn LanguageDetector) -> Option<usize> {
    tracks.iter().position(|track| {
        if track.language.as_deref().is_some_and(is_english_tag) {
            return true;
        }
        let Ok(captions) = track.captions() else {
            return false;
        };
        let sample: Vec<&str> = captions
            .iter()
            .take(SAMPLE_CAPTIONS)
            .map(|c| c.content.as_str())
            .collect();
        !sample.is_empty() && detector.is_english(&sample.join("\n"))
    })
}
