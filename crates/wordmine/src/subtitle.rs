//! Subtitle parsing and caption cleaning.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use wordmine_types::{Caption, Evidence, Timestamp};

use crate::encoding;
use crate::error::ExtractError;
use crate::evidence::EvidenceAggregator;
use crate::tokenize::tokenize;

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"(?i)<br\s*/?>|\\[Nn]").expect("line break pattern");
    static ref MARKUP: Regex = Regex::new(r"</?[A-Za-z][^<>]*>").expect("markup pattern");
    static ref POSITION: Regex = Regex::new(r"\{[^}]*\}").expect("position pattern");
}

/// Read an SRT file (any encoding) into cleaned captions ordered by start time.
pub fn read_srt(path: &Path) -> Result<Vec<Caption>, ExtractError> {
    let text = encoding::read_text(path)?;
    Ok(parse_srt(&text)
        .into_iter()
        .map(|c| Caption::new(c.start, c.end, clean_caption(&c.content)))
        .collect())
}

/// Parse SRT text. Blocks without a valid timing line are skipped.
pub fn parse_srt(text: &str) -> Vec<Caption> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut captions = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for line in normalized.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if let Some(caption) = parse_block(&block) {
                captions.push(caption);
            }
            block.clear();
        } else {
            block.push(line);
        }
    }
    captions.sort_by_key(|c| c.start);
    captions
}

fn parse_block(lines: &[&str]) -> Option<Caption> {
    let timing_idx = lines.iter().take(2).position(|l| l.contains("-->"))?;
    let (start, end) = lines[timing_idx].split_once("-->")?;
    let start = Timestamp::parse_srt(start)?;
    // Some files append position hints after the end time.
    let end = Timestamp::parse_srt(end.split_whitespace().next()?)?;
    let content = lines[timing_idx + 1..].join("\n");
    Some(Caption::new(start, end, content))
}

/// Strip styling and positioning markup from caption text.
///
/// Removes a leading dialogue dash on every line, `<i>`/`<b>`/`<font>` style
/// tags and `{...}` override blocks, and turns `<br />` and ASS `\N` breaks
/// into newlines.
pub fn clean_caption(raw: &str) -> String {
    let text = LINE_BREAK.replace_all(raw, "\n");
    let text = MARKUP.replace_all(&text, "");
    let text = POSITION.replace_all(&text, "");
    let text = text.replace("\\h", " ");
    text.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('-').unwrap_or(line).trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dialogue text of an SSA/ASS event as stored in Matroska blocks
/// (`ReadOrder,Layer,Style,Name,MarginL,MarginR,MarginV,Effect,Text`).
pub fn ass_event_text(payload: &str) -> &str {
    payload.splitn(9, ',').nth(8).unwrap_or(payload)
}

/// Tokenize captions, recording each one as evidence for its tokens.
pub fn aggregate_captions<'a, I, F>(captions: I, mut to_evidence: F) -> EvidenceAggregator
where
    I: IntoIterator<Item = &'a Caption>,
    F: FnMut(&Caption) -> Evidence,
{
    let mut aggregator = EvidenceAggregator::new();
    for caption in captions {
        let tokens = tokenize(&caption.content);
        if tokens.is_empty() {
            continue;
        }
        let evidence = to_evidence(caption);
        for token in &tokens {
            aggregator.record(token, &evidence);
        }
    }
    aggregator
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\r\n00:00:01,000 --> 00:00:02,500\r\n<i>The dog ran.</i>\r\n\r\n\
        2\r\n00:00:03,000 --> 00:00:04,000 X1:10 X2:20\r\n- The cat ran.\r\n- {\\an8}Did it?\r\n\r\n\
        3\r\nnot a timing line\r\nignored\r\n";

    #[test]
    fn parses_blocks_and_skips_malformed() {
        let captions = parse_srt(SAMPLE);
        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].start.as_millis(), 1_000);
        assert_eq!(captions[0].end.as_millis(), 2_500);
        assert_eq!(captions[1].content, "- The cat ran.\n- {\\an8}Did it?");
    }

    #[test]
    fn orders_captions_by_start() {
        let text = "2\n00:00:05,000 --> 00:00:06,000\nlater\n\n1\n00:00:01,000 --> 00:00:02,000\nearlier\n";
        let contents: Vec<String> = parse_srt(text).into_iter().map(|c| c.content).collect();
        assert_eq!(contents, vec!["earlier", "later"]);
    }

    #[test]
    fn skips_block_with_overflowing_hours() {
        let text = "1\n9999999999999999:00:00,000 --> 9999999999999999:00:01,000\nbroken\n\n\
                    2\n00:00:01,000 --> 00:00:02,000\nfine\n";
        let captions = parse_srt(text);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].content, "fine");
    }

    #[test]
    fn cleans_markup() {
        assert_eq!(clean_caption("-<i>Hello</i> there"), "Hello there");
        assert_eq!(clean_caption("one<br />two"), "one\ntwo");
        assert_eq!(clean_caption("{\\pos(10,20)}Up here\\Nand here"), "Up here\nand here");
        assert_eq!(
            clean_caption("<font color=\"#ffff00\">Yellow</font> - dash"),
            "Yellow - dash"
        );
        assert_eq!(clean_caption("2 < 3 > 1"), "2 < 3 > 1");
    }

    #[test]
    fn extracts_ass_event_text() {
        assert_eq!(
            ass_event_text("12,0,Default,,0,0,0,,Well, hello there"),
            "Well, hello there"
        );
        assert_eq!(ass_event_text("plain"), "plain");
    }

    #[test]
    fn aggregates_tokens_with_their_caption() {
        let captions: Vec<Caption> = parse_srt(SAMPLE)
            .into_iter()
            .map(|c| Caption::new(c.start, c.end, clean_caption(&c.content)))
            .collect();
        let agg = aggregate_captions(&captions, |c| Evidence::Caption(c.clone()));
        let tokens: Vec<&str> = agg.tokens().collect();
        assert_eq!(tokens, vec!["the", "dog", "ran", "cat", "did", "it"]);
        let ran: Vec<&str> = agg.evidence("ran").unwrap().iter().map(Evidence::content).collect();
        assert_eq!(ran, vec!["The dog ran.", "The cat ran.\nDid it?"]);
    }
}
