//! Word tokenization.
//!
//! Text is segmented along UAX #29 word boundaries and lowercased. English
//! clitics are then split off the way Penn-style tokenizers do, so `didn't`
//! yields `did` and `n't` and the dictionary sees the bare verb.

use unicode_segmentation::UnicodeSegmentation;

const CLITICS: [&str; 6] = ["'s", "'re", "'ll", "'ve", "'d", "'m"];

/// Split `text` into lowercase word tokens in reading order.
///
/// Duplicates are kept; callers coalesce them. Segments without any letter or
/// digit (punctuation, whitespace) never produce a token.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.replace(['\u{2019}', '\u{2018}'], "'");
    let mut tokens = Vec::new();
    for word in normalized.unicode_words() {
        let lower = word.to_lowercase();
        split_clitic(lower, &mut tokens);
    }
    tokens
}

fn split_clitic(word: String, out: &mut Vec<String>) {
    if word.len() > 3 && word.ends_with("n't") {
        let stem = word.len() - 3;
        out.push(word[..stem].to_string());
        out.push("n't".to_string());
        return;
    }
    if let Some(idx) = word.rfind('\'')
        && idx > 0
        && CLITICS.contains(&&word[idx..])
    {
        out.push(word[..idx].to_string());
        out.push(word[idx..].to_string());
        return;
    }
    out.push(word);
}
