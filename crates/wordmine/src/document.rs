use std::path::Path;

use crate::encoding;
use crate::error::ExtractError;
use crate::evidence::EvidenceAggregator;
use crate::tokenize::tokenize;

const TEXT_EXTENSIONS: [&str; 11] = [
    "txt", "md", "java", "cs", "cpp", "c", "kt", "js", "py", "ts", "rs",
];

/// Document flavours the reader understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ext == "pdf" {
            Ok(DocumentKind::Pdf)
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Ok(DocumentKind::Text)
        } else {
            Err(ExtractError::UnsupportedDocument(path.display().to_string()))
        }
    }
}

/// Extract the text content of a document.
pub fn read_document_text(path: &Path) -> Result<String, ExtractError> {
    match DocumentKind::from_path(path)? {
        DocumentKind::Pdf => pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        DocumentKind::Text => encoding::read_text(path),
    }
}

/// Tokenize document text.
///
/// Tokens joined by `.` or `_` (`std.io.read`, `snake_case`) also contribute
/// their parts, recorded before the whole token.
pub fn aggregate_document(text: &str) -> EvidenceAggregator {
    let mut aggregator = EvidenceAggregator::new();
    for token in tokenize(text) {
        if token.contains(['.', '_']) {
            for part in token.split(['.', '_']).filter(|p| !p.is_empty()) {
                aggregator.record_token(part);
            }
        }
        aggregator.record_token(&token);
    }
    aggregator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_code_like_tokens() {
        let agg = aggregate_document("Call std.io.read with snake_case. Read it.");
        let tokens: Vec<&str> = agg.tokens().collect();
        assert_eq!(
            tokens,
            vec![
                "call",
                "std",
                "io",
                "read",
                "std.io.read",
                "with",
                "snake",
                "case",
                "snake_case",
                "it"
            ]
        );
        assert!(agg.evidence("read").unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(matches!(
            DocumentKind::from_path(Path::new("slides.pptx")),
            Err(ExtractError::UnsupportedDocument(_))
        ));
        assert!(matches!(
            DocumentKind::from_path(Path::new("README")),
            Err(ExtractError::UnsupportedDocument(_))
        ));
        assert_eq!(DocumentKind::from_path(Path::new("Notes.MD")).unwrap(), DocumentKind::Text);
        assert_eq!(DocumentKind::from_path(Path::new("paper.pdf")).unwrap(), DocumentKind::Pdf);
    }

    #[test]
    fn reads_plain_text_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello world").unwrap();
        assert_eq!(read_document_text(&path).unwrap(), "hello world");
    }
}
