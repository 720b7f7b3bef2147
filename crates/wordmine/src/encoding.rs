use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::error::ExtractError;

/// Read a text file whose encoding is unknown.
pub fn read_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    Ok(decode(&bytes))
}

/// Decode bytes using the BOM when present, otherwise a detected encoding.
/// Malformed sequences become U+FFFD.
pub fn decode(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
