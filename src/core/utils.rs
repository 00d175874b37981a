use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode text as base64 over its UTF-8 bytes.
pub fn encode_text(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode a base64 field back to text.
///
/// A missing field decodes to the empty string. Bytes that are not valid UTF-8
/// are replaced rather than rejected, the judge sometimes returns truncated output.
pub fn decode_text(encoded: Option<&str>) -> Result<String, base64::DecodeError> {
    let Some(encoded) = encoded else {
        return Ok(String::new());
    };
    // The judge wraps long base64 payloads at 60 columns
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
