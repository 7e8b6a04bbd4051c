// src/utils/string_encoding.rs

/// Decode one header/sensor line, stripping surrounding whitespace.
///
/// Returns `None` when the bytes are not pure ASCII, which marks the start
/// of a binary section.
pub fn decode_ascii_line(bytes: &[u8]) -> Option<String> {
    if !bytes.is_ascii() {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    Some(text.trim().to_string())
}

/// Pad a name to the 4-byte boundary used by netCDF headers
pub fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}
