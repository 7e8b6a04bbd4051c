// src/framing/mod.rs
//! Byte-stream access to DBD files
//!
//! Files whose extension has `c` as its middle character (`.dcd`, `.ecd`,
//! `.scd`, `.tcd`, `.mcd`, `.ncd`) are stored as a sequence of LZ4 block
//! frames:
//!
//! - 2 bytes: big-endian frame length
//! - N bytes: LZ4 block, at most [`MAX_FRAME_SIZE`] bytes once decompressed
//!
//! [`FramingReader`] hides this framing so the header, sensor list and
//! record decoders read the same byte stream either way.
//!
//! ```
//! use dbd_rs::framing::{is_compressed, is_dbd_filename};
//!
//! assert!(is_compressed("01330000.dcd"));
//! assert!(!is_compressed("01330000.dbd"));
//! assert!(is_dbd_filename("01330000.EBD"));
//! assert!(!is_dbd_filename("notes.txt"));
//! ```

mod reader;

pub use reader::{FramingReader, MAX_FRAME_SIZE};

use std::path::Path;

fn extension_chars(path: &Path) -> Option<[char; 3]> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mut chars = ext.chars();
    let out = [chars.next()?, chars.next()?, chars.next()?];
    if chars.next().is_some() {
        return None;
    }
    Some(out)
}

/// Whether the filename selects the LZ4-framed path (`*.?c?`)
pub fn is_compressed(path: impl AsRef<Path>) -> bool {
    extension_chars(path.as_ref()).map_or(false, |ext| ext[1] == 'c')
}

/// Whether the filename looks like a DBD family file (`*.[demnst][bc]d`)
pub fn is_dbd_filename(path: impl AsRef<Path>) -> bool {
    file_type_key(path).is_some()
}

/// The file family key (`d`, `e`, `m`, `n`, `s` or `t`) of a DBD filename
pub fn file_type_key(path: impl AsRef<Path>) -> Option<char> {
    let ext = extension_chars(path.as_ref())?;
    let valid = "demnst".contains(ext[0]) && (ext[1] == 'b' || ext[1] == 'c') && ext[2] == 'd';
    valid.then_some(ext[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_suffixes() {
        for name in ["a.dcd", "a.ecd", "a.scd", "a.tcd", "a.mcd", "a.ncd", "A.DCD"] {
            assert!(is_compressed(name), "{}", name);
        }
        for name in ["a.dbd", "a.sbd", "a.cac", "a.d", "a"] {
            assert!(!is_compressed(name), "{}", name);
        }
    }

    #[test]
    fn test_type_keys() {
        assert_eq!(file_type_key("x/01330000.dbd"), Some('d'));
        assert_eq!(file_type_key("01330000.TCD"), Some('t'));
        assert_eq!(file_type_key("01330000.xbd"), None);
        assert_eq!(file_type_key("01330000.dbdx"), None);
    }
}
