//! Text detection and placeholder rewriting.
//!
//! Files are decoded with the first candidate encoding that accepts them
//! without replacement characters: strict UTF-8, then windows-1252. Anything
//! containing a NUL byte is treated as binary before decoding is attempted,
//! since the single-byte fallback would otherwise accept every input.
//!
//! A file is only rewritten when the placeholder actually occurs, and it is
//! written back in the encoding it was read with.

use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::{io_err, StageError};

/// Result of [`try_decode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Text {
        text: String,
        encoding: &'static Encoding,
    },
    Binary,
}

/// What [`rewrite_placeholder`] did to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The placeholder was replaced `occurrences` times.
    Rewritten { path: PathBuf, occurrences: usize },
    /// Text file without the placeholder; bytes untouched.
    Unchanged { path: PathBuf },
    /// No candidate encoding matched; bytes untouched.
    Binary { path: PathBuf },
}

fn candidate_encodings() -> [&'static Encoding; 2] {
    [UTF_8, WINDOWS_1252]
}

/// Decode `bytes` with the first candidate encoding that fits.
pub fn try_decode(bytes: &[u8]) -> Decoded {
    if bytes.contains(&0) {
        return Decoded::Binary;
    }
    for encoding in candidate_encodings() {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Decoded::Text {
                text: text.into_owned(),
                encoding,
            };
        }
    }
    Decoded::Binary
}

/// Replace every `token` in `text` with `version`.
///
/// Returns `None` when the token does not occur.
pub fn substitute(text: &str, token: &str, version: &str) -> Option<(String, usize)> {
    if token.is_empty() {
        return None;
    }
    let occurrences = text.matches(token).count();
    if occurrences == 0 {
        return None;
    }
    Some((text.replace(token, version), occurrences))
}

/// Substitute the placeholder inside the file at `path`, in place.
///
/// The new content goes to `<path>.stagesync.tmp` first and is renamed over
/// the original, so a reader never observes a half-written file.
pub fn rewrite_placeholder(
    path: &Path,
    token: &str,
    version: &str,
) -> Result<RewriteOutcome, StageError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;

    let (text, encoding) = match try_decode(&bytes) {
        Decoded::Text { text, encoding } => (text, encoding),
        Decoded::Binary => {
            tracing::debug!("binary, left untouched: {}", path.display());
            return Ok(RewriteOutcome::Binary {
                path: path.to_path_buf(),
            });
        }
    };

    let Some((replaced, occurrences)) = substitute(&text, token, version) else {
        return Ok(RewriteOutcome::Unchanged {
            path: path.to_path_buf(),
        });
    };

    let (encoded, _, had_errors) = encoding.encode(&replaced);
    if had_errors {
        return Err(StageError::Unencodable {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        });
    }

    let tmp = PathBuf::from(format!("{}.stagesync.tmp", path.display()));
    let permissions = std::fs::metadata(path)
        .map_err(|e| io_err(path, e))?
        .permissions();
    std::fs::write(&tmp, &encoded).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::set_permissions(&tmp, permissions) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&tmp, e));
    }
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!(
        "stamped {} ({} occurrence(s), {})",
        path.display(),
        occurrences,
        encoding.name()
    );
    Ok(RewriteOutcome::Rewritten {
        path: path.to_path_buf(),
        occurrences,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    const TOKEN: &str = "__PLACEHOLDER_BUILD_VERSION__";

    #[test]
    fn utf8_is_first_choice() {
        match try_decode("olá mundo".as_bytes()) {
            Decoded::Text { text, encoding } => {
                assert_eq!(encoding, UTF_8);
                assert_eq!(text, "olá mundo");
            }
            Decoded::Binary => panic!("expected text"),
        }
    }

    #[test]
    fn invalid_utf8_falls_back_to_single_byte() {
        // "olá" in windows-1252
        let bytes = [b'o', b'l', 0xE1];
        match try_decode(&bytes) {
            Decoded::Text { text, encoding } => {
                assert_eq!(encoding, WINDOWS_1252);
                assert_eq!(text, "olá");
            }
            Decoded::Binary => panic!("expected text"),
        }
    }

    #[rstest]
    #[case(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00])]
    #[case(&[0x00])]
    #[case(&[b'a', 0x00, b'b'])]
    fn nul_bytes_mean_binary(#[case] bytes: &[u8]) {
        assert_eq!(try_decode(bytes), Decoded::Binary);
    }

    #[test]
    fn substitute_counts_every_occurrence() {
        let text = format!("a?v={TOKEN}\nb?v={TOKEN}\n{TOKEN}");
        let (out, n) = substitute(&text, TOKEN, "20240101000000").unwrap();
        assert_eq!(n, 3);
        assert_eq!(out.matches("20240101000000").count(), 3);
        assert!(!out.contains(TOKEN));
    }

    #[test]
    fn substitute_without_token_is_none() {
        assert!(substitute("nothing here", TOKEN, "v").is_none());
        assert!(substitute("anything", "", "v").is_none());
    }

    #[test]
    fn rewrite_keeps_single_byte_encoding() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("legacy.php");
        let mut bytes = b"// vers\xE3o ".to_vec();
        bytes.extend_from_slice(TOKEN.as_bytes());
        fs::write(&path, &bytes).unwrap();

        let outcome = rewrite_placeholder(&path, TOKEN, "42").unwrap();
        assert!(matches!(outcome, RewriteOutcome::Rewritten { occurrences: 1, .. }));
        assert_eq!(fs::read(&path).unwrap(), b"// vers\xE3o 42".to_vec());
    }

    #[test]
    fn rewrite_leaves_file_without_token_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plain.js");
        fs::write(&path, "\u{feff}export const x = 1;\r\n").unwrap();
        let before = fs::read(&path).unwrap();

        let outcome = rewrite_placeholder(&path, TOKEN, "42").unwrap();
        assert!(matches!(outcome, RewriteOutcome::Unchanged { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn rewrite_preserves_utf8_bom() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bom.js");
        fs::write(&path, format!("\u{feff}import x from './x.js?v={TOKEN}';")).unwrap();

        rewrite_placeholder(&path, TOKEN, "7").unwrap();
        let after = fs::read(&path).unwrap();
        assert!(after.starts_with(&[0xEF, 0xBB, 0xBF]));
        assert!(String::from_utf8(after).unwrap().ends_with("./x.js?v=7';"));
    }

    #[test]
    fn rewrite_skips_binary_even_with_token() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blob.bin");
        let mut bytes = vec![0u8, 1, 2];
        bytes.extend_from_slice(TOKEN.as_bytes());
        fs::write(&path, &bytes).unwrap();

        let outcome = rewrite_placeholder(&path, TOKEN, "42").unwrap();
        assert!(matches!(outcome, RewriteOutcome::Binary { .. }));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn unencodable_version_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin.txt");
        let mut bytes = b"\xE9 ".to_vec();
        bytes.extend_from_slice(TOKEN.as_bytes());
        fs::write(&path, &bytes).unwrap();

        let err = rewrite_placeholder(&path, TOKEN, "版本").unwrap_err();
        assert!(matches!(err, StageError::Unencodable { .. }), "got: {err}");
        assert_eq!(fs::read(&path).unwrap(), bytes, "original must survive");
    }

    #[test]
    fn tmp_file_removed_after_rewrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.txt");
        fs::write(&path, TOKEN).unwrap();
        rewrite_placeholder(&path, TOKEN, "1").unwrap();
        let tmp_path = PathBuf::from(format!("{}.stagesync.tmp", path.display()));
        assert!(!tmp_path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "1");
    }
}
