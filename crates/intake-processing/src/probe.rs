//! Content-type detection for staged files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

const SNIFF_LEN: u64 = 8192;

/// Determines a file's MIME type from its content.
///
/// Fails soft: an empty or unreadable path yields an empty string, which no
/// allow-list matches.
pub trait MimeProbe: Send + Sync {
    fn detect(&self, path: &Path) -> String;
}

/// Signature-based detection with the `infer` crate.
///
/// Content without a known signature is reported as `application/x-empty`
/// (no bytes), `text/plain` (valid UTF-8) or `application/octet-stream`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentSniffer;

impl ContentSniffer {
    pub fn new() -> Self {
        ContentSniffer
    }

    fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
        Ok(head)
    }
}

impl MimeProbe for ContentSniffer {
    fn detect(&self, path: &Path) -> String {
        if path.as_os_str().is_empty() {
            return String::new();
        }

        let head = match Self::read_head(path) {
            Ok(head) => head,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Staged file unreadable");
                return String::new();
            }
        };

        let mime = if let Some(kind) = infer::get(&head) {
            kind.mime_type()
        } else if head.is_empty() {
            "application/x-empty"
        } else if looks_like_text(&head) {
            "text/plain"
        } else {
            "application/octet-stream"
        };

        tracing::debug!(path = %path.display(), mime = %mime, "Detected content type");
        mime.to_string()
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    match std::str::from_utf8(head) {
        Ok(text) => !text.contains('\0'),
        // The read window may cut a multi-byte character
        Err(e) => e.error_len().is_none() && !head[..e.valid_up_to()].contains(&0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_detects_png_signature() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("upload");
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&[0u8; 16]);
        fs::write(&path, data).unwrap();

        assert_eq!(ContentSniffer::new().detect(&path), "image/png");
    }

    #[test]
    fn test_plain_text_and_binary_fallbacks() {
        let dir = tempdir().unwrap();
        let text = dir.path().join("notes");
        fs::write(&text, "hello world\n").unwrap();
        assert_eq!(ContentSniffer::new().detect(&text), "text/plain");

        let binary = dir.path().join("blob");
        fs::write(&binary, [0u8, 159, 146, 150, 0, 1]).unwrap();
        assert_eq!(ContentSniffer::new().detect(&binary), "application/octet-stream");

        let empty = dir.path().join("empty");
        fs::write(&empty, b"").unwrap();
        assert_eq!(ContentSniffer::new().detect(&empty), "application/x-empty");
    }

    #[test]
    fn test_fails_soft() {
        let dir = tempdir().unwrap();
        assert_eq!(ContentSniffer::new().detect(Path::new("")), "");
        assert_eq!(ContentSniffer::new().detect(&dir.path().join("missing")), "");
    }

    #[test]
    fn test_ignores_file_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.png");
        fs::write(&path, "not really an image").unwrap();
        assert_eq!(ContentSniffer::new().detect(&path), "text/plain");
    }
}
