//! Known-extension table
//!
//! Maps lowercase file extensions to their canonical MIME type. The table is
//! used to decide which original extensions survive filename generation and to
//! derive MIME allow-lists from extension lists.

use std::collections::BTreeMap;

const DEFAULT_MIME_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("php", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("swf", "application/x-shockwave-flash"),
    ("flv", "video/x-flv"),
    // Images
    ("png", "image/png"),
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("ico", "image/vnd.microsoft.icon"),
    ("tiff", "image/tiff"),
    ("tif", "image/tiff"),
    ("svg", "image/svg+xml"),
    ("svgz", "image/svg+xml"),
    // Archives
    ("zip", "application/zip"),
    ("rar", "application/x-rar-compressed"),
    ("exe", "application/x-msdownload"),
    ("msi", "application/x-msdownload"),
    ("cab", "application/vnd.ms-cab-compressed"),
    // Audio/video
    ("mp3", "audio/mpeg"),
    ("qt", "video/quicktime"),
    ("mov", "video/quicktime"),
    // Adobe
    ("pdf", "application/pdf"),
    ("psd", "image/vnd.adobe.photoshop"),
    ("ai", "application/postscript"),
    ("eps", "application/postscript"),
    ("ps", "application/postscript"),
    // MS Office
    ("doc", "application/msword"),
    ("rtf", "application/rtf"),
    ("xls", "application/vnd.ms-excel"),
    ("ppt", "application/vnd.ms-powerpoint"),
    // OpenOffice
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
];

/// Extension to MIME mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTable {
    entries: BTreeMap<String, String>,
}

impl ExtensionTable {
    /// Build a table from explicit entries. Extensions are stored lowercase.
    pub fn new<I, E, M>(entries: I) -> Self
    where
        I: IntoIterator<Item = (E, M)>,
        E: Into<String>,
        M: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(ext, mime)| (ext.into().to_lowercase(), mime.into()))
                .collect(),
        }
    }

    pub fn mime_for(&self, extension: &str) -> Option<&str> {
        self.entries
            .get(&extension.to_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.mime_for(extension).is_some()
    }

    /// MIME types for the given extensions, in order of first appearance.
    ///
    /// Unknown extensions are ignored and duplicate MIME types collapse, so
    /// `["jpg", "jpeg"]` yields a single `image/jpeg`.
    pub fn mimes_for<S: AsRef<str>>(&self, extensions: &[S]) -> Vec<String> {
        let mut mimes: Vec<String> = Vec::new();
        for ext in extensions {
            match self.mime_for(ext.as_ref().trim_start_matches('.')) {
                Some(mime) if !mimes.iter().any(|m| m == mime) => mimes.push(mime.to_string()),
                Some(_) => {}
                None => {
                    tracing::debug!(extension = %ext.as_ref(), "Unknown extension, not added to allow-list");
                }
            }
        }
        mimes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::new(DEFAULT_MIME_TYPES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_lookups() {
        let table = ExtensionTable::default();
        assert_eq!(table.mime_for("png"), Some("image/png"));
        assert_eq!(table.mime_for("JPG"), Some("image/jpeg"));
        assert_eq!(table.mime_for("ods"), Some("application/vnd.oasis.opendocument.spreadsheet"));
        assert!(!table.contains("webp"));
        assert_eq!(table.len(), DEFAULT_MIME_TYPES.len());
    }

    #[test]
    fn test_mimes_for_jpg_png() {
        let table = ExtensionTable::default();
        assert_eq!(
            table.mimes_for(&["jpg", "png"]),
            vec!["image/jpeg".to_string(), "image/png".to_string()]
        );
    }

    #[test]
    fn test_mimes_for_collapses_and_ignores_unknown() {
        let table = ExtensionTable::default();
        assert_eq!(
            table.mimes_for(&["jpg", "jpeg", "nope", ".tif", "tiff"]),
            vec!["image/jpeg".to_string(), "image/tiff".to_string()]
        );
        assert!(table.mimes_for::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_custom_table() {
        let table = ExtensionTable::new([("WEBP", "image/webp")]);
        assert_eq!(table.mime_for("webp"), Some("image/webp"));
        assert!(!table.contains("png"));
    }
}
