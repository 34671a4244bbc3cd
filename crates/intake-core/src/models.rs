//! Upload data model: raw descriptors from the request layer and the records
//! an upload session tracks through their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use crate::error::StateError;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Transport-level status reported by the request layer for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Ok,
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
    Unknown(i64),
}

impl TransportStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => TransportStatus::Ok,
            1 => TransportStatus::IniSize,
            2 => TransportStatus::FormSize,
            3 => TransportStatus::Partial,
            4 => TransportStatus::NoFile,
            6 => TransportStatus::NoTmpDir,
            7 => TransportStatus::CantWrite,
            8 => TransportStatus::Extension,
            other => TransportStatus::Unknown(other),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, TransportStatus::Ok)
    }

    /// Failures caused by the receiving host rather than the client.
    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            TransportStatus::NoTmpDir | TransportStatus::CantWrite | TransportStatus::Extension
        )
    }
}

impl Display for TransportStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransportStatus::Ok => write!(f, "ok"),
            TransportStatus::IniSize => write!(f, "exceeds the server upload limit"),
            TransportStatus::FormSize => write!(f, "exceeds the form upload limit"),
            TransportStatus::Partial => write!(f, "only partially received"),
            TransportStatus::NoFile => write!(f, "no file received"),
            TransportStatus::NoTmpDir => write!(f, "missing temporary directory"),
            TransportStatus::CantWrite => write!(f, "failed to write to disk"),
            TransportStatus::Extension => write!(f, "stopped by a server extension"),
            TransportStatus::Unknown(code) => write!(f, "unknown status code {}", code),
        }
    }
}

/// One submitted file as handed over by the request layer.
///
/// Every field is optional so that malformed input can be represented and
/// rejected. `type` and `size` are client claims and are never used for
/// validation decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDescriptor {
    pub error: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub declared_type: Option<String>,
    pub tmp_name: Option<String>,
    pub size: Option<u64>,
}

impl RawDescriptor {
    /// A fully populated descriptor with a success status.
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        tmp_name: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            error: Some(0),
            name: Some(name.into()),
            declared_type: Some(declared_type.into()),
            tmp_name: Some(tmp_name.into()),
            size: Some(size),
        }
    }

    /// Whether every field required to build a record is present and non-empty.
    pub fn is_complete(&self) -> bool {
        fn filled(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.is_empty())
        }

        self.error.is_some()
            && filled(&self.name)
            && filled(&self.declared_type)
            && filled(&self.tmp_name)
            && self.size.is_some_and(|s| s > 0)
    }

    pub fn status(&self) -> Option<TransportStatus> {
        self.error.map(TransportStatus::from_code)
    }

    /// The fields a record is built from, if the descriptor is complete.
    ///
    /// The declared size is dropped here: record sizes are measured on disk.
    pub fn into_staged(self) -> Option<StagedUpload> {
        if !self.is_complete() {
            return None;
        }
        Some(StagedUpload {
            status: TransportStatus::from_code(self.error?),
            name: self.name?,
            declared_type: self.declared_type?,
            tmp_name: PathBuf::from(self.tmp_name?),
        })
    }
}

/// A complete descriptor, ready to be measured and probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub status: TransportStatus,
    pub name: String,
    pub declared_type: String,
    pub tmp_name: PathBuf,
}

/// Parallel arrays describing several files sent under one form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorBatch {
    #[serde(default)]
    pub error: Vec<i64>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default, rename = "type")]
    pub declared_type: Vec<String>,
    #[serde(default)]
    pub tmp_name: Vec<String>,
    #[serde(default)]
    pub size: Vec<u64>,
}

/// What one form field yields: a single file or a multi-file batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadField {
    Single(RawDescriptor),
    Batch(DescriptorBatch),
}

impl UploadField {
    /// Normalize into descriptors in submission order.
    ///
    /// Batch slots with an empty name are unfilled inputs and are skipped.
    /// Sibling arrays shorter than `name` leave the matching fields unset.
    pub fn into_descriptors(self) -> Vec<RawDescriptor> {
        match self {
            UploadField::Single(descriptor) => vec![descriptor],
            UploadField::Batch(batch) => batch
                .name
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(i, name)| RawDescriptor {
                    error: batch.error.get(i).copied(),
                    name: Some(name.clone()),
                    declared_type: batch.declared_type.get(i).cloned(),
                    tmp_name: batch.tmp_name.get(i).cloned(),
                    size: batch.size.get(i).copied(),
                })
                .collect(),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, UploadField::Batch(_))
    }
}

impl From<RawDescriptor> for UploadField {
    fn from(descriptor: RawDescriptor) -> Self {
        UploadField::Single(descriptor)
    }
}

impl From<Vec<RawDescriptor>> for UploadField {
    fn from(descriptors: Vec<RawDescriptor>) -> Self {
        let mut batch = DescriptorBatch::default();
        for d in descriptors {
            batch.error.push(d.error.unwrap_or_default());
            batch.name.push(d.name.unwrap_or_default());
            batch.declared_type.push(d.declared_type.unwrap_or_default());
            batch.tmp_name.push(d.tmp_name.unwrap_or_default());
            batch.size.push(d.size.unwrap_or_default());
        }
        UploadField::Batch(batch)
    }
}

/// Lifecycle state of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Saved,
    Failed,
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStatus::Pending => write!(f, "pending"),
            FileStatus::Saved => write!(f, "saved"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One submitted file and its derived attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub original_name: String,
    pub declared_type: String,
    pub size_bytes: u64,
    pub detected_mime: String,
    pub temp_path: PathBuf,
    assigned_filename: Option<String>,
    destination_path: Option<PathBuf>,
    full_path: Option<PathBuf>,
    status: FileStatus,
}

impl FileRecord {
    /// A pending record for a staged file. `size_bytes` and `detected_mime`
    /// must come from the file on disk, never from the descriptor.
    pub fn staged(
        original_name: impl Into<String>,
        declared_type: impl Into<String>,
        temp_path: impl Into<PathBuf>,
        size_bytes: u64,
        detected_mime: impl Into<String>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            declared_type: declared_type.into(),
            size_bytes,
            detected_mime: detected_mime.into(),
            temp_path: temp_path.into(),
            assigned_filename: None,
            destination_path: None,
            full_path: None,
            status: FileStatus::Pending,
        }
    }

    /// Measured size in MB, rounded to two decimals.
    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size_bytes)
    }

    pub fn assigned_filename(&self) -> Option<&str> {
        self.assigned_filename.as_deref()
    }

    pub fn destination_path(&self) -> Option<&Path> {
        self.destination_path.as_deref()
    }

    pub fn full_path(&self) -> Option<&Path> {
        self.full_path.as_deref()
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn is_saved(&self) -> bool {
        self.status == FileStatus::Saved
    }

    pub fn assign_filename(&mut self, filename: impl Into<String>) {
        self.assigned_filename = Some(filename.into());
    }

    pub fn set_paths(&mut self, destination_path: PathBuf, full_path: PathBuf) {
        self.destination_path = Some(destination_path);
        self.full_path = Some(full_path);
    }

    /// Mark the record saved once its move has succeeded.
    pub fn mark_saved(&mut self) -> Result<(), StateError> {
        if self.assigned_filename.is_none() || self.full_path.is_none() {
            return Err(StateError::FilenameUnassigned {
                name: self.original_name.clone(),
            });
        }
        if self.status == FileStatus::Failed {
            return Err(StateError::AlreadyTerminal {
                name: self.original_name.clone(),
                status: self.status.to_string(),
            });
        }
        self.status = FileStatus::Saved;
        Ok(())
    }

    pub fn mark_failed(&mut self) {
        self.status = FileStatus::Failed;
    }
}

/// Convert bytes to MB, rounded to two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_mb_rounding() {
        assert_eq!(bytes_to_mb(1_048_576), 1.0);
        assert_eq!(bytes_to_mb(0), 0.0);
        assert_eq!(bytes_to_mb(1_572_864), 1.5);
        // 10 bytes rounds away
        assert_eq!(bytes_to_mb(10), 0.0);
    }

    #[test]
    fn test_descriptor_completeness() {
        let complete = RawDescriptor::new("a.png", "image/png", "/tmp/upl1", 10);
        assert!(complete.is_complete());

        let mut missing_type = complete.clone();
        missing_type.declared_type = Some(String::new());
        assert!(!missing_type.is_complete());

        let mut zero_size = complete.clone();
        zero_size.size = Some(0);
        assert!(!zero_size.is_complete());

        let mut no_error = complete.clone();
        no_error.error = None;
        assert!(!no_error.is_complete());
        assert!(no_error.into_staged().is_none());

        let staged = complete.into_staged().unwrap();
        assert_eq!(staged.status, TransportStatus::Ok);
        assert_eq!(staged.tmp_name, PathBuf::from("/tmp/upl1"));
    }

    #[test]
    fn test_batch_normalization_skips_empty_slots() {
        let field: UploadField = serde_json::from_value(serde_json::json!({
            "error": [0, 4, 0],
            "name": ["a.png", "", "b.jpg"],
            "type": ["image/png", "", "image/jpeg"],
            "tmp_name": ["/tmp/a", "", "/tmp/b"],
            "size": [10, 0, 20]
        }))
        .unwrap();
        assert!(field.is_multiple());

        let descriptors = field.into_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name.as_deref(), Some("a.png"));
        assert_eq!(descriptors[1].name.as_deref(), Some("b.jpg"));
        assert_eq!(descriptors[1].tmp_name.as_deref(), Some("/tmp/b"));
        assert!(descriptors.iter().all(RawDescriptor::is_complete));
    }

    #[test]
    fn test_batch_with_short_sibling_array_is_incomplete() {
        let field: UploadField = serde_json::from_value(serde_json::json!({
            "error": [0, 0],
            "name": ["a.png", "b.png"],
            "type": ["image/png", "image/png"],
            "tmp_name": ["/tmp/a"],
            "size": [10, 10]
        }))
        .unwrap();

        let descriptors = field.into_descriptors();
        assert!(descriptors[0].is_complete());
        assert!(!descriptors[1].is_complete());
    }

    #[test]
    fn test_single_descriptor_deserializes() {
        let field: UploadField = serde_json::from_value(serde_json::json!({
            "error": 0,
            "name": "photo.png",
            "type": "image/png",
            "tmp_name": "/tmp/uplA1",
            "size": 10
        }))
        .unwrap();
        assert!(!field.is_multiple());
        assert_eq!(field.into_descriptors().len(), 1);
    }

    #[test]
    fn test_transport_status_codes() {
        assert!(TransportStatus::from_code(0).is_ok());
        assert_eq!(TransportStatus::from_code(4), TransportStatus::NoFile);
        assert_eq!(TransportStatus::from_code(5), TransportStatus::Unknown(5));
        assert!(TransportStatus::from_code(7).is_server_side());
    }

    #[test]
    fn test_record_cannot_be_saved_without_filename() {
        let mut record = FileRecord::staged("a.png", "image/png", "/tmp/a", 10, "image/png");
        assert!(matches!(
            record.mark_saved(),
            Err(StateError::FilenameUnassigned { .. })
        ));
        assert_eq!(record.status(), FileStatus::Pending);

        record.assign_filename("abc.png");
        record.set_paths(PathBuf::from("uploads/abc.png"), PathBuf::from("/srv/uploads/abc.png"));
        record.mark_saved().unwrap();
        assert!(record.is_saved());
    }

    #[test]
    fn test_failed_record_stays_failed() {
        let mut record = FileRecord::staged("a.png", "image/png", "/tmp/a", 10, "image/png");
        record.assign_filename("abc.png");
        record.set_paths(PathBuf::from("u/abc.png"), PathBuf::from("/r/u/abc.png"));
        record.mark_failed();
        assert!(record.mark_saved().is_err());
        assert_eq!(record.status(), FileStatus::Failed);
    }
}
