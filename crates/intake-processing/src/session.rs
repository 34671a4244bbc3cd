//! Upload session: one request's files from raw descriptors to stored files.
//!
//! Flow: [`UploadSession::file`] ingests descriptors and builds records from the
//! staged files on disk, [`UploadSession::check`] runs the validation pipeline,
//! and [`UploadSession::save`] moves every file into the destination directory.
//! Nothing on disk changes unless validation produced no errors.
//!
//! Saving is all-or-nothing: when one move fails, files already moved are put
//! back at their staged paths and every record is marked failed.

use intake_core::{
    FileRecord, FileStatus, IntakeConfig, RawDescriptor, StagedUpload, TransportStatus,
    UploadField, ValidationError,
};
use intake_storage::{
    generate_filename, sanitize_filename, DestinationResolver, FileMover, LocalMover,
    StorageError,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};

use crate::error::UploadError;
use crate::pipeline::{MimeCheck, SizeCheck, UploadCheck, ValidationPipeline};
use crate::probe::{ContentSniffer, MimeProbe};

/// Aggregate state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Saved,
    Failed,
}

/// Serializable summary of a session, suitable for a JSON response.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub status: SessionStatus,
    pub files: Vec<FileRecord>,
    pub errors: Vec<String>,
}

pub struct UploadSession {
    resolver: DestinationResolver,
    /// Destination relative to the root, with a trailing separator
    destination: String,
    destination_dir: PathBuf,
    max_size_mb: Option<f64>,
    allowed_mimes: Vec<String>,
    filename: Option<String>,
    records: Vec<FileRecord>,
    errors: Vec<ValidationError>,
    pipeline: ValidationPipeline,
    probe: Box<dyn MimeProbe>,
    mover: Box<dyn FileMover>,
}

impl UploadSession {
    /// Create a session for `destination` under the root configured in the
    /// environment (`INTAKE_ROOT_DIR`).
    pub fn new(destination: &str) -> Result<Self, UploadError> {
        let config =
            IntakeConfig::from_env().map_err(|e| UploadError::InvalidConfig(e.to_string()))?;
        Self::from_config(destination, &config)
    }

    /// Create a session for `destination` under an explicit root.
    pub fn with_root(destination: &str, root: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let config = IntakeConfig {
            root_dir: root.into(),
            ..IntakeConfig::default()
        };
        Self::from_config(destination, &config)
    }

    /// Create a session with root, permissions, size limit and allow-lists
    /// taken from `config`.
    pub fn from_config(destination: &str, config: &IntakeConfig) -> Result<Self, UploadError> {
        config
            .validate()
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?;

        let resolver =
            DestinationResolver::new(&config.root_dir).with_permissions(config.dir_permissions);
        let mut session = Self::with_resolver(destination, resolver)?;

        if let Some(max) = config.max_file_size_mb {
            session.set_max_file_size(max)?;
        }

        let mut mimes = config.allowed_mime_types.clone();
        mimes.extend(
            session
                .resolver
                .extensions()
                .mimes_for(&config.allowed_file_types),
        );
        if !mimes.is_empty() {
            session.set_allowed_mime_types(mimes);
        }

        Ok(session)
    }

    /// Create a session with a fully configured resolver.
    ///
    /// Fails when the destination directory neither exists writable nor can
    /// be created; no session exists in that case.
    pub fn with_resolver(
        destination: &str,
        resolver: DestinationResolver,
    ) -> Result<Self, UploadError> {
        let destination_dir = resolver.resolve_directory(destination)?;

        if !resolver.ensure_directory(&destination_dir) {
            tracing::error!(
                path = %destination_dir.display(),
                "Upload destination cannot be created"
            );
            return Err(UploadError::DestinationUnavailable(destination_dir));
        }

        Ok(Self {
            resolver,
            destination: normalize_destination(destination),
            destination_dir,
            max_size_mb: None,
            allowed_mimes: Vec::new(),
            filename: None,
            records: Vec::new(),
            errors: Vec::new(),
            pipeline: ValidationPipeline::new(),
            probe: Box::new(ContentSniffer::new()),
            mover: Box::new(LocalMover::new()),
        })
    }

    /// Replace the content-type probe. Must be set before [`file`](Self::file).
    pub fn with_probe(mut self, probe: impl MimeProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Replace the move primitive.
    pub fn with_mover(mut self, mover: impl FileMover + 'static) -> Self {
        self.mover = Box::new(mover);
        self
    }

    /// Explicit filename for a single-file upload. An empty name clears it.
    ///
    /// Only the first record receives this name; other records in the batch
    /// get generated names so that files never overwrite each other.
    pub fn set_filename(&mut self, filename: &str) -> Result<(), UploadError> {
        if filename.is_empty() {
            self.filename = None;
            return Ok(());
        }
        let sanitized = sanitize_filename(filename)
            .map_err(|_| UploadError::InvalidFilename(filename.to_string()))?;
        self.filename = Some(sanitized);
        Ok(())
    }

    /// Explicit filename for the record at `index`.
    pub fn set_record_filename(&mut self, index: usize, filename: &str) -> Result<(), UploadError> {
        let sanitized = sanitize_filename(filename)
            .map_err(|_| UploadError::InvalidFilename(filename.to_string()))?;
        let record = self
            .records
            .get_mut(index)
            .ok_or(UploadError::NoSuchRecord(index))?;
        if record.status() != FileStatus::Pending {
            return Err(UploadError::AlreadyFinished);
        }
        record.assign_filename(sanitized);
        Ok(())
    }

    /// Allow only the given MIME types (exact match against detected types).
    pub fn set_allowed_mime_types<I, S>(&mut self, mimes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut allowed: Vec<String> = Vec::new();
        for mime in mimes {
            let mime = mime.into().trim().to_lowercase();
            if !mime.is_empty() && !allowed.contains(&mime) {
                allowed.push(mime);
            }
        }
        self.allowed_mimes = allowed;
        self.pipeline.register_internal(Box::new(MimeCheck));
    }

    /// Allow only the MIME types of the given extensions, e.g. `["jpg", "png"]`.
    pub fn set_allowed_file_types<S: AsRef<str>>(&mut self, types: &[S]) {
        let mimes = self.resolver.extensions().mimes_for(types);
        if mimes.is_empty() && !types.is_empty() {
            tracing::warn!("No known extension in allowed file types, uploads stay unrestricted");
        }
        self.set_allowed_mime_types(mimes);
    }

    /// Limit every file to less than `size_mb` megabytes.
    pub fn set_max_file_size(&mut self, size_mb: f64) -> Result<(), UploadError> {
        if !size_mb.is_finite() || size_mb <= 0.0 {
            return Err(UploadError::InvalidConfig(format!(
                "Max file size must be a positive number of MB, got {}",
                size_mb
            )));
        }
        self.max_size_mb = Some(size_mb);
        self.pipeline.register_internal(Box::new(SizeCheck));
        Ok(())
    }

    /// Register an additional check; it runs after the built-in ones.
    pub fn register_check(&mut self, check: impl UploadCheck + 'static) -> &mut Self {
        self.pipeline.register(Box::new(check));
        self
    }

    /// Register several additional checks, in order.
    pub fn callbacks<I>(&mut self, checks: I) -> &mut Self
    where
        I: IntoIterator<Item = Box<dyn UploadCheck>>,
    {
        for check in checks {
            self.pipeline.register(check);
        }
        self
    }

    /// Ingest the descriptors of one form field.
    ///
    /// The batch is accepted or rejected as a whole: a malformed descriptor,
    /// a failed transfer or an unreadable staged file records an error and
    /// leaves no records.
    pub fn file(&mut self, field: impl Into<UploadField>) {
        let field = field.into();
        let multiple = field.is_multiple();
        let descriptors = field.into_descriptors();

        let staged: Option<Vec<StagedUpload>> = if descriptors.is_empty() {
            None
        } else {
            descriptors
                .into_iter()
                .map(RawDescriptor::into_staged)
                .collect()
        };

        let Some(staged) = staged else {
            tracing::warn!(multiple, "Malformed upload descriptor");
            self.set_error(ValidationError::NoFileSelected);
            return;
        };

        let mut transport_errors: Vec<ValidationError> = Vec::new();
        for upload in &staged {
            let error = match upload.status {
                TransportStatus::Ok => continue,
                TransportStatus::NoFile => ValidationError::NoFileSelected,
                status => ValidationError::Transport {
                    name: upload.name.clone(),
                    status,
                },
            };
            if !transport_errors.contains(&error) {
                transport_errors.push(error);
            }
        }
        if !transport_errors.is_empty() {
            tracing::warn!(
                errors = transport_errors.len(),
                "Upload transfer reported errors"
            );
            self.errors.extend(transport_errors);
            return;
        }

        let mut records = Vec::with_capacity(staged.len());
        let mut unreadable = Vec::new();
        for upload in staged {
            match fs::metadata(&upload.tmp_name) {
                Ok(meta) if meta.is_file() => {
                    let detected_mime = self.probe.detect(&upload.tmp_name);
                    records.push(FileRecord::staged(
                        upload.name,
                        upload.declared_type,
                        upload.tmp_name,
                        meta.len(),
                        detected_mime,
                    ));
                }
                _ => unreadable.push(ValidationError::Unreadable { name: upload.name }),
            }
        }
        if !unreadable.is_empty() {
            tracing::warn!(files = unreadable.len(), "Staged upload files unreadable");
            self.errors.extend(unreadable);
            return;
        }

        tracing::debug!(files = records.len(), multiple, "Upload ingested");
        self.records = records;
    }

    /// Append a validation error.
    pub fn set_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Run the validation pipeline unless errors are already present.
    pub fn validate(&mut self) {
        if !self.errors.is_empty() {
            tracing::debug!(
                errors = self.errors.len(),
                "Skipping validation, errors already present"
            );
            return;
        }

        if self.records.is_empty() {
            self.set_error(ValidationError::NoFileSelected);
            return;
        }

        let session: &Self = self;
        let found = session.pipeline.run(session);
        if !found.is_empty() {
            tracing::warn!(
                errors = found.len(),
                destination = %self.destination,
                "Upload validation failed"
            );
        }
        self.errors.extend(found);
    }

    /// Validate the batch. Returns `true` when no error is present.
    pub fn check(&mut self) -> bool {
        self.validate();
        self.errors.is_empty()
    }

    /// Move every validated file into the destination directory.
    pub fn save(&mut self) -> Result<&[FileRecord], UploadError> {
        if !self.errors.is_empty() || self.records.is_empty() {
            return Err(UploadError::NotValidated);
        }
        if self
            .records
            .iter()
            .any(|record| record.status() != FileStatus::Pending)
        {
            return Err(UploadError::AlreadyFinished);
        }

        self.assign_filenames()?;

        let mut moved: Vec<usize> = Vec::with_capacity(self.records.len());
        if let Err((name, source)) = self.move_all(&mut moved) {
            tracing::error!(
                file = %name,
                error = %source,
                moved = moved.len(),
                "Upload move failed, rolling back batch"
            );
            self.roll_back(&moved);
            for record in &mut self.records {
                record.mark_failed();
            }
            return Err(UploadError::MoveFailed { name, source });
        }

        for record in &mut self.records {
            record.mark_saved()?;
        }

        tracing::info!(
            files = self.records.len(),
            destination = %self.destination_dir.display(),
            "Upload saved"
        );

        Ok(&self.records)
    }

    /// Validate and, on success, save. Returns per-file state either way.
    pub fn upload(&mut self, filename: Option<&str>) -> Result<&[FileRecord], UploadError> {
        if let Some(name) = filename {
            self.set_filename(name)?;
        }
        if self.check() {
            self.save()?;
        }
        Ok(&self.records)
    }

    fn assign_filenames(&mut self) -> Result<(), UploadError> {
        if let (Some(name), Some(first)) = (&self.filename, self.records.first_mut()) {
            if first.assigned_filename().is_none() {
                first.assign_filename(name.clone());
            }
        }

        let mut taken: HashSet<String> = HashSet::new();
        for record in &self.records {
            if let Some(name) = record.assigned_filename() {
                if !taken.insert(name.to_string()) {
                    return Err(UploadError::DuplicateFilename(name.to_string()));
                }
            }
        }

        let resolver = &self.resolver;
        let destination = self.destination.as_str();
        let directory = self.destination_dir.as_path();

        // Moves replace existing targets and a rollback cannot bring them back
        if let Some(existing) = taken.iter().find(|name| directory.join(name).exists()) {
            return Err(UploadError::FilenameTaken(existing.clone()));
        }
        for record in self.records.iter_mut() {
            let filename = match record.assigned_filename() {
                Some(name) => name.to_string(),
                None => {
                    let generated = loop {
                        let candidate = generate_filename(
                            &record.original_name,
                            Path::new(destination),
                            resolver.extensions(),
                        );
                        if !taken.contains(&candidate) && !directory.join(&candidate).exists() {
                            break candidate;
                        }
                    };
                    taken.insert(generated.clone());
                    record.assign_filename(generated.clone());
                    generated
                }
            };

            record.set_paths(
                PathBuf::from(format!("{}{}", destination, filename)),
                resolver.full_path(directory, &filename),
            );
        }

        Ok(())
    }

    fn move_all(&self, moved: &mut Vec<usize>) -> Result<(), (String, StorageError)> {
        for (index, record) in self.records.iter().enumerate() {
            let target = record.full_path().ok_or_else(|| {
                (
                    record.original_name.clone(),
                    StorageError::InvalidPath("no destination assigned".to_string()),
                )
            })?;
            self.mover
                .move_file(&record.temp_path, target)
                .map_err(|e| (record.original_name.clone(), e))?;
            moved.push(index);
        }
        Ok(())
    }

    fn roll_back(&self, moved: &[usize]) {
        for &index in moved.iter().rev() {
            let record = &self.records[index];
            let Some(stored) = record.full_path() else {
                continue;
            };
            match self.mover.move_file(stored, &record.temp_path) {
                Ok(()) => tracing::warn!(
                    file = %record.original_name,
                    path = %record.temp_path.display(),
                    "Restored staged file"
                ),
                Err(e) => tracing::error!(
                    file = %record.original_name,
                    path = %stored.display(),
                    error = %e,
                    "Failed to restore staged file"
                ),
            }
        }
    }

    /// `true` when no validation error is present.
    pub fn status(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn session_status(&self) -> SessionStatus {
        if !self.errors.is_empty() || self.records.iter().any(|r| r.status() == FileStatus::Failed)
        {
            SessionStatus::Failed
        } else if !self.records.is_empty() && self.records.iter().all(FileRecord::is_saved) {
            SessionStatus::Saved
        } else {
            SessionStatus::Pending
        }
    }

    pub fn get_state(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn get_errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn original_file_names(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.original_name.as_str())
            .collect()
    }

    pub fn max_file_size_mb(&self) -> Option<f64> {
        self.max_size_mb
    }

    pub fn allowed_mime_types(&self) -> &[String] {
        &self.allowed_mimes
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn pipeline(&self) -> &ValidationPipeline {
        &self.pipeline
    }

    pub fn report(&self) -> UploadReport {
        UploadReport {
            status: self.session_status(),
            files: self.records.clone(),
            errors: self.error_messages(),
        }
    }
}

fn normalize_destination(destination: &str) -> String {
    let trimmed = destination.trim_end_matches(|c: char| c == '/' || c == MAIN_SEPARATOR);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}{}", trimmed, MAIN_SEPARATOR_STR)
    }
}
