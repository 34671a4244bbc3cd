//! Validation pipeline
//!
//! Checks run over the whole batch of records and report errors; they never
//! change record status. Internal checks run first, in the order they were
//! enabled, followed by caller-registered checks in registration order. Every
//! check runs; there is no short-circuit between checks.

use intake_core::ValidationError;

use crate::session::UploadSession;

/// One validation step over an upload session.
pub trait UploadCheck: Send + Sync {
    /// Stable name, used for logging and to avoid double registration
    fn name(&self) -> &str;

    /// Inspect the session and return errors, if any.
    fn check(&self, session: &UploadSession) -> Option<Vec<ValidationError>>;
}

/// Fails every record whose measured size reaches the configured limit.
///
/// The boundary is inclusive: a file of exactly the limit fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct SizeCheck;

impl UploadCheck for SizeCheck {
    fn name(&self) -> &str {
        "check_file_size"
    }

    fn check(&self, session: &UploadSession) -> Option<Vec<ValidationError>> {
        let max_mb = session.max_file_size_mb()?;

        let errors: Vec<ValidationError> = session
            .get_state()
            .iter()
            .filter(|record| max_mb <= record.size_mb())
            .map(|record| ValidationError::FileTooLarge {
                name: record.original_name.clone(),
                size_mb: record.size_mb(),
                max_mb,
            })
            .collect();

        (!errors.is_empty()).then_some(errors)
    }
}

/// Fails every record whose detected MIME type is not allow-listed.
#[derive(Clone, Copy, Debug, Default)]
pub struct MimeCheck;

impl UploadCheck for MimeCheck {
    fn name(&self) -> &str {
        "check_mime_type"
    }

    fn check(&self, session: &UploadSession) -> Option<Vec<ValidationError>> {
        let allowed = session.allowed_mime_types();
        if allowed.is_empty() {
            return None;
        }

        let errors: Vec<ValidationError> = session
            .get_state()
            .iter()
            .filter(|record| !allowed.iter().any(|m| m == &record.detected_mime))
            .map(|record| ValidationError::MimeNotAllowed {
                name: record.original_name.clone(),
                mime: record.detected_mime.clone(),
            })
            .collect();

        (!errors.is_empty()).then_some(errors)
    }
}

/// Adapts a closure into a named check.
pub struct FnCheck<F> {
    name: String,
    f: F,
}

impl<F> FnCheck<F>
where
    F: Fn(&UploadSession) -> Option<Vec<ValidationError>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> UploadCheck for FnCheck<F>
where
    F: Fn(&UploadSession) -> Option<Vec<ValidationError>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, session: &UploadSession) -> Option<Vec<ValidationError>> {
        (self.f)(session)
    }
}

/// Ordered internal and external checks.
#[derive(Default)]
pub struct ValidationPipeline {
    internal: Vec<Box<dyn UploadCheck>>,
    external: Vec<Box<dyn UploadCheck>>,
}

impl ValidationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a built-in check. Enabling the same check twice keeps its first position.
    pub fn register_internal(&mut self, check: Box<dyn UploadCheck>) {
        if self.internal.iter().any(|c| c.name() == check.name()) {
            return;
        }
        self.internal.push(check);
    }

    /// Append a caller-supplied check; it runs after every internal check.
    pub fn register(&mut self, check: Box<dyn UploadCheck>) {
        self.external.push(check);
    }

    pub fn len(&self) -> usize {
        self.internal.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check names in execution order.
    pub fn check_names(&self) -> Vec<&str> {
        self.checks().map(|c| c.name()).collect()
    }

    fn checks(&self) -> impl Iterator<Item = &dyn UploadCheck> {
        self.internal
            .iter()
            .chain(self.external.iter())
            .map(|check| check.as_ref())
    }

    /// Run every check against `session` and collect their errors in order.
    pub fn run(&self, session: &UploadSession) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for check in self.checks() {
            match check.check(session) {
                Some(found) if !found.is_empty() => {
                    tracing::debug!(check = %check.name(), errors = found.len(), "Check failed");
                    errors.extend(found);
                }
                _ => {
                    tracing::debug!(check = %check.name(), "Check passed");
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_registration_is_deduplicated() {
        let mut pipeline = ValidationPipeline::new();
        pipeline.register_internal(Box::new(SizeCheck));
        pipeline.register_internal(Box::new(MimeCheck));
        pipeline.register_internal(Box::new(SizeCheck));

        assert_eq!(pipeline.check_names(), vec!["check_file_size", "check_mime_type"]);
    }

    #[test]
    fn test_external_checks_run_after_internal() {
        let mut pipeline = ValidationPipeline::new();
        pipeline.register(Box::new(FnCheck::new("custom", |_: &UploadSession| None)));
        pipeline.register_internal(Box::new(MimeCheck));

        assert_eq!(pipeline.check_names(), vec!["check_mime_type", "custom"]);
        assert_eq!(pipeline.len(), 2);
        assert!(ValidationPipeline::new().is_empty());
    }
}
