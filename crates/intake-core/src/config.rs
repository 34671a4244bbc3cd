//! Configuration module
//!
//! Upload defaults read from the environment: the root directory destinations
//! are joined under, size limit, allow-lists and directory permissions.

use std::env;
use std::path::PathBuf;

const DEFAULT_DIR_PERMISSIONS: u32 = 0o750;

/// Upload configuration shared by every session built from it.
#[derive(Clone, Debug, PartialEq)]
pub struct IntakeConfig {
    pub root_dir: PathBuf,
    pub max_file_size_mb: Option<f64>,
    pub allowed_file_types: Vec<String>,
    pub allowed_mime_types: Vec<String>,
    pub dir_permissions: u32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            root_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            max_file_size_mb: None,
            allowed_file_types: Vec::new(),
            allowed_mime_types: Vec::new(),
            dir_permissions: DEFAULT_DIR_PERMISSIONS,
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let root_dir = lookup("INTAKE_ROOT_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.root_dir);

        let max_file_size_mb = match lookup("INTAKE_MAX_FILE_SIZE_MB") {
            Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<f64>().map_err(|_| {
                anyhow::anyhow!("INTAKE_MAX_FILE_SIZE_MB must be a number, got '{}'", raw)
            })?),
            _ => None,
        };

        let allowed_file_types = lookup("INTAKE_ALLOWED_FILE_TYPES")
            .map(|s| split_list(&s))
            .unwrap_or_default();

        let allowed_mime_types = lookup("INTAKE_ALLOWED_MIME_TYPES")
            .map(|s| split_list(&s))
            .unwrap_or_default();

        let dir_permissions = match lookup("INTAKE_DIR_PERMISSIONS") {
            Some(raw) if !raw.trim().is_empty() => {
                u32::from_str_radix(raw.trim().trim_start_matches("0o"), 8).map_err(|_| {
                    anyhow::anyhow!("INTAKE_DIR_PERMISSIONS must be an octal mode, got '{}'", raw)
                })?
            }
            _ => DEFAULT_DIR_PERMISSIONS,
        };

        let config = Self {
            root_dir,
            max_file_size_mb,
            allowed_file_types,
            allowed_mime_types,
            dir_permissions,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(max) = self.max_file_size_mb {
            if !max.is_finite() || max <= 0.0 {
                return Err(anyhow::anyhow!(
                    "INTAKE_MAX_FILE_SIZE_MB must be a positive number, got {}",
                    max
                ));
            }
        }

        if self.dir_permissions > 0o777 {
            return Err(anyhow::anyhow!(
                "INTAKE_DIR_PERMISSIONS must be at most 777, got {:o}",
                self.dir_permissions
            ));
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = IntakeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.max_file_size_mb, None);
        assert!(config.allowed_file_types.is_empty());
        assert!(config.allowed_mime_types.is_empty());
        assert_eq!(config.dir_permissions, 0o750);
    }

    #[test]
    fn test_parses_all_values() {
        let config = IntakeConfig::from_lookup(lookup_from(&[
            ("INTAKE_ROOT_DIR", "/srv/www"),
            ("INTAKE_MAX_FILE_SIZE_MB", "2.5"),
            ("INTAKE_ALLOWED_FILE_TYPES", "JPG, png,,"),
            ("INTAKE_ALLOWED_MIME_TYPES", "application/pdf"),
            ("INTAKE_DIR_PERMISSIONS", "0o700"),
        ]))
        .unwrap();

        assert_eq!(config.root_dir, PathBuf::from("/srv/www"));
        assert_eq!(config.max_file_size_mb, Some(2.5));
        assert_eq!(config.allowed_file_types, vec!["jpg", "png"]);
        assert_eq!(config.allowed_mime_types, vec!["application/pdf"]);
        assert_eq!(config.dir_permissions, 0o700);
    }

    #[test]
    fn test_rejects_non_positive_limit() {
        let result = IntakeConfig::from_lookup(lookup_from(&[("INTAKE_MAX_FILE_SIZE_MB", "0")]));
        assert!(result.is_err());

        let result = IntakeConfig::from_lookup(lookup_from(&[("INTAKE_MAX_FILE_SIZE_MB", "abc")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_permissions() {
        let result = IntakeConfig::from_lookup(lookup_from(&[("INTAKE_DIR_PERMISSIONS", "9")]));
        assert!(result.is_err());

        let result = IntakeConfig::from_lookup(lookup_from(&[("INTAKE_DIR_PERMISSIONS", "1777")]));
        assert!(result.is_err());
    }
}
