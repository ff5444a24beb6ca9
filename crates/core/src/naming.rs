//! Source naming rules.
//!
//! Source names double as artifact file stems and registry keys, so they are
//! restricted to a conservative character set.

use std::path::Path;

use crate::error::CoreError;

/// Maximum length of a source name.
const MAX_NAME_LEN: usize = 200;

/// Validate a source name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must not start with a dot.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_source_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Source name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Source name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.starts_with('.') {
        return Err(CoreError::Validation(
            "Source name must not start with a dot".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(format!(
            "Source name '{name}' may only contain alphanumeric, hyphen, underscore, or dot characters"
        )));
    }
    Ok(())
}

/// Validate an uploaded file name: a single path component with a valid stem.
pub fn validate_upload_filename(filename: &str) -> Result<(), CoreError> {
    if filename.contains('/') || filename.contains('\\') {
        return Err(CoreError::Validation(format!(
            "Upload file name '{filename}' must not contain path separators"
        )));
    }
    validate_source_name(filename)
}

/// Derive the source name for an uploaded dataset: the file name without
/// its extension (`billing.csv` -> `billing`).
pub fn source_name_from_filename(filename: &str) -> Result<String, CoreError> {
    validate_upload_filename(filename)?;
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    validate_source_name(stem)?;
    Ok(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass() {
        assert!(validate_source_name("billing-daily_v2.eu").is_ok());
    }

    #[test]
    fn empty_name_fails() {
        assert!(validate_source_name("").is_err());
    }

    #[test]
    fn hidden_name_fails() {
        assert!(validate_source_name(".secret").is_err());
    }

    #[test]
    fn traversal_fails() {
        assert!(validate_source_name("../etc").is_err());
        assert!(validate_upload_filename("a/b.csv").is_err());
    }

    #[test]
    fn too_long_name_fails() {
        assert!(validate_source_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn source_from_filename_strips_extension() {
        assert_eq!(source_name_from_filename("billing.csv").unwrap(), "billing");
        assert_eq!(source_name_from_filename("feed.v2.csv").unwrap(), "feed.v2");
        assert_eq!(source_name_from_filename("raw").unwrap(), "raw");
    }
}
