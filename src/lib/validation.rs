//! Input validation utilities
//!
//! Common validation functions for command-line parameters and file paths
//! with consistent error messages, using the structured error types from
//! [`crate::errors`].

use crate::errors::{GamsortError, Result};
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input GAM")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use gamsort_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.gam", "Input GAM");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(GamsortError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validate_file_exists_missing() {
        let result = validate_file_exists("/definitely/not/a/file.gam", "Input GAM");
        let msg = format!("{}", result.unwrap_err());
        assert!(msg.contains("Input GAM"));
        assert!(msg.contains("does not exist"));
    }

    #[test]
    fn test_validate_file_exists_present() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();
        assert!(validate_file_exists(file.path(), "Input GAM").is_ok());
    }
}
