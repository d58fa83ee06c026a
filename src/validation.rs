//! Local input checks, applied before anything reaches the network.

use crate::config::UploadConfig;
use crate::error::ValidationError;
use crate::types::{ImageUpload, RegistrationRequest};

/// Minimum length of a registration name, in characters
pub const MIN_NAME_LEN: usize = 3;

/// Check an image against the configured formats and size limit
///
/// The type check runs first, so an unsupported file is rejected whatever its size.
pub fn validate_upload(upload: &ImageUpload, config: &UploadConfig) -> Result<(), ValidationError> {
    let content_type = upload.content_type.trim().to_ascii_lowercase();
    if !config
        .supported_formats
        .iter()
        .any(|f| f.eq_ignore_ascii_case(&content_type))
    {
        return Err(ValidationError::UnsupportedFileType {
            content_type: upload.content_type.clone(),
        });
    }

    if upload.bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }

    if upload.size() > config.max_file_size {
        return Err(ValidationError::FileTooLarge {
            size: upload.size(),
            max_mb: config.max_file_size / (1024 * 1024),
        });
    }

    Ok(())
}

/// Build a registration request from raw form input
///
/// The name is trimmed and must have at least [`MIN_NAME_LEN`] characters;
/// a blank email becomes `None`.
pub fn registration_request(
    name: &str,
    email: Option<&str>,
) -> Result<RegistrationRequest, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort { min: MIN_NAME_LEN });
    }

    let email = email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from);

    Ok(RegistrationRequest {
        name: name.to_string(),
        email,
    })
}

/// Trim a user-entered API key, rejecting blank input
pub fn credential_input(key: &str) -> Result<&str, ValidationError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::EmptyCredential);
    }
    Ok(key)
}
