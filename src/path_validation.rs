//! Path Validation module for uploaded entry photos
//!
//! Uploaded files are stored flat in the uploads directory under a name the
//! server generates. Anything a client sends back as a filename (for example
//! on `GET /skincare/uploads/{filename}`) is validated before it touches the
//! filesystem:
//!
//! - no path separators, so nothing escapes the uploads directory
//! - no `..` components or null bytes
//! - no forbidden or control characters
//! - no reserved device names (Windows compatibility)
//! - bounded length
//!
//! ```rust
//! use skin_journal::path_validation::{stored_upload_name, validate_upload_filename};
//!
//! assert!(validate_upload_filename("entry_3_1700000000.jpg").is_ok());
//! assert!(validate_upload_filename("../../etc/passwd").is_err());
//! assert_eq!(stored_upload_name(3, "selfie.JPG", 1700000000), "entry_3_1700000000.jpg");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur during path validation
#[derive(Debug, Clone, PartialEq)]
pub enum PathValidationError {
    /// Filename contains `..` or a path separator
    PathTraversal,
    /// Filename contains null bytes
    NullByte,
    /// Filename contains invalid characters
    InvalidCharacters,
    /// Filename is too long
    FilenameTooLong,
    /// Filename uses reserved name
    ReservedName,
    /// Empty filename provided
    EmptyPath,
}

impl fmt::Display for PathValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            PathValidationError::PathTraversal => "filename must not contain '..' or separators",
            PathValidationError::NullByte => "filename contains a null byte",
            PathValidationError::InvalidCharacters => "filename contains invalid characters",
            PathValidationError::FilenameTooLong => "filename is too long",
            PathValidationError::ReservedName => "filename uses a reserved name",
            PathValidationError::EmptyPath => "filename is empty",
        };
        f.write_str(message)
    }
}

impl std::error::Error for PathValidationError {}

/// Result type for path validation operations
pub type PathValidationResult<T> = Result<T, PathValidationError>;

/// Maximum allowed filename length (255 bytes on most filesystems)
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Reserved filenames that should not be used (Windows compatibility)
pub const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters that are not allowed in filenames
pub const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Extensions accepted for stored photos; anything else is stored as `.img`
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Validate a bare filename destined for the uploads directory
pub fn validate_upload_filename(filename: &str) -> PathValidationResult<()> {
    if filename.is_empty() {
        return Err(PathValidationError::EmptyPath);
    }
    if filename.len() > MAX_FILENAME_LENGTH {
        return Err(PathValidationError::FilenameTooLong);
    }
    if filename.contains('\0') {
        return Err(PathValidationError::NullByte);
    }
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(PathValidationError::PathTraversal);
    }
    if filename
        .chars()
        .any(|c| FORBIDDEN_FILENAME_CHARS.contains(&c) || c.is_control())
    {
        return Err(PathValidationError::InvalidCharacters);
    }

    let upper = filename.to_uppercase();
    let stem = upper.split('.').next().unwrap_or("");
    if RESERVED_NAMES.contains(&stem) {
        return Err(PathValidationError::ReservedName);
    }

    Ok(())
}

/// Join a validated filename onto the uploads directory
pub fn resolve_upload_path(uploads_dir: &Path, filename: &str) -> PathValidationResult<PathBuf> {
    validate_upload_filename(filename)?;
    Ok(uploads_dir.join(filename))
}

/// Server-side name for an entry photo: `entry_{id}_{timestamp}.{ext}`.
///
/// Only the extension of the client's filename survives, lowercased, and
/// only when it is a known image extension.
pub fn stored_upload_name(entry_id: i64, original_filename: &str, timestamp: i64) -> String {
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "img".to_string());
    format!("entry_{}_{}.{}", entry_id, timestamp, extension)
}

/// Public URL path stored on the entry for a stored photo
pub fn public_upload_path(stored_name: &str) -> String {
    format!("/uploads/{}", stored_name)
}

/// Inverse of [`public_upload_path`]; `None` for anything not produced by it.
pub fn stored_name_from_public_path(public_path: &str) -> Option<&str> {
    public_path
        .strip_prefix("/uploads/")
        .filter(|name| validate_upload_filename(name).is_ok())
}
