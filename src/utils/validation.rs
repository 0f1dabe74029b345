//! Centralized validation helpers.

/// Log files larger than this are skipped unless configured otherwise (50 MB)
pub const DEFAULT_FILESIZE_LIMIT: u64 = 50_000_000;

pub const MAX_FILENAME_LENGTH: usize = 255;

/// Check whether a log file of `size` bytes may be read.
///
/// Returns a message describing the problem if the file is too large, None if
/// it is safe to read.
#[must_use]
pub fn check_filesize(size: u64, limit: u64) -> Option<String> {
    if size > limit {
        Some(format!(
            "File is {size} bytes, exceeding the limit of {limit} bytes"
        ))
    } else {
        None
    }
}

/// Validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Filename too long: exceeds {MAX_FILENAME_LENGTH} characters")]
    FilenameTooLong,
    #[error("Invalid filename: contains path separators or only invalid characters")]
    InvalidFilename,
    #[error("Empty filename provided")]
    EmptyFilename,
}

/// Turn a data-file name into a safe file stem.
///
/// Data files are named after modules (e.g. `multiqc_cellranger_count`), but
/// the name ends up on disk inside the output directory, so:
/// - path separators and `..` are rejected
/// - characters other than ASCII alphanumerics, `-` and `_` become `_`
///
/// # Errors
///
/// Returns `ValidationError::EmptyFilename` if the name is empty,
/// `ValidationError::FilenameTooLong` if it exceeds the limit, or
/// `ValidationError::InvalidFilename` if it contains path components.
pub fn sanitize_file_stem(name: &str) -> Result<String, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyFilename);
    }

    if name.len() > MAX_FILENAME_LENGTH {
        return Err(ValidationError::FilenameTooLong);
    }

    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(ValidationError::InvalidFilename);
    }

    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.chars().all(|c| c == '_') {
        return Err(ValidationError::InvalidFilename);
    }

    Ok(sanitized)
}
