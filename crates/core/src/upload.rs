//! Input validation and filename sanitising for submitted images.

/// Extensions accepted for submission, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Name used when sanitising strips every character of a file name.
const FALLBACK_NAME: &str = "upload";

/// Why a submitted input was rejected before a job was created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("No file name was provided")]
    MissingName,

    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(String),

    #[error("File is empty: {0}")]
    Empty(String),
}

/// Lowercased extension of `name`, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Keep only ASCII alphanumerics, `.`, `_` and `-`.
pub fn sanitize_filename(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = safe.trim_start_matches('.');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Validate one submitted file and return its sanitised display name.
pub fn validate_upload(name: &str, size: u64) -> Result<String, InputError> {
    if name.trim().is_empty() {
        return Err(InputError::MissingName);
    }
    if !is_allowed(name) {
        return Err(InputError::UnsupportedExtension(name.to_string()));
    }
    if size == 0 {
        return Err(InputError::Empty(name.to_string()));
    }
    Ok(sanitize_filename(name))
}

/// MIME type served for a stored image, by extension.
pub fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// File name under which a job's input or artifact is stored.
///
/// Prefixing the job id keeps resubmissions of the same file apart.
pub fn staged_name(job_id: &str, display_name: &str) -> String {
    format!("{job_id}_{display_name}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
