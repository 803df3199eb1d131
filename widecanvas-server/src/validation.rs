//! Input validation for untrusted data.
//!
//! Everything arriving over HTTP MUST be validated before it reaches a store
//! or the conversion upstream.

use thiserror::Error;

/// Maximum length for preview IDs (`shape:` plus a UUID is 42 chars).
pub const MAX_PREVIEW_ID_LEN: usize = 128;
/// Maximum length for app names.
pub const MAX_APP_NAME_LEN: usize = 64;
/// Maximum size of a stored HTML document.
pub const MAX_HTML_LEN: usize = 5 * 1024 * 1024; // 5MB
/// Maximum size of a conversion instruction.
pub const MAX_INSTRUCTION_LEN: usize = 8192;
/// Worst-case growth of a string under JSON encoding (a control byte becomes
/// `\u00XX`).
pub const JSON_ESCAPE_FACTOR: usize = 6;
/// Request body limit: the largest document at worst-case escaping plus room
/// for the JSON envelope, so [`validate_html`] decides on the HTML size.
pub const MAX_BODY_LEN: usize = JSON_ESCAPE_FACTOR * MAX_HTML_LEN + 64 * 1024;

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Preview ID exceeds maximum length.
    #[error("id too long (max {MAX_PREVIEW_ID_LEN} chars)")]
    PreviewIdTooLong,
    /// Preview ID is empty or contains invalid characters.
    #[error("id contains invalid characters")]
    PreviewIdInvalidChars,
    /// App name exceeds maximum length.
    #[error("app name too long (max {MAX_APP_NAME_LEN} chars)")]
    AppNameTooLong,
    /// App name is empty or contains invalid characters.
    #[error("app name contains invalid characters")]
    AppNameInvalidChars,
    /// HTML exceeds maximum size.
    #[error("html too large (max {MAX_HTML_LEN} bytes)")]
    HtmlTooLarge,
    /// Instruction exceeds maximum size.
    #[error("instruction too long (max {MAX_INSTRUCTION_LEN} bytes)")]
    InstructionTooLong,
}

impl ValidationError {
    /// Short label used for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::PreviewIdTooLong | Self::PreviewIdInvalidChars => "preview_id",
            Self::AppNameTooLong | Self::AppNameInvalidChars => "app_name",
            Self::HtmlTooLarge => "html",
            Self::InstructionTooLong => "instruction",
        }
    }
}

/// Validate a preview ID.
///
/// Valid preview IDs:
/// - 1-128 characters
/// - ASCII alphanumeric, hyphen, underscore or colon (`shape:<uuid>`)
///
/// # Errors
///
/// Returns [`ValidationError::PreviewIdTooLong`] if the ID is too long.
/// Returns [`ValidationError::PreviewIdInvalidChars`] if the ID is empty or
/// contains invalid characters.
pub fn validate_preview_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_PREVIEW_ID_LEN {
        return Err(ValidationError::PreviewIdTooLong);
    }
    let valid = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':');
    if id.is_empty() || !id.chars().all(valid) {
        return Err(ValidationError::PreviewIdInvalidChars);
    }
    Ok(())
}

/// Validate an app name taken from the URL path.
///
/// Valid app names:
/// - 1-64 characters
/// - ASCII alphanumeric, hyphen or underscore
///
/// # Errors
///
/// Returns [`ValidationError::AppNameTooLong`] or
/// [`ValidationError::AppNameInvalidChars`].
pub fn validate_app_name(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_APP_NAME_LEN {
        return Err(ValidationError::AppNameTooLong);
    }
    let valid = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_');
    if name.is_empty() || !name.chars().all(valid) {
        return Err(ValidationError::AppNameInvalidChars);
    }
    Ok(())
}

/// Validate the size of an HTML document. Empty documents are allowed.
///
/// # Errors
///
/// Returns [`ValidationError::HtmlTooLarge`] if `html` exceeds the limit.
pub fn validate_html(html: &str) -> Result<(), ValidationError> {
    if html.len() > MAX_HTML_LEN {
        return Err(ValidationError::HtmlTooLarge);
    }
    Ok(())
}

/// Validate a caller-supplied conversion instruction.
///
/// # Errors
///
/// Returns [`ValidationError::InstructionTooLong`] if it exceeds the limit.
pub fn validate_instruction(instruction: &str) -> Result<(), ValidationError> {
    if instruction.len() > MAX_INSTRUCTION_LEN {
        return Err(ValidationError::InstructionTooLong);
    }
    Ok(())
}
