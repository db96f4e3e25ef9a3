//! Input checks run before any request leaves the client.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::core::ClientError;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 8;
const PASSWORD_SPECIALS: &str = "@$!%*?&.+";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid username regex"));
static PASSWORD_CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\d@$!/%*?&.+]+$").expect("valid password regex"));

fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::Validation(message.into())
}

pub fn require(field: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ClientError> {
    require("Email", email)?;
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(invalid("Invalid email format"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ClientError> {
    require("Username", username)?;
    let length = username.chars().count();
    if length < USERNAME_MIN {
        return Err(invalid(format!(
            "Username must be at least {USERNAME_MIN} characters long"
        )));
    }
    if length > USERNAME_MAX {
        return Err(invalid(format!(
            "Username must be less than {USERNAME_MAX} characters"
        )));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(invalid(
            "Username can only contain letters, numbers, hyphens and underscores",
        ));
    }
    Ok(())
}

/// At least eight characters with an uppercase letter, a lowercase letter,
/// a digit and one of `@$!%*?&.+`.
pub fn validate_password_strength(password: &str) -> Result<(), ClientError> {
    require("Password", password)?;
    let strong = password.chars().count() >= PASSWORD_MIN
        && PASSWORD_CHARSET_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !strong {
        return Err(invalid(
            "Password must be at least 8 characters long and include at least one uppercase letter, one lowercase letter, one number, and one special character",
        ));
    }
    Ok(())
}

pub fn validate_confirmation(password: &str, confirmation: &str) -> Result<(), ClientError> {
    require("Password confirmation", confirmation)?;
    if password != confirmation {
        return Err(invalid("Passwords do not match"));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ClientError> {
    if title.trim().is_empty() {
        return Err(invalid("Title cannot be empty"));
    }
    Ok(())
}

/// Checks extension and size of a file before it is uploaded.
pub fn validate_upload(
    path: &Path,
    size: u64,
    allowed_extensions: &[String],
    max_bytes: u64,
) -> Result<(), ClientError> {
    let name = path.display();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
    {
        return Err(invalid(format!(
            "Extension not allowed: {name} (accepted: {})",
            allowed_extensions.join(", ")
        )));
    }
    if size > max_bytes {
        return Err(invalid(format!("File too large: {name}")));
    }
    Ok(())
}
