//! Input limits and normalisation, applied before anything is stored.
//! All lengths are Unicode code points, not bytes.

use crate::error::{ApiError, ApiResult};

pub const GUESTBOOK_MAX_CHARS: usize = 260;
pub const NOTE_MAX_CHARS: usize = 300;
pub const TITLE_MAX_CHARS: usize = 80;
pub const NICKNAME_MAX_CHARS: usize = 24;
pub const EXCERPT_CHARS: usize = 120;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 32;
pub const PASSWORD_MIN_CHARS: usize = 6;

pub const DEFAULT_NICKNAME: &str = "匿名";
pub const DEFAULT_TITLE: &str = "无题";

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Trimmed, non-empty text of at most `max` code points.
pub fn bounded_text(raw: &str, max: usize, what: &str) -> ApiResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ApiError::validation(format!("{} must not be empty", what)));
    }
    if char_len(text) > max {
        return Err(ApiError::validation(format!(
            "{} must be at most {} characters",
            what, max
        )));
    }
    Ok(text.to_string())
}

/// Trimmed, non-empty text with no length cap (diary bodies).
pub fn required_text(raw: &str, what: &str) -> ApiResult<String> {
    bounded_text(raw, usize::MAX, what)
}

/// Diary title: blank falls back to the default title.
pub fn diary_title(raw: Option<&str>) -> ApiResult<String> {
    let title = raw.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Ok(DEFAULT_TITLE.to_string());
    }
    if char_len(title) > TITLE_MAX_CHARS {
        return Err(ApiError::validation(format!(
            "title must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }
    Ok(title.to_string())
}

/// Self-chosen display name: blank falls back to `default`, long ones are cut.
pub fn display_name(raw: Option<&str>, default: &str) -> String {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return default.to_string();
    }
    name.chars().take(NICKNAME_MAX_CHARS).collect()
}

/// Guestbook nickname.
pub fn nickname(raw: Option<&str>) -> String {
    display_name(raw, DEFAULT_NICKNAME)
}

pub fn username(raw: &str) -> ApiResult<String> {
    let name = raw.trim();
    let len = char_len(name);
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(ApiError::validation(format!(
            "username must be {} to {} characters",
            USERNAME_MIN_CHARS, USERNAME_MAX_CHARS
        )));
    }
    if name.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ApiError::validation(
            "username must not contain spaces or control characters",
        ));
    }
    Ok(name.to_string())
}

pub fn new_password(password: &str, confirm: Option<&str>) -> ApiResult<()> {
    if char_len(password) < PASSWORD_MIN_CHARS {
        return Err(ApiError::validation(format!(
            "password must be at least {} characters",
            PASSWORD_MIN_CHARS
        )));
    }
    if confirm.is_some_and(|c| c != password) {
        return Err(ApiError::validation("passwords do not match"));
    }
    Ok(())
}

/// Neutralise the two characters that open markup, for text shown to
/// anonymous visitors.
pub fn escape_markup(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

pub fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}
