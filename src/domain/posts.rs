//! Post text invariants and display helpers.

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::domain::error::DomainError;

/// Characters of body text shown when a post stands in for itself in a list
/// or a log line.
pub const PREVIEW_LEN: usize = 30;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year] [hour]:[minute] UTC");

/// Validate the body text shared by posts and comments.
///
/// The store level also rejects empty text, but validating here lets form
/// handlers report a field error instead of a persistence failure.
pub fn validate_text(text: &str) -> Result<String, DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::validation("text must not be empty"));
    }
    Ok(text.to_string())
}

/// First `PREVIEW_LEN` characters of the body, respecting char boundaries.
pub fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn format_human_datetime(when: OffsetDateTime) -> String {
    when.format(HUMAN_DATE_FORMAT).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn empty_text_is_rejected() {
        assert!(validate_text("").is_err());
        assert!(validate_text("   \n\t").is_err());
        assert!(validate_text("hello").is_ok());
    }

    #[test]
    fn preview_truncates_long_text() {
        let text = "a".repeat(100);
        assert_eq!(preview(&text).len(), PREVIEW_LEN);
    }

    #[test]
    fn preview_keeps_short_text_whole() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn preview_respects_multibyte_boundaries() {
        let text = "долгий текст поста для проверки границ";
        let cut = preview(text);
        assert_eq!(cut.chars().count(), PREVIEW_LEN);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn human_datetime_renders_utc() {
        let formatted = format_human_datetime(datetime!(2024-03-05 09:30 UTC));
        assert_eq!(formatted, "March 5, 2024 09:30 UTC");
    }
}
