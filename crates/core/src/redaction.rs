//! Identifier redaction for free text.
//!
//! A last line of defence for log output: anything shaped like a national identifier is
//! replaced with [`REDACTED_IDENTIFIER`] before it is written.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Replacement text for a redacted identifier.
pub const REDACTED_IDENTIFIER: &str = "[REDACTED-NHS]";

// Ten contiguous digits, or the 3-3-4 grouped form accepted on input.
static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{10}|\d{3}[- ]\d{3}[- ]\d{4})\b").expect("identifier pattern is valid")
});

/// Replaces every identifier-shaped run in `text`. Borrows when nothing matched.
pub fn redact_identifiers(text: &str) -> Cow<'_, str> {
    IDENTIFIER_PATTERN.replace_all(text, REDACTED_IDENTIFIER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_standalone_identifiers() {
        assert_eq!(
            redact_identifiers("lookup for 1234567890 failed"),
            "lookup for [REDACTED-NHS] failed"
        );
        assert_eq!(
            redact_identifiers("id=123-456-7890 and 123 456 7890"),
            "id=[REDACTED-NHS] and [REDACTED-NHS]"
        );
    }

    #[test]
    fn leaves_other_numbers_alone() {
        for text in ["PAT-000001", "count 12345", "12345678901", "abc1234567890def"] {
            assert!(matches!(redact_identifiers(text), Cow::Borrowed(_)), "{text}");
        }
    }

    #[test]
    fn leaves_fingerprints_alone() {
        let fp = "a1234567890b".repeat(5);
        assert_eq!(redact_identifiers(&fp), fp);
    }
}
