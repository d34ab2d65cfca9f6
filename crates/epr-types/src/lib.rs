//! Validated text primitives shared across the EPR crates.
//!
//! Free-text record fields (age bands, test types, units, drug names, doses) arrive from
//! HTTP bodies and CLI arguments. Wrapping them in [`NonEmptyText`] moves the "present and
//! reasonably sized" check to the edge, so services and stores never see blank values.

/// Longest free-text value accepted for a single record field.
pub const MAX_TEXT_LEN: usize = 200;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
    /// The trimmed input exceeded the permitted length
    #[error("text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
}

/// A string type that guarantees non-empty, bounded content.
///
/// The input is trimmed of leading and trailing whitespace during construction and must
/// then hold between 1 and [`MAX_TEXT_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::TooLong`] when the
    /// trimmed input is longer than [`MAX_TEXT_LEN`] characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.chars().count() > MAX_TEXT_LEN {
            return Err(TextError::TooLong { max: MAX_TEXT_LEN });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}
