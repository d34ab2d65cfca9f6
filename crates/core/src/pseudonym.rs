//! Display pseudonyms.
//!
//! A pseudonym is the human-facing label of a patient record, `PAT-000001` style. It carries
//! no information about the underlying identifier; it is simply the next number in
//! sequence at the moment the record is created.

use crate::constants::{PSEUDONYM_DIGITS, PSEUDONYM_PREFIX};
use crate::{PatientError, PatientResult};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pseudonym(String);

impl Pseudonym {
    /// Validates the `PAT-NNNNNN` shape (at least six digits).
    pub fn parse(input: &str) -> PatientResult<Self> {
        let digits = input
            .strip_prefix(PSEUDONYM_PREFIX)
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|d| d.len() >= PSEUDONYM_DIGITS && d.bytes().all(|b| b.is_ascii_digit()));

        match digits {
            Some(_) => Ok(Self(input.to_string())),
            None => Err(PatientError::InvalidInput(format!(
                "pseudonym must look like {PSEUDONYM_PREFIX}-000001"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pseudonym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pseudonym {
    type Error = PatientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Pseudonym::parse(&value)
    }
}

impl From<Pseudonym> for String {
    fn from(value: Pseudonym) -> Self {
        value.0
    }
}

/// Returns the pseudonym following `existing_count` already-issued ones.
///
/// Stateless: the caller supplies the count, and is responsible for reading it under the
/// same lock that guards the insert.
pub fn next_pseudonym(existing_count: u64) -> Pseudonym {
    Pseudonym(format!(
        "{PSEUDONYM_PREFIX}-{:0width$}",
        existing_count + 1,
        width = PSEUDONYM_DIGITS
    ))
}
