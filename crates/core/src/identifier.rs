//! National identifier normalisation and fingerprinting.
//!
//! A raw national identifier is the only directly identifying value the service ever sees.
//! It is normalised, validated, and hashed with a process-wide secret salt; only the
//! resulting [`Fingerprint`] is stored and used as the join key.
//!
//! The fingerprint is `hex(sha256(normalised ++ salt))`. It is deterministic for a given
//! salt, so the same identifier always finds the same record, and it cannot be reversed
//! without the salt.
//!
//! None of the types here ever print the raw digits: [`NormalisedIdentifier`] has a redacted
//! `Debug` and no `Display`, and [`SecretSalt`] is likewise redacted.

use crate::constants::IDENTIFIER_DIGITS;
use crate::{PatientError, PatientResult};
use sha2::{Digest, Sha256};
use std::fmt;

/// Process-wide secret mixed into every fingerprint.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretSalt(String);

impl SecretSalt {
    /// Wraps a salt value. Blank salts are rejected.
    pub fn new(value: impl Into<String>) -> PatientResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PatientError::InvalidInput(
                "secret salt cannot be empty".into(),
            ));
        }
        Ok(Self(value))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Raw salt value, for deriving other process secrets. Do not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretSalt([REDACTED])")
    }
}

/// A national identifier reduced to exactly ten ASCII digits.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalisedIdentifier(String);

impl NormalisedIdentifier {
    /// Exposes the digits for hashing. Do not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NormalisedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NormalisedIdentifier([REDACTED])")
    }
}

/// Strips whitespace and hyphen separators and requires exactly ten decimal digits.
///
/// # Errors
///
/// Returns [`PatientError::IdentifierFormat`] for any other shape. The error carries no part
/// of the input.
pub fn normalize_and_validate(raw: &str) -> PatientResult<NormalisedIdentifier> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if cleaned.len() != IDENTIFIER_DIGITS || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PatientError::IdentifierFormat);
    }

    Ok(NormalisedIdentifier(cleaned))
}

/// Lowercase hex SHA-256 digest identifying a patient without revealing the identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Length of the hex rendering.
    pub const LEN: usize = 64;

    /// Validates a stored fingerprint string.
    pub fn parse(input: &str) -> PatientResult<Self> {
        let ok = input.len() == Self::LEN
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !ok {
            return Err(PatientError::InvalidInput(
                "fingerprint must be 64 lowercase hex characters".into(),
            ));
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = PatientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Computes the fingerprint of a normalised identifier under `secret`. Pure.
pub fn fingerprint(normalised: &NormalisedIdentifier, secret: &SecretSalt) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(normalised.expose().as_bytes());
    hasher.update(secret.as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Hasher bound to the process secret, injected once at startup.
#[derive(Clone, Debug)]
pub struct IdentifierHasher {
    secret: SecretSalt,
}

impl IdentifierHasher {
    pub fn new(secret: SecretSalt) -> Self {
        Self { secret }
    }

    pub fn fingerprint(&self, normalised: &NormalisedIdentifier) -> Fingerprint {
        fingerprint(normalised, &self.secret)
    }

    /// Normalises, validates and fingerprints a raw identifier in one step.
    pub fn fingerprint_raw(&self, raw: &str) -> PatientResult<Fingerprint> {
        let normalised = normalize_and_validate(raw)?;
        Ok(self.fingerprint(&normalised))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;

    fn hasher() -> IdentifierHasher {
        IdentifierHasher::new(SecretSalt::new("test-salt").unwrap())
    }

    #[test]
    fn separators_are_stripped() {
        for raw in ["123 456 7890", "123-456-7890", "1234567890", " 123-456 7890 "] {
            assert_eq!(normalize_and_validate(raw).unwrap().expose(), "1234567890");
        }
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        for raw in ["12345", "abcdefghij", "123456789", "12345678901", "", "12345.7890", "１２３４５６７８９０"] {
            assert!(
                matches!(normalize_and_validate(raw), Err(PatientError::IdentifierFormat)),
                "expected format error"
            );
        }
    }

    #[test]
    fn format_error_does_not_echo_input() {
        let err = normalize_and_validate("98765x4321").unwrap_err();
        assert!(!err.to_string().contains("98765"));
    }

    #[test]
    fn fingerprint_is_deterministic_lowercase_hex() {
        let h = hasher();
        let a = h.fingerprint_raw("1234567890").unwrap();
        let b = h.fingerprint_raw("123-456-7890").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), Fingerprint::LEN);
        assert!(Fingerprint::parse(a.as_str()).is_ok());
    }

    #[test]
    fn fingerprint_depends_on_salt() {
        let other = IdentifierHasher::new(SecretSalt::new("other-salt").unwrap());
        assert_ne!(
            hasher().fingerprint_raw("1234567890").unwrap(),
            other.fingerprint_raw("1234567890").unwrap()
        );
    }

    #[test]
    fn fingerprint_matches_salted_sha256() {
        // sha256("1234567890" ++ "test-salt")
        let mut expected = Sha256::new();
        expected.update(b"1234567890test-salt");
        assert_eq!(
            hasher().fingerprint_raw("1234567890").unwrap().as_str(),
            hex::encode(expected.finalize())
        );
    }

    #[test]
    fn distinct_identifiers_do_not_collide() {
        let h = hasher();
        let mut rng = rand::thread_rng();
        let mut identifiers = HashSet::new();
        while identifiers.len() < 2000 {
            identifiers.insert(format!("{:010}", rng.gen_range(0..10_000_000_000u64)));
        }

        let fingerprints: HashSet<Fingerprint> = identifiers
            .iter()
            .map(|id| h.fingerprint_raw(id).unwrap())
            .collect();
        assert_eq!(fingerprints.len(), identifiers.len());
    }

    #[test]
    fn debug_output_is_redacted() {
        let id = normalize_and_validate("1234567890").unwrap();
        assert!(!format!("{id:?}").contains("1234567890"));
        let salt = SecretSalt::new("super-secret").unwrap();
        assert!(!format!("{salt:?}").contains("super-secret"));
    }

    #[test]
    fn fingerprint_parse_rejects_bad_shapes() {
        assert!(Fingerprint::parse("ABC").is_err());
        assert!(Fingerprint::parse(&"A".repeat(64)).is_err());
        assert!(Fingerprint::parse(&"a".repeat(64)).is_ok());
    }
}
