//! Canonical UUID wrapper used as the key of every stored record.

use crate::{UuidError, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Returns `parent_dir/<key[0..2]>/<key[2..4]>/<key>`.
///
/// `key` must be at least four ASCII characters long; callers pass canonical UUIDs or
/// SHA-256 hex digests, both of which satisfy this.
pub fn sharded_path(parent_dir: &Path, key: &str) -> PathBuf {
    debug_assert!(key.len() >= 4 && key.is_ascii());
    parent_dir.join(&key[0..2]).join(&key[2..4]).join(key)
}

/// Canonical UUID (32 lowercase hex characters, no hyphens).
///
/// Once constructed the contained UUID is guaranteed to render in canonical form, so it can
/// be used directly for directory names and API identifiers.
///
/// # Construction
/// - [`ShardableUuid::new`] generates a fresh v4 identifier for a new record.
/// - [`ShardableUuid::parse`] validates an externally supplied identifier. Hyphenated or
///   uppercase spellings are rejected rather than normalised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardableUuid(Uuid);

impl Default for ShardableUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardableUuid {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(
                "identifier must be 32 lowercase hex characters without hyphens".into(),
            ));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns true if `input` is in canonical form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>/` for this identifier.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        sharded_path(parent_dir, &self.to_string())
    }
}

impl fmt::Display for ShardableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ShardableUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShardableUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ShardableUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ShardableUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShardableUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_form() {
        let id = ShardableUuid::new().to_string();
        assert_eq!(id.len(), 32);
        assert!(ShardableUuid::is_canonical(&id));
    }

    #[test]
    fn test_parse_round_trips_canonical_input() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let parsed = ShardableUuid::parse(canonical).unwrap();
        assert_eq!(parsed.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_non_canonical_spellings() {
        for input in [
            "550e8400-e29b-41d4-a716-446655440000",
            "550E8400E29B41D4A716446655440000",
            "550e8400e29b41d4a71644665544000",
            "550e8400e29b41d4a7164466554400000",
            "550e8400e29b41d4a716446655440zzz",
            "",
        ] {
            assert!(
                matches!(ShardableUuid::parse(input), Err(UuidError::InvalidInput(_))),
                "expected rejection for {input:?}"
            );
        }
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(
            id.sharded_dir(Path::new("/epr_data/patients")),
            PathBuf::from("/epr_data/patients/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_sharded_path_for_hex_digest() {
        let digest = "ab3f9e0000000000000000000000000000000000000000000000000000000000";
        assert_eq!(
            sharded_path(Path::new("/idx"), digest),
            PathBuf::from(format!("/idx/ab/3f/{digest}"))
        );
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ShardableUuid::parse("00112233445566778899aabbccddeeff").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00112233445566778899aabbccddeeff\"");

        let err = serde_json::from_str::<ShardableUuid>("\"not-a-uuid\"").unwrap_err();
        assert!(err.to_string().contains("32 lowercase hex"));
    }
}
