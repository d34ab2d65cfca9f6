//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Nothing in the core reads process environment variables during request handling; the
//! binaries read the environment and hand the raw values to the `*_from_env_value`
//! helpers below.

use crate::constants::{DEFAULT_DATA_DIR, EXPORTS_DIR_NAME};
use crate::identifier::SecretSalt;
use crate::store::{FileStore, MemoryStore, RecordStore};
use crate::{PatientError, PatientResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Which record store backs the services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    /// YAML files under the data directory.
    File,
    /// Process memory; contents are lost on exit.
    Memory,
}

impl FromStr for StoreKind {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreKind::File),
            "memory" => Ok(StoreKind::Memory),
            other => Err(PatientError::InvalidInput(format!(
                "unknown store kind '{other}' (expected 'file' or 'memory')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    secret_salt: SecretSalt,
    store_kind: StoreKind,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(data_dir: PathBuf, secret_salt: SecretSalt, store_kind: StoreKind) -> Self {
        Self {
            data_dir,
            secret_salt,
            store_kind,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn secret_salt(&self) -> &SecretSalt {
        &self.secret_salt
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store_kind
    }

    /// Where export archives are written, for either store kind.
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORTS_DIR_NAME)
    }

    /// Opens the configured record store.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::StorageDirCreation` if the file store's directory tree cannot
    /// be created.
    pub fn open_store(&self) -> PatientResult<Arc<dyn RecordStore>> {
        Ok(match self.store_kind {
            StoreKind::File => Arc::new(FileStore::open(&self.data_dir)?),
            StoreKind::Memory => Arc::new(MemoryStore::new()),
        })
    }
}

/// Parse the secret salt from an optional raw value. The salt is mandatory.
pub fn secret_salt_from_env_value(value: Option<String>) -> PatientResult<SecretSalt> {
    let value = value.ok_or_else(|| PatientError::InvalidInput("SECRET_SALT must be set".into()))?;
    SecretSalt::new(value)
}

/// Parse the store kind, defaulting to the file store when unset or blank.
pub fn store_kind_from_env_value(value: Option<String>) -> PatientResult<StoreKind> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse())
        .transpose()
        .map(|kind| kind.unwrap_or(StoreKind::File))
}

/// Resolve the data directory, defaulting to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_salt_is_rejected() {
        assert!(matches!(
            secret_salt_from_env_value(None),
            Err(PatientError::InvalidInput(_))
        ));
        assert!(matches!(
            secret_salt_from_env_value(Some("   ".into())),
            Err(PatientError::InvalidInput(_))
        ));
        assert!(secret_salt_from_env_value(Some("pepper".into())).is_ok());
    }

    #[test]
    fn store_kind_defaults_to_file() {
        assert_eq!(store_kind_from_env_value(None).unwrap(), StoreKind::File);
        assert_eq!(
            store_kind_from_env_value(Some(" ".into())).unwrap(),
            StoreKind::File
        );
        assert_eq!(
            store_kind_from_env_value(Some("Memory".into())).unwrap(),
            StoreKind::Memory
        );
        assert!(store_kind_from_env_value(Some("sqlite".into())).is_err());
    }

    #[test]
    fn data_dir_defaults_when_unset() {
        assert_eq!(data_dir_from_env_value(None), PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            data_dir_from_env_value(Some("/srv/epr".into())),
            PathBuf::from("/srv/epr")
        );
    }

    #[test]
    fn open_store_creates_file_layout() {
        let temp = tempfile::TempDir::new().unwrap();
        let cfg = CoreConfig::new(
            temp.path().join("data"),
            SecretSalt::new("pepper").unwrap(),
            StoreKind::File,
        );
        let store = cfg.open_store().unwrap();
        assert_eq!(store.count_patients().unwrap(), 0);
        assert!(temp.path().join("data").join("patients").is_dir());
    }
}
