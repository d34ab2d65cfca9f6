//! Constants used throughout the EPR core crate.
//!
//! Directory names, pseudonym shape and the defaults applied when configuration is absent.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "epr_data";

/// Directory name for patient records (sharded by record id).
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for the fingerprint unique index.
pub const FINGERPRINTS_DIR_NAME: &str = "fingerprints";

/// Directory name for the pseudonym unique index. Entries are retained after a patient is
/// deleted so a pseudonym is never issued twice.
pub const PSEUDONYMS_DIR_NAME: &str = "pseudonyms";

/// Directory name for export jobs and archives.
pub const EXPORTS_DIR_NAME: &str = "exports";

/// Prefix of every issued pseudonym.
pub const PSEUDONYM_PREFIX: &str = "PAT";

/// Zero-padded width of the pseudonym sequence number.
pub const PSEUDONYM_DIGITS: usize = 6;

/// Number of digits in a normalised national identifier.
pub const IDENTIFIER_DIGITS: usize = 10;

/// Upper bound for a single simulation request.
pub const MAX_SIMULATED_EVENTS: u32 = 50;

/// Default size of a simulation request.
pub const DEFAULT_SIMULATED_EVENTS: u32 = 10;
