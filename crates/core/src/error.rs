use crate::export::ExportStatus;
use crate::store::UniqueField;

/// Errors raised by the EPR core.
///
/// Messages never carry a raw national identifier. Variants that relate to a patient carry
/// either the record id or the pseudonym.
#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("identifier must be exactly 10 digits")]
    IdentifierFormat,
    #[error("patient with this identifier already exists")]
    DuplicateIdentifier,
    #[error("unique constraint violated on {0}")]
    UniqueConstraint(UniqueField),
    #[error("patient not found: {0}")]
    PatientNotFound(String),
    #[error("export job not found: {0}")]
    ExportJobNotFound(String),
    #[error("export job status: {0}")]
    ExportNotReady(ExportStatus),
    #[error("export file not found for job {0}")]
    ExportFileMissing(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error(
        "create failed and cleanup also failed (path: {path}): create={create_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterCreateFailed {
        path: std::path::PathBuf,
        #[source]
        create_error: Box<PatientError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("invalid text: {0}")]
    Text(#[from] epr_types::TextError),
    #[error("invalid record id: {0}")]
    Uuid(#[from] epr_uuid::UuidError),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;

impl PatientError {
    /// True for outcomes that mean "this identifier is already registered", whether caught
    /// by the pre-insert lookup or by the storage constraint during a concurrent create.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            PatientError::DuplicateIdentifier
                | PatientError::UniqueConstraint(UniqueField::Fingerprint)
        )
    }
}
