//! # EPR Core
//!
//! Core business logic for the mock EPR service.
//!
//! This crate contains pure data operations and storage:
//! - National identifier normalisation, salted fingerprinting and pseudonym issuance
//! - Patient, observation and medication records behind the [`RecordStore`] trait
//! - CSV/ZIP export, event simulation and demo seeding
//!
//! **No API concerns**: authentication and HTTP servers belong in `api-shared` and `api-rest`.

pub mod clinical;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod identifier;
pub mod models;
pub mod paths;
pub mod patient;
pub mod pseudonym;
pub mod redaction;
pub mod seed;
pub mod simulate;
pub mod store;

pub use clinical::ClinicalService;
pub use config::{
    data_dir_from_env_value, secret_salt_from_env_value, store_kind_from_env_value, CoreConfig,
    StoreKind,
};
pub use error::{PatientError, PatientResult};
pub use export::{ExportJob, ExportService, ExportStatus};
pub use identifier::{
    fingerprint, normalize_and_validate, Fingerprint, IdentifierHasher, NormalisedIdentifier,
    SecretSalt,
};
pub use models::{
    Demographics, Interpretation, Medication, NewMedication, NewObservation, Observation,
    PatientRecord, Sex,
};
pub use patient::PatientService;
pub use pseudonym::{next_pseudonym, Pseudonym};
pub use redaction::{redact_identifiers, REDACTED_IDENTIFIER};
pub use seed::{seed_demo_data, SeedOutcome};
pub use simulate::EventSimulator;
pub use store::{FileStore, MemoryStore, RecordStore, UniqueField};

pub use epr_types::NonEmptyText;
pub use epr_uuid::ShardableUuid;

/// The services a front end needs, built over one shared store.
#[derive(Clone, Debug)]
pub struct Services {
    pub patients: PatientService,
    pub clinical: ClinicalService,
    pub exports: ExportService,
    pub simulator: EventSimulator,
}

impl Services {
    /// Opens the configured store and wires every service to it.
    ///
    /// # Errors
    ///
    /// Returns any error from [`CoreConfig::open_store`].
    pub fn open(cfg: &CoreConfig) -> PatientResult<Self> {
        let store = cfg.open_store()?;
        Ok(Self::with_store(cfg, store))
    }

    pub fn with_store(cfg: &CoreConfig, store: std::sync::Arc<dyn RecordStore>) -> Self {
        let patients = PatientService::from_config(cfg, store.clone());
        let clinical = ClinicalService::new(store);
        Self {
            exports: ExportService::new(patients.clone(), cfg.exports_dir()),
            simulator: EventSimulator::new(clinical.clone()),
            patients,
            clinical,
        }
    }

    /// Seeds demo data if the store is empty.
    pub fn seed_demo_data(&self) -> PatientResult<SeedOutcome> {
        seed_demo_data(&self.patients, &self.clinical)
    }
}
