//! Patient registration and lookup.
//!
//! [`PatientService`] turns a raw national identifier into a stored [`PatientRecord`]:
//! normalise and validate, fingerprint with the process secret, reject duplicates, then let
//! the store allocate the next pseudonym and persist the record atomically.

use crate::identifier::IdentifierHasher;
use crate::models::{Demographics, PatientRecord};
use crate::pseudonym::{next_pseudonym, Pseudonym};
use crate::store::RecordStore;
use crate::{CoreConfig, PatientError, PatientResult};
use epr_uuid::ShardableUuid;
use std::sync::Arc;

/// Pure patient data operations - no API concerns.
#[derive(Clone, Debug)]
pub struct PatientService {
    hasher: IdentifierHasher,
    store: Arc<dyn RecordStore>,
}

impl PatientService {
    pub fn new(hasher: IdentifierHasher, store: Arc<dyn RecordStore>) -> Self {
        Self { hasher, store }
    }

    /// Builds a service using the configured secret salt.
    pub fn from_config(cfg: &CoreConfig, store: Arc<dyn RecordStore>) -> Self {
        Self::new(IdentifierHasher::new(cfg.secret_salt().clone()), store)
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Registers a new patient.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if:
    /// - the identifier is not ten digits after removing separators (`IdentifierFormat`),
    /// - a patient with the same identifier already exists (`DuplicateIdentifier`),
    /// - the store fails to persist the record.
    ///
    /// A concurrent create that loses the race at the store surfaces as
    /// `UniqueConstraint(Fingerprint)`; callers should test with
    /// [`PatientError::is_duplicate`].
    pub fn create_patient(
        &self,
        raw_identifier: &str,
        demographics: Demographics,
    ) -> PatientResult<PatientRecord> {
        let fingerprint = self.hasher.fingerprint_raw(raw_identifier)?;

        if self.store.find_patient_by_fingerprint(&fingerprint)?.is_some() {
            tracing::info!("rejected duplicate patient registration");
            return Err(PatientError::DuplicateIdentifier);
        }

        let allocate = |issued: u64| -> Pseudonym { next_pseudonym(issued) };
        let record = self
            .store
            .insert_patient(fingerprint, demographics, &allocate)?;

        tracing::info!(pseudonym = %record.pseudonym, "patient created");
        Ok(record)
    }

    /// Looks a patient up by raw identifier.
    ///
    /// # Errors
    ///
    /// `IdentifierFormat` for a malformed identifier, or a store error.
    pub fn find_patient_by_identifier(
        &self,
        raw_identifier: &str,
    ) -> PatientResult<Option<PatientRecord>> {
        let fingerprint = self.hasher.fingerprint_raw(raw_identifier)?;
        self.store.find_patient_by_fingerprint(&fingerprint)
    }

    /// Fetches a patient by record id, failing with `PatientNotFound` if absent.
    pub fn get_patient(&self, id: &ShardableUuid) -> PatientResult<PatientRecord> {
        self.store
            .get_patient(id)?
            .ok_or_else(|| PatientError::PatientNotFound(id.to_string()))
    }

    /// All patients, ordered by pseudonym.
    pub fn list_patients(&self) -> PatientResult<Vec<PatientRecord>> {
        let mut patients = self.store.list_patients()?;
        patients.sort_by(|a, b| {
            a.pseudonym
                .as_str()
                .len()
                .cmp(&b.pseudonym.as_str().len())
                .then_with(|| a.pseudonym.cmp(&b.pseudonym))
        });
        Ok(patients)
    }

    pub fn count_patients(&self) -> PatientResult<u64> {
        self.store.count_patients()
    }

    /// Deletes a patient and everything recorded against them.
    ///
    /// The pseudonym is retired, not recycled.
    pub fn delete_patient(&self, id: &ShardableUuid) -> PatientResult<()> {
        let record = self.get_patient(id)?;
        if !self.store.delete_patient(id)? {
            return Err(PatientError::PatientNotFound(id.to_string()));
        }
        tracing::info!(pseudonym = %record.pseudonym, "patient deleted");
        Ok(())
    }
}
