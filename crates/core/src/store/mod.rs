//! Record storage.
//!
//! Services talk to storage through [`RecordStore`]. Two implementations exist:
//!
//! - [`FileStore`]: YAML files in a sharded directory tree, with create-new index files
//!   enforcing fingerprint and pseudonym uniqueness.
//! - [`MemoryStore`]: in-process maps with the same constraints, for tests and throwaway runs.
//!
//! ## Uniqueness
//!
//! [`RecordStore::insert_patient`] is the only way a patient comes into existence. It claims
//! the fingerprint, reads the issued-pseudonym count, allocates the pseudonym via the
//! caller's allocator and writes the record, all under the store's write lock. A second
//! insert with the same fingerprint fails with
//! [`PatientError::UniqueConstraint`](crate::PatientError::UniqueConstraint) regardless of
//! what the caller checked beforehand.
//!
//! Pseudonym index entries outlive deleted patients, so the issued count never goes down and
//! a pseudonym is never handed out twice.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::export::ExportJob;
use crate::identifier::Fingerprint;
use crate::models::{Demographics, Medication, Observation, PatientRecord};
use crate::pseudonym::Pseudonym;
use crate::PatientResult;
use epr_uuid::ShardableUuid;
use std::fmt;

/// Fields the store declares unique.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniqueField {
    Fingerprint,
    Pseudonym,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Fingerprint => f.write_str("fingerprint"),
            UniqueField::Pseudonym => f.write_str("pseudonym"),
        }
    }
}

/// Storage backend for patient records and their dependents.
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Returns the patient holding `fingerprint`, if any.
    fn find_patient_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> PatientResult<Option<PatientRecord>>;

    fn get_patient(&self, id: &ShardableUuid) -> PatientResult<Option<PatientRecord>>;

    /// All live patients, in no particular order.
    fn list_patients(&self) -> PatientResult<Vec<PatientRecord>>;

    /// Number of live patients.
    fn count_patients(&self) -> PatientResult<u64>;

    /// Number of pseudonyms ever issued, including those of deleted patients.
    fn issued_pseudonyms(&self) -> PatientResult<u64>;

    /// Atomically registers a patient.
    ///
    /// `allocate` receives the issued-pseudonym count read under the write lock.
    ///
    /// # Errors
    ///
    /// `UniqueConstraint(Fingerprint)` if the fingerprint is taken,
    /// `UniqueConstraint(Pseudonym)` if the allocator returned an issued pseudonym, or an
    /// I/O error. Nothing is left behind on failure.
    fn insert_patient(
        &self,
        fingerprint: Fingerprint,
        demographics: Demographics,
        allocate: &dyn Fn(u64) -> Pseudonym,
    ) -> PatientResult<PatientRecord>;

    /// Removes a patient with its observations and medications. Returns `false` if the
    /// patient did not exist.
    fn delete_patient(&self, id: &ShardableUuid) -> PatientResult<bool>;

    /// Fails with `PatientNotFound` unless the owning patient exists.
    fn insert_observation(&self, observation: &Observation) -> PatientResult<()>;

    fn observations_for(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Observation>>;

    /// Fails with `PatientNotFound` unless the owning patient exists.
    fn insert_medication(&self, medication: &Medication) -> PatientResult<()>;

    fn medications_for(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Medication>>;

    /// Inserts or replaces an export job.
    fn save_export_job(&self, job: &ExportJob) -> PatientResult<()>;

    fn get_export_job(&self, id: &ShardableUuid) -> PatientResult<Option<ExportJob>>;
}
