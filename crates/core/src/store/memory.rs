//! In-process record store.

use super::{RecordStore, UniqueField};
use crate::export::ExportJob;
use crate::identifier::Fingerprint;
use crate::models::{Demographics, Medication, Observation, PatientRecord};
use crate::pseudonym::Pseudonym;
use crate::{PatientError, PatientResult};
use chrono::Utc;
use epr_uuid::ShardableUuid;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct Tables {
    patients: HashMap<ShardableUuid, PatientRecord>,
    by_fingerprint: HashMap<Fingerprint, ShardableUuid>,
    /// Every pseudonym ever issued. Not pruned on delete.
    pseudonyms: HashSet<Pseudonym>,
    observations: HashMap<ShardableUuid, Vec<Observation>>,
    medications: HashMap<ShardableUuid, Vec<Medication>>,
    export_jobs: HashMap<ShardableUuid, ExportJob>,
}

/// Record store backed by maps behind a single lock. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn find_patient_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> PatientResult<Option<PatientRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .by_fingerprint
            .get(fingerprint)
            .and_then(|id| tables.patients.get(id))
            .cloned())
    }

    fn get_patient(&self, id: &ShardableUuid) -> PatientResult<Option<PatientRecord>> {
        Ok(self.tables.read().patients.get(id).cloned())
    }

    fn list_patients(&self) -> PatientResult<Vec<PatientRecord>> {
        Ok(self.tables.read().patients.values().cloned().collect())
    }

    fn count_patients(&self) -> PatientResult<u64> {
        Ok(self.tables.read().patients.len() as u64)
    }

    fn issued_pseudonyms(&self) -> PatientResult<u64> {
        Ok(self.tables.read().pseudonyms.len() as u64)
    }

    fn insert_patient(
        &self,
        fingerprint: Fingerprint,
        demographics: Demographics,
        allocate: &dyn Fn(u64) -> Pseudonym,
    ) -> PatientResult<PatientRecord> {
        let mut tables = self.tables.write();

        if tables.by_fingerprint.contains_key(&fingerprint) {
            return Err(PatientError::UniqueConstraint(UniqueField::Fingerprint));
        }
        let pseudonym = allocate(tables.pseudonyms.len() as u64);
        if tables.pseudonyms.contains(&pseudonym) {
            return Err(PatientError::UniqueConstraint(UniqueField::Pseudonym));
        }

        let record = PatientRecord {
            id: ShardableUuid::new(),
            fingerprint,
            pseudonym,
            sex: demographics.sex,
            age_band: demographics.age_band,
            created_at: Utc::now(),
        };
        tables.pseudonyms.insert(record.pseudonym.clone());
        tables
            .by_fingerprint
            .insert(record.fingerprint.clone(), record.id);
        tables.patients.insert(record.id, record.clone());
        Ok(record)
    }

    fn delete_patient(&self, id: &ShardableUuid) -> PatientResult<bool> {
        let mut tables = self.tables.write();
        let Some(record) = tables.patients.remove(id) else {
            return Ok(false);
        };
        tables.by_fingerprint.remove(&record.fingerprint);
        tables.observations.remove(id);
        tables.medications.remove(id);
        Ok(true)
    }

    fn insert_observation(&self, observation: &Observation) -> PatientResult<()> {
        let mut tables = self.tables.write();
        if !tables.patients.contains_key(&observation.patient_id) {
            return Err(PatientError::PatientNotFound(
                observation.patient_id.to_string(),
            ));
        }
        tables
            .observations
            .entry(observation.patient_id)
            .or_default()
            .push(observation.clone());
        Ok(())
    }

    fn observations_for(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Observation>> {
        let tables = self.tables.read();
        if !tables.patients.contains_key(patient_id) {
            return Err(PatientError::PatientNotFound(patient_id.to_string()));
        }
        Ok(tables
            .observations
            .get(patient_id)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_medication(&self, medication: &Medication) -> PatientResult<()> {
        let mut tables = self.tables.write();
        if !tables.patients.contains_key(&medication.patient_id) {
            return Err(PatientError::PatientNotFound(
                medication.patient_id.to_string(),
            ));
        }
        tables
            .medications
            .entry(medication.patient_id)
            .or_default()
            .push(medication.clone());
        Ok(())
    }

    fn medications_for(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Medication>> {
        let tables = self.tables.read();
        if !tables.patients.contains_key(patient_id) {
            return Err(PatientError::PatientNotFound(patient_id.to_string()));
        }
        Ok(tables
            .medications
            .get(patient_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save_export_job(&self, job: &ExportJob) -> PatientResult<()> {
        self.tables.write().export_jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn get_export_job(&self, id: &ShardableUuid) -> PatientResult<Option<ExportJob>> {
        Ok(self.tables.read().export_jobs.get(id).cloned())
    }
}
