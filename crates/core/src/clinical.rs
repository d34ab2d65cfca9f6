//! Observations and medications recorded against a patient.

use crate::models::{Medication, NewMedication, NewObservation, Observation};
use crate::store::RecordStore;
use crate::{PatientError, PatientResult};
use chrono::Utc;
use epr_uuid::ShardableUuid;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ClinicalService {
    store: Arc<dyn RecordStore>,
}

impl ClinicalService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Records a lab result or measurement.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a non-finite value, `PatientNotFound` if the patient does not exist.
    pub fn add_observation(&self, new: NewObservation) -> PatientResult<Observation> {
        if !new.value.is_finite() {
            return Err(PatientError::InvalidInput(
                "observation value must be a finite number".into(),
            ));
        }

        let observation = Observation {
            id: ShardableUuid::new(),
            patient_id: new.patient_id,
            kind: new.kind,
            value: new.value,
            unit: new.unit,
            interpretation: new.interpretation,
            performed_date: new.performed_date,
            created_at: Utc::now(),
        };
        self.store.insert_observation(&observation)?;
        tracing::debug!(
            patient_id = %observation.patient_id,
            kind = %observation.kind,
            "observation recorded"
        );
        Ok(observation)
    }

    /// Observations for a patient, most recently performed first.
    pub fn observations(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Observation>> {
        let mut observations = self.store.observations_for(patient_id)?;
        observations.sort_by(|a, b| b.performed_date.cmp(&a.performed_date));
        Ok(observations)
    }

    /// Records a prescription.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `stop_date` precedes `start_date`, `PatientNotFound` if the patient
    /// does not exist.
    pub fn add_medication(&self, new: NewMedication) -> PatientResult<Medication> {
        if let Some(stop) = new.stop_date {
            if stop < new.start_date {
                return Err(PatientError::InvalidInput(
                    "stop_date cannot be earlier than start_date".into(),
                ));
            }
        }

        let medication = Medication {
            id: ShardableUuid::new(),
            patient_id: new.patient_id,
            drug_name: new.drug_name,
            dose: new.dose,
            start_date: new.start_date,
            stop_date: new.stop_date,
            created_at: Utc::now(),
        };
        self.store.insert_medication(&medication)?;
        tracing::debug!(
            patient_id = %medication.patient_id,
            drug = %medication.drug_name,
            "medication recorded"
        );
        Ok(medication)
    }

    /// Medications for a patient, most recently started first.
    pub fn medications(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Medication>> {
        let mut medications = self.store.medications_for(patient_id)?;
        medications.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(medications)
    }
}
