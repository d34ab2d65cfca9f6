//! Request and response bodies shared by the HTTP surface.
//!
//! Responses expose record ids and pseudonyms only. No response type has a field for a
//! fingerprint or a raw identifier.

use chrono::{DateTime, Utc};
use epr_core::{
    ExportJob, Medication, NewMedication, NewObservation, NonEmptyText, Observation,
    PatientRecord, PatientResult, ShardableUuid,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PatientCreateReq {
    /// 10-digit national identifier; spaces and hyphens are ignored.
    pub nhs_number: String,
    /// One of `M`, `F`, `Other`.
    pub sex: String,
    #[schema(example = "26-35")]
    pub age_band: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub pseudonym: String,
    pub sex: String,
    pub age_band: String,
    pub created_at: DateTime<Utc>,
}

impl From<&PatientRecord> for PatientRes {
    fn from(record: &PatientRecord) -> Self {
        Self {
            id: record.id.to_string(),
            pseudonym: record.pseudonym.to_string(),
            sex: record.sex.to_string(),
            age_band: record.age_band.to_string(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientSearchQuery {
    /// National identifier to search for.
    pub identifier: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientIdQuery {
    /// Patient record id.
    pub patient: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ObservationCreateReq {
    pub patient_id: String,
    /// Test type, e.g. HbA1c, Weight, ECG.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub unit: String,
    /// One of `NORMAL`, `ABNORMAL`, `CRITICAL`.
    pub interpretation: String,
    pub performed_date: DateTime<Utc>,
}

impl ObservationCreateReq {
    /// Validates the body for a patient whose id has already been resolved.
    pub fn into_new(self, patient_id: ShardableUuid) -> PatientResult<NewObservation> {
        Ok(NewObservation {
            patient_id,
            kind: NonEmptyText::new(&self.kind)?,
            value: self.value,
            unit: NonEmptyText::new(&self.unit)?,
            interpretation: self.interpretation.parse()?,
            performed_date: self.performed_date,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ObservationRes {
    pub id: String,
    pub patient_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub unit: String,
    pub interpretation: String,
    pub performed_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&Observation> for ObservationRes {
    fn from(obs: &Observation) -> Self {
        Self {
            id: obs.id.to_string(),
            patient_id: obs.patient_id.to_string(),
            kind: obs.kind.to_string(),
            value: obs.value,
            unit: obs.unit.to_string(),
            interpretation: obs.interpretation.to_string(),
            performed_date: obs.performed_date,
            created_at: obs.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MedicationCreateReq {
    pub patient_id: String,
    pub drug_name: String,
    pub dose: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub stop_date: Option<DateTime<Utc>>,
}

impl MedicationCreateReq {
    pub fn into_new(self, patient_id: ShardableUuid) -> PatientResult<NewMedication> {
        Ok(NewMedication {
            patient_id,
            drug_name: NonEmptyText::new(&self.drug_name)?,
            dose: NonEmptyText::new(&self.dose)?,
            start_date: self.start_date,
            stop_date: self.stop_date,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicationRes {
    pub id: String,
    pub patient_id: String,
    pub drug_name: String,
    pub dose: String,
    pub start_date: DateTime<Utc>,
    pub stop_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Medication> for MedicationRes {
    fn from(med: &Medication) -> Self {
        Self {
            id: med.id.to_string(),
            patient_id: med.patient_id.to_string(),
            drug_name: med.drug_name.to_string(),
            dose: med.dose.to_string(),
            start_date: med.start_date,
            stop_date: med.stop_date,
            created_at: med.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Restrict the export to one patient; omit to export everyone.
    pub patient_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportJobRes {
    pub id: String,
    pub patient_id: Option<String>,
    /// `PENDING`, `COMPLETE` or `FAILED`.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ExportJob> for ExportJobRes {
    fn from(job: &ExportJob) -> Self {
        Self {
            id: job.id.to_string(),
            patient_id: job.patient_id.map(|id| id.to_string()),
            status: job.status.to_string(),
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SimulateQuery {
    pub patient_id: String,
    /// Number of events, 1 to 50.
    pub count: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SimulateRes {
    pub message: String,
    pub patient_pseudonym: String,
}

/// Form body of `POST /oauth/token`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenRes {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub status: String,
    pub version: String,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}
