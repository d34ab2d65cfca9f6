//! Record types held by the store.

use crate::identifier::Fingerprint;
use crate::pseudonym::Pseudonym;
use crate::PatientError;
use chrono::{DateTime, Utc};
use epr_types::NonEmptyText;
use epr_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
    Other,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::M => "M",
            Sex::F => "F",
            Sex::Other => "Other",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Sex::M),
            "F" => Ok(Sex::F),
            "Other" => Ok(Sex::Other),
            _ => Err(PatientError::InvalidInput(
                "sex must be one of M, F, Other".into(),
            )),
        }
    }
}

/// Non-identifying attributes supplied when a patient is registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Demographics {
    pub sex: Sex,
    pub age_band: NonEmptyText,
}

/// A registered patient. Holds the fingerprint, never the raw identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: ShardableUuid,
    pub fingerprint: Fingerprint,
    pub pseudonym: Pseudonym,
    pub sex: Sex,
    pub age_band: NonEmptyText,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpretation {
    Normal,
    Abnormal,
    Critical,
}

impl Interpretation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interpretation::Normal => "NORMAL",
            Interpretation::Abnormal => "ABNORMAL",
            Interpretation::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interpretation {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(Interpretation::Normal),
            "ABNORMAL" => Ok(Interpretation::Abnormal),
            "CRITICAL" => Ok(Interpretation::Critical),
            _ => Err(PatientError::InvalidInput(
                "interpretation must be one of NORMAL, ABNORMAL, CRITICAL".into(),
            )),
        }
    }
}

/// A lab result or measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ShardableUuid,
    pub patient_id: ShardableUuid,
    #[serde(rename = "type")]
    pub kind: NonEmptyText,
    pub value: f64,
    pub unit: NonEmptyText,
    pub interpretation: Interpretation,
    pub performed_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewObservation {
    pub patient_id: ShardableUuid,
    pub kind: NonEmptyText,
    pub value: f64,
    pub unit: NonEmptyText,
    pub interpretation: Interpretation,
    pub performed_date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: ShardableUuid,
    pub patient_id: ShardableUuid,
    pub drug_name: NonEmptyText,
    pub dose: NonEmptyText,
    pub start_date: DateTime<Utc>,
    pub stop_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewMedication {
    pub patient_id: ShardableUuid,
    pub drug_name: NonEmptyText,
    pub dose: NonEmptyText,
    pub start_date: DateTime<Utc>,
    pub stop_date: Option<DateTime<Utc>>,
}
