//! Demo data.
//!
//! Three patients on antipsychotic monitoring, each with ten lab results and two active
//! prescriptions. Seeding only runs against an empty store.

use crate::clinical::ClinicalService;
use crate::models::Interpretation::{self, Abnormal, Critical, Normal};
use crate::models::{Demographics, NewMedication, NewObservation, Sex};
use crate::patient::PatientService;
use crate::PatientResult;
use chrono::{Duration, Utc};
use epr_types::NonEmptyText;

struct SeedObservation {
    kind: &'static str,
    value: f64,
    unit: &'static str,
    interpretation: Interpretation,
    days_ago: i64,
}

struct SeedMedication {
    drug_name: &'static str,
    dose: &'static str,
    days_ago: i64,
}

struct SeedPatient {
    identifier: &'static str,
    sex: Sex,
    age_band: &'static str,
    observations: [SeedObservation; 10],
    medications: [SeedMedication; 2],
}

const fn obs(
    kind: &'static str,
    value: f64,
    unit: &'static str,
    interpretation: Interpretation,
    days_ago: i64,
) -> SeedObservation {
    SeedObservation {
        kind,
        value,
        unit,
        interpretation,
        days_ago,
    }
}

const fn med(drug_name: &'static str, dose: &'static str, days_ago: i64) -> SeedMedication {
    SeedMedication {
        drug_name,
        dose,
        days_ago,
    }
}

const SEED_PATIENTS: [SeedPatient; 3] = [
    SeedPatient {
        identifier: "1234567890",
        sex: Sex::M,
        age_band: "26-35",
        observations: [
            obs("HbA1c", 42.0, "mmol/mol", Normal, 10),
            obs("Weight", 85.5, "kg", Normal, 10),
            obs("ECG", 520.0, "ms", Critical, 11),
            obs("FBC", 6.5, "x10^9/L", Normal, 15),
            obs("LFT", 25.0, "U/L", Normal, 15),
            obs("Weight", 86.0, "kg", Normal, 30),
            obs("HbA1c", 45.0, "mmol/mol", Normal, 60),
            obs("ECG", 420.0, "ms", Normal, 60),
            obs("FBC", 7.0, "x10^9/L", Normal, 90),
            obs("LFT", 30.0, "U/L", Normal, 90),
        ],
        medications: [med("Olanzapine", "10mg", 180), med("Metformin", "500mg", 90)],
    },
    SeedPatient {
        identifier: "2345678901",
        sex: Sex::F,
        age_band: "46-55",
        observations: [
            obs("HbA1c", 52.0, "mmol/mol", Abnormal, 7),
            obs("Weight", 72.0, "kg", Normal, 7),
            obs("ECG", 410.0, "ms", Normal, 8),
            obs("FBC", 5.8, "x10^9/L", Normal, 14),
            obs("LFT", 35.0, "U/L", Normal, 14),
            obs("Weight", 71.5, "kg", Normal, 30),
            obs("HbA1c", 48.0, "mmol/mol", Abnormal, 60),
            obs("ECG", 400.0, "ms", Normal, 60),
            obs("FBC", 6.2, "x10^9/L", Normal, 90),
            obs("LFT", 28.0, "U/L", Normal, 90),
        ],
        medications: [med("Quetiapine", "200mg", 200), med("Atorvastatin", "20mg", 120)],
    },
    SeedPatient {
        identifier: "3456789012",
        sex: Sex::Other,
        age_band: "36-45",
        observations: [
            obs("HbA1c", 38.0, "mmol/mol", Normal, 5),
            obs("Weight", 68.0, "kg", Normal, 5),
            obs("ECG", 390.0, "ms", Normal, 6),
            obs("FBC", 6.0, "x10^9/L", Normal, 10),
            obs("LFT", 22.0, "U/L", Normal, 10),
            obs("Weight", 67.5, "kg", Normal, 30),
            obs("HbA1c", 40.0, "mmol/mol", Normal, 60),
            obs("ECG", 395.0, "ms", Normal, 60),
            obs("FBC", 5.5, "x10^9/L", Normal, 90),
            obs("LFT", 25.0, "U/L", Normal, 90),
        ],
        medications: [med("Risperidone", "4mg", 150), med("Simvastatin", "40mg", 100)],
    },
];

/// What a seeding run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already held patients; nothing was written.
    AlreadySeeded,
    /// Pseudonyms of the patients created.
    Seeded(Vec<String>),
}

/// Populates an empty store with the demo patients.
///
/// # Errors
///
/// Propagates any error from patient or clinical writes. A failure part-way leaves the
/// patients created so far in place.
pub fn seed_demo_data(
    patients: &PatientService,
    clinical: &ClinicalService,
) -> PatientResult<SeedOutcome> {
    if patients.count_patients()? > 0 {
        tracing::info!("store already seeded, skipping");
        return Ok(SeedOutcome::AlreadySeeded);
    }

    let now = Utc::now();
    let mut created = Vec::with_capacity(SEED_PATIENTS.len());

    for seed in &SEED_PATIENTS {
        let patient = patients.create_patient(
            seed.identifier,
            Demographics {
                sex: seed.sex,
                age_band: NonEmptyText::new(seed.age_band)?,
            },
        )?;

        for o in &seed.observations {
            clinical.add_observation(NewObservation {
                patient_id: patient.id,
                kind: NonEmptyText::new(o.kind)?,
                value: o.value,
                unit: NonEmptyText::new(o.unit)?,
                interpretation: o.interpretation,
                performed_date: now - Duration::days(o.days_ago),
            })?;
        }
        for m in &seed.medications {
            clinical.add_medication(NewMedication {
                patient_id: patient.id,
                drug_name: NonEmptyText::new(m.drug_name)?,
                dose: NonEmptyText::new(m.dose)?,
                start_date: now - Duration::days(m.days_ago),
                stop_date: None,
            })?;
        }

        tracing::info!(
            pseudonym = %patient.pseudonym,
            observations = seed.observations.len(),
            medications = seed.medications.len(),
            "seeded patient"
        );
        created.push(patient.pseudonym.to_string());
    }

    Ok(SeedOutcome::Seeded(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{IdentifierHasher, SecretSalt};
    use crate::store::{MemoryStore, RecordStore};
    use std::sync::Arc;

    fn services() -> (PatientService, ClinicalService) {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        (
            PatientService::new(
                IdentifierHasher::new(SecretSalt::new("seed").unwrap()),
                Arc::clone(&store),
            ),
            ClinicalService::new(store),
        )
    }

    #[test]
    fn seeds_three_patients_once() {
        let (patients, clinical) = services();

        let outcome = seed_demo_data(&patients, &clinical).unwrap();
        assert_eq!(
            outcome,
            SeedOutcome::Seeded(vec![
                "PAT-000001".into(),
                "PAT-000002".into(),
                "PAT-000003".into()
            ])
        );

        for record in patients.list_patients().unwrap() {
            assert_eq!(clinical.observations(&record.id).unwrap().len(), 10);
            assert_eq!(clinical.medications(&record.id).unwrap().len(), 2);
        }

        assert_eq!(
            seed_demo_data(&patients, &clinical).unwrap(),
            SeedOutcome::AlreadySeeded
        );
        assert_eq!(patients.count_patients().unwrap(), 3);
    }

    #[test]
    fn seeded_patients_are_findable_by_identifier() {
        let (patients, clinical) = services();
        seed_demo_data(&patients, &clinical).unwrap();

        let found = patients
            .find_patient_by_identifier("2345678901")
            .unwrap()
            .unwrap();
        assert_eq!(found.pseudonym.as_str(), "PAT-000002");
        assert_eq!(found.sex, Sex::F);

        let meds = clinical.medications(&found.id).unwrap();
        assert_eq!(meds[0].drug_name.as_str(), "Atorvastatin");
        assert_eq!(meds[1].drug_name.as_str(), "Quetiapine");
    }
}
