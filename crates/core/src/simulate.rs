//! Random lab-result generator for demos.

use crate::clinical::ClinicalService;
use crate::constants::MAX_SIMULATED_EVENTS;
use crate::models::{Interpretation, NewObservation, Observation};
use crate::{PatientError, PatientResult};
use chrono::{Duration, Utc};
use epr_types::NonEmptyText;
use epr_uuid::ShardableUuid;
use rand::Rng;

/// A test the simulator can produce, with its normal range.
#[derive(Clone, Copy, Debug)]
pub struct LabTest {
    pub kind: &'static str,
    pub unit: &'static str,
    pub low: f64,
    pub high: f64,
}

pub const LAB_TESTS: [LabTest; 5] = [
    LabTest { kind: "HbA1c", unit: "mmol/mol", low: 20.0, high: 42.0 },
    LabTest { kind: "Weight", unit: "kg", low: 60.0, high: 90.0 },
    LabTest { kind: "ECG", unit: "ms", low: 350.0, high: 450.0 },
    LabTest { kind: "FBC", unit: "x10^9/L", low: 4.0, high: 11.0 },
    LabTest { kind: "LFT", unit: "U/L", low: 10.0, high: 40.0 },
];

const ABNORMAL_FACTOR: f64 = 1.3;
const CRITICAL_FACTOR: f64 = 1.8;

#[derive(Clone, Debug)]
pub struct EventSimulator {
    clinical: ClinicalService,
}

impl EventSimulator {
    pub fn new(clinical: ClinicalService) -> Self {
        Self { clinical }
    }

    /// Generates `count` observations for a patient using the thread RNG.
    pub fn simulate(&self, patient_id: &ShardableUuid, count: u32) -> PatientResult<Vec<Observation>> {
        self.simulate_with(patient_id, count, &mut rand::thread_rng())
    }

    /// Generates `count` observations drawing from `rng`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` unless `1 <= count <= 50`; `PatientNotFound` for an unknown patient.
    pub fn simulate_with<R: Rng + ?Sized>(
        &self,
        patient_id: &ShardableUuid,
        count: u32,
        rng: &mut R,
    ) -> PatientResult<Vec<Observation>> {
        if count == 0 || count > MAX_SIMULATED_EVENTS {
            return Err(PatientError::InvalidInput(format!(
                "count must be between 1 and {MAX_SIMULATED_EVENTS}"
            )));
        }
        // Fail before generating anything for an unknown patient.
        self.clinical.observations(patient_id)?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let new = random_observation(*patient_id, now, rng)?;
            created.push(self.clinical.add_observation(new)?);
        }
        tracing::info!(patient_id = %patient_id, count, "simulated observations created");
        Ok(created)
    }
}

fn random_observation<R: Rng + ?Sized>(
    patient_id: ShardableUuid,
    now: chrono::DateTime<Utc>,
    rng: &mut R,
) -> PatientResult<NewObservation> {
    let test = LAB_TESTS[rng.gen_range(0..LAB_TESTS.len())];
    let base = rng.gen_range(test.low..=test.high);

    let roll: f64 = rng.gen();
    let (interpretation, value) = if roll < 0.7 {
        (Interpretation::Normal, base)
    } else if roll < 0.9 {
        (Interpretation::Abnormal, base * ABNORMAL_FACTOR)
    } else {
        (Interpretation::Critical, base * CRITICAL_FACTOR)
    };

    Ok(NewObservation {
        patient_id,
        kind: NonEmptyText::new(test.kind)?,
        value: (value * 100.0).round() / 100.0,
        unit: NonEmptyText::new(test.unit)?,
        interpretation,
        performed_date: now - Duration::days(rng.gen_range(1..=90)),
    })
}
