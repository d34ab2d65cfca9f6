//! On-disk names used by the file store.
//!
//! This module defines relative filesystem names only. It contains **no I/O logic**.

/// Patient YAML filename, at the root of each patient directory.
pub struct PatientFile;

impl PatientFile {
    pub const NAME: &'static str = "patient.yaml";
}

/// Directory holding one YAML file per observation, inside the patient directory.
pub struct ObservationsDir;

impl ObservationsDir {
    pub const NAME: &'static str = "observations";
}

/// Directory holding one YAML file per medication, inside the patient directory.
pub struct MedicationsDir;

impl MedicationsDir {
    pub const NAME: &'static str = "medications";
}

/// Directory holding export job YAML files, inside the exports directory.
pub struct ExportJobsDir;

impl ExportJobsDir {
    pub const NAME: &'static str = "jobs";
}

/// Filename for a record keyed by `id` inside a dependents directory.
pub fn record_file_name(id: &impl std::fmt::Display) -> String {
    format!("{id}.yaml")
}
