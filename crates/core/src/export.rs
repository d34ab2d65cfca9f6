//! Pseudonymised CSV export.
//!
//! An export job writes three CSV files (`patients.csv`, `medications.csv`, `events.csv`)
//! into a single ZIP archive under the exports directory. Rows are keyed by pseudonym; no
//! fingerprint or identifier ever reaches an archive.

use crate::clinical::ClinicalService;
use crate::models::PatientRecord;
use crate::patient::PatientService;
use crate::store::RecordStore;
use crate::{PatientError, PatientResult};
use chrono::{DateTime, Utc};
use epr_uuid::ShardableUuid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    Pending,
    Complete,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "PENDING",
            ExportStatus::Complete => "COMPLETE",
            ExportStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: ShardableUuid,
    /// `None` exports every patient.
    pub patient_id: Option<ShardableUuid>,
    pub status: ExportStatus,
    pub archive_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl ExportJob {
    fn pending(patient_id: Option<ShardableUuid>) -> Self {
        Self {
            id: ShardableUuid::new(),
            patient_id,
            status: ExportStatus::Pending,
            archive_path: None,
            created_at: Utc::now(),
        }
    }

    /// Filename offered to clients downloading the archive.
    pub fn download_name(&self) -> String {
        format!("epr_export_{}.zip", self.id)
    }
}

#[derive(Clone, Debug)]
pub struct ExportService {
    store: Arc<dyn RecordStore>,
    patients: PatientService,
    clinical: ClinicalService,
    exports_dir: PathBuf,
}

impl ExportService {
    pub fn new(patients: PatientService, exports_dir: PathBuf) -> Self {
        let store = Arc::clone(patients.store());
        Self {
            clinical: ClinicalService::new(Arc::clone(&store)),
            store,
            patients,
            exports_dir,
        }
    }

    /// Runs an export to completion.
    ///
    /// # Errors
    ///
    /// `PatientNotFound` if `patient_id` names no patient (no job is recorded). If writing the
    /// archive fails the job is saved as `FAILED` and the write error is returned.
    pub fn create_export(&self, patient_id: Option<&ShardableUuid>) -> PatientResult<ExportJob> {
        let patients = match patient_id {
            Some(id) => vec![self.patients.get_patient(id)?],
            None => self.patients.list_patients()?,
        };

        let mut job = ExportJob::pending(patient_id.copied());
        self.store.save_export_job(&job)?;

        match self.write_archive(&job.id, &patients) {
            Ok(path) => {
                job.status = ExportStatus::Complete;
                job.archive_path = Some(path);
                self.store.save_export_job(&job)?;
                tracing::info!(job_id = %job.id, patients = patients.len(), "export completed");
                Ok(job)
            }
            Err(e) => {
                job.status = ExportStatus::Failed;
                if let Err(save_error) = self.store.save_export_job(&job) {
                    tracing::error!(job_id = %job.id, "failed to record export failure: {save_error}");
                }
                tracing::error!(job_id = %job.id, "export failed: {e}");
                Err(e)
            }
        }
    }

    pub fn get_job(&self, job_id: &ShardableUuid) -> PatientResult<ExportJob> {
        self.store
            .get_export_job(job_id)?
            .ok_or_else(|| PatientError::ExportJobNotFound(job_id.to_string()))
    }

    /// Returns the job and the path of its finished archive.
    ///
    /// # Errors
    ///
    /// - `ExportJobNotFound` if no such job exists,
    /// - `ExportNotReady` if the job is not `COMPLETE`,
    /// - `ExportFileMissing` if the archive is gone from disk.
    pub fn export_archive(&self, job_id: &ShardableUuid) -> PatientResult<(ExportJob, PathBuf)> {
        let job = self.get_job(job_id)?;
        if job.status != ExportStatus::Complete {
            return Err(PatientError::ExportNotReady(job.status));
        }
        match job.archive_path.clone() {
            Some(path) if path.is_file() => Ok((job, path)),
            _ => Err(PatientError::ExportFileMissing(job_id.to_string())),
        }
    }

    fn write_archive(
        &self,
        job_id: &ShardableUuid,
        patients: &[PatientRecord],
    ) -> PatientResult<PathBuf> {
        fs::create_dir_all(&self.exports_dir).map_err(PatientError::StorageDirCreation)?;

        let entries = [
            ("patients.csv", self.patients_csv(patients)?),
            ("medications.csv", self.medications_csv(patients)?),
            ("events.csv", self.events_csv(patients)?),
        ];

        let path = self.exports_dir.join(format!("{job_id}.zip"));
        if let Err(e) = write_zip(&path, &entries) {
            let _ = fs::remove_file(&path);
            return Err(e);
        }
        Ok(path)
    }

    fn patients_csv(&self, patients: &[PatientRecord]) -> PatientResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["pseudonymous_number", "age_band", "sex"])?;
        for patient in patients {
            writer.write_record([
                patient.pseudonym.as_str(),
                patient.age_band.as_str(),
                patient.sex.as_str(),
            ])?;
        }
        finish_csv(writer)
    }

    fn medications_csv(&self, patients: &[PatientRecord]) -> PatientResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "pseudonymous_number",
            "drug_name",
            "start_date",
            "stop_date",
            "dose",
        ])?;
        for patient in patients {
            for med in self.clinical.medications(&patient.id)? {
                let stop = med
                    .stop_date
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_default();
                let start = med.start_date.format(DATE_FORMAT).to_string();
                writer.write_record([
                    patient.pseudonym.as_str(),
                    med.drug_name.as_str(),
                    start.as_str(),
                    stop.as_str(),
                    med.dose.as_str(),
                ])?;
            }
        }
        finish_csv(writer)
    }

    fn events_csv(&self, patients: &[PatientRecord]) -> PatientResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "pseudonymous_number",
            "test_type",
            "performed_date",
            "value",
            "unit",
            "interpretation",
        ])?;
        for patient in patients {
            for obs in self.clinical.observations(&patient.id)? {
                let performed = obs.performed_date.format(DATE_FORMAT).to_string();
                let value = obs.value.to_string();
                writer.write_record([
                    patient.pseudonym.as_str(),
                    obs.kind.as_str(),
                    performed.as_str(),
                    value.as_str(),
                    obs.unit.as_str(),
                    obs.interpretation.as_str(),
                ])?;
            }
        }
        finish_csv(writer)
    }
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> PatientResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| PatientError::Csv(e.into_error().into()))
}

fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) -> PatientResult<()> {
    let file = File::create(path).map_err(PatientError::FileWrite)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(bytes).map_err(PatientError::FileWrite)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{IdentifierHasher, SecretSalt};
    use crate::models::{Demographics, Interpretation, NewMedication, NewObservation, Sex};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use epr_types::NonEmptyText;
    use std::io::Read;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        patients: PatientService,
        clinical: ClinicalService,
        exports: ExportService,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let patients = PatientService::new(
            IdentifierHasher::new(SecretSalt::new("export").unwrap()),
            Arc::clone(&store),
        );
        let exports = ExportService::new(patients.clone(), temp.path().join("exports"));
        Fixture {
            _temp: temp,
            clinical: ClinicalService::new(store),
            patients,
            exports,
        }
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
    }

    fn add_patient(f: &Fixture, raw: &str) -> PatientRecord {
        f.patients
            .create_patient(
                raw,
                Demographics {
                    sex: Sex::F,
                    age_band: NonEmptyText::new("46-55").unwrap(),
                },
            )
            .unwrap()
    }

    #[test]
    fn archive_contains_pseudonymised_csvs() {
        let f = fixture();
        let patient = add_patient(&f, "2345678901");
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        f.clinical
            .add_medication(NewMedication {
                patient_id: patient.id,
                drug_name: NonEmptyText::new("Quetiapine").unwrap(),
                dose: NonEmptyText::new("200mg").unwrap(),
                start_date: start,
                stop_date: Some(start + Duration::days(30)),
            })
            .unwrap();
        f.clinical
            .add_observation(NewObservation {
                patient_id: patient.id,
                kind: NonEmptyText::new("HbA1c").unwrap(),
                value: 52.0,
                unit: NonEmptyText::new("mmol/mol").unwrap(),
                interpretation: Interpretation::Abnormal,
                performed_date: start,
            })
            .unwrap();

        let job = f.exports.create_export(None).unwrap();
        assert_eq!(job.status, ExportStatus::Complete);
        let (_, path) = f.exports.export_archive(&job.id).unwrap();

        assert_eq!(
            read_entry(&path, "patients.csv"),
            "pseudonymous_number,age_band,sex\nPAT-000001,46-55,F\n"
        );
        assert_eq!(
            read_entry(&path, "medications.csv"),
            "pseudonymous_number,drug_name,start_date,stop_date,dose\n\
             PAT-000001,Quetiapine,2024-03-01,2024-03-31,200mg\n"
        );
        assert_eq!(
            read_entry(&path, "events.csv"),
            "pseudonymous_number,test_type,performed_date,value,unit,interpretation\n\
             PAT-000001,HbA1c,2024-03-01,52,mmol/mol,ABNORMAL\n"
        );

        let everything = ["patients.csv", "medications.csv", "events.csv"]
            .map(|name| read_entry(&path, name))
            .join("");
        assert!(!everything.contains("2345678901"));
        assert!(!everything.contains(patient.fingerprint.as_str()));
    }

    #[test]
    fn single_patient_export_filters_rows() {
        let f = fixture();
        let first = add_patient(&f, "1234567890");
        add_patient(&f, "2345678901");

        let job = f.exports.create_export(Some(&first.id)).unwrap();
        assert_eq!(job.patient_id, Some(first.id));
        let (_, path) = f.exports.export_archive(&job.id).unwrap();
        let patients = read_entry(&path, "patients.csv");
        assert!(patients.contains("PAT-000001"));
        assert!(!patients.contains("PAT-000002"));
    }

    #[test]
    fn unknown_patient_records_no_job() {
        let f = fixture();
        assert!(matches!(
            f.exports.create_export(Some(&ShardableUuid::new())),
            Err(PatientError::PatientNotFound(_))
        ));
    }

    #[test]
    fn archive_lookup_failures() {
        let f = fixture();
        assert!(matches!(
            f.exports.export_archive(&ShardableUuid::new()),
            Err(PatientError::ExportJobNotFound(_))
        ));

        let pending = ExportJob::pending(None);
        f.exports.store.save_export_job(&pending).unwrap();
        assert!(matches!(
            f.exports.export_archive(&pending.id),
            Err(PatientError::ExportNotReady(ExportStatus::Pending))
        ));

        let job = f.exports.create_export(None).unwrap();
        let (_, path) = f.exports.export_archive(&job.id).unwrap();
        fs::remove_file(path).unwrap();
        assert!(matches!(
            f.exports.export_archive(&job.id),
            Err(PatientError::ExportFileMissing(_))
        ));
    }

    #[test]
    fn download_name_uses_job_id() {
        let job = ExportJob::pending(None);
        assert_eq!(job.download_name(), format!("epr_export_{}.zip", job.id));
    }
}
