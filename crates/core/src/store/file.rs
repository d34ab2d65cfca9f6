//! YAML-on-disk record store.
//!
//! Layout under the data directory:
//!
//! ```text
//! patients/<s1>/<s2>/<id>/patient.yaml
//! patients/<s1>/<s2>/<id>/observations/<obs-id>.yaml
//! patients/<s1>/<s2>/<id>/medications/<med-id>.yaml
//! fingerprints/<s1>/<s2>/<fingerprint>      (contains the patient id)
//! pseudonyms/<pseudonym>                    (contains the patient id, kept after delete)
//! exports/jobs/<job-id>.yaml
//! ```
//!
//! Index files are created with `create_new`, so the filesystem rejects a second claim on the
//! same fingerprint or pseudonym even if the in-process lock were bypassed.

use super::{RecordStore, UniqueField};
use crate::constants::{
    EXPORTS_DIR_NAME, FINGERPRINTS_DIR_NAME, PATIENTS_DIR_NAME, PSEUDONYMS_DIR_NAME,
};
use crate::export::ExportJob;
use crate::identifier::Fingerprint;
use crate::models::{Demographics, Medication, Observation, PatientRecord};
use crate::paths::{
    record_file_name, ExportJobsDir, MedicationsDir, ObservationsDir, PatientFile,
};
use crate::pseudonym::Pseudonym;
use crate::{PatientError, PatientResult};
use chrono::Utc;
use epr_uuid::{sharded_path, ShardableUuid};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::StorageDirCreation` if any top-level directory cannot be created.
    pub fn open(root: &Path) -> PatientResult<Self> {
        let store = Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        };
        for dir in [
            store.patients_dir(),
            store.fingerprints_dir(),
            store.pseudonyms_dir(),
            store.export_jobs_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(PatientError::StorageDirCreation)?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn patients_dir(&self) -> PathBuf {
        self.root.join(PATIENTS_DIR_NAME)
    }

    fn fingerprints_dir(&self) -> PathBuf {
        self.root.join(FINGERPRINTS_DIR_NAME)
    }

    fn pseudonyms_dir(&self) -> PathBuf {
        self.root.join(PSEUDONYMS_DIR_NAME)
    }

    fn export_jobs_dir(&self) -> PathBuf {
        self.root.join(EXPORTS_DIR_NAME).join(ExportJobsDir::NAME)
    }

    fn patient_dir(&self, id: &ShardableUuid) -> PathBuf {
        id.sharded_dir(&self.patients_dir())
    }

    fn fingerprint_entry(&self, fingerprint: &Fingerprint) -> PathBuf {
        sharded_path(&self.fingerprints_dir(), fingerprint.as_str())
    }

    fn pseudonym_entry(&self, pseudonym: &Pseudonym) -> PathBuf {
        self.pseudonyms_dir().join(pseudonym.as_str())
    }

    fn patient_exists(&self, id: &ShardableUuid) -> bool {
        self.patient_dir(id).join(PatientFile::NAME).is_file()
    }

    fn write_new_patient(
        &self,
        id: ShardableUuid,
        fingerprint: Fingerprint,
        demographics: Demographics,
        allocate: &dyn Fn(u64) -> Pseudonym,
        claimed: &mut Vec<PathBuf>,
    ) -> PatientResult<PatientRecord> {
        let pseudonym = allocate(self.issued_pseudonyms()?);
        let pseudonym_entry = self.pseudonym_entry(&pseudonym);
        claim_unique(&pseudonym_entry, &id, UniqueField::Pseudonym)?;
        claimed.push(pseudonym_entry);

        let record = PatientRecord {
            id,
            fingerprint,
            pseudonym,
            sex: demographics.sex,
            age_band: demographics.age_band,
            created_at: Utc::now(),
        };

        let dir = self.patient_dir(&id);
        fs::create_dir_all(&dir).map_err(PatientError::RecordDirCreation)?;
        write_yaml(&dir.join(PatientFile::NAME), &record)?;
        Ok(record)
    }

    /// Removes a fingerprint entry whose patient file is missing, left behind by an insert
    /// that stopped between claiming the entry and writing the record. Call with the write
    /// lock held.
    fn release_orphaned_entry(&self, entry: &Path) -> PatientResult<()> {
        let contents = match fs::read_to_string(entry) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(PatientError::FileRead(e)),
        };
        let live = ShardableUuid::parse(contents.trim())
            .map(|owner| self.patient_exists(&owner))
            .unwrap_or(false);
        if !live {
            tracing::warn!("releasing orphaned fingerprint entry");
            remove_file_if_exists(entry).map_err(PatientError::FileRemove)?;
        }
        Ok(())
    }

    /// Removes everything a failed insert claimed, returning the error to surface.
    fn roll_back_insert(
        &self,
        id: &ShardableUuid,
        claimed: &[PathBuf],
        create_error: PatientError,
    ) -> PatientError {
        let patient_dir = self.patient_dir(id);
        let mut outcomes: Vec<(PathBuf, io::Result<()>)> = claimed
            .iter()
            .map(|path| (path.clone(), remove_file_if_exists(path)))
            .collect();
        outcomes.push((patient_dir.clone(), remove_dir_if_exists(&patient_dir)));

        let cleanup = outcomes
            .into_iter()
            .find_map(|(path, result)| result.err().map(|e| (path, e)));

        match cleanup {
            None => create_error,
            Some((path, cleanup_error)) => PatientError::CleanupAfterCreateFailed {
                path,
                create_error: Box::new(create_error),
                cleanup_error,
            },
        }
    }

    fn insert_dependent<T: Serialize>(
        &self,
        patient_id: &ShardableUuid,
        dir_name: &str,
        id: &ShardableUuid,
        record: &T,
    ) -> PatientResult<()> {
        let _guard = self.write_lock.lock();
        if !self.patient_exists(patient_id) {
            return Err(PatientError::PatientNotFound(patient_id.to_string()));
        }
        let dir = self.patient_dir(patient_id).join(dir_name);
        fs::create_dir_all(&dir).map_err(PatientError::RecordDirCreation)?;
        write_yaml(&dir.join(record_file_name(id)), record)
    }

    fn dependents_of<T: DeserializeOwned>(
        &self,
        patient_id: &ShardableUuid,
        dir_name: &str,
    ) -> PatientResult<Vec<T>> {
        if !self.patient_exists(patient_id) {
            return Err(PatientError::PatientNotFound(patient_id.to_string()));
        }
        let dir = self.patient_dir(patient_id).join(dir_name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PatientError::FileRead(e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(PatientError::FileRead)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(record) = read_yaml(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl RecordStore for FileStore {
    fn find_patient_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> PatientResult<Option<PatientRecord>> {
        let contents = match fs::read_to_string(self.fingerprint_entry(fingerprint)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PatientError::FileRead(e)),
        };
        match ShardableUuid::parse(contents.trim()) {
            Ok(id) => self.get_patient(&id),
            Err(_) => Ok(None),
        }
    }

    fn get_patient(&self, id: &ShardableUuid) -> PatientResult<Option<PatientRecord>> {
        read_yaml(&self.patient_dir(id).join(PatientFile::NAME))
    }

    fn list_patients(&self) -> PatientResult<Vec<PatientRecord>> {
        let mut patients = Vec::new();
        for dir in sharded_leaves(&self.patients_dir()) {
            let path = dir.join(PatientFile::NAME);
            match read_yaml::<PatientRecord>(&path) {
                Ok(Some(record)) => patients.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping unreadable patient record {}: {e}", path.display()),
            }
        }
        Ok(patients)
    }

    fn count_patients(&self) -> PatientResult<u64> {
        let count = sharded_leaves(&self.patients_dir())
            .into_iter()
            .filter(|dir| dir.join(PatientFile::NAME).is_file())
            .count();
        Ok(count as u64)
    }

    fn issued_pseudonyms(&self) -> PatientResult<u64> {
        let mut count = 0u64;
        for entry in fs::read_dir(self.pseudonyms_dir()).map_err(PatientError::FileRead)? {
            let entry = entry.map_err(PatientError::FileRead)?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn insert_patient(
        &self,
        fingerprint: Fingerprint,
        demographics: Demographics,
        allocate: &dyn Fn(u64) -> Pseudonym,
    ) -> PatientResult<PatientRecord> {
        let _guard = self.write_lock.lock();

        let id = ShardableUuid::new();
        let fingerprint_entry = self.fingerprint_entry(&fingerprint);
        self.release_orphaned_entry(&fingerprint_entry)?;
        claim_unique(&fingerprint_entry, &id, UniqueField::Fingerprint)?;

        let mut claimed = vec![fingerprint_entry];
        match self.write_new_patient(id, fingerprint, demographics, allocate, &mut claimed) {
            Ok(record) => {
                tracing::debug!(patient_id = %record.id, pseudonym = %record.pseudonym, "patient stored");
                Ok(record)
            }
            Err(e) => Err(self.roll_back_insert(&id, &claimed, e)),
        }
    }

    fn delete_patient(&self, id: &ShardableUuid) -> PatientResult<bool> {
        let _guard = self.write_lock.lock();

        let Some(record) = self.get_patient(id)? else {
            return Ok(false);
        };

        remove_file_if_exists(&self.fingerprint_entry(&record.fingerprint))
            .map_err(PatientError::FileRemove)?;
        fs::remove_dir_all(self.patient_dir(id)).map_err(PatientError::FileRemove)?;
        Ok(true)
    }

    fn insert_observation(&self, observation: &Observation) -> PatientResult<()> {
        self.insert_dependent(
            &observation.patient_id,
            ObservationsDir::NAME,
            &observation.id,
            observation,
        )
    }

    fn observations_for(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Observation>> {
        self.dependents_of(patient_id, ObservationsDir::NAME)
    }

    fn insert_medication(&self, medication: &Medication) -> PatientResult<()> {
        self.insert_dependent(
            &medication.patient_id,
            MedicationsDir::NAME,
            &medication.id,
            medication,
        )
    }

    fn medications_for(&self, patient_id: &ShardableUuid) -> PatientResult<Vec<Medication>> {
        self.dependents_of(patient_id, MedicationsDir::NAME)
    }

    fn save_export_job(&self, job: &ExportJob) -> PatientResult<()> {
        let _guard = self.write_lock.lock();
        write_yaml(
            &self.export_jobs_dir().join(record_file_name(&job.id)),
            job,
        )
    }

    fn get_export_job(&self, id: &ShardableUuid) -> PatientResult<Option<ExportJob>> {
        read_yaml(&self.export_jobs_dir().join(record_file_name(id)))
    }
}

/// Creates `path` holding `id`, failing if it already exists.
fn claim_unique(path: &Path, id: &ShardableUuid, field: UniqueField) -> PatientResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(PatientError::RecordDirCreation)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(PatientError::UniqueConstraint(field));
        }
        Err(e) => return Err(PatientError::FileWrite(e)),
    };

    if let Err(e) = file.write_all(id.to_string().as_bytes()) {
        let _ = fs::remove_file(path);
        return Err(PatientError::FileWrite(e));
    }
    Ok(())
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> PatientResult<()> {
    let yaml = serde_yaml::to_string(value).map_err(PatientError::YamlSerialization)?;
    fs::write(path, yaml).map_err(PatientError::FileWrite)
}

/// Reads a YAML record, treating a missing file as `None`.
fn read_yaml<T: DeserializeOwned>(path: &Path) -> PatientResult<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PatientError::FileRead(e)),
    };
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(PatientError::YamlDeserialization)
}

fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Lists `<root>/<s1>/<s2>/<leaf>` directories. Unreadable levels are skipped.
fn sharded_leaves(root: &Path) -> Vec<PathBuf> {
    let mut leaves = Vec::new();
    let Ok(s1_entries) = fs::read_dir(root) else {
        return leaves;
    };

    for s1 in s1_entries.flatten() {
        let Ok(s2_entries) = fs::read_dir(s1.path()) else {
            continue;
        };
        for s2 in s2_entries.flatten() {
            let Ok(leaf_entries) = fs::read_dir(s2.path()) else {
                continue;
            };
            leaves.extend(
                leaf_entries
                    .flatten()
                    .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                    .map(|e| e.path()),
            );
        }
    }
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{IdentifierHasher, SecretSalt};
    use crate::models::{Interpretation, Sex};
    use crate::pseudonym::next_pseudonym;
    use epr_types::NonEmptyText;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fingerprint_of(raw: &str) -> Fingerprint {
        IdentifierHasher::new(SecretSalt::new("file-store-salt").unwrap())
            .fingerprint_raw(raw)
            .unwrap()
    }

    fn demographics() -> Demographics {
        Demographics {
            sex: Sex::F,
            age_band: NonEmptyText::new("46-55").unwrap(),
        }
    }

    fn files_under(dir: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(d) = stack.pop() {
            for entry in fs::read_dir(&d).unwrap().flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    out.push(path);
                }
            }
        }
        out
    }

    #[test]
    fn insert_writes_record_and_indexes() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let fp = fingerprint_of("1234567890");

        let record = store
            .insert_patient(fp.clone(), demographics(), &next_pseudonym)
            .unwrap();

        assert_eq!(record.pseudonym.as_str(), "PAT-000001");
        assert!(store.patient_dir(&record.id).join(PatientFile::NAME).is_file());
        assert!(store.fingerprint_entry(&fp).is_file());
        assert_eq!(store.find_patient_by_fingerprint(&fp).unwrap(), Some(record));
        assert_eq!(store.count_patients().unwrap(), 1);
    }

    #[test]
    fn second_claim_on_fingerprint_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let fp = fingerprint_of("1234567890");

        store
            .insert_patient(fp.clone(), demographics(), &next_pseudonym)
            .unwrap();
        let err = store
            .insert_patient(fp, demographics(), &next_pseudonym)
            .unwrap_err();

        assert!(matches!(
            err,
            PatientError::UniqueConstraint(UniqueField::Fingerprint)
        ));
        assert_eq!(store.count_patients().unwrap(), 1);
        assert_eq!(store.issued_pseudonyms().unwrap(), 1);
    }

    #[test]
    fn reused_pseudonym_rolls_back_fingerprint_claim() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let fixed = |_: u64| Pseudonym::parse("PAT-000001").unwrap();

        store
            .insert_patient(fingerprint_of("1234567890"), demographics(), &fixed)
            .unwrap();
        let second = fingerprint_of("2345678901");
        let err = store
            .insert_patient(second.clone(), demographics(), &fixed)
            .unwrap_err();

        assert!(matches!(
            err,
            PatientError::UniqueConstraint(UniqueField::Pseudonym)
        ));
        assert!(!store.fingerprint_entry(&second).exists());
        assert_eq!(store.count_patients().unwrap(), 1);
    }

    #[test]
    fn concurrent_inserts_of_same_fingerprint_yield_one_record() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(temp.path()).unwrap());
        let fp = fingerprint_of("3456789012");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let fp = fp.clone();
                std::thread::spawn(move || store.insert_patient(fp, demographics(), &next_pseudonym))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.is_duplicate()));
        assert_eq!(store.count_patients().unwrap(), 1);
    }

    #[test]
    fn concurrent_distinct_inserts_get_distinct_pseudonyms() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(temp.path()).unwrap());

        let handles: Vec<_> = (0..10u64)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let fp = fingerprint_of(&format!("{:010}", 5_000_000_000 + n));
                    store.insert_patient(fp, demographics(), &next_pseudonym)
                })
            })
            .collect();

        let mut pseudonyms: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().pseudonym.to_string())
            .collect();
        pseudonyms.sort();
        pseudonyms.dedup();
        assert_eq!(pseudonyms.len(), 10);
        assert_eq!(pseudonyms.first().map(String::as_str), Some("PAT-000001"));
        assert_eq!(pseudonyms.last().map(String::as_str), Some("PAT-000010"));
    }

    #[test]
    fn delete_cascades_and_retires_pseudonym() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let fp = fingerprint_of("1234567890");
        let record = store
            .insert_patient(fp.clone(), demographics(), &next_pseudonym)
            .unwrap();

        let now = Utc::now();
        store
            .insert_observation(&Observation {
                id: ShardableUuid::new(),
                patient_id: record.id,
                kind: NonEmptyText::new("HbA1c").unwrap(),
                value: 38.5,
                unit: NonEmptyText::new("mmol/mol").unwrap(),
                interpretation: Interpretation::Normal,
                performed_date: now,
                created_at: now,
            })
            .unwrap();
        assert_eq!(store.observations_for(&record.id).unwrap().len(), 1);

        assert!(store.delete_patient(&record.id).unwrap());
        assert!(!store.delete_patient(&record.id).unwrap());
        assert!(!store.patient_dir(&record.id).exists());
        assert_eq!(store.find_patient_by_fingerprint(&fp).unwrap(), None);
        assert!(matches!(
            store.observations_for(&record.id),
            Err(PatientError::PatientNotFound(_))
        ));

        let again = store
            .insert_patient(fp, demographics(), &next_pseudonym)
            .unwrap();
        assert_eq!(again.pseudonym.as_str(), "PAT-000002");
    }

    #[test]
    fn orphaned_fingerprint_entry_is_released_on_insert() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let fp = fingerprint_of("1234567890");
        claim_unique(
            &store.fingerprint_entry(&fp),
            &ShardableUuid::new(),
            UniqueField::Fingerprint,
        )
        .unwrap();

        assert_eq!(store.find_patient_by_fingerprint(&fp).unwrap(), None);
        let record = store
            .insert_patient(fp.clone(), demographics(), &next_pseudonym)
            .unwrap();
        assert_eq!(store.find_patient_by_fingerprint(&fp).unwrap(), Some(record));
    }

    #[test]
    fn unreadable_fingerprint_entry_is_released_on_insert() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let fp = fingerprint_of("2345678901");
        let entry = store.fingerprint_entry(&fp);
        fs::create_dir_all(entry.parent().unwrap()).unwrap();
        fs::write(&entry, "half-written").unwrap();

        assert_eq!(store.find_patient_by_fingerprint(&fp).unwrap(), None);
        store
            .insert_patient(fp.clone(), demographics(), &next_pseudonym)
            .unwrap();
        assert!(store.find_patient_by_fingerprint(&fp).unwrap().is_some());
    }

    #[test]
    fn failed_record_write_releases_both_index_entries() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let fp = fingerprint_of("3456789012");

        // A plain file where the patients tree should be makes the record write fail.
        fs::remove_dir_all(store.patients_dir()).unwrap();
        fs::write(store.patients_dir(), "").unwrap();

        let err = store
            .insert_patient(fp.clone(), demographics(), &next_pseudonym)
            .unwrap_err();
        let create_error = match err {
            PatientError::CleanupAfterCreateFailed { create_error, .. } => *create_error,
            other => other,
        };
        assert!(matches!(create_error, PatientError::RecordDirCreation(_)));
        assert!(!store.fingerprint_entry(&fp).exists());
        assert_eq!(store.issued_pseudonyms().unwrap(), 0);

        fs::remove_file(store.patients_dir()).unwrap();
        fs::create_dir_all(store.patients_dir()).unwrap();
        let record = store
            .insert_patient(fp, demographics(), &next_pseudonym)
            .unwrap();
        assert_eq!(record.pseudonym.as_str(), "PAT-000001");
    }

    #[test]
    fn rollback_reports_cleanup_failure() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();

        // remove_file cannot delete a non-empty directory.
        let stubborn = temp.path().join("stubborn");
        fs::create_dir_all(&stubborn).unwrap();
        fs::write(stubborn.join("keep"), "x").unwrap();
        let released = temp.path().join("released");
        fs::write(&released, "id").unwrap();

        let err = store.roll_back_insert(
            &ShardableUuid::new(),
            &[stubborn.clone(), released.clone()],
            PatientError::InvalidInput("write failed".into()),
        );

        match err {
            PatientError::CleanupAfterCreateFailed {
                path, create_error, ..
            } => {
                assert_eq!(path, stubborn);
                assert!(matches!(*create_error, PatientError::InvalidInput(_)));
            }
            other => panic!("expected cleanup failure, got {other:?}"),
        }
        assert!(!released.exists());
    }

    #[test]
    fn dependents_require_existing_patient() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let now = Utc::now();
        let err = store
            .insert_medication(&Medication {
                id: ShardableUuid::new(),
                patient_id: ShardableUuid::new(),
                drug_name: NonEmptyText::new("Metformin").unwrap(),
                dose: NonEmptyText::new("500mg").unwrap(),
                start_date: now,
                stop_date: None,
                created_at: now,
            })
            .unwrap_err();
        assert!(matches!(err, PatientError::PatientNotFound(_)));
    }

    #[test]
    fn raw_identifier_never_reaches_disk() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store
            .insert_patient(fingerprint_of("9876543210"), demographics(), &next_pseudonym)
            .unwrap();

        for path in files_under(temp.path()) {
            let contents = fs::read_to_string(&path).unwrap();
            assert!(
                !contents.contains("9876543210"),
                "identifier leaked into {}",
                path.display()
            );
            assert!(!path.to_string_lossy().contains("9876543210"));
        }
    }
}
