//! Thread-safe in-memory adapters for the store and directory ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::domain::{
    AcademyId, ApplicantRecord, ApplicantRef, CompanyId, DocumentId, JobId, JobPosting,
    OrganizationProfile, SignatureRecord, StudentId, StudentProfile,
};
use super::materializer::{MoaContent, MoaDocument, MoaKey};
use super::store::{
    Collection, Directory, LookupError, MoaInsert, PlacementStore, RepositoryError,
    SignatureWrite,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryPlacementStore {
    applicants: Mutex<HashMap<ApplicantRef, ApplicantRecord>>,
    jobs: Mutex<HashMap<JobId, JobPosting>>,
    moas: Mutex<HashMap<MoaKey, MoaDocument>>,
    document_sequence: AtomicU64,
}

impl InMemoryPlacementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, job: JobPosting) -> Result<(), RepositoryError> {
        lock(&self.jobs)?.insert(job.job_id.clone(), job);
        Ok(())
    }

    /// Every stored MOA document, for inspection.
    pub fn documents(&self) -> Result<Vec<MoaDocument>, RepositoryError> {
        Ok(lock(&self.moas)?.values().cloned().collect())
    }

    fn next_document_id(&self) -> DocumentId {
        let id = self.document_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        DocumentId(format!("moa-{id:06}"))
    }
}

#[async_trait]
impl PlacementStore for InMemoryPlacementStore {
    async fn insert_applicant(
        &self,
        record: ApplicantRecord,
    ) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = lock(&self.applicants)?;
        if guard.contains_key(&record.applicant) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.applicant.clone(), record.clone());
        Ok(record)
    }

    async fn fetch_applicant(
        &self,
        applicant: &ApplicantRef,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(lock(&self.applicants)?.get(applicant).cloned())
    }

    async fn update_applicant(
        &self,
        mut record: ApplicantRecord,
        expected_version: u64,
    ) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = lock(&self.applicants)?;
        let stored = guard
            .get_mut(&record.applicant)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::Conflict);
        }

        // Signatures are owned by `put_signature`; a status write never touches them.
        record.signatures = stored.signatures.clone();
        record.version = expected_version + 1;
        *stored = record.clone();
        Ok(record)
    }

    async fn put_signature(
        &self,
        applicant: &ApplicantRef,
        signature: SignatureRecord,
    ) -> Result<SignatureWrite, RepositoryError> {
        let mut guard = lock(&self.applicants)?;
        let stored = guard.get_mut(applicant).ok_or(RepositoryError::NotFound)?;
        let slot = stored.signatures.slot_mut(signature.signed_by);
        if slot.is_some() {
            return Ok(SignatureWrite::AlreadyPresent(stored.clone()));
        }

        *slot = Some(signature);
        stored.version += 1;
        Ok(SignatureWrite::Stored(stored.clone()))
    }

    async fn list_applicants(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        let guard = lock(&self.applicants)?;
        let mut records: Vec<ApplicantRecord> = guard
            .values()
            .filter(|record| &record.applicant.job_id == job_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.applied_at
                .cmp(&b.applied_at)
                .then_with(|| a.applicant.student_id.cmp(&b.applicant.student_id))
        });
        Ok(records)
    }

    async fn fetch_job(&self, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(lock(&self.jobs)?.get(job_id).cloned())
    }

    async fn find_moa(&self, key: &MoaKey) -> Result<Option<MoaDocument>, RepositoryError> {
        Ok(lock(&self.moas)?.get(key).cloned())
    }

    async fn insert_moa_if_absent(
        &self,
        content: MoaContent,
    ) -> Result<MoaInsert, RepositoryError> {
        let mut guard = lock(&self.moas)?;
        if let Some(existing) = guard.get(&content.key) {
            return Ok(MoaInsert::Existing(existing.clone()));
        }

        let document = MoaDocument {
            document_id: self.next_document_id(),
            content,
        };
        guard.insert(document.content.key.clone(), document.clone());
        Ok(MoaInsert::Created(document))
    }
}

#[derive(Default)]
pub struct InMemoryDirectory {
    students: Mutex<HashMap<StudentId, StudentProfile>>,
    companies: Mutex<HashMap<String, OrganizationProfile>>,
    academies: Mutex<HashMap<String, OrganizationProfile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_student(&self, student: StudentProfile) -> Result<(), RepositoryError> {
        lock(&self.students)?.insert(student.student_id.clone(), student);
        Ok(())
    }

    pub fn insert_company(&self, company: OrganizationProfile) -> Result<(), RepositoryError> {
        lock(&self.companies)?.insert(company.id.clone(), company);
        Ok(())
    }

    pub fn insert_academy(&self, academy: OrganizationProfile) -> Result<(), RepositoryError> {
        lock(&self.academies)?.insert(academy.id.clone(), academy);
        Ok(())
    }
}

fn lookup<K, V>(
    mutex: &Mutex<HashMap<K, V>>,
    key: &K,
    collection: Collection,
) -> Result<Option<V>, LookupError>
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    let guard = mutex.lock().map_err(|_| LookupError::Unavailable {
        collection,
        reason: "in-memory directory lock poisoned".to_string(),
    })?;
    Ok(guard.get(key).cloned())
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, LookupError> {
        lookup(&self.students, id, Collection::AppUser)
    }

    async fn company(&self, id: &CompanyId) -> Result<Option<OrganizationProfile>, LookupError> {
        lookup(&self.companies, &id.0, Collection::Company)
    }

    async fn academy(&self, id: &AcademyId) -> Result<Option<OrganizationProfile>, LookupError> {
        lookup(&self.academies, &id.0, Collection::Institute)
    }
}
