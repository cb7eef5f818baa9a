use std::fmt;

use async_trait::async_trait;

use super::domain::{
    AcademyId, ApplicantRecord, ApplicantRef, CompanyId, JobId, JobPosting, OrganizationProfile,
    SignatureRecord, StudentId, StudentProfile,
};
use super::materializer::{MoaContent, MoaDocument, MoaKey};

/// Backing collections of the placement data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    JobPost,
    AppUser,
    Company,
    Institute,
    Moa,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::JobPost => "jobpost",
            Collection::AppUser => "appuser",
            Collection::Company => "company",
            Collection::Institute => "institute",
            Collection::Moa => "moa",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a set-if-absent signature write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureWrite {
    Stored(ApplicantRecord),
    /// The party had already signed; the stored record is returned untouched.
    AlreadyPresent(ApplicantRecord),
}

/// Result of an atomic find-or-create on the MOA collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoaInsert {
    Created(MoaDocument),
    Existing(MoaDocument),
}

impl MoaInsert {
    pub fn into_document(self) -> MoaDocument {
        match self {
            MoaInsert::Created(document) | MoaInsert::Existing(document) => document,
        }
    }
}

/// Persistence port for applicants, job postings, and MOA documents.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn insert_applicant(
        &self,
        record: ApplicantRecord,
    ) -> Result<ApplicantRecord, RepositoryError>;

    async fn fetch_applicant(
        &self,
        applicant: &ApplicantRef,
    ) -> Result<Option<ApplicantRecord>, RepositoryError>;

    /// Replace the record if its stored version still equals `expected_version`.
    /// Returns the record with its new version; a stale version yields `Conflict`.
    async fn update_applicant(
        &self,
        record: ApplicantRecord,
        expected_version: u64,
    ) -> Result<ApplicantRecord, RepositoryError>;

    /// Field-scoped write of one party's signature, only if that slot is empty.
    async fn put_signature(
        &self,
        applicant: &ApplicantRef,
        signature: SignatureRecord,
    ) -> Result<SignatureWrite, RepositoryError>;

    async fn list_applicants(&self, job_id: &JobId)
        -> Result<Vec<ApplicantRecord>, RepositoryError>;

    async fn fetch_job(&self, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError>;

    async fn find_moa(&self, key: &MoaKey) -> Result<Option<MoaDocument>, RepositoryError>;

    /// Create the document unless one already exists under the same key. Must be atomic.
    async fn insert_moa_if_absent(&self, content: MoaContent)
        -> Result<MoaInsert, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only identity lookups for students and the organizations behind each party.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, LookupError>;
    async fn company(&self, id: &CompanyId) -> Result<Option<OrganizationProfile>, LookupError>;
    async fn academy(&self, id: &AcademyId) -> Result<Option<OrganizationProfile>, LookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("{collection} lookup unavailable: {reason}")]
    Unavailable {
        collection: Collection,
        reason: String,
    },
}

/// Failures that may succeed when repeated unchanged.
pub(crate) trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for RepositoryError {
    fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

impl Transient for LookupError {
    fn is_transient(&self) -> bool {
        true
    }
}
