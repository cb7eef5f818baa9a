use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for students (the `appuser` collection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for published internship postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademyId(pub String);

/// Identifier assigned by the store to a materialized MOA document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to one student's candidacy for one job posting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantRef {
    pub job_id: JobId,
    pub student_id: StudentId,
}

impl ApplicantRef {
    pub fn new(job_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId(job_id.into()),
            student_id: StudentId(student_id.into()),
        }
    }
}

impl fmt::Display for ApplicantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "applicant {} for job {}", self.student_id, self.job_id)
    }
}

/// Hiring status of an applicant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantStatus {
    #[default]
    Applied,
    Shortlisted,
    Selected,
    Rejected,
}

impl ApplicantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantStatus::Applied => "applied",
            ApplicantStatus::Shortlisted => "shortlisted",
            ApplicantStatus::Selected => "selected",
            ApplicantStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicantStatus::Rejected)
    }
}

impl fmt::Display for ApplicantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Interview slot attached when an applicant is shortlisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub meeting_link: String,
}

/// Internship term derived when an applicant is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternshipTerm {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_hours: u32,
}

/// Signing party on a memorandum of agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Company,
    Academy,
}

impl Party {
    pub const fn label(self) -> &'static str {
        match self {
            Party::Company => "company",
            Party::Academy => "academy",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One party's sign-off. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signed_by: Party,
    /// Opaque image payload, usually a `data:` URI.
    pub signature_image: String,
    pub signed_at: DateTime<Utc>,
}

/// Signature slots embedded in the applicant record, at most one per party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures {
    pub company: Option<SignatureRecord>,
    pub academy: Option<SignatureRecord>,
}

impl Signatures {
    pub fn get(&self, party: Party) -> Option<&SignatureRecord> {
        match party {
            Party::Company => self.company.as_ref(),
            Party::Academy => self.academy.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, party: Party) -> &mut Option<SignatureRecord> {
        match party {
            Party::Company => &mut self.company,
            Party::Academy => &mut self.academy,
        }
    }

    pub fn both_present(&self) -> bool {
        self.company.is_some() && self.academy.is_some()
    }
}

/// Stored applicant document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub applicant: ApplicantRef,
    pub student_name: String,
    pub status: ApplicantStatus,
    pub interview: Option<Interview>,
    pub term: Option<InternshipTerm>,
    pub signatures: Signatures,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by the store on every accepted write.
    pub version: u64,
}

impl ApplicantRecord {
    pub fn new(applicant: ApplicantRef, student_name: String, now: DateTime<Utc>) -> Self {
        Self {
            applicant,
            student_name,
            status: ApplicantStatus::Applied,
            interview: None,
            term: None,
            signatures: Signatures::default(),
            applied_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn view(&self) -> ApplicantView {
        ApplicantView {
            job_id: self.applicant.job_id.clone(),
            student_id: self.applicant.student_id.clone(),
            student_name: self.student_name.clone(),
            status: self.status.label(),
            interview: self.interview.clone(),
            term: self.term,
            company_signed: self.signatures.company.is_some(),
            academy_signed: self.signatures.academy.is_some(),
            version: self.version,
        }
    }
}

/// Projection returned to API callers. Signature images are never echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantView {
    pub job_id: JobId,
    pub student_id: StudentId,
    pub student_name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview: Option<Interview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<InternshipTerm>,
    pub company_signed: bool,
    pub academy_signed: bool,
    pub version: u64,
}

/// Published internship posting (the `jobpost` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub job_id: JobId,
    pub company_id: CompanyId,
    pub title: String,
    /// Free text such as `"2 months"`, validated when a term is derived.
    pub duration: String,
}

/// Student profile with the academy they are enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub academy_id: Option<AcademyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representative {
    pub name: String,
    pub position: String,
}

/// Company or academy identity with its registered representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub id: String,
    pub name: String,
    pub address: String,
    pub representative: Option<Representative>,
}

/// Explicit session context passed into every workflow call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorRole {
    Company { company_id: CompanyId },
    Academy { academy_id: AcademyId },
    Student { student_id: StudentId },
}

impl Actor {
    pub fn company(user_id: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Company {
                company_id: CompanyId(company_id.into()),
            },
        }
    }

    pub fn academy(user_id: impl Into<String>, academy_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: ActorRole::Academy {
                academy_id: AcademyId(academy_id.into()),
            },
        }
    }

    pub fn student(student_id: impl Into<String>) -> Self {
        let student_id = student_id.into();
        Self {
            user_id: student_id.clone(),
            role: ActorRole::Student {
                student_id: StudentId(student_id),
            },
        }
    }

    /// Signing party this actor represents, if any.
    pub fn party(&self) -> Option<Party> {
        match self.role {
            ActorRole::Company { .. } => Some(Party::Company),
            ActorRole::Academy { .. } => Some(Party::Academy),
            ActorRole::Student { .. } => None,
        }
    }
}
