//! MOA document materialization.
//!
//! A document is composed from the applicant's term, both signatures, and the identity of
//! each party, then created through the store's atomic find-or-create. Only one document
//! ever exists per [`MoaKey`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{
    Actor, ApplicantRecord, ApplicantRef, CompanyId, DocumentId, InternshipTerm, JobId, JobPosting,
    OrganizationProfile, Representative, SignatureRecord, StudentId, StudentProfile,
};
use super::error::PlacementError;
use super::service::PlacementService;
use super::status::InvalidTransition;
use super::store::MoaInsert;

/// Which identity pair deduplicates agreements.
///
/// The default keys on display names, so a renamed student or company gets a second
/// agreement. `StableIds` avoids that and is selected with `PLACEMENT_MOA_KEY=ids`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoaKeyStrategy {
    /// Display (student name, company name) pair.
    #[default]
    DisplayNames,
    /// Stable (student id, company id) pair.
    StableIds,
}

impl FromStr for MoaKeyStrategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ids" | "stable_ids" => Ok(Self::StableIds),
            "names" | "display_names" => Ok(Self::DisplayNames),
            other => Err(format!("unknown MOA key strategy '{other}'")),
        }
    }
}

/// Deduplication key of an MOA document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoaKey(pub String);

impl MoaKey {
    pub fn new(
        strategy: MoaKeyStrategy,
        student_id: &StudentId,
        student_name: &str,
        company_id: &CompanyId,
        company_name: &str,
    ) -> Self {
        match strategy {
            MoaKeyStrategy::StableIds => Self(format!("ids:{}:{}", student_id.0, company_id.0)),
            MoaKeyStrategy::DisplayNames => Self(format!(
                "names:{}:{}",
                student_name.trim(),
                company_name.trim()
            )),
        }
    }
}

impl fmt::Display for MoaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity block for one party as printed on the agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBlock {
    pub id: String,
    pub name: String,
    pub address: String,
    pub representative: Option<Representative>,
}

impl PartyBlock {
    fn from_profile(profile: &OrganizationProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            address: profile.address.clone(),
            representative: profile
                .representative
                .as_ref()
                .map(|representative| Representative {
                    name: representative.name.clone(),
                    position: unescape_entities(&representative.position),
                }),
        }
    }
}

/// Agreement payload before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoaContent {
    pub key: MoaKey,
    pub student_id: StudentId,
    pub student_name: String,
    pub job_id: JobId,
    pub company: PartyBlock,
    pub academy: PartyBlock,
    pub term: InternshipTerm,
    pub company_signature: SignatureRecord,
    pub academy_signature: SignatureRecord,
    /// Printable file name; rendering happens outside this crate.
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted agreement. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoaDocument {
    pub document_id: DocumentId,
    #[serde(flatten)]
    pub content: MoaContent,
}

/// Inputs gathered for one agreement.
pub(crate) struct AgreementParties<'a> {
    pub(crate) record: &'a ApplicantRecord,
    pub(crate) job: &'a JobPosting,
    pub(crate) student: &'a StudentProfile,
    pub(crate) company: &'a OrganizationProfile,
    pub(crate) academy: &'a OrganizationProfile,
}

pub(crate) fn compose(
    key: MoaKey,
    parties: &AgreementParties<'_>,
    created_at: DateTime<Utc>,
) -> Result<MoaContent, InvalidTransition> {
    let record = parties.record;
    let term = record.term.ok_or(InvalidTransition::MissingTerm)?;
    let (company_signature, academy_signature) =
        match (&record.signatures.company, &record.signatures.academy) {
            (Some(company), Some(academy)) => (company.clone(), academy.clone()),
            _ => return Err(InvalidTransition::SignaturesIncomplete),
        };

    Ok(MoaContent {
        key,
        student_id: record.applicant.student_id.clone(),
        student_name: parties.student.name.clone(),
        job_id: parties.job.job_id.clone(),
        company: PartyBlock::from_profile(parties.company),
        academy: PartyBlock::from_profile(parties.academy),
        term,
        company_signature,
        academy_signature,
        file_name: file_name(&parties.student.name, &parties.company.name, created_at),
        created_at,
    })
}

/// `MOA_<student>_<company>_<date>.pdf` with whitespace folded to underscores.
pub fn file_name(student_name: &str, company_name: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "MOA_{}_{}_{}.pdf",
        fold_whitespace(student_name),
        fold_whitespace(company_name),
        created_at.format("%Y-%m-%d")
    )
}

fn fold_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Representative titles are stored double-escaped (`&amp;quot;`); decode both layers.
pub fn unescape_entities(raw: &str) -> String {
    let once = html_escape::decode_html_entities(raw);
    html_escape::decode_html_entities(&once).into_owned()
}

impl PlacementService {
    /// Create the agreement for a fully signed applicant, or return the existing one.
    pub async fn materialize(
        &self,
        record: &ApplicantRecord,
    ) -> Result<DocumentId, PlacementError> {
        Ok(self.materialize_document(record).await?.document_id)
    }

    /// Lazy path: materialize if both parties have signed, otherwise `None`.
    pub async fn ensure_agreement(
        &self,
        actor: &Actor,
        applicant: &ApplicantRef,
    ) -> Result<Option<MoaDocument>, PlacementError> {
        self.require_participant(actor, applicant, "view this agreement")
            .await?;
        let record = self.load_applicant(applicant).await?;
        if !record.signatures.both_present() {
            return Ok(None);
        }
        self.materialize_document(&record).await.map(Some)
    }

    pub(crate) async fn materialize_document(
        &self,
        record: &ApplicantRecord,
    ) -> Result<MoaDocument, PlacementError> {
        if !record.signatures.both_present() {
            return Err(InvalidTransition::SignaturesIncomplete.into());
        }

        let job = self.load_job(&record.applicant.job_id).await?;
        let student = self.load_student(&record.applicant.student_id).await?;
        let company = self.load_company(&job.company_id).await?;
        let key = MoaKey::new(
            self.settings.moa_key,
            &student.student_id,
            &student.name,
            &job.company_id,
            &company.name,
        );

        if let Some(existing) = self
            .calls
            .read("find moa", || self.store.find_moa(&key))
            .await?
        {
            debug!(%key, document_id = %existing.document_id, "agreement already materialized");
            return Ok(existing);
        }

        let academy_id = student.academy_id.clone().ok_or_else(|| {
            PlacementError::not_found(format!("academy enrollment for student {}", student.student_id))
        })?;
        let academy = self.load_academy(&academy_id).await?;

        let content = compose(
            key,
            &AgreementParties {
                record,
                job: &job,
                student: &student,
                company: &company,
                academy: &academy,
            },
            Utc::now(),
        )?;

        let inserted = self
            .calls
            .write("insert moa", self.store.insert_moa_if_absent(content))
            .await?;
        match &inserted {
            MoaInsert::Created(document) => info!(
                key = %document.content.key,
                document_id = %document.document_id,
                file_name = %document.content.file_name,
                "agreement materialized"
            ),
            MoaInsert::Existing(document) => debug!(
                key = %document.content.key,
                document_id = %document.document_id,
                "agreement created concurrently; reusing"
            ),
        }
        Ok(inserted.into_document())
    }

    /// Stored agreement for an applicant, without creating one.
    pub async fn agreement(
        &self,
        actor: &Actor,
        applicant: &ApplicantRef,
    ) -> Result<Option<MoaDocument>, PlacementError> {
        self.require_participant(actor, applicant, "view this agreement")
            .await?;
        let job = self.load_job(&applicant.job_id).await?;
        let student = self.load_student(&applicant.student_id).await?;
        let company = self.load_company(&job.company_id).await?;
        let key = MoaKey::new(
            self.settings.moa_key,
            &student.student_id,
            &student.name,
            &job.company_id,
            &company.name,
        );
        self.calls
            .read("find moa", || self.store.find_moa(&key))
            .await
    }
}
