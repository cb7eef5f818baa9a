//! Dual-signature workflow for the memorandum of agreement.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Actor, ApplicantRef, ApplicantStatus, DocumentId, Party, SignatureRecord};
use super::error::PlacementError;
use super::service::PlacementService;
use super::status::InvalidTransition;
use super::store::{RepositoryError, SignatureWrite};

/// Result of recording one party's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureOutcome {
    pub party: Party,
    pub party_signed: bool,
    pub both_signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
}

impl PlacementService {
    /// Record the acting party's signature and, once both parties have signed,
    /// materialize the agreement before returning.
    ///
    /// Signing is not serialized per applicant. Two parties signing at the same moment
    /// may both reach materialization; the store's find-or-create keeps that to one
    /// document.
    pub async fn record_signature(
        &self,
        actor: &Actor,
        applicant: &ApplicantRef,
        signature_image: &str,
    ) -> Result<SignatureOutcome, PlacementError> {
        let signature_image = signature_image.trim();
        if signature_image.is_empty() {
            return Err(InvalidTransition::EmptySignature.into());
        }
        let party = actor.party().ok_or(PlacementError::Forbidden {
            action: "sign agreements",
        })?;

        let record = self.load_applicant(applicant).await?;
        if record.status != ApplicantStatus::Selected {
            return Err(InvalidTransition::NotSelected {
                status: record.status,
            }
            .into());
        }
        self.require_participant(actor, applicant, "sign this agreement")
            .await?;

        if record.signatures.get(party).is_some() {
            return Err(PlacementError::AlreadySigned { party });
        }

        let signature = SignatureRecord {
            signed_by: party,
            signature_image: signature_image.to_string(),
            signed_at: Utc::now(),
        };
        let write = self
            .calls
            .write("store signature", self.store.put_signature(applicant, signature))
            .await
            .map_err(|err| match err {
                PlacementError::Store(RepositoryError::NotFound) => {
                    PlacementError::not_found(applicant)
                }
                other => other,
            })?;
        if let SignatureWrite::AlreadyPresent(_) = write {
            return Err(PlacementError::AlreadySigned { party });
        }
        info!(
            job_id = %applicant.job_id,
            student_id = %applicant.student_id,
            %party,
            "agreement signed"
        );

        let current = self.load_applicant(applicant).await.map_err(|err| {
            PlacementError::AgreementPending {
                source: Box::new(err),
            }
        })?;
        if !current.signatures.both_present() {
            return Ok(SignatureOutcome {
                party,
                party_signed: true,
                both_signed: false,
                document_id: None,
            });
        }

        match self.materialize(&current).await {
            Ok(document_id) => Ok(SignatureOutcome {
                party,
                party_signed: true,
                both_signed: true,
                document_id: Some(document_id),
            }),
            Err(err) => {
                warn!(
                    job_id = %applicant.job_id,
                    student_id = %applicant.student_id,
                    error = %err,
                    "both parties signed but the agreement could not be materialized"
                );
                Err(PlacementError::AgreementPending {
                    source: Box::new(err),
                })
            }
        }
    }
}
