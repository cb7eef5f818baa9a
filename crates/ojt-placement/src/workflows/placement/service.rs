use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::calls::{Bounded, CallPolicy};
use super::domain::{
    AcademyId, Actor, ActorRole, ApplicantRecord, ApplicantRef, ApplicantStatus, ApplicantView,
    CompanyId, Interview, InternshipTerm, JobId, JobPosting, OrganizationProfile, StudentId,
    StudentProfile,
};
use super::error::PlacementError;
use super::materializer::MoaKeyStrategy;
use super::notify::{
    deliver_shortlist_notice, CalendarError, Mailer, MeetingLinks, NotificationStatus,
    ShortlistNotice,
};
use super::status::{
    plan_transition, require_interview, require_start_date, TransitionKind, TransitionRequest,
};
use super::store::{Collection, Directory, PlacementStore, RepositoryError};
use super::term::{derive_term, DurationSpecError};

/// Tunables for the placement workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementSettings {
    /// Bound applied to every store, directory, mail, and calendar call.
    pub call_timeout: Duration,
    pub moa_key: MoaKeyStrategy,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(5_000),
            moa_key: MoaKeyStrategy::default(),
        }
    }
}

/// External collaborators consumed by the workflow.
#[derive(Clone)]
pub struct PlacementPorts {
    pub store: Arc<dyn PlacementStore>,
    pub directory: Arc<dyn Directory>,
    pub mailer: Arc<dyn Mailer>,
    pub meeting_links: Arc<dyn MeetingLinks>,
}

/// Result of a status change.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub applicant: ApplicantView,
    pub kind: TransitionKind,
    pub notification: NotificationStatus,
}

impl TransitionOutcome {
    /// True when the status was saved but the student could not be notified.
    pub fn partially_applied(&self) -> bool {
        matches!(self.notification, NotificationStatus::Failed { .. })
    }

    pub fn summary(&self) -> String {
        match (&self.kind, &self.notification) {
            (TransitionKind::Reenter, _) => format!(
                "Applicant is already {}; display details refreshed.",
                self.applicant.status
            ),
            (_, NotificationStatus::Failed { reason }) => format!(
                "Applicant is now {}, but the student was not notified ({reason}). \
                 Do not repeat the status change; contact the student directly.",
                self.applicant.status
            ),
            (_, status) if status.delivered() => format!(
                "Applicant is now {} and the student was notified.",
                self.applicant.status
            ),
            _ => format!("Applicant is now {}.", self.applicant.status),
        }
    }
}

/// Facade composing the status machine, signature workflow, and materializer.
pub struct PlacementService {
    pub(crate) store: Arc<dyn PlacementStore>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) meeting_links: Arc<dyn MeetingLinks>,
    pub(crate) calls: CallPolicy,
    pub(crate) settings: PlacementSettings,
}

impl PlacementService {
    pub fn new(ports: PlacementPorts, settings: PlacementSettings) -> Self {
        Self {
            store: ports.store,
            directory: ports.directory,
            mailer: ports.mailer,
            meeting_links: ports.meeting_links,
            calls: CallPolicy::new(settings.call_timeout),
            settings,
        }
    }

    /// Student applies to a posting; creates the applicant in `Applied`.
    pub async fn apply(
        &self,
        actor: &Actor,
        job_id: &JobId,
    ) -> Result<ApplicantRecord, PlacementError> {
        let student_id = match &actor.role {
            ActorRole::Student { student_id } => student_id.clone(),
            _ => return Err(PlacementError::Forbidden { action: "apply" }),
        };

        self.load_job(job_id).await?;
        let student = self.load_student(&student_id).await?;
        let applicant = ApplicantRef {
            job_id: job_id.clone(),
            student_id,
        };
        let record = ApplicantRecord::new(applicant.clone(), student.name, Utc::now());

        let stored = self
            .calls
            .write("insert applicant", self.store.insert_applicant(record))
            .await
            .map_err(|err| match err {
                PlacementError::Store(RepositoryError::Conflict) => PlacementError::AlreadyApplied,
                other => other,
            })?;

        info!(job_id = %applicant.job_id, student_id = %applicant.student_id, "application received");
        Ok(stored)
    }

    /// Applicant as seen by one of its participants.
    pub async fn get(
        &self,
        actor: &Actor,
        applicant: &ApplicantRef,
    ) -> Result<ApplicantRecord, PlacementError> {
        self.require_participant(actor, applicant, "view this applicant")
            .await?;
        self.load_applicant(applicant).await
    }

    /// Every applicant of a job; only the hiring company may list them.
    pub async fn list(
        &self,
        actor: &Actor,
        job_id: &JobId,
    ) -> Result<Vec<ApplicantRecord>, PlacementError> {
        let job = self.load_job(job_id).await?;
        self.require_hiring_company(actor, &job)?;
        self.calls
            .read("list applicants", || self.store.list_applicants(job_id))
            .await
    }

    /// Pure term calculation exposed for previews.
    pub fn term_preview(
        start_date: NaiveDate,
        duration: &str,
    ) -> Result<InternshipTerm, DurationSpecError> {
        derive_term(start_date, duration)
    }

    /// Move an applicant to `request.status`.
    ///
    /// The status write happens before any notification, so a failed e-mail never rolls
    /// the status back; it is reported in [`TransitionOutcome::notification`].
    pub async fn transition(
        &self,
        actor: &Actor,
        applicant: &ApplicantRef,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, PlacementError> {
        let mut record = self.load_applicant(applicant).await?;
        let job = self.load_job(&applicant.job_id).await?;
        self.require_hiring_company(actor, &job)?;

        let kind = plan_transition(record.status, request.status)?;
        let expected_version = record.version;
        if let Some(name) = request
            .student_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            record.student_name = name.to_string();
        }

        if kind == TransitionKind::Advance {
            match request.status {
                ApplicantStatus::Shortlisted => {
                    let slot = require_interview(&request)?;
                    let meeting_link = match slot.meeting_link {
                        Some(link) => link,
                        None => {
                            self.generate_meeting_link(applicant, slot.date, slot.time)
                                .await?
                        }
                    };
                    record.interview = Some(Interview {
                        date: slot.date,
                        time: slot.time,
                        meeting_link,
                    });
                }
                ApplicantStatus::Selected => {
                    let start_date = require_start_date(&request)?;
                    record.term = Some(derive_term(start_date, &job.duration).map_err(
                        |err| PlacementError::InvalidTransition(err.into()),
                    )?);
                }
                ApplicantStatus::Rejected | ApplicantStatus::Applied => {}
            }
            record.status = request.status;
        }
        record.updated_at = Utc::now();

        let stored = self
            .calls
            .write(
                "update applicant",
                self.store.update_applicant(record, expected_version),
            )
            .await
            .map_err(|err| match err {
                PlacementError::Store(RepositoryError::Conflict) => PlacementError::StaleRecord,
                PlacementError::Store(RepositoryError::NotFound) => {
                    PlacementError::not_found(applicant)
                }
                other => other,
            })?;

        info!(
            job_id = %applicant.job_id,
            student_id = %applicant.student_id,
            status = stored.status.label(),
            kind = ?kind,
            "applicant status updated"
        );

        let notification = if kind == TransitionKind::Advance
            && stored.status == ApplicantStatus::Shortlisted
        {
            self.notify_shortlisted(&stored, &job).await
        } else {
            NotificationStatus::NotRequired
        };

        Ok(TransitionOutcome {
            applicant: stored.view(),
            kind,
            notification,
        })
    }

    /// Runs before any write, so a timeout here leaves nothing applied.
    async fn generate_meeting_link(
        &self,
        applicant: &ApplicantRef,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<String, PlacementError> {
        match self
            .calls
            .bounded(self.meeting_links.generate(applicant, date, time))
            .await
        {
            Ok(link) => Ok(link),
            Err(Bounded::Failed(err)) => Err(err.into()),
            Err(Bounded::TimedOut) => Err(CalendarError::TimedOut.into()),
        }
    }

    async fn notify_shortlisted(
        &self,
        record: &ApplicantRecord,
        job: &JobPosting,
    ) -> NotificationStatus {
        let Some(interview) = record.interview.clone() else {
            return NotificationStatus::Failed {
                reason: "interview details missing".to_string(),
            };
        };

        let recipients = async {
            let student = self.load_student(&record.applicant.student_id).await?;
            let company = self.load_company(&job.company_id).await?;
            Ok::<_, PlacementError>((student, company))
        };
        let (student, company) = match recipients.await {
            Ok(parties) => parties,
            Err(err) => {
                warn!(
                    student_id = %record.applicant.student_id,
                    error = %err,
                    "could not resolve shortlist notice recipients"
                );
                return NotificationStatus::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let notice = ShortlistNotice {
            recipient: student.email,
            student_name: record.student_name.clone(),
            job_title: job.title.clone(),
            company_name: company.name,
            interview,
        };
        deliver_shortlist_notice(self.mailer.as_ref(), &self.calls, &notice).await
    }

    pub(crate) fn require_hiring_company(
        &self,
        actor: &Actor,
        job: &JobPosting,
    ) -> Result<(), PlacementError> {
        match &actor.role {
            ActorRole::Company { company_id } if *company_id == job.company_id => Ok(()),
            _ => Err(PlacementError::Forbidden {
                action: "manage applicants of this job",
            }),
        }
    }

    /// Hiring company, the student's academy, or the student themself.
    pub(crate) async fn require_participant(
        &self,
        actor: &Actor,
        applicant: &ApplicantRef,
        action: &'static str,
    ) -> Result<(), PlacementError> {
        match &actor.role {
            ActorRole::Student { student_id } if *student_id == applicant.student_id => Ok(()),
            ActorRole::Student { .. } => Err(PlacementError::Forbidden { action }),
            ActorRole::Company { company_id } => {
                let job = self.load_job(&applicant.job_id).await?;
                if job.company_id == *company_id {
                    Ok(())
                } else {
                    Err(PlacementError::Forbidden { action })
                }
            }
            ActorRole::Academy { academy_id } => {
                let student = self.load_student(&applicant.student_id).await?;
                if student.academy_id.as_ref() == Some(academy_id) {
                    Ok(())
                } else {
                    Err(PlacementError::Forbidden { action })
                }
            }
        }
    }

    pub(crate) async fn load_applicant(
        &self,
        applicant: &ApplicantRef,
    ) -> Result<ApplicantRecord, PlacementError> {
        self.calls
            .read("fetch applicant", || self.store.fetch_applicant(applicant))
            .await?
            .ok_or_else(|| PlacementError::not_found(applicant))
    }

    pub(crate) async fn load_job(&self, job_id: &JobId) -> Result<JobPosting, PlacementError> {
        self.calls
            .read("fetch job", || self.store.fetch_job(job_id))
            .await?
            .ok_or_else(|| PlacementError::not_found(format!("{} {}", Collection::JobPost, job_id)))
    }

    pub(crate) async fn load_student(
        &self,
        student_id: &StudentId,
    ) -> Result<StudentProfile, PlacementError> {
        self.calls
            .read("lookup student", || self.directory.student(student_id))
            .await?
            .ok_or_else(|| {
                PlacementError::not_found(format!("{} {}", Collection::AppUser, student_id))
            })
    }

    pub(crate) async fn load_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<OrganizationProfile, PlacementError> {
        self.calls
            .read("lookup company", || self.directory.company(company_id))
            .await?
            .ok_or_else(|| {
                PlacementError::not_found(format!("{} {}", Collection::Company, company_id.0))
            })
    }

    pub(crate) async fn load_academy(
        &self,
        academy_id: &AcademyId,
    ) -> Result<OrganizationProfile, PlacementError> {
        self.calls
            .read("lookup academy", || self.directory.academy(academy_id))
            .await?
            .ok_or_else(|| {
                PlacementError::not_found(format!("{} {}", Collection::Institute, academy_id.0))
            })
    }
}
