use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::workflows::placement::domain::{
    AcademyId, Actor, ApplicantRecord, ApplicantRef, CompanyId, JobId, JobPosting,
    OrganizationProfile, Representative, SignatureRecord, StudentId, StudentProfile,
};
use crate::workflows::placement::materializer::{MoaContent, MoaDocument, MoaKey};
use crate::workflows::placement::memory::{InMemoryDirectory, InMemoryPlacementStore};
use crate::workflows::placement::notify::{CalendarError, MailError, Mailer, MeetingLinks};
use crate::workflows::placement::service::{PlacementPorts, PlacementService, PlacementSettings};
use crate::workflows::placement::store::{
    MoaInsert, PlacementStore, RepositoryError, SignatureWrite,
};

pub(super) const JOB: &str = "job-1";
pub(super) const STUDENT: &str = "stu-1";
pub(super) const COMPANY: &str = "co-1";
pub(super) const ACADEMY: &str = "acad-1";

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn applicant() -> ApplicantRef {
    ApplicantRef::new(JOB, STUDENT)
}

pub(super) fn hiring_company() -> Actor {
    Actor::company("hr-1", COMPANY)
}

pub(super) fn enrolled_academy() -> Actor {
    Actor::academy("dean-1", ACADEMY)
}

pub(super) fn student() -> Actor {
    Actor::student(STUDENT)
}

pub(super) fn seed_directory(directory: &InMemoryDirectory) {
    directory
        .insert_company(OrganizationProfile {
            id: COMPANY.to_string(),
            name: "Acme Corp".to_string(),
            address: "Ayala Ave, Makati".to_string(),
            representative: Some(Representative {
                name: "Ana Reyes".to_string(),
                position: "&amp;quot;HR Head&amp;quot;".to_string(),
            }),
        })
        .expect("company");
    directory
        .insert_academy(OrganizationProfile {
            id: ACADEMY.to_string(),
            name: "State University".to_string(),
            address: "Diliman, Quezon City".to_string(),
            representative: Some(Representative {
                name: "Dr. Santos".to_string(),
                position: "OJT Coordinator".to_string(),
            }),
        })
        .expect("academy");
    directory
        .insert_student(StudentProfile {
            student_id: StudentId(STUDENT.to_string()),
            name: "Juan Dela Cruz".to_string(),
            email: "juan@student.example.ph".to_string(),
            academy_id: Some(AcademyId(ACADEMY.to_string())),
        })
        .expect("student");
}

pub(super) fn job_posting() -> JobPosting {
    JobPosting {
        job_id: JobId(JOB.to_string()),
        company_id: CompanyId(COMPANY.to_string()),
        title: "Backend Intern".to_string(),
        duration: "2 months".to_string(),
    }
}

/// Mailer double recording every attempt; each path can be forced to fail.
#[derive(Default)]
pub(super) struct RecordingMailer {
    pub(super) fail_templated: AtomicBool,
    pub(super) fail_raw: AtomicBool,
    pub(super) templated: Mutex<Vec<(String, String)>>,
    pub(super) raw: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub(super) fn failing() -> Self {
        let mailer = Self::default();
        mailer.fail_templated.store(true, Ordering::SeqCst);
        mailer.fail_raw.store(true, Ordering::SeqCst);
        mailer
    }

    pub(super) fn attempts(&self) -> usize {
        self.templated.lock().expect("lock").len() + self.raw.lock().expect("lock").len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_templated(
        &self,
        template: &str,
        recipient: &str,
        _data: &BTreeMap<String, String>,
    ) -> Result<(), MailError> {
        self.templated
            .lock()
            .expect("lock")
            .push((template.to_string(), recipient.to_string()));
        if self.fail_templated.load(Ordering::SeqCst) {
            return Err(MailError::Template("template missing".to_string()));
        }
        Ok(())
    }

    async fn send_raw(&self, _html: &str, recipient: &str, subject: &str) -> Result<(), MailError> {
        self.raw
            .lock()
            .expect("lock")
            .push((subject.to_string(), recipient.to_string()));
        if self.fail_raw.load(Ordering::SeqCst) {
            return Err(MailError::Transport("smtp refused connection".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct FixedMeetingLinks {
    pub(super) calls: AtomicUsize,
    /// When set, generation never answers within the call timeout.
    pub(super) stalled: AtomicBool,
}

#[async_trait]
impl MeetingLinks for FixedMeetingLinks {
    async fn generate(
        &self,
        applicant: &ApplicantRef,
        _date: NaiveDate,
        _time: NaiveTime,
    ) -> Result<String, CalendarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(std::time::Duration::from_secs(3_600)).await;
        }
        Ok(format!("https://meet.example.ph/{}", applicant.student_id))
    }
}

/// Delegating store whose MOA insert can be switched off.
#[derive(Default)]
pub(super) struct FlakyMoaStore {
    pub(super) inner: InMemoryPlacementStore,
    pub(super) moa_offline: AtomicBool,
    pub(super) moa_inserts: AtomicUsize,
}

#[async_trait]
impl PlacementStore for FlakyMoaStore {
    async fn insert_applicant(
        &self,
        record: ApplicantRecord,
    ) -> Result<ApplicantRecord, RepositoryError> {
        self.inner.insert_applicant(record).await
    }

    async fn fetch_applicant(
        &self,
        applicant: &ApplicantRef,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.inner.fetch_applicant(applicant).await
    }

    async fn update_applicant(
        &self,
        record: ApplicantRecord,
        expected_version: u64,
    ) -> Result<ApplicantRecord, RepositoryError> {
        self.inner.update_applicant(record, expected_version).await
    }

    async fn put_signature(
        &self,
        applicant: &ApplicantRef,
        signature: SignatureRecord,
    ) -> Result<SignatureWrite, RepositoryError> {
        self.inner.put_signature(applicant, signature).await
    }

    async fn list_applicants(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        self.inner.list_applicants(job_id).await
    }

    async fn fetch_job(&self, job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        self.inner.fetch_job(job_id).await
    }

    async fn find_moa(&self, key: &MoaKey) -> Result<Option<MoaDocument>, RepositoryError> {
        self.inner.find_moa(key).await
    }

    async fn insert_moa_if_absent(
        &self,
        content: MoaContent,
    ) -> Result<MoaInsert, RepositoryError> {
        self.moa_inserts.fetch_add(1, Ordering::SeqCst);
        if self.moa_offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("moa collection offline".to_string()));
        }
        self.inner.insert_moa_if_absent(content).await
    }
}

/// Store that fails every call.
pub(super) struct UnavailableStore;

#[async_trait]
impl PlacementStore for UnavailableStore {
    async fn insert_applicant(
        &self,
        _record: ApplicantRecord,
    ) -> Result<ApplicantRecord, RepositoryError> {
        Err(offline())
    }

    async fn fetch_applicant(
        &self,
        _applicant: &ApplicantRef,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Err(offline())
    }

    async fn update_applicant(
        &self,
        _record: ApplicantRecord,
        _expected_version: u64,
    ) -> Result<ApplicantRecord, RepositoryError> {
        Err(offline())
    }

    async fn put_signature(
        &self,
        _applicant: &ApplicantRef,
        _signature: SignatureRecord,
    ) -> Result<SignatureWrite, RepositoryError> {
        Err(offline())
    }

    async fn list_applicants(
        &self,
        _job_id: &JobId,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Err(offline())
    }

    async fn fetch_job(&self, _job_id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Err(offline())
    }

    async fn find_moa(&self, _key: &MoaKey) -> Result<Option<MoaDocument>, RepositoryError> {
        Err(offline())
    }

    async fn insert_moa_if_absent(
        &self,
        _content: MoaContent,
    ) -> Result<MoaInsert, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("record store offline".to_string())
}

/// Fully wired service over in-memory adapters with one job and one enrolled student.
pub(super) struct Harness {
    pub(super) service: Arc<PlacementService>,
    pub(super) store: Arc<FlakyMoaStore>,
    pub(super) mailer: Arc<RecordingMailer>,
    pub(super) links: Arc<FixedMeetingLinks>,
}

pub(super) fn harness() -> Harness {
    harness_with(RecordingMailer::default(), PlacementSettings::default())
}

pub(super) fn harness_with(mailer: RecordingMailer, settings: PlacementSettings) -> Harness {
    let store = Arc::new(FlakyMoaStore::default());
    store.inner.insert_job(job_posting()).expect("job");
    let directory = Arc::new(InMemoryDirectory::new());
    seed_directory(&directory);
    let mailer = Arc::new(mailer);
    let links = Arc::new(FixedMeetingLinks::default());

    let service = PlacementService::new(
        PlacementPorts {
            store: store.clone(),
            directory,
            mailer: mailer.clone(),
            meeting_links: links.clone(),
        },
        settings,
    );

    Harness {
        service: Arc::new(service),
        store,
        mailer,
        links,
    }
}

pub(super) fn unavailable_service() -> Arc<PlacementService> {
    let directory = Arc::new(InMemoryDirectory::new());
    seed_directory(&directory);
    Arc::new(PlacementService::new(
        PlacementPorts {
            store: Arc::new(UnavailableStore),
            directory,
            mailer: Arc::new(RecordingMailer::default()),
            meeting_links: Arc::new(FixedMeetingLinks::default()),
        },
        PlacementSettings::default(),
    ))
}

impl Harness {
    /// Applied -> Shortlisted -> Selected (start 2025-04-01).
    pub(super) async fn selected_applicant(&self) -> ApplicantRecord {
        use crate::workflows::placement::status::TransitionRequest;

        self.service
            .apply(&student(), &JobId(JOB.to_string()))
            .await
            .expect("apply");
        self.service
            .transition(
                &hiring_company(),
                &applicant(),
                TransitionRequest::shortlist(date(2025, 3, 1), "14:00", None),
            )
            .await
            .expect("shortlist");
        self.service
            .transition(
                &hiring_company(),
                &applicant(),
                TransitionRequest::select(date(2025, 4, 1)),
            )
            .await
            .expect("select");
        self.service
            .get(&hiring_company(), &applicant())
            .await
            .expect("applicant")
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
