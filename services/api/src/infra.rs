use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use metrics_exporter_prometheus::PrometheusHandle;
use ojt_placement::config::{AppConfig, AppEnvironment};
use ojt_placement::error::AppError;
use ojt_placement::workflows::directory::DirectorySeed;
use ojt_placement::workflows::placement::{
    ApplicantRef, CalendarError, InMemoryDirectory, InMemoryPlacementStore, MailError, Mailer,
    MeetingLinks, PlacementPorts, PlacementService, PlacementSettings,
};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Directory used when no CSV is configured outside production.
pub(crate) const SAMPLE_DIRECTORY: &str = "\
kind,id,name,email,address,representative_name,representative_position,parent_id,duration
company,co-acme,Acme Software Corp,,\"6780 Ayala Ave, Makati\",Ana Reyes,&amp;quot;Head of People&amp;quot;,,
academy,acad-state,State University,,\"Diliman, Quezon City\",Dr. Maria Santos,OJT Coordinator,,
student,stu-0001,Juan Dela Cruz,juan.delacruz@student.example.ph,,,,acad-state,
job,job-backend,Backend Engineering Intern,,,,,co-acme,2 months
";

/// One message handed to the logging mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentMail {
    pub(crate) recipient: String,
    pub(crate) subject: String,
}

/// Mailer that records and logs messages instead of delivering them.
#[derive(Default, Clone)]
pub(crate) struct LoggingMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl LoggingMailer {
    pub(crate) fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn record(&self, recipient: &str, subject: &str) -> Result<(), MailError> {
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| MailError::Transport("mail log poisoned".to_string()))?;
        guard.push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_templated(
        &self,
        template: &str,
        recipient: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), MailError> {
        info!(template, recipient, fields = data.len(), "templated mail queued");
        self.record(recipient, template)
    }

    async fn send_raw(&self, _html: &str, recipient: &str, subject: &str) -> Result<(), MailError> {
        info!(recipient, subject, "raw mail queued");
        self.record(recipient, subject)
    }
}

/// Deterministic meeting rooms derived from the applicant and slot.
#[derive(Debug, Clone)]
pub(crate) struct GeneratedMeetingLinks {
    base_url: String,
}

impl Default for GeneratedMeetingLinks {
    fn default() -> Self {
        Self {
            base_url: "https://meet.ojt.example.ph".to_string(),
        }
    }
}

#[async_trait]
impl MeetingLinks for GeneratedMeetingLinks {
    async fn generate(
        &self,
        applicant: &ApplicantRef,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<String, CalendarError> {
        Ok(format!(
            "{}/{}-{}-{}",
            self.base_url,
            applicant.job_id,
            applicant.student_id,
            date.and_time(time).format("%Y%m%d%H%M")
        ))
    }
}

/// In-process wiring shared by `serve` and `demo`.
pub(crate) struct Wiring {
    pub(crate) service: Arc<PlacementService>,
    pub(crate) store: Arc<InMemoryPlacementStore>,
    pub(crate) mailer: LoggingMailer,
}

pub(crate) fn wire(seed: &DirectorySeed, settings: PlacementSettings) -> Result<Wiring, AppError> {
    let store = Arc::new(InMemoryPlacementStore::new());
    let directory = Arc::new(InMemoryDirectory::new());
    seed.apply(&directory, &store)?;
    let mailer = LoggingMailer::default();

    let service = PlacementService::new(
        PlacementPorts {
            store: store.clone(),
            directory,
            mailer: Arc::new(mailer.clone()),
            meeting_links: Arc::new(GeneratedMeetingLinks::default()),
        },
        settings,
    );

    Ok(Wiring {
        service: Arc::new(service),
        store,
        mailer,
    })
}

/// Configured CSV, else the sample directory outside production, else nothing.
pub(crate) fn load_seed(config: &AppConfig) -> Result<DirectorySeed, AppError> {
    match &config.directory_csv {
        Some(path) => {
            info!(path = %path.display(), "seeding directory from csv");
            Ok(DirectorySeed::from_path(path)?)
        }
        None if config.environment == AppEnvironment::Production => {
            warn!("PLACEMENT_DIRECTORY_CSV not set; starting with an empty directory");
            Ok(DirectorySeed::default())
        }
        None => Ok(sample_seed()?),
    }
}

pub(crate) fn sample_seed() -> Result<DirectorySeed, AppError> {
    Ok(DirectorySeed::from_reader(Cursor::new(SAMPLE_DIRECTORY))?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
