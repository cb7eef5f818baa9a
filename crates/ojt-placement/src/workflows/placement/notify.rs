//! Outbound notifications and meeting-link generation.

use std::collections::BTreeMap;

use askama::Template;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{info, warn};

use super::calls::{Bounded, CallPolicy};
use super::domain::{ApplicantRef, Interview};

pub const SHORTLIST_TEMPLATE: &str = "applicant_shortlisted";

/// E-mail dispatch port with a templated path and a raw-HTML fallback.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_templated(
        &self,
        template: &str,
        recipient: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), MailError>;

    async fn send_raw(&self, html: &str, recipient: &str, subject: &str) -> Result<(), MailError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("mail template rejected: {0}")]
    Template(String),
}

/// Calendar port producing a meeting URL for an interview slot.
#[async_trait]
pub trait MeetingLinks: Send + Sync {
    async fn generate(
        &self,
        applicant: &ApplicantRef,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<String, CalendarError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar provider unavailable: {0}")]
    Unavailable(String),
    #[error("calendar provider did not answer in time")]
    TimedOut,
}

/// What happened to the notification attached to a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NotificationStatus {
    NotRequired,
    Sent,
    SentRaw { template_error: String },
    Failed { reason: String },
}

impl NotificationStatus {
    pub fn delivered(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Sent | NotificationStatus::SentRaw { .. }
        )
    }
}

/// Interview invitation sent to a shortlisted student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortlistNotice {
    pub recipient: String,
    pub student_name: String,
    pub job_title: String,
    pub company_name: String,
    pub interview: Interview,
}

impl ShortlistNotice {
    pub fn subject(&self) -> String {
        format!("Interview invitation: {} at {}", self.job_title, self.company_name)
    }

    pub fn template_data(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        data.insert("student_name".to_string(), self.student_name.clone());
        data.insert("job_title".to_string(), self.job_title.clone());
        data.insert("company_name".to_string(), self.company_name.clone());
        data.insert("interview_date".to_string(), self.formatted_date());
        data.insert("interview_time".to_string(), self.formatted_time());
        data.insert(
            "meeting_link".to_string(),
            self.interview.meeting_link.clone(),
        );
        data
    }

    /// Raw-HTML body for the fallback path; user text is escaped by the template.
    pub fn html(&self) -> Result<String, askama::Error> {
        let subject = self.subject();
        let interview_date = self.formatted_date();
        let interview_time = self.formatted_time();
        ShortlistEmail {
            subject: &subject,
            student_name: &self.student_name,
            job_title: &self.job_title,
            company_name: &self.company_name,
            interview_date: &interview_date,
            interview_time: &interview_time,
            meeting_link: &self.interview.meeting_link,
        }
        .render()
    }

    fn formatted_date(&self) -> String {
        self.interview.date.format("%B %-d, %Y").to_string()
    }

    fn formatted_time(&self) -> String {
        self.interview.time.format("%-I:%M %p").to_string()
    }
}

#[derive(Template)]
#[template(path = "shortlist_notice.html")]
struct ShortlistEmail<'a> {
    subject: &'a str,
    student_name: &'a str,
    job_title: &'a str,
    company_name: &'a str,
    interview_date: &'a str,
    interview_time: &'a str,
    meeting_link: &'a str,
}

/// Templated send first, raw HTML second. Never fails the caller.
pub(crate) async fn deliver_shortlist_notice(
    mailer: &dyn Mailer,
    calls: &CallPolicy,
    notice: &ShortlistNotice,
) -> NotificationStatus {
    let data = notice.template_data();
    let template_error = match calls
        .bounded(mailer.send_templated(SHORTLIST_TEMPLATE, &notice.recipient, &data))
        .await
    {
        Ok(()) => {
            info!(recipient = %notice.recipient, "shortlist notice sent");
            return NotificationStatus::Sent;
        }
        Err(failure) => describe(failure),
    };
    warn!(
        recipient = %notice.recipient,
        error = %template_error,
        "templated shortlist notice failed; falling back to raw html"
    );

    let html = match notice.html() {
        Ok(html) => html,
        Err(err) => {
            warn!(recipient = %notice.recipient, error = %err, "shortlist notice did not render");
            return NotificationStatus::Failed {
                reason: format!("template: {template_error}; render: {err}"),
            };
        }
    };

    match calls
        .bounded(mailer.send_raw(&html, &notice.recipient, &notice.subject()))
        .await
    {
        Ok(()) => {
            info!(recipient = %notice.recipient, "shortlist notice sent as raw html");
            NotificationStatus::SentRaw { template_error }
        }
        Err(failure) => {
            let raw_error = describe(failure);
            warn!(
                recipient = %notice.recipient,
                error = %raw_error,
                "raw html shortlist notice failed"
            );
            NotificationStatus::Failed {
                reason: format!("template: {template_error}; raw: {raw_error}"),
            }
        }
    }
}

fn describe(failure: Bounded<MailError>) -> String {
    match failure {
        Bounded::TimedOut => "mail send timed out".to_string(),
        Bounded::Failed(err) => err.to_string(),
    }
}
