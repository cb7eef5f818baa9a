//! Applicant status machine.
//!
//! Legal moves are listed in a single table; everything else is rejected. Re-entering
//! the current status is accepted as a refresh that carries no side effects.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::domain::ApplicantStatus;
use super::term::DurationSpecError;

use ApplicantStatus::{Applied, Rejected, Selected, Shortlisted};

/// Forward-only moves. Skipping straight from applied to selected is allowed.
const LEGAL_TRANSITIONS: &[(ApplicantStatus, ApplicantStatus)] = &[
    (Applied, Shortlisted),
    (Applied, Selected),
    (Applied, Rejected),
    (Shortlisted, Selected),
    (Shortlisted, Rejected),
    (Selected, Rejected),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// The status changed and its side effects ran.
    Advance,
    /// Same status requested again; only display fields were refreshed.
    Reenter,
}

/// Precondition failures for status changes and signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTransition {
    #[error("cannot move an applicant from {from} back to {to}")]
    Backward {
        from: ApplicantStatus,
        to: ApplicantStatus,
    },
    #[error("applicant was rejected and cannot become {to}")]
    AfterRejection { to: ApplicantStatus },
    #[error("shortlisting requires an interview {field}")]
    MissingInterviewField { field: &'static str },
    #[error("interview time '{0}' must be HH:MM or HH:MM:SS")]
    MalformedTime(String),
    #[error("selection requires a term start date")]
    MissingStartDate,
    #[error(transparent)]
    Duration(#[from] DurationSpecError),
    #[error("applicant is {status}; signatures are only accepted once selected")]
    NotSelected { status: ApplicantStatus },
    #[error("signature image must not be empty")]
    EmptySignature,
    #[error("agreement needs both signatures before it can be generated")]
    SignaturesIncomplete,
    #[error("selected applicant has no internship term")]
    MissingTerm,
}

/// Payload accompanying a status change request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: ApplicantStatus,
    /// Denormalized display name, refreshed on every accepted call.
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub interview: Option<InterviewRequest>,
    #[serde(default)]
    pub term: Option<TermRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRequest {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl TransitionRequest {
    pub fn new(status: ApplicantStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn shortlist(date: NaiveDate, time: &str, meeting_link: Option<&str>) -> Self {
        Self {
            interview: Some(InterviewRequest {
                date: Some(date),
                time: Some(time.to_string()),
                meeting_link: meeting_link.map(str::to_string),
            }),
            ..Self::new(Shortlisted)
        }
    }

    pub fn select(start_date: NaiveDate) -> Self {
        Self {
            term: Some(TermRequest {
                start_date: Some(start_date),
            }),
            ..Self::new(Selected)
        }
    }
}

/// Validated interview details; the link is still optional at this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InterviewSlot {
    pub(crate) date: NaiveDate,
    pub(crate) time: NaiveTime,
    pub(crate) meeting_link: Option<String>,
}

/// Decide whether `current -> target` is legal.
pub fn plan_transition(
    current: ApplicantStatus,
    target: ApplicantStatus,
) -> Result<TransitionKind, InvalidTransition> {
    if current == target {
        return Ok(TransitionKind::Reenter);
    }

    if current.is_terminal() {
        return Err(InvalidTransition::AfterRejection { to: target });
    }

    if LEGAL_TRANSITIONS.contains(&(current, target)) {
        Ok(TransitionKind::Advance)
    } else {
        Err(InvalidTransition::Backward {
            from: current,
            to: target,
        })
    }
}

pub(crate) fn require_interview(
    request: &TransitionRequest,
) -> Result<InterviewSlot, InvalidTransition> {
    let interview = request
        .interview
        .as_ref()
        .ok_or(InvalidTransition::MissingInterviewField { field: "date" })?;
    let date = interview
        .date
        .ok_or(InvalidTransition::MissingInterviewField { field: "date" })?;
    let raw_time = interview
        .time
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(InvalidTransition::MissingInterviewField { field: "time" })?;
    let time = parse_time(raw_time)?;
    let meeting_link = interview
        .meeting_link
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    Ok(InterviewSlot {
        date,
        time,
        meeting_link,
    })
}

pub(crate) fn require_start_date(request: &TransitionRequest) -> Result<NaiveDate, InvalidTransition> {
    request
        .term
        .as_ref()
        .and_then(|term| term.start_date)
        .ok_or(InvalidTransition::MissingStartDate)
}

fn parse_time(raw: &str) -> Result<NaiveTime, InvalidTransition> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| InvalidTransition::MalformedTime(raw.to_string()))
}
