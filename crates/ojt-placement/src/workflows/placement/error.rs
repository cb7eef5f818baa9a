use serde::Serialize;

use super::domain::Party;
use super::notify::CalendarError;
use super::status::InvalidTransition;
use super::store::{LookupError, RepositoryError};

/// How much of an operation took effect before it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// No state changed.
    NothingApplied,
    /// Some state was persisted before the failure.
    PartiallyApplied,
    /// A write timed out; it may or may not have landed.
    Indeterminate,
}

/// Error raised by the placement workflow.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] InvalidTransition),
    #[error("the {party} has already signed this agreement")]
    AlreadySigned { party: Party },
    #[error("student has already applied to this job")]
    AlreadyApplied,
    #[error("actor is not permitted to {action}")]
    Forbidden { action: &'static str },
    #[error("applicant record was changed by someone else")]
    StaleRecord,
    #[error(transparent)]
    Store(#[from] RepositoryError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("meeting link generation failed: {0}")]
    Calendar(#[from] CalendarError),
    #[error("{operation} timed out")]
    Timeout {
        operation: &'static str,
        mutating: bool,
    },
    #[error("signature recorded but the agreement document was not created: {source}")]
    AgreementPending {
        #[source]
        source: Box<PlacementError>,
    },
}

impl PlacementError {
    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn scope(&self) -> FailureScope {
        match self {
            PlacementError::AgreementPending { .. } => FailureScope::PartiallyApplied,
            PlacementError::Timeout { mutating: true, .. } => FailureScope::Indeterminate,
            _ => FailureScope::NothingApplied,
        }
    }

    /// Whether repeating the same call can succeed without changing its input.
    pub fn retry_safe(&self) -> bool {
        match self {
            PlacementError::InvalidTransition(_)
            | PlacementError::AlreadySigned { .. }
            | PlacementError::AlreadyApplied
            | PlacementError::Forbidden { .. }
            | PlacementError::NotFound(_) => false,
            PlacementError::AgreementPending { .. } => true,
            PlacementError::Timeout { mutating, .. } => !mutating,
            PlacementError::StaleRecord
            | PlacementError::Store(_)
            | PlacementError::Lookup(_)
            | PlacementError::Calendar(_) => true,
        }
    }

    /// Operator-facing message stating what happened and whether to try again.
    pub fn user_message(&self) -> String {
        match self.scope() {
            FailureScope::NothingApplied if self.retry_safe() => {
                format!("Nothing was changed: {self}. It is safe to try again.")
            }
            FailureScope::NothingApplied => {
                format!("Nothing was changed: {self}. Repeating the same request will fail again.")
            }
            FailureScope::PartiallyApplied => format!(
                "The signature was saved, but the agreement document is not ready yet ({}). \
                 Reload the applicant to finish generating it; do not sign again.",
                self.root_cause()
            ),
            FailureScope::Indeterminate => format!(
                "The change may or may not have been saved: {self}. Reload the applicant before trying again."
            ),
        }
    }

    fn root_cause(&self) -> &PlacementError {
        match self {
            PlacementError::AgreementPending { source } => source.root_cause(),
            other => other,
        }
    }
}
