//! Internship placement workflow: applicant status machine, internship term calculator,
//! dual-signature agreement workflow, and idempotent MOA materialization.

pub(crate) mod calls;
pub mod domain;
pub mod error;
pub mod materializer;
pub mod memory;
pub mod notify;
pub mod router;
pub mod service;
pub mod signature;
pub mod status;
pub mod store;
pub mod term;

#[cfg(test)]
mod tests;

pub use domain::{
    AcademyId, Actor, ActorRole, ApplicantRecord, ApplicantRef, ApplicantStatus, ApplicantView,
    CompanyId, DocumentId, InternshipTerm, Interview, JobId, JobPosting, OrganizationProfile,
    Party, Representative, SignatureRecord, Signatures, StudentId, StudentProfile,
};
pub use error::{FailureScope, PlacementError};
pub use materializer::{MoaContent, MoaDocument, MoaKey, MoaKeyStrategy, PartyBlock};
pub use memory::{InMemoryDirectory, InMemoryPlacementStore};
pub use notify::{
    CalendarError, MailError, Mailer, MeetingLinks, NotificationStatus, ShortlistNotice,
};
pub use router::placement_router;
pub use service::{PlacementPorts, PlacementService, PlacementSettings, TransitionOutcome};
pub use signature::SignatureOutcome;
pub use status::{
    plan_transition, InterviewRequest, InvalidTransition, TermRequest, TransitionKind,
    TransitionRequest,
};
pub use store::{
    Collection, Directory, LookupError, MoaInsert, PlacementStore, RepositoryError,
    SignatureWrite,
};
pub use term::{
    compute_end_date, compute_total_hours, derive_term, working_days, DurationSpec,
    DurationSpecError, DurationUnit, HOURS_PER_DAY, REST_DAY,
};
