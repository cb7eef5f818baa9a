use crate::infra::{sample_seed, wire, Wiring};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use ojt_placement::error::AppError;
use ojt_placement::workflows::directory::DirectorySeed;
use ojt_placement::workflows::placement::{
    Actor, ApplicantRef, NotificationStatus, PlacementError, PlacementService, PlacementSettings,
    TransitionRequest,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct TermArgs {
    /// Internship start date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: NaiveDate,
    /// Published duration such as "2 months", "6 weeks", or "30 days"
    #[arg(long)]
    pub(crate) duration: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Directory CSV to seed from. Defaults to the built-in sample directory.
    #[arg(long)]
    pub(crate) directory_csv: Option<PathBuf>,
    /// Internship start date (YYYY-MM-DD). Defaults to two weeks from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: Option<NaiveDate>,
}

pub(crate) fn run_term_preview(args: TermArgs) -> Result<(), AppError> {
    let term = PlacementService::term_preview(args.start, &args.duration)
        .map_err(|err| AppError::Placement(PlacementError::InvalidTransition(err.into())))?;

    println!("Internship Term");
    println!("===============");
    println!("Start date : {}", term.start_date);
    println!("Duration   : {}", args.duration.trim());
    println!("End date   : {}", term.end_date);
    println!("Hours      : {}", term.total_hours);
    Ok(())
}

/// Parties picked from the seed for the walkthrough.
struct Cast {
    applicant: ApplicantRef,
    student: Actor,
    company: Actor,
    academy: Actor,
    job_title: String,
}

fn cast(seed: &DirectorySeed) -> Result<Cast, AppError> {
    let missing = |what: &str| AppError::Placement(PlacementError::NotFound(what.to_string()));

    let student = seed
        .students
        .iter()
        .find(|student| student.academy_id.is_some())
        .ok_or_else(|| missing("a student enrolled in an academy"))?;
    let academy_id = student
        .academy_id
        .clone()
        .ok_or_else(|| missing("student academy"))?;
    let job = seed.jobs.first().ok_or_else(|| missing("a job posting"))?;

    Ok(Cast {
        applicant: ApplicantRef {
            job_id: job.job_id.clone(),
            student_id: student.student_id.clone(),
        },
        student: Actor::student(student.student_id.0.clone()),
        company: Actor::company("demo-hr", job.company_id.0.clone()),
        academy: Actor::academy("demo-coordinator", academy_id.0),
        job_title: job.title.clone(),
    })
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let seed = match &args.directory_csv {
        Some(path) => DirectorySeed::from_path(path)?,
        None => sample_seed()?,
    };
    let cast = cast(&seed)?;
    let Wiring {
        service,
        store,
        mailer,
    } = wire(&seed, PlacementSettings::default())?;

    let today = Local::now().date_naive();
    let interview_on = today + Duration::days(3);
    let start = args.start.unwrap_or(today + Duration::days(14));

    println!("OJT Placement Demo");
    println!("==================");
    println!("Job        : {} ({})", cast.job_title, cast.applicant.job_id);
    println!("Student    : {}", cast.applicant.student_id);
    println!();

    let record = service.apply(&cast.student, &cast.applicant.job_id).await?;
    println!("1. Applied      -> status {}", record.status);

    let outcome = service
        .transition(
            &cast.company,
            &cast.applicant,
            TransitionRequest::shortlist(interview_on, "10:00", None),
        )
        .await?;
    println!("2. Shortlisted  -> {}", outcome.summary());
    if let Some(interview) = &outcome.applicant.interview {
        println!(
            "                  interview {} {} at {}",
            interview.date,
            interview.time.format("%H:%M"),
            interview.meeting_link
        );
    }
    if let NotificationStatus::Failed { reason } = &outcome.notification {
        println!("                  notice failed: {reason}");
    }

    let outcome = service
        .transition(
            &cast.company,
            &cast.applicant,
            TransitionRequest::select(start),
        )
        .await?;
    println!("3. Selected     -> {}", outcome.summary());
    if let Some(term) = outcome.applicant.term {
        println!(
            "                  term {} to {}, {} hours",
            term.start_date, term.end_date, term.total_hours
        );
    }

    let signed = service
        .record_signature(&cast.company, &cast.applicant, "data:image/png;base64,Q09NUEFOWQ==")
        .await?;
    println!(
        "4. Company signs -> both signed: {}",
        signed.both_signed
    );

    let signed = service
        .record_signature(&cast.academy, &cast.applicant, "data:image/png;base64,QUNBREVNWQ==")
        .await?;
    println!(
        "5. Academy signs -> both signed: {}, document {}",
        signed.both_signed,
        signed
            .document_id
            .as_ref()
            .map(|id| id.0.as_str())
            .unwrap_or("pending")
    );

    let agreement = service
        .ensure_agreement(&cast.academy, &cast.applicant)
        .await?;
    if let Some(document) = agreement {
        println!();
        println!("Agreement");
        println!("---------");
        println!("Document   : {}", document.document_id);
        println!("File       : {}", document.content.file_name);
        println!(
            "Company    : {} ({})",
            document.content.company.name, document.content.company.address
        );
        if let Some(representative) = &document.content.company.representative {
            println!(
                "             signed by {}, {}",
                representative.name, representative.position
            );
        }
        println!(
            "Academy    : {} ({})",
            document.content.academy.name, document.content.academy.address
        );
    }

    let documents = store.documents().map_err(PlacementError::from)?;
    println!();
    println!("Documents stored : {}", documents.len());
    let sent = mailer.sent();
    println!("Mail sent        : {}", sent.len());
    for mail in sent {
        println!("  - {} <{}>", mail.subject, mail.recipient);
    }
    Ok(())
}
