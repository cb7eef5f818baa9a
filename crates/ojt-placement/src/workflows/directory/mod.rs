//! Seeding the in-memory directory and job board from a CSV export.
//!
//! Columns: `kind,id,name,email,address,representative_name,representative_position,
//! parent_id,duration`. `kind` is one of `company`, `academy`, `student`, `job`.
//! A student's `parent_id` is its academy; a job's `parent_id` is its company.

mod parser;

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::workflows::placement::{
    AcademyId, CompanyId, InMemoryDirectory, InMemoryPlacementStore, JobId, JobPosting,
    OrganizationProfile, Representative, RepositoryError, StudentId, StudentProfile,
};
use parser::{parse_rows, DirectoryRow, NumberedRow};

#[derive(Debug, thiserror::Error)]
pub enum DirectorySeedError {
    #[error("unable to open directory csv {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed directory csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: unknown kind '{kind}'")]
    UnknownKind { line: u64, kind: String },
    #[error("line {line}: {field} is required for {kind} rows")]
    MissingField {
        line: u64,
        kind: &'static str,
        field: &'static str,
    },
    #[error("line {line}: {kind} '{id}' references unknown {parent} '{parent_id}'")]
    DanglingReference {
        line: u64,
        kind: &'static str,
        id: String,
        parent: &'static str,
        parent_id: String,
    },
    #[error("loading seed into store failed: {0}")]
    Store(#[from] RepositoryError),
}

/// Companies, academies, students, and job postings read from one CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySeed {
    pub companies: Vec<OrganizationProfile>,
    pub academies: Vec<OrganizationProfile>,
    pub students: Vec<StudentProfile>,
    pub jobs: Vec<JobPosting>,
}

impl DirectorySeed {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DirectorySeedError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DirectorySeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DirectorySeedError> {
        let rows = parse_rows(reader)?;
        let mut seed = DirectorySeed::default();
        let mut students = Vec::new();
        let mut jobs = Vec::new();

        for numbered in rows {
            match numbered.row.kind.to_ascii_lowercase().as_str() {
                "company" => seed.companies.push(organization(numbered.row)),
                "academy" | "institute" => seed.academies.push(organization(numbered.row)),
                "student" => students.push(numbered),
                "job" => jobs.push(numbered),
                other => {
                    return Err(DirectorySeedError::UnknownKind {
                        line: numbered.line,
                        kind: other.to_string(),
                    })
                }
            }
        }

        let academy_ids: HashSet<&str> = seed.academies.iter().map(|a| a.id.as_str()).collect();
        for NumberedRow { line, row } in students {
            let email = row.email.ok_or(DirectorySeedError::MissingField {
                line,
                kind: "student",
                field: "email",
            })?;
            if let Some(parent) = row.parent_id.as_deref() {
                if !academy_ids.contains(parent) {
                    return Err(DirectorySeedError::DanglingReference {
                        line,
                        kind: "student",
                        id: row.id,
                        parent: "academy",
                        parent_id: parent.to_string(),
                    });
                }
            }
            seed.students.push(StudentProfile {
                student_id: StudentId(row.id),
                name: row.name,
                email,
                academy_id: row.parent_id.map(AcademyId),
            });
        }

        let company_ids: HashSet<&str> = seed.companies.iter().map(|c| c.id.as_str()).collect();
        for NumberedRow { line, row } in jobs {
            let company_id = row.parent_id.ok_or(DirectorySeedError::MissingField {
                line,
                kind: "job",
                field: "parent_id",
            })?;
            if !company_ids.contains(company_id.as_str()) {
                return Err(DirectorySeedError::DanglingReference {
                    line,
                    kind: "job",
                    id: row.id,
                    parent: "company",
                    parent_id: company_id,
                });
            }
            let duration = row.duration.ok_or(DirectorySeedError::MissingField {
                line,
                kind: "job",
                field: "duration",
            })?;
            seed.jobs.push(JobPosting {
                job_id: JobId(row.id),
                company_id: CompanyId(company_id),
                title: row.name,
                duration,
            });
        }

        Ok(seed)
    }

    /// Load every entry into the in-memory adapters.
    pub fn apply(
        &self,
        directory: &InMemoryDirectory,
        store: &InMemoryPlacementStore,
    ) -> Result<(), DirectorySeedError> {
        for company in &self.companies {
            directory.insert_company(company.clone())?;
        }
        for academy in &self.academies {
            directory.insert_academy(academy.clone())?;
        }
        for student in &self.students {
            directory.insert_student(student.clone())?;
        }
        for job in &self.jobs {
            store.insert_job(job.clone())?;
        }

        info!(
            companies = self.companies.len(),
            academies = self.academies.len(),
            students = self.students.len(),
            jobs = self.jobs.len(),
            "directory seeded"
        );
        Ok(())
    }
}

fn organization(row: DirectoryRow) -> OrganizationProfile {
    let representative = row.representative_name.map(|name| Representative {
        name,
        position: row.representative_position.unwrap_or_default(),
    });
    OrganizationProfile {
        id: row.id,
        name: row.name,
        address: row.address,
        representative,
    }
}
