use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::super::domain::{Application, ApplicationStatus, Job, JobStatus, Student};
use super::super::identifiers::DocumentId;
use super::super::records::fetch_all;
use crate::store::{DocumentStore, Filter, StoreError, ID_FIELD};

/// Which jobs, and which of their applications, an aggregation covers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobScope {
    pub cycle_id: Option<DocumentId>,
    pub job_id: Option<DocumentId>,
    pub job_statuses: Vec<JobStatus>,
    /// Matched case-insensitively.
    pub companies: Vec<String>,
    pub min_package: Option<f64>,
    pub max_package: Option<f64>,
    pub application_statuses: Vec<ApplicationStatus>,
}

impl JobScope {
    pub fn cycle(cycle_id: DocumentId) -> Self {
        Self {
            cycle_id: Some(cycle_id),
            ..Self::default()
        }
    }

    pub fn job(job_id: DocumentId) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::default()
        }
    }

    /// A package bound excludes jobs whose compensation is unknown.
    pub fn admits_job(&self, job: &Job) -> bool {
        if let Some(cycle_id) = &self.cycle_id {
            if job.cycle_id.as_ref() != Some(cycle_id) {
                return false;
            }
        }
        if let Some(job_id) = &self.job_id {
            if &job.id != job_id {
                return false;
            }
        }
        if !self.job_statuses.is_empty() && !self.job_statuses.contains(&job.status) {
            return false;
        }
        if !self.companies.is_empty()
            && !self
                .companies
                .iter()
                .any(|company| company.trim().eq_ignore_ascii_case(job.company.trim()))
        {
            return false;
        }
        if self.min_package.is_some() || self.max_package.is_some() {
            let Some(amount) = job.compensation_lpa() else {
                return false;
            };
            if self.min_package.is_some_and(|min| amount < min)
                || self.max_package.is_some_and(|max| amount > max)
            {
                return false;
            }
        }
        true
    }

    pub fn admits_application(&self, application: &Application) -> bool {
        self.application_statuses.is_empty()
            || self.application_statuses.contains(&application.status)
    }
}

/// Jobs, applications and students resolved for one scope.
#[derive(Debug, Clone, Default)]
pub struct ScopedDataset {
    pub jobs: BTreeMap<DocumentId, Job>,
    /// Ordered by creation time, then identifier.
    pub applications: Vec<Application>,
    pub students: BTreeMap<DocumentId, Student>,
}

/// One application together with the job and student it references.
#[derive(Debug, Clone, Copy)]
pub struct JoinedApplication<'a> {
    pub application: &'a Application,
    pub job: &'a Job,
    pub student: &'a Student,
}

impl ScopedDataset {
    pub fn load<S>(store: &S, scope: &JobScope) -> Result<Self, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        // Decoding already re-pointed drifted references at stored documents.
        let all_jobs: Vec<Job> = fetch_all(store, &Filter::all())?;
        let known_jobs: BTreeSet<DocumentId> = all_jobs.iter().map(|job| job.id.clone()).collect();
        let jobs: BTreeMap<DocumentId, Job> = all_jobs
            .into_iter()
            .filter(|job| scope.admits_job(job))
            .map(|job| (job.id.clone(), job))
            .collect();

        let mut applications = Vec::new();
        for application in fetch_all::<Application, _>(store, &Filter::all())? {
            if !known_jobs.contains(&application.job_id) {
                warn!(
                    application = %application.id,
                    job = %application.job_id,
                    "data quality gap: application references a missing job"
                );
                continue;
            }
            if jobs.contains_key(&application.job_id) && scope.admits_application(&application) {
                applications.push(application);
            }
        }
        applications.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });

        let student_ids: BTreeSet<&DocumentId> =
            applications.iter().map(|application| &application.student_id).collect();
        let students = if student_ids.is_empty() {
            BTreeMap::new()
        } else {
            let filter = Filter::all().any_of(ID_FIELD, student_ids.iter().map(|id| id.as_str()));
            fetch_all::<Student, _>(store, &filter)?
                .into_iter()
                .map(|student| (student.id.clone(), student))
                .collect()
        };
        for application in &applications {
            if !students.contains_key(&application.student_id) {
                warn!(
                    application = %application.id,
                    student = %application.student_id,
                    "data quality gap: application references a missing student"
                );
            }
        }

        Ok(Self {
            jobs,
            applications,
            students,
        })
    }

    /// Joins every application to its job and student. Unresolved students were logged by
    /// [`ScopedDataset::load`] and are skipped here.
    pub fn joined(&self) -> Vec<JoinedApplication<'_>> {
        self.applications
            .iter()
            .filter_map(|application| {
                let job = self.jobs.get(&application.job_id)?;
                let student = self.students.get(&application.student_id)?;
                Some(JoinedApplication {
                    application,
                    job,
                    student,
                })
            })
            .collect()
    }

    pub fn distinct_companies(&self) -> BTreeSet<String> {
        self.jobs
            .values()
            .map(|job| job.company.trim().to_string())
            .filter(|company| !company.is_empty())
            .collect()
    }
}
