use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::super::domain::{Application, ApplicationStatus, Job, JobStatus, NewJob, Student};
use super::super::eligibility::{EligibilityConfig, EligibilityDecision, EligibilityEvaluator};
use super::super::error::PlacementError;
use super::super::identifiers::{reference_candidates, DocumentId, ReferenceIndex, ReferenceKind};
use super::super::records::{changes, fetch, fetch_all};
use super::notifier::{Notification, Notifier};
use crate::store::{document_id, Collection, Document, DocumentStore, Filter, StoreError};

const WITHDRAWN_STAGE: &str = "Withdrawn";
const APPLIED_STAGE: &str = "Applied";

/// Counts of documents removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub cycles_deleted: usize,
    pub jobs_deleted: usize,
    pub applications_deleted: usize,
}

impl CascadeSummary {
    fn absorb(&mut self, other: CascadeSummary) {
        self.cycles_deleted += other.cycles_deleted;
        self.jobs_deleted += other.jobs_deleted;
        self.applications_deleted += other.applications_deleted;
    }
}

/// Writes to applications, jobs and cycles.
///
/// Status updates are last-write-wins; cascades delete children before parents and are safe
/// to re-run after a partial failure.
pub struct ApplicationService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    eligibility: EligibilityEvaluator<S>,
}

impl<S, N> ApplicationService<S, N>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: EligibilityConfig) -> Self {
        let eligibility = EligibilityEvaluator::new(Arc::clone(&store), config);
        Self {
            store,
            notifier,
            eligibility,
        }
    }

    /// Creates an application after the job, eligibility and duplicate checks pass.
    pub fn apply(&self, job_id: &str, student_id: &str) -> Result<Application, PlacementError> {
        let job_id = DocumentId::parse(job_id)?;
        let student_id = DocumentId::parse(student_id)?;

        let job: Job = fetch(self.store.as_ref(), &job_id)?
            .ok_or_else(|| PlacementError::not_found("job", &job_id))?;
        let student: Student = fetch(self.store.as_ref(), &student_id)?
            .ok_or_else(|| PlacementError::not_found("student", &student_id))?;

        let now = Utc::now();
        if !job.accepts_applications_at(now) {
            return Err(PlacementError::Validation(format!(
                "job {} is not accepting applications",
                job.id
            )));
        }

        if let EligibilityDecision::Ineligible { reason } = self.eligibility.decide(&job, &student)? {
            return Err(PlacementError::Ineligible(reason));
        }

        let application = Application {
            id: DocumentId::generate(),
            job_id: job.id.clone(),
            student_id: student.id.clone(),
            status: ApplicationStatus::Applied,
            current_stage: Some(APPLIED_STAGE.to_string()),
            created_at: Some(now),
            updated_at: Some(now),
        };
        // Any spelling of the pair counts, including documents too broken to decode.
        let same_pair = |document: &Document| {
            reference_candidates(document, ReferenceKind::Job).contains(&job.id)
                && reference_candidates(document, ReferenceKind::Student).contains(&student.id)
        };
        match self.store.insert_unless(
            Collection::Applications,
            application.to_document()?,
            &same_pair,
        ) {
            Ok(_) => {}
            Err(StoreError::Duplicate { existing, .. }) => {
                return Err(PlacementError::Conflict(format!(
                    "student {} already applied to job {} (application {existing})",
                    student.id, job.id
                )));
            }
            Err(err) => return Err(err.into()),
        }
        info!(application = %application.id, job = %job.id, student = %student.id, "application created");

        Ok(application)
    }

    /// Last write wins; no optimistic locking.
    pub fn update_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
        stage: Option<String>,
    ) -> Result<Application, PlacementError> {
        let mut application = self.application(application_id)?;

        application.status = status;
        if stage.is_some() {
            application.current_stage = stage;
        }
        application.updated_at = Some(Utc::now());
        self.write_status(&application)?;
        info!(application = %application.id, status = status.label(), "application status updated");

        self.announce_status(&application);
        Ok(application)
    }

    /// Moves an in-flight application to `rejected` with stage `Withdrawn`.
    pub fn withdraw(&self, application_id: &str) -> Result<Application, PlacementError> {
        let mut application = self.application(application_id)?;
        if !application.status.is_withdrawable() {
            return Err(PlacementError::Conflict(format!(
                "application {} is {} and cannot be withdrawn",
                application.id,
                application.status.label()
            )));
        }

        application.status = ApplicationStatus::Rejected;
        application.current_stage = Some(WITHDRAWN_STAGE.to_string());
        application.updated_at = Some(Utc::now());
        self.write_status(&application)?;
        info!(application = %application.id, "application withdrawn");

        Ok(application)
    }

    /// Persists a new open job and announces it to currently eligible students.
    pub fn post_job(&self, new_job: NewJob) -> Result<Job, PlacementError> {
        if new_job.company.trim().is_empty() || new_job.role.trim().is_empty() {
            return Err(PlacementError::Validation(
                "company and role are required".to_string(),
            ));
        }
        if let Some(compensation) = &new_job.compensation {
            if !compensation.amount_lpa.is_finite() || compensation.amount_lpa < 0.0 {
                return Err(PlacementError::Validation(
                    "compensation must be a non-negative number".to_string(),
                ));
            }
        }
        if !new_job.eligibility.min_cgpa.is_finite() || new_job.eligibility.min_cgpa < 0.0 {
            return Err(PlacementError::Validation(
                "minimum cgpa must be a non-negative number".to_string(),
            ));
        }

        let cycle_id = new_job
            .cycle_id
            .as_deref()
            .map(DocumentId::parse)
            .transpose()?;
        if let Some(cycle_id) = &cycle_id {
            if self.store.get(Collection::Cycles, cycle_id)?.is_none() {
                return Err(PlacementError::not_found("cycle", cycle_id));
            }
        }

        let job = Job {
            id: DocumentId::generate(),
            cycle_id,
            company: new_job.company.trim().to_string(),
            role: new_job.role.trim().to_string(),
            compensation: new_job.compensation,
            compensation_label: new_job.compensation.map(|compensation| compensation.label()),
            eligibility: new_job.eligibility,
            status: JobStatus::Open,
            deadline: new_job.deadline,
            created_at: Some(Utc::now()),
        };
        self.store.insert(Collection::Jobs, job.to_document()?)?;
        info!(job = %job.id, company = %job.company, "job posted");

        self.announce_job(&job);
        Ok(job)
    }

    /// Deletes a job and its applications. Already-deleted data reports zero deletions.
    pub fn delete_job(&self, job_id: &str) -> Result<CascadeSummary, PlacementError> {
        let job_id = DocumentId::parse(job_id)?;
        let summary = self.cascade_job(&job_id)?;
        info!(
            job = %job_id,
            jobs = summary.jobs_deleted,
            applications = summary.applications_deleted,
            "job deleted"
        );
        Ok(summary)
    }

    /// Deletes a cycle, its jobs and their applications, children first.
    pub fn delete_cycle(&self, cycle_id: &str) -> Result<CascadeSummary, PlacementError> {
        let cycle_id = DocumentId::parse(cycle_id)?;

        let mut summary = CascadeSummary::default();
        for job_id in self.children(Collection::Jobs, ReferenceKind::Cycle, &cycle_id)? {
            summary.absorb(self.cascade_job(&job_id)?);
        }
        if self.store.delete(Collection::Cycles, &cycle_id)? {
            summary.cycles_deleted += 1;
        }

        info!(
            cycle = %cycle_id,
            jobs = summary.jobs_deleted,
            applications = summary.applications_deleted,
            "cycle deleted"
        );
        Ok(summary)
    }

    fn cascade_job(&self, job_id: &DocumentId) -> Result<CascadeSummary, StoreError> {
        let mut summary = CascadeSummary::default();
        for application_id in self.children(Collection::Applications, ReferenceKind::Job, job_id)? {
            if self.store.delete(Collection::Applications, &application_id)? {
                summary.applications_deleted += 1;
            }
        }
        if self.store.delete(Collection::Jobs, job_id)? {
            summary.jobs_deleted += 1;
        }
        Ok(summary)
    }

    /// Raw scan so documents that fail to decode are still removed with their parent. A child
    /// belongs to the first stored document its reference fields name.
    fn children(
        &self,
        collection: Collection,
        reference: ReferenceKind,
        parent: &DocumentId,
    ) -> Result<Vec<DocumentId>, StoreError> {
        let index = ReferenceIndex::load(self.store.as_ref(), &[reference])?;
        Ok(self
            .store
            .find(collection, &Filter::all())?
            .iter()
            .filter(|document| index.resolve(document, reference).as_ref() == Some(parent))
            .filter_map(document_id)
            .collect())
    }

    fn application(&self, application_id: &str) -> Result<Application, PlacementError> {
        let application_id = DocumentId::parse(application_id)?;
        fetch(self.store.as_ref(), &application_id)?
            .ok_or_else(|| PlacementError::not_found("application", &application_id))
    }

    fn write_status(&self, application: &Application) -> Result<(), PlacementError> {
        let updated = self.store.update(
            Collection::Applications,
            &application.id,
            changes([
                ("status", Value::from(application.status.label())),
                (
                    "current_stage",
                    application
                        .current_stage
                        .clone()
                        .map_or(Value::Null, Value::from),
                ),
                (
                    "updated_at",
                    application
                        .updated_at
                        .map_or(Value::Null, |at| Value::from(at.to_rfc3339())),
                ),
            ]),
        )?;
        if updated {
            Ok(())
        } else {
            Err(PlacementError::not_found("application", &application.id))
        }
    }

    fn announce_job(&self, job: &Job) {
        let recipients = match self.eligible_recipients(job) {
            Ok(recipients) => recipients,
            Err(err) => {
                warn!(job = %job.id, %err, "could not resolve job announcement recipients");
                return;
            }
        };
        if recipients.is_empty() {
            return;
        }

        let mut notification = Notification::new(
            "job_posted",
            format!("{} is hiring: {}", job.company, job.role),
            recipients,
        )
        .with_detail("job_id", job.id.as_str())
        .with_detail("company", job.company.as_str())
        .with_detail("role", job.role.as_str());
        if let Some(label) = &job.compensation_label {
            notification = notification.with_detail("package", label.as_str());
        }
        self.dispatch(notification);
    }

    fn eligible_recipients(&self, job: &Job) -> Result<Vec<String>, StoreError> {
        let students: Vec<Student> = fetch_all(self.store.as_ref(), &Filter::all())?;
        let mut recipients = Vec::new();
        for student in students {
            if student.email.is_empty() {
                continue;
            }
            if self.eligibility.decide(job, &student)?.is_eligible() {
                recipients.push(student.email);
            }
        }
        Ok(recipients)
    }

    fn announce_status(&self, application: &Application) {
        let student = match fetch::<Student, _>(self.store.as_ref(), &application.student_id) {
            Ok(Some(student)) if !student.email.is_empty() => student,
            Ok(_) => return,
            Err(err) => {
                warn!(application = %application.id, %err, "could not resolve status notification recipient");
                return;
            }
        };

        let notification = Notification::new(
            "application_status_changed",
            format!("Your application is now {}", application.status.label()),
            vec![student.email],
        )
        .with_detail("application_id", application.id.as_str())
        .with_detail("status", application.status.label());
        self.dispatch(notification);
    }

    /// Fire-and-forget: failures are logged and swallowed.
    fn dispatch(&self, notification: Notification) {
        let template = notification.template.clone();
        if let Err(err) = self.notifier.notify(notification) {
            warn!(template = %template, %err, "notification delivery failed");
        }
    }
}
