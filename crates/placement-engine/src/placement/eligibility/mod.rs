mod config;
mod policy;
mod rules;

pub use config::{EligibilityConfig, PlacedScope};
pub use policy::{EligibilityDecision, IneligibilityReason};
pub use rules::{decide, is_eligible, EligibilityContext};

use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{Application, ApplicationStatus, CycleKind, Job, PlacementCycle, Student};
use super::error::PlacementError;
use super::identifiers::DocumentId;
use super::records::{fetch, fetch_all};
use crate::store::{DocumentStore, Filter, StoreError};

/// Store-backed evaluator that gathers cycle and history facts before running the pure rules.
pub struct EligibilityEvaluator<S> {
    store: Arc<S>,
    config: EligibilityConfig,
}

impl<S> EligibilityEvaluator<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, config: EligibilityConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> EligibilityConfig {
        self.config
    }

    /// Resolves both records by identifier and decides.
    pub fn evaluate(
        &self,
        job_id: &str,
        student_id: &str,
    ) -> Result<EligibilityDecision, PlacementError> {
        let job_id = DocumentId::parse(job_id)?;
        let student_id = DocumentId::parse(student_id)?;

        let job: Job = fetch(self.store.as_ref(), &job_id)?
            .ok_or_else(|| PlacementError::not_found("job", &job_id))?;
        let student: Student = fetch(self.store.as_ref(), &student_id)?
            .ok_or_else(|| PlacementError::not_found("student", &student_id))?;

        Ok(self.decide(&job, &student)?)
    }

    pub fn decide(&self, job: &Job, student: &Student) -> Result<EligibilityDecision, StoreError> {
        let context = self.context_for(job, student)?;
        let decision = decide(job, student, &context);
        debug!(
            job = %job.id,
            student = %student.id,
            outcome = %decision.summary(),
            "eligibility evaluated"
        );
        Ok(decision)
    }

    pub fn context_for(
        &self,
        job: &Job,
        student: &Student,
    ) -> Result<EligibilityContext, StoreError> {
        let cycle_kind = match &job.cycle_id {
            Some(cycle_id) => match fetch::<PlacementCycle, _>(self.store.as_ref(), cycle_id)? {
                Some(cycle) => Some(cycle.kind),
                None => {
                    warn!(job = %job.id, cycle = %cycle_id, "data quality gap: job references a missing cycle");
                    None
                }
            },
            None => None,
        };

        let context = EligibilityContext::new(cycle_kind);
        if cycle_kind != Some(CycleKind::Placement) {
            return Ok(context);
        }

        Ok(match self.placing_application(job, student)? {
            Some(application_id) => context.placed(application_id),
            None => context,
        })
    }

    /// Finds a `selected` application that makes the student count as placed.
    fn placing_application(
        &self,
        job: &Job,
        student: &Student,
    ) -> Result<Option<DocumentId>, StoreError> {
        let applications: Vec<Application> = fetch_all(self.store.as_ref(), &Filter::all())?;
        let selected = applications.into_iter().filter(|application| {
            application.student_id == student.id
                && application.status == ApplicationStatus::Selected
        });

        for application in selected {
            match self.config.placed_scope {
                PlacedScope::AllTime => return Ok(Some(application.id)),
                PlacedScope::SameCycle => {
                    let Some(cycle_id) = &job.cycle_id else {
                        return Ok(None);
                    };
                    let placed_job: Option<Job> = fetch(self.store.as_ref(), &application.job_id)?;
                    if placed_job.and_then(|placed| placed.cycle_id).as_ref() == Some(cycle_id) {
                        return Ok(Some(application.id));
                    }
                }
            }
        }

        Ok(None)
    }
}
