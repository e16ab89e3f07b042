use std::collections::BTreeMap;
use std::sync::Arc;

use super::applications::{ApplicationService, CascadeSummary, Notifier};
use super::domain::{Application, ApplicationStatus, Job, NewJob};
use super::eligibility::{EligibilityDecision, EligibilityEvaluator};
use super::error::PlacementError;
use super::identifiers::DocumentId;
use super::reports::{ExportFormat, ExportedReport, ReportFilters, ReportGenerator, ReportView};
use super::resumes::{ResumeDirectory, StoreResumeDirectory};
use super::statistics::{CycleStatistics, Dimension, GroupStats, JobScope, StatisticsAggregator};
use crate::config::EngineConfig;
use crate::store::DocumentStore;

/// Entry point wiring the evaluator, aggregator, report generator and lifecycle service
/// around one shared store.
pub struct PlacementEngine<S, N> {
    eligibility: EligibilityEvaluator<S>,
    statistics: StatisticsAggregator<S>,
    reports: ReportGenerator<S, dyn ResumeDirectory>,
    applications: ApplicationService<S, N>,
}

impl<S, N> PlacementEngine<S, N>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    /// Resumes are read from the store's own `resumes` collection.
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: EngineConfig) -> Self {
        let resumes: Arc<dyn ResumeDirectory> =
            Arc::new(StoreResumeDirectory::new(Arc::clone(&store)));
        Self::with_resumes(store, notifier, resumes, config)
    }

    pub fn with_resumes(
        store: Arc<S>,
        notifier: Arc<N>,
        resumes: Arc<dyn ResumeDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self {
            eligibility: EligibilityEvaluator::new(Arc::clone(&store), config.eligibility),
            statistics: StatisticsAggregator::new(Arc::clone(&store)),
            reports: ReportGenerator::new(Arc::clone(&store), resumes),
            applications: ApplicationService::new(store, notifier, config.eligibility),
        }
    }

    pub fn evaluate_eligibility(
        &self,
        job_id: &str,
        student_id: &str,
    ) -> Result<bool, PlacementError> {
        Ok(self.explain_eligibility(job_id, student_id)?.is_eligible())
    }

    pub fn explain_eligibility(
        &self,
        job_id: &str,
        student_id: &str,
    ) -> Result<EligibilityDecision, PlacementError> {
        self.eligibility.evaluate(job_id, student_id)
    }

    pub fn generate_report(
        &self,
        report_type: &str,
        filters: ReportFilters,
    ) -> Result<DocumentId, PlacementError> {
        self.reports.generate(report_type, filters)
    }

    pub fn get_report(&self, report_id: &str) -> Result<ReportView, PlacementError> {
        self.reports.get(report_id)
    }

    pub fn list_reports(&self) -> Result<Vec<ReportView>, PlacementError> {
        self.reports.list()
    }

    pub fn export_report(
        &self,
        report_id: &str,
        format: ExportFormat,
    ) -> Result<ExportedReport, PlacementError> {
        self.reports.export(report_id, format)
    }

    pub fn compute_cycle_statistics(
        &self,
        cycle_id: &str,
    ) -> Result<CycleStatistics, PlacementError> {
        self.statistics.cycle_statistics(cycle_id)
    }

    pub fn aggregate(
        &self,
        scope: &JobScope,
        dimension: Dimension,
    ) -> Result<BTreeMap<String, GroupStats>, PlacementError> {
        Ok(self.statistics.aggregate(scope, dimension)?)
    }

    pub fn apply(&self, job_id: &str, student_id: &str) -> Result<Application, PlacementError> {
        self.applications.apply(job_id, student_id)
    }

    pub fn update_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
        stage: Option<String>,
    ) -> Result<Application, PlacementError> {
        self.applications.update_status(application_id, status, stage)
    }

    pub fn withdraw(&self, application_id: &str) -> Result<Application, PlacementError> {
        self.applications.withdraw(application_id)
    }

    pub fn post_job(&self, new_job: NewJob) -> Result<Job, PlacementError> {
        self.applications.post_job(new_job)
    }

    pub fn delete_job(&self, job_id: &str) -> Result<CascadeSummary, PlacementError> {
        self.applications.delete_job(job_id)
    }

    pub fn delete_cycle(&self, cycle_id: &str) -> Result<CascadeSummary, PlacementError> {
        self.applications.delete_cycle(cycle_id)
    }
}
