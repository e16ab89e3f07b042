use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::super::error::PlacementError;
use super::super::identifiers::DocumentId;
use super::super::records::changes;
use super::super::resumes::ResumeDirectory;
use super::builders::{BuildError, ReportBuilder};
use super::domain::{
    ReportData, ReportFilters, ReportRecord, ReportStatus, ReportView, ValidatedFilters,
};
use super::export::{ExportFormat, ExportedReport};
use crate::store::{Collection, DocumentStore, Filter, StoreError};

/// Drives report generation through `processing -> completed | error` and serves results.
pub struct ReportGenerator<S, R: ?Sized> {
    store: Arc<S>,
    resumes: Arc<R>,
}

impl<S, R> ReportGenerator<S, R>
where
    S: DocumentStore,
    R: ResumeDirectory + ?Sized,
{
    pub fn new(store: Arc<S>, resumes: Arc<R>) -> Self {
        Self { store, resumes }
    }

    /// Creates a report and builds it synchronously.
    ///
    /// Build failures land in the report's error state; only invalid filters and failures to
    /// record the report itself are returned.
    pub fn generate(
        &self,
        report_type: &str,
        filters: ReportFilters,
    ) -> Result<DocumentId, PlacementError> {
        let validated = filters.validate()?;
        let record = ReportRecord::processing(report_type, filters);
        let report_id = self
            .store
            .insert(Collection::Reports, record.to_document()?)?;
        info!(report = %report_id, report_type = %record.report_type, "report processing");

        match self.materialize(&report_id, &record.report_type, &validated) {
            Ok((data_id, row_count)) => {
                self.store.update(
                    Collection::Reports,
                    &report_id,
                    changes([
                        ("status", Value::from(ReportStatus::Completed.label())),
                        ("data_id", Value::from(data_id)),
                        ("row_count", Value::from(row_count)),
                        ("completed_at", Value::from(Utc::now().to_rfc3339())),
                    ]),
                )?;
                info!(report = %report_id, rows = row_count, "report completed");
            }
            Err(err) => {
                let message = err.to_string();
                warn!(report = %report_id, error = %message, "report failed");
                self.store.update(
                    Collection::Reports,
                    &report_id,
                    changes([
                        ("status", Value::from(ReportStatus::Error.label())),
                        ("error_message", Value::from(message)),
                        ("completed_at", Value::from(Utc::now().to_rfc3339())),
                    ]),
                )?;
            }
        }

        Ok(report_id)
    }

    fn materialize(
        &self,
        report_id: &DocumentId,
        report_type: &str,
        filters: &ValidatedFilters,
    ) -> Result<(DocumentId, usize), BuildError> {
        let data = ReportBuilder::new(self.store.as_ref(), self.resumes.as_ref(), filters)
            .build(report_type)?;
        let data_id = self
            .store
            .insert(Collection::ReportData, data.to_document(report_id)?)?;
        Ok((data_id, data.row_count()))
    }

    pub fn get(&self, report_id: &str) -> Result<ReportView, PlacementError> {
        let record = self.record(report_id)?;
        let data = match (record.status, &record.data_id) {
            (ReportStatus::Completed, Some(data_id)) => Some(self.data(&record, data_id)?),
            _ => None,
        };
        Ok(record.to_view(data))
    }

    /// Report metadata, newest first.
    pub fn list(&self) -> Result<Vec<ReportView>, PlacementError> {
        let mut records = Vec::new();
        for document in self.store.find(Collection::Reports, &Filter::all())? {
            match ReportRecord::from_document(&document) {
                Ok(record) => records.push(record),
                Err(err) => warn!(%err, "data quality gap: undecodable report"),
            }
        }
        records.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(records.iter().map(|record| record.to_view(None)).collect())
    }

    /// Serializes the materialized rows; never re-aggregates.
    pub fn export(
        &self,
        report_id: &str,
        format: ExportFormat,
    ) -> Result<ExportedReport, PlacementError> {
        let record = self.record(report_id)?;
        let data_id = match (record.status, &record.data_id) {
            (ReportStatus::Completed, Some(data_id)) => data_id,
            (status, _) => {
                return Err(PlacementError::Validation(format!(
                    "report {} is {} and cannot be exported",
                    record.id,
                    status.label()
                )))
            }
        };
        let data = self.data(&record, data_id)?;
        Ok(ExportedReport::render(&record, &data, format)?)
    }

    fn record(&self, report_id: &str) -> Result<ReportRecord, PlacementError> {
        let report_id = DocumentId::parse(report_id)?;
        let document = self
            .store
            .get(Collection::Reports, &report_id)?
            .ok_or_else(|| PlacementError::not_found("report", &report_id))?;
        Ok(ReportRecord::from_document(&document)?)
    }

    fn data(&self, record: &ReportRecord, data_id: &DocumentId) -> Result<ReportData, PlacementError> {
        let document = self
            .store
            .get(Collection::ReportData, data_id)?
            .ok_or_else(|| {
                PlacementError::Persistence(StoreError::InvalidDocument(format!(
                    "report {} points at missing data {data_id}",
                    record.id
                )))
            })?;
        Ok(ReportData::from_document(&document)?)
    }
}
