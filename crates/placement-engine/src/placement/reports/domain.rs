use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::super::domain::{ApplicationStatus, Student};
use super::super::error::PlacementError;
use super::super::identifiers::DocumentId;
use super::super::statistics::JobScope;
use crate::store::{into_document, Document, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    PlacementSummary,
    StudentPlacementStatus,
    CompanyWiseRecruitment,
    BranchWiseStatistics,
    CtcAnalysis,
    JobApplicants,
}

impl ReportKind {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::PlacementSummary,
            Self::StudentPlacementStatus,
            Self::CompanyWiseRecruitment,
            Self::BranchWiseStatistics,
            Self::CtcAnalysis,
            Self::JobApplicants,
        ]
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|kind| kind.tag() == tag.trim())
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::PlacementSummary => "placement_summary",
            Self::StudentPlacementStatus => "student_placement_status",
            Self::CompanyWiseRecruitment => "company_wise_recruitment",
            Self::BranchWiseStatistics => "branch_wise_statistics",
            Self::CtcAnalysis => "ctc_analysis",
            Self::JobApplicants => "job_applicants",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Processing,
    Completed,
    Error,
}

impl ReportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Filter payload accepted by report generation, as sent by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportFilters {
    pub cycle_id: Option<String>,
    pub job_id: Option<String>,
    pub branches: Vec<String>,
    pub companies: Vec<String>,
    pub status: Vec<String>,
    pub min_package: Option<f64>,
    pub max_package: Option<f64>,
    pub student_ids: Vec<String>,
}

impl ReportFilters {
    pub fn validate(&self) -> Result<ValidatedFilters, PlacementError> {
        let cycle_id = self.cycle_id.as_deref().map(DocumentId::parse).transpose()?;
        let job_id = self.job_id.as_deref().map(DocumentId::parse).transpose()?;
        let student_ids = self
            .student_ids
            .iter()
            .map(|raw| DocumentId::parse(raw))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let statuses = self
            .status
            .iter()
            .map(|raw| {
                ApplicationStatus::parse(raw).ok_or_else(|| {
                    PlacementError::Validation(format!("unknown application status '{raw}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (name, bound) in [("minPackage", self.min_package), ("maxPackage", self.max_package)] {
            if bound.is_some_and(|value| !value.is_finite() || value < 0.0) {
                return Err(PlacementError::Validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_package, self.max_package) {
            if min > max {
                return Err(PlacementError::Validation(format!(
                    "minPackage {min} exceeds maxPackage {max}"
                )));
            }
        }

        Ok(ValidatedFilters {
            cycle_id,
            job_id,
            branches: self.branches.iter().map(|b| b.trim().to_string()).collect(),
            companies: self.companies.clone(),
            statuses,
            min_package: self.min_package,
            max_package: self.max_package,
            student_ids,
        })
    }
}

/// Filters after identifier and range validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedFilters {
    pub cycle_id: Option<DocumentId>,
    pub job_id: Option<DocumentId>,
    pub branches: Vec<String>,
    pub companies: Vec<String>,
    pub statuses: Vec<ApplicationStatus>,
    pub min_package: Option<f64>,
    pub max_package: Option<f64>,
    pub student_ids: BTreeSet<DocumentId>,
}

impl ValidatedFilters {
    pub fn scope(&self) -> JobScope {
        JobScope {
            cycle_id: self.cycle_id.clone(),
            job_id: self.job_id.clone(),
            job_statuses: Vec::new(),
            companies: self.companies.clone(),
            min_package: self.min_package,
            max_package: self.max_package,
            application_statuses: self.statuses.clone(),
        }
    }

    pub fn admits_branch(&self, branch: &str) -> bool {
        self.branches.is_empty()
            || self
                .branches
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(branch.trim()))
    }

    /// Post-join filter on the student side of a row.
    pub fn admits_student(&self, student: &Student) -> bool {
        self.admits_branch(&student.branch)
            && (self.student_ids.is_empty() || self.student_ids.contains(&student.id))
    }
}

/// Derived placement label for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlacementStatus {
    Placed,
    NotApplied,
    InProcess,
    Unplaced,
}

impl PlacementStatus {
    /// `selected` wins, then no applications, then any still `applied`.
    pub fn derive(statuses: &[ApplicationStatus]) -> Self {
        if statuses.contains(&ApplicationStatus::Selected) {
            Self::Placed
        } else if statuses.is_empty() {
            Self::NotApplied
        } else if statuses.contains(&ApplicationStatus::Applied) {
            Self::InProcess
        } else {
            Self::Unplaced
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::NotApplied => "Not Applied",
            Self::InProcess => "In Process",
            Self::Unplaced => "Unplaced",
        }
    }
}

/// Report metadata as persisted in the reports collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Raw tag as requested, so unrecognized tags can still be recorded.
    pub report_type: String,
    pub filters: ReportFilters,
    pub status: ReportStatus,
    #[serde(default)]
    pub data_id: Option<DocumentId>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReportRecord {
    pub fn processing(report_type: &str, filters: ReportFilters) -> Self {
        Self {
            id: DocumentId::generate(),
            report_type: report_type.trim().to_string(),
            filters,
            status: ReportStatus::Processing,
            data_id: None,
            error_message: None,
            row_count: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn to_document(&self) -> Result<Document, StoreError> {
        into_document(serde_json::to_value(self)?)
    }

    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(Value::Object(document.clone()))?)
    }

    pub fn kind(&self) -> Option<ReportKind> {
        ReportKind::parse(&self.report_type)
    }
}

/// One named block of rows. Rows keep their column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub name: String,
    pub rows: Vec<Map<String, Value>>,
}

/// Materialized result of a completed report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub sections: Vec<ReportSection>,
}

impl ReportData {
    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|section| section.rows.len()).sum()
    }

    pub fn section(&self, name: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub(crate) fn to_document(&self, report_id: &DocumentId) -> Result<Document, StoreError> {
        let mut document = into_document(serde_json::to_value(self)?)?;
        document.insert("report_id".to_string(), Value::from(report_id.clone()));
        Ok(document)
    }

    pub(crate) fn from_document(document: &Document) -> Result<Self, StoreError> {
        let sections = document
            .get("sections")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        Ok(Self {
            sections: serde_json::from_value(sections)?,
        })
    }
}

/// Caller-facing view of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub id: DocumentId,
    pub report_type: String,
    pub status: ReportStatus,
    pub filters: ReportFilters,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ReportData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ReportRecord {
    pub fn to_view(&self, data: Option<ReportData>) -> ReportView {
        ReportView {
            id: self.id.clone(),
            report_type: self.report_type.clone(),
            status: self.status,
            filters: self.filters.clone(),
            row_count: self.row_count,
            created_at: self.created_at,
            completed_at: self.completed_at,
            data,
            error_message: self.error_message.clone(),
        }
    }
}
