//! Placement analytics and eligibility engine.
//!
//! Leaves first: identifiers and compensation parsing, typed records decoded from tolerant
//! documents, the eligibility rules, the statistics aggregator, report generation, and the
//! application lifecycle. [`PlacementEngine`] wires them around one shared store and
//! [`placement_router`] exposes it over HTTP.

pub mod applications;
pub mod compensation;
pub mod domain;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod identifiers;
pub mod records;
pub mod reports;
pub mod resumes;
pub mod router;
pub mod statistics;

#[cfg(test)]
mod tests;

pub use applications::{
    ApplicationService, CascadeSummary, Notification, NotificationError, Notifier,
};
pub use compensation::{
    parse_compensation, try_parse_compensation, Compensation, CompensationBucket,
    CompensationKind,
};
pub use domain::{
    Application, ApplicationStatus, CycleKind, CycleStatus, EligibilityRule, GenderFilter, Job,
    JobStatus, NewJob, PlacementCycle, Student,
};
pub use eligibility::{
    EligibilityConfig, EligibilityContext, EligibilityDecision, EligibilityEvaluator,
    IneligibilityReason, PlacedScope,
};
pub use engine::PlacementEngine;
pub use error::PlacementError;
pub use identifiers::{normalize, DocumentId, InvalidIdentifier, ReferenceIndex, ReferenceKind};
pub use reports::{
    ExportFormat, ExportedReport, ReportFilters, ReportKind, ReportStatus, ReportView,
};
pub use resumes::{ResumeDirectory, ResumeRef, StoreResumeDirectory};
pub use router::placement_router;
pub use statistics::{CycleStatistics, Dimension, GroupStats, JobScope};
