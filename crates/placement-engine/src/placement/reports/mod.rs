//! Report generation, persistence and export.

mod builders;
mod domain;
mod export;
mod service;

pub use builders::BuildError;
pub use domain::{
    PlacementStatus, ReportData, ReportFilters, ReportKind, ReportRecord, ReportSection,
    ReportStatus, ReportView, ValidatedFilters,
};
pub use export::{
    suggested_filename, Cell, ExportError, ExportFormat, ExportedReport, TabularReport,
};
pub use service::ReportGenerator;
