//! Row builders for each report kind.
//!
//! Builders run over a [`ScopedDataset`] resolved from the report filters, apply the
//! student-side filters after the join, and emit camelCase rows in declaration order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::super::compensation::{CompensationBucket, CompensationSummary};
use super::super::domain::{ApplicationStatus, Job, Student};
use super::super::identifiers::DocumentId;
use super::super::records::fetch;
use super::super::resumes::ResumeDirectory;
use super::super::statistics::{
    branch_population, group_key, percentage, JoinedApplication, ScopedDataset,
};
use super::domain::{
    PlacementStatus, ReportData, ReportKind, ReportSection, ValidatedFilters,
};
use crate::store::{into_document, Document, DocumentStore, StoreError};

const UNDISCLOSED: &str = "Undisclosed";

/// Reasons a report build fails; the message is recorded on the report verbatim.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unsupported report type '{0}'")]
    UnsupportedType(String),
    #[error("{0} report requires a jobId filter")]
    MissingJobId(&'static str),
    #[error("job {0} not found")]
    JobNotFound(DocumentId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) struct ReportBuilder<'a, S: ?Sized, R: ?Sized> {
    store: &'a S,
    resumes: &'a R,
    filters: &'a ValidatedFilters,
}

impl<'a, S, R> ReportBuilder<'a, S, R>
where
    S: DocumentStore + ?Sized,
    R: ResumeDirectory + ?Sized,
{
    pub(crate) fn new(store: &'a S, resumes: &'a R, filters: &'a ValidatedFilters) -> Self {
        Self {
            store,
            resumes,
            filters,
        }
    }

    pub(crate) fn build(&self, report_type: &str) -> Result<ReportData, BuildError> {
        let kind = ReportKind::parse(report_type)
            .ok_or_else(|| BuildError::UnsupportedType(report_type.trim().to_string()))?;

        // Fail before touching the collections when a roster has no job to anchor it.
        if kind == ReportKind::JobApplicants && self.filters.job_id.is_none() {
            return Err(BuildError::MissingJobId(kind.tag()));
        }

        let dataset = ScopedDataset::load(self.store, &self.filters.scope())?;
        let rows: Vec<JoinedApplication<'_>> = dataset
            .joined()
            .into_iter()
            .filter(|row| self.filters.admits_student(row.student))
            .collect();

        let sections = match kind {
            ReportKind::PlacementSummary => vec![placement_summary(kind, &rows)?],
            ReportKind::StudentPlacementStatus => vec![self.student_status(kind, &rows)?],
            ReportKind::CompanyWiseRecruitment => vec![company_recruitment(kind, &dataset, &rows)?],
            ReportKind::BranchWiseStatistics => vec![self.branch_statistics(kind, &rows)?],
            ReportKind::CtcAnalysis => ctc_analysis(&rows)?,
            ReportKind::JobApplicants => vec![self.job_applicants(kind, &rows)?],
        };

        Ok(ReportData { sections })
    }

    fn student_status(
        &self,
        kind: ReportKind,
        rows: &[JoinedApplication<'_>],
    ) -> Result<ReportSection, StoreError> {
        let mut per_student: BTreeMap<&DocumentId, (&Student, Vec<&JoinedApplication<'_>>)> =
            BTreeMap::new();
        for row in rows {
            per_student
                .entry(&row.student.id)
                .or_insert_with(|| (row.student, Vec::new()))
                .1
                .push(row);
        }

        // Explicitly requested students show up even without applications in scope.
        let mut idle = Vec::new();
        for student_id in &self.filters.student_ids {
            if per_student.contains_key(student_id) {
                continue;
            }
            if let Some(student) = fetch::<Student, _>(self.store, student_id)? {
                if self.filters.admits_branch(&student.branch) {
                    idle.push(student);
                }
            }
        }

        let mut entries: Vec<StudentStatusRow<'_>> = per_student
            .values()
            .map(|(student, applications)| StudentStatusRow::new(student, applications))
            .chain(idle.iter().map(|student| StudentStatusRow::new(student, &[])))
            .collect();
        entries.sort_by(|left, right| {
            left.student_name
                .cmp(right.student_name)
                .then_with(|| left.student_id.cmp(right.student_id))
        });

        section(kind.tag(), entries)
    }

    fn branch_statistics(
        &self,
        kind: ReportKind,
        rows: &[JoinedApplication<'_>],
    ) -> Result<ReportSection, StoreError> {
        let population = branch_population(self.store)?;

        let mut applied: BTreeMap<String, BTreeSet<&DocumentId>> = BTreeMap::new();
        let mut placed: BTreeMap<String, BTreeSet<&DocumentId>> = BTreeMap::new();
        for row in rows {
            let branch = group_key(&row.student.branch);
            if row.application.status == ApplicationStatus::Selected {
                placed.entry(branch.clone()).or_default().insert(&row.student.id);
            }
            applied.entry(branch).or_default().insert(&row.student.id);
        }

        let mut branches: BTreeSet<String> = population
            .keys()
            .chain(applied.keys())
            .filter(|branch| self.filters.admits_branch(branch))
            .cloned()
            .collect();
        // Requested branches with nobody enrolled still get a row.
        for requested in &self.filters.branches {
            if !branches
                .iter()
                .any(|branch| branch.eq_ignore_ascii_case(requested))
            {
                branches.insert(requested.clone());
            }
        }

        let entries = branches.iter().map(|branch| {
            let total_students = population.get(branch).copied().unwrap_or(0);
            let placed_students = placed.get(branch).map_or(0, BTreeSet::len);
            BranchRow {
                branch,
                total_students,
                applied: applied.get(branch).map_or(0, BTreeSet::len),
                placed: placed_students,
                placement_percentage: percentage(placed_students, total_students),
            }
        });

        section(kind.tag(), entries)
    }

    fn job_applicants(
        &self,
        kind: ReportKind,
        rows: &[JoinedApplication<'_>],
    ) -> Result<ReportSection, BuildError> {
        let Some(job_id) = &self.filters.job_id else {
            return Err(BuildError::MissingJobId(kind.tag()));
        };
        if fetch::<Job, _>(self.store, job_id)?.is_none() {
            return Err(BuildError::JobNotFound(job_id.clone()));
        }

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let resume = self.resumes.latest_for(&row.student.id)?;
            entries.push(ApplicantRow {
                application_id: row.application.id.as_str(),
                student_id: row.student.id.as_str(),
                student_name: &row.student.name,
                email: &row.student.email,
                branch: &row.student.branch,
                cgpa: row.student.cgpa,
                status: row.application.status.label(),
                current_stage: row.application.current_stage.as_deref(),
                applied_at: day(row.application.created_at),
                resume_url: resume.as_ref().map(|resume| resume.file_url.clone()),
                resume_uploaded_at: resume.and_then(|resume| day(resume.uploaded_at)),
            });
        }

        Ok(section(kind.tag(), entries)?)
    }
}

fn placement_summary(
    kind: ReportKind,
    rows: &[JoinedApplication<'_>],
) -> Result<ReportSection, StoreError> {
    let entries = rows.iter().map(|row| PlacementSummaryRow {
        application_id: row.application.id.as_str(),
        student_name: &row.student.name,
        email: &row.student.email,
        branch: &row.student.branch,
        gender: &row.student.gender,
        cgpa: row.student.cgpa,
        company: &row.job.company,
        role: &row.job.role,
        package: row.job.compensation_label.as_deref(),
        package_lpa: row.job.compensation_lpa(),
        status: row.application.status.label(),
        current_stage: row.application.current_stage.as_deref(),
        applied_at: day(row.application.created_at),
    });
    section(kind.tag(), entries)
}

#[derive(Default)]
struct CompanyTally {
    jobs_posted: usize,
    packages: CompensationSummary,
    funnel: BTreeMap<ApplicationStatus, usize>,
    total: usize,
}

fn company_recruitment(
    kind: ReportKind,
    dataset: &ScopedDataset,
    rows: &[JoinedApplication<'_>],
) -> Result<ReportSection, StoreError> {
    let mut companies: BTreeMap<String, CompanyTally> = BTreeMap::new();
    for job in dataset.jobs.values() {
        let tally = companies.entry(group_key(&job.company)).or_default();
        tally.jobs_posted += 1;
        tally.packages.record_optional(job.compensation.as_ref());
    }
    for row in rows {
        let tally = companies.entry(group_key(&row.job.company)).or_default();
        tally.total += 1;
        *tally.funnel.entry(row.application.status).or_insert(0) += 1;
    }

    let entries = companies.iter().map(|(company, tally)| {
        let stage = |status: ApplicationStatus| tally.funnel.get(&status).copied().unwrap_or(0);
        CompanyRow {
            company,
            jobs_posted: tally.jobs_posted,
            total_applications: tally.total,
            applied: stage(ApplicationStatus::Applied),
            shortlisted: stage(ApplicationStatus::Shortlisted),
            on_hold: stage(ApplicationStatus::OnHold),
            selected: stage(ApplicationStatus::Selected),
            rejected: stage(ApplicationStatus::Rejected),
            selection_rate: percentage(stage(ApplicationStatus::Selected), tally.total),
            min_package: tally.packages.min,
            avg_package: tally.packages.average(),
            max_package: tally.packages.max,
        }
    });
    section(kind.tag(), entries)
}

fn ctc_analysis(rows: &[JoinedApplication<'_>]) -> Result<Vec<ReportSection>, StoreError> {
    let offers: Vec<&JoinedApplication<'_>> = rows
        .iter()
        .filter(|row| row.application.status == ApplicationStatus::Selected)
        .collect();

    let mut histogram: BTreeMap<CompensationBucket, usize> = BTreeMap::new();
    let mut known = 0;
    for offer in &offers {
        if let Some(compensation) = offer.job.compensation {
            *histogram.entry(compensation.bucket()).or_insert(0) += 1;
            known += 1;
        }
    }

    let buckets = CompensationBucket::ordered();
    let distribution = buckets.iter().enumerate().map(|(index, bucket)| {
        let count = histogram.get(bucket).copied().unwrap_or(0);
        BucketRow {
            range: bucket.label(),
            min_lpa: bucket.lower_bound(),
            max_lpa: buckets.get(index + 1).map(|next| next.lower_bound()),
            count,
            percentage: percentage(count, known),
        }
    });

    let details = offers.iter().map(|offer| OfferRow {
        student_name: &offer.student.name,
        branch: &offer.student.branch,
        company: &offer.job.company,
        role: &offer.job.role,
        package: offer.job.compensation_label.as_deref(),
        package_lpa: offer.job.compensation_lpa(),
        bucket: offer
            .job
            .compensation
            .map_or(UNDISCLOSED, |compensation| compensation.bucket().label()),
    });

    Ok(vec![
        section("distribution", distribution)?,
        section("offers", details)?,
    ])
}

fn section<T, I>(name: &str, entries: I) -> Result<ReportSection, StoreError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let rows = entries
        .into_iter()
        .map(|entry| -> Result<Document, StoreError> {
            into_document(serde_json::to_value(entry)?)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ReportSection {
        name: name.to_string(),
        rows,
    })
}

fn day(timestamp: Option<DateTime<Utc>>) -> Option<String> {
    timestamp.map(|dt| dt.format("%Y-%m-%d").to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlacementSummaryRow<'a> {
    application_id: &'a str,
    student_name: &'a str,
    email: &'a str,
    branch: &'a str,
    gender: &'a str,
    cgpa: f64,
    company: &'a str,
    role: &'a str,
    package: Option<&'a str>,
    package_lpa: Option<f64>,
    status: &'static str,
    current_stage: Option<&'a str>,
    applied_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StudentStatusRow<'a> {
    student_id: &'a str,
    student_name: &'a str,
    email: &'a str,
    branch: &'a str,
    cgpa: f64,
    total_applications: usize,
    placement_status: &'static str,
    best_offer_company: Option<&'a str>,
    best_offer_role: Option<&'a str>,
    best_offer_package: Option<f64>,
}

impl<'a> StudentStatusRow<'a> {
    fn new(student: &'a Student, applications: &[&JoinedApplication<'a>]) -> Self {
        let statuses: Vec<ApplicationStatus> = applications
            .iter()
            .map(|row| row.application.status)
            .collect();
        let best = best_offer(applications);

        Self {
            student_id: student.id.as_str(),
            student_name: &student.name,
            email: &student.email,
            branch: &student.branch,
            cgpa: student.cgpa,
            total_applications: applications.len(),
            placement_status: PlacementStatus::derive(&statuses).label(),
            best_offer_company: best.map(|row| row.job.company.as_str()),
            best_offer_role: best.map(|row| row.job.role.as_str()),
            best_offer_package: best.and_then(|row| row.job.compensation_lpa()),
        }
    }
}

/// Highest-paying `selected` application; unknown compensation ranks lowest, ties keep the earliest.
fn best_offer<'a>(applications: &[&JoinedApplication<'a>]) -> Option<JoinedApplication<'a>> {
    let value = |row: &JoinedApplication<'_>| row.job.compensation_lpa().unwrap_or(f64::NEG_INFINITY);
    applications
        .iter()
        .filter(|row| row.application.status == ApplicationStatus::Selected)
        .fold(None, |best: Option<JoinedApplication<'a>>, row| match best {
            Some(current) if value(&current) >= value(*row) => Some(current),
            _ => Some(**row),
        })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompanyRow<'a> {
    company: &'a str,
    jobs_posted: usize,
    total_applications: usize,
    applied: usize,
    shortlisted: usize,
    on_hold: usize,
    selected: usize,
    rejected: usize,
    selection_rate: f64,
    min_package: Option<f64>,
    avg_package: Option<f64>,
    max_package: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BranchRow<'a> {
    branch: &'a str,
    total_students: usize,
    applied: usize,
    placed: usize,
    placement_percentage: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicantRow<'a> {
    application_id: &'a str,
    student_id: &'a str,
    student_name: &'a str,
    email: &'a str,
    branch: &'a str,
    cgpa: f64,
    status: &'static str,
    current_stage: Option<&'a str>,
    applied_at: Option<String>,
    resume_url: Option<String>,
    resume_uploaded_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketRow {
    range: &'static str,
    min_lpa: f64,
    max_lpa: Option<f64>,
    count: usize,
    percentage: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OfferRow<'a> {
    student_name: &'a str,
    branch: &'a str,
    company: &'a str,
    role: &'a str,
    package: Option<&'a str>,
    package_lpa: Option<f64>,
    bucket: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_rows_carry_upper_bounds_except_the_last() {
        let buckets = CompensationBucket::ordered();
        assert_eq!(buckets[0].lower_bound(), 0.0);
        assert_eq!(buckets[1].lower_bound(), 5.0);
        assert_eq!(buckets[5].lower_bound(), 30.0);
        assert_eq!(percentage(1, 3), 33.33);
    }

    #[test]
    fn blank_keys_group_under_unspecified() {
        assert_eq!(group_key("  "), "Unspecified");
        assert_eq!(group_key(" Acme "), "Acme");
    }
}
