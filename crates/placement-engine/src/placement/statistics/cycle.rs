use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::super::compensation::CompensationSummary;
use super::super::domain::ApplicationStatus;
use super::super::identifiers::DocumentId;
use super::groups::group_key;
use super::percentage;
use super::scope::ScopedDataset;

/// Headline numbers for one placement cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatistics {
    pub total_jobs: usize,
    pub total_companies: usize,
    pub total_applications: usize,
    pub total_students_applied: usize,
    /// Distinct students with at least one `selected` application.
    pub total_selected: usize,
    pub male_selected: usize,
    pub female_selected: usize,
    pub branch_statistics: Vec<BranchStatistics>,
    pub highest_package: Option<f64>,
    pub average_package: Option<f64>,
    pub placement_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchStatistics {
    pub branch: String,
    pub applied: usize,
    pub selected: usize,
    pub placement_percentage: f64,
}

#[derive(Default)]
struct BranchTally<'a> {
    applied: BTreeSet<&'a DocumentId>,
    selected: BTreeSet<&'a DocumentId>,
}

impl CycleStatistics {
    pub fn from_dataset(dataset: &ScopedDataset) -> Self {
        let joined = dataset.joined();

        let mut applicants = BTreeSet::new();
        let mut placed = BTreeSet::new();
        let mut male = BTreeSet::new();
        let mut female = BTreeSet::new();
        let mut offers = CompensationSummary::default();
        let mut branches: BTreeMap<String, BranchTally<'_>> = BTreeMap::new();

        for row in &joined {
            let student_id = &row.student.id;
            applicants.insert(student_id);
            let tally = branches.entry(group_key(&row.student.branch)).or_default();
            tally.applied.insert(student_id);

            if row.application.status != ApplicationStatus::Selected {
                continue;
            }
            placed.insert(student_id);
            tally.selected.insert(student_id);
            offers.record_optional(row.job.compensation.as_ref());
            match row.student.gender.trim().to_ascii_lowercase().as_str() {
                "male" | "m" => {
                    male.insert(student_id);
                }
                "female" | "f" => {
                    female.insert(student_id);
                }
                _ => {}
            }
        }

        let branch_statistics = branches
            .into_iter()
            .map(|(branch, tally)| BranchStatistics {
                branch,
                applied: tally.applied.len(),
                selected: tally.selected.len(),
                placement_percentage: percentage(tally.selected.len(), tally.applied.len()),
            })
            .collect();

        Self {
            total_jobs: dataset.jobs.len(),
            total_companies: dataset.distinct_companies().len(),
            total_applications: joined.len(),
            total_students_applied: applicants.len(),
            total_selected: placed.len(),
            male_selected: male.len(),
            female_selected: female.len(),
            branch_statistics,
            highest_package: offers.max,
            average_package: offers.average(),
            placement_percentage: percentage(placed.len(), applicants.len()),
        }
    }
}
