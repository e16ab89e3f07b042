use serde::{Deserialize, Serialize};

use super::super::compensation::CompensationSummary;
use super::super::domain::ApplicationStatus;
use super::percentage;
use super::scope::JoinedApplication;

const UNSPECIFIED: &str = "Unspecified";

/// Axis along which joined applications are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Status,
    Branch,
    Gender,
    Company,
    CompensationBucket,
}

impl Dimension {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Status,
            Self::Branch,
            Self::Gender,
            Self::Company,
            Self::CompensationBucket,
        ]
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|dimension| dimension.label().eq_ignore_ascii_case(value.trim()))
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Branch => "branch",
            Self::Gender => "gender",
            Self::Company => "company",
            Self::CompensationBucket => "compensation_bucket",
        }
    }

    /// Group key for one row. Unknown compensation has no bucket.
    pub fn key_for(self, row: &JoinedApplication<'_>) -> Option<String> {
        match self {
            Self::Status => Some(row.application.status.label().to_string()),
            Self::Branch => Some(group_key(&row.student.branch)),
            Self::Gender => Some(group_key(&row.student.gender.to_ascii_lowercase())),
            Self::Company => Some(group_key(&row.job.company)),
            Self::CompensationBucket => row
                .job
                .compensation
                .map(|compensation| compensation.bucket().label().to_string()),
        }
    }
}

/// Trimmed group key; blank values group under `Unspecified`.
pub fn group_key(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Counts and compensation extrema for one group.
///
/// `compensation` covers the advertised packages of every application in the group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub count: usize,
    pub selected: usize,
    pub compensation: CompensationSummary,
}

impl GroupStats {
    pub fn record(&mut self, row: &JoinedApplication<'_>) {
        self.count += 1;
        if row.application.status == ApplicationStatus::Selected {
            self.selected += 1;
        }
        self.compensation.record_optional(row.job.compensation.as_ref());
    }

    pub fn selection_rate(&self) -> f64 {
        percentage(self.selected, self.count)
    }
}
