use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::compensation::Compensation;
use super::identifiers::DocumentId;

/// Student profile as read from the student-profile subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: DocumentId,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub gender: String,
    pub cgpa: f64,
    pub batch: Option<i32>,
    pub program: Option<String>,
}

/// Gender constraint attached to a job's eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderFilter {
    #[default]
    All,
    Male,
    Female,
    Other,
}

impl GenderFilter {
    /// Empty or `all`/`any` means unrestricted.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" | "any" => Some(Self::All),
            "male" | "m" => Some(Self::Male),
            "female" | "f" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    pub fn admits(self, gender: &str) -> bool {
        match self {
            Self::All => true,
            restricted => gender.trim().eq_ignore_ascii_case(restricted.label()),
        }
    }
}

/// Eligibility constraints embedded in a job posting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityRule {
    pub min_cgpa: f64,
    pub gender: GenderFilter,
    pub branches: Vec<String>,
    pub programs: Vec<String>,
    pub batches: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
    OnHold,
}

impl JobStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "open" | "active" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "on_hold" | "hold" | "onhold" => Some(Self::OnHold),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::OnHold => "on_hold",
        }
    }
}

/// Job posting within a placement or internship cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: DocumentId,
    pub cycle_id: Option<DocumentId>,
    pub company: String,
    pub role: String,
    pub compensation: Option<Compensation>,
    /// Compensation as originally written, kept for display.
    pub compensation_label: Option<String>,
    pub eligibility: EligibilityRule,
    pub status: JobStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn compensation_lpa(&self) -> Option<f64> {
        self.compensation.map(|compensation| compensation.amount_lpa)
    }

    pub fn accepts_applications_at(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Open && self.deadline.map_or(true, |deadline| now <= deadline)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Rejected,
    Selected,
    OnHold,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Applied,
            Self::Shortlisted,
            Self::Rejected,
            Self::Selected,
            Self::OnHold,
        ]
    }

    /// Accepts the canonical labels plus the synonyms found in older documents.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "applied" | "pending" | "submitted" => Some(Self::Applied),
            "shortlisted" => Some(Self::Shortlisted),
            "rejected" => Some(Self::Rejected),
            "selected" | "placed" | "offered" => Some(Self::Selected),
            "on_hold" | "hold" | "onhold" => Some(Self::OnHold),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Shortlisted => "shortlisted",
            Self::Rejected => "rejected",
            Self::Selected => "selected",
            Self::OnHold => "on_hold",
        }
    }

    pub const fn is_withdrawable(self) -> bool {
        matches!(self, Self::Applied | Self::Shortlisted | Self::OnHold)
    }
}

/// A student's application to a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub id: DocumentId,
    pub job_id: DocumentId,
    pub student_id: DocumentId,
    pub status: ApplicationStatus,
    pub current_stage: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    Placement,
    Internship,
}

impl CycleKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "placement" | "placements" | "full_time" | "fulltime" => Some(Self::Placement),
            "internship" | "internships" | "intern" => Some(Self::Internship),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Placement => "placement",
            Self::Internship => "internship",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Upcoming,
    Active,
    Completed,
}

impl CycleStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upcoming" | "draft" | "planned" => Some(Self::Upcoming),
            "active" | "ongoing" | "open" => Some(Self::Active),
            "completed" | "closed" | "finished" => Some(Self::Completed),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// A named placement or internship season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementCycle {
    pub id: DocumentId,
    pub name: String,
    pub year: Option<i32>,
    pub kind: CycleKind,
    pub eligible_branches: Vec<String>,
    pub eligible_programs: Vec<String>,
    pub batch: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: CycleStatus,
}

/// Payload for posting a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    #[serde(default)]
    pub cycle_id: Option<String>,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub compensation: Option<Compensation>,
    #[serde(default)]
    pub eligibility: EligibilityRule,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_filter_is_case_insensitive() {
        assert!(GenderFilter::Female.admits("Female"));
        assert!(GenderFilter::Female.admits(" FEMALE "));
        assert!(!GenderFilter::Female.admits("male"));
        assert!(GenderFilter::All.admits(""));
        assert_eq!(GenderFilter::parse(""), Some(GenderFilter::All));
        assert_eq!(GenderFilter::parse("unknown"), None);
    }

    #[test]
    fn application_status_accepts_legacy_synonyms() {
        assert_eq!(ApplicationStatus::parse("Placed"), Some(ApplicationStatus::Selected));
        assert_eq!(ApplicationStatus::parse("on-hold"), Some(ApplicationStatus::OnHold));
        assert_eq!(ApplicationStatus::parse("pending"), Some(ApplicationStatus::Applied));
        assert_eq!(ApplicationStatus::parse("ghosted"), None);
    }

    #[test]
    fn closed_or_expired_jobs_reject_applications() {
        let now = Utc::now();
        let mut job = Job {
            id: DocumentId::generate(),
            cycle_id: None,
            company: "Acme".to_string(),
            role: "SDE".to_string(),
            compensation: None,
            compensation_label: None,
            eligibility: EligibilityRule::default(),
            status: JobStatus::Open,
            deadline: None,
            created_at: None,
        };
        assert!(job.accepts_applications_at(now));

        job.deadline = Some(now - chrono::Duration::hours(1));
        assert!(!job.accepts_applications_at(now));

        job.deadline = None;
        job.status = JobStatus::OnHold;
        assert!(!job.accepts_applications_at(now));
    }
}
