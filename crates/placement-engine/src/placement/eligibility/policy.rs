use serde::Serialize;

use super::super::domain::GenderFilter;
use super::super::identifiers::DocumentId;

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum EligibilityDecision {
    Eligible,
    Ineligible { reason: IneligibilityReason },
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, EligibilityDecision::Eligible)
    }

    pub fn reason(&self) -> Option<&IneligibilityReason> {
        match self {
            EligibilityDecision::Eligible => None,
            EligibilityDecision::Ineligible { reason } => Some(reason),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            EligibilityDecision::Eligible => "eligible".to_string(),
            EligibilityDecision::Ineligible { reason } => reason.summary(),
        }
    }
}

impl From<IneligibilityReason> for EligibilityDecision {
    fn from(reason: IneligibilityReason) -> Self {
        EligibilityDecision::Ineligible { reason }
    }
}

/// First failing predicate, reported for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum IneligibilityReason {
    NoEligibleBranches,
    BranchNotEligible {
        branch: String,
    },
    GenderMismatch {
        required: GenderFilter,
        actual: String,
    },
    CgpaBelowMinimum {
        required: f64,
        actual: f64,
    },
    ProgramNotEligible {
        program: Option<String>,
    },
    BatchNotEligible {
        batch: Option<i32>,
    },
    AlreadyPlaced {
        application_id: DocumentId,
    },
}

impl IneligibilityReason {
    pub fn summary(&self) -> String {
        match self {
            IneligibilityReason::NoEligibleBranches => {
                "job lists no eligible branches".to_string()
            }
            IneligibilityReason::BranchNotEligible { branch } => {
                if branch.is_empty() {
                    "student branch is missing".to_string()
                } else {
                    format!("branch '{branch}' is not eligible")
                }
            }
            IneligibilityReason::GenderMismatch { required, actual } => format!(
                "job is restricted to {} candidates (student: '{}')",
                required.label(),
                actual
            ),
            IneligibilityReason::CgpaBelowMinimum { required, actual } => format!(
                "cgpa {:.2} is below the required {:.2}",
                actual, required
            ),
            IneligibilityReason::ProgramNotEligible { program } => match program {
                Some(program) => format!("program '{program}' is not eligible"),
                None => "student program is missing".to_string(),
            },
            IneligibilityReason::BatchNotEligible { batch } => match batch {
                Some(batch) => format!("batch {batch} is not eligible"),
                None => "student batch is missing".to_string(),
            },
            IneligibilityReason::AlreadyPlaced { application_id } => format!(
                "student is already placed (application {application_id})"
            ),
        }
    }
}
