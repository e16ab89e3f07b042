use super::super::domain::{CycleKind, Job, Student};
use super::super::identifiers::DocumentId;
use super::policy::{EligibilityDecision, IneligibilityReason};

/// Facts about the surrounding cycle and the student's history that a pure check needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EligibilityContext {
    /// Kind of the cycle the job belongs to; `None` when the job has no resolvable cycle.
    pub cycle_kind: Option<CycleKind>,
    /// A `selected` application that counts toward the "already placed" rule.
    pub placed_by: Option<DocumentId>,
}

impl EligibilityContext {
    pub fn new(cycle_kind: Option<CycleKind>) -> Self {
        Self {
            cycle_kind,
            placed_by: None,
        }
    }

    pub fn placed(mut self, application_id: DocumentId) -> Self {
        self.placed_by = Some(application_id);
        self
    }
}

/// Runs the rule chain in its fixed order; the first failing predicate decides.
pub fn decide(job: &Job, student: &Student, context: &EligibilityContext) -> EligibilityDecision {
    let rule = &job.eligibility;

    if rule.branches.is_empty() {
        return IneligibilityReason::NoEligibleBranches.into();
    }
    if !rule.branches.iter().any(|branch| branch == &student.branch) {
        return IneligibilityReason::BranchNotEligible {
            branch: student.branch.clone(),
        }
        .into();
    }

    if !rule.gender.admits(&student.gender) {
        return IneligibilityReason::GenderMismatch {
            required: rule.gender,
            actual: student.gender.clone(),
        }
        .into();
    }

    if student.cgpa < rule.min_cgpa {
        return IneligibilityReason::CgpaBelowMinimum {
            required: rule.min_cgpa,
            actual: student.cgpa,
        }
        .into();
    }

    if !rule.programs.is_empty() {
        let admitted = student.program.as_deref().is_some_and(|program| {
            rule.programs
                .iter()
                .any(|allowed| allowed.trim().eq_ignore_ascii_case(program.trim()))
        });
        if !admitted {
            return IneligibilityReason::ProgramNotEligible {
                program: student.program.clone(),
            }
            .into();
        }
    }

    if !rule.batches.is_empty()
        && !student
            .batch
            .is_some_and(|batch| rule.batches.contains(&batch))
    {
        return IneligibilityReason::BatchNotEligible {
            batch: student.batch,
        }
        .into();
    }

    if context.cycle_kind == Some(CycleKind::Placement) {
        if let Some(application_id) = &context.placed_by {
            return IneligibilityReason::AlreadyPlaced {
                application_id: application_id.clone(),
            }
            .into();
        }
    }

    EligibilityDecision::Eligible
}

/// Boolean form of [`decide`].
pub fn is_eligible(job: &Job, student: &Student, context: &EligibilityContext) -> bool {
    decide(job, student, context).is_eligible()
}
