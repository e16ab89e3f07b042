use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::placement::compensation::Compensation;
use crate::placement::domain::{ApplicationStatus, EligibilityRule, NewJob};
use crate::placement::eligibility::{IneligibilityReason, PlacedScope};
use crate::placement::{CascadeSummary, PlacementEngine, PlacementError};
use crate::store::{Collection, DocumentStore};
use crate::placement::identifiers::DocumentId;

fn cs_job(cycle_id: Option<&str>) -> NewJob {
    NewJob {
        cycle_id: cycle_id.map(str::to_string),
        company: " Hooli ".to_string(),
        role: "Platform Engineer".to_string(),
        compensation: Some(Compensation::salary(18.0)),
        eligibility: EligibilityRule {
            min_cgpa: 7.0,
            branches: vec!["CS".to_string()],
            ..EligibilityRule::default()
        },
        deadline: None,
    }
}

#[test]
fn apply_records_an_applied_application() {
    let store = seeded_store();
    let engine = engine(Arc::clone(&store));

    let application = engine.apply(JOB_SDE, ASHA).expect("accepted");
    assert_eq!(application.status, ApplicationStatus::Applied);
    assert_eq!(application.current_stage.as_deref(), Some("Applied"));

    let stored = raw_documents(&store, Collection::Applications);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["status"], json!("applied"));
}

#[test]
fn duplicate_applications_conflict() {
    let engine = engine(seeded_store());
    engine.apply(JOB_SDE, ASHA).expect("first application");
    assert!(matches!(
        engine.apply(JOB_SDE, ASHA),
        Err(PlacementError::Conflict(_))
    ));
}

#[test]
fn ineligible_students_cannot_apply() {
    let engine = engine(seeded_store());
    match engine.apply(JOB_SDE, CHEN) {
        Err(PlacementError::Ineligible(IneligibilityReason::BranchNotEligible { branch })) => {
            assert_eq!(branch, "ME")
        }
        other => panic!("expected branch rejection, got {other:?}"),
    }
}

#[test]
fn closed_jobs_reject_applications() {
    let store = seeded_store();
    let closed = "64a000000000000000000010";
    store
        .seed(
            Collection::Jobs,
            [json!({
                "_id": closed, "cycle_id": CYCLE, "company": "Acme", "role": "QA",
                "status": "closed", "eligibility": { "branches": ["CS"] }
            })],
        )
        .expect("seed");
    let engine = engine(store);

    assert!(matches!(
        engine.apply(closed, ASHA),
        Err(PlacementError::Validation(_))
    ));
    assert!(matches!(
        engine.apply(JOB_SDE, MISSING),
        Err(PlacementError::NotFound { entity: "student", .. })
    ));
}

#[test]
fn withdrawal_only_from_in_flight_states() {
    let store = seeded_store();
    let engine = engine(Arc::clone(&store));
    let shortlisted = apply_with_status(&engine, JOB_SDE, ASHA, ApplicationStatus::Shortlisted);

    let withdrawn = engine.withdraw(shortlisted.as_str()).expect("withdrawn");
    assert_eq!(withdrawn.status, ApplicationStatus::Rejected);
    assert_eq!(withdrawn.current_stage.as_deref(), Some("Withdrawn"));

    let stored = store
        .get(Collection::Applications, &shortlisted)
        .expect("get")
        .expect("present");
    assert_eq!(stored["current_stage"], json!("Withdrawn"));

    assert!(matches!(
        engine.withdraw(shortlisted.as_str()),
        Err(PlacementError::Conflict(_))
    ));

    let selected = apply_with_status(&engine, JOB_ANALYST, BILAL, ApplicationStatus::Selected);
    assert!(matches!(
        engine.withdraw(selected.as_str()),
        Err(PlacementError::Conflict(_))
    ));
    assert!(matches!(
        engine.withdraw(MISSING),
        Err(PlacementError::NotFound { entity: "application", .. })
    ));
}

#[test]
fn status_updates_keep_the_stage_unless_given() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = engine_with(seeded_store(), Arc::clone(&notifier), PlacedScope::AllTime);
    let application = engine.apply(JOB_SDE, ASHA).expect("accepted");

    let updated = engine
        .update_status(application.id.as_str(), ApplicationStatus::OnHold, None)
        .expect("updated");
    assert_eq!(updated.current_stage.as_deref(), Some("Applied"));

    let updated = engine
        .update_status(
            application.id.as_str(),
            ApplicationStatus::Shortlisted,
            Some("Technical Round".to_string()),
        )
        .expect("updated");
    assert_eq!(updated.current_stage.as_deref(), Some("Technical Round"));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|notification| notification.template == "application_status_changed"));
    assert_eq!(sent[1].recipients, vec!["asha@example.edu".to_string()]);
    assert_eq!(sent[1].details["status"], "shortlisted");
}

#[test]
fn posting_a_job_announces_it_to_eligible_students() {
    let store = seeded_store();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = engine_with(Arc::clone(&store), Arc::clone(&notifier), PlacedScope::AllTime);

    let job = engine.post_job(cs_job(Some(CYCLE))).expect("posted");
    assert_eq!(job.company, "Hooli");
    assert_eq!(job.compensation_label.as_deref(), Some("18 LPA"));
    assert!(store.get(Collection::Jobs, &job.id).expect("get").is_some());

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, "job_posted");
    assert_eq!(
        sent[0].recipients,
        vec!["asha@example.edu".to_string(), "bilal@example.edu".to_string()]
    );
}

#[test]
fn posting_validates_the_payload_and_cycle() {
    let engine = engine(seeded_store());

    let mut blank = cs_job(None);
    blank.company = "  ".to_string();
    assert!(matches!(engine.post_job(blank), Err(PlacementError::Validation(_))));

    let mut negative = cs_job(None);
    negative.compensation = Some(Compensation::salary(-1.0));
    assert!(matches!(engine.post_job(negative), Err(PlacementError::Validation(_))));

    assert!(matches!(
        engine.post_job(cs_job(Some(MISSING))),
        Err(PlacementError::NotFound { entity: "cycle", .. })
    ));
}

#[test]
fn notification_failures_do_not_abort_writes() {
    let store = seeded_store();
    let engine = engine_with(Arc::clone(&store), Arc::new(FailingNotifier), PlacedScope::AllTime);

    let job = engine.post_job(cs_job(Some(CYCLE))).expect("posted despite relay outage");
    let application = engine.apply(job.id.as_str(), BILAL).expect("accepted");
    let updated = engine
        .update_status(application.id.as_str(), ApplicationStatus::Selected, None)
        .expect("updated despite relay outage");
    assert_eq!(updated.status, ApplicationStatus::Selected);
}

#[test]
fn deleting_a_cycle_cascades_and_is_idempotent() {
    let store = seeded_store();
    let engine = engine(Arc::clone(&store));
    apply_with_status(&engine, JOB_SDE, ASHA, ApplicationStatus::Applied);
    apply_with_status(&engine, JOB_ANALYST, BILAL, ApplicationStatus::Selected);
    apply_with_status(&engine, JOB_INTERN, BILAL, ApplicationStatus::Applied);
    store
        .seed(
            Collection::Applications,
            [json!({ "_id": "64d0000000000000000000b1", "jobId": JOB_SDE, "status": "ghosted" })],
        )
        .expect("seed undecodable application");

    let summary = engine.delete_cycle(CYCLE).expect("cascade");
    assert_eq!(
        summary,
        CascadeSummary {
            cycles_deleted: 1,
            jobs_deleted: 2,
            applications_deleted: 3,
        }
    );

    let jobs = raw_documents(&store, Collection::Jobs);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["_id"], json!(JOB_INTERN));
    assert_eq!(raw_documents(&store, Collection::Applications).len(), 1);

    let rerun = engine.delete_cycle(CYCLE).expect("rerun");
    assert_eq!(rerun, CascadeSummary::default());
}

#[test]
fn deleting_a_job_removes_its_applications() {
    let store = seeded_store();
    let engine = engine(Arc::clone(&store));
    apply_with_status(&engine, JOB_ANALYST, BILAL, ApplicationStatus::Applied);
    apply_with_status(&engine, JOB_ANALYST, DIVYA, ApplicationStatus::Shortlisted);
    apply_with_status(&engine, JOB_SDE, ASHA, ApplicationStatus::Applied);

    let summary = engine.delete_job(JOB_ANALYST).expect("cascade");
    assert_eq!(summary.jobs_deleted, 1);
    assert_eq!(summary.applications_deleted, 2);
    assert_eq!(summary.cycles_deleted, 0);
    assert!(store
        .get(Collection::Cycles, &DocumentId::parse(CYCLE).expect("id"))
        .expect("get")
        .is_some());

    assert_eq!(engine.delete_job(JOB_ANALYST).expect("rerun"), CascadeSummary::default());
    assert!(matches!(engine.delete_job("job-1"), Err(PlacementError::Validation(_))));
}

#[test]
fn deleting_a_job_follows_the_reference_that_exists() {
    let store = seeded_store();
    let engine = engine(Arc::clone(&store));
    store
        .seed(
            Collection::Applications,
            [json!({ "_id": "64d0000000000000000000b2", "job_id": MISSING, "jobId": JOB_SDE, "student_id": CHEN })],
        )
        .expect("seed");

    let summary = engine.delete_job(JOB_SDE).expect("cascade");
    assert_eq!(summary.jobs_deleted, 1);
    assert_eq!(summary.applications_deleted, 1);
    assert!(raw_documents(&store, Collection::Applications).is_empty());
}

#[test]
fn duplicate_check_covers_legacy_spellings() {
    let store = seeded_store();
    let engine = engine(Arc::clone(&store));
    store
        .seed(
            Collection::Applications,
            [json!({ "_id": "64d0000000000000000000b3", "jobId": JOB_SDE, "student": { "$oid": ASHA }, "status": "ghosted" })],
        )
        .expect("seed");

    match engine.apply(JOB_SDE, ASHA) {
        Err(PlacementError::Conflict(message)) => {
            assert!(message.contains("64d0000000000000000000b3"), "{message}");
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
    assert_eq!(raw_documents(&store, Collection::Applications).len(), 1);
}

#[test]
fn concurrent_applications_for_one_pair_create_a_single_document() {
    let store = seeded_store();
    let engine = engine(Arc::clone(&store));

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| engine.apply(JOB_SDE, BILAL)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| matches!(err, PlacementError::Conflict(_))));
    assert_eq!(raw_documents(&store, Collection::Applications).len(), 1);
}

#[test]
fn store_outages_surface_as_persistence_errors() {
    let engine = PlacementEngine::new(
        Arc::new(UnavailableStore),
        Arc::new(RecordingNotifier::default()),
        Default::default(),
    );
    assert!(matches!(
        engine.apply(JOB_SDE, ASHA),
        Err(PlacementError::Persistence(_))
    ));
    assert!(matches!(
        engine.evaluate_eligibility(JOB_SDE, ASHA),
        Err(PlacementError::Persistence(_))
    ));
}
