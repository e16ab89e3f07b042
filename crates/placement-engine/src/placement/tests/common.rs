use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request};
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::placement::applications::{Notification, NotificationError, Notifier};
use crate::placement::eligibility::{EligibilityConfig, PlacedScope};
use crate::placement::{ApplicationStatus, PlacementEngine};
use crate::store::{Collection, Document, DocumentStore, Filter, MemoryStore, StoreError};
use crate::placement::identifiers::DocumentId;

pub(super) const CYCLE: &str = "64c000000000000000000001";
pub(super) const INTERN_CYCLE: &str = "64c000000000000000000002";
pub(super) const EMPTY_CYCLE: &str = "64c000000000000000000003";

/// Acme SDE: CS only, min 7.0, "6.5 LPA".
pub(super) const JOB_SDE: &str = "64a000000000000000000001";
/// Globex Analyst: CS or IT, min 8.0, "22 LPA".
pub(super) const JOB_ANALYST: &str = "64a000000000000000000002";
/// Initech internship: CS only, min 6.0, undisclosed stipend.
pub(super) const JOB_INTERN: &str = "64a000000000000000000003";

/// CS, 7.5, female.
pub(super) const ASHA: &str = "64b000000000000000000001";
/// CS, 8.6, male.
pub(super) const BILAL: &str = "64b000000000000000000002";
/// ME, 9.1, male.
pub(super) const CHEN: &str = "64b000000000000000000003";
/// IT, 8.2, female.
pub(super) const DIVYA: &str = "64b000000000000000000004";
/// CS, no cgpa on record.
pub(super) const ESHA: &str = "64b000000000000000000005";

pub(super) const MISSING: &str = "64f000000000000000000099";

/// Store seeded with the mixed field spellings found in historical data.
pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();

    store
        .seed(
            Collection::Cycles,
            [
                json!({ "_id": CYCLE, "name": "2025 Placements", "type": "placement", "year": 2025 }),
                json!({ "_id": { "$oid": INTERN_CYCLE }, "name": "Summer Internships", "cycleType": "Internship" }),
                json!({ "_id": EMPTY_CYCLE, "name": "2026 Placements", "type": "placement" }),
            ],
        )
        .expect("seed cycles");

    store
        .seed(
            Collection::Jobs,
            [
                json!({
                    "_id": JOB_SDE,
                    "cycle_id": CYCLE,
                    "company": "Acme",
                    "role": "SDE",
                    "package": "6.5 LPA",
                    "eligibility": { "branches": ["CS"], "min_cgpa": 7.0, "gender": "all" },
                    "status": "open"
                }),
                json!({
                    "_id": JOB_ANALYST,
                    "cycleId": { "$oid": CYCLE },
                    "companyName": "Globex",
                    "title": "Analyst",
                    "salary": "22 LPA",
                    "eligibilityCriteria": { "branches": ["CS", "IT"], "minCgpa": "8.0" }
                }),
                json!({
                    "_id": JOB_INTERN,
                    "cycle": INTERN_CYCLE,
                    "company": "Initech",
                    "role": "Intern",
                    "stipend": "Competitive",
                    "eligibility": { "branches": ["CS"], "min_cgpa": 6 }
                }),
            ],
        )
        .expect("seed jobs");

    store
        .seed(
            Collection::Students,
            [
                json!({ "_id": ASHA, "name": "Asha Rao", "email": "asha@example.edu", "branch": "CS", "gender": "Female", "cgpa": 7.5, "batch": 2025 }),
                json!({ "_id": BILAL, "fullName": "Bilal Khan", "email": "bilal@example.edu", "major": "CS", "gender": "male", "cgpa": "8.6" }),
                json!({ "_id": CHEN, "name": "Chen Li", "email": "chen@example.edu", "branch": "ME", "gender": "Male", "cgpa": 9.1 }),
                json!({ "_id": DIVYA, "name": "Divya Nair", "email": "divya@example.edu", "department": "IT", "sex": "F", "CGPA": 8.2 }),
                json!({ "_id": ESHA, "name": "Esha Gupta", "email": "", "branch": "CS", "gender": "female" }),
            ],
        )
        .expect("seed students");

    Arc::new(store)
}

pub(super) fn engine(store: Arc<MemoryStore>) -> PlacementEngine<MemoryStore, RecordingNotifier> {
    engine_with(store, Arc::new(RecordingNotifier::default()), PlacedScope::AllTime)
}

pub(super) fn engine_with<N: Notifier + 'static>(
    store: Arc<MemoryStore>,
    notifier: Arc<N>,
    placed_scope: PlacedScope,
) -> PlacementEngine<MemoryStore, N> {
    let config = EngineConfig {
        eligibility: EligibilityConfig { placed_scope },
    };
    PlacementEngine::new(store, notifier, config)
}

/// Applies and then marks the application with the given status.
pub(super) fn apply_with_status<N: Notifier + 'static>(
    engine: &PlacementEngine<MemoryStore, N>,
    job: &str,
    student: &str,
    status: ApplicationStatus,
) -> DocumentId {
    let application = engine.apply(job, student).expect("application accepted");
    if status != ApplicationStatus::Applied {
        engine
            .update_status(application.id.as_str(), status, None)
            .expect("status updated");
    }
    application.id
}

pub(super) fn raw_documents(store: &MemoryStore, collection: Collection) -> Vec<Document> {
    store.find(collection, &Filter::all()).expect("find")
}

pub(super) fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent.lock().expect("lock").push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

fn offline() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

impl DocumentStore for UnavailableStore {
    fn find(&self, _collection: Collection, _filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Err(offline())
    }

    fn get(
        &self,
        _collection: Collection,
        _id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        Err(offline())
    }

    fn insert(
        &self,
        _collection: Collection,
        _document: Document,
    ) -> Result<DocumentId, StoreError> {
        Err(offline())
    }

    fn insert_unless(
        &self,
        _collection: Collection,
        _document: Document,
        _duplicate: &dyn Fn(&Document) -> bool,
    ) -> Result<DocumentId, StoreError> {
        Err(offline())
    }

    fn update(
        &self,
        _collection: Collection,
        _id: &DocumentId,
        _changes: Document,
    ) -> Result<bool, StoreError> {
        Err(offline())
    }

    fn delete(&self, _collection: Collection, _id: &DocumentId) -> Result<bool, StoreError> {
        Err(offline())
    }
}
