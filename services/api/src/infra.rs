use metrics_exporter_prometheus::PrometheusHandle;
use placement_engine::error::AppError;
use placement_engine::placement::{ExportFormat, Notification, NotificationError, Notifier};
use placement_engine::store::{Collection, MemoryStore, StoreError};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stands in for the mail relay: logs each notification and keeps it for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    outbox: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier for LoggingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            recipients = notification.recipients.len(),
            subject = %notification.subject,
            "notification queued"
        );
        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?;
        guard.push(notification);
        Ok(())
    }
}

impl LoggingNotifier {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.outbox.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

/// Collections a snapshot file may populate, keyed by their stored names.
const SNAPSHOT_COLLECTIONS: [Collection; 5] = [
    Collection::Cycles,
    Collection::Jobs,
    Collection::Students,
    Collection::Applications,
    Collection::Resumes,
];

/// Reads a JSON object of `{ "<collection>": [documents...] }` into a fresh store.
pub(crate) fn load_snapshot(path: &Path) -> Result<MemoryStore, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let snapshot: Map<String, Value> =
        serde_json::from_str(&raw).map_err(|err| AppError::snapshot(path, err))?;

    let store = MemoryStore::new();
    for (name, documents) in snapshot {
        let Some(collection) = SNAPSHOT_COLLECTIONS
            .into_iter()
            .find(|collection| collection.name() == name)
        else {
            warn!(collection = %name, "snapshot collection ignored");
            continue;
        };
        let Value::Array(documents) = documents else {
            warn!(collection = %name, "snapshot collection is not an array");
            continue;
        };
        let loaded = seed(&store, collection, documents)?;
        info!(collection = %name, documents = loaded, "snapshot collection loaded");
    }
    Ok(store)
}

fn seed(store: &MemoryStore, collection: Collection, documents: Vec<Value>) -> Result<usize, AppError> {
    store
        .seed(collection, documents)
        .map(|ids| ids.len())
        .map_err(|err: StoreError| AppError::Engine(err.into()))
}

pub(crate) const DEMO_CYCLE: &str = "6600000000000000000000c1";
pub(crate) const DEMO_INTERN_CYCLE: &str = "6600000000000000000000c2";
pub(crate) const DEMO_JOB_PLATFORM: &str = "6600000000000000000000a1";
pub(crate) const DEMO_JOB_QUANT: &str = "6600000000000000000000a2";
pub(crate) const DEMO_JOB_CORE: &str = "6600000000000000000000a3";
pub(crate) const DEMO_JOB_INTERN: &str = "6600000000000000000000a4";
pub(crate) const DEMO_STUDENTS: [&str; 6] = [
    "6600000000000000000000b1",
    "6600000000000000000000b2",
    "6600000000000000000000b3",
    "6600000000000000000000b4",
    "6600000000000000000000b5",
    "6600000000000000000000b6",
];

/// Demo campus with the field spellings seen across older and newer records.
pub(crate) fn seed_demo_store() -> Result<MemoryStore, AppError> {
    let store = MemoryStore::new();
    let [aanya, dev, farah, ishaan, lena, omar] = DEMO_STUDENTS;

    seed(
        &store,
        Collection::Cycles,
        vec![
            json!({ "_id": DEMO_CYCLE, "name": "2025 Campus Placements", "type": "placement", "year": 2025, "status": "active" }),
            json!({ "_id": { "$oid": DEMO_INTERN_CYCLE }, "name": "Summer Internships 2025", "cycleType": "Internship" }),
        ],
    )?;
    seed(
        &store,
        Collection::Jobs,
        vec![
            json!({
                "_id": DEMO_JOB_PLATFORM, "cycle_id": DEMO_CYCLE, "company": "Northwind", "role": "Platform Engineer",
                "package": "18 LPA", "status": "open",
                "eligibility": { "branches": ["CSE", "IT"], "min_cgpa": 7.5 }
            }),
            json!({
                "_id": DEMO_JOB_QUANT, "cycleId": { "$oid": DEMO_CYCLE }, "companyName": "Helix Capital", "title": "Quant Analyst",
                "salary": "32 LPA",
                "eligibilityCriteria": { "branches": ["CSE", "ECE", "MATH"], "minCgpa": "8.5" }
            }),
            json!({
                "_id": DEMO_JOB_CORE, "cycle_id": DEMO_CYCLE, "company": "Tatva Motors", "role": "Graduate Engineer",
                "package": "7.2 LPA",
                "eligibility": { "branches": ["MECH", "EEE"], "min_cgpa": 6.5, "gender": "all" }
            }),
            json!({
                "_id": DEMO_JOB_INTERN, "cycle": DEMO_INTERN_CYCLE, "company": "Northwind", "role": "SRE Intern",
                "stipend": "As per norms",
                "eligibility": { "branches": ["CSE", "IT"], "min_cgpa": 7.0 }
            }),
        ],
    )?;
    seed(
        &store,
        Collection::Students,
        vec![
            json!({ "_id": aanya, "name": "Aanya Kapoor", "email": "aanya@campus.example", "branch": "CSE", "gender": "female", "cgpa": 9.1, "batch": 2025 }),
            json!({ "_id": dev, "fullName": "Dev Malhotra", "email": "dev@campus.example", "major": "IT", "gender": "Male", "cgpa": "7.9" }),
            json!({ "_id": farah, "name": "Farah Siddiqui", "email": "farah@campus.example", "department": "ECE", "sex": "F", "CGPA": 8.7 }),
            json!({ "_id": ishaan, "name": "Ishaan Rao", "email": "ishaan@campus.example", "branch": "MECH", "gender": "male", "cgpa": 7.1 }),
            json!({ "_id": lena, "name": "Lena D'Souza", "email": "lena@campus.example", "branch": "CSE", "gender": "female", "cgpa": 6.8 }),
            json!({ "_id": omar, "name": "Omar Sheikh", "email": "", "branch": "EEE", "gender": "male" }),
        ],
    )?;
    seed(
        &store,
        Collection::Applications,
        vec![
            json!({ "_id": "6600000000000000000000d1", "job_id": DEMO_JOB_PLATFORM, "student_id": aanya, "status": "selected", "current_stage": "Offer", "created_at": "2025-08-04T10:00:00Z" }),
            json!({ "_id": "6600000000000000000000d2", "jobId": DEMO_JOB_PLATFORM, "studentId": dev, "status": "Shortlisted", "createdAt": "2025-08-04T11:30:00Z" }),
            json!({ "_id": "6600000000000000000000d3", "job": DEMO_JOB_QUANT, "student": farah, "status": "placed", "created_at": "2025-08-06T09:15:00Z" }),
            json!({ "_id": "6600000000000000000000d4", "job_id": DEMO_JOB_CORE, "student_id": ishaan, "status": "applied", "created_at": "2025-08-07T14:00:00Z" }),
            json!({ "_id": "6600000000000000000000d5", "job_id": DEMO_JOB_CORE, "student_id": omar, "status": "rejected", "created_at": "2025-08-07T15:45:00Z" }),
        ],
    )?;
    seed(
        &store,
        Collection::Resumes,
        vec![
            json!({ "student_id": aanya, "file_url": "https://files.campus.example/resumes/aanya-2025.pdf", "created_at": "2025-07-20T08:00:00Z" }),
            json!({ "studentId": dev, "fileUrl": "https://files.campus.example/resumes/dev.pdf", "createdAt": "2025-07-28T18:20:00Z" }),
        ],
    )?;

    Ok(store)
}

/// Export format from an explicit flag, else from the output file's extension, else CSV.
pub(crate) fn resolve_export_format(
    requested: Option<&str>,
    output: Option<&Path>,
) -> Result<ExportFormat, String> {
    if let Some(requested) = requested {
        return ExportFormat::parse(requested)
            .ok_or_else(|| format!("unsupported export format '{requested}'"));
    }

    let guessed = output.and_then(|path| mime_guess::from_path(path).first());
    Ok(match guessed {
        Some(mime) if mime.essence_str() == ExportFormat::Excel.content_type() => ExportFormat::Excel,
        _ => ExportFormat::Csv,
    })
}
