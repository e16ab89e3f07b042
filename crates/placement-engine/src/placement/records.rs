//! Read-time reconciliation between stored documents and typed records.
//!
//! Decoders accept every field spelling observed in historical data. Cross-collection
//! references are re-pointed at whichever candidate field names a stored document, and
//! unrecognized statuses degrade to a fallback instead of dropping the row. Encoders always
//! write the canonical snake_case layout so new documents stop adding to the drift.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::warn;

use super::compensation::{Compensation, CompensationKind};
use super::domain::{
    Application, ApplicationStatus, CycleKind, CycleStatus, EligibilityRule, GenderFilter, Job,
    JobStatus, PlacementCycle, Student,
};
use super::identifiers::{resolve_reference, DocumentId, ReferenceIndex, ReferenceKind};
use crate::store::{
    document_id, into_document, Collection, Document, DocumentStore, Filter, StoreError,
};

/// Reasons a stored document cannot be turned into a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("document has no valid _id")]
    MissingId,
    #[error("document {id} has no resolvable {reference} reference")]
    MissingReference {
        id: DocumentId,
        reference: &'static str,
    },
}

/// Typed view over a stored document.
pub trait FromDocument: Sized {
    const COLLECTION: Collection;
    /// Relationships re-pointed by [`FromDocument::rebind`] after decoding.
    const REFERENCES: &'static [ReferenceKind] = &[];

    /// Decodes with every reference taken from its first well-formed candidate field.
    fn from_document(document: &Document) -> Result<Self, DecodeError>;

    fn rebind(&mut self, _document: &Document, _index: &ReferenceIndex) {}
}

/// Loads and decodes one record. Undecodable documents are logged and treated as missing.
pub fn fetch<T, S>(store: &S, id: &DocumentId) -> Result<Option<T>, StoreError>
where
    T: FromDocument,
    S: DocumentStore + ?Sized,
{
    let Some(document) = store.get(T::COLLECTION, id)? else {
        return Ok(None);
    };
    let index = ReferenceIndex::load(store, T::REFERENCES)?;
    Ok(decode(&document, &index))
}

/// Loads and decodes every matching record, skipping (and logging) undecodable documents.
pub fn fetch_all<T, S>(store: &S, filter: &Filter) -> Result<Vec<T>, StoreError>
where
    T: FromDocument,
    S: DocumentStore + ?Sized,
{
    let documents = store.find(T::COLLECTION, filter)?;
    let index = ReferenceIndex::load(store, T::REFERENCES)?;
    Ok(documents
        .iter()
        .filter_map(|document| decode(document, &index))
        .collect())
}

fn decode<T: FromDocument>(document: &Document, index: &ReferenceIndex) -> Option<T> {
    match T::from_document(document) {
        Ok(mut record) => {
            record.rebind(document, index);
            Some(record)
        }
        Err(err) => {
            warn!(collection = T::COLLECTION.name(), %err, "data quality gap: undecodable document");
            None
        }
    }
}

impl FromDocument for Student {
    const COLLECTION: Collection = Collection::Students;

    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        let id = document_id(document).ok_or(DecodeError::MissingId)?;

        Ok(Self {
            id,
            name: text(document, &["name", "full_name", "fullName", "display_name"])
                .unwrap_or_default()
                .to_string(),
            email: text(document, &["email", "email_id", "emailId"])
                .unwrap_or_default()
                .to_string(),
            branch: text(document, &["branch", "major", "department"])
                .unwrap_or_default()
                .to_string(),
            gender: text(document, &["gender", "sex"])
                .unwrap_or_default()
                .to_string(),
            cgpa: number(document, &["cgpa", "CGPA", "gpa"]).unwrap_or(0.0),
            batch: integer(document, &["batch", "graduation_year", "graduationYear", "year"]),
            program: text(document, &["program", "degree", "course"]).map(str::to_string),
        })
    }
}

impl FromDocument for Job {
    const COLLECTION: Collection = Collection::Jobs;
    const REFERENCES: &'static [ReferenceKind] = &[ReferenceKind::Cycle];

    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        let id = document_id(document).ok_or(DecodeError::MissingId)?;

        // Unknown states stop accepting applications but keep the job in every report.
        let status = match text(document, &["status"]) {
            Some(raw) => JobStatus::parse(raw).unwrap_or_else(|| {
                warn!(job = %id, status = raw, "data quality gap: unknown job status, treating as closed");
                JobStatus::Closed
            }),
            None => JobStatus::Open,
        };

        let (compensation, compensation_label) = job_compensation(document);

        let rule_document = object(
            document,
            &["eligibility", "eligibility_criteria", "eligibilityCriteria"],
        )
        .unwrap_or(document);

        Ok(Self {
            cycle_id: resolve_reference(document, ReferenceKind::Cycle),
            company: text(document, &["company", "company_name", "companyName"])
                .unwrap_or_default()
                .to_string(),
            role: text(document, &["role", "title", "job_title", "jobTitle", "position"])
                .unwrap_or_default()
                .to_string(),
            compensation,
            compensation_label,
            eligibility: eligibility_rule(&id, rule_document),
            status,
            deadline: timestamp(document, &["deadline", "application_deadline", "applicationDeadline"]),
            created_at: timestamp(document, &["created_at", "createdAt"]),
            id,
        })
    }

    fn rebind(&mut self, document: &Document, index: &ReferenceIndex) {
        if let Some(cycle_id) = index.resolve(document, ReferenceKind::Cycle) {
            self.cycle_id = Some(cycle_id);
        }
    }
}

impl FromDocument for Application {
    const COLLECTION: Collection = Collection::Applications;
    const REFERENCES: &'static [ReferenceKind] = &[ReferenceKind::Job, ReferenceKind::Student];

    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        let id = document_id(document).ok_or(DecodeError::MissingId)?;

        let job_id = resolve_reference(document, ReferenceKind::Job).ok_or_else(|| {
            DecodeError::MissingReference {
                id: id.clone(),
                reference: ReferenceKind::Job.label(),
            }
        })?;
        let student_id = resolve_reference(document, ReferenceKind::Student).ok_or_else(|| {
            DecodeError::MissingReference {
                id: id.clone(),
                reference: ReferenceKind::Student.label(),
            }
        })?;

        let status = match text(document, &["status", "application_status", "applicationStatus"]) {
            Some(raw) => ApplicationStatus::parse(raw).unwrap_or_else(|| {
                warn!(application = %id, status = raw, "data quality gap: unknown application status, treating as applied");
                ApplicationStatus::Applied
            }),
            None => ApplicationStatus::Applied,
        };

        Ok(Self {
            job_id,
            student_id,
            status,
            current_stage: text(document, &["current_stage", "currentStage", "stage"])
                .map(str::to_string),
            created_at: timestamp(document, &["created_at", "createdAt", "applied_at", "appliedAt"]),
            updated_at: timestamp(document, &["updated_at", "updatedAt"]),
            id,
        })
    }

    fn rebind(&mut self, document: &Document, index: &ReferenceIndex) {
        if let Some(job_id) = index.resolve(document, ReferenceKind::Job) {
            self.job_id = job_id;
        }
        if let Some(student_id) = index.resolve(document, ReferenceKind::Student) {
            self.student_id = student_id;
        }
    }
}

impl FromDocument for PlacementCycle {
    const COLLECTION: Collection = Collection::Cycles;

    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        let id = document_id(document).ok_or(DecodeError::MissingId)?;

        let kind = text(document, &["type", "cycle_type", "cycleType", "kind"])
            .and_then(CycleKind::parse)
            .unwrap_or(CycleKind::Placement);
        let status = text(document, &["status"])
            .and_then(CycleStatus::parse)
            .unwrap_or(CycleStatus::Active);

        Ok(Self {
            name: text(document, &["name", "title"]).unwrap_or_default().to_string(),
            year: integer(document, &["year"]),
            kind,
            eligible_branches: strings(document, &["eligible_branches", "eligibleBranches", "branches"]),
            eligible_programs: strings(document, &["eligible_programs", "eligiblePrograms", "programs"]),
            batch: integer(document, &["batch"]),
            start_date: date(document, &["start_date", "startDate"]),
            end_date: date(document, &["end_date", "endDate"]),
            status,
            id,
        })
    }
}

fn job_compensation(document: &Document) -> (Option<Compensation>, Option<String>) {
    if let Some(structured) = object(document, &["compensation"]) {
        let amount = number(structured, &["amount_lpa", "amountLpa", "amount", "value"]);
        let kind = match text(structured, &["kind", "type"]) {
            Some(kind) if kind.eq_ignore_ascii_case("stipend") => CompensationKind::Stipend,
            _ => CompensationKind::Salary,
        };
        if let Some(amount_lpa) = amount.filter(|value| value.is_finite() && *value >= 0.0) {
            let compensation = Compensation { amount_lpa, kind };
            return (Some(compensation), Some(compensation.label()));
        }
    }

    let legacy = [
        ("salary", CompensationKind::Salary),
        ("package", CompensationKind::Salary),
        ("ctc", CompensationKind::Salary),
        ("stipend", CompensationKind::Stipend),
    ];
    for (field, kind) in legacy {
        match document.get(field) {
            Some(Value::String(raw)) if !raw.trim().is_empty() => {
                return (
                    Compensation::from_legacy(raw, kind),
                    Some(raw.trim().to_string()),
                );
            }
            Some(Value::Number(amount)) => {
                if let Some(amount_lpa) = amount.as_f64().filter(|value| *value >= 0.0) {
                    let compensation = Compensation { amount_lpa, kind };
                    return (Some(compensation), Some(compensation.label()));
                }
            }
            _ => {}
        }
    }

    (None, None)
}

fn eligibility_rule(job_id: &DocumentId, document: &Document) -> EligibilityRule {
    let gender = match text(document, &["gender", "gender_filter", "genderFilter"]) {
        Some(raw) => GenderFilter::parse(raw).unwrap_or_else(|| {
            warn!(job = %job_id, gender = raw, "data quality gap: unknown gender filter, treating as all");
            GenderFilter::All
        }),
        None => GenderFilter::All,
    };

    EligibilityRule {
        min_cgpa: number(document, &["min_cgpa", "minCgpa", "minimum_cgpa", "cgpa"]).unwrap_or(0.0),
        gender,
        branches: strings(document, &["branches", "eligible_branches", "eligibleBranches"]),
        programs: strings(
            document,
            &["programs", "degrees", "eligible_programs", "eligibleDegrees"],
        ),
        batches: integers(document, &["batches", "eligible_batches", "eligibleBatches"]),
    }
}

fn object<'a>(document: &'a Document, fields: &[&str]) -> Option<&'a Document> {
    fields
        .iter()
        .find_map(|field| document.get(*field).and_then(Value::as_object))
}

fn text<'a>(document: &'a Document, fields: &[&str]) -> Option<&'a str> {
    fields.iter().find_map(|field| {
        document
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

fn number(document: &Document, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| match document.get(*field)? {
        Value::Number(value) => value.as_f64(),
        Value::String(value) => value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

fn integer(document: &Document, fields: &[&str]) -> Option<i32> {
    fields
        .iter()
        .find_map(|field| document.get(*field).and_then(value_as_i32))
}

fn value_as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64))
            .and_then(|v| i32::try_from(v).ok()),
        Value::String(raw) => raw.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn strings(document: &Document, fields: &[&str]) -> Vec<String> {
    for field in fields {
        match document.get(*field) {
            Some(Value::Array(items)) => {
                return items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            Some(Value::String(raw)) => {
                return raw
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }
    Vec::new()
}

fn integers(document: &Document, fields: &[&str]) -> Vec<i32> {
    for field in fields {
        match document.get(*field) {
            Some(Value::Array(items)) => return items.iter().filter_map(value_as_i32).collect(),
            Some(value @ (Value::Number(_) | Value::String(_))) => {
                return value_as_i32(value).into_iter().collect();
            }
            _ => {}
        }
    }
    Vec::new()
}

pub(crate) fn timestamp(document: &Document, fields: &[&str]) -> Option<DateTime<Utc>> {
    fields
        .iter()
        .find_map(|field| document.get(*field).and_then(value_as_timestamp))
}

fn value_as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Object(map) => map.get("$date").and_then(value_as_timestamp),
        Value::Number(millis) => millis
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn date(document: &Document, fields: &[&str]) -> Option<NaiveDate> {
    timestamp(document, fields).map(|dt| dt.date_naive())
}

impl Application {
    /// Canonical document layout for new or rewritten applications.
    pub fn to_document(&self) -> Result<Document, StoreError> {
        into_document(json!({
            "_id": self.id.as_str(),
            "job_id": self.job_id.as_str(),
            "student_id": self.student_id.as_str(),
            "status": self.status.label(),
            "current_stage": self.current_stage,
            "created_at": self.created_at.map(|dt| dt.to_rfc3339()),
            "updated_at": self.updated_at.map(|dt| dt.to_rfc3339()),
        }))
    }
}

impl Job {
    pub fn to_document(&self) -> Result<Document, StoreError> {
        let mut document = into_document(json!({
            "_id": self.id.as_str(),
            "cycle_id": self.cycle_id.as_ref().map(DocumentId::as_str),
            "company": self.company,
            "role": self.role,
            "eligibility": serde_json::to_value(&self.eligibility)?,
            "status": self.status.label(),
            "deadline": self.deadline.map(|dt| dt.to_rfc3339()),
            "created_at": self.created_at.map(|dt| dt.to_rfc3339()),
        }))?;
        if let Some(compensation) = &self.compensation {
            document.insert(
                "compensation".to_string(),
                serde_json::to_value(compensation)?,
            );
        }
        Ok(document)
    }
}

/// Single-field change set.
pub(crate) fn changes<I>(fields: I) -> Document
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    fields
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect::<Map<String, Value>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENT: &str = "64b000000000000000000001";
    const JOB: &str = "64a000000000000000000001";
    const CYCLE: &str = "64c000000000000000000001";
    const APPLICATION: &str = "64d000000000000000000001";

    fn doc(value: Value) -> Document {
        into_document(value).expect("object")
    }

    #[test]
    fn student_cgpa_accepts_strings_and_defaults_to_zero() {
        let from_string = Student::from_document(&doc(json!({
            "_id": STUDENT, "fullName": "Asha Rao", "major": "CS", "cgpa": " 7.5 ", "batch": "2025"
        })))
        .expect("decodes");
        assert_eq!(from_string.name, "Asha Rao");
        assert_eq!(from_string.branch, "CS");
        assert_eq!(from_string.cgpa, 7.5);
        assert_eq!(from_string.batch, Some(2025));

        let malformed = Student::from_document(&doc(json!({ "_id": STUDENT, "cgpa": "n/a" })))
            .expect("decodes");
        assert_eq!(malformed.cgpa, 0.0);

        let missing = Student::from_document(&doc(json!({ "_id": STUDENT }))).expect("decodes");
        assert_eq!(missing.cgpa, 0.0);
    }

    #[test]
    fn job_reads_nested_rule_and_legacy_package() {
        let job = Job::from_document(&doc(json!({
            "_id": JOB,
            "cycleId": { "$oid": CYCLE },
            "companyName": "Acme",
            "title": "SDE",
            "package": "12.5 LPA",
            "eligibilityCriteria": {
                "minCgpa": "7",
                "gender": "Female",
                "branches": ["CS", "IT"],
                "batches": [2025, "2026"]
            },
            "status": "on-hold"
        })))
        .expect("decodes");

        assert_eq!(job.cycle_id.as_ref().map(DocumentId::as_str), Some(CYCLE));
        assert_eq!(job.company, "Acme");
        assert_eq!(job.role, "SDE");
        assert_eq!(job.compensation_lpa(), Some(12.5));
        assert_eq!(job.compensation_label.as_deref(), Some("12.5 LPA"));
        assert_eq!(job.eligibility.min_cgpa, 7.0);
        assert_eq!(job.eligibility.gender, GenderFilter::Female);
        assert_eq!(job.eligibility.branches, vec!["CS", "IT"]);
        assert_eq!(job.eligibility.batches, vec![2025, 2026]);
        assert_eq!(job.status, JobStatus::OnHold);
    }

    #[test]
    fn unparseable_package_is_unknown_but_keeps_label() {
        let job = Job::from_document(&doc(json!({ "_id": JOB, "salary": "Competitive" })))
            .expect("decodes");
        assert_eq!(job.compensation, None);
        assert_eq!(job.compensation_label.as_deref(), Some("Competitive"));
    }

    #[test]
    fn structured_compensation_wins_over_legacy_strings() {
        let job = Job::from_document(&doc(json!({
            "_id": JOB,
            "compensation": { "amount_lpa": 18.0, "kind": "salary" },
            "salary": "3 LPA"
        })))
        .expect("decodes");
        assert_eq!(job.compensation_lpa(), Some(18.0));
    }

    #[test]
    fn application_requires_both_references() {
        let decoded = Application::from_document(&doc(json!({
            "_id": APPLICATION, "jobId": JOB, "student": { "$oid": STUDENT }, "status": "Selected",
            "createdAt": "2025-08-01T10:00:00Z"
        })))
        .expect("decodes");
        assert_eq!(decoded.job_id.as_str(), JOB);
        assert_eq!(decoded.student_id.as_str(), STUDENT);
        assert_eq!(decoded.status, ApplicationStatus::Selected);
        assert!(decoded.created_at.is_some());

        let orphan = Application::from_document(&doc(json!({ "_id": APPLICATION, "job": JOB })));
        assert!(matches!(
            orphan,
            Err(DecodeError::MissingReference { reference: "student", .. })
        ));
    }

    #[test]
    fn unknown_statuses_keep_the_row() {
        let application = Application::from_document(&doc(json!({
            "_id": APPLICATION, "job_id": JOB, "student_id": STUDENT, "status": "ghosted"
        })))
        .expect("decodes");
        assert_eq!(application.status, ApplicationStatus::Applied);

        let job = Job::from_document(&doc(json!({ "_id": JOB, "status": "draft" }))).expect("decodes");
        assert_eq!(job.status, JobStatus::Closed);
        assert!(!job.accepts_applications_at(Utc::now()));
    }

    #[test]
    fn fetched_applications_follow_the_reference_that_exists() {
        let store = crate::store::MemoryStore::new();
        let live_job = "64a000000000000000000002";
        store
            .seed(Collection::Jobs, [json!({ "_id": live_job, "company": "Acme" })])
            .expect("jobs");
        store
            .seed(Collection::Students, [json!({ "_id": STUDENT, "name": "Asha" })])
            .expect("students");
        store
            .seed(
                Collection::Applications,
                [json!({ "_id": APPLICATION, "job_id": JOB, "jobId": live_job, "studentId": STUDENT })],
            )
            .expect("applications");

        let fetched: Vec<Application> = fetch_all(&store, &Filter::all()).expect("fetch");
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].job_id.as_str(), live_job);
        assert_eq!(fetched[0].student_id.as_str(), STUDENT);

        let stored = store
            .find(Collection::Applications, &Filter::all())
            .expect("find");
        let decoded_alone = Application::from_document(&stored[0]).expect("decodes");
        assert_eq!(decoded_alone.job_id.as_str(), JOB);
    }

    #[test]
    fn application_encoding_uses_canonical_fields() {
        let application = Application::from_document(&doc(json!({
            "_id": APPLICATION, "jobId": JOB, "studentId": STUDENT
        })))
        .expect("decodes");
        let encoded = application.to_document().expect("encodes");
        assert_eq!(encoded.get("job_id"), Some(&json!(JOB)));
        assert_eq!(encoded.get("student_id"), Some(&json!(STUDENT)));
        assert_eq!(encoded.get("status"), Some(&json!("applied")));
        assert!(encoded.get("jobId").is_none());
    }

    #[test]
    fn cycle_defaults_to_placement_kind() {
        let cycle = PlacementCycle::from_document(&doc(json!({
            "_id": CYCLE, "name": "2025 Placements", "cycleType": "Internship", "startDate": "2025-07-01"
        })))
        .expect("decodes");
        assert_eq!(cycle.kind, CycleKind::Internship);
        assert_eq!(cycle.start_date, NaiveDate::from_ymd_opt(2025, 7, 1));

        let untyped = PlacementCycle::from_document(&doc(json!({ "_id": CYCLE }))).expect("decodes");
        assert_eq!(untyped.kind, CycleKind::Placement);
    }
}
