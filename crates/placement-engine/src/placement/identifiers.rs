//! Identifier normalization and reference probing.
//!
//! Stored documents reference each other through fields whose names drifted over time: an
//! application may point at its job through `job_id`, `jobId`, or `job`. Rather than silently
//! committing to one spelling, every relationship carries a fixed lookup order and the first
//! field whose identifier matches a stored document wins. Snake_case legacy fields are checked
//! before camelCase fields, and the bare entity name comes last, so reports stay reproducible
//! no matter which spelling a document happens to mix in.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::store::{document_id, Collection, Document, DocumentStore, Filter, StoreError};

const ID_LENGTH: usize = 24;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Canonical document identifier: 24 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(raw: &str) -> Result<Self, InvalidIdentifier> {
        let trimmed = raw.trim();
        if trimmed.len() == ID_LENGTH && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(InvalidIdentifier {
                raw: raw.to_string(),
            })
        }
    }

    /// Seconds since the epoch followed by a process-wide sequence, so freshly generated
    /// identifiers sort in creation order.
    pub fn generate() -> Self {
        let seconds = (Utc::now().timestamp().max(0) as u64) & 0xffff_ffff;
        let sequence = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{seconds:08x}{sequence:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}

impl From<DocumentId> for Value {
    fn from(value: DocumentId) -> Self {
        Value::String(value.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{raw}' is not a valid document identifier")]
pub struct InvalidIdentifier {
    pub raw: String,
}

/// Normalizes a stored identifier value: a hex string, an extended-JSON `{"$oid": ...}`, or an
/// embedded document carrying its own `_id`.
pub fn normalize(raw: &Value) -> Result<DocumentId, InvalidIdentifier> {
    match raw {
        Value::String(value) => DocumentId::parse(value),
        Value::Object(map) => {
            if let Some(oid) = map.get("$oid") {
                normalize(oid)
            } else if let Some(inner) = map.get("_id") {
                normalize(inner)
            } else {
                Err(InvalidIdentifier {
                    raw: raw.to_string(),
                })
            }
        }
        other => Err(InvalidIdentifier {
            raw: other.to_string(),
        }),
    }
}

/// Relationship whose reference field must be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Job,
    Student,
    Cycle,
}

impl ReferenceKind {
    /// Probe order for the relationship. Changing it changes which reference wins when a
    /// document carries several, so it is part of the report contract.
    pub const fn candidate_fields(self) -> &'static [&'static str] {
        match self {
            Self::Job => &["job_id", "jobId", "job"],
            Self::Student => &["student_id", "studentId", "student"],
            Self::Cycle => &["cycle_id", "cycleId", "cycle"],
        }
    }

    /// Field written on new documents.
    pub const fn canonical_field(self) -> &'static str {
        self.candidate_fields()[0]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Student => "student",
            Self::Cycle => "cycle",
        }
    }

    /// Collection the reference points into.
    pub const fn collection(self) -> Collection {
        match self {
            Self::Job => Collection::Jobs,
            Self::Student => Collection::Students,
            Self::Cycle => Collection::Cycles,
        }
    }
}

/// Every well-formed reference of `kind` carried by `document`, in lookup order, without repeats.
pub fn reference_candidates(document: &Document, kind: ReferenceKind) -> Vec<DocumentId> {
    scan(document, kind).into_iter().map(|(_, id)| id).collect()
}

/// First well-formed reference of `kind`, whether or not it points at a stored document.
pub fn resolve_reference(document: &Document, kind: ReferenceKind) -> Option<DocumentId> {
    resolve_reference_where(document, kind, |_| true)
}

/// First reference of `kind` accepted by `exists`. When no candidate is accepted the first
/// well-formed one is returned so callers can still report the dangling pointer.
pub fn resolve_reference_where<F>(
    document: &Document,
    kind: ReferenceKind,
    mut exists: F,
) -> Option<DocumentId>
where
    F: FnMut(&DocumentId) -> bool,
{
    let mut candidates = scan(document, kind);
    let position = candidates.iter().position(|(_, id)| exists(id)).unwrap_or(0);
    if position >= candidates.len() {
        return None;
    }

    let (field, id) = candidates.swap_remove(position);
    if field != kind.canonical_field() {
        debug!(
            field,
            reference = kind.label(),
            "resolved reference through legacy field name"
        );
    }
    Some(id)
}

fn scan(document: &Document, kind: ReferenceKind) -> Vec<(&'static str, DocumentId)> {
    let mut found: Vec<(&'static str, DocumentId)> = Vec::new();
    for field in kind.candidate_fields() {
        let Some(value) = document.get(*field).filter(|value| !value.is_null()) else {
            continue;
        };

        match normalize(value) {
            Ok(id) => {
                if !found.iter().any(|(_, seen)| *seen == id) {
                    found.push((*field, id));
                }
            }
            Err(err) => {
                debug!(field = *field, %err, "skipping malformed reference field");
            }
        }
    }
    found
}

/// Identifiers currently stored in the collections that references point into.
///
/// Only the kinds passed to [`ReferenceIndex::load`] are populated; resolution against an
/// unloaded kind falls back to the first well-formed candidate.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    jobs: BTreeSet<DocumentId>,
    students: BTreeSet<DocumentId>,
    cycles: BTreeSet<DocumentId>,
}

impl ReferenceIndex {
    pub fn load<S>(store: &S, kinds: &[ReferenceKind]) -> Result<Self, StoreError>
    where
        S: DocumentStore + ?Sized,
    {
        let mut index = Self::default();
        for kind in kinds {
            *index.known_mut(*kind) = store
                .find(kind.collection(), &Filter::all())?
                .iter()
                .filter_map(document_id)
                .collect();
        }
        Ok(index)
    }

    pub fn contains(&self, kind: ReferenceKind, id: &DocumentId) -> bool {
        self.known(kind).contains(id)
    }

    /// Resolves `kind` on `document` to the first candidate that exists.
    pub fn resolve(&self, document: &Document, kind: ReferenceKind) -> Option<DocumentId> {
        resolve_reference_where(document, kind, |id| self.contains(kind, id))
    }

    fn known(&self, kind: ReferenceKind) -> &BTreeSet<DocumentId> {
        match kind {
            ReferenceKind::Job => &self.jobs,
            ReferenceKind::Student => &self.students,
            ReferenceKind::Cycle => &self.cycles,
        }
    }

    fn known_mut(&mut self, kind: ReferenceKind) -> &mut BTreeSet<DocumentId> {
        match kind {
            ReferenceKind::Job => &mut self.jobs,
            ReferenceKind::Student => &mut self.students,
            ReferenceKind::Cycle => &mut self.cycles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::into_document;
    use serde_json::json;

    const JOB_A: &str = "64a000000000000000000001";
    const JOB_B: &str = "64a000000000000000000002";

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let id = DocumentId::parse(" 64A000000000000000000001 ").expect("valid");
        assert_eq!(id.as_str(), JOB_A);
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for raw in ["", "abc", "64a00000000000000000000z", "64a0000000000000000000011"] {
            assert!(DocumentId::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn normalize_accepts_native_forms() {
        assert_eq!(normalize(&json!(JOB_A)).expect("string").as_str(), JOB_A);
        assert_eq!(
            normalize(&json!({ "$oid": JOB_A })).expect("oid").as_str(),
            JOB_A
        );
        assert_eq!(
            normalize(&json!({ "_id": { "$oid": JOB_A }, "company": "Acme" }))
                .expect("embedded")
                .as_str(),
            JOB_A
        );
        assert!(normalize(&json!(42)).is_err());
    }

    #[test]
    fn generated_identifiers_round_trip_and_sort_in_creation_order() {
        let first = DocumentId::generate();
        let second = DocumentId::generate();
        assert!(first < second);
        assert_eq!(DocumentId::parse(first.as_str()).expect("valid"), first);
    }

    #[test]
    fn snake_case_reference_wins_over_camel_case() {
        let document = into_document(json!({ "jobId": JOB_B, "job_id": JOB_A })).expect("doc");
        assert_eq!(
            resolve_reference(&document, ReferenceKind::Job).map(|id| id.to_string()),
            Some(JOB_A.to_string())
        );
    }

    #[test]
    fn malformed_reference_falls_through_to_next_candidate() {
        let document = into_document(json!({
            "job_id": "not-an-id",
            "jobId": null,
            "job": { "_id": JOB_B, "company": "Acme" }
        }))
        .expect("doc");
        assert_eq!(
            resolve_reference(&document, ReferenceKind::Job).map(|id| id.to_string()),
            Some(JOB_B.to_string())
        );
    }

    #[test]
    fn first_stored_reference_wins_over_a_dangling_one() {
        let store = crate::store::MemoryStore::new();
        store
            .seed(Collection::Jobs, [json!({ "_id": JOB_B, "company": "Acme" })])
            .expect("seed");
        let document = into_document(json!({ "job_id": JOB_A, "jobId": JOB_B })).expect("doc");

        let index = ReferenceIndex::load(&store, &[ReferenceKind::Job]).expect("index");
        assert_eq!(
            index.resolve(&document, ReferenceKind::Job).map(|id| id.to_string()),
            Some(JOB_B.to_string())
        );
        assert_eq!(
            reference_candidates(&document, ReferenceKind::Job)
                .iter()
                .map(DocumentId::as_str)
                .collect::<Vec<_>>(),
            vec![JOB_A, JOB_B]
        );
    }

    #[test]
    fn dangling_references_fall_back_to_the_first_candidate() {
        let index = ReferenceIndex::default();
        let document = into_document(json!({ "jobId": JOB_B, "job": JOB_A })).expect("doc");
        assert_eq!(
            index.resolve(&document, ReferenceKind::Job).map(|id| id.to_string()),
            Some(JOB_B.to_string())
        );
    }

    #[test]
    fn missing_reference_resolves_to_none() {
        let document = into_document(json!({ "student": "unknown" })).expect("doc");
        assert!(resolve_reference(&document, ReferenceKind::Student).is_none());
    }
}
