use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::identifiers::{DocumentId, ReferenceIndex, ReferenceKind};
use super::records::timestamp;
use crate::store::{document_id, Collection, Document, DocumentStore, Filter, StoreError};

/// Pointer to an uploaded resume file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRef {
    pub id: DocumentId,
    pub file_url: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Resume lookup keyed by student.
pub trait ResumeDirectory: Send + Sync {
    /// Most recently created resume for the student, if any.
    fn latest_for(&self, student_id: &DocumentId) -> Result<Option<ResumeRef>, StoreError>;
}

/// Reads resumes from the document store's `resumes` collection.
pub struct StoreResumeDirectory<S> {
    store: Arc<S>,
}

impl<S> StoreResumeDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> ResumeDirectory for StoreResumeDirectory<S>
where
    S: DocumentStore,
{
    fn latest_for(&self, student_id: &DocumentId) -> Result<Option<ResumeRef>, StoreError> {
        let students = ReferenceIndex::load(self.store.as_ref(), &[ReferenceKind::Student])?;
        let latest = self
            .store
            .find(Collection::Resumes, &Filter::all())?
            .iter()
            .filter(|document| {
                students.resolve(document, ReferenceKind::Student).as_ref() == Some(student_id)
            })
            .filter_map(resume_ref)
            .max_by(|left, right| {
                left.uploaded_at
                    .cmp(&right.uploaded_at)
                    .then_with(|| left.id.cmp(&right.id))
            });
        Ok(latest)
    }
}

fn resume_ref(document: &Document) -> Option<ResumeRef> {
    let id = document_id(document)?;
    let file_url = ["file_url", "fileUrl", "url", "file_path", "filePath"]
        .iter()
        .find_map(|field| document.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|url| !url.is_empty())?
        .to_string();

    Some(ResumeRef {
        id,
        file_url,
        uploaded_at: timestamp(document, &["created_at", "createdAt", "uploaded_at", "uploadedAt"]),
    })
}
