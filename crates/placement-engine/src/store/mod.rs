//! Collection-oriented document store consumed by the placement engine.
//!
//! The engine never assumes a particular database. Everything it needs is expressed through
//! [`DocumentStore`]: filtered finds, single-document writes, and counts over named
//! collections. Documents are plain JSON objects so legacy field spellings survive until the
//! engine reconciles them at read time.

mod memory;

pub use memory::MemoryStore;

use serde_json::{Map, Value};

use crate::placement::identifiers::{normalize, DocumentId};

/// Raw stored document.
pub type Document = Map<String, Value>;

/// Field that carries a document's own identifier.
pub const ID_FIELD: &str = "_id";

/// Named collections the engine reads from and writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Students,
    Jobs,
    Applications,
    Cycles,
    Reports,
    ReportData,
    Resumes,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Jobs => "jobs",
            Self::Applications => "applications",
            Self::Cycles => "placement_cycles",
            Self::Reports => "reports",
            Self::ReportData => "report_data",
            Self::Resumes => "resumes",
        }
    }
}

/// Conjunction of equality clauses evaluated against top-level fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.into(), value.into()));
        self
    }

    pub fn any_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.clauses.push(Clause::In(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, expected) => document.get(field) == Some(expected),
            Clause::In(field, candidates) => document
                .get(field)
                .map(|value| candidates.contains(value))
                .unwrap_or(false),
        })
    }
}

/// Storage abstraction so the engine can be exercised against any backing database.
///
/// Implementations guarantee atomic single-document writes, plus an atomic check-then-insert
/// for uniqueness rules; callers that touch several documents (cascading deletes) must stay
/// correct when re-run after a partial failure.
pub trait DocumentStore: Send + Sync {
    fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    fn get(&self, collection: Collection, id: &DocumentId)
        -> Result<Option<Document>, StoreError>;

    /// Inserts a document, honoring an existing `_id` or assigning a fresh one.
    fn insert(&self, collection: Collection, document: Document)
        -> Result<DocumentId, StoreError>;

    /// Like [`DocumentStore::insert`], but fails with [`StoreError::Duplicate`] when a stored
    /// document already satisfies `duplicate`. No other write may land between the check and
    /// the insert.
    fn insert_unless(
        &self,
        collection: Collection,
        document: Document,
        duplicate: &dyn Fn(&Document) -> bool,
    ) -> Result<DocumentId, StoreError>;

    /// Shallow-merges `changes` into the stored document. Returns `false` when absent.
    fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        changes: Document,
    ) -> Result<bool, StoreError>;

    /// Returns `false` when the document was already gone.
    fn delete(&self, collection: Collection, id: &DocumentId) -> Result<bool, StoreError>;

    fn count(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        Ok(self.find(collection, filter)?.len())
    }
}

/// Persistence failures surfaced by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} already exists in {collection}")]
    Conflict {
        collection: &'static str,
        id: DocumentId,
    },
    #[error("{collection} already holds a matching document ({existing})")]
    Duplicate {
        collection: &'static str,
        existing: DocumentId,
    },
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("document could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reads the identifier a document carries, if any.
pub fn document_id(document: &Document) -> Option<DocumentId> {
    document
        .get(ID_FIELD)
        .and_then(|value| normalize(value).ok())
}

/// Converts a JSON value into a document, rejecting non-objects.
pub fn into_document(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
