use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use super::{
    document_id, into_document, Collection, Document, DocumentStore, Filter, StoreError, ID_FIELD,
};
use crate::placement::identifiers::DocumentId;

type Collections = HashMap<Collection, BTreeMap<DocumentId, Document>>;

/// Process-local store used by tests and the demo service. Documents are kept in identifier
/// order so finds are deterministic.
#[derive(Default, Clone)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts raw JSON documents as-is, keeping whatever field spellings they carry.
    pub fn seed<I>(&self, collection: Collection, documents: I) -> Result<Vec<DocumentId>, StoreError>
    where
        I: IntoIterator<Item = Value>,
    {
        documents
            .into_iter()
            .map(|value| self.insert(collection, into_document(value)?))
            .collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(&collection)
            .map(|documents| {
                documents
                    .values()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(&collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<DocumentId, StoreError> {
        self.insert_unless(collection, document, &|_| false)
    }

    fn insert_unless(
        &self,
        collection: Collection,
        mut document: Document,
        duplicate: &dyn Fn(&Document) -> bool,
    ) -> Result<DocumentId, StoreError> {
        let id = match document.get(ID_FIELD) {
            Some(_) => document_id(&document).ok_or_else(|| {
                StoreError::InvalidDocument(format!(
                    "{} carries a malformed {ID_FIELD}",
                    collection.name()
                ))
            })?,
            None => DocumentId::generate(),
        };
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let mut guard = self.lock()?;
        let documents = guard.entry(collection).or_default();
        if let Some(existing) = documents
            .iter()
            .find_map(|(existing, stored)| duplicate(stored).then(|| existing.clone()))
        {
            return Err(StoreError::Duplicate {
                collection: collection.name(),
                existing,
            });
        }
        if documents.contains_key(&id) {
            return Err(StoreError::Conflict {
                collection: collection.name(),
                id,
            });
        }
        documents.insert(id.clone(), document);
        Ok(id)
    }

    fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        changes: Document,
    ) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let Some(document) = guard
            .get_mut(&collection)
            .and_then(|documents| documents.get_mut(id))
        else {
            return Ok(false);
        };

        for (field, value) in changes {
            if field != ID_FIELD {
                document.insert(field, value);
            }
        }
        Ok(true)
    }

    fn delete(&self, collection: Collection, id: &DocumentId) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        Ok(guard
            .get_mut(&collection)
            .map(|documents| documents.remove(id).is_some())
            .unwrap_or(false))
    }
}
