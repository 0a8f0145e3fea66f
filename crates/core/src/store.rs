//! CRUD over a document's annotations and comments.
//!
//! Every document is one key (`{document}/annotations`) holding a JSON array
//! of tagged [`Record`]s. Each operation is a full read-modify-write of that
//! value; there is a single writer and no transaction across calls.

use crate::events::{AnnotationEvent, EventBus};
use crate::persistence::{KeyValueStore, PersistenceError};
use annotator_model::{Annotation, AnnotationDraft, Comment, Note, PageGroup, Record, RecordId};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no annotation `{id}` in document `{document}`")]
    NotFound { document: String, id: RecordId },
    #[error("record `{0}` is a comment, not an annotation")]
    NotAnAnnotation(RecordId),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Annotation store over a key-value backend. Publishes `Add` and `Remove`
/// on its event bus.
#[derive(Debug)]
pub struct AnnotationStore<K> {
    backend: K,
    bus: EventBus,
}

impl<K: KeyValueStore> AnnotationStore<K> {
    pub fn new(backend: K, bus: EventBus) -> Self {
        Self { backend, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    pub fn records_key(document: &str) -> String {
        format!("{document}/annotations")
    }

    /// Stores `draft` as a new annotation on `page` under a fresh id.
    pub fn add(&self, document: &str, page: u32, draft: AnnotationDraft) -> StoreResult<Annotation> {
        let mut records = self.load_records(document)?;
        let annotation = draft.into_annotation(new_id(), page, Utc::now());
        records.push(Record::Annotation(annotation.clone()));
        self.save_records(document, &records)?;

        debug!(document, id = %annotation.id, page, kind = %annotation.annotation_type(), "annotation added");
        self.bus.publish(AnnotationEvent::Add { annotation: annotation.clone() });
        Ok(annotation)
    }

    /// Replaces the annotation with `id` wholesale. The stored id and page
    /// survive; a replacement without a timestamp keeps the stored one.
    pub fn edit(
        &self,
        document: &str,
        id: &RecordId,
        replacement: impl Into<AnnotationDraft>,
    ) -> StoreResult<Annotation> {
        let replacement = replacement.into();
        self.update(document, id, |current| {
            *current = replacement.into_annotation(current.id.clone(), current.page, current.timestamp);
        })
    }

    /// The one operation that changes an annotation's page.
    pub fn move_to_page(&self, document: &str, id: &RecordId, page: u32) -> StoreResult<Annotation> {
        self.update(document, id, |current| current.page = page)
    }

    /// Appends a timestamped note to the annotation's note thread.
    pub fn add_note(&self, document: &str, id: &RecordId, text: impl Into<String>) -> StoreResult<Annotation> {
        let mut current = self.get_annotation(document, id)?;
        current.notes.push(Note { text: text.into(), timestamp: Utc::now() });
        self.edit(document, id, current)
    }

    /// Removes the annotation with `id`. Once the removal is stored,
    /// subscribers receive `Remove` with the full record. Returns `false`,
    /// without touching storage, when there is no such annotation.
    pub fn delete(&self, document: &str, id: &RecordId) -> StoreResult<bool> {
        let mut records = self.load_records(document)?;
        let Some(index) = records
            .iter()
            .position(|record| matches!(record, Record::Annotation(annotation) if &annotation.id == id))
        else {
            return Ok(false);
        };

        let removed = records.remove(index);
        self.save_records(document, &records)?;

        debug!(document, %id, "annotation deleted");
        if let Record::Annotation(annotation) = removed {
            self.bus.publish(AnnotationEvent::Remove { annotation });
        }
        Ok(true)
    }

    /// All annotations of the document grouped by page number, ascending.
    pub fn get_all(&self, document: &str) -> StoreResult<Vec<PageGroup>> {
        let mut pages: BTreeMap<u32, Vec<Annotation>> = BTreeMap::new();
        for record in self.load_records(document)? {
            if let Record::Annotation(annotation) = record {
                pages.entry(annotation.page).or_default().push(annotation);
            }
        }

        Ok(pages.into_iter().map(|(page, annotations)| PageGroup { page, annotations }).collect())
    }

    pub fn get_by_page(&self, document: &str, page: u32) -> StoreResult<Vec<Annotation>> {
        Ok(self
            .load_records(document)?
            .into_iter()
            .filter_map(|record| match record {
                Record::Annotation(annotation) if annotation.page == page => Some(annotation),
                _ => None,
            })
            .collect())
    }

    /// Any record, annotation or comment, with the given id.
    pub fn get_one(&self, document: &str, id: &RecordId) -> StoreResult<Record> {
        self.load_records(document)?
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or_else(|| not_found(document, id))
    }

    pub fn get_annotation(&self, document: &str, id: &RecordId) -> StoreResult<Annotation> {
        match self.get_one(document, id)? {
            Record::Annotation(annotation) => Ok(annotation),
            Record::Comment(comment) => Err(StoreError::NotAnAnnotation(comment.id)),
        }
    }

    /// Attaches a comment to an existing annotation.
    pub fn add_comment(
        &self,
        document: &str,
        annotation_id: &RecordId,
        content: impl Into<String>,
    ) -> StoreResult<Comment> {
        let mut records = self.load_records(document)?;
        let exists = records
            .iter()
            .any(|record| matches!(record, Record::Annotation(annotation) if &annotation.id == annotation_id));
        if !exists {
            return Err(not_found(document, annotation_id));
        }

        let comment = Comment { id: new_id(), annotation: annotation_id.clone(), content: content.into() };
        records.push(Record::Comment(comment.clone()));
        self.save_records(document, &records)?;

        debug!(document, id = %comment.id, annotation = %annotation_id, "comment added");
        Ok(comment)
    }

    pub fn get_comments(&self, document: &str, annotation_id: &RecordId) -> StoreResult<Vec<Comment>> {
        Ok(self
            .get_all_comments(document)?
            .into_iter()
            .filter(|comment| &comment.annotation == annotation_id)
            .collect())
    }

    pub fn get_all_comments(&self, document: &str) -> StoreResult<Vec<Comment>> {
        Ok(self
            .load_records(document)?
            .into_iter()
            .filter_map(|record| match record {
                Record::Comment(comment) => Some(comment),
                Record::Annotation(_) => None,
            })
            .collect())
    }

    pub fn delete_comment(&self, document: &str, comment_id: &RecordId) -> StoreResult<bool> {
        let mut records = self.load_records(document)?;
        let before = records.len();
        records.retain(|record| !matches!(record, Record::Comment(comment) if &comment.id == comment_id));
        if records.len() == before {
            return Ok(false);
        }

        self.save_records(document, &records)?;
        debug!(document, id = %comment_id, "comment deleted");
        Ok(true)
    }

    /// Drops every record of the document.
    pub fn clear(&self, document: &str) -> StoreResult<()> {
        self.backend.remove(&Self::records_key(document))?;
        debug!(document, "annotations cleared");
        Ok(())
    }

    fn update<F>(&self, document: &str, id: &RecordId, change: F) -> StoreResult<Annotation>
    where
        F: FnOnce(&mut Annotation),
    {
        let mut records = self.load_records(document)?;
        let record = records.iter_mut().find(|record| record.id() == id).ok_or_else(|| not_found(document, id))?;
        let Record::Annotation(annotation) = record else {
            return Err(StoreError::NotAnAnnotation(id.clone()));
        };

        change(annotation);
        let updated = annotation.clone();
        self.save_records(document, &records)?;

        debug!(document, %id, page = updated.page, "annotation updated");
        Ok(updated)
    }

    fn load_records(&self, document: &str) -> StoreResult<Vec<Record>> {
        let key = Self::records_key(document);
        let Some(bytes) = self.backend.load(&key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(records),
            Err(error) => {
                warn!(document, %error, "stored annotations are unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn save_records(&self, document: &str, records: &[Record]) -> StoreResult<()> {
        let bytes = serde_json::to_vec(records)?;
        self.backend.save(&Self::records_key(document), &bytes)?;
        Ok(())
    }
}

fn new_id() -> RecordId {
    RecordId::new(uuid::Uuid::new_v4().to_string())
}

fn not_found(document: &str, id: &RecordId) -> StoreError {
    StoreError::NotFound { document: document.to_owned(), id: id.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Subscription;
    use crate::persistence::{MemoryStore, PersistenceResult};
    use annotator_model::{AnnotationKind, Rect};
    use std::cell::Cell;
    use std::sync::Arc;

    const DOC: &str = "report.pdf";

    fn store() -> (AnnotationStore<Arc<MemoryStore>>, Arc<MemoryStore>, Subscription) {
        let backend = Arc::new(MemoryStore::new());
        let bus = EventBus::new();
        let subscription = bus.subscribe();
        (AnnotationStore::new(Arc::clone(&backend), bus), backend, subscription)
    }

    fn highlight() -> AnnotationDraft {
        AnnotationDraft::new(AnnotationKind::Highlight { rectangles: vec![Rect::new(10.0, 20.0, 100.0, 12.0)] })
            .with_text("selected words")
    }

    fn point(x: f64, y: f64) -> AnnotationDraft {
        AnnotationDraft::new(AnnotationKind::Point { x, y })
    }

    #[test]
    fn test_add_then_get_by_page() {
        let (store, _, subscription) = store();

        let stored = store.add(DOC, 3, highlight()).unwrap();
        assert!(!stored.id.as_str().is_empty());
        assert_eq!(stored.page, 3);

        assert_eq!(store.get_by_page(DOC, 3).unwrap(), vec![stored.clone()]);
        assert!(store.get_by_page(DOC, 2).unwrap().is_empty());
        assert_eq!(subscription.drain(), vec![AnnotationEvent::Add { annotation: stored }]);
    }

    #[test]
    fn test_ids_are_unique() {
        let (store, _, _) = store();
        let a = store.add(DOC, 1, point(1.0, 1.0)).unwrap();
        let b = store.add(DOC, 1, point(1.0, 1.0)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_records_are_persisted_as_tagged_json() {
        let (store, backend, _) = store();
        store.add(DOC, 1, point(5.0, 6.0)).unwrap();

        let bytes = backend.load("report.pdf/annotations").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value[0]["class"], "Annotation");
        assert_eq!(value[0]["type"], "point");
        assert_eq!(value[0]["page"], 1);
    }

    #[test]
    fn test_edit_replaces_but_keeps_identity() {
        let (store, _, _) = store();
        let original = store.add(DOC, 2, point(5.0, 6.0)).unwrap();

        let mut replacement = original.clone();
        replacement.id = RecordId::new("forged");
        replacement.page = 9;
        replacement.kind = AnnotationKind::Point { x: 50.0, y: 60.0 };
        replacement.color = Some("#0f0".to_owned());

        let edited = store.edit(DOC, &original.id, replacement).unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.page, 2);
        assert_eq!(edited.kind, AnnotationKind::Point { x: 50.0, y: 60.0 });
        assert_eq!(edited.timestamp, original.timestamp);
        assert_eq!(store.get_annotation(DOC, &original.id).unwrap(), edited);
    }

    #[test]
    fn test_edit_unknown_id_is_not_found() {
        let (store, backend, _) = store();
        store.add(DOC, 1, point(0.0, 0.0)).unwrap();
        let before = backend.load("report.pdf/annotations").unwrap();

        let result = store.edit(DOC, &RecordId::new("missing"), point(1.0, 1.0));
        assert!(matches!(result, Err(StoreError::NotFound { id, .. }) if id.as_str() == "missing"));
        assert_eq!(backend.load("report.pdf/annotations").unwrap(), before);
    }

    #[test]
    fn test_move_to_page() {
        let (store, _, _) = store();
        let stored = store.add(DOC, 1, highlight()).unwrap();

        let moved = store.move_to_page(DOC, &stored.id, 7).unwrap();
        assert_eq!(moved.page, 7);
        assert!(store.get_by_page(DOC, 1).unwrap().is_empty());
        assert_eq!(store.get_by_page(DOC, 7).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_publishes_remove_with_full_record() {
        let (store, _, subscription) = store();
        let stored = store.add(DOC, 3, highlight()).unwrap();
        subscription.drain();

        assert!(store.delete(DOC, &stored.id).unwrap());
        assert!(store.get_by_page(DOC, 3).unwrap().is_empty());
        assert_eq!(subscription.drain(), vec![AnnotationEvent::Remove { annotation: stored }]);
    }

    #[test]
    fn test_delete_unknown_id_leaves_storage_untouched() {
        let (store, backend, subscription) = store();
        assert!(!store.delete(DOC, &RecordId::new("missing")).unwrap());
        assert!(!backend.contains_key("report.pdf/annotations"));
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn test_get_all_groups_sparse_pages_in_order() {
        let (store, _, _) = store();
        let on_twelve = store.add(DOC, 12, point(1.0, 1.0)).unwrap();
        let on_three = store.add(DOC, 3, point(2.0, 2.0)).unwrap();
        let also_twelve = store.add(DOC, 12, highlight()).unwrap();
        let target = on_three.id.clone();
        store.add_comment(DOC, &target, "not an annotation").unwrap();

        let groups = store.get_all(DOC).unwrap();
        assert_eq!(
            groups,
            vec![
                PageGroup { page: 3, annotations: vec![on_three] },
                PageGroup { page: 12, annotations: vec![on_twelve, also_twelve] },
            ]
        );
    }

    #[test]
    fn test_comments_are_a_sub_resource() {
        let (store, _, _) = store();
        let first = store.add(DOC, 1, highlight()).unwrap();
        let second = store.add(DOC, 1, point(3.0, 3.0)).unwrap();

        let a = store.add_comment(DOC, &first.id, "first thought").unwrap();
        let b = store.add_comment(DOC, &second.id, "elsewhere").unwrap();
        let c = store.add_comment(DOC, &first.id, "second thought").unwrap();

        assert_eq!(store.get_comments(DOC, &first.id).unwrap(), vec![a.clone(), c.clone()]);
        assert_eq!(store.get_all_comments(DOC).unwrap(), vec![a.clone(), b, c.clone()]);
        assert_eq!(store.get_by_page(DOC, 1).unwrap().len(), 2);
        assert!(matches!(store.get_one(DOC, &a.id).unwrap(), Record::Comment(_)));

        assert!(store.delete_comment(DOC, &a.id).unwrap());
        assert!(!store.delete_comment(DOC, &a.id).unwrap());
        assert_eq!(store.get_comments(DOC, &first.id).unwrap(), vec![c]);
    }

    #[test]
    fn test_comment_requires_existing_annotation() {
        let (store, _, _) = store();
        let result = store.add_comment(DOC, &RecordId::new("ghost"), "hello");
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_comments_survive_annotation_delete() {
        let (store, _, _) = store();
        let annotation = store.add(DOC, 1, highlight()).unwrap();
        let comment = store.add_comment(DOC, &annotation.id, "orphan soon").unwrap();

        store.delete(DOC, &annotation.id).unwrap();
        assert_eq!(store.get_all_comments(DOC).unwrap(), vec![comment]);
    }

    #[test]
    fn test_edit_rejects_comment_ids() {
        let (store, _, _) = store();
        let annotation = store.add(DOC, 1, highlight()).unwrap();
        let comment = store.add_comment(DOC, &annotation.id, "text").unwrap();

        let result = store.edit(DOC, &comment.id, highlight());
        assert!(matches!(result, Err(StoreError::NotAnAnnotation(_))));
    }

    #[test]
    fn test_add_note_appends_to_thread() {
        let (store, _, _) = store();
        let annotation = store.add(DOC, 1, highlight()).unwrap();

        store.add_note(DOC, &annotation.id, "one").unwrap();
        let noted = store.add_note(DOC, &annotation.id, "two").unwrap();

        let texts: Vec<_> = noted.notes.iter().map(|note| note.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_malformed_data_reads_as_empty() {
        let (store, backend, _) = store();
        backend.save("report.pdf/annotations", b"{not json").unwrap();

        assert!(store.get_all(DOC).unwrap().is_empty());
        let stored = store.add(DOC, 1, point(1.0, 2.0)).unwrap();
        assert_eq!(store.get_by_page(DOC, 1).unwrap(), vec![stored]);
    }

    #[test]
    fn test_clear_removes_the_document_key() {
        let (store, backend, _) = store();
        store.add(DOC, 1, highlight()).unwrap();
        store.add(DOC, 1, highlight()).unwrap();
        store.add("other.pdf", 1, highlight()).unwrap();

        store.clear(DOC).unwrap();
        assert!(store.get_all(DOC).unwrap().is_empty());
        assert!(!backend.contains_key("report.pdf/annotations"));
        assert_eq!(store.get_all("other.pdf").unwrap().len(), 1);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn load(&self, _key: &str) -> PersistenceResult<Option<Vec<u8>>> {
            Err(PersistenceError::Backend("disk on fire".to_owned()))
        }

        fn save(&self, _key: &str, _bytes: &[u8]) -> PersistenceResult<()> {
            Err(PersistenceError::Backend("disk on fire".to_owned()))
        }

        fn remove(&self, _key: &str) -> PersistenceResult<()> {
            Ok(())
        }
    }

    /// Memory backend that can be switched to reject writes.
    #[derive(Default)]
    struct ReadOnlySwitch {
        inner: MemoryStore,
        read_only: Cell<bool>,
    }

    impl KeyValueStore for ReadOnlySwitch {
        fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
            self.inner.load(key)
        }

        fn save(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()> {
            if self.read_only.get() {
                return Err(PersistenceError::Backend("read-only".to_owned()));
            }
            self.inner.save(key, bytes)
        }

        fn remove(&self, key: &str) -> PersistenceResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_failed_delete_publishes_nothing() {
        let store = AnnotationStore::new(ReadOnlySwitch::default(), EventBus::new());
        let stored = store.add(DOC, 1, highlight()).unwrap();
        let subscription = store.bus().subscribe();

        store.backend().read_only.set(true);
        assert!(matches!(store.delete(DOC, &stored.id), Err(StoreError::Persistence(_))));
        assert!(subscription.drain().is_empty());
        assert_eq!(store.get_by_page(DOC, 1).unwrap(), vec![stored.clone()]);

        store.backend().read_only.set(false);
        assert!(store.delete(DOC, &stored.id).unwrap());
        assert_eq!(subscription.drain(), vec![AnnotationEvent::Remove { annotation: stored }]);
    }

    #[test]
    fn test_backend_failures_propagate() {
        let store = AnnotationStore::new(FailingStore, EventBus::new());
        assert!(matches!(store.get_all(DOC), Err(StoreError::Persistence(_))));
        assert!(matches!(store.add(DOC, 1, highlight()), Err(StoreError::Persistence(_))));
    }
}
