//! Document and milestone storage (spec §4.G). Concrete storage
//! drivers are out of scope; each trait ships one in-memory reference
//! implementation so the session is exercisable and testable.

use dashmap::DashMap;
use std::marker::PhantomData;
use std::sync::Mutex;
use sync_crdt::MergeUpdates;
use sync_wire::Milestone;

/// A document's persisted state, as handed back to a session.
#[derive(Debug, Clone, Default)]
pub struct StoredDocument {
    /// The merged update bytes (empty if nothing has been written yet).
    pub update: Vec<u8>,
    /// The state vector implied by `update`.
    pub state_vector: Vec<u8>,
}

/// Where document updates live. The session writes raw update bytes
/// one at a time and never merges them itself (spec §4.G item 4);
/// compaction is entirely this trait's responsibility.
pub trait DocumentStorage<C: MergeUpdates>: Send + Sync {
    /// Append a raw update for `document_id`.
    fn write_update(&self, document_id: &str, update: Vec<u8>);

    /// Load the compacted state for `document_id` (empty if nothing's
    /// been written).
    fn load(&self, document_id: &str) -> StoredDocument;

    /// Remove all stored state for `document_id`.
    fn delete(&self, document_id: &str);
}

/// In-memory reference `DocumentStorage`.
///
/// Compacts eagerly: every `write_update` immediately merges the new
/// update into the single stored entry via `C::merge`, rather than
/// accumulating an ever-growing log.
pub struct InMemoryDocumentStorage<C> {
    documents: DashMap<String, Mutex<Vec<u8>>>,
    _marker: PhantomData<C>,
}

impl<C> Default for InMemoryDocumentStorage<C> {
    fn default() -> Self {
        Self {
            documents: DashMap::new(),
            _marker: PhantomData,
        }
    }
}

impl<C> InMemoryDocumentStorage<C> {
    /// An empty document store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: MergeUpdates + Send + Sync> DocumentStorage<C> for InMemoryDocumentStorage<C> {
    fn write_update(&self, document_id: &str, update: Vec<u8>) {
        let entry = self
            .documents
            .entry(document_id.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut stored = entry.lock().unwrap();
        let previous = std::mem::take(&mut *stored);
        *stored = C::merge(&[previous, update]);
    }

    fn load(&self, document_id: &str) -> StoredDocument {
        match self.documents.get(document_id) {
            Some(entry) => {
                let update = entry.lock().unwrap().clone();
                let state_vector = C::state_vector_of(&update);
                StoredDocument {
                    update,
                    state_vector,
                }
            }
            None => StoredDocument::default(),
        }
    }

    fn delete(&self, document_id: &str) {
        self.documents.remove(document_id);
    }
}

/// Where milestone metadata and snapshot bytes live.
pub trait MilestoneStorage: Send + Sync {
    /// Create a milestone, returning its assigned metadata.
    fn create(&self, document_id: &str, name: Option<String>, created_by: sync_wire::milestone::MilestoneCreator, snapshot: Vec<u8>) -> Milestone;

    /// List milestones for a document; `ids` empty means "all".
    fn list(&self, document_id: &str, ids: &[String]) -> Vec<Milestone>;

    /// Fetch the snapshot bytes for one milestone.
    fn snapshot(&self, milestone_id: &str) -> Option<Vec<u8>>;

    /// Fetch one milestone's current metadata.
    fn get(&self, milestone_id: &str) -> Option<Milestone>;

    /// Rename a milestone, returning its updated metadata.
    fn rename(&self, milestone_id: &str, name: String) -> Option<Milestone>;

    /// Soft-delete a milestone (sets `deleted_at`).
    fn soft_delete(&self, milestone_id: &str, deleted_at: u64) -> bool;

    /// Restore a soft-deleted milestone (clears `deleted_at`).
    fn restore(&self, milestone_id: &str) -> bool;
}

/// In-memory reference `MilestoneStorage`.
#[derive(Default)]
pub struct InMemoryMilestoneStorage {
    milestones: DashMap<String, Milestone>,
    snapshots: DashMap<String, Vec<u8>>,
}

impl InMemoryMilestoneStorage {
    /// An empty milestone store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MilestoneStorage for InMemoryMilestoneStorage {
    fn create(
        &self,
        document_id: &str,
        name: Option<String>,
        created_by: sync_wire::milestone::MilestoneCreator,
        snapshot: Vec<u8>,
    ) -> Milestone {
        let id = uuid::Uuid::new_v4().to_string();
        let milestone = Milestone {
            id: id.clone(),
            name: name.unwrap_or_else(|| id.clone()),
            document_id: document_id.to_string(),
            created_at: 0,
            created_by,
            deleted_at: None,
            lifecycle_state: None,
            expires_at: None,
        };
        self.milestones.insert(id.clone(), milestone.clone());
        self.snapshots.insert(id, snapshot);
        milestone
    }

    fn list(&self, document_id: &str, ids: &[String]) -> Vec<Milestone> {
        self.milestones
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|m| m.document_id == document_id)
            .filter(|m| ids.is_empty() || ids.contains(&m.id))
            .collect()
    }

    fn snapshot(&self, milestone_id: &str) -> Option<Vec<u8>> {
        self.snapshots.get(milestone_id).map(|s| s.clone())
    }

    fn get(&self, milestone_id: &str) -> Option<Milestone> {
        self.milestones.get(milestone_id).map(|m| m.clone())
    }

    fn rename(&self, milestone_id: &str, name: String) -> Option<Milestone> {
        let mut entry = self.milestones.get_mut(milestone_id)?;
        entry.name = name;
        Some(entry.clone())
    }

    fn soft_delete(&self, milestone_id: &str, deleted_at: u64) -> bool {
        match self.milestones.get_mut(milestone_id) {
            Some(mut m) => {
                m.deleted_at = Some(deleted_at);
                true
            }
            None => false,
        }
    }

    fn restore(&self, milestone_id: &str) -> bool {
        match self.milestones.get_mut(milestone_id) {
            Some(mut m) => {
                m.deleted_at = None;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_crdt::LwwDoc;
    use sync_wire::milestone::MilestoneCreator;

    #[test]
    fn loading_an_unwritten_document_yields_empty_state() {
        let storage = InMemoryDocumentStorage::<LwwDoc>::new();
        let stored = storage.load("doc1");
        assert!(stored.update.is_empty());
    }

    #[test]
    fn write_update_compacts_into_a_single_merged_entry() {
        let storage = InMemoryDocumentStorage::<LwwDoc>::new();
        let mut doc = LwwDoc::new();
        let u1 = doc.write_local("alice", "hello");
        let mut doc2 = LwwDoc::new();
        let u2 = doc2.write_local("bob", "world");

        storage.write_update("doc1", u1);
        storage.write_update("doc1", u2);

        let stored = storage.load("doc1");
        let mut replay = LwwDoc::new();
        sync_crdt::Crdt::apply(&mut replay, &stored.update, "test");
        assert_eq!(replay.text(), "helloworld");
    }

    #[test]
    fn delete_clears_stored_state() {
        let storage = InMemoryDocumentStorage::<LwwDoc>::new();
        let mut doc = LwwDoc::new();
        storage.write_update("doc1", doc.write_local("alice", "hi"));
        storage.delete("doc1");
        assert!(storage.load("doc1").update.is_empty());
    }

    #[test]
    fn milestone_lifecycle() {
        let storage = InMemoryMilestoneStorage::new();
        let m = storage.create(
            "doc1",
            Some("checkpoint".into()),
            MilestoneCreator::User("u1".into()),
            vec![1, 2, 3],
        );
        assert_eq!(storage.snapshot(&m.id), Some(vec![1, 2, 3]));
        assert_eq!(storage.list("doc1", &[]).len(), 1);

        let renamed = storage.rename(&m.id, "v2".into()).unwrap();
        assert_eq!(renamed.name, "v2");

        assert!(storage.soft_delete(&m.id, 123));
        assert_eq!(storage.get(&m.id).unwrap().deleted_at, Some(123));

        assert!(storage.restore(&m.id));
        assert_eq!(storage.get(&m.id).unwrap().deleted_at, None);
    }
}
