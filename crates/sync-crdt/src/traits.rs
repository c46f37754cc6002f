//! The opaque CRDT contract (spec §4.D, §6): `merge`, `diff`,
//! `stateVectorOf`, `apply`, `encodeStateAsUpdate`. This crate does not
//! claim to implement a real CRDT algorithm (Yjs, Automerge, or
//! otherwise) — `lww` ships a minimal reference document good enough
//! to drive the transport bridge and its tests.

/// One applied change, as surfaced by [`Crdt::apply`].
///
/// Carries only what the document transport needs to decide whether to
/// echo the change back out: the origin tag the caller applied it
/// under, and whether anything actually changed (a no-op apply of
/// already-known ops yields an empty vec).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The origin the update was applied under (spec §4.D: local edits
    /// carry the empty/local origin; inbound sync updates carry the
    /// `"{clientId}-sync"` marker so the transport does not re-emit them).
    pub origin: String,
    /// How many ops were newly merged into the document by this apply.
    pub new_ops: usize,
}

/// The document-level half of the opaque CRDT contract: mutating a
/// document instance and reading its current state.
pub trait Crdt: Send {
    /// Apply `update` to this document, attributing the change to `origin`.
    /// Returns the changes that were newly merged (empty if `update`
    /// contained nothing this document didn't already have).
    fn apply(&mut self, update: &[u8], origin: &str) -> Vec<ChangeEvent>;

    /// Encode the entire current document state as a single update.
    fn encode_state_as_update(&self) -> Vec<u8>;

    /// Encode a compact summary of what this document has seen, suitable
    /// for a remote peer to diff against.
    fn state_vector(&self) -> Vec<u8>;

    /// Compute the update containing exactly what this document has
    /// that `remote_state_vector` indicates the remote is missing.
    fn diff(&self, remote_state_vector: &[u8]) -> Vec<u8>;
}

/// The stateless half of the opaque CRDT contract: combining updates
/// without needing a live document instance. Kept separate from
/// `Crdt` since these are associated functions, not methods — they
/// take no `self` and so are called on the concrete document type
/// (`LwwDoc::merge(...)`), never through `dyn Crdt`.
pub trait MergeUpdates: Sized {
    /// Combine several updates into one equivalent update, independent
    /// of any document instance.
    fn merge(updates: &[Vec<u8>]) -> Vec<u8>;

    /// Compute the state vector implied by a single update, without
    /// needing a document to have applied it.
    fn state_vector_of(update: &[u8]) -> Vec<u8>;
}
