//! Observable session lifecycle events (spec §4.G, §9 "explicit tagged
//! variants" over ad hoc emitter names).

/// One observable session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Storage fetch for a newly opened document completed.
    DocumentLoad {
        /// The document that loaded.
        document_id: String,
    },
    /// A session finished `Initializing` and moved to `Loaded`.
    SessionOpen {
        /// The document the session concerns.
        document_id: String,
    },
    /// A client joined a session.
    ClientJoin {
        /// The document the client joined.
        document_id: String,
        /// The joining client's ID.
        client_id: String,
    },
    /// A client left a session.
    ClientLeave {
        /// The document the client left.
        document_id: String,
        /// The departing client's ID.
        client_id: String,
    },
    /// A message was accepted and fanned out.
    DocumentMessage {
        /// The document the message concerns.
        document_id: String,
        /// The message's content-addressed ID.
        message_id: String,
    },
    /// An update was persisted to storage.
    DocumentWrite {
        /// The document that was written.
        document_id: String,
    },
    /// The last client left and the drain grace period elapsed with no
    /// rejoin; the session is about to dispose.
    DocumentUnload {
        /// The document being unloaded.
        document_id: String,
    },
    /// The document's stored state was deleted.
    DocumentDelete {
        /// The document that was deleted.
        document_id: String,
    },
    /// A milestone was created.
    MilestoneCreated {
        /// The document the milestone belongs to.
        document_id: String,
        /// The created milestone's ID.
        milestone_id: String,
    },
}
