//! A race-free registry of live sessions, keyed by document ID (spec
//! §4.G item 1: concurrent opens for the same document must not create
//! two competing sessions, and a failed open must not leave a stale
//! entry behind).

use crate::error::{Result, SessionError};
use crate::session::Session;
use crate::storage::{DocumentStorage, MilestoneStorage};
use dashmap::DashMap;
use std::sync::Arc;
use sync_crdt::{Crdt, MergeUpdates};
use sync_pubsub::PubSub;
use tokio::sync::broadcast;

/// One in-flight or completed open attempt for a document.
///
/// Concurrent callers asking for the same document ID all clone the
/// same `broadcast::Receiver`-producing sender and await the same
/// outcome, rather than racing to construct independent sessions.
enum Slot<C> {
    Open(Session<C>),
    Opening(broadcast::Sender<std::result::Result<Session<C>, String>>),
}

/// Holds every currently open session and arbitrates concurrent opens.
pub struct SessionRegistry<C> {
    sessions: DashMap<String, Slot<C>>,
    storage: Arc<dyn DocumentStorage<C>>,
    milestones: Arc<dyn MilestoneStorage>,
    pubsub: Arc<dyn PubSub>,
    /// This node's identity on the pub/sub bus. Every session this
    /// registry opens subscribes and publishes under this ID, so
    /// sessions on other nodes sharing the same fabric see this node's
    /// publishes and this node never sees its own echoed back.
    node_id: String,
}

impl<C: Crdt + MergeUpdates + Default + Send + Sync + 'static> SessionRegistry<C> {
    /// A registry backed by the given storage and pubsub fabric,
    /// publishing and subscribing as `node_id`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn DocumentStorage<C>>,
        milestones: Arc<dyn MilestoneStorage>,
        pubsub: Arc<dyn PubSub>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            storage,
            milestones,
            pubsub,
            node_id: node_id.into(),
        }
    }

    /// Fetch the open session for `document_id`, opening one with the
    /// given `encrypted` posture if none exists yet.
    ///
    /// Concurrent callers for the same document ID that arrive while an
    /// open is in flight await that same open rather than racing to
    /// start their own; a caller requesting a different `encrypted`
    /// value than an already-open (or already-opening) session used
    /// gets [`SessionError::ConflictingEncryptionPosture`] without
    /// disturbing the existing session.
    pub async fn get_or_open(&self, document_id: &str, encrypted: bool) -> Result<Session<C>> {
        loop {
            let existing = self.sessions.get(document_id).map(|e| match &*e {
                Slot::Open(session) => Ok(session.clone()),
                Slot::Opening(tx) => Err(tx.subscribe()),
            });

            match existing {
                Some(Ok(session)) => {
                    if session.encrypted() != encrypted {
                        return Err(SessionError::ConflictingEncryptionPosture {
                            document_id: document_id.to_string(),
                        });
                    }
                    return Ok(session);
                }
                Some(Err(mut rx)) => {
                    return match rx.recv().await {
                        Ok(Ok(session)) => {
                            if session.encrypted() != encrypted {
                                return Err(SessionError::ConflictingEncryptionPosture {
                                    document_id: document_id.to_string(),
                                });
                            }
                            Ok(session)
                        }
                        Ok(Err(reason)) => Err(SessionError::OpenFailed {
                            document_id: document_id.to_string(),
                            reason,
                        }),
                        Err(_) => continue, // opener dropped the sender without sending; retry
                    };
                }
                None => {
                    let (tx, _rx) = broadcast::channel(1);
                    let claimed = self
                        .sessions
                        .entry(document_id.to_string())
                        .or_insert_with(|| Slot::Opening(tx.clone()));
                    let is_ours = matches!(&*claimed, Slot::Opening(t) if t.same_channel(&tx));
                    drop(claimed);
                    if !is_ours {
                        continue; // someone else claimed the slot first; retry from the top
                    }

                    let topic = document_id.to_string();
                    let opened = Session::open(
                        document_id,
                        encrypted,
                        Arc::clone(&self.storage),
                        Arc::clone(&self.milestones),
                        Arc::clone(&self.pubsub),
                        topic,
                        self.node_id.clone(),
                    )
                    .await;
                    let session = match opened {
                        Ok(session) => session,
                        Err(error) => {
                            self.sessions.remove(document_id);
                            let _ = tx.send(Err(error.to_string()));
                            return Err(error);
                        }
                    };
                    self.sessions
                        .insert(document_id.to_string(), Slot::Open(session.clone()));
                    let _ = tx.send(Ok(session.clone()));
                    return Ok(session);
                }
            }
        }
    }

    /// Evict `document_id` from the registry. Call this once a
    /// [`Session::is_disposed`] session has finished disposing, so a
    /// later `get_or_open` opens a fresh session rather than handing
    /// back a disposed one.
    pub fn evict(&self, document_id: &str) {
        self.sessions.remove(document_id);
    }

    /// Reap every disposed session from the registry.
    pub fn reap_disposed(&self) {
        self.sessions.retain(|_, slot| match slot {
            Slot::Open(session) => !session.is_disposed(),
            Slot::Opening(_) => true,
        });
    }

    /// Number of entries currently tracked (open or opening).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry currently tracks no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
