//! Per-document session: the state machine, handshake, fan-out, and
//! pubsub dedupe described in spec §4.G.

use crate::dedupe::DedupeCache;
use crate::error::{Result, SessionError};
use crate::events::SessionEvent;
use crate::outcome::Outcome;
use crate::storage::{DocumentStorage, MilestoneStorage};
use crate::state::SessionState;
use dashmap::DashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_crdt::{Crdt, MergeUpdates};
use sync_pubsub::PubSub;
use sync_wire::doc::Permission;
use sync_wire::milestone::MilestoneCreator;
use sync_wire::{Context, DocMessage, DocPayload, Message};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant as TokioInstant;

/// How long a drained session (no clients left) waits before disposing.
pub const DRAIN_GRACE: Duration = Duration::from_secs(60);

const EVENT_BUFFER: usize = 256;
const CLIENT_QUEUE_CAPACITY: usize = 256;
const DEDUPE_TTL: Duration = Duration::from_secs(300);

/// Where an inbound message came from, for dedupe and publish decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin<'a> {
    /// A directly connected client.
    Client(&'a str),
    /// The session's pubsub topic (another node, or this node's own echo).
    PubSub,
}

struct Inner<C> {
    document_id: String,
    encrypted: bool,
    state: Mutex<SessionState>,
    clients: DashMap<String, mpsc::UnboundedSender<Message>>,
    dedupe: DedupeCache,
    storage: Arc<dyn DocumentStorage<C>>,
    milestones: Arc<dyn MilestoneStorage>,
    pubsub: Arc<dyn PubSub>,
    pubsub_topic: String,
    /// This node's identity on the pub/sub bus, so a publish this
    /// session makes is never echoed back to itself (spec §4.F's
    /// self-echo rule) while a sibling session on another node still
    /// sees it.
    source_id: String,
    events: broadcast::Sender<SessionEvent>,
    drain_timer: Mutex<Option<tokio::task::JoinHandle<()>>>,
    pubsub_listener: Mutex<Option<tokio::task::JoinHandle<()>>>,
    disposed_notified: AtomicBool,
    _marker: PhantomData<C>,
}

/// A live per-document session.
pub struct Session<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Crdt + MergeUpdates + Default + Send + Sync + 'static> Session<C> {
    /// Open a session for `document_id`. Moves `Initializing` ->
    /// `Loaded` synchronously — the in-memory reference storage never
    /// actually blocks, so there is no real queuing window, but the
    /// state is still observable and events still fire in order.
    ///
    /// `source_id` is this session's identity on the pub/sub bus (the
    /// owning node's ID, not the document ID) — every session this node
    /// opens shares it, so a publish one of them makes is never echoed
    /// back to itself while a sibling session on another node still
    /// receives it and re-ingests it with [`Origin::PubSub`].
    /// Subscribing happens before this returns, the same way
    /// [`sync_middleware::AckTrackingSink::new`] subscribes before
    /// handing back a sink, so no publish racing the subscribe is
    /// missed.
    pub async fn open(
        document_id: impl Into<String>,
        encrypted: bool,
        storage: Arc<dyn DocumentStorage<C>>,
        milestones: Arc<dyn MilestoneStorage>,
        pubsub: Arc<dyn PubSub>,
        pubsub_topic: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Result<Self> {
        let document_id = document_id.into();
        let pubsub_topic = pubsub_topic.into();
        let source_id = source_id.into();
        let mut pubsub_source = pubsub
            .subscribe(&pubsub_topic, &source_id)
            .await
            .map_err(|error| SessionError::OpenFailed {
                document_id: document_id.clone(),
                reason: error.to_string(),
            })?;

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let inner = Arc::new(Inner {
            document_id: document_id.clone(),
            encrypted,
            state: Mutex::new(SessionState::Initializing),
            clients: DashMap::new(),
            dedupe: DedupeCache::new(DEDUPE_TTL),
            storage,
            milestones,
            pubsub,
            pubsub_topic,
            source_id,
            events,
            drain_timer: Mutex::new(None),
            pubsub_listener: Mutex::new(None),
            disposed_notified: AtomicBool::new(false),
            _marker: PhantomData,
        });
        let _ = inner.events.send(SessionEvent::DocumentLoad {
            document_id: document_id.clone(),
        });
        *inner.state.lock().unwrap() = SessionState::Loaded;
        let _ = inner.events.send(SessionEvent::SessionOpen { document_id });

        let session = Self { inner };
        let listener_session = session.clone();
        let listener = tokio::spawn(async move {
            while let Ok(Some(bus_message)) = pubsub_source.recv().await {
                if let Ok(decoded) = Message::decode(&bus_message.payload) {
                    let _ = listener_session.ingest(decoded, Origin::PubSub).await;
                }
            }
        });
        *session.inner.pubsub_listener.lock().unwrap() = Some(listener);
        Ok(session)
    }

    /// The document this session concerns.
    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.inner.document_id
    }

    /// This session's fixed encryption posture.
    #[must_use]
    pub fn encrypted(&self) -> bool {
        self.inner.encrypted
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    /// Subscribe to this session's lifecycle events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Register a client, returning its outbound message queue.
    /// Cancels any pending drain timer and returns to `Loaded`.
    ///
    /// The queue is backed by the same unbounded-relay-into-bounded-queue
    /// shape [`sync_streams::FanOutWriter::register_reader`] uses for its
    /// readers: `fan_out` pushes into this client's unbounded relay and
    /// never blocks or drops, while a dedicated task per client drains
    /// that relay into the bounded queue the caller holds, one message
    /// at a time. A slow client only ever backs up its own relay, never
    /// another client's delivery or the session's fan-out loop. A plain
    /// `FanOutWriter` isn't reused directly here because its `write`
    /// broadcasts to every registered reader unconditionally, and
    /// `fan_out` needs to exclude one specific client (the sender) per
    /// call — a different exclusion set each time, not a fixed filter a
    /// reader could apply to itself.
    pub fn join(&self, client_id: &str) -> Result<mpsc::Receiver<Message>> {
        if self.state() == SessionState::Disposed {
            return Err(SessionError::Disposed {
                document_id: self.inner.document_id.clone(),
            });
        }
        if let Some(handle) = self.inner.drain_timer.lock().unwrap().take() {
            handle.abort();
        }
        *self.inner.state.lock().unwrap() = SessionState::Loaded;
        let (relay_tx, mut relay_rx) = mpsc::unbounded_channel::<Message>();
        let (out_tx, out_rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(item) = relay_rx.recv().await {
                if out_tx.send(item).await.is_err() {
                    break;
                }
            }
        });
        self.inner.clients.insert(client_id.to_string(), relay_tx);
        let _ = self.inner.events.send(SessionEvent::ClientJoin {
            document_id: self.inner.document_id.clone(),
            client_id: client_id.to_string(),
        });
        Ok(out_rx)
    }

    /// Unregister a client. If it was the last one, arms the drain timer.
    pub fn leave(&self, client_id: &str) {
        self.inner.clients.remove(client_id);
        let _ = self.inner.events.send(SessionEvent::ClientLeave {
            document_id: self.inner.document_id.clone(),
            client_id: client_id.to_string(),
        });
        if self.inner.clients.is_empty() {
            self.arm_drain_timer();
        }
    }

    fn arm_drain_timer(&self) {
        *self.inner.state.lock().unwrap() = SessionState::Draining;
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(TokioInstant::now() + DRAIN_GRACE).await;
            if inner.clients.is_empty() {
                *inner.state.lock().unwrap() = SessionState::Disposed;
                inner.disposed_notified.store(true, Ordering::SeqCst);
                if let Some(listener) = inner.pubsub_listener.lock().unwrap().take() {
                    listener.abort();
                }
                let _ = inner.events.send(SessionEvent::DocumentUnload {
                    document_id: inner.document_id.clone(),
                });
            }
        });
        *self.inner.drain_timer.lock().unwrap() = Some(handle);
    }

    /// Whether this session has disposed (for a registry's reaper to
    /// notice and evict its entry).
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed_notified.load(Ordering::SeqCst)
    }

    /// Feed one inbound message through the session's handshake/fan-out
    /// logic and, as a side effect, deliver the resulting broadcast to
    /// every other currently joined client.
    pub async fn ingest(&self, msg: Message, origin: Origin<'_>) -> Result<Outcome> {
        if self.state() == SessionState::Disposed {
            return Err(SessionError::Disposed {
                document_id: self.inner.document_id.clone(),
            });
        }
        let id = msg.id().to_base64();
        if matches!(origin, Origin::PubSub) {
            if self.inner.dedupe.is_duplicate(&id) {
                return Ok(Outcome::none());
            }
            self.inner.dedupe.insert(&id);
        } else {
            self.inner.dedupe.insert(&id);
        }

        if !matches!(msg, Message::Ack(_)) && msg.encrypted() != self.inner.encrypted {
            return Err(SessionError::EncryptionStateMismatch);
        }

        let sender = match origin {
            Origin::Client(c) => Some(c),
            Origin::PubSub => None,
        };

        let outcome = match &msg {
            Message::Doc(doc_msg) => self.handle_doc_message(doc_msg.clone()),
            Message::Awareness(_) => Outcome::broadcast(msg.clone(), sender.is_some()),
            Message::Ack(_) | Message::File(_) => Outcome::none(),
        };

        if let Some(broadcast_msg) = &outcome.broadcast {
            self.fan_out(broadcast_msg.clone(), sender);
            let _ = self.inner.events.send(SessionEvent::DocumentMessage {
                document_id: self.inner.document_id.clone(),
                message_id: id,
            });
            if outcome.publish {
                let _ = self
                    .inner
                    .pubsub
                    .publish(
                        &self.inner.pubsub_topic,
                        broadcast_msg.encode(),
                        &self.inner.source_id,
                    )
                    .await;
            }
        }
        Ok(outcome)
    }

    /// Deliver `msg` to every joined client except `exclude` (the
    /// sender, if any). Pushes into each client's unbounded relay
    /// (see [`Session::join`]), so this never blocks on or drops for a
    /// slow client.
    fn fan_out(&self, msg: Message, exclude: Option<&str>) {
        for entry in &self.inner.clients {
            if Some(entry.key().as_str()) == exclude {
                continue;
            }
            let _ = entry.value().send(msg.clone());
        }
    }

    fn handle_doc_message(&self, doc_msg: DocMessage) -> Outcome {
        match doc_msg.payload {
            DocPayload::SyncStep1 { sv } => {
                let stored = self.inner.storage.load(&self.inner.document_id);
                let mut scratch = C::default();
                scratch.apply(&stored.update, "storage");
                let diff = scratch.diff(&sv);
                let current_sv = scratch.state_vector();
                Outcome::to_sender_only(vec![
                    Message::Doc(DocMessage::new(
                        self.inner.document_id.clone(),
                        doc_msg.context.clone(),
                        self.inner.encrypted,
                        DocPayload::SyncStep2 { update: diff },
                    )),
                    Message::Doc(DocMessage::new(
                        self.inner.document_id.clone(),
                        doc_msg.context,
                        self.inner.encrypted,
                        DocPayload::SyncStep1 { sv: current_sv },
                    )),
                ])
            }
            DocPayload::SyncStep2 { ref update } => {
                self.inner
                    .storage
                    .write_update(&self.inner.document_id, update.clone());
                let _ = self.inner.events.send(SessionEvent::DocumentWrite {
                    document_id: self.inner.document_id.clone(),
                });
                let done = Message::Doc(DocMessage::new(
                    self.inner.document_id.clone(),
                    doc_msg.context.clone(),
                    self.inner.encrypted,
                    DocPayload::SyncDone,
                ));
                let mut outcome = Outcome::broadcast(
                    Message::Doc(doc_msg),
                    true,
                );
                outcome.to_sender = vec![done];
                outcome
            }
            DocPayload::Update { ref update } => {
                self.inner
                    .storage
                    .write_update(&self.inner.document_id, update.clone());
                let _ = self.inner.events.send(SessionEvent::DocumentWrite {
                    document_id: self.inner.document_id.clone(),
                });
                Outcome::broadcast(Message::Doc(doc_msg), true)
            }
            DocPayload::MilestoneListReq { ref snapshot_ids } => {
                let milestones = self
                    .inner
                    .milestones
                    .list(&self.inner.document_id, snapshot_ids);
                Outcome::to_sender_only(vec![Message::Doc(DocMessage::new(
                    self.inner.document_id.clone(),
                    doc_msg.context,
                    self.inner.encrypted,
                    DocPayload::MilestoneListResp { milestones },
                ))])
            }
            DocPayload::MilestoneSnapshotReq { ref milestone_id } => {
                let reply = match self.inner.milestones.snapshot(milestone_id) {
                    Some(snapshot) => DocPayload::MilestoneSnapshotResp {
                        milestone_id: milestone_id.clone(),
                        snapshot,
                    },
                    None => DocPayload::MilestoneAuth {
                        permission: Permission::Denied,
                        reason: format!("no milestone with id {milestone_id}"),
                    },
                };
                Outcome::to_sender_only(vec![Message::Doc(DocMessage::new(
                    self.inner.document_id.clone(),
                    doc_msg.context,
                    self.inner.encrypted,
                    reply,
                ))])
            }
            DocPayload::MilestoneCreateReq { name, snapshot } => {
                let milestone = self.inner.milestones.create(
                    &self.inner.document_id,
                    name,
                    MilestoneCreator::User(doc_msg.context.client_id.clone()),
                    snapshot,
                );
                let _ = self.inner.events.send(SessionEvent::MilestoneCreated {
                    document_id: self.inner.document_id.clone(),
                    milestone_id: milestone.id.clone(),
                });
                Outcome::to_sender_only(vec![Message::Doc(DocMessage::new(
                    self.inner.document_id.clone(),
                    doc_msg.context,
                    self.inner.encrypted,
                    DocPayload::MilestoneCreateResp { milestone },
                ))])
            }
            DocPayload::MilestoneRenameReq {
                ref milestone_id,
                ref name,
            } => {
                let reply = match self.inner.milestones.rename(milestone_id, name.clone()) {
                    Some(milestone) => DocPayload::MilestoneRenameResp { milestone },
                    None => DocPayload::MilestoneAuth {
                        permission: Permission::Denied,
                        reason: format!("no milestone with id {milestone_id}"),
                    },
                };
                Outcome::to_sender_only(vec![Message::Doc(DocMessage::new(
                    self.inner.document_id.clone(),
                    doc_msg.context,
                    self.inner.encrypted,
                    reply,
                ))])
            }
            DocPayload::MilestoneSoftDeleteReq { ref milestone_id } => {
                self.inner.milestones.soft_delete(milestone_id, 0);
                Outcome::to_sender_only(vec![Message::Doc(DocMessage::new(
                    self.inner.document_id.clone(),
                    doc_msg.context,
                    self.inner.encrypted,
                    DocPayload::MilestoneSoftDeleteResp {
                        milestone_id: milestone_id.clone(),
                    },
                ))])
            }
            DocPayload::MilestoneRestoreReq { ref milestone_id } => {
                self.inner.milestones.restore(milestone_id);
                Outcome::to_sender_only(vec![Message::Doc(DocMessage::new(
                    self.inner.document_id.clone(),
                    doc_msg.context,
                    self.inner.encrypted,
                    DocPayload::MilestoneRestoreResp {
                        milestone_id: milestone_id.clone(),
                    },
                ))])
            }
            DocPayload::SyncDone
            | DocPayload::AuthMessage { .. }
            | DocPayload::MilestoneAuth { .. }
            | DocPayload::MilestoneListResp { .. }
            | DocPayload::MilestoneSnapshotResp { .. }
            | DocPayload::MilestoneCreateResp { .. }
            | DocPayload::MilestoneRenameResp { .. }
            | DocPayload::MilestoneSoftDeleteResp { .. }
            | DocPayload::MilestoneRestoreResp { .. } => Outcome::none(),
        }
    }

    /// Delete this document's persisted state and emit `document-delete`.
    pub fn delete_document(&self) {
        self.inner.storage.delete(&self.inner.document_id);
        let _ = self.inner.events.send(SessionEvent::DocumentDelete {
            document_id: self.inner.document_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryDocumentStorage, InMemoryMilestoneStorage};
    use sync_crdt::LwwDoc;
    use sync_pubsub::InMemoryPubSub;

    async fn new_session() -> Session<LwwDoc> {
        Session::open(
            "doc1",
            false,
            Arc::new(InMemoryDocumentStorage::<LwwDoc>::new()),
            Arc::new(InMemoryMilestoneStorage::new()),
            Arc::new(InMemoryPubSub::new()),
            "doc1",
            "node1",
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn opening_a_session_reaches_loaded() {
        let session = new_session().await;
        assert_eq!(session.state(), SessionState::Loaded);
    }

    #[tokio::test]
    async fn sync_step1_replies_only_to_sender_with_two_messages() {
        let session = new_session().await;
        let mut rx = session.join("alice").unwrap();

        let msg = Message::Doc(DocMessage::new(
            "doc1",
            Context {
                client_id: "alice".into(),
                user_id: None,
                room: None,
            },
            false,
            DocPayload::SyncStep1 { sv: vec![] },
        ));
        let outcome = session.ingest(msg, Origin::Client("alice")).await.unwrap();
        assert_eq!(outcome.to_sender.len(), 2);
        assert!(outcome.broadcast.is_none());
        assert!(rx.try_recv().is_err(), "sync-step-1 reply is not fanned out");
    }

    #[tokio::test]
    async fn update_from_client_is_broadcast_to_other_clients_not_the_sender() {
        let session = new_session().await;
        let mut alice_rx = session.join("alice").unwrap();
        let mut bob_rx = session.join("bob").unwrap();

        let mut doc = LwwDoc::new();
        let update = doc.write_local("alice", "hi");

        let msg = Message::Doc(DocMessage::new(
            "doc1",
            Context {
                client_id: "alice".into(),
                user_id: None,
                room: None,
            },
            false,
            DocPayload::Update { update },
        ));
        session.ingest(msg, Origin::Client("alice")).await.unwrap();

        assert!(alice_rx.try_recv().is_err(), "sender does not get its own update back");
        assert!(bob_rx.try_recv().is_ok(), "other client receives the update");
    }

    #[tokio::test]
    async fn duplicate_message_from_pubsub_is_dropped() {
        let session = new_session().await;
        let msg = Message::Awareness(sync_wire::AwarenessMessage::new(
            "doc1",
            Context::default(),
            false,
            sync_wire::AwarenessPayload::Update {
                update: vec![1, 2, 3],
            },
        ));
        let first = session.ingest(msg.clone(), Origin::PubSub).await.unwrap();
        assert!(first.broadcast.is_some());
        let second = session.ingest(msg, Origin::PubSub).await.unwrap();
        assert!(second.broadcast.is_none(), "second delivery via pubsub is a duplicate");
    }

    #[tokio::test]
    async fn encryption_mismatch_is_rejected() {
        let session = new_session().await;
        let msg = Message::Doc(DocMessage::new(
            "doc1",
            Context::default(),
            true,
            DocPayload::SyncStep1 { sv: vec![] },
        ));
        let result = session.ingest(msg, Origin::Client("alice")).await;
        assert!(matches!(result, Err(SessionError::EncryptionStateMismatch)));
    }

    #[tokio::test(start_paused = true)]
    async fn last_client_leaving_arms_drain_then_disposes() {
        let session = new_session().await;
        session.join("alice").unwrap();
        session.leave("alice");
        assert_eq!(session.state(), SessionState::Draining);

        tokio::time::advance(DRAIN_GRACE + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(session.state(), SessionState::Disposed);
        assert!(session.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn rejoin_during_drain_cancels_disposal() {
        let session = new_session().await;
        session.join("alice").unwrap();
        session.leave("alice");
        assert_eq!(session.state(), SessionState::Draining);

        session.join("bob").unwrap();
        assert_eq!(session.state(), SessionState::Loaded);

        tokio::time::advance(DRAIN_GRACE + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(session.state(), SessionState::Loaded, "rejoin cancelled the timer");
    }

    #[tokio::test]
    async fn milestone_create_then_list_round_trips() {
        let session = new_session().await;
        let create = Message::Doc(DocMessage::new(
            "doc1",
            Context {
                client_id: "alice".into(),
                user_id: None,
                room: None,
            },
            false,
            DocPayload::MilestoneCreateReq {
                name: Some("v1".into()),
                snapshot: vec![9, 9],
            },
        ));
        let outcome = session.ingest(create, Origin::Client("alice")).await.unwrap();
        assert_eq!(outcome.to_sender.len(), 1);

        let list = Message::Doc(DocMessage::new(
            "doc1",
            Context::default(),
            false,
            DocPayload::MilestoneListReq {
                snapshot_ids: vec![],
            },
        ));
        let outcome = session.ingest(list, Origin::Client("alice")).await.unwrap();
        match &outcome.to_sender[0] {
            Message::Doc(m) => match &m.payload {
                DocPayload::MilestoneListResp { milestones } => assert_eq!(milestones.len(), 1),
                _ => panic!("expected MilestoneListResp"),
            },
            _ => panic!("expected Doc message"),
        }
    }
}
