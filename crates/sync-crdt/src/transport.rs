//! The document transport bridge (spec §4.D): connects a local CRDT
//! document and its awareness state to `Transport<Message>` semantics.
//!
//! On the sink side: an inbound `sync-step-1` is answered with a
//! `sync-step-2` carrying exactly what the remote is missing; inbound
//! `sync-step-2`/`update` messages are merged into the local document
//! under the `"{clientId}-sync"` origin marker (so a later local-change
//! notification for the same bytes is distinguishable from a genuine
//! local edit); `sync-done` resolves the pending synced future;
//! `auth-message` rejects it with the stated reason. Awareness requests
//! are answered with the full current awareness state.
//!
//! On the source side: local edits and local awareness changes are
//! pushed by the owning code (a session, or a test) through
//! [`DocHandle`], which wraps them as `Message`s and emits them on the
//! transport's outbound channel.

use crate::awareness::AwarenessState;
use crate::traits::Crdt;
use async_trait::async_trait;
use std::sync::Arc;
use sync_crypto::envelope;
use sync_crypto::DocumentKey;
use sync_streams::channel::ChannelSource;
use sync_streams::{Sink, Source, StreamError};
use sync_wire::doc::DocPayload;
use sync_wire::message::{AwarenessMessage, Context, DocMessage};
use sync_wire::{AwarenessPayload, Message};
use tokio::sync::{mpsc, oneshot, Mutex};

const OUTBOUND_CAPACITY: usize = 64;

struct Inner<C: Crdt> {
    document: String,
    own_client_id: String,
    doc: C,
    awareness: AwarenessState,
    /// Present for a document opened under an encrypted session (spec
    /// §4.E). When set, every outbound update/sync-step-2 is sealed
    /// into a faux update list before it leaves, and every inbound one
    /// is opened before it touches `doc`.
    key: Option<DocumentKey>,
    synced: Option<oneshot::Sender<Result<(), String>>>,
    outbound: mpsc::Sender<Message>,
}

impl<C: Crdt> Inner<C> {
    fn sync_origin(&self) -> String {
        format!("{}-sync", self.own_client_id)
    }

    async fn emit(&self, message: Message) {
        if self.outbound.send(message).await.is_err() {
            tracing::debug!(document = %self.document, "doc transport outbound channel closed");
        }
    }

    /// Seal `update` into an envelope if this document is encrypted,
    /// otherwise pass it through unchanged.
    fn seal(&self, update: &[u8]) -> (Vec<u8>, bool) {
        match &self.key {
            Some(key) => match envelope::encrypt_update(key, update) {
                Ok(envelope) => (envelope, true),
                Err(error) => {
                    tracing::warn!(document = %self.document, %error, "failed to seal outbound update, dropping");
                    (Vec::new(), true)
                }
            },
            None => (update.to_vec(), false),
        }
    }

    /// Open `payload` if this document is encrypted, returning each
    /// inner plaintext update in order; passes `payload` through as a
    /// single entry otherwise.
    fn open(&self, payload: &[u8]) -> Vec<Vec<u8>> {
        match &self.key {
            Some(key) => match envelope::decrypt_update(key, payload) {
                Ok(updates) => updates,
                Err(error) => {
                    tracing::warn!(document = %self.document, %error, "failed to open inbound update, dropping");
                    Vec::new()
                }
            },
            None => vec![payload.to_vec()],
        }
    }

    async fn handle_doc(&mut self, payload: DocPayload) {
        match payload {
            DocPayload::SyncStep1 { sv } => {
                let sv = match &self.key {
                    Some(_) => Vec::new(),
                    None => sv,
                };
                let missing = self.doc.diff(&sv);
                let (update, encrypted) = self.seal(&missing);
                let reply = Message::Doc(DocMessage::new(
                    self.document.clone(),
                    Context::local(),
                    encrypted,
                    DocPayload::SyncStep2 { update },
                ));
                self.emit(reply).await;
            }
            DocPayload::SyncStep2 { update } | DocPayload::Update { update } => {
                let origin = self.sync_origin();
                for plaintext in self.open(&update) {
                    self.doc.apply(&plaintext, &origin);
                }
            }
            DocPayload::SyncDone => {
                if let Some(tx) = self.synced.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            DocPayload::AuthMessage { reason, .. } => {
                if let Some(tx) = self.synced.take() {
                    let _ = tx.send(Err(reason));
                }
            }
            // Milestone traffic is handled upstream of this bridge; this
            // transport only speaks the live sync/update vocabulary.
            _ => {}
        }
    }

    async fn handle_awareness(&mut self, payload: AwarenessPayload) {
        match payload {
            AwarenessPayload::Update { update } => {
                let _ = self.awareness.apply_update(&update);
            }
            AwarenessPayload::Request => {
                let update = self.awareness.encode_all();
                let reply = Message::Awareness(AwarenessMessage::new(
                    self.document.clone(),
                    Context::local(),
                    false,
                    AwarenessPayload::Update { update },
                ));
                self.emit(reply).await;
            }
        }
    }
}

/// The receiving half: this peer's own document/awareness changes,
/// ready to broadcast.
pub struct DocSource {
    inner: ChannelSource<Message>,
}

#[async_trait]
impl Source<Message> for DocSource {
    async fn recv(&mut self) -> Result<Option<Message>, StreamError> {
        self.inner.recv().await
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// The sending half: inbound protocol messages to apply to the local
/// document and awareness state.
pub struct DocSink<C: Crdt> {
    inner: Arc<Mutex<Inner<C>>>,
}

#[async_trait]
impl<C: Crdt + 'static> Sink<Message> for DocSink<C> {
    async fn send(&mut self, item: Message) -> Result<(), StreamError> {
        let mut inner = self.inner.lock().await;
        match item {
            Message::Doc(m) if m.document == inner.document => {
                inner.handle_doc(m.payload).await;
            }
            Message::Awareness(m) if m.document == inner.document => {
                inner.handle_awareness(m.payload).await;
            }
            _ => {}
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    fn abort(&mut self, _reason: &'static str) {}
}

/// A handle for the code that owns the local document (a session, or a
/// test) to feed it local changes and await handshake completion.
pub struct DocHandle<C: Crdt> {
    inner: Arc<Mutex<Inner<C>>>,
}

impl<C: Crdt + 'static> DocHandle<C> {
    /// Wrap `update` (already applied to the local document by the
    /// caller) as a message and emit it on the outbound channel. Sealed
    /// into an envelope first if this document is encrypted.
    pub async fn notify_local_update(&self, update: Vec<u8>) {
        let inner = self.inner.lock().await;
        let (update, encrypted) = inner.seal(&update);
        let message = Message::Doc(DocMessage::new(
            inner.document.clone(),
            Context::local(),
            encrypted,
            DocPayload::Update { update },
        ));
        inner.emit(message).await;
    }

    /// Wrap `update` as an awareness change and emit it. Awareness
    /// traffic is never sealed (spec §4.E only names `update` and
    /// `sync-step-2`).
    pub async fn notify_local_awareness(&self, update: Vec<u8>) {
        let inner = self.inner.lock().await;
        let message = Message::Awareness(AwarenessMessage::new(
            inner.document.clone(),
            Context::local(),
            false,
            AwarenessPayload::Update { update },
        ));
        inner.emit(message).await;
    }

    /// Build this side's `sync-step-1`, to kick off a handshake. Its
    /// state vector is replaced with the faux placeholder when
    /// encrypted, since a real state vector would leak document shape.
    pub async fn sync_step1(&self) -> Message {
        let inner = self.inner.lock().await;
        let (sv, encrypted) = match &inner.key {
            Some(_) => (envelope::FAUX_STATE_VECTOR.to_vec(), true),
            None => (inner.doc.state_vector(), false),
        };
        Message::Doc(DocMessage::new(
            inner.document.clone(),
            Context::local(),
            encrypted,
            DocPayload::SyncStep1 { sv },
        ))
    }

    /// Await the outcome of the in-flight handshake: `Ok(())` once
    /// `sync-done` is received, `Err(reason)` if `auth-message` denies it.
    pub async fn wait_synced(&self) -> Result<(), String> {
        let rx = {
            let mut inner = self.inner.lock().await;
            let (tx, rx) = oneshot::channel();
            inner.synced = Some(tx);
            rx
        };
        rx.await.unwrap_or_else(|_| Err("transport dropped".into()))
    }

    /// Run `f` against the current document state. For inspection in
    /// tests and diagnostics; not part of the transport contract.
    pub async fn with_doc<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.doc)
    }
}

/// Build a document transport bridge for `document`, owned locally as
/// `own_client_id`. `key` is `Some` for a document opened under an
/// encrypted session (spec §4.E) — every update/sync-step-2 this side
/// produces or consumes goes through the envelope.
#[must_use]
pub fn new_doc_transport<C: Crdt + 'static>(
    document: impl Into<String>,
    own_client_id: impl Into<String>,
    doc: C,
    key: Option<DocumentKey>,
) -> (DocHandle<C>, DocSource, DocSink<C>) {
    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let inner = Arc::new(Mutex::new(Inner {
        document: document.into(),
        own_client_id: own_client_id.into(),
        doc,
        awareness: AwarenessState::new(),
        key,
        synced: None,
        outbound: tx,
    }));
    (
        DocHandle {
            inner: Arc::clone(&inner),
        },
        DocSource {
            inner: ChannelSource::new(rx),
        },
        DocSink { inner },
    )
}
