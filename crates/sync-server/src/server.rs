//! The server: per-message permission gating, session lookup, and the
//! file-transfer surface, tied together over whatever storage and
//! file-storage backends a deployment supplies (spec §4.H).

use crate::client::ClientRegistry;
use crate::config::ServerConfig;
use crate::permission::{gate_doc, gate_file, Access, Decision, PermissionChecker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sync_crdt::{Crdt, MergeUpdates};
use sync_files::storage::UploadMetadata;
use sync_files::{FileProtocol, FileStorage, TemporaryUploadStorage};
use sync_middleware::Direction;
use sync_session::storage::{DocumentStorage, MilestoneStorage};
use sync_session::{Origin, Session, SessionRegistry};
use sync_wire::doc::{DocPayload, Permission as WirePermission};
use sync_wire::file::FilePayload;
use sync_wire::message::{AwarenessMessage, Context, DocMessage, FileMessage, Message};
use tokio::sync::mpsc;

/// `"{room}/{document}"` when `context.room` is set, else `document`
/// unchanged (spec §4.H multi-tenancy, spec glossary "Namespaced
/// document ID").
#[must_use]
pub fn namespaced(context: &Context, document: &str) -> String {
    match &context.room {
        Some(room) => format!("{room}/{document}"),
        None => document.to_string(),
    }
}

fn file_id_of(payload: &FilePayload) -> &str {
    match payload {
        FilePayload::Download { file_id }
        | FilePayload::Upload { file_id, .. }
        | FilePayload::Part { file_id, .. }
        | FilePayload::Auth { file_id, .. } => file_id,
    }
}

fn deny_file(file_id: &str, context: Context, status_code: u64, reason: String) -> Message {
    Message::File(FileMessage::new(
        "",
        context,
        false,
        FilePayload::Auth {
            permission: WirePermission::Denied,
            file_id: file_id.to_string(),
            status_code,
            reason: Some(reason),
        },
    ))
}

/// Ties together a [`SessionRegistry`], a [`FileProtocol`], the
/// permission gate, and client bookkeeping.
pub struct Server<C, U, F> {
    config: ServerConfig,
    sessions: Arc<SessionRegistry<C>>,
    files: Arc<FileProtocol<U, F>>,
    clients: ClientRegistry,
    accepting: AtomicBool,
}

impl<C, U, F> Server<C, U, F>
where
    C: Crdt + MergeUpdates + Default + Send + Sync + 'static,
    U: TemporaryUploadStorage + Send + Sync + 'static,
    F: FileStorage + Send + Sync + 'static,
{
    /// Build a server over the given storage backends; `config`
    /// supplies the permission checker and pub/sub fabric.
    pub fn new(
        config: ServerConfig,
        document_storage: Arc<dyn DocumentStorage<C>>,
        milestone_storage: Arc<dyn MilestoneStorage>,
        uploads: U,
        files: F,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(
            document_storage,
            milestone_storage,
            Arc::clone(&config.pub_sub),
            config.node_id.clone(),
        ));
        let files = Arc::new(FileProtocol::new(uploads, files, config.max_file_size));
        Self {
            config,
            sessions,
            files,
            clients: ClientRegistry::new(),
            accepting: AtomicBool::new(true),
        }
    }

    fn checker(&self) -> &dyn PermissionChecker {
        self.config.check_permission.as_ref()
    }

    /// Register `client_id` as connected. Returns
    /// [`crate::error::ServerError::ShuttingDown`] if the server has
    /// already begun draining.
    pub fn connect(&self, client_id: &str) -> crate::error::Result<()> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(crate::error::ServerError::ShuttingDown);
        }
        self.clients.connect(client_id);
        Ok(())
    }

    /// Mark `client_id` as disconnected. Does not leave any sessions
    /// it joined — callers are responsible for calling
    /// [`Session::leave`] on every document-scoped session first.
    pub fn disconnect(&self, client_id: &str) {
        self.clients.disconnect(client_id);
    }

    /// Join `document_id` (room-namespaced already) as `client_id`,
    /// opening its session if necessary.
    pub async fn join(
        &self,
        document_id: &str,
        encrypted: bool,
        client_id: &str,
    ) -> crate::error::Result<(Session<C>, mpsc::Receiver<Message>)> {
        let session = self.sessions.get_or_open(document_id, encrypted).await?;
        let rx = session.join(client_id)?;
        Ok((session, rx))
    }

    /// Route one inbound message from `client_id` through the
    /// permission gate and into its session (or the file protocol),
    /// returning the messages to send back to that same client.
    pub async fn handle_client_message(&self, client_id: &str, msg: Message) -> Vec<Message> {
        match msg {
            Message::Ack(_) => Vec::new(),
            Message::Doc(doc_msg) => self.handle_doc(client_id, doc_msg).await,
            Message::Awareness(aw_msg) => self.handle_awareness(client_id, aw_msg).await,
            Message::File(file_msg) => self.handle_file(file_msg).await,
        }
    }

    async fn handle_doc(&self, client_id: &str, msg: DocMessage) -> Vec<Message> {
        let document_id = namespaced(&msg.context, &msg.document);
        match gate_doc(self.checker(), &document_id, &msg).await {
            Decision::Allow => {}
            Decision::DropWithSyncDone => {
                return vec![Message::Doc(DocMessage::new(
                    msg.document,
                    msg.context,
                    msg.encrypted,
                    DocPayload::SyncDone,
                ))];
            }
            Decision::DenyDoc { reason } => {
                return vec![Message::Doc(DocMessage::new(
                    msg.document,
                    msg.context,
                    msg.encrypted,
                    DocPayload::AuthMessage {
                        permission: WirePermission::Denied,
                        reason,
                    },
                ))];
            }
            Decision::DenyFile { .. } => unreachable!("gate_doc never returns a file decision"),
        }

        let encrypted = msg.encrypted;
        let session = match self.sessions.get_or_open(&document_id, encrypted).await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(%document_id, %error, "failed to open session for doc message");
                return Vec::new();
            }
        };
        match session
            .ingest(Message::Doc(msg), Origin::Client(client_id))
            .await
        {
            Ok(outcome) => outcome.to_sender,
            Err(error) => {
                tracing::warn!(%document_id, %error, "session rejected doc message");
                Vec::new()
            }
        }
    }

    async fn handle_awareness(&self, client_id: &str, msg: AwarenessMessage) -> Vec<Message> {
        let document_id = namespaced(&msg.context, &msg.document);
        if !self
            .checker()
            .check(&msg.context, &document_id, Access::Read)
            .await
        {
            tracing::debug!(%document_id, "dropped unauthorized awareness message");
            return Vec::new();
        }
        let session = match self.sessions.get_or_open(&document_id, msg.encrypted).await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(%document_id, %error, "failed to open session for awareness message");
                return Vec::new();
            }
        };
        match session
            .ingest(Message::Awareness(msg), Origin::Client(client_id))
            .await
        {
            Ok(outcome) => outcome.to_sender,
            Err(error) => {
                tracing::warn!(%document_id, %error, "session rejected awareness message");
                Vec::new()
            }
        }
    }

    async fn handle_file(&self, msg: FileMessage) -> Vec<Message> {
        let file_id = file_id_of(&msg.payload).to_string();
        match gate_file(self.checker(), &file_id, &msg, Direction::Inbound).await {
            Decision::Allow => {}
            Decision::DenyFile {
                status_code,
                reason,
            } => return vec![deny_file(&file_id, msg.context, status_code, reason)],
            _ => unreachable!("gate_file never returns a doc decision"),
        }

        match msg.payload {
            FilePayload::Download { file_id } => match self.files.handle_download_request(&file_id) {
                Ok(messages) => messages,
                Err(error) => vec![deny_file(&file_id, msg.context, 404, error.to_string())],
            },
            FilePayload::Upload {
                encrypted,
                file_id,
                expected_root,
                filename,
                size,
                mime_type,
                last_modified,
            } => {
                let chunk_size = if encrypted {
                    sync_crypto::ENCRYPTED_CHUNK_SIZE
                } else {
                    sync_files::DEFAULT_CHUNK_SIZE
                };
                let total_chunks = size.div_ceil(chunk_size as u64).max(1);
                self.files.handle_upload_request(
                    msg.context,
                    &file_id,
                    UploadMetadata {
                        filename,
                        size,
                        mime_type,
                        last_modified,
                        encrypted,
                        expected_root,
                    },
                    total_chunks,
                )
            }
            FilePayload::Part {
                file_id,
                chunk_index,
                chunk_data,
                merkle_proof,
                total_chunks,
                bytes_uploaded,
                encrypted,
            } => {
                // The root every chunk's proof is checked against comes
                // from the upload's own committed `expected_root` (set
                // at `handle_upload_request` time), not from this
                // message — `file_id` here is only the upload UUID.
                let ack = match self.files.handle_chunk(
                    msg.context.clone(),
                    &file_id,
                    chunk_index,
                    chunk_data,
                    merkle_proof,
                    total_chunks,
                    bytes_uploaded,
                    encrypted,
                ) {
                    Ok(ack) => ack,
                    Err(error) => {
                        return vec![deny_file(&file_id, msg.context, 400, error.to_string())]
                    }
                };
                let mut replies = vec![ack];
                if chunk_index + 1 == total_chunks {
                    match self.files.complete_upload(&file_id) {
                        Ok(permanent_id) => replies.push(Message::File(FileMessage::new(
                            "",
                            msg.context,
                            false,
                            FilePayload::Auth {
                                permission: WirePermission::Allowed,
                                file_id: permanent_id,
                                status_code: 200,
                                reason: None,
                            },
                        ))),
                        Err(error) => {
                            replies.push(deny_file(&file_id, msg.context, 500, error.to_string()));
                        }
                    }
                }
                replies
            }
            FilePayload::Auth { .. } => Vec::new(),
        }
    }

    /// Graceful shutdown (spec §4.H): stop accepting new clients,
    /// let every session drain and dispose, then report done.
    pub async fn shutdown(&self) {
        tracing::info!(node_id = %self.config.node_id, "before-server-shutdown");
        self.accepting.store(false, Ordering::SeqCst);
        self.sessions.reap_disposed();
        tracing::info!(node_id = %self.config.node_id, "after-server-shutdown");
    }

    /// Whether the server is still accepting new client connections.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Number of currently connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}
