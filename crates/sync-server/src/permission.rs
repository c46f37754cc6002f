//! Permission gate (spec §4.H): every inbound message is checked
//! against `read`/`write` access on its resource before a session (or
//! the file protocol) ever sees it. Denials don't tear the connection
//! down; each category has its own "here's what to send back instead"
//! rule.

use async_trait::async_trait;
use sync_middleware::Direction;
use sync_wire::doc::DocPayload;
use sync_wire::file::FilePayload;
use sync_wire::{Context, DocMessage, FileMessage};

/// Read vs write access to a document or file resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// May observe the resource's current state.
    Read,
    /// May mutate the resource.
    Write,
}

/// Consulted by the permission gate for every access decision.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Whether `context` may exercise `access` on `resource_id`
    /// (a namespaced document ID, or a file ID).
    async fn check(&self, context: &Context, resource_id: &str, access: Access) -> bool;
}

/// A checker that allows every request — the default for
/// single-tenant or development deployments.
pub struct AllowAll;

#[async_trait]
impl PermissionChecker for AllowAll {
    async fn check(&self, _context: &Context, _resource_id: &str, _access: Access) -> bool {
        true
    }
}

/// What the server does with a message after the gate runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Allowed; process normally.
    Allow,
    /// `sync-step-2` denied for lack of `write`: drop the payload but
    /// still reply `sync-done`, so the client's handshake completes
    /// without its write landing (spec §4.H, §4.I open question 1).
    DropWithSyncDone,
    /// Denied; reply with a doc-level `auth-message`.
    DenyDoc {
        /// Reason to report back to the client.
        reason: String,
    },
    /// Denied; reply with a file-level `file-auth-message` carrying an
    /// HTTP-style status code.
    DenyFile {
        /// HTTP-style status (403 for write-denied, 404 for read-denied).
        status_code: u64,
        /// Reason to report back to the client.
        reason: String,
    },
}

fn doc_required_access(payload: &DocPayload) -> Access {
    match payload {
        DocPayload::SyncStep2 { .. }
        | DocPayload::Update { .. }
        | DocPayload::MilestoneCreateReq { .. }
        | DocPayload::MilestoneRenameReq { .. }
        | DocPayload::MilestoneSoftDeleteReq { .. }
        | DocPayload::MilestoneRestoreReq { .. } => Access::Write,
        _ => Access::Read,
    }
}

/// Gate an inbound `DocMessage` against `document_id` (already
/// namespaced per spec §4.H's `"{room}/{document}"` rule).
pub async fn gate_doc(
    checker: &dyn PermissionChecker,
    document_id: &str,
    msg: &DocMessage,
) -> Decision {
    let access = doc_required_access(&msg.payload);
    if checker.check(&msg.context, document_id, access).await {
        return Decision::Allow;
    }
    if matches!(msg.payload, DocPayload::SyncStep2 { .. }) {
        return Decision::DropWithSyncDone;
    }
    Decision::DenyDoc {
        reason: format!("{access:?} access denied for document {document_id}"),
    }
}

fn file_required_access(payload: &FilePayload, direction: Direction) -> Option<Access> {
    match (payload, direction) {
        (FilePayload::Download { .. }, _) => Some(Access::Read),
        (FilePayload::Upload { .. }, _) => Some(Access::Write),
        (FilePayload::Part { .. }, Direction::Inbound) => Some(Access::Write),
        (FilePayload::Part { .. }, Direction::Outbound) => Some(Access::Read),
        (FilePayload::Auth { .. }, _) => None,
    }
}

/// Gate a `FileMessage` travelling in `direction` against `file_id`.
pub async fn gate_file(
    checker: &dyn PermissionChecker,
    file_id: &str,
    msg: &FileMessage,
    direction: Direction,
) -> Decision {
    let Some(access) = file_required_access(&msg.payload, direction) else {
        return Decision::Allow;
    };
    if checker.check(&msg.context, file_id, access).await {
        return Decision::Allow;
    }
    let status_code = match access {
        Access::Write => 403,
        Access::Read => 404,
    };
    Decision::DenyFile {
        status_code,
        reason: format!("{access:?} access denied for file {file_id}"),
    }
}
