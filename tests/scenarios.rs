//! End-to-end scenarios spanning the wire codec, session fan-out,
//! cross-node pub/sub replication, file transfer, and the encryption
//! envelope, each exercised through nothing lower-level than
//! [`sync_server::Server::handle_client_message`].

use std::sync::Arc;
use std::time::Duration;
use sync_collab_integration_tests::{in_memory_server, update_with_text};
use sync_crdt::{Crdt, LwwDoc};
use sync_crypto::envelope;
use sync_crypto::DocumentKey;
use sync_files::{proof_for, root_of, InMemoryFileStorage, InMemoryTemporaryUploadStorage};
use sync_pubsub::InMemoryPubSub;
use sync_server::{AllowAll, Server, ServerConfig};
use sync_session::storage::DocumentStorage;
use sync_session::{InMemoryDocumentStorage, InMemoryMilestoneStorage};
use sync_wire::doc::{DocPayload, Permission};
use sync_wire::file::FilePayload;
use sync_wire::{Context, ContentId, DocMessage, FileMessage, Message};

fn client(id: &str) -> Context {
    Context {
        client_id: id.to_string(),
        user_id: None,
        room: None,
    }
}

/// Scenario 1: a client opening a document whose storage already holds
/// an update gets `sync-step-2` (the diff it's missing) immediately
/// followed by `sync-step-1` (the server's own state vector), and
/// nothing is broadcast to anyone else.
#[tokio::test]
async fn sync_handshake_replies_with_diff_then_server_state_vector() {
    let storage = Arc::new(InMemoryDocumentStorage::<LwwDoc>::new());
    let update = update_with_text("writerA", "hello");
    storage.write_update("doc1", update.clone());

    let config = ServerConfig::new("node1", Arc::new(AllowAll), Arc::new(InMemoryPubSub::new()));
    let server: Server<LwwDoc, InMemoryTemporaryUploadStorage, InMemoryFileStorage> = Server::new(
        config,
        storage,
        Arc::new(InMemoryMilestoneStorage::new()),
        InMemoryTemporaryUploadStorage::default(),
        InMemoryFileStorage::default(),
    );

    let (_session, mut bystander_rx) = server.join("doc1", false, "bystander").await.unwrap();

    let request = Message::Doc(DocMessage::new(
        "doc1",
        client("clientC"),
        false,
        DocPayload::SyncStep1 { sv: vec![] },
    ));
    let replies = server.handle_client_message("clientC", request).await;

    assert_eq!(replies.len(), 2, "exactly two messages in reply");
    match &replies[0] {
        Message::Doc(m) => {
            let DocPayload::SyncStep2 { update: diff } = &m.payload else {
                panic!("first reply must be sync-step-2");
            };
            let mut scratch = LwwDoc::default();
            scratch.apply(diff, "verify");
            assert_eq!(scratch.text(), "hello");
        }
        _ => panic!("first reply must be a doc message"),
    }
    match &replies[1] {
        Message::Doc(m) => {
            assert!(matches!(m.payload, DocPayload::SyncStep1 { .. }));
        }
        _ => panic!("second reply must be a doc message"),
    }

    assert!(
        bystander_rx.try_recv().is_err(),
        "the handshake never fans out to other joined clients"
    );
}

/// Scenario 2: clients A, B, C share a document on node N1; client D is
/// on node N2, the two nodes sharing one pub/sub fabric. An update from
/// A reaches B and C once each (not A itself), and reaches D exactly
/// once even though N2's re-ingest republishes onto the bus and N1's
/// dedupe cache silently absorbs that echo.
#[tokio::test]
async fn update_fans_out_across_nodes_exactly_once_per_recipient() {
    let pubsub = Arc::new(InMemoryPubSub::new());
    let node1 = in_memory_server("node1", pubsub.clone());
    let node2 = in_memory_server("node2", pubsub.clone());

    let (_session_a, mut rx_a) = node1.join("doc1", false, "A").await.unwrap();
    let (_session_b, mut rx_b) = node1.join("doc1", false, "B").await.unwrap();
    let (_session_c, mut rx_c) = node1.join("doc1", false, "C").await.unwrap();
    let (_session_d, mut rx_d) = node2.join("doc1", false, "D").await.unwrap();

    let update = update_with_text("A", "hi from A");
    let msg = Message::Doc(DocMessage::new(
        "doc1",
        client("A"),
        false,
        DocPayload::Update { update },
    ));
    node1.handle_client_message("A", msg).await;

    // Let node2's pubsub listener task (and node1's dedupe-guarded
    // re-ingest of node2's echo) run.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(rx_a.try_recv().is_err(), "sender never receives its own update");
    assert!(rx_b.try_recv().is_ok(), "B receives the update");
    assert!(rx_b.try_recv().is_err(), "B receives it exactly once");
    assert!(rx_c.try_recv().is_ok(), "C receives the update");
    assert!(rx_c.try_recv().is_err(), "C receives it exactly once");
    assert!(rx_d.try_recv().is_ok(), "D receives the update via the shared pubsub fabric");
    assert!(
        rx_d.try_recv().is_err(),
        "D receives it exactly once, even though node2 echoes it back onto the bus"
    );
}

/// Scenario 4: a small single-chunk file uploads, acks, completes, and
/// downloads back out byte-for-byte under its content-addressed
/// permanent ID.
#[tokio::test]
async fn chunked_upload_round_trips_through_download() {
    let server = in_memory_server("node1", Arc::new(InMemoryPubSub::new()));

    let data: Vec<u8> = (1..=10).collect();
    let root = root_of(std::slice::from_ref(&data));
    let permanent_id = ContentId::from_digest(root).to_base64();
    // A spec-literal client picks its upload ID independently of the
    // root it already computed locally — the two must not collide.
    let upload_id = "upload-uuid-1234".to_string();

    let upload = Message::File(FileMessage::new(
        "",
        client("uploader"),
        false,
        FilePayload::Upload {
            encrypted: false,
            file_id: upload_id.clone(),
            expected_root: permanent_id.clone(),
            filename: "test.txt".into(),
            size: data.len() as u64,
            mime_type: "text/plain".into(),
            last_modified: 0,
        },
    ));
    let replies = server.handle_client_message("uploader", upload).await;
    assert!(replies.is_empty(), "a brand-new upload has nothing to resume");

    let proof = proof_for(std::slice::from_ref(&data), 0);
    let part = Message::File(FileMessage::new(
        "",
        client("uploader"),
        false,
        FilePayload::Part {
            file_id: upload_id.clone(),
            chunk_index: 0,
            chunk_data: data.clone(),
            merkle_proof: proof.into_iter().map(|h| h.to_vec()).collect(),
            total_chunks: 1,
            bytes_uploaded: data.len() as u64,
            encrypted: false,
        },
    ));
    let replies = server.handle_client_message("uploader", part).await;
    assert_eq!(replies.len(), 2, "a chunk ack plus the completion auth message");
    assert!(matches!(replies[0], Message::Ack(_)));
    match &replies[1] {
        Message::File(m) => match &m.payload {
            FilePayload::Auth {
                permission,
                file_id: completed_id,
                ..
            } => {
                assert_eq!(*permission, Permission::Allowed);
                assert_eq!(*completed_id, permanent_id);
            }
            _ => panic!("expected a file-auth-message"),
        },
        _ => panic!("expected a file message"),
    }

    let download = Message::File(FileMessage::new(
        "",
        client("downloader"),
        false,
        FilePayload::Download {
            file_id: permanent_id.clone(),
        },
    ));
    let replies = server.handle_client_message("downloader", download).await;
    assert_eq!(replies.len(), 2, "metadata reply plus one chunk");
    match &replies[1] {
        Message::File(m) => match &m.payload {
            FilePayload::Part { chunk_data, .. } => assert_eq!(chunk_data, &data),
            _ => panic!("expected a file-part"),
        },
        _ => panic!("expected a file message"),
    }
}

/// Scenario 5: an upload declaring more than the configured maximum
/// size is denied outright, with no chunk accepted.
#[tokio::test]
async fn oversized_upload_is_denied_with_413() {
    let server = in_memory_server("node1", Arc::new(InMemoryPubSub::new()));

    let upload = Message::File(FileMessage::new(
        "",
        client("uploader"),
        false,
        FilePayload::Upload {
            encrypted: false,
            file_id: "u1".into(),
            expected_root: "irrelevant".into(),
            filename: "huge.bin".into(),
            size: 1_073_741_825,
            mime_type: "application/octet-stream".into(),
            last_modified: 0,
        },
    ));
    let replies = server.handle_client_message("uploader", upload).await;
    assert_eq!(replies.len(), 1);
    match &replies[0] {
        Message::File(m) => match &m.payload {
            FilePayload::Auth {
                permission,
                file_id,
                status_code,
                reason,
            } => {
                assert_eq!(*permission, Permission::Denied);
                assert_eq!(file_id, "u1");
                assert_eq!(*status_code, 413);
                assert_eq!(reason.as_deref(), Some("File exceeds maximum supported size"));
            }
            _ => panic!("expected a file-auth-message"),
        },
        _ => panic!("expected a file message"),
    }
}

/// Scenario 6: two clients sharing a document key exchange an
/// encrypted update; a third client without the key receives the exact
/// same wire bytes but can never recover the plaintext from them.
#[tokio::test]
async fn encrypted_update_round_trips_for_key_holders_only() {
    let key = DocumentKey::generate().unwrap();

    let mut doc = LwwDoc::default();
    let plaintext_update = doc.write_local("alice", "hello");
    let ciphertext = envelope::encrypt_update(&key, &plaintext_update).unwrap();

    // The server only ever stores and forwards the envelope.
    let server = in_memory_server("node1", Arc::new(InMemoryPubSub::new()));

    let (_session, mut bob_rx) = server.join("doc1", true, "bob").await.unwrap();
    let (_session, mut eve_rx) = server.join("doc1", true, "eve").await.unwrap();
    let msg = Message::Doc(DocMessage::new(
        "doc1",
        client("alice"),
        true,
        DocPayload::Update {
            update: ciphertext.clone(),
        },
    ));
    server.handle_client_message("alice", msg).await;

    let forwarded = bob_rx.try_recv().expect("bob receives alice's encrypted update");
    let Message::Doc(forwarded) = forwarded else {
        panic!("expected a doc message");
    };
    let DocPayload::Update {
        update: forwarded_ciphertext,
    } = forwarded.payload
    else {
        panic!("expected an update payload");
    };

    let plaintexts = envelope::decrypt_update(&key, &forwarded_ciphertext).unwrap();
    assert_eq!(plaintexts.len(), 1);
    let mut bob_doc = LwwDoc::default();
    bob_doc.apply(&plaintexts[0], "bob");
    assert_eq!(bob_doc.text(), "hello");

    // Eve gets the identical ciphertext bytes off the wire (the server
    // never distinguishes key holders from anyone else) but has no key.
    let eve_forwarded = eve_rx.try_recv().expect("eve receives the same envelope");
    let Message::Doc(eve_forwarded) = eve_forwarded else {
        panic!("expected a doc message");
    };
    let DocPayload::Update {
        update: eve_ciphertext,
    } = eve_forwarded.payload
    else {
        panic!("expected an update payload");
    };
    assert_eq!(eve_ciphertext, ciphertext, "the server forwards the envelope verbatim");
    assert!(
        envelope::decrypt_update(&DocumentKey::generate().unwrap(), &eve_ciphertext).is_err(),
        "a client without the key cannot recover the plaintext"
    );
}
