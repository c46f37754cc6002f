//! The result of feeding one inbound message through a session (spec §4.G
//! item 3: fan-out excluding the sender, excluding sync-step-1 and its
//! immediate response).

use sync_wire::Message;

/// What a session wants done with one processed inbound message.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Messages to send back to whichever client sent the inbound message.
    pub to_sender: Vec<Message>,
    /// A message to fan out to every other subscribed client.
    pub broadcast: Option<Message>,
    /// Whether `broadcast` (if any) should also be published on the
    /// session's pubsub topic. `false` for messages already arriving
    /// via pubsub (they must not be re-published) and for handshake
    /// replies that never broadcast at all.
    pub publish: bool,
}

impl Outcome {
    /// No reply, no broadcast, no publish — the common case for
    /// messages a session silently ignores (e.g. a stray `Ack`).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Reply only to the sender.
    #[must_use]
    pub fn to_sender_only(messages: Vec<Message>) -> Self {
        Self {
            to_sender: messages,
            broadcast: None,
            publish: false,
        }
    }

    /// Broadcast to everyone else, publishing on pubsub only when the
    /// message originated locally (not itself an echo from pubsub).
    #[must_use]
    pub fn broadcast(message: Message, publish: bool) -> Self {
        Self {
            to_sender: vec![],
            broadcast: Some(message),
            publish,
        }
    }
}
