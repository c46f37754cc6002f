//! Ephemeral presence state: `clientId -> (clock, stateObject)` (spec
//! §4.K). Awareness is merged, never replayed, and never persisted —
//! there is no history, only the latest state per client.

use crate::error::{CrdtError, Result};
use std::collections::HashMap;
use sync_wire::varint;

/// One client's current presence state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    clock: u64,
    state: Vec<u8>,
}

/// The merged awareness state for a document: one entry per client,
/// always the most recent by clock. Never persisted to storage.
#[derive(Debug, Default)]
pub struct AwarenessState {
    entries: HashMap<String, Entry>,
}

impl AwarenessState {
    /// An empty awareness state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set this client's own state, bumping its clock, and return the
    /// encoded update to broadcast.
    pub fn set_local(&mut self, client_id: &str, state: Vec<u8>) -> Vec<u8> {
        let clock = self.entries.get(client_id).map_or(0, |e| e.clock) + 1;
        self.entries
            .insert(client_id.to_string(), Entry { clock, state });
        encode_entries(&[(client_id, &self.entries[client_id])])
    }

    /// Merge an inbound awareness update. Returns the client IDs whose
    /// state actually advanced (stale or duplicate entries are ignored).
    pub fn apply_update(&mut self, update: &[u8]) -> Result<Vec<String>> {
        let mut changed = Vec::new();
        for (client_id, clock, state) in decode_entries(update)? {
            let is_newer = self.entries.get(&client_id).is_none_or(|e| clock > e.clock);
            if is_newer {
                self.entries.insert(client_id.clone(), Entry { clock, state });
                changed.push(client_id);
            }
        }
        Ok(changed)
    }

    /// Remove a client's presence entirely (e.g. on disconnect).
    pub fn remove(&mut self, client_id: &str) {
        self.entries.remove(client_id);
    }

    /// Encode every client's current state as one update, e.g. in
    /// answer to an `awareness-request`.
    #[must_use]
    pub fn encode_all(&self) -> Vec<u8> {
        let pairs: Vec<(&str, &Entry)> = self
            .entries
            .iter()
            .map(|(id, entry)| (id.as_str(), entry))
            .collect();
        encode_entries(&pairs)
    }

    /// The number of clients with known presence state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no client has any known presence state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn encode_entries(entries: &[(&str, &Entry)]) -> Vec<u8> {
    let mut out = Vec::new();
    varint::write_u64(&mut out, entries.len() as u64);
    for (client_id, entry) in entries {
        varint::write_string(&mut out, client_id);
        varint::write_u64(&mut out, entry.clock);
        varint::write_bytes(&mut out, &entry.state);
    }
    out
}

fn decode_entries(buf: &[u8]) -> Result<Vec<(String, u64, Vec<u8>)>> {
    let mut pos = 0usize;
    let count = varint::read_u64(buf, &mut pos).map_err(|_| CrdtError::MalformedUpdate)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let client_id =
            varint::read_string(buf, &mut pos).map_err(|_| CrdtError::InvalidUtf8)?;
        let clock = varint::read_u64(buf, &mut pos).map_err(|_| CrdtError::MalformedUpdate)?;
        let state = varint::read_bytes(buf, &mut pos).map_err(|_| CrdtError::MalformedUpdate)?;
        out.push((client_id, clock, state));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_local_then_encode_all_round_trips() {
        let mut a = AwarenessState::new();
        a.set_local("alice", b"cursor=4".to_vec());

        let mut b = AwarenessState::new();
        let changed = b.apply_update(&a.encode_all()).unwrap();
        assert_eq!(changed, vec!["alice".to_string()]);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn stale_update_is_ignored() {
        let mut a = AwarenessState::new();
        let first = a.set_local("alice", b"v1".to_vec());
        a.set_local("alice", b"v2".to_vec());

        // `first` carries clock 1, but alice is already at clock 2.
        let changed = a.apply_update(&first).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut a = AwarenessState::new();
        a.set_local("alice", b"v1".to_vec());
        assert_eq!(a.len(), 1);
        a.remove("alice");
        assert!(a.is_empty());
    }

    #[test]
    fn merge_never_replays_only_latest_state_kept() {
        let mut a = AwarenessState::new();
        a.set_local("alice", b"v1".to_vec());
        a.set_local("alice", b"v2".to_vec());

        let mut b = AwarenessState::new();
        b.apply_update(&a.encode_all()).unwrap();
        assert_eq!(b.len(), 1);
    }
}
