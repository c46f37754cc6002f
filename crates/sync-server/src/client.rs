//! Tracks which client IDs are currently connected to this node,
//! independent of which document sessions they've joined (spec §4.H:
//! the server holds `clients:map` alongside `sessions:map`).

use dashmap::DashMap;

/// A registry of connected client IDs.
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<String, ()>,
}

impl ClientRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a client as connected.
    pub fn connect(&self, client_id: &str) {
        self.clients.insert(client_id.to_string(), ());
    }

    /// Remove a client (connection closed).
    pub fn disconnect(&self, client_id: &str) {
        self.clients.remove(client_id);
    }

    /// Whether `client_id` is currently connected.
    #[must_use]
    pub fn is_connected(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Number of currently connected clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no clients are currently connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_then_disconnect_round_trips() {
        let registry = ClientRegistry::new();
        registry.connect("alice");
        assert!(registry.is_connected("alice"));
        registry.disconnect("alice");
        assert!(!registry.is_connected("alice"));
    }
}
