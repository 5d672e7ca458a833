use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use super::Connection;

/// Concurrent map of connection id to live connection.
///
/// Backed by a sharded lock, so register/unregister/lookup on different
/// connections proceed in parallel and never need a global lock.
#[derive(Default)]
pub struct Registry {
    connections: DashMap<String, Arc<dyn Connection>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id -> conn`. An id already present keeps its original
    /// connection; the transport hands out unique ids so this only fires on a
    /// transport bug.
    pub fn register(&self, id: &str, conn: Arc<dyn Connection>) {
        match self.connections.entry(id.to_owned()) {
            Entry::Occupied(_) => {
                warn!(conn_id = %id, "connection id already registered, ignoring duplicate");
            }
            Entry::Vacant(slot) => {
                slot.insert(conn);
                info!(conn_id = %id, "registered connection");
            }
        }
    }

    /// Remove `id` if present. Returns whether an entry was removed; removing
    /// an absent id is not an error.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            info!(conn_id = %id, "unregistered connection");
        }
        removed
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Connection>> {
        self.connections.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Point-in-time copy of every registered connection.
    ///
    /// Shard locks are released before this returns, so callers may send to
    /// the snapshot while other tasks keep mutating the registry.
    pub fn snapshot(&self) -> Vec<Arc<dyn Connection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
