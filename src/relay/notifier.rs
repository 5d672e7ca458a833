use std::fmt::Display;
use std::sync::Arc;

use tracing::{info, warn};

use super::{Connection, Registry, SystemEvent};

/// Registers and unregisters connections and tells peers about it.
pub struct LifecycleNotifier {
    registry: Arc<Registry>,
}

impl LifecycleNotifier {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Register `conn` and greet it with its own id. The greeting goes to the
    /// new connection only.
    pub fn connected(&self, conn: Arc<dyn Connection>) {
        let id = conn.id().to_owned();
        self.registry.register(&id, Arc::clone(&conn));

        conn.send(&SystemEvent::welcome(&id).to_json());
        info!(conn_id = %id, connections = self.registry.len(), "connection established");
    }

    /// Graceful close. Returns how many peers were told.
    pub fn disconnected(&self, id: &str, reason: &str) -> usize {
        let notified = self.depart(id);
        info!(conn_id = %id, reason, notified, "connection closed");
        notified
    }

    /// Transport fault. Peers see the same notification as for a close.
    pub fn failed(&self, id: &str, cause: &dyn Display) -> usize {
        let notified = self.depart(id);
        warn!(conn_id = %id, error = %cause, notified, "connection failed");
        notified
    }

    fn depart(&self, id: &str) -> usize {
        // Unregister before the snapshot so the departing connection is not
        // among the recipients.
        self.registry.unregister(id);

        let json = SystemEvent::peer_left(id).to_json();

        let mut notified = 0;
        for peer in self.registry.snapshot() {
            if peer.is_open() {
                peer.send(&json);
                notified += 1;
            }
        }
        notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::ChannelConnection;
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn join(
        notifier: &LifecycleNotifier,
        id: &str,
    ) -> UnboundedReceiver<String> {
        let (conn, rx) = ChannelConnection::new(id);
        notifier.connected(Arc::new(conn));
        rx
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    #[test]
    fn test_welcome_goes_only_to_new_connection() {
        let registry = Arc::new(Registry::new());
        let notifier = LifecycleNotifier::new(registry.clone());

        let mut a = join(&notifier, "A");
        assert_eq!(drain(&mut a), vec![json!({"sistema": true, "tipo": "bienvenida", "id": "A"})]);

        let mut x = join(&notifier, "X");
        assert_eq!(drain(&mut x), vec![json!({"sistema": true, "tipo": "bienvenida", "id": "X"})]);
        assert!(drain(&mut a).is_empty());
        assert!(registry.lookup("X").is_some());
    }

    #[test]
    fn test_disconnect_notifies_remaining_peers() {
        let registry = Arc::new(Registry::new());
        let notifier = LifecycleNotifier::new(registry.clone());
        let mut a = join(&notifier, "A");
        let mut b = join(&notifier, "B");
        let mut y = join(&notifier, "Y");
        drain(&mut a);
        drain(&mut b);
        drain(&mut y);

        let notified = notifier.disconnected("Y", "client closed tab");

        assert_eq!(notified, 2);
        assert!(registry.lookup("Y").is_none());
        let expected = json!({"sistema": true, "tipo": "usuario_salio", "id": "Y"});
        assert_eq!(drain(&mut a), vec![expected.clone()]);
        assert_eq!(drain(&mut b), vec![expected]);
        assert!(drain(&mut y).is_empty());
    }

    #[test]
    fn test_error_and_disconnect_fan_out_identically() {
        let registry = Arc::new(Registry::new());
        let notifier = LifecycleNotifier::new(registry.clone());
        let mut a = join(&notifier, "A");
        drain(&mut a);

        let _y = join(&notifier, "Y");
        notifier.disconnected("Y", "normal closure");
        let on_close = drain(&mut a);

        let _y = join(&notifier, "Y");
        notifier.failed("Y", &"connection reset by peer");
        let on_error = drain(&mut a);

        assert_eq!(on_close.len(), 1);
        assert_eq!(on_close, on_error);
    }

    #[test]
    fn test_closed_peers_are_skipped() {
        let registry = Arc::new(Registry::new());
        let notifier = LifecycleNotifier::new(registry.clone());
        let mut a = join(&notifier, "A");
        let closed = join(&notifier, "C");
        drop(closed);
        drain(&mut a);

        assert_eq!(notifier.disconnected("Y", "gone"), 1);
        assert_eq!(drain(&mut a).len(), 1);
    }

    #[test]
    fn test_repeated_departure_is_harmless() {
        let registry = Arc::new(Registry::new());
        let notifier = LifecycleNotifier::new(registry.clone());
        let _a = join(&notifier, "A");
        let _y = join(&notifier, "Y");

        notifier.failed("Y", &"protocol error");
        notifier.disconnected("Y", "closed after error");

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("Y").is_none());
    }
}
