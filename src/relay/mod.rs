//! Connection registry and message routing.
//!
//! Transports call the four `on_*` hooks on [`Relay`]; everything they send
//! back goes through [`Connection::send`].

mod connection;
mod envelope;
mod notifier;
mod registry;
mod router;

use std::fmt::Display;
use std::sync::Arc;

use tracing::warn;

pub use connection::{ChannelConnection, Connection};
pub use envelope::{Envelope, SystemEvent, SystemEventKind, DIRECTED_KEY, TARGET_KEY};
pub use notifier::LifecycleNotifier;
pub use registry::Registry;
pub use router::{Delivery, MessageRouter};

/// One relay instance: a registry plus the notifier and router sharing it.
pub struct Relay {
    registry: Arc<Registry>,
    notifier: LifecycleNotifier,
    router: MessageRouter,
}

impl Relay {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::new()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            notifier: LifecycleNotifier::new(registry.clone()),
            router: MessageRouter::new(registry.clone()),
            registry,
        }
    }

    pub fn on_connect(&self, conn: Arc<dyn Connection>) {
        self.notifier.connected(conn);
    }

    /// Route one inbound text frame. Malformed frames are logged and dropped;
    /// the sender gets no reply.
    pub fn on_message(&self, raw: &str, from: &str) -> Option<Delivery> {
        match self.router.route(raw, from) {
            Ok(delivery) => Some(delivery),
            Err(e) => {
                warn!(conn_id = %from, error = %e, "dropping malformed message");
                None
            }
        }
    }

    pub fn on_disconnect(&self, id: &str, reason: &str) {
        self.notifier.disconnected(id, reason);
    }

    pub fn on_error(&self, id: &str, cause: &dyn Display) {
        self.notifier.failed(id, cause);
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connect(relay: &Relay, id: &str) -> UnboundedReceiver<String> {
        let (conn, mut rx) = ChannelConnection::new(id);
        relay.on_connect(Arc::new(conn));
        let welcome: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(welcome, json!({"sistema": true, "tipo": "bienvenida", "id": id}));
        rx
    }

    #[test]
    fn test_signaling_session() {
        let relay = Relay::new();
        let mut a = connect(&relay, "A");
        let mut b = connect(&relay, "B");
        assert_eq!(relay.connection_count(), 2);

        let offer = r#"{"webrtc":true,"para":"B","sdp":"offer"}"#;
        assert_eq!(
            relay.on_message(offer, "A"),
            Some(Delivery::Directed { target: "B".into(), delivered: true })
        );
        assert_eq!(b.try_recv().unwrap(), offer);
        assert!(a.try_recv().is_err());

        let chat = r#"{"chat":true,"texto":"hola","nombre":"ana"}"#;
        assert_eq!(relay.on_message(chat, "A"), Some(Delivery::Broadcast { recipients: 2 }));
        assert_eq!(a.try_recv().unwrap(), chat);
        assert_eq!(b.try_recv().unwrap(), chat);

        relay.on_disconnect("B", "going away");
        let left: Value = serde_json::from_str(&a.try_recv().unwrap()).unwrap();
        assert_eq!(left, json!({"sistema": true, "tipo": "usuario_salio", "id": "B"}));
        assert_eq!(relay.connection_count(), 1);
    }

    #[test]
    fn test_malformed_message_does_not_disturb_others() {
        let relay = Relay::new();
        let mut a = connect(&relay, "A");
        let mut b = connect(&relay, "B");

        assert_eq!(relay.on_message("<<garbage>>", "A"), None);
        assert!(a.try_recv().is_err());
        assert!(b.try_recv().is_err());

        assert!(relay.on_message(r#"{"chat":"still here"}"#, "A").is_some());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_error_unregisters_and_notifies() {
        let relay = Relay::new();
        let mut a = connect(&relay, "A");
        let _e = connect(&relay, "E");

        relay.on_error("E", &"protocol violation");

        assert!(relay.registry().lookup("E").is_none());
        let left: Value = serde_json::from_str(&a.try_recv().unwrap()).unwrap();
        assert_eq!(left["tipo"], "usuario_salio");
        assert_eq!(left["id"], "E");
    }
}
