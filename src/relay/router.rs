use std::sync::Arc;

use tracing::debug;

use super::{Envelope, Registry};
use crate::error::RelayError;

/// Outcome of routing one inbound message. Informational only; nothing is
/// reported back to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Directed { target: String, delivered: bool },
    Broadcast { recipients: usize },
}

/// Decides where each inbound message goes and forwards the raw text.
pub struct MessageRouter {
    registry: Arc<Registry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn route(&self, raw: &str, from: &str) -> Result<Delivery, RelayError> {
        let delivery = match Envelope::parse(raw)? {
            Envelope::Directed { target, raw } => {
                let delivered = self.unicast(&target, raw);
                Delivery::Directed { target, delivered }
            }
            Envelope::Broadcast { raw } => Delivery::Broadcast {
                recipients: self.broadcast(raw),
            },
        };

        debug!(conn_id = %from, ?delivery, "routed message");
        Ok(delivery)
    }

    /// Unknown or closed targets drop the message silently.
    fn unicast(&self, target: &str, raw: &str) -> bool {
        match self.registry.lookup(target) {
            Some(conn) if conn.is_open() => {
                conn.send(raw);
                true
            }
            _ => false,
        }
    }

    // The sender is part of the snapshot and receives its own broadcast.
    fn broadcast(&self, raw: &str) -> usize {
        let mut recipients = 0;
        for conn in self.registry.snapshot() {
            if conn.is_open() {
                conn.send(raw);
                recipients += 1;
            }
        }
        recipients
    }
}
