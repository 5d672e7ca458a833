//! Wire shapes exchanged over the relay.
//!
//! Inbound envelopes are inspected only far enough to pick a route; the
//! original text is what gets forwarded, so clients see exactly the bytes the
//! sender produced.

use serde_json::{json, Map, Value};

use crate::error::RelayError;

/// Presence of this key marks an envelope as directed.
pub const DIRECTED_KEY: &str = "webrtc";
/// Target connection id of a directed envelope.
pub const TARGET_KEY: &str = "para";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<'a> {
    /// Addressed to a single peer by id.
    Directed { target: String, raw: &'a str },
    Broadcast { raw: &'a str },
}

impl<'a> Envelope<'a> {
    /// Classify a raw text frame. Anything other than a JSON object is
    /// rejected.
    pub fn parse(raw: &'a str) -> Result<Self, RelayError> {
        let fields: Map<String, Value> = serde_json::from_str(raw)?;

        if !fields.contains_key(DIRECTED_KEY) {
            return Ok(Envelope::Broadcast { raw });
        }

        // Strings are taken as-is, everything else by its JSON text; a
        // missing target reads as `null`.
        let target = match fields.get(TARGET_KEY) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => Value::Null.to_string(),
        };

        Ok(Envelope::Directed { target, raw })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventKind {
    /// Sent to a newly connected client, carrying its own id.
    Welcome,
    /// Fanned out to everyone when a client goes away.
    PeerLeft,
}

impl SystemEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemEventKind::Welcome => "bienvenida",
            SystemEventKind::PeerLeft => "usuario_salio",
        }
    }
}

/// Server-originated lifecycle notification.
#[derive(Debug, Clone)]
pub struct SystemEvent<'a> {
    kind: SystemEventKind,
    id: &'a str,
}

impl<'a> SystemEvent<'a> {
    pub fn welcome(id: &'a str) -> Self {
        Self { kind: SystemEventKind::Welcome, id }
    }

    pub fn peer_left(id: &'a str) -> Self {
        Self { kind: SystemEventKind::PeerLeft, id }
    }

    pub fn to_json(&self) -> String {
        json!({
            "sistema": true,
            "tipo": self.kind.as_str(),
            "id": self.id,
        })
        .to_string()
    }
}
