//! WebSocket transport for the relay.
//!
//! Each upgraded HTTP request becomes a [`RelaySession`] actor that forwards
//! connect/message/close/error events to the shared [`crate::relay::Relay`].

mod session;

pub use session::{ActorConnection, Outbound, RelaySession};

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::info;

use crate::AppState;

/// Upgrades the HTTP connection to a WebSocket relay session.
pub async fn websocket_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let peer_addr = req.peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    info!("New WebSocket connection request from: {}", peer_addr);

    let heartbeat = &state.config.heartbeat;
    ws::start(
        RelaySession::new(
            state.relay.clone(),
            peer_addr,
            heartbeat.interval(),
            heartbeat.timeout(),
        ),
        &req,
        stream,
    )
}
