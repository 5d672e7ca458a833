use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::web::BytesMut;
use actix_web_actors::ws;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::relay::{Connection, Relay};

/// Text pushed to a session from anywhere in the process.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Outbound(pub String);

/// [`Connection`] handle for a live [`RelaySession`] actor.
///
/// Wraps the actor's mailbox; once the session stops the mailbox reports
/// disconnected and sends are silently dropped.
pub struct ActorConnection {
    id: String,
    recipient: Recipient<Outbound>,
}

impl ActorConnection {
    pub fn new(id: String, recipient: Recipient<Outbound>) -> Self {
        Self { id, recipient }
    }
}

impl Connection for ActorConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.recipient.connected()
    }

    fn send(&self, text: &str) {
        self.recipient.do_send(Outbound(text.to_owned()));
    }
}

/// How the session ended, recorded before the actor stops.
enum Departure {
    Closed(String),
    Failed,
}

/// A fragmented message still waiting for its last frame.
enum Fragments {
    Text(BytesMut),
    Binary,
}

/// WebSocket session actor bridging one client to the relay.
pub struct RelaySession {
    id: String,
    peer_addr: String,
    relay: Arc<Relay>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
    last_heartbeat: Instant,
    departure: Option<Departure>,
    fragments: Option<Fragments>,
}

impl RelaySession {
    pub fn new(
        relay: Arc<Relay>,
        peer_addr: String,
        heartbeat_interval: Duration,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            peer_addr,
            relay,
            heartbeat_interval,
            heartbeat_timeout,
            last_heartbeat: Instant::now(),
            departure: None,
            fragments: None,
        }
    }

    /// Ping on every interval; stop the session once the client has been
    /// silent for longer than the timeout.
    fn start_heartbeat(&self, ctx: &mut <Self as Actor>::Context) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > act.heartbeat_timeout {
                warn!(conn_id = %act.id, peer = %act.peer_addr, "heartbeat timeout");
                act.departure = Some(Departure::Closed("heartbeat timeout".to_string()));
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Reassemble fragmented frames; a text message is routed once its last
    /// frame arrives.
    fn handle_fragment(&mut self, item: actix_http::ws::Item) {
        match item {
            actix_http::ws::Item::FirstText(data) => {
                if self.fragments.is_some() {
                    warn!(conn_id = %self.id, "unfinished fragmented message discarded");
                }
                self.fragments = Some(Fragments::Text(BytesMut::from(&data[..])));
            }
            actix_http::ws::Item::FirstBinary(_) => {
                self.fragments = Some(Fragments::Binary);
            }
            actix_http::ws::Item::Continue(data) => match self.fragments.as_mut() {
                Some(Fragments::Text(buf)) => buf.extend_from_slice(&data),
                Some(Fragments::Binary) => {}
                None => warn!(conn_id = %self.id, "dropping continuation frame without a first frame"),
            },
            actix_http::ws::Item::Last(data) => match self.fragments.take() {
                Some(Fragments::Text(mut buf)) => {
                    buf.extend_from_slice(&data);
                    match std::str::from_utf8(&buf) {
                        Ok(text) => {
                            self.relay.on_message(text, &self.id);
                        }
                        Err(e) => {
                            warn!(conn_id = %self.id, error = %e, "dropping fragmented message with invalid UTF-8");
                        }
                    }
                }
                Some(Fragments::Binary) => {
                    debug!(conn_id = %self.id, "ignoring fragmented binary message");
                }
                None => warn!(conn_id = %self.id, "dropping final frame without a first frame"),
            },
        }
    }
}

impl Actor for RelaySession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.id, peer = %self.peer_addr, "websocket session started");
        self.start_heartbeat(ctx);

        let conn = ActorConnection::new(self.id.clone(), ctx.address().recipient());
        self.relay.on_connect(Arc::new(conn));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        match self.departure.take() {
            // on_error already unregistered and notified peers
            Some(Departure::Failed) => {}
            Some(Departure::Closed(reason)) => self.relay.on_disconnect(&self.id, &reason),
            None => self.relay.on_disconnect(&self.id, "connection dropped"),
        }
        info!(conn_id = %self.id, peer = %self.peer_addr, "websocket session stopped");
    }
}

impl Handler<Outbound> for RelaySession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RelaySession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        // Any frame proves the client is alive
        self.last_heartbeat = Instant::now();

        match msg {
            Ok(ws::Message::Text(text)) => {
                self.relay.on_message(&text, &self.id);
            }
            Ok(ws::Message::Ping(payload)) => {
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Binary(bin)) => {
                debug!(conn_id = %self.id, bytes = bin.len(), "ignoring binary frame");
            }
            Ok(ws::Message::Close(reason)) => {
                let description = match &reason {
                    Some(r) => format!("{:?}: {}", r.code, r.description.as_deref().unwrap_or("")),
                    None => "closed without reason".to_string(),
                };
                self.departure = Some(Departure::Closed(description));
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(item)) => self.handle_fragment(item),
            Ok(ws::Message::Nop) => {}
            Err(e) => {
                self.relay.on_error(&self.id, &e);
                self.departure = Some(Departure::Failed);
                ctx.stop();
            }
        }
    }
}
