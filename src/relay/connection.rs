use tokio::sync::mpsc;

/// A live client session as seen by the relay.
///
/// The transport owns the underlying socket; the relay only needs a stable
/// identifier, an open check and a fire-and-forget `send`. Implementations
/// must make `send` a no-op once the connection is closed.
pub trait Connection: Send + Sync {
    fn id(&self) -> &str;

    fn is_open(&self) -> bool;

    fn send(&self, text: &str);
}

/// In-process connection backed by an unbounded channel.
///
/// The receiving half plays the role of the socket writer; dropping it closes
/// the connection.
#[derive(Debug)]
pub struct ChannelConnection {
    id: String,
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelConnection {
    pub fn new(id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id: id.into(), tx }, rx)
    }
}

impl Connection for ChannelConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, text: &str) {
        // Receiver gone means the connection closed
        let _ = self.tx.send(text.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_connection_delivers_text() {
        let (conn, mut rx) = ChannelConnection::new("a");
        assert_eq!(conn.id(), "a");
        assert!(conn.is_open());

        conn.send("hello");
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_send_after_close_is_noop() {
        let (conn, rx) = ChannelConnection::new("a");
        drop(rx);

        assert!(!conn.is_open());
        conn.send("lost");
    }
}
