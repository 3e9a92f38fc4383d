//! Transport seam between the session manager and the network
//!
//! The session manager only ever calls [`Transport`]; whatever actually moves
//! bytes reports back through [`TransportEvent`]s tagged with the
//! [`ConnectionId`] they belong to, delivered on the caller's own queue.

use crate::net::connection::ConnectionId;

/// Transport failures surfaced to the session manager
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection {0} is not open on this transport")]
    NotOpen(ConnectionId),
    #[error("connection {0} writer has shut down")]
    ChannelClosed(ConnectionId),
    #[error("no async runtime available to open {0}")]
    NoRuntime(String),
}

/// Something the transport observed on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened(ConnectionId),
    Message(ConnectionId, Vec<u8>),
    Closed {
        id: ConnectionId,
        code: u16,
        reason: String,
    },
    Error {
        id: ConnectionId,
        detail: String,
    },
}

impl TransportEvent {
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            TransportEvent::Opened(id) | TransportEvent::Message(id, _) => *id,
            TransportEvent::Closed { id, .. } | TransportEvent::Error { id, .. } => *id,
        }
    }
}

/// Minimal message-oriented transport
pub trait Transport {
    /// Start opening a connection; completion is reported as an event
    fn open(&mut self, id: ConnectionId, endpoint: &str) -> Result<(), TransportError>;

    /// Queue one binary frame for delivery
    fn send(&mut self, id: ConnectionId, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Close the connection; unknown ids are ignored
    fn close(&mut self, id: ConnectionId);
}

/// WebSocket transport on tokio-tungstenite
pub mod ws {
    use std::collections::HashMap;

    use futures_util::{SinkExt, StreamExt};
    use tokio::runtime::Handle;
    use tokio::sync::mpsc;
    use tokio_tungstenite::{connect_async, tungstenite::Message};
    use tracing::{debug, info, warn};

    use super::{Transport, TransportError, TransportEvent};
    use crate::net::connection::ConnectionId;

    /// Close code reported when the socket ends without a close frame
    const ABNORMAL_CLOSURE: u16 = 1006;

    enum Outbound {
        Frame(Vec<u8>),
        Close,
    }

    /// Each connection runs in its own task; all of them feed one event channel
    pub struct WsTransport {
        events: mpsc::Sender<TransportEvent>,
        links: HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>,
    }

    impl WsTransport {
        /// Returns the transport and the receiver its events arrive on
        pub fn new(event_capacity: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
            let (events, rx) = mpsc::channel(event_capacity.max(1));
            (
                Self {
                    events,
                    links: HashMap::new(),
                },
                rx,
            )
        }
    }

    impl WsTransport {
        #[cfg(test)]
        pub(crate) fn link_count(&self) -> usize {
            self.links.len()
        }
    }

    impl Transport for WsTransport {
        fn open(&mut self, id: ConnectionId, endpoint: &str) -> Result<(), TransportError> {
            let handle =
                Handle::try_current().map_err(|_| TransportError::NoRuntime(endpoint.to_string()))?;

            // Links whose task has ended are dead weight
            self.links.retain(|_, link| !link.is_closed());

            let (tx, rx) = mpsc::unbounded_channel();
            self.links.insert(id, tx);
            handle.spawn(run_connection(id, endpoint.to_string(), rx, self.events.clone()));
            Ok(())
        }

        fn send(&mut self, id: ConnectionId, bytes: Vec<u8>) -> Result<(), TransportError> {
            let link = self.links.get(&id).ok_or(TransportError::NotOpen(id))?;
            if link.send(Outbound::Frame(bytes)).is_err() {
                // The connection task has ended
                self.links.remove(&id);
                return Err(TransportError::ChannelClosed(id));
            }
            Ok(())
        }

        fn close(&mut self, id: ConnectionId) {
            if let Some(link) = self.links.remove(&id) {
                let _ = link.send(Outbound::Close);
            }
        }
    }

    async fn run_connection(
        id: ConnectionId,
        endpoint: String,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
        events: mpsc::Sender<TransportEvent>,
    ) {
        let ws_stream = match connect_async(endpoint.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                warn!("Failed to connect to {}: {}", endpoint, e);
                let _ = events
                    .send(TransportEvent::Error {
                        id,
                        detail: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        info!("Connected to {} as connection {}", endpoint, id);
        if events.send(TransportEvent::Opened(id)).await.is_err() {
            return;
        }

        let (mut write, mut read) = ws_stream.split();

        let closed = loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Binary(bytes))) => {
                        if events.send(TransportEvent::Message(id, bytes)).await.is_err() {
                            break None;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        if events.send(TransportEvent::Message(id, text.into_bytes())).await.is_err() {
                            break None;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((ABNORMAL_CLOSURE, String::new()));
                        break Some(TransportEvent::Closed { id, code, reason });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        break Some(TransportEvent::Error {
                            id,
                            detail: e.to_string(),
                        });
                    }
                    None => {
                        break Some(TransportEvent::Closed {
                            id,
                            code: ABNORMAL_CLOSURE,
                            reason: String::new(),
                        });
                    }
                },
                cmd = outbound.recv() => match cmd {
                    Some(Outbound::Frame(bytes)) => {
                        if let Err(e) = write.send(Message::Binary(bytes)).await {
                            break Some(TransportEvent::Error {
                                id,
                                detail: e.to_string(),
                            });
                        }
                    }
                    Some(Outbound::Close) | None => {
                        debug!("Closing connection {}", id);
                        let _ = write.send(Message::Close(None)).await;
                        break None;
                    }
                },
            }
        };

        if let Some(event) = closed {
            let _ = events.send(event).await;
        }
    }
}
