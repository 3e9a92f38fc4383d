use tracing::{debug, info, warn};

use crate::game::constants::net::PENDING_CAPACITY;
use crate::net::connection::{Connection, ConnectionId, ConnectionState};
use crate::net::protocol::{decode, Command, DecodeError, Frame};
use crate::net::transport::{Transport, TransportError, TransportEvent};

/// Status shown when the transport reports an error
pub const FAILED_STATUS: &str = "Error (is the server running?)";

/// What the session manager reports back to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connection opened and pending commands flushed
    Connected(ConnectionId),
    /// A well-formed frame from the server
    Frame(Frame),
    /// A malformed frame was discarded; the session stays up
    Dropped(DecodeError),
    /// Closed by either side
    Closed { code: u16, reason: String },
    /// Transport failed
    Failed { detail: String },
}

impl SessionEvent {
    /// Connection status label for the status sink, for events that change it
    pub fn status(&self) -> Option<&'static str> {
        match self {
            SessionEvent::Connected(_) => Some("connected"),
            SessionEvent::Closed { .. } => Some("no"),
            SessionEvent::Failed { .. } => Some("error"),
            SessionEvent::Frame(_) | SessionEvent::Dropped(_) => None,
        }
    }

    /// Line for the chat log, for events the player should read about
    pub fn system_message(&self) -> Option<String> {
        match self {
            SessionEvent::Closed { code, reason } => Some(format!(
                "Connection closed\n{{code {} reason {}}}",
                code, reason
            )),
            SessionEvent::Failed { .. } => Some(FAILED_STATUS.to_string()),
            SessionEvent::Connected(_) | SessionEvent::Frame(_) | SessionEvent::Dropped(_) => None,
        }
    }
}

/// Owns the single live connection and everything sent or received on it
pub struct SessionManager<T: Transport> {
    transport: T,
    current: Option<Connection>,
    next_id: u64,
    pending_capacity: usize,
    decode_errors: u64,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T) -> Self {
        Self::with_pending_capacity(transport, PENDING_CAPACITY)
    }

    pub fn with_pending_capacity(transport: T, pending_capacity: usize) -> Self {
        Self {
            transport,
            current: None,
            next_id: 1,
            pending_capacity,
            decode_errors: 0,
        }
    }

    /// Open a new connection, superseding any previous one
    ///
    /// If the transport refuses outright, the returned connection is already
    /// Failed and `state()` says so.
    pub fn connect(&mut self, endpoint: &str) -> ConnectionId {
        if let Some(mut old) = self.current.take() {
            let dropped = old.clear_pending();
            // Terminal connections may still hold a transport link
            self.transport.close(old.id);
            debug!(
                "Connection {} superseded ({} pending commands dropped)",
                old.id, dropped
            );
        }

        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        let mut conn = Connection::with_capacity(id, endpoint, self.pending_capacity);

        match self.transport.open(id, endpoint) {
            Ok(()) => info!("Connecting to {} (connection {})", endpoint, id),
            Err(e) => {
                warn!("Transport refused to open {}: {}", endpoint, e);
                conn.state = ConnectionState::Failed;
            }
        }
        self.current = Some(conn);
        id
    }

    /// Send a command, buffering it while the connection is still opening
    ///
    /// Returns `Failed` if the transport rejected the frame.
    pub fn send(&mut self, command: Command) -> Option<SessionEvent> {
        let Some(conn) = self.current.as_mut() else {
            debug!("Dropping {:?}: no connection", command);
            return None;
        };

        let state = conn.state;
        match state {
            ConnectionState::Open => match self.transmit(&command) {
                Ok(()) => None,
                Err(e) => Some(self.fail(e.to_string())),
            },
            ConnectionState::Connecting => {
                conn.enqueue(command);
                None
            }
            ConnectionState::Closed | ConnectionState::Failed => {
                debug!("Dropping {:?}: connection {} is {:?}", command, conn.id, state);
                None
            }
        }
    }

    /// Send anything still pending; a no-op unless the connection is open
    pub fn flush(&mut self) -> Option<SessionEvent> {
        let pending = match self.current.as_mut() {
            Some(conn) if conn.is_open() && conn.pending_len() > 0 => conn.drain_pending(),
            _ => return None,
        };

        for command in &pending {
            if let Err(e) = self.transmit(command) {
                return Some(self.fail(e.to_string()));
            }
        }
        None
    }

    /// Dispatch a transport event to the matching handler
    pub fn handle(&mut self, event: TransportEvent) -> Option<SessionEvent> {
        match event {
            TransportEvent::Opened(id) => self.on_opened(id),
            TransportEvent::Message(id, bytes) => self.on_message(id, &bytes),
            TransportEvent::Closed { id, code, reason } => self.on_closed(id, code, &reason),
            TransportEvent::Error { id, detail } => self.on_error(id, &detail),
        }
    }

    pub fn on_opened(&mut self, id: ConnectionId) -> Option<SessionEvent> {
        let conn = self.live(id)?;
        if conn.state != ConnectionState::Connecting {
            debug!("Ignoring duplicate open for connection {}", id);
            return None;
        }
        conn.state = ConnectionState::Open;
        info!("Connection {} open to {}", id, conn.endpoint);

        match self.flush() {
            Some(failed) => Some(failed),
            None => Some(SessionEvent::Connected(id)),
        }
    }

    pub fn on_message(&mut self, id: ConnectionId, bytes: &[u8]) -> Option<SessionEvent> {
        let conn = self.live(id)?;
        if !conn.is_open() {
            debug!("Ignoring message on connection {} before open", id);
            return None;
        }
        conn.record_received(bytes.len());

        match decode(bytes) {
            Ok(frame) => Some(SessionEvent::Frame(frame)),
            Err(e) => {
                self.decode_errors += 1;
                warn!(
                    "Dropping malformed frame on connection {} ({} bytes): {}",
                    id,
                    bytes.len(),
                    e
                );
                Some(SessionEvent::Dropped(e))
            }
        }
    }

    pub fn on_closed(&mut self, id: ConnectionId, code: u16, reason: &str) -> Option<SessionEvent> {
        let conn = self.live(id)?;
        conn.state = ConnectionState::Closed;
        let dropped = conn.clear_pending();
        info!(
            "Connection {} closed after {:?}: code {} reason {:?} ({} pending dropped)",
            id,
            conn.created_at.elapsed(),
            code,
            reason,
            dropped
        );
        Some(SessionEvent::Closed {
            code,
            reason: reason.to_string(),
        })
    }

    pub fn on_error(&mut self, id: ConnectionId, detail: &str) -> Option<SessionEvent> {
        self.live(id)?;
        Some(self.fail(detail.to_string()))
    }

    /// Close the current connection from our side
    pub fn close(&mut self) {
        if let Some(conn) = self.current.as_mut() {
            if conn.state.is_terminal() {
                return;
            }
            conn.state = ConnectionState::Closed;
            conn.clear_pending();
            self.transport.close(conn.id);
            info!("Connection {} closed locally", conn.id);
        }
    }

    pub fn state(&self) -> Option<ConnectionState> {
        self.current.as_ref().map(|conn| conn.state)
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.current.as_ref()
    }

    /// Frames discarded as malformed over the manager's lifetime
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The current connection, if `id` names it and it is not terminal
    fn live(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        match self.current.as_mut() {
            Some(conn) if conn.id == id && !conn.state.is_terminal() => Some(conn),
            Some(conn) => {
                debug!(
                    "Ignoring event for connection {} (current {} is {:?})",
                    id, conn.id, conn.state
                );
                None
            }
            None => {
                debug!("Ignoring event for connection {}: no connection", id);
                None
            }
        }
    }

    fn transmit(&mut self, command: &Command) -> Result<(), TransportError> {
        let Some(conn) = self.current.as_mut() else {
            return Ok(());
        };
        let bytes = command.encode();
        let len = bytes.len();
        self.transport.send(conn.id, bytes)?;
        conn.record_sent(len);
        Ok(())
    }

    fn fail(&mut self, detail: String) -> SessionEvent {
        if let Some(conn) = self.current.as_mut() {
            conn.state = ConnectionState::Failed;
            let dropped = conn.clear_pending();
            warn!(
                "Connection {} failed: {} ({} pending dropped)",
                conn.id, detail, dropped
            );
        }
        SessionEvent::Failed { detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::KeyCode;
    use crate::game::state::{Facing, Position};
    use crate::net::protocol::{encode, KeyAction};
    use crate::net::transport::recording::RecordingTransport;

    fn chat(text: &str) -> Command {
        Command::Chat {
            text: text.to_string(),
        }
    }

    fn manager() -> SessionManager<RecordingTransport> {
        SessionManager::new(RecordingTransport::default())
    }

    fn sent_frames(manager: &SessionManager<RecordingTransport>) -> Vec<Frame> {
        manager
            .transport()
            .sent
            .iter()
            .map(|(_, bytes)| decode(bytes).unwrap())
            .collect()
    }

    #[test]
    fn test_connect_starts_connecting() {
        let mut manager = manager();
        let id = manager.connect("ws://localhost:9001/");
        assert_eq!(manager.state(), Some(ConnectionState::Connecting));
        assert_eq!(
            manager.transport().opened,
            vec![(id, "ws://localhost:9001/".to_string())]
        );
    }

    #[test]
    fn test_send_before_open_is_flushed_once_in_order() {
        let mut manager = manager();
        let id = manager.connect("ws://test");

        manager.send(chat("one"));
        manager.send(Command::Input {
            action: KeyAction::Press,
            key: KeyCode::W,
        });
        assert!(manager.transport().sent.is_empty());

        assert_eq!(manager.on_opened(id), Some(SessionEvent::Connected(id)));
        assert_eq!(
            sent_frames(&manager),
            vec![
                Frame::ChatLine {
                    text: "one".to_string()
                },
                Frame::InputCommand {
                    action: KeyAction::Press,
                    key: KeyCode::W
                },
            ]
        );

        // Later flushes and a duplicate open send nothing more
        assert_eq!(manager.flush(), None);
        assert_eq!(manager.on_opened(id), None);
        assert_eq!(manager.transport().sent.len(), 2);
        assert_eq!(manager.connection().unwrap().frames_sent, 2);
    }

    #[test]
    fn test_send_when_open_goes_straight_out() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        manager.on_opened(id);
        manager.send(Command::MoveTo(Position::new(1, 2, Facing::North)));
        assert_eq!(
            sent_frames(&manager),
            vec![Frame::MoveTo(Position::new(1, 2, Facing::North))]
        );
    }

    #[test]
    fn test_send_without_connection_is_dropped() {
        let mut manager = manager();
        assert_eq!(manager.send(chat("hi")), None);
        assert!(manager.transport().sent.is_empty());
    }

    #[test]
    fn test_send_after_close_is_dropped() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        manager.on_opened(id);
        manager.on_closed(id, 1000, "bye");

        manager.send(chat("too late"));
        assert!(manager.transport().sent.is_empty());
        assert_eq!(manager.state(), Some(ConnectionState::Closed));
    }

    #[test]
    fn test_close_before_open_drops_pending() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        manager.send(chat("queued"));

        let event = manager.on_closed(id, 1006, "").unwrap();
        assert_eq!(event.status(), Some("no"));
        assert_eq!(
            event.system_message().as_deref(),
            Some("Connection closed\n{code 1006 reason }")
        );
        assert_eq!(manager.connection().unwrap().pending_len(), 0);

        // Closed is terminal
        assert_eq!(manager.on_opened(id), None);
        assert!(manager.transport().sent.is_empty());
    }

    #[test]
    fn test_malformed_frame_keeps_session() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        manager.on_opened(id);

        assert_eq!(
            manager.on_message(id, &[0x42]),
            Some(SessionEvent::Dropped(DecodeError::UnknownTag(0x42)))
        );
        assert_eq!(manager.on_message(id, &[]), Some(SessionEvent::Dropped(DecodeError::Truncated)));
        assert_eq!(manager.decode_errors(), 2);
        assert_eq!(manager.state(), Some(ConnectionState::Open));

        let frame = Frame::ConnectionCount { count: 3 };
        assert_eq!(
            manager.on_message(id, &encode(&frame)),
            Some(SessionEvent::Frame(frame))
        );
        assert_eq!(manager.connection().unwrap().frames_received, 3);
    }

    #[test]
    fn test_error_fails_session() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        manager.send(chat("queued"));

        let event = manager.on_error(id, "connection refused").unwrap();
        assert_eq!(event.status(), Some("error"));
        assert_eq!(event.system_message().as_deref(), Some(FAILED_STATUS));
        assert_eq!(manager.state(), Some(ConnectionState::Failed));
        assert_eq!(manager.connection().unwrap().pending_len(), 0);
    }

    #[test]
    fn test_refused_open_is_failed() {
        let mut manager = SessionManager::new(RecordingTransport {
            refuse_open: true,
            ..Default::default()
        });
        manager.connect("ws://test");
        assert_eq!(manager.state(), Some(ConnectionState::Failed));
        manager.send(chat("dropped"));
        assert_eq!(manager.connection().unwrap().pending_len(), 0);
    }

    #[test]
    fn test_send_failure_fails_session() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        manager.on_opened(id);
        manager.transport_mut().refuse_send = true;

        let event = manager.send(chat("x"));
        assert!(matches!(event, Some(SessionEvent::Failed { .. })));
        assert_eq!(manager.state(), Some(ConnectionState::Failed));
    }

    #[test]
    fn test_pending_overflow_drops_oldest() {
        let mut manager = SessionManager::with_pending_capacity(RecordingTransport::default(), 2);
        let id = manager.connect("ws://test");
        manager.send(chat("a"));
        manager.send(chat("b"));
        manager.send(chat("c"));
        manager.on_opened(id);

        assert_eq!(
            sent_frames(&manager),
            vec![
                Frame::ChatLine {
                    text: "b".to_string()
                },
                Frame::ChatLine {
                    text: "c".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_reconnect_ignores_stale_events() {
        let mut manager = manager();
        let old = manager.connect("ws://test");
        manager.send(chat("stale"));
        let new = manager.connect("ws://test");
        assert_ne!(old, new);
        assert_eq!(manager.transport().closed, vec![old]);

        assert_eq!(manager.on_opened(old), None);
        assert_eq!(manager.on_message(old, &encode(&Frame::ConnectionCount { count: 1 })), None);
        assert_eq!(manager.on_closed(old, 1000, ""), None);
        assert_eq!(manager.state(), Some(ConnectionState::Connecting));

        assert_eq!(manager.on_opened(new), Some(SessionEvent::Connected(new)));
        // The superseded connection's pending command never goes out
        assert!(manager.transport().sent.is_empty());
    }

    #[test]
    fn test_reconnect_after_server_close_releases_old_link() {
        let mut manager = manager();
        let old = manager.connect("ws://test");
        manager.on_opened(old);
        manager.on_closed(old, 1006, "");
        assert!(manager.transport().closed.is_empty());

        let failed = manager.connect("ws://test");
        manager.on_error(failed, "refused");
        let new = manager.connect("ws://test");

        assert_eq!(manager.transport().closed, vec![old, failed]);
        assert_eq!(manager.state(), Some(ConnectionState::Connecting));
        assert_eq!(manager.connection().map(|c| c.id), Some(new));
    }

    #[test]
    fn test_local_close() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        manager.on_opened(id);
        manager.close();
        assert_eq!(manager.state(), Some(ConnectionState::Closed));
        assert_eq!(manager.transport().closed, vec![id]);

        // The transport's own close report arrives afterwards and is ignored
        assert_eq!(manager.on_closed(id, 1000, ""), None);
        manager.close();
        assert_eq!(manager.transport().closed.len(), 1);
    }

    #[test]
    fn test_handle_dispatch() {
        let mut manager = manager();
        let id = manager.connect("ws://test");
        assert_eq!(
            manager.handle(TransportEvent::Opened(id)),
            Some(SessionEvent::Connected(id))
        );
        assert_eq!(
            manager.handle(TransportEvent::Closed {
                id,
                code: 1001,
                reason: "going away".to_string()
            }),
            Some(SessionEvent::Closed {
                code: 1001,
                reason: "going away".to_string()
            })
        );
    }
}
