use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use tracing::warn;

use crate::game::constants::net::PENDING_CAPACITY;
use crate::net::protocol::Command;

/// Identifies one connection attempt; never reused within a session manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport asked to open, not yet confirmed
    Connecting,
    /// Frames flow both ways
    Open,
    /// Closed by either side
    Closed,
    /// Transport reported an error
    Failed,
}

impl ConnectionState {
    /// Closed and Failed never leave
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

/// One logical session to one server endpoint
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub endpoint: String,
    pub state: ConnectionState,
    pub created_at: Instant,
    pending: VecDeque<Command>,
    pending_capacity: usize,
    pub pending_dropped: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
}

impl Connection {
    pub fn new(id: ConnectionId, endpoint: impl Into<String>) -> Self {
        Self::with_capacity(id, endpoint, PENDING_CAPACITY)
    }

    pub fn with_capacity(id: ConnectionId, endpoint: impl Into<String>, pending_capacity: usize) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            state: ConnectionState::Connecting,
            created_at: Instant::now(),
            pending: VecDeque::with_capacity(pending_capacity.min(PENDING_CAPACITY)),
            pending_capacity,
            pending_dropped: 0,
            bytes_sent: 0,
            bytes_received: 0,
            frames_sent: 0,
            frames_received: 0,
        }
    }

    /// Buffer a command until the connection opens; the oldest is dropped on overflow
    pub fn enqueue(&mut self, command: Command) {
        if self.pending_capacity == 0 {
            self.pending_dropped += 1;
            return;
        }
        if self.pending.len() >= self.pending_capacity {
            self.pending.pop_front();
            self.pending_dropped += 1;
            warn!(
                "Pending queue full on connection {} ({} dropped so far)",
                self.id, self.pending_dropped
            );
        }
        self.pending.push_back(command);
    }

    /// Take all pending commands in submission order
    pub fn drain_pending(&mut self) -> Vec<Command> {
        self.pending.drain(..).collect()
    }

    /// Invalidate pending commands, returning how many were discarded
    pub fn clear_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Record bytes sent
    pub fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
        self.frames_sent += 1;
    }

    /// Record bytes received
    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.frames_received += 1;
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }
}
