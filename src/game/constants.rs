/// Simulation timing constants
pub mod timing {
    /// Simulation steps per second
    pub const TICK_RATE: u32 = 10;
    /// Fixed step interval
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
    /// Display refresh rate the native host emulates
    pub const FRAME_RATE: u32 = 60;
}

/// Networking constants
pub mod net {
    /// Default server endpoint for local development
    pub const DEFAULT_ENDPOINT: &str = "ws://localhost:9001/";
    /// Commands buffered while the connection is still opening
    pub const PENDING_CAPACITY: usize = 64;
}

/// World model constants
pub mod world {
    /// Radius of the neighbourhood scanned for water depth
    pub const DEFAULT_WATER_RADIUS: i32 = 3;
}

/// Chat/status constants
pub mod ui {
    /// Source label for locally generated log lines
    pub const SYSTEM_SOURCE: &str = "SYSTEM";
    /// Lines kept in the chat log before the oldest are discarded
    pub const CHAT_LOG_CAPACITY: usize = 500;
}
