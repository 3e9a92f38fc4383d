//! Host-facing presentation seams: status line, chat log, render target

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::game::constants::ui::CHAT_LOG_CAPACITY;
use crate::game::state::{EntityPosition, Position};
use crate::game::tiles::TileKind;
use crate::game::world::WorldView;

/// One timestamped line of chat or system output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Host time the line was recorded
    pub at: Duration,
    pub source: String,
    pub text: String,
}

/// Where status text ends up
pub trait StatusSink {
    /// Our own name as assigned by the server
    fn set_name(&mut self, name: &str);
    /// Connection status, e.g. a player count or an error
    fn set_connection_status(&mut self, status: &str);
    /// Append a chat/system line
    fn push_line(&mut self, line: &LogLine);
    /// Input hint for the current mode
    fn set_hint(&mut self, _hint: &str) {}
}

/// Draws the world once per display callback
pub trait RenderTarget {
    fn render(&mut self, world: &WorldView);
}

/// Bounded append-only log; the oldest lines go first
#[derive(Debug, Clone)]
pub struct ChatLog {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::with_capacity(CHAT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(CHAT_LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append a line and mirror it to the sink
    pub fn record<S: StatusSink>(
        &mut self,
        sink: &mut S,
        at: Duration,
        source: impl Into<String>,
        text: impl Into<String>,
    ) {
        let line = LogLine {
            at,
            source: source.into(),
            text: text.into(),
        };
        sink.push_line(&line);
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Status sink that writes to the log
#[derive(Debug, Default)]
pub struct TracingStatus {
    hint: String,
}

impl StatusSink for TracingStatus {
    fn set_name(&mut self, name: &str) {
        info!("You are {}", name);
    }

    fn set_connection_status(&mut self, status: &str) {
        info!("Status: {}", status);
    }

    fn push_line(&mut self, line: &LogLine) {
        info!("[{:>8.1}s] {}: {}", line.at.as_secs_f64(), line.source, line.text);
    }

    fn set_hint(&mut self, hint: &str) {
        if self.hint != hint {
            info!("{}", hint);
            self.hint = hint.to_string();
        }
    }
}

/// What a headless renderer can see of the world
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderSnapshot {
    pub camera: Position,
    pub standing_on: TileKind,
    pub water_depth: i32,
    pub entities: Vec<EntityPosition>,
}

impl RenderSnapshot {
    pub fn capture(world: &WorldView) -> Self {
        let camera = world.camera();
        Self {
            camera,
            standing_on: world.tile_at(camera.x, camera.y),
            water_depth: world.water_depth(camera.x, camera.y),
            entities: world.entities().to_vec(),
        }
    }
}

/// Renderer for hosts without a display: logs a JSON snapshot whenever the
/// visible state changes
#[derive(Debug, Default)]
pub struct SnapshotRenderer {
    last: Option<RenderSnapshot>,
    frames: u64,
}

impl SnapshotRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display callbacks seen so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last(&self) -> Option<&RenderSnapshot> {
        self.last.as_ref()
    }
}

impl RenderTarget for SnapshotRenderer {
    fn render(&mut self, world: &WorldView) {
        self.frames += 1;
        let snapshot = RenderSnapshot::capture(world);
        if self.last.as_ref() == Some(&snapshot) {
            return;
        }
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!(frame = self.frames, "render {}", json),
            Err(e) => tracing::warn!("Failed to serialize render snapshot: {}", e),
        }
        self.last = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Facing;

    #[derive(Default)]
    struct Lines(Vec<LogLine>);

    impl StatusSink for Lines {
        fn set_name(&mut self, _name: &str) {}
        fn set_connection_status(&mut self, _status: &str) {}
        fn push_line(&mut self, line: &LogLine) {
            self.0.push(line.clone());
        }
    }

    #[test]
    fn test_chat_log_mirrors_to_sink() {
        let mut log = ChatLog::new();
        let mut sink = Lines::default();
        log.record(&mut sink, Duration::from_secs(2), "Ra1", "hello");

        assert_eq!(log.len(), 1);
        assert_eq!(sink.0.len(), 1);
        assert_eq!(log.last(), sink.0.last());
        assert_eq!(sink.0[0].source, "Ra1");
        assert_eq!(sink.0[0].at, Duration::from_secs(2));
    }

    #[test]
    fn test_chat_log_bounded() {
        let mut log = ChatLog::with_capacity(2);
        let mut sink = Lines::default();
        for text in ["a", "b", "c"] {
            log.record(&mut sink, Duration::ZERO, "SYSTEM", text);
        }
        let texts: Vec<_> = log.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
        // The sink saw every line
        assert_eq!(sink.0.len(), 3);
    }

    #[test]
    fn test_snapshot_renderer_counts_frames() {
        let mut world = WorldView::new();
        let mut renderer = SnapshotRenderer::new();
        renderer.render(&world);
        renderer.render(&world);
        assert_eq!(renderer.frames(), 2);

        world.upsert_entity(EntityPosition::new("Ra1", 1, 1, Facing::North));
        renderer.render(&world);
        assert_eq!(renderer.last().unwrap().entities.len(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let world = WorldView::new();
        let json = serde_json::to_value(RenderSnapshot::capture(&world)).unwrap();
        assert_eq!(json["camera"]["x"], 127);
        assert_eq!(json["camera"]["facing"], "south");
        assert_eq!(json["standing_on"], "Void");
    }
}
