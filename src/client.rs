//! The client core: one owner for session, input, clock, world and log
//!
//! Every host callback lands here, one at a time, on the host's own queue.
//! Nothing in this module returns an error to the host or panics on bad input.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::game::clock::SimulationClock;
use crate::game::constants::ui::SYSTEM_SOURCE;
use crate::game::input::{InputMode, InputRouter, Keystroke};
use crate::game::state::Position;
use crate::game::tiles::TileGrid;
use crate::game::world::{MapError, WorldView};
use crate::net::connection::ConnectionId;
use crate::net::protocol::{Command, Frame};
use crate::net::session::{SessionEvent, SessionManager};
use crate::net::transport::{Transport, TransportEvent};
use crate::ui::{ChatLog, RenderTarget, StatusSink};

/// Entry points a host drives the client through
pub trait ClientCore {
    /// The transport finished opening connection `id`
    fn connected(&mut self, id: ConnectionId, now: Duration);

    /// One inbound binary frame on connection `id`
    fn handle_message(&mut self, id: ConnectionId, data: &[u8], now: Duration);

    /// Returns true when the host should suppress the key's default effect
    fn handle_keydown(&mut self, key: Keystroke) -> bool;

    /// Returns true when the host should suppress the key's default effect
    fn handle_keyup(&mut self, key: Keystroke) -> bool;

    /// A full line submitted from the host's own text box
    fn handle_text_entry(&mut self, text: &str);

    /// Called on every display refresh
    fn game_loop(&mut self, now: Duration);
}

pub struct GameClient<T: Transport, S: StatusSink, R: RenderTarget> {
    session: SessionManager<T>,
    router: InputRouter,
    clock: SimulationClock,
    world: WorldView,
    chat: ChatLog,
    sink: S,
    renderer: R,
    /// Last position reported to the server
    reported: Position,
    now: Duration,
}

impl<T: Transport, S: StatusSink, R: RenderTarget> GameClient<T, S, R> {
    pub fn new(config: &ClientConfig, transport: T, sink: S, renderer: R, start: Duration) -> Self {
        let world = WorldView::with_water_radius(config.water_radius);
        let mut client = Self {
            session: SessionManager::with_pending_capacity(transport, config.pending_capacity),
            router: InputRouter::new(),
            clock: SimulationClock::new(config.tick_interval(), start),
            reported: world.camera(),
            world,
            chat: ChatLog::new(),
            sink,
            renderer,
            now: start,
        };
        client.sink.set_hint(client.router.hint());
        client
    }

    /// Open a connection to `endpoint`, replacing any current one
    pub fn connect(&mut self, endpoint: &str) -> ConnectionId {
        let id = self.session.connect(endpoint);
        if let Some(state) = self.session.state().filter(|s| s.is_terminal()) {
            debug!("Connection {} is {:?} before opening", id, state);
            self.apply(SessionEvent::Failed {
                detail: format!("could not open {}", endpoint),
            });
        } else {
            self.sink.set_connection_status("connecting");
        }
        id
    }

    /// Close the current connection from our side
    pub fn disconnect(&mut self) {
        self.session.close();
        self.sink.set_connection_status("no");
    }

    /// Feed one event from the transport's queue
    pub fn handle_transport(&mut self, event: TransportEvent, now: Duration) {
        match event {
            TransportEvent::Opened(id) => self.connected(id, now),
            TransportEvent::Message(id, bytes) => self.handle_message(id, &bytes, now),
            other => {
                self.now = now;
                if let Some(event) = self.session.handle(other) {
                    self.apply(event);
                }
            }
        }
    }

    /// Replace the map; on error the previous map stays
    pub fn load_map(&mut self, grid: &TileGrid) -> Result<(), MapError> {
        self.world.load_grid(grid)
    }

    /// Move keyboard focus between movement and the text field
    ///
    /// Leaving movement releases every held key on the wire.
    pub fn focus(&mut self, mode: InputMode) {
        let commands = self.router.focus(mode);
        self.send_all(commands);
        self.sink.set_hint(self.router.hint());
    }

    pub fn world(&self) -> &WorldView {
        &self.world
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        self.session.transport_mut()
    }

    fn send_all(&mut self, commands: impl IntoIterator<Item = Command>) {
        for command in commands {
            if let Some(event) = self.session.send(command) {
                self.apply(event);
            }
        }
    }

    fn apply(&mut self, event: SessionEvent) {
        if let Some(line) = event.system_message() {
            self.chat.record(&mut self.sink, self.now, SYSTEM_SOURCE, line);
        }
        if let Some(status) = event.status() {
            self.sink.set_connection_status(status);
        }

        match event {
            SessionEvent::Connected(id) => info!("Session {} connected", id),
            SessionEvent::Frame(frame) => self.apply_frame(frame),
            // Already logged by the session
            SessionEvent::Dropped(_) => {}
            SessionEvent::Closed { .. } => self.world.clear_entities(),
            SessionEvent::Failed { detail } => {
                debug!("Session failed: {}", detail);
                self.world.clear_entities();
            }
        }
    }

    fn apply_frame(&mut self, frame: Frame) {
        match frame {
            Frame::ConnectedAck { player_id } => {
                info!("Server assigned id {}", player_id);
                self.sink.set_name(&player_id);
                self.world.set_local_id(player_id);
            }
            Frame::EntityUpdate { entities } => {
                self.world.update_entities(entities);
                // The server's view of us wins; don't echo it back
                self.reported = self.world.camera();
            }
            Frame::ChatText { from, text } => {
                self.chat.record(&mut self.sink, self.now, from, text);
            }
            Frame::EntityRemoved { id } => {
                if !self.world.remove_entity(&id) {
                    debug!("Removal of unknown entity {}", id);
                }
            }
            Frame::ConnectionCount { count } => {
                self.sink.set_connection_status(&count.to_string());
            }
            Frame::Error { code, message } => {
                warn!("Server error {}: {}", code, message);
                self.chat.record(
                    &mut self.sink,
                    self.now,
                    SYSTEM_SOURCE,
                    format!("Server error {}: {}", code, message),
                );
            }
            other @ (Frame::InputCommand { .. } | Frame::ChatLine { .. } | Frame::MoveTo(_)) => {
                debug!("Ignoring client-bound {} frame from server", other.kind());
            }
        }
    }

    /// One fixed simulation step
    fn step(&mut self) {
        if self.router.mode() == InputMode::Movement {
            if let Some(facing) = self.router.facing() {
                self.world.face(facing);
            }
            let (dx, dy) = self.router.movement_delta();
            self.world.try_step(dx, dy);
        }

        let camera = self.world.camera();
        if camera != self.reported {
            self.reported = camera;
            self.send_all([Command::MoveTo(camera)]);
        }

        if let Some(event) = self.session.flush() {
            self.apply(event);
        }
        self.sink.set_hint(self.router.hint());
    }
}

impl<T: Transport, S: StatusSink, R: RenderTarget> ClientCore for GameClient<T, S, R> {
    fn connected(&mut self, id: ConnectionId, now: Duration) {
        self.now = now;
        if let Some(event) = self.session.on_opened(id) {
            self.apply(event);
        }
    }

    fn handle_message(&mut self, id: ConnectionId, data: &[u8], now: Duration) {
        self.now = now;
        if let Some(event) = self.session.on_message(id, data) {
            self.apply(event);
        }
    }

    fn handle_keydown(&mut self, key: Keystroke) -> bool {
        let routed = self.router.on_key_down(key);
        if routed.handler == InputMode::Movement && self.router.mode() == InputMode::Movement {
            // Turn immediately; the step itself waits for the next tick
            if let Some(facing) = key.code.movement() {
                self.world.face(facing);
            }
        }
        if routed.handler != self.router.mode() {
            self.sink.set_hint(self.router.hint());
        }
        self.send_all(routed.commands);
        routed.prevent_default
    }

    fn handle_keyup(&mut self, key: Keystroke) -> bool {
        let routed = self.router.on_key_up(key);
        self.send_all(routed.commands);
        routed.prevent_default
    }

    fn handle_text_entry(&mut self, text: &str) {
        let command = self.router.submit_text(text);
        self.send_all(command);
        self.sink.set_hint(self.router.hint());
    }

    fn game_loop(&mut self, now: Duration) {
        self.now = now;
        if self.clock.poll(now) {
            self.step();
        }
        self.renderer.render(&self.world);
    }
}
