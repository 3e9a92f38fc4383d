//! Keyboard routing between movement and chat text entry
//!
//! Exactly one mode is armed at a time and every key event is handled by
//! exactly one of the two handlers. Enter is the only key that switches modes
//! by itself; hosts may also move focus explicitly with [`InputRouter::focus`].

use smallvec::SmallVec;
use tracing::debug;

use crate::game::state::Facing;
use crate::net::protocol::{Command, KeyAction};

/// DOM-style key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const BACKSPACE: KeyCode = KeyCode(8);
    pub const ENTER: KeyCode = KeyCode(13);
    pub const ARROW_LEFT: KeyCode = KeyCode(37);
    pub const ARROW_UP: KeyCode = KeyCode(38);
    pub const ARROW_RIGHT: KeyCode = KeyCode(39);
    pub const ARROW_DOWN: KeyCode = KeyCode(40);
    pub const A: KeyCode = KeyCode('A' as u32);
    pub const D: KeyCode = KeyCode('D' as u32);
    pub const S: KeyCode = KeyCode('S' as u32);
    pub const W: KeyCode = KeyCode('W' as u32);
    pub const SPACE: KeyCode = KeyCode(32);

    /// Codes at or above this carry a character with no DOM key code of its own
    pub const CHAR_BASE: u32 = 0x0001_0000;

    /// Movement direction bound to this key, if any
    pub fn movement(self) -> Option<Facing> {
        match self {
            KeyCode::W | KeyCode::ARROW_UP => Some(Facing::North),
            KeyCode::A | KeyCode::ARROW_LEFT => Some(Facing::West),
            KeyCode::S | KeyCode::ARROW_DOWN => Some(Facing::South),
            KeyCode::D | KeyCode::ARROW_RIGHT => Some(Facing::East),
            _ => None,
        }
    }
}

/// A key event as delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keystroke {
    pub code: KeyCode,
    /// Character produced by the key, if printable
    pub text: Option<char>,
}

impl Keystroke {
    /// Non-printing key
    pub fn code(code: KeyCode) -> Self {
        Self { code, text: None }
    }

    /// Printable key; letters and digits get their DOM key code
    ///
    /// Other characters land above [`KeyCode::CHAR_BASE`] so '%' can never
    /// read as ArrowLeft or '.' as Delete.
    pub fn char(c: char) -> Self {
        let code = if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase() as u32
        } else if c == ' ' {
            KeyCode::SPACE.0
        } else {
            KeyCode::CHAR_BASE + c as u32
        };
        Self {
            code: KeyCode(code),
            text: Some(c),
        }
    }
}

/// Which handler owns raw key events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Movement,
    TextEntry,
}

/// Outcome of routing a single key event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    /// The one handler that received the event
    pub handler: InputMode,
    /// Commands to send, in order
    pub commands: SmallVec<[Command; 2]>,
    /// Host should suppress the key's default effect
    pub prevent_default: bool,
}

impl Routed {
    fn new(handler: InputMode) -> Self {
        Self {
            handler,
            commands: SmallVec::new(),
            prevent_default: false,
        }
    }
}

/// Multiplexes keyboard input between movement and text entry
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    mode: InputMode,
    held: SmallVec<[KeyCode; 8]>,
    line: String,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Text typed so far in text-entry mode
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn held_keys(&self) -> &[KeyCode] {
        &self.held
    }

    /// Route a key press
    pub fn on_key_down(&mut self, key: Keystroke) -> Routed {
        match self.mode {
            InputMode::Movement => {
                let mut routed = Routed::new(InputMode::Movement);
                if key.code == KeyCode::ENTER {
                    routed.commands = self.release_all();
                    self.mode = InputMode::TextEntry;
                    routed.prevent_default = true;
                    debug!("Input mode -> text entry");
                    return routed;
                }
                routed.prevent_default = key.code.movement().is_some();
                // Auto-repeat is not a transition
                if !self.held.contains(&key.code) {
                    self.held.push(key.code);
                    routed.commands.push(Command::Input {
                        action: KeyAction::Press,
                        key: key.code,
                    });
                }
                routed
            }
            InputMode::TextEntry => {
                let mut routed = Routed::new(InputMode::TextEntry);
                match key.code {
                    KeyCode::ENTER => {
                        let line = std::mem::take(&mut self.line);
                        routed.commands.extend(self.submit_text(&line));
                        routed.prevent_default = true;
                    }
                    KeyCode::BACKSPACE => {
                        self.line.pop();
                    }
                    _ => {
                        if let Some(c) = key.text.filter(|c| !c.is_control()) {
                            self.line.push(c);
                        }
                    }
                }
                routed
            }
        }
    }

    /// Route a key release
    pub fn on_key_up(&mut self, key: Keystroke) -> Routed {
        let mut routed = Routed::new(self.mode);
        if self.mode == InputMode::Movement {
            if let Some(i) = self.held.iter().position(|k| *k == key.code) {
                self.held.remove(i);
                routed.commands.push(Command::Input {
                    action: KeyAction::Release,
                    key: key.code,
                });
            }
            routed.prevent_default = key.code.movement().is_some();
        }
        routed
    }

    /// Submit a line of chat; always clears the buffer and returns to movement
    pub fn submit_text(&mut self, line: &str) -> Option<Command> {
        self.line.clear();
        self.mode = InputMode::Movement;
        let text = line.trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            None
        } else {
            Some(Command::Chat {
                text: text.to_string(),
            })
        }
    }

    /// Explicit focus transfer; returns release commands for keys still held
    pub fn focus(&mut self, mode: InputMode) -> SmallVec<[Command; 2]> {
        if mode == self.mode {
            return SmallVec::new();
        }
        let released = match self.mode {
            InputMode::Movement => self.release_all(),
            InputMode::TextEntry => {
                self.line.clear();
                SmallVec::new()
            }
        };
        self.mode = mode;
        released
    }

    fn release_all(&mut self) -> SmallVec<[Command; 2]> {
        self.held
            .drain(..)
            .map(|key| Command::Input {
                action: KeyAction::Release,
                key,
            })
            .collect()
    }

    /// Net movement from held keys, each axis clamped to [-1, 1]
    ///
    /// Holding A and Left together still moves one tile.
    pub fn movement_delta(&self) -> (i32, i32) {
        let (mut dx, mut dy) = (0i32, 0i32);
        let mut seen: SmallVec<[Facing; 4]> = SmallVec::new();
        for facing in self.held.iter().filter_map(|k| k.movement()) {
            if seen.contains(&facing) {
                continue;
            }
            seen.push(facing);
            let (x, y) = facing.delta();
            dx += x;
            dy += y;
        }
        (dx.clamp(-1, 1), dy.clamp(-1, 1))
    }

    /// Direction of the most recently pressed movement key still held
    pub fn facing(&self) -> Option<Facing> {
        self.held.iter().rev().find_map(|k| k.movement())
    }

    /// Status-line hint for the current mode
    pub fn hint(&self) -> &'static str {
        match self.mode {
            InputMode::Movement => "WASD or arrow keys to move; Enter to chat",
            InputMode::TextEntry => "Enter text to chat",
        }
    }
}
