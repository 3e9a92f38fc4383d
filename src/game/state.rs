use serde::{Deserialize, Serialize};

/// Direction a sprite is facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Facing {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Facing::North),
            1 => Some(Facing::East),
            2 => Some(Facing::South),
            3 => Some(Facing::West),
            _ => None,
        }
    }

    /// Unit step in tile coordinates (y grows southwards)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::East => (1, 0),
            Facing::South => (0, 1),
            Facing::West => (-1, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Facing::North => "north",
            Facing::East => "east",
            Facing::South => "south",
            Facing::West => "west",
        }
    }
}

/// A tile coordinate plus facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub facing: Facing,
}

impl Position {
    pub const fn new(x: i32, y: i32, facing: Facing) -> Self {
        Self { x, y, facing }
    }
}

/// Where the local player spawns until the server says otherwise
pub const INITIAL_PLAYER_POS: Position = Position::new(127, 154, Facing::South);

/// Position of a remote (or local) player as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityPosition {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub facing: Facing,
}

impl EntityPosition {
    pub fn new(id: impl Into<String>, x: i32, y: i32, facing: Facing) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            facing,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.facing)
    }
}
