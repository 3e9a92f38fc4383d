//! Static tile-type table and map-source decoding
//!
//! Tile codes are indices into [`TileKind::ALL`]. Map images encode tiles by
//! exact RGB color; anything unrecognised becomes [`TileKind::Void`].

use serde::{Deserialize, Serialize};

use crate::game::world::MapError;

/// Tile types, in wire/code order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    #[default]
    Void,
    Wall,
    Floor,
    Path,
    Water,
    Fountain,
    Grass,
    Bench,
    Tree,
    Rock,
    Gravestone,
    Portal,
    Chicken,
    Key,
    Bag,
    Skull,
    Cross,
    Sheep,
    Money,
    Statue,
    FlowerP,
    FlowerE,
    /// Marker tiles are placed by the server, never decoded from map colors
    Marker,
}

struct TileInfo {
    name: &'static str,
    color: Option<u32>,
    passable: bool,
}

const fn info(name: &'static str, color: u32, passable: bool) -> TileInfo {
    TileInfo {
        name,
        color: Some(color),
        passable,
    }
}

const TABLE: [TileInfo; 23] = [
    info("Void", 0xffffff, false),
    info("Wall", 0xecedf9, false),
    info("Floor", 0xd9dcf3, true),
    info("Path", 0xb4b5bc, true),
    info("Water", 0x5278c5, true),
    info("Fountain", 0x2b4a8b, true),
    info("Grass", 0x35863d, true),
    info("Bench", 0x6b6b6b, true),
    info("Tree", 0x184a1d, false),
    info("Rock", 0x3e3e3e, true),
    info("Gravestone", 0x00ff00, true),
    info("Portal", 0xff0000, true),
    info("Chicken", 0xffdcf3, true),
    info("Key", 0xd9fff3, true),
    info("Bag", 0xc6b1ff, true),
    info("Skull", 0xb1daff, true),
    info("Cross", 0xfcffb1, true),
    info("Sheep", 0xf2f2f2, false),
    info("Money", 0x00af00, true),
    info("Statue", 0x999999, false),
    info("Flower_P", 0xff26db, true),
    info("Flower_E", 0xd2ff1f, true),
    TileInfo {
        name: "Marker",
        color: None,
        passable: true,
    },
];

impl TileKind {
    pub const ALL: [TileKind; 23] = [
        TileKind::Void,
        TileKind::Wall,
        TileKind::Floor,
        TileKind::Path,
        TileKind::Water,
        TileKind::Fountain,
        TileKind::Grass,
        TileKind::Bench,
        TileKind::Tree,
        TileKind::Rock,
        TileKind::Gravestone,
        TileKind::Portal,
        TileKind::Chicken,
        TileKind::Key,
        TileKind::Bag,
        TileKind::Skull,
        TileKind::Cross,
        TileKind::Sheep,
        TileKind::Money,
        TileKind::Statue,
        TileKind::FlowerP,
        TileKind::FlowerE,
        TileKind::Marker,
    ];

    /// Look up a tile code; out-of-range codes map to Void
    pub fn from_code(code: u32) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(TileKind::Void)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Match an 0xRRGGBB color exactly
    pub fn from_rgb(rgb: u32) -> Self {
        Self::ALL
            .iter()
            .zip(TABLE.iter())
            .find(|(_, info)| info.color == Some(rgb & 0x00ff_ffff))
            .map(|(kind, _)| *kind)
            .unwrap_or(TileKind::Void)
    }

    pub fn name(self) -> &'static str {
        TABLE[self as usize].name
    }

    pub fn color(self) -> Option<u32> {
        TABLE[self as usize].color
    }

    pub fn is_passable(self) -> bool {
        TABLE[self as usize].passable
    }

    /// Player sprites sink into these
    pub fn is_water(self) -> bool {
        matches!(self, TileKind::Water | TileKind::Fountain)
    }
}

/// Convert a canvas pixel (little-endian RGBA bytes read as u32, i.e. ABGR) to 0xRRGGBB
pub fn abgr_to_rgb(abgr: u32) -> u32 {
    ((abgr & 0xff) << 16) | (abgr & 0xff00) | ((abgr >> 16) & 0xff)
}

/// Decoded tile-code grid from an external map source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<u32>,
}

impl TileGrid {
    /// Build from image pixels in canvas (ABGR) order
    pub fn from_pixels(width: usize, height: usize, abgr: &[u32]) -> Self {
        Self {
            width,
            height,
            cells: abgr
                .iter()
                .map(|&pixel| TileKind::from_rgb(abgr_to_rgb(pixel)).code())
                .collect(),
        }
    }
}

/// Parse the plain-text grid format: a `width height` header, then
/// `width * height` whitespace-separated tile codes in row-major order.
pub fn parse_grid(text: &str) -> Result<TileGrid, MapError> {
    let mut tokens = text.split_whitespace();

    let mut dimension = |name: &'static str| -> Result<usize, MapError> {
        let token = tokens.next().ok_or(MapError::MissingHeader)?;
        token.parse().map_err(|_| MapError::BadToken {
            token: token.to_string(),
            context: name,
        })
    };
    let width = dimension("width")?;
    let height = dimension("height")?;

    let cells = tokens
        .map(|token| {
            token.parse::<u32>().map_err(|_| MapError::BadToken {
                token: token.to_string(),
                context: "tile code",
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TileGrid {
        width,
        height,
        cells,
    })
}
