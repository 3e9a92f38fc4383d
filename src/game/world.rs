//! Client-side world model consumed by rendering
//!
//! Holds the tile grid, the remote entity list and the local camera. The grid
//! is only ever replaced wholesale; nothing here mutates individual cells.

use tracing::{debug, info};

use crate::game::constants::world::DEFAULT_WATER_RADIUS;
use crate::game::state::{EntityPosition, Facing, Position, INITIAL_PLAYER_POS};
use crate::game::tiles::{TileGrid, TileKind};

/// Map load failures. A failed load leaves the previous map in place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map dimensions must be non-zero (got {width}x{height})")]
    Empty { width: usize, height: usize },
    #[error("map is {width}x{height} but has {actual} cells")]
    SizeMismatch {
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("map data has no width/height header")]
    MissingHeader,
    #[error("invalid {context} '{token}' in map data")]
    BadToken {
        token: String,
        context: &'static str,
    },
}

/// Tile grid, entities and camera
#[derive(Debug, Clone)]
pub struct WorldView {
    width: usize,
    height: usize,
    tiles: Vec<TileKind>,
    entities: Vec<EntityPosition>,
    camera: Position,
    local_id: Option<String>,
    water_radius: i32,
}

impl WorldView {
    pub fn new() -> Self {
        Self::with_water_radius(DEFAULT_WATER_RADIUS)
    }

    pub fn with_water_radius(water_radius: i32) -> Self {
        Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
            entities: Vec::new(),
            camera: INITIAL_PLAYER_POS,
            local_id: None,
            water_radius: water_radius.max(0),
        }
    }

    /// Replace the whole grid. Out-of-range tile codes become Void.
    pub fn load_map(&mut self, width: usize, height: usize, cells: &[u32]) -> Result<(), MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::Empty { width, height });
        }
        if width.checked_mul(height) != Some(cells.len()) {
            return Err(MapError::SizeMismatch {
                width,
                height,
                actual: cells.len(),
            });
        }

        self.tiles = cells.iter().map(|&code| TileKind::from_code(code)).collect();
        self.width = width;
        self.height = height;
        info!("Map loaded: {}x{}", width, height);
        Ok(())
    }

    /// Load a grid decoded by a map source
    pub fn load_grid(&mut self, grid: &TileGrid) -> Result<(), MapError> {
        self.load_map(grid.width, grid.height, &grid.cells)
    }

    /// Load from canvas image pixels (ABGR), matching tile colors exactly
    pub fn load_map_from_pixels(
        &mut self,
        width: usize,
        height: usize,
        abgr: &[u32],
    ) -> Result<(), MapError> {
        self.load_grid(&TileGrid::from_pixels(width, height, abgr))
    }

    pub fn has_map(&self) -> bool {
        !self.tiles.is_empty()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Tile at a coordinate; Void anywhere outside the grid
    pub fn tile_at(&self, x: i32, y: i32) -> TileKind {
        self.index(x, y)
            .map(|i| self.tiles[i])
            .unwrap_or(TileKind::Void)
    }

    pub fn is_passable(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y).is_passable()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Manhattan distance to the nearest non-water tile, capped at the water radius
    ///
    /// Scans the full square neighbourhood; off-map cells count as land.
    pub fn water_depth(&self, x: i32, y: i32) -> i32 {
        let radius = self.water_radius;
        let mut depth = radius;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let tile = self.tile_at(x.saturating_add(dx), y.saturating_add(dy));
                if !tile.is_water() {
                    depth = depth.min(dx.abs() + dy.abs());
                }
            }
        }
        depth
    }

    pub fn water_radius(&self) -> i32 {
        self.water_radius
    }

    /// Replace the remote entity list wholesale
    ///
    /// The local player's own entry (if any) moves the camera instead of being
    /// listed.
    pub fn update_entities(&mut self, entities: Vec<EntityPosition>) {
        let mut remote = Vec::with_capacity(entities.len());
        for entity in entities {
            if self.is_local(&entity.id) {
                self.set_camera(entity.position());
            } else {
                remote.push(entity);
            }
        }
        debug!("Entity list replaced ({} remote)", remote.len());
        self.entities = remote;
    }

    /// Insert or move one entity
    pub fn upsert_entity(&mut self, entity: EntityPosition) {
        if self.is_local(&entity.id) {
            self.set_camera(entity.position());
            return;
        }
        match self.entities.iter_mut().find(|e| e.id == entity.id) {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
    }

    /// Remove an entity by id; returns whether it was present
    pub fn remove_entity(&mut self, id: &str) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id != id);
        self.entities.len() != before
    }

    pub fn entities(&self) -> &[EntityPosition] {
        &self.entities
    }

    pub fn clear_entities(&mut self) {
        self.entities.clear();
    }

    /// Our own id as assigned by the server
    pub fn set_local_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.entities.retain(|e| e.id != id);
        self.local_id = Some(id);
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    fn is_local(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    pub fn camera(&self) -> Position {
        self.camera
    }

    /// Set the camera, clamped to the map when one is loaded
    pub fn set_camera(&mut self, pos: Position) {
        self.camera = if self.has_map() {
            Position::new(
                pos.x.clamp(0, self.width as i32 - 1),
                pos.y.clamp(0, self.height as i32 - 1),
                pos.facing,
            )
        } else {
            pos
        };
    }

    /// Turn without moving; returns whether the facing changed
    pub fn face(&mut self, facing: Facing) -> bool {
        if self.camera.facing == facing {
            return false;
        }
        self.camera.facing = facing;
        true
    }

    /// Try to step the camera by (dx, dy)
    ///
    /// Movement is clamped to the map and refused onto impassable tiles. With
    /// no map loaded there is nothing to collide with, but a step past the
    /// `i32` range is still refused. Returns whether the position changed.
    pub fn try_step(&mut self, dx: i32, dy: i32) -> bool {
        if dx == 0 && dy == 0 {
            return false;
        }
        let current = self.camera;
        let (Some(x), Some(y)) = (current.x.checked_add(dx), current.y.checked_add(dy)) else {
            debug!("Step from ({}, {}) leaves coordinate range", current.x, current.y);
            return false;
        };
        let mut target = Position::new(x, y, current.facing);
        if self.has_map() {
            target.x = target.x.clamp(0, self.width as i32 - 1);
            target.y = target.y.clamp(0, self.height as i32 - 1);
            if !self.is_passable(target.x, target.y) {
                debug!("Blocked at ({}, {}) by {}", target.x, target.y, self.tile_at(target.x, target.y).name());
                return false;
            }
        }
        if target == current {
            return false;
        }
        self.camera = target;
        true
    }
}

impl Default for WorldView {
    fn default() -> Self {
        Self::new()
    }
}
