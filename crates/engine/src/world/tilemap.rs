use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Floor,
    Wall,
}

impl TileKind {
    pub fn is_walkable(self) -> bool {
        matches!(self, Self::Floor)
    }

    pub fn is_opaque(self) -> bool {
        matches!(self, Self::Wall)
    }
}

/// Row-major tile grid. Tile (0,0) is the bottom-left corner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

impl Tilemap {
    pub fn new(width: u32, height: u32, tiles: Vec<TileKind>) -> Result<Self, TilemapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn filled(width: u32, height: u32, fill: TileKind) -> Self {
        Self {
            width,
            height,
            tiles: vec![fill; width as usize * height as usize],
        }
    }

    /// Floor everywhere except a one-tile wall ring along the border.
    pub fn walled_room(width: u32, height: u32) -> Self {
        let mut map = Self::filled(width, height, TileKind::Floor);
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    let index = y as usize * width as usize + x as usize;
                    map.tiles[index] = TileKind::Wall;
                }
            }
        }
        map
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.index_of(pos).is_some()
    }

    pub fn index_of(&self, pos: TilePos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as u32, pos.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, pos: TilePos) -> Option<TileKind> {
        self.index_of(pos)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn set_tile(&mut self, pos: TilePos, kind: TileKind) -> bool {
        match self.index_of(pos) {
            Some(index) => {
                self.tiles[index] = kind;
                true
            }
            None => false,
        }
    }
}
