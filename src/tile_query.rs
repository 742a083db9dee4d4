use crate::map::{GameMap, TileKind};

/// Axis-aligned box anchored at its top-left corner (y grows downward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Open-interval overlap: boxes that only touch do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn inflate(&self, pad: f32) -> Aabb {
        Aabb {
            x: self.x - pad,
            y: self.y - pad,
            w: self.w + pad * 2.0,
            h: self.h + pad * 2.0,
        }
    }

    /// Penetration depths of `self` into `other` along x and y.
    pub fn penetration(&self, other: &Aabb) -> (f32, f32) {
        let overlap_x = (self.right() - other.x).min(other.right() - self.x);
        let overlap_y = (self.bottom() - other.y).min(other.bottom() - self.y);
        (overlap_x, overlap_y)
    }
}

/// Tile governing a world point. Outside the grid is Wall; a solid tile on any
/// layer beats a hazard on any layer.
pub fn tile_at(map: &GameMap, x: f32, y: f32) -> TileKind {
    let ts = map.tile_size;
    let col = (x / ts).floor();
    let row = (y / ts).floor();
    if !col.is_finite() || !row.is_finite() || !map.contains_tile(col as i32, row as i32) {
        return TileKind::Wall;
    }
    let (col, row) = (col as usize, row as usize);

    let mut hazard = None;
    for layer in &map.layers {
        let tile = layer.get(col, row);
        if tile.is_solid() {
            return tile;
        }
        if hazard.is_none() && tile.is_hazard() {
            hazard = Some(tile);
        }
    }
    hazard.unwrap_or(TileKind::Empty)
}

pub fn is_solid_at(map: &GameMap, x: f32, y: f32) -> bool {
    tile_at(map, x, y).is_solid()
}

/// True when the box lies completely outside the map's pixel area.
pub fn outside_map(map: &GameMap, aabb: &Aabb) -> bool {
    aabb.right() < 0.0
        || aabb.bottom() < 0.0
        || aabb.x > map.pixel_width()
        || aabb.y > map.pixel_height()
}
