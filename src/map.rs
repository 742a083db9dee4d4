use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileKind {
    Empty = 0,
    Ground = 1,
    Wall = 2,
    Water = 3,
    Spike = 4,
    Lava = 5,
}

impl TileKind {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => TileKind::Ground,
            2 => TileKind::Wall,
            3 => TileKind::Water,
            4 => TileKind::Spike,
            5 => TileKind::Lava,
            _ => TileKind::Empty,
        }
    }

    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Ground | TileKind::Wall)
    }

    pub fn is_hazard(self) -> bool {
        matches!(self, TileKind::Spike | TileKind::Lava)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Player,
    Slime,
    Bat,
    Coin,
    Door,
    Lever,
    Portal,
    WallBlock,
    Start,
    End,
    Skeleton,
    Ghost,
    Spider,
    Gem,
    Key,
    Heart,
    MovingPlatform,
    Trampoline,
    Checkpoint,
    #[serde(other)]
    Unknown,
}

impl EntityKind {
    /// Size the editor stamps on a fresh placement of this kind.
    pub fn default_size(self) -> (f32, f32) {
        match self {
            EntityKind::Player => (28.0, 28.0),
            EntityKind::Slime => (28.0, 20.0),
            EntityKind::Bat => (24.0, 24.0),
            EntityKind::Coin | EntityKind::Gem => (20.0, 20.0),
            EntityKind::Door => (32.0, 64.0),
            EntityKind::Lever | EntityKind::Heart => (24.0, 24.0),
            EntityKind::Portal | EntityKind::Checkpoint => (32.0, 48.0),
            EntityKind::Skeleton => (28.0, 32.0),
            EntityKind::Ghost => (28.0, 28.0),
            EntityKind::Spider => (24.0, 16.0),
            EntityKind::Key => (20.0, 24.0),
            EntityKind::MovingPlatform => (64.0, 16.0),
            EntityKind::Trampoline => (32.0, 16.0),
            EntityKind::WallBlock | EntityKind::Start | EntityKind::End | EntityKind::Unknown => {
                (32.0, 32.0)
            }
        }
    }
}

/// One authored entity as stored in the map file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Placement {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Placement {
    pub fn new(kind: EntityKind, x: f32, y: f32) -> Self {
        let (width, height) = kind.default_size();
        Self {
            kind,
            x,
            y,
            width,
            height,
            properties: None,
        }
    }

    /// Authored size, falling back to the kind's default for unsized records.
    pub fn size(&self) -> (f32, f32) {
        let (dw, dh) = self.kind.default_size();
        let w = if self.width > 0.0 { self.width } else { dw };
        let h = if self.height > 0.0 { self.height } else { dh };
        (w, h)
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.to_string(), value);
        self
    }
}

fn default_visible() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Tile codes indexed `[row][col]`.
    pub data: Vec<Vec<u8>>,
    #[serde(default)]
    pub entities: Vec<Placement>,
}

impl Layer {
    pub fn empty(name: &str, width: usize, height: usize) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            data: vec![vec![TileKind::Empty as u8; width]; height],
            entities: Vec::new(),
        }
    }

    pub fn get(&self, col: usize, row: usize) -> TileKind {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .map(|&v| TileKind::from_u8(v))
            .unwrap_or(TileKind::Empty)
    }

    pub fn set(&mut self, col: usize, row: usize, tile: TileKind) {
        if let Some(cell) = self.data.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = tile as u8;
        }
    }

    pub fn fill_row(&mut self, row: usize, cols: std::ops::Range<usize>, tile: TileKind) {
        for col in cols {
            self.set(col, row, tile);
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMap {
    pub width: usize,
    pub height: usize,
    pub tile_size: f32,
    pub layers: Vec<Layer>,
}

impl GameMap {
    pub fn new(width: usize, height: usize, tile_size: f32) -> Self {
        Self {
            width,
            height,
            tile_size,
            layers: vec![Layer::empty("Gameplay", width, height)],
        }
    }

    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_size
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * self.tile_size
    }

    pub fn contains_tile(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    /// Placements of visible layers, in layer order then placement order.
    pub fn visible_placements(&self) -> impl Iterator<Item = &Placement> {
        self.layers
            .iter()
            .filter(|l| l.visible)
            .flat_map(|l| l.entities.iter())
    }

    /// Structural checks the load layer runs before handing a map to a run.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("map has zero size ({}x{})", self.width, self.height));
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(format!("invalid tile size {}", self.tile_size));
        }
        if self.layers.is_empty() {
            return Err("map has no layers".to_string());
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.data.len() != self.height {
                return Err(format!(
                    "layer {} has {} rows, expected {}",
                    i,
                    layer.data.len(),
                    self.height
                ));
            }
            if let Some((row, r)) = layer
                .data
                .iter()
                .enumerate()
                .find(|(_, r)| r.len() != self.width)
            {
                return Err(format!(
                    "layer {} row {} has {} columns, expected {}",
                    i,
                    row,
                    r.len(),
                    self.width
                ));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let map: GameMap =
            serde_json::from_str(json).map_err(|e| format!("invalid map JSON: {e}"))?;
        map.validate()?;
        Ok(map)
    }

    pub fn load(path: &str) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?;
        Self::from_json(&contents)
    }

    /// A small level exercising every core mechanic, used when no map is given.
    pub fn demo() -> Self {
        let width = 44;
        let height = 15;
        let ts = 32.0;

        let mut background = Layer::empty("Background", width, height);
        background.fill_row(12, 4..8, TileKind::Water);

        let mut gameplay = Layer::empty("Gameplay", width, height);
        gameplay.fill_row(13, 0..width, TileKind::Ground);
        gameplay.fill_row(14, 0..width, TileKind::Wall);

        // Lava pit crossed via a floating platform
        gameplay.fill_row(13, 12..15, TileKind::Lava);
        gameplay.fill_row(10, 10..17, TileKind::Ground);

        // Spike strip guarded by a trampoline
        gameplay.fill_row(12, 22..24, TileKind::Spike);

        // Wall that the door sits in
        for row in 2..11 {
            gameplay.set(34, row, TileKind::Wall);
        }

        let floor_top = 13.0 * ts;
        let on_floor = |kind: EntityKind, col: f32| {
            let (_, h) = kind.default_size();
            Placement::new(kind, col * ts, floor_top - h)
        };

        gameplay.entities = vec![
            on_floor(EntityKind::Player, 2.0),
            on_floor(EntityKind::Start, 2.0),
            on_floor(EntityKind::Coin, 6.0),
            on_floor(EntityKind::Coin, 7.0),
            Placement::new(EntityKind::Gem, 13.0 * ts, 8.5 * ts),
            on_floor(EntityKind::Slime, 18.0),
            on_floor(EntityKind::Trampoline, 21.0),
            Placement::new(EntityKind::Bat, 26.0 * ts, 8.0 * ts),
            on_floor(EntityKind::Checkpoint, 27.0),
            on_floor(EntityKind::Lever, 31.0),
            Placement::new(EntityKind::Door, 34.0 * ts, floor_top - 64.0),
            on_floor(EntityKind::Heart, 37.0),
            on_floor(EntityKind::Portal, 41.0),
        ];

        GameMap {
            width,
            height,
            tile_size: ts,
            layers: vec![background, gameplay],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_editor_map_json() {
        let json = r#"{
            "id": "abc",
            "name": "Untitled Map",
            "width": 2,
            "height": 2,
            "tileSize": 32,
            "layers": [{
                "id": "l1",
                "name": "Gameplay",
                "visible": true,
                "locked": false,
                "data": [[0, 1], [5, 2]],
                "entities": [
                    {"id": "e1", "type": "player", "x": 0, "y": 0, "width": 28, "height": 28},
                    {"id": "e2", "type": "door", "x": 32, "y": 0, "width": 32, "height": 64,
                     "properties": {"isOpen": false}},
                    {"id": "e3", "type": "dragon", "x": 0, "y": 0, "width": 10, "height": 10}
                ]
            }],
            "createdAt": 0,
            "updatedAt": 0
        }"#;
        let map = GameMap::from_json(json).expect("map parses");
        assert_eq!(map.layers[0].get(1, 0), TileKind::Ground);
        assert_eq!(map.layers[0].get(0, 1), TileKind::Lava);
        assert_eq!(map.layers[0].entities[1].kind, EntityKind::Door);
        assert_eq!(map.layers[0].entities[2].kind, EntityKind::Unknown);
    }

    #[test]
    fn validate_rejects_ragged_layers() {
        let mut map = GameMap::new(3, 2, 32.0);
        map.layers[0].data[1].pop();
        let err = map.validate().unwrap_err();
        assert!(err.contains("row 1"));
    }

    #[test]
    fn unsized_placement_uses_kind_default() {
        let mut p = Placement::new(EntityKind::Door, 0.0, 0.0);
        p.width = 0.0;
        p.height = 0.0;
        assert_eq!(p.size(), (32.0, 64.0));
    }

    #[test]
    fn hidden_layer_placements_are_skipped() {
        let mut map = GameMap::new(4, 4, 32.0);
        let mut hidden = Layer::empty("Hidden", 4, 4);
        hidden.visible = false;
        hidden.entities.push(Placement::new(EntityKind::Coin, 0.0, 0.0));
        map.layers.push(hidden);
        map.layers[0]
            .entities
            .push(Placement::new(EntityKind::Slime, 0.0, 0.0));
        let kinds: Vec<_> = map.visible_placements().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Slime]);
    }

    #[test]
    fn demo_map_is_valid() {
        assert!(GameMap::demo().validate().is_ok());
    }
}
