use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::ai;
use crate::config::{GameMode, HazardPolicy, PlayConfig};
use crate::events::{EventLog, HurtCause, RunEventKind};
use crate::input::ActionState;
use crate::interaction;
use crate::map::{EntityKind, GameMap, Placement};
use crate::particles::{self, Particle};
use crate::projectiles::Bullet;
use crate::render::{DrawContext, Rgba};
use crate::tile_query::Aabb;
use crate::world_text::{self, FloatingText};

pub const PLAYER_FALLBACK_SPAWN: (f32, f32) = (64.0, 64.0);
pub const HURT_COLOR: Rgba = Rgba::hex(0xEF4444);
const INVULNERABLE_SPARKS: usize = 3;

/// Mutable runtime copy of a placement, owned by one run.
#[derive(Clone, Debug)]
pub struct LiveEntity {
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
    pub direction: f32,
    pub dead: bool,
    pub health: u32,
    pub max_health: u32,
    pub origin_x: f32,
    /// Frames until this entity may fire again.
    pub cooldown: u32,
    /// One-shot latch (checkpoints).
    pub activated: bool,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl LiveEntity {
    pub fn new(kind: EntityKind, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            kind,
            x,
            y,
            width,
            height,
            vx: 0.0,
            vy: 0.0,
            grounded: false,
            direction: 1.0,
            dead: false,
            health: 1,
            max_health: 1,
            origin_x: x,
            cooldown: 0,
            activated: false,
            properties: serde_json::Map::new(),
        }
    }

    pub fn from_placement(placement: &Placement, mode: &GameMode) -> Self {
        let (w, h) = placement.size();
        let mut entity = LiveEntity::new(placement.kind, placement.x, placement.y, w, h);
        if let Some(props) = &placement.properties {
            entity.properties = props.clone();
        }
        if behavior_for(placement.kind).is_enemy() {
            entity.health = mode.enemy_health();
            entity.max_health = entity.health;
        }
        if let Some(dir) = entity.prop_f32("direction") {
            entity.direction = if dir < 0.0 { -1.0 } else { 1.0 };
        }
        entity
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn prop_f32(&self, key: &str) -> Option<f32> {
        self.properties
            .get(key)
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
    }

    pub fn prop_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(|v| v.as_bool())
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: LiveEntity,
    pub invulnerable: u32,
    pub fire_cooldown: u32,
    pub respawn: (f32, f32),
}

impl Player {
    pub fn new(body: LiveEntity) -> Self {
        let respawn = (body.x, body.y);
        Self {
            body,
            invulnerable: 0,
            fire_cooldown: 0,
            respawn,
        }
    }

    pub fn respawn_now(&mut self) {
        self.body.x = self.respawn.0;
        self.body.y = self.respawn.1;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
        self.body.grounded = false;
    }
}

/// Places a body of size `(w, h)` centred on the bottom edge of `marker`.
pub fn stand_on(marker: &Aabb, w: f32, h: f32) -> (f32, f32) {
    (marker.center_x() - w / 2.0, marker.bottom() - h)
}

/// Builds the player and the live entity list from the map's visible layers.
pub fn spawn_live_entities(map: &GameMap, config: &PlayConfig) -> (Player, Vec<LiveEntity>) {
    let mut player_body = None;
    let mut start = None;
    let mut entities = Vec::new();

    for placement in map.visible_placements() {
        match placement.kind {
            EntityKind::Player => {
                if player_body.is_none() {
                    player_body = Some(LiveEntity::from_placement(placement, &config.mode));
                }
            }
            kind => {
                if kind == EntityKind::Start && start.is_none() {
                    let (w, h) = placement.size();
                    start = Some(Aabb::new(placement.x, placement.y, w, h));
                }
                entities.push(LiveEntity::from_placement(placement, &config.mode));
            }
        }
    }

    let mut body = player_body.unwrap_or_else(|| {
        let (w, h) = EntityKind::Player.default_size();
        LiveEntity::new(
            EntityKind::Player,
            PLAYER_FALLBACK_SPAWN.0,
            PLAYER_FALLBACK_SPAWN.1,
            w,
            h,
        )
    });
    if let Some(marker) = start {
        let (x, y) = stand_on(&marker, body.width, body.height);
        body.x = x;
        body.y = y;
    }
    body.max_health = config.mode.hazard_policy.max_health();
    body.health = body.max_health;

    (Player::new(body), entities)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A terminal outcome happened; nothing else runs this tick.
    Halt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Won,
    Died,
}

/// Run-wide state entity behaviors may touch, apart from the entity list.
pub struct RunWorld {
    pub score: u32,
    pub doors_open: bool,
    pub game_over: bool,
    pub won: bool,
    pub input: ActionState,
    pub particles: Vec<Particle>,
    pub texts: Vec<FloatingText>,
    pub bullets: Vec<Bullet>,
    pub events: EventLog,
    pub rng: SmallRng,
    pub frame: u64,
    pub terminal: Option<Terminal>,
}

impl RunWorld {
    pub fn new(seed: u64) -> Self {
        Self {
            score: 0,
            doors_open: false,
            game_over: false,
            won: false,
            input: ActionState::default(),
            particles: Vec::new(),
            texts: Vec::new(),
            bullets: Vec::new(),
            events: EventLog::default(),
            rng: SmallRng::seed_from_u64(seed),
            frame: 0,
            terminal: None,
        }
    }
}

pub struct TickContext<'a> {
    pub map: &'a GameMap,
    pub config: &'a PlayConfig,
    pub player: &'a mut Player,
    pub world: &'a mut RunWorld,
}

impl TickContext<'_> {
    /// Elapsed run time in milliseconds, at a nominal 60 frames per second.
    pub fn elapsed_ms(&self) -> f32 {
        self.world.frame as f32 * crate::simulation::FRAME_MS
    }

    pub fn emit(&mut self, kind: RunEventKind) {
        let frame = self.world.frame;
        self.world.events.emit(frame, kind);
    }

    pub fn burst(&mut self, x: f32, y: f32, color: Rgba, count: usize) {
        particles::burst(&mut self.world.particles, &mut self.world.rng, x, y, color, count);
    }

    pub fn float_text(&mut self, x: f32, y: f32, text: impl Into<String>, color: Rgba) {
        world_text::spawn(&mut self.world.texts, x, y, text, color);
    }

    pub fn add_score(&mut self, amount: u32) {
        self.world.score = self.world.score.saturating_add(amount);
    }

    pub fn win(&mut self, goal: &Aabb) -> Flow {
        self.world.won = true;
        self.world.game_over = true;
        self.world.terminal.get_or_insert(Terminal::Won);
        let score = self.world.score;
        self.emit(RunEventKind::Won { score });
        self.burst(goal.center_x(), goal.center_y(), interaction::PORTAL_COLOR, 30);
        self.float_text(
            goal.center_x(),
            goal.y - 20.0,
            "Level Complete!",
            interaction::PORTAL_COLOR,
        );
        Flow::Halt
    }

    pub fn kill_player(&mut self) -> Flow {
        self.world.game_over = true;
        self.world.terminal.get_or_insert(Terminal::Died);
        let (cx, cy) = self.player.body.center();
        self.burst(cx, cy, HURT_COLOR, 20);
        let score = self.world.score;
        self.emit(RunEventKind::Died { score });
        Flow::Halt
    }

    /// Applies the configured hazard policy. `source_x` is the horizontal
    /// centre of whatever hurt the player, used for knockback direction.
    pub fn hurt_player(&mut self, cause: HurtCause, source_x: Option<f32>) -> Flow {
        match self.config.mode.hazard_policy.clone() {
            HazardPolicy::InstantDeath => {
                self.emit(RunEventKind::PlayerHit { cause, health: 0 });
                self.kill_player()
            }
            HazardPolicy::HealthPool {
                knockback_x,
                knockback_y,
                invulnerable_frames,
                ..
            } => {
                if self.player.invulnerable > 0 {
                    // Health is untouched but contact with a hazard tile still sparks.
                    if cause == HurtCause::Tile {
                        let (cx, cy) = self.player.body.center();
                        self.burst(cx, cy, HURT_COLOR, INVULNERABLE_SPARKS);
                    }
                    return Flow::Continue;
                }
                let body = &mut self.player.body;
                body.health = body.health.saturating_sub(1);
                let health = body.health;
                self.emit(RunEventKind::PlayerHit { cause, health });
                if health == 0 {
                    return self.kill_player();
                }

                let (cx, cy) = self.player.body.center();
                self.burst(cx, cy, HURT_COLOR, 20);
                self.float_text(cx, self.player.body.y, "-1", HURT_COLOR);
                self.player.invulnerable = invulnerable_frames;

                if cause == HurtCause::Tile {
                    self.player.respawn_now();
                    self.emit(RunEventKind::Respawned);
                } else {
                    let away = match source_x {
                        Some(sx) if sx > cx => -1.0,
                        Some(_) => 1.0,
                        None => -self.player.body.direction,
                    };
                    self.player.body.vx = away * knockback_x;
                    self.player.body.vy = knockback_y;
                    self.player.body.grounded = false;
                }
                Flow::Continue
            }
        }
    }
}

/// Per-kind simulation and drawing. One static instance per kind.
pub trait Behavior: Sync {
    fn update(&self, _entity: &mut LiveEntity, _ctx: &mut TickContext<'_>) -> Flow {
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>);

    /// State holders are drawn even when flagged dead.
    fn persistent(&self) -> bool {
        false
    }

    fn is_enemy(&self) -> bool {
        false
    }

    /// Whether bullets stop when they hit this entity.
    fn blocks_bullets(&self, _entity: &LiveEntity, _doors_open: bool) -> bool {
        false
    }
}

pub fn behavior_for(kind: EntityKind) -> &'static dyn Behavior {
    match kind {
        EntityKind::Slime => &ai::SLIME,
        EntityKind::Skeleton => &ai::SKELETON,
        EntityKind::Spider => &ai::SPIDER,
        EntityKind::Bat => &ai::BAT,
        EntityKind::Ghost => &ai::GHOST,
        EntityKind::Coin => &interaction::COIN,
        EntityKind::Gem => &interaction::GEM,
        EntityKind::Heart => &interaction::HEART,
        EntityKind::Key => &interaction::KEY,
        EntityKind::Lever => &interaction::LEVER,
        EntityKind::Door => &interaction::DOOR,
        EntityKind::WallBlock => &interaction::WALL_BLOCK,
        EntityKind::MovingPlatform => &interaction::MOVING_PLATFORM,
        EntityKind::Trampoline => &interaction::TRAMPOLINE,
        EntityKind::Checkpoint => &interaction::CHECKPOINT,
        EntityKind::Portal => &interaction::PORTAL,
        EntityKind::End => &interaction::END,
        EntityKind::Start => &interaction::START,
        EntityKind::Player | EntityKind::Unknown => &interaction::INERT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Layer;

    #[test]
    fn missing_player_gets_fallback_spawn() {
        let map = GameMap::new(10, 10, 32.0);
        let (player, entities) = spawn_live_entities(&map, &PlayConfig::default());
        assert_eq!((player.body.x, player.body.y), PLAYER_FALLBACK_SPAWN);
        assert_eq!((player.body.width, player.body.height), (28.0, 28.0));
        assert!(entities.is_empty());
    }

    #[test]
    fn start_marker_repositions_player() {
        let mut map = GameMap::new(10, 10, 32.0);
        map.layers[0].entities = vec![
            Placement::new(EntityKind::Player, 0.0, 0.0),
            Placement::new(EntityKind::Start, 96.0, 128.0),
        ];
        let (player, entities) = spawn_live_entities(&map, &PlayConfig::default());
        assert_eq!(player.body.x, 96.0 + 16.0 - 14.0);
        assert_eq!(player.body.y, 160.0 - 28.0);
        assert_eq!(player.respawn, (player.body.x, player.body.y));
        assert_eq!(entities.len(), 1);
    }

    #[test]
    fn only_first_player_placement_is_used() {
        let mut map = GameMap::new(10, 10, 32.0);
        let mut second = Layer::empty("Second", 10, 10);
        second
            .entities
            .push(Placement::new(EntityKind::Player, 200.0, 0.0));
        map.layers[0]
            .entities
            .push(Placement::new(EntityKind::Player, 32.0, 0.0));
        map.layers.push(second);
        let (player, entities) = spawn_live_entities(&map, &PlayConfig::default());
        assert_eq!(player.body.x, 32.0);
        assert!(entities.is_empty());
    }

    #[test]
    fn enemies_get_shooter_health() {
        let mut config = PlayConfig::default();
        config.mode.shooter = Some(Default::default());
        config.mode.hazard_policy = HazardPolicy::health_pool();
        let mut map = GameMap::new(10, 10, 32.0);
        map.layers[0].entities = vec![
            Placement::new(EntityKind::Slime, 0.0, 0.0),
            Placement::new(EntityKind::Coin, 0.0, 0.0),
        ];
        let (player, entities) = spawn_live_entities(&map, &config);
        assert_eq!(player.body.health, 3);
        assert_eq!(entities[0].health, 2);
        assert_eq!(entities[1].health, 1);
    }
}
