use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PlayConfig;
use crate::entities::{
    behavior_for, spawn_live_entities, Flow, LiveEntity, Player, RunWorld, Terminal, TickContext,
};
use crate::input::Action;
use crate::map::{EntityKind, GameMap};
use crate::{particles, physics, projectiles, world_text};

/// Nominal frame duration; all per-frame constants assume 60 ticks per second.
pub const FRAME_MS: f32 = 1000.0 / 60.0;

const ALL_ACTIONS: [Action; 6] = [
    Action::MoveLeft,
    Action::MoveRight,
    Action::Jump,
    Action::Interact,
    Action::Fire,
    Action::Exit,
];

/// State of one play session. Built at run start, dropped at teardown.
pub struct Simulation {
    map: Arc<GameMap>,
    config: PlayConfig,
    player: Player,
    entities: Vec<LiveEntity>,
    world: RunWorld,
}

impl Simulation {
    pub fn new(map: Arc<GameMap>, config: PlayConfig) -> Self {
        let (player, entities) = spawn_live_entities(&map, &config);
        let mut world = RunWorld::new(config.seed);
        world.doors_open = entities
            .iter()
            .any(|e| e.kind == EntityKind::Door && e.prop_bool("isOpen") == Some(true));
        Self {
            map,
            config,
            player,
            entities,
            world,
        }
    }

    /// Advances one frame. Returns the terminal outcome if it happened this tick.
    pub fn tick(&mut self) -> Option<Terminal> {
        let was_over = self.world.game_over;
        if !was_over {
            let mut ctx = TickContext {
                map: &self.map,
                config: &self.config,
                player: &mut self.player,
                world: &mut self.world,
            };
            step(&mut ctx, &mut self.entities);
        }
        self.world.input.expire_released();

        // Feedback keeps animating after the run ends.
        particles::update(&mut self.world.particles);
        world_text::update(&mut self.world.texts);
        self.world.frame += 1;

        if was_over {
            None
        } else {
            self.world.terminal
        }
    }

    pub fn set_action(&mut self, action: Action, down: bool) {
        self.world.input.set(action, down);
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn config(&self) -> &PlayConfig {
        &self.config
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn entities(&self) -> &[LiveEntity] {
        &self.entities
    }

    #[cfg(test)]
    pub fn entities_mut(&mut self) -> &mut [LiveEntity] {
        &mut self.entities
    }

    pub fn world(&self) -> &RunWorld {
        &self.world
    }

    #[cfg(test)]
    pub fn world_mut(&mut self) -> &mut RunWorld {
        &mut self.world
    }

    pub fn elapsed_ms(&self) -> f32 {
        self.world.frame as f32 * FRAME_MS
    }
}

/// Player motion, then entities in layer/placement order, then bullets. The
/// first terminal outcome stops the rest of the tick.
fn step(ctx: &mut TickContext<'_>, entities: &mut [LiveEntity]) -> Flow {
    if ctx.player.invulnerable > 0 {
        ctx.player.invulnerable -= 1;
    }
    if physics::step_player(ctx) == Flow::Halt {
        return Flow::Halt;
    }
    projectiles::fire_player(ctx);

    for entity in entities.iter_mut() {
        if entity.dead {
            continue;
        }
        if behavior_for(entity.kind).update(entity, ctx) == Flow::Halt {
            return Flow::Halt;
        }
    }

    projectiles::update(entities, ctx)
}

fn default_max_frames() -> u64 {
    600
}

#[derive(Deserialize, Clone, Debug)]
pub struct ScriptedInput {
    pub frame: u64,
    pub action: Action,
    /// Frames the action stays held; 0 means a single frame.
    #[serde(default)]
    pub duration: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ScriptedRun {
    #[serde(default)]
    pub inputs: Vec<ScriptedInput>,
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,
}

impl ScriptedRun {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid script: {e}"))
    }

    fn held_at(&self, frame: u64, action: Action) -> bool {
        self.inputs.iter().any(|input| {
            let duration = input.duration.max(1);
            input.action == action && frame >= input.frame && frame < input.frame + duration
        })
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Won,
    Died,
    Stopped,
    Timeout,
}

#[derive(Serialize, Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub frames_elapsed: u64,
    pub score: u32,
    pub final_position: (f32, f32),
    pub events: Vec<crate::events::RunEvent>,
    pub dropped_events: u64,
}

/// Drives a run headlessly from a frame-indexed input script.
pub fn run_scripted(map: Arc<GameMap>, config: PlayConfig, script: &ScriptedRun) -> RunReport {
    let mut sim = Simulation::new(map, config);
    let mut outcome = RunOutcome::Timeout;
    let mut frames_elapsed = script.max_frames;

    for frame in 0..script.max_frames {
        for action in ALL_ACTIONS {
            sim.set_action(action, script.held_at(frame, action));
        }
        if script.held_at(frame, Action::Exit) {
            outcome = RunOutcome::Stopped;
            frames_elapsed = frame;
            break;
        }
        if let Some(terminal) = sim.tick() {
            outcome = match terminal {
                Terminal::Won => RunOutcome::Won,
                Terminal::Died => RunOutcome::Died,
            };
            frames_elapsed = frame + 1;
            break;
        }
    }

    let body = &sim.player().body;
    RunReport {
        outcome,
        frames_elapsed,
        score: sim.world().score,
        final_position: (body.x, body.y),
        events: sim.world().events.iter().cloned().collect(),
        dropped_events: sim.world().events.dropped_events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HazardPolicy;
    use crate::events::RunEventKind;
    use crate::map::{Placement, TileKind};

    fn hold(action: Action, frame: u64, duration: u64) -> ScriptedInput {
        ScriptedInput {
            frame,
            action,
            duration,
        }
    }

    /// 3x3 map, ground along the bottom row, player at tile (0, 0) and the
    /// portal at tile (2, 0).
    fn portal_map() -> GameMap {
        let mut map = GameMap::new(3, 3, 32.0);
        map.layers[0].fill_row(2, 0..3, TileKind::Ground);
        map.layers[0].entities = vec![
            Placement::new(EntityKind::Player, 0.0, 0.0),
            Placement::new(EntityKind::Portal, 64.0, 0.0),
        ];
        map
    }

    /// Lever, then a door sealed in a wall column, then the portal.
    fn lever_door_map() -> GameMap {
        let mut map = GameMap::new(10, 4, 32.0);
        map.layers[0].fill_row(3, 0..10, TileKind::Ground);
        map.layers[0].set(6, 0, TileKind::Wall);
        map.layers[0].entities = vec![
            Placement::new(EntityKind::Player, 0.0, 0.0),
            Placement::new(EntityKind::Lever, 96.0, 72.0),
            Placement::new(EntityKind::Door, 192.0, 32.0),
            Placement::new(EntityKind::Portal, 256.0, 48.0),
        ];
        map
    }

    #[test]
    fn walking_into_portal_wins() {
        let script = ScriptedRun {
            inputs: vec![hold(Action::MoveRight, 0, 120)],
            max_frames: 120,
        };
        let report = run_scripted(Arc::new(portal_map()), PlayConfig::default(), &script);
        assert_eq!(report.outcome, RunOutcome::Won);
        let wins = report
            .events
            .iter()
            .filter(|e| matches!(e.kind, RunEventKind::Won { .. }))
            .count();
        assert_eq!(wins, 1);
        assert!(!report
            .events
            .iter()
            .any(|e| matches!(e.kind, RunEventKind::Died { .. })));
    }

    #[test]
    fn lava_under_spawn_is_fatal_on_first_tick() {
        let mut map = GameMap::new(3, 3, 32.0);
        map.layers[0].fill_row(2, 0..3, TileKind::Lava);
        map.layers[0].entities = vec![
            Placement::new(EntityKind::Player, 0.0, 64.0 - 28.0),
            Placement::new(EntityKind::Coin, 0.0, 40.0),
        ];
        let mut sim = Simulation::new(Arc::new(map), PlayConfig::default());
        assert_eq!(sim.tick(), Some(Terminal::Died));
        assert!(sim.world().game_over);
        assert!(!sim.world().won);

        for _ in 0..30 {
            assert_eq!(sim.tick(), None);
        }
        assert_eq!(sim.world().score, 0);
        assert!(!sim.entities()[0].dead, "entities freeze after game over");
    }

    #[test]
    fn door_blocks_until_lever_is_used() {
        let map = Arc::new(lever_door_map());
        let no_interact = ScriptedRun {
            inputs: vec![hold(Action::MoveRight, 0, 300)],
            max_frames: 300,
        };
        let report = run_scripted(map.clone(), PlayConfig::default(), &no_interact);
        assert_eq!(report.outcome, RunOutcome::Timeout);
        assert_eq!(report.final_position.0, 192.0 - 28.0);

        let with_interact = ScriptedRun {
            inputs: vec![
                hold(Action::MoveRight, 0, 300),
                hold(Action::Interact, 20, 0),
            ],
            max_frames: 300,
        };
        let report = run_scripted(map, PlayConfig::default(), &with_interact);
        assert_eq!(report.outcome, RunOutcome::Won);
        let lever_frame = report
            .events
            .iter()
            .find(|e| matches!(e.kind, RunEventKind::LeverToggled { doors_open: true }))
            .map(|e| e.frame);
        assert_eq!(lever_frame, Some(20));
    }

    #[test]
    fn door_open_property_starts_unlocked() {
        let mut map = lever_door_map();
        map.layers[0].entities[2] = Placement::new(EntityKind::Door, 192.0, 32.0)
            .with_property("isOpen", serde_json::json!(true));
        let sim = Simulation::new(Arc::new(map), PlayConfig::default());
        assert!(sim.world().doors_open);
    }

    #[test]
    fn invulnerable_player_on_lava_still_sparks() {
        let mut map = GameMap::new(3, 3, 32.0);
        map.layers[0].fill_row(2, 0..3, TileKind::Lava);
        map.layers[0].entities = vec![Placement::new(EntityKind::Player, 0.0, 36.0)];
        let mut config = PlayConfig::default();
        config.mode.hazard_policy = HazardPolicy::health_pool();

        let mut sim = Simulation::new(Arc::new(map), config);
        sim.player.invulnerable = 30;
        assert_eq!(sim.tick(), None);

        assert!(!sim.world().particles.is_empty());
        assert_eq!(sim.player().body.health, 3);
        assert_eq!(sim.world().events.count(|k| *k == RunEventKind::Respawned), 0);
        assert_eq!(
            sim.world()
                .events
                .count(|k| matches!(k, RunEventKind::PlayerHit { .. })),
            0
        );
    }

    #[test]
    fn health_pool_respawns_after_tile_hazard() {
        let mut map = GameMap::new(8, 3, 32.0);
        map.layers[0].fill_row(2, 0..8, TileKind::Ground);
        map.layers[0].set(3, 2, TileKind::Spike);
        map.layers[0].entities = vec![Placement::new(EntityKind::Player, 0.0, 36.0)];
        let mut config = PlayConfig::default();
        config.mode.hazard_policy = HazardPolicy::health_pool();

        let mut sim = Simulation::new(Arc::new(map), config);
        sim.set_action(Action::MoveRight, true);
        let mut respawned = false;
        for _ in 0..40 {
            assert_eq!(sim.tick(), None);
            if sim.world().events.count(|k| *k == RunEventKind::Respawned) > 0 {
                respawned = true;
                break;
            }
        }
        assert!(respawned);
        assert_eq!(sim.player().body.health, 2);
        assert_eq!((sim.player().body.x, sim.player().body.y), (0.0, 36.0));
        assert_eq!(sim.player().invulnerable, 60);
    }

    #[test]
    fn exit_in_script_stops_run() {
        let script = ScriptedRun::from_json(
            r#"{"inputs": [{"frame": 5, "action": "exit"}], "max_frames": 50}"#,
        )
        .expect("script parses");
        let report = run_scripted(Arc::new(portal_map()), PlayConfig::default(), &script);
        assert_eq!(report.outcome, RunOutcome::Stopped);
        assert_eq!(report.frames_elapsed, 5);
    }
}
