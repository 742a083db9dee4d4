use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-frame movement constants (pixels per frame, y grows downward).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub friction: f32,
    pub move_speed: f32,
    pub jump_velocity: f32,
    pub max_fall_speed: f32,
    /// Horizontal speed below which friction decay snaps to rest.
    pub rest_epsilon: f32,
    /// Fraction of the jump impulse applied after a stomp.
    pub stomp_bounce: f32,
    /// Band above an enemy's top edge that still counts as landing on it.
    pub stomp_tolerance: f32,
    /// Fraction of the jump impulse a trampoline launches with.
    pub trampoline_boost: f32,
    /// Padding added around levers for the interact overlap test.
    pub lever_reach: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            friction: 0.8,
            move_speed: 4.0,
            jump_velocity: -12.0,
            max_fall_speed: 12.0,
            rest_epsilon: 0.05,
            stomp_bounce: 0.6,
            stomp_tolerance: 16.0,
            trampoline_boost: 1.4,
            lever_reach: 10.0,
        }
    }
}

fn default_max_health() -> u32 {
    3
}

fn default_knockback_x() -> f32 {
    6.0
}

fn default_knockback_y() -> f32 {
    -6.0
}

fn default_invulnerable_frames() -> u32 {
    60
}

/// What touching a hazard (tile, enemy, enemy bullet) does to the player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HazardPolicy {
    #[default]
    InstantDeath,
    HealthPool {
        #[serde(default = "default_max_health")]
        max_health: u32,
        #[serde(default = "default_knockback_x")]
        knockback_x: f32,
        #[serde(default = "default_knockback_y")]
        knockback_y: f32,
        #[serde(default = "default_invulnerable_frames")]
        invulnerable_frames: u32,
    },
}

impl HazardPolicy {
    pub fn health_pool() -> Self {
        HazardPolicy::HealthPool {
            max_health: default_max_health(),
            knockback_x: default_knockback_x(),
            knockback_y: default_knockback_y(),
            invulnerable_frames: default_invulnerable_frames(),
        }
    }

    pub fn max_health(&self) -> u32 {
        match self {
            HazardPolicy::InstantDeath => 1,
            HazardPolicy::HealthPool { max_health, .. } => (*max_health).max(1),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShooterConfig {
    pub bullet_speed: f32,
    pub bullet_size: f32,
    pub bullet_damage: u32,
    pub fire_cooldown_frames: u32,
    /// Hit points every enemy starts with.
    pub enemy_health: u32,
    pub enemy_fire_cooldown_frames: u32,
    pub enemy_fire_range: f32,
    pub enemy_bullet_speed: f32,
}

impl Default for ShooterConfig {
    fn default() -> Self {
        Self {
            bullet_speed: 10.0,
            bullet_size: 6.0,
            bullet_damage: 1,
            fire_cooldown_frames: 15,
            enemy_health: 2,
            enemy_fire_cooldown_frames: 90,
            enemy_fire_range: 320.0,
            enemy_bullet_speed: 5.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMode {
    pub hazard_policy: HazardPolicy,
    /// Enables bullets and shootable enemies when present.
    pub shooter: Option<ShooterConfig>,
}

impl GameMode {
    pub fn enemy_health(&self) -> u32 {
        self.shooter
            .as_ref()
            .map(|s| s.enemy_health.max(1))
            .unwrap_or(1)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub stomp: u32,
    pub coin: u32,
    pub gem: u32,
    pub shot_kill: u32,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            stomp: 100,
            coin: 50,
            gem: 150,
            shot_kill: 100,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub death_delay_ms: f32,
    pub win_delay_ms: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            death_delay_ms: 500.0,
            win_delay_ms: 1000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
        }
    }
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Key names follow the DOM `KeyboardEvent.code` vocabulary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub move_left: Vec<String>,
    pub move_right: Vec<String>,
    pub jump: Vec<String>,
    pub interact: Vec<String>,
    pub fire: Vec<String>,
    pub exit: Vec<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            move_left: keys(&["ArrowLeft", "KeyA"]),
            move_right: keys(&["ArrowRight", "KeyD"]),
            jump: keys(&["Space", "ArrowUp", "KeyW"]),
            interact: keys(&["KeyE"]),
            fire: keys(&["KeyF"]),
            exit: keys(&["Escape"]),
        }
    }
}

fn default_title() -> String {
    "Tileplay".to_string()
}

#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
pub struct PlayConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub rewards: Rewards,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub bindings: KeyBindings,
    #[serde(default)]
    pub seed: u64,
    /// Start a fresh run after a win or death instead of exiting.
    #[serde(default)]
    pub restart_on_end: bool,
    #[serde(default = "default_title")]
    pub window_title: String,
    #[serde(default)]
    pub background_color: Option<[f32; 3]>,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            mode: GameMode::default(),
            rewards: Rewards::default(),
            timing: Timing::default(),
            viewport: Viewport::default(),
            bindings: KeyBindings::default(),
            seed: 0,
            restart_on_end: false,
            window_title: default_title(),
            background_color: None,
        }
    }
}

impl PlayConfig {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid play config: {e}"))
    }
}

/// Reads `play.json` (or `$TILEPLAY_CONFIG`); missing files yield defaults.
pub fn load_play_config() -> PlayConfig {
    let path = std::env::var("TILEPLAY_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "play.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match PlayConfig::from_json(&contents) {
            Ok(cfg) => {
                println!("[Tileplay] Loaded play config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Tileplay] Failed to parse {}: {}", path, e);
                PlayConfig::default()
            }
        },
        Err(_) => PlayConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = PlayConfig::from_json("{}").expect("parses");
        assert_eq!(cfg.physics.jump_velocity, -12.0);
        assert_eq!(cfg.mode.hazard_policy, HazardPolicy::InstantDeath);
        assert!(cfg.mode.shooter.is_none());
        assert_eq!(cfg.rewards.stomp, 100);
        assert_eq!(cfg.bindings.interact, vec!["KeyE".to_string()]);
    }

    #[test]
    fn health_pool_fields_default_individually() {
        let cfg = PlayConfig::from_json(
            r#"{"mode": {"hazard_policy": {"type": "health_pool", "max_health": 5}, "shooter": {}}}"#,
        )
        .expect("parses");
        match cfg.mode.hazard_policy {
            HazardPolicy::HealthPool {
                max_health,
                invulnerable_frames,
                ..
            } => {
                assert_eq!(max_health, 5);
                assert_eq!(invulnerable_frames, 60);
            }
            other => panic!("unexpected policy {other:?}"),
        }
        assert_eq!(cfg.mode.enemy_health(), 2);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(PlayConfig::from_json(r#"{"physics": 3}"#).is_err());
    }
}
