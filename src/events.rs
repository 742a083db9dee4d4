use std::collections::VecDeque;

use bevy::log::warn;
use serde::Serialize;

use crate::map::{EntityKind, TileKind};
use crate::projectiles::BulletOwner;

const MAX_EVENTS: usize = 500;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HurtCause {
    Tile,
    Enemy,
    Bullet,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventKind {
    HazardTouched { tile: TileKind },
    PlayerHit { cause: HurtCause, health: u32 },
    Respawned,
    Stomp { enemy: EntityKind, reward: u32 },
    Collected { item: EntityKind, reward: u32 },
    Healed { health: u32 },
    LeverToggled { doors_open: bool },
    DoorsUnlocked,
    CheckpointReached { x: f32, y: f32 },
    Bounced,
    BulletFired { owner: BulletOwner },
    EnemyShot { enemy: EntityKind, health: u32 },
    EnemyKilled { enemy: EntityKind, reward: u32 },
    Won { score: u32 },
    Died { score: u32 },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RunEvent {
    pub frame: u64,
    #[serde(flatten)]
    pub kind: RunEventKind,
}

/// Bounded log of what happened during a run; oldest entries drop first.
#[derive(Default)]
pub struct EventLog {
    pub recent: VecDeque<RunEvent>,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl EventLog {
    pub fn emit(&mut self, frame: u64, kind: RunEventKind) {
        self.recent.push_back(RunEvent { frame, kind });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = frame;
                warn!(
                    "[Tileplay events] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunEvent> {
        self.recent.iter()
    }

    pub fn count(&self, pred: impl Fn(&RunEventKind) -> bool) -> usize {
        self.recent.iter().filter(|e| pred(&e.kind)).count()
    }
}
