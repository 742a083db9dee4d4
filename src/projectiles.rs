use serde::Serialize;

use crate::config::ShooterConfig;
use crate::entities::{behavior_for, Flow, LiveEntity, TickContext};
use crate::events::{HurtCause, RunEventKind};
use crate::input::Action;
use crate::render::{DrawContext, Rgba};
use crate::tile_query::{is_solid_at, outside_map, Aabb};

const PLAYER_BULLET: Rgba = Rgba::hex(0xFDE047);
const ENEMY_BULLET: Rgba = Rgba::hex(0xF87171);
/// Vertical distance within which a skeleton considers the player level with it.
const ENEMY_SIGHT_BAND: f32 = 48.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletOwner {
    Player,
    Enemy,
}

/// Shooter-mode projectile; `x`/`y` is the centre.
#[derive(Clone, Debug, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub damage: u32,
    pub owner: BulletOwner,
}

impl Bullet {
    pub fn aabb(&self) -> Aabb {
        let half = self.size / 2.0;
        Aabb::new(self.x - half, self.y - half, self.size, self.size)
    }
}

enum Impact {
    None,
    Spent,
    Terminal,
}

/// Spawns a player bullet when fire is held and the cooldown has elapsed.
pub fn fire_player(ctx: &mut TickContext<'_>) {
    let config = ctx.config;
    let Some(shooter) = config.mode.shooter.as_ref() else {
        return;
    };
    let player = &mut *ctx.player;
    if player.fire_cooldown > 0 {
        player.fire_cooldown -= 1;
    }
    if !ctx.world.input.held(Action::Fire) || player.fire_cooldown > 0 {
        return;
    }

    let body = &player.body;
    let (cx, cy) = body.center();
    ctx.world.bullets.push(Bullet {
        x: cx + body.direction * body.width / 2.0,
        y: cy,
        vx: body.direction * shooter.bullet_speed,
        vy: 0.0,
        size: shooter.bullet_size,
        damage: shooter.bullet_damage,
        owner: BulletOwner::Player,
    });
    player.fire_cooldown = shooter.fire_cooldown_frames;
    ctx.emit(RunEventKind::BulletFired {
        owner: BulletOwner::Player,
    });
}

/// Lets `entity` fire at the player when it is in range and level.
pub fn fire_at_player(entity: &mut LiveEntity, ctx: &mut TickContext<'_>, cfg: &ShooterConfig) {
    if entity.cooldown > 0 {
        entity.cooldown -= 1;
        return;
    }
    let (ex, ey) = entity.center();
    let (px, py) = ctx.player.body.center();
    let dx = px - ex;
    if dx.abs() > cfg.enemy_fire_range || (py - ey).abs() >= ENEMY_SIGHT_BAND {
        return;
    }

    let dir = if dx < 0.0 { -1.0 } else { 1.0 };
    entity.direction = dir;
    ctx.world.bullets.push(Bullet {
        x: ex + dir * entity.width / 2.0,
        y: ey,
        vx: dir * cfg.enemy_bullet_speed,
        vy: 0.0,
        size: cfg.bullet_size,
        damage: cfg.bullet_damage,
        owner: BulletOwner::Enemy,
    });
    entity.cooldown = cfg.enemy_fire_cooldown_frames;
    ctx.emit(RunEventKind::BulletFired {
        owner: BulletOwner::Enemy,
    });
}

/// Moves every bullet and resolves its impacts. Returns `Halt` when an enemy
/// bullet ends the run.
pub fn update(entities: &mut [LiveEntity], ctx: &mut TickContext<'_>) -> Flow {
    let mut bullets = std::mem::take(&mut ctx.world.bullets);
    let mut flow = Flow::Continue;
    bullets.retain_mut(|bullet| {
        if flow == Flow::Halt {
            return true;
        }
        match step_bullet(bullet, entities, ctx) {
            Impact::None => true,
            Impact::Spent => false,
            Impact::Terminal => {
                flow = Flow::Halt;
                false
            }
        }
    });
    ctx.world.bullets = bullets;
    flow
}

fn step_bullet(bullet: &mut Bullet, entities: &mut [LiveEntity], ctx: &mut TickContext<'_>) -> Impact {
    bullet.x += bullet.vx;
    bullet.y += bullet.vy;

    let aabb = bullet.aabb();
    if outside_map(ctx.map, &aabb) || is_solid_at(ctx.map, bullet.x, bullet.y) {
        return Impact::Spent;
    }

    let doors_open = ctx.world.doors_open;
    let hit = entities.iter_mut().find(|e| {
        if e.dead || !e.aabb().overlaps(&aabb) {
            return false;
        }
        let behavior = behavior_for(e.kind);
        behavior.blocks_bullets(e, doors_open)
            || (bullet.owner == BulletOwner::Player && behavior.is_enemy())
    });

    if let Some(target) = hit {
        if bullet.owner == BulletOwner::Player && behavior_for(target.kind).is_enemy() {
            damage_enemy(target, bullet.damage, ctx);
        }
        return Impact::Spent;
    }

    if bullet.owner == BulletOwner::Enemy && aabb.overlaps(&ctx.player.body.aabb()) {
        return match ctx.hurt_player(HurtCause::Bullet, Some(bullet.x)) {
            Flow::Halt => Impact::Terminal,
            Flow::Continue => Impact::Spent,
        };
    }
    Impact::None
}

fn damage_enemy(enemy: &mut LiveEntity, damage: u32, ctx: &mut TickContext<'_>) {
    enemy.health = enemy.health.saturating_sub(damage);
    ctx.emit(RunEventKind::EnemyShot {
        enemy: enemy.kind,
        health: enemy.health,
    });
    let (cx, cy) = enemy.center();
    if enemy.health > 0 {
        ctx.burst(cx, cy, ENEMY_BULLET, 5);
        return;
    }

    enemy.dead = true;
    let reward = ctx.config.rewards.shot_kill;
    ctx.add_score(reward);
    ctx.emit(RunEventKind::EnemyKilled {
        enemy: enemy.kind,
        reward,
    });
    ctx.burst(cx, cy, crate::ai::enemy_color(enemy.kind), 15);
    ctx.float_text(cx, enemy.y, format!("+{reward}"), Rgba::hex(0xFFFFFF));
}

pub fn draw(bullet: &Bullet, ctx: &mut DrawContext<'_>) {
    let color = match bullet.owner {
        BulletOwner::Player => PLAYER_BULLET,
        BulletOwner::Enemy => ENEMY_BULLET,
    };
    ctx.circle(bullet.x, bullet.y, bullet.size / 2.0, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HazardPolicy, PlayConfig};
    use crate::entities::{Player, RunWorld};
    use crate::map::{EntityKind, GameMap, TileKind};

    fn shooter_config() -> PlayConfig {
        let mut config = PlayConfig::default();
        config.mode.shooter = Some(ShooterConfig::default());
        config
    }

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(LiveEntity::new(EntityKind::Player, x, y, 28.0, 28.0))
    }

    fn bullet(x: f32, y: f32, vx: f32, owner: BulletOwner) -> Bullet {
        Bullet {
            x,
            y,
            vx,
            vy: 0.0,
            size: 6.0,
            damage: 1,
            owner,
        }
    }

    #[test]
    fn fire_respects_cooldown() {
        let map = GameMap::new(20, 10, 32.0);
        let config = shooter_config();
        let mut player = player_at(100.0, 100.0);
        let mut world = RunWorld::new(0);
        world.input.press(Action::Fire);
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        for _ in 0..15 {
            fire_player(&mut ctx);
        }
        assert_eq!(ctx.world.bullets.len(), 1);
        fire_player(&mut ctx);
        assert_eq!(ctx.world.bullets.len(), 2);
        assert!(ctx.world.bullets.iter().all(|b| b.vx == 10.0));
    }

    #[test]
    fn player_bullets_wear_down_and_kill_enemies() {
        let map = GameMap::new(20, 10, 32.0);
        let config = shooter_config();
        let mut player = player_at(0.0, 100.0);
        let mut world = RunWorld::new(0);
        let mut slime = LiveEntity::new(EntityKind::Slime, 100.0, 100.0, 28.0, 20.0);
        slime.health = 2;
        let mut entities = vec![slime];
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };

        ctx.world.bullets.push(bullet(95.0, 110.0, 10.0, BulletOwner::Player));
        update(&mut entities, &mut ctx);
        assert!(ctx.world.bullets.is_empty());
        assert_eq!(entities[0].health, 1);
        assert!(!entities[0].dead);

        ctx.world.bullets.push(bullet(95.0, 110.0, 10.0, BulletOwner::Player));
        update(&mut entities, &mut ctx);
        assert!(entities[0].dead);
        assert_eq!(ctx.world.score, 100);
    }

    #[test]
    fn bullets_stop_at_solid_tiles_and_closed_doors() {
        let mut map = GameMap::new(20, 10, 32.0);
        map.layers[0].set(5, 3, TileKind::Wall);
        let config = shooter_config();
        let mut player = player_at(0.0, 0.0);
        let mut world = RunWorld::new(0);
        let mut entities = vec![LiveEntity::new(EntityKind::Door, 320.0, 64.0, 32.0, 64.0)];
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        ctx.world.bullets.push(bullet(155.0, 100.0, 10.0, BulletOwner::Player));
        ctx.world.bullets.push(bullet(310.0, 80.0, 10.0, BulletOwner::Player));
        update(&mut entities, &mut ctx);
        assert!(ctx.world.bullets.is_empty());

        ctx.world.doors_open = true;
        ctx.world.bullets.push(bullet(310.0, 80.0, 10.0, BulletOwner::Player));
        update(&mut entities, &mut ctx);
        assert_eq!(ctx.world.bullets.len(), 1);
    }

    #[test]
    fn enemy_bullet_hurts_player_under_health_pool() {
        let map = GameMap::new(20, 10, 32.0);
        let mut config = shooter_config();
        config.mode.hazard_policy = HazardPolicy::health_pool();
        let mut player = player_at(100.0, 100.0);
        player.body.health = 3;
        player.body.max_health = 3;
        let mut world = RunWorld::new(0);
        let mut entities = Vec::new();
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        ctx.world.bullets.push(bullet(130.0, 110.0, -5.0, BulletOwner::Enemy));
        let flow = update(&mut entities, &mut ctx);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(ctx.player.body.health, 2);
        assert!(ctx.player.body.vx < 0.0, "knocked away from the shot");
        assert!(ctx.world.bullets.is_empty());
    }

    #[test]
    fn skeleton_fires_only_when_level_and_in_range() {
        let map = GameMap::new(40, 10, 32.0);
        let config = shooter_config();
        let cfg = ShooterConfig::default();
        let mut player = player_at(300.0, 100.0);
        let mut world = RunWorld::new(0);
        let mut skeleton = LiveEntity::new(EntityKind::Skeleton, 100.0, 96.0, 28.0, 32.0);
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        fire_at_player(&mut skeleton, &mut ctx, &cfg);
        assert_eq!(ctx.world.bullets.len(), 1);
        assert_eq!(ctx.world.bullets[0].owner, BulletOwner::Enemy);
        assert_eq!(skeleton.cooldown, 90);

        ctx.player.body.y = 10.0;
        skeleton.cooldown = 0;
        fire_at_player(&mut skeleton, &mut ctx, &cfg);
        assert_eq!(ctx.world.bullets.len(), 1);
    }
}
