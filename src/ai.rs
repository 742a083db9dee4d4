use crate::entities::{Behavior, Flow, LiveEntity, TickContext};
use crate::events::{HurtCause, RunEventKind};
use crate::map::{EntityKind, GameMap, TileKind};
use crate::projectiles;
use crate::render::{DrawContext, Rgba, EYE_DARK};
use crate::tile_query::{is_solid_at, tile_at};

/// Distance ahead of the leading edge probed for walls.
const FRONT_PROBE: f32 = 4.0;
/// Distance below the feet probed for ground.
const LEDGE_PROBE: f32 = 4.0;
const FLYER_BOB: f32 = 0.5;

pub fn enemy_color(kind: EntityKind) -> Rgba {
    match kind {
        EntityKind::Slime => Rgba::hex(0x22C55E),
        EntityKind::Bat => Rgba::hex(0x8B5CF6),
        EntityKind::Skeleton => Rgba::hex(0xE5E7EB),
        EntityKind::Ghost => Rgba::hex(0xC7D2FE),
        EntityKind::Spider => Rgba::hex(0x78716C),
        _ => Rgba::hex(0xEF4444),
    }
}

/// Walks back and forth, turning at walls and (optionally) ledges.
pub fn patrol_step(map: &GameMap, entity: &mut LiveEntity, speed: f32, turn_at_ledges: bool) {
    entity.x += entity.direction * speed;

    let ahead = entity.direction > 0.0;
    let front_x = if ahead {
        entity.x + entity.width + FRONT_PROBE
    } else {
        entity.x - FRONT_PROBE
    };
    let ledge_x = if ahead {
        entity.x + entity.width
    } else {
        entity.x
    };
    let blocked = is_solid_at(map, front_x, entity.y + entity.height / 2.0);
    let ledge = turn_at_ledges
        && tile_at(map, ledge_x, entity.y + entity.height + LEDGE_PROBE) == TileKind::Empty;
    if blocked || ledge {
        entity.direction = -entity.direction;
    }
}

/// Landing on an enemy from above: falling, feet within `tolerance` of its
/// top edge, and centre strictly inside its horizontal span.
pub fn is_stomp(player: &LiveEntity, enemy: &LiveEntity, tolerance: f32) -> bool {
    let feet = player.y + player.height;
    let center_x = player.x + player.width / 2.0;
    player.vy > 0.0
        && feet >= enemy.y
        && feet <= enemy.y + tolerance
        && center_x > enemy.x
        && center_x < enemy.x + enemy.width
}

/// Player contact with a live enemy: stomp it or get hurt.
pub fn resolve_contact(enemy: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
    if enemy.dead || !ctx.player.body.aabb().overlaps(&enemy.aabb()) {
        return Flow::Continue;
    }

    let config = ctx.config;
    let physics = &config.physics;
    if is_stomp(&ctx.player.body, enemy, physics.stomp_tolerance) {
        enemy.dead = true;
        ctx.player.body.vy = physics.jump_velocity * physics.stomp_bounce;
        let reward = config.rewards.stomp;
        ctx.add_score(reward);
        ctx.emit(RunEventKind::Stomp {
            enemy: enemy.kind,
            reward,
        });
        let (cx, cy) = enemy.center();
        ctx.burst(cx, cy, enemy_color(enemy.kind), 15);
        ctx.float_text(cx, enemy.y, format!("+{reward}"), Rgba::hex(0xFFFFFF));
        return Flow::Continue;
    }

    let (source_x, _) = enemy.center();
    ctx.hurt_player(HurtCause::Enemy, Some(source_x))
}

pub struct Patroller {
    pub speed: f32,
    /// Fires at the player in shooter mode.
    pub shoots: bool,
}

pub struct Flyer {
    pub speed: f32,
}

pub static SLIME: Patroller = Patroller {
    speed: 1.5,
    shoots: false,
};
pub static SKELETON: Patroller = Patroller {
    speed: 1.0,
    shoots: true,
};
pub static SPIDER: Patroller = Patroller {
    speed: 2.0,
    shoots: false,
};
pub static BAT: Flyer = Flyer { speed: 2.0 };
pub static GHOST: Flyer = Flyer { speed: 1.0 };

impl Behavior for Patroller {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        let speed = entity.prop_f32("speed").unwrap_or(self.speed);
        patrol_step(ctx.map, entity, speed, true);
        let config = ctx.config;
        if let (true, Some(shooter)) = (self.shoots, config.mode.shooter.as_ref()) {
            projectiles::fire_at_player(entity, ctx, shooter);
        }
        resolve_contact(entity, ctx)
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        draw_enemy(entity, ctx);
    }

    fn is_enemy(&self) -> bool {
        true
    }
}

impl Behavior for Flyer {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        let speed = entity.prop_f32("speed").unwrap_or(self.speed);
        patrol_step(ctx.map, entity, speed, false);
        entity.y += (ctx.elapsed_ms() / 200.0 + entity.x).sin() * FLYER_BOB;
        resolve_contact(entity, ctx)
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        draw_enemy(entity, ctx);
    }

    fn is_enemy(&self) -> bool {
        true
    }
}

fn draw_enemy(entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
    let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
    let cx = x + w / 2.0;
    let cy = y + h / 2.0;
    let t = ctx.elapsed_ms;
    let color = enemy_color(entity.kind);

    match entity.kind {
        EntityKind::Slime => {
            let bounce = (t / 300.0).sin() * 2.0;
            ctx.ellipse(cx, y + h - 6.0 + bounce, w / 2.0 - 2.0, h / 2.0 - 4.0, color);
            ctx.circle(cx - 5.0, cy + bounce, 2.0, EYE_DARK);
            ctx.circle(cx + 5.0, cy + bounce, 2.0, EYE_DARK);
        }
        EntityKind::Bat => {
            let fly = (t / 200.0).sin() * 3.0;
            let flap = (t / 80.0).sin() * 4.0;
            ctx.triangle(
                [(cx - 4.0, cy + fly), (x, cy - 6.0 + flap + fly), (x + 2.0, cy + 4.0 + fly)],
                color,
            );
            ctx.triangle(
                [(cx + 4.0, cy + fly), (x + w, cy - 6.0 + flap + fly), (x + w - 2.0, cy + 4.0 + fly)],
                color,
            );
            ctx.ellipse(cx, cy + fly, 6.0, 8.0, color);
            let eye = Rgba::hex(0xFEF08A);
            ctx.circle(cx - 3.0, cy - 2.0 + fly, 2.0, eye);
            ctx.circle(cx + 3.0, cy - 2.0 + fly, 2.0, eye);
        }
        EntityKind::Skeleton => {
            ctx.circle(cx, y + 8.0, 8.0, color);
            ctx.rect(cx - 6.0, y + 16.0, 12.0, h - 16.0, color);
            ctx.rect(cx - 6.0, y + 20.0, 12.0, 2.0, EYE_DARK);
            ctx.rect(cx - 6.0, y + 25.0, 12.0, 2.0, EYE_DARK);
            let look = entity.direction * 2.0;
            ctx.circle(cx - 3.0 + look, y + 7.0, 2.0, EYE_DARK);
            ctx.circle(cx + 3.0 + look, y + 7.0, 2.0, EYE_DARK);
        }
        EntityKind::Ghost => {
            let bob = (t / 250.0).sin() * 2.0;
            let body = color.with_alpha(0.8);
            ctx.ellipse(cx, cy - 2.0 + bob, w / 2.0, h / 2.0 - 2.0, body);
            ctx.rect(x, cy + bob, w, h / 2.0 - 2.0, body);
            ctx.circle(cx - 5.0, cy - 4.0 + bob, 3.0, EYE_DARK);
            ctx.circle(cx + 5.0, cy - 4.0 + bob, 3.0, EYE_DARK);
        }
        EntityKind::Spider => {
            let step = (t / 100.0).sin() * 2.0;
            for i in 0..4 {
                let lx = x + 2.0 + i as f32 * (w - 4.0) / 3.0;
                ctx.line((cx, cy), (lx, y + h + step * if i % 2 == 0 { 1.0 } else { -1.0 }), 2.0, color);
            }
            ctx.ellipse(cx, cy, w / 2.0 - 4.0, h / 2.0 - 2.0, color);
            ctx.circle(cx - 3.0, cy - 2.0, 1.5, Rgba::hex(0xEF4444));
            ctx.circle(cx + 3.0, cy - 2.0, 1.5, Rgba::hex(0xEF4444));
        }
        _ => ctx.rect(x, y, w, h, color),
    }

    if entity.max_health > 1 && entity.health < entity.max_health {
        let frac = entity.health as f32 / entity.max_health as f32;
        ctx.rect(x, y - 6.0, w, 3.0, Rgba::hex(0x374151));
        ctx.rect(x, y - 6.0, w * frac, 3.0, Rgba::hex(0xEF4444));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HazardPolicy, PlayConfig};
    use crate::entities::{Player, RunWorld, Terminal};

    fn floor_map(width: usize) -> GameMap {
        let mut map = GameMap::new(width, 10, 32.0);
        map.layers[0].fill_row(9, 0..width, TileKind::Ground);
        map
    }

    fn slime_at(x: f32) -> LiveEntity {
        LiveEntity::new(EntityKind::Slime, x, 288.0 - 20.0, 28.0, 20.0)
    }

    #[test]
    fn stomp_requires_falling_onto_the_top_band() {
        let enemy = slime_at(100.0);
        let mut player = LiveEntity::new(EntityKind::Player, 100.0, 268.0 - 20.0, 28.0, 28.0);
        player.vy = 3.0;
        assert!(is_stomp(&player, &enemy, 16.0));

        player.vy = -1.0;
        assert!(!is_stomp(&player, &enemy, 16.0));

        player.vy = 3.0;
        player.y = enemy.y + 17.0 - 28.0;
        assert!(!is_stomp(&player, &enemy, 16.0));

        player.y = enemy.y + 8.0 - 28.0;
        player.x = enemy.x + enemy.width - 14.0;
        assert!(!is_stomp(&player, &enemy, 16.0), "centre on the edge is not inside");
    }

    #[test]
    fn stomp_kills_enemy_and_bounces() {
        let map = floor_map(10);
        let config = PlayConfig::default();
        let mut body = LiveEntity::new(EntityKind::Player, 100.0, 248.0, 28.0, 28.0);
        body.vy = 4.0;
        let mut player = Player::new(body);
        let mut world = RunWorld::new(1);
        let mut enemy = slime_at(100.0);
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        assert_eq!(resolve_contact(&mut enemy, &mut ctx), Flow::Continue);
        assert!(enemy.dead);
        assert_eq!(ctx.world.score, 100);
        assert!((ctx.player.body.vy - (-7.2)).abs() < 1e-5);
        assert_eq!(ctx.world.particles.len(), 15);
        assert_eq!(ctx.world.texts[0].text, "+100");
    }

    #[test]
    fn stomp_overlap_without_falling_is_a_hit() {
        let map = floor_map(10);
        let config = PlayConfig::default();
        let mut player = Player::new(LiveEntity::new(EntityKind::Player, 100.0, 248.0, 28.0, 28.0));
        let mut world = RunWorld::new(1);
        let mut enemy = slime_at(100.0);
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        assert_eq!(resolve_contact(&mut enemy, &mut ctx), Flow::Halt);
        assert!(!enemy.dead);
        assert_eq!(ctx.world.score, 0);
        assert_eq!(ctx.world.terminal, Some(Terminal::Died));

        let mut config = PlayConfig::default();
        config.mode.hazard_policy = HazardPolicy::health_pool();
        let mut body = LiveEntity::new(EntityKind::Player, 100.0, 248.0, 28.0, 28.0);
        body.vy = -2.0;
        body.health = 3;
        body.max_health = 3;
        let mut player = Player::new(body);
        let mut world = RunWorld::new(1);
        let mut enemy = slime_at(100.0);
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        assert_eq!(resolve_contact(&mut enemy, &mut ctx), Flow::Continue);
        assert!(!enemy.dead);
        assert_eq!(ctx.world.score, 0);
        assert_eq!(ctx.player.body.health, 2);
    }

    #[test]
    fn side_contact_kills_under_instant_death() {
        let map = floor_map(10);
        let config = PlayConfig::default();
        let mut player = Player::new(LiveEntity::new(EntityKind::Player, 80.0, 260.0, 28.0, 28.0));
        let mut world = RunWorld::new(1);
        let mut enemy = slime_at(100.0);
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        assert_eq!(resolve_contact(&mut enemy, &mut ctx), Flow::Halt);
        assert!(ctx.world.game_over);
        assert_eq!(ctx.world.terminal, Some(Terminal::Died));
        assert!(!enemy.dead);
    }

    #[test]
    fn side_contact_knocks_back_under_health_pool() {
        let map = floor_map(10);
        let mut config = PlayConfig::default();
        config.mode.hazard_policy = HazardPolicy::health_pool();
        let mut body = LiveEntity::new(EntityKind::Player, 80.0, 260.0, 28.0, 28.0);
        body.health = 3;
        body.max_health = 3;
        let mut player = Player::new(body);
        let mut world = RunWorld::new(1);
        let mut enemy = slime_at(100.0);
        let mut ctx = TickContext {
            map: &map,
            config: &config,
            player: &mut player,
            world: &mut world,
        };
        assert_eq!(resolve_contact(&mut enemy, &mut ctx), Flow::Continue);
        assert_eq!(ctx.player.body.health, 2);
        assert_eq!(ctx.player.body.vx, -6.0);
        assert_eq!(ctx.player.invulnerable, 60);

        // A second touch while invulnerable does nothing.
        assert_eq!(resolve_contact(&mut enemy, &mut ctx), Flow::Continue);
        assert_eq!(ctx.player.body.health, 2);
    }

    #[test]
    fn patroller_turns_at_ledge() {
        let mut map = floor_map(10);
        map.layers[0].fill_row(9, 5..10, TileKind::Empty);
        let mut slime = slime_at(160.0 - 28.0 - 1.0);
        patrol_step(&map, &mut slime, 1.5, true);
        assert_eq!(slime.direction, -1.0);
    }

    #[test]
    fn patroller_turns_at_wall() {
        let mut map = floor_map(10);
        map.layers[0].set(5, 8, TileKind::Wall);
        let mut slime = slime_at(160.0 - 28.0 - 5.0);
        patrol_step(&map, &mut slime, 1.5, true);
        assert_eq!(slime.direction, -1.0);

        let mut leftward = slime_at(3.0);
        leftward.direction = -1.0;
        patrol_step(&map, &mut leftward, 1.5, true);
        assert_eq!(leftward.direction, 1.0, "map edge reads as wall");
    }

    #[test]
    fn flyer_ignores_ledges() {
        let map = GameMap::new(10, 10, 32.0);
        let mut bat = LiveEntity::new(EntityKind::Bat, 100.0, 100.0, 24.0, 24.0);
        patrol_step(&map, &mut bat, 2.0, false);
        assert_eq!(bat.direction, 1.0);
        assert_eq!(bat.x, 102.0);
    }
}
