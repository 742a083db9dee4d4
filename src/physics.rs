use crate::config::PhysicsConfig;
use crate::entities::{Flow, LiveEntity, TickContext};
use crate::events::{HurtCause, RunEventKind};
use crate::input::{Action, ActionState};
use crate::map::{GameMap, TileKind};
use crate::tile_query::{is_solid_at, tile_at};

/// Inset of the collision sample points from the box corners.
const SAMPLE_INSET: f32 = 2.0;

pub fn apply_input(body: &mut LiveEntity, input: &ActionState, cfg: &PhysicsConfig) {
    if input.held(Action::MoveLeft) {
        body.vx = -cfg.move_speed;
        body.direction = -1.0;
    } else if input.held(Action::MoveRight) {
        body.vx = cfg.move_speed;
        body.direction = 1.0;
    } else {
        body.vx *= cfg.friction;
        if body.vx.abs() < cfg.rest_epsilon {
            body.vx = 0.0;
        }
    }

    if input.held(Action::Jump) && body.grounded {
        body.vy = cfg.jump_velocity;
        body.grounded = false;
    }
}

pub fn apply_gravity(vy: &mut f32, cfg: &PhysicsConfig) {
    *vy = (*vy + cfg.gravity).min(cfg.max_fall_speed);
}

/// Moves along x, stopping flush against the tile edge if either side's
/// sample points land in a solid tile. The left side is checked first.
pub fn resolve_horizontal(map: &GameMap, body: &mut LiveEntity) {
    let ts = map.tile_size;
    let new_x = body.x + body.vx;
    let top = body.y + SAMPLE_INSET;
    let bottom = body.y + body.height - SAMPLE_INSET;

    let left = new_x;
    let right = new_x + body.width;
    if is_solid_at(map, left, top) || is_solid_at(map, left, bottom) {
        body.x = (new_x / ts).ceil() * ts;
        body.vx = 0.0;
    } else if is_solid_at(map, right, top) || is_solid_at(map, right, bottom) {
        body.x = (right / ts).floor() * ts - body.width;
        body.vx = 0.0;
    } else {
        body.x = new_x;
    }
}

/// Moves along y. Landing snaps the feet to the tile top and grounds the body;
/// a ceiling hit snaps the head to the tile bottom.
pub fn resolve_vertical(map: &GameMap, body: &mut LiveEntity) {
    let ts = map.tile_size;
    body.grounded = false;
    let new_y = body.y + body.vy;
    let left = body.x + SAMPLE_INSET;
    let right = body.x + body.width - SAMPLE_INSET;
    let feet = new_y + body.height;

    if body.vy > 0.0 && (is_solid_at(map, left, feet) || is_solid_at(map, right, feet)) {
        body.y = (feet / ts).floor() * ts - body.height;
        body.vy = 0.0;
        body.grounded = true;
    } else if body.vy < 0.0 && (is_solid_at(map, left, new_y) || is_solid_at(map, right, new_y)) {
        body.y = (new_y / ts).ceil() * ts;
        body.vy = 0.0;
    } else {
        body.y = new_y;
    }
}

/// Hazard tile under the feet or at the head, sampled on the centre line.
pub fn hazard_probe(map: &GameMap, body: &LiveEntity) -> Option<TileKind> {
    let cx = body.x + body.width / 2.0;
    [body.y + body.height, body.y]
        .into_iter()
        .map(|y| tile_at(map, cx, y))
        .find(|t| t.is_hazard())
}

/// One frame of player motion followed by the hazard check.
pub fn step_player(ctx: &mut TickContext<'_>) -> Flow {
    let cfg = &ctx.config.physics;
    let body = &mut ctx.player.body;
    apply_input(body, &ctx.world.input, cfg);
    apply_gravity(&mut body.vy, cfg);
    resolve_horizontal(ctx.map, body);
    resolve_vertical(ctx.map, body);

    match hazard_probe(ctx.map, &ctx.player.body) {
        Some(tile) => {
            if ctx.player.invulnerable == 0 {
                ctx.emit(RunEventKind::HazardTouched { tile });
            }
            ctx.hurt_player(HurtCause::Tile, None)
        }
        None => Flow::Continue,
    }
}
