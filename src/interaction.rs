use crate::entities::{stand_on, Behavior, Flow, LiveEntity, TickContext};
use crate::events::RunEventKind;
use crate::input::Action;
use crate::render::{DrawContext, Rgba, TextAlign};
use crate::tile_query::{is_solid_at, Aabb};

pub const PORTAL_COLOR: Rgba = Rgba::hex(0xA855F7);
const COIN_COLOR: Rgba = Rgba::hex(0xEAB308);
const GEM_COLOR: Rgba = Rgba::hex(0x22D3EE);
const HEART_COLOR: Rgba = Rgba::hex(0xEF4444);
const KEY_COLOR: Rgba = Rgba::hex(0xFACC15);
const SPARK_COLOR: Rgba = Rgba::hex(0xFDE047);
const DOOR_COLOR: Rgba = Rgba::hex(0x8B7355);
const BLOCK_COLOR: Rgba = Rgba::hex(0x374151);
const SPRING_COLOR: Rgba = Rgba::hex(0xF97316);
const CHECKPOINT_ON: Rgba = Rgba::hex(0x22C55E);
const CHECKPOINT_OFF: Rgba = Rgba::hex(0x6B7280);

const PLATFORM_SPEED: f32 = 1.0;
const PLATFORM_RANGE: f32 = 96.0;
/// How far the player's feet may be from a platform top and still ride it.
const RIDE_TOLERANCE: f32 = 2.0;

/// Pushes the player out of `solid` along the axis of least penetration.
pub fn push_out(ctx: &mut TickContext<'_>, solid: &Aabb) {
    let body = &mut ctx.player.body;
    let aabb = body.aabb();
    if !aabb.overlaps(solid) {
        return;
    }
    let (px, py) = aabb.penetration(solid);
    if px < py {
        body.x = if aabb.center_x() < solid.center_x() {
            solid.x - body.width
        } else {
            solid.right()
        };
        body.vx = 0.0;
    } else if aabb.center_y() < solid.center_y() {
        body.y = solid.y - body.height;
        body.vy = 0.0;
        body.grounded = true;
    } else {
        body.y = solid.bottom();
        body.vy = 0.0;
    }
}

fn touching(entity: &LiveEntity, ctx: &TickContext<'_>) -> bool {
    ctx.player.body.aabb().overlaps(&entity.aabb())
}

#[derive(Clone, Copy)]
pub enum Loot {
    Coin,
    Gem,
    Heart,
    Key,
}

pub struct Collectible {
    pub loot: Loot,
}

pub static COIN: Collectible = Collectible { loot: Loot::Coin };
pub static GEM: Collectible = Collectible { loot: Loot::Gem };
pub static HEART: Collectible = Collectible { loot: Loot::Heart };
pub static KEY: Collectible = Collectible { loot: Loot::Key };

impl Behavior for Collectible {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        if entity.dead || !touching(entity, ctx) {
            return Flow::Continue;
        }
        entity.dead = true;
        let (cx, cy) = entity.center();
        match self.loot {
            Loot::Coin | Loot::Gem => {
                let (reward, color) = match self.loot {
                    Loot::Coin => (ctx.config.rewards.coin, COIN_COLOR),
                    _ => (ctx.config.rewards.gem, GEM_COLOR),
                };
                ctx.add_score(reward);
                ctx.emit(RunEventKind::Collected {
                    item: entity.kind,
                    reward,
                });
                ctx.burst(cx, cy, color, 10);
                ctx.float_text(cx, entity.y, format!("+{reward}"), color);
            }
            Loot::Heart => {
                let body = &mut ctx.player.body;
                body.health = (body.health + 1).min(body.max_health);
                let health = body.health;
                ctx.emit(RunEventKind::Healed { health });
                ctx.burst(cx, cy, HEART_COLOR, 10);
                ctx.float_text(cx, entity.y, "+1 HP", HEART_COLOR);
            }
            Loot::Key => {
                ctx.world.doors_open = true;
                ctx.emit(RunEventKind::DoorsUnlocked);
                ctx.burst(cx, cy, KEY_COLOR, 10);
                ctx.float_text(cx, entity.y, "Doors unlocked!", KEY_COLOR);
            }
        }
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        let (cx, cy) = entity.center();
        match self.loot {
            Loot::Coin => {
                let spin = (ctx.elapsed_ms / 200.0).sin().abs();
                ctx.ellipse(cx, cy, w / 2.0 - 2.0, (h / 2.0 - 2.0) * (0.3 + spin * 0.7), COIN_COLOR);
            }
            Loot::Gem => {
                ctx.triangle([(x + 2.0, cy), (x + w - 2.0, cy), (cx, y + 2.0)], GEM_COLOR);
                ctx.triangle(
                    [(x + 2.0, cy), (x + w - 2.0, cy), (cx, y + h - 2.0)],
                    Rgba::hex(0x0891B2),
                );
            }
            Loot::Heart => {
                let pulse = 1.0 + (ctx.elapsed_ms / 250.0).sin() * 0.08;
                let r = w / 4.0 * pulse;
                ctx.circle(cx - r, y + h / 3.0, r, HEART_COLOR);
                ctx.circle(cx + r, y + h / 3.0, r, HEART_COLOR);
                ctx.triangle(
                    [(x + 1.0, y + h / 3.0 + 2.0), (x + w - 1.0, y + h / 3.0 + 2.0), (cx, y + h - 2.0)],
                    HEART_COLOR,
                );
            }
            Loot::Key => {
                ctx.circle(cx, y + 6.0, 5.0, KEY_COLOR);
                ctx.rect(cx - 1.5, y + 10.0, 3.0, h - 12.0, KEY_COLOR);
                ctx.rect(cx, y + h - 8.0, 5.0, 3.0, KEY_COLOR);
            }
        }
    }
}

pub struct Lever;
pub static LEVER: Lever = Lever;

impl Behavior for Lever {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        if !ctx.world.input.latched(Action::Interact) {
            return Flow::Continue;
        }
        let reach = entity.aabb().inflate(ctx.config.physics.lever_reach);
        if !ctx.player.body.aabb().overlaps(&reach) {
            return Flow::Continue;
        }
        ctx.world.input.consume(Action::Interact);
        ctx.world.doors_open = !ctx.world.doors_open;
        let doors_open = ctx.world.doors_open;
        ctx.emit(RunEventKind::LeverToggled { doors_open });
        let (cx, _) = entity.center();
        ctx.burst(cx, entity.y + 4.0, SPARK_COLOR, 8);
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        ctx.rect(x + w / 3.0, y + h / 2.0, w / 3.0, h / 2.0, Rgba::hex(0x4B5563));
        let angle: f32 = if ctx.doors_open { 0.5 } else { -0.5 };
        let tip = (x + w / 2.0 + angle.sin() * 12.0, y + 4.0);
        ctx.line((x + w / 2.0, y + h / 2.0), tip, 3.0, Rgba::hex(0x9CA3AF));
        let knob = if ctx.doors_open {
            Rgba::hex(0x22C55E)
        } else {
            Rgba::hex(0xDC2626)
        };
        ctx.circle(tip.0, tip.1, 4.0, knob);
    }

    fn persistent(&self) -> bool {
        true
    }
}

pub struct Door;
pub static DOOR: Door = Door;

impl Behavior for Door {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        if ctx.world.doors_open || !touching(entity, ctx) {
            return Flow::Continue;
        }
        let body = &mut ctx.player.body;
        body.x = if body.x < entity.x {
            entity.x - body.width
        } else {
            entity.x + entity.width
        };
        body.vx = 0.0;
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        if ctx.doors_open {
            ctx.rect(x + 2.0, y + 2.0, w - 4.0, h - 4.0, DOOR_COLOR.with_alpha(0.3));
        } else {
            ctx.rect(x + 2.0, y + 2.0, w - 4.0, h - 4.0, DOOR_COLOR);
            ctx.circle(x + w - 10.0, y + h / 2.0, 3.0, Rgba::hex(0xCA8A04));
        }
    }

    fn persistent(&self) -> bool {
        true
    }

    fn blocks_bullets(&self, _entity: &LiveEntity, doors_open: bool) -> bool {
        !doors_open
    }
}

pub struct WallBlock;
pub static WALL_BLOCK: WallBlock = WallBlock;

impl Behavior for WallBlock {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        push_out(ctx, &entity.aabb());
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        ctx.rect(x, y, w, h, BLOCK_COLOR);
        ctx.rect(x + 2.0, y + 2.0, w - 4.0, 4.0, Rgba::rgba(255, 255, 255, 0.1));
    }

    fn persistent(&self) -> bool {
        true
    }

    fn blocks_bullets(&self, _entity: &LiveEntity, _doors_open: bool) -> bool {
        true
    }
}

pub struct MovingPlatform;
pub static MOVING_PLATFORM: MovingPlatform = MovingPlatform;

impl Behavior for MovingPlatform {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        let speed = entity.prop_f32("speed").unwrap_or(PLATFORM_SPEED);
        let range = entity.prop_f32("range").unwrap_or(PLATFORM_RANGE);

        let body = &ctx.player.body;
        let feet = body.y + body.height;
        let riding = (feet - entity.y).abs() <= RIDE_TOLERANCE
            && body.x < entity.x + entity.width
            && body.x + body.width > entity.x;

        let prev_x = entity.x;
        entity.x += entity.direction * speed;
        let lead = if entity.direction > 0.0 {
            entity.x + entity.width
        } else {
            entity.x
        };
        let wall = is_solid_at(ctx.map, lead, entity.y + entity.height / 2.0);
        let min_x = entity.origin_x - range;
        let max_x = entity.origin_x + range;
        if wall || entity.x <= min_x || entity.x >= max_x {
            entity.x = if wall { prev_x } else { entity.x.clamp(min_x, max_x) };
            entity.direction = -entity.direction;
        }

        if riding {
            ctx.player.body.x += entity.x - prev_x;
        }
        push_out(ctx, &entity.aabb());
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        ctx.rect(x, y, w, h, Rgba::hex(0x64748B));
        ctx.rect(x, y, w, 3.0, Rgba::hex(0x94A3B8));
    }

    fn persistent(&self) -> bool {
        true
    }

    fn blocks_bullets(&self, _entity: &LiveEntity, _doors_open: bool) -> bool {
        true
    }
}

pub struct Trampoline;
pub static TRAMPOLINE: Trampoline = Trampoline;

impl Behavior for Trampoline {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        let body = &ctx.player.body;
        if body.vy <= 0.0 || body.y + body.height / 2.0 >= entity.y || !touching(entity, ctx) {
            return Flow::Continue;
        }
        let physics = &ctx.config.physics;
        let launch = physics.jump_velocity * physics.trampoline_boost;
        let body = &mut ctx.player.body;
        body.y = entity.y - body.height;
        body.vy = launch;
        body.grounded = false;
        ctx.emit(RunEventKind::Bounced);
        let (cx, _) = entity.center();
        ctx.burst(cx, entity.y, SPRING_COLOR, 6);
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        ctx.rect(x + 4.0, y + h / 2.0, 4.0, h / 2.0, Rgba::hex(0x4B5563));
        ctx.rect(x + w - 8.0, y + h / 2.0, 4.0, h / 2.0, Rgba::hex(0x4B5563));
        ctx.rect(x, y, w, h / 2.0, SPRING_COLOR);
    }

    fn persistent(&self) -> bool {
        true
    }
}

pub struct Checkpoint;
pub static CHECKPOINT: Checkpoint = Checkpoint;

impl Behavior for Checkpoint {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        if entity.activated || !touching(entity, ctx) {
            return Flow::Continue;
        }
        entity.activated = true;
        let body = &ctx.player.body;
        let spot = stand_on(&entity.aabb(), body.width, body.height);
        ctx.player.respawn = spot;
        ctx.emit(RunEventKind::CheckpointReached {
            x: spot.0,
            y: spot.1,
        });
        let (cx, _) = entity.center();
        ctx.burst(cx, entity.y + 8.0, CHECKPOINT_ON, 10);
        ctx.float_text(cx, entity.y - 10.0, "Checkpoint!", CHECKPOINT_ON);
        Flow::Continue
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, h) = (entity.x, entity.y, entity.height);
        ctx.rect(x + 6.0, y, 3.0, h, Rgba::hex(0x9CA3AF));
        let flag = if entity.activated {
            CHECKPOINT_ON
        } else {
            CHECKPOINT_OFF
        };
        let wave = (ctx.elapsed_ms / 150.0).sin() * 2.0;
        ctx.triangle([(x + 9.0, y + 2.0), (x + 9.0, y + 18.0), (x + 28.0, y + 10.0 + wave)], flag);
    }

    fn persistent(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, PartialEq)]
pub enum GoalLook {
    Portal,
    Flag,
}

/// Portal and end marker: touching either wins the run.
pub struct Goal {
    pub look: GoalLook,
}

pub static PORTAL: Goal = Goal {
    look: GoalLook::Portal,
};
pub static END: Goal = Goal {
    look: GoalLook::Flag,
};

impl Behavior for Goal {
    fn update(&self, entity: &mut LiveEntity, ctx: &mut TickContext<'_>) -> Flow {
        if ctx.world.game_over || !touching(entity, ctx) {
            return Flow::Continue;
        }
        ctx.win(&entity.aabb())
    }

    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        let (cx, cy) = entity.center();
        match self.look {
            GoalLook::Portal => {
                let pulse = (ctx.elapsed_ms / 500.0).sin() * 2.0;
                ctx.ellipse(cx, cy, w / 2.0 + pulse, h / 2.0 + pulse, Rgba::rgba(124, 58, 237, 0.35));
                ctx.ellipse(cx, cy, w / 2.0 * 0.75, h / 2.0 * 0.75, Rgba::hex(0x7C3AED));
                ctx.ellipse(cx, cy, w / 2.0 * 0.4, h / 2.0 * 0.4, PORTAL_COLOR);
            }
            GoalLook::Flag => {
                ctx.rect(x + 4.0, y, 3.0, h, Rgba::hex(0xE5E7EB));
                ctx.rect(x + 7.0, y + 2.0, w - 10.0, h / 3.0, Rgba::hex(0xEF4444));
                ctx.text(cx, y - 4.0, "END", 10.0, Rgba::hex(0xFFFFFF), TextAlign::Center);
            }
        }
    }

    fn persistent(&self) -> bool {
        true
    }
}

/// Start marker: no behavior, drawn as a faint pad.
pub struct StartMarker;
pub static START: StartMarker = StartMarker;

impl Behavior for StartMarker {
    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        let (x, y, w, h) = (entity.x, entity.y, entity.width, entity.height);
        ctx.rect(x, y + h - 4.0, w, 4.0, Rgba::hex(0x10B981).with_alpha(0.5));
    }

    fn persistent(&self) -> bool {
        true
    }
}

/// Kinds without behavior.
pub struct Inert;
pub static INERT: Inert = Inert;

impl Behavior for Inert {
    fn draw(&self, entity: &LiveEntity, ctx: &mut DrawContext<'_>) {
        ctx.rect(entity.x, entity.y, entity.width, entity.height, Rgba::hex(0x6B7280));
    }
}
