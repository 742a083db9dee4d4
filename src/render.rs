use serde::Serialize;

use crate::camera::camera_offset;
use crate::config::{HazardPolicy, Viewport};
use crate::entities::{behavior_for, LiveEntity};
use crate::map::{GameMap, TileKind};
use crate::projectiles;
use crate::simulation::Simulation;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
            a: 1.0,
        }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Scales the existing alpha, used for fading feedback.
    pub fn fade(self, factor: f32) -> Self {
        self.with_alpha(self.a * factor)
    }
}

pub const BACKGROUND: Rgba = Rgba::hex(0x0F172A);
const HUD_TEXT: Rgba = Rgba::hex(0xFFFFFF);
const HINT_TEXT: Rgba = Rgba::hex(0x94A3B8);
const OVERLAY: Rgba = Rgba::rgba(0, 0, 0, 0.7);
const OVERLAY_TITLE: Rgba = Rgba::hex(0xA855F7);
const OVERLAY_SCORE: Rgba = Rgba::hex(0xE9D5FF);
const PLAYER_COLOR: Rgba = Rgba::hex(0x10B981);
const EYE_WHITE: Rgba = Rgba::hex(0xFFFFFF);
pub const EYE_DARK: Rgba = Rgba::hex(0x1F2937);

pub const CONTROL_HINTS: &str = "WASD/Arrows: Move | Space: Jump | E: Interact | ESC: Exit";
const SHOOTER_HINTS: &str =
    "WASD/Arrows: Move | Space: Jump | E: Interact | F/Click: Fire | ESC: Exit";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TextAlign {
    Left,
    Center,
}

/// One drawing instruction in screen or world space (y grows downward).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DrawCmd {
    Clear(Rgba),
    PushTranslate { x: f32, y: f32 },
    PopTransform,
    Rect { x: f32, y: f32, w: f32, h: f32, color: Rgba },
    StrokeRect { x: f32, y: f32, w: f32, h: f32, color: Rgba },
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32, color: Rgba },
    Triangle { points: [(f32, f32); 3], color: Rgba },
    Line { from: (f32, f32), to: (f32, f32), width: f32, color: Rgba },
    Text { x: f32, y: f32, text: String, size: f32, color: Rgba, align: TextAlign },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Pass {
    Clear,
    Tiles,
    Entities,
    Bullets,
    Player,
    Particles,
    Texts,
    Hud,
    Overlay,
}

#[derive(Default, Debug, Serialize)]
pub struct Frame {
    pub commands: Vec<DrawCmd>,
    /// Pass markers with the index of the first command each pass emitted.
    pub passes: Vec<(Pass, usize)>,
}

impl Frame {
    pub fn begin(&mut self, pass: Pass) {
        self.passes.push((pass, self.commands.len()));
    }

    pub fn push(&mut self, cmd: DrawCmd) {
        self.commands.push(cmd);
    }

    #[cfg(test)]
    pub fn pass_order(&self) -> Vec<Pass> {
        self.passes.iter().map(|(p, _)| *p).collect()
    }

    /// Commands emitted during `pass`.
    #[cfg(test)]
    pub fn pass_commands(&self, pass: Pass) -> &[DrawCmd] {
        let Some(i) = self.passes.iter().position(|(p, _)| *p == pass) else {
            return &[];
        };
        let start = self.passes[i].1;
        let end = self
            .passes
            .get(i + 1)
            .map(|(_, s)| *s)
            .unwrap_or(self.commands.len());
        &self.commands[start..end]
    }
}

/// Drawing surface handed to entity behaviors.
pub struct DrawContext<'a> {
    pub frame: &'a mut Frame,
    pub elapsed_ms: f32,
    pub doors_open: bool,
}

impl DrawContext<'_> {
    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.frame.push(DrawCmd::Rect { x, y, w, h, color });
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.frame.push(DrawCmd::StrokeRect { x, y, w, h, color });
    }

    pub fn ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32, color: Rgba) {
        self.frame.push(DrawCmd::Ellipse { cx, cy, rx, ry, color });
    }

    pub fn circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgba) {
        self.ellipse(cx, cy, r, r, color);
    }

    pub fn triangle(&mut self, points: [(f32, f32); 3], color: Rgba) {
        self.frame.push(DrawCmd::Triangle { points, color });
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba) {
        self.frame.push(DrawCmd::Line {
            from,
            to,
            width,
            color,
        });
    }

    pub fn text(&mut self, x: f32, y: f32, text: impl Into<String>, size: f32, color: Rgba, align: TextAlign) {
        self.frame.push(DrawCmd::Text {
            x,
            y,
            text: text.into(),
            size,
            color,
            align,
        });
    }
}

fn draw_tile(ctx: &mut DrawContext<'_>, tile: TileKind, px: f32, py: f32, ts: f32) {
    match tile {
        TileKind::Empty => {}
        TileKind::Ground => {
            ctx.rect(px, py, ts, ts, Rgba::hex(0x8B7355));
            ctx.rect(px, py, ts, 4.0, Rgba::hex(0x4A3728));
        }
        TileKind::Wall => {
            ctx.rect(px, py, ts, ts, Rgba::hex(0x4B5563));
            ctx.stroke_rect(px + 2.0, py + 2.0, ts - 4.0, ts - 4.0, Rgba::hex(0x374151));
        }
        TileKind::Water => {
            ctx.rect(px, py, ts, ts, Rgba::hex(0x0284C7));
            ctx.rect(px, py, ts, ts / 2.0, Rgba::hex(0x38BDF8));
        }
        TileKind::Spike => {
            ctx.rect(px, py + ts / 2.0, ts, ts / 2.0, Rgba::hex(0x374151));
            let spike = Rgba::hex(0x94A3B8);
            ctx.triangle(
                [
                    (px + 4.0, py + ts),
                    (px + ts / 4.0, py + 4.0),
                    (px + ts / 2.0 - 4.0, py + ts),
                ],
                spike,
            );
            ctx.triangle(
                [
                    (px + ts / 2.0 + 4.0, py + ts),
                    (px + ts * 3.0 / 4.0, py + 4.0),
                    (px + ts - 4.0, py + ts),
                ],
                spike,
            );
        }
        TileKind::Lava => {
            ctx.rect(px, py, ts, ts, Rgba::hex(0xDC2626));
            ctx.rect(px, py, ts, ts * 0.6, Rgba::hex(0xF97316));
            ctx.rect(px, py, ts, ts * 0.2, Rgba::hex(0xFCD34D));
        }
    }
}

fn draw_tiles(ctx: &mut DrawContext<'_>, map: &GameMap) {
    let ts = map.tile_size;
    for layer in map.layers.iter().filter(|l| l.visible) {
        for row in 0..map.height {
            for col in 0..map.width {
                let tile = layer.get(col, row);
                draw_tile(ctx, tile, col as f32 * ts, row as f32 * ts, ts);
            }
        }
    }
}

pub fn draw_player(ctx: &mut DrawContext<'_>, body: &LiveEntity) {
    let (x, y, w, h) = (body.x, body.y, body.width, body.height);
    ctx.rect(x + 2.0, y + 2.0, w - 4.0, h - 4.0, PLAYER_COLOR);
    // Pupils look the way the player faces.
    let look = body.direction;
    let eye_y = y + h / 3.0;
    for eye_x in [x + w / 3.0, x + w * 2.0 / 3.0] {
        ctx.circle(eye_x + 2.0 * look, eye_y, 4.0, EYE_WHITE);
        ctx.circle(eye_x + 3.0 * look, eye_y, 2.0, EYE_DARK);
    }
}

fn draw_hud(ctx: &mut DrawContext<'_>, sim: &Simulation, viewport: Viewport) {
    let world = sim.world();
    ctx.text(
        20.0,
        40.0,
        format!("Score: {}", world.score),
        20.0,
        HUD_TEXT,
        TextAlign::Left,
    );

    if let HazardPolicy::HealthPool { .. } = sim.config().mode.hazard_policy {
        let body = &sim.player().body;
        for i in 0..body.max_health {
            let color = if i < body.health {
                Rgba::hex(0xEF4444)
            } else {
                Rgba::hex(0x374151)
            };
            ctx.rect(20.0 + i as f32 * 22.0, 56.0, 18.0, 12.0, color);
        }
    }

    let hints = if sim.config().mode.shooter.is_some() {
        SHOOTER_HINTS
    } else {
        CONTROL_HINTS
    };
    ctx.text(
        20.0,
        viewport.height - 20.0,
        hints,
        14.0,
        HINT_TEXT,
        TextAlign::Left,
    );
}

fn draw_won_overlay(ctx: &mut DrawContext<'_>, score: u32, viewport: Viewport) {
    ctx.rect(0.0, 0.0, viewport.width, viewport.height, OVERLAY);
    let cx = viewport.width / 2.0;
    let cy = viewport.height / 2.0;
    ctx.text(cx, cy - 20.0, "Level Complete!", 48.0, OVERLAY_TITLE, TextAlign::Center);
    ctx.text(
        cx,
        cy + 30.0,
        format!("Final Score: {score}"),
        24.0,
        OVERLAY_SCORE,
        TextAlign::Center,
    );
}

fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Builds the full display list for one frame from the run state.
pub fn build_frame(sim: &Simulation, viewport: Viewport) -> Frame {
    let map = sim.map();
    let world = sim.world();
    let player = sim.player();

    let mut frame = Frame::default();
    let mut ctx = DrawContext {
        frame: &mut frame,
        elapsed_ms: sim.elapsed_ms(),
        doors_open: world.doors_open,
    };

    let background = sim
        .config()
        .background_color
        .map(|[r, g, b]| Rgba::rgba(unit_to_u8(r), unit_to_u8(g), unit_to_u8(b), 1.0))
        .unwrap_or(BACKGROUND);
    ctx.frame.begin(Pass::Clear);
    ctx.frame.push(DrawCmd::Clear(background));
    ctx.frame.push(DrawCmd::Rect {
        x: 0.0,
        y: 0.0,
        w: viewport.width,
        h: viewport.height,
        color: background,
    });

    let (ox, oy) = camera_offset(
        &player.body.aabb(),
        map.pixel_width(),
        map.pixel_height(),
        viewport,
    );
    ctx.frame.push(DrawCmd::PushTranslate { x: ox, y: oy });

    ctx.frame.begin(Pass::Tiles);
    draw_tiles(&mut ctx, map);

    ctx.frame.begin(Pass::Entities);
    for entity in sim.entities() {
        let behavior = behavior_for(entity.kind);
        if !entity.dead || behavior.persistent() {
            behavior.draw(entity, &mut ctx);
        }
    }

    ctx.frame.begin(Pass::Bullets);
    for bullet in &world.bullets {
        projectiles::draw(bullet, &mut ctx);
    }

    ctx.frame.begin(Pass::Player);
    if !world.game_over {
        // Blink at 10 Hz while invulnerable.
        let visible = player.invulnerable == 0 || (player.invulnerable / 6) % 2 == 0;
        if visible {
            draw_player(&mut ctx, &player.body);
        }
    }

    ctx.frame.begin(Pass::Particles);
    for p in &world.particles {
        ctx.circle(p.x, p.y, p.size, p.color.fade(p.life.max(0.0)));
    }

    ctx.frame.begin(Pass::Texts);
    for t in &world.texts {
        ctx.text(
            t.x,
            t.y,
            t.text.clone(),
            16.0,
            t.color.fade(t.life.max(0.0)),
            TextAlign::Center,
        );
    }
    ctx.frame.push(DrawCmd::PopTransform);

    ctx.frame.begin(Pass::Hud);
    draw_hud(&mut ctx, sim, viewport);

    if world.won {
        ctx.frame.begin(Pass::Overlay);
        draw_won_overlay(&mut ctx, world.score, viewport);
    }

    frame
}
