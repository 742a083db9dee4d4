use std::collections::HashMap;

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::sprite::Anchor;

use crate::components::{CanvasCamera, PaintedNode};
use crate::config::{PlayConfig, Viewport};
use crate::game_runtime::ActiveRun;
use crate::render::{DrawCmd, Rgba, TextAlign};

const DISC_SIZE: u32 = 64;
const STROKE_WIDTH: f32 = 2.0;
const Z_STEP: f32 = 0.001;
const MAX_CACHED_TRIANGLES: usize = 256;

/// Paints the active run's display list with sprites and `Text2d`.
pub struct CanvasPlugin;

impl Plugin for CanvasPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ShapeTextures::default())
            .add_systems(Startup, setup_canvas)
            .add_systems(Update, paint_frame.run_if(resource_exists::<ActiveRun>));
    }
}

/// White masks tinted per command. Triangles are cached by shape.
#[derive(Resource, Default)]
pub struct ShapeTextures {
    disc: Handle<Image>,
    triangles: HashMap<[(i32, i32); 3], Handle<Image>>,
}

fn setup_canvas(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut shapes: ResMut<ShapeTextures>,
) {
    commands.spawn((Camera2d, CanvasCamera));
    shapes.disc = images.add(make_disc(DISC_SIZE));
    println!("[Tileplay] Canvas ready");
}

fn paint_frame(
    mut commands: Commands,
    run: Res<ActiveRun>,
    config: Res<PlayConfig>,
    mut shapes: ResMut<ShapeTextures>,
    mut images: ResMut<Assets<Image>>,
    mut clear: ResMut<ClearColor>,
    painted: Query<Entity, With<PaintedNode>>,
) {
    for entity in &painted {
        commands.entity(entity).despawn();
    }
    let Some(frame) = run.0.render(config.viewport) else {
        return;
    };

    let mut painter = Painter {
        commands: &mut commands,
        shapes: &mut *shapes,
        images: &mut *images,
        viewport: config.viewport,
        origin: (0.0, 0.0),
        stack: Vec::new(),
        z: 0.0,
    };
    for cmd in &frame.commands {
        if let DrawCmd::Clear(color) = cmd {
            clear.0 = to_color(*color);
        } else {
            painter.paint(cmd);
        }
    }
}

struct Painter<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    shapes: &'a mut ShapeTextures,
    images: &'a mut Assets<Image>,
    viewport: Viewport,
    origin: (f32, f32),
    stack: Vec<(f32, f32)>,
    z: f32,
}

impl Painter<'_, '_, '_> {
    fn paint(&mut self, cmd: &DrawCmd) {
        match cmd {
            DrawCmd::Clear(_) => {}
            DrawCmd::PushTranslate { x, y } => {
                self.stack.push(self.origin);
                self.origin = (self.origin.0 + x, self.origin.1 + y);
            }
            DrawCmd::PopTransform => {
                if let Some(origin) = self.stack.pop() {
                    self.origin = origin;
                }
            }
            DrawCmd::Rect { x, y, w, h, color } => self.rect(*x, *y, *w, *h, *color),
            DrawCmd::StrokeRect { x, y, w, h, color } => {
                let t = STROKE_WIDTH.min(*w).min(*h);
                self.rect(*x, *y, *w, t, *color);
                self.rect(*x, y + h - t, *w, t, *color);
                self.rect(*x, *y, t, *h, *color);
                self.rect(x + w - t, *y, t, *h, *color);
            }
            DrawCmd::Ellipse { cx, cy, rx, ry, color } => {
                let disc = self.shapes.disc.clone();
                self.sprite(Some(disc), *color, (*cx, *cy), Vec2::new(rx * 2.0, ry * 2.0), 0.0);
            }
            DrawCmd::Triangle { points, color } => self.triangle(*points, *color),
            DrawCmd::Line { from, to, width, color } => {
                let (dx, dy) = (to.0 - from.0, to.1 - from.1);
                let length = dx.hypot(dy);
                if length <= f32::EPSILON {
                    return;
                }
                let mid = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
                // Screen y points down, so the angle flips sign.
                self.sprite(None, *color, mid, Vec2::new(length, *width), -dy.atan2(dx));
            }
            DrawCmd::Text { x, y, text, size, color, align } => {
                let anchor = match align {
                    TextAlign::Left => Anchor::BottomLeft,
                    TextAlign::Center => Anchor::BottomCenter,
                };
                let pos = self.to_world((*x, *y)).extend(self.next_z());
                self.commands.spawn((
                    Text2d::new(text.clone()),
                    TextFont {
                        font_size: *size,
                        ..default()
                    },
                    TextColor(to_color(*color)),
                    anchor,
                    Transform::from_translation(pos),
                    PaintedNode,
                ));
            }
        }
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        self.sprite(None, color, (x + w / 2.0, y + h / 2.0), Vec2::new(w, h), 0.0);
    }

    fn triangle(&mut self, points: [(f32, f32); 3], color: Rgba) {
        let min_x = points.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let key = points.map(|(x, y)| ((x - min_x).round() as i32, (y - min_y).round() as i32));
        let w = key.iter().map(|p| p.0).max().unwrap_or(0).max(1);
        let h = key.iter().map(|p| p.1).max().unwrap_or(0).max(1);

        if self.shapes.triangles.len() >= MAX_CACHED_TRIANGLES {
            self.shapes.triangles.clear();
        }
        let images = &mut *self.images;
        let handle = self
            .shapes
            .triangles
            .entry(key)
            .or_insert_with(|| images.add(make_triangle_mask(key, w as u32, h as u32)))
            .clone();

        let center = (min_x + w as f32 / 2.0, min_y + h as f32 / 2.0);
        self.sprite(Some(handle), color, center, Vec2::new(w as f32, h as f32), 0.0);
    }

    fn sprite(
        &mut self,
        image: Option<Handle<Image>>,
        color: Rgba,
        center: (f32, f32),
        size: Vec2,
        rotation: f32,
    ) {
        let mut sprite = match image {
            Some(handle) => Sprite::from_image(handle),
            None => Sprite::default(),
        };
        sprite.color = to_color(color);
        sprite.custom_size = Some(size);
        let pos = self.to_world(center).extend(self.next_z());
        self.commands.spawn((
            sprite,
            Transform::from_translation(pos).with_rotation(Quat::from_rotation_z(rotation)),
            PaintedNode,
        ));
    }

    fn to_world(&self, (x, y): (f32, f32)) -> Vec2 {
        screen_to_world(x + self.origin.0, y + self.origin.1, self.viewport)
    }

    /// Later commands draw on top.
    fn next_z(&mut self) -> f32 {
        self.z += Z_STEP;
        self.z
    }
}

/// Maps a y-down screen pixel to Bevy's centered, y-up 2D space.
pub fn screen_to_world(x: f32, y: f32, viewport: Viewport) -> Vec2 {
    Vec2::new(x - viewport.width / 2.0, viewport.height / 2.0 - y)
}

fn to_color(c: Rgba) -> Color {
    Color::srgba(
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        c.a,
    )
}

fn make_image(width: u32, height: u32, data: Vec<u8>) -> Image {
    Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

fn set_alpha(data: &mut [u8], width: u32, x: u32, y: u32, alpha: u8) {
    let idx = ((y * width + x) * 4) as usize;
    if idx + 3 < data.len() {
        data[idx..idx + 3].fill(255);
        data[idx + 3] = alpha;
    }
}

fn make_disc(size: u32) -> Image {
    let mut data = vec![0u8; (size * size * 4) as usize];
    let r = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - r;
            let dy = y as f32 + 0.5 - r;
            // One pixel of edge falloff.
            let coverage = (r - dx.hypot(dy)).clamp(0.0, 1.0);
            set_alpha(&mut data, size, x, y, (coverage * 255.0) as u8);
        }
    }
    make_image(size, size, data)
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// White where the pixel center lies inside the triangle, either winding.
fn make_triangle_mask(points: [(i32, i32); 3], width: u32, height: u32) -> Image {
    let [a, b, c] = points.map(|(x, y)| (x as f32, y as f32));
    let mut data = vec![0u8; (width * height * 4) as usize];
    for y in 0..height {
        for x in 0..width {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let (e0, e1, e2) = (edge(a, b, p), edge(b, c, p), edge(c, a, p));
            let inside = (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0);
            if inside {
                set_alpha(&mut data, width, x, y, 255);
            }
        }
    }
    make_image(width, height, data)
}
