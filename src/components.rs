use bevy::prelude::*;

/// Sprite or text spawned from the current display list; replaced every frame.
#[derive(Component)]
pub struct PaintedNode;

#[derive(Component)]
pub struct CanvasCamera;
