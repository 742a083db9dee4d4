use crate::config::Viewport;
use crate::tile_query::Aabb;

/// World-to-screen translation that centres `target`, clamped so the view
/// never leaves the map. Maps smaller than the viewport pin the offset to 0.
pub fn camera_offset(target: &Aabb, map_w: f32, map_h: f32, viewport: Viewport) -> (f32, f32) {
    let x = axis_offset(viewport.width, target.center_x(), map_w);
    let y = axis_offset(viewport.height, target.center_y(), map_h);
    (x, y)
}

fn axis_offset(view: f32, center: f32, extent: f32) -> f32 {
    let min = (view - extent).min(0.0);
    (view / 2.0 - center).clamp(min, 0.0)
}
