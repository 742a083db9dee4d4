use rand::rngs::SmallRng;
use rand::Rng;

use crate::render::Rgba;

const PARTICLE_GRAVITY: f32 = 0.2;
const PARTICLE_DECAY: f32 = 0.02;
/// Upward bias added to every particle's initial vertical velocity.
const BURST_LIFT: f32 = -2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: f32,
    pub color: Rgba,
    pub size: f32,
}

pub fn burst(
    particles: &mut Vec<Particle>,
    rng: &mut SmallRng,
    x: f32,
    y: f32,
    color: Rgba,
    count: usize,
) {
    particles.reserve(count);
    for _ in 0..count {
        particles.push(Particle {
            x,
            y,
            vx: (rng.gen::<f32>() - 0.5) * 8.0,
            vy: (rng.gen::<f32>() - 0.5) * 8.0 + BURST_LIFT,
            life: 1.0,
            color,
            size: rng.gen_range(2.0..6.0),
        });
    }
}

/// Advances every particle one frame and drops the expired ones.
pub fn update(particles: &mut Vec<Particle>) {
    particles.retain_mut(|p| {
        p.x += p.vx;
        p.y += p.vy;
        p.vy += PARTICLE_GRAVITY;
        p.life -= PARTICLE_DECAY;
        p.life > 0.0
    });
}
