//! Short-lived glowing motes drifting off the circle's ring.
//!
//! Purely decorative and time-driven: one emission attempt per tick, every
//! particle integrated by the wall-clock `dt` the renderer passes in, and any
//! particle whose life reaches zero dropped in that same tick.

use std::f32::consts::TAU;

use crate::color::Rgb;
use crate::geometry::Point;
use crate::source::RandomSource;
use crate::surface::Surface;

/// A draw above this emits one particle (≈70 % of ticks).
pub const EMIT_THRESHOLD: f32 = 0.3;
/// Each velocity component is uniform in `[-MAX_SPEED, MAX_SPEED]`.
pub const MAX_SPEED: f32 = 20.0;
/// Stylistic multiplier on `velocity · dt`; kept for visual parity.
pub const DRIFT_MULTIPLIER: f32 = 20.0;
/// Life lost per second.
pub const DECAY_PER_SEC: f32 = 1.5;
pub const MIN_SIZE: f32 = 1.0;
pub const MAX_SIZE: f32 = 4.0;
/// Glow blur used when drawing particles.
pub const GLOW_BLUR: f32 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x:    f32,
    pub y:    f32,
    pub vx:   f32,
    pub vy:   f32,
    /// Always in `(0, 1]` while the particle is alive.
    pub life: f32,
    pub size: f32,
}

/// Owns the live particles, in emission order.
#[derive(Clone, Debug, Default)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
}

impl ParticleSystem {
    pub fn new() -> Self { ParticleSystem::default() }

    pub fn particles(&self) -> &[Particle] { &self.particles }
    pub fn len(&self) -> usize { self.particles.len() }
    pub fn is_empty(&self) -> bool { self.particles.is_empty() }

    /// One emission attempt.  Draws from `rng` in a fixed order: gate, angle,
    /// vx, vy, size (the last four only when the gate passes).
    pub fn emit<R: RandomSource>(&mut self, center: Point, radius: f32, rng: &mut R) -> bool {
        if rng.next_unit() <= EMIT_THRESHOLD {
            return false;
        }
        let angle = rng.next_unit() * TAU;
        let vx    = (rng.next_unit() - 0.5) * 2.0 * MAX_SPEED;
        let vy    = (rng.next_unit() - 0.5) * 2.0 * MAX_SPEED;
        let size  = MIN_SIZE + rng.next_unit() * (MAX_SIZE - MIN_SIZE);
        self.particles.push(Particle {
            x: center.x + angle.cos() * radius,
            y: center.y + angle.sin() * radius,
            vx,
            vy,
            life: 1.0,
            size,
        });
        true
    }

    /// Integrate every particle by `dt` seconds and drop the dead ones.
    pub fn advance(&mut self, dt: f32) {
        let step = dt * DRIFT_MULTIPLIER;
        let decay = dt * DECAY_PER_SEC;
        self.particles.retain_mut(|p| {
            p.x    += p.vx * step;
            p.y    += p.vy * step;
            p.life -= decay;
            p.life > 0.0
        });
    }

    /// Emit, then advance everything (the newcomer included).
    pub fn update<R: RandomSource>(&mut self, center: Point, radius: f32, dt: f32, rng: &mut R) {
        self.emit(center, radius, rng);
        self.advance(dt);
    }

    /// Filled dots in `color`, each faded by its remaining life.
    pub fn draw<S: Surface>(&self, surface: &mut S, color: Rgb) {
        let mut s = surface.scoped();
        s.set_glow(GLOW_BLUR, color);
        s.set_fill_color(color);
        for p in &self.particles {
            s.set_global_alpha(p.life);
            s.circle_path(p.x, p.y, p.size);
            s.fill();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
