//! The magic circle: a layered, rotating sigil with a particle halo.
//!
//! One [`MagicCircle`] lives for a whole tracking session.  Each call to
//! [`MagicCircle::draw`] advances the animation exactly once:
//!
//! * rotation grows by a fixed step per call (so it speeds up with frame rate),
//! * particle aging and the core pulse follow the wall clock.
//!
//! Both rates are kept as they are; changing either alters how the sigil
//! feels at different frame rates.

use std::f32::consts::{FRAC_PI_4, TAU};
use std::f64::consts::TAU as TAU_F64;

use crate::color::Rgb;
use crate::geometry::Point;
use crate::particle::{Particle, ParticleSystem};
use crate::source::{Clock, RandomSource, SeededRandom, SystemClock};
use crate::surface::{Composite, Surface};

/// Rotation added per draw call, radians.
pub const ROTATION_STEP: f64 = 0.015;
/// Glow blur of the geometric layers.
pub const GLOW_BLUR: f32 = 20.0;

const RUNE_COUNT:        usize = 16;
const RUNE_RING_OFFSET:  f32 = 20.0;
const RUNE_RING_SPEED:   f64 = -0.4;
const MAIN_LINE_WIDTH:   f32 = 4.0;
const INNER_LINE_WIDTH:  f32 = 2.0;
const RUNE_LINE_WIDTH:   f32 = 1.0;
const SPOKE_COUNT:       usize = 8;
const CORE_FILL_OPACITY: f32 = 0.3;
const PULSE_AMPLITUDE:   f32 = 5.0;
const PULSE_RATE:        f64 = 0.005;

pub struct MagicCircle<C: Clock, R: RandomSource> {
    clock:     C,
    rng:       R,
    /// Accumulated in `f64`; an `f32` stops growing after a few days of frames.
    rotation:  f64,
    last_tick: Option<f64>,
    particles: ParticleSystem,
}

impl MagicCircle<SystemClock, SeededRandom> {
    /// Wall clock plus an OS-seeded (or fixed-seed) RNG.
    pub fn live(seed: Option<u64>) -> Self {
        MagicCircle::new(SystemClock::new(), SeededRandom::new(seed))
    }
}

impl<C: Clock, R: RandomSource> MagicCircle<C, R> {
    pub fn new(clock: C, rng: R) -> Self {
        MagicCircle {
            clock,
            rng,
            rotation:  0.0,
            last_tick: None,
            particles: ParticleSystem::new(),
        }
    }

    pub fn rotation(&self) -> f64 { self.rotation }
    pub fn particles(&self) -> &[Particle] { self.particles.particles() }
    pub fn particle_count(&self) -> usize { self.particles.len() }

    /// Seconds since the previous call; 0 on the first call and whenever the
    /// clock went backwards.
    fn tick(&mut self) -> (f64, f32) {
        let now = self.clock.now_ms();
        let dt = match self.last_tick {
            Some(prev) if now > prev => ((now - prev) / 1000.0) as f32,
            _ => 0.0,
        };
        self.last_tick = Some(now);
        self.rotation += ROTATION_STEP;
        (now, dt)
    }

    /// [`MagicCircle::draw`] at full opacity.
    pub fn draw_default_opacity<S: Surface>(&mut self, surface: &mut S, center: Point, radius: f32, color: &str) {
        self.draw(surface, center, radius, color, 1.0);
    }

    /// Advance the animation one step and paint the whole sigil.
    ///
    /// `color` is a hex string; anything unparseable paints in the default
    /// spell orange.  The surface's transform and state depth are the same on
    /// return as on entry.
    pub fn draw<S: Surface>(&mut self, surface: &mut S, center: Point, radius: f32, color: &str, opacity: f32) {
        let (now, dt) = self.tick();
        let color = Rgb::parse_or_default(color);

        let mut s = surface.scoped();
        s.set_composite(Composite::Lighter);

        self.particles.update(center, radius, dt, &mut self.rng);
        self.particles.draw(&mut *s, color);

        s.translate(center.x, center.y);
        s.set_global_alpha(opacity);
        s.set_stroke_color(color);
        s.set_glow(GLOW_BLUR, color);

        {
            let mut ring = s.scoped();
            ring.rotate(angle(self.rotation * RUNE_RING_SPEED));
            rune_ring(&mut *ring, radius + RUNE_RING_OFFSET, RUNE_COUNT);
        }

        s.set_line_width(MAIN_LINE_WIDTH);
        s.circle_path(0.0, 0.0, radius);
        s.stroke();

        {
            let mut inner = s.scoped();
            inner.rotate(angle(self.rotation));
            inner.set_line_width(INNER_LINE_WIDTH);
            polygon(&mut *inner, radius * 0.95, 4, 0.0);
            polygon(&mut *inner, radius * 0.95, 4, FRAC_PI_4);

            inner.circle_path(0.0, 0.0, radius * 0.5);
            inner.stroke();

            // Each rotate lands between the two ends of a spoke and is never
            // undone inside the loop, so the spokes fan out unevenly.
            for i in 0..SPOKE_COUNT {
                inner.begin_path();
                inner.move_to(radius * 0.2, 0.0);
                inner.rotate(i as f32 * FRAC_PI_4);
                inner.line_to(radius * 0.9, 0.0);
                inner.stroke();
            }
        }

        let pulse = (now * PULSE_RATE).sin() as f32 * PULSE_AMPLITUDE;
        s.circle_path(0.0, 0.0, radius * 0.15 + pulse);
        s.set_fill_color(color);
        s.set_global_alpha(CORE_FILL_OPACITY * opacity);
        s.fill();
        s.set_global_alpha(opacity);
        s.stroke();
    }
}

/// Reduce to one turn before narrowing, so large totals keep their precision.
fn angle(total: f64) -> f32 {
    total.rem_euclid(TAU_F64) as f32
}

/// `count` glyphs evenly spaced on a ring: a chevron plus a small dot.
fn rune_ring<S: Surface>(s: &mut S, radius: f32, count: usize) {
    s.set_line_width(RUNE_LINE_WIDTH);
    for i in 0..count {
        let mut g = s.scoped();
        g.rotate(i as f32 * TAU / count as f32);
        g.translate(radius, 0.0);

        g.begin_path();
        g.move_to(-5.0, -8.0);
        g.line_to(5.0, 0.0);
        g.line_to(-5.0, 8.0);
        g.stroke();

        g.circle_path(0.0, 0.0, 3.0);
        g.stroke();
    }
}

/// Closed regular polygon around the origin.
fn polygon<S: Surface>(s: &mut S, radius: f32, sides: usize, phase: f32) {
    s.begin_path();
    for i in 0..sides {
        let a = phase + i as f32 * TAU / sides as f32;
        let (x, y) = (radius * a.cos(), radius * a.sin());
        if i == 0 { s.move_to(x, y) } else { s.line_to(x, y) }
    }
    s.close_path();
    s.stroke();
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ManualClock, SequenceRandom};
    use crate::surface::recording::{Op, Recorder};
    use crate::surface::{Path, Transform};

    const ORANGE: &str = "#fb923c";

    /// Strokes per draw: 16 runes × (chevron + dot), main circle, two squares,
    /// inner circle, 8 spokes, core outline.
    const STROKES_PER_DRAW: usize = 32 + 1 + 2 + 1 + 8 + 1;
    const FIRST_SPOKE: usize = 36;

    fn circle(seq: Vec<f32>) -> (MagicCircle<ManualClock, SequenceRandom>, ManualClock) {
        let clock = ManualClock::starting_at(0.0);
        (MagicCircle::new(clock.clone(), SequenceRandom::new(seq)), clock)
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn starts_at_rest() {
        let (c, _) = circle(vec![0.0]);
        assert_eq!(c.rotation(), 0.0);
        assert_eq!(c.particle_count(), 0);
    }

    #[test]
    fn rotation_counts_calls_not_time() {
        let (mut c, clock) = circle(vec![0.0]);
        let mut r = Recorder::default();
        for i in 0..100 {
            clock.advance(if i % 2 == 0 { 1.0 } else { 250.0 });
            c.draw_default_opacity(&mut r, Point::new(640.0, 360.0), 100.0, ORANGE);
        }
        assert!((c.rotation() - 0.015 * 100.0).abs() < 1e-4);
    }

    #[test]
    fn zero_dt_leaves_particles_in_place() {
        // First draw emits (vx = +10, vy = -10); second draw skips emission.
        let (mut c, _) = circle(vec![0.9, 0.5, 0.75, 0.25, 0.5, 0.0]);
        let mut r = Recorder::default();
        c.draw_default_opacity(&mut r, Point::new(100.0, 100.0), 80.0, ORANGE);
        let before = c.particles().to_vec();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].life, 1.0);

        c.draw_default_opacity(&mut r, Point::new(100.0, 100.0), 80.0, ORANGE);
        assert_eq!(c.particles(), &before[..]);
        assert!((c.rotation() - 0.03).abs() < 1e-6);
    }

    #[test]
    fn clock_regression_is_treated_as_zero_dt() {
        let (mut c, clock) = circle(vec![0.9, 0.5, 0.75, 0.25, 0.5, 0.0]);
        let mut r = Recorder::default();
        clock.set(5_000.0);
        c.draw_default_opacity(&mut r, Point::new(0.0, 0.0), 80.0, ORANGE);
        let before = c.particles().to_vec();
        clock.set(1_000.0);
        c.draw_default_opacity(&mut r, Point::new(0.0, 0.0), 80.0, ORANGE);
        assert_eq!(c.particles(), &before[..]);
    }

    #[test]
    fn one_second_gap_from_empty_is_survivable() {
        // Call 1 doesn't emit; call 2 emits then ages the newcomer by 1 s.
        let (mut c, clock) = circle(vec![0.0, 0.9, 0.5, 0.5, 0.5, 0.5]);
        let mut r = Recorder::default();
        c.draw_default_opacity(&mut r, Point::new(640.0, 360.0), 120.0, ORANGE);
        assert_eq!(c.particle_count(), 0);
        clock.advance(1_000.0);
        c.draw_default_opacity(&mut r, Point::new(640.0, 360.0), 120.0, ORANGE);
        assert!(c.particle_count() <= 1);
        assert_eq!(r.depth(), 0);
        assert_eq!(r.transform(), Transform::IDENTITY);
    }

    #[test]
    fn state_is_restored_and_balanced() {
        let (mut c, _) = circle(vec![0.9, 0.1, 0.2, 0.3, 0.4]);
        let mut r = Recorder::default();
        r.translate(3.0, 4.0);
        let before = r.state().clone();
        c.draw(&mut r, Point::new(200.0, 150.0), 90.0, "#00ff88", 0.7);
        assert_eq!(r.state(), &before);
        assert_eq!(r.depth(), 0);
        assert_eq!(r.max_depth, 3);
    }

    #[test]
    fn particles_are_drawn_before_the_geometry() {
        let (mut c, _) = circle(vec![0.9, 0.0, 0.5, 0.5, 0.0]);
        let mut r = Recorder::default();
        c.draw_default_opacity(&mut r, Point::new(100.0, 100.0), 100.0, ORANGE);
        match &r.ops[0] {
            Op::Fill { alpha, composite, color, .. } => {
                assert_eq!(*alpha, 1.0);
                assert_eq!(*composite, Composite::Lighter);
                assert_eq!(*color, Rgb::SPELL_ORANGE);
            }
            other => panic!("expected particle fill first, got {:?}", other),
        }
        assert!(matches!(r.ops[1], Op::Stroke { .. }));
        assert_eq!(r.strokes().len(), STROKES_PER_DRAW);
    }

    #[test]
    fn main_circle_is_centered_and_thick() {
        let (mut c, _) = circle(vec![0.0]);
        let mut r = Recorder::default();
        c.draw(&mut r, Point::new(100.0, 50.0), 100.0, ORANGE, 0.5);
        let main = r.ops.iter().filter(|op| matches!(op, Op::Stroke { .. })).nth(32);
        match main {
            Some(Op::Stroke { path, width, alpha, composite, .. }) => {
                assert_eq!(*width, 4.0);
                assert_eq!(*alpha, 0.5);
                assert_eq!(*composite, Composite::Lighter);
                assert!(close(path.subpaths[0].points[0], (200.0, 50.0)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn spokes_compound_their_rotations() {
        let (mut c, _) = circle(vec![0.0]);
        let mut r = Recorder::default();
        let (cx, cy, radius) = (300.0, 200.0, 100.0);
        c.draw_default_opacity(&mut r, Point::new(cx, cy), radius, ORANGE);

        let frame = Transform::IDENTITY.translated(cx, cy).rotated(ROTATION_STEP as f32);
        let strokes = r.strokes();
        let mut cumulative = 0.0f32;
        for i in 0..SPOKE_COUNT {
            let start_frame = frame.rotated(cumulative);
            cumulative += i as f32 * FRAC_PI_4;
            let end_frame = frame.rotated(cumulative);

            let pts = &strokes[FIRST_SPOKE + i].subpaths[0].points;
            assert_eq!(pts.len(), 2);
            assert!(close(pts[0], start_frame.apply(radius * 0.2, 0.0)), "spoke {} start", i);
            assert!(close(pts[1], end_frame.apply(radius * 0.9, 0.0)), "spoke {} end", i);
        }
        // 0+1+…+7 eighth-turns = 28·π/4 = 7π.
        assert!((cumulative - 7.0 * std::f32::consts::PI).abs() < 1e-4);
    }

    #[test]
    fn rotation_keeps_growing_in_long_sessions() {
        // Roughly 81 hours of frames at 60 fps.
        let (mut c, _) = circle(vec![0.0]);
        c.rotation = ROTATION_STEP * 17_500_000.0;
        let before = c.rotation();
        let mut r = Recorder::default();
        c.draw_default_opacity(&mut r, Point::new(0.0, 0.0), 60.0, ORANGE);
        assert!(c.rotation() > before);
        assert!((c.rotation() - before - ROTATION_STEP).abs() < 1e-6);
    }

    fn strokes_with_width(r: &Recorder) -> Vec<(&Path, f32)> {
        r.ops.iter().filter_map(|op| match op {
            Op::Stroke { path, width, .. } => Some((path, *width)),
            _ => None,
        }).collect()
    }

    #[test]
    fn rune_ring_counter_rotates_outside_the_main_circle() {
        let (mut c, _) = circle(vec![0.0]);
        let (cx, cy, radius) = (400.0, 300.0, 100.0);
        let mut warmup = Recorder::default();
        for _ in 0..3 {
            c.draw_default_opacity(&mut warmup, Point::new(cx, cy), radius, ORANGE);
        }
        let mut r = Recorder::default();
        c.draw_default_opacity(&mut r, Point::new(cx, cy), radius, ORANGE);
        let ring_angle = -0.4 * 4.0 * 0.015f32;
        let ring = Transform::IDENTITY.translated(cx, cy).rotated(ring_angle);
        let strokes = strokes_with_width(&r);

        for i in [0usize, 5, 15] {
            let glyph = ring.rotated(i as f32 * TAU / 16.0).translated(radius + 20.0, 0.0);

            let (chevron, width) = strokes[2 * i];
            assert_eq!(width, 1.0);
            let pts = &chevron.subpaths[0].points;
            assert_eq!(pts.len(), 3);
            assert!(close(pts[0], glyph.apply(-5.0, -8.0)), "rune {} top", i);
            assert!(close(pts[1], glyph.apply(5.0, 0.0)), "rune {} tip", i);
            assert!(close(pts[2], glyph.apply(-5.0, 8.0)), "rune {} bottom", i);

            let (dot, width) = strokes[2 * i + 1];
            assert_eq!(width, 1.0);
            assert!(dot.subpaths[0].closed);
            assert!(close(dot.subpaths[0].points[0], glyph.apply(3.0, 0.0)), "rune {} dot", i);
        }

        // First rune's tip, worked out by hand: 125 px out, turned backwards.
        let tip = (cx + 125.0 * ring_angle.cos(), cy + 125.0 * ring_angle.sin());
        assert!(close(strokes[0].0.subpaths[0].points[1], tip));
    }

    #[test]
    fn squares_and_inner_circle_follow_the_rotation() {
        let (mut c, _) = circle(vec![0.0]);
        let (cx, cy, radius) = (400.0, 300.0, 100.0);
        let mut warmup = Recorder::default();
        for _ in 0..2 {
            c.draw_default_opacity(&mut warmup, Point::new(cx, cy), radius, ORANGE);
        }
        let mut r = Recorder::default();
        c.draw_default_opacity(&mut r, Point::new(cx, cy), radius, ORANGE);
        let inner = Transform::IDENTITY.translated(cx, cy).rotated(3.0 * 0.015);
        let strokes = strokes_with_width(&r);

        for (slot, phase) in [(33usize, 0.0f32), (34, FRAC_PI_4)] {
            let (square, width) = strokes[slot];
            assert_eq!(width, 2.0);
            let sp = &square.subpaths[0];
            assert!(sp.closed);
            assert_eq!(sp.points.len(), 4);
            for (k, p) in sp.points.iter().enumerate() {
                let a = phase + k as f32 * TAU / 4.0;
                let want = inner.apply(0.95 * radius * a.cos(), 0.95 * radius * a.sin());
                assert!(close(*p, want), "square {} vertex {}", slot, k);
            }
        }

        let (inner_circle, width) = strokes[35];
        assert_eq!(width, 2.0);
        assert!(close(inner_circle.subpaths[0].points[0], inner.apply(0.5 * radius, 0.0)));
    }

    #[test]
    fn core_pulses_with_wall_clock() {
        let (mut c, clock) = circle(vec![0.0]);
        clock.set(std::f64::consts::PI * 100.0); // sin(now · 0.005) = 1
        let mut r = Recorder::default();
        c.draw(&mut r, Point::new(0.0, 0.0), 100.0, ORANGE, 0.5);
        let core_fill = r.ops.iter().rev().find_map(|op| match op {
            Op::Fill { path, alpha, .. } => Some((path.clone(), *alpha)),
            _ => None,
        });
        let (path, alpha) = core_fill.expect("core fill");
        assert!((alpha - 0.15).abs() < 1e-6);
        assert!(close(path.subpaths[0].points[0], (20.0, 0.0)));

        match r.ops.last() {
            Some(Op::Stroke { alpha, .. }) => assert_eq!(*alpha, 0.5),
            other => panic!("expected core outline last, got {:?}", other),
        }
    }

    #[test]
    fn unknown_color_paints_default_orange() {
        let (mut c, _) = circle(vec![0.0]);
        let mut r = Recorder::default();
        c.draw_default_opacity(&mut r, Point::new(0.0, 0.0), 60.0, "definitely not hex");
        for op in &r.ops {
            if let Op::Stroke { color, .. } = op {
                assert_eq!(*color, Rgb::SPELL_ORANGE);
            }
        }
    }
}
