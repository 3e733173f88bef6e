//! The 2D drawing contract the renderer is written against.
//!
//! [`Surface`] mirrors the small subset of a canvas-style 2D context that the
//! magic circle needs: an affine transform stack, stroke/fill state, path
//! building and two composite modes.  State pushes are only reachable through
//! [`Surface::scoped`], which hands back a [`Saved`] guard that pops the state
//! again when it goes out of scope, on every exit path.

use std::f32::consts::TAU;
use std::ops::{Deref, DerefMut};

use crate::color::Rgb;
use crate::VideoFrame;

// ════════════════════════════════════════════════════════════════════════════
// Transform: 2×3 affine matrix
// ════════════════════════════════════════════════════════════════════════════

/// Affine transform in canvas order: `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform {
    fn default() -> Self { Transform::IDENTITY }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    /// Post-multiply by a translation (the new origin is expressed in the
    /// current, already-transformed frame).
    pub fn translated(self, tx: f32, ty: f32) -> Transform {
        Transform {
            e: self.a * tx + self.c * ty + self.e,
            f: self.b * tx + self.d * ty + self.f,
            ..self
        }
    }

    /// Post-multiply by a rotation of `angle` radians.
    pub fn rotated(self, angle: f32) -> Transform {
        let (sin, cos) = angle.sin_cos();
        Transform {
            a:  self.a * cos + self.c * sin,
            b:  self.b * cos + self.d * sin,
            c: -self.a * sin + self.c * cos,
            d: -self.b * sin + self.d * cos,
            ..self
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// Uniform scale factor of the linear part (1.0 for rotations/translations).
    pub fn scale_factor(&self) -> f32 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Draw state
// ════════════════════════════════════════════════════════════════════════════

/// How new pixels combine with what is already on the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Composite {
    /// Ordinary alpha blending.
    #[default]
    SourceOver,
    /// Additive ("lighter"): overlapping strokes brighten instead of occlude.
    Lighter,
}

/// Everything a `save()` captures and a `restore()` brings back.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawState {
    pub transform:    Transform,
    pub global_alpha: f32,
    pub stroke:       Rgb,
    pub fill:         Rgb,
    pub line_width:   f32,
    pub glow_blur:    f32,
    pub glow_color:   Rgb,
    pub composite:    Composite,
}

impl Default for DrawState {
    fn default() -> Self {
        DrawState {
            transform:    Transform::IDENTITY,
            global_alpha: 1.0,
            stroke:       Rgb::BLACK,
            fill:         Rgb::BLACK,
            line_width:   1.0,
            glow_blur:    0.0,
            glow_color:   Rgb::BLACK,
            composite:    Composite::SourceOver,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Path: device-space polylines
// ════════════════════════════════════════════════════════════════════════════

/// One connected run of points.  Points are stored already transformed, so a
/// later `rotate()` does not move geometry that was added before it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubPath {
    pub points: Vec<(f32, f32)>,
    pub closed: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub subpaths: Vec<SubPath>,
}

impl Path {
    pub fn clear(&mut self) { self.subpaths.clear(); }

    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|s| s.points.is_empty())
    }

    pub fn move_to(&mut self, p: (f32, f32)) {
        self.subpaths.push(SubPath { points: vec![p], closed: false });
    }

    pub fn line_to(&mut self, p: (f32, f32)) {
        match self.subpaths.last_mut() {
            Some(sp) if !sp.closed => sp.points.push(p),
            _ => self.move_to(p),
        }
    }

    pub fn close(&mut self) {
        if let Some(sp) = self.subpaths.last_mut() {
            sp.closed = true;
        }
    }

    /// Append a full circle as its own closed sub-path, flattened under `t`.
    pub fn circle(&mut self, t: &Transform, cx: f32, cy: f32, r: f32) {
        let device_r = r.abs() * t.scale_factor();
        let segments = ((device_r * 0.75).ceil() as usize).clamp(12, 256);
        let points = (0..segments)
            .map(|i| {
                let a = i as f32 / segments as f32 * TAU;
                t.apply(cx + r * a.cos(), cy + r * a.sin())
            })
            .collect();
        self.subpaths.push(SubPath { points, closed: true });
    }

    /// Every edge of every sub-path (closing edges included).
    pub fn segments(&self) -> impl Iterator<Item = ((f32, f32), (f32, f32))> + '_ {
        self.subpaths.iter().flat_map(|sp| {
            let n = sp.points.len();
            let closing = if sp.closed && n > 2 { n } else { n.saturating_sub(1) };
            (0..closing).map(move |i| (sp.points[i], sp.points[(i + 1) % n]))
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Surface trait
// ════════════════════════════════════════════════════════════════════════════

/// A canvas-style 2D drawing target.
///
/// Implementors provide the state stack and rasterisation; callers push state
/// with [`Surface::scoped`] rather than calling `save`/`restore` directly.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Push a copy of the current [`DrawState`].  Prefer [`Surface::scoped`].
    fn save(&mut self);
    /// Pop the most recent [`DrawState`].  A pop on an empty stack is a no-op.
    fn restore(&mut self);
    /// Number of saved states currently on the stack.
    fn depth(&self) -> usize;

    fn state(&self) -> &DrawState;
    fn state_mut(&mut self) -> &mut DrawState;

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    /// Full circle around `(cx, cy)`; always starts a new sub-path.
    fn arc(&mut self, cx: f32, cy: f32, r: f32);
    fn close_path(&mut self);
    fn stroke(&mut self);
    fn fill(&mut self);

    /// Reset every pixel to black.
    fn clear(&mut self);
    /// Blit `frame` scaled to the whole surface and flipped horizontally.
    fn draw_image_mirrored(&mut self, frame: &VideoFrame);

    /// Push state and return a guard that restores it on drop.
    fn scoped(&mut self) -> Saved<'_, Self>
    where
        Self: Sized,
    {
        self.save();
        Saved { surface: self }
    }

    fn transform(&self) -> Transform { self.state().transform }

    fn translate(&mut self, tx: f32, ty: f32) {
        let t = self.state().transform.translated(tx, ty);
        self.state_mut().transform = t;
    }

    fn rotate(&mut self, angle: f32) {
        let t = self.state().transform.rotated(angle);
        self.state_mut().transform = t;
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.state_mut().global_alpha = alpha.clamp(0.0, 1.0);
    }

    fn set_stroke_color(&mut self, color: Rgb) { self.state_mut().stroke = color; }
    fn set_fill_color(&mut self, color: Rgb)   { self.state_mut().fill = color; }
    fn set_line_width(&mut self, width: f32)   { self.state_mut().line_width = width; }
    fn set_composite(&mut self, mode: Composite) { self.state_mut().composite = mode; }

    fn set_glow(&mut self, blur: f32, color: Rgb) {
        let s = self.state_mut();
        s.glow_blur  = blur.max(0.0);
        s.glow_color = color;
    }

    /// Convenience: begin a path holding one full circle.
    fn circle_path(&mut self, cx: f32, cy: f32, r: f32) {
        self.begin_path();
        self.arc(cx, cy, r);
    }
}

/// RAII guard returned by [`Surface::scoped`].
pub struct Saved<'a, S: Surface> {
    surface: &'a mut S,
}

impl<S: Surface> Deref for Saved<'_, S> {
    type Target = S;
    fn deref(&self) -> &S { self.surface }
}

impl<S: Surface> DerefMut for Saved<'_, S> {
    fn deref_mut(&mut self) -> &mut S { self.surface }
}

impl<S: Surface> Drop for Saved<'_, S> {
    fn drop(&mut self) { self.surface.restore(); }
}

// ════════════════════════════════════════════════════════════════════════════
// Recorder: a surface that only remembers what was asked of it
// ════════════════════════════════════════════════════════════════════════════


// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
