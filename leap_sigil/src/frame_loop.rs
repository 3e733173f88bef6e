//! Per-detection render step: backdrop, then (maybe) the sigil.

use sigil_oracle::SpellInfo;
use sigil_render::geometry::{mirror_to_screen, try_derive, HandGeometry};
use sigil_render::{Clock, MagicCircle, RandomSource, Rgb, Surface};

const LANDMARK_DOT: f32 = 3.0;

/// Owns the renderer for one session and feeds it each detection result.
pub struct FrameLoop<C: Clock, R: RandomSource> {
    renderer:             MagicCircle<C, R>,
    renderer_invocations: usize,
    last_geometry:        Option<HandGeometry>,
    show_landmarks:       bool,
}

impl<C: Clock, R: RandomSource> FrameLoop<C, R> {
    pub fn new(renderer: MagicCircle<C, R>) -> Self {
        FrameLoop {
            renderer,
            renderer_invocations: 0,
            last_geometry:        None,
            show_landmarks:       false,
        }
    }

    /// Also dot every landmark (mirrored like everything else).
    pub fn with_landmarks(mut self, on: bool) -> Self {
        self.show_landmarks = on;
        self
    }

    pub fn renderer(&self) -> &MagicCircle<C, R> { &self.renderer }
    pub fn renderer_invocations(&self) -> usize { self.renderer_invocations }
    /// Geometry of the most recent frame, `None` if it had no hand.
    pub fn last_geometry(&self) -> Option<HandGeometry> { self.last_geometry }

    /// Clear, draw the camera image mirrored and, if a hand is present, draw
    /// the sigil on it in the spell's color.  A hand whose landmarks are not
    /// finite counts as no hand.
    pub fn on_result<S: Surface>(&mut self, surface: &mut S, result: &crate::DetectionResult, spell: &SpellInfo) {
        surface.clear();
        surface.draw_image_mirrored(&result.image);

        let (w, h) = (surface.width() as f32, surface.height() as f32);
        let Some((hand, geometry)) = result
            .primary_hand()
            .and_then(|hand| try_derive(hand, w, h).map(|g| (hand, g)))
        else {
            self.last_geometry = None;
            return;
        };

        self.renderer.draw_default_opacity(surface, geometry.anchor, geometry.radius, &spell.color);
        self.renderer_invocations += 1;
        self.last_geometry = Some(geometry);

        if self.show_landmarks {
            let mut s = surface.scoped();
            s.set_fill_color(Rgb::WHITE);
            s.set_global_alpha(0.8);
            for p in hand.points() {
                let q = mirror_to_screen(*p, w, h);
                s.circle_path(q.x, q.y, LANDMARK_DOT);
                s.fill();
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
