//! Hand landmarks → circle anchor and radius.
//!
//! The camera image is shown mirrored so the user sees themselves as in a
//! mirror.  Every normalized hand coordinate therefore goes through
//! [`mirror_to_screen`] before it is used in screen space; mapping even one
//! point without the flip puts the graphic on the wrong side of the hand.

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices (21-point hand model)
// ════════════════════════════════════════════════════════════════════════════

pub const WRIST:      usize = 0;
pub const THUMB_CMC:  usize = 1;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_DIP:  usize = 7;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_DIP:   usize = 15;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_DIP:  usize = 19;
pub const PINKY_TIP:  usize = 20;

pub const LANDMARK_COUNT: usize = 21;

/// Smallest radius ever handed to the renderer, in pixels.
pub const MIN_RADIUS: f32 = 60.0;
/// Pinch distance → radius gain.
pub const PINCH_SCALE: f32 = 1.5;

// ════════════════════════════════════════════════════════════════════════════
// Point / HandLandmarkSet
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    /// Relative depth; carried through but unused by the 2D pipeline.
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self { Point { x, y, z: 0.0 } }
    pub const fn with_z(x: f32, y: f32, z: f32) -> Self { Point { x, y, z } }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One detected hand: 21 normalized keypoints, index-addressed.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarkSet {
    points: [Point; LANDMARK_COUNT],
}

impl HandLandmarkSet {
    pub fn new(points: [Point; LANDMARK_COUNT]) -> Self {
        HandLandmarkSet { points }
    }

    /// `None` unless `points` holds exactly 21 entries.
    pub fn from_slice(points: &[Point]) -> Option<Self> {
        let points: [Point; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(HandLandmarkSet { points })
    }

    pub fn get(&self, index: usize) -> Option<&Point> { self.points.get(index) }
    pub fn points(&self) -> &[Point; LANDMARK_COUNT] { &self.points }

    pub fn thumb_tip(&self) -> Point  { self.points[THUMB_TIP] }
    pub fn index_tip(&self) -> Point  { self.points[INDEX_TIP] }
    pub fn palm_center(&self) -> Point { self.points[MIDDLE_MCP] }
}

// ════════════════════════════════════════════════════════════════════════════
// Derivation
// ════════════════════════════════════════════════════════════════════════════

/// What the renderer needs from a hand: where to draw and how big.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandGeometry {
    pub anchor: Point,
    pub radius: f32,
}

impl HandGeometry {
    pub fn is_finite(&self) -> bool {
        self.anchor.x.is_finite() && self.anchor.y.is_finite() && self.radius.is_finite()
    }
}

/// Map a normalized point into pixel space of a horizontally mirrored image.
pub fn mirror_to_screen(p: Point, width: f32, height: f32) -> Point {
    Point::with_z((1.0 - p.x) * width, p.y * height, p.z)
}

/// Pixel distance between thumb tip and index fingertip.
///
/// Mirroring flips the sign of dx only, so the distance is the same in either
/// space.
pub fn pinch_distance(hand: &HandLandmarkSet, width: f32, height: f32) -> f32 {
    let thumb = mirror_to_screen(hand.thumb_tip(), width, height);
    let index = mirror_to_screen(hand.index_tip(), width, height);
    thumb.distance(&index)
}

/// `max(60, pinch · 1.5)`.
pub fn radius_for_pinch(pinch: f32) -> f32 {
    (pinch * PINCH_SCALE).max(MIN_RADIUS)
}

/// Derive anchor (palm center, mirrored) and radius (pinch-driven, floored).
pub fn derive(hand: &HandLandmarkSet, width: f32, height: f32) -> HandGeometry {
    HandGeometry {
        anchor: mirror_to_screen(hand.palm_center(), width, height),
        radius: radius_for_pinch(pinch_distance(hand, width, height)),
    }
}

/// [`derive`], or `None` if the palm, thumb tip or index tip is not a finite
/// point.  The radius floor would otherwise hide a NaN pinch.
pub fn try_derive(hand: &HandLandmarkSet, width: f32, height: f32) -> Option<HandGeometry> {
    let used = [hand.palm_center(), hand.thumb_tip(), hand.index_tip()];
    if used.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }
    let geometry = derive(hand, width, height);
    geometry.is_finite().then_some(geometry)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_with(palm: Point, thumb: Point, index: Point) -> HandLandmarkSet {
        let mut pts = [Point::new(0.5, 0.5); LANDMARK_COUNT];
        pts[MIDDLE_MCP] = palm;
        pts[THUMB_TIP]  = thumb;
        pts[INDEX_TIP]  = index;
        HandLandmarkSet::new(pts)
    }

    #[test]
    fn anchor_is_mirrored() {
        let hand = hand_with(Point::new(0.3, 0.25), Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        let g = derive(&hand, 1280.0, 720.0);
        assert_eq!(g.anchor.x, 896.0);
        assert_eq!(g.anchor.y, 180.0);
    }

    #[test]
    fn pinched_fingers_hit_the_floor() {
        let hand = hand_with(Point::new(0.5, 0.5), Point::new(0.5, 0.5), Point::new(0.5, 0.5));
        assert_eq!(derive(&hand, 1280.0, 720.0).radius, MIN_RADIUS);
    }

    #[test]
    fn spread_fingers_scale_by_one_and_a_half() {
        // 0.25 of 1280 wide = 320 px apart horizontally.
        let hand = hand_with(Point::new(0.5, 0.5), Point::new(0.25, 0.5), Point::new(0.5, 0.5));
        let d = pinch_distance(&hand, 1280.0, 720.0);
        assert_eq!(d, 320.0);
        assert_eq!(derive(&hand, 1280.0, 720.0).radius, (d * 1.5).max(60.0));
        assert_eq!(derive(&hand, 1280.0, 720.0).radius, 480.0);
    }

    #[test]
    fn pinch_uses_pixel_space_not_normalized() {
        // 0.1 vertically on a 720-tall surface = 72 px; 0.1 horizontally = 128 px.
        let vertical   = hand_with(Point::new(0.5, 0.5), Point::new(0.5, 0.4), Point::new(0.5, 0.5));
        let horizontal = hand_with(Point::new(0.5, 0.5), Point::new(0.4, 0.5), Point::new(0.5, 0.5));
        assert!((pinch_distance(&vertical, 1280.0, 720.0) - 72.0).abs() < 1e-3);
        assert!((pinch_distance(&horizontal, 1280.0, 720.0) - 128.0).abs() < 1e-3);
    }

    #[test]
    fn radius_never_below_floor() {
        for i in 0..=100 {
            let t = i as f32 / 100.0;
            let hand = hand_with(Point::new(t, 1.0 - t), Point::new(t, t), Point::new(1.0 - t, t * 0.5));
            let g = derive(&hand, 1280.0, 720.0);
            assert!(g.radius >= MIN_RADIUS, "radius {} at t={}", g.radius, t);
            let d = pinch_distance(&hand, 1280.0, 720.0);
            assert_eq!(g.radius, (d * 1.5).max(60.0));
        }
    }

    #[test]
    fn non_finite_landmarks_derive_nothing() {
        let ok = Point::new(0.5, 0.5);
        assert!(try_derive(&hand_with(ok, ok, ok), 1280.0, 720.0).is_some());
        assert!(try_derive(&hand_with(Point::new(f32::NAN, 0.5), ok, ok), 1280.0, 720.0).is_none());
        assert!(try_derive(&hand_with(ok, Point::new(0.5, f32::INFINITY), ok), 1280.0, 720.0).is_none());
        assert!(try_derive(&hand_with(ok, ok, Point::new(f32::NAN, f32::NAN)), 1280.0, 720.0).is_none());
        // Infinite surface size poisons the anchor.
        assert!(try_derive(&hand_with(ok, ok, ok), f32::INFINITY, 720.0).is_none());
    }

    #[test]
    fn from_slice_requires_21_points() {
        assert!(HandLandmarkSet::from_slice(&[Point::default(); 20]).is_none());
        assert!(HandLandmarkSet::from_slice(&[Point::default(); 22]).is_none());
        assert!(HandLandmarkSet::from_slice(&[Point::default(); 21]).is_some());
    }
}
