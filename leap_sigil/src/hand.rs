//! Hand sources, both from LeapMotion hardware and mouse/keyboard simulation.
//!
//! Either way the session sees a [`HandDetector`] that turns frames into
//! 21-point [`HandLandmarkSet`]s in normalized, unmirrored camera space, so
//! nothing downstream knows which one is plugged in.

use std::sync::mpsc::Receiver;

use sigil_render::geometry::{
    INDEX_TIP, LANDMARK_COUNT, MIDDLE_MCP, THUMB_TIP, WRIST,
};
use sigil_render::{HandLandmarkSet, Point, VideoFrame};

use crate::session::{Camera, DetectorOptions, HandDetector, SessionError};

// ════════════════════════════════════════════════════════════════════════════
// SimInput: raw events from the visualizer window
// ════════════════════════════════════════════════════════════════════════════

/// Raw input forwarded by the visualizer to the simulated hand.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer position in screen space, normalized to `[0, 1]`.
    Pointer { x: f32, y: f32 },
    /// Change of thumb–index spread, as a fraction of the frame width.
    Spread(f32),
    /// Show / hide the hand.
    ToggleHand,
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandDetector
// ════════════════════════════════════════════════════════════════════════════

pub const MIN_SPREAD:     f32 = 0.0;
pub const MAX_SPREAD:     f32 = 0.5;
pub const DEFAULT_SPREAD: f32 = 0.12;

/// Synthetic hand that follows the pointer.
///
/// The visualizer sends [`SimInput`] here; each `send()` drains what has
/// arrived and, unless the hand is hidden, reports one hand whose palm sits
/// under the pointer and whose thumb and index tips are `spread` apart.
pub struct SimHandDetector {
    rx:         Receiver<SimInput>,
    palm:       Point,
    spread:     f32,
    visible:    bool,
    configured: bool,
}

impl SimHandDetector {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimHandDetector {
            rx,
            palm:       Point::new(0.5, 0.5),
            spread:     DEFAULT_SPREAD,
            visible:    true,
            configured: false,
        }
    }

    pub fn is_visible(&self) -> bool { self.visible }
    pub fn spread(&self) -> f32 { self.spread }

    fn apply(&mut self, input: SimInput) {
        match input {
            // The screen shows the camera mirrored, so a pointer on the right
            // of the screen is a hand on the left of the camera image.
            SimInput::Pointer { x, y } => {
                self.palm = Point::new(1.0 - x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
            }
            SimInput::Spread(d) => {
                self.spread = (self.spread + d).clamp(MIN_SPREAD, MAX_SPREAD);
            }
            SimInput::ToggleHand => self.visible = !self.visible,
        }
    }
}

impl HandDetector for SimHandDetector {
    fn configure(&mut self, _options: &DetectorOptions) -> Result<(), SessionError> {
        self.configured = true;
        Ok(())
    }

    fn send(&mut self, _frame: &VideoFrame) -> Result<Vec<HandLandmarkSet>, SessionError> {
        if !self.configured {
            return Err(SessionError::Detector("send before configure".into()));
        }
        while let Ok(input) = self.rx.try_recv() {
            self.apply(input);
        }
        if !self.visible {
            return Ok(Vec::new());
        }
        Ok(vec![synth_hand(self.palm, self.spread)])
    }

    fn close(&mut self) { self.configured = false; }
}

/// A plausible open hand around `palm` (landmark 9), fingers pointing up,
/// thumb tip and index tip `spread` apart horizontally.
pub fn synth_hand(palm: Point, spread: f32) -> HandLandmarkSet {
    let mut pts = [palm; LANDMARK_COUNT];
    pts[WRIST] = Point::new(palm.x, palm.y + 0.12);

    // Fingers fan out from the knuckle row; base x offsets per finger.
    let base_dx = [0.05, 0.025, 0.0, -0.025, -0.05];
    for (f, dx) in base_dx.iter().enumerate() {
        for j in 0..4 {
            let t = j as f32 / 3.0;
            let (x, y) = if f == 0 {
                // Thumb sweeps out sideways from the wrist.
                (palm.x + dx + t * spread * 0.5, palm.y + 0.06 - t * 0.16)
            } else {
                (palm.x + dx * (1.0 + t), palm.y - t * 0.15)
            };
            pts[1 + f * 4 + j] = Point::new(x, y);
        }
    }
    pts[MIDDLE_MCP] = palm;
    // Pin the two pinch tips so their distance is exactly `spread` wide.
    pts[THUMB_TIP] = Point::new(palm.x + spread * 0.5, palm.y - 0.10);
    pts[INDEX_TIP] = Point::new(palm.x - spread * 0.5, palm.y - 0.10);
    HandLandmarkSet::new(pts)
}

// ════════════════════════════════════════════════════════════════════════════
// SimCamera: dim synthetic backdrop
// ════════════════════════════════════════════════════════════════════════════

/// Stands in for a webcam: a slowly drifting dark gradient.
#[derive(Debug, Default)]
pub struct SimCamera {
    width:   usize,
    height:  usize,
    running: bool,
    tick:    u32,
}

impl SimCamera {
    pub fn new() -> Self { SimCamera::default() }
    pub fn is_running(&self) -> bool { self.running }
}

impl Camera for SimCamera {
    fn start(&mut self, width: usize, height: usize) -> Result<(), SessionError> {
        if width == 0 || height == 0 {
            return Err(SessionError::Camera(format!("bad resolution {width}x{height}")));
        }
        self.width   = width;
        self.height  = height;
        self.running = true;
        Ok(())
    }

    fn grab(&mut self) -> Option<VideoFrame> {
        if !self.running { return None; }
        self.tick = self.tick.wrapping_add(1);
        let shift = (self.tick / 4) as usize;
        let (w, h) = (self.width, self.height);
        let mut pixels = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let r = (12 + ((x + shift) * 24 / w) % 24) as u32;
                let g = (8 + y * 12 / h) as u32;
                let b = (28 + (x + y) * 32 / (w + h)) as u32;
                pixels.push(0xFF00_0000 | r << 16 | g << 8 | b);
            }
        }
        Some(VideoFrame::new(w, h, pixels))
    }

    fn stop(&mut self) { self.running = false; }
}

// ════════════════════════════════════════════════════════════════════════════
// InteractionBox: LeapMotion millimetres → normalized camera space
// ════════════════════════════════════════════════════════════════════════════

/// The volume above the controller that maps onto the full frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionBox {
    /// Left/right extent (mm from the device centre).
    pub half_width: f32,
    /// Lowest and highest tracked palm height (mm above the device).
    pub floor:   f32,
    pub ceiling: f32,
}

impl Default for InteractionBox {
    fn default() -> Self {
        InteractionBox { half_width: 200.0, floor: 80.0, ceiling: 400.0 }
    }
}

impl InteractionBox {
    /// Map a Leap position to the unmirrored camera space the landmarks use:
    /// the user's right is the camera's left, higher is further up the frame.
    pub fn normalize(&self, x: f32, y: f32, z: f32) -> Point {
        let nx = 1.0 - (x + self.half_width) / (2.0 * self.half_width);
        let ny = 1.0 - (y - self.floor) / (self.ceiling - self.floor);
        Point::with_z(nx.clamp(0.0, 1.0), ny.clamp(0.0, 1.0), z / (2.0 * self.half_width))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandDetector: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand detector backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Frames from the camera are ignored; hands come from the controller's most
/// recent tracking event.  Joints map onto the 21-point layout as
/// wrist, then per digit MCP, PIP, DIP, tip.
#[cfg(feature = "leap")]
pub struct LeapHandDetector {
    connection: Option<leaprs::Connection>,
    bounds:     InteractionBox,
    last:       Vec<HandLandmarkSet>,
}

#[cfg(feature = "leap")]
impl LeapHandDetector {
    pub fn new() -> Self {
        LeapHandDetector { connection: None, bounds: InteractionBox::default(), last: Vec::new() }
    }
}

#[cfg(feature = "leap")]
impl Default for LeapHandDetector {
    fn default() -> Self { LeapHandDetector::new() }
}

#[cfg(feature = "leap")]
impl HandDetector for LeapHandDetector {
    fn configure(&mut self, options: &DetectorOptions) -> Result<(), SessionError> {
        use leaprs::*;
        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SessionError::Detector(format!("LeapC connection: {e:?}")))?;
        connection
            .open()
            .map_err(|e| SessionError::Detector(format!("LeapMotion device: {e:?}")))?;
        log::info!("[leap] connected, tracking up to {} hand(s)", options.max_hands);
        self.connection = Some(connection);
        Ok(())
    }

    fn send(&mut self, _frame: &VideoFrame) -> Result<Vec<HandLandmarkSet>, SessionError> {
        use leaprs::*;
        let Some(connection) = self.connection.as_mut() else {
            return Err(SessionError::Detector("not connected".into()));
        };
        // Drain whatever arrived since the last frame; keep the newest hands.
        while let Ok(msg) = connection.poll(0) {
            if let Event::Tracking(frame) = msg.event() {
                let bounds = self.bounds;
                self.last = frame
                    .hands()
                    .filter_map(|hand| leap_landmarks(&hand, &bounds))
                    .collect();
            }
        }
        Ok(self.last.clone())
    }

    fn close(&mut self) {
        if self.connection.take().is_some() {
            log::info!("[leap] connection closed");
        }
    }
}

#[cfg(feature = "leap")]
fn leap_landmarks(hand: &leaprs::Hand, bounds: &InteractionBox) -> Option<HandLandmarkSet> {
    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 { return None; }

    let mut pts = Vec::with_capacity(LANDMARK_COUNT);
    let wrist = digits[2].metacarpal().prev_joint();
    pts.push(bounds.normalize(wrist.x, wrist.y, wrist.z));
    for digit in &digits[..5] {
        for joint in [
            digit.proximal().prev_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ] {
            pts.push(bounds.normalize(joint.x, joint.y, joint.z));
        }
    }
    HandLandmarkSet::from_slice(&pts)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
