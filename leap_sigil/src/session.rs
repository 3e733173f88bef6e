//! Camera + hand-detector lifecycle.
//!
//! A [`Session`] owns one camera and one detector from the moment both are
//! running until it is closed or dropped.  Both are released exactly once on
//! every exit path, including a failed start.

use log::{info, warn};
use thiserror::Error;

use sigil_render::{HandLandmarkSet, VideoFrame};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera unavailable: {0}")]
    Camera(String),

    #[error("hand detector failed: {0}")]
    Detector(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Collaborator traits
// ════════════════════════════════════════════════════════════════════════════

/// Tracker tuning passed to [`HandDetector::configure`].
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOptions {
    pub max_hands:                usize,
    pub model_complexity:         u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence:  f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        DetectorOptions {
            max_hands:                1,
            model_complexity:         1,
            min_detection_confidence: 0.7,
            min_tracking_confidence:  0.7,
        }
    }
}

/// Turns camera frames into zero or more hands.
pub trait HandDetector {
    fn configure(&mut self, options: &DetectorOptions) -> Result<(), SessionError>;
    fn send(&mut self, frame: &VideoFrame) -> Result<Vec<HandLandmarkSet>, SessionError>;
    fn close(&mut self);
}

pub trait Camera {
    fn start(&mut self, width: usize, height: usize) -> Result<(), SessionError>;
    /// Next frame, or `None` if nothing new is available yet.
    fn grab(&mut self) -> Option<VideoFrame>;
    fn stop(&mut self);
}

/// One camera frame and whatever hands were found in it.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    pub image: VideoFrame,
    pub hands: Vec<HandLandmarkSet>,
}

impl DetectionResult {
    pub fn primary_hand(&self) -> Option<&HandLandmarkSet> { self.hands.first() }
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

pub struct Session<C: Camera, D: HandDetector> {
    camera:   C,
    detector: D,
    options:  DetectorOptions,
    released: bool,
}

impl<C: Camera, D: HandDetector> Session<C, D> {
    /// Configure the detector, then start the camera.  On failure whatever
    /// was already acquired is released before the error is returned.
    pub fn open(
        mut camera:   C,
        mut detector: D,
        options:      DetectorOptions,
        width:        usize,
        height:       usize,
    ) -> Result<Self, SessionError> {
        if let Err(e) = detector.configure(&options) {
            detector.close();
            return Err(e);
        }
        if let Err(e) = camera.start(width, height) {
            detector.close();
            return Err(e);
        }
        info!("[session] camera started at {}x{}", width, height);
        Ok(Session { camera, detector, options, released: false })
    }

    /// Grab a frame and run detection on it.  A detector error on a single
    /// frame is logged and reported as "no hand".
    pub fn poll(&mut self) -> Option<DetectionResult> {
        let image = self.camera.grab()?;
        let mut hands = match self.detector.send(&image) {
            Ok(hands) => hands,
            Err(e) => {
                warn!("[session] detection failed on frame: {e}");
                Vec::new()
            }
        };
        hands.truncate(self.options.max_hands);
        Some(DetectionResult { image, hands })
    }

    pub fn options(&self) -> &DetectorOptions { &self.options }

    /// Release camera and detector now instead of at drop.
    pub fn close(mut self) { self.release(); }

    fn release(&mut self) {
        if self.released { return; }
        self.released = true;
        self.camera.stop();
        self.detector.close();
        info!("[session] camera stopped, detector closed");
    }
}

impl<C: Camera, D: HandDetector> Drop for Session<C, D> {
    fn drop(&mut self) { self.release(); }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use sigil_render::{Point, LANDMARK_COUNT};

    #[derive(Default, Clone)]
    struct Counters {
        started:    Rc<Cell<usize>>,
        stopped:    Rc<Cell<usize>>,
        configured: Rc<Cell<usize>>,
        closed:     Rc<Cell<usize>>,
    }

    struct FakeCamera { c: Counters, fail: bool }
    impl Camera for FakeCamera {
        fn start(&mut self, _w: usize, _h: usize) -> Result<(), SessionError> {
            if self.fail { return Err(SessionError::Camera("permission denied".into())); }
            self.c.started.set(self.c.started.get() + 1);
            Ok(())
        }
        fn grab(&mut self) -> Option<VideoFrame> { Some(VideoFrame::solid(4, 4, 0xFF000000)) }
        fn stop(&mut self) { self.c.stopped.set(self.c.stopped.get() + 1); }
    }

    struct FakeDetector { c: Counters, hands: usize, fail_send: bool }
    impl HandDetector for FakeDetector {
        fn configure(&mut self, o: &DetectorOptions) -> Result<(), SessionError> {
            assert_eq!(o, &DetectorOptions::default());
            self.c.configured.set(self.c.configured.get() + 1);
            Ok(())
        }
        fn send(&mut self, _f: &VideoFrame) -> Result<Vec<HandLandmarkSet>, SessionError> {
            if self.fail_send { return Err(SessionError::Detector("model crashed".into())); }
            Ok(vec![HandLandmarkSet::new([Point::new(0.5, 0.5); LANDMARK_COUNT]); self.hands])
        }
        fn close(&mut self) { self.c.closed.set(self.c.closed.get() + 1); }
    }

    fn open(c: &Counters, cam_fails: bool, hands: usize, fail_send: bool)
        -> Result<Session<FakeCamera, FakeDetector>, SessionError>
    {
        Session::open(
            FakeCamera { c: c.clone(), fail: cam_fails },
            FakeDetector { c: c.clone(), hands, fail_send },
            DetectorOptions::default(),
            1280, 720,
        )
    }

    #[test]
    fn default_options() {
        let o = DetectorOptions::default();
        assert_eq!(o.max_hands, 1);
        assert_eq!(o.model_complexity, 1);
        assert_eq!(o.min_detection_confidence, 0.7);
        assert_eq!(o.min_tracking_confidence, 0.7);
    }

    #[test]
    fn drop_releases_exactly_once() {
        let c = Counters::default();
        {
            let _s = open(&c, false, 0, false).unwrap();
            assert_eq!(c.started.get(), 1);
            assert_eq!(c.configured.get(), 1);
        }
        assert_eq!(c.stopped.get(), 1);
        assert_eq!(c.closed.get(), 1);
    }

    #[test]
    fn explicit_close_then_drop_does_not_double_release() {
        let c = Counters::default();
        open(&c, false, 0, false).unwrap().close();
        assert_eq!(c.stopped.get(), 1);
        assert_eq!(c.closed.get(), 1);
    }

    #[test]
    fn failed_camera_start_closes_detector() {
        let c = Counters::default();
        assert!(matches!(open(&c, true, 0, false), Err(SessionError::Camera(_))));
        assert_eq!(c.closed.get(), 1);
        assert_eq!(c.stopped.get(), 0);
    }

    #[test]
    fn poll_caps_hands_at_max() {
        let c = Counters::default();
        let mut s = open(&c, false, 3, false).unwrap();
        let r = s.poll().unwrap();
        assert_eq!(r.hands.len(), 1);
        assert!(r.primary_hand().is_some());
    }

    #[test]
    fn detector_error_is_no_hand() {
        let c = Counters::default();
        let mut s = open(&c, false, 1, true).unwrap();
        let r = s.poll().unwrap();
        assert!(r.hands.is_empty());
        assert_eq!(r.image.width, 4);
    }
}
