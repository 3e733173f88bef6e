//! # sigil_render
//!
//! Procedural magic-circle renderer.
//!
//! ## Pipeline
//!
//! | Stage | Module | Produces |
//! |---|---|---|
//! | Hand landmarks → anchor/radius | [`geometry`] | [`HandGeometry`] |
//! | Ring emission, drift, fade | [`particle`] | [`ParticleSystem`] |
//! | Layered rotating sigil | [`circle`] | pixels on a [`Surface`] |
//! | Software canvas | [`framebuffer`] | `Vec<u32>` ARGB for `minifb` |
//!
//! The renderer is written against the [`Surface`] trait rather than a
//! concrete buffer, and takes its time and randomness from a [`Clock`] and a
//! [`RandomSource`], so everything it does can be replayed exactly in tests.

pub mod circle;
pub mod color;
pub mod framebuffer;
pub mod geometry;
pub mod particle;
pub mod source;
pub mod surface;

pub use circle::MagicCircle;
pub use color::{ColorError, Rgb, DEFAULT_SPELL_COLOR};
pub use framebuffer::{FrameBuffer, VideoFrame};
pub use geometry::{derive, mirror_to_screen, try_derive, HandGeometry, HandLandmarkSet, Point, LANDMARK_COUNT, MIN_RADIUS};
pub use particle::{Particle, ParticleSystem};
pub use source::{Clock, ManualClock, RandomSource, SeededRandom, SequenceRandom, SystemClock};
pub use surface::{Composite, Saved, Surface, Transform};
