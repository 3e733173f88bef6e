//! # leap_sigil
//!
//! A mirrored camera view with a rotating magic circle anchored to the
//! tracked palm.  The thumb–index pinch sets its size; the spell currently in
//! force sets its color, and a chat with Wong in the terminal can change the
//! spell.
//!
//! ## Hand → circle mapping
//!
//! | Hand | Circle |
//! |---|---|
//! | Middle-finger knuckle (landmark 9) | Center, mirrored horizontally |
//! | Thumb tip ↔ index tip distance | Radius `max(60, d·1.5)` px |
//! | No hand in frame | Nothing drawn, no particles emitted |
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**. The mouse moves the hand.
//! * `leap`: **Hardware mode**. Polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation controls
//!
//! | Input | Effect |
//! |---|---|
//! | Mouse | Move the palm |
//! | Scroll / `[` `]` | Pinch / spread |
//! | `H` | Hide or show the hand |
//! | `Q` / `Escape` | Quit |
//!
//! Chat is typed into the terminal.  Messages mentioning "spell" or "magic"
//! ask the oracle for a new spell; anything else asks Wong for advice.

pub mod app;
pub mod frame_loop;
pub mod hand;
pub mod sanctum;
pub mod session;
pub mod visualizer;

pub use session::DetectionResult;
