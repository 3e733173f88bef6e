//! Top-level wiring.
//!
//! `run` owns the window, the hand session, the frame loop and the sanctum,
//! and drives them once per frame.  Chat input comes from the terminal on a
//! reader thread; oracle replies come back from the sanctum's worker thread.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use sigil_oracle::{GeminiConfig, GeminiTransport, OfflineTransport, Role, Transport, DEFAULT_BASE_URL, DEFAULT_MODEL};
use sigil_render::{MagicCircle, RandomSource, SeededRandom};

use crate::frame_loop::FrameLoop;
use crate::hand::{SimCamera, SimInput};
use crate::sanctum::{Sanctum, SubmitError};
use crate::session::{DetectorOptions, HandDetector, Session};
use crate::visualizer::{Hud, Phase, Visualizer, MANA_BARS, WIN_H, WIN_W};

/// Environment variables consulted for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// HUD line while a reply is in flight.
pub const CONSULTING: &str = "CONSULTING THE ARCHIVES...";

/// Frames between mana meter refreshes.
const MANA_REFRESH: u32 = 6;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub width:          usize,
    pub height:         usize,
    pub detector:       DetectorOptions,
    pub model:          String,
    pub base_url:       String,
    /// `None` runs the oracle offline (fallback spells only).
    pub api_key:        Option<String>,
    /// Seeds particle scatter and the mana meter; `None` uses OS entropy.
    pub seed:           Option<u64>,
    pub frame_period:   Duration,
    pub show_landmarks: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            width:          WIN_W,
            height:         WIN_H,
            detector:       DetectorOptions::default(),
            model:          DEFAULT_MODEL.to_string(),
            base_url:       DEFAULT_BASE_URL.to_string(),
            api_key:        None,
            seed:           None,
            frame_period:   Duration::from_millis(16),
            show_landmarks: false,
        }
    }
}

impl AppConfig {
    /// The live Gemini transport, or the offline one when no key is set.
    pub fn transport(&self) -> Box<dyn Transport> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                let mut gemini = GeminiConfig::new(key);
                gemini.model    = self.model.clone();
                gemini.base_url = self.base_url.clone();
                info!("[oracle] using model {} at {}", gemini.model, gemini.base_url);
                Box::new(GeminiTransport::new(gemini))
            }
            _ => {
                warn!("[oracle] no API key configured; spells will use the fallback");
                Box::new(OfflineTransport)
            }
        }
    }
}

/// First non-empty value among [`API_KEY_VARS`] according to `lookup`.
pub fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .find(|v| !v.trim().is_empty())
}

pub fn api_key_from_env() -> Option<String> {
    api_key_from(|var| std::env::var(var).ok())
}

// ════════════════════════════════════════════════════════════════════════════
// Chat input + status
// ════════════════════════════════════════════════════════════════════════════

/// Read terminal lines on a background thread.
fn spawn_chat_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() { break; }
        }
    });
    rx
}

/// One-line summary of the chat for the HUD.
pub fn chat_status(sanctum: &Sanctum) -> String {
    if sanctum.is_generating() {
        return CONSULTING.to_string();
    }
    match sanctum.history().last() {
        Some(m) if m.role == Role::Model => format!("WONG: {}", m.content),
        _ => "SANCTUM SANCTORUM TERMINAL: TYPE A MESSAGE, E.G. GIVE ME A FIRE SPELL".to_string(),
    }
}

fn refresh_mana<R: RandomSource>(rng: &mut R, mana: &mut [f32; MANA_BARS]) {
    for level in mana.iter_mut() {
        *level = 0.2 + 0.8 * rng.next_unit();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hand source selection
// ════════════════════════════════════════════════════════════════════════════

#[cfg(not(feature = "leap"))]
fn make_detector(sim_rx: Receiver<SimInput>) -> impl HandDetector {
    crate::hand::SimHandDetector::new(sim_rx)
}

#[cfg(feature = "leap")]
fn make_detector(_sim_rx: Receiver<SimInput>) -> impl HandDetector {
    crate::hand::LeapHandDetector::new()
}

// ════════════════════════════════════════════════════════════════════════════
// run
// ════════════════════════════════════════════════════════════════════════════

pub fn run(cfg: AppConfig) -> anyhow::Result<()> {
    // ── Window + sim input channel ────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let mut vis = Visualizer::new(cfg.width, cfg.height, cfg.frame_period, sim_tx)?;

    // ── Hand session (stays on the loading banner if it cannot start) ─────
    let mut session = match Session::open(
        SimCamera::new(),
        make_detector(sim_rx),
        cfg.detector.clone(),
        cfg.width,
        cfg.height,
    ) {
        Ok(s) => Some(s),
        Err(e) => {
            error!("[session] could not start: {e}");
            None
        }
    };

    // ── Renderer, chat, HUD state ─────────────────────────────────────────
    let mut frame_loop = FrameLoop::new(MagicCircle::live(cfg.seed)).with_landmarks(cfg.show_landmarks);
    let mut sanctum = Sanctum::new(cfg.transport());
    let chat_rx = spawn_chat_reader();

    let mut hud_rng = SeededRandom::new(cfg.seed.map(|s| s.wrapping_add(1)));
    let mut mana = [0.0f32; MANA_BARS];
    let mut frame: u32 = 0;

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        // 1. Window input → simulated hand
        if !vis.poll_input() { break; }

        // 2. Terminal chat → sanctum
        loop {
            match chat_rx.try_recv() {
                Ok(line) => match sanctum.submit(&line) {
                    Ok(_) | Err(SubmitError::Empty) => {}
                    Err(SubmitError::Busy) => println!("  (Wong is still speaking; wait for the reply)"),
                },
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }

        // 3. Oracle replies
        if sanctum.tick() > 0 {
            if let Some(reply) = sanctum.history().last() {
                println!("  Wong: {}", reply.content);
            }
        }

        // 4. Detection → camera backdrop + sigil
        let phase = match session.as_mut() {
            Some(s) => {
                if let Some(result) = s.poll() {
                    frame_loop.on_result(vis.canvas(), &result, sanctum.current_spell());
                }
                Phase::Tracking
            }
            None => Phase::Loading,
        };

        // 5. Overlays
        if frame % MANA_REFRESH == 0 {
            refresh_mana(&mut hud_rng, &mut mana);
        }
        frame = frame.wrapping_add(1);
        let status = chat_status(&sanctum);
        vis.paint_hud(&Hud {
            spell:       sanctum.current_spell(),
            phase,
            chat_status: &status,
            mana:        &mana,
        });
        vis.present();
    }

    if let Some(s) = session.take() {
        s.close();
    }
    info!("[session] sigil drawn on {} frames", frame_loop.renderer_invocations());
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Instant;

    use sigil_oracle::CannedTransport;

    #[test]
    fn default_config() {
        let cfg = AppConfig::default();
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.model, "gemini-3-flash-preview");
        assert_eq!(cfg.frame_period, Duration::from_millis(16));
        assert_eq!(cfg.detector, DetectorOptions::default());
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn api_key_prefers_gemini_var() {
        let env: HashMap<&str, &str> = [("GEMINI_API_KEY", "g"), ("API_KEY", "a")].into();
        assert_eq!(api_key_from(|v| env.get(v).map(|s| s.to_string())), Some("g".into()));
    }

    #[test]
    fn api_key_falls_back_and_skips_blanks() {
        let env: HashMap<&str, &str> = [("GEMINI_API_KEY", "  "), ("API_KEY", "a")].into();
        assert_eq!(api_key_from(|v| env.get(v).map(|s| s.to_string())), Some("a".into()));
        assert_eq!(api_key_from(|_| None), None);
    }

    #[test]
    fn missing_key_runs_offline() {
        let t = AppConfig::default().transport();
        let err = sigil_oracle::mystic_advice(&t, &[sigil_oracle::ChatMessage::user("hi")]);
        assert!(matches!(err, Err(sigil_oracle::OracleError::Offline)));
    }

    #[test]
    fn status_tracks_the_conversation() {
        let mut s = Sanctum::new(CannedTransport::new().reply("Silence."));
        assert!(chat_status(&s).starts_with("SANCTUM SANCTORUM TERMINAL"));
        s.submit("hello").unwrap();
        assert_eq!(chat_status(&s), "CONSULTING THE ARCHIVES...");
        let deadline = Instant::now() + Duration::from_secs(2);
        while s.is_generating() && Instant::now() < deadline {
            s.tick();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(chat_status(&s), "WONG: Silence.");
    }

    #[test]
    fn mana_levels_stay_in_range() {
        let mut rng = sigil_render::SequenceRandom::new(vec![0.0, 0.5, 0.999]);
        let mut mana = [0.0; MANA_BARS];
        refresh_mana(&mut rng, &mut mana);
        assert!(mana.iter().all(|&m| (0.2..=1.0).contains(&m)));
        assert_eq!(mana[0], 0.2);
    }
}
