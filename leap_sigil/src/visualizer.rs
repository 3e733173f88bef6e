//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ TRACKING ENABLED                             MANA FREQUENCY    │
//! │ ● NEURAL_NET_V3_ACTIVE                       ▌▌▌▌▌▌▌▌▌▌        │
//! │                                                               │
//! │              [mirrored camera + magic circle]                 │
//! │                                                               │
//! │                      SPELL NAME                 ┌ instructions┐│
//! │                      ──────────                 │             ││
//! │                      incantation                └─────────────┘│
//! │ chat status                                                   │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::Context;
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use sigil_oracle::SpellInfo;
use sigil_render::{FrameBuffer, Rgb, Surface};

use crate::hand::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:      usize = 1280;
pub const WIN_H:      usize = 720;
pub const MANA_BARS:  usize = 10;
pub const LOADING_BANNER: &str = "OPENING DIMENSIONAL PORTAL...";

const MARGIN:        usize = 24;
const LABEL_COLOR:   u32   = 0xFFB45309;  // dim orange
const ACCENT_COLOR:  u32   = 0xFFF97316;
const ACTIVE_COLOR:  u32   = 0xFF4ADE80;  // green
const HINT_COLOR:    u32   = 0xFF94A3B8;
const PANEL_COLOR:   u32   = 0xFF000000;
const MANA_BAR_W:    usize = 4;
const MANA_BAR_H:    usize = 18;
/// Scroll-wheel units to thumb-index spread (fraction of frame width).
const SCROLL_GAIN:   f32   = 0.01;
const KEY_SPREAD:    f32   = 0.01;

const HINTS: [&str; 4] = [
    "MOVE THE MOUSE TO MOVE YOUR HAND.",
    "SCROLL OR USE THE BRACKET KEYS TO PINCH.",
    "H HIDES THE HAND. Q OR ESC QUITS.",
    "ASK WONG FOR A SPELL IN THE TERMINAL.",
];

// ════════════════════════════════════════════════════════════════════════════
// Hud: overlays drawn on top of the camera and circle
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Camera/detector not up yet (or failed to start).
    Loading,
    Tracking,
}

pub struct Hud<'a> {
    pub spell:       &'a SpellInfo,
    pub phase:       Phase,
    pub chat_status: &'a str,
    /// Bar heights in `[0, 1]`.
    pub mana:        &'a [f32; MANA_BARS],
}

/// Paint the overlays into `fb`.  While loading only the banner is shown, on
/// a black screen.
pub fn paint_hud(fb: &mut FrameBuffer, hud: &Hud<'_>) {
    let (w, h) = (fb.width(), fb.height());

    if hud.phase == Phase::Loading {
        fb.fill_rect(0, 0, w, h, PANEL_COLOR);
        draw_centered(fb, LOADING_BANNER, (h / 2).saturating_sub(8), 3, ACCENT_COLOR);
        draw_centered(fb, hud.chat_status, h / 2 + 24, 1, HINT_COLOR);
        return;
    }

    // ── Tracking badge (top left) ─────────────────────────────────────────
    fb.draw_label("TRACKING ENABLED", MARGIN, MARGIN, 2, LABEL_COLOR);
    fb.fill_rect(MARGIN, MARGIN + 22, 6, 6, ACTIVE_COLOR);
    fb.draw_label("NEURAL_NET_V3_ACTIVE", MARGIN + 12, MARGIN + 22, 1, ACTIVE_COLOR);

    // ── Mana meter (top right) ────────────────────────────────────────────
    let title = "MANA FREQUENCY";
    let title_w = FrameBuffer::label_width(title, 1);
    let panel_w = title_w + 12;
    let px = w.saturating_sub(MARGIN + panel_w);
    fb.shade_rect(px, MARGIN, panel_w, MANA_BAR_H + 20, PANEL_COLOR, 0.6);
    fb.draw_label(title, px + 6, MARGIN + 4, 1, ACCENT_COLOR);
    let base_y = MARGIN + 14 + MANA_BAR_H;
    for (i, level) in hud.mana.iter().enumerate() {
        let bar_h = (level.clamp(0.0, 1.0) * MANA_BAR_H as f32).round() as usize;
        let bx = px + 6 + i * (MANA_BAR_W + 2);
        fb.shade_rect(bx, base_y.saturating_sub(bar_h), MANA_BAR_W, bar_h, ACCENT_COLOR, 0.5);
    }

    // ── Spell title (bottom centre, in the spell's color) ─────────────────
    let color = Rgb::parse_or_default(&hud.spell.color).to_argb();
    let name = hud.spell.name.to_uppercase();
    let name_y = h.saturating_sub(120);
    draw_centered(fb, &name, name_y, 4, color);
    let rule_w = 192.min(w);
    fb.fill_rect((w - rule_w) / 2, name_y + 26, rule_w, 2, color);
    draw_centered(fb, &hud.spell.incantation, name_y + 36, 2, color);

    // ── Instructions (bottom right) ───────────────────────────────────────
    let hint_w = HINTS.iter().map(|l| FrameBuffer::label_width(l, 1)).max().unwrap_or(0) + 16;
    let hint_h = HINTS.len() * 10 + 22;
    let hx = w.saturating_sub(MARGIN + hint_w);
    let hy = h.saturating_sub(MARGIN + hint_h + 20);
    fb.shade_rect(hx, hy, hint_w, hint_h, PANEL_COLOR, 0.8);
    fb.draw_label("MYSTIC INSTRUCTIONS", hx + 8, hy + 6, 1, ACCENT_COLOR);
    for (i, line) in HINTS.iter().enumerate() {
        fb.draw_label(line, hx + 8, hy + 18 + i * 10, 1, HINT_COLOR);
    }

    // ── Chat status (bottom left) ─────────────────────────────────────────
    fb.draw_label(hud.chat_status, MARGIN, h.saturating_sub(MARGIN + 10), 1, HINT_COLOR);
}

fn draw_centered(fb: &mut FrameBuffer, text: &str, y: usize, scale: usize, color: u32) {
    let tw = FrameBuffer::label_width(text, scale);
    let x = fb.width().saturating_sub(tw) / 2;
    fb.draw_label(text, x, y, scale, color);
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    fb:     FrameBuffer,
    sim_tx: Sender<SimInput>,
    width:  usize,
    height: usize,
    last_pointer: Option<(f32, f32)>,
}

impl Visualizer {
    pub fn new(width: usize, height: usize, frame_period: Duration, sim_tx: Sender<SimInput>) -> anyhow::Result<Self> {
        let mut window = Window::new(
            "Leap Sigil: Sanctum Sanctorum",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).context("opening the visualizer window")?;

        window.limit_update_rate(Some(frame_period));

        Ok(Visualizer {
            window,
            fb: FrameBuffer::new(width, height),
            sim_tx,
            width,
            height,
            last_pointer: None,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// The canvas the frame loop draws into.
    pub fn canvas(&mut self) -> &mut FrameBuffer { &mut self.fb }

    /// Poll mouse and keyboard and forward them to the simulated hand.
    /// Returns false when the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        let one_shot = |w: &Window, k: Key| w.is_key_pressed(k, KeyRepeat::No);
        let held     = |w: &Window, k: Key| w.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(&self.window, Key::Q) || one_shot(&self.window, Key::Escape) {
            return false;
        }
        if one_shot(&self.window, Key::H) {
            let _ = self.sim_tx.send(SimInput::ToggleHand);
        }
        if held(&self.window, Key::RightBracket) {
            let _ = self.sim_tx.send(SimInput::Spread(KEY_SPREAD));
        }
        if held(&self.window, Key::LeftBracket) {
            let _ = self.sim_tx.send(SimInput::Spread(-KEY_SPREAD));
        }
        if let Some((_, dy)) = self.window.get_scroll_wheel() {
            if dy != 0.0 {
                let _ = self.sim_tx.send(SimInput::Spread(dy * SCROLL_GAIN));
            }
        }
        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Clamp) {
            let p = (mx / self.width as f32, my / self.height as f32);
            if self.last_pointer != Some(p) {
                self.last_pointer = Some(p);
                let _ = self.sim_tx.send(SimInput::Pointer { x: p.0, y: p.1 });
            }
        }

        true
    }

    pub fn paint_hud(&mut self, hud: &Hud<'_>) { paint_hud(&mut self.fb, hud); }

    /// Push the canvas to the window.
    pub fn present(&mut self) {
        self.window
            .update_with_buffer(self.fb.pixels(), self.width, self.height)
            .ok();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
