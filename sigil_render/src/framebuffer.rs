//! Software rasteriser behind [`Surface`].
//!
//! Pixels are packed `0xAARRGGBB` in a single `Vec<u32>`, row-major, which is
//! exactly what `minifb::Window::update_with_buffer` wants.  Strokes are
//! rendered from a per-pixel distance field (so joints never double-blend),
//! fills by scanline with two sub-rows per pixel row, and the glow is a faint
//! halo computed from the same distance field.

use crate::color::{add, blend, Rgb};
use crate::surface::{Composite, DrawState, Path, Surface};

/// Peak opacity of the glow halo relative to the shape's own alpha.
const GLOW_STRENGTH: f32 = 0.35;
const CLEAR_COLOR:   u32 = 0xFF00_0000;

// ════════════════════════════════════════════════════════════════════════════
// VideoFrame
// ════════════════════════════════════════════════════════════════════════════

/// A raw camera frame (`0xAARRGGBB`, row-major).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoFrame {
    pub width:  usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl VideoFrame {
    pub fn new(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        VideoFrame { width, height, pixels }
    }

    pub fn solid(width: usize, height: usize, color: u32) -> Self {
        VideoFrame { width, height, pixels: vec![color; width * height] }
    }

    /// Non-empty and the pixel count matches the dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() == self.width * self.height
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameBuffer
// ════════════════════════════════════════════════════════════════════════════

pub struct FrameBuffer {
    width:  usize,
    height: usize,
    pixels: Vec<u32>,
    state:  DrawState,
    stack:  Vec<DrawState>,
    path:   Path,
}

/// Pixel-aligned rectangle `[x0, x1) × [y0, y1)` inside the buffer.
#[derive(Clone, Copy, Debug)]
struct Bounds {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Bounds {
    fn w(&self) -> usize { self.x1 - self.x0 }
    fn h(&self) -> usize { self.y1 - self.y0 }
    fn is_empty(&self) -> bool { self.x1 <= self.x0 || self.y1 <= self.y0 }
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            pixels: vec![CLEAR_COLOR; width * height],
            state:  DrawState::default(),
            stack:  Vec::new(),
            path:   Path::default(),
        }
    }

    pub fn pixels(&self) -> &[u32] { &self.pixels }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Count of pixels that are not pure black.
    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p & 0x00FF_FFFF != 0).count()
    }

    // ── Immediate-mode helpers (ignore the transform) ─────────────────────

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.pixels[row * self.width + col] = color;
            }
        }
    }

    /// Blend a translucent rectangle over what is already there.
    pub fn shade_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32, alpha: f32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                let i = row * self.width + col;
                self.pixels[i] = blend(self.pixels[i], color, alpha);
            }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Minimal bitmap font: 3×5 glyphs, each bit drawn as a `scale`×`scale`
    /// block.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        for dy in 0..scale {
                            for dx in 0..scale {
                                self.set_pixel(cx + col * scale + dx, y + row * scale + dy, color);
                            }
                        }
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > self.width { break; }
        }
    }

    /// Pixel width of `text` as drawn by [`FrameBuffer::draw_label`].
    pub fn label_width(text: &str, scale: usize) -> usize {
        (text.chars().count() * 4).saturating_sub(1) * scale.max(1)
    }

    // ── Rasterisation ─────────────────────────────────────────────────────

    fn put(&mut self, x: usize, y: usize, color: u32, alpha: f32, mode: Composite) {
        if alpha <= 0.0 { return; }
        let i = y * self.width + x;
        self.pixels[i] = match mode {
            Composite::SourceOver => blend(self.pixels[i], color, alpha),
            Composite::Lighter    => add(self.pixels[i], color, alpha),
        };
    }

    /// Device bounds of the current path grown by `reach`, clipped.
    fn path_bounds(&self, reach: f32) -> Option<Bounds> {
        let pts = self.path.subpaths.iter().flat_map(|s| s.points.iter());
        let (mut lx, mut ly, mut hx, mut hy) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        let mut any = false;
        for &(x, y) in pts {
            if !x.is_finite() || !y.is_finite() { continue; }
            any = true;
            lx = lx.min(x); ly = ly.min(y);
            hx = hx.max(x); hy = hy.max(y);
        }
        if !any { return None; }
        let b = self.clip(lx - reach, ly - reach, hx + reach, hy + reach);
        if b.is_empty() { None } else { Some(b) }
    }

    fn clip(&self, lx: f32, ly: f32, hx: f32, hy: f32) -> Bounds {
        let cx = |v: f32| v.floor().clamp(0.0, self.width as f32) as usize;
        let cy = |v: f32| v.floor().clamp(0.0, self.height as f32) as usize;
        Bounds { x0: cx(lx), y0: cy(ly), x1: cx(hx + 1.0), y1: cy(hy + 1.0) }
    }

    /// Distance from each pixel center in `b` to the nearest path edge, only
    /// evaluated within `reach` of an edge (infinity elsewhere).
    fn distance_field(&self, b: Bounds, reach: f32) -> Vec<f32> {
        let mut field = vec![f32::INFINITY; b.w() * b.h()];
        for (p, q) in self.path.segments() {
            let sb = self.clip(
                p.0.min(q.0) - reach, p.1.min(q.1) - reach,
                p.0.max(q.0) + reach, p.1.max(q.1) + reach,
            );
            let (x0, y0) = (sb.x0.max(b.x0), sb.y0.max(b.y0));
            let (x1, y1) = (sb.x1.min(b.x1), sb.y1.min(b.y1));
            for y in y0..y1 {
                for x in x0..x1 {
                    let d = segment_distance((x as f32 + 0.5, y as f32 + 0.5), p, q);
                    let cell = &mut field[(y - b.y0) * b.w() + (x - b.x0)];
                    if d < *cell { *cell = d; }
                }
            }
        }
        field
    }

    /// Even-odd coverage of the current path, two sub-rows per pixel row,
    /// exact horizontal span overlap.
    fn coverage(&self, b: Bounds) -> Vec<f32> {
        let mut cov = vec![0.0f32; b.w() * b.h()];
        let mut xs: Vec<f32> = Vec::new();
        for y in b.y0..b.y1 {
            for sub in [0.25f32, 0.75] {
                let sy = y as f32 + sub;
                xs.clear();
                for sp in &self.path.subpaths {
                    let n = sp.points.len();
                    if n < 3 { continue; }
                    // Fills always close their sub-paths.
                    for i in 0..n {
                        let (ax, ay) = sp.points[i];
                        let (bx, by) = sp.points[(i + 1) % n];
                        if (ay <= sy && by > sy) || (by <= sy && ay > sy) {
                            xs.push(ax + (sy - ay) / (by - ay) * (bx - ax));
                        }
                    }
                }
                xs.sort_by(|a, c| a.total_cmp(c));
                let row = (y - b.y0) * b.w();
                for span in xs.chunks_exact(2) {
                    let (sa, sb) = (span[0].max(b.x0 as f32), span[1].min(b.x1 as f32));
                    if sb <= sa { continue; }
                    let first = sa.floor() as usize;
                    let last  = (sb.ceil() as usize).min(b.x1);
                    for x in first..last {
                        let overlap = (sb.min(x as f32 + 1.0) - sa.max(x as f32)).max(0.0);
                        cov[row + x - b.x0] += overlap * 0.5;
                    }
                }
            }
        }
        cov
    }

    fn halo(state: &DrawState, d: f32, edge: f32) -> f32 {
        if state.glow_blur <= 0.0 { return 0.0; }
        let spread = state.glow_blur * 0.5;
        let t = ((d - edge) / spread).clamp(0.0, 1.0);
        (1.0 - t) * (1.0 - t) * GLOW_STRENGTH
    }

    fn rasterize_stroke(&mut self) {
        let st = self.state.clone();
        let hw = (st.line_width * st.transform.scale_factor()).max(1.0) * 0.5;
        let reach = hw + st.glow_blur * 0.5 + 1.0;
        let Some(b) = self.path_bounds(reach) else { return };
        let field = self.distance_field(b, reach);
        let (color, glow) = (st.stroke.to_argb(), st.glow_color.to_argb());
        for y in b.y0..b.y1 {
            for x in b.x0..b.x1 {
                let d = field[(y - b.y0) * b.w() + (x - b.x0)];
                if !d.is_finite() { continue; }
                let core = (hw + 0.5 - d).clamp(0.0, 1.0);
                let halo = Self::halo(&st, d, hw) * (1.0 - core);
                self.put(x, y, glow,  st.global_alpha * halo, st.composite);
                self.put(x, y, color, st.global_alpha * core, st.composite);
            }
        }
    }

    fn rasterize_fill(&mut self) {
        let st = self.state.clone();
        let spread = st.glow_blur * 0.5;
        let Some(b) = self.path_bounds(spread + 1.0) else { return };
        let cov = self.coverage(b);
        let field = if st.glow_blur > 0.0 {
            Some(self.distance_field(b, spread + 1.0))
        } else {
            None
        };
        let (color, glow) = (st.fill.to_argb(), st.glow_color.to_argb());
        for y in b.y0..b.y1 {
            for x in b.x0..b.x1 {
                let i = (y - b.y0) * b.w() + (x - b.x0);
                let c = cov[i].clamp(0.0, 1.0);
                if let Some(field) = &field {
                    let d = field[i];
                    if d.is_finite() && c < 1.0 {
                        let halo = Self::halo(&st, d, 0.0) * (1.0 - c);
                        self.put(x, y, glow, st.global_alpha * halo, st.composite);
                    }
                }
                self.put(x, y, color, st.global_alpha * c, st.composite);
            }
        }
    }
}

impl Surface for FrameBuffer {
    fn width(&self) -> usize  { self.width }
    fn height(&self) -> usize { self.height }

    fn save(&mut self) { self.stack.push(self.state.clone()); }
    fn restore(&mut self) {
        if let Some(s) = self.stack.pop() { self.state = s; }
    }
    fn depth(&self) -> usize { self.stack.len() }

    fn state(&self) -> &DrawState { &self.state }
    fn state_mut(&mut self) -> &mut DrawState { &mut self.state }

    fn begin_path(&mut self) { self.path.clear(); }

    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.state.transform.apply(x, y);
        self.path.move_to(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.state.transform.apply(x, y);
        self.path.line_to(p);
    }

    fn arc(&mut self, cx: f32, cy: f32, r: f32) {
        let t = self.state.transform;
        self.path.circle(&t, cx, cy, r);
    }

    fn close_path(&mut self) { self.path.close(); }

    fn stroke(&mut self) {
        if !self.path.is_empty() { self.rasterize_stroke(); }
    }

    fn fill(&mut self) {
        if !self.path.is_empty() { self.rasterize_fill(); }
    }

    fn clear(&mut self) { self.pixels.fill(CLEAR_COLOR); }

    fn draw_image_mirrored(&mut self, frame: &VideoFrame) {
        if !frame.is_valid() || self.width == 0 || self.height == 0 { return; }
        for y in 0..self.height {
            let sy = y * frame.height / self.height;
            let src = &frame.pixels[sy * frame.width..(sy + 1) * frame.width];
            let dst = &mut self.pixels[y * self.width..(y + 1) * self.width];
            for (x, out) in dst.iter_mut().enumerate() {
                let sx = frame.width - 1 - x * frame.width / self.width;
                *out = src[sx] | 0xFF00_0000;
            }
        }
    }
}

/// Euclidean distance from `p` to segment `a`–`b`.
fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let (apx, apy) = (p.0 - a.0, p.1 - a.1);
    let len2 = abx * abx + aby * aby;
    let t = if len2 > 0.0 { ((apx * abx + apy * aby) / len2).clamp(0.0, 1.0) } else { 0.0 };
    let (dx, dy) = (apx - abx * t, apy - aby * t);
    (dx * dx + dy * dy).sqrt()
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b010, 0b000, 0b010],
        '"' => [0b101, 0b101, 0b000, 0b000, 0b000],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn lum(c: u32) -> u32 { ((c >> 16) & 0xFF) + ((c >> 8) & 0xFF) + (c & 0xFF) }

    #[test]
    fn new_buffer_is_black() {
        let fb = FrameBuffer::new(8, 4);
        assert_eq!(fb.pixels().len(), 32);
        assert_eq!(fb.lit_pixels(), 0);
    }

    #[test]
    fn stroked_line_lights_pixels_along_it_only() {
        let mut fb = FrameBuffer::new(40, 40);
        fb.set_stroke_color(Rgb::WHITE);
        fb.set_line_width(2.0);
        fb.begin_path();
        fb.move_to(5.0, 20.0);
        fb.line_to(35.0, 20.0);
        fb.stroke();
        assert_eq!(fb.pixel(20, 20), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(20, 5), Some(0xFF000000));
    }

    #[test]
    fn filled_circle_covers_its_center() {
        let mut fb = FrameBuffer::new(50, 50);
        fb.set_fill_color(Rgb::new(0, 255, 0));
        fb.circle_path(25.0, 25.0, 10.0);
        fb.fill();
        assert_eq!(fb.pixel(25, 25), Some(0xFF00FF00));
        assert_eq!(fb.pixel(2, 2), Some(0xFF000000));
    }

    #[test]
    fn transform_moves_geometry() {
        let mut fb = FrameBuffer::new(50, 50);
        fb.set_fill_color(Rgb::WHITE);
        {
            let mut s = fb.scoped();
            s.translate(40.0, 40.0);
            s.circle_path(0.0, 0.0, 3.0);
            s.fill();
        }
        assert_eq!(fb.pixel(40, 40), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(10, 10), Some(0xFF000000));
    }

    #[test]
    fn lighter_composite_brightens_overlaps() {
        let mut fb = FrameBuffer::new(30, 30);
        fb.set_composite(Composite::Lighter);
        fb.set_fill_color(Rgb::new(100, 0, 0));
        for _ in 0..2 {
            fb.circle_path(15.0, 15.0, 8.0);
            fb.fill();
        }
        assert_eq!(fb.pixel(15, 15), Some(0xFFC80000));
    }

    #[test]
    fn source_over_occludes() {
        let mut fb = FrameBuffer::new(30, 30);
        fb.set_fill_color(Rgb::new(100, 0, 0));
        for _ in 0..2 {
            fb.circle_path(15.0, 15.0, 8.0);
            fb.fill();
        }
        assert_eq!(fb.pixel(15, 15), Some(0xFF640000));
    }

    #[test]
    fn global_alpha_dims_output() {
        let mut fb = FrameBuffer::new(30, 30);
        fb.set_fill_color(Rgb::WHITE);
        fb.set_global_alpha(0.5);
        fb.circle_path(15.0, 15.0, 8.0);
        fb.fill();
        let c = fb.pixel(15, 15).unwrap();
        assert!(lum(c) > 300 && lum(c) < 500, "got {:08x}", c);
    }

    #[test]
    fn glow_lights_pixels_outside_the_stroke() {
        let draw = |blur: f32| {
            let mut fb = FrameBuffer::new(60, 60);
            fb.set_stroke_color(Rgb::WHITE);
            fb.set_glow(blur, Rgb::WHITE);
            fb.begin_path();
            fb.move_to(10.0, 30.0);
            fb.line_to(50.0, 30.0);
            fb.stroke();
            fb.pixel(30, 34).unwrap()
        };
        assert_eq!(draw(0.0), 0xFF000000);
        assert!(lum(draw(20.0)) > 0);
    }

    #[test]
    fn mirrored_blit_flips_horizontally() {
        let mut frame = VideoFrame::solid(4, 1, 0xFF000000);
        frame.pixels[0] = 0xFFFF0000; // left edge red
        let mut fb = FrameBuffer::new(8, 2);
        fb.draw_image_mirrored(&frame);
        assert_eq!(fb.pixel(7, 0), Some(0xFFFF0000));
        assert_eq!(fb.pixel(6, 1), Some(0xFFFF0000));
        assert_eq!(fb.pixel(0, 0), Some(0xFF000000));
    }

    #[test]
    fn invalid_frame_is_ignored() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.draw_image_mirrored(&VideoFrame::new(3, 3, vec![0xFFFFFFFF; 2]));
        assert_eq!(fb.lit_pixels(), 0);
    }

    #[test]
    fn offscreen_geometry_is_clipped() {
        let mut fb = FrameBuffer::new(10, 10);
        fb.set_stroke_color(Rgb::WHITE);
        fb.circle_path(-500.0, -500.0, 20.0);
        fb.stroke();
        fb.circle_path(f32::NAN, 3.0, 20.0);
        fb.stroke();
        assert_eq!(fb.lit_pixels(), 0);
    }

    #[test]
    fn label_draws_blocks() {
        let mut fb = FrameBuffer::new(40, 20);
        fb.draw_label("I", 0, 0, 2, 0xFFFFFFFF);
        // Top bar of 'I' is three bits wide → six pixels at scale 2.
        assert_eq!(fb.pixel(5, 0), Some(0xFFFFFFFF));
        assert_eq!(fb.pixel(6, 0), Some(0xFF000000));
        assert_eq!(FrameBuffer::label_width("abc", 1), 11);
    }
}
