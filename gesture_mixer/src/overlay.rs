//! Software-rendered overlay window using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────┬──────────────┐
//! │                                          │ GESTURE MIXER│
//! │   camera image                           │ BASS   ▇▇▇   │
//! │   + landmark dots / bones per hand       │ TREBLE ▇     │
//! │                                          │ CLARITY      │
//! │                                          │ VOLUME ▇▇▇▇  │
//! │                                          │ ECHO [ON]    │
//! │                                          │ REVERB [OFF] │
//! │                                          │ RECENT ...   │
//! ├──────────────────────────────────────────┴──────────────┤
//! │ status / key legend                                     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All drawing goes through [`Canvas`], which is plain memory; only
//! [`Overlay`] touches a window.

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use audio_fx::{Effect, MixerLimits, MixerState, Param};
use hand_gesture::{Direction, HandObservation, HandSide};

use crate::camera::Frame;
use crate::config::OverlayConfig;
use crate::landmarks::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const PANEL_W:      usize = 260;
const STATUS_H:     usize = 36;
const FONT_SCALE:   usize = 2;
const LINE_H:       usize = 7 * FONT_SCALE;
const BAR_W:        usize = PANEL_W - 24;
const BAR_H:        usize = 8;
const BG_COLOR:     u32   = 0xFF1A1A2E;
const PANEL_BG:     u32   = 0xFF16213E;
const TEXT_BG:      u32   = 0xFF0F3460;
const TEXT_COLOR:   u32   = 0xFFEEEEEE;
const DIM_COLOR:    u32   = 0xFF888888;
const TITLE_COLOR:  u32   = 0xFFFFD700;
const ON_COLOR:     u32   = 0xFF44DD66;
const OFF_COLOR:    u32   = 0xFF774444;
const BAR_BG:       u32   = 0xFF2A2A4A;
pub const LEFT_HAND_COLOR:  u32 = 0xFF66CCFF;
pub const RIGHT_HAND_COLOR: u32 = 0xFFFFAA66;

/// Landmark pairs drawn as bones.
const HAND_BONES: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20),
    (0, 17),
];

// ════════════════════════════════════════════════════════════════════════════
// OverlaySink — what the main loop needs from a display
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayInput {
    Continue,
    Quit,
}

/// Everything drawn for one frame.
pub struct OverlayView<'a> {
    pub frame:    &'a Frame,
    pub hands:    &'a [HandObservation],
    pub state:    MixerState,
    pub limits:   &'a MixerLimits,
    /// Most recent applied gestures, newest last.
    pub recent:   &'a [String],
    pub source:   &'a str,
    pub failures: u32,
}

pub trait OverlaySink {
    /// Handle window input; `Quit` when the user asked to exit.
    fn poll(&mut self) -> OverlayInput;

    fn render(&mut self, view: &OverlayView<'_>);
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// An ARGB framebuffer with the primitive drawing helpers.
pub struct Canvas {
    pub buf: Vec<u32>,
    pub w:   usize,
    pub h:   usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; w * h], w, h }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.w && y < self.h { Some(self.buf[y * self.w + x]) } else { None }
    }

    pub fn clear(&mut self, color: u32) {
        self.buf.fill(color);
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    pub fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 {
            return;
        }
        for col in x..(x + w).min(self.w) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y + h).min(self.h) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    fn set_pixel_i(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// Bresenham line.
    pub fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel_i(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn draw_dot(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel_i(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Nearest-neighbour blit of `frame` into a `w` × `h` box.
    pub fn blit_frame(&mut self, frame: &Frame, x: usize, y: usize, w: usize, h: usize) {
        if frame.width == 0 || frame.height == 0 {
            return;
        }
        for row in 0..h.min(self.h.saturating_sub(y)) {
            let sy = row * frame.height / h.max(1);
            for col in 0..w.min(self.w.saturating_sub(x)) {
                let sx = col * frame.width / w.max(1);
                self.buf[(y + row) * self.w + x + col] = 0xFF000000 | frame.pixel(sx, sy);
            }
        }
    }

    /// Draw `text` in the 3×5 bitmap font, scaled by `FONT_SCALE`.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let advance = 4 * FONT_SCALE;
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * FONT_SCALE, y + row * FONT_SCALE, FONT_SCALE, FONT_SCALE, color);
                    }
                }
            }
            cx += advance;
            if cx + advance > self.w {
                break;
            }
        }
    }
}

pub fn label_width(text: &str) -> usize {
    text.chars().count() * 4 * FONT_SCALE
}

// ════════════════════════════════════════════════════════════════════════════
// Frame composition
// ════════════════════════════════════════════════════════════════════════════

pub fn hand_color(side: HandSide) -> u32 {
    match side {
        HandSide::Left  => LEFT_HAND_COLOR,
        HandSide::Right => RIGHT_HAND_COLOR,
    }
}

/// Draw one complete overlay frame into `canvas`.
pub fn compose(canvas: &mut Canvas, view: &OverlayView<'_>, show_landmarks: bool, legend: &str) {
    canvas.clear(BG_COLOR);

    let video_w = canvas.w.saturating_sub(PANEL_W);
    let video_h = canvas.h.saturating_sub(STATUS_H);

    // ── Camera image ──────────────────────────────────────────────────────
    canvas.blit_frame(view.frame, 0, 0, video_w, video_h);

    // ── Hands ─────────────────────────────────────────────────────────────
    if show_landmarks {
        for hand in view.hands {
            draw_hand(canvas, hand, video_w, video_h);
        }
    }

    // ── Mixer panel ───────────────────────────────────────────────────────
    draw_panel(canvas, view, video_w);

    // ── Status bar ────────────────────────────────────────────────────────
    canvas.fill_rect(0, video_h, canvas.w, STATUS_H, TEXT_BG);
    canvas.draw_label(view.source, 10, video_h + 4, TEXT_COLOR);
    if view.failures > 0 {
        let warning = format!("BAD FRAMES: {}", view.failures);
        let x = canvas.w.saturating_sub(label_width(&warning) + 10);
        canvas.draw_label(&warning, x, video_h + 4, OFF_COLOR);
    }
    canvas.draw_label(legend, 10, video_h + 4 + LINE_H, DIM_COLOR);
}

fn draw_hand(canvas: &mut Canvas, hand: &HandObservation, w: usize, h: usize) {
    let color = hand_color(hand.side);
    let to_px = |i: usize| {
        let p = hand.landmarks[i];
        ((p.x * w as f32) as isize, (p.y * h as f32) as isize)
    };
    for &(a, b) in HAND_BONES.iter() {
        let (x0, y0) = to_px(a);
        let (x1, y1) = to_px(b);
        canvas.draw_line(x0, y0, x1, y1, 0xFF000000 | (color & 0x7F7F7F));
    }
    for i in 0..hand.landmarks.len() {
        let (x, y) = to_px(i);
        canvas.draw_dot(x, y, 3, color);
    }
    let (wx, wy) = to_px(0);
    if wx >= 0 && wy >= 0 {
        canvas.draw_label(hand.side.label(), wx as usize + 8, wy as usize + 6, color);
    }
}

fn draw_panel(canvas: &mut Canvas, view: &OverlayView<'_>, x0: usize) {
    let panel_h = canvas.h.saturating_sub(STATUS_H);
    canvas.fill_rect(x0, 0, PANEL_W, panel_h, PANEL_BG);
    canvas.draw_label("GESTURE MIXER", x0 + 12, 10, TITLE_COLOR);

    let mut y = 38;
    let limits = view.limits;
    for param in [Param::Bass, Param::Treble, Param::Clarity, Param::Volume] {
        let (min, max) = match param {
            Param::Volume => (limits.volume_min_db, limits.volume_max_db),
            _             => (limits.eq_min_db, limits.eq_max_db),
        };
        let value = view.state.level(param);
        canvas.draw_label(&format!("{} {:+.1} dB", param.label(), value), x0 + 12, y, TEXT_COLOR);
        y += LINE_H;
        draw_bar(canvas, x0 + 12, y, value, min, max);
        y += BAR_H + 10;
    }

    y += 6;
    for effect in Effect::ALL {
        let on = view.state.enabled(effect);
        let color = if on { ON_COLOR } else { OFF_COLOR };
        canvas.fill_rect(x0 + 12, y, 10, 10, color);
        canvas.draw_label(
            &format!("{} [{}]", effect.label(), if on { "ON" } else { "OFF" }),
            x0 + 28,
            y,
            TEXT_COLOR,
        );
        y += LINE_H + 6;
    }

    y += 10;
    canvas.draw_label("RECENT", x0 + 12, y, TITLE_COLOR);
    y += LINE_H + 4;
    for line in view.recent.iter().rev() {
        if y + LINE_H > panel_h {
            break;
        }
        let color = if line.starts_with('L') { LEFT_HAND_COLOR } else { RIGHT_HAND_COLOR };
        canvas.draw_label(line, x0 + 12, y, color);
        y += LINE_H;
    }
}

/// Horizontal bar with a tick at 0 dB when zero lies inside the range.
fn draw_bar(canvas: &mut Canvas, x: usize, y: usize, value: f32, min: f32, max: f32) {
    canvas.fill_rect(x, y, BAR_W, BAR_H, BAR_BG);
    let span = (max - min).max(f32::EPSILON);
    let pos = |v: f32| x + (((v - min) / span).clamp(0.0, 1.0) * (BAR_W - 1) as f32) as usize;
    let zero = pos(0.0_f32.clamp(min, max));
    let at = pos(value);
    let (a, b) = if at < zero { (at, zero) } else { (zero, at) };
    canvas.fill_rect(a, y, b - a + 1, BAR_H, blend(TITLE_COLOR, BAR_BG, 0.2));
    canvas.fill_rect(zero, y.saturating_sub(2), 1, BAR_H + 4, TEXT_COLOR);
}

// ════════════════════════════════════════════════════════════════════════════
// Overlay — the minifb window
// ════════════════════════════════════════════════════════════════════════════

pub struct Overlay {
    window:         Window,
    canvas:         Canvas,
    /// Key forwarding for the simulated landmark source.
    sim_tx:         Option<Sender<SimInput>>,
    show_landmarks: bool,
    legend:         &'static str,
}

impl Overlay {
    pub fn new(config: &OverlayConfig, sim_tx: Option<Sender<SimInput>>) -> Result<Self, String> {
        let mut window = Window::new(
            "Gesture Mixer",
            config.width,
            config.height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        let legend = if sim_tx.is_some() {
            "WASD+E=LEFT  IJKL+O=RIGHT  Z/X=HIDE  Q=QUIT"
        } else {
            "Q/ESC=QUIT"
        };

        Ok(Overlay {
            window,
            canvas: Canvas::new(config.width, config.height),
            sim_tx,
            show_landmarks: config.show_landmarks,
            legend,
        })
    }

    fn forward_keys(&self, tx: &Sender<SimInput>) {
        // Held keys send one event per poll
        const HELD: [(Key, SimKey); 10] = [
            (Key::W, SimKey::Move(HandSide::Left, Direction::Up)),
            (Key::S, SimKey::Move(HandSide::Left, Direction::Down)),
            (Key::A, SimKey::Move(HandSide::Left, Direction::Left)),
            (Key::D, SimKey::Move(HandSide::Left, Direction::Right)),
            (Key::E, SimKey::Rotate(HandSide::Left)),
            (Key::I, SimKey::Move(HandSide::Right, Direction::Up)),
            (Key::K, SimKey::Move(HandSide::Right, Direction::Down)),
            (Key::J, SimKey::Move(HandSide::Right, Direction::Left)),
            (Key::L, SimKey::Move(HandSide::Right, Direction::Right)),
            (Key::O, SimKey::Rotate(HandSide::Right)),
        ];
        for (key, sim) in HELD {
            if self.window.is_key_down(key) {
                let _ = tx.send(SimInput::KeyDown(sim));
            }
        }
        if self.window.is_key_pressed(Key::Z, KeyRepeat::No) {
            let _ = tx.send(SimInput::KeyDown(SimKey::ToggleVisible(HandSide::Left)));
        }
        if self.window.is_key_pressed(Key::X, KeyRepeat::No) {
            let _ = tx.send(SimInput::KeyDown(SimKey::ToggleVisible(HandSide::Right)));
        }
    }
}

impl OverlaySink for Overlay {
    fn poll(&mut self) -> OverlayInput {
        if !self.window.is_open() {
            return OverlayInput::Quit;
        }
        if self.window.is_key_pressed(Key::Q, KeyRepeat::No) || self.window.is_key_down(Key::Escape) {
            return OverlayInput::Quit;
        }
        if let Some(tx) = &self.sim_tx {
            self.forward_keys(tx);
        }
        OverlayInput::Continue
    }

    fn render(&mut self, view: &OverlayView<'_>) {
        compose(&mut self.canvas, view, self.show_landmarks, self.legend);
        if let Err(e) = self.window.update_with_buffer(&self.canvas.buf, self.canvas.w, self.canvas.h) {
            log::debug!("overlay update failed: {}", e);
        }
    }
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
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b110, 0b011],
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
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '[' => [0b110, 0b100, 0b100, 0b100, 0b110],
        ']' => [0b011, 0b001, 0b001, 0b001, 0b011],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '<' => [0b001, 0b010, 0b100, 0b010, 0b001],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        '^' => [0b010, 0b101, 0b000, 0b000, 0b000],
        '@' => [0b111, 0b001, 0b101, 0b100, 0b111],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Mix two opaque colours per channel; `t` = 0.0 gives `a`, 1.0 gives `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    [16u32, 8, 0].iter().fold(0xFF000000, |acc, &shift| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        acc | (((ca + (cb - ca) * t).round() as u32) << shift)
    })
}
