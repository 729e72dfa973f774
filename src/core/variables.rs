//! VDU variables
//!
//! Named machine state mutated by command handlers and read by collaborators.
//! Window bounds, colours and the origin are reset on a mode change; the rest
//! persists for the lifetime of the session.
//!
//! Some external tooling addresses these by number; [`read_slot`] provides
//! that view.

use serde::{Deserialize, Serialize};

use super::cursor::{GraphicsCursor, Point};
use super::mode::{ModeFamily, ScreenMode};
use super::palette::Rgb;

/// A window rectangle. For graphics windows the bounds are in graphics units
/// (y up); for text windows they are in character cells (row 0 at the top,
/// so `bottom >= top`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub top: i32,
}

impl Rect {
    pub const fn new(left: i32, bottom: i32, right: i32, top: i32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Whether a graphics point lies inside (y up)
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.bottom && p.y <= self.top
    }

    /// Whether a text cell lies inside (row down)
    pub fn contains_cell(&self, col: i32, row: i32) -> bool {
        col >= self.left && col <= self.right && row >= self.top && row <= self.bottom
    }
}

/// Graphics colour combination (GCOL action)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterOp {
    #[default]
    Set,
    Or,
    And,
    Eor,
    Invert,
    Unchanged,
    AndNot,
    OrNot,
}

impl RasterOp {
    /// Decode the low three bits of a GCOL action byte
    pub fn from_action(action: u8) -> RasterOp {
        match action & 7 {
            0 => RasterOp::Set,
            1 => RasterOp::Or,
            2 => RasterOp::And,
            3 => RasterOp::Eor,
            4 => RasterOp::Invert,
            5 => RasterOp::Unchanged,
            6 => RasterOp::AndNot,
            _ => RasterOp::OrNot,
        }
    }
}

/// Which colour a tint or colour command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColourTarget {
    TextForeground,
    TextBackground,
    GraphicsForeground,
    GraphicsBackground,
}

/// VDU state variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VduVariables {
    pub mode: u8,
    pub text_fg: u8,
    pub text_bg: u8,
    pub gfx_fg: u8,
    pub gfx_bg: u8,
    pub gfx_fg_action: RasterOp,
    pub gfx_bg_action: RasterOp,
    pub text_fg_tint: u8,
    pub text_bg_tint: u8,
    pub gfx_fg_tint: u8,
    pub gfx_bg_tint: u8,
    pub graphics_window: Rect,
    pub text_window: Rect,
    pub origin: Point,
    /// Text direction register
    pub text_direction: u8,
    /// Text is written at the graphics cursor (VDU 5) instead of the text cursor
    pub text_at_graphics: bool,
    pub border: Rgb,
    /// Extra spacing between graphics-cursor characters, in graphics units
    pub char_spacing: (i32, i32),
}

impl VduVariables {
    pub fn new(mode: &ScreenMode) -> Self {
        let mut vars = Self {
            mode: mode.id,
            text_fg: 0,
            text_bg: 0,
            gfx_fg: 0,
            gfx_bg: 0,
            gfx_fg_action: RasterOp::Set,
            gfx_bg_action: RasterOp::Set,
            text_fg_tint: 0,
            text_bg_tint: 0,
            gfx_fg_tint: 0,
            gfx_bg_tint: 0,
            graphics_window: Rect::default(),
            text_window: Rect::default(),
            origin: Point::default(),
            text_direction: 0,
            text_at_graphics: false,
            border: Rgb::BLACK,
            char_spacing: (0, 0),
        };
        vars.reset_for_mode(mode);
        vars
    }

    /// Reset the mode-dependent slots. Text direction, border and character
    /// spacing persist.
    pub fn reset_for_mode(&mut self, mode: &ScreenMode) {
        self.mode = mode.id;
        self.reset_windows(mode);
        self.origin = Point::default();
        self.text_at_graphics = false;
        self.reset_colours(mode);
    }

    /// Full-screen text and graphics windows
    pub fn reset_windows(&mut self, mode: &ScreenMode) {
        self.graphics_window = default_graphics_window(mode);
        self.text_window = default_text_window(mode);
    }

    /// White on black in the mode's colour depth
    pub fn reset_colours(&mut self, mode: &ScreenMode) {
        let white = mode.colour_mask();
        let full_tint = if mode.bits_per_pixel >= 8 { 0xC0 } else { 0 };
        self.text_fg = white;
        self.text_bg = 0;
        self.gfx_fg = white;
        self.gfx_bg = 0;
        self.gfx_fg_action = RasterOp::Set;
        self.gfx_bg_action = RasterOp::Set;
        self.text_fg_tint = full_tint;
        self.text_bg_tint = 0;
        self.gfx_fg_tint = full_tint;
        self.gfx_bg_tint = 0;
    }

    pub fn set_tint(&mut self, target: ColourTarget, tint: u8) {
        let tint = tint & 0xC0;
        match target {
            ColourTarget::TextForeground => self.text_fg_tint = tint,
            ColourTarget::TextBackground => self.text_bg_tint = tint,
            ColourTarget::GraphicsForeground => self.gfx_fg_tint = tint,
            ColourTarget::GraphicsBackground => self.gfx_bg_tint = tint,
        }
    }

    /// (colour, tint) for a target
    pub fn colour(&self, target: ColourTarget) -> (u8, u8) {
        match target {
            ColourTarget::TextForeground => (self.text_fg, self.text_fg_tint),
            ColourTarget::TextBackground => (self.text_bg, self.text_bg_tint),
            ColourTarget::GraphicsForeground => (self.gfx_fg, self.gfx_fg_tint),
            ColourTarget::GraphicsBackground => (self.gfx_bg, self.gfx_bg_tint),
        }
    }
}

pub fn default_graphics_window(mode: &ScreenMode) -> Rect {
    Rect::new(
        0,
        0,
        i32::from(mode.unit_width) - 1,
        i32::from(mode.unit_height) - 1,
    )
}

pub fn default_text_window(mode: &ScreenMode) -> Rect {
    Rect::new(
        0,
        i32::from(mode.text_height) - 1,
        i32::from(mode.text_width) - 1,
        0,
    )
}

fn mode_flags(mode: &ScreenMode) -> i32 {
    let mut flags = 0;
    if mode.is_text_only() {
        flags |= 1;
    }
    if mode.family == ModeFamily::Teletext {
        flags |= 2;
    }
    flags
}

/// Read a variable by its legacy slot number.
///
/// Slots 0-12 describe the mode, 128-170 the VDU state. Unassigned slots
/// yield `None`.
pub fn read_slot(
    slot: u16,
    vars: &VduVariables,
    mode: &ScreenMode,
    cursor: &GraphicsCursor,
) -> Option<i32> {
    let (oldest, old, current) = cursor.history();
    let (xeig, yeig) = mode.eig_factors();
    let (char_w, char_h) = mode.char_size_units();
    let (char_px_w, char_px_h) = mode.char_size_pixels();
    let line_length = i32::from(mode.pixel_width) * i32::from(mode.bits_per_pixel) / 8;

    let value = match slot {
        // Mode variables
        0 => mode_flags(mode),
        1 => i32::from(mode.text_width) - 1,
        2 => i32::from(mode.text_height) - 1,
        3 => i32::from(mode.logical_colours()) - 1,
        4 => i32::from(xeig),
        5 => i32::from(yeig),
        6 => line_length,
        7 => line_length * i32::from(mode.pixel_height),
        8 => 0,
        9 | 10 => mode.bits_per_pixel.trailing_zeros() as i32,
        11 => i32::from(mode.pixel_width) - 1,
        12 => i32::from(mode.pixel_height) - 1,

        // VDU variables
        128 => vars.graphics_window.left,
        129 => vars.graphics_window.bottom,
        130 => vars.graphics_window.right,
        131 => vars.graphics_window.top,
        132 => vars.text_window.left,
        133 => vars.text_window.bottom,
        134 => vars.text_window.right,
        135 => vars.text_window.top,
        136 => vars.origin.x,
        137 => vars.origin.y,
        138 => current.x,
        139 => current.y,
        140 => oldest.x,
        141 => oldest.y,
        142 => old.x,
        143 => old.y,
        153 => i32::from(vars.gfx_fg),
        154 => i32::from(vars.gfx_bg),
        155 => i32::from(vars.text_fg),
        156 => i32::from(vars.text_bg),
        157 => i32::from(vars.gfx_fg_tint),
        158 => i32::from(vars.gfx_bg_tint),
        159 => i32::from(vars.text_fg_tint),
        160 => i32::from(vars.text_bg_tint),
        161 => super::mode::all().len() as i32 - 1,
        162 => char_w,
        163 => char_h,
        164 => char_w + vars.char_spacing.0,
        165 => char_h + vars.char_spacing.1,
        167 => i32::from(char_px_w),
        168 => i32::from(char_px_h),
        169 => i32::from(char_px_w),
        170 => i32::from(char_px_h),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode;

    #[test]
    fn test_defaults_for_mode_28() {
        let m = mode::resolve(28).unwrap();
        let vars = VduVariables::new(&m);
        assert_eq!(vars.graphics_window, Rect::new(0, 0, 1279, 959));
        assert_eq!(vars.text_window, Rect::new(0, 59, 79, 0));
        assert_eq!(vars.text_fg, 63);
        assert_eq!(vars.text_fg_tint, 0xC0);
        assert_eq!(vars.gfx_bg, 0);
    }

    #[test]
    fn test_defaults_for_small_depths() {
        let m = mode::resolve(1).unwrap();
        let vars = VduVariables::new(&m);
        assert_eq!(vars.text_fg, 3);
        assert_eq!(vars.text_fg_tint, 0);
    }

    #[test]
    fn test_mode_change_keeps_direction() {
        let m0 = mode::resolve(0).unwrap();
        let m12 = mode::resolve(12).unwrap();
        let mut vars = VduVariables::new(&m0);
        vars.text_direction = 2;
        vars.origin = Point::new(100, 100);
        vars.reset_for_mode(&m12);
        assert_eq!(vars.text_direction, 2);
        assert_eq!(vars.origin, Point::default());
        assert_eq!(vars.mode, 12);
        assert_eq!(vars.text_fg, 15);
    }

    #[test]
    fn test_tint_masking() {
        let m = mode::resolve(28).unwrap();
        let mut vars = VduVariables::new(&m);
        vars.set_tint(ColourTarget::GraphicsBackground, 0x7F);
        assert_eq!(vars.colour(ColourTarget::GraphicsBackground), (0, 0x40));
    }

    #[test]
    fn test_raster_op_decode() {
        assert_eq!(RasterOp::from_action(0), RasterOp::Set);
        assert_eq!(RasterOp::from_action(3), RasterOp::Eor);
        assert_eq!(RasterOp::from_action(0x14), RasterOp::Invert);
    }

    #[test]
    fn test_read_slot() {
        let m = mode::resolve(28).unwrap();
        let vars = VduVariables::new(&m);
        let mut cursor = GraphicsCursor::new();
        cursor.record_plot(10, 20);
        cursor.record_plot(30, 40);

        assert_eq!(read_slot(1, &vars, &m, &cursor), Some(79));
        assert_eq!(read_slot(3, &vars, &m, &cursor), Some(255));
        assert_eq!(read_slot(9, &vars, &m, &cursor), Some(3));
        assert_eq!(read_slot(130, &vars, &m, &cursor), Some(1279));
        assert_eq!(read_slot(138, &vars, &m, &cursor), Some(30));
        assert_eq!(read_slot(142, &vars, &m, &cursor), Some(10));
        assert_eq!(read_slot(162, &vars, &m, &cursor), Some(16));
        assert_eq!(read_slot(100, &vars, &m, &cursor), None);
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(0, 0, 10, 10);
        assert!(r.contains_point(Point::new(5, 5)));
        assert!(!r.contains_point(Point::new(11, 5)));

        let t = Rect::new(0, 24, 39, 0);
        assert!(t.contains_cell(39, 24));
        assert!(!t.contains_cell(40, 0));
    }
}
