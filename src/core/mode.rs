//! Screen mode registry
//!
//! Maps a mode number to an immutable descriptor of the screen geometry and
//! colour depth. The table is fixed; mode numbers are masked to 7 bits before
//! lookup because bit 7 only selects the shadow bank.
//!
//! Three coordinate spaces are involved:
//! - text: character cells (`text_width` x `text_height`)
//! - pixels: device pixels (`pixel_width` x `pixel_height`)
//! - units: the graphics coordinate space used by PLOT and friends
//!   (`unit_width` x `unit_height`)
//!
//! Text-only modes have zero pixel and unit dimensions.

use serde::{Deserialize, Serialize};

use super::palette::{self, Palette, Rgb};
use crate::error::{Result, VduError};

/// Bit 7 of a mode number selects the shadow screen bank
pub const SHADOW_BANK: u8 = 0x80;

/// Mode family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeFamily {
    /// Logical colours index a palette of 2^bpp entries
    Paletted,
    /// Logical colours are expanded directly to RGB.
    ///
    /// No registered mode uses this; it is for hosts that describe their own
    /// `ScreenMode` and hand it to `ScreenModeKind::for_mode`.
    TrueColour,
    /// Teletext character-cell display with fixed colours
    Teletext,
}

/// Immutable screen mode descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenMode {
    pub id: u8,
    pub text_width: u16,
    pub text_height: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
    pub unit_width: u16,
    pub unit_height: u16,
    pub bits_per_pixel: u8,
    pub family: ModeFamily,
}

impl ScreenMode {
    /// Number of logical colours (`1 << bits_per_pixel`)
    pub fn logical_colours(&self) -> u16 {
        1u16 << self.bits_per_pixel.min(8)
    }

    /// Mask applied to colour numbers from VDU 17 and GCOL.
    ///
    /// Bit 7 of those bytes selects background, so 256-colour modes take 64
    /// colours here and reach the rest through the tint.
    pub fn colour_mask(&self) -> u8 {
        if self.bits_per_pixel >= 8 {
            63
        } else {
            (self.logical_colours() - 1) as u8
        }
    }

    /// True for modes with no addressable graphics
    pub fn is_text_only(&self) -> bool {
        self.pixel_width == 0 || self.pixel_height == 0
    }

    /// Ratio of a pixel's height to its width, in graphics units.
    ///
    /// Defined as 1 when the mode has no pixels.
    pub fn pixel_aspect(&self) -> f64 {
        if self.is_text_only() || self.unit_width == 0 {
            return 1.0;
        }
        let unit_per_px_y = f64::from(self.unit_height) / f64::from(self.pixel_height);
        let unit_per_px_x = f64::from(self.unit_width) / f64::from(self.pixel_width);
        unit_per_px_y / unit_per_px_x
    }

    /// Pixel dimensions with the aspect ratio corrected to square pixels
    pub fn square_pixel_size(&self) -> (u32, u32) {
        let aspect = self.pixel_aspect();
        let w = u32::from(self.pixel_width);
        let h = u32::from(self.pixel_height);
        if aspect >= 1.0 {
            (w, (f64::from(h) * aspect).round() as u32)
        } else {
            ((f64::from(w) / aspect).round() as u32, h)
        }
    }

    /// Graphics units per pixel as a power of two (x, y)
    pub fn eig_factors(&self) -> (u8, u8) {
        if self.is_text_only() {
            return (0, 0);
        }
        let eig = |units: u16, px: u16| (units / px.max(1)).max(1).trailing_zeros() as u8;
        (
            eig(self.unit_width, self.pixel_width),
            eig(self.unit_height, self.pixel_height),
        )
    }

    /// Size of one character cell in graphics units (width, height)
    pub fn char_size_units(&self) -> (i32, i32) {
        if self.is_text_only() {
            return (0, 0);
        }
        (
            i32::from(self.unit_width) / i32::from(self.text_width.max(1)),
            i32::from(self.unit_height) / i32::from(self.text_height.max(1)),
        )
    }

    /// Size of one character cell in pixels (width, height)
    pub fn char_size_pixels(&self) -> (u16, u16) {
        if self.is_text_only() {
            return (8, 8);
        }
        (
            self.pixel_width / self.text_width.max(1),
            self.pixel_height / self.text_height.max(1),
        )
    }

    /// Convert a graphics-unit coordinate (y up) to a pixel coordinate (y down)
    pub fn units_to_pixels(&self, x: i32, y: i32) -> (i32, i32) {
        let (xe, ye) = self.eig_factors();
        let px = x >> xe;
        let py = i32::from(self.pixel_height) - 1 - (y >> ye);
        (px, py)
    }
}

const fn mode(
    id: u8,
    text: (u16, u16),
    pixels: (u16, u16),
    units: (u16, u16),
    bits_per_pixel: u8,
    family: ModeFamily,
) -> ScreenMode {
    ScreenMode {
        id,
        text_width: text.0,
        text_height: text.1,
        pixel_width: pixels.0,
        pixel_height: pixels.1,
        unit_width: units.0,
        unit_height: units.1,
        bits_per_pixel,
        family,
    }
}

use ModeFamily::{Paletted as P, Teletext as T};

/// Mode table, indexed by mode number
static MODES: [ScreenMode; 50] = [
    mode(0, (80, 32), (640, 256), (1280, 1024), 1, P),
    mode(1, (40, 32), (320, 256), (1280, 1024), 2, P),
    mode(2, (20, 32), (160, 256), (1280, 1024), 4, P),
    mode(3, (80, 25), (0, 0), (0, 0), 1, P),
    mode(4, (40, 32), (320, 256), (1280, 1024), 1, P),
    mode(5, (20, 32), (160, 256), (1280, 1024), 2, P),
    mode(6, (40, 25), (0, 0), (0, 0), 1, P),
    mode(7, (40, 25), (0, 0), (0, 0), 4, T),
    mode(8, (80, 32), (640, 256), (1280, 1024), 2, P),
    mode(9, (40, 32), (320, 256), (1280, 1024), 4, P),
    mode(10, (20, 32), (160, 256), (1280, 1024), 8, P),
    mode(11, (80, 25), (640, 250), (1280, 1000), 2, P),
    mode(12, (80, 32), (640, 256), (1280, 1024), 4, P),
    mode(13, (40, 32), (320, 256), (1280, 1024), 8, P),
    mode(14, (80, 25), (640, 250), (1280, 1000), 4, P),
    mode(15, (80, 32), (640, 256), (1280, 1024), 8, P),
    mode(16, (132, 32), (1056, 256), (2112, 1024), 4, P),
    mode(17, (132, 25), (1056, 250), (2112, 1000), 4, P),
    mode(18, (80, 64), (640, 512), (1280, 1024), 1, P),
    mode(19, (80, 64), (640, 512), (1280, 1024), 2, P),
    mode(20, (80, 64), (640, 512), (1280, 1024), 4, P),
    mode(21, (80, 64), (640, 512), (1280, 1024), 8, P),
    mode(22, (96, 36), (768, 288), (1536, 1152), 4, P),
    mode(23, (144, 112), (1152, 896), (2304, 1792), 1, P),
    mode(24, (132, 32), (1056, 256), (2112, 1024), 8, P),
    mode(25, (80, 60), (640, 480), (1280, 960), 1, P),
    mode(26, (80, 60), (640, 480), (1280, 960), 2, P),
    mode(27, (80, 60), (640, 480), (1280, 960), 4, P),
    mode(28, (80, 60), (640, 480), (1280, 960), 8, P),
    mode(29, (100, 75), (800, 600), (1600, 1200), 1, P),
    mode(30, (100, 75), (800, 600), (1600, 1200), 2, P),
    mode(31, (100, 75), (800, 600), (1600, 1200), 4, P),
    mode(32, (100, 75), (800, 600), (1600, 1200), 8, P),
    mode(33, (96, 36), (768, 288), (1536, 1152), 1, P),
    mode(34, (96, 36), (768, 288), (1536, 1152), 2, P),
    mode(35, (96, 36), (768, 288), (1536, 1152), 4, P),
    mode(36, (96, 36), (768, 288), (1536, 1152), 8, P),
    mode(37, (112, 44), (896, 352), (1792, 1408), 1, P),
    mode(38, (112, 44), (896, 352), (1792, 1408), 2, P),
    mode(39, (112, 44), (896, 352), (1792, 1408), 4, P),
    mode(40, (112, 44), (896, 352), (1792, 1408), 8, P),
    mode(41, (80, 44), (640, 352), (1280, 1408), 1, P),
    mode(42, (80, 44), (640, 352), (1280, 1408), 2, P),
    mode(43, (80, 44), (640, 352), (1280, 1408), 4, P),
    mode(44, (80, 25), (640, 200), (1280, 800), 1, P),
    mode(45, (80, 25), (640, 200), (1280, 800), 2, P),
    mode(46, (80, 25), (640, 200), (1280, 800), 4, P),
    mode(47, (45, 60), (360, 480), (1440, 960), 8, P),
    mode(48, (40, 60), (320, 480), (1280, 960), 4, P),
    mode(49, (40, 60), (320, 480), (1280, 960), 8, P),
];

/// Resolve a mode number to its descriptor.
///
/// The shadow-bank bit is ignored.
pub fn resolve(number: u8) -> Result<ScreenMode> {
    let id = number & !SHADOW_BANK;
    MODES
        .get(usize::from(id))
        .filter(|m| m.id == id)
        .copied()
        .ok_or(VduError::NoSuchScreenMode(id))
}

/// All registered modes, in mode-number order
pub fn all() -> &'static [ScreenMode] {
    &MODES
}

/// Colour model of an activated mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenModeKind {
    Paletted { bpp: u8, palette: Palette },
    TrueColour,
    Teletext,
}

impl ScreenModeKind {
    /// Build the colour model for a mode, with its default palette
    pub fn for_mode(mode: &ScreenMode) -> Self {
        match mode.family {
            ModeFamily::Paletted => ScreenModeKind::Paletted {
                bpp: mode.bits_per_pixel,
                palette: palette::build(mode.bits_per_pixel),
            },
            ModeFamily::TrueColour => ScreenModeKind::TrueColour,
            ModeFamily::Teletext => ScreenModeKind::Teletext,
        }
    }

    /// Resolve a logical colour and tint to a physical colour
    pub fn resolve(&self, logical: u8, tint: u8) -> Rgb {
        match self {
            ScreenModeKind::Paletted { palette, .. } => palette::resolve(palette, logical, tint),
            ScreenModeKind::TrueColour => palette::expand_true_colour(logical, tint),
            ScreenModeKind::Teletext => palette::teletext_colour(logical),
        }
    }

    /// The active palette, if this kind has one
    pub fn palette(&self) -> Option<&Palette> {
        match self {
            ScreenModeKind::Paletted { palette, .. } => Some(palette),
            _ => None,
        }
    }

    /// Replace the palette of a paletted mode. Returns false for other kinds.
    pub fn replace_palette(&mut self, new: Palette) -> bool {
        match self {
            ScreenModeKind::Paletted { palette, .. } => {
                *palette = new;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_is_dense() {
        for (i, m) in all().iter().enumerate() {
            assert_eq!(usize::from(m.id), i);
        }
    }

    #[test]
    fn test_resolve_mode_28() {
        let m = resolve(28).unwrap();
        assert_eq!((m.text_width, m.text_height), (80, 60));
        assert_eq!((m.pixel_width, m.pixel_height), (640, 480));
        assert_eq!(m.bits_per_pixel, 8);
        assert_eq!(m.logical_colours(), 256);
        assert_eq!(m.colour_mask(), 63);
        assert_eq!(m.eig_factors(), (1, 1));
    }

    #[test]
    fn test_unknown_mode() {
        assert_eq!(resolve(99), Err(VduError::NoSuchScreenMode(99)));
        assert_eq!(resolve(0x80 | 99), Err(VduError::NoSuchScreenMode(99)));
    }

    #[test]
    fn test_text_only_aspect() {
        let m = resolve(3).unwrap();
        assert!(m.is_text_only());
        assert_eq!(m.pixel_aspect(), 1.0);
        assert_eq!(m.char_size_units(), (0, 0));
    }

    #[test]
    fn test_rectangular_pixels() {
        // Mode 0 pixels are twice as tall as they are wide
        let m = resolve(0).unwrap();
        assert_eq!(m.eig_factors(), (1, 2));
        assert_eq!(m.pixel_aspect(), 2.0);
        assert_eq!(m.square_pixel_size(), (640, 512));
        assert_eq!(m.char_size_units(), (16, 32));
    }

    #[test]
    fn test_units_to_pixels() {
        let m = resolve(28).unwrap();
        assert_eq!(m.units_to_pixels(0, 0), (0, 479));
        assert_eq!(m.units_to_pixels(1278, 958), (639, 0));
    }

    #[test]
    fn test_teletext_colours() {
        let m = resolve(7).unwrap();
        let kind = ScreenModeKind::for_mode(&m);
        assert!(kind.palette().is_none());
        assert_eq!(kind.resolve(1, 0), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_host_true_colour_mode() {
        let m = ScreenMode {
            family: ModeFamily::TrueColour,
            ..resolve(28).unwrap()
        };
        let kind = ScreenModeKind::for_mode(&m);
        assert_eq!(kind, ScreenModeKind::TrueColour);
        assert!(kind.palette().is_none());
        assert_eq!(kind.resolve(63, 0xC0), Rgb::WHITE);
        assert_eq!(kind.resolve(0, 0), Rgb::BLACK);
    }

    #[test]
    fn test_logical_colour_count_matches_palette() {
        for m in all().iter().filter(|m| m.family == ModeFamily::Paletted) {
            let kind = ScreenModeKind::for_mode(m);
            let palette = kind.palette().unwrap();
            assert_eq!(palette.len(), usize::from(m.logical_colours()));
        }
    }

    proptest! {
        #[test]
        fn prop_shadow_bank_ignored(n in 0u8..127) {
            prop_assert_eq!(resolve(n), resolve(n | SHADOW_BANK));
        }
    }
}
