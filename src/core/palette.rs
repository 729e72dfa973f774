//! Palette model
//!
//! Builds the default logical-to-physical colour table for a colour depth and
//! resolves logical colours (plus tint, in 256-colour modes) to RGB.
//!
//! The 256-colour layout scatters the bits of the palette index across the
//! three channels; every channel value is a multiple of 17.

use serde::{Deserialize, Serialize};

/// A physical (RGB) colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);
    pub const CYAN: Rgb = Rgb::new(0, 255, 255);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// The eight primary physical colours, in physical-colour-number order
pub const RAINBOW: [Rgb; 8] = [
    Rgb::BLACK,
    Rgb::RED,
    Rgb::GREEN,
    Rgb::YELLOW,
    Rgb::BLUE,
    Rgb::MAGENTA,
    Rgb::CYAN,
    Rgb::WHITE,
];

/// Logical-to-physical colour table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    entries: Vec<Rgb>,
}

impl Palette {
    /// Number of logical colours
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Physical colour of a logical colour, wrapping modulo the palette size
    pub fn get(&self, logical: u8) -> Rgb {
        if self.entries.is_empty() {
            return Rgb::BLACK;
        }
        self.entries[usize::from(logical) % self.entries.len()]
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    /// A copy of this palette with one entry replaced
    pub fn with_entry(&self, logical: u8, colour: Rgb) -> Palette {
        let mut entries = self.entries.clone();
        if !entries.is_empty() {
            let len = entries.len();
            entries[usize::from(logical) % len] = colour;
        }
        Palette { entries }
    }

    fn is_full_colour(&self) -> bool {
        self.entries.len() == 256
    }
}

/// Default physical colour for a physical colour number (0-15).
///
/// Numbers 8-15 are the flashing pairs on real hardware; they resolve to
/// their steady counterparts here.
pub fn physical_colour(number: u8) -> Rgb {
    RAINBOW[usize::from(number & 7)]
}

/// Channel values for a 256-colour palette index
fn full_colour_entry(i: u8) -> Rgb {
    let i = u16::from(i);
    let r = (i & 7) | ((i & 16) >> 1);
    let g = (i & 3) | ((i & 96) >> 3);
    let b = (i & 3) | ((i & 8) >> 1) | ((i & 128) >> 4);
    Rgb::new((17 * r) as u8, (17 * g) as u8, (17 * b) as u8)
}

/// Build the default palette for a colour depth
pub fn build(bits_per_pixel: u8) -> Palette {
    let entries = match bits_per_pixel {
        1 => vec![Rgb::BLACK, Rgb::WHITE],
        2 => vec![Rgb::BLACK, Rgb::RED, Rgb::YELLOW, Rgb::WHITE],
        4 => RAINBOW.iter().chain(RAINBOW.iter()).copied().collect(),
        8 => (0..=255u8).map(full_colour_entry).collect(),
        other => {
            tracing::warn!("No default palette for {} bpp, using 1 bpp", other);
            vec![Rgb::BLACK, Rgb::WHITE]
        }
    };
    Palette { entries }
}

/// Palette index for a logical colour and tint in 256-colour modes.
///
/// Only the two high bits of the tint are significant.
pub fn full_colour_index(logical: u8, tint: u8) -> u8 {
    ((logical & 33) << 2) | ((logical & 14) << 3) | ((logical & 16) >> 1) | (tint >> 6)
}

/// Resolve a logical colour to a physical colour.
///
/// The tint only applies to 256-colour palettes; smaller palettes are indexed
/// directly by the logical colour.
pub fn resolve(palette: &Palette, logical: u8, tint: u8) -> Rgb {
    if palette.is_full_colour() {
        palette.get(full_colour_index(logical, tint))
    } else {
        palette.get(logical)
    }
}

/// Direct expansion for true-colour modes: the 256-colour layout without a table
pub fn expand_true_colour(logical: u8, tint: u8) -> Rgb {
    full_colour_entry(full_colour_index(logical, tint))
}

/// Fixed teletext colours
pub fn teletext_colour(logical: u8) -> Rgb {
    physical_colour(logical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_palettes() {
        assert_eq!(build(1).entries(), &[Rgb::BLACK, Rgb::WHITE]);
        assert_eq!(
            build(2).entries(),
            &[Rgb::BLACK, Rgb::RED, Rgb::YELLOW, Rgb::WHITE]
        );

        let p = build(4);
        assert_eq!(p.len(), 16);
        assert_eq!(p.get(3), Rgb::YELLOW);
        assert_eq!(p.get(11), Rgb::YELLOW);
        assert_eq!(p.get(15), Rgb::WHITE);
    }

    #[test]
    fn test_full_colour_palette() {
        let p = build(8);
        assert_eq!(p.len(), 256);
        assert_eq!(p.get(0), Rgb::BLACK);
        assert_eq!(p.get(255), Rgb::WHITE);
        // bit 4 feeds red bit 3 only
        assert_eq!(p.get(16), Rgb::new(136, 0, 0));
    }

    #[test]
    fn test_resolve_with_tint() {
        let p = build(8);
        assert_eq!(resolve(&p, 0, 0), Rgb::BLACK);
        assert_eq!(resolve(&p, 255, 0xFF), Rgb::WHITE);
        assert_eq!(resolve(&p, 63, 0xC0), Rgb::WHITE);
        // Without tint, colour 63 is one step short of white
        assert_eq!(full_colour_index(63, 0), 252);
        assert_eq!(resolve(&p, 63, 0), Rgb::new(204, 204, 204));
    }

    #[test]
    fn test_tint_ignored_below_8bpp() {
        let p = build(4);
        assert_eq!(resolve(&p, 1, 0xC0), Rgb::RED);
        assert_eq!(resolve(&p, 17, 0), Rgb::RED);
    }

    #[test]
    fn test_with_entry_leaves_original() {
        let p = build(1);
        let q = p.with_entry(1, Rgb::new(1, 2, 3));
        assert_eq!(p.get(1), Rgb::WHITE);
        assert_eq!(q.get(1), Rgb::new(1, 2, 3));
    }

    proptest! {
        #[test]
        fn prop_full_colour_multiples_of_17(i in 0u8..=255) {
            let c = build(8).get(i);
            prop_assert_eq!(c.r % 17, 0);
            prop_assert_eq!(c.g % 17, 0);
            prop_assert_eq!(c.b % 17, 0);
        }

        #[test]
        fn prop_true_colour_matches_palette(logical in 0u8..=255, tint in 0u8..=255) {
            prop_assert_eq!(expand_true_colour(logical, tint), resolve(&build(8), logical, tint));
        }
    }
}
