//! Display collaborators
//!
//! The session never rasterises anything itself. Decoded draw requests go to
//! a [`Renderer`], characters to a [`TextOutput`], and glyph bitmaps come
//! from a [`FontProvider`]. Coordinates passed to the renderer are absolute
//! graphics units: relative PLOTs and the graphics origin are already
//! resolved. [`ScreenMode::units_to_pixels`] converts to device pixels.
//!
//! Renderer primitives default to [`Outcome::Unsupported`], so a backend only
//! implements what it can draw.
//!
//! [`ScreenMode::units_to_pixels`]: crate::core::ScreenMode::units_to_pixels

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Palette, Point, RasterOp, Rect, Rgb, ScreenMode, Vector};
use crate::plot::LineStyle;

/// A recognised operation this session or its backend cannot carry out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unsupported {
    pub what: String,
    /// PLOT code or sub-command, where one applies
    pub code: Option<u8>,
}

impl Unsupported {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: u8) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "unsupported {} ({})", self.what, code),
            None => write!(f, "unsupported {}", self.what),
        }
    }
}

/// Result of applying one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Handled,
    Unsupported(Unsupported),
}

impl Outcome {
    pub fn unsupported(what: impl Into<String>) -> Outcome {
        Outcome::Unsupported(Unsupported::new(what))
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled)
    }

    /// Combine two outcomes; the first unsupported one wins
    pub fn and(self, other: Outcome) -> Outcome {
        match self {
            Outcome::Handled => other,
            unsupported => unsupported,
        }
    }

    /// Attach a code to an unsupported outcome
    pub fn with_code(self, code: u8) -> Outcome {
        match self {
            Outcome::Unsupported(u) if u.code.is_none() => Outcome::Unsupported(u.with_code(code)),
            other => other,
        }
    }
}

/// Colour, combination rule and clip window for one drawing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paint {
    pub colour: Rgb,
    pub op: RasterOp,
    /// Graphics window in absolute graphics units
    pub clip: Rect,
}

/// An 8x8 character bitmap, one byte per row, top row first, bit 7 leftmost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Glyph(pub [u8; 8]);

impl Glyph {
    pub const BLANK: Glyph = Glyph([0; 8]);
}

/// Graphics primitives
pub trait Renderer {
    /// A new mode is active; its default palette is supplied for paletted modes
    fn mode_changed(&mut self, _mode: &ScreenMode, _palette: Option<&Palette>) {}

    /// The active palette was replaced
    fn palette_changed(&mut self, _palette: &Palette) {}

    fn draw_line(&mut self, _from: Point, _to: Point, _style: LineStyle, _paint: &Paint) -> Outcome {
        Outcome::unsupported("line")
    }

    fn draw_point(&mut self, _at: Point, _paint: &Paint) -> Outcome {
        Outcome::unsupported("point")
    }

    fn fill_triangle(&mut self, _a: Point, _b: Point, _c: Point, _paint: &Paint) -> Outcome {
        Outcome::unsupported("triangle fill")
    }

    fn fill_rectangle(&mut self, _rect: Rect, _paint: &Paint) -> Outcome {
        Outcome::unsupported("rectangle fill")
    }

    fn draw_circle(&mut self, _centre: Point, _radius: i32, _paint: &Paint) -> Outcome {
        Outcome::unsupported("circle outline")
    }

    fn fill_circle(&mut self, _centre: Point, _radius: i32, _paint: &Paint) -> Outcome {
        Outcome::unsupported("circle fill")
    }

    fn draw_ellipse(&mut self, _centre: Point, _rx: i32, _ry: i32, _paint: &Paint) -> Outcome {
        Outcome::unsupported("ellipse outline")
    }

    fn fill_ellipse(&mut self, _centre: Point, _rx: i32, _ry: i32, _paint: &Paint) -> Outcome {
        Outcome::unsupported("ellipse fill")
    }

    /// Move or copy a rectangle so its bottom-left corner lands on `dest`.
    /// A move clears the uncovered source area with `background`.
    fn transfer_block(
        &mut self,
        _source: Rect,
        _dest: Point,
        _clear_source: bool,
        _background: &Paint,
    ) -> Outcome {
        Outcome::unsupported("rectangle move/copy")
    }

    /// Draw a character bitmap with its top-left corner at `at`
    fn blit_glyph(&mut self, _at: Point, _glyph: &Glyph, _paint: &Paint) -> Outcome {
        Outcome::unsupported("glyph blit")
    }

    /// Fill the graphics window with the background colour
    fn clear_graphics(&mut self, _paint: &Paint) -> Outcome {
        Outcome::unsupported("graphics clear")
    }

    /// Make everything drawn so far visible. Called at most once per command.
    ///
    /// A text cursor move counts as output: commands that only move the
    /// cursor (LF, TAB, VDU 30) are followed by a present too.
    fn present(&mut self) {}
}

/// Character-cell output
pub trait TextOutput {
    /// Write a character at an absolute (column, row) screen cell
    fn put_char(&mut self, code: u8, column: i32, row: i32);

    /// Text foreground and background changed
    fn set_text_colours(&mut self, _fg: Rgb, _bg: Rgb) {}

    /// Clear a text window (cell bounds) to the background colour
    fn clear_text(&mut self, _window: Rect, _background: Rgb) {}

    /// Scroll the contents of a text window one step in the given direction
    fn scroll(&mut self, _window: Rect, _step: Vector, _by_pixel: bool) {}

    /// Text cursor moved or changed visibility
    fn set_cursor(&mut self, _column: i32, _row: i32, _visible: bool) {}

    fn bell(&mut self) {}
}

/// Glyph bitmaps
pub trait FontProvider {
    fn glyph_bitmap(&self, code: u8) -> Glyph;

    /// Redefine a character. Providers with fixed fonts refuse.
    fn define_glyph(&mut self, _code: u8, _glyph: Glyph) -> Outcome {
        Outcome::unsupported("glyph definition")
    }
}

/// Everything a session drives
pub trait Backend: Renderer + TextOutput + FontProvider {}

impl<T: Renderer + TextOutput + FontProvider> Backend for T {}

/// Backend that draws nothing and supports no primitives
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl Renderer for NullBackend {}

impl TextOutput for NullBackend {
    fn put_char(&mut self, _code: u8, _column: i32, _row: i32) {}
}

impl FontProvider for NullBackend {
    fn glyph_bitmap(&self, _code: u8) -> Glyph {
        Glyph::BLANK
    }
}

/// One call made on a [`Recorder`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    ModeChanged { mode: u8 },
    PaletteChanged,
    Line { from: Point, to: Point, style: LineStyle, paint: Paint },
    Point { at: Point, paint: Paint },
    Triangle { a: Point, b: Point, c: Point, paint: Paint },
    Rectangle { rect: Rect, paint: Paint },
    Circle { centre: Point, radius: i32, filled: bool, paint: Paint },
    Ellipse { centre: Point, rx: i32, ry: i32, filled: bool, paint: Paint },
    Transfer { source: Rect, dest: Point, clear_source: bool },
    Glyph { at: Point, glyph: Glyph, paint: Paint },
    ClearGraphics { paint: Paint },
    Char { code: u8, column: i32, row: i32 },
    TextColours { fg: Rgb, bg: Rgb },
    ClearText { window: Rect, background: Rgb },
    Scroll { window: Rect, step: Vector, by_pixel: bool },
    Bell,
}

/// Backend that records every call, for tests and the headless runner
#[derive(Debug, Clone, Default, Serialize)]
pub struct Recorder {
    pub calls: Vec<Call>,
    pub presents: usize,
    /// Last reported text cursor (column, row, visible)
    pub cursor: (i32, i32, bool),
    #[serde(skip)]
    glyphs: HashMap<u8, Glyph>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded draw calls only (no text or notifications)
    pub fn draw_calls(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter().filter(|c| {
            matches!(
                c,
                Call::Line { .. }
                    | Call::Point { .. }
                    | Call::Triangle { .. }
                    | Call::Rectangle { .. }
                    | Call::Circle { .. }
                    | Call::Ellipse { .. }
                    | Call::Transfer { .. }
                    | Call::Glyph { .. }
            )
        })
    }

    /// Characters written, as (code, column, row)
    pub fn chars(&self) -> Vec<(u8, i32, i32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Char { code, column, row } => Some((*code, *column, *row)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
        self.presents = 0;
    }
}

impl Renderer for Recorder {
    fn mode_changed(&mut self, mode: &ScreenMode, _palette: Option<&Palette>) {
        self.calls.push(Call::ModeChanged { mode: mode.id });
    }

    fn palette_changed(&mut self, _palette: &Palette) {
        self.calls.push(Call::PaletteChanged);
    }

    fn draw_line(&mut self, from: Point, to: Point, style: LineStyle, paint: &Paint) -> Outcome {
        self.calls.push(Call::Line {
            from,
            to,
            style,
            paint: *paint,
        });
        Outcome::Handled
    }

    fn draw_point(&mut self, at: Point, paint: &Paint) -> Outcome {
        self.calls.push(Call::Point { at, paint: *paint });
        Outcome::Handled
    }

    fn fill_triangle(&mut self, a: Point, b: Point, c: Point, paint: &Paint) -> Outcome {
        self.calls.push(Call::Triangle {
            a,
            b,
            c,
            paint: *paint,
        });
        Outcome::Handled
    }

    fn fill_rectangle(&mut self, rect: Rect, paint: &Paint) -> Outcome {
        self.calls.push(Call::Rectangle { rect, paint: *paint });
        Outcome::Handled
    }

    fn draw_circle(&mut self, centre: Point, radius: i32, paint: &Paint) -> Outcome {
        self.calls.push(Call::Circle {
            centre,
            radius,
            filled: false,
            paint: *paint,
        });
        Outcome::Handled
    }

    fn fill_circle(&mut self, centre: Point, radius: i32, paint: &Paint) -> Outcome {
        self.calls.push(Call::Circle {
            centre,
            radius,
            filled: true,
            paint: *paint,
        });
        Outcome::Handled
    }

    fn draw_ellipse(&mut self, centre: Point, rx: i32, ry: i32, paint: &Paint) -> Outcome {
        self.calls.push(Call::Ellipse {
            centre,
            rx,
            ry,
            filled: false,
            paint: *paint,
        });
        Outcome::Handled
    }

    fn fill_ellipse(&mut self, centre: Point, rx: i32, ry: i32, paint: &Paint) -> Outcome {
        self.calls.push(Call::Ellipse {
            centre,
            rx,
            ry,
            filled: true,
            paint: *paint,
        });
        Outcome::Handled
    }

    fn transfer_block(
        &mut self,
        source: Rect,
        dest: Point,
        clear_source: bool,
        _background: &Paint,
    ) -> Outcome {
        self.calls.push(Call::Transfer {
            source,
            dest,
            clear_source,
        });
        Outcome::Handled
    }

    fn blit_glyph(&mut self, at: Point, glyph: &Glyph, paint: &Paint) -> Outcome {
        self.calls.push(Call::Glyph {
            at,
            glyph: *glyph,
            paint: *paint,
        });
        Outcome::Handled
    }

    fn clear_graphics(&mut self, paint: &Paint) -> Outcome {
        self.calls.push(Call::ClearGraphics { paint: *paint });
        Outcome::Handled
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}

impl TextOutput for Recorder {
    fn put_char(&mut self, code: u8, column: i32, row: i32) {
        self.calls.push(Call::Char { code, column, row });
    }

    fn set_text_colours(&mut self, fg: Rgb, bg: Rgb) {
        self.calls.push(Call::TextColours { fg, bg });
    }

    fn clear_text(&mut self, window: Rect, background: Rgb) {
        self.calls.push(Call::ClearText { window, background });
    }

    fn scroll(&mut self, window: Rect, step: Vector, by_pixel: bool) {
        self.calls.push(Call::Scroll {
            window,
            step,
            by_pixel,
        });
    }

    fn set_cursor(&mut self, column: i32, row: i32, visible: bool) {
        self.cursor = (column, row, visible);
    }

    fn bell(&mut self) {
        self.calls.push(Call::Bell);
    }
}

impl FontProvider for Recorder {
    fn glyph_bitmap(&self, code: u8) -> Glyph {
        self.glyphs.get(&code).copied().unwrap_or(Glyph::BLANK)
    }

    fn define_glyph(&mut self, code: u8, glyph: Glyph) -> Outcome {
        self.glyphs.insert(code, glyph);
        Outcome::Handled
    }
}
