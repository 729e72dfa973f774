//! Cursor state
//!
//! Two independent cursors:
//! - the text cursor, a (column, row) cell position moved according to the
//!   text direction register
//! - the graphics cursor, which remembers the two points established before
//!   it so multi-point primitives (triangles, circles, parallelograms) can
//!   refer back to them

use serde::{Deserialize, Serialize};

/// Text direction register bits
pub mod direction {
    /// Scroll protection: defer the end-of-line action until the next character
    pub const PENDING_WRAP: u8 = 1 << 0;
    /// Reverse the normal advance axis
    pub const REVERSE_X: u8 = 1 << 1;
    /// Reverse the end-of-line axis
    pub const REVERSE_Y: u8 = 1 << 2;
    /// Swap the advance and end-of-line axes
    pub const TRANSPOSE: u8 = 1 << 3;
    /// Wrap to the opposite edge instead of scrolling
    pub const NO_SCROLL: u8 = 1 << 4;
    /// Do not move the cursor after printing
    pub const NO_MOVE: u8 = 1 << 5;
    /// In graphics (VDU 5) output, do not wrap at the window's right edge
    pub const NO_GRAPHICS_WRAP: u8 = 1 << 6;
}

/// A signed 2D step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: i32,
    pub dy: i32,
}

impl Vector {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn negated(self) -> Vector {
        Vector::new(-self.dx, -self.dy)
    }

    fn transposed(self) -> Vector {
        Vector::new(self.dy, self.dx)
    }
}

/// Movement decoded from a text direction register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementVectors {
    /// Step after each printed character (dy is positive downwards)
    pub advance: Vector,
    /// Step applied when the advance leaves the window
    pub end_of_line: Vector,
    /// Bit 5: the cursor does not advance after printing
    pub suppress_movement: bool,
    /// Bit 6: graphics-cursor text does not wrap at the window edge
    pub suppress_graphics_wrap: bool,
    /// Bit 4: wrap to the opposite edge instead of scrolling
    pub no_scroll: bool,
}

/// Decode a text direction register value.
///
/// Both vectors are computed on the untransposed axes first; the transpose
/// bit then swaps X and Y of each.
pub fn decode_flags(flags: u8) -> MovementVectors {
    let suppress_movement = flags & direction::NO_MOVE != 0;
    let step = if suppress_movement { 0 } else { 1 };
    let transpose = u32::from(flags & direction::TRANSPOSE != 0);

    let xbit = 1u8 << (1 + transpose);
    let ybit = 1u8 << (2 - transpose);

    let sign = |bit: u8| if flags & bit != 0 { -step } else { step };

    let mut advance = Vector::new(sign(xbit), 0);
    let mut end_of_line = Vector::new(0, sign(ybit));

    if transpose == 1 {
        advance = advance.transposed();
        end_of_line = end_of_line.transposed();
    }

    MovementVectors {
        advance,
        end_of_line,
        suppress_movement,
        suppress_graphics_wrap: flags & direction::NO_GRAPHICS_WRAP != 0,
        no_scroll: flags & direction::NO_SCROLL != 0,
    }
}

/// A point in graphics units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Point {
        Point::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy))
    }
}

/// Graphics cursor with a three-deep position history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphicsCursor {
    oldest: Point,
    old: Point,
    current: Point,
}

impl GraphicsCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish a new point. Every new point shifts the history, whether it
    /// came from a move or a draw.
    pub fn record_plot(&mut self, x: i32, y: i32) {
        self.oldest = self.old;
        self.old = self.current;
        self.current = Point::new(x, y);
    }

    /// (oldest, old, current)
    pub fn history(&self) -> (Point, Point, Point) {
        (self.oldest, self.old, self.current)
    }

    pub fn current(&self) -> Point {
        self.current
    }

    pub fn previous(&self) -> Point {
        self.old
    }

    /// Move the current point without shifting the history
    pub fn set_current(&mut self, p: Point) {
        self.current = p;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Text cursor position, in absolute screen cells (row 0 at the top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextCursor {
    pub col: i32,
    pub row: i32,
    pub visible: bool,
}

impl TextCursor {
    pub fn new() -> Self {
        Self {
            col: 0,
            row: 0,
            visible: true,
        }
    }

    pub fn move_to(&mut self, col: i32, row: i32) {
        self.col = col;
        self.row = row;
    }

    pub fn step(&mut self, v: Vector) {
        self.col += v.dx;
        self.row += v.dy;
    }
}
