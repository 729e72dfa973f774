//! PLOT code decoding
//!
//! The VDU 25 mode byte packs three fields:
//! - bits 0-1: effect (move only, foreground, inverse, background)
//! - bit 2: absolute (1) or relative (0) coordinates
//! - bits 3-7: primitive
//!
//! Multi-point primitives take their vertices from the graphics cursor
//! history, which is updated with the new point before the primitive runs.

use serde::{Deserialize, Serialize};

use crate::core::{Point, Rect};

/// What colour a PLOT uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlotEffect {
    /// Only move the graphics cursor
    Move,
    Foreground,
    Inverse,
    Background,
}

/// Endpoint and pattern options for line primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineStyle {
    pub dotted: bool,
    pub skip_first: bool,
    pub skip_last: bool,
}

/// Horizontal scan-line fill variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineFill {
    /// Left and right until a non-background pixel
    LeftRightToNonBackground,
    /// Right until a background pixel
    RightToBackground,
    /// Left and right until a foreground pixel
    LeftRightToForeground,
    /// Right until a non-foreground pixel
    RightToNonForeground,
}

/// The drawing primitive selected by bits 3-7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    Line(LineStyle),
    Point,
    LineFill(LineFill),
    Triangle,
    Rectangle,
    Parallelogram,
    /// Flood fill; `to_foreground` selects the boundary colour
    FloodFill { to_foreground: bool },
    CircleOutline,
    CircleFill,
    Arc,
    Segment,
    Sector,
    /// Rectangle move or copy
    BlockTransfer,
    EllipseOutline,
    EllipseFill,
    FontPrint,
    Sprite,
    Reserved(u8),
}

impl Primitive {
    /// Decode the primitive field (the mode byte masked with 0xF8)
    pub fn from_code(code: u8) -> Primitive {
        let group = code & 0xF8;
        match group {
            0x00..=0x38 => Primitive::Line(LineStyle {
                dotted: group & 0x10 != 0,
                skip_first: group & 0x20 != 0,
                skip_last: group & 0x08 != 0,
            }),
            0x40 => Primitive::Point,
            0x48 => Primitive::LineFill(LineFill::LeftRightToNonBackground),
            0x50 => Primitive::Triangle,
            0x58 => Primitive::LineFill(LineFill::RightToBackground),
            0x60 => Primitive::Rectangle,
            0x68 => Primitive::LineFill(LineFill::LeftRightToForeground),
            0x70 => Primitive::Parallelogram,
            0x78 => Primitive::LineFill(LineFill::RightToNonForeground),
            0x80 => Primitive::FloodFill {
                to_foreground: false,
            },
            0x88 => Primitive::FloodFill {
                to_foreground: true,
            },
            0x90 => Primitive::CircleOutline,
            0x98 => Primitive::CircleFill,
            0xA0 => Primitive::Arc,
            0xA8 => Primitive::Segment,
            0xB0 => Primitive::Sector,
            0xB8 => Primitive::BlockTransfer,
            0xC0 => Primitive::EllipseOutline,
            0xC8 => Primitive::EllipseFill,
            0xD0 => Primitive::FontPrint,
            0xE8 => Primitive::Sprite,
            other => Primitive::Reserved(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Line(_) => "line",
            Primitive::Point => "point",
            Primitive::LineFill(_) => "line fill",
            Primitive::Triangle => "triangle fill",
            Primitive::Rectangle => "rectangle fill",
            Primitive::Parallelogram => "parallelogram fill",
            Primitive::FloodFill { .. } => "flood fill",
            Primitive::CircleOutline => "circle outline",
            Primitive::CircleFill => "circle fill",
            Primitive::Arc => "circular arc",
            Primitive::Segment => "segment",
            Primitive::Sector => "sector",
            Primitive::BlockTransfer => "rectangle move/copy",
            Primitive::EllipseOutline => "ellipse outline",
            Primitive::EllipseFill => "ellipse fill",
            Primitive::FontPrint => "font printing",
            Primitive::Sprite => "sprite plot",
            Primitive::Reserved(_) => "reserved",
        }
    }
}

/// A fully decoded PLOT mode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotCode {
    pub code: u8,
    pub absolute: bool,
    pub effect: PlotEffect,
    pub primitive: Primitive,
}

impl PlotCode {
    pub fn decode(code: u8) -> PlotCode {
        let effect = match code & 3 {
            0 => PlotEffect::Move,
            1 => PlotEffect::Foreground,
            2 => PlotEffect::Inverse,
            _ => PlotEffect::Background,
        };
        PlotCode {
            code,
            absolute: code & 4 != 0,
            effect,
            primitive: Primitive::from_code(code),
        }
    }

    /// The point this PLOT establishes, given the current cursor
    pub fn resolve_point(&self, current: Point, x: i16, y: i16) -> Point {
        if self.absolute {
            Point::new(i32::from(x), i32::from(y))
        } else {
            current.offset(i32::from(x), i32::from(y))
        }
    }
}

/// Geometry handed to the renderer, in absolute graphics units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Line {
        from: Point,
        to: Point,
        style: LineStyle,
    },
    Point(Point),
    Triangle(Point, Point, Point),
    Rectangle(Rect),
    Circle {
        centre: Point,
        radius: i32,
        filled: bool,
    },
    Ellipse {
        centre: Point,
        radius_x: i32,
        radius_y: i32,
        filled: bool,
    },
    BlockTransfer {
        source: Rect,
        dest: Point,
        /// Move clears the source to the background colour; copy leaves it
        clear_source: bool,
    },
}

/// Normalised rectangle from two opposite corners
pub fn rect_from_corners(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

/// Coordinates can sit anywhere in the i32 range after relative moves, so
/// differences are taken in f64 and the result saturates.
fn distance(a: Point, b: Point) -> i32 {
    let dx = f64::from(b.x) - f64::from(a.x);
    let dy = f64::from(b.y) - f64::from(a.y);
    (dx * dx + dy * dy).sqrt().round() as i32
}

fn span(a: i32, b: i32) -> i32 {
    i32::try_from(a.abs_diff(b)).unwrap_or(i32::MAX)
}

/// Shapes for a primitive, given the (oldest, old, current) history.
///
/// `None` means the primitive needs pixel read-back or a resource this layer
/// does not have (fills to a boundary, arcs, fonts, sprites) and is
/// unsupported.
pub fn shapes(plot: &PlotCode, history: (Point, Point, Point)) -> Option<Vec<Shape>> {
    let (oldest, old, current) = history;
    let shapes = match plot.primitive {
        Primitive::Line(style) => vec![Shape::Line {
            from: old,
            to: current,
            style,
        }],
        Primitive::Point => vec![Shape::Point(current)],
        Primitive::Triangle => vec![Shape::Triangle(oldest, old, current)],
        Primitive::Rectangle => vec![Shape::Rectangle(rect_from_corners(old, current))],
        Primitive::Parallelogram => {
            let fourth = oldest.offset(
                current.x.wrapping_sub(old.x),
                current.y.wrapping_sub(old.y),
            );
            vec![
                Shape::Triangle(oldest, old, current),
                Shape::Triangle(oldest, current, fourth),
            ]
        }
        Primitive::CircleOutline | Primitive::CircleFill => vec![Shape::Circle {
            centre: old,
            radius: distance(old, current),
            filled: plot.primitive == Primitive::CircleFill,
        }],
        Primitive::EllipseOutline | Primitive::EllipseFill => vec![Shape::Ellipse {
            centre: oldest,
            radius_x: span(old.x, oldest.x),
            radius_y: span(current.y, oldest.y),
            filled: plot.primitive == Primitive::EllipseFill,
        }],
        Primitive::BlockTransfer => vec![Shape::BlockTransfer {
            source: rect_from_corners(oldest, old),
            dest: current,
            clear_source: plot.effect == PlotEffect::Foreground,
        }],
        Primitive::LineFill(_)
        | Primitive::FloodFill { .. }
        | Primitive::Arc
        | Primitive::Segment
        | Primitive::Sector
        | Primitive::FontPrint
        | Primitive::Sprite
        | Primitive::Reserved(_) => return None,
    };
    Some(shapes)
}
