//! VDU Core Module
//!
//! Display-independent VDU state. This module contains:
//! - Screen mode registry
//! - Palette model (default tables and tint resolution)
//! - Text direction decoding and cursor state
//! - The VDU variable table
//! - Deterministic snapshot generation
//!
//! Everything here is pure data: given the same sequence of VDU actions, the
//! state is always the same.

mod cursor;
pub mod mode;
pub mod palette;
mod snapshot;
mod variables;

pub use cursor::{
    decode_flags, direction, GraphicsCursor, MovementVectors, Point, TextCursor, Vector,
};
pub use mode::{ModeFamily, ScreenMode, ScreenModeKind, SHADOW_BANK};
pub use palette::{Palette, Rgb, RAINBOW};
pub use snapshot::{ColourSnapshot, Snapshot};
pub use variables::{
    default_graphics_window, default_text_window, read_slot, ColourTarget, RasterOp, Rect,
    VduVariables,
};
