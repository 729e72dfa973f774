//! Deterministic snapshot generation
//!
//! Snapshots capture the VDU state in a serializable form for testing and
//! debugging. Given the same byte stream, a session must produce identical
//! snapshots.

use serde::{Deserialize, Serialize};

use super::cursor::{Point, TextCursor};
use super::mode::ScreenMode;
use super::palette::Rgb;
use super::variables::{RasterOp, Rect};

/// A complete snapshot of the VDU state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: ScreenMode,
    pub text_window: Rect,
    pub graphics_window: Rect,
    pub origin: Point,
    /// (oldest, old, current)
    pub graphics_cursor: [Point; 3],
    pub text_cursor: TextCursor,
    pub text_at_graphics: bool,
    pub text_direction: u8,
    pub colours: ColourSnapshot,
    /// Active palette; absent for modes without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<Rgb>>,
    pub border: Rgb,
}

/// Logical colours, tints and GCOL actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourSnapshot {
    pub text_fg: u8,
    pub text_bg: u8,
    pub gfx_fg: u8,
    pub gfx_bg: u8,
    pub text_fg_tint: u8,
    pub text_bg_tint: u8,
    pub gfx_fg_tint: u8,
    pub gfx_bg_tint: u8,
    pub gfx_fg_action: RasterOp,
    pub gfx_bg_action: RasterOp,
}

impl Snapshot {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary
    pub fn to_text(&self) -> String {
        let m = &self.mode;
        let [oldest, old, current] = self.graphics_cursor;
        let mut out = String::new();
        out.push_str(&format!(
            "mode {}: {}x{} text, {}x{} pixels, {} bpp ({:?})\n",
            m.id, m.text_width, m.text_height, m.pixel_width, m.pixel_height, m.bits_per_pixel, m.family
        ));
        out.push_str(&format!(
            "text cursor: ({}, {}){}\n",
            self.text_cursor.col,
            self.text_cursor.row,
            if self.text_cursor.visible { "" } else { " hidden" }
        ));
        out.push_str(&format!(
            "graphics cursor: ({}, {}) <- ({}, {}) <- ({}, {})\n",
            current.x, current.y, old.x, old.y, oldest.x, oldest.y
        ));
        out.push_str(&format!("origin: ({}, {})\n", self.origin.x, self.origin.y));
        let t = self.text_window;
        out.push_str(&format!(
            "text window: {},{} - {},{}\n",
            t.left, t.top, t.right, t.bottom
        ));
        let g = self.graphics_window;
        out.push_str(&format!(
            "graphics window: {},{} - {},{}\n",
            g.left, g.bottom, g.right, g.top
        ));
        let c = &self.colours;
        out.push_str(&format!(
            "colours: text {}/{} graphics {}/{}\n",
            c.text_fg, c.text_bg, c.gfx_fg, c.gfx_bg
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode;

    fn sample() -> Snapshot {
        Snapshot {
            mode: mode::resolve(1).unwrap(),
            text_window: Rect::new(0, 31, 39, 0),
            graphics_window: Rect::new(0, 0, 1279, 1023),
            origin: Point::default(),
            graphics_cursor: [Point::default(), Point::new(1, 2), Point::new(3, 4)],
            text_cursor: TextCursor::new(),
            text_at_graphics: false,
            text_direction: 0,
            colours: ColourSnapshot {
                text_fg: 3,
                text_bg: 0,
                gfx_fg: 3,
                gfx_bg: 0,
                text_fg_tint: 0,
                text_bg_tint: 0,
                gfx_fg_tint: 0,
                gfx_bg_tint: 0,
                gfx_fg_action: RasterOp::Set,
                gfx_bg_action: RasterOp::Set,
            },
            palette: None,
            border: Rgb::BLACK,
        }
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = sample();
        let json = snapshot.to_json().unwrap();
        assert!(!json.contains("palette"));
        let restored: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, restored);
    }

    #[test]
    fn test_snapshot_text() {
        let text = sample().to_text();
        assert!(text.starts_with("mode 1: 40x32 text"));
        assert!(text.contains("graphics cursor: (3, 4) <- (1, 2) <- (0, 0)"));
    }
}
