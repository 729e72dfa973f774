//! VDU actions produced by the decoder
//!
//! Each action is one fully-decoded command with its operands already
//! converted from the wire encoding.

use serde::{Deserialize, Serialize};

use crate::core::{Rect, Rgb};

/// A decoded VDU command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VduAction {
    /// VDU 0
    Null,
    /// VDU 1 - next byte to the printer only
    PrinterByte(u8),
    /// VDU 4 - write text at the text cursor
    TextAtTextCursor,
    /// VDU 5 - write text at the graphics cursor
    TextAtGraphicsCursor,
    /// VDU 7
    Bell,
    /// VDU 8 - back one character position
    Backspace,
    /// VDU 9 - forward one character position
    Forward,
    /// VDU 10
    LineFeed,
    /// VDU 11 - up one line
    LineUp,
    /// VDU 12 - clear the text window
    ClearText,
    /// VDU 13
    CarriageReturn,
    /// VDU 16 - clear the graphics window
    ClearGraphics,
    /// VDU 17 - bit 7 selects the background colour
    TextColour(u8),
    /// VDU 18 - GCOL action and colour (bit 7 selects background)
    GraphicsColour { action: u8, colour: u8 },
    /// VDU 19
    Palette(PaletteWrite),
    /// VDU 20 - default colours and palette
    RestoreColours,
    /// VDU 22
    SelectMode(u8),
    /// VDU 23
    Extended(ExtendedCommand),
    /// VDU 24 - graphics window in graphics units (relative to the origin)
    GraphicsWindow(Rect),
    /// VDU 25
    Plot { code: u8, x: i16, y: i16 },
    /// VDU 26 - default windows
    RestoreWindows,
    /// VDU 27
    Escape,
    /// VDU 28 - text window in character cells
    TextWindow(Rect),
    /// VDU 29
    Origin { x: i16, y: i16 },
    /// VDU 30
    Home,
    /// VDU 31 - move the text cursor within the text window
    TabTo { col: u8, row: u8 },
    /// Printable character (32-126, 160-255)
    Print(u8),
    /// 127 - delete the previous character
    Delete,
    /// 128-159 - user-defined glyph
    UserGlyph(u8),
}

/// VDU 19 operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteWrite {
    pub logical: u8,
    /// 0-15 selects a default physical colour; 16 sets RGB; 24 sets the border
    pub physical: u8,
    /// Present only for the RGB-carrying physical modes
    pub rgb: Option<Rgb>,
}

/// Physical mode that sets a logical colour to an explicit RGB value
pub const PALETTE_RGB: u8 = 16;
/// Physical mode that sets the border colour
pub const PALETTE_BORDER: u8 = 24;

/// VDU 23 sub-commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendedCommand {
    /// 23,0 - video controller register write
    Crtc { register: u8, value: u8 },
    /// 23,1 - 0 hides the text cursor, anything else shows it
    CursorAppearance(u8),
    /// 23,7 - scroll the window or screen without moving the cursor
    ScrollBlock {
        /// 0 = text window, 1 = whole screen
        extent: u8,
        /// 0 right, 1 left, 2 down, 3 up, 4-7 along the text direction axes
        direction: u8,
        /// 0 = by character, 1 = by pixel
        movement: u8,
    },
    /// 23,16 - new direction = (old & mask) ^ value
    PrintDirection { value: u8, mask: u8 },
    /// 23,17 - tint for one of the four colours (0-3)
    Tint { which: u8, tint: u8 },
    /// 23,32-255 - redefine a character's 8x8 bitmap
    DefineGlyph { code: u8, rows: [u8; 8] },
}

/// Reconstruct a signed 16-bit value from its little-endian bytes
pub fn read_i16(lo: u8, hi: u8) -> i16 {
    i16::from_le_bytes([lo, hi])
}

/// The `index`th little-endian word of an operand block, starting at `offset`
pub(crate) fn word(operands: &[u8], offset: usize, index: usize) -> i16 {
    let at = offset + index * 2;
    read_i16(operands[at], operands[at + 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_read_i16() {
        assert_eq!(read_i16(0x34, 0x12), 0x1234);
        assert_eq!(read_i16(0xFF, 0xFF), -1);
        assert_eq!(read_i16(0x00, 0x80), i16::MIN);
    }

    #[test]
    fn test_word_offsets() {
        let ops = [4, 0x40, 0x01, 0xF0, 0x00];
        assert_eq!(word(&ops, 1, 0), 320);
        assert_eq!(word(&ops, 1, 1), 240);
    }

    #[test]
    fn test_action_serialization() {
        let action = VduAction::Palette(PaletteWrite {
            logical: 1,
            physical: PALETTE_RGB,
            rgb: Some(Rgb::new(10, 20, 30)),
        });

        let json = serde_json::to_string(&action).unwrap();
        let restored: VduAction = serde_json::from_str(&json).unwrap();

        assert_eq!(action, restored);
    }

    proptest! {
        #[test]
        fn prop_word_matches_le(v in any::<i16>()) {
            let [lo, hi] = v.to_le_bytes();
            prop_assert_eq!(read_i16(lo, hi), v);
        }
    }
}
