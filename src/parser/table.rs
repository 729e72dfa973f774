//! Control code table
//!
//! One entry per recognised control code (0-31): the number of operand bytes
//! that follow the opcode and the handler that turns them into an action.
//! Codes with no entry are protocol errors.

use super::actions::{
    word, ExtendedCommand, PaletteWrite, VduAction, PALETTE_BORDER, PALETTE_RGB,
};
use crate::core::{Rect, Rgb};
use crate::error::{Result, VduError};

/// Operand handler. Receives every operand byte collected so far for the
/// command (the opcode itself excluded).
pub type Handler = fn(&[u8]) -> Step;

/// What a handler decided
pub enum Step {
    /// The command is complete
    Emit(Result<VduAction>),
    /// The command needs `count` more operand bytes, then `handler` runs
    /// again with the full operand block
    More { count: usize, handler: Handler },
}

impl Step {
    fn emit(action: VduAction) -> Step {
        Step::Emit(Ok(action))
    }
}

/// A control table entry
pub struct ControlEntry {
    pub name: &'static str,
    pub operands: usize,
    pub handler: Handler,
}

impl std::fmt::Debug for ControlEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEntry")
            .field("name", &self.name)
            .field("operands", &self.operands)
            .finish()
    }
}

const fn entry(name: &'static str, operands: usize, handler: Handler) -> Option<ControlEntry> {
    Some(ControlEntry {
        name,
        operands,
        handler,
    })
}

static CONTROL_TABLE: [Option<ControlEntry>; 32] = [
    entry("null", 0, |_| Step::emit(VduAction::Null)),
    entry("printer byte", 1, |ops| Step::emit(VduAction::PrinterByte(ops[0]))),
    None, // printer on
    None, // printer off
    entry("text at text cursor", 0, |_| Step::emit(VduAction::TextAtTextCursor)),
    entry("text at graphics cursor", 0, |_| {
        Step::emit(VduAction::TextAtGraphicsCursor)
    }),
    None, // enable output
    entry("bell", 0, |_| Step::emit(VduAction::Bell)),
    entry("backspace", 0, |_| Step::emit(VduAction::Backspace)),
    entry("forward", 0, |_| Step::emit(VduAction::Forward)),
    entry("line feed", 0, |_| Step::emit(VduAction::LineFeed)),
    entry("line up", 0, |_| Step::emit(VduAction::LineUp)),
    entry("clear text", 0, |_| Step::emit(VduAction::ClearText)),
    entry("carriage return", 0, |_| Step::emit(VduAction::CarriageReturn)),
    None, // paged mode on
    None, // paged mode off
    entry("clear graphics", 0, |_| Step::emit(VduAction::ClearGraphics)),
    entry("text colour", 1, |ops| Step::emit(VduAction::TextColour(ops[0]))),
    entry("graphics colour", 2, |ops| {
        Step::emit(VduAction::GraphicsColour {
            action: ops[0],
            colour: ops[1],
        })
    }),
    entry("palette", 2, palette),
    entry("restore colours", 0, |_| Step::emit(VduAction::RestoreColours)),
    None, // disable output
    entry("mode", 1, |ops| Step::emit(VduAction::SelectMode(ops[0]))),
    entry("extended", 9, extended),
    entry("graphics window", 8, |ops| {
        Step::emit(VduAction::GraphicsWindow(rect(ops)))
    }),
    entry("plot", 5, |ops| {
        Step::emit(VduAction::Plot {
            code: ops[0],
            x: word(ops, 1, 0),
            y: word(ops, 1, 1),
        })
    }),
    entry("restore windows", 0, |_| Step::emit(VduAction::RestoreWindows)),
    entry("escape", 0, |_| Step::emit(VduAction::Escape)),
    entry("text window", 8, |ops| Step::emit(VduAction::TextWindow(rect(ops)))),
    entry("origin", 4, |ops| {
        Step::emit(VduAction::Origin {
            x: word(ops, 0, 0),
            y: word(ops, 0, 1),
        })
    }),
    entry("home", 0, |_| Step::emit(VduAction::Home)),
    entry("tab", 2, |ops| {
        Step::emit(VduAction::TabTo {
            col: ops[0],
            row: ops[1],
        })
    }),
];

/// Look up a control code (0-31)
pub fn lookup(opcode: u8) -> Option<&'static ControlEntry> {
    CONTROL_TABLE.get(usize::from(opcode))?.as_ref()
}

/// left, bottom, right, top as signed words
fn rect(ops: &[u8]) -> Rect {
    Rect::new(
        i32::from(word(ops, 0, 0)),
        i32::from(word(ops, 0, 1)),
        i32::from(word(ops, 0, 2)),
        i32::from(word(ops, 0, 3)),
    )
}

/// VDU 19 first stage: logical colour and physical mode. RGB-carrying modes
/// read three more bytes.
fn palette(ops: &[u8]) -> Step {
    let (logical, physical) = (ops[0], ops[1]);
    if physical == PALETTE_RGB || physical == PALETTE_BORDER {
        return Step::More {
            count: 3,
            handler: palette_rgb,
        };
    }
    Step::emit(VduAction::Palette(PaletteWrite {
        logical,
        physical,
        rgb: None,
    }))
}

fn palette_rgb(ops: &[u8]) -> Step {
    Step::emit(VduAction::Palette(PaletteWrite {
        logical: ops[0],
        physical: ops[1],
        rgb: Some(Rgb::new(ops[2], ops[3], ops[4])),
    }))
}

/// VDU 23 sub-dispatch on the first operand byte
fn extended(ops: &[u8]) -> Step {
    let sub = ops[0];
    let command = match sub {
        0 => ExtendedCommand::Crtc {
            register: ops[1],
            value: ops[2],
        },
        1 => ExtendedCommand::CursorAppearance(ops[1]),
        7 => ExtendedCommand::ScrollBlock {
            extent: ops[1],
            direction: ops[2],
            movement: ops[3],
        },
        16 => ExtendedCommand::PrintDirection {
            value: ops[1],
            mask: ops[2],
        },
        17 if ops[1] <= 3 => ExtendedCommand::Tint {
            which: ops[1],
            tint: ops[2],
        },
        32..=255 => {
            let mut rows = [0u8; 8];
            rows.copy_from_slice(&ops[1..9]);
            ExtendedCommand::DefineGlyph { code: sub, rows }
        }
        _ => return Step::Emit(Err(VduError::UnknownSubCommand { opcode: 23, sub })),
    };
    Step::emit(VduAction::Extended(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(opcode: u8, ops: &[u8]) -> Result<VduAction> {
        let entry = lookup(opcode).unwrap();
        match (entry.handler)(ops) {
            Step::Emit(result) => result,
            Step::More { .. } => panic!("Expected a complete command"),
        }
    }

    #[test]
    fn test_declared_lengths() {
        let expected: &[(u8, usize)] = &[
            (0, 0),
            (7, 0),
            (10, 0),
            (12, 0),
            (13, 0),
            (17, 1),
            (18, 2),
            (19, 2),
            (22, 1),
            (23, 9),
            (24, 8),
            (25, 5),
            (28, 8),
            (29, 4),
            (31, 2),
        ];
        for &(opcode, operands) in expected {
            assert_eq!(lookup(opcode).unwrap().operands, operands, "VDU {}", opcode);
        }
    }

    #[test]
    fn test_unassigned_codes() {
        for opcode in [2, 3, 6, 14, 15, 21] {
            assert!(lookup(opcode).is_none());
        }
        assert!(lookup(32).is_none());
    }

    #[test]
    fn test_origin_reads_both_axes() {
        assert_eq!(
            run(29, &[0x10, 0x00, 0xF6, 0xFF]),
            Ok(VduAction::Origin { x: 16, y: -10 })
        );
    }

    #[test]
    fn test_text_window_bounds() {
        assert_eq!(
            run(28, &[2, 0, 20, 0, 30, 0, 5, 0]),
            Ok(VduAction::TextWindow(Rect::new(2, 20, 30, 5)))
        );
    }

    #[test]
    fn test_palette_stages() {
        let entry = lookup(19).unwrap();
        assert!(matches!((entry.handler)(&[1, 16]), Step::More { count: 3, .. }));
        assert!(matches!(
            (entry.handler)(&[1, 4]),
            Step::Emit(Ok(VduAction::Palette(PaletteWrite { rgb: None, .. })))
        ));
        assert!(matches!(
            palette_rgb(&[1, 16, 1, 2, 3]),
            Step::Emit(Ok(VduAction::Palette(PaletteWrite {
                rgb: Some(Rgb { r: 1, g: 2, b: 3 }),
                ..
            })))
        ));
    }

    #[test]
    fn test_extended_sub_commands() {
        assert_eq!(
            run(23, &[16, 2, 0xF1, 0, 0, 0, 0, 0, 0]),
            Ok(VduAction::Extended(ExtendedCommand::PrintDirection {
                value: 2,
                mask: 0xF1
            }))
        );
        assert_eq!(
            run(23, &[240, 1, 2, 3, 4, 5, 6, 7, 8]),
            Ok(VduAction::Extended(ExtendedCommand::DefineGlyph {
                code: 240,
                rows: [1, 2, 3, 4, 5, 6, 7, 8]
            }))
        );
        assert_eq!(
            run(23, &[5, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(VduError::UnknownSubCommand { opcode: 23, sub: 5 })
        );
        assert_eq!(
            run(23, &[17, 9, 0, 0, 0, 0, 0, 0, 0]),
            Err(VduError::UnknownSubCommand { opcode: 23, sub: 17 })
        );
    }
}
