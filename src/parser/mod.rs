//! VDU command stream decoder
//!
//! A stateful decoder that converts bytes into VDU actions. Control codes
//! 0-31 carry a fixed (or staged) number of operand bytes; every other byte is
//! a character.

mod actions;
mod state;
mod table;

pub use actions::{
    read_i16, ExtendedCommand, PaletteWrite, VduAction, PALETTE_BORDER, PALETTE_RGB,
};
pub use state::{Decoder, Feed};
pub use table::{lookup, ControlEntry, Handler, Step};
