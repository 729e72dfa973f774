//! VDU Terminal Library
//!
//! An emulator for the VDU byte-stream display protocol: a stream of control
//! codes, operands and characters that selects screen modes, moves cursors,
//! sets colours and plots graphics. This crate provides:
//!
//! - `parser`: the command stream decoder
//! - `core`: screen modes, palettes, cursors and VDU variables
//! - `plot`: PLOT code decoding
//! - `backend`: the renderer, text output and font traits a display implements
//! - `session`: the driver that applies decoded commands to a backend
//! - `app`: configuration for the headless runner

pub mod app;
pub mod backend;
pub mod core;
pub mod error;
pub mod parser;
pub mod plot;
pub mod session;

pub use backend::{Backend, NullBackend, Outcome, Recorder, Unsupported};
pub use error::{Result, VduError};
pub use session::{Session, SharedSession};
