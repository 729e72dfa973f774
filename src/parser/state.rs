//! Decoder State Machine
//!
//! Accumulates VDU bytes and emits one action per complete command. The
//! decoder handles arbitrary chunk boundaries: a command split across any
//! number of `feed` calls decodes identically to one delivered whole.
//!
//! # State
//!
//! The state is a pair `{required, pending}`:
//! - `required`: how many buffered bytes the pending handler needs
//! - `pending`: either opcode dispatch, or an operand handler for a control
//!   code together with the operand bytes collected by earlier stages
//!
//! The initial state is `{1, Opcode}`. Whenever the buffer holds `required`
//! bytes the pending handler consumes exactly that many from the front and
//! the state returns to `{1, Opcode}`, unless the handler asked for more
//! bytes (multi-stage commands such as VDU 19).

use super::actions::VduAction;
use super::table::{self, Handler, Step};
use crate::error::{Result, VduError};

/// What runs when enough bytes have arrived
#[derive(Clone)]
enum Pending {
    Opcode,
    Operands {
        opcode: u8,
        collected: Vec<u8>,
        handler: Handler,
    },
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pending::Opcode => write!(f, "Opcode"),
            Pending::Operands {
                opcode, collected, ..
            } => f
                .debug_struct("Operands")
                .field("opcode", opcode)
                .field("collected", collected)
                .finish(),
        }
    }
}

/// The VDU command stream decoder
#[derive(Debug)]
pub struct Decoder {
    buffer: Vec<u8>,
    required: usize,
    pending: Pending,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a new decoder in the initial state
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(16),
            required: 1,
            pending: Pending::Opcode,
        }
    }

    /// Discard buffered bytes and return to the initial state.
    ///
    /// Aborts any partially received command without side effects.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.required = 1;
        self.pending = Pending::Opcode;
    }

    /// Bytes the pending handler needs before it runs
    pub fn required(&self) -> usize {
        self.required
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True when no command is partially received
    pub fn is_idle(&self) -> bool {
        matches!(self.pending, Pending::Opcode) && self.buffer.is_empty()
    }

    /// Opcode of the partially received command, if any
    pub fn pending_opcode(&self) -> Option<u8> {
        match &self.pending {
            Pending::Opcode => None,
            Pending::Operands { opcode, .. } => Some(*opcode),
        }
    }

    /// Process a single byte. Returns an action (or protocol error) when the
    /// byte completes a command.
    pub fn push(&mut self, byte: u8) -> Option<Result<VduAction>> {
        self.buffer.push(byte);
        if self.buffer.len() < self.required {
            return None;
        }

        let taken: Vec<u8> = self.buffer.drain(..self.required).collect();
        let pending = std::mem::replace(&mut self.pending, Pending::Opcode);
        self.required = 1;

        match pending {
            Pending::Opcode => self.dispatch_opcode(taken[0]),
            Pending::Operands {
                opcode,
                mut collected,
                handler,
            } => {
                collected.extend_from_slice(&taken);
                self.run(opcode, collected, handler)
            }
        }
    }

    /// Process a chunk of bytes, yielding completed commands lazily.
    ///
    /// Bytes after the last completed command are consumed when the iterator
    /// is exhausted; dropping it early leaves them unprocessed.
    pub fn feed<'d, 'b>(&'d mut self, bytes: &'b [u8]) -> Feed<'d, 'b> {
        Feed {
            decoder: self,
            bytes: bytes.iter(),
        }
    }

    /// Process a chunk of bytes, collecting every completed command
    pub fn parse(&mut self, bytes: &[u8]) -> Vec<Result<VduAction>> {
        self.feed(bytes).collect()
    }

    /// Classify an opcode byte
    fn dispatch_opcode(&mut self, opcode: u8) -> Option<Result<VduAction>> {
        match opcode {
            0..=31 => {
                let Some(entry) = table::lookup(opcode) else {
                    tracing::trace!(opcode, "no control table entry");
                    return Some(Err(VduError::Protocol { opcode }));
                };
                if entry.operands == 0 {
                    return self.run(opcode, Vec::new(), entry.handler);
                }
                tracing::trace!(opcode, name = entry.name, operands = entry.operands, "awaiting operands");
                self.required = entry.operands;
                self.pending = Pending::Operands {
                    opcode,
                    collected: Vec::with_capacity(entry.operands),
                    handler: entry.handler,
                };
                None
            }
            127 => Some(Ok(VduAction::Delete)),
            128..=159 => Some(Ok(VduAction::UserGlyph(opcode))),
            _ => Some(Ok(VduAction::Print(opcode))),
        }
    }

    /// Run an operand handler, installing a continuation if it asks for one
    fn run(
        &mut self,
        opcode: u8,
        collected: Vec<u8>,
        handler: Handler,
    ) -> Option<Result<VduAction>> {
        match handler(&collected) {
            Step::Emit(result) => Some(result),
            Step::More { count, handler } => {
                tracing::trace!(opcode, count, "command needs more operands");
                self.required = count;
                self.pending = Pending::Operands {
                    opcode,
                    collected,
                    handler,
                };
                None
            }
        }
    }
}

/// Iterator over the commands completed by a chunk of bytes
#[derive(Debug)]
pub struct Feed<'d, 'b> {
    decoder: &'d mut Decoder,
    bytes: std::slice::Iter<'b, u8>,
}

impl Iterator for Feed<'_, '_> {
    type Item = Result<VduAction>;

    fn next(&mut self) -> Option<Self::Item> {
        for &byte in self.bytes.by_ref() {
            if let Some(result) = self.decoder.push(byte) {
                return Some(result);
            }
        }
        None
    }
}
