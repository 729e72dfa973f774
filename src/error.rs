//! Error types for VDU stream processing

use thiserror::Error;

/// VDU error type
///
/// None of these are fatal to a session: the decoder has already resynchronised
/// by the time one is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VduError {
    /// Opcode with no entry in the control table. The byte was discarded.
    #[error("Unrecognised VDU opcode {opcode}")]
    Protocol { opcode: u8 },

    /// Recognised opcode carrying a sub-command that has no handler.
    /// All of the command's operand bytes were consumed.
    #[error("Unrecognised sub-command {sub} for VDU {opcode}")]
    UnknownSubCommand { opcode: u8, sub: u8 },

    /// Mode number with no registry entry; the previous mode stays active
    #[error("No such screen mode: {0}")]
    NoSuchScreenMode(u8),
}

impl VduError {
    /// Whether this error belongs to the protocol class (bad opcode or sub-command)
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            VduError::Protocol { .. } | VduError::UnknownSubCommand { .. }
        )
    }
}

/// Result type for VDU operations
pub type Result<T> = std::result::Result<T, VduError>;
