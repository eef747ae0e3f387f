//! Disassembler errors

use kmvm_spec::{FormatError, Opcode, SpecError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisassemblerError {
    #[error("Invalid format: {0}")]
    InvalidFormat(FormatError),

    #[error("Unknown opcode 0x{byte:02X} at offset {offset:#06x}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("Illegal flags 0x{flags:02X} on `{opcode}` at offset {offset:#06x}")]
    UnexpectedFlags { offset: usize, opcode: Opcode, flags: u8 },

    #[error("Wrong register #{index} at offset {offset:#06x}")]
    InvalidRegister { offset: usize, index: u8 },

    #[error("Truncated instruction at offset {offset:#06x}: {needed} more bytes needed")]
    Truncated { offset: usize, needed: usize },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DisassemblerError {
    /// Bad signature or version, as opposed to a bad instruction
    pub fn is_format_error(&self) -> bool {
        matches!(self, DisassemblerError::InvalidFormat(_))
    }

    /// Code offset the error points at, if any
    pub fn offset(&self) -> Option<usize> {
        match self {
            DisassemblerError::UnknownOpcode { offset, .. }
            | DisassemblerError::UnexpectedFlags { offset, .. }
            | DisassemblerError::InvalidRegister { offset, .. }
            | DisassemblerError::Truncated { offset, .. } => Some(*offset),
            DisassemblerError::InvalidFormat(_) | DisassemblerError::IoError(_) => None,
        }
    }
}

impl From<SpecError> for DisassemblerError {
    fn from(err: SpecError) -> Self {
        match err {
            SpecError::InvalidFormat(e) => DisassemblerError::InvalidFormat(e),
            SpecError::UnknownOpcode { offset, byte } => {
                DisassemblerError::UnknownOpcode { offset, byte }
            }
            SpecError::UnexpectedFlags { offset, opcode, flags } => {
                DisassemblerError::UnexpectedFlags { offset, opcode, flags }
            }
            SpecError::InvalidRegister { offset, index } => {
                DisassemblerError::InvalidRegister { offset, index }
            }
            SpecError::UnexpectedEnd { offset, needed } => {
                DisassemblerError::Truncated { offset, needed }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;
