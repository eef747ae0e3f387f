//! # Error Types for the KM specification crate

use crate::Opcode;
use thiserror::Error;

/// Why a binary file was rejected before any instruction was trusted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("file too short for header: expected {expected} bytes, found {found} bytes")]
    TruncatedHeader { expected: usize, found: usize },

    #[error("bad signature: expected \"KM\", found {found:02x?}")]
    BadMagic { found: [u8; 2] },

    #[error("bad version: expected \"v4\", found {found:02x?}")]
    BadVersion { found: [u8; 2] },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    // Program format errors
    #[error("Invalid format: {0}")]
    InvalidFormat(#[from] FormatError),

    // Instruction errors
    #[error("Unknown opcode {byte:#04x} at offset {offset:#06x}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("Illegal mode flags {flags:#04x} on `{opcode}` at offset {offset:#06x}")]
    UnexpectedFlags { offset: usize, opcode: Opcode, flags: u8 },

    #[error("Invalid register index {index} at offset {offset:#06x} (valid range: 0-3)")]
    InvalidRegister { offset: usize, index: u8 },

    #[error("Unexpected end of code at offset {offset:#06x}: needed {needed} more bytes")]
    UnexpectedEnd { offset: usize, needed: usize },
}

impl SpecError {
    /// Signature or version mismatch, as opposed to a bad instruction
    pub fn is_format_error(&self) -> bool {
        matches!(self, SpecError::InvalidFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, SpecError>;
