//! Runtime error types for the KM interpreter

use kmvm_disassembler::DisassemblerError;
use kmvm_spec::{Opcode, SpecError, Word};
use thiserror::Error;
use crate::stack::StackKind;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Unknown command 0x{byte:02X} at pc {pc:#06x}")]
    UnknownCommand { pc: usize, byte: u8 },

    #[error("Bad operand format on `{opcode}` (flags 0x{flags:02X}) at pc {pc:#06x}")]
    BadOperandFormat { pc: usize, opcode: Opcode, flags: u8 },

    #[error("Segmentation fault: address {address} outside memory of {size} cells at pc {pc:#06x}")]
    SegmentationFault { pc: usize, address: Word, size: usize },

    #[error("Division by zero at pc {pc:#06x}")]
    DivisionByZero { pc: usize },

    #[error("{stack} stack underflow at pc {pc:#06x}")]
    StackUnderflow { pc: usize, stack: StackKind },

    #[error("{stack} stack overflow at pc {pc:#06x} (limit {limit})")]
    StackOverflow { pc: usize, stack: StackKind, limit: usize },

    #[error("Program counter {pc:#06x} outside code of {code_size} bytes")]
    PcOutOfBounds { pc: usize, code_size: usize },

    #[error("Decode error at pc {pc:#06x}: {source}")]
    Decode {
        pc: usize,
        #[source]
        source: DisassemblerError,
    },

    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RuntimeError {
    /// Wrap a decode failure at `pc`
    ///
    /// Unknown opcodes and illegal flags become [`RuntimeError::UnknownCommand`].
    pub(crate) fn decode(pc: usize, err: DisassemblerError) -> Self {
        match err {
            DisassemblerError::UnknownOpcode { byte, .. } => RuntimeError::UnknownCommand { pc, byte },
            DisassemblerError::UnexpectedFlags { opcode, flags, .. } => {
                RuntimeError::UnknownCommand {
                    pc,
                    byte: opcode.to_u8() | flags,
                }
            }
            source => RuntimeError::Decode { pc, source },
        }
    }

    /// Program counter of the faulting instruction, if any
    pub fn pc(&self) -> Option<usize> {
        match self {
            RuntimeError::UnknownCommand { pc, .. }
            | RuntimeError::BadOperandFormat { pc, .. }
            | RuntimeError::SegmentationFault { pc, .. }
            | RuntimeError::DivisionByZero { pc }
            | RuntimeError::StackUnderflow { pc, .. }
            | RuntimeError::StackOverflow { pc, .. }
            | RuntimeError::PcOutOfBounds { pc, .. }
            | RuntimeError::Decode { pc, .. } => Some(*pc),
            RuntimeError::Spec(_) | RuntimeError::InvalidConfig(_) | RuntimeError::IoError(_) => {
                None
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
