//! # KM Stack Machine Specification
//!
//! Byte-oriented stack-machine instruction set with a signed, versioned
//! binary file format.
//!
//! ## Key Features
//! - 18 instructions, 5-bit opcode field
//! - Addressing-mode flags (immediate / register / memory-indirect) in the
//!   upper 3 bits of the opcode byte
//! - 4 general-purpose registers (ax, bx, cx, dx)
//! - Little-endian 32-bit immediates and absolute jump targets
//! - `"KMv4"` file signature

pub mod opcode;
pub mod register;
pub mod encoding;
pub mod instruction;
pub mod error;
pub mod program;

pub use opcode::Opcode;
pub use register::{Register, NUM_REGISTERS};
pub use encoding::{CodeReader, CodeWriter, Mode};
pub use instruction::{Instruction, Operand};
pub use error::{FormatError, SpecError};
pub use program::{Program, ProgramHeader, MAGIC, VERSION};

/// Signed machine word
pub type Word = i32;
