//! # KM Opcode Definitions
//!
//! This module defines the opcode values for all KM instructions.
//! Opcodes occupy the low 5 bits of the opcode byte (0x00-0x1F); the
//! upper 3 bits carry addressing-mode flags (see [`crate::encoding::Mode`]).
//!
//! ## Opcode Encoding
//!
//! - 0x00:      System (HLT)
//! - 0x01-0x02: Stack (PUSH, POP)
//! - 0x03-0x06: Arithmetic (ADD, SUB, MUL, DIV)
//! - 0x07-0x08: I/O (IN, OUT)
//! - 0x09-0x0F: Jump (JMP, JA, JAE, JB, JBE, JE, JNE)
//! - 0x10-0x11: Subroutine (CALL, RET)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction opcode (5 bits, values 0x00-0x11)
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // ========== System ==========
    /// HLT: stop execution
    Hlt = 0x00,

    // ========== Stack ==========
    /// PUSH: push immediate, register, or memory operand
    Push = 0x01,
    /// POP: pop into register, memory, or output
    Pop = 0x02,

    // ========== Arithmetic ==========
    /// ADD: push(left + right)
    Add = 0x03,
    /// SUB: push(left - right)
    Sub = 0x04,
    /// MUL: push(left * right)
    Mul = 0x05,
    /// DIV: push(left / right)
    Div = 0x06,

    // ========== I/O ==========
    /// IN: read an integer from input and push it
    In = 0x07,
    /// OUT: pop a value and write it to output
    Out = 0x08,

    // ========== Jump ==========
    /// JMP: pc = target
    Jmp = 0x09,
    /// JA: if left > right then pc = target
    Ja = 0x0A,
    /// JAE: if left >= right then pc = target
    Jae = 0x0B,
    /// JB: if left < right then pc = target
    Jb = 0x0C,
    /// JBE: if left <= right then pc = target
    Jbe = 0x0D,
    /// JE: if left == right then pc = target
    Je = 0x0E,
    /// JNE: if left != right then pc = target
    Jne = 0x0F,

    // ========== Subroutine ==========
    /// CALL: push return address; pc = target
    Call = 0x10,
    /// RET: pc = popped return address
    Ret = 0x11,
}

impl Opcode {
    /// Opcode width in bits
    pub const BITS: usize = 5;

    /// Opcode mask (0x1F for 5 bits)
    pub const MASK: u8 = 0x1F;

    /// Every opcode, in numeric order
    pub const ALL: [Opcode; 18] = [
        Opcode::Hlt,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::In,
        Opcode::Out,
        Opcode::Jmp,
        Opcode::Ja,
        Opcode::Jae,
        Opcode::Jb,
        Opcode::Jbe,
        Opcode::Je,
        Opcode::Jne,
        Opcode::Call,
        Opcode::Ret,
    ];

    /// Try to convert from the 5-bit opcode field
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Convert to u8
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Look up an opcode by its lower-case mnemonic
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }

    /// Get the mnemonic for this opcode
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "hlt",
            Opcode::Push => "push",
            Opcode::Pop => "pop",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::In => "in",
            Opcode::Out => "out",
            Opcode::Jmp => "jmp",
            Opcode::Ja => "ja",
            Opcode::Jae => "jae",
            Opcode::Jb => "jb",
            Opcode::Jbe => "jbe",
            Opcode::Je => "je",
            Opcode::Jne => "jne",
            Opcode::Call => "call",
            Opcode::Ret => "ret",
        }
    }

    /// Jump-class opcodes carry a 4-byte absolute target and never any flags
    #[inline]
    pub const fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jmp
                | Opcode::Ja
                | Opcode::Jae
                | Opcode::Jb
                | Opcode::Jbe
                | Opcode::Je
                | Opcode::Jne
                | Opcode::Call
        )
    }

    /// Conditional jumps pop two operands before deciding
    #[inline]
    pub const fn is_conditional_jump(self) -> bool {
        self.is_jump() && !matches!(self, Opcode::Jmp | Opcode::Call)
    }

    /// Only PUSH and POP take addressing-mode flags
    #[inline]
    pub const fn takes_operand(self) -> bool {
        matches!(self, Opcode::Push | Opcode::Pop)
    }

    /// Binary arithmetic opcodes
    #[inline]
    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
