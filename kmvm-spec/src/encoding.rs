//! # Instruction Encoding Constants and Helpers
//!
//! This module provides the addressing-mode flags and the bounds-checked
//! byte cursors used to encode and decode KM bytecode.
//!
//! ## Instruction Format (variable length, little-endian)
//!
//! ```text
//! PUSH/POP: [flags:3|opcode:5] [imm:i32, if IMM] [reg:u8, if REG]
//! Jump:     [opcode:8]         [target:u32]
//! Other:    [opcode:8]
//! ```
//!
//! The immediate always precedes the register byte when both are present.

use crate::error::{Result, SpecError};
use crate::Opcode;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ============================================================================
// Field Masks
// ============================================================================

/// Opcode field mask (5 bits)
pub const OPCODE_MASK: u8 = Opcode::MASK;

/// Addressing-mode field mask (upper 3 bits)
pub const MODE_MASK: u8 = !OPCODE_MASK;

/// Size of an encoded immediate
pub const IMM_SIZE: usize = 4;

/// Size of an encoded register index
pub const REG_SIZE: usize = 1;

/// Size of an encoded jump target
pub const TARGET_SIZE: usize = 4;

bitflags! {
    /// Addressing-mode flags overlaid on the opcode byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Mode: u8 {
        /// A 4-byte immediate follows the opcode byte
        const IMM = 0x20;
        /// A 1-byte register index follows
        const REG = 0x40;
        /// The operand is a memory address to dereference
        const MEM = 0x80;
    }
}

impl Mode {
    /// Whether this flag combination is structurally allowed on `opcode`
    #[inline]
    pub fn is_legal_for(self, opcode: Opcode) -> bool {
        self.is_empty() || opcode.takes_operand()
    }
}

// ============================================================================
// Opcode Byte Helpers
// ============================================================================

/// Combine an opcode and its mode flags into one byte
#[inline]
pub const fn join_opcode_byte(opcode: Opcode, mode: Mode) -> u8 {
    opcode.to_u8() | mode.bits()
}

/// Split an opcode byte into its opcode and mode flags
///
/// Returns `None` when the masked opcode field is not a known mnemonic.
#[inline]
pub fn split_opcode_byte(byte: u8) -> Option<(Opcode, Mode)> {
    let opcode = Opcode::from_u8(byte & OPCODE_MASK)?;
    Some((opcode, Mode::from_bits_truncate(byte & MODE_MASK)))
}

/// Number of operand bytes that follow an opcode byte
pub fn operand_len(opcode: Opcode, mode: Mode) -> usize {
    if opcode.is_jump() {
        return TARGET_SIZE;
    }
    let mut len = 0;
    if mode.contains(Mode::IMM) {
        len += IMM_SIZE;
    }
    if mode.contains(Mode::REG) {
        len += REG_SIZE;
    }
    len
}

// ============================================================================
// Byte Cursors
// ============================================================================

/// Bounds-checked little-endian reader over a code stream
#[derive(Debug, Clone)]
pub struct CodeReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> CodeReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Start reading at `offset`
    pub fn at(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, pos: offset }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos.checked_add(N).filter(|&end| end <= self.bytes.len());
        let end = end.ok_or(SpecError::UnexpectedEnd {
            offset: self.pos,
            needed: N,
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..end]);
        self.pos = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take::<4>()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    /// Read an opcode byte, rejecting unknown opcodes and illegal flags
    pub fn read_opcode(&mut self) -> Result<(Opcode, Mode)> {
        let offset = self.pos;
        let byte = self.read_u8()?;
        let (opcode, mode) =
            split_opcode_byte(byte).ok_or(SpecError::UnknownOpcode { offset, byte })?;
        if !mode.is_legal_for(opcode) {
            return Err(SpecError::UnexpectedFlags {
                offset,
                opcode,
                flags: mode.bits(),
            });
        }
        Ok((opcode, mode))
    }
}

/// Growable little-endian writer for a code stream
#[derive(Debug, Clone, Default)]
pub struct CodeWriter {
    bytes: Vec<u8>,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write offset
    #[inline]
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Overwrite a previously written u32
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let end = offset
            .checked_add(4)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(SpecError::UnexpectedEnd { offset, needed: 4 })?;
        self.bytes[offset..end].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
