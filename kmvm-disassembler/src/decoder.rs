//! Instruction decoder

use kmvm_spec::encoding::CodeReader;
use kmvm_spec::{Instruction, Mode, Opcode, Operand, Register, SpecError};
use serde::Serialize;
use crate::error::{DisassemblerError, Result};

/// One decoded instruction and where it sits in the code stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decoded {
    pub offset: usize,
    pub len: usize,
    pub instruction: Instruction,
}

impl Decoded {
    /// Offset of the following instruction
    pub fn next_offset(&self) -> usize {
        self.offset + self.len
    }
}

/// Decode the instruction at `offset`
///
/// Returns the instruction and the offset just past it. Operand shape is
/// not judged here: a `push` with no flags decodes fine and is rejected
/// only when executed.
pub fn decode(code: &[u8], offset: usize) -> Result<(Instruction, usize)> {
    let mut reader = CodeReader::at(code, offset);
    let (opcode, mode) = reader.read_opcode()?;

    let instr = match opcode {
        Opcode::Push => Instruction::Push(decode_operand(&mut reader, mode)?),
        Opcode::Pop => Instruction::Pop(decode_operand(&mut reader, mode)?),
        op if op.is_jump() => {
            let target = reader.read_u32()?;
            Instruction::branch(op, target).ok_or(SpecError::UnknownOpcode {
                offset,
                byte: op.to_u8(),
            })?
        }
        op => Instruction::simple(op).ok_or(SpecError::UnknownOpcode {
            offset,
            byte: op.to_u8(),
        })?,
    };

    Ok((instr, reader.position()))
}

/// Decode a whole code section front to back
pub fn decode_all(code: &[u8]) -> Result<Vec<Decoded>> {
    let mut decoded = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let (instruction, next) = decode(code, offset)?;
        decoded.push(Decoded {
            offset,
            len: next - offset,
            instruction,
        });
        offset = next;
    }
    Ok(decoded)
}

fn decode_operand(reader: &mut CodeReader<'_>, mode: Mode) -> Result<Operand> {
    let imm = if mode.contains(Mode::IMM) {
        Some(reader.read_i32()?)
    } else {
        None
    };
    let reg = if mode.contains(Mode::REG) {
        let offset = reader.position();
        let index = reader.read_u8()?;
        Some(decode_register(offset, index)?)
    } else {
        None
    };
    Ok(Operand {
        imm,
        reg,
        indirect: mode.contains(Mode::MEM),
    })
}

fn decode_register(offset: usize, index: u8) -> Result<Register> {
    Register::from_index(index as usize)
        .ok_or(DisassemblerError::InvalidRegister { offset, index })
}
