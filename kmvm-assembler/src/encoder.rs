//! Instruction encoding to KM bytecode
//!
//! Variable-length: one opcode byte (flags in bits 7:5), then the operand
//! fields selected by the flags, or a 4-byte target for the jump class.

use kmvm_spec::encoding::{join_opcode_byte, CodeWriter};
use kmvm_spec::{Instruction, Operand};

/// Encode an instruction into a fresh byte vector
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let mut writer = CodeWriter::new();
    encode_into(instr, &mut writer);
    writer.into_bytes()
}

/// Append the encoding of `instr` to `writer`
pub fn encode_into(instr: &Instruction, writer: &mut CodeWriter) {
    writer.write_u8(join_opcode_byte(instr.opcode(), instr.mode()));

    match instr {
        // ========== Stack ==========
        Instruction::Push(operand) | Instruction::Pop(operand) => {
            encode_operand(operand, writer)
        }

        // ========== Jump / Call ==========
        Instruction::Jmp { target }
        | Instruction::Ja { target }
        | Instruction::Jae { target }
        | Instruction::Jb { target }
        | Instruction::Jbe { target }
        | Instruction::Je { target }
        | Instruction::Jne { target }
        | Instruction::Call { target } => writer.write_u32(*target),

        // ========== Opcode byte only ==========
        Instruction::Hlt
        | Instruction::Add
        | Instruction::Sub
        | Instruction::Mul
        | Instruction::Div
        | Instruction::In
        | Instruction::Out
        | Instruction::Ret => {}
    }
}

/// Immediate first, then register index
fn encode_operand(operand: &Operand, writer: &mut CodeWriter) {
    if let Some(imm) = operand.imm {
        writer.write_i32(imm);
    }
    if let Some(reg) = operand.reg {
        writer.write_u8(reg.index() as u8);
    }
}
