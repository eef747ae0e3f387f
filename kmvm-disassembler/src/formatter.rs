//! Instruction formatting to KM assembly text
//!
//! Output is accepted back by the assembler: registers lower case, the
//! register before the immediate, and jump targets as decimal offsets.

use kmvm_spec::{Instruction, Operand};

/// Format instruction as assembly text
pub fn format(instr: &Instruction) -> String {
    format_with_targets(instr, |target| target.to_string())
}

/// Format instruction, rendering jump targets with `target_name`
pub fn format_with_targets<F>(instr: &Instruction, target_name: F) -> String
where
    F: Fn(u32) -> String,
{
    let mnemonic = instr.opcode().mnemonic();
    match instr {
        Instruction::Push(operand) | Instruction::Pop(operand) => {
            let operand = format_operand(operand);
            if operand.is_empty() {
                mnemonic.to_string()
            } else {
                format!("{mnemonic} {operand}")
            }
        }
        _ => match instr.target() {
            Some(target) => format!("{mnemonic} {}", target_name(target)),
            None => mnemonic.to_string(),
        },
    }
}

/// Format a PUSH/POP operand: `ax`, `5`, `ax+5`, `[ax+5]`
pub fn format_operand(operand: &Operand) -> String {
    let inner = match (operand.reg, operand.imm) {
        (Some(reg), Some(imm)) => format!("{reg}+{imm}"),
        (Some(reg), None) => reg.to_string(),
        (None, Some(imm)) => imm.to_string(),
        (None, None) => String::new(),
    };
    if operand.indirect {
        format!("[{inner}]")
    } else {
        inner
    }
}
