//! Annotated hex listing
//!
//! One line per instruction:
//!
//! ```text
//! 0000  e1  [ 05 00 00 00   00 ]   PUSH [ax+5]
//! 0006  09    0c 00 00 00          JMP 12
//! ```
//!
//! Columns: code offset, opcode byte, the immediate or target bytes, the
//! register byte, then the instruction text. Brackets mark memory operands.

use kmvm_spec::{Instruction, Program};
use crate::decoder::{decode_all, Decoded};
use crate::error::Result;
use crate::formatter::format_operand;

const NO_WORD: &str = "           ";
const NO_REG: &str = "  ";

/// Render the whole program as a listing
pub fn listing(program: &Program) -> Result<String> {
    let mut output = String::new();
    for entry in decode_all(&program.code)? {
        output.push_str(&listing_line(&program.code, &entry));
        output.push('\n');
    }
    Ok(output)
}

/// Render a single decoded instruction
pub fn listing_line(code: &[u8], entry: &Decoded) -> String {
    let instr = &entry.instruction;
    let opcode_byte = code.get(entry.offset).copied().unwrap_or_default();

    let (word, reg, indirect) = match instr {
        Instruction::Push(operand) | Instruction::Pop(operand) => (
            operand.imm.map(|imm| hex_word(imm as u32)),
            operand.reg.map(|reg| format!("{:02x}", reg.index())),
            operand.indirect,
        ),
        _ => (instr.target().map(hex_word), None, false),
    };
    let (open, close) = if indirect { ('[', ']') } else { (' ', ' ') };

    format!(
        "{:04x}  {:02x}  {} {}   {} {}   {}",
        entry.offset,
        opcode_byte,
        open,
        word.as_deref().unwrap_or(NO_WORD),
        reg.as_deref().unwrap_or(NO_REG),
        close,
        listing_text(instr),
    )
    .trim_end()
    .to_string()
}

/// Upper-case mnemonic with its operand
fn listing_text(instr: &Instruction) -> String {
    let mnemonic = instr.opcode().mnemonic().to_uppercase();
    let operand = match instr {
        Instruction::Push(operand) | Instruction::Pop(operand) => format_operand(operand),
        _ => instr.target().map(|t| t.to_string()).unwrap_or_default(),
    };
    if operand.is_empty() {
        mnemonic
    } else {
        format!("{mnemonic} {operand}")
    }
}

/// Little-endian bytes of a 32-bit field
fn hex_word(value: u32) -> String {
    value
        .to_le_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
