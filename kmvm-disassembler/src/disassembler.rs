//! Main disassembler logic

use std::collections::BTreeSet;
use kmvm_spec::Program;
use crate::decoder::{decode_all, Decoded};
use crate::error::Result;
use crate::formatter::format_with_targets;

/// Name given to a synthesized label at `offset`
pub fn label_name(offset: u32) -> String {
    format!("label_{offset:04x}")
}

/// Disassemble a program into assembly text
///
/// The output assembles back to the same bytes. Jump targets that land on
/// an instruction boundary (or on the end of code) get a synthetic label;
/// any other target stays numeric.
pub fn disassemble(program: &Program) -> Result<String> {
    let decoded = decode_all(&program.code)?;
    let labels = jump_labels(&decoded, program.code.len());

    let mut output = String::new();
    output.push_str("; KM Disassembly\n");
    output.push_str(&format!(
        "; Signature: {}{}\n",
        String::from_utf8_lossy(&program.header.magic),
        String::from_utf8_lossy(&program.header.version)
    ));
    output.push_str(&format!(
        "; Code size: {} bytes ({} instructions)\n",
        program.code.len(),
        decoded.len()
    ));
    output.push('\n');

    let name_target = |target: u32| {
        if labels.contains(&target) {
            label_name(target)
        } else {
            target.to_string()
        }
    };

    for entry in &decoded {
        if let Ok(offset) = u32::try_from(entry.offset) {
            if labels.contains(&offset) {
                output.push_str(&format!("{}:\n", label_name(offset)));
            }
        }
        output.push_str(&format!(
            "    {}\n",
            format_with_targets(&entry.instruction, name_target)
        ));
    }

    if let Ok(end) = u32::try_from(program.code.len()) {
        if labels.contains(&end) {
            output.push_str(&format!("{}:\n", label_name(end)));
        }
    }

    Ok(output)
}

/// Jump and call targets that fall on an instruction boundary
fn jump_labels(decoded: &[Decoded], code_len: usize) -> BTreeSet<u32> {
    let boundaries: BTreeSet<usize> = decoded
        .iter()
        .map(|d| d.offset)
        .chain(std::iter::once(code_len))
        .collect();

    decoded
        .iter()
        .filter_map(|d| d.instruction.target())
        .filter(|&target| boundaries.contains(&(target as usize)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassemble_simple() {
        let program = Program::new(vec![0x21, 5, 0, 0, 0, 0x02, 0x00]);
        let asm = disassemble(&program).unwrap();

        assert!(asm.contains("; Signature: KMv4"));
        assert!(asm.contains("(3 instructions)"));
        assert!(asm.contains("    push 5\n    pop\n    hlt\n"));
    }

    #[test]
    fn test_labels_at_targets() {
        // 0: jmp 6 / 5: out / 6: hlt
        let program = Program::new(vec![0x09, 6, 0, 0, 0, 0x08, 0x00]);
        let asm = disassemble(&program).unwrap();
        assert!(asm.contains("    jmp label_0006\n    out\nlabel_0006:\n    hlt\n"));
    }

    #[test]
    fn test_label_at_end_of_code() {
        let program = Program::new(vec![0x09, 5, 0, 0, 0]);
        let asm = disassemble(&program).unwrap();
        assert!(asm.ends_with("    jmp label_0005\nlabel_0005:\n"));
    }

    #[test]
    fn test_mid_instruction_target_stays_numeric() {
        // Target 2 lands inside the jmp itself
        let program = Program::new(vec![0x09, 2, 0, 0, 0]);
        let asm = disassemble(&program).unwrap();
        assert!(asm.contains("    jmp 2\n"));
        assert!(!asm.contains("label_"));
    }

    #[test]
    fn test_disassemble_rejects_bad_code() {
        let program = Program::new(vec![0x00, 0x1F]);
        assert!(disassemble(&program).is_err());
    }
}
