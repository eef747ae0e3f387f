//! Main assembler logic
//!
//! Two passes over the source text. The first pass lays out code with
//! placeholder jump targets and fills the label table; the second re-reads
//! the source and emits the final bytes with every label resolved.

use std::fs;
use std::path::Path;
use kmvm_spec::encoding::CodeWriter;
use kmvm_spec::Program;
use tracing::debug;
use crate::encoder::encode_into;
use crate::error::{AssemblerError, Result};
use crate::labels::LabelTable;
use crate::parser::{branch, parse_line, BranchTarget, Statement};

/// Target written in pass 1 before labels are known
const PLACEHOLDER_TARGET: u32 = 0;

/// Two-pass assembler
#[derive(Debug, Default)]
pub struct Assembler {
    labels: LabelTable,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label table left by the last [`Assembler::assemble`] call
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Assemble source code into a program
    pub fn assemble(&mut self, source: &str) -> Result<Program> {
        self.labels.clear();

        let layout_len = self.first_pass(source)?;
        self.labels.verify()?;
        debug!(
            labels = self.labels.len(),
            code_size = layout_len,
            "pass 1 complete"
        );

        let code = self.second_pass(source)?;
        if code.len() != layout_len {
            return Err(AssemblerError::CorruptedLabelTable(format!(
                "pass 2 emitted {} bytes, pass 1 laid out {}",
                code.len(),
                layout_len
            )));
        }
        debug!(code_size = code.len(), "pass 2 complete");

        Ok(Program::new(code))
    }

    /// Lay out code and record label definitions and references
    fn first_pass(&mut self, source: &str) -> Result<usize> {
        let mut writer = CodeWriter::new();

        for (idx, text) in source.lines().enumerate() {
            let line = idx + 1;
            let Some(statement) = parse_line(text).map_err(|e| e.at_line(line))? else {
                continue;
            };
            let offset = current_offset(&writer, text).map_err(|e| e.at_line(line))?;

            match statement {
                Statement::Label(name) => {
                    self.labels
                        .define(&name, offset, line)
                        .map_err(|e| e.at_line(line))?;
                }
                Statement::Instruction(instr) => encode_into(&instr, &mut writer),
                Statement::Branch { opcode, target } => {
                    let target = match target {
                        BranchTarget::Label(name) => {
                            self.labels.reference(&name, line)?;
                            PLACEHOLDER_TARGET
                        }
                        BranchTarget::Offset(target) => target,
                    };
                    let instr = branch(opcode, target, text).map_err(|e| e.at_line(line))?;
                    encode_into(&instr, &mut writer);
                }
            }
        }

        Ok(writer.position())
    }

    /// Emit final code with resolved targets
    fn second_pass(&self, source: &str) -> Result<Vec<u8>> {
        let mut writer = CodeWriter::new();

        for (idx, text) in source.lines().enumerate() {
            let line = idx + 1;
            let Some(statement) = parse_line(text).map_err(|e| e.at_line(line))? else {
                continue;
            };
            let offset = current_offset(&writer, text).map_err(|e| e.at_line(line))?;

            match statement {
                Statement::Label(name) => {
                    let recorded = self.resolve_label(&name)?;
                    if recorded != offset {
                        return Err(AssemblerError::CorruptedLabelTable(format!(
                            "label `{name}` recorded at {recorded:#06x} but found at {offset:#06x} (line {line})"
                        )));
                    }
                }
                Statement::Instruction(instr) => encode_into(&instr, &mut writer),
                Statement::Branch { opcode, target } => {
                    let target = match target {
                        BranchTarget::Label(name) => {
                            let resolved = self.resolve_label(&name)?;
                            debug!(label = %name, target = resolved, line, "resolved reference");
                            resolved
                        }
                        BranchTarget::Offset(target) => target,
                    };
                    let instr = branch(opcode, target, text).map_err(|e| e.at_line(line))?;
                    encode_into(&instr, &mut writer);
                }
            }
        }

        Ok(writer.into_bytes())
    }

    fn resolve_label(&self, name: &str) -> Result<u32> {
        let id = self.labels.lookup(name).ok_or_else(|| {
            AssemblerError::CorruptedLabelTable(format!("label `{name}` missing after pass 1"))
        })?;
        self.labels.resolve(id)
    }
}

fn current_offset(writer: &CodeWriter, text: &str) -> Result<u32> {
    u32::try_from(writer.position())
        .map_err(|_| AssemblerError::parse(text, "code exceeds the 32-bit address space"))
}

/// Assemble source code into a program
pub fn assemble(source: &str) -> Result<Program> {
    Assembler::new().assemble(source)
}

/// Assemble `input` and write the binary to `output`
///
/// Nothing is written unless assembly succeeds.
pub fn assemble_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Program> {
    let source = fs::read_to_string(input)?;
    let program = assemble(&source)?;
    fs::write(output, program.to_bytes())?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelStatus;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test
            push 5
            pop
            hlt
        "#;

        let program = assemble(source).unwrap();
        assert_eq!(program.code, vec![0x21, 5, 0, 0, 0, 0x02, 0x00]);
    }

    #[test]
    fn test_forward_reference() {
        let source = "jmp end\npush 1\nout\nend:\nhlt\n";
        let program = assemble(source).unwrap();
        // jmp(5) + push(5) + out(1) = 11
        assert_eq!(&program.code[..5], &[0x09, 11, 0, 0, 0]);
        assert_eq!(program.code[11], 0x00);
    }

    #[test]
    fn test_backward_reference() {
        let source = "top:\npush 1\nout\njmp top\n";
        let program = assemble(source).unwrap();
        assert_eq!(&program.code[6..], &[0x09, 0, 0, 0, 0]);
    }

    #[test]
    fn test_label_table_after_assembly() {
        let mut asm = Assembler::new();
        asm.assemble("call f\nhlt\nf:\nret\n").unwrap();
        let id = asm.labels().lookup("f").unwrap();
        assert_eq!(asm.labels().status(id), Some(LabelStatus::Valid));
        assert_eq!(asm.labels().resolve(id).unwrap(), 6);
    }

    #[test]
    fn test_assembler_is_reusable() {
        let mut asm = Assembler::new();
        asm.assemble("a:\nhlt\n").unwrap();
        // A fresh run must not see `a` from the previous source
        asm.assemble("a:\nhlt\n").unwrap();
        assert_eq!(asm.labels().len(), 1);
    }

    #[test]
    fn test_undefined_label() {
        let err = assemble("push 1\njmp missing\n").unwrap_err();
        assert!(matches!(
            err,
            AssemblerError::UndefinedLabel { ref name, line: 2 } if name == "missing"
        ));
    }

    #[test]
    fn test_duplicate_label() {
        let err = assemble("a:\nhlt\na:\nhlt\n").unwrap_err();
        assert!(matches!(err, AssemblerError::DuplicateLabel { line: 3, offset: 0, .. }));
    }

    #[test]
    fn test_error_line_numbers() {
        let err = assemble("hlt\n\npush\n").unwrap_err();
        assert!(matches!(err, AssemblerError::Parse { line: 3, .. }));

        let err = assemble("hlt\nfoo 1\n").unwrap_err();
        assert!(matches!(err, AssemblerError::UnknownInstruction { line: 2, .. }));
    }

    #[test]
    fn test_empty_source() {
        let program = assemble("; nothing here\n\n").unwrap();
        assert!(program.code.is_empty());
    }

    #[test]
    fn test_label_at_end_of_code() {
        let program = assemble("jmp done\ndone:\n").unwrap();
        assert_eq!(program.code, vec![0x09, 5, 0, 0, 0]);
    }
}
