//! Assembler errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("Syntax error at line {line}: {message} in `{text}`")]
    Parse {
        line: usize,
        text: String,
        message: String,
    },

    #[error("Unknown instruction at line {line}: `{mnemonic}`")]
    UnknownInstruction { line: usize, mnemonic: String },

    #[error("Undefined label: `{name}` (first used at line {line})")]
    UndefinedLabel { name: String, line: usize },

    #[error("Duplicate label at line {line}: `{name}` already defined at offset {offset:#06x}")]
    DuplicateLabel {
        name: String,
        line: usize,
        offset: u32,
    },

    #[error("Corrupted label table: {0}")]
    CorruptedLabelTable(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AssemblerError {
    /// Build a parse error for `text`; the line number is filled in by the caller
    pub(crate) fn parse(text: &str, message: impl Into<String>) -> Self {
        AssemblerError::Parse {
            line: 0,
            text: text.trim().to_string(),
            message: message.into(),
        }
    }

    /// Attach a source line number to line-level errors
    pub(crate) fn at_line(self, n: usize) -> Self {
        match self {
            AssemblerError::Parse { text, message, .. } => AssemblerError::Parse {
                line: n,
                text,
                message,
            },
            AssemblerError::UnknownInstruction { mnemonic, .. } => {
                AssemblerError::UnknownInstruction { line: n, mnemonic }
            }
            AssemblerError::DuplicateLabel { name, offset, .. } => AssemblerError::DuplicateLabel {
                name,
                line: n,
                offset,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line_fills_parse_errors() {
        let err = AssemblerError::parse("  push [ax  ", "unclosed `[`").at_line(7);
        assert_eq!(
            err.to_string(),
            "Syntax error at line 7: unclosed `[` in `push [ax`"
        );
    }

    #[test]
    fn test_at_line_keeps_label_errors() {
        let err = AssemblerError::UndefinedLabel {
            name: "end".to_string(),
            line: 2,
        }
        .at_line(9);
        assert_eq!(err.to_string(), "Undefined label: `end` (first used at line 2)");
    }
}
