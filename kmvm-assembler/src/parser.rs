//! Assembly parser
//!
//! Turns one source line into a [`Statement`]. Label references stay
//! symbolic here; the assembler resolves them against its label table.

use kmvm_spec::{Instruction, Opcode, Operand, Register};
use logos::Logos;
use crate::error::{AssemblerError, Result};
use crate::labels::MAX_LABEL_LEN;
use crate::lexer::Token;

const COMMENT_CHAR: char = ';';
const LABEL_SUFFIX: char = ':';

/// Target operand of a jump or call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchTarget {
    /// Symbolic label, resolved by the assembler
    Label(String),
    /// Absolute offset into the code stream
    Offset(u32),
}

/// One parsed source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `name:`
    Label(String),
    /// Instruction whose encoding is fully known
    Instruction(Instruction),
    /// Jump or call whose target may still be a label
    Branch { opcode: Opcode, target: BranchTarget },
}

/// Parse one source line
///
/// Returns `Ok(None)` for blank and comment-only lines.
pub fn parse_line(text: &str) -> Result<Option<Statement>> {
    let code = strip_comment(text).trim();
    if code.is_empty() {
        return Ok(None);
    }

    if let Some(name) = code.strip_suffix(LABEL_SUFFIX) {
        let name = name.trim();
        validate_label_name(name).map_err(|msg| AssemblerError::parse(text, msg))?;
        return Ok(Some(Statement::Label(name.to_string())));
    }

    // An unknown leading word is reported as such, whatever follows it
    if let Some(Ok(Token::Identifier(word))) = Token::lexer(code).next() {
        return Err(AssemblerError::UnknownInstruction {
            line: 0,
            mnemonic: word,
        });
    }

    let tokens = tokenize(code)?;
    let (opcode, operands) = match tokens.split_first() {
        Some((Token::Mnemonic(opcode), rest)) => (*opcode, rest),
        _ => return Err(AssemblerError::parse(text, "expected an instruction mnemonic")),
    };

    parse_statement(opcode, operands, text).map(Some)
}

/// Parse a single instruction from assembly text
///
/// Jump targets must be numeric here since there is no label table.
pub fn parse_instruction(text: &str) -> Result<Instruction> {
    match parse_line(text)? {
        Some(Statement::Instruction(instr)) => Ok(instr),
        Some(Statement::Branch {
            opcode,
            target: BranchTarget::Offset(target),
        }) => branch(opcode, target, text),
        Some(Statement::Branch {
            target: BranchTarget::Label(name),
            ..
        }) => Err(AssemblerError::parse(
            text,
            format!("label `{name}` cannot be resolved outside a program"),
        )),
        Some(Statement::Label(_)) | None => {
            Err(AssemblerError::parse(text, "expected an instruction"))
        }
    }
}

/// Parse register name
pub fn parse_register(name: &str) -> Result<Register> {
    let name = name.trim();
    Register::from_name(name)
        .ok_or_else(|| AssemblerError::parse(name, format!("invalid register `{name}`")))
}

/// Build a jump-class instruction from a resolved target
pub(crate) fn branch(opcode: Opcode, target: u32, text: &str) -> Result<Instruction> {
    Instruction::branch(opcode, target)
        .ok_or_else(|| AssemblerError::parse(text, format!("`{opcode}` is not a jump")))
}

fn strip_comment(text: &str) -> &str {
    match text.find(COMMENT_CHAR) {
        Some(pos) => &text[..pos],
        None => text,
    }
}

fn tokenize(code: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(code).spanned() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(AssemblerError::parse(
                    code,
                    format!("unexpected `{}` at column {}", &code[span.clone()], span.start + 1),
                ))
            }
        }
    }
    Ok(tokens)
}

fn validate_label_name(name: &str) -> std::result::Result<(), String> {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid label name `{name}`"));
    }
    if name.len() > MAX_LABEL_LEN {
        return Err(format!(
            "label `{name}` is longer than {MAX_LABEL_LEN} characters"
        ));
    }
    if Opcode::from_mnemonic(name).is_some() || Register::from_name(name).is_some() {
        return Err(format!("`{name}` is reserved and cannot name a label"));
    }
    Ok(())
}

fn parse_statement(opcode: Opcode, operands: &[Token], text: &str) -> Result<Statement> {
    if opcode.is_jump() {
        let target = parse_branch_target(operands, text)?;
        return Ok(Statement::Branch { opcode, target });
    }

    match opcode {
        Opcode::Push => {
            let operand = parse_operand(operands, text)?;
            if !operand.is_valid_push() {
                return Err(AssemblerError::parse(
                    text,
                    "push requires an immediate or register operand",
                ));
            }
            Ok(Statement::Instruction(Instruction::Push(operand)))
        }
        Opcode::Pop => {
            let operand = parse_operand(operands, text)?;
            if !operand.is_valid_pop() {
                return Err(AssemblerError::parse(
                    text,
                    "pop destination must be a register or a `[...]` address",
                ));
            }
            Ok(Statement::Instruction(Instruction::Pop(operand)))
        }
        _ => {
            if !operands.is_empty() {
                return Err(AssemblerError::parse(
                    text,
                    format!("`{opcode}` takes no operands"),
                ));
            }
            Instruction::simple(opcode)
                .map(Statement::Instruction)
                .ok_or_else(|| AssemblerError::parse(text, format!("`{opcode}` needs an operand")))
        }
    }
}

fn parse_branch_target(operands: &[Token], text: &str) -> Result<BranchTarget> {
    match operands {
        [Token::Identifier(name)] => Ok(BranchTarget::Label(name.clone())),
        [Token::Number(n)] => u32::try_from(*n)
            .map(BranchTarget::Offset)
            .map_err(|_| AssemblerError::parse(text, format!("invalid jump target {n}"))),
        [Token::Hex(h)] => u32::try_from(*h)
            .map(BranchTarget::Offset)
            .map_err(|_| AssemblerError::parse(text, format!("invalid jump target {h:#x}"))),
        [] => Err(AssemblerError::parse(text, "expected a label or offset")),
        _ => Err(AssemblerError::parse(
            text,
            "jump target must be a single label or offset",
        )),
    }
}

/// Parse `imm`, `reg`, `imm+reg`, `reg+imm`, optionally wrapped in `[...]`
fn parse_operand(tokens: &[Token], text: &str) -> Result<Operand> {
    match tokens {
        [] => Ok(Operand::NONE),
        [Token::LBracket, inner @ .., Token::RBracket] => {
            if inner.is_empty() {
                return Err(AssemblerError::parse(text, "empty `[]` operand"));
            }
            Ok(parse_address(inner, text)?.indirect())
        }
        [Token::LBracket, ..] => Err(AssemblerError::parse(text, "unclosed `[`")),
        _ => parse_address(tokens, text),
    }
}

fn parse_address(tokens: &[Token], text: &str) -> Result<Operand> {
    match tokens {
        [Token::Register(reg)] => Ok(Operand::reg(*reg)),
        [single] => Ok(Operand::imm(parse_immediate(single, text)?)),
        [Token::Register(reg), Token::Plus, imm] | [imm, Token::Plus, Token::Register(reg)] => {
            Ok(Operand::imm_reg(parse_immediate(imm, text)?, *reg))
        }
        _ => Err(AssemblerError::parse(
            text,
            "expected `imm`, `reg`, or `imm+reg`",
        )),
    }
}

fn parse_immediate(token: &Token, text: &str) -> Result<i32> {
    match token {
        Token::Number(n) => i32::try_from(*n).map_err(|_| {
            AssemblerError::parse(text, format!("immediate {n} does not fit in 32 bits"))
        }),
        // Hex literals are bit patterns: 0xFFFFFFFF is -1
        Token::Hex(h) => u32::try_from(*h).map(|v| v as i32).map_err(|_| {
            AssemblerError::parse(text, format!("immediate {h:#x} does not fit in 32 bits"))
        }),
        other => Err(AssemblerError::parse(
            text,
            format!("expected an immediate, found {other:?}"),
        )),
    }
}
