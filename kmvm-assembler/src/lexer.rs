//! # Lexer for KM Assembly Language

use kmvm_spec::{Opcode, Register};
use logos::Logos;

/// Tokens for KM assembly
///
/// Mnemonics and register names are matched as exact keywords, so a longer
/// word such as `pushx` or `axe` still lexes as an [`Token::Identifier`].
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Skip whitespace
#[logos(skip r";[^\n]*")] // Skip comments
pub enum Token {
    /// Instruction mnemonic
    #[token("hlt", |_| Opcode::Hlt)]
    #[token("push", |_| Opcode::Push)]
    #[token("pop", |_| Opcode::Pop)]
    #[token("add", |_| Opcode::Add)]
    #[token("sub", |_| Opcode::Sub)]
    #[token("mul", |_| Opcode::Mul)]
    #[token("div", |_| Opcode::Div)]
    #[token("in", |_| Opcode::In)]
    #[token("out", |_| Opcode::Out)]
    #[token("jmp", |_| Opcode::Jmp)]
    #[token("ja", |_| Opcode::Ja)]
    #[token("jae", |_| Opcode::Jae)]
    #[token("jb", |_| Opcode::Jb)]
    #[token("jbe", |_| Opcode::Jbe)]
    #[token("je", |_| Opcode::Je)]
    #[token("jne", |_| Opcode::Jne)]
    #[token("call", |_| Opcode::Call)]
    #[token("ret", |_| Opcode::Ret)]
    Mnemonic(Opcode),

    /// Register (ax, bx, cx, dx)
    #[token("ax", |_| Register::Ax)]
    #[token("bx", |_| Register::Bx)]
    #[token("cx", |_| Register::Cx)]
    #[token("dx", |_| Register::Dx)]
    Register(Register),

    /// Identifier (labels, unknown mnemonics)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    /// Decimal number
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse().ok())]
    Number(i64),

    /// Hexadecimal number
    #[regex(r"0x[0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok())]
    Hex(u64),

    /// Left bracket (memory-indirect)
    #[token("[")]
    LBracket,

    /// Right bracket
    #[token("]")]
    RBracket,

    /// Plus (imm+reg)
    #[token("+")]
    Plus,

    /// Colon (label definition)
    #[token(":")]
    Colon,
}
