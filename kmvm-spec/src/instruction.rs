//! KM Instruction Set
//!
//! Stack-machine instructions with an optional immediate, register, and
//! memory-indirect operand on PUSH/POP, and a 4-byte absolute target on the
//! jump class.

use crate::encoding::{operand_len, Mode};
use crate::opcode::Opcode;
use crate::register::Register;
use serde::{Deserialize, Serialize};

/// PUSH/POP operand: `imm`, `reg`, `imm+reg`, optionally wrapped in `[...]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Operand {
    /// Immediate value (IMM flag)
    pub imm: Option<i32>,
    /// Register (REG flag)
    pub reg: Option<Register>,
    /// Dereference the computed address (MEM flag)
    pub indirect: bool,
}

impl Operand {
    /// No operand at all (bare `pop`)
    pub const NONE: Self = Self { imm: None, reg: None, indirect: false };

    pub fn imm(value: i32) -> Self {
        Self { imm: Some(value), ..Self::NONE }
    }

    pub fn reg(reg: Register) -> Self {
        Self { reg: Some(reg), ..Self::NONE }
    }

    pub fn imm_reg(value: i32, reg: Register) -> Self {
        Self { imm: Some(value), reg: Some(reg), indirect: false }
    }

    /// Wrap this operand in `[...]`
    pub fn indirect(self) -> Self {
        Self { indirect: true, ..self }
    }

    pub fn is_none(&self) -> bool {
        self.imm.is_none() && self.reg.is_none() && !self.indirect
    }

    /// Addressing-mode flags implied by this operand
    pub fn mode(&self) -> Mode {
        let mut mode = Mode::empty();
        mode.set(Mode::IMM, self.imm.is_some());
        mode.set(Mode::REG, self.reg.is_some());
        mode.set(Mode::MEM, self.indirect);
        mode
    }

    /// PUSH needs a value source: an immediate or a register
    pub fn is_valid_push(&self) -> bool {
        self.imm.is_some() || self.reg.is_some()
    }

    /// POP writes to output (bare), a register, or memory
    pub fn is_valid_pop(&self) -> bool {
        match (self.imm, self.reg, self.indirect) {
            (None, None, false) => true,
            (None, Some(_), false) => true,
            (_, _, true) => self.imm.is_some() || self.reg.is_some(),
            (Some(_), _, false) => false,
        }
    }
}

/// KM Instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ========== System ==========
    /// HLT: stop execution
    Hlt,

    // ========== Stack ==========
    /// PUSH: push imm / reg / imm+reg, or memory at that address
    Push(Operand),

    /// POP: pop into output (bare), a register, or memory
    Pop(Operand),

    // ========== Arithmetic ==========
    /// ADD: right = pop; left = pop; push(left + right)
    Add,
    /// SUB: push(left - right)
    Sub,
    /// MUL: push(left * right)
    Mul,
    /// DIV: push(left / right), fault on zero divisor
    Div,

    // ========== I/O ==========
    /// IN: push an integer read from input
    In,
    /// OUT: pop and write to output
    Out,

    // ========== Jump ==========
    /// JMP: pc = target
    Jmp { target: u32 },
    /// JA: if left > right then pc = target
    Ja { target: u32 },
    /// JAE: if left >= right then pc = target
    Jae { target: u32 },
    /// JB: if left < right then pc = target
    Jb { target: u32 },
    /// JBE: if left <= right then pc = target
    Jbe { target: u32 },
    /// JE: if left == right then pc = target
    Je { target: u32 },
    /// JNE: if left != right then pc = target
    Jne { target: u32 },

    // ========== Subroutine ==========
    /// CALL: save return address; pc = target
    Call { target: u32 },
    /// RET: pc = saved return address
    Ret,
}

impl Instruction {
    /// Build a jump-class instruction
    ///
    /// Returns `None` if `opcode` is not a jump.
    pub fn branch(opcode: Opcode, target: u32) -> Option<Self> {
        let instr = match opcode {
            Opcode::Jmp => Instruction::Jmp { target },
            Opcode::Ja => Instruction::Ja { target },
            Opcode::Jae => Instruction::Jae { target },
            Opcode::Jb => Instruction::Jb { target },
            Opcode::Jbe => Instruction::Jbe { target },
            Opcode::Je => Instruction::Je { target },
            Opcode::Jne => Instruction::Jne { target },
            Opcode::Call => Instruction::Call { target },
            _ => return None,
        };
        Some(instr)
    }

    /// Build an instruction that takes neither operand nor target
    pub fn simple(opcode: Opcode) -> Option<Self> {
        let instr = match opcode {
            Opcode::Hlt => Instruction::Hlt,
            Opcode::Add => Instruction::Add,
            Opcode::Sub => Instruction::Sub,
            Opcode::Mul => Instruction::Mul,
            Opcode::Div => Instruction::Div,
            Opcode::In => Instruction::In,
            Opcode::Out => Instruction::Out,
            Opcode::Ret => Instruction::Ret,
            _ => return None,
        };
        Some(instr)
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Hlt => Opcode::Hlt,
            Instruction::Push(_) => Opcode::Push,
            Instruction::Pop(_) => Opcode::Pop,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mul => Opcode::Mul,
            Instruction::Div => Opcode::Div,
            Instruction::In => Opcode::In,
            Instruction::Out => Opcode::Out,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Ja { .. } => Opcode::Ja,
            Instruction::Jae { .. } => Opcode::Jae,
            Instruction::Jb { .. } => Opcode::Jb,
            Instruction::Jbe { .. } => Opcode::Jbe,
            Instruction::Je { .. } => Opcode::Je,
            Instruction::Jne { .. } => Opcode::Jne,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Ret => Opcode::Ret,
        }
    }

    /// Operand of PUSH/POP
    pub fn operand(&self) -> Option<&Operand> {
        match self {
            Instruction::Push(op) | Instruction::Pop(op) => Some(op),
            _ => None,
        }
    }

    /// Absolute target of a jump-class instruction
    pub fn target(&self) -> Option<u32> {
        match *self {
            Instruction::Jmp { target }
            | Instruction::Ja { target }
            | Instruction::Jae { target }
            | Instruction::Jb { target }
            | Instruction::Jbe { target }
            | Instruction::Je { target }
            | Instruction::Jne { target }
            | Instruction::Call { target } => Some(target),
            _ => None,
        }
    }

    #[inline]
    pub fn is_jump(&self) -> bool {
        self.opcode().is_jump()
    }

    /// Addressing-mode flags written into the opcode byte
    pub fn mode(&self) -> Mode {
        self.operand().map(Operand::mode).unwrap_or_else(Mode::empty)
    }

    /// Total encoded size in bytes, opcode byte included
    pub fn encoded_len(&self) -> usize {
        1 + operand_len(self.opcode(), self.mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_len() {
        assert_eq!(Instruction::Hlt.encoded_len(), 1);
        assert_eq!(Instruction::Push(Operand::imm(5)).encoded_len(), 5);
        assert_eq!(Instruction::Push(Operand::reg(Register::Bx)).encoded_len(), 2);
        assert_eq!(
            Instruction::Pop(Operand::imm_reg(3, Register::Cx).indirect()).encoded_len(),
            6
        );
        assert_eq!(Instruction::Pop(Operand::NONE).encoded_len(), 1);
        assert_eq!(Instruction::Call { target: 0 }.encoded_len(), 5);
    }

    #[test]
    fn test_operand_mode() {
        assert_eq!(Operand::imm(1).mode(), Mode::IMM);
        assert_eq!(Operand::reg(Register::Ax).indirect().mode(), Mode::REG | Mode::MEM);
        assert!(Operand::NONE.mode().is_empty());
        assert!(Instruction::Jmp { target: 4 }.mode().is_empty());
    }

    #[test]
    fn test_push_validity() {
        assert!(Operand::imm(1).is_valid_push());
        assert!(Operand::reg(Register::Dx).indirect().is_valid_push());
        assert!(!Operand::NONE.is_valid_push());
        assert!(!Operand::NONE.indirect().is_valid_push());
    }

    #[test]
    fn test_pop_validity() {
        assert!(Operand::NONE.is_valid_pop());
        assert!(Operand::reg(Register::Ax).is_valid_pop());
        assert!(Operand::imm(10).indirect().is_valid_pop());
        assert!(Operand::imm_reg(10, Register::Bx).indirect().is_valid_pop());
        assert!(!Operand::imm(10).is_valid_pop());
        assert!(!Operand::imm_reg(10, Register::Bx).is_valid_pop());
        assert!(!Operand::NONE.indirect().is_valid_pop());
    }

    #[test]
    fn test_branch_constructor() {
        for op in Opcode::ALL {
            let instr = Instruction::branch(op, 42);
            assert_eq!(instr.is_some(), op.is_jump());
            if let Some(instr) = instr {
                assert_eq!(instr.opcode(), op);
                assert_eq!(instr.target(), Some(42));
            }
        }
    }

    #[test]
    fn test_simple_constructor() {
        for op in Opcode::ALL {
            let instr = Instruction::simple(op);
            assert_eq!(instr.is_some(), !op.is_jump() && !op.takes_operand());
            if let Some(instr) = instr {
                assert_eq!(instr.opcode(), op);
                assert_eq!(instr.encoded_len(), 1);
            }
        }
    }
}
