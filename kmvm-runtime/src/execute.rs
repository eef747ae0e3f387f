//! Instruction execution for the KM interpreter

use std::io::{BufRead, Write};
use kmvm_spec::{Instruction, Opcode, Operand, Word};
use crate::error::{Result, RuntimeError};
use crate::io::IOHandler;
use crate::memory::Memory;
use crate::stack::Stacks;
use crate::state::{HaltReason, VMState};

/// Execute single instruction
///
/// `state.pc` must point at `instr`; `next_pc` is the offset right after
/// its encoding. On return `state.pc` holds the next instruction to run.
pub fn execute<R: BufRead, W: Write>(
    instr: &Instruction,
    next_pc: usize,
    state: &mut VMState,
    memory: &mut Memory,
    stacks: &mut Stacks,
    io: &mut IOHandler<R, W>,
) -> Result<()> {
    let pc = state.pc;
    let mut new_pc = next_pc;

    match instr {
        // ========== System ==========
        Instruction::Hlt => state.halt(HaltReason::Halt),

        // ========== Stack ==========
        Instruction::Push(operand) => {
            if !operand.is_valid_push() {
                return Err(bad_operand(pc, Opcode::Push, operand));
            }
            let value = effective_value(operand, state);
            let value = if operand.indirect {
                memory.load_word(value, pc)?
            } else {
                value
            };
            stacks.operands.push(value, pc)?;
        }

        Instruction::Pop(operand) => {
            if !operand.is_valid_pop() {
                return Err(bad_operand(pc, Opcode::Pop, operand));
            }
            let value = stacks.operands.pop(pc)?;
            match (operand.indirect, operand.reg) {
                (true, _) => memory.store_word(effective_value(operand, state), value, pc)?,
                (false, Some(reg)) => state.write_reg(reg, value),
                (false, None) => io.write_value(value)?,
            }
        }

        // ========== Arithmetic ==========
        Instruction::Add => binary_op(stacks, pc, Word::wrapping_add)?,
        Instruction::Sub => binary_op(stacks, pc, Word::wrapping_sub)?,
        Instruction::Mul => binary_op(stacks, pc, Word::wrapping_mul)?,

        Instruction::Div => {
            let (left, right) = stacks.operands.pop_pair(pc)?;
            if right == 0 {
                return Err(RuntimeError::DivisionByZero { pc });
            }
            stacks.operands.push(left.wrapping_div(right), pc)?;
        }

        // ========== I/O ==========
        Instruction::In => {
            if let Some(value) = io.read_value()? {
                stacks.operands.push(value, pc)?;
            }
        }

        Instruction::Out => {
            let value = stacks.operands.pop(pc)?;
            io.write_value(value)?;
        }

        // ========== Jump ==========
        Instruction::Jmp { target } => new_pc = *target as usize,

        Instruction::Ja { target } => jump_if(stacks, pc, *target, &mut new_pc, |l, r| l > r)?,
        Instruction::Jae { target } => jump_if(stacks, pc, *target, &mut new_pc, |l, r| l >= r)?,
        Instruction::Jb { target } => jump_if(stacks, pc, *target, &mut new_pc, |l, r| l < r)?,
        Instruction::Jbe { target } => jump_if(stacks, pc, *target, &mut new_pc, |l, r| l <= r)?,
        Instruction::Je { target } => jump_if(stacks, pc, *target, &mut new_pc, |l, r| l == r)?,
        Instruction::Jne { target } => jump_if(stacks, pc, *target, &mut new_pc, |l, r| l != r)?,

        // ========== Subroutine ==========
        Instruction::Call { target } => {
            stacks.returns.push(next_pc, pc)?;
            new_pc = *target as usize;
        }

        Instruction::Ret => new_pc = stacks.returns.pop(pc)?,
    }

    state.pc = new_pc;
    Ok(())
}

/// `imm + reg`, with a missing part counting as zero
fn effective_value(operand: &Operand, state: &VMState) -> Word {
    let imm = operand.imm.unwrap_or(0);
    let reg = operand.reg.map_or(0, |reg| state.read_reg(reg));
    imm.wrapping_add(reg)
}

fn binary_op(stacks: &mut Stacks, pc: usize, op: fn(Word, Word) -> Word) -> Result<()> {
    let (left, right) = stacks.operands.pop_pair(pc)?;
    stacks.operands.push(op(left, right), pc)
}

/// Pop `right` then `left` and jump to `target` when `taken(left, right)`
fn jump_if(
    stacks: &mut Stacks,
    pc: usize,
    target: u32,
    new_pc: &mut usize,
    taken: fn(Word, Word) -> bool,
) -> Result<()> {
    let (left, right) = stacks.operands.pop_pair(pc)?;
    if taken(left, right) {
        *new_pc = target as usize;
    }
    Ok(())
}

fn bad_operand(pc: usize, opcode: Opcode, operand: &Operand) -> RuntimeError {
    RuntimeError::BadOperandFormat {
        pc,
        opcode,
        flags: operand.mode().bits(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmvm_spec::Register;
    use std::io::Cursor;

    struct Harness {
        state: VMState,
        memory: Memory,
        stacks: Stacks,
        io: IOHandler<Cursor<Vec<u8>>, Vec<u8>>,
    }

    impl Harness {
        fn new(input: &str) -> Self {
            Self {
                state: VMState::new(),
                memory: Memory::new(64),
                stacks: Stacks::new(16, 4),
                io: IOHandler::new(Cursor::new(input.as_bytes().to_vec()), Vec::new()),
            }
        }

        fn exec(&mut self, instr: Instruction) -> Result<()> {
            let next = self.state.pc + instr.encoded_len();
            execute(
                &instr,
                next,
                &mut self.state,
                &mut self.memory,
                &mut self.stacks,
                &mut self.io,
            )
        }

        fn push(&mut self, value: Word) {
            self.exec(Instruction::Push(Operand::imm(value))).unwrap();
        }

        fn top(&self) -> Option<Word> {
            self.stacks.operands.peek()
        }
    }

    #[test]
    fn test_push_immediate_and_register() {
        let mut h = Harness::new("");
        h.state.write_reg(Register::Bx, 10);
        h.exec(Instruction::Push(Operand::reg(Register::Bx))).unwrap();
        assert_eq!(h.top(), Some(10));
        h.exec(Instruction::Push(Operand::imm_reg(-3, Register::Bx))).unwrap();
        assert_eq!(h.top(), Some(7));
        assert_eq!(h.state.pc, 2 + 6);
    }

    #[test]
    fn test_push_memory() {
        let mut h = Harness::new("");
        h.memory.store_word(8, 99, 0).unwrap();
        h.state.write_reg(Register::Ax, 4);
        h.exec(Instruction::Push(Operand::imm_reg(4, Register::Ax).indirect()))
            .unwrap();
        assert_eq!(h.top(), Some(99));
    }

    #[test]
    fn test_push_without_operand() {
        let mut h = Harness::new("");
        let err = h.exec(Instruction::Push(Operand::NONE)).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::BadOperandFormat { opcode: Opcode::Push, flags: 0, .. }
        ));
        let err = h.exec(Instruction::Push(Operand::NONE.indirect())).unwrap_err();
        assert!(matches!(err, RuntimeError::BadOperandFormat { flags: 0x80, .. }));
    }

    #[test]
    fn test_pop_forms() {
        let mut h = Harness::new("");
        h.push(1);
        h.push(2);
        h.push(3);
        h.exec(Instruction::Pop(Operand::reg(Register::Dx))).unwrap();
        assert_eq!(h.state.read_reg(Register::Dx), 3);
        h.exec(Instruction::Pop(Operand::imm(12).indirect())).unwrap();
        assert_eq!(h.memory.load_word(12, 0).unwrap(), 2);
        h.exec(Instruction::Pop(Operand::NONE)).unwrap();
        assert_eq!(h.io.outputs(), &[1]);
        assert_eq!(h.io.writer().as_slice(), b"1\n");
    }

    #[test]
    fn test_pop_bad_formats() {
        let mut h = Harness::new("");
        h.push(1);
        let err = h.exec(Instruction::Pop(Operand::imm(4))).unwrap_err();
        assert!(matches!(err, RuntimeError::BadOperandFormat { opcode: Opcode::Pop, .. }));
        let err = h.exec(Instruction::Pop(Operand::NONE.indirect())).unwrap_err();
        assert!(matches!(err, RuntimeError::BadOperandFormat { .. }));
        // Nothing was popped
        assert_eq!(h.stacks.operands.len(), 1);
    }

    #[test]
    fn test_pop_segfault() {
        let mut h = Harness::new("");
        h.push(1);
        let err = h.exec(Instruction::Pop(Operand::imm(-4).indirect())).unwrap_err();
        assert!(matches!(err, RuntimeError::SegmentationFault { address: -4, .. }));
    }

    #[test]
    fn test_arithmetic_operand_order() {
        let mut h = Harness::new("");
        h.push(10);
        h.push(3);
        h.exec(Instruction::Sub).unwrap();
        assert_eq!(h.top(), Some(7));
        h.push(2);
        h.exec(Instruction::Div).unwrap();
        assert_eq!(h.top(), Some(3));
        h.push(-4);
        h.exec(Instruction::Mul).unwrap();
        assert_eq!(h.top(), Some(-12));
    }

    #[test]
    fn test_arithmetic_wraps() {
        let mut h = Harness::new("");
        h.push(i32::MAX);
        h.push(1);
        h.exec(Instruction::Add).unwrap();
        assert_eq!(h.top(), Some(i32::MIN));

        h.push(-1);
        h.exec(Instruction::Div).unwrap();
        assert_eq!(h.top(), Some(i32::MIN));
    }

    #[test]
    fn test_div_truncates_toward_zero() {
        let mut h = Harness::new("");
        h.push(-7);
        h.push(2);
        h.exec(Instruction::Div).unwrap();
        assert_eq!(h.top(), Some(-3));
    }

    #[test]
    fn test_division_by_zero() {
        let mut h = Harness::new("");
        h.push(1);
        h.push(0);
        let err = h.exec(Instruction::Div).unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero { pc: 10 }));
    }

    #[test]
    fn test_arithmetic_underflow() {
        let mut h = Harness::new("");
        h.push(1);
        let err = h.exec(Instruction::Add).unwrap_err();
        assert!(matches!(err, RuntimeError::StackUnderflow { .. }));
    }

    #[test]
    fn test_in_out() {
        let mut h = Harness::new("42 junk\n");
        h.exec(Instruction::In).unwrap();
        assert_eq!(h.top(), Some(42));
        h.exec(Instruction::Out).unwrap();
        assert_eq!(h.io.outputs(), &[42]);
        // Parse failure is not fatal and pushes nothing
        h.exec(Instruction::In).unwrap();
        assert!(h.stacks.operands.is_empty());
        // Neither is end of input
        h.exec(Instruction::In).unwrap();
        assert!(h.stacks.operands.is_empty());
    }

    #[test]
    fn test_conditional_jumps() {
        let cases = [
            (Instruction::Ja { target: 100 }, 5, 3, true),
            (Instruction::Ja { target: 100 }, 3, 3, false),
            (Instruction::Jae { target: 100 }, 3, 3, true),
            (Instruction::Jae { target: 100 }, 2, 3, false),
            (Instruction::Jb { target: 100 }, -1, 0, true),
            (Instruction::Jb { target: 100 }, 0, 0, false),
            (Instruction::Jbe { target: 100 }, 4, 3, false),
            (Instruction::Jbe { target: 100 }, 3, 3, true),
            (Instruction::Je { target: 100 }, 8, 8, true),
            (Instruction::Je { target: 100 }, 8, 9, false),
            (Instruction::Jne { target: 100 }, 8, 8, false),
            (Instruction::Jne { target: 100 }, i32::MIN, i32::MAX, true),
        ];
        for (instr, left, right, taken) in cases {
            let mut h = Harness::new("");
            h.push(left);
            h.push(right);
            h.exec(instr).unwrap();
            let expected = if taken { 100 } else { 10 + 5 };
            assert_eq!(h.state.pc, expected, "{instr:?} with {left}, {right}");
            assert!(h.stacks.operands.is_empty());
        }
    }

    #[test]
    fn test_call_ret() {
        let mut h = Harness::new("");
        h.state.pc = 20;
        h.exec(Instruction::Call { target: 50 }).unwrap();
        assert_eq!(h.state.pc, 50);
        assert_eq!(h.stacks.returns.as_slice(), &[25]);
        h.exec(Instruction::Ret).unwrap();
        assert_eq!(h.state.pc, 25);
    }

    #[test]
    fn test_ret_ignores_operand_stack() {
        let mut h = Harness::new("");
        h.push(0);
        let err = h.exec(Instruction::Ret).unwrap_err();
        assert!(matches!(err, RuntimeError::StackUnderflow { .. }));
        assert_eq!(h.top(), Some(0));
    }

    #[test]
    fn test_call_depth_limit() {
        let mut h = Harness::new("");
        for _ in 0..4 {
            h.exec(Instruction::Call { target: 0 }).unwrap();
        }
        let err = h.exec(Instruction::Call { target: 0 }).unwrap_err();
        assert!(matches!(err, RuntimeError::StackOverflow { limit: 4, .. }));
    }

    #[test]
    fn test_hlt() {
        let mut h = Harness::new("");
        h.exec(Instruction::Hlt).unwrap();
        assert_eq!(h.state.halt_reason, Some(HaltReason::Halt));
    }
}
