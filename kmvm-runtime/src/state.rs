//! VM state for the KM interpreter

use kmvm_spec::{Register, Word, NUM_REGISTERS};

/// VM state
#[derive(Debug, Clone, Default)]
pub struct VMState {
    /// General-purpose registers (ax, bx, cx, dx)
    pub registers: [Word; NUM_REGISTERS],

    /// Program counter (offset into the code section)
    pub pc: usize,

    /// Instructions executed so far
    pub steps: u64,

    /// Halt reason, once halted
    pub halt_reason: Option<HaltReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// `hlt` instruction
    Halt,
    /// Execution ran off the last instruction
    EndOfCode,
}

impl VMState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn read_reg(&self, reg: Register) -> Word {
        self.registers[reg.index()]
    }

    #[inline]
    pub fn write_reg(&mut self, reg: Register, value: Word) {
        self.registers[reg.index()] = value;
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halt_reason.is_some()
    }

    /// Halt execution
    pub fn halt(&mut self, reason: HaltReason) {
        self.halt_reason = Some(reason);
    }

    #[inline]
    pub fn inc_steps(&mut self) {
        self.steps += 1;
    }
}
