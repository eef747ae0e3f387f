//! Virtual Machine for KM bytecode

use std::io::{BufRead, Write};
use kmvm_disassembler::{decode, format};
use kmvm_spec::{Program, Word, NUM_REGISTERS};
use tracing::{debug, trace};
use crate::error::{Result, RuntimeError};
use crate::execute::execute;
use crate::io::IOHandler;
use crate::memory::Memory;
use crate::stack::Stacks;
use crate::state::{HaltReason, VMState};

/// VM configuration
#[derive(Debug, Clone)]
pub struct VMConfig {
    /// Number of word cells in data memory
    pub memory_size: usize,

    /// Maximum operand stack depth
    pub stack_limit: usize,

    /// Maximum nesting of `call`
    pub call_depth_limit: usize,

    /// Log every executed instruction at trace level
    pub trace: bool,

    /// Keep printed values in [`ExecutionResult::outputs`]
    pub record_outputs: bool,
}

impl Default for VMConfig {
    fn default() -> Self {
        Self {
            memory_size: 1024,
            stack_limit: 65536,
            call_depth_limit: 4096,
            trace: false,
            record_outputs: true,
        }
    }
}

impl VMConfig {
    /// Reject configurations the VM cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.memory_size == 0 {
            return Err(RuntimeError::InvalidConfig("memory_size must be non-zero".into()));
        }
        if self.stack_limit == 0 {
            return Err(RuntimeError::InvalidConfig("stack_limit must be non-zero".into()));
        }
        if self.call_depth_limit == 0 {
            return Err(RuntimeError::InvalidConfig(
                "call_depth_limit must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Execution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Number of instructions executed
    pub steps: u64,

    /// Values written by `out` and bare `pop`; empty when recording is off
    pub outputs: Vec<Word>,

    /// Reason for halting
    pub halt_reason: HaltReason,

    /// Register file at halt
    pub registers: [Word; NUM_REGISTERS],
}

/// KM Virtual Machine
pub struct VM<R, W> {
    /// Code section being executed
    code: Vec<u8>,

    /// VM state (registers, pc, step count)
    state: VMState,

    /// Data memory
    memory: Memory,

    /// Operand and return-address stacks
    stacks: Stacks,

    /// I/O handler
    io: IOHandler<R, W>,

    /// Configuration
    config: VMConfig,
}

impl<R: BufRead, W: Write> VM<R, W> {
    /// Create a new VM over a program, reading `in` from `reader` and
    /// writing `out` to `writer`
    pub fn new(program: Program, config: VMConfig, reader: R, writer: W) -> Result<Self> {
        config.validate()?;
        program.header.validate()?;

        debug!(
            code_size = program.code.len(),
            memory_size = config.memory_size,
            stack_limit = config.stack_limit,
            "VM created"
        );

        Ok(Self {
            code: program.code,
            state: VMState::new(),
            memory: Memory::new(config.memory_size),
            stacks: Stacks::new(config.stack_limit, config.call_depth_limit),
            io: IOHandler::new(reader, writer).record_outputs(config.record_outputs),
            config,
        })
    }

    /// Run the VM until halt or fault
    pub fn run(mut self) -> Result<ExecutionResult> {
        while !self.state.is_halted() {
            self.step()?;
        }
        self.io.flush()?;

        let halt_reason = self.state.halt_reason.unwrap_or(HaltReason::Halt);
        debug!(steps = self.state.steps, ?halt_reason, "VM halted");

        Ok(ExecutionResult {
            steps: self.state.steps,
            outputs: self.io.take_outputs(),
            halt_reason,
            registers: self.state.registers,
        })
    }

    /// Execute one instruction
    ///
    /// Reaching the exact end of the code halts with
    /// [`HaltReason::EndOfCode`] without counting a step.
    pub fn step(&mut self) -> Result<()> {
        let pc = self.state.pc;
        if pc == self.code.len() {
            self.state.halt(HaltReason::EndOfCode);
            return Ok(());
        }
        if pc > self.code.len() {
            return Err(RuntimeError::PcOutOfBounds {
                pc,
                code_size: self.code.len(),
            });
        }

        let (instr, next_pc) = decode(&self.code, pc).map_err(|e| RuntimeError::decode(pc, e))?;

        if self.config.trace {
            trace!(
                step = self.state.steps,
                pc,
                depth = self.stacks.operands.len(),
                top = ?self.stacks.operands.peek(),
                "{}",
                format(&instr)
            );
        }

        execute(
            &instr,
            next_pc,
            &mut self.state,
            &mut self.memory,
            &mut self.stacks,
            &mut self.io,
        )?;
        self.state.inc_steps();
        Ok(())
    }

    /// Get current state (for debugging)
    pub fn state(&self) -> &VMState {
        &self.state
    }

    /// Get memory (for debugging)
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Get stacks (for debugging)
    pub fn stacks(&self) -> &Stacks {
        &self.stacks
    }

    pub fn config(&self) -> &VMConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmvm_assembler::assemble;

    fn run_source(source: &str, input: &str) -> Result<ExecutionResult> {
        let program = assemble(source).unwrap();
        let vm = VM::new(program, VMConfig::default(), input.as_bytes(), Vec::new())?;
        vm.run()
    }

    #[test]
    fn test_vm_basic_execution() {
        let result = run_source("push 3\npush 4\nadd\nout\nhlt", "").unwrap();
        assert_eq!(result.outputs, vec![7]);
        assert_eq!(result.halt_reason, HaltReason::Halt);
        assert_eq!(result.steps, 5);
    }

    #[test]
    fn test_vm_end_of_code() {
        let result = run_source("push 5\npop", "").unwrap();
        assert_eq!(result.outputs, vec![5]);
        assert_eq!(result.halt_reason, HaltReason::EndOfCode);
        assert_eq!(result.steps, 2);
    }

    #[test]
    fn test_vm_empty_program() {
        let result = run_source("", "").unwrap();
        assert_eq!(result.halt_reason, HaltReason::EndOfCode);
        assert_eq!(result.steps, 0);
    }

    #[test]
    fn test_vm_jump_past_end() {
        let err = run_source("jmp 100", "").unwrap_err();
        assert!(matches!(err, RuntimeError::PcOutOfBounds { pc: 100, code_size: 5 }));
    }

    #[test]
    fn test_vm_jump_into_operand() {
        // Offset 1 is the immediate's low byte, 0x0F, which decodes as `jne`
        let err = run_source("push 15\njmp 1", "").unwrap_err();
        assert!(err.pc().is_some());
    }

    #[test]
    fn test_vm_unknown_command() {
        let program = Program::new(vec![0x1E]);
        let vm = VM::new(program, VMConfig::default(), &b""[..], Vec::new()).unwrap();
        let err = vm.run().unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownCommand { pc: 0, byte: 0x1E }));
    }

    #[test]
    fn test_vm_registers_in_result() {
        let result = run_source("push 9\npop cx\nhlt", "").unwrap();
        assert_eq!(result.registers, [0, 0, 9, 0]);
    }

    #[test]
    fn test_vm_loop_counts_down() {
        let source = r#"
            push 3
            pop ax
        loop:
            push ax
            out
            push ax
            push 1
            sub
            pop ax
            push ax
            push 0
            ja loop
            hlt
        "#;
        let result = run_source(source, "").unwrap();
        assert_eq!(result.outputs, vec![3, 2, 1]);
    }

    #[test]
    fn test_vm_memory_round_trip() {
        let source = "push 1234\npop [16]\npush [16]\nout\nhlt";
        let result = run_source(source, "").unwrap();
        assert_eq!(result.outputs, vec![1234]);
    }

    #[test]
    fn test_vm_reads_input() {
        let result = run_source("in\nin\nmul\nout\nhlt", "6\n7\n").unwrap();
        assert_eq!(result.outputs, vec![42]);
    }

    #[test]
    fn test_vm_writes_to_writer() {
        let program = assemble("push 5\npop\npush 6\nout\nhlt").unwrap();
        let mut out = Vec::new();
        let vm = VM::new(program, VMConfig::default(), &b""[..], &mut out).unwrap();
        vm.run().unwrap();
        assert_eq!(out, b"5\n6\n");
    }

    #[test]
    fn test_vm_rejects_bad_config() {
        let program = Program::new(vec![0x00]);
        let config = VMConfig {
            memory_size: 0,
            ..VMConfig::default()
        };
        let err = VM::new(program, config, &b""[..], Vec::new()).err().unwrap();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_vm_stack_limit() {
        let program = assemble("top:\npush 1\njmp top").unwrap();
        let config = VMConfig {
            stack_limit: 8,
            ..VMConfig::default()
        };
        let vm = VM::new(program, config, &b""[..], Vec::new()).unwrap();
        let err = vm.run().unwrap_err();
        assert!(matches!(err, RuntimeError::StackOverflow { limit: 8, .. }));
    }

    #[test]
    fn test_vm_step() {
        let program = assemble("push 1\npush 2\nhlt").unwrap();
        let mut vm = VM::new(program, VMConfig::default(), &b""[..], Vec::new()).unwrap();
        vm.step().unwrap();
        assert_eq!(vm.state().pc, 5);
        assert_eq!(vm.stacks().operands.as_slice(), &[1]);
        vm.step().unwrap();
        vm.step().unwrap();
        assert!(vm.state().is_halted());
        assert_eq!(vm.state().steps, 3);
    }

    #[test]
    fn test_vm_without_output_recording() {
        let program = assemble("push 1\nout\npush 2\npop\nhlt").unwrap();
        let config = VMConfig {
            record_outputs: false,
            ..VMConfig::default()
        };
        let mut out = Vec::new();
        let result = VM::new(program, config, &b""[..], &mut out).unwrap().run().unwrap();
        assert!(result.outputs.is_empty());
        assert_eq!(out, b"1\n2\n");
    }

    #[test]
    fn test_vm_invalid_utf8_input_continues() {
        let program = assemble("in\npush 5\nout\nhlt").unwrap();
        let vm = VM::new(program, VMConfig::default(), &b"\xff\xfe\n"[..], Vec::new()).unwrap();
        let result = vm.run().unwrap();
        assert_eq!(result.outputs, vec![5]);
        assert_eq!(result.halt_reason, HaltReason::Halt);
    }

    #[test]
    fn test_vm_trace_enabled() {
        let program = assemble("push 1\nout\nhlt").unwrap();
        let config = VMConfig {
            trace: true,
            ..VMConfig::default()
        };
        let vm = VM::new(program, config, &b""[..], Vec::new()).unwrap();
        assert!(vm.config().trace);
        assert_eq!(vm.run().unwrap().outputs, vec![1]);
    }
}
