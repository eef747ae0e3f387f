//! # KM Runtime
//!
//! Execute KM stack-machine programs.
//!
//! ## Features
//!
//! - **Operand stack**: bounded, 32-bit signed words, wrapping arithmetic
//! - **4 registers**: ax, bx, cx, dx
//! - **Word-cell memory**: one 32-bit word per address, bounds-checked
//! - **Subroutines**: `call`/`ret` through a separate return-address stack
//! - **I/O**: `in` and `out` over any `BufRead`/`Write` pair
//!
//! ## Example
//!
//! ```rust
//! use kmvm_runtime::{VM, VMConfig, HaltReason};
//! use kmvm_spec::Program;
//!
//! // push 3 / push 4 / add / out / hlt
//! let program = Program::new(vec![
//!     0x21, 3, 0, 0, 0,
//!     0x21, 4, 0, 0, 0,
//!     0x03, 0x08, 0x00,
//! ]);
//! let vm = VM::new(program, VMConfig::default(), &b""[..], std::io::sink()).unwrap();
//! let result = vm.run().unwrap();
//! assert_eq!(result.outputs, vec![7]);
//! assert_eq!(result.halt_reason, HaltReason::Halt);
//! ```

pub mod error;
pub mod state;
pub mod memory;
pub mod stack;
pub mod io;
pub mod execute;
pub mod vm;

pub use state::{VMState, HaltReason};
pub use memory::Memory;
pub use stack::{Stack, StackKind, Stacks};
pub use io::IOHandler;
pub use vm::{VM, VMConfig, ExecutionResult};
pub use error::RuntimeError;

/// Simple execution helper
///
/// Runs a program with `input` as its standard input and returns the
/// values it wrote. Printed text is discarded.
pub fn run(program: kmvm_spec::Program, input: &str) -> Result<Vec<kmvm_spec::Word>, RuntimeError> {
    let vm = VM::new(program, VMConfig::default(), input.as_bytes(), std::io::sink())?;
    Ok(vm.run()?.outputs)
}
