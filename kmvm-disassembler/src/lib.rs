//! # KM Disassembler
//!
//! Turn KM bytecode back into assembly text, either re-assemblable
//! ([`disassemble`]) or as an annotated hex listing ([`listing`]).
//!
//! ## Example
//!
//! ```rust
//! use kmvm_spec::Program;
//! use kmvm_disassembler::{disassemble, listing};
//!
//! // push 5 / pop / hlt
//! let bytes = b"KMv4\x21\x05\x00\x00\x00\x02\x00";
//! let program = Program::from_bytes(bytes).unwrap();
//!
//! let asm = disassemble(&program).unwrap();
//! assert!(asm.contains("push 5"));
//!
//! let lst = listing(&program).unwrap();
//! assert!(lst.contains("PUSH 5"));
//! ```

pub mod error;
pub mod decoder;
pub mod formatter;
pub mod disassembler;
pub mod listing;

pub use error::{DisassemblerError, Result};
pub use disassembler::{disassemble, label_name};
pub use decoder::{decode, decode_all, Decoded};
pub use formatter::{format, format_operand, format_with_targets};
pub use listing::{listing, listing_line};
