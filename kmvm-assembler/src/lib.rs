//! KM Assembler
//!
//! Assemble KM assembly language into executable bytecode.
//!
//! ## Example
//!
//! ```rust
//! use kmvm_assembler::assemble;
//!
//! let source = r#"
//!     push 3
//!     push 4
//!     add
//!     out
//!     hlt
//! "#;
//!
//! let program = assemble(source).unwrap();
//! assert_eq!(program.code.len(), 13);
//! ```

pub mod error;
pub mod lexer;
pub mod labels;
pub mod parser;
pub mod encoder;
pub mod assembler;

pub use error::{AssemblerError, Result};
pub use assembler::{assemble, assemble_file, Assembler};
pub use labels::{Label, LabelId, LabelStatus, LabelTable, MAX_LABEL_LEN};
pub use parser::{parse_instruction, parse_line, parse_register};
pub use encoder::{encode, encode_into};
