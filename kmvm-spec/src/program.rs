//! # Program Structure
//!
//! Binary file format: a fixed signature header followed by the raw
//! instruction stream.
//!
//! ```text
//! Offset  Size  Field
//! ──────────────────────────────────
//! 0x00    2     magic ("KM")
//! 0x02    2     version ("v4")
//! 0x04    ...   code
//! ```
//!
//! Jump targets inside the code are offsets into the code stream, not into
//! the file.

use crate::error::{FormatError, SpecError};
use sha2::{Digest, Sha256};
use std::fmt;

/// File signature
pub const MAGIC: [u8; 2] = *b"KM";

/// Format version
pub const VERSION: [u8; 2] = *b"v4";

/// Program header (4 bytes)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramHeader {
    pub magic: [u8; 2],
    pub version: [u8; 2],
}

impl ProgramHeader {
    /// Header size in bytes
    pub const SIZE: usize = 4;

    pub fn new() -> Self {
        Self { magic: MAGIC, version: VERSION }
    }

    /// Check signature first, then version
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.magic != MAGIC {
            return Err(FormatError::BadMagic { found: self.magic }.into());
        }
        if self.version != VERSION {
            return Err(FormatError::BadVersion { found: self.version }.into());
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.magic[0], self.magic[1], self.version[0], self.version[1]]
    }

    /// Deserialize and validate
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpecError> {
        if bytes.len() < Self::SIZE {
            return Err(FormatError::TruncatedHeader {
                expected: Self::SIZE,
                found: bytes.len(),
            }
            .into());
        }
        let header = Self {
            magic: [bytes[0], bytes[1]],
            version: [bytes[2], bytes[3]],
        };
        header.validate()?;
        Ok(header)
    }
}

impl Default for ProgramHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete program: header plus encoded instruction stream
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub header: ProgramHeader,

    /// Code section (encoded instructions)
    pub code: Vec<u8>,
}

impl Program {
    pub fn new(code: Vec<u8>) -> Self {
        Self { header: ProgramHeader::new(), code }
    }

    pub fn code_size(&self) -> usize {
        self.code.len()
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ProgramHeader::SIZE + self.code.len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.code);
        bytes
    }

    /// Deserialize from bytes
    ///
    /// The header is verified before any of the code is accepted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SpecError> {
        let header = ProgramHeader::from_bytes(bytes)?;
        Ok(Self {
            header,
            code: bytes[ProgramHeader::SIZE..].to_vec(),
        })
    }

    /// SHA-256 of the serialized file
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }

    /// Hex rendering of [`Program::digest`]
    pub fn digest_hex(&self) -> String {
        self.digest().iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "KM Program")?;
        writeln!(
            f,
            "  Signature:  {}{}",
            String::from_utf8_lossy(&self.header.magic),
            String::from_utf8_lossy(&self.header.version)
        )?;
        writeln!(f, "  Code size:  {} bytes", self.code.len())?;
        Ok(())
    }
}
