//! Memory subsystem
//!
//! Flat, zero-initialized array of word cells. Every address in
//! `[0, size)` names its own cell holding a whole `Word`; cells never
//! overlap.

use kmvm_spec::Word;
use crate::error::{Result, RuntimeError};

#[derive(Debug, Clone)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Memory {
            cells: vec![0; size],
        }
    }

    /// Number of addressable cells
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    /// Load the word at `addr`; `pc` is only used for the error
    pub fn load_word(&self, addr: Word, pc: usize) -> Result<Word> {
        let index = self.index(addr, pc)?;
        Ok(self.cells[index])
    }

    pub fn store_word(&mut self, addr: Word, value: Word, pc: usize) -> Result<()> {
        let index = self.index(addr, pc)?;
        self.cells[index] = value;
        Ok(())
    }

    fn index(&self, addr: Word, pc: usize) -> Result<usize> {
        usize::try_from(addr)
            .ok()
            .filter(|&index| index < self.cells.len())
            .ok_or(RuntimeError::SegmentationFault {
                pc,
                address: addr,
                size: self.cells.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_initialized() {
        let mem = Memory::new(16);
        assert_eq!(mem.load_word(0, 0).unwrap(), 0);
        assert_eq!(mem.load_word(15, 0).unwrap(), 0);
    }

    #[test]
    fn test_store_load() {
        let mut mem = Memory::new(16);
        mem.store_word(4, -123456, 0).unwrap();
        assert_eq!(mem.load_word(4, 0).unwrap(), -123456);
        assert_eq!(mem.as_slice()[4], -123456);
    }

    #[test]
    fn test_neighbouring_cells_independent() {
        let mut mem = Memory::new(16);
        mem.store_word(1, i32::MAX, 0).unwrap();
        mem.store_word(2, -1, 0).unwrap();
        assert_eq!(mem.load_word(1, 0).unwrap(), i32::MAX);
        assert_eq!(&mem.as_slice()[..4], &[0, i32::MAX, -1, 0]);
    }

    #[test]
    fn test_last_cell() {
        let mut mem = Memory::new(16);
        mem.store_word(15, 7, 0).unwrap();
        assert_eq!(mem.load_word(15, 0).unwrap(), 7);
        assert!(mem.store_word(16, 7, 0).is_err());
    }

    #[test]
    fn test_negative_address() {
        let mem = Memory::new(16);
        let err = mem.load_word(-1, 3).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::SegmentationFault { pc: 3, address: -1, size: 16 }
        ));
    }

    #[test]
    fn test_address_past_end() {
        let mut mem = Memory::new(16);
        assert!(mem.load_word(16, 0).is_err());
        assert!(mem.store_word(i32::MAX, 1, 0).is_err());
    }
}
