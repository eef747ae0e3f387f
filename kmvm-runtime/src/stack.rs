//! Bounded LIFO stacks
//!
//! The interpreter keeps two of these: one for operands and one for return
//! addresses. `ret` only ever pops the latter.

use std::fmt;
use kmvm_spec::Word;
use crate::error::{Result, RuntimeError};

/// Which stack a fault came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Operand,
    Return,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Operand => write!(f, "operand"),
            StackKind::Return => write!(f, "return"),
        }
    }
}

/// Stack with a fixed capacity
#[derive(Debug, Clone)]
pub struct Stack<T> {
    items: Vec<T>,
    limit: usize,
    kind: StackKind,
}

impl<T: Copy> Stack<T> {
    pub fn new(kind: StackKind, limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit,
            kind,
        }
    }

    /// Push `value`; `pc` is only used for the error
    pub fn push(&mut self, value: T, pc: usize) -> Result<()> {
        if self.items.len() >= self.limit {
            return Err(RuntimeError::StackOverflow {
                pc,
                stack: self.kind,
                limit: self.limit,
            });
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self, pc: usize) -> Result<T> {
        self.items.pop().ok_or(RuntimeError::StackUnderflow {
            pc,
            stack: self.kind,
        })
    }

    /// Pop two values, returning `(left, right)` where `right` was on top
    pub fn pop_pair(&mut self, pc: usize) -> Result<(T, T)> {
        let right = self.pop(pc)?;
        let left = self.pop(pc)?;
        Ok((left, right))
    }

    pub fn peek(&self) -> Option<T> {
        self.items.last().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn kind(&self) -> StackKind {
        self.kind
    }

    /// Bottom to top
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

/// Operand stack plus return-address stack
#[derive(Debug, Clone)]
pub struct Stacks {
    pub operands: Stack<Word>,
    pub returns: Stack<usize>,
}

impl Stacks {
    pub fn new(stack_limit: usize, call_depth_limit: usize) -> Self {
        Self {
            operands: Stack::new(StackKind::Operand, stack_limit),
            returns: Stack::new(StackKind::Return, call_depth_limit),
        }
    }
}
