//! Label table
//!
//! Insertion-ordered table of symbolic labels. Each entry moves through a
//! small status lattice as the assembler sees references and definitions:
//!
//! ```text
//! Empty ──define──▶ Valid
//!   │                 ▲
//! reference         define
//!   ▼                 │
//! NameOnly ───────────┘
//! ```
//!
//! `ShiftOnly` (an offset with no name) is never produced by the table
//! itself; observing it means the table was corrupted.

use std::collections::HashMap;
use tracing::debug;
use crate::error::{AssemblerError, Result};

/// Longest accepted label name
pub const MAX_LABEL_LEN: usize = 32;

/// Index of an entry in the label table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(usize);

impl LabelId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Label status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStatus {
    /// Neither name nor offset recorded
    Empty,
    /// Referenced but not yet defined
    NameOnly,
    /// Offset without a name
    ShiftOnly,
    /// Name and offset both known
    Valid,
}

/// Label table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    name: String,
    status: LabelStatus,
    offset: u32,
    first_use: usize,
}

impl Label {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> LabelStatus {
        self.status
    }

    /// Defined offset, if the label is valid
    pub fn offset(&self) -> Option<u32> {
        (self.status == LabelStatus::Valid).then_some(self.offset)
    }

    /// Source line of the first reference or definition
    pub fn first_use(&self) -> usize {
        self.first_use
    }
}

/// Label table
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    entries: Vec<Label>,
    index: HashMap<String, LabelId>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Find a label by name
    pub fn lookup(&self, name: &str) -> Option<LabelId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.entries.get(id.0)
    }

    pub fn status(&self, id: LabelId) -> Option<LabelStatus> {
        self.get(id).map(Label::status)
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.entries.iter()
    }

    /// Record a use of `name`, registering it as `NameOnly` if unseen
    pub fn reference(&mut self, name: &str, line: usize) -> Result<LabelId> {
        if let Some(id) = self.lookup(name) {
            self.check_integrity(id)?;
            return Ok(id);
        }
        let id = self.insert(name, LabelStatus::NameOnly, 0, line);
        debug!(label = name, line, "forward reference");
        Ok(id)
    }

    /// Bind `name` to `offset`
    ///
    /// Defining an already-valid label again is a [`AssemblerError::DuplicateLabel`].
    pub fn define(&mut self, name: &str, offset: u32, line: usize) -> Result<LabelId> {
        let Some(id) = self.lookup(name) else {
            let id = self.insert(name, LabelStatus::Valid, offset, line);
            debug!(label = name, offset, line, "label defined");
            return Ok(id);
        };

        let entry = &mut self.entries[id.0];
        match entry.status {
            LabelStatus::Empty | LabelStatus::NameOnly => {
                entry.status = LabelStatus::Valid;
                entry.offset = offset;
                debug!(label = name, offset, line, "label defined");
                Ok(id)
            }
            LabelStatus::Valid => Err(AssemblerError::DuplicateLabel {
                name: name.to_string(),
                line,
                offset: entry.offset,
            }),
            LabelStatus::ShiftOnly => Err(corrupted(entry)),
        }
    }

    /// Check that every referenced label has been defined
    pub fn verify(&self) -> Result<()> {
        for entry in &self.entries {
            match entry.status {
                LabelStatus::Empty | LabelStatus::Valid => {}
                LabelStatus::NameOnly => {
                    return Err(AssemblerError::UndefinedLabel {
                        name: entry.name.clone(),
                        line: entry.first_use,
                    })
                }
                LabelStatus::ShiftOnly => return Err(corrupted(entry)),
            }
        }
        Ok(())
    }

    /// Offset of a valid label
    pub fn resolve(&self, id: LabelId) -> Result<u32> {
        let entry = self.entries.get(id.0).ok_or_else(|| {
            AssemblerError::CorruptedLabelTable(format!("no entry with index {}", id.0))
        })?;
        match entry.status {
            LabelStatus::Valid => Ok(entry.offset),
            LabelStatus::NameOnly => Err(AssemblerError::UndefinedLabel {
                name: entry.name.clone(),
                line: entry.first_use,
            }),
            LabelStatus::Empty | LabelStatus::ShiftOnly => Err(corrupted(entry)),
        }
    }

    fn insert(&mut self, name: &str, status: LabelStatus, offset: u32, line: usize) -> LabelId {
        let id = LabelId(self.entries.len());
        self.entries.push(Label {
            name: name.to_string(),
            status,
            offset,
            first_use: line,
        });
        self.index.insert(name.to_string(), id);
        id
    }

    fn check_integrity(&self, id: LabelId) -> Result<()> {
        match self.entries.get(id.0) {
            Some(entry) if entry.status == LabelStatus::ShiftOnly => Err(corrupted(entry)),
            Some(_) => Ok(()),
            None => Err(AssemblerError::CorruptedLabelTable(format!(
                "no entry with index {}",
                id.0
            ))),
        }
    }
}

fn corrupted(entry: &Label) -> AssemblerError {
    AssemblerError::CorruptedLabelTable(format!(
        "label `{}` is in state {:?}",
        entry.name, entry.status
    ))
}
