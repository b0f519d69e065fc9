//! # Revision History
//!
//! Per-document undo/redo of accepted revisions.
//!
//! Revisions are immutable snapshots, so rolling back never re-applies or
//! inverts a proposal: the previous snapshot simply becomes current again.
//!
//! - Each commit pushes the superseded revision onto the undo stack
//! - Undo moves the current revision to the redo stack
//! - A new commit clears the redo stack
//! - The undo stack is bounded (`0` = unlimited)

use crate::store::Revision;

#[derive(Debug)]
pub struct RevisionHistory {
    /// Superseded revisions (most recent last)
    undo_stack: Vec<Revision>,

    /// Rolled-back revisions (most recent last)
    redo_stack: Vec<Revision>,

    max_levels: usize,
}

impl RevisionHistory {
    pub fn new() -> Self {
        Self::with_max_levels(50)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record `superseded` as the revision a new commit replaced
    pub fn record(&mut self, superseded: Revision) {
        self.undo_stack.push(superseded);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Swap `current` for the previous revision, if any
    pub fn undo(&mut self, current: Revision) -> Result<Revision, Revision> {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.redo_stack.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    /// Swap `current` for the most recently rolled-back revision, if any
    pub fn redo(&mut self, current: Revision) -> Result<Revision, Revision> {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Superseded revisions, oldest first
    pub fn past(&self) -> &[Revision] {
        &self.undo_stack
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for RevisionHistory {
    fn default() -> Self {
        Self::new()
    }
}
