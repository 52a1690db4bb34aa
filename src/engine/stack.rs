//! Per-session state stack.
//!
//! The stack holds [`StateId`]s and is never empty: the entry it is created
//! with (normally `root`) is the floor, and pops stop above it.
//!
//! ```text
//! push(string)   [root] -> [root, string]
//! push(#push)    [root, string] -> [root, string, string]
//! pop(5)         [root, string, string] -> [root]
//! pop(1)         [root] -> [root]            (no-op)
//! ```

use super::state_table::StateId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StateStack {
    entries: Vec<StateId>,
}

impl StateStack {
    pub(crate) fn new(floor: StateId) -> Self {
        StateStack { entries: vec![floor] }
    }

    /// Rebuild a stack from a snapshot. An empty snapshot yields `[floor]`.
    pub(crate) fn from_entries(floor: StateId, entries: impl IntoIterator<Item = StateId>) -> Self {
        let entries: Vec<StateId> = entries.into_iter().collect();
        if entries.is_empty() { StateStack::new(floor) } else { StateStack { entries } }
    }

    pub(crate) fn top(&self) -> StateId {
        // Never empty: `pop` keeps the floor.
        self.entries[self.entries.len() - 1]
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn push(&mut self, id: StateId) {
        self.entries.push(id);
    }

    /// Remove up to `depth` entries, never the floor. Returns how many were removed.
    pub(crate) fn pop(&mut self, depth: usize) -> usize {
        let removed = depth.min(self.entries.len() - 1);
        self.entries.truncate(self.entries.len() - removed);
        removed
    }

    pub(crate) fn entries(&self) -> &[StateId] {
        &self.entries
    }
}
