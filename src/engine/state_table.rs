//! The compiled, immutable state table.
//!
//! This is the *static* side of the engine: what the builder produces from a
//! [`Grammar`](crate::Grammar) and what every tokenizing session reads.
//!
//! ## Rule shape
//!
//! A compiled rule is a matcher plus two orthogonal parts:
//!
//! - [`Emit`]: what to produce for the matched text (one variant per action
//!   kind, dispatched by a single `match` in the tokenizer).
//! - [`Transition`]: what to do to the state stack afterwards.
//!
//! `include` directives do not survive compilation: they are inlined by the
//! builder, so a built table only ever contains matchable rules.
//!
//! ## Invariants
//!
//! - `StateId` is an index into `StateTable::states`; ids are stable for the
//!   lifetime of the table.
//! - Every `StateRef::Named` and the `root` id point at an existing state.
//! - Rules are shared between states through `Arc` once includes are inlined.

use super::matcher::Matcher;
use crate::TokenType;
use std::collections::HashMap;
use std::sync::Arc;

/// Index of a state in its [`StateTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct StateId(pub(crate) u32);

impl StateId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A state named by a rule: a fixed state, or whatever is on top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateRef {
    Current,
    Named(StateId),
}

impl StateRef {
    pub(crate) fn resolve(self, current: StateId) -> StateId {
        match self {
            StateRef::Current => current,
            StateRef::Named(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GroupEmit {
    Token(TokenType),
    UsingSelf(StateRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Emit {
    /// No emitter declared; a non-empty match is reported as `Text`.
    Nothing,
    Token(TokenType),
    ByGroups(Vec<GroupEmit>),
    UsingSelf(StateRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Stay,
    Push(StateRef),
    Pop(usize),
}

#[derive(Debug)]
pub(crate) struct Rule {
    pub(crate) pattern: String,
    pub(crate) matcher: Matcher,
    pub(crate) emit: Emit,
    pub(crate) transition: Transition,
}

#[derive(Debug)]
pub(crate) struct State {
    pub(crate) name: String,
    pub(crate) rules: Vec<Arc<Rule>>,
}

#[derive(Debug)]
pub(crate) struct StateTable {
    pub(crate) states: Vec<State>,
    pub(crate) by_name: HashMap<String, StateId>,
    pub(crate) root: StateId,
}

impl StateTable {
    pub(crate) fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn root(&self) -> StateId {
        self.root
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }
}

impl std::fmt::Display for StateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for state in &self.states {
            writeln!(f, "{}:", state.name)?;
            for rule in &state.rules {
                write!(f, "  {:?} -> {:?}", rule.pattern, rule.emit)?;
                match rule.transition {
                    Transition::Stay => writeln!(f)?,
                    Transition::Push(StateRef::Current) => writeln!(f, " push #push")?,
                    Transition::Push(StateRef::Named(id)) => writeln!(f, " push {}", self.state(id).name)?,
                    Transition::Pop(depth) => writeln!(f, " pop {depth}")?,
                }
            }
        }
        Ok(())
    }
}
