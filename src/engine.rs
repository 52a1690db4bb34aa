//! Grammar compilation and tokenization engine.
//!
//! The engine is split into focused submodules under `src/engine/`. Turning a
//! text into tokens is a pipeline:
//!
//! ```text
//! Grammar ── build (builder.rs)
//!              - validate state references and rule actions
//!              - compile patterns (matcher.rs)
//!              - inline includes, synthesize combined states
//!              │
//!              v
//!          StateTable (state_table.rs)
//!              │
//! text ── normalize (newline.rs) ── "\r\n" | "\r" -> "\n", OffsetMap
//!              │
//!              v
//!          Session::next_token (tokenizer.rs)
//!              - first matching rule of the top state wins
//!              - push / pop on the StateStack (stack.rs)
//!              - unmatched character -> Error
//!              │
//!              v
//!          OffsetMap::to_original ── Coalesce (coalesce.rs) ── Token stream
//! ```
//!
//! ## Responsibilities by module
//!
//! - `builder.rs`: turns a declarative [`Grammar`](crate::Grammar) into a
//!   `StateTable`, reporting every problem as a [`BuildError`](crate::BuildError).
//! - `state_table.rs`: the immutable compiled form, shared by every session.
//! - `matcher.rs`: anchored, linear-time regex matching at a byte offset.
//! - `stack.rs`: the state stack with a floor that can never be popped.
//! - `tokenizer.rs`: the state machine, including nested `using_self` runs.
//! - `newline.rs`: line-ending normalization and the offset map back to the
//!   caller's text.
//! - `coalesce.rs`: merges adjacent tokens of the same type.
//!
//! ## Debugging
//!
//! The builder and the tokenizer log through `tracing`. Run with a subscriber
//! at `debug` to see compilation summaries, or `trace` for the full rule dump
//! and every fallback `Error` token.

#[path = "engine/builder.rs"]
mod builder;
#[path = "engine/coalesce.rs"]
mod coalesce;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/newline.rs"]
mod newline;
#[path = "engine/stack.rs"]
mod stack;
#[path = "engine/state_table.rs"]
mod state_table;
#[path = "engine/tokenizer.rs"]
mod tokenizer;

pub(crate) use builder::build;
pub use coalesce::Coalesce;
pub use newline::{OffsetMap, normalize};
pub(crate) use stack::StateStack;
pub(crate) use state_table::StateTable;
pub(crate) use tokenizer::Session;
