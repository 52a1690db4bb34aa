//! Grammar-driven syntax highlighting lexer.
//!
//! A grammar is a set of named states, each an ordered list of regex rules.
//! [`Lexer::new`] validates and compiles a [`Grammar`] once; tokenizing a text
//! then walks the rules of the state on top of a stack, emitting typed
//! [`Token`]s that cover the whole input.
//!
//! ```
//! use hilex::{Lexer, RuleDef, TokenType, grammar};
//!
//! let lexer = Lexer::new(grammar!("Strings", {
//!     "root" => [
//!         RuleDef::new("\"").token("StringDelimiter").push("string"),
//!         RuleDef::new(r"\s+").token("Whitespace"),
//!         RuleDef::new(r"\w+").token("Name"),
//!     ],
//!     "string" => [
//!         RuleDef::new("\"").token("StringDelimiter").pop(1),
//!         RuleDef::new(r"\\.").token("StringEscape"),
//!         RuleDef::new(r#"[^"\\]"#).token("String"),
//!     ],
//! }))
//! .unwrap();
//!
//! let text = r#"say "hi""#;
//! let kinds: Vec<(TokenType, &str)> = lexer.tokenise(text).map(|t| (t.kind, t.text(text))).collect();
//! assert_eq!(
//!     kinds,
//!     [
//!         (TokenType::Name, "say"),
//!         (TokenType::Whitespace, " "),
//!         (TokenType::StringDelimiter, "\""),
//!         (TokenType::String, "hi"),
//!         (TokenType::StringDelimiter, "\""),
//!     ]
//! );
//! ```
//!
//! Offsets are byte offsets into the text passed in. Line endings are
//! normalized to `\n` before matching, but reported offsets always refer to
//! the caller's original text.

extern crate self as hilex;

#[macro_use]
mod macros;
mod api;
mod config;
mod engine;
mod error;
mod registry;
mod token;


pub use api::{Lexer, Options, SessionState, Tokens};
pub use config::{GroupDef, Grammar, LexerConfig, PUSH_CURRENT, PatternFlags, RuleDef, StateDef, UsingSelf};
pub use engine::{Coalesce, OffsetMap, normalize};
pub use error::{BuildError, RuleConflict};
pub use registry::LexerRegistry;
pub use token::{Token, TokenType, UnknownTokenType};
