//! Declarative grammar model.
//!
//! A [`Grammar`] is the in-memory form of a lexer definition: metadata used
//! for selection ([`LexerConfig`]) plus an ordered list of named states, each
//! holding an ordered list of rules. Decoding a grammar from a file format is
//! left to the caller; this module only describes the tree the builder
//! consumes.
//!
//! ```text
//! Grammar
//!  ├─ config: name, aliases, filename globs, MIME types, priority, flags
//!  └─ states
//!      ├─ "root"   [RuleDef, RuleDef, ...]
//!      └─ "string" [RuleDef, ...]
//! ```
//!
//! Rules are built with small chained constructors:
//!
//! ```
//! use hilex::{GroupDef, RuleDef};
//!
//! let open = RuleDef::new("\"").token("StringDelimiter").push("string");
//! let close = RuleDef::new("\"").token("StringDelimiter").pop(1);
//! let decl = RuleDef::new(r"(fn)(\s+)(\w+)").by_groups(vec![
//!     GroupDef::token("Keyword"),
//!     GroupDef::token("Whitespace"),
//!     GroupDef::token("NameFunction"),
//! ]);
//! let common = RuleDef::include("whitespace");
//! # let _ = (open, close, decl, common);
//! ```

/// Push target that re-pushes the state currently on top of the stack.
pub const PUSH_CURRENT: &str = "#push";

bitflags::bitflags! {
    /// Regex flags applied to every pattern of a grammar.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PatternFlags: u8 {
        /// Case-insensitive matching.
        const CASE_INSENSITIVE = 1 << 0;
        /// `.` also matches `\n`.
        const DOT_ALL          = 1 << 1;
        /// `^`/`$` only match at the ends of the text instead of at line breaks.
        const NOT_MULTILINE    = 1 << 2;
    }
}

/// Grammar metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerConfig {
    pub name: String,
    pub aliases: Vec<String>,
    /// Filename globs such as `*.rs` or `Makefile`.
    pub filenames: Vec<String>,
    pub mime_types: Vec<String>,
    /// Tie-break between grammars matching the same file. Zero means "unset"
    /// and is treated as 1; higher wins.
    pub priority: f32,
    pub flags: PatternFlags,
}

impl LexerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        LexerConfig { name: name.into(), ..LexerConfig::default() }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn filename(mut self, glob: impl Into<String>) -> Self {
        self.filenames.push(glob.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_types.push(mime.into());
        self
    }

    pub fn priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    pub fn flags(mut self, flags: PatternFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Priority with the "unset means 1" rule applied.
    pub fn effective_priority(&self) -> f32 {
        if self.priority == 0.0 { 1.0 } else { self.priority }
    }
}

/// A complete grammar: metadata plus states in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grammar {
    pub config: LexerConfig,
    pub states: Vec<StateDef>,
}

impl Grammar {
    pub fn new(name: impl Into<String>) -> Self {
        Grammar { config: LexerConfig::new(name), states: Vec::new() }
    }

    pub fn with_config(config: LexerConfig) -> Self {
        Grammar { config, states: Vec::new() }
    }

    /// Append a state.
    pub fn state(mut self, name: impl Into<String>, rules: Vec<RuleDef>) -> Self {
        self.states.push(StateDef { name: name.into(), rules });
        self
    }
}

/// A named, ordered list of rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateDef {
    pub name: String,
    pub rules: Vec<RuleDef>,
}

/// `using_self` target: a named state, or the state on top of the stack when
/// `state` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsingSelf {
    pub state: Option<String>,
}

/// Per-capture-group action of a `by_groups` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupDef {
    Token(String),
    UsingSelf(UsingSelf),
}

impl GroupDef {
    pub fn token(kind: impl Into<String>) -> Self {
        GroupDef::Token(kind.into())
    }

    pub fn using_self(state: impl Into<String>) -> Self {
        GroupDef::UsingSelf(UsingSelf { state: Some(state.into()) })
    }

    pub fn using_current() -> Self {
        GroupDef::UsingSelf(UsingSelf { state: None })
    }
}

/// One rule as written in a grammar.
///
/// All directives are optional; the builder checks that the combination is
/// meaningful (see `BuildError::ConflictingRuleAction`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleDef {
    pub pattern: String,
    /// Token type name, e.g. `"Keyword"`.
    pub token: Option<String>,
    /// State to push; [`PUSH_CURRENT`] re-pushes the current state.
    pub push: Option<String>,
    /// Number of states to pop. Zero is read as one.
    pub pop: Option<usize>,
    pub include: Option<String>,
    pub combined: Option<Vec<String>>,
    pub by_groups: Option<Vec<GroupDef>>,
    pub using_self: Option<UsingSelf>,
}

impl RuleDef {
    pub fn new(pattern: impl Into<String>) -> Self {
        RuleDef { pattern: pattern.into(), ..RuleDef::default() }
    }

    /// A pattern-less rule inlining the rules of `state`.
    pub fn include(state: impl Into<String>) -> Self {
        RuleDef { include: Some(state.into()), ..RuleDef::default() }
    }

    pub fn token(mut self, kind: impl Into<String>) -> Self {
        self.token = Some(kind.into());
        self
    }

    pub fn push(mut self, state: impl Into<String>) -> Self {
        self.push = Some(state.into());
        self
    }

    pub fn pop(mut self, depth: usize) -> Self {
        self.pop = Some(depth);
        self
    }

    pub fn combined<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.combined = Some(states.into_iter().map(Into::into).collect());
        self
    }

    pub fn by_groups(mut self, groups: Vec<GroupDef>) -> Self {
        self.by_groups = Some(groups);
        self
    }

    pub fn using_self(mut self, state: impl Into<String>) -> Self {
        self.using_self = Some(UsingSelf { state: Some(state.into()) });
        self
    }

    pub fn using_current(mut self) -> Self {
        self.using_self = Some(UsingSelf { state: None });
        self
    }
}
