use crate::engine::{self, Coalesce, OffsetMap, Session, StateStack, StateTable, normalize};
use crate::{BuildError, Grammar, LexerConfig, Token};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use tracing::{trace, warn};

/// Options for a single tokenization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Merge adjacent tokens of the same type. On by default.
    pub coalesce: bool,
    /// State pushed on top of `root` before the first token. Unknown names
    /// are ignored.
    pub state: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options { coalesce: true, state: None }
    }
}

/// A compiled grammar, ready to tokenize any number of texts.
///
/// Building validates the grammar once; tokenizing never fails. A `Lexer` is
/// immutable and can be shared between threads.
///
/// # Example
/// ```
/// use hilex::{Lexer, RuleDef, Token, TokenType, grammar};
///
/// let lexer = Lexer::new(grammar!("Digits", {
///     "root" => [RuleDef::new("[0-9]+").token("Number"), RuleDef::new(".").token("Error")],
/// }))
/// .unwrap();
///
/// let tokens: Vec<Token> = lexer.tokenise("12a").collect();
/// assert_eq!(tokens, [Token::new(TokenType::Number, 0, 2), Token::new(TokenType::Error, 2, 1)]);
/// ```
#[derive(Debug)]
pub struct Lexer {
    config: LexerConfig,
    table: StateTable,
}

impl Lexer {
    /// Compile `grammar`.
    pub fn new(grammar: Grammar) -> Result<Self, BuildError> {
        let table = engine::build(&grammar)?;
        trace!(lexer = %grammar.config.name, "compiled rules:\n{table}");
        Ok(Lexer { config: grammar.config, table })
    }

    pub fn config(&self) -> &LexerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Selection priority; an unset (zero) priority reads as 1.
    pub fn priority(&self) -> f32 {
        self.config.effective_priority()
    }

    /// Names of all states, including synthesized combined states.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.table.names()
    }

    /// Tokenize `text` from the `root` state with default [`Options`].
    pub fn tokenise<'a>(&'a self, text: &'a str) -> Tokens<'a> {
        self.tokenise_with(text, &Options::default())
    }

    pub fn tokenise_with<'a>(&'a self, text: &'a str, options: &Options) -> Tokens<'a> {
        let root = self.table.root();
        let mut stack = StateStack::new(root);
        if let Some(name) = options.state.as_deref() {
            match self.table.lookup(name) {
                Some(id) if id != root => stack.push(id),
                Some(_) => {}
                None => warn!(lexer = %self.config.name, state = %name, "unknown initial state, starting at root"),
            }
        }
        Tokens::start(self, text, stack, 0, Vec::new(), options.coalesce)
    }

    /// Continue a run captured with [`Tokens::state`].
    ///
    /// Over the same text this yields exactly the tokens the original run had
    /// not yet returned. Over edited text the result is best-effort: the
    /// saved stack and pending tokens are reused as they are.
    pub fn tokenise_at<'a>(&'a self, text: &'a str, state: &SessionState) -> Tokens<'a> {
        let root = self.table.root();
        let stack = StateStack::from_entries(root, state.stack.iter().filter_map(|name| self.table.lookup(name)));
        Tokens::start(self, text, stack, state.consumed, state.pending.clone(), state.coalesce)
    }
}

impl fmt::Display for Lexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lexer {}", self.config.name)?;
        write!(f, "{}", self.table)
    }
}

/// Snapshot of a tokenization run, for [`Lexer::tokenise_at`].
///
/// Holds the state stack (by state name), the original-text offset the
/// tokenizer had consumed up to, and every token already produced but not yet
/// returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    stack: Vec<String>,
    consumed: usize,
    pending: Vec<Token>,
    coalesce: bool,
}

impl SessionState {
    /// Offset into the original text up to which tokens have been produced.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Offset up to which tokens have actually been returned.
    pub fn returned(&self) -> usize {
        self.pending.first().map_or(self.consumed, |t| t.start)
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }
}

/// Tokens at normalized offsets, translated back to the caller's text.
#[derive(Debug)]
pub(crate) struct Adjusted<'a> {
    lexer: &'a Lexer,
    text: Cow<'a, str>,
    offsets: OffsetMap,
    session: Session<'a>,
    /// Tokens restored from a [`SessionState`], already in original offsets.
    replay: VecDeque<Token>,
}

impl Adjusted<'_> {
    fn to_original(&self, tok: Token) -> Token {
        if self.offsets.is_identity() {
            return tok;
        }
        let start = self.offsets.to_original(tok.start);
        let end = self.offsets.to_original(tok.end());
        Token::new(tok.kind, start, end - start)
    }
}

impl Iterator for Adjusted<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(tok) = self.replay.pop_front() {
            return Some(tok);
        }
        let tok = self.session.next_token(&self.text)?;
        Some(self.to_original(tok))
    }
}

/// Lazy token stream returned by [`Lexer::tokenise`].
///
/// Tokens are ordered, never overlap and together cover the whole input.
#[derive(Debug)]
pub struct Tokens<'a> {
    stream: Coalesce<Adjusted<'a>>,
    coalesce: bool,
}

impl<'a> Tokens<'a> {
    fn start(
        lexer: &'a Lexer,
        text: &'a str,
        stack: StateStack,
        consumed: usize,
        replay: Vec<Token>,
        coalesce: bool,
    ) -> Self {
        let (text, offsets) = normalize(text);
        let mut pos = offsets.to_normalized(consumed).min(text.len());
        while !text.is_char_boundary(pos) {
            pos -= 1;
        }

        let session = Session::new(&lexer.table, stack, pos, text.len());
        let inner = Adjusted { lexer, text, offsets, session, replay: replay.into() };
        let stream = if coalesce { Coalesce::new(inner) } else { Coalesce::passthrough(inner) };
        Tokens { stream, coalesce }
    }

    /// Capture the run so it can be continued with [`Lexer::tokenise_at`].
    pub fn state(&self) -> SessionState {
        let inner = self.stream.get_ref();
        let table = &inner.lexer.table;

        let stack = inner.session.stack().entries().iter().map(|&id| table.state(id).name.clone()).collect();

        let mut pending: Vec<Token> = self.stream.pending().copied().into_iter().collect();
        pending.extend(inner.replay.iter().copied());
        pending.extend(inner.session.queued().map(|&tok| inner.to_original(tok)));

        SessionState {
            stack,
            consumed: inner.offsets.to_original(inner.session.position()),
            pending,
            coalesce: self.coalesce,
        }
    }

    /// The text being tokenized, after line-ending normalization.
    pub fn normalized_text(&self) -> &str {
        &self.stream.get_ref().text
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.stream.next()
    }
}
