//! Token types and emitted tokens.
//!
//! `TokenType` is the closed set of highlighting categories a grammar may
//! assign. The set follows the Pygments hierarchy: every type belongs to a
//! top-level category (`Keyword`, `Name`, `String`, ...) and renderers can
//! style either the exact type or fall back to its [`TokenType::parent`].
//!
//! ```text
//! Keyword ──┬─ KeywordConstant
//!           ├─ KeywordDeclaration
//!           └─ ...
//! Literal ──┬─ String ──┬─ StringDouble
//!           │           └─ ...
//!           └─ Number ──┬─ NumberHex
//!                       └─ ...
//! ```
//!
//! Grammars refer to types by name. Names are the variant names
//! (`"NameBuiltin"`, `"StringDouble"`); the `Literal`-prefixed spelling used by
//! many existing grammar files (`"LiteralStringDouble"`) is accepted as well.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

macro_rules! token_types {
    ($($variant:ident => $parent:ident),* $(,)?) => {
        /// Highlighting category of a [`Token`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum TokenType {
            $($variant),*
        }

        impl TokenType {
            /// Every token type, in declaration order.
            pub const ALL: &'static [TokenType] = &[$(TokenType::$variant),*];

            /// Canonical name, identical to the variant name.
            pub fn name(self) -> &'static str {
                match self {
                    $(TokenType::$variant => stringify!($variant)),*
                }
            }

            /// The enclosing category. Top-level categories are their own parent.
            pub fn parent(self) -> TokenType {
                match self {
                    $(TokenType::$variant => TokenType::$parent),*
                }
            }
        }
    };
}

token_types! {
    Text => Text,
    Whitespace => Text,
    Error => Error,
    Other => Other,

    Keyword => Keyword,
    KeywordConstant => Keyword,
    KeywordDeclaration => Keyword,
    KeywordNamespace => Keyword,
    KeywordPseudo => Keyword,
    KeywordReserved => Keyword,
    KeywordType => Keyword,

    Name => Name,
    NameAttribute => Name,
    NameBuiltin => Name,
    NameBuiltinPseudo => NameBuiltin,
    NameClass => Name,
    NameConstant => Name,
    NameDecorator => Name,
    NameEntity => Name,
    NameException => Name,
    NameFunction => Name,
    NameFunctionMagic => NameFunction,
    NameLabel => Name,
    NameNamespace => Name,
    NameOther => Name,
    NameProperty => Name,
    NameTag => Name,
    NameVariable => Name,
    NameVariableClass => NameVariable,
    NameVariableGlobal => NameVariable,
    NameVariableInstance => NameVariable,
    NameVariableMagic => NameVariable,

    Literal => Literal,
    LiteralDate => Literal,

    String => Literal,
    StringAffix => String,
    StringBacktick => String,
    StringChar => String,
    StringDelimiter => String,
    StringDoc => String,
    StringDouble => String,
    StringEscape => String,
    StringHeredoc => String,
    StringInterpol => String,
    StringOther => String,
    StringRegex => String,
    StringSingle => String,
    StringSymbol => String,

    Number => Literal,
    NumberBin => Number,
    NumberFloat => Number,
    NumberHex => Number,
    NumberInteger => Number,
    NumberIntegerLong => NumberInteger,
    NumberOct => Number,

    Operator => Operator,
    OperatorWord => Operator,

    Punctuation => Punctuation,

    Comment => Comment,
    CommentHashbang => Comment,
    CommentMultiline => Comment,
    CommentPreproc => Comment,
    CommentPreprocFile => CommentPreproc,
    CommentSingle => Comment,
    CommentSpecial => Comment,

    Generic => Generic,
    GenericDeleted => Generic,
    GenericEmph => Generic,
    GenericError => Generic,
    GenericHeading => Generic,
    GenericInserted => Generic,
    GenericOutput => Generic,
    GenericPrompt => Generic,
    GenericStrong => Generic,
    GenericSubheading => Generic,
    GenericTraceback => Generic,
    GenericUnderline => Generic,
}

static BY_NAME: Lazy<HashMap<&'static str, TokenType>> =
    Lazy::new(|| TokenType::ALL.iter().map(|&kind| (kind.name(), kind)).collect());

impl TokenType {
    /// True if `self` is `category` or one of its descendants.
    pub fn in_category(self, category: TokenType) -> bool {
        let mut current = self;
        loop {
            if current == category {
                return true;
            }
            let parent = current.parent();
            if parent == current {
                return false;
            }
            current = parent;
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a grammar names a token type outside the enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTokenType(pub String);

impl FromStr for TokenType {
    type Err = UnknownTokenType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(&kind) = BY_NAME.get(s) {
            return Ok(kind);
        }
        // "LiteralStringDouble" -> "StringDouble", "LiteralNumberHex" -> "NumberHex"
        if let Some(rest) = s.strip_prefix("Literal") {
            if let Some(&kind) = BY_NAME.get(rest) {
                return Ok(kind);
            }
        }
        Err(UnknownTokenType(s.to_string()))
    }
}

/// A typed span of the input.
///
/// `start` and `len` are byte offsets into the text passed to
/// [`Lexer::tokenise`](crate::Lexer::tokenise) and always fall on `char`
/// boundaries. They are not character indices; use [`Token::char_range`] when
/// a consumer counts in `char`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenType,
    pub start: usize,
    pub len: usize,
}

impl Token {
    pub fn new(kind: TokenType, start: usize, len: usize) -> Self {
        Token { kind, start, len }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The slice of `text` this token covers.
    pub fn text<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end()).unwrap_or("")
    }

    /// The token's span in `char` indices of `text`. Offsets past the end of
    /// `text` clamp to its length.
    pub fn char_range(&self, text: &str) -> Range<usize> {
        let chars_before = |offset: usize| text.char_indices().take_while(|&(at, _)| at < offset).count();
        chars_before(self.start)..chars_before(self.end())
    }
}
