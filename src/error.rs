use std::fmt;
use thiserror::Error;

/// Why a grammar could not be turned into a [`Lexer`](crate::Lexer).
///
/// A failed build never yields a partially usable lexer; fix the grammar and
/// build again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no `root` state is defined")]
    MissingRootState,

    #[error("state `{0}` is defined more than once")]
    DuplicateState(String),

    #[error("the following states are referred to from rules but aren't defined: {}", .names.join(", "))]
    DanglingStateReference { names: Vec<String> },

    #[error("rule {index} of state `{state}` {conflict}")]
    ConflictingRuleAction { state: String, index: usize, conflict: RuleConflict },

    #[error("rule {index} of state `{state}` has an invalid pattern `{pattern}`: {message}")]
    InvalidPattern { state: String, index: usize, pattern: String, message: String },

    #[error("rule {index} of state `{state}` uses unknown token type `{name}`")]
    UnknownTokenType { state: String, index: usize, name: String },

    #[error("include cycle: {}", .chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },
}

/// The specific combination of directives that made a rule invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleConflict {
    Empty,
    PushAndPop,
    TokenAndInclude,
    TokenAndByGroups,
    IncludeAndByGroups,
    IncludeAndTransition,
    IncludeAndUsingSelf,
    CombinedAndDirective,
    UsingSelfAndEmitter,
}

impl fmt::Display for RuleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RuleConflict::Empty => "has no pattern, no include, no push and no pop",
            RuleConflict::PushAndPop => "has both a push and a pop",
            RuleConflict::TokenAndInclude => "has both a token and an include",
            RuleConflict::TokenAndByGroups => "has both a token and a by-groups",
            RuleConflict::IncludeAndByGroups => "has both an include and a by-groups",
            RuleConflict::IncludeAndTransition => "has both an include and a push or pop",
            RuleConflict::IncludeAndUsingSelf => "has both an include and a using-self",
            RuleConflict::CombinedAndDirective => "has both a combined and either a push, pop or include",
            RuleConflict::UsingSelfAndEmitter => "has a using-self together with a token or by-groups",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offenders() {
        let err = BuildError::DanglingStateReference { names: vec!["string".into(), "comment".into()] };
        assert_eq!(
            err.to_string(),
            "the following states are referred to from rules but aren't defined: string, comment"
        );

        let err = BuildError::ConflictingRuleAction {
            state: "root".into(),
            index: 2,
            conflict: RuleConflict::PushAndPop,
        };
        assert_eq!(err.to_string(), "rule 2 of state `root` has both a push and a pop");

        let err = BuildError::IncludeCycle { chain: vec!["a".into(), "b".into(), "a".into()] };
        assert_eq!(err.to_string(), "include cycle: a -> b -> a");
    }
}
