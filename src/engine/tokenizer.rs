//! The tokenizing state machine.
//!
//! A [`Session`] walks a [`StateTable`] over one span of normalized text. Each
//! step looks at the state on top of the stack and tries its rules in order;
//! the first rule whose pattern matches *at the current position* wins:
//!
//! ```text
//! pos ─┐
//!      v
//! text: a " b c " d            stack: [root]
//!
//! root:   "\""  StringDelimiter push(string)   <- matches, stack [root, string]
//!         "."   Text
//! string: "\""  StringDelimiter pop(1)
//!         "."   String
//! ```
//!
//! Rule outcomes:
//!
//! - **match, non-empty**: emit tokens for the matched span, apply the stack
//!   transition, advance.
//! - **match, empty, stack changed**: a default transition; no token, no
//!   advance. Bounded by `MAX_EMPTY_TRANSITIONS` per position.
//! - **match, empty, stack unchanged**: no progress; fall back.
//! - **no rule matched**: fall back.
//!
//! The fallback emits one `Error` token for the next character and advances
//! past it, so a session always terminates and the emitted tokens tile the
//! span.
//!
//! `using_self` sub-tokenizes a matched span with a nested session over the
//! same text, restricted to that span. Nested tokens already carry absolute
//! offsets and are queued in order with the outer tokens.

use super::matcher::Groups;
use super::stack::StateStack;
use super::state_table::{Emit, GroupEmit, Rule, StateId, StateTable, Transition};
use crate::{Token, TokenType};
use std::collections::VecDeque;
use tracing::{trace, warn};

/// Deepest `using_self` nesting; deeper spans are reported as one `Error` token.
const MAX_NESTING: usize = 16;
/// Consecutive zero-width state transitions allowed at one position.
const MAX_EMPTY_TRANSITIONS: usize = 32;

enum Step {
    NoMatch,
    Advanced,
    Stalled,
}

#[derive(Debug)]
pub(crate) struct Session<'t> {
    table: &'t StateTable,
    stack: StateStack,
    pos: usize,
    end: usize,
    depth: usize,
    /// Tokens produced by the last step but not yet handed out.
    queue: VecDeque<Token>,
    empty_transitions: usize,
}

impl<'t> Session<'t> {
    /// A session over `pos..end` starting with `stack`.
    pub(crate) fn new(table: &'t StateTable, stack: StateStack, pos: usize, end: usize) -> Self {
        Session { table, stack, pos, end, depth: 0, queue: VecDeque::new(), empty_transitions: 0 }
    }

    /// Offset up to which the text has been consumed (queued tokens lie before it).
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn stack(&self) -> &StateStack {
        &self.stack
    }

    pub(crate) fn queued(&self) -> impl Iterator<Item = &Token> {
        self.queue.iter()
    }

    pub(crate) fn next_token(&mut self, text: &str) -> Option<Token> {
        loop {
            if let Some(tok) = self.queue.pop_front() {
                return Some(tok);
            }
            if self.pos >= self.end {
                return None;
            }
            self.step(text);
        }
    }

    fn step(&mut self, text: &str) {
        let table = self.table;
        let current = self.stack.top();

        for rule in &table.state(current).rules {
            match self.apply(text, rule, current) {
                Step::NoMatch => continue,
                Step::Advanced => return,
                Step::Stalled => break,
            }
        }
        self.emit_error(text);
    }

    fn apply(&mut self, text: &str, rule: &Rule, current: StateId) -> Step {
        let start = self.pos;
        let (end, groups) = if matches!(rule.emit, Emit::ByGroups(_)) {
            match rule.matcher.captures_at(text, start, self.end) {
                Some(groups) => (groups.end(), Some(groups)),
                None => return Step::NoMatch,
            }
        } else {
            match rule.matcher.match_at(text, start, self.end) {
                Some(end) => (end, None),
                None => return Step::NoMatch,
            }
        };

        if end == start {
            if self.empty_transitions < MAX_EMPTY_TRANSITIONS && self.transition(rule.transition, current) {
                self.empty_transitions += 1;
                return Step::Advanced;
            }
            if self.empty_transitions >= MAX_EMPTY_TRANSITIONS {
                warn!(pos = start, "too many empty transitions at one position");
            }
            return Step::Stalled;
        }

        self.emit(text, rule, current, start..end, groups.as_ref());
        self.transition(rule.transition, current);
        self.pos = end;
        self.empty_transitions = 0;
        Step::Advanced
    }

    /// Apply a stack transition. Returns whether the stack changed.
    fn transition(&mut self, transition: Transition, current: StateId) -> bool {
        match transition {
            Transition::Stay => false,
            Transition::Push(target) => {
                self.stack.push(target.resolve(current));
                true
            }
            Transition::Pop(depth) => self.stack.pop(depth) > 0,
        }
    }

    fn emit(
        &mut self,
        text: &str,
        rule: &Rule,
        current: StateId,
        span: std::ops::Range<usize>,
        groups: Option<&Groups>,
    ) {
        match &rule.emit {
            Emit::Nothing => self.push_token(TokenType::Text, span.start, span.end),
            Emit::Token(kind) => self.push_token(*kind, span.start, span.end),
            Emit::UsingSelf(target) => self.sub_tokenize(text, target.resolve(current), span.start, span.end),
            Emit::ByGroups(actions) => {
                let mut cursor = span.start;
                if let Some(groups) = groups {
                    for (idx, action) in actions.iter().enumerate() {
                        let Some(group) = groups.group(idx + 1) else { continue };
                        let from = group.start.max(cursor);
                        if from >= group.end {
                            continue;
                        }
                        // uncaptured text between groups
                        self.push_token(TokenType::Text, cursor, from);
                        match action {
                            GroupEmit::Token(kind) => self.push_token(*kind, from, group.end),
                            GroupEmit::UsingSelf(target) => {
                                self.sub_tokenize(text, target.resolve(current), from, group.end)
                            }
                        }
                        cursor = group.end;
                    }
                }
                self.push_token(TokenType::Text, cursor, span.end);
            }
        }
    }

    /// Queue a token for `start..end`; empty spans are dropped.
    fn push_token(&mut self, kind: TokenType, start: usize, end: usize) {
        if end > start {
            self.queue.push_back(Token::new(kind, start, end - start));
        }
    }

    fn sub_tokenize(&mut self, text: &str, state: StateId, start: usize, end: usize) {
        if self.depth >= MAX_NESTING {
            warn!(depth = self.depth, start, end, "using-self nesting limit reached");
            self.push_token(TokenType::Error, start, end);
            return;
        }

        let mut nested = Session::new(self.table, StateStack::new(state), start, end);
        nested.depth = self.depth + 1;
        while let Some(tok) = nested.next_token(text) {
            self.queue.push_back(tok);
        }
    }

    fn emit_error(&mut self, text: &str) {
        let len = text[self.pos..].chars().next().map_or(1, char::len_utf8);
        trace!(pos = self.pos, state = %self.table.state(self.stack.top()).name, "no rule matched");
        self.queue.push_back(Token::new(TokenType::Error, self.pos, len));
        self.pos += len;
        self.empty_transitions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupDef, PUSH_CURRENT, RuleDef};
    use crate::engine::builder::build;
    use crate::{Grammar, TokenType::*};
    use pretty_assertions::assert_eq;

    fn run(grammar: Grammar, text: &str) -> Vec<(TokenType, usize, usize)> {
        let table = build(&grammar).unwrap();
        let mut session = Session::new(&table, StateStack::new(table.root()), 0, text.len());
        let mut out = Vec::new();
        while let Some(tok) = session.next_token(text) {
            assert!(session.stack().len() >= 1);
            out.push((tok.kind, tok.start, tok.len));
        }
        out
    }

    #[test]
    fn first_matching_rule_wins() {
        let g = Grammar::new("t").state(
            "root",
            vec![
                RuleDef::new("[a-z]+").token("Name"),
                RuleDef::new("let").token("Keyword"),
                RuleDef::new(" ").token("Whitespace"),
            ],
        );
        assert_eq!(run(g, "let x"), [(Name, 0, 3), (Whitespace, 3, 1), (Name, 4, 1)]);
    }

    #[test]
    fn unmatched_characters_become_single_errors() {
        let g = Grammar::new("t").state("root", vec![RuleDef::new("a").token("Text")]);
        assert_eq!(run(g, "aé!a"), [(Text, 0, 1), (Error, 1, 2), (Error, 3, 1), (Text, 4, 1)]);
    }

    #[test]
    fn push_current_and_deep_pops() {
        let g = Grammar::new("t")
            .state(
                "root",
                vec![RuleDef::new(r"\(").token("Punctuation").push("paren"), RuleDef::new(".").token("Text")],
            )
            .state(
                "paren",
                vec![
                    RuleDef::new(r"\(").token("Punctuation").push(PUSH_CURRENT),
                    RuleDef::new(r"\]").token("Punctuation").pop(99),
                    RuleDef::new(r"\)").token("Punctuation").pop(1),
                    RuleDef::new(".").token("Name"),
                ],
            );
        assert_eq!(
            run(g, "((a]b"),
            [(Punctuation, 0, 1), (Punctuation, 1, 1), (Name, 2, 1), (Punctuation, 3, 1), (Text, 4, 1)]
        );
    }

    #[test]
    fn empty_match_without_transition_falls_back() {
        let g =
            Grammar::new("t").state("root", vec![RuleDef::new("x*").token("Name"), RuleDef::new("y").token("Text")]);
        // "y" is never tried: the empty match at 0 stalls the step.
        assert_eq!(run(g, "xy"), [(Name, 0, 1), (Error, 1, 1)]);
    }

    #[test]
    fn empty_pop_on_floor_is_not_progress() {
        let g = Grammar::new("t").state("root", vec![RuleDef::new("").pop(1)]);
        assert_eq!(run(g, "ab"), [(Error, 0, 1), (Error, 1, 1)]);
    }

    #[test]
    fn default_transitions_switch_state() {
        let g = Grammar::new("t")
            .state("root", vec![RuleDef::new("a").token("Keyword"), RuleDef::new("").push("other")])
            .state("other", vec![RuleDef::new("b").token("Name"), RuleDef::new("").pop(1)]);
        assert_eq!(run(g, "ab"), [(Keyword, 0, 1), (Name, 1, 1)]);
    }

    #[test]
    fn empty_transition_ping_pong_is_bounded() {
        let g = Grammar::new("t")
            .state("root", vec![RuleDef::new("").push("a")])
            .state("a", vec![RuleDef::new("").pop(1)]);
        assert_eq!(run(g, "zz"), [(Error, 0, 1), (Error, 1, 1)]);
    }

    #[test]
    fn by_groups_tiles_the_match() {
        let g = Grammar::new("t").state(
            "root",
            vec![
                RuleDef::new(r"(fn)\s+(\w+)(\()?").by_groups(vec![
                    GroupDef::token("Keyword"),
                    GroupDef::token("NameFunction"),
                    GroupDef::token("Punctuation"),
                ]),
                RuleDef::new(".").token("Other"),
            ],
        );
        assert_eq!(run(g, "fn  go;"), [(Keyword, 0, 2), (Text, 2, 2), (NameFunction, 4, 2), (Other, 6, 1)]);
    }

    #[test]
    fn by_groups_can_delegate_to_a_state() {
        let g = Grammar::new("t")
            .state(
                "root",
                vec![
                    RuleDef::new(r"(\$)\{([^}]*)\}")
                        .by_groups(vec![GroupDef::token("Punctuation"), GroupDef::using_self("expr")]),
                    RuleDef::new(".").token("String"),
                ],
            )
            .state("expr", vec![RuleDef::new("[0-9]+").token("Number"), RuleDef::new(r"\+").token("Operator")]);
        assert_eq!(
            run(g, "${1+2}x"),
            [
                (Punctuation, 0, 1),
                (Text, 1, 1),
                (Number, 2, 1),
                (Operator, 3, 1),
                (Number, 4, 1),
                (Text, 5, 1),
                (String, 6, 1),
            ]
        );
    }

    #[test]
    fn using_self_sub_tokenizes_the_span() {
        let g = Grammar::new("t")
            .state("root", vec![RuleDef::new(r"<[^>]*>").using_self("tag"), RuleDef::new(".").token("Text")])
            .state(
                "tag",
                vec![RuleDef::new("[<>]").token("Punctuation"), RuleDef::new("[a-z]+").token("NameTag")],
            );
        assert_eq!(run(g, "<b>!"), [(Punctuation, 0, 1), (NameTag, 1, 1), (Punctuation, 2, 1), (Text, 3, 1)]);
    }

    #[test]
    fn runaway_using_self_is_cut_off() {
        let g = Grammar::new("t").state("root", vec![RuleDef::new("a+").using_current()]);
        assert_eq!(run(g, "aa"), [(Error, 0, 2)]);
    }

    #[test]
    fn rule_without_emitter_reports_text() {
        let g = Grammar::new("t")
            .state("root", vec![RuleDef::new("#").push("comment")])
            .state("comment", vec![RuleDef::new("\n").pop(1), RuleDef::new(".").token("Comment")]);
        assert_eq!(run(g, "#x\n"), [(Text, 0, 1), (Comment, 1, 1), (Text, 2, 1)]);
    }
}
