//! Anchored pattern matching.
//!
//! Every rule pattern is compiled once into a `regex-automata` meta regex and
//! always searched in anchored mode: a match must start exactly at the scan
//! position. The search is given the whole text with a restricted span, so
//! `^`, `$` and `\b` still see the characters around the span.
//!
//! The engine is automata-based, so a search is linear in the scanned text
//! and cannot backtrack catastrophically. The per-pattern budget is therefore
//! a size limit on the compiled automaton rather than a wall-clock timeout; a
//! pattern that exceeds it fails the build.

use crate::config::PatternFlags;
use regex_automata::meta::{self, Regex};
use regex_automata::util::captures::Captures;
use regex_automata::util::syntax;
use regex_automata::{Anchored, Input};
use std::ops::Range;

/// Upper bound on the compiled NFA of a single pattern.
const NFA_SIZE_LIMIT: usize = 4 * (1 << 20);

#[derive(Debug, Clone)]
pub(crate) struct Matcher {
    regex: Regex,
}

impl Matcher {
    pub(crate) fn compile(pattern: &str, flags: PatternFlags) -> Result<Self, String> {
        let syntax = syntax::Config::new()
            .multi_line(!flags.contains(PatternFlags::NOT_MULTILINE))
            .case_insensitive(flags.contains(PatternFlags::CASE_INSENSITIVE))
            .dot_matches_new_line(flags.contains(PatternFlags::DOT_ALL));
        let config = meta::Config::new().nfa_size_limit(Some(NFA_SIZE_LIMIT));

        let regex = Regex::builder().syntax(syntax).configure(config).build(pattern).map_err(|err| err.to_string())?;
        Ok(Matcher { regex })
    }

    /// End offset of the match starting exactly at `at`, searching no further
    /// than `end`.
    pub(crate) fn match_at(&self, text: &str, at: usize, end: usize) -> Option<usize> {
        let input = Input::new(text).range(at..end).anchored(Anchored::Yes);
        self.regex.search(&input).map(|m| m.end())
    }

    /// Like [`Matcher::match_at`], also returning the capture groups.
    pub(crate) fn captures_at(&self, text: &str, at: usize, end: usize) -> Option<Groups> {
        let input = Input::new(text).range(at..end).anchored(Anchored::Yes);
        let mut caps = self.regex.create_captures();
        self.regex.search_captures(&input, &mut caps);
        let whole = caps.get_match()?;
        Some(Groups { end: whole.end(), caps })
    }
}

/// Capture groups of a successful match.
pub(crate) struct Groups {
    end: usize,
    caps: Captures,
}

impl Groups {
    pub(crate) fn end(&self) -> usize {
        self.end
    }

    /// Span of explicit group `index` (1-based); `None` if it did not participate.
    pub(crate) fn group(&self, index: usize) -> Option<Range<usize>> {
        self.caps.get_group(index).map(|span| span.start..span.end)
    }
}
