//! Grammar selection.
//!
//! A [`LexerRegistry`] owns a set of built lexers and picks one by name,
//! alias, filename or MIME type. When several lexers match, the one with the
//! highest [`Lexer::priority`] wins; equal priorities keep registration order.
//!
//! The registry is an ordinary value: build it once at startup and hand it
//! (or `Arc`s of its lexers) to whatever needs highlighting.
//!
//! ```
//! use hilex::{Grammar, Lexer, LexerConfig, LexerRegistry, RuleDef};
//!
//! let config = LexerConfig::new("Go").alias("golang").filename("*.go").mime_type("text/x-go");
//! let grammar = Grammar::with_config(config).state("root", vec![RuleDef::new("(?s).").token("Text")]);
//!
//! let mut registry = LexerRegistry::new();
//! registry.register(Lexer::new(grammar).unwrap());
//!
//! assert_eq!(registry.get("golang").unwrap().name(), "Go");
//! assert_eq!(registry.match_filename("src/main.go").unwrap().name(), "Go");
//! assert!(registry.match_mime_type("text/plain").is_none());
//! ```

use crate::Lexer;
use glob::{MatchOptions, Pattern};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Backup and template suffixes stripped before a second filename match.
const IGNORED_SUFFIXES: &[&str] = &[
    // editor backups
    "~", ".bak", ".old", ".orig",
    // dpkg/ucf backups
    ".dpkg-dist", ".dpkg-old", ".ucf-dist", ".ucf-new", ".ucf-old",
    // rpm backups
    ".rpmnew", ".rpmorig", ".rpmsave",
    // build system templates
    ".in",
];

/// Filename globs are matched against base names only.
const MATCH_OPTIONS: MatchOptions =
    MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: false };

#[derive(Debug)]
struct Entry {
    lexer: Arc<Lexer>,
    globs: Vec<Pattern>,
}

#[derive(Debug, Default)]
pub struct LexerRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
}

impl LexerRegistry {
    pub fn new() -> Self {
        LexerRegistry::default()
    }

    /// Add `lexer`. A later registration with the same name or alias shadows
    /// the earlier one for [`LexerRegistry::get`].
    pub fn register(&mut self, lexer: Lexer) -> Arc<Lexer> {
        let idx = self.entries.len();
        let config = lexer.config();

        let mut globs = Vec::with_capacity(config.filenames.len());
        for glob in &config.filenames {
            match Pattern::new(glob) {
                Ok(re) => globs.push(re),
                Err(err) => warn!(lexer = %config.name, glob = %glob, error = %err, "skipping invalid filename glob"),
            }
        }

        self.by_name.insert(config.name.clone(), idx);
        self.by_name.insert(config.name.to_lowercase(), idx);
        for alias in &config.aliases {
            self.by_alias.insert(alias.clone(), idx);
            self.by_alias.insert(alias.to_lowercase(), idx);
        }

        let lexer = Arc::new(lexer);
        self.entries.push(Entry { lexer: Arc::clone(&lexer), globs });
        lexer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lexers(&self) -> impl Iterator<Item = &Arc<Lexer>> {
        self.entries.iter().map(|e| &e.lexer)
    }

    /// Names of all lexers, optionally with their aliases, sorted.
    pub fn names(&self, with_aliases: bool) -> Vec<String> {
        let mut out = Vec::new();
        for entry in &self.entries {
            let config = entry.lexer.config();
            out.push(config.name.clone());
            if with_aliases {
                out.extend(config.aliases.iter().cloned());
            }
        }
        out.sort();
        out
    }

    /// Look up by name, alias, file extension or filename, in that order.
    pub fn get(&self, name: &str) -> Option<Arc<Lexer>> {
        let lower = name.to_lowercase();
        let direct = self
            .by_name
            .get(name)
            .or_else(|| self.by_alias.get(name))
            .or_else(|| self.by_name.get(&lower))
            .or_else(|| self.by_alias.get(&lower));
        if let Some(&idx) = direct {
            return Some(Arc::clone(&self.entries[idx].lexer));
        }

        let by_extension = self.match_index(&format!("filename.{name}"));
        let by_filename = self.match_index(name);
        self.best(by_extension.into_iter().chain(by_filename))
    }

    /// The lexer whose filename globs match the base name of `filename`.
    pub fn match_filename(&self, filename: &str) -> Option<Arc<Lexer>> {
        self.match_index(filename).map(|idx| Arc::clone(&self.entries[idx].lexer))
    }

    pub fn match_mime_type(&self, mime_type: &str) -> Option<Arc<Lexer>> {
        let matches = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.lexer.config().mime_types.iter().any(|m| m == mime_type))
            .map(|(idx, _)| idx);
        self.best(matches)
    }

    fn match_index(&self, filename: &str) -> Option<usize> {
        let base = Path::new(filename).file_name().and_then(|s| s.to_str()).unwrap_or(filename);
        if let Some(idx) = self.best_index(self.glob_matches(base)) {
            return Some(idx);
        }

        let stripped = IGNORED_SUFFIXES.iter().find_map(|suffix| base.strip_suffix(suffix))?;
        if stripped.is_empty() {
            return None;
        }
        self.best_index(self.glob_matches(stripped))
    }

    fn glob_matches<'s>(&'s self, base: &'s str) -> impl Iterator<Item = usize> + 's {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.globs.iter().any(|g| g.matches_with(base, MATCH_OPTIONS)))
            .map(|(idx, _)| idx)
    }

    fn best(&self, candidates: impl Iterator<Item = usize>) -> Option<Arc<Lexer>> {
        self.best_index(candidates).map(|idx| Arc::clone(&self.entries[idx].lexer))
    }

    /// Highest priority first; the earliest candidate wins ties.
    fn best_index(&self, candidates: impl Iterator<Item = usize>) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for idx in candidates {
            let priority = self.entries[idx].lexer.priority();
            match best {
                Some((_, p)) if p >= priority => {}
                _ => best = Some((idx, priority)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grammar, LexerConfig, RuleDef};

    fn lexer(config: LexerConfig) -> Lexer {
        Lexer::new(Grammar::with_config(config).state("root", vec![RuleDef::new("(?s).").token("Text")])).unwrap()
    }

    fn registry() -> LexerRegistry {
        let mut r = LexerRegistry::new();
        r.register(lexer(LexerConfig::new("C").filename("*.c").filename("*.h").mime_type("text/x-c")));
        r.register(lexer(
            LexerConfig::new("C++").alias("cpp").filename("*.cpp").filename("*.h").mime_type("text/x-c").priority(0.5),
        ));
        r.register(lexer(LexerConfig::new("ObjC").alias("objective-c").filename("*.h").filename("*.m").priority(2.0)));
        r.register(lexer(LexerConfig::new("Make").filename("Makefile").filename("*.mk").filename("[Gg]NUmakefile")));
        r
    }

    #[test]
    fn names_are_sorted() {
        let r = registry();
        assert_eq!(r.len(), 4);
        assert_eq!(r.names(false), ["C", "C++", "Make", "ObjC"]);
        assert_eq!(r.names(true), ["C", "C++", "Make", "ObjC", "cpp", "objective-c"]);
    }

    #[test]
    fn get_prefers_names_then_aliases_then_extensions() {
        let r = registry();
        assert_eq!(r.get("C++").unwrap().name(), "C++");
        assert_eq!(r.get("CPP").unwrap().name(), "C++");
        assert_eq!(r.get("objc").unwrap().name(), "ObjC");
        assert_eq!(r.get("c").unwrap().name(), "C");
        assert_eq!(r.get("mk").unwrap().name(), "Make");
        assert_eq!(r.get("Makefile").unwrap().name(), "Make");
        assert!(r.get("rs").is_none());
    }

    #[test]
    fn filename_ties_go_to_the_highest_priority() {
        let r = registry();
        // "*.h" is claimed by C (1), C++ (0.5) and ObjC (2).
        assert_eq!(r.match_filename("include/stdio.h").unwrap().name(), "ObjC");
        assert_eq!(r.match_filename("a.c").unwrap().name(), "C");
        assert_eq!(r.match_filename("GNUmakefile").unwrap().name(), "Make");
        assert!(r.match_filename("a.rs").is_none());
    }

    #[test]
    fn backup_suffixes_are_ignored() {
        let r = registry();
        assert_eq!(r.match_filename("main.c~").unwrap().name(), "C");
        assert_eq!(r.match_filename("Makefile.in").unwrap().name(), "Make");
        assert_eq!(r.match_filename("x.cpp.orig").unwrap().name(), "C++");
        assert!(r.match_filename(".bak").is_none());
    }

    #[test]
    fn mime_types_pick_the_highest_priority() {
        let r = registry();
        assert_eq!(r.match_mime_type("text/x-c").unwrap().name(), "C");
        assert!(r.match_mime_type("text/html").is_none());
    }

    #[test]
    fn glob_classes_and_wildcards_match_base_names() {
        let mut r = LexerRegistry::new();
        r.register(lexer(LexerConfig::new("Shell").filename("[!.]*.sh").filename("?rc").filename("a+b(1).txt")));
        assert_eq!(r.match_filename("dir/run.sh").unwrap().name(), "Shell");
        assert!(r.match_filename(".hidden.sh").is_none());
        assert_eq!(r.match_filename("zrc").unwrap().name(), "Shell");
        assert!(r.match_filename("bashrc").is_none());
        assert_eq!(r.match_filename("a+b(1).txt").unwrap().name(), "Shell");
    }

    #[test]
    fn invalid_globs_are_skipped() {
        let mut r = LexerRegistry::new();
        r.register(lexer(LexerConfig::new("Odd").filename("[abc").filename("*.odd")));
        assert_eq!(r.match_filename("x.odd").unwrap().name(), "Odd");
        assert!(r.match_filename("[abc").is_none());
    }
}
