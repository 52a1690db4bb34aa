//! Merging of adjacent same-type tokens.
//!
//! Grammars often emit many tiny tokens of the same type (one per character in
//! a string body, say). Renderers only care about style changes, so the
//! coalescer buffers one token and extends it while the next token has the
//! same type and starts exactly where the buffer ends.
//!
//! ```text
//! in:   String(2,1) String(3,1) StringDelimiter(4,1)
//! out:  String(2,2)             StringDelimiter(4,1)
//! ```

use crate::Token;

/// Token iterator adapter holding at most one pending token.
#[derive(Debug, Clone)]
pub struct Coalesce<I> {
    inner: I,
    pending: Option<Token>,
    enabled: bool,
}

impl<I: Iterator<Item = Token>> Coalesce<I> {
    pub fn new(inner: I) -> Self {
        Coalesce { inner, pending: None, enabled: true }
    }

    /// An adapter that forwards tokens unchanged.
    pub fn passthrough(inner: I) -> Self {
        Coalesce { inner, pending: None, enabled: false }
    }

    /// The token taken from the inner iterator but not yet returned.
    pub fn pending(&self) -> Option<&Token> {
        self.pending.as_ref()
    }

    pub fn get_ref(&self) -> &I {
        &self.inner
    }
}

impl<I: Iterator<Item = Token>> Iterator for Coalesce<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if !self.enabled {
            return self.pending.take().or_else(|| self.inner.next());
        }

        loop {
            let Some(tok) = self.inner.next() else {
                return self.pending.take();
            };
            if let Some(buf) = self.pending.as_mut() {
                if buf.kind == tok.kind && buf.end() == tok.start {
                    buf.len += tok.len;
                    continue;
                }
            }
            if let Some(out) = self.pending.replace(tok) {
                return Some(out);
            }
        }
    }
}
