//! Line-ending normalization and offset remapping.
//!
//! Grammars are written against `\n` line endings. Before tokenizing, every
//! `\r\n` pair and every lone `\r` is rewritten to a single `\n`. Tokens are
//! produced at offsets into the normalized text, so each offset is translated
//! back through an [`OffsetMap`] before the caller sees it.
//!
//! A lone `\r` keeps its length, so only `\r\n` pairs shift later offsets. A
//! breakpoint is recorded right after the `\n` that replaced a pair, which is
//! where the cumulative delta grows:
//!
//! ```text
//! original    a \r \n b      offsets 0 1 2 3
//! normalized  a \n b         offsets 0 1 2
//! breakpoints [(2, +1)]
//!
//! to_original(0) = 0   'a'
//! to_original(1) = 1   '\n' maps to the start of "\r\n"
//! to_original(2) = 3   'b'
//! ```
//!
//! Because the produced `\n` maps to the `\r`, a token covering it covers both
//! original bytes and the translated tokens still tile the original text.

use std::borrow::Cow;

/// Translation table from normalized offsets to original offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    /// `(normalized_offset, cumulative_delta)`, sorted by offset.
    breakpoints: Vec<(usize, usize)>,
}

impl OffsetMap {
    /// Original offset of `normalized`.
    pub fn to_original(&self, normalized: usize) -> usize {
        let idx = self.breakpoints.partition_point(|&(at, _)| at <= normalized);
        match idx {
            0 => normalized,
            _ => normalized + self.breakpoints[idx - 1].1,
        }
    }

    /// Normalized offset of `original`. Exact for every offset produced by
    /// [`OffsetMap::to_original`].
    pub fn to_normalized(&self, original: usize) -> usize {
        let idx = self.breakpoints.partition_point(|&(at, delta)| at + delta <= original);
        match idx {
            0 => original,
            _ => original - self.breakpoints[idx - 1].1,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.breakpoints.is_empty()
    }
}

/// Rewrite `\r\n` and `\r` to `\n`. Text without `\r` is borrowed unchanged.
pub fn normalize(text: &str) -> (Cow<'_, str>, OffsetMap) {
    if !text.contains('\r') {
        return (Cow::Borrowed(text), OffsetMap::default());
    }

    let mut out = String::with_capacity(text.len());
    let mut map = OffsetMap::default();
    let mut delta = 0;
    let mut rest = text;

    while let Some(idx) = rest.find('\r') {
        out.push_str(&rest[..idx]);
        out.push('\n');
        rest = &rest[idx + 1..];
        if let Some(after) = rest.strip_prefix('\n') {
            rest = after;
            delta += 1;
            map.breakpoints.push((out.len(), delta));
        }
    }
    out.push_str(rest);

    (Cow::Owned(out), map)
}
