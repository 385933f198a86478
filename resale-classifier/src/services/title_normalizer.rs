//! Title normalization and signatures
//!
//! Titles and catalog terms pass through the same normalization so that
//! keyword matching and pattern signatures agree on what "the same title"
//! means:
//! - full-width ASCII (U+FF01..U+FF5E) and the ideographic space are folded
//! - Unicode lowercase
//! - anything that is not alphanumeric becomes a separator
//! - runs of separators collapse to one space

use sha2::{Digest, Sha256};

const FULLWIDTH_START: u32 = 0xFF01;
const FULLWIDTH_END: u32 = 0xFF5E;
const FULLWIDTH_OFFSET: u32 = 0xFEE0;
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

fn fold_fullwidth(c: char) -> char {
    if c == IDEOGRAPHIC_SPACE {
        return ' ';
    }
    let code = c as u32;
    if (FULLWIDTH_START..=FULLWIDTH_END).contains(&code) {
        char::from_u32(code - FULLWIDTH_OFFSET).unwrap_or(c)
    } else {
        c
    }
}

/// Normalize free text to space-separated lowercase alphanumeric tokens
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for c in input.chars().map(fold_fullwidth).flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Signature of a title: SHA-256 hex of its normalized form
///
/// Titles differing only in case, width or punctuation share a signature.
pub fn signature(title: &str) -> String {
    format!("{:x}", Sha256::digest(normalize_text(title).as_bytes()))
}

/// A normalized title prepared for repeated term matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTitle {
    pub text: String,
    pub tokens: Vec<String>,
    /// `text` with a leading and trailing space, for whole-token matching
    padded: String,
}

impl NormalizedTitle {
    pub fn new(title: &str) -> Self {
        let text = normalize_text(title);
        let tokens = text.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect();
        let padded = format!(" {} ", text);
        Self {
            text,
            tokens,
            padded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Match an already-normalized term
    ///
    /// ASCII terms must align with token boundaries ("eos" does not match
    /// "geos"). Other scripts are matched as substrings since Japanese
    /// titles are not space-delimited.
    pub fn contains_term(&self, term: &str) -> bool {
        if term.is_empty() {
            return false;
        }
        if term.is_ascii() {
            self.padded.contains(&format!(" {} ", term))
        } else {
            self.text.contains(term)
        }
    }
}
