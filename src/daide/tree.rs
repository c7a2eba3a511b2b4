use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Deepest list nesting kept in a parsed tree. Parentheses beyond it are
/// dropped and their contents flattened into the deepest kept list.
pub const MAX_DAIDE_DEPTH: usize = 500;

/// A DAIDE expression: a mnemonic or a parenthesized sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaideTree {
    Token(String),
    List(Vec<DaideTree>),
}

impl DaideTree {
    pub fn as_token(&self) -> Option<&str> {
        match self {
            DaideTree::Token(token) => Some(token),
            DaideTree::List(_) => None,
        }
    }

    pub fn is_token(&self, expected: &str) -> bool {
        self.as_token() == Some(expected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DaideDiagnostic {
    #[error("Ignoring spurious close parenthesis at position {0}")]
    SpuriousCloseParen(usize),

    #[error("Ignoring spurious character {0} at position {1}")]
    SpuriousChar(char, usize),

    #[error("Missing close parenthesis")]
    MissingCloseParen,

    #[error("Ignoring parentheses nested deeper than {max} levels from position {0}", max = MAX_DAIDE_DEPTH)]
    NestingTooDeep(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaideParse {
    /// Top-level sequence; its own parentheses are implicit.
    pub tree: DaideTree,
    pub diagnostics: Vec<DaideDiagnostic>,
    /// Byte offset where reading stopped.
    pub next: usize,
}

/// Reads DAIDE text starting at byte offset `index`.
///
/// Never fails: stray characters and unbalanced parentheses are reported as
/// diagnostics and the best-effort tree is returned. Positions in
/// diagnostics are byte offsets into `text`.
pub fn parse_daide(text: &str, index: usize) -> DaideParse {
    let Some(rest) = text.get(index..) else {
        return DaideParse {
            tree: DaideTree::List(Vec::new()),
            diagnostics: Vec::new(),
            next: index.min(text.len()),
        };
    };

    let mut diagnostics = Vec::new();
    // One open list per unclosed parenthesis, the top level at the bottom.
    let mut open: Vec<Vec<DaideTree>> = vec![Vec::new()];
    // Unclosed parentheses past MAX_DAIDE_DEPTH.
    let mut dropped = 0usize;
    let mut chars = rest.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let position = index + offset;
        match c {
            '(' if open.len() > MAX_DAIDE_DEPTH => {
                if dropped == 0 {
                    diagnostics.push(DaideDiagnostic::NestingTooDeep(position));
                }
                dropped += 1;
            }
            '(' => open.push(Vec::new()),
            ')' if dropped > 0 => dropped -= 1,
            ')' if open.len() > 1 => {
                if let Some(list) = open.pop() {
                    push_item(&mut open, DaideTree::List(list));
                }
            }
            ')' => diagnostics.push(DaideDiagnostic::SpuriousCloseParen(position)),
            c if c.is_whitespace() => {}
            c if c.is_alphabetic() => {
                let mut token = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if !next.is_alphabetic() {
                        break;
                    }
                    token.push(next);
                    chars.next();
                }
                push_item(&mut open, DaideTree::Token(token));
            }
            c => diagnostics.push(DaideDiagnostic::SpuriousChar(c, position)),
        }
    }

    diagnostics.extend(std::iter::repeat_n(DaideDiagnostic::MissingCloseParen, dropped));
    while open.len() > 1 {
        diagnostics.push(DaideDiagnostic::MissingCloseParen);
        if let Some(list) = open.pop() {
            push_item(&mut open, DaideTree::List(list));
        }
    }
    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "malformed DAIDE input");
    }

    DaideParse {
        tree: DaideTree::List(open.pop().unwrap_or_default()),
        diagnostics,
        next: text.len(),
    }
}

fn push_item(open: &mut [Vec<DaideTree>], item: DaideTree) {
    if let Some(current) = open.last_mut() {
        current.push(item);
    }
}

// ----------------- Mirror -----------------

impl fmt::Display for DaideTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaideTree::Token(token) => write!(f, "{token}"),
            DaideTree::List(items) => write_items(f, items),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[DaideTree]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        match item {
            DaideTree::Token(token) => write!(f, "{token}")?,
            DaideTree::List(inner) => {
                write!(f, "(")?;
                write_items(f, inner)?;
                write!(f, ")")?;
            }
        }
    }
    Ok(())
}
