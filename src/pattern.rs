//! Declarative AMR patterns and DAIDE templates.
//!
//! A pattern mirrors AMR notation without variables:
//!
//! ```text
//! ($utype(army|fleet) :mod $power(country) :location $location(sea|province))
//! ```
//!
//! Bare tokens must equal the concept found at that position, `$name` slots
//! accept any concept and `$name(a|b)` slots accept only the listed ones.
//! Each `:role` is looked up by name on the node, never by position. A
//! successful match yields [`Bindings`] from slot names to DAIDE strings,
//! which a [`Template`] such as `($power $utype $location)` turns into
//! output.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::amr::{Amr, Filler, NodeId};
use crate::utility::has_matching_outer_parentheses;

pub type Bindings = HashMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$([a-z][a-z0-9]*)").unwrap());
static DOUBLED_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\((\([^()]*\))\)(.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("Pattern '{0}' must start with '('")]
    MissingOpenParen(String),

    #[error("Pattern '{0}' is missing a closing ')'")]
    Unbalanced(String),

    #[error("Expected {expected} at offset {offset} in pattern '{pattern}'")]
    Expected {
        expected: &'static str,
        offset: usize,
        pattern: String,
    },

    #[error("Unexpected text after pattern '{0}'")]
    TrailingInput(String),
}

// ----------------- Pattern Structures -----------------

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub alternatives: Option<Vec<String>>,
}

impl Slot {
    pub fn admits(&self, concept: &str) -> bool {
        self.alternatives
            .as_ref()
            .is_none_or(|alts| alts.iter().any(|a| a == concept))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Literal(String),
    Slot(Slot),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Atom(Atom),
    Nested(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub head: Atom,
    pub roles: Vec<(String, Term)>,
}

/// Supplies the strings bound to slots.
pub trait SlotResolver {
    type Error;

    /// Value for a slot standing at a node's concept position.
    fn concept_value(&self, concept: &str) -> String;

    /// Value for a slot filled by a whole node.
    fn node_value(&self, amr: &Amr, node: NodeId) -> Result<String, Self::Error>;
}

impl Pattern {
    /// Matches `node` against this pattern, extending `bindings`.
    ///
    /// Returns `Ok(None)` when any part fails to match. There is no
    /// backtracking: each role is checked against its first filler only.
    pub fn matches<R: SlotResolver>(
        &self,
        amr: &Amr,
        node: NodeId,
        resolver: &R,
        mut bindings: Bindings,
    ) -> Result<Option<Bindings>, R::Error> {
        let concept = amr.concept(node);
        match &self.head {
            Atom::Literal(literal) if literal == concept => {}
            Atom::Slot(slot) if slot.admits(concept) => {
                bindings.insert(slot.name.clone(), resolver.concept_value(concept));
            }
            _ => return Ok(None),
        }

        for (role, term) in &self.roles {
            let Some(filler) = amr.filler(node, role) else {
                return Ok(None);
            };
            match (term, filler) {
                (Term::Atom(Atom::Literal(literal)), Filler::Node(child)) => {
                    if amr.concept(*child) != literal {
                        return Ok(None);
                    }
                }
                (Term::Atom(Atom::Slot(slot)), Filler::Node(child)) => {
                    if !slot.admits(amr.concept(*child)) {
                        return Ok(None);
                    }
                    bindings.insert(slot.name.clone(), resolver.node_value(amr, *child)?);
                }
                (Term::Nested(pattern), Filler::Node(child)) => {
                    match pattern.matches(amr, *child, resolver, bindings)? {
                        Some(extended) => bindings = extended,
                        None => return Ok(None),
                    }
                }
                (Term::Atom(atom), Filler::Quoted(text) | Filler::Unquoted(text)) => match atom {
                    Atom::Literal(literal) if literal == text => {}
                    Atom::Slot(slot) if slot.admits(text) => {
                        bindings.insert(slot.name.clone(), text.clone());
                    }
                    _ => return Ok(None),
                },
                _ => return Ok(None),
            }
        }
        Ok(Some(bindings))
    }
}

// ----------------- Pattern Parsing -----------------

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scanner = Scanner { src: s, pos: 0 };
        scanner.skip_whitespace();
        if scanner.peek() != Some('(') {
            return Err(PatternError::MissingOpenParen(s.to_string()));
        }
        let pattern = scanner.pattern()?;
        scanner.skip_whitespace();
        if scanner.pos < s.len() {
            return Err(PatternError::TrailingInput(s.to_string()));
        }
        Ok(pattern)
    }
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = &self.src[self.pos..];
        let len = rest.find(|c| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn expected(&self, expected: &'static str) -> PatternError {
        PatternError::Expected {
            expected,
            offset: self.pos,
            pattern: self.src.to_string(),
        }
    }

    /// `( head (:role term)* )`, cursor on the opening parenthesis.
    fn pattern(&mut self) -> Result<Pattern, PatternError> {
        self.pos += 1;
        self.skip_whitespace();
        let head = self.atom()?;
        let mut roles = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(')') => {
                    self.pos += 1;
                    return Ok(Pattern { head, roles });
                }
                Some(':') => {
                    self.pos += 1;
                    let role = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-');
                    if role.is_empty() {
                        return Err(self.expected("role name"));
                    }
                    self.skip_whitespace();
                    let term = if self.peek() == Some('(') {
                        Term::Nested(self.pattern()?)
                    } else {
                        Term::Atom(self.atom()?)
                    };
                    roles.push((role.to_string(), term));
                }
                Some(_) => return Err(self.expected("':role' or ')'")),
                None => return Err(PatternError::Unbalanced(self.src.to_string())),
            }
        }
    }

    /// A literal token, `$name` or `$name(alt1|alt2|...)`.
    fn atom(&mut self) -> Result<Atom, PatternError> {
        if self.peek() == Some('$') {
            self.pos += 1;
            let name = self.take_while(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
            if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
                return Err(self.expected("slot name"));
            }
            let alternatives = if self.peek() == Some('(') {
                self.pos += 1;
                let alts = self.take_while(|c| c != ')' && c != '(');
                if self.peek() != Some(')') {
                    return Err(PatternError::Unbalanced(self.src.to_string()));
                }
                self.pos += 1;
                Some(alts.split('|').map(|a| a.trim().to_string()).collect())
            } else {
                None
            };
            return Ok(Atom::Slot(Slot {
                name: name.to_string(),
                alternatives,
            }));
        }
        let token = self.take_while(|c| !c.is_whitespace() && c != '(' && c != ')');
        if token.is_empty() {
            return Err(self.expected("concept or slot"));
        }
        Ok(Atom::Literal(token.to_string()))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Literal(literal) => write!(f, "{literal}"),
            Atom::Slot(Slot { name, alternatives }) => {
                write!(f, "${name}")?;
                if let Some(alts) = alternatives {
                    write!(f, "({})", alts.join("|"))?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.head)?;
        for (role, term) in &self.roles {
            match term {
                Term::Atom(atom) => write!(f, " :{role} {atom}")?,
                Term::Nested(pattern) => write!(f, " :{role} {pattern}")?,
            }
        }
        write!(f, ")")
    }
}

// ----------------- Templates -----------------

#[derive(Debug, Clone, PartialEq)]
pub struct Template(String);

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitutes every `$name` from `bindings`.
    ///
    /// Unbound placeholders stay in the output verbatim. Multi-token values
    /// get their own parentheses unless they already have them or the
    /// template puts the placeholder directly inside a pair.
    pub fn instantiate(&self, bindings: &Bindings, negated: bool) -> String {
        let mut out = self.0.clone();
        let mut cursor = 0;
        while let Some((range, name)) = PLACEHOLDER
            .captures_at(&out, cursor)
            .and_then(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str().to_string())))
        {
            let value = match bindings.get(&name) {
                None => out[range.clone()].to_string(),
                Some(value) => {
                    let enclosed =
                        out[..range.start].ends_with('(') && out[range.end..].starts_with(')');
                    if value.contains(' ') && !has_matching_outer_parentheses(value) && !enclosed {
                        format!("({value})")
                    } else {
                        value.clone()
                    }
                }
            };
            cursor = range.start + value.len();
            out.replace_range(range, &value);
        }

        if negated {
            out = format!("NOT ({out})");
        }
        while let Some(collapsed) = DOUBLED_PARENS
            .captures(&out)
            .map(|caps| format!("{}{}{}", &caps[1], &caps[2], &caps[3]))
        {
            out = collapsed;
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
