//! AMR graphs and their text notation.
//!
//! An AMR is a rooted graph whose nodes are introduced as
//! `(variable / concept :role filler ...)`. A filler may name a variable
//! introduced elsewhere (reentrancy), possibly further down in the text, so
//! nodes live in an arena owned by [`Amr`] and edges are [`NodeId`] handles.
//! References to variables that are not yet defined are recorded as orphans
//! and patched once the whole graph has been read.

mod printer;
#[cfg(test)]
mod tests;

pub use printer::{MAX_PRINT_DEPTH, PrintError};

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::utility::non_empty_slot_value;

const MAX_NESTING_DEPTH: usize = 500;
const SNIPPET_LEN: usize = 60;

// ----------------- Graph -----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Filler {
    Node(NodeId),
    /// Content of a `"..."` string, escapes kept verbatim.
    Quoted(String),
    Unquoted(String),
    /// Reference to a variable that never got defined.
    Unresolved(String),
}

impl Filler {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Filler::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Filler::Quoted(s) | Filler::Unquoted(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AmrNode {
    pub variable: String,
    pub concept: String,
    pub roles: Vec<(String, Filler)>,
    pub parents: Vec<NodeId>,
}

impl AmrNode {
    /// First filler under `role`.
    pub fn filler(&self, role: &str) -> Option<&Filler> {
        self.roles.iter().find(|(r, _)| r == role).map(|(_, f)| f)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Amr {
    nodes: Vec<AmrNode>,
    root: Option<NodeId>,
    variables: HashMap<String, NodeId>,
    orphans: BTreeMap<String, Vec<(NodeId, usize)>>,
    pub id: Option<String>,
    pub sentence: Option<String>,
    /// The graph exactly as it appeared in the input.
    pub source: String,
}

impl Amr {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &AmrNode {
        &self.nodes[id.0]
    }

    pub fn lookup(&self, variable: &str) -> Option<NodeId> {
        self.variables.get(variable).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn concept(&self, id: NodeId) -> &str {
        &self.node(id).concept
    }

    pub fn filler(&self, id: NodeId, role: &str) -> Option<&Filler> {
        self.node(id).filler(role)
    }

    pub fn child(&self, id: NodeId, role: &str) -> Option<NodeId> {
        self.filler(id, role).and_then(Filler::as_node)
    }

    /// Space-joined name parts of a country, province or sea node, e.g.
    /// `"North Sea"` for `(s / sea :name (n / name :op1 "North" :op2 "Sea"))`.
    pub fn entity_name(&self, id: NodeId) -> Option<String> {
        if !matches!(self.concept(id), "country" | "province" | "sea") {
            return None;
        }
        let name = self.child(id, "name")?;
        if self.concept(name) != "name" {
            return None;
        }
        let parts: Vec<&str> = (1..)
            .map_while(|i| self.filler(name, &format!("op{i}")).and_then(Filler::as_literal))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// True if any node above `id`, along any parent chain, has one of
    /// `concepts`.
    pub fn has_ancestor_in(&self, id: NodeId, concepts: &[String]) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            for &parent in &self.node(current).parents {
                if concepts.iter().any(|c| c == self.concept(parent)) {
                    return true;
                }
                pending.push(parent);
            }
        }
        false
    }

    fn add_node(&mut self, variable: &str, concept: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(AmrNode {
            variable: variable.to_string(),
            concept: concept.to_string(),
            roles: Vec::new(),
            parents: Vec::new(),
        });
        self.variables.insert(variable.to_string(), id);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    fn link(&mut self, holder: NodeId, role: &str, child: NodeId) {
        self.nodes[holder.0]
            .roles
            .push((role.to_string(), Filler::Node(child)));
        self.nodes[child.0].parents.push(holder);
    }

    fn push_literal(&mut self, holder: NodeId, role: &str, filler: Filler) {
        self.nodes[holder.0].roles.push((role.to_string(), filler));
    }

    fn push_reference(&mut self, holder: NodeId, role: &str, variable: &str) {
        match self.lookup(variable) {
            Some(target) => self.link(holder, role, target),
            None => {
                let slot = self.nodes[holder.0].roles.len();
                self.orphans
                    .entry(variable.to_string())
                    .or_default()
                    .push((holder, slot));
                self.push_literal(holder, role, Filler::Unresolved(variable.to_string()));
            }
        }
    }

    /// Patches every orphan slot whose variable got defined later on.
    fn resolve_orphans(&mut self) -> Vec<AmrDiagnostic> {
        let mut diagnostics = Vec::new();
        for (variable, slots) in std::mem::take(&mut self.orphans) {
            let Some(target) = self.lookup(&variable) else {
                warn!(variable = %variable, id = ?self.id, "unresolved reentrancy");
                diagnostics.push(AmrDiagnostic::UnresolvedReference {
                    variable,
                    id: self.id.clone().unwrap_or_default(),
                });
                continue;
            };
            for (holder, slot) in slots {
                self.nodes[holder.0].roles[slot].1 = Filler::Node(target);
                self.nodes[target.0].parents.push(holder);
            }
        }
        diagnostics
    }
}

// ----------------- Diagnostics & Errors -----------------

/// A problem found while reading one AMR. Parsing carries on past it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AmrDiagnostic {
    #[error("Unexpected non-AMR: {0}")]
    UnexpectedNonAmr(String),

    #[error("Unexpected :{role} arg: {at}")]
    UnexpectedFiller { role: String, at: String },

    #[error("Inserting missing ) at: {0}")]
    MissingCloseParen(String),

    #[error("For {id}, can't resolve orphan reference {variable}")]
    UnresolvedReference { variable: String, id: String },

    #[error("Nesting deeper than {0} levels, skipping: {1}")]
    TooDeep(usize, String),
}

#[derive(Debug, Error)]
pub enum AmrError {
    #[error("No AMR found at offset {offset}: {snippet}")]
    NoAmr { offset: usize, snippet: String },
}

// ----------------- Parser -----------------

/// Outcome of reading one AMR from the front of a text.
#[derive(Debug)]
pub struct AmrParse {
    pub amr: Option<Amr>,
    /// Bytes of the input used up, comments included.
    pub consumed: usize,
    pub diagnostics: Vec<AmrDiagnostic>,
}

/// Reads the comment block and graph at the start of `text`.
pub fn parse_amr(text: &str) -> AmrParse {
    let mut parser = Parser::new(text);
    parser.read_comments();
    parser.skip_whitespace();
    let start = parser.pos;

    if parser.parse_node(0).is_none() {
        // Nothing graph-like here: the whole remainder is given up.
        return AmrParse {
            amr: None,
            consumed: text.len(),
            diagnostics: parser.diagnostics,
        };
    }

    let mut diagnostics = parser.diagnostics;
    let mut amr = parser.amr;
    diagnostics.extend(amr.resolve_orphans());
    amr.source = text[start..parser.pos].to_string();
    debug!(id = ?amr.id, nodes = amr.len(), "parsed AMR");

    AmrParse {
        amr: Some(amr),
        consumed: parser.pos,
        diagnostics,
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    amr: Amr,
    diagnostics: Vec<AmrDiagnostic>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            amr: Amr::default(),
            diagnostics: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn snippet(&self) -> String {
        self.rest().chars().take(SNIPPET_LEN).collect()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Leading `# ...` lines; picks up `::id` and `::snt` fields.
    fn read_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if self.peek() != Some('#') {
                return;
            }
            let line = self.take_while(|c| c != '\n');
            if let Some(sentence) = non_empty_slot_value(line, "snt") {
                self.amr.sentence = Some(sentence);
            }
            if let Some(id) = non_empty_slot_value(line, "id") {
                self.amr.id = Some(id);
            }
        }
    }

    /// `(variable / concept`, leaving the cursor after the concept. Consumes
    /// nothing when the text does not start a node.
    fn parse_header(&mut self) -> Option<(String, String)> {
        let saved = self.pos;
        let header = self.read_header();
        if header.is_none() {
            self.pos = saved;
        }
        header
    }

    fn read_header(&mut self) -> Option<(String, String)> {
        self.skip_whitespace();
        if self.peek() != Some('(') {
            return None;
        }
        self.pos += 1;
        self.skip_whitespace();
        let variable = self.take_while(|c| !c.is_whitespace() && c != '/' && c != ')');
        if !is_variable(variable) {
            return None;
        }
        self.skip_whitespace();
        if self.peek() != Some('/') {
            return None;
        }
        self.pos += 1;
        self.skip_whitespace();
        let concept = self.take_while(|c| !c.is_whitespace() && c != '(' && c != ')');
        if !is_concept(concept) {
            return None;
        }
        Some((variable.to_string(), concept.to_string()))
    }

    fn parse_node(&mut self, depth: usize) -> Option<NodeId> {
        let (variable, concept) = self.parse_header()?;
        let node = self.amr.add_node(&variable, &concept);

        while let Some(role) = self.parse_role() {
            self.skip_whitespace();
            match self.peek() {
                Some('(') if depth >= MAX_NESTING_DEPTH => {
                    let skipped = self.skip_group();
                    self.diagnostics
                        .push(AmrDiagnostic::TooDeep(MAX_NESTING_DEPTH, skipped));
                }
                Some('(') => match self.parse_node(depth + 1) {
                    Some(child) => self.amr.link(node, &role, child),
                    None => {
                        let skipped = self.skip_group();
                        self.diagnostics
                            .push(AmrDiagnostic::UnexpectedNonAmr(skipped));
                    }
                },
                Some('"') if self.parse_quoted(node, &role) => {}
                _ => {
                    let token = self.take_while(|c| !c.is_whitespace() && c != '(' && c != ')');
                    if token.is_empty() {
                        self.diagnostics.push(AmrDiagnostic::UnexpectedFiller {
                            role,
                            at: self.snippet(),
                        });
                        break;
                    } else if is_variable(token) {
                        self.amr.push_reference(node, &role, token);
                    } else {
                        self.amr
                            .push_literal(node, &role, Filler::Unquoted(token.to_string()));
                    }
                }
            }
        }

        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.pos += 1;
        } else {
            let at = self.amr.id.clone().unwrap_or_else(|| self.snippet());
            warn!(at = %at, "missing close parenthesis");
            self.diagnostics.push(AmrDiagnostic::MissingCloseParen(at));
        }
        Some(node)
    }

    /// `:role`, leaving the cursor right after the role name.
    fn parse_role(&mut self) -> Option<String> {
        let saved = self.pos;
        self.skip_whitespace();
        if self.peek() == Some(':') {
            self.pos += 1;
            let role = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-');
            if is_role(role) {
                return Some(role.to_string());
            }
        }
        self.pos = saved;
        None
    }

    /// A `"..."` literal with `\"` escapes. Returns false, consuming nothing,
    /// when the string is never closed.
    fn parse_quoted(&mut self, node: NodeId, role: &str) -> bool {
        let rest = self.rest();
        let mut escaped = false;
        for (i, c) in rest.char_indices().skip(1) {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    let content = rest[1..i].to_string();
                    self.pos += i + 1;
                    self.amr.push_literal(node, role, Filler::Quoted(content));
                    return true;
                }
                _ => escaped = false,
            }
        }
        false
    }

    /// Consumes a balanced `( ... )` group (or the rest of the input) and
    /// returns a snippet of it.
    fn skip_group(&mut self) -> String {
        let snippet = self.snippet();
        let mut open = 0usize;
        for (i, c) in self.rest().char_indices() {
            match c {
                '(' => open += 1,
                ')' => {
                    open = open.saturating_sub(1);
                    if open == 0 {
                        self.pos += i + 1;
                        return snippet;
                    }
                }
                _ => {}
            }
        }
        self.pos = self.src.len();
        snippet
    }
}

/// A letter followed by digits: `a`, `p2`, `x17`.
fn is_variable(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase()) && chars.all(|c| c.is_ascii_digit())
}

/// `[a-z][a-z0-9]*(-[a-z0-9]+)*`, e.g. `army`, `move-01`, `amr-unknown`.
fn is_concept(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_lowercase())
        && s.split('-').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

/// Like a concept, but case-insensitive (`ARG0`, `part-of`, `op1`).
fn is_role(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_alphabetic())
        && s.split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()))
}

// ----------------- Streams -----------------

/// One AMR read from a stream, with the diagnostics raised while reading it.
#[derive(Debug)]
pub struct ParsedAmr {
    pub amr: Amr,
    pub diagnostics: Vec<AmrDiagnostic>,
}

/// Iterator over the AMRs concatenated in one text.
///
/// Yields an [`AmrError::NoAmr`] and stops if non-blank input remains that
/// does not start a graph.
pub struct AmrStream<'a> {
    text: &'a str,
    offset: usize,
    done: bool,
}

pub fn read_amrs(text: &str) -> AmrStream<'_> {
    AmrStream {
        text,
        offset: 0,
        done: false,
    }
}

impl Iterator for AmrStream<'_> {
    type Item = Result<ParsedAmr, AmrError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = &self.text[self.offset..];
        if rest.trim().is_empty() {
            self.done = true;
            return None;
        }

        let parse = parse_amr(rest);
        match parse.amr {
            Some(amr) => {
                self.offset += parse.consumed;
                Some(Ok(ParsedAmr {
                    amr,
                    diagnostics: parse.diagnostics,
                }))
            }
            None => {
                self.done = true;
                Some(Err(AmrError::NoAmr {
                    offset: self.offset,
                    snippet: rest.trim_start().chars().take(SNIPPET_LEN).collect(),
                }))
            }
        }
    }
}
