use std::collections::HashSet;

use thiserror::Error;

use super::{Amr, Filler, NodeId};

pub const MAX_PRINT_DEPTH: usize = 100;

const INDENT_STEP: usize = 6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrintError {
    #[error("AMR has no root node")]
    Empty,

    #[error("AMR nesting exceeds {0} levels")]
    TooDeep(usize),
}

impl Amr {
    /// Canonical text of the whole graph.
    pub fn to_text(&self) -> Result<String, PrintError> {
        let root = self.root().ok_or(PrintError::Empty)?;
        self.subgraph_to_text(root)
    }

    /// Canonical text of the graph below `node`.
    ///
    /// A node already written out during this call is printed again as its
    /// bare variable.
    pub fn subgraph_to_text(&self, node: NodeId) -> Result<String, PrintError> {
        let mut printer = Printer {
            amr: self,
            expanded: HashSet::new(),
            out: String::new(),
        };
        printer.write_node(node, 0, false)?;
        Ok(printer.out)
    }
}

struct Printer<'a> {
    amr: &'a Amr,
    expanded: HashSet<NodeId>,
    out: String,
}

impl Printer<'_> {
    fn write_node(&mut self, id: NodeId, level: usize, inline: bool) -> Result<(), PrintError> {
        if level > MAX_PRINT_DEPTH {
            return Err(PrintError::TooDeep(MAX_PRINT_DEPTH));
        }
        self.expanded.insert(id);

        let amr = self.amr;
        let node = amr.node(id);
        self.out.push('(');
        self.out.push_str(&node.variable);
        self.out.push_str(" / ");
        self.out.push_str(&node.concept);

        let indent = " ".repeat(INDENT_STEP * (level + 1));
        for (role, filler) in &node.roles {
            // Flat name lists: `:name (n / name :op1 "North" :op2 "Sea")`
            let inline_role = inline
                || (role == "name"
                    && filler
                        .as_node()
                        .is_some_and(|child| amr.concept(child) == "name"));
            if inline_role {
                self.out.push(' ');
            } else {
                self.out.push('\n');
                self.out.push_str(&indent);
            }
            self.out.push(':');
            self.out.push_str(role);
            self.out.push(' ');

            match filler {
                Filler::Node(child) if self.expanded.contains(child) => {
                    self.out.push_str(&amr.node(*child).variable);
                }
                Filler::Node(child) => self.write_node(*child, level + 1, inline_role)?,
                Filler::Quoted(text) => {
                    self.out.push('"');
                    self.out.push_str(text);
                    self.out.push('"');
                }
                Filler::Unquoted(text) | Filler::Unresolved(text) => self.out.push_str(text),
            }
        }
        self.out.push(')');
        Ok(())
    }
}
