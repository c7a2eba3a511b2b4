//! DAIDE expressions: a tolerant tree reader and an English generator.
//!
//! ```text
//! SUB ((ENG AMY LVP) HLD)
//!   -> We submit the following order: the English army in Liverpool shall remain in place.
//! ```

mod english;
mod tree;

pub use english::{EnglishGenerator, Form, GenerateError, Gloss, MAX_RENDER_DEPTH, Semantics, Syntax};
pub use tree::{DaideDiagnostic, DaideParse, DaideTree, MAX_DAIDE_DEPTH, parse_daide};
