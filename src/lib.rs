//! Translation between three representations of Diplomacy game messages:
//! AMR semantic graphs, the DAIDE machine protocol and English glosses.
//!
//! ```text
//! AMR text --parse_amr--> Amr --DaideTranslator + RuleTable--> DAIDE string
//! DAIDE string --parse_daide--> DaideTree --EnglishGenerator--> English
//! ```
//!
//! Both directions look up ids and names in a shared, read-only [`Lexicon`].

pub mod amr;
pub mod daide;
pub mod lexicon;
pub mod pattern;
pub mod report;
pub mod rules;
pub mod utility;

pub use amr::{Amr, AmrDiagnostic, AmrError, ParsedAmr, parse_amr, read_amrs};
pub use daide::{DaideTree, EnglishGenerator, Form, Gloss, parse_daide};
pub use lexicon::Lexicon;
pub use pattern::{Pattern, Template};
pub use rules::{DaideTranslator, RuleTable};
