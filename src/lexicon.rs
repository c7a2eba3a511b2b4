//! Lexical resource table: DAIDE ids and English names for powers,
//! provinces, seas, unit types and coasts.
//!
//! The resource file is line oriented. Each record starts with a
//! `::kind-id` marker and carries further `::field value` pairs:
//!
//! ```text
//! ::power-id ENG ::power-name England
//! ::province-id LVP ::province-name Liverpool
//! ::sea-id NTH ::sea-name North Sea ::sea-alt-names North Sea; German Ocean
//! ::unit-type-id AMY ::unit-type-name army
//! ::coast-id NCS ::coast-name north coast ::coast-alt-names north
//! ::name England ::pertainym English
//! ```
//!
//! Unrecognized lines are ignored. Once built the table is read-only and
//! can be shared freely between threads.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::utility::non_empty_slot_value;

const BUILTIN_RESOURCES: &str = include_str!("../resources/diplomacy-resources.txt");

static ALT_NAME_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;]\s*").unwrap());

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Could not read resource file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    power_names: HashMap<String, String>,
    province_names: HashMap<String, String>,
    sea_names: HashMap<String, String>,
    unit_type_names: HashMap<String, String>,
    coast_names: HashMap<String, String>,
    pertainyms: HashMap<String, String>,
    definite_article: HashSet<String>,
    name_to_id: HashMap<String, String>,
    to_name: HashMap<String, String>,
}

impl Lexicon {
    /// The standard map shipped with the crate.
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_RESOURCES)
    }

    pub fn from_file(path: &Path) -> Result<Self, LexiconError> {
        let content = fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut lexicon = Self::default();
        for line in content.lines() {
            lexicon.add_line(line);
        }
        debug!(
            powers = lexicon.power_names.len(),
            provinces = lexicon.province_names.len(),
            seas = lexicon.sea_names.len(),
            "loaded lexical resources"
        );
        lexicon
    }

    fn add_line(&mut self, line: &str) {
        let field = |name: &str| non_empty_slot_value(line, name);

        if line.starts_with("::power-id ") {
            if let (Some(id), Some(name)) = (field("power-id"), field("power-name")) {
                self.power_names.insert(id.clone(), name.clone());
                self.register(id, name);
            }
        } else if line.starts_with("::province-id ") {
            if let (Some(id), Some(name)) = (field("province-id"), field("province-name")) {
                self.province_names.insert(id.clone(), name.clone());
                self.register(id, name);
            }
        } else if line.starts_with("::sea-id ") {
            if let (Some(id), Some(name)) = (field("sea-id"), field("sea-name")) {
                self.sea_names.insert(id.clone(), name.clone());
                self.definite_article.insert(name.clone());
                for alt in split_alt_names(field("sea-alt-names")) {
                    self.name_to_id.insert(alt, id.clone());
                }
                self.register(id, name);
            }
        } else if line.starts_with("::unit-type-id ") {
            if let (Some(id), Some(name)) = (field("unit-type-id"), field("unit-type-name")) {
                self.unit_type_names.insert(id.clone(), name.clone());
                self.register(id, name);
            }
        } else if line.starts_with("::coast-id ") {
            // Coasts are reached by their short alternative names ("north"),
            // never by the full coast name.
            if let (Some(id), Some(name)) = (field("coast-id"), field("coast-name")) {
                self.coast_names.insert(id.clone(), name.clone());
                self.to_name.insert(id.clone(), name);
                for alt in split_alt_names(field("coast-alt-names")) {
                    self.name_to_id.insert(alt, id.clone());
                }
            }
        } else if line.starts_with("::name ") {
            if let (Some(name), Some(pertainym)) = (field("name"), field("pertainym")) {
                self.to_name.insert(pertainym.clone(), name.clone());
                self.pertainyms.insert(name, pertainym);
            }
        }
    }

    fn register(&mut self, id: String, name: String) {
        self.to_name.insert(id.clone(), name.clone());
        self.name_to_id.insert(name, id);
    }

    pub fn power_name(&self, id: &str) -> Option<&str> {
        self.power_names.get(id).map(String::as_str)
    }

    pub fn province_name(&self, id: &str) -> Option<&str> {
        self.province_names.get(id).map(String::as_str)
    }

    pub fn sea_name(&self, id: &str) -> Option<&str> {
        self.sea_names.get(id).map(String::as_str)
    }

    pub fn unit_type_name(&self, id: &str) -> Option<&str> {
        self.unit_type_names.get(id).map(String::as_str)
    }

    pub fn coast_name(&self, id: &str) -> Option<&str> {
        self.coast_names.get(id).map(String::as_str)
    }

    /// Adjective form of a name, e.g. "English" for "England".
    pub fn pertainym(&self, name: &str) -> Option<&str> {
        self.pertainyms.get(name).map(String::as_str)
    }

    pub fn uses_definite_article(&self, name: &str) -> bool {
        self.definite_article.contains(name)
    }

    /// Reverse index used by the AMR→DAIDE matcher.
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.name_to_id.get(name).map(String::as_str)
    }

    /// Forward index from an id (or a pertainym) to its name.
    pub fn name_for(&self, id_or_name: &str) -> Option<&str> {
        self.to_name.get(id_or_name).map(String::as_str)
    }

    /// Name of a province or sea, the two kinds of map location.
    pub fn location_name(&self, id: &str) -> Option<&str> {
        self.province_name(id).or_else(|| self.sea_name(id))
    }
}

fn split_alt_names(value: Option<String>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    ALT_NAME_SEPARATOR
        .split(&value)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
