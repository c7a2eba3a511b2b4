//! AMR to DAIDE translation.
//!
//! [`RuleTable`] is an ordered list of pattern/template rules loaded from
//! YAML. [`DaideTranslator`] walks an AMR from its root and, at every node,
//! tries in turn: the named-entity shortcut, conjunction handling for `and`,
//! the rules in table order, and finally a generic rendering of the node.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, trace};
use yaml_rust2::yaml::Hash;
use yaml_rust2::{Yaml, YamlLoader};

use crate::amr::{Amr, Filler, NodeId};
use crate::lexicon::Lexicon;
use crate::pattern::{Bindings, Pattern, PatternError, SlotResolver, Template};
use crate::utility::parenthesize_compound;

const BUILTIN_RULES: &str = include_str!("../rules/daide-rules.yaml");

pub const MAX_TRANSLATION_DEPTH: usize = 100;

/// Longest DAIDE text a single node may translate to.
pub const MAX_TRANSLATION_LEN: usize = 64 * 1024;

/// Concept of the placeholder AMR for sentences without content.
pub const EMPTY_AMR_CONCEPT: &str = "amr-empty";

/// True for the placeholder `(a / amr-empty)`.
pub fn is_empty_amr(amr: &Amr) -> bool {
    amr.root().is_some_and(|root| {
        amr.concept(root) == EMPTY_AMR_CONCEPT && amr.node(root).roles.is_empty()
    })
}

#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("Could not read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(String),

    #[error("Rule file has no top-level 'rules' list")]
    MissingRules,

    #[error("Rule {index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("Rule {index}: {source}")]
    Pattern {
        index: usize,
        #[source]
        source: PatternError,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    #[error("AMR has no root node")]
    Empty,

    #[error("AMR nesting exceeds {0} levels during translation")]
    DepthExceeded(usize),

    #[error("DAIDE translation exceeds {0} bytes")]
    TooLong(usize),
}

// ----------------- Rule Table -----------------

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Pattern,
    pub template: Template,
    /// Ancestor concepts of which at least one must be present, if any.
    pub within: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// The rule table shipped with the crate.
    pub fn builtin() -> Result<Self, RuleTableError> {
        Self::from_yaml(BUILTIN_RULES)
    }

    pub fn from_file(path: &Path) -> Result<Self, RuleTableError> {
        let content = fs::read_to_string(path).map_err(|source| RuleTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(config: &str) -> Result<Self, RuleTableError> {
        let docs =
            YamlLoader::load_from_str(config).map_err(|e| RuleTableError::Yaml(e.to_string()))?;
        let doc = docs.first().ok_or(RuleTableError::MissingRules)?;

        let Some(entries) = doc["rules"].as_vec() else {
            return Err(RuleTableError::MissingRules);
        };

        let mut rules = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let Yaml::Hash(rule_hash) = entry else {
                return Err(RuleTableError::InvalidRule {
                    index,
                    reason: "expected a mapping".into(),
                });
            };
            rules.push(Self::parse_rule(index, rule_hash)?);
        }
        debug!(rules = rules.len(), "loaded DAIDE rule table");
        Ok(Self { rules })
    }

    fn parse_rule(index: usize, rule_hash: &Hash) -> Result<Rule, RuleTableError> {
        let mut pattern = None;
        let mut template = None;
        let mut within = Vec::new();

        for (key, value) in rule_hash {
            let Yaml::String(key) = key else { continue };
            match (key.as_str(), value) {
                ("pattern", Yaml::String(text)) => {
                    pattern = Some(
                        text.parse::<Pattern>()
                            .map_err(|source| RuleTableError::Pattern { index, source })?,
                    );
                }
                ("template", Yaml::String(text)) => template = Some(Template::new(text.as_str())),
                ("within", Yaml::String(concept)) => within.push(concept.clone()),
                ("within", Yaml::Array(concepts)) => {
                    within.extend(concepts.iter().filter_map(Yaml::as_str).map(str::to_string));
                }
                _ => {}
            }
        }

        let invalid = |reason: &str| RuleTableError::InvalidRule {
            index,
            reason: reason.to_string(),
        };
        Ok(Rule {
            pattern: pattern.ok_or_else(|| invalid("missing 'pattern' field"))?,
            template: template.ok_or_else(|| invalid("missing 'template' field"))?,
            within,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ----------------- Translator -----------------

/// Per-call cache of finished node translations, so a shared node is
/// translated once however many times it is referenced.
type Memo = RefCell<HashMap<NodeId, String>>;

#[derive(Debug, Clone, Copy)]
pub struct DaideTranslator<'a> {
    lexicon: &'a Lexicon,
    rules: &'a RuleTable,
}

impl<'a> DaideTranslator<'a> {
    pub fn new(lexicon: &'a Lexicon, rules: &'a RuleTable) -> Self {
        Self { lexicon, rules }
    }

    /// DAIDE for the whole AMR. The empty placeholder AMR yields `""`.
    pub fn translate(&self, amr: &Amr) -> Result<String, TranslateError> {
        let root = amr.root().ok_or(TranslateError::Empty)?;
        if is_empty_amr(amr) {
            return Ok(String::new());
        }
        self.translate_node(amr, root, 0, &Memo::default())
    }

    fn translate_node(
        &self,
        amr: &Amr,
        node: NodeId,
        depth: usize,
        memo: &Memo,
    ) -> Result<String, TranslateError> {
        if depth > MAX_TRANSLATION_DEPTH {
            return Err(TranslateError::DepthExceeded(MAX_TRANSLATION_DEPTH));
        }
        if let Some(done) = memo.borrow().get(&node) {
            return Ok(done.clone());
        }

        let daide = self.translate_uncached(amr, node, depth, memo)?;
        if daide.len() > MAX_TRANSLATION_LEN {
            return Err(TranslateError::TooLong(MAX_TRANSLATION_LEN));
        }
        memo.borrow_mut().insert(node, daide.clone());
        Ok(daide)
    }

    fn translate_uncached(
        &self,
        amr: &Amr,
        node: NodeId,
        depth: usize,
        memo: &Memo,
    ) -> Result<String, TranslateError> {
        if let Some(id) = amr
            .entity_name(node)
            .and_then(|name| self.lexicon.id_for_name(&name))
        {
            return Ok(id.to_string());
        }

        let concept = amr.concept(node);
        if concept == "and" {
            return self.translate_conjunction(amr, node, depth, memo);
        }

        let resolver = NodeResolver {
            translator: self,
            depth,
            memo,
        };
        for (index, rule) in self.rules.rules.iter().enumerate() {
            if !rule.within.is_empty() && !amr.has_ancestor_in(node, &rule.within) {
                continue;
            }
            trace!(rule = index, concept, "trying rule");
            if let Some(bindings) = rule.pattern.matches(amr, node, &resolver, Bindings::new())? {
                let negated = amr
                    .filler(node, "polarity")
                    .and_then(Filler::as_literal)
                    .is_some_and(|p| p == "-");
                let daide = rule.template.instantiate(&bindings, negated);
                debug!(rule = index, variable = %amr.node(node).variable, daide = %daide, "rule matched");
                return Ok(daide);
            }
        }

        self.translate_fallback(amr, node, depth, memo)
    }

    /// `op1`, `op2`, ... translated and space-joined. The first missing or
    /// unresolved operand ends the list.
    fn translate_conjunction(
        &self,
        amr: &Amr,
        node: NodeId,
        depth: usize,
        memo: &Memo,
    ) -> Result<String, TranslateError> {
        let mut parts = Vec::new();
        for i in 1.. {
            let Some(filler) = amr.filler(node, &format!("op{i}")) else {
                break;
            };
            let Some(part) = self.translate_filler(amr, filler, depth, memo)? else {
                break;
            };
            parts.push(parenthesize_compound(&part));
        }
        Ok(parts.join(" "))
    }

    /// `(concept :role value ...)`, which is not valid DAIDE but shows what
    /// the rules missed. Unresolved fillers are left out.
    fn translate_fallback(
        &self,
        amr: &Amr,
        node: NodeId,
        depth: usize,
        memo: &Memo,
    ) -> Result<String, TranslateError> {
        let mut out = format!("({}", amr.concept(node));
        for (role, filler) in &amr.node(node).roles {
            let value = match filler {
                Filler::Quoted(text) => format!("\"{text}\""),
                _ => match self.translate_filler(amr, filler, depth, memo)? {
                    Some(value) => parenthesize_compound(&value),
                    None => continue,
                },
            };
            out.push_str(&format!(" :{role} {value}"));
        }
        out.push(')');
        Ok(out)
    }

    /// `None` for an unresolved reference, which counts as absent.
    fn translate_filler(
        &self,
        amr: &Amr,
        filler: &Filler,
        depth: usize,
        memo: &Memo,
    ) -> Result<Option<String>, TranslateError> {
        match filler {
            Filler::Node(child) => self.translate_node(amr, *child, depth + 1, memo).map(Some),
            Filler::Quoted(text) | Filler::Unquoted(text) => Ok(Some(text.clone())),
            Filler::Unresolved(_) => Ok(None),
        }
    }
}

/// Slot values for one node's rule attempts.
struct NodeResolver<'t, 'a> {
    translator: &'t DaideTranslator<'a>,
    depth: usize,
    memo: &'t Memo,
}

impl SlotResolver for NodeResolver<'_, '_> {
    type Error = TranslateError;

    fn concept_value(&self, concept: &str) -> String {
        self.translator
            .lexicon
            .id_for_name(concept)
            .unwrap_or(concept)
            .to_string()
    }

    fn node_value(&self, amr: &Amr, node: NodeId) -> Result<String, TranslateError> {
        if let Some(name) = amr.entity_name(node) {
            let lexicon = self.translator.lexicon;
            return Ok(lexicon.id_for_name(&name).map(str::to_string).unwrap_or(name));
        }
        if amr.node(node).roles.is_empty() {
            return Ok(self.concept_value(amr.concept(node)));
        }
        let daide = self
            .translator
            .translate_node(amr, node, self.depth + 1, self.memo)?;
        if daide.is_empty() {
            // e.g. an `and` without operands
            return Ok(self.concept_value(amr.concept(node)));
        }
        Ok(daide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amr::parse_amr;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const ITALIAN_ARMY: &str = r#"(a / army :mod (c / country :name (n / name :op1 "Italy")) :location (p / province :name (n2 / name :op1 "Burgundy")))"#;

    fn translate(text: &str) -> Result<String, TranslateError> {
        let lexicon = Lexicon::builtin();
        let rules = RuleTable::builtin().unwrap();
        let amr = parse_amr(text).amr.unwrap();
        DaideTranslator::new(&lexicon, &rules).translate(&amr)
    }

    #[test]
    fn test_builtin_table_loads_in_order() {
        let rules = RuleTable::builtin().unwrap();
        assert_eq!(rules.len(), 21);
        assert_eq!(rules.rules()[1].template.as_str(), "$unit MTO $destination");
        assert_eq!(rules.rules()[17].within, vec!["propose-01", "agree-01"]);
        assert!(rules.rules()[0].within.is_empty());
    }

    #[test]
    fn test_rule_table_errors() {
        assert!(matches!(
            RuleTable::from_yaml("other: []"),
            Err(RuleTableError::MissingRules)
        ));
        assert!(matches!(
            RuleTable::from_yaml("rules:\n  - template: 'X'\n"),
            Err(RuleTableError::InvalidRule { index: 0, .. })
        ));
        assert!(matches!(
            RuleTable::from_yaml("rules:\n  - pattern: 'hold-03'\n    template: 'X'\n"),
            Err(RuleTableError::Pattern { index: 0, .. })
        ));
        assert!(matches!(
            RuleTable::from_yaml("rules: [unclosed"),
            Err(RuleTableError::Yaml(_))
        ));
    }

    #[test]
    fn test_rule_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"rules:\n  - pattern: '(hold-03 :ARG1 $unit)'\n    template: '$unit HLD'\n    within: submit-01\n")
            .unwrap();
        let rules = RuleTable::from_file(file.path()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules()[0].within, vec!["submit-01"]);

        let missing = RuleTable::from_file(Path::new("/nonexistent/rules.yaml"));
        assert!(matches!(missing, Err(RuleTableError::Io { .. })));
    }

    #[test]
    fn test_unit_descriptor() {
        assert_eq!(translate(ITALIAN_ARMY).unwrap(), "(ITA AMY BUR)");
    }

    #[test]
    fn test_hold_order() {
        let text = format!("(h / hold-03 :ARG1 {ITALIAN_ARMY})");
        assert_eq!(translate(&text).unwrap(), "(ITA AMY BUR) HLD");
    }

    #[test]
    fn test_negated_order() {
        let text = format!("(h / hold-03 :polarity - :ARG1 {ITALIAN_ARMY})");
        assert_eq!(translate(&text).unwrap(), "NOT ((ITA AMY BUR) HLD)");
    }

    #[test]
    fn test_move_and_support() {
        let text = format!(
            r#"(s / support-01 :ARG0 (f / fleet :mod (c / country :name (n / name :op1 "France")) :location (s2 / sea :name (n3 / name :op1 "English" :op2 "Channel"))) :ARG1 (m / move-01 :ARG1 {ITALIAN_ARMY} :ARG2 (p2 / province :name (n4 / name :op1 "Marseilles"))))"#
        );
        assert_eq!(
            translate(&text).unwrap(),
            "(FRA FLT ECH) SUP ((ITA AMY BUR) MTO MAR)"
        );
    }

    #[test]
    fn test_build_binds_bare_concepts() {
        let text = r#"(b / build-01 :ARG0 (c / country :name (n / name :op1 "Germany")) :ARG1 (f / fleet) :location (p / province :name (n2 / name :op1 "Kiel")))"#;
        assert_eq!(translate(text).unwrap(), "(GER FLT KIE) BLD");
    }

    #[test]
    fn test_coast_pattern() {
        let text = r#"(c / coast :location (n / north :part-of (p / province :name (n2 / name :op1 "Spain"))))"#;
        assert_eq!(translate(text).unwrap(), "(SPA NCS)");
    }

    #[test]
    fn test_alliance_with_and_without_enemies() {
        let allies = r#"(a / and :op1 (c / country :name (n / name :op1 "England")) :op2 (c2 / country :name (n2 / name :op1 "France")))"#;
        let text = format!(
            r#"(a2 / ally-01 :ARG1 {allies} :ARG3 (c3 / country :name (n3 / name :op1 "Germany")))"#
        );
        assert_eq!(translate(&text).unwrap(), "ALY (ENG FRA) VSS (GER)");

        let text = format!("(a2 / ally-01 :ARG1 {allies})");
        assert_eq!(translate(&text).unwrap(), "ALY (ENG FRA)");
    }

    #[test]
    fn test_peace_collapses_conjunction() {
        let text = r#"(p / peace :op1 (a / and :op1 (c / country :name (n / name :op1 "England")) :op2 (c2 / country :name (n2 / name :op1 "France")) :op3 (c3 / country :name (n3 / name :op1 "Germany"))))"#;
        assert_eq!(translate(text).unwrap(), "PCE (ENG FRA GER)");
    }

    #[test]
    fn test_conjunction_parenthesizes_compound_parts() {
        let text = format!(
            r#"(s / submit-01 :ARG1 (a2 / and :op1 (h / hold-03 :ARG1 {ITALIAN_ARMY}) :op2 (h2 / hold-03 :ARG1 (f / fleet :mod (c2 / country :name (n3 / name :op1 "Italy")) :location (p2 / province :name (n4 / name :op1 "Venice"))))))"#
        );
        assert_eq!(
            translate(&text).unwrap(),
            "SUB (((ITA AMY BUR) HLD) ((ITA FLT VEN) HLD))"
        );
    }

    #[test]
    fn test_supply_center_rule_needs_proposal_ancestor() {
        let have = r#"(h / have-03 :ARG0 (c / country :name (n / name :op1 "France")) :ARG1 (p2 / province :name (n2 / name :op1 "Spain")))"#;

        let proposed = format!("(p / propose-01 :ARG0 (i / i) :ARG1 {have})");
        assert_eq!(translate(&proposed).unwrap(), "PRP (SCD (FRA SPA))");

        assert_eq!(translate(have).unwrap(), "(have-03 :ARG0 FRA :ARG1 SPA)");
    }

    #[test]
    fn test_fallback_rendering() {
        let text = r#"(a / attack-01 :ARG0 (c / country :name (n / name :op1 "Turkey")) :ARG1 (c2 / country :name (n2 / name :op1 "Atlantis")) :mod "soon")"#;
        assert_eq!(
            translate(text).unwrap(),
            r#"(attack-01 :ARG0 TUR :ARG1 (country :name (name :op1 "Atlantis")) :mod "soon")"#
        );
    }

    #[test]
    fn test_empty_amr_yields_empty_daide() {
        assert_eq!(translate("(a / amr-empty)").unwrap(), "");
    }

    #[test]
    fn test_cycles_fail_the_item() {
        assert_eq!(
            translate("(a / foo-01 :ARG1 (b / bar-01 :ARG1 a))"),
            Err(TranslateError::DepthExceeded(MAX_TRANSLATION_DEPTH))
        );
    }

    const ENGLAND: &str = r#"(c1 / country :name (n1 / name :op1 "England"))"#;
    const FRANCE: &str = r#"(c2 / country :name (n2 / name :op1 "France"))"#;
    const GERMANY: &str = r#"(c3 / country :name (n3 / name :op1 "Germany"))"#;

    #[test]
    fn test_agree_to_two_party_peace() {
        let text = format!("(a / agree-01 :ARG0 (i / i) :ARG1 (p / peace :op1 {ENGLAND} :op2 {FRANCE}))");
        assert_eq!(translate(&text).unwrap(), "YES (PCE (ENG FRA))");
    }

    #[test]
    fn test_reject_three_party_peace() {
        let text = format!(
            "(r / reject-01 :ARG0 (i / i) :ARG1 (p / peace :op1 {ENGLAND} :op2 {FRANCE} :op3 {GERMANY}))"
        );
        assert_eq!(translate(&text).unwrap(), "REJ (PCE (ENG FRA GER))");
    }

    #[test]
    fn test_demilitarized_zone() {
        let text = format!(
            r#"(d / demilitarize-01 :ARG1 (x / and :op1 {ENGLAND} :op2 {FRANCE}) :ARG2 (p / province :name (n / name :op1 "Burgundy")))"#
        );
        assert_eq!(translate(&text).unwrap(), "DMZ (ENG FRA) (BUR)");
    }

    #[test]
    fn test_remove_order() {
        let text = format!("(r / remove-01 :ARG1 {ITALIAN_ARMY})");
        assert_eq!(translate(&text).unwrap(), "(ITA AMY BUR) REM");
    }

    const ENGLISH_FLEET: &str = r#"(f / fleet :mod (c4 / country :name (n4 / name :op1 "England")) :location (s / sea :name (n5 / name :op1 "North" :op2 "Sea")))"#;
    const ENGLISH_ARMY: &str = r#"(a / army :mod (c5 / country :name (n6 / name :op1 "England")) :location (p / province :name (n7 / name :op1 "London")))"#;
    const NORWAY: &str = r#"(p2 / province :name (n8 / name :op1 "Norway"))"#;

    #[test]
    fn test_convoy_path_wins_over_convoying_fleet() {
        let text = format!(
            r#"(t / transport-01 :ARG0 {ENGLISH_FLEET} :ARG1 {ENGLISH_ARMY} :ARG3 {NORWAY} :ARG4 (s2 / sea :name (n9 / name :op1 "North" :op2 "Sea")))"#
        );
        assert_eq!(translate(&text).unwrap(), "(ENG AMY LON) CTO NWY VIA NTH");
    }

    #[test]
    fn test_convoying_fleet() {
        let text = format!("(t / transport-01 :ARG0 {ENGLISH_FLEET} :ARG1 {ENGLISH_ARMY} :ARG3 {NORWAY})");
        assert_eq!(translate(&text).unwrap(), "(ENG FLT NTH) CVY (ENG AMY LON) CTO NWY");
    }

    #[test]
    fn test_retreat_order() {
        let text = r#"(r / retreat-01 :ARG1 (f / fleet :mod (c / country :name (n / name :op1 "France")) :location (s / sea :name (n2 / name :op1 "English" :op2 "Channel"))) :destination (p / province :name (n3 / name :op1 "Brest")))"#;
        assert_eq!(translate(text).unwrap(), "(FRA FLT ECH) RTO BRE");
    }

    #[test]
    fn test_shared_node_is_repeated() {
        let text = format!("(x / and :op1 (h / hold-03 :ARG1 {ITALIAN_ARMY}) :op2 h)");
        assert_eq!(
            translate(&text).unwrap(),
            "((ITA AMY BUR) HLD) ((ITA AMY BUR) HLD)"
        );
    }

    #[test]
    fn test_doubling_reentrancy_fails_the_item() {
        let levels = 40;
        let mut text = format!(r#"(x{levels} / leaf-01 :mod "end")"#);
        for k in (0..levels).rev() {
            text = format!("(x{k} / foo-01 :ARG0 {text} :ARG1 x{})", k + 1);
        }
        assert_eq!(
            translate(&text),
            Err(TranslateError::TooLong(MAX_TRANSLATION_LEN))
        );
    }

    #[test]
    fn test_empty_conjunction_binds_its_concept() {
        let text = "(s / submit-01 :ARG1 (x / and :mod (s2 / soon)))";
        assert_eq!(translate(text).unwrap(), "SUB and");
    }

    #[test]
    fn test_unresolved_fillers_are_absent() {
        let text = format!("(x / and :op1 (h / hold-03 :ARG1 {ITALIAN_ARMY}) :op2 z :op3 h)");
        assert_eq!(translate(&text).unwrap(), "((ITA AMY BUR) HLD)");

        let text = r#"(a / attack-01 :ARG0 (c / country :name (n / name :op1 "Turkey")) :ARG1 z)"#;
        assert_eq!(translate(text).unwrap(), "(attack-01 :ARG0 TUR)");
    }
}
