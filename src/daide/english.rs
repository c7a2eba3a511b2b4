use thiserror::Error;

use crate::lexicon::Lexicon;
use crate::utility::finish_clause;

use super::tree::DaideTree;

pub const MAX_RENDER_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("DAIDE nesting exceeds {0} levels")]
    DepthExceeded(usize),
}

/// Grammatical role the caller expects the rendering to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Form {
    #[default]
    Plain,
    /// Noun phrase, e.g. one member of a list.
    Noun,
    /// A list of noun phrases, "A, B and C".
    NounList,
    /// An order being submitted, phrased in the future tense.
    Order,
    /// Object of a verb such as "propose".
    Complement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Phrase,
    /// A full sentence, to be capitalized and terminated.
    Clause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Semantics {
    #[default]
    Plain,
    /// A coastal location, which takes "on" rather than "in".
    Coast,
}

/// Generated English with the tags that describe it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Gloss {
    pub text: String,
    pub syntax: Syntax,
    pub semantics: Semantics,
}

impl Gloss {
    fn phrase(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn clause(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            syntax: Syntax::Clause,
            ..Self::default()
        }
    }

    /// Text ready for display: clauses get a capital and a full stop.
    pub fn finish(&self) -> String {
        match self.syntax {
            Syntax::Clause => finish_clause(&self.text),
            Syntax::Phrase => self.text.clone(),
        }
    }
}

pub struct EnglishGenerator<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> EnglishGenerator<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn render(&self, tree: &DaideTree, form: Form) -> Result<Gloss, GenerateError> {
        self.render_at(tree, form, 0)
    }

    fn render_at(&self, tree: &DaideTree, form: Form, level: usize) -> Result<Gloss, GenerateError> {
        if level > MAX_RENDER_DEPTH {
            return Err(GenerateError::DepthExceeded(MAX_RENDER_DEPTH));
        }
        let items = match tree {
            DaideTree::Token(token) => return Ok(Gloss::phrase(self.leaf(token))),
            DaideTree::List(items) => items,
        };
        if form == Form::NounList {
            return self.render_list(items, level);
        }

        let text = |tree: &DaideTree| -> Result<String, GenerateError> {
            Ok(self.render_at(tree, Form::Plain, level + 1)?.text)
        };
        let future = form == Form::Order;

        match items.as_slice() {
            [unit, keyword, destination] if keyword.is_token("MTO") => {
                let (unit, destination) = (text(unit)?, text(destination)?);
                return Ok(Gloss::clause(if future {
                    format!("{unit} shall move to {destination}")
                } else {
                    format!("{unit} moved to {destination}")
                }));
            }
            [unit, keyword] if keyword.is_token("HLD") => {
                let unit = text(unit)?;
                return Ok(Gloss::clause(if future {
                    format!("{unit} shall remain in place")
                } else {
                    format!("{unit} remained in place")
                }));
            }
            [supporter, keyword, supported, order @ ..]
                if keyword.is_token("SUP") && (order.is_empty() || order.len() == 2) =>
            {
                let (supporter, supported) = (text(supporter)?, text(supported)?);
                let object = match order {
                    [keyword, destination] if keyword.is_token("MTO") => {
                        format!("{supported} moving to {}", text(destination)?)
                    }
                    [action, target] if action.as_token().is_some() => {
                        format!("{supported} {} {}", text(action)?, text(target)?)
                    }
                    _ => supported,
                };
                return Ok(Gloss::clause(if future {
                    format!("{supporter} shall support {object}")
                } else {
                    format!("{supporter} supported {object}")
                }));
            }
            [DaideTree::Token(head), ..] => {
                if let Some(gloss) = self.render_keyed(head, items, form, level)? {
                    return Ok(gloss);
                }
            }
            _ => {}
        }

        // Anything else is mirrored token by token.
        let parts = items.iter().map(text).collect::<Result<Vec<_>, _>>()?;
        let joined = parts.join(" ");
        Ok(Gloss::phrase(if level > 0 {
            format!("({joined})")
        } else {
            joined
        }))
    }

    /// Shapes recognized by their leading token.
    fn render_keyed(
        &self,
        head: &str,
        items: &[DaideTree],
        form: Form,
        level: usize,
    ) -> Result<Option<Gloss>, GenerateError> {
        let lexicon = self.lexicon;
        let render = |tree: &DaideTree, form: Form| self.render_at(tree, form, level + 1);

        if items.len() == 1 {
            let name = lexicon
                .power_name(head)
                .or_else(|| lexicon.province_name(head))
                .or_else(|| lexicon.sea_name(head));
            if let Some(name) = name {
                return Ok(Some(Gloss::phrase(name)));
            }
        }

        // the English fleet in Liverpool
        if let [_, DaideTree::Token(unit_type), location] = items {
            if let (Some(power), Some(unit_type)) =
                (lexicon.power_name(head), lexicon.unit_type_name(unit_type))
            {
                let location = render(location, Form::Plain)?;
                if !location.text.is_empty() {
                    let pertainym = lexicon.pertainym(power).unwrap_or(power);
                    let preposition = match location.semantics {
                        Semantics::Coast => "on",
                        Semantics::Plain => "in",
                    };
                    return Ok(Some(Gloss::phrase(format!(
                        "the {pertainym} {unit_type} {preposition} {}",
                        location.text
                    ))));
                }
            }
        }

        // the south coast of Spain
        if let [_, DaideTree::Token(coast)] = items {
            if let (Some(province), Some(coast)) =
                (lexicon.province_name(head), lexicon.coast_name(coast))
            {
                let article = if lexicon.uses_definite_article(province) {
                    "the "
                } else {
                    ""
                };
                return Ok(Some(Gloss {
                    text: format!("the {coast} of {article}{province}"),
                    syntax: Syntax::Phrase,
                    semantics: Semantics::Coast,
                }));
            }
        }

        match head {
            "SUB" if items.len() == 2 => {
                let order = render(&items[1], Form::Order)?;
                Ok(Some(Gloss::clause(format!(
                    "we submit the following order: {}",
                    order.text
                ))))
            }
            "SUB" if items.len() > 2 => {
                let mut text = String::from("we submit the following orders:");
                let last = items.len() - 1;
                for (i, order) in items.iter().enumerate().skip(1) {
                    let order = render(order, Form::Order)?;
                    text.push_str(&format!(" ({i}) {}", order.text));
                    if i + 1 < last {
                        text.push(';');
                    } else if i < last {
                        text.push_str("; and");
                    }
                }
                Ok(Some(Gloss::clause(text)))
            }
            "PRP" if items.len() >= 2 => {
                let proposal = render(&items[1], Form::Complement)?;
                Ok(Some(Gloss::clause(format!("we propose {}", proposal.text))))
            }
            "ALY" => {
                let allies = match items.get(1) {
                    Some(allies) => render(allies, Form::NounList)?.text,
                    None => String::new(),
                };
                if allies.is_empty() {
                    return Ok(Some(Gloss::phrase("an alliance")));
                }
                let enemies = match items.get(2) {
                    Some(enemies) => render(enemies, Form::NounList)?.text,
                    None => String::new(),
                };
                let against = if enemies.is_empty() {
                    String::new()
                } else {
                    format!(" against {enemies}")
                };
                Ok(Some(match form {
                    Form::Complement | Form::Noun => {
                        Gloss::phrase(format!("an alliance between {allies}{against}"))
                    }
                    _ => Gloss::clause(format!("{allies} are allies{against}")),
                }))
            }
            _ => Ok(None),
        }
    }

    /// "A", "A and B", "A, B and C".
    fn render_list(&self, items: &[DaideTree], level: usize) -> Result<Gloss, GenerateError> {
        let mut text = String::new();
        let n = items.len();
        for (i, item) in items.iter().enumerate() {
            text.push_str(&self.render_at(item, Form::Noun, level + 1)?.text);
            if i + 2 < n {
                text.push_str(", ");
            } else if i + 2 == n {
                text.push_str(" and ");
            }
        }
        Ok(Gloss::phrase(text))
    }

    fn leaf(&self, token: &str) -> String {
        let lexicon = self.lexicon;
        if let Some(location) = lexicon.location_name(token) {
            return if lexicon.uses_definite_article(location) {
                format!("the {location}")
            } else {
                location.to_string()
            };
        }
        lexicon.name_for(token).unwrap_or(token).to_string()
    }
}
