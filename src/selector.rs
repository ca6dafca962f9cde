//! Minimal CSS selector support for tree queries.
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute
//! selectors (`[a]`, `[a=v]`, `[a~=v]`, `[a|=v]`, `[a^=v]`, `[a$=v]`,
//! `[a*=v]`), descendant and child combinators, and selector lists.
//! A `.` directly followed by `[` is accepted and ignored so that targetized
//! compounds such as `div.[x-target='foo']` (from `div.@foo`) still parse.

use crate::dom::NodeRef;
use crate::error::{ControllerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    // Left to right; `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttributeMatch {
    name: String,
    test: Option<(AttributeOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser {
            source,
            chars: source.chars().collect(),
            pos: 0,
        };
        let alternatives = parser.parse_list()?;
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, node: &NodeRef) -> bool {
        node.is_element()
            && self
                .alternatives
                .iter()
                .any(|complex| complex.matches_at(complex.compounds.len() - 1, node))
    }
}

impl Complex {
    fn matches_at(&self, index: usize, node: &NodeRef) -> bool {
        if !self.compounds[index].matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => node
                .parent_element()
                .map(|parent| self.matches_at(index - 1, &parent))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut current = node.parent_element();
                while let Some(ancestor) = current {
                    if self.matches_at(index - 1, &ancestor) {
                        return true;
                    }
                    current = ancestor.parent_element();
                }
                false
            }
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }

    fn matches(&self, node: &NodeRef) -> bool {
        if let Some(tag) = &self.tag {
            if !node.has_tag(tag) {
                return false;
            }
        }

        if !self.ids.is_empty() {
            let id = node.attribute("id");
            if !self.ids.iter().all(|want| id.as_deref() == Some(want.as_str())) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let class = node.attribute("class").unwrap_or_default();
            let present: Vec<&str> = class.split_whitespace().collect();
            if !self.classes.iter().all(|want| present.contains(&want.as_str())) {
                return false;
            }
        }

        self.attributes.iter().all(|attr| attr.matches(node))
    }
}

impl AttributeMatch {
    fn matches(&self, node: &NodeRef) -> bool {
        let Some(actual) = node.attribute(&self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.test else {
            return true;
        };

        match op {
            AttributeOp::Equals => actual == *expected,
            AttributeOp::Includes => actual.split_whitespace().any(|word| word == expected),
            AttributeOp::DashMatch => {
                actual == *expected || actual.starts_with(&format!("{}-", expected))
            }
            AttributeOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
            AttributeOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
            AttributeOp::Substring => !expected.is_empty() && actual.contains(expected.as_str()),
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> ControllerError {
        ControllerError::InvalidSelector {
            selector: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(alternatives)
    }

    fn parse_complex(&mut self) -> Result<Complex> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut universal = false;

        if self.peek() == Some('*') {
            self.bump();
            universal = true;
        } else if self.peek().map(is_name_char).unwrap_or(false) {
            compound.tag = Some(self.parse_name()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.parse_name()?);
                }
                Some('.') => {
                    self.bump();
                    if self.peek() == Some('[') {
                        continue;
                    }
                    compound.classes.push(self.parse_name()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attributes.push(self.parse_attribute()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_attribute(&mut self) -> Result<AttributeMatch> {
        self.skip_whitespace();
        let name = self.parse_name()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.bump() {
            Some(']') => return Ok(AttributeMatch { name, test: None }),
            Some('=') => AttributeOp::Equals,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                if self.bump() != Some('=') {
                    return Err(self.error(format!("expected '=' after '{}'", c)));
                }
                match c {
                    '~' => AttributeOp::Includes,
                    '|' => AttributeOp::DashMatch,
                    '^' => AttributeOp::Prefix,
                    '$' => AttributeOp::Suffix,
                    _ => AttributeOp::Substring,
                }
            }
            _ => return Err(self.error("malformed attribute selector")),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                value
            }
            _ => self.parse_name()?,
        };

        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        Ok(AttributeMatch {
            name,
            test: Some((op, value)),
        })
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while self.peek().map(is_name_char).unwrap_or(false) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_rejects_malformed_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div[").is_err());
        assert!(Selector::parse("[a='b]").is_err());
        assert!(Selector::parse("div >").is_err());
    }

    #[test]
    fn test_matches_compounds_and_combinators() {
        let doc = Document::parse(
            r#"<section id="s"><div class="card big" data-k="one two"><span>a</span></div><p><span>b</span></p></section>"#,
        )
        .unwrap();
        let body = doc.body();

        assert_eq!(body.select("div.card span").unwrap().len(), 1);
        assert_eq!(body.select("section > span").unwrap().len(), 0);
        assert_eq!(body.select("section span").unwrap().len(), 2);
        assert_eq!(body.select("[data-k~=two]").unwrap().len(), 1);
        assert_eq!(body.select("#s > p > span, div").unwrap().len(), 2);
        assert_eq!(body.select("*").unwrap().len(), 5);
    }

    #[test]
    fn test_dangling_dot_before_attribute_is_ignored() {
        let doc = Document::parse(r#"<div x-target="foo"></div><p x-target="foo"></p>"#).unwrap();
        let found = doc.body().select("div.[x-target='foo']").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].local_name(), Some("div"));
    }
}
