#![forbid(unsafe_code)]

//! A small CSS selector engine for hosts without a native one.
//!
//! Supports the subset the site's markup contract uses:
//!
//! - type selectors (`img`, `*`)
//! - `#id` and `.class`
//! - attribute presence, equality and prefix: `[data-src]`, `[id="x"]`,
//!   `[href^="#"]`
//! - negation of a compound: `:not(.intro)`
//! - the descendant combinator (whitespace)
//!
//! Anything else (child/sibling combinators, selector lists, other
//! pseudo-classes) is rejected with [`Error::Selector`].

use crate::dom::NodeId;
use crate::error::{Error, Result};

/// Read-only view of a tree that selectors can be matched against.
pub trait SelectorTree {
    /// Lowercase tag name, `None` for unknown nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str>;
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;
}

/// A parsed selector: compounds joined by descendant combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Id(String),
    Class(String),
    Attribute { name: String, op: AttrOp },
    Not(Box<Compound>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
}

impl Selector {
    /// Parse `input`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        };
        let mut compounds = Vec::new();
        parser.skip_ws();
        while !parser.at_end() {
            compounds.push(parser.compound()?);
            let had_ws = parser.skip_ws();
            if !parser.at_end() && !had_ws {
                return Err(parser.error("unsupported combinator"));
            }
        }
        if compounds.is_empty() {
            return Err(parser.error("empty selector"));
        }
        Ok(Self { compounds })
    }

    /// Whether `node` matches.
    pub fn matches<T: SelectorTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(tree, node) {
            return false;
        }
        let mut ancestor = tree.parent_of(node);
        for compound in rest.iter().rev() {
            loop {
                let Some(candidate) = ancestor else {
                    return false;
                };
                ancestor = tree.parent_of(candidate);
                if compound.matches(tree, candidate) {
                    break;
                }
            }
        }
        true
    }
}

impl Compound {
    fn matches<T: SelectorTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some(tag) = tree.tag_name(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|expected| expected != tag) {
            return false;
        }
        self.conditions.iter().all(|condition| match condition {
            Condition::Id(id) => tree.attribute_value(node, "id") == Some(id.as_str()),
            Condition::Class(class) => tree
                .attribute_value(node, "class")
                .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class)),
            Condition::Attribute { name, op } => match (tree.attribute_value(node, name), op) {
                (None, _) => false,
                (Some(_), AttrOp::Exists) => true,
                (Some(value), AttrOp::Equals(expected)) => value == expected,
                (Some(value), AttrOp::Prefix(prefix)) => {
                    !prefix.is_empty() && value.starts_with(prefix.as_str())
                }
            },
            Condition::Not(inner) => !inner.matches(tree, node),
        })
    }
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn error(&self, reason: &str) -> Error {
        Error::Selector {
            selector: self.input.to_owned(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }

    fn ident(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80)
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut compound = Compound {
            tag: None,
            conditions: Vec::new(),
        };
        let start = self.pos;
        if self.eat(b'*') {
            // Universal selector: no tag constraint.
        } else if self.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some(b'#') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Id(self.ident()?));
                }
                Some(b'.') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Class(self.ident()?));
                }
                Some(b'[') => {
                    self.pos += 1;
                    compound.conditions.push(self.attribute()?);
                }
                Some(b':') => {
                    self.pos += 1;
                    let name = self.ident()?;
                    if name != "not" || !self.eat(b'(') {
                        return Err(self.error("unsupported pseudo-class"));
                    }
                    self.skip_ws();
                    let inner = self.compound()?;
                    self.skip_ws();
                    if !self.eat(b')') {
                        return Err(self.error("expected `)`"));
                    }
                    compound.conditions.push(Condition::Not(Box::new(inner)));
                }
                _ => break,
            }
        }
        if self.pos == start {
            return Err(self.error("unexpected character"));
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<Condition> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        let op = if self.eat(b']') {
            return Ok(Condition::Attribute {
                name,
                op: AttrOp::Exists,
            });
        } else if self.eat(b'=') {
            AttrOp::Equals(String::new())
        } else if self.eat(b'^') && self.eat(b'=') {
            AttrOp::Prefix(String::new())
        } else {
            return Err(self.error("unsupported attribute operator"));
        };
        self.skip_ws();
        let value = self.attribute_value()?;
        self.skip_ws();
        if !self.eat(b']') {
            return Err(self.error("expected `]`"));
        }
        let op = match op {
            AttrOp::Equals(_) => AttrOp::Equals(value),
            AttrOp::Prefix(_) => AttrOp::Prefix(value),
            AttrOp::Exists => AttrOp::Exists,
        };
        Ok(Condition::Attribute { name, op })
    }

    fn attribute_value(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|b| b != quote) {
                    self.pos += 1;
                }
                if self.at_end() {
                    return Err(self.error("unterminated string"));
                }
                let value = self.input[start..self.pos].to_owned();
                self.pos += 1;
                Ok(value)
            }
            _ => self.ident(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// html > body > nav.top-nav > ul.nav-links > a[href]
    ///                section.intro
    ///                section#about
    struct Tree {
        nodes: Vec<(&'static str, Option<u32>, HashMap<&'static str, &'static str>)>,
    }

    impl SelectorTree for Tree {
        fn tag_name(&self, node: NodeId) -> Option<&str> {
            self.nodes.get(node.get() as usize).map(|n| n.0)
        }
        fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str> {
            self.nodes
                .get(node.get() as usize)
                .and_then(|n| n.2.get(name).copied())
        }
        fn parent_of(&self, node: NodeId) -> Option<NodeId> {
            self.nodes
                .get(node.get() as usize)
                .and_then(|n| n.1)
                .map(NodeId::new)
        }
    }

    fn tree() -> Tree {
        let attrs = |pairs: &[(&'static str, &'static str)]| pairs.iter().copied().collect();
        Tree {
            nodes: vec![
                ("html", None, attrs(&[])),
                ("body", Some(0), attrs(&[])),
                ("nav", Some(1), attrs(&[("class", "top-nav")])),
                ("ul", Some(2), attrs(&[("class", "nav-links open")])),
                ("a", Some(3), attrs(&[("href", "#about")])),
                ("section", Some(1), attrs(&[("class", "intro")])),
                ("section", Some(1), attrs(&[("id", "about")])),
                ("img", Some(6), attrs(&[("data-src", "a.jpg")])),
            ],
        }
    }

    fn matching(selector: &str) -> Vec<u32> {
        let tree = tree();
        let selector = Selector::parse(selector).unwrap();
        (0..tree.nodes.len() as u32)
            .filter(|&i| selector.matches(&tree, NodeId::new(i)))
            .collect()
    }

    #[test]
    fn id_and_class() {
        assert_eq!(matching("#about"), vec![6]);
        assert_eq!(matching(".nav-links"), vec![3]);
        assert_eq!(matching(".open"), vec![3]);
        assert_eq!(matching("ul.nav-links.open"), vec![3]);
    }

    #[test]
    fn descendant_combinator() {
        assert_eq!(matching(".nav-links a"), vec![4]);
        assert_eq!(matching("nav  a"), vec![4]);
        assert_eq!(matching("section a"), Vec::<u32>::new());
        assert_eq!(matching("body section img"), vec![7]);
    }

    #[test]
    fn attributes() {
        assert_eq!(matching(r##"a[href^="#"]"##), vec![4]);
        assert_eq!(matching("a[href^='#ab']"), vec![4]);
        assert_eq!(matching(r#"a[href^="/"]"#), Vec::<u32>::new());
        assert_eq!(matching("img[data-src]"), vec![7]);
        assert_eq!(matching(r#"[data-src="a.jpg"]"#), vec![7]);
    }

    #[test]
    fn negation() {
        assert_eq!(matching("section:not(.intro)"), vec![6]);
        assert_eq!(matching("img:not(.brand-emblem)"), vec![7]);
    }

    #[test]
    fn universal_and_case() {
        assert_eq!(matching("*").len(), 8);
        assert_eq!(matching("SECTION#about"), vec![6]);
    }

    #[test]
    fn unsupported_syntax_is_rejected() {
        for input in ["", "   ", "nav > a", "a, b", "a:hover", "[href~=x]", "#", "a[href"] {
            assert!(
                matches!(Selector::parse(input), Err(Error::Selector { .. })),
                "{input:?} should be rejected"
            );
        }
    }
}
