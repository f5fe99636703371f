use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::core::dom::{Document, Node, NodeId, NodeType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Parse error in '{selector}': {message}")]
    Parse { selector: String, message: String },
    #[error("Unsupported pseudo-class: {0}")]
    UnsupportedPseudoClass(String),
    #[error("Pseudo-elements never match elements: {0}")]
    PseudoElement(String),
}

pub type Result<T> = std::result::Result<T, SelectorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combinator {
    None,
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeOperator {
    Exists,
    Equal,
    Contains,
    DashMatch,
    StartsWith,
    EndsWith,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeSelector {
    pub name: String,
    pub operator: AttributeOperator,
    pub value: Option<String>,
    pub case_insensitive: bool,
}

impl AttributeSelector {
    fn matches(&self, node: &Node) -> bool {
        let Some(actual) = node.attributes.get(&self.name) else {
            return false;
        };
        if self.operator == AttributeOperator::Exists {
            return true;
        }
        let Some(expected) = self.value.as_deref() else {
            return false;
        };
        let (actual, expected) = if self.case_insensitive {
            (actual.to_lowercase(), expected.to_lowercase())
        } else {
            (actual.clone(), expected.to_string())
        };
        match self.operator {
            AttributeOperator::Exists => true,
            AttributeOperator::Equal => actual == expected,
            AttributeOperator::Contains => actual.split_whitespace().any(|v| v == expected),
            AttributeOperator::DashMatch => {
                actual == expected || actual.starts_with(&format!("{}-", expected))
            }
            AttributeOperator::StartsWith => !expected.is_empty() && actual.starts_with(&expected),
            AttributeOperator::EndsWith => !expected.is_empty() && actual.ends_with(&expected),
            AttributeOperator::Substring => !expected.is_empty() && actual.contains(&expected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild(NthPattern),
    NthLastChild(NthPattern),
    Not(Box<SimpleSelector>),
    Checked,
    Enabled,
    Disabled,
}

/// `an+b` from `:nth-child()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NthPattern {
    pub a: i32,
    pub b: i32,
}

impl NthPattern {
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let input: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        match input.to_ascii_lowercase().as_str() {
            "odd" => return Some(Self::new(2, 1)),
            "even" => return Some(Self::new(2, 0)),
            _ => {}
        }
        let Some(n_pos) = input.find(['n', 'N']) else {
            return input.parse().ok().map(|b| Self::new(0, b));
        };
        let a = match &input[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            a => a.parse().ok()?,
        };
        let b = match &input[n_pos + 1..] {
            "" => 0,
            b => b.strip_prefix('+').unwrap_or(b).parse().ok()?,
        };
        Some(Self::new(a, b))
    }

    /// `position` is 1-based.
    pub fn matches(&self, position: i32) -> bool {
        let offset = position - self.b;
        match self.a {
            0 => offset == 0,
            a if a > 0 => offset >= 0 && offset % a == 0,
            a => offset <= 0 && offset % a == 0,
        }
    }
}

/// One compound selector such as `input.big[type=checkbox]:checked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleSelector {
    pub element_name: Option<String>,
    pub id: Option<String>,
    pub classes: SmallVec<[String; 4]>,
    pub attributes: SmallVec<[AttributeSelector; 2]>,
    pub pseudo_classes: SmallVec<[PseudoClass; 2]>,
}

impl SimpleSelector {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.element_name.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
    }
}

/// Compound selectors chained right to left: `simple_selector` is the
/// subject, `next` is the compound on its left joined by `combinator`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComplexSelector {
    pub simple_selector: SimpleSelector,
    pub combinator: Combinator,
    pub next: Option<Box<ComplexSelector>>,
}

impl ComplexSelector {
    pub fn new(simple_selector: SimpleSelector) -> Self {
        Self {
            simple_selector,
            combinator: Combinator::None,
            next: None,
        }
    }

    pub fn with_combinator(
        simple_selector: SimpleSelector,
        combinator: Combinator,
        next: ComplexSelector,
    ) -> Self {
        Self {
            simple_selector,
            combinator,
            next: Some(Box::new(next)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub complex_selectors: SmallVec<[ComplexSelector; 2]>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        SelectorParser::new(input).parse()
    }

    pub fn matches(&self, node_id: NodeId, document: &Document, matcher: &SelectorMatcher) -> bool {
        self.complex_selectors
            .iter()
            .any(|cs| matcher.matches_complex_selector(cs, node_id, document))
    }
}

pub struct SelectorParser<'a> {
    input: &'a str,
    position: usize,
    current: Option<char>,
}

impl<'a> SelectorParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            current: input.chars().next(),
        }
    }

    fn error(&self, message: impl Into<String>) -> SelectorError {
        SelectorError::Parse {
            selector: self.input.to_string(),
            message: message.into(),
        }
    }

    fn parse(&mut self) -> Result<Selector> {
        let mut complex_selectors = SmallVec::new();
        loop {
            self.skip_whitespace();
            complex_selectors.push(self.parse_complex_selector()?);
            self.skip_whitespace();
            if self.consume_char(',') {
                continue;
            }
            if !self.is_at_end() {
                return Err(self.error(format!("unexpected '{}'", self.current.unwrap_or(' '))));
            }
            break;
        }
        Ok(Selector { complex_selectors })
    }

    fn parse_complex_selector(&mut self) -> Result<ComplexSelector> {
        let mut compounds = vec![(self.parse_simple_selector()?, Combinator::None)];
        loop {
            let combinator = self.parse_combinator();
            if combinator == Combinator::None {
                break;
            }
            compounds.push((self.parse_simple_selector()?, combinator));
        }

        // Fold so the rightmost compound becomes the subject.
        let mut compounds = compounds.into_iter();
        let (first, _) = compounds
            .next()
            .ok_or_else(|| self.error("expected selector"))?;
        let mut chain = ComplexSelector::new(first);
        for (simple, combinator) in compounds {
            chain = ComplexSelector::with_combinator(simple, combinator, chain);
        }
        Ok(chain)
    }

    fn parse_simple_selector(&mut self) -> Result<SimpleSelector> {
        let mut selector = SimpleSelector::new();
        while let Some(c) = self.current {
            match c {
                '*' if selector.element_name.is_none() => {
                    self.advance();
                    selector.element_name = Some("*".to_string());
                }
                '#' => {
                    self.advance();
                    selector.id = Some(self.parse_name()?);
                }
                '.' => {
                    self.advance();
                    selector.classes.push(self.parse_name()?);
                }
                '[' => selector.attributes.push(self.parse_attribute()?),
                ':' => {
                    self.advance();
                    if self.consume_char(':') {
                        return Err(SelectorError::PseudoElement(self.parse_name()?));
                    }
                    selector.pseudo_classes.push(self.parse_pseudo_class()?);
                }
                c if (c.is_alphabetic() || c == '_') && selector.element_name.is_none() => {
                    selector.element_name = Some(self.parse_name()?.to_lowercase());
                }
                _ => break,
            }
        }
        if selector.is_empty() {
            return Err(self.error("expected selector"));
        }
        Ok(selector)
    }

    fn parse_combinator(&mut self) -> Combinator {
        let had_whitespace = self.skip_whitespace();
        let combinator = match self.current {
            Some('>') => Combinator::Child,
            Some('+') => Combinator::NextSibling,
            Some('~') => Combinator::SubsequentSibling,
            Some(',') | None => return Combinator::None,
            _ if had_whitespace => return Combinator::Descendant,
            _ => return Combinator::None,
        };
        self.advance();
        self.skip_whitespace();
        combinator
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector> {
        self.expect_char('[')?;
        self.skip_whitespace();
        let name = self.parse_name()?.to_ascii_lowercase();
        self.skip_whitespace();

        let (operator, value) = if self.current == Some(']') {
            (AttributeOperator::Exists, None)
        } else {
            let operator = match self.current {
                Some('=') => AttributeOperator::Equal,
                Some('~') => AttributeOperator::Contains,
                Some('|') => AttributeOperator::DashMatch,
                Some('^') => AttributeOperator::StartsWith,
                Some('$') => AttributeOperator::EndsWith,
                Some('*') => AttributeOperator::Substring,
                _ => return Err(self.error("expected attribute operator")),
            };
            self.advance();
            if operator != AttributeOperator::Equal {
                self.expect_char('=')?;
            }
            self.skip_whitespace();
            let value = if matches!(self.current, Some('"') | Some('\'')) {
                self.parse_string()?
            } else {
                self.parse_name()?
            };
            (operator, Some(value))
        };

        self.skip_whitespace();
        let case_insensitive = if matches!(self.current, Some('i') | Some('I')) {
            self.advance();
            self.skip_whitespace();
            true
        } else {
            false
        };
        self.expect_char(']')?;

        Ok(AttributeSelector {
            name,
            operator,
            value,
            case_insensitive,
        })
    }

    fn parse_pseudo_class(&mut self) -> Result<PseudoClass> {
        let name = self.parse_name()?.to_ascii_lowercase();
        match name.as_str() {
            "root" => Ok(PseudoClass::Root),
            "empty" => Ok(PseudoClass::Empty),
            "first-child" => Ok(PseudoClass::FirstChild),
            "last-child" => Ok(PseudoClass::LastChild),
            "only-child" => Ok(PseudoClass::OnlyChild),
            "checked" => Ok(PseudoClass::Checked),
            "enabled" => Ok(PseudoClass::Enabled),
            "disabled" => Ok(PseudoClass::Disabled),
            "nth-child" => Ok(PseudoClass::NthChild(self.parse_nth_argument()?)),
            "nth-last-child" => Ok(PseudoClass::NthLastChild(self.parse_nth_argument()?)),
            "not" => {
                self.expect_char('(')?;
                self.skip_whitespace();
                let selector = self.parse_simple_selector()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(PseudoClass::Not(Box::new(selector)))
            }
            _ => Err(SelectorError::UnsupportedPseudoClass(name)),
        }
    }

    fn parse_nth_argument(&mut self) -> Result<NthPattern> {
        self.expect_char('(')?;
        let start = self.position;
        while !matches!(self.current, Some(')') | None) {
            self.advance();
        }
        let input = self.input;
        let argument = &input[start..self.position];
        self.expect_char(')')?;
        NthPattern::parse(argument)
            .ok_or_else(|| self.error(format!("invalid nth pattern '{}'", argument.trim())))
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.position;
        while let Some(c) = self.current {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.position {
            Err(self.error("expected name"))
        } else {
            Ok(self.input[start..self.position].to_string())
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = self.current.ok_or_else(|| self.error("expected string"))?;
        self.advance();
        let mut string = String::new();
        while let Some(c) = self.current {
            self.advance();
            if c == quote {
                return Ok(string);
            }
            if c == '\\' {
                if let Some(escaped) = self.current {
                    string.push(escaped);
                    self.advance();
                }
            } else {
                string.push(c);
            }
        }
        Err(self.error("unterminated string"))
    }

    fn advance(&mut self) {
        if let Some(c) = self.current {
            self.position += c.len_utf8();
        }
        self.current = self.input[self.position..].chars().next();
    }

    fn is_at_end(&self) -> bool {
        self.current.is_none()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while matches!(self.current, Some(c) if c.is_whitespace()) {
            self.advance();
        }
        self.position != start
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.current == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        if self.consume_char(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }
}

/// Matches parsed selectors against live nodes. Holds no per-node state, so
/// results always reflect the current tree.
#[derive(Debug, Default)]
pub struct SelectorMatcher;

impl SelectorMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn matches_complex_selector(
        &self,
        selector: &ComplexSelector,
        node_id: NodeId,
        document: &Document,
    ) -> bool {
        if !self.matches_simple_selector(&selector.simple_selector, node_id, document) {
            return false;
        }
        let Some(ref next) = selector.next else {
            return true;
        };
        match selector.combinator {
            Combinator::None => true,
            Combinator::Descendant => self.matches_descendant(next, node_id, document),
            Combinator::Child => self.matches_child(next, node_id, document),
            Combinator::NextSibling => self.matches_next_sibling(next, node_id, document),
            Combinator::SubsequentSibling => {
                self.matches_subsequent_sibling(next, node_id, document)
            }
        }
    }

    fn matches_simple_selector(
        &self,
        selector: &SimpleSelector,
        node_id: NodeId,
        document: &Document,
    ) -> bool {
        let Some(node) = document.get_node(node_id) else {
            return false;
        };
        let node = node.read();
        if !node.is_element() {
            return false;
        }
        if let Some(ref element_name) = selector.element_name {
            if element_name != "*" && !node.tag_name.eq_ignore_ascii_case(element_name) {
                return false;
            }
        }
        if let Some(ref id) = selector.id {
            if node.attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !selector
            .classes
            .iter()
            .all(|class| node.classes().any(|c| c == class.as_str()))
        {
            return false;
        }
        if !selector.attributes.iter().all(|a| a.matches(&node)) {
            return false;
        }
        drop(node);
        selector
            .pseudo_classes
            .iter()
            .all(|pc| self.matches_pseudo_class(pc, node_id, document))
    }

    fn sibling_position(&self, node_id: NodeId, document: &Document) -> Option<(usize, usize)> {
        let parent = document.get_parent(node_id)?;
        let siblings = document.element_children(parent);
        let index = siblings.iter().position(|&id| id == node_id)?;
        Some((index, siblings.len()))
    }

    fn matches_pseudo_class(
        &self,
        pseudo_class: &PseudoClass,
        node_id: NodeId,
        document: &Document,
    ) -> bool {
        match pseudo_class {
            PseudoClass::Root => document
                .get_parent(node_id)
                .map(|p| document.node_type(p) == Some(NodeType::Document))
                .unwrap_or(false),
            PseudoClass::Empty => document.get_children(node_id).iter().all(|&child| {
                document.node_type(child) == Some(NodeType::Comment)
            }),
            PseudoClass::FirstChild => {
                matches!(self.sibling_position(node_id, document), Some((0, _)))
            }
            PseudoClass::LastChild => {
                matches!(self.sibling_position(node_id, document), Some((i, n)) if i + 1 == n)
            }
            PseudoClass::OnlyChild => {
                matches!(self.sibling_position(node_id, document), Some((_, 1)))
            }
            PseudoClass::NthChild(pattern) => self
                .sibling_position(node_id, document)
                .map(|(i, _)| pattern.matches(i as i32 + 1))
                .unwrap_or(false),
            PseudoClass::NthLastChild(pattern) => self
                .sibling_position(node_id, document)
                .map(|(i, n)| pattern.matches((n - i) as i32))
                .unwrap_or(false),
            PseudoClass::Not(inner) => !self.matches_simple_selector(inner, node_id, document),
            PseudoClass::Checked => document
                .get_node(node_id)
                .map(|n| {
                    let n = n.read();
                    matches!(n.input_type().as_deref(), Some("checkbox") | Some("radio"))
                        && n.is_checked()
                })
                .unwrap_or(false),
            PseudoClass::Disabled => document.has_attribute(node_id, "disabled"),
            PseudoClass::Enabled => !document.has_attribute(node_id, "disabled"),
        }
    }

    fn matches_descendant(
        &self,
        selector: &ComplexSelector,
        mut node_id: NodeId,
        document: &Document,
    ) -> bool {
        while let Some(parent_id) = document.get_parent(node_id) {
            if self.matches_complex_selector(selector, parent_id, document) {
                return true;
            }
            node_id = parent_id;
        }
        false
    }

    fn matches_child(&self, selector: &ComplexSelector, node_id: NodeId, document: &Document) -> bool {
        document
            .get_parent(node_id)
            .map(|parent_id| self.matches_complex_selector(selector, parent_id, document))
            .unwrap_or(false)
    }

    fn preceding_element_siblings(&self, node_id: NodeId, document: &Document) -> Vec<NodeId> {
        let Some(parent_id) = document.get_parent(node_id) else {
            return Vec::new();
        };
        let siblings = document.element_children(parent_id);
        let position = siblings
            .iter()
            .position(|&id| id == node_id)
            .unwrap_or(0);
        siblings[..position].to_vec()
    }

    fn matches_next_sibling(
        &self,
        selector: &ComplexSelector,
        node_id: NodeId,
        document: &Document,
    ) -> bool {
        self.preceding_element_siblings(node_id, document)
            .last()
            .map(|&prev| self.matches_complex_selector(selector, prev, document))
            .unwrap_or(false)
    }

    fn matches_subsequent_sibling(
        &self,
        selector: &ComplexSelector,
        node_id: NodeId,
        document: &Document,
    ) -> bool {
        self.preceding_element_siblings(node_id, document)
            .into_iter()
            .any(|sibling| self.matches_complex_selector(selector, sibling, document))
    }
}

/// Parses selectors once and runs them against a document.
#[derive(Debug, Default)]
pub struct SelectorEngine {
    matcher: SelectorMatcher,
    cached_selectors: DashMap<String, Selector>,
}

impl SelectorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_selector(&self, input: &str) -> Result<Selector> {
        if let Some(cached) = self.cached_selectors.get(input) {
            return Ok(cached.clone());
        }
        let selector = Selector::parse(input)?;
        self.cached_selectors
            .insert(input.to_string(), selector.clone());
        Ok(selector)
    }

    pub fn matches(&self, selector_text: &str, node_id: NodeId, document: &Document) -> Result<bool> {
        let selector = self.parse_selector(selector_text)?;
        Ok(selector.matches(node_id, document, &self.matcher))
    }

    pub fn query_selector(
        &self,
        selector_text: &str,
        root: NodeId,
        document: &Document,
    ) -> Result<Option<NodeId>> {
        let selector = self.parse_selector(selector_text)?;
        Ok(document
            .descendants(root)
            .into_iter()
            .find(|&id| selector.matches(id, document, &self.matcher)))
    }

    pub fn query_selector_all(
        &self,
        selector_text: &str,
        root: NodeId,
        document: &Document,
    ) -> Result<Vec<NodeId>> {
        let selector = self.parse_selector(selector_text)?;
        Ok(document
            .descendants(root)
            .into_iter()
            .filter(|&id| selector.matches(id, document, &self.matcher))
            .collect())
    }

    pub fn cached_selector_count(&self) -> usize {
        self.cached_selectors.len()
    }
}
