//! XPath-style element selector: the location-path subset used to pick
//! examples out of a document.
//!
//! Supported:
//!   - paths: `/a/b`, `//a`, `./a`, `.//a`, `a/b`, `..`, unions `a | b`
//!   - node tests: names (prefix kept verbatim, e.g. `mml:math`) and `*`
//!   - axes: `child::`, `descendant::`, `descendant-or-self::`, `self::`, `parent::`
//!   - predicates: `[2]`, `[last()]`, `[@id]`, `[@id='x']`, `[@id!='x']`, `[title]`,
//!     `[title='x']`, `[text()='x']`, `[contains(@id,'x')]`, `[contains(text(),'x')]`,
//!     `[not(...)]`
//!
//! Relative paths are evaluated against the root element, absolute paths against
//! the document node.

use crate::xml::{NodeId, XmlDocument};
use std::fmt;

#[derive(Debug, Clone)]
pub struct SelectorError {
    pub selector: String,
    pub position: usize,
    pub message: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid selector {:?} at offset {}: {}",
            self.selector, self.position, self.message
        )
    }
}

impl std::error::Error for SelectorError {}

/// Compiled selector. Cheap to clone and share across worker threads.
#[derive(Clone, Debug)]
pub struct Selector {
    source: String,
    paths: Vec<LocationPath>,
}

#[derive(Clone, Debug)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Clone, Debug)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfNode,
    Parent,
}

#[derive(Clone, Debug)]
enum NodeTest {
    Name(String),
    AnyElement,
    AnyNode,
}

#[derive(Clone, Copy, Debug)]
enum Cmp {
    Eq,
    Ne,
}

impl Cmp {
    fn apply(self, value: &str, literal: &str) -> bool {
        match self {
            Cmp::Eq => value == literal,
            Cmp::Ne => value != literal,
        }
    }
}

#[derive(Clone, Debug)]
enum Target {
    Attr(String),
    Text,
}

#[derive(Clone, Debug)]
enum Predicate {
    Position(usize),
    Last,
    Attr { name: String, cmp: Option<(Cmp, String)> },
    Text(Option<(Cmp, String)>),
    Child { name: String, cmp: Option<(Cmp, String)> },
    Contains { target: Target, needle: String },
    Not(Box<Predicate>),
}

/// Evaluation context: the document node or an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Ctx {
    Doc,
    El(NodeId),
}

impl Selector {
    pub fn compile(source: &str) -> Result<Self, SelectorError> {
        let mut p = Parser { src: source, chars: source.chars().collect(), pos: 0 };
        let paths = p.parse_union()?;
        Ok(Self { source: source.to_string(), paths })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matched elements in document order, without duplicates.
    pub fn select(&self, doc: &XmlDocument) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::new();
        for path in &self.paths {
            out.extend(eval_path(path, doc).into_iter().filter_map(|c| match c {
                Ctx::El(id) => Some(id),
                Ctx::Doc => None,
            }));
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ----------------- evaluation -----------------

fn eval_path(path: &LocationPath, doc: &XmlDocument) -> Vec<Ctx> {
    let mut ctxs = if path.absolute { vec![Ctx::Doc] } else { vec![Ctx::El(doc.root())] };
    for step in &path.steps {
        let mut next = Vec::new();
        for &ctx in &ctxs {
            let mut cands: Vec<Ctx> = axis_nodes(doc, ctx, step.axis)
                .into_iter()
                .filter(|c| node_test(doc, *c, &step.test))
                .collect();
            for pred in &step.predicates {
                let size = cands.len();
                cands = cands
                    .into_iter()
                    .enumerate()
                    .filter(|(i, c)| holds(doc, *c, i + 1, size, pred))
                    .map(|(_, c)| c)
                    .collect();
            }
            next.extend(cands);
        }
        next.sort_unstable();
        next.dedup();
        ctxs = next;
        if ctxs.is_empty() {
            break;
        }
    }
    ctxs
}

fn axis_nodes(doc: &XmlDocument, ctx: Ctx, axis: Axis) -> Vec<Ctx> {
    match (axis, ctx) {
        (Axis::Child, Ctx::Doc) => vec![Ctx::El(doc.root())],
        (Axis::Child, Ctx::El(id)) => doc.children(id).iter().map(|&c| Ctx::El(c)).collect(),
        (Axis::Descendant, Ctx::Doc) => {
            let root = doc.root();
            std::iter::once(root).chain(doc.descendants(root)).map(Ctx::El).collect()
        }
        (Axis::Descendant, Ctx::El(id)) => doc.descendants(id).into_iter().map(Ctx::El).collect(),
        (Axis::DescendantOrSelf, _) => {
            let mut v = vec![ctx];
            v.extend(axis_nodes(doc, ctx, Axis::Descendant));
            v
        }
        (Axis::SelfNode, _) => vec![ctx],
        (Axis::Parent, Ctx::Doc) => Vec::new(),
        (Axis::Parent, Ctx::El(id)) => match doc.parent(id) {
            Some(p) => vec![Ctx::El(p)],
            None => vec![Ctx::Doc],
        },
    }
}

fn node_test(doc: &XmlDocument, ctx: Ctx, test: &NodeTest) -> bool {
    match (test, ctx) {
        (NodeTest::AnyNode, _) => true,
        (_, Ctx::Doc) => false,
        (NodeTest::AnyElement, Ctx::El(_)) => true,
        (NodeTest::Name(n), Ctx::El(id)) => doc.name(id) == n,
    }
}

fn holds(doc: &XmlDocument, ctx: Ctx, position: usize, size: usize, pred: &Predicate) -> bool {
    match pred {
        Predicate::Position(n) => position == *n,
        Predicate::Last => position == size,
        Predicate::Not(inner) => !holds(doc, ctx, position, size, inner),
        _ => {
            let Ctx::El(id) = ctx else { return false };
            match pred {
                Predicate::Attr { name, cmp } => match (doc.attr(id, name), cmp) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(v), Some((c, lit))) => c.apply(v, lit),
                },
                Predicate::Text(cmp) => {
                    let texts = doc.direct_texts(id);
                    match cmp {
                        None => !texts.is_empty(),
                        Some((c, lit)) => texts.iter().any(|t| c.apply(t, lit)),
                    }
                }
                Predicate::Child { name, cmp } => doc
                    .children(id)
                    .iter()
                    .filter(|&&c| doc.name(c) == name)
                    .any(|&c| match cmp {
                        None => true,
                        Some((op, lit)) => op.apply(&doc.inner_text(c), lit),
                    }),
                Predicate::Contains { target, needle } => {
                    let hay = match target {
                        Target::Attr(a) => doc.attr(id, a).unwrap_or(""),
                        Target::Text => doc.direct_texts(id).first().copied().unwrap_or(""),
                    };
                    hay.contains(needle.as_str())
                }
                Predicate::Position(_) | Predicate::Last | Predicate::Not(_) => false,
            }
        }
    }
}

// ----------------- parsing -----------------

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn err<T>(&self, message: impl Into<String>) -> Result<T, SelectorError> {
        Err(SelectorError {
            selector: self.src.to_string(),
            position: self.pos,
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<char> {
        self.chars.get(self.pos + off).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str) -> Result<(), SelectorError> {
        self.skip_ws();
        if self.eat(s) {
            Ok(())
        } else {
            self.err(format!("expected '{}'", s))
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_union(&mut self) -> Result<Vec<LocationPath>, SelectorError> {
        let mut paths = Vec::new();
        loop {
            self.skip_ws();
            paths.push(self.parse_path()?);
            self.skip_ws();
            if !self.eat("|") {
                break;
            }
        }
        if self.peek().is_some() {
            return self.err("unexpected trailing input");
        }
        Ok(paths)
    }

    fn parse_path(&mut self) -> Result<LocationPath, SelectorError> {
        let mut steps = Vec::new();
        let absolute = if self.eat("//") {
            steps.push(descendant_or_self());
            true
        } else if self.eat("/") {
            if matches!(self.peek(), None | Some('|')) || self.peek().map_or(false, char::is_whitespace) {
                return self.err("'/' alone selects the document node, not an element");
            }
            true
        } else {
            false
        };
        steps.push(self.parse_step()?);
        loop {
            if self.eat("//") {
                steps.push(descendant_or_self());
            } else if !self.eat("/") {
                break;
            }
            steps.push(self.parse_step()?);
        }
        Ok(LocationPath { absolute, steps })
    }

    fn parse_step(&mut self) -> Result<Step, SelectorError> {
        if self.eat("..") {
            return Ok(Step { axis: Axis::Parent, test: NodeTest::AnyNode, predicates: Vec::new() });
        }
        if self.eat(".") {
            return Ok(Step { axis: Axis::SelfNode, test: NodeTest::AnyNode, predicates: Vec::new() });
        }
        if self.peek() == Some('@') {
            return self.err("attribute selection is not supported: the selector must return elements");
        }

        let mut axis = Axis::Child;
        let test = if self.eat("*") {
            NodeTest::AnyElement
        } else {
            let name = self.parse_name()?;
            if self.eat("::") {
                axis = match name.as_str() {
                    "child" => Axis::Child,
                    "descendant" => Axis::Descendant,
                    "descendant-or-self" => Axis::DescendantOrSelf,
                    "self" => Axis::SelfNode,
                    "parent" => Axis::Parent,
                    other => return self.err(format!("unsupported axis '{}'", other)),
                };
                if self.eat("*") {
                    NodeTest::AnyElement
                } else if self.eat("node()") {
                    NodeTest::AnyNode
                } else {
                    NodeTest::Name(self.parse_name()?)
                }
            } else if self.peek() == Some('(') {
                return self.err(format!("node test '{}()' is not supported", name));
            } else {
                NodeTest::Name(name)
            }
        };

        let mut predicates = Vec::new();
        loop {
            self.skip_ws();
            if !self.eat("[") {
                break;
            }
            self.skip_ws();
            predicates.push(self.parse_predicate()?);
            self.expect("]")?;
        }
        Ok(Step { axis, test, predicates })
    }

    fn parse_name(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return self.err("expected an element name"),
        }
        while let Some(c) = self.peek() {
            let ok = c.is_alphanumeric()
                || c == '_'
                || c == '-'
                || c == '.'
                || (c == ':' && self.peek_at(1) != Some(':') && self.pos > start);
            if !ok {
                break;
            }
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_predicate(&mut self) -> Result<Predicate, SelectorError> {
        if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            let n = self.parse_number()?;
            if n == 0 {
                return self.err("positions start at 1");
            }
            return Ok(Predicate::Position(n));
        }
        if self.eat("@") {
            let name = self.parse_name()?;
            let cmp = self.parse_cmp()?;
            return Ok(Predicate::Attr { name, cmp });
        }
        let name = self.parse_name()?;
        self.skip_ws();
        if !self.eat("(") {
            let cmp = self.parse_cmp()?;
            return Ok(Predicate::Child { name, cmp });
        }
        self.skip_ws();
        match name.as_str() {
            "last" => {
                self.expect(")")?;
                Ok(Predicate::Last)
            }
            "text" => {
                self.expect(")")?;
                let cmp = self.parse_cmp()?;
                Ok(Predicate::Text(cmp))
            }
            "not" => {
                let inner = self.parse_predicate()?;
                self.expect(")")?;
                Ok(Predicate::Not(Box::new(inner)))
            }
            "contains" => {
                let target = if self.eat("@") {
                    Target::Attr(self.parse_name()?)
                } else if self.eat("text()") {
                    Target::Text
                } else {
                    return self.err("contains() expects @attribute or text() as first argument");
                };
                self.expect(",")?;
                self.skip_ws();
                let needle = self.parse_literal()?;
                self.expect(")")?;
                Ok(Predicate::Contains { target, needle })
            }
            other => self.err(format!("unsupported function '{}()'", other)),
        }
    }

    fn parse_cmp(&mut self) -> Result<Option<(Cmp, String)>, SelectorError> {
        self.skip_ws();
        let cmp = if self.eat("!=") {
            Cmp::Ne
        } else if self.eat("=") {
            Cmp::Eq
        } else {
            return Ok(None);
        };
        self.skip_ws();
        let lit = self.parse_literal()?;
        Ok(Some((cmp, lit)))
    }

    fn parse_literal(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == q {
                        let lit: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(lit);
                    }
                    self.pos += 1;
                }
                self.err("unterminated string literal")
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let start = self.pos;
                self.pos += 1;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                Ok(self.chars[start..self.pos].iter().collect())
            }
            _ => self.err("expected a quoted string"),
        }
    }

    fn parse_number(&mut self) -> Result<usize, SelectorError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        match digits.parse() {
            Ok(n) => Ok(n),
            Err(_) => self.err("position out of range"),
        }
    }
}

fn descendant_or_self() -> Step {
    Step { axis: Axis::DescendantOrSelf, test: NodeTest::AnyNode, predicates: Vec::new() }
}
