//! CSS and XPath subsets understood by the mock DOM
//!
//! CSS: type/universal selectors, `#id`, `.class`, `[attr]`, `[attr=v]`,
//! descendant and `>` combinators, `,` groups.
//! XPath: `/` and `//` steps (absolute, or relative with `./` and `.//`),
//! name tests and `*`, predicates `@a`, `@a='v'`, `text()='v'`, `.='v'`,
//! `contains(@a|text()|.,'v')`, `normalize-space()='v'`, joined with `and`.
//! Anything else is reported as an invalid selector.

use super::dom::{Dom, DOCUMENT};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum AttrTest {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

/// `parts[0]` is the leftmost compound; each later one carries the
/// combinator joining it to its left neighbour
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

/// A parsed CSS selector list
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CssSelector {
    groups: Vec<Complex>,
}

fn invalid(selector: &str, reason: &str) -> Error {
    Error::invalid_selector(format!("'{}': {}", selector, reason))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Split on `separator` wherever it is not inside a quoted string
fn split_outside_quotes<'a>(input: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, _) if i >= start && input[i..].starts_with(separator) => {
                parts.push(&input[start..i]);
                start = i + separator.len();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

struct Cursor<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            out.push(c);
            self.chars.next();
        }
        if out.is_empty() {
            Err(invalid(self.source, "expected identifier"))
        } else {
            Ok(out)
        }
    }

    fn quoted(&mut self) -> Result<String> {
        let Some(quote) = self.peek().filter(|&c| c == '\'' || c == '"') else {
            return Err(invalid(self.source, "expected quoted string"));
        };
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(invalid(self.source, "unterminated string")),
            }
        }
    }
}

impl CssSelector {
    pub fn parse(source: &str) -> Result<Self> {
        let groups = split_outside_quotes(source, ",")
            .into_iter()
            .map(|group| Self::parse_complex(source, group))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    fn parse_complex(source: &str, group: &str) -> Result<Complex> {
        let mut cursor = Cursor::new(group);
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;

        cursor.skip_ws();
        while cursor.peek().is_some() {
            parts.push((combinator, Self::parse_compound(source, &mut cursor)?));

            let had_ws = cursor.skip_ws();
            combinator = if cursor.eat('>') {
                cursor.skip_ws();
                Combinator::Child
            } else if had_ws {
                Combinator::Descendant
            } else if cursor.peek().is_some() {
                return Err(invalid(source, "unsupported syntax"));
            } else {
                break;
            };

            if cursor.peek().is_none() {
                if combinator == Combinator::Child {
                    return Err(invalid(source, "dangling combinator"));
                }
                break;
            }
        }

        if parts.is_empty() {
            return Err(invalid(source, "empty selector"));
        }
        Ok(Complex { parts })
    }

    fn parse_compound(source: &str, cursor: &mut Cursor<'_>) -> Result<Compound> {
        let mut compound = Compound::default();

        let universal = cursor.eat('*');
        if !universal && cursor.peek().is_some_and(is_ident_char) {
            compound.tag = Some(cursor.ident()?.to_lowercase());
        }

        loop {
            match cursor.peek() {
                Some('#') => {
                    cursor.chars.next();
                    compound.ids.push(cursor.ident()?);
                }
                Some('.') => {
                    cursor.chars.next();
                    compound.classes.push(cursor.ident()?);
                }
                Some('[') => {
                    cursor.chars.next();
                    cursor.skip_ws();
                    let name = cursor.ident()?;
                    cursor.skip_ws();
                    let test = if cursor.eat('=') {
                        cursor.skip_ws();
                        let value = if matches!(cursor.peek(), Some('\'' | '"')) {
                            cursor.quoted()?
                        } else {
                            cursor.ident()?
                        };
                        AttrTest::Equals(name, value)
                    } else {
                        AttrTest::Exists(name)
                    };
                    cursor.skip_ws();
                    if !cursor.eat(']') {
                        return Err(invalid(source, "expected ']'"));
                    }
                    compound.attrs.push(test);
                }
                _ => break,
            }
        }

        if compound == Compound::default() && !universal {
            return Err(invalid(source, "unsupported syntax"));
        }
        Ok(compound)
    }

    pub fn matches(&self, dom: &Dom, node: usize) -> bool {
        self.groups.iter().any(|complex| Self::matches_from(dom, node, &complex.parts))
    }

    fn matches_from(dom: &Dom, node: usize, parts: &[(Combinator, Compound)]) -> bool {
        let Some(((combinator, compound), rest)) = parts.split_last() else {
            return true;
        };
        if !Self::matches_compound(dom, node, compound) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }

        let mut ancestor = dom.parent(node);
        while let Some(candidate) = ancestor.filter(|&a| dom.tag(a) != DOCUMENT) {
            if Self::matches_from(dom, candidate, rest) {
                return true;
            }
            if *combinator == Combinator::Child {
                return false;
            }
            ancestor = dom.parent(candidate);
        }
        false
    }

    fn matches_compound(dom: &Dom, node: usize, compound: &Compound) -> bool {
        compound.tag.as_deref().map_or(true, |tag| dom.tag(node) == tag)
            && compound.ids.iter().all(|id| dom.attr(node, "id") == Some(id.as_str()))
            && compound.classes.iter().all(|class| dom.has_class(node, class))
            && compound.attrs.iter().all(|test| match test {
                AttrTest::Exists(name) => dom.attr(node, name).is_some(),
                AttrTest::Equals(name, value) => dom.attr(node, name) == Some(value.as_str()),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attr(String),
    Text,
    Context,
    NormalizedContext,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Has(String),
    Equals(Operand, String),
    Contains(Operand, String),
    /// `[n]`, 1-based among the step's matches under one parent
    Position(usize),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    descendant: bool,
    /// `None` for `*`
    name: Option<String>,
    predicates: Vec<Predicate>,
}

/// A parsed XPath location path
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XPath {
    absolute: bool,
    steps: Vec<Step>,
}

impl XPath {
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        let (absolute, mut rest) = if let Some(rest) = trimmed.strip_prefix('.') {
            (false, rest)
        } else if trimmed.starts_with('/') {
            (true, trimmed)
        } else {
            (false, trimmed)
        };

        // A bare relative path starts with an implicit child step
        let mut implicit_child = !rest.starts_with('/');
        let mut steps = Vec::new();

        while !rest.is_empty() {
            let descendant = if implicit_child {
                implicit_child = false;
                false
            } else if let Some(after) = rest.strip_prefix("//") {
                rest = after;
                true
            } else if let Some(after) = rest.strip_prefix('/') {
                rest = after;
                false
            } else {
                return Err(invalid(source, "expected '/'"));
            };

            let (step, after) = Self::parse_step(source, rest, descendant)?;
            steps.push(step);
            rest = after;
        }

        if steps.is_empty() {
            return Err(invalid(source, "empty path"));
        }
        Ok(Self { absolute, steps })
    }

    fn parse_step<'a>(source: &str, input: &'a str, descendant: bool) -> Result<(Step, &'a str)> {
        let name_end = input
            .find(|c: char| !(is_ident_char(c) || c == '*'))
            .unwrap_or(input.len());
        let name = &input[..name_end];
        let name = match name {
            "*" => None,
            _ if !name.is_empty() && !name.contains('*') => Some(name.to_lowercase()),
            _ => return Err(invalid(source, "expected element name")),
        };

        let mut rest = &input[name_end..];
        let mut predicates = Vec::new();
        while let Some(after) = rest.strip_prefix('[') {
            let close = Self::closing_bracket(after).ok_or_else(|| invalid(source, "expected ']'"))?;
            for clause in split_outside_quotes(&after[..close], " and ") {
                predicates.push(Self::parse_predicate(source, clause.trim())?);
            }
            rest = &after[close + 1..];
        }

        Ok((
            Step {
                descendant,
                name,
                predicates,
            },
            rest,
        ))
    }

    /// Index of the `]` closing a predicate, skipping quoted text
    fn closing_bracket(input: &str) -> Option<usize> {
        let mut quote = None;
        for (i, c) in input.char_indices() {
            match (quote, c) {
                (None, '\'' | '"') => quote = Some(c),
                (Some(q), _) if c == q => quote = None,
                (None, ']') => return Some(i),
                _ => {}
            }
        }
        None
    }

    fn literal(source: &str, input: &str) -> Result<String> {
        let input = input.trim();
        let quote = input.chars().next().filter(|&c| c == '\'' || c == '"');
        match quote {
            Some(q) if input.len() >= 2 && input.ends_with(q) => Ok(input[1..input.len() - 1].to_string()),
            _ => Err(invalid(source, "expected string literal")),
        }
    }

    fn operand(source: &str, input: &str) -> Result<Operand> {
        match input.trim() {
            "text()" => Ok(Operand::Text),
            "." => Ok(Operand::Context),
            "normalize-space()" | "normalize-space(.)" | "normalize-space(text())" => {
                Ok(Operand::NormalizedContext)
            }
            other => other
                .strip_prefix('@')
                .filter(|name| !name.is_empty() && name.chars().all(is_ident_char))
                .map(|name| Operand::Attr(name.to_string()))
                .ok_or_else(|| invalid(source, "unsupported expression")),
        }
    }

    fn parse_predicate(source: &str, clause: &str) -> Result<Predicate> {
        if let Ok(position) = clause.parse::<usize>() {
            if position == 0 {
                return Err(invalid(source, "positions start at 1"));
            }
            return Ok(Predicate::Position(position));
        }

        if let Some(args) = clause.strip_prefix("contains(").and_then(|c| c.strip_suffix(')')) {
            let (target, needle) = args.split_once(',').ok_or_else(|| invalid(source, "contains() needs two arguments"))?;
            return Ok(Predicate::Contains(Self::operand(source, target)?, Self::literal(source, needle)?));
        }

        if let Some((left, right)) = clause.split_once('=') {
            return Ok(Predicate::Equals(Self::operand(source, left)?, Self::literal(source, right)?));
        }

        match Self::operand(source, clause)? {
            Operand::Attr(name) => Ok(Predicate::Has(name)),
            _ => Err(invalid(source, "unsupported predicate")),
        }
    }

    fn value_of(dom: &Dom, node: usize, operand: &Operand) -> Option<String> {
        match operand {
            Operand::Attr(name) => dom.attr(node, name).map(str::to_string),
            Operand::Text => Some(dom.text_of(node)),
            Operand::Context => Some(dom.text_content(node)),
            Operand::NormalizedContext => Some(dom.text_content(node).split_whitespace().collect::<Vec<_>>().join(" ")),
        }
    }

    fn satisfies(dom: &Dom, node: usize, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Has(name) => dom.attr(node, name).is_some(),
            Predicate::Equals(operand, value) => Self::value_of(dom, node, operand).as_deref() == Some(value.as_str()),
            Predicate::Contains(operand, needle) => {
                Self::value_of(dom, node, operand).is_some_and(|v| v.contains(needle.as_str()))
            }
            // Applied per parent in `evaluate`
            Predicate::Position(_) => true,
        }
    }

    /// Matching elements in document order
    pub fn evaluate(&self, dom: &Dom, context: usize) -> Vec<usize> {
        let document = dom.document_of(context);
        let mut current = vec![if self.absolute { document } else { context }];

        for step in &self.steps {
            let mut next: Vec<usize> = Vec::new();
            for &node in &current {
                let parents: Vec<usize> = if step.descendant {
                    std::iter::once(node).chain(dom.descendants(node)).collect()
                } else {
                    vec![node]
                };
                for parent in parents {
                    let mut matched: Vec<usize> = dom
                        .child_nodes(parent)
                        .iter()
                        .copied()
                        .filter(|&child| step.name.as_deref().map_or(true, |name| dom.tag(child) == name))
                        .collect();
                    for predicate in &step.predicates {
                        matched = match predicate {
                            Predicate::Position(n) => matched.get(n - 1).copied().into_iter().collect(),
                            _ => matched
                                .into_iter()
                                .filter(|&child| Self::satisfies(dom, child, predicate))
                                .collect(),
                        };
                    }
                    next.extend(matched);
                }
            }
            next.sort_unstable();
            next.dedup();
            current = next;
        }

        // Arena order is not document order once nodes are inserted later
        let found: std::collections::HashSet<usize> = current.into_iter().collect();
        dom.descendants(document)
            .into_iter()
            .filter(|node| found.contains(node))
            .collect()
    }
}
