//! # Logic-less Templates
//!
//! A small mustache dialect, enough for card markup:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `{{key}}` | Interpolate, XML-escaped |
//! | `{{{key}}}`, `{{& key}}` | Interpolate raw |
//! | `{{#key}}…{{/key}}` | Render if truthy; once per item for lists |
//! | `{{^key}}…{{/key}}` | Render if falsy or absent |
//! | `{{! text}}` | Comment |
//!
//! Lookups walk the context stack from the innermost list item outwards.
//! Missing keys render as nothing.
//!
//! ```
//! use framey::document::{Fields, Template};
//!
//! let t = Template::parse("{{#year}}({{year}}){{/year}}{{^year}}n/a{{/year}}").unwrap();
//! let mut fields = Fields::new();
//! assert_eq!(t.render(&fields), "n/a");
//! fields.insert("year", "1971");
//! assert_eq!(t.render(&fields), "(1971)");
//! ```

use std::collections::BTreeMap;

use crate::error::{FrameyError, Result};

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bool(bool),
    List(Vec<Fields>),
}

impl Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Fields>> for Value {
    fn from(items: Vec<Fields>) -> Self {
        Value::List(items)
    }
}

/// Named values a template is rendered against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set `key` only when there is a value; absent stays absent.
    pub fn insert_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.0.insert(key.into(), value.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Shorthand for a text value.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var { name: String, escape: bool },
    Section { name: String, inverted: bool, children: Vec<Node> },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

/// Section being collected while parsing.
struct Frame {
    name: String,
    inverted: bool,
    nodes: Vec<Node>,
}

enum Tag<'a> {
    Var(&'a str),
    Raw(&'a str),
    Open(&'a str, bool),
    Close(&'a str),
    Comment,
}

impl Template {
    /// Parse template source. Unterminated tags and unbalanced sections are
    /// errors.
    pub fn parse(source: &str) -> Result<Self> {
        let mut stack = vec![Frame {
            name: String::new(),
            inverted: false,
            nodes: Vec::new(),
        }];
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            push_text(&mut stack, &rest[..start]);
            let after = &rest[start + 2..];
            let tag_at = offset + start;

            let (tag, consumed) = if let Some(inner) = after.strip_prefix('{') {
                let end = inner
                    .find("}}}")
                    .ok_or_else(|| template_error(tag_at, "unterminated '{{{' tag"))?;
                (Tag::Raw(inner[..end].trim()), 1 + end + 3)
            } else {
                let end = after
                    .find("}}")
                    .ok_or_else(|| template_error(tag_at, "unterminated '{{' tag"))?;
                (classify(&after[..end]), end + 2)
            };

            match tag {
                Tag::Comment => {}
                Tag::Var(name) | Tag::Raw(name) if name.is_empty() => {
                    return Err(template_error(tag_at, "empty tag"));
                }
                Tag::Var(name) => current(&mut stack).push(Node::Var {
                    name: name.to_string(),
                    escape: true,
                }),
                Tag::Raw(name) => current(&mut stack).push(Node::Var {
                    name: name.to_string(),
                    escape: false,
                }),
                Tag::Open(name, inverted) => {
                    if name.is_empty() {
                        return Err(template_error(tag_at, "empty section name"));
                    }
                    stack.push(Frame {
                        name: name.to_string(),
                        inverted,
                        nodes: Vec::new(),
                    });
                }
                Tag::Close(name) => {
                    if stack.len() == 1 {
                        return Err(template_error(
                            tag_at,
                            &format!("closing '{}' without an open section", name),
                        ));
                    }
                    let frame = stack.pop().ok_or_else(|| template_error(tag_at, "empty stack"))?;
                    if frame.name != name {
                        return Err(template_error(
                            tag_at,
                            &format!("expected '{{{{/{}}}}}', found '{{{{/{}}}}}'", frame.name, name),
                        ));
                    }
                    current(&mut stack).push(Node::Section {
                        name: frame.name,
                        inverted: frame.inverted,
                        children: frame.nodes,
                    });
                }
            }

            offset += start + 2 + consumed;
            rest = &after[consumed..];
        }
        push_text(&mut stack, rest);

        if stack.len() > 1 {
            let open: Vec<_> = stack[1..].iter().map(|f| f.name.as_str()).collect();
            return Err(FrameyError::Template(format!(
                "unclosed section(s): {}",
                open.join(", ")
            )));
        }
        let nodes = stack.pop().map(|f| f.nodes).unwrap_or_default();
        Ok(Self { nodes })
    }

    /// Render against `fields`.
    pub fn render(&self, fields: &Fields) -> String {
        let mut out = String::new();
        let mut scope = vec![fields];
        render_nodes(&self.nodes, &mut scope, &mut out);
        out
    }
}

fn classify(body: &str) -> Tag<'_> {
    let body = body.trim();
    match body.chars().next() {
        Some('!') => Tag::Comment,
        Some('#') => Tag::Open(body[1..].trim(), false),
        Some('^') => Tag::Open(body[1..].trim(), true),
        Some('/') => Tag::Close(body[1..].trim()),
        Some('&') => Tag::Raw(body[1..].trim()),
        _ => Tag::Var(body),
    }
}

fn current(stack: &mut [Frame]) -> &mut Vec<Node> {
    // The root frame is never popped during parsing.
    let last = stack.len() - 1;
    &mut stack[last].nodes
}

fn push_text(stack: &mut [Frame], text: &str) {
    if !text.is_empty() {
        current(stack).push(Node::Text(text.to_string()));
    }
}

fn template_error(at: usize, msg: &str) -> FrameyError {
    FrameyError::Template(format!("at byte {}: {}", at, msg))
}

fn lookup<'a>(scope: &[&'a Fields], name: &str) -> Option<&'a Value> {
    scope.iter().rev().find_map(|fields| fields.get(name))
}

fn render_nodes<'a>(nodes: &'a [Node], scope: &mut Vec<&'a Fields>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { name, escape } => match lookup(scope, name) {
                Some(Value::Text(s)) if *escape => escape_xml_into(s, out),
                Some(Value::Text(s)) => out.push_str(s),
                Some(Value::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
                Some(Value::List(_)) | None => {}
            },
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = lookup(scope, name);
                let truthy = value.is_some_and(Value::is_truthy);
                if *inverted {
                    if !truthy {
                        render_nodes(children, scope, out);
                    }
                    continue;
                }
                match value {
                    Some(Value::List(items)) => {
                        for item in items {
                            scope.push(item);
                            render_nodes(children, scope, out);
                            scope.pop();
                        }
                    }
                    Some(_) if truthy => render_nodes(children, scope, out),
                    _ => {}
                }
            }
        }
    }
}

/// Escape text for XML content and attribute values.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_xml_into(s, &mut out);
    out
}

fn escape_xml_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
