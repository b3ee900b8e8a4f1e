//! Markup inspector – parses composed cookbook markup back into a small tree.
//!
//! The composer's output is a controlled subset of HTML, so a hand-written
//! recursive-descent parser is enough:
//! - void elements (`img`, `meta`, `br`, `hr`, `link`) never take children
//! - `style` and `script` bodies are kept as raw text
//! - whitespace-only text between tags is dropped
//!
//! The draft engine uses this to find page blocks; tests use it to check
//! structural properties of composed documents.

use std::collections::HashMap;

use html_escape::decode_html_entities;

const VOID_ELEMENTS: &[&str] = &["img", "meta", "br", "hr", "link", "input"];
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

/// A node in the parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with lower-cased name, attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of this element and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Parse markup into a list of top-level nodes.
pub fn parse_html(html: &str) -> Vec<Node> {
    Parser { input: html, pos: 0 }.parse_nodes(false)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Advance past the next occurrence of `needle`, or to the end.
    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn parse_nodes(&mut self, nested: bool) -> Vec<Node> {
        let mut nodes = Vec::new();
        while !self.eof() {
            if self.starts_with("</") {
                // The parent consumes its own closing tag; a stray closer at
                // the top level is dropped.
                if nested {
                    break;
                }
                self.skip_past(">");
                continue;
            }
            if self.starts_with("<!--") {
                self.skip_past("-->");
            } else if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_past(">");
            } else if self.starts_with("<") {
                nodes.push(Node::Element(self.parse_element()));
            } else {
                let text = self.parse_text();
                if !text.trim().is_empty() {
                    nodes.push(Node::Text(text));
                }
            }
        }
        nodes
    }

    fn parse_text(&mut self) -> String {
        let end = self.rest().find('<').unwrap_or(self.rest().len());
        let raw = &self.rest()[..end];
        self.pos += end;
        decode_html_entities(raw).into_owned()
    }

    fn parse_element(&mut self) -> Element {
        self.pos += 1; // '<'
        let name = self.parse_name().to_ascii_lowercase();
        let mut element = Element::new(name);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Unparseable byte inside a tag: step over it.
                self.advance_char();
                continue;
            }
            if !key.is_empty() {
                element.attributes.insert(key.to_ascii_lowercase(), value);
            }
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return element;
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if VOID_ELEMENTS.contains(&element.name.as_str()) {
            return element;
        }

        if RAW_TEXT_ELEMENTS.contains(&element.name.as_str()) {
            let closing = format!("</{}", element.name);
            let end = self.rest().find(&closing).unwrap_or(self.rest().len());
            let raw = &self.rest()[..end];
            if !raw.trim().is_empty() {
                element.children.push(Node::Text(raw.to_string()));
            }
            self.pos += end;
        } else {
            element.children = self.parse_nodes(true);
        }

        if self.starts_with("</") {
            self.skip_past(">");
        }
        element
    }

    fn parse_name(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name().to_string();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                let rest = self.rest();
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                return decode_html_entities(&rest[..end]).into_owned();
            }
        };
        self.pos += 1;
        let rest = self.rest();
        let end = rest.find(quote).unwrap_or(rest.len());
        self.pos += end;
        if !self.eof() {
            self.pos += 1;
        }
        decode_html_entities(&rest[..end]).into_owned()
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.rest().chars().next() {
            self.pos += c.len_utf8();
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[Node]) -> Vec<Node> {
    for node in nodes {
        if let Node::Element(e) = node {
            if e.name == "body" {
                return e.children.clone();
            }
            if e.name == "html" {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}

/// Top-level blocks of a composed document in order: page blocks
/// (`class="page …"`) and the flowing TOC section (`class="toc …"`).
pub fn document_blocks(nodes: &[Node]) -> Vec<&Element> {
    let mut out = Vec::new();
    collect_blocks(nodes, &mut out);
    out
}

fn collect_blocks<'a>(nodes: &'a [Node], out: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(e) = node {
            if e.has_class("page") || e.has_class("toc") {
                out.push(e);
            } else {
                collect_blocks(&e.children, out);
            }
        }
    }
}

/// Number of fixed-size page blocks in `html`.
pub fn count_page_blocks(html: &str) -> usize {
    let nodes = parse_html(html);
    document_blocks(&nodes)
        .iter()
        .filter(|e| e.has_class("page"))
        .count()
}
