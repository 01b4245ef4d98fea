//! SVG parsing.
//!
//! [`Tokenizer`] turns the text into positioned tokens and [`TreeBuilder`]
//! folds them into a [`Document`], keeping the stack of open elements and the
//! entity table declared by the DOCTYPE.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::escape::unescape_with;
use regex::Regex;
use tracing::debug;

use crate::ast::*;
use crate::error::ParseError;
use crate::tokenize::{Failure, Pos, RawAttribute, Spanned, Token, Tokenizer};

/// Elements whose text content is kept verbatim, whitespace included.
pub const TEXT_ELEMENTS: &[&str] = &[
    "a",
    "altGlyph",
    "altGlyphDef",
    "altGlyphItem",
    "glyph",
    "glyphRef",
    "text",
    "textPath",
    "tref",
    "tspan",
    "pre",
    "title",
];

pub fn is_text_element(name: &str) -> bool {
    TEXT_ELEMENTS.contains(&name)
}

static ENTITY_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!ENTITY\s+(\S+)\s+(?:'([^']+)'|"([^"]+)")\s*>"#).expect("entity pattern is valid")
});

/// Parse an SVG string into a Document.
pub fn parse_svg(svg: &str) -> Result<Document, ParseError> {
    parse_svg_with_path(svg, None)
}

/// Parse an SVG string, naming `path` in diagnostics.
pub fn parse_svg_with_path(svg: &str, path: Option<&str>) -> Result<Document, ParseError> {
    TreeBuilder::new(svg, path).run()
}

struct TreeBuilder<'a> {
    source: &'a str,
    path: Option<&'a str>,
    doc: Document,
    stack: Vec<NodeId>,
    entities: HashMap<String, String>,
    saw_root: bool,
    closed_root: bool,
    saw_doctype: bool,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, path: Option<&'a str>) -> Self {
        Self {
            source,
            path,
            doc: Document::new(),
            stack: Vec::new(),
            entities: HashMap::new(),
            saw_root: false,
            closed_root: false,
            saw_doctype: false,
        }
    }

    fn run(mut self) -> Result<Document, ParseError> {
        let mut tokenizer = Tokenizer::new(self.source);

        loop {
            match tokenizer.next_token() {
                Ok(Some(spanned)) => self.push(spanned)?,
                Ok(None) => break,
                Err(Failure::Invalid { reason, pos }) => return Err(self.error(reason, pos)),
                Err(Failure::UnexpectedEnd { pos }) => {
                    if self.stack.is_empty() {
                        debug!(line = pos.line, column = pos.column, "ignoring truncated markup");
                    }
                    break;
                }
            }
        }

        if !self.stack.is_empty() {
            return Err(self.error("Unclosed root tag", tokenizer.pos()));
        }
        Ok(self.doc)
    }

    fn error(&self, reason: impl Into<String>, pos: Pos) -> ParseError {
        ParseError::new(
            reason,
            pos.line,
            pos.column,
            self.source,
            self.path.map(str::to_owned),
        )
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.doc.root())
    }

    fn attach(&mut self, id: NodeId) {
        let parent = self.current();
        self.doc.push_child(parent, id);
    }

    fn push(&mut self, spanned: Spanned<'_>) -> Result<(), ParseError> {
        let Spanned { token, start, end } = spanned;
        match token {
            Token::Text(raw) => self.text(raw, start)?,
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => self.open(name, attributes, self_closing)?,
            Token::EndTag { name } => self.close(name, end)?,
            Token::Comment(value) => {
                let id = self.doc.create_comment(value);
                self.attach(id);
            }
            Token::Cdata(value) => {
                let id = self.doc.create_cdata(value);
                self.attach(id);
            }
            Token::Instruction { name, body } => {
                let id = self.doc.create_instruction(name, body);
                self.attach(id);
            }
            Token::Doctype(body) => self.doctype(body, start)?,
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Option<&str> {
        self.entities
            .get(name)
            .map(String::as_str)
            .or_else(|| predefined_entity(name))
    }

    /// Replace entity and character references. `pos` is where `raw` starts.
    fn decode<'s>(&self, raw: &'s str, pos: Pos) -> Result<Cow<'s, str>, ParseError> {
        unescape_with(raw, |name| self.resolve(name)).map_err(|_| {
            let offset = self.bad_reference(raw).unwrap_or(0);
            self.error("Invalid character entity", advance(pos, &raw[..offset]))
        })
    }

    /// Byte offset of the first `&` that doesn't start a resolvable reference.
    fn bad_reference(&self, raw: &str) -> Option<usize> {
        raw.match_indices('&').map(|(offset, _)| offset).find(|&offset| {
            let rest = &raw[offset + 1..];
            let Some(end) = rest.find(';') else {
                return true;
            };
            let name = &rest[..end];
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                return self.resolve(name).is_none();
            };
            !code.and_then(char::from_u32).is_some_and(|c| c != '\0')
        })
    }

    fn text(&mut self, raw: &str, pos: Pos) -> Result<(), ParseError> {
        let Some(&parent) = self.stack.last() else {
            let Some(offset) = raw.find(|c: char| !c.is_whitespace()) else {
                return Ok(());
            };
            let reason = if self.closed_root {
                "Text data outside of root node."
            } else {
                "Non-whitespace before first tag."
            };
            return Err(self.error(reason, advance(pos, &raw[..offset])));
        };

        let text = self.decode(raw, pos)?;
        let preserve = self
            .doc
            .element(parent)
            .is_some_and(|e| is_text_element(&e.name));
        let id = if preserve {
            self.doc.create_text(text)
        } else {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(());
            }
            self.doc.create_text(trimmed)
        };
        self.doc.push_child(parent, id);
        Ok(())
    }

    fn open(
        &mut self,
        name: &str,
        attributes: Vec<RawAttribute<'_>>,
        self_closing: bool,
    ) -> Result<(), ParseError> {
        let mut element = Element::new(name);
        for attr in attributes {
            // first occurrence wins
            if element.has_attr(attr.name) {
                continue;
            }
            let value = self.decode(attr.value, attr.pos)?;
            element.set_attr(attr.name, value);
        }

        let id = self.doc.create_element(element);
        self.attach(id);
        if self.stack.is_empty() {
            self.saw_root = true;
            self.closed_root = self_closing;
        }
        if !self_closing {
            self.stack.push(id);
        }
        Ok(())
    }

    fn close(&mut self, name: &str, pos: Pos) -> Result<(), ParseError> {
        let Some(&current) = self.stack.last() else {
            return Err(self.error(format!("Unmatched closing tag: {name}"), pos));
        };

        if self.doc.element(current).is_some_and(|e| e.is(name)) {
            self.stack.pop();
            if self.stack.is_empty() {
                self.closed_root = true;
            }
            return Ok(());
        }

        let is_open = self
            .stack
            .iter()
            .any(|&id| self.doc.element(id).is_some_and(|e| e.is(name)));
        let reason = if is_open {
            "Unexpected close tag".to_string()
        } else {
            format!("Unmatched closing tag: {name}")
        };
        Err(self.error(reason, pos))
    }

    fn doctype(&mut self, body: &str, pos: Pos) -> Result<(), ParseError> {
        if self.saw_root || self.saw_doctype {
            return Err(self.error("Inappropriately located doctype declaration", pos));
        }
        self.saw_doctype = true;

        // Malformed declarations simply don't match.
        if let Some(subset) = body.find('[') {
            for caps in ENTITY_DECLARATION.captures_iter(&body[subset..]) {
                let (Some(name), Some(value)) = (caps.get(1), caps.get(2).or_else(|| caps.get(3)))
                else {
                    continue;
                };
                self.entities
                    .insert(name.as_str().to_owned(), value.as_str().to_owned());
            }
        }

        let id = self.doc.create_doctype(body);
        self.attach(id);
        Ok(())
    }
}

fn predefined_entity(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

/// Position after reading `skipped` from `pos`.
fn advance(mut pos: Pos, skipped: &str) -> Pos {
    for c in skipped.chars() {
        if c == '\n' {
            pos.line += 1;
            pos.column = 1;
        } else {
            pos.column += 1;
        }
    }
    pos
}
