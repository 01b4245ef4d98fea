//! Markup tokenizer.
//!
//! Splits SVG text into positioned tokens. Tokens borrow raw slices of the
//! input; entity decoding and tree building happen in [`crate::parse`].

use std::borrow::Cow;

/// 1-based position of a character in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pos {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Text(&'a str),
    StartTag {
        name: &'a str,
        attributes: Vec<RawAttribute<'a>>,
        self_closing: bool,
    },
    EndTag {
        name: &'a str,
    },
    Comment(&'a str),
    Cdata(&'a str),
    Instruction {
        name: &'a str,
        body: &'a str,
    },
    Doctype(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawAttribute<'a> {
    pub name: &'a str,
    /// Value between the quotes, entities still encoded
    pub value: &'a str,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned<'a> {
    pub token: Token<'a>,
    /// Position of the first character of the token
    pub start: Pos,
    /// Position of the last character of the token
    pub end: Pos,
}

/// Why tokenizing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Failure {
    /// Malformed markup at `pos`.
    Invalid { reason: Cow<'static, str>, pos: Pos },
    /// Input ended in the middle of a construct.
    UnexpectedEnd { pos: Pos },
}

/// Character cursor with line/column tracking.
#[derive(Debug, Clone)]
struct Cursor<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    /// Position of the most recently consumed character
    last: Pos,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        // A leading byte order mark takes no column.
        let offset = if input.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
        Self {
            input,
            offset,
            line: 1,
            column: 1,
            last: Pos { line: 1, column: 1 },
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.offset..].starts_with(s)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.last = self.pos();
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_str(&mut self, s: &str) {
        for _ in s.chars() {
            self.bump();
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(is_whitespace) {
            self.bump();
            skipped = true;
        }
        skipped
    }

    fn slice_from(&self, start: usize) -> &'a str {
        &self.input[start..self.offset]
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || (!c.is_ascii() && c.is_alphabetic())
}

fn is_name_char(c: char) -> bool {
    is_name_start(c)
        || c.is_ascii_digit()
        || matches!(c, '-' | '.' | '\u{b7}')
        || (!c.is_ascii() && c.is_alphanumeric())
}

/// Markup tokenizer.
pub(crate) struct Tokenizer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            cursor: Cursor::new(input),
        }
    }

    /// Current position, used for end-of-input diagnostics.
    pub fn pos(&self) -> Pos {
        self.cursor.pos()
    }

    /// Next token, or `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Spanned<'a>>, Failure> {
        let start = self.cursor.pos();
        let token = match self.cursor.peek() {
            None => return Ok(None),
            Some('<') => self.markup()?,
            Some(_) => self.text(),
        };
        Ok(Some(Spanned {
            token,
            start,
            end: self.cursor.last,
        }))
    }

    fn invalid<T>(&self, reason: impl Into<Cow<'static, str>>, pos: Pos) -> Result<T, Failure> {
        Err(Failure::Invalid {
            reason: reason.into(),
            pos,
        })
    }

    fn unexpected_end<T>(&self) -> Result<T, Failure> {
        Err(Failure::UnexpectedEnd {
            pos: self.cursor.pos(),
        })
    }

    /// Consume until `terminator`, returning the text before it.
    fn until(&mut self, terminator: &str) -> Result<&'a str, Failure> {
        let start = self.cursor.offset;
        while !self.cursor.starts_with(terminator) {
            if self.cursor.bump().is_none() {
                return self.unexpected_end();
            }
        }
        let body = self.cursor.slice_from(start);
        self.cursor.bump_str(terminator);
        Ok(body)
    }

    fn text(&mut self) -> Token<'a> {
        let start = self.cursor.offset;
        while self.cursor.peek().is_some_and(|c| c != '<') {
            self.cursor.bump();
        }
        Token::Text(self.cursor.slice_from(start))
    }

    fn markup(&mut self) -> Result<Token<'a>, Failure> {
        self.cursor.bump(); // '<'

        if self.cursor.starts_with("!--") {
            self.cursor.bump_str("!--");
            return self.comment();
        }
        if self.cursor.starts_with("![CDATA[") {
            self.cursor.bump_str("![CDATA[");
            return Ok(Token::Cdata(self.until("]]>")?));
        }
        if self.starts_with_doctype() {
            self.cursor.bump_str("!DOCTYPE");
            return self.doctype();
        }

        match self.cursor.peek() {
            None => self.unexpected_end(),
            Some('!') => {
                let pos = self.cursor.pos();
                self.invalid("Invalid markup declaration", pos)
            }
            Some('?') => {
                self.cursor.bump();
                self.instruction()
            }
            Some('/') => {
                self.cursor.bump();
                self.end_tag()
            }
            Some(c) if is_name_start(c) => self.start_tag(),
            Some(_) => {
                let pos = self.cursor.pos();
                self.invalid("Unencoded <", pos)
            }
        }
    }

    fn starts_with_doctype(&self) -> bool {
        let rest = &self.cursor.input[self.cursor.offset..];
        rest.get(..8)
            .is_some_and(|head| head.eq_ignore_ascii_case("!DOCTYPE"))
    }

    fn comment(&mut self) -> Result<Token<'a>, Failure> {
        let start = self.cursor.offset;
        loop {
            if self.cursor.starts_with("--") {
                let body = self.cursor.slice_from(start);
                self.cursor.bump_str("--");
                return match self.cursor.peek() {
                    Some('>') => {
                        self.cursor.bump();
                        Ok(Token::Comment(body))
                    }
                    None => self.unexpected_end(),
                    Some(_) => {
                        let pos = self.cursor.pos();
                        self.invalid("Malformed comment", pos)
                    }
                };
            }
            if self.cursor.bump().is_none() {
                return self.unexpected_end();
            }
        }
    }

    fn doctype(&mut self) -> Result<Token<'a>, Failure> {
        let start = self.cursor.offset;
        let mut quote: Option<char> = None;
        let mut depth = 0usize;
        loop {
            let Some(c) = self.cursor.peek() else {
                return self.unexpected_end();
            };
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '[') => depth += 1,
                (None, ']') => depth = depth.saturating_sub(1),
                (None, '>') if depth == 0 => {
                    let body = self.cursor.slice_from(start);
                    self.cursor.bump();
                    return Ok(Token::Doctype(body));
                }
                _ => {}
            }
            self.cursor.bump();
        }
    }

    fn instruction(&mut self) -> Result<Token<'a>, Failure> {
        let start = self.cursor.offset;
        while self
            .cursor
            .peek()
            .is_some_and(|c| !is_whitespace(c) && c != '?')
        {
            self.cursor.bump();
        }
        let name = self.cursor.slice_from(start);
        if self.cursor.peek().is_none() {
            return self.unexpected_end();
        }
        if name.is_empty() {
            let pos = self.cursor.pos();
            return self.invalid("Invalid processing instruction", pos);
        }
        self.cursor.skip_whitespace();
        let body = self.until("?>")?;
        Ok(Token::Instruction { name, body })
    }

    fn name(&mut self) -> &'a str {
        let start = self.cursor.offset;
        while self.cursor.peek().is_some_and(is_name_char) {
            self.cursor.bump();
        }
        self.cursor.slice_from(start)
    }

    fn end_tag(&mut self) -> Result<Token<'a>, Failure> {
        match self.cursor.peek() {
            None => return self.unexpected_end(),
            Some(c) if is_name_start(c) => {}
            Some(_) => {
                let pos = self.cursor.pos();
                return self.invalid("Invalid tagname in closing tag.", pos);
            }
        }
        let name = self.name();
        self.cursor.skip_whitespace();
        match self.cursor.peek() {
            None => self.unexpected_end(),
            Some('>') => {
                self.cursor.bump();
                Ok(Token::EndTag { name })
            }
            Some(_) => {
                let pos = self.cursor.pos();
                self.invalid("Invalid characters in closing tag", pos)
            }
        }
    }

    fn start_tag(&mut self) -> Result<Token<'a>, Failure> {
        let name = self.name();
        let mut attributes = Vec::new();

        match self.cursor.peek() {
            None => return self.unexpected_end(),
            Some(c) if is_whitespace(c) || c == '>' || c == '/' => {}
            Some(_) => {
                let pos = self.cursor.pos();
                return self.invalid("Invalid character in tag name", pos);
            }
        }

        loop {
            let spaced = self.cursor.skip_whitespace();
            match self.cursor.peek() {
                None => return self.unexpected_end(),
                Some('>') => {
                    self.cursor.bump();
                    return Ok(Token::StartTag {
                        name,
                        attributes,
                        self_closing: false,
                    });
                }
                Some('/') => {
                    self.cursor.bump();
                    return match self.cursor.peek() {
                        None => self.unexpected_end(),
                        Some('>') => {
                            self.cursor.bump();
                            Ok(Token::StartTag {
                                name,
                                attributes,
                                self_closing: true,
                            })
                        }
                        Some(_) => {
                            let pos = self.cursor.pos();
                            self.invalid("Forward-slash in opening tag not followed by >", pos)
                        }
                    };
                }
                Some(c) if is_name_start(c) => {
                    if !spaced && !attributes.is_empty() {
                        let pos = self.cursor.pos();
                        return self.invalid("No whitespace between attributes", pos);
                    }
                    attributes.push(self.attribute()?);
                }
                Some(_) => {
                    let pos = self.cursor.pos();
                    return self.invalid("Invalid attribute name", pos);
                }
            }
        }
    }

    fn attribute(&mut self) -> Result<RawAttribute<'a>, Failure> {
        let name = self.name();
        let spaced = self.cursor.skip_whitespace();
        match self.cursor.peek() {
            None => return self.unexpected_end(),
            Some('=') => {
                self.cursor.bump();
            }
            Some(c) if spaced || c == '>' => {
                let pos = self.cursor.pos();
                return self.invalid("Attribute without value", pos);
            }
            Some(_) => {
                let pos = self.cursor.pos();
                return self.invalid("Invalid attribute name", pos);
            }
        }

        self.cursor.skip_whitespace();
        let quote = match self.cursor.peek() {
            None => return self.unexpected_end(),
            Some(q @ ('"' | '\'')) => q,
            Some(_) => {
                let pos = self.cursor.pos();
                return self.invalid("Unquoted attribute value", pos);
            }
        };
        self.cursor.bump();
        let pos = self.cursor.pos();
        let start = self.cursor.offset;
        while self.cursor.peek().is_some_and(|c| c != quote) {
            self.cursor.bump();
        }
        let value = self.cursor.slice_from(start);
        if self.cursor.bump().is_none() {
            return self.unexpected_end();
        }
        Ok(RawAttribute { name, value, pos })
    }
}
