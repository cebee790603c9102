//! XML Tokenizer
//!
//! Splits input into lexical tokens. Each markup construct is recognised
//! and checked for local well-formedness here; document-level rules
//! (nesting, single root, misplaced content) belong to the reader.

use super::scanner::{is_whitespace, Scanner};
use crate::error::ParseError;

/// Token types produced by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag: <element>
    StartTag,
    /// Element end tag: </element>
    EndTag,
    /// Empty element: <element/>
    EmptyTag,
    /// Text content
    Text,
    /// CDATA section: <![CDATA[...]]>
    CData,
    /// Comment: <!--...-->
    Comment,
    /// Processing instruction: <?target ...?>
    ProcessingInstruction,
    /// XML declaration: <?xml ...?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType,
    /// End of file
    Eof,
}

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
    /// Element name or PI target
    pub name: Option<&'a str>,
    /// Undecoded body: text, CDATA/comment contents, attribute section, PI data or DOCTYPE body
    pub content: Option<&'a str>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
        }
    }

    fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: &'a str) -> Self {
        self.content = Some(content);
        self
    }
}

/// Pull tokenizer over a complete document
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    /// Offset of the first byte after an optional BOM
    doc_start: usize,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut scanner = Scanner::new(input);
        if scanner.starts_with("\u{FEFF}") {
            scanner.advance('\u{FEFF}'.len_utf8());
        }
        Tokenizer {
            doc_start: scanner.position(),
            scanner,
            finished: false,
        }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Next token; `Eof` is returned once, then `None`
    pub fn next_token(&mut self) -> Option<Result<Token<'a>, ParseError>> {
        if self.finished {
            return None;
        }
        let start = self.scanner.position();
        if self.scanner.is_eof() {
            self.finished = true;
            return Some(Ok(Token::new(TokenKind::Eof, (start, start))));
        }
        let result = if self.scanner.peek() == Some(b'<') {
            self.read_markup(start)
        } else {
            self.read_text(start)
        };
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }

    fn read_text(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let end = self.scanner.find_tag_start().unwrap_or(self.scanner.len());
        let text = self.scanner.slice(start, end);
        if let Some(i) = text.find("]]>") {
            return Err(ParseError::new("The sequence ']]>' is not allowed in content", start + i));
        }
        self.scanner.set_position(end);
        Ok(Token::new(TokenKind::Text, (start, end)).with_content(text))
    }

    fn read_markup(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        if self.scanner.starts_with("<!--") {
            self.read_comment(start)
        } else if self.scanner.starts_with("<![CDATA[") {
            self.read_cdata(start)
        } else if self.scanner.starts_with("<!DOCTYPE") {
            self.read_doctype(start)
        } else if self.scanner.starts_with("<?") {
            self.read_pi(start)
        } else if self.scanner.starts_with("</") {
            self.read_end_tag(start)
        } else if self.scanner.starts_with("<!") {
            Err(ParseError::new("Unsupported markup declaration", start))
        } else {
            self.read_start_tag(start)
        }
    }

    fn read_comment(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(4);
        let body_start = self.scanner.position();
        let end = self
            .scanner
            .find_str("-->")
            .ok_or_else(|| ParseError::new("Unterminated comment", start))?;
        let body = self.scanner.slice(body_start, end);
        if let Some(i) = body.find("--") {
            return Err(ParseError::new("'--' is not allowed inside a comment", body_start + i));
        }
        if body.ends_with('-') {
            return Err(ParseError::new("Comment must not end with '--->'", end - 1));
        }
        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::Comment, (start, end + 3)).with_content(body))
    }

    fn read_cdata(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance("<![CDATA[".len());
        let body_start = self.scanner.position();
        let end = self
            .scanner
            .find_str("]]>")
            .ok_or_else(|| ParseError::new("Unterminated CDATA section", start))?;
        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::CData, (start, end + 3)).with_content(self.scanner.slice(body_start, end)))
    }

    fn read_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance("<!DOCTYPE".len());
        let body_start = self.scanner.position();
        if !self.scanner.peek().is_some_and(is_whitespace) {
            return Err(ParseError::new("Whitespace required after DOCTYPE", body_start));
        }
        let end = self
            .find_doctype_end(body_start)
            .ok_or_else(|| ParseError::new("Unterminated DOCTYPE declaration", start))?;
        self.scanner.set_position(end + 1);
        Ok(Token::new(TokenKind::DocType, (start, end + 1)).with_content(self.scanner.slice(body_start, end)))
    }

    /// Position of the `>` closing a DOCTYPE; the internal subset may contain
    /// quoted literals, comments and its own `>` characters
    fn find_doctype_end(&self, from: usize) -> Option<usize> {
        let text = self.scanner.slice(from, self.scanner.len());
        let bytes = text.as_bytes();
        let mut quote: Option<u8> = None;
        let mut in_subset = false;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if q == b => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'<' if in_subset && text[i..].starts_with("<!--") => {
                        i += text[i..].find("-->")? + 3;
                        continue;
                    }
                    b'[' if !in_subset => in_subset = true,
                    b']' if in_subset => in_subset = false,
                    b'>' if !in_subset => return Some(from + i),
                    _ => {}
                },
            }
            i += 1;
        }
        None
    }

    fn read_pi(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2);
        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Processing instruction requires a target", start + 2))?;
        let end = self
            .scanner
            .find_str("?>")
            .ok_or_else(|| ParseError::new("Unterminated processing instruction", start))?;
        let data_start = self.scanner.position();
        if data_start < end && !self.scanner.peek().is_some_and(is_whitespace) {
            return Err(ParseError::new(
                "Whitespace required after processing instruction target",
                data_start,
            ));
        }
        let data = self.scanner.slice(data_start, end).trim_start();
        self.scanner.set_position(end + 2);

        let kind = if target == "xml" {
            if start != self.doc_start {
                return Err(ParseError::new(
                    "XML declaration allowed only at the start of the document",
                    start,
                ));
            }
            TokenKind::XmlDeclaration
        } else if target.eq_ignore_ascii_case("xml") {
            return Err(ParseError::new(
                format!("Reserved processing instruction target '{}'", target),
                start + 2,
            ));
        } else {
            TokenKind::ProcessingInstruction
        };
        Ok(Token::new(kind, (start, end + 2)).with_name(target).with_content(data))
    }

    fn read_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Invalid end tag name", start + 2))?;
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(ParseError::new(
                format!("Malformed end tag </{}>", name),
                self.scanner.position(),
            ));
        }
        self.scanner.advance(1);
        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    fn read_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Invalid element name", start + 1))?;
        let attrs_start = self.scanner.position();
        let gt = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| ParseError::new(format!("Unclosed start tag <{}>", name), start))?;
        let section = self.scanner.slice(attrs_start, gt);
        if let Some(i) = section.find('<') {
            return Err(ParseError::new(
                format!("Unexpected '<' in start tag <{}>", name),
                attrs_start + i,
            ));
        }
        let (kind, attrs) = match section.strip_suffix('/') {
            Some(attrs) => (TokenKind::EmptyTag, attrs),
            None => (TokenKind::StartTag, section),
        };
        if !attrs.is_empty() && !attrs.as_bytes().first().copied().is_some_and(is_whitespace) {
            return Err(ParseError::new("Invalid character in element name", attrs_start));
        }
        self.scanner.set_position(gt + 1);
        Ok(Token::new(kind, (start, gt + 1)).with_name(name).with_content(attrs))
    }
}
