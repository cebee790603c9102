//! Strict Slice Reader
//!
//! Turns tokens into events and enforces document-level well-formedness:
//! proper nesting, exactly one root element, nothing but whitespace,
//! comments and PIs outside it, and a DOCTYPE only before the root.
//! Errors carry line and column resolved against the input.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::dtd::{split_doctype, EntityTable};
use crate::core::entities::{decode_text, normalize_newlines, validate_xml_content};
use crate::core::tokenizer::{Token, TokenKind, Tokenizer};
use crate::error::ParseError;
use std::borrow::Cow;

/// Strict XML reader over a complete document held in memory
pub struct SliceReader<'a> {
    input: &'a str,
    tokenizer: Tokenizer<'a>,
    entities: EntityTable,
    open: Vec<&'a str>,
    seen_root: bool,
    seen_doctype: bool,
    done: bool,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            input,
            tokenizer: Tokenizer::new(input),
            entities: EntityTable::new(),
            open: Vec::new(),
            seen_root: false,
            seen_doctype: false,
            done: false,
        }
    }

    /// Current element nesting depth
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Get the next XML event; `Ok(None)` after `EndDocument`
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        if self.done {
            return Ok(None);
        }
        loop {
            let token = match self.tokenizer.next_token() {
                Some(Ok(token)) => token,
                Some(Err(e)) => return Err(self.fail(e)),
                None => return Ok(None),
            };
            match self.event_for(token) {
                Ok(Some(event)) => {
                    if matches!(event, XmlEvent::EndDocument) {
                        self.done = true;
                    }
                    return Ok(Some(event));
                }
                Ok(None) => continue,
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        self.done = true;
        err.locate(self.input)
    }

    fn event_for(&mut self, token: Token<'a>) -> Result<Option<XmlEvent<'a>>, ParseError> {
        let start = token.span.0;
        let content = token.content.unwrap_or("");
        match token.kind {
            TokenKind::Eof => {
                if let Some(name) = self.open.last() {
                    return Err(ParseError::new(format!("Unclosed element <{}>", name), start));
                }
                if !self.seen_root {
                    return Err(ParseError::new("No root element found", start));
                }
                Ok(Some(XmlEvent::EndDocument))
            }

            TokenKind::StartTag | TokenKind::EmptyTag => {
                let name = token.name.unwrap_or_default();
                if self.open.is_empty() {
                    if self.seen_root {
                        return Err(ParseError::new(
                            "Extra content at the end of the document: only one root element is allowed",
                            start,
                        ));
                    }
                    self.seen_root = true;
                }
                let attributes = parse_attributes(content, &self.entities).map_err(|e| {
                    ParseError::new(e.message, start + 1 + name.len() + e.offset)
                })?;
                let element = StartElement::new(name, attributes, start);
                if token.kind == TokenKind::EmptyTag {
                    Ok(Some(XmlEvent::EmptyElement(element)))
                } else {
                    self.open.push(name);
                    Ok(Some(XmlEvent::StartElement(element)))
                }
            }

            TokenKind::EndTag => {
                let name = token.name.unwrap_or_default();
                match self.open.pop() {
                    Some(expected) if expected == name => {
                        Ok(Some(XmlEvent::EndElement(EndElement { name, position: start })))
                    }
                    Some(expected) => Err(ParseError::new(
                        format!("Mismatched end tag: expected </{}>, found </{}>", expected, name),
                        start,
                    )),
                    None => Err(ParseError::new(format!("Unexpected end tag </{}>", name), start)),
                }
            }

            TokenKind::Text => {
                if self.open.is_empty() {
                    if content.bytes().all(crate::core::scanner::is_whitespace) {
                        return Ok(None);
                    }
                    return Err(ParseError::new(
                        "Text content is not allowed outside the root element",
                        start,
                    ));
                }
                validate_xml_content(content).map_err(|msg| ParseError::new(msg, start))?;
                let text = match normalize_newlines(content) {
                    Cow::Borrowed(raw) => decode_text(raw, &self.entities),
                    Cow::Owned(raw) => decode_text(&raw, &self.entities).map(|t| Cow::Owned(t.into_owned())),
                }
                .map_err(|msg| ParseError::new(msg, start))?;
                Ok(Some(XmlEvent::Text(text)))
            }

            TokenKind::CData => {
                if self.open.is_empty() {
                    return Err(ParseError::new("CDATA section outside the root element", start));
                }
                validate_xml_content(content).map_err(|msg| ParseError::new(msg, start))?;
                Ok(Some(XmlEvent::CData(normalize_newlines(content))))
            }

            TokenKind::Comment => Ok(Some(XmlEvent::Comment(content))),

            TokenKind::ProcessingInstruction => Ok(Some(XmlEvent::ProcessingInstruction {
                target: token.name.unwrap_or_default(),
                data: content,
            })),

            TokenKind::XmlDeclaration => {
                let attrs = parse_attributes(content, &self.entities)
                    .map_err(|e| ParseError::new(e.message, start))?;
                let mut version = None;
                let mut encoding = None;
                let mut standalone = None;
                for attr in attrs {
                    match attr.name {
                        "version" => version = Some(attr.value),
                        "encoding" => encoding = Some(attr.value),
                        "standalone" => match attr.value.as_ref() {
                            "yes" => standalone = Some(true),
                            "no" => standalone = Some(false),
                            _ => return Err(ParseError::new("standalone must be 'yes' or 'no'", start)),
                        },
                        other => {
                            return Err(ParseError::new(
                                format!("Unexpected '{}' in XML declaration", other),
                                start,
                            ))
                        }
                    }
                }
                let version = version
                    .ok_or_else(|| ParseError::new("XML declaration requires a version", start))?;
                Ok(Some(XmlEvent::XmlDeclaration {
                    version,
                    encoding,
                    standalone,
                }))
            }

            TokenKind::DocType => {
                if self.seen_root {
                    return Err(ParseError::new("DOCTYPE must precede the root element", start));
                }
                if self.seen_doctype {
                    return Err(ParseError::new("Only one DOCTYPE declaration is allowed", start));
                }
                self.seen_doctype = true;
                let (name, subset) = split_doctype(content).map_err(|msg| ParseError::new(msg, start))?;
                if let Some(subset) = subset {
                    self.entities =
                        EntityTable::from_internal_subset(subset).map_err(|msg| ParseError::new(msg, start))?;
                }
                Ok(Some(XmlEvent::DocType(name)))
            }
        }
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(Some(XmlEvent::EndDocument)) | Ok(None) => None,
            Ok(Some(event)) => Some(Ok(event)),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Parse a whole document, returning all events or the first error
pub fn parse_events(input: &str) -> Result<Vec<XmlEvent<'_>>, ParseError> {
    SliceReader::new(input).collect()
}
