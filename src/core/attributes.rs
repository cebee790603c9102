//! XML Attribute Parsing
//!
//! Parses the attribute section of a start tag (the text between the
//! element name and `>` or `/>`). Parsing is always strict: the first
//! well-formedness violation is returned with its offset into the section.

use super::dtd::EntityTable;
use super::entities::{decode_text, normalize_attribute_value};
use super::scanner::{is_whitespace, name_len};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a str,
    /// Attribute value (normalized, entities decoded)
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&'a str> {
        split_name(self.name).0
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &'a str {
        split_name(self.name).1
    }

    /// The prefix this attribute declares, `Some("")` for a default namespace declaration
    pub fn declared_prefix(&self) -> Option<&'a str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

/// Split a name into prefix and local name at the colon
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    if let Some(colon_pos) = memchr(b':', name.as_bytes()) {
        (Some(&name[..colon_pos]), &name[colon_pos + 1..])
    } else {
        (None, name)
    }
}

/// Attribute syntax error with its byte offset inside the attribute section
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeError {
    pub message: String,
    pub offset: usize,
}

impl AttributeError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        AttributeError {
            message: message.into(),
            offset,
        }
    }
}

/// Parse attributes from raw tag content (after the element name)
pub fn parse_attributes<'a>(
    input: &'a str,
    entities: &EntityTable,
) -> Result<Vec<Attribute<'a>>, AttributeError> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute<'a>> = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if pos == ws_start && !attrs.is_empty() {
            return Err(AttributeError::new("Whitespace required between attributes", pos));
        }

        let name_start = pos;
        let len = name_len(&input[pos..]);
        if len == 0 {
            return Err(AttributeError::new("Invalid attribute name", pos));
        }
        pos += len;
        let name = &input[name_start..pos];

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err(AttributeError::new(format!("Attribute '{}' has no value", name), pos));
        }
        pos += 1;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        let quote = match bytes.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err(AttributeError::new("Attribute value must be quoted", pos)),
        };
        pos += 1;
        let value_start = pos;
        let value_end = memchr(quote, &bytes[pos..])
            .map(|i| pos + i)
            .ok_or_else(|| AttributeError::new("Attribute value has mismatched quotes", value_start))?;
        let raw = &input[value_start..value_end];
        if let Some(lt) = memchr(b'<', raw.as_bytes()) {
            return Err(AttributeError::new("Attribute value cannot contain '<'", value_start + lt));
        }
        pos = value_end + 1;

        if attrs.iter().any(|a| a.name == name) {
            return Err(AttributeError::new(format!("Duplicate attribute '{}'", name), name_start));
        }

        let value = match normalize_attribute_value(raw) {
            Cow::Borrowed(v) => decode_text(v, entities),
            Cow::Owned(v) => decode_text(&v, entities).map(|d| Cow::Owned(d.into_owned())),
        }
        .map_err(|msg| AttributeError::new(msg, value_start))?;
        attrs.push(Attribute { name, value });
    }

    Ok(attrs)
}
