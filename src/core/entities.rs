//! XML Entity Decoding
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - Internal general entities declared in the DOCTYPE
//!
//! Uses Cow for zero-copy when no entities are present.

use super::dtd::EntityTable;
use memchr::{memchr, memchr2};
use std::borrow::Cow;

/// Nesting limit for entities whose replacement text references other entities
const MAX_ENTITY_DEPTH: usize = 16;
/// Upper bound on expanded output, guards against exponential expansion
const MAX_EXPANSION: usize = 16 * 1024 * 1024;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
pub fn decode_text<'a>(input: &'a str, entities: &EntityTable) -> Result<Cow<'a, str>, String> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    let mut out = String::with_capacity(input.len());
    decode_into(input, entities, 0, &mut out)?;
    Ok(Cow::Owned(out))
}

fn decode_into(input: &str, entities: &EntityTable, depth: usize, out: &mut String) -> Result<(), String> {
    let bytes = input.as_bytes();
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &bytes[pos..]).map(|i| pos + i) {
        out.push_str(&input[pos..amp]);
        let semi = memchr(b';', &bytes[amp..])
            .map(|i| amp + i)
            .ok_or_else(|| "Bare '&' must be escaped as &amp;".to_string())?;
        let entity = &input[amp + 1..semi];

        if let Some(numeric) = entity.strip_prefix('#') {
            let c = decode_numeric(numeric)
                .ok_or_else(|| format!("Invalid character reference &{};", entity))?;
            out.push(c);
        } else if let Some(c) = predefined(entity) {
            out.push(c);
        } else if let Some(replacement) = entities.get(entity) {
            if depth >= MAX_ENTITY_DEPTH {
                return Err(format!("Entity '{}' expands too deeply", entity));
            }
            decode_into(replacement, entities, depth + 1, out)?;
        } else if entities.is_external(entity) {
            // External entities are never fetched; the reference expands to nothing
        } else if super::scanner::is_name(entity) {
            return Err(format!("Undefined entity '{}'", entity));
        } else {
            return Err("Bare '&' must be escaped as &amp;".to_string());
        }

        if out.len() > MAX_EXPANSION {
            return Err("Entity expansion exceeds size limit".to_string());
        }
        pos = semi + 1;
    }

    out.push_str(&input[pos..]);
    Ok(())
}

/// The five entities every XML processor recognises
#[inline]
fn predefined(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference body (after `#`)
fn decode_numeric(entity: &str) -> Option<char> {
    let codepoint = match entity.strip_prefix('x') {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u32::from_str_radix(hex, 16).ok()?
        }
        None if !entity.is_empty() && entity.bytes().all(|b| b.is_ascii_digit()) => {
            entity.parse::<u32>().ok()?
        }
        _ => return None,
    };
    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Reject characters outside the XML 1.0 Char production
pub fn validate_xml_content(content: &str) -> Result<(), &'static str> {
    match content.chars().find(|&c| !is_valid_xml_char(c as u32)) {
        Some(_) => Err("Invalid XML character"),
        None => Ok(()),
    }
}

/// Line-end normalization: `\r\n` and lone `\r` become `\n`
pub fn normalize_newlines(input: &str) -> Cow<'_, str> {
    if memchr(b'\r', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Attribute-value normalization for CDATA attributes: literal tab and
/// line-end characters become spaces before references are expanded
pub fn normalize_attribute_value(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr2(b'\n', b'\t', bytes).is_none() && memchr(b'\r', bytes).is_none() {
        return Cow::Borrowed(input);
    }
    let collapsed = input.replace("\r\n", " ");
    Cow::Owned(collapsed.replace(['\t', '\n', '\r'], " "))
}

/// Encode text for XML output (escape special characters)
pub fn encode_text(input: &str) -> Cow<'_, str> {
    // Fast path: check if any escaping needed
    if !input.bytes().any(|b| matches!(b, b'<' | b'>' | b'&' | b'"' | b'\'')) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &str) -> Result<String, String> {
        decode_text(input, &EntityTable::new()).map(|c| c.into_owned())
    }

    #[test]
    fn test_no_entities() {
        let table = EntityTable::new();
        let result = decode_text("Hello, World!", &table).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_basic_entities() {
        assert_eq!(decode("&lt;hello&gt; &amp; &quot;world&quot;").unwrap(), "<hello> & \"world\"");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode("&#65;&#x42;&#x1F600;").unwrap(), "AB😀");
        assert!(decode("&#0;").is_err());
        assert!(decode("&#xZZ;").is_err());
    }

    #[test]
    fn test_undefined_and_bare_ampersand() {
        assert!(decode("&unknown;").unwrap_err().contains("Undefined entity"));
        assert!(decode("fish & chips").is_err());
    }

    #[test]
    fn test_declared_entities_expand_recursively() {
        let table =
            EntityTable::from_internal_subset(r#"<!ENTITY a "A&b;"><!ENTITY b "&#66;">"#).unwrap();
        assert_eq!(decode_text("[&a;]", &table).unwrap(), "[AB]");
    }

    #[test]
    fn test_self_referencing_entity_fails() {
        let table = EntityTable::from_internal_subset(r#"<!ENTITY a "x&a;">"#).unwrap();
        assert!(decode_text("&a;", &table).is_err());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_newlines("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(normalize_attribute_value("a\tb\r\nc"), "a b c");
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode_text("<hello> & \"world\""), "&lt;hello&gt; &amp; &quot;world&quot;");
    }
}
