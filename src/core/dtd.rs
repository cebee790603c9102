//! DOCTYPE Declaration Store
//!
//! Only internal general entities are kept: they are the one part of a
//! document type declaration that changes how content is read. Element,
//! attribute-list and notation declarations are skipped.

use super::scanner::{is_name, is_whitespace};
use std::collections::HashMap;

/// General entities declared in a DOCTYPE internal subset
#[derive(Debug, Default, Clone)]
pub struct EntityTable {
    internal: HashMap<String, String>,
    /// Declared with SYSTEM/PUBLIC identifiers; never fetched
    external: Vec<String>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect entity declarations from an internal subset (text between `[` and `]`)
    pub fn from_internal_subset(subset: &str) -> Result<Self, &'static str> {
        let mut table = EntityTable::new();
        let mut rest = subset;
        while let Some(start) = rest.find("<!ENTITY") {
            rest = &rest[start + "<!ENTITY".len()..];
            let end = declaration_end(rest).ok_or("Unterminated ENTITY declaration")?;
            table.add_declaration(rest[..end].trim())?;
            rest = &rest[end + 1..];
        }
        Ok(table)
    }

    fn add_declaration(&mut self, decl: &str) -> Result<(), &'static str> {
        // Parameter entities only matter inside the DTD itself
        if decl.starts_with('%') {
            return Ok(());
        }
        let name_end = decl
            .bytes()
            .position(is_whitespace)
            .ok_or("Malformed ENTITY declaration")?;
        let name = &decl[..name_end];
        if !is_name(name) {
            return Err("Invalid entity name");
        }
        let body = decl[name_end..].trim_start();
        // First declaration wins
        if self.internal.contains_key(name) || self.external.iter().any(|n| n == name) {
            return Ok(());
        }
        match body.as_bytes().first() {
            Some(&q) if q == b'"' || q == b'\'' => {
                let close = body[1..]
                    .bytes()
                    .position(|b| b == q)
                    .ok_or("Unterminated entity value")?;
                self.internal.insert(name.to_string(), body[1..1 + close].to_string());
            }
            _ if body.starts_with("SYSTEM") || body.starts_with("PUBLIC") => {
                self.external.push(name.to_string());
            }
            _ => return Err("Malformed ENTITY declaration"),
        }
        Ok(())
    }

    /// Replacement text of an internal entity
    pub fn get(&self, name: &str) -> Option<&str> {
        self.internal.get(name).map(String::as_str)
    }

    /// True when the entity was declared with an external identifier
    pub fn is_external(&self, name: &str) -> bool {
        self.external.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }
}

/// Position of the `>` ending a declaration, ignoring quoted sections
fn declaration_end(input: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in input.bytes().enumerate() {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            (None, b'>') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split a DOCTYPE body (text after `<!DOCTYPE`) into root name and internal subset
pub fn split_doctype(body: &str) -> Result<(&str, Option<&str>), &'static str> {
    let body = body.trim_start();
    let name_end = body
        .bytes()
        .position(|b| is_whitespace(b) || b == b'[' || b == b'>')
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if !is_name(name) {
        return Err("Invalid DOCTYPE name");
    }
    let subset = match (body.find('['), body.rfind(']')) {
        (Some(open), Some(close)) if open < close => Some(&body[open + 1..close]),
        (Some(_), _) => return Err("Unterminated DOCTYPE internal subset"),
        _ => None,
    };
    Ok((name, subset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_entities() {
        let table = EntityTable::from_internal_subset(
            r#"<!ELEMENT root ANY> <!ENTITY co "Acme &amp; Sons"> <!ENTITY x 'y'>"#,
        )
        .unwrap();
        assert_eq!(table.get("co"), Some("Acme &amp; Sons"));
        assert_eq!(table.get("x"), Some("y"));
        assert_eq!(table.get("missing"), None);
    }

    #[test]
    fn test_first_declaration_wins() {
        let table =
            EntityTable::from_internal_subset(r#"<!ENTITY a "1"><!ENTITY a "2">"#).unwrap();
        assert_eq!(table.get("a"), Some("1"));
    }

    #[test]
    fn test_external_and_parameter_entities() {
        let table = EntityTable::from_internal_subset(
            r#"<!ENTITY % p "ignored"><!ENTITY ext SYSTEM "ext.xml">"#,
        )
        .unwrap();
        assert!(table.is_external("ext"));
        assert_eq!(table.get("p"), None);
    }

    #[test]
    fn test_split_doctype() {
        let (name, subset) = split_doctype(r#" note [<!ENTITY a "b">]"#).unwrap();
        assert_eq!(name, "note");
        assert_eq!(subset, Some(r#"<!ENTITY a "b">"#));
        let (name, subset) = split_doctype(r#" html PUBLIC "-//W3C//DTD" "x.dtd""#).unwrap();
        assert_eq!(name, "html");
        assert!(subset.is_none());
    }
}
