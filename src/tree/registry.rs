//! Namespace Registry
//!
//! Assigns each distinct namespace URI a display colour and prefix the
//! first time it is seen. Colours go round-robin over a fixed palette in
//! first-seen order, so the same document always colours the same way.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display colour of a namespace; `Default` marks elements with no namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorToken {
    Default,
    Accent1,
    Accent2,
    Accent3,
    Accent4,
    Accent5,
}

impl ColorToken {
    /// The palette in assignment order
    pub const PALETTE: [ColorToken; 6] = [
        ColorToken::Default,
        ColorToken::Accent1,
        ColorToken::Accent2,
        ColorToken::Accent3,
        ColorToken::Accent4,
        ColorToken::Accent5,
    ];

    /// Stylesheet class for this colour
    pub fn class_name(self) -> &'static str {
        match self {
            ColorToken::Default => "namespace-default",
            ColorToken::Accent1 => "namespace-1",
            ColorToken::Accent2 => "namespace-2",
            ColorToken::Accent3 => "namespace-3",
            ColorToken::Accent4 => "namespace-4",
            ColorToken::Accent5 => "namespace-5",
        }
    }
}

/// Marker prefix for a namespace declared without one
pub const DEFAULT_PREFIX: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub uri: String,
    /// Declared prefix, or [`DEFAULT_PREFIX`]
    pub prefix: String,
    pub color: ColorToken,
}

/// First-seen registry of namespace URIs
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    entries: Vec<NamespaceEntry>,
    by_uri: HashMap<String, usize>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a URI; an already known URI keeps its original entry
    pub fn register(&mut self, uri: &str, prefix: Option<&str>) -> &NamespaceEntry {
        let index = match self.by_uri.get(uri) {
            Some(&index) => index,
            None => {
                let index = self.entries.len();
                self.entries.push(NamespaceEntry {
                    uri: uri.to_string(),
                    prefix: prefix.unwrap_or(DEFAULT_PREFIX).to_string(),
                    color: ColorToken::PALETTE[index % ColorToken::PALETTE.len()],
                });
                self.by_uri.insert(uri.to_string(), index);
                index
            }
        };
        &self.entries[index]
    }

    /// Entry for a URI, or the default entry (default colour, empty prefix)
    pub fn lookup(&self, uri: Option<&str>) -> NamespaceEntry {
        uri.and_then(|u| self.by_uri.get(u))
            .map(|&index| self.entries[index].clone())
            .unwrap_or_else(|| NamespaceEntry {
                uri: uri.unwrap_or_default().to_string(),
                prefix: String::new(),
                color: ColorToken::Default,
            })
    }

    /// Colour for a URI without cloning the entry
    pub fn color_of(&self, uri: Option<&str>) -> ColorToken {
        uri.and_then(|u| self.by_uri.get(u))
            .map_or(ColorToken::Default, |&index| self.entries[index].color)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_uri.clear();
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &NamespaceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_colors() {
        let mut registry = NamespaceRegistry::new();
        let colors: Vec<_> = (0..8)
            .map(|i| registry.register(&format!("urn:{}", i), None).color)
            .collect();
        assert_eq!(colors[0], ColorToken::Default);
        assert_eq!(colors[1], ColorToken::Accent1);
        assert_eq!(colors[5], ColorToken::Accent5);
        assert_eq!(colors[6], ColorToken::Default);
        assert_eq!(colors[7].class_name(), "namespace-1");
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = NamespaceRegistry::new();
        registry.register("urn:a", Some("a"));
        registry.register("urn:b", None);
        let again = registry.register("urn:a", Some("other")).clone();
        assert_eq!(again.prefix, "a");
        assert_eq!(again.color, ColorToken::Default);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup(Some("urn:b")).prefix, DEFAULT_PREFIX);
    }

    #[test]
    fn test_lookup_unknown_and_clear() {
        let mut registry = NamespaceRegistry::new();
        registry.register("urn:a", Some("a"));
        let unknown = registry.lookup(None);
        assert_eq!(unknown.color, ColorToken::Default);
        assert!(unknown.prefix.is_empty());
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(Some("urn:a")).prefix, "");
    }
}
