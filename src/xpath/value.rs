//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Attribute steps produce a list of attribute values instead of nodes,
//! which behaves like a node-set of strings in comparisons and counts.

use crate::dom::{node_string_value, DocumentAccess, NodeId};

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes (ordered, no duplicates)
    NodeSet(Vec<NodeId>),
    /// Boolean value
    Boolean(bool),
    /// Floating-point number
    Number(f64),
    /// String value
    String(String),
    /// Attribute values selected by an attribute step
    StringList(Vec<String>),
}

impl XPathValue {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    /// Create a node set with a single node
    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// Name of the value's type, as reported to users
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::Boolean(_) => "boolean",
            XPathValue::Number(_) => "number",
            XPathValue::String(_) => "string",
            XPathValue::StringList(_) => "attribute list",
        }
    }

    /// Convert to boolean (XPath boolean() function semantics)
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::StringList(list) => !list.is_empty(),
        }
    }

    /// Convert to number without document access; node-sets yield NaN.
    /// Use [`XPathValue::number_in`] when a document is at hand.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::NodeSet(_) => f64::NAN,
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
            XPathValue::StringList(list) => list.first().map_or(f64::NAN, |s| parse_number(s)),
        }
    }

    /// Convert to string without document access; node-sets yield "".
    /// Use [`XPathValue::string_in`] when a document is at hand.
    pub fn to_string_value(&self) -> String {
        match self {
            XPathValue::NodeSet(_) => String::new(),
            XPathValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
            XPathValue::StringList(list) => list.first().cloned().unwrap_or_default(),
        }
    }

    /// string() of the value: a node-set is the string-value of its first node
    pub fn string_in<D: DocumentAccess + ?Sized>(&self, doc: &D) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&first| node_string_value(doc, first))
                .unwrap_or_default(),
            _ => self.to_string_value(),
        }
    }

    /// number() of the value, reading node string-values from the document
    pub fn number_in<D: DocumentAccess + ?Sized>(&self, doc: &D) -> f64 {
        match self {
            XPathValue::NodeSet(_) => parse_number(&self.string_in(doc)),
            _ => self.to_number(),
        }
    }

    /// String-values of every member, for node-sets and attribute lists
    pub fn member_strings<D: DocumentAccess + ?Sized>(&self, doc: &D) -> Option<Vec<String>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes.iter().map(|&n| node_string_value(doc, n)).collect()),
            XPathValue::StringList(list) => Some(list.clone()),
            _ => None,
        }
    }

    /// Check if this is a node set
    pub fn is_nodeset(&self) -> bool {
        matches!(self, XPathValue::NodeSet(_))
    }

    /// Get as node set, or None
    pub fn as_nodeset(&self) -> Option<&Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::NodeSet(Vec::new())
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

/// XPath number(): optional whitespace around an optionally negative decimal
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    let digits = t.strip_prefix('-').unwrap_or(t);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1;
    if valid {
        t.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// XPath string() of a number
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_conversion() {
        assert!(XPathValue::NodeSet(vec![1]).to_boolean());
        assert!(!XPathValue::NodeSet(vec![]).to_boolean());
        assert!(XPathValue::Boolean(true).to_boolean());
        assert!(XPathValue::Number(1.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::String("hello".to_string()).to_boolean());
        assert!(!XPathValue::StringList(Vec::new()).to_boolean());
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(XPathValue::Boolean(true).to_number(), 1.0);
        assert_eq!(XPathValue::String(" 42 ".to_string()).to_number(), 42.0);
        assert!(XPathValue::String("abc".to_string()).to_number().is_nan());
        assert!(XPathValue::String("1e3".to_string()).to_number().is_nan());
        assert_eq!(parse_number("-.5"), -0.5);
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(XPathValue::Boolean(false).to_string_value(), "false");
        assert_eq!(XPathValue::Number(42.0).to_string_value(), "42");
        assert_eq!(XPathValue::Number(3.25).to_string_value(), "3.25");
        assert_eq!(XPathValue::Number(f64::NAN).to_string_value(), "NaN");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(XPathValue::Number(1.0).type_name(), "number");
        assert_eq!(XPathValue::empty_nodeset().type_name(), "node-set");
    }
}
