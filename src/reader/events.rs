//! XML Event Types
//!
//! Event types for pull-parser style XML processing.

use crate::core::attributes::{split_name, Attribute};
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(EndElement<'a>),
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    /// Text content, line ends normalized and references expanded
    Text(Cow<'a, str>),
    /// CDATA section content
    CData(Cow<'a, str>),
    /// Comment content
    Comment(&'a str),
    /// Processing instruction: <?target data?>
    ProcessingInstruction { target: &'a str, data: &'a str },
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration {
        version: Cow<'a, str>,
        encoding: Option<Cow<'a, str>>,
        standalone: Option<bool>,
    },
    /// DOCTYPE declaration, root name only
    DocType(&'a str),
    /// End of document
    EndDocument,
}

/// Start element event data
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a str,
    /// Element attributes in document order
    pub attributes: Vec<Attribute<'a>>,
    /// Byte offset of the opening `<`
    pub position: usize,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a str, attributes: Vec<Attribute<'a>>, position: usize) -> Self {
        StartElement {
            name,
            attributes,
            position,
        }
    }

    /// Local name (after colon)
    pub fn local_name(&self) -> &'a str {
        split_name(self.name).1
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&'a str> {
        split_name(self.name).0
    }

    /// Get an attribute value by name
    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }
}

/// End element event data
#[derive(Debug, Clone, PartialEq)]
pub struct EndElement<'a> {
    /// Full element name
    pub name: &'a str,
    pub position: usize,
}

impl<'a> XmlEvent<'a> {
    /// Check if this is a start element event
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_))
    }

    /// Get as start element if applicable
    pub fn as_start_element(&self) -> Option<&StartElement<'a>> {
        match self {
            XmlEvent::StartElement(e) | XmlEvent::EmptyElement(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if applicable
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlEvent::Text(t) | XmlEvent::CData(t) => Some(t.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_element() {
        let elem = StartElement::new("div", vec![], 0);
        assert_eq!(elem.local_name(), "div");
        assert!(elem.prefix().is_none());
    }

    #[test]
    fn test_namespaced_element() {
        let elem = StartElement::new("svg:rect", vec![], 0);
        assert_eq!(elem.local_name(), "rect");
        assert_eq!(elem.prefix(), Some("svg"));
    }
}
