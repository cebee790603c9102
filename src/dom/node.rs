//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.
//! Nodes are appended to the arena in document order, so comparing ids
//! compares document positions and every subtree occupies a contiguous
//! id range.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the document node)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Last node of this node's subtree (itself when it has no descendants)
    pub subtree_end: NodeId,
    /// Qualified name (elements) or target (PIs)
    pub name_id: u32,
    /// Namespace prefix, or 0
    pub prefix_id: u32,
    /// Resolved namespace URI, or 0
    pub namespace_id: u32,
    /// Character data (text, CDATA, comments) or PI data
    pub value_id: u32,
    /// Start of attributes in attribute arena (for elements)
    pub attr_start: u32,
    pub attr_count: u32,
    /// Element nesting depth; the root element is 0, the document node too
    pub depth: u32,
}

impl XmlNode {
    pub fn new(kind: NodeKind, parent: Option<NodeId>, depth: u32) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            subtree_end: 0,
            name_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
            depth,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::new(NodeKind::Document, None, 0)
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: Option<NodeId>, depth: u32) -> Self {
        XmlNode {
            name_id,
            ..Self::new(NodeKind::Element, parent, depth)
        }
    }

    /// Create a character-data node (text, CDATA or comment)
    pub fn character_data(kind: NodeKind, value_id: u32, parent: Option<NodeId>, depth: u32) -> Self {
        XmlNode {
            value_id,
            ..Self::new(kind, parent, depth)
        }
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target_id: u32, data_id: u32, parent: Option<NodeId>, depth: u32) -> Self {
        XmlNode {
            name_id: target_id,
            value_id: data_id,
            ..Self::new(NodeKind::ProcessingInstruction, parent, depth)
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.attr_count > 0
    }
}

/// Stored attribute
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    /// Qualified attribute name
    pub name_id: u32,
    pub prefix_id: u32,
    /// Resolved namespace URI; unprefixed attributes have none
    pub namespace_id: u32,
    pub value_id: u32,
    /// `xmlns` or `xmlns:*`: kept for display, hidden from XPath
    pub is_namespace_decl: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert_eq!(doc.depth, 0);
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(1, Some(0), 1);
        assert_eq!(elem.kind, NodeKind::Element);
        assert_eq!(elem.parent, Some(0));
        assert_eq!(elem.name_id, 1);
        assert!(!elem.has_children());
    }

    #[test]
    fn test_text_kinds() {
        assert!(XmlNode::character_data(NodeKind::CData, 3, Some(1), 1).is_text());
        assert!(!XmlNode::character_data(NodeKind::Comment, 3, Some(1), 1).is_text());
    }
}
