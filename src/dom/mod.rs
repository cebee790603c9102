//! DOM Module - Arena-based XML Document
//!
//! Implements an efficient DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for element/attribute names
//! - Namespace resolution stack

pub mod document;
pub mod namespace;
pub mod node;
pub mod strings;

pub use document::XmlDocument;
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode};
pub use strings::StringPool;

/// Read access to a parsed document, the surface XPath evaluates against
pub trait DocumentAccess {
    /// The document node (parent of the root element)
    fn document_node_id(&self) -> NodeId {
        0
    }

    /// Get root element ID
    fn root_element_id(&self) -> Option<NodeId>;

    /// Get a node by ID
    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Get the string pool for direct access
    fn strings(&self) -> &StringPool;

    /// Attributes of an element, in document order
    fn attributes(&self, id: NodeId) -> &[XmlAttribute];

    /// Resolve a prefix through the namespace declarations made anywhere in the document
    fn lookup_namespace(&self, prefix: &str) -> Option<&str>;

    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Qualified name of an element, or target of a PI
    fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => self.strings().get_str(node.name_id),
            _ => None,
        }
    }

    /// Node local name (without prefix)
    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        let name = self.node_name(id)?;
        Some(name.split_once(':').map_or(name, |(_, local)| local))
    }

    fn node_prefix(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        (node.prefix_id != 0).then(|| self.strings().get_str(node.prefix_id)).flatten()
    }

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        (node.namespace_id != 0).then(|| self.strings().get_str(node.namespace_id)).flatten()
    }

    /// Character data of a text, CDATA or comment node, or the data of a PI
    fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => self.strings().get_str(node.value_id),
        }
    }

    /// Get attribute value by qualified name
    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        let strings = self.strings();
        self.attributes(node_id)
            .iter()
            .find(|a| strings.get_str(a.name_id) == Some(name))
            .and_then(|a| strings.get_str(a.value_id))
    }

    /// All attribute names and values, namespace declarations included
    fn get_attribute_values(&self, node_id: NodeId) -> Vec<(&str, &str)> {
        let strings = self.strings();
        self.attributes(node_id)
            .iter()
            .filter_map(|a| Some((strings.get_str(a.name_id)?, strings.get_str(a.value_id)?)))
            .collect()
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Last node id inside the subtree rooted at `id`
    fn subtree_end(&self, id: NodeId) -> NodeId {
        self.get_node(id).map_or(id, |n| n.subtree_end)
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.get_node(id).and_then(|n| n.first_child);
        while let Some(child) = next {
            out.push(child);
            next = self.next_sibling_of(child);
        }
        out
    }

    /// All descendants in document order
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        (id + 1..=self.subtree_end(id)).collect()
    }
}

/// XPath string-value of a node: concatenated descendant text for elements
/// and the document, the node's own data otherwise
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    match doc.node_kind_of(id) {
        Some(NodeKind::Element) | Some(NodeKind::Document) => {
            let mut out = String::new();
            for desc in id + 1..=doc.subtree_end(id) {
                if doc.get_node(desc).is_some_and(|n| n.is_text()) {
                    out.push_str(doc.text_content(desc).unwrap_or(""));
                }
            }
            out
        }
        Some(_) => doc.text_content(id).unwrap_or("").to_string(),
        None => String::new(),
    }
}

/// Direct text of an element: each text or CDATA child trimmed, empty ones
/// dropped, the rest concatenated
pub fn direct_text<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children_vec(id) {
        if doc.get_node(child).is_some_and(|n| n.is_text()) {
            out.push_str(doc.text_content(child).unwrap_or("").trim());
        }
    }
    out
}
