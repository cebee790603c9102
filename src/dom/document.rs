//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes, appended in document order
//! - NodeId indices for traversal
//! - String interning for names, values and text
//! - Namespace URIs resolved while building

use super::namespace::NamespaceResolver;
use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::core::attributes::split_name;
use crate::error::ParseError;
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;

/// A parsed XML document that owns all of its data
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    pub strings: StringPool,
    /// Root element node ID (not document node)
    root_element: Option<NodeId>,
    /// First binding seen for each prefix anywhere in the document
    declared_prefixes: Vec<(u32, u32)>,
    source_len: usize,
}

impl XmlDocument {
    /// Parse a document, rejecting anything that is not well-formed and namespace-valid
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut doc = XmlDocument {
            nodes: Vec::with_capacity(256),
            attributes: Vec::with_capacity(128),
            strings: StringPool::new(),
            root_element: None,
            declared_prefixes: Vec::new(),
            source_len: input.len(),
        };
        doc.nodes.push(XmlNode::document());
        doc.build_from_events(input)?;
        Ok(doc)
    }

    fn build_from_events(&mut self, input: &str) -> Result<(), ParseError> {
        let mut reader = SliceReader::new(input);
        let mut resolver = NamespaceResolver::new(&mut self.strings);
        let mut stack: Vec<NodeId> = vec![0];

        while let Some(event) = reader.next_event()? {
            let parent = *stack.last().unwrap_or(&0);
            let depth = stack.len() as u32 - 1;
            match event {
                XmlEvent::StartElement(elem) => {
                    resolver.push_scope();
                    let id = self
                        .add_element(&elem, parent, depth, &mut resolver)
                        .map_err(|e| e.locate(input))?;
                    stack.push(id);
                }
                XmlEvent::EmptyElement(elem) => {
                    resolver.push_scope();
                    self.add_element(&elem, parent, depth, &mut resolver)
                        .map_err(|e| e.locate(input))?;
                    resolver.pop_scope();
                }
                XmlEvent::EndElement(_) => {
                    if let Some(id) = stack.pop() {
                        self.nodes[id as usize].subtree_end = self.last_id();
                    }
                    resolver.pop_scope();
                }
                XmlEvent::Text(text) => {
                    let value = self.strings.intern(&text);
                    self.append(XmlNode::character_data(NodeKind::Text, value, Some(parent), depth));
                }
                XmlEvent::CData(text) => {
                    let value = self.strings.intern(&text);
                    self.append(XmlNode::character_data(NodeKind::CData, value, Some(parent), depth));
                }
                XmlEvent::Comment(text) => {
                    let value = self.strings.intern(text);
                    self.append(XmlNode::character_data(NodeKind::Comment, value, Some(parent), depth));
                }
                XmlEvent::ProcessingInstruction { target, data } => {
                    let target = self.strings.intern(target);
                    let data = self.strings.intern(data);
                    self.append(XmlNode::processing_instruction(target, data, Some(parent), depth));
                }
                XmlEvent::XmlDeclaration { .. } | XmlEvent::DocType(_) => {}
                XmlEvent::EndDocument => break,
            }
        }

        self.nodes[0].subtree_end = self.last_id();
        Ok(())
    }

    fn add_element(
        &mut self,
        elem: &StartElement<'_>,
        parent: NodeId,
        depth: u32,
        resolver: &mut NamespaceResolver,
    ) -> Result<NodeId, ParseError> {
        let at = elem.position;
        check_qname(elem.name).map_err(|msg| ParseError::new(msg, at))?;

        // Declarations first: they are in scope for the element's own name
        for attr in &elem.attributes {
            if let Some(prefix) = attr.declared_prefix() {
                let prefix_id = self.strings.intern(prefix);
                let uri_id = self.strings.intern(&attr.value);
                resolver
                    .declare(prefix_id, uri_id)
                    .map_err(|msg| ParseError::new(msg, at))?;
                if prefix_id != 0
                    && uri_id != 0
                    && !self.declared_prefixes.iter().any(|&(p, _)| p == prefix_id)
                {
                    self.declared_prefixes.push((prefix_id, uri_id));
                }
            }
        }

        let name_id = self.strings.intern(elem.name);
        let mut node = XmlNode::element(name_id, Some(parent), depth);
        match elem.prefix() {
            Some(prefix) => {
                node.prefix_id = self.strings.intern(prefix);
                node.namespace_id = resolver.resolve(node.prefix_id).ok_or_else(|| {
                    ParseError::new(format!("Namespace prefix '{}' is not bound", prefix), at)
                })?;
            }
            None => node.namespace_id = resolver.resolve_default().unwrap_or(0),
        }

        node.attr_start = self.attributes.len() as u32;
        for attr in &elem.attributes {
            check_qname(attr.name).map_err(|msg| ParseError::new(msg, at))?;
            let is_namespace_decl = attr.declared_prefix().is_some();
            let prefix_id = attr.prefix().map_or(0, |p| self.strings.intern(p));
            let namespace_id = if is_namespace_decl || prefix_id == 0 {
                0
            } else {
                resolver.resolve(prefix_id).ok_or_else(|| {
                    ParseError::new(
                        format!("Namespace prefix '{}' is not bound", attr.prefix().unwrap_or_default()),
                        at,
                    )
                })?
            };
            let name_id = self.strings.intern(attr.name);
            let local = attr.local_name();
            let start = node.attr_start as usize;
            let clash = namespace_id != 0
                && self.attributes[start..].iter().any(|a| {
                    a.namespace_id == namespace_id
                        && self.strings.get_str(a.name_id).map(|n| split_name(n).1) == Some(local)
                });
            if clash {
                return Err(ParseError::new(
                    format!("Duplicate attribute '{}' after namespace resolution", attr.name),
                    at,
                ));
            }
            let value_id = self.strings.intern(&attr.value);
            self.attributes.push(XmlAttribute {
                name_id,
                prefix_id,
                namespace_id,
                value_id,
                is_namespace_decl,
            });
        }
        node.attr_count = self.attributes.len() as u32 - node.attr_start;

        let id = self.append(node);
        if parent == 0 {
            self.root_element = Some(id);
        }
        Ok(id)
    }

    /// Push a node into the arena and link it under its parent
    fn append(&mut self, mut node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        node.subtree_end = id;
        let parent = node.parent;
        self.nodes.push(node);
        if let Some(parent_id) = parent {
            self.link_child(parent_id, id);
        }
        id
    }

    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let prev_last = self.nodes[parent_id as usize].last_child;
        if let Some(last) = prev_last {
            self.nodes[last as usize].next_sibling = Some(child_id);
            self.nodes[child_id as usize].prev_sibling = Some(last);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }

    fn last_id(&self) -> NodeId {
        self.nodes.len() as NodeId - 1
    }

    pub fn document_node(&self) -> &XmlNode {
        &self.nodes[0]
    }

    /// Get total number of nodes, document node included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of element nodes
    pub fn element_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_element()).count()
    }

    /// Length in bytes of the source text
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn root_name(&self) -> Option<&str> {
        self.node_name(self.root_element?)
    }

    /// Element children of a node, in document order
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = self.get_node(id).and_then(|n| n.first_child);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.nodes[current as usize].next_sibling;
            Some(current)
        })
        .filter(move |&c| self.nodes[c as usize].is_element())
    }

    /// Qualified name of an attribute
    pub fn attribute_name(&self, attr: &XmlAttribute) -> &str {
        self.strings.get_str(attr.name_id).unwrap_or_default()
    }

    pub fn attribute_value(&self, attr: &XmlAttribute) -> &str {
        self.strings.get_str(attr.value_id).unwrap_or_default()
    }
}

/// Namespaces-in-XML QName check: at most one colon, neither side empty
fn check_qname(name: &str) -> Result<(), String> {
    match name.split_once(':') {
        Some((prefix, local)) if prefix.is_empty() || local.is_empty() || local.contains(':') => {
            Err(format!("'{}' is not a valid qualified name", name))
        }
        _ => Ok(()),
    }
}

impl DocumentAccess for XmlDocument {
    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn strings(&self) -> &StringPool {
        &self.strings
    }

    fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) => {
                let start = node.attr_start as usize;
                &self.attributes[start..start + node.attr_count as usize]
            }
            None => &[],
        }
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(super::namespace::ns::XML);
        }
        let prefix_id = self.strings.find(prefix)?;
        self.declared_prefixes
            .iter()
            .find(|&&(p, _)| p == prefix_id)
            .and_then(|&(_, uri)| self.strings.get_str(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{direct_text, node_string_value};

    #[test]
    fn test_parse_simple() {
        let doc = XmlDocument::parse("<root><a>hi</a><b/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.root_name(), Some("root"));
        assert_eq!(doc.child_elements(root).count(), 2);
        assert_eq!(doc.element_count(), 3);
        assert_eq!(doc.subtree_end(root), doc.node_count() as NodeId - 1);
    }

    #[test]
    fn test_document_order_ids() {
        let doc = XmlDocument::parse("<r><a><b/></a><c/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let names: Vec<_> = doc
            .descendants_vec(root)
            .into_iter()
            .filter_map(|id| doc.node_name(id))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        let a = doc.children_vec(root)[0];
        assert_eq!(doc.descendants_vec(a).len(), 1);
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = XmlDocument::parse(
            r#"<root xmlns="urn:default" xmlns:x="urn:x"><x:item x:id="1" plain="2"/><inner/></root>"#,
        )
        .unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_namespace_uri(root), Some("urn:default"));
        let item = doc.children_vec(root)[0];
        assert_eq!(doc.node_prefix(item), Some("x"));
        assert_eq!(doc.node_local_name(item), Some("item"));
        assert_eq!(doc.node_namespace_uri(item), Some("urn:x"));
        let attrs = doc.attributes(item);
        assert_eq!(doc.strings.get_str(attrs[0].namespace_id), Some("urn:x"));
        assert_eq!(attrs[1].namespace_id, 0);
        assert_eq!(doc.lookup_namespace("x"), Some("urn:x"));
        assert_eq!(doc.lookup_namespace("nope"), None);
        assert!(doc.attributes(root).iter().all(|a| a.is_namespace_decl));
    }

    #[test]
    fn test_unbound_prefix_rejected() {
        let err = XmlDocument::parse("<a><p:b/></a>").unwrap_err();
        assert!(err.message.contains("not bound"));
        assert!(XmlDocument::parse("<a xmlns:p='u1' xmlns:q='u1'><b p:x='1' q:x='2'/></a>").is_err());
    }

    #[test]
    fn test_text_values() {
        let doc = XmlDocument::parse("<r> one <b>two</b><![CDATA[ three ]]><!--c--></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(node_string_value(&doc, root), " one two three ");
        assert_eq!(direct_text(&doc, root), "onethree");
    }

    #[test]
    fn test_attribute_lookup() {
        let doc = XmlDocument::parse("<r id=\"7\" xml:lang=\"en\"/>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "id"), Some("7"));
        assert_eq!(doc.get_attribute_values(root), vec![("id", "7"), ("xml:lang", "en")]);
    }
}
