//! XPath Axes Implementation
//!
//! Node axes over the arena DOM, each returned in proximity order
//! (reverse axes nearest first). Ids are assigned in document order and
//! every subtree is a contiguous id range, so descendant, following and
//! preceding are range walks rather than tree recursions.
//!
//! The attribute axis is evaluated separately (attributes are not arena
//! nodes) and the namespace axis is always empty.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => (context..=doc.subtree_end(context)).collect(),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestor_axis(doc, context));
            result
        }
        Axis::FollowingSibling => sibling_axis(doc, context, D::next_sibling_of),
        Axis::PrecedingSibling => sibling_axis(doc, context, D::prev_sibling_of),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute | Axis::Namespace => Vec::new(),
    }
}

/// ancestor:: axis - parent, grandparent, ... up to the document node
fn ancestor_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;

    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }

    result
}

fn sibling_axis<D: DocumentAccess>(
    doc: &D,
    context: NodeId,
    step: fn(&D, NodeId) -> Option<NodeId>,
) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut sibling = step(doc, context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = step(doc, sib_id);
    }
    result
}

/// following:: axis - every node after the context's subtree
fn following_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let last = doc.subtree_end(doc.document_node_id());
    (doc.subtree_end(context) + 1..=last).collect()
}

/// preceding:: axis - nodes before the context that are not its ancestors, nearest first
fn preceding_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let ancestors = ancestor_axis(doc, context);
    (0..context).rev().filter(|id| !ancestors.contains(id)).collect()
}

/// Check if a node matches a node test. `namespace` is the URI a prefixed
/// test's prefix resolved to.
pub fn matches_node_test<D: DocumentAccess>(
    doc: &D,
    node_id: NodeId,
    node_test: &CompiledNodeTest,
    namespace: Option<&str>,
) -> bool {
    let kind = match doc.node_kind_of(node_id) {
        Some(kind) => kind,
        None => return false,
    };

    match node_test {
        // * matches any element
        CompiledNodeTest::Any => kind == NodeKind::Element,
        CompiledNodeTest::Name(name) => {
            kind == NodeKind::Element
                && doc.node_prefix(node_id).is_none()
                && doc.node_local_name(node_id) == Some(name.as_str())
        }
        CompiledNodeTest::QName(_, local) => {
            kind == NodeKind::Element
                && namespace.is_some()
                && doc.node_namespace_uri(node_id) == namespace
                && doc.node_local_name(node_id) == Some(local.as_str())
        }
        CompiledNodeTest::NamespaceWildcard(_) => {
            kind == NodeKind::Element && namespace.is_some() && doc.node_namespace_uri(node_id) == namespace
        }
        CompiledNodeTest::Node => true,
        CompiledNodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        CompiledNodeTest::Comment => kind == NodeKind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_deref().is_none_or(|t| doc.node_name(node_id) == Some(t))
        }
    }
}

/// Attribute values of an element selected by an attribute-axis node test.
/// Namespace declarations are not attributes here.
pub fn attribute_values<D: DocumentAccess>(
    doc: &D,
    node_id: NodeId,
    node_test: &CompiledNodeTest,
    namespace: Option<&str>,
) -> Vec<String> {
    let strings = doc.strings();
    doc.attributes(node_id)
        .iter()
        .filter(|a| !a.is_namespace_decl)
        .filter(|a| {
            let name = strings.get_str(a.name_id).unwrap_or_default();
            let local = name.split_once(':').map_or(name, |(_, l)| l);
            match node_test {
                CompiledNodeTest::Any | CompiledNodeTest::Node => true,
                CompiledNodeTest::Name(n) => a.prefix_id == 0 && name == n,
                CompiledNodeTest::QName(_, l) => {
                    namespace.is_some() && strings.get_str(a.namespace_id) == namespace && local == l
                }
                CompiledNodeTest::NamespaceWildcard(_) => {
                    namespace.is_some() && strings.get_str(a.namespace_id) == namespace
                }
                _ => false,
            }
        })
        .filter_map(|a| strings.get_str(a.value_id))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn names(doc: &XmlDocument, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| doc.node_name(id).unwrap_or("#").to_string())
            .collect()
    }

    #[test]
    fn test_child_and_descendant_axes() {
        let doc = XmlDocument::parse("<root><a><b/></a><c/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(names(&doc, &navigate(&doc, root, Axis::Child)), vec!["a", "c"]);
        assert_eq!(names(&doc, &navigate(&doc, root, Axis::Descendant)), vec!["a", "b", "c"]);
        assert_eq!(navigate(&doc, root, Axis::DescendantOrSelf)[0], root);
    }

    #[test]
    fn test_ancestor_axis() {
        let doc = XmlDocument::parse("<root><a><b/></a></root>").unwrap();
        let b = doc.descendants_vec(doc.root_element_id().unwrap())[1];
        let ancestors = navigate(&doc, b, Axis::Ancestor);
        assert_eq!(ancestors.len(), 3); // a, root, document
        assert_eq!(names(&doc, &ancestors[..2]), vec!["a", "root"]);
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = XmlDocument::parse("<r><a><a1/></a><b><b1/></b><c/></r>").unwrap();
        let root = doc.root_element_id().unwrap();
        let b = doc.children_vec(root)[1];
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::Following)), vec!["c"]);
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::Preceding)), vec!["a1", "a"]);
        let b1 = doc.children_vec(b)[0];
        assert_eq!(names(&doc, &navigate(&doc, b1, Axis::Preceding)), vec!["a1", "a"]);
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::PrecedingSibling)), vec!["a"]);
        assert_eq!(names(&doc, &navigate(&doc, b, Axis::FollowingSibling)), vec!["c"]);
    }

    #[test]
    fn test_namespace_aware_name_tests() {
        let doc = XmlDocument::parse(r#"<r xmlns:x="urn:x"><x:item/><item/></r>"#).unwrap();
        let root = doc.root_element_id().unwrap();
        let kids = doc.children_vec(root);
        let plain = CompiledNodeTest::Name("item".to_string());
        let qualified = CompiledNodeTest::QName("x".to_string(), "item".to_string());
        assert!(!matches_node_test(&doc, kids[0], &plain, None));
        assert!(matches_node_test(&doc, kids[1], &plain, None));
        assert!(matches_node_test(&doc, kids[0], &qualified, Some("urn:x")));
        assert!(!matches_node_test(&doc, kids[1], &qualified, Some("urn:x")));
    }

    #[test]
    fn test_attribute_values_skip_declarations() {
        let doc = XmlDocument::parse(r#"<r xmlns:x="urn:x" id="1" x:id="2"/>"#).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(attribute_values(&doc, root, &CompiledNodeTest::Any, None), vec!["1", "2"]);
        let id = CompiledNodeTest::Name("id".to_string());
        assert_eq!(attribute_values(&doc, root, &id, None), vec!["1"]);
    }
}
