//! Tree Builder
//!
//! Converts the source document into the normalized [`TreeNode`] tree in
//! one pre-order pass, gathering statistics and registering namespaces as
//! it goes. Uses an explicit stack, so document depth is bounded only by
//! memory.

use super::{NamespaceRegistry, ParseStatistics, TreeNode};
use crate::dom::{direct_text, DocumentAccess, NodeId, XmlDocument};

/// Result of [`build_tree`]
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub root: TreeNode,
    pub stats: ParseStatistics,
}

/// Build the normalized tree for `doc`.
///
/// Returns `None` only for a document without a root element, which the
/// reader never produces.
pub fn build_tree(doc: &XmlDocument, registry: &mut NamespaceRegistry) -> Option<BuiltTree> {
    let root_id = doc.root_element_id()?;
    let mut stats = ParseStatistics {
        source_bytes: doc.source_len(),
        ..Default::default()
    };

    // Flat pre-order list first, then fold children into parents from the back
    let mut flat: Vec<TreeNode> = Vec::new();
    let mut parents: Vec<Option<usize>> = Vec::new();
    let mut stack: Vec<(NodeId, usize, Option<usize>)> = vec![(root_id, 0, None)];

    while let Some((id, depth, parent)) = stack.pop() {
        let node = make_node(doc, id, depth, flat.len());
        if let Some(uri) = node.namespace_uri.as_deref() {
            registry.register(uri, node.prefix.as_deref());
        }
        stats.record(&node);

        let index = flat.len();
        flat.push(node);
        parents.push(parent);

        let children: Vec<NodeId> = doc.child_elements(id).collect();
        for &child in children.iter().rev() {
            stack.push((child, depth + 1, Some(index)));
        }
    }

    // A node's children all sit after it, so popping from the end completes
    // each child list before its owner is attached to its own parent
    while flat.len() > 1 {
        let index = flat.len() - 1;
        let mut node = flat.pop()?;
        node.children.reverse();
        let parent = parents[index]?;
        flat[parent].children.push(node);
    }
    let mut root = flat.pop()?;
    root.children.reverse();

    Some(BuiltTree { root, stats })
}

fn make_node(doc: &XmlDocument, id: NodeId, depth: usize, node_index: usize) -> TreeNode {
    let text_content = direct_text(doc, id);
    let has_children = doc.child_elements(id).next().is_some();
    let attributes = doc
        .attributes(id)
        .iter()
        .map(|a| (doc.attribute_name(a).to_string(), doc.attribute_value(a).to_string()))
        .collect();

    TreeNode {
        tag_name: doc.node_name(id).unwrap_or_default().to_string(),
        local_name: doc.node_local_name(id).unwrap_or_default().to_string(),
        prefix: doc.node_prefix(id).map(str::to_string),
        namespace_uri: doc.node_namespace_uri(id).map(str::to_string),
        attributes,
        is_empty: text_content.is_empty() && !has_children,
        text_content,
        children: Vec::new(),
        depth,
        has_children,
        node_index,
        source: id,
    }
}
