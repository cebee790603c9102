//! Tree node record

use crate::dom::NodeId;
use serde::Deserialize;

/// One element of the normalized tree.
///
/// The JSON record format uses camelCase field names and writes
/// `attributes` as an object in stored order; see [`super::export`].
/// Dropping a tree releases its descendants without recursion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Qualified name as written in the source
    pub tag_name: String,
    pub local_name: String,
    pub prefix: Option<String>,
    #[serde(rename = "namespaceURI")]
    pub namespace_uri: Option<String>,
    /// Attributes in document order, `xmlns` declarations included
    #[serde(deserialize_with = "super::export::ordered_attributes")]
    pub attributes: Vec<(String, String)>,
    /// Trimmed direct text and CDATA children, concatenated
    pub text_content: String,
    pub children: Vec<TreeNode>,
    /// Root is 0
    pub depth: usize,
    pub has_children: bool,
    /// No direct text and no children
    pub is_empty: bool,
    /// Pre-order position, 0 for the root
    pub node_index: usize,
    /// Originating element in the source document
    #[serde(skip)]
    pub source: NodeId,
}

impl TreeNode {
    /// Look up an attribute value by qualified name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Pre-order iterator over this node and its descendants
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Explicit-stack pre-order walk over a [`TreeNode`] subtree
pub struct PreOrder<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, index: usize, depth: usize) -> TreeNode {
        TreeNode {
            tag_name: name.to_string(),
            local_name: name.to_string(),
            prefix: None,
            namespace_uri: None,
            attributes: vec![("k".to_string(), "v".to_string())],
            text_content: String::new(),
            children: Vec::new(),
            depth,
            has_children: false,
            is_empty: true,
            node_index: index,
            source: 0,
        }
    }

    #[test]
    fn test_pre_order_iteration() {
        let mut a = leaf("a", 1, 1);
        a.children.push(leaf("b", 2, 2));
        let mut root = leaf("r", 0, 0);
        root.children = vec![a, leaf("c", 3, 1)];
        let order: Vec<_> = root.iter().map(|n| n.tag_name.as_str()).collect();
        assert_eq!(order, vec!["r", "a", "b", "c"]);
    }

    #[test]
    fn test_attribute_lookup() {
        let node = leaf("x", 0, 0);
        assert_eq!(node.attribute("k"), Some("v"));
        assert_eq!(node.attribute("missing"), None);
    }

    #[test]
    fn test_drop_deep_chain() {
        let mut root = leaf("d", 0, 0);
        for _ in 1..100_000 {
            let mut parent = leaf("d", 0, 0);
            parent.children.push(root);
            root = parent;
        }
        assert_eq!(root.iter().count(), 100_000);
        drop(root);
    }
}
