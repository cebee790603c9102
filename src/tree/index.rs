//! Pre-order index over a built tree
//!
//! Display lines, XPath generation and match mapping all address nodes by
//! `node_index`. The index resolves that number back to the node and its
//! parent without walking the tree each time.

use super::TreeNode;

/// Borrowed pre-order view of a [`TreeNode`] tree
#[derive(Debug, Clone)]
pub struct TreeIndex<'a> {
    nodes: Vec<&'a TreeNode>,
    parents: Vec<Option<usize>>,
}

impl<'a> TreeIndex<'a> {
    pub fn new(root: &'a TreeNode) -> Self {
        let mut nodes = Vec::new();
        let mut parents = Vec::new();
        let mut stack: Vec<(&'a TreeNode, Option<usize>)> = vec![(root, None)];

        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            nodes.push(node);
            parents.push(parent);
            for child in node.children.iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        TreeIndex { nodes, parents }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a TreeNode> {
        self.nodes.get(index).copied()
    }

    #[inline]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent(index), move |&i| self.parent(i))
    }

    /// Nodes in pre-order
    pub fn iter(&self) -> impl Iterator<Item = &'a TreeNode> + '_ {
        self.nodes.iter().copied()
    }
}
