//! Parse statistics

use super::TreeNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Counters collected while building the tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStatistics {
    pub total_elements: usize,
    /// Sorted, for the element filter
    pub distinct_tags: BTreeSet<String>,
    pub max_depth: usize,
    /// Every stored attribute, namespace declarations included
    pub total_attributes: usize,
    /// Elements with non-empty direct text
    pub text_nodes: usize,
    pub source_bytes: usize,
}

impl ParseStatistics {
    /// Account for one element
    pub fn record(&mut self, node: &TreeNode) {
        self.total_elements += 1;
        if !self.distinct_tags.contains(&node.tag_name) {
            self.distinct_tags.insert(node.tag_name.clone());
        }
        self.max_depth = self.max_depth.max(node.depth);
        self.total_attributes += node.attributes.len();
        if !node.text_content.is_empty() {
            self.text_nodes += 1;
        }
    }

    /// Re-derive the statistics from a finished tree
    pub fn from_tree(root: &TreeNode, source_bytes: usize) -> Self {
        let mut stats = ParseStatistics {
            source_bytes,
            ..Default::default()
        };
        for node in root.iter() {
            stats.record(node);
        }
        stats
    }
}
