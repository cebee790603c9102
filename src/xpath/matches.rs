//! Mapping evaluation results onto display lines, and match navigation

use crate::dom::{DocumentAccess, NodeId};
use crate::tree::TreeIndex;
use crate::view::DisplayList;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Results above this count are reported but not mapped
pub const MAX_MAPPED_MATCHES: usize = 100;

/// How a matched source element finds its display line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMapping {
    /// Each match takes the first unassigned line with the same tag name.
    /// Lines and matches are both in document order, so for namespaced
    /// documents where the tag name is ambiguous this can land on the
    /// wrong element.
    #[default]
    TagName,
    /// Each match takes the line built from that exact element
    Identity,
}

/// Mapped match lines and the current position among them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchState {
    lines: Vec<usize>,
    current: Option<usize>,
}

impl MatchState {
    pub fn new(lines: Vec<usize>) -> Self {
        MatchState { lines, current: None }
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Position within the matches, `None` before navigation
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Line of the current match
    pub fn current_line(&self) -> Option<usize> {
        self.current.map(|i| self.lines[i])
    }

    /// Step forward, wrapping to the first match
    pub fn advance(&mut self) -> Option<usize> {
        if self.lines.is_empty() {
            return None;
        }
        let next = self.current.map_or(0, |i| (i + 1) % self.lines.len());
        self.current = Some(next);
        Some(self.lines[next])
    }

    /// Step back, wrapping to the last match
    pub fn retreat(&mut self) -> Option<usize> {
        if self.lines.is_empty() {
            return None;
        }
        let len = self.lines.len();
        let prev = self.current.map_or(len - 1, |i| (i + len - 1) % len);
        self.current = Some(prev);
        Some(self.lines[prev])
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.current = None;
    }
}

/// Where navigation landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub line: usize,
    pub line_number: usize,
}

/// Bind matched elements to display lines, in match order.
///
/// Matches without a line are left out of the result.
pub fn map_matches<D: DocumentAccess>(
    doc: &D,
    elements: &[NodeId],
    index: &TreeIndex<'_>,
    display: &DisplayList,
    mode: MatchMapping,
) -> Vec<usize> {
    match mode {
        MatchMapping::TagName => map_by_tag(doc, elements, index, display),
        MatchMapping::Identity => map_by_identity(elements, index, display),
    }
}

fn map_by_tag<D: DocumentAccess>(
    doc: &D,
    elements: &[NodeId],
    index: &TreeIndex<'_>,
    display: &DisplayList,
) -> Vec<usize> {
    let mut by_tag: HashMap<&str, Vec<usize>> = HashMap::new();
    for (line, entry) in display.lines().iter().enumerate() {
        if let Some(node) = index.get(entry.node) {
            by_tag.entry(node.tag_name.as_str()).or_default().push(line);
        }
    }

    let mut cursors: HashMap<&str, usize> = HashMap::new();
    let mut mapped = Vec::new();
    for &element in elements {
        let tag = doc.node_name(element).unwrap_or_default();
        let candidates = by_tag.get(tag).map(Vec::as_slice).unwrap_or_default();
        let cursor = cursors.entry(tag).or_insert(0);
        match candidates.get(*cursor) {
            Some(&line) => {
                mapped.push(line);
                *cursor += 1;
            }
            None => warn!("no display line left for matched <{}>", tag),
        }
    }
    mapped
}

fn map_by_identity(elements: &[NodeId], index: &TreeIndex<'_>, display: &DisplayList) -> Vec<usize> {
    let by_source: HashMap<NodeId, usize> = display
        .lines()
        .iter()
        .enumerate()
        .filter_map(|(line, entry)| index.get(entry.node).map(|node| (node.source, line)))
        .collect();

    elements
        .iter()
        .filter_map(|id| {
            let line = by_source.get(id).copied();
            if line.is_none() {
                warn!("no display line for matched node {}", id);
            }
            line
        })
        .collect()
}

/// Mark `line` as the current match and reveal it
pub fn focus(display: &mut DisplayList, line: usize) -> Option<NavigationTarget> {
    for l in 0..display.len() {
        if let Some(entry) = display.line_mut(l) {
            entry.current_match = false;
        }
    }
    display.expand_ancestors(line);
    if !display.select(line) {
        return None;
    }
    let entry = display.line_mut(line)?;
    entry.current_match = true;
    trace!("navigated to line {}", entry.line_number);
    Some(NavigationTarget {
        line,
        line_number: entry.line_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::tree::{build_tree, NamespaceRegistry};
    use crate::xpath::{evaluate, ExprCache};

    fn map(xml: &str, xpath: &str, mode: MatchMapping) -> Vec<usize> {
        let doc = XmlDocument::parse(xml).unwrap();
        let mut registry = NamespaceRegistry::new();
        let root = build_tree(&doc, &mut registry).unwrap().root;
        let index = TreeIndex::new(&root);
        let display = DisplayList::render(&root, &registry);
        let result = evaluate(&doc, &mut ExprCache::default(), xpath).unwrap();
        map_matches(&doc, &result.elements, &index, &display, mode)
    }

    #[test]
    fn test_tag_mapping_is_greedy() {
        let xml = "<r><a><i/></a><b><i/><i/></b></r>";
        assert_eq!(map(xml, "//b/i", MatchMapping::TagName), vec![2, 4]);
        assert_eq!(map(xml, "//b/i", MatchMapping::Identity), vec![4, 5]);
        assert_eq!(map(xml, "//i", MatchMapping::TagName), vec![2, 4, 5]);
    }

    #[test]
    fn test_identity_mapping_is_exact() {
        let xml = "<r><a><i/></a><b><i/><i/></b></r>";
        assert_eq!(map(xml, "//i[2]", MatchMapping::Identity), vec![5]);
        assert_eq!(map(xml, "//i", MatchMapping::Identity), vec![2, 4, 5]);
    }

    #[test]
    fn test_match_state_wraps() {
        let mut state = MatchState::new(vec![3, 7, 9]);
        assert_eq!(state.current_line(), None);
        assert_eq!(state.advance(), Some(3));
        assert_eq!(state.advance(), Some(7));
        assert_eq!(state.advance(), Some(9));
        assert_eq!(state.advance(), Some(3));
        assert_eq!(state.retreat(), Some(9));
        assert_eq!(state.current_index(), Some(2));

        let mut fresh = MatchState::new(vec![1, 2]);
        assert_eq!(fresh.retreat(), Some(2));
        fresh.clear();
        assert_eq!(fresh.advance(), None);
    }

    #[test]
    fn test_focus_expands_and_flags() {
        let doc = XmlDocument::parse("<r><a><i/></a><i/></r>").unwrap();
        let mut registry = NamespaceRegistry::new();
        let root = build_tree(&doc, &mut registry).unwrap().root;
        let mut display = DisplayList::render(&root, &registry);
        display.collapse_all();

        let target = focus(&mut display, 2).unwrap();
        assert_eq!(target, NavigationTarget { line: 2, line_number: 3 });
        assert!(display.is_shown(2));
        assert!(display.line(2).unwrap().selected);

        focus(&mut display, 3).unwrap();
        assert!(!display.line(2).unwrap().current_match);
        assert!(!display.line(2).unwrap().selected);
        assert!(display.line(3).unwrap().current_match);
        assert!(focus(&mut display, 10).is_none());
    }
}
