//! Display list
//!
//! One [`DisplayLine`] per tree node in pre-order, so a line's position is
//! also its node's `node_index`. Filtering, collapsing and XPath emphasis
//! only flip flags on the lines; the tree itself is never touched.

use super::filter::{FilterState, FilterSummary, SearchMatcher};
use super::highlight::{Highlight, HighlightField};
use crate::tree::{ColorToken, NamespaceRegistry, TreeIndex, TreeNode};
use log::trace;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    /// `node_index` of the rendered node
    pub node: usize,
    /// Line of the parent node
    pub parent: Option<usize>,
    pub depth: usize,
    /// 1-based
    pub line_number: usize,
    pub visible: bool,
    /// Children hidden behind this line
    pub collapsed: bool,
    pub color: ColorToken,
    pub has_children: bool,
    pub highlights: Vec<Highlight>,
    pub xpath_match: bool,
    pub current_match: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    lines: Vec<DisplayLine>,
}

impl DisplayList {
    /// Render every node of the tree as a visible, expanded line
    pub fn render(root: &TreeNode, registry: &NamespaceRegistry) -> Self {
        let mut lines = Vec::new();
        let mut stack: Vec<(&TreeNode, Option<usize>)> = vec![(root, None)];

        while let Some((node, parent)) = stack.pop() {
            let line = lines.len();
            lines.push(DisplayLine {
                node: node.node_index,
                parent,
                depth: node.depth,
                line_number: line + 1,
                visible: true,
                collapsed: false,
                color: registry.color_of(node.namespace_uri.as_deref()),
                has_children: node.has_children,
                highlights: Vec::new(),
                xpath_match: false,
                current_match: false,
                selected: false,
            });
            for child in node.children.iter().rev() {
                stack.push((child, Some(line)));
            }
        }

        DisplayList { lines }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[inline]
    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    #[inline]
    pub fn line(&self, line: usize) -> Option<&DisplayLine> {
        self.lines.get(line)
    }

    #[inline]
    pub fn line_mut(&mut self, line: usize) -> Option<&mut DisplayLine> {
        self.lines.get_mut(line)
    }

    /// Lines from the parent up to the root
    pub fn ancestors(&self, line: usize) -> impl Iterator<Item = usize> + '_ {
        let first = self.lines.get(line).and_then(|l| l.parent);
        std::iter::successors(first, move |&l| self.lines.get(l).and_then(|p| p.parent))
    }

    /// Visible/total counter
    pub fn summary(&self) -> FilterSummary {
        FilterSummary {
            total: self.lines.len(),
            visible: self.lines.iter().filter(|l| l.visible).count(),
        }
    }

    /// Recompute visibility and search highlights from `state`
    pub fn apply_filters(&mut self, index: &TreeIndex<'_>, state: &FilterState) -> FilterSummary {
        self.clear_highlights();
        let matcher = SearchMatcher::new(&state.search, state.regex);

        for line in &mut self.lines {
            let Some(node) = index.get(line.node) else {
                line.visible = false;
                continue;
            };

            let mut visible = state.element.as_ref().is_none_or(|e| *e == node.tag_name);
            if !state.include_empty && node.is_empty {
                visible = false;
            }

            if matcher.is_active() {
                let mut matched = false;
                if state.scope.tag_names {
                    matched |= matcher.is_match(&node.tag_name);
                    push_spans(&mut line.highlights, &matcher, &node.tag_name, HighlightField::TagName);
                }
                if state.scope.text {
                    matched |= matcher.is_match(&node.text_content);
                    push_spans(&mut line.highlights, &matcher, &node.text_content, HighlightField::Text);
                }
                if state.scope.attributes {
                    for (i, (name, value)) in node.attributes.iter().enumerate() {
                        let rendered = attribute_string(name, value);
                        matched |= matcher.is_match(&rendered);
                        push_spans(&mut line.highlights, &matcher, &rendered, HighlightField::Attribute(i));
                    }
                }
                // Spans are highlight-only; an empty match still shows the line
                if !matched {
                    visible = false;
                }
            }

            line.visible = visible;
        }

        let summary = self.summary();
        trace!("filter pass: {} of {} lines visible", summary.visible, summary.total);
        summary
    }

    /// Show exactly `matched`, their ancestors and their direct children
    pub fn show_only(&mut self, matched: &[usize]) -> FilterSummary {
        self.clear_highlights();
        let mut keep: HashSet<usize> = HashSet::new();

        for &line in matched {
            if line >= self.lines.len() {
                continue;
            }
            keep.insert(line);
            keep.extend(self.ancestors(line));
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.parent.is_some_and(|p| matched.contains(&p)) {
                keep.insert(i);
            }
        }
        for (i, line) in self.lines.iter_mut().enumerate() {
            line.visible = keep.contains(&i);
        }

        self.summary()
    }

    pub fn clear_highlights(&mut self) {
        for line in &mut self.lines {
            line.highlights.clear();
        }
    }

    /// Drop `xpath_match` and `current_match` from every line
    pub fn clear_match_flags(&mut self) {
        for line in &mut self.lines {
            line.xpath_match = false;
            line.current_match = false;
        }
    }

    pub fn clear_selection(&mut self) {
        for line in &mut self.lines {
            line.selected = false;
        }
    }

    /// Make `line` the only selected line
    pub fn select(&mut self, line: usize) -> bool {
        if line >= self.lines.len() {
            return false;
        }
        self.clear_selection();
        self.lines[line].selected = true;
        true
    }

    /// Flip the collapsed state of a line with children
    pub fn toggle(&mut self, line: usize) -> bool {
        match self.lines.get_mut(line) {
            Some(l) if l.has_children => {
                l.collapsed = !l.collapsed;
                true
            }
            _ => false,
        }
    }

    pub fn expand_all(&mut self) {
        for line in &mut self.lines {
            line.collapsed = false;
        }
    }

    pub fn collapse_all(&mut self) {
        for line in &mut self.lines {
            line.collapsed = line.has_children;
        }
    }

    /// Expand every collapsed ancestor so `line` can be shown
    pub fn expand_ancestors(&mut self, line: usize) {
        let ancestors: Vec<usize> = self.ancestors(line).collect();
        for a in ancestors {
            self.lines[a].collapsed = false;
        }
    }

    /// Visible and not inside a collapsed section
    pub fn is_shown(&self, line: usize) -> bool {
        self.lines.get(line).is_some_and(|l| l.visible)
            && self.ancestors(line).all(|a| !self.lines[a].collapsed)
    }
}

/// The text an attribute is searched and highlighted as
pub fn attribute_string(name: &str, value: &str) -> String {
    format!("{}=\"{}\"", name, value)
}

fn push_spans(out: &mut Vec<Highlight>, matcher: &SearchMatcher, text: &str, field: HighlightField) {
    out.extend(
        matcher
            .find_spans(text)
            .into_iter()
            .map(|range| Highlight { field, range }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::tree::build_tree;

    const XML: &str = r#"<catalog xmlns:m="urn:m"><book id="b1"><title>Rust</title><m:note/></book><book id="b2"><title>Go</title></book><empty/></catalog>"#;

    fn setup() -> (TreeNode, NamespaceRegistry) {
        let doc = XmlDocument::parse(XML).unwrap();
        let mut registry = NamespaceRegistry::new();
        let root = build_tree(&doc, &mut registry).unwrap().root;
        (root, registry)
    }

    fn visible(list: &DisplayList) -> Vec<usize> {
        list.lines().iter().filter(|l| l.visible).map(|l| l.node).collect()
    }

    #[test]
    fn test_render_lines() {
        let (root, registry) = setup();
        let list = DisplayList::render(&root, &registry);
        assert_eq!(list.len(), 7);
        for (i, line) in list.lines().iter().enumerate() {
            assert_eq!(line.node, i);
            assert_eq!(line.line_number, i + 1);
        }
        assert_eq!(list.line(2).unwrap().parent, Some(1));
        assert_eq!(list.line(3).unwrap().color, ColorToken::Default);
        assert!(list.line(1).unwrap().has_children);
        assert_eq!(list.summary(), FilterSummary { total: 7, visible: 7 });
    }

    #[test]
    fn test_element_filter_and_empty_rule() {
        let (root, registry) = setup();
        let index = TreeIndex::new(&root);
        let mut list = DisplayList::render(&root, &registry);

        let state = FilterState {
            element: Some("title".to_string()),
            ..Default::default()
        };
        assert_eq!(list.apply_filters(&index, &state).visible, 2);
        assert_eq!(visible(&list), vec![2, 5]);

        let state = FilterState {
            include_empty: false,
            ..Default::default()
        };
        list.apply_filters(&index, &state);
        assert_eq!(visible(&list), vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn test_search_scopes_and_highlights() {
        let (root, registry) = setup();
        let index = TreeIndex::new(&root);
        let mut list = DisplayList::render(&root, &registry);

        let mut state = FilterState {
            search: "B2".to_string(),
            ..Default::default()
        };
        list.apply_filters(&index, &state);
        assert_eq!(visible(&list), vec![4]);
        assert_eq!(
            list.line(4).unwrap().highlights,
            vec![Highlight { field: HighlightField::Attribute(0), range: 4..6 }]
        );

        state.search = "rust".to_string();
        state.scope.text = false;
        list.apply_filters(&index, &state);
        assert!(visible(&list).is_empty());

        state.scope.text = true;
        list.apply_filters(&index, &state);
        assert_eq!(visible(&list), vec![2]);
        assert_eq!(list.line(2).unwrap().highlights[0].field, HighlightField::Text);
    }

    #[test]
    fn test_empty_regex_match_keeps_lines_visible() {
        let (root, registry) = setup();
        let index = TreeIndex::new(&root);
        let mut list = DisplayList::render(&root, &registry);

        for pattern in ["^", "z?"] {
            let state = FilterState {
                search: pattern.to_string(),
                regex: true,
                ..Default::default()
            };
            assert_eq!(list.apply_filters(&index, &state).visible, 7, "{}", pattern);
            assert!(list.lines().iter().all(|l| l.highlights.is_empty()));
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let (root, registry) = setup();
        let index = TreeIndex::new(&root);
        let mut list = DisplayList::render(&root, &registry);
        let state = FilterState {
            search: "o".to_string(),
            ..Default::default()
        };
        list.apply_filters(&index, &state);
        let first = list.clone();
        list.apply_filters(&index, &state);
        assert_eq!(list.lines(), first.lines());
    }

    #[test]
    fn test_show_only_matches_ancestors_and_children() {
        let (root, registry) = setup();
        let mut list = DisplayList::render(&root, &registry);
        let summary = list.show_only(&[1]);
        assert_eq!(visible(&list), vec![0, 1, 2, 3]);
        assert_eq!(summary.visible, 4);
    }

    #[test]
    fn test_collapse_and_expand() {
        let (root, registry) = setup();
        let mut list = DisplayList::render(&root, &registry);

        list.collapse_all();
        assert!(list.is_shown(0));
        assert!(!list.is_shown(1));
        assert!(!list.line(6).unwrap().collapsed);

        list.expand_ancestors(2);
        assert!(list.is_shown(2));
        assert!(!list.is_shown(5));

        assert!(list.toggle(4));
        assert!(!list.line(4).unwrap().collapsed);
        assert!(!list.toggle(6));

        list.expand_all();
        assert!((0..list.len()).all(|l| list.is_shown(l)));
    }
}
