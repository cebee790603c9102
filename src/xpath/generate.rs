//! XPath generation for a selected tree node
//!
//! Three strategies:
//! - [`XPathStrategy::Absolute`]: full path with same-tag sibling ordinals
//! - [`XPathStrategy::Relative`]: `//tag`, with the global ordinal when the tag repeats
//! - [`XPathStrategy::Optimized`]: an identifying attribute or text, else Relative
//!
//! The `//tag[k]` form of Relative uses the document-wide ordinal. Standard
//! XPath reads it as the k-th `tag` child of each parent, so it can select
//! a different node, or several, when the tag appears under more than one
//! parent.
//!
//! A prefixed tag is written as `p:tag` only when that name test selects
//! exactly the elements written `p:tag`. Prefixes resolve through one
//! document-wide binding, so a prefix bound to several URIs, or a URI shared
//! by several prefixes, falls back to `*[name()='p:tag']`.

use super::compiler::ExprCache;
use super::eval::evaluate;
use crate::dom::DocumentAccess;
use crate::error::EvaluationError;
use crate::tree::{TreeIndex, TreeNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XPathStrategy {
    #[default]
    Absolute,
    Relative,
    Optimized,
}

/// Generate an expression for the node at `line` (its `node_index`).
///
/// Optimized evaluates its candidates against `doc` to prove uniqueness.
pub fn generate_xpath<D: DocumentAccess>(
    index: &TreeIndex<'_>,
    doc: &D,
    cache: &mut ExprCache,
    line: usize,
    strategy: XPathStrategy,
) -> Result<String, EvaluationError> {
    let node = index
        .get(line)
        .ok_or_else(|| EvaluationError::Evaluation(format!("no node on line {}", line + 1)))?;

    Ok(match strategy {
        XPathStrategy::Absolute => absolute(index, doc, line),
        XPathStrategy::Relative => relative(index, doc, node),
        XPathStrategy::Optimized => optimized(index, doc, cache, node),
    })
}

fn absolute<D: DocumentAccess>(index: &TreeIndex<'_>, doc: &D, line: usize) -> String {
    let mut parts = Vec::new();
    let mut tests: HashMap<&str, String> = HashMap::new();
    let mut current = Some(line);

    while let Some(i) = current {
        let Some(node) = index.get(i) else { break };
        let parent = index.parent(i);
        let position = match parent.and_then(|p| index.get(p)) {
            Some(parent_node) => {
                parent_node
                    .children
                    .iter()
                    .take_while(|c| c.node_index != node.node_index)
                    .filter(|c| c.tag_name == node.tag_name)
                    .count()
                    + 1
            }
            None => 1,
        };
        let test = tests
            .entry(node.tag_name.as_str())
            .or_insert_with(|| name_test(index, doc, node));
        parts.push(format!("{}[{}]", test, position));
        current = parent;
    }

    parts.reverse();
    format!("/{}", parts.join("/"))
}

fn relative<D: DocumentAccess>(index: &TreeIndex<'_>, doc: &D, node: &TreeNode) -> String {
    let mut total = 0;
    let mut ordinal = 0;
    for other in index.iter().filter(|n| n.tag_name == node.tag_name) {
        total += 1;
        if other.node_index <= node.node_index {
            ordinal = total;
        }
    }

    let test = name_test(index, doc, node);
    if total == 1 {
        format!("//{}", test)
    } else {
        format!("//{}[{}]", test, ordinal)
    }
}

/// Element name test selecting exactly the elements tagged like `node`
fn name_test<D: DocumentAccess>(index: &TreeIndex<'_>, doc: &D, node: &TreeNode) -> String {
    let Some(prefix) = node.prefix.as_deref() else {
        return node.tag_name.clone();
    };

    let bound = doc.lookup_namespace(prefix);
    let exact = index.iter().all(|other| {
        let selected = bound.is_some()
            && other.namespace_uri.as_deref() == bound
            && other.local_name == node.local_name;
        selected == (other.tag_name == node.tag_name)
    });

    if exact {
        node.tag_name.clone()
    } else {
        format!("*[name()={}]", quote_literal(&node.tag_name))
    }
}

fn optimized<D: DocumentAccess>(
    index: &TreeIndex<'_>,
    doc: &D,
    cache: &mut ExprCache,
    node: &TreeNode,
) -> String {
    let tag = name_test(index, doc, node);

    if let Some(id) = node.attribute("id") {
        return format!("//{}[@id={}]", tag, quote_literal(id));
    }

    for (name, value) in &node.attributes {
        if is_namespace_declaration(name) {
            continue;
        }
        let candidate = format!("//{}[@{}={}]", tag, name, quote_literal(value));
        if selects_only(doc, cache, &candidate, node) {
            return candidate;
        }
    }

    if !node.text_content.is_empty() {
        let candidate = format!("//{}[text()={}]", tag, quote_literal(&node.text_content));
        if selects_only(doc, cache, &candidate, node) {
            return candidate;
        }
    }

    relative(index, doc, node)
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

fn selects_only<D: DocumentAccess>(doc: &D, cache: &mut ExprCache, xpath: &str, node: &TreeNode) -> bool {
    evaluate(doc, cache, xpath).is_ok_and(|result| result.total == 1 && result.elements == [node.source])
}

/// Quote a value as an XPath string literal.
///
/// Single quotes by default, double quotes when the value holds `'`, and a
/// `concat()` of single-quoted pieces when it holds both.
pub fn quote_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let pieces: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", pieces.join(", \"'\", "))
    }
}
