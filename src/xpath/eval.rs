//! XPath Evaluation Engine
//!
//! Evaluates compiled XPath expressions against an XML document.

use super::axes::{attribute_values, matches_node_test, navigate};
use super::compiler::{CompiledExpr, CompiledNodeTest, ExprCache, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::{parse_number, XPathValue};
use crate::dom::{DocumentAccess, NodeId, NodeKind};
use crate::error::EvaluationError;
use log::debug;
use std::collections::HashSet;

/// Evaluation context - generic over document type
pub struct EvalContext<'a, D: DocumentAccess> {
    pub doc: &'a D,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a, D: DocumentAccess> EvalContext<'a, D> {
    fn at(&self, node: NodeId, position: usize, size: usize) -> Self {
        EvalContext {
            doc: self.doc,
            context_node: node,
            context_position: position,
            context_size: size,
        }
    }
}

/// Outcome of an expression that selected nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSetResult {
    /// Every selected item, attribute values and text nodes included
    pub total: usize,
    /// Selected elements in document order
    pub elements: Vec<NodeId>,
}

/// Evaluate an expression from the document node and require a node-set.
///
/// Compiled programs come from `cache`. Prefixed name tests must use a
/// prefix declared somewhere in the document.
pub fn evaluate<D: DocumentAccess>(
    doc: &D,
    cache: &mut ExprCache,
    xpath: &str,
) -> Result<NodeSetResult, EvaluationError> {
    let xpath = xpath.trim();
    if xpath.is_empty() {
        return Err(EvaluationError::Empty);
    }

    let compiled = cache.get_or_compile(xpath).map_err(EvaluationError::Syntax)?;
    if let Some(prefix) = compiled.prefixes().into_iter().find(|p| doc.lookup_namespace(p).is_none()) {
        return Err(EvaluationError::UnboundPrefix(prefix.to_string()));
    }

    let context = EvalContext {
        doc,
        context_node: doc.document_node_id(),
        context_position: 1,
        context_size: 1,
    };
    let result = match evaluate_compiled(&compiled, &context).map_err(EvaluationError::Evaluation)? {
        XPathValue::NodeSet(nodes) => NodeSetResult {
            total: nodes.len(),
            elements: nodes
                .into_iter()
                .filter(|&n| doc.node_kind_of(n) == Some(NodeKind::Element))
                .collect(),
        },
        XPathValue::StringList(values) => NodeSetResult {
            total: values.len(),
            elements: Vec::new(),
        },
        other => return Err(EvaluationError::NotNodeSet(other.type_name())),
    };

    debug!(
        "xpath {} selected {} items ({} elements)",
        xpath,
        result.total,
        result.elements.len()
    );
    Ok(result)
}

fn pop(stack: &mut Vec<XPathValue>) -> Result<XPathValue, String> {
    stack.pop().ok_or_else(|| "Malformed expression program".to_string())
}

/// Evaluate a compiled expression
pub fn evaluate_compiled<D: DocumentAccess>(
    expr: &CompiledExpr,
    ctx: &EvalContext<'_, D>,
) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => {
                // Root is the document node (for XPath absolute paths like /root)
                stack.push(XPathValue::single_node(ctx.doc.document_node_id()));
            }

            Op::Context => {
                stack.push(XPathValue::single_node(ctx.context_node));
            }

            Op::Step {
                axis,
                test,
                predicates,
            } => {
                let nodes = match pop(&mut stack)? {
                    XPathValue::NodeSet(nodes) => nodes,
                    other => {
                        return Err(format!("Cannot apply a location step to a {}", other.type_name()))
                    }
                };
                let namespace = match test {
                    CompiledNodeTest::QName(prefix, _) | CompiledNodeTest::NamespaceWildcard(prefix) => {
                        Some(
                            ctx.doc
                                .lookup_namespace(prefix)
                                .ok_or_else(|| format!("Namespace prefix '{}' is not declared", prefix))?,
                        )
                    }
                    _ => None,
                };

                if *axis == Axis::Attribute {
                    if !predicates.is_empty() {
                        return Err("Predicates on attribute steps are not supported".to_string());
                    }
                    let values = nodes
                        .into_iter()
                        .flat_map(|node| attribute_values(ctx.doc, node, test, namespace))
                        .collect();
                    stack.push(XPathValue::StringList(values));
                    continue;
                }

                // Per-context filtering keeps predicate positions relative to each context node
                let mut seen = HashSet::with_capacity(nodes.len());
                let mut result = Vec::with_capacity(nodes.len());
                for node in nodes {
                    let mut candidates: Vec<NodeId> = navigate(ctx.doc, node, *axis)
                        .into_iter()
                        .filter(|&c| matches_node_test(ctx.doc, c, test, namespace))
                        .collect();
                    for pred in predicates {
                        candidates = filter_by_predicate(ctx, candidates, pred)?;
                    }
                    result.extend(candidates.into_iter().filter(|&c| seen.insert(c)));
                }
                // Sort by document order (node IDs are assigned in document order)
                result.sort_unstable();
                stack.push(XPathValue::NodeSet(result));
            }

            Op::Predicate(pred_expr) => match pop(&mut stack)? {
                XPathValue::NodeSet(nodes) => {
                    stack.push(XPathValue::NodeSet(filter_by_predicate(ctx, nodes, pred_expr)?));
                }
                other => return Err(format!("Cannot filter a {}", other.type_name())),
            },

            Op::Union => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;

                match (left, right) {
                    (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                        let mut seen: HashSet<NodeId> = l.iter().copied().collect();
                        let mut result = l;
                        result.extend(r.into_iter().filter(|&n| seen.insert(n)));
                        result.sort_unstable();
                        stack.push(XPathValue::NodeSet(result));
                    }
                    (XPathValue::StringList(mut l), XPathValue::StringList(r)) => {
                        l.extend(r);
                        stack.push(XPathValue::StringList(l));
                    }
                    _ => {
                        return Err("Union requires two node-sets".to_string());
                    }
                }
            }

            Op::Number(n) => {
                stack.push(XPathValue::Number(*n));
            }

            Op::String(s) => {
                stack.push(XPathValue::String(s.clone()));
            }

            Op::Variable(name) => {
                return Err(format!("Variable references are not supported: ${}", name));
            }

            Op::Negate => {
                let val = pop(&mut stack)?;
                stack.push(XPathValue::Number(-val.number_in(ctx.doc)));
            }

            Op::Binary(op) => {
                let right = pop(&mut stack)?;
                let left = pop(&mut stack)?;
                let doc = ctx.doc;

                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq => XPathValue::Boolean(equality(doc, &left, &right, false)),
                    BinaryOp::NotEq => XPathValue::Boolean(equality(doc, &left, &right, true)),
                    BinaryOp::Lt => XPathValue::Boolean(relational(doc, &left, &right, |a, b| a < b)),
                    BinaryOp::LtEq => XPathValue::Boolean(relational(doc, &left, &right, |a, b| a <= b)),
                    BinaryOp::Gt => XPathValue::Boolean(relational(doc, &left, &right, |a, b| a > b)),
                    BinaryOp::GtEq => XPathValue::Boolean(relational(doc, &left, &right, |a, b| a >= b)),
                    BinaryOp::Add => XPathValue::Number(left.number_in(doc) + right.number_in(doc)),
                    BinaryOp::Sub => XPathValue::Number(left.number_in(doc) - right.number_in(doc)),
                    BinaryOp::Mul => XPathValue::Number(left.number_in(doc) * right.number_in(doc)),
                    BinaryOp::Div => XPathValue::Number(left.number_in(doc) / right.number_in(doc)),
                    BinaryOp::Mod => XPathValue::Number(left.number_in(doc) % right.number_in(doc)),
                };

                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                if stack.len() < *arg_count {
                    return Err("Malformed expression program".to_string());
                }
                let args = stack.split_off(stack.len() - arg_count);

                let result = functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.context_node,
                    ctx.context_position,
                    ctx.context_size,
                )?;

                stack.push(result);
            }
        }
    }

    pop(&mut stack)
}

/// Keep the nodes for which the predicate holds; a number predicate
/// selects by position
fn filter_by_predicate<D: DocumentAccess>(
    ctx: &EvalContext<'_, D>,
    nodes: Vec<NodeId>,
    pred: &CompiledExpr,
) -> Result<Vec<NodeId>, String> {
    let size = nodes.len();
    let mut filtered = Vec::new();
    for (i, node) in nodes.into_iter().enumerate() {
        let include = match evaluate_compiled(pred, &ctx.at(node, i + 1, size))? {
            XPathValue::Number(n) => (i + 1) as f64 == n,
            other => other.to_boolean(),
        };
        if include {
            filtered.push(node);
        }
    }
    Ok(filtered)
}

/// `=` and `!=` per XPath 1.0, with attribute lists compared like node-sets
fn equality<D: DocumentAccess>(doc: &D, left: &XPathValue, right: &XPathValue, negate: bool) -> bool {
    let eq_str = |a: &str, b: &str| (a == b) != negate;
    let eq_num = |a: f64, b: f64| if negate { a != b } else { a == b };

    let against = |members: &[String], other: &XPathValue| match other {
        XPathValue::Boolean(b) => eq_num(f64::from(!members.is_empty()), f64::from(*b)),
        XPathValue::Number(n) => members.iter().any(|m| eq_num(parse_number(m), *n)),
        _ => {
            let s = other.to_string_value();
            members.iter().any(|m| eq_str(m.as_str(), s.as_str()))
        }
    };

    match (left.member_strings(doc), right.member_strings(doc)) {
        (Some(ls), Some(rs)) => ls.iter().any(|l| rs.iter().any(|r| eq_str(l.as_str(), r.as_str()))),
        (Some(members), None) => against(&members, right),
        (None, Some(members)) => against(&members, left),
        (None, None) => match (left, right) {
            (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                eq_num(f64::from(left.to_boolean()), f64::from(right.to_boolean()))
            }
            (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => eq_num(left.to_number(), right.to_number()),
            _ => eq_str(left.to_string_value().as_str(), right.to_string_value().as_str()),
        },
    }
}

/// `<`, `<=`, `>`, `>=`: numeric, existential over node-set members
fn relational<D: DocumentAccess>(
    doc: &D,
    left: &XPathValue,
    right: &XPathValue,
    cmp: fn(f64, f64) -> bool,
) -> bool {
    let numbers = |v: &XPathValue| -> Vec<f64> {
        match v.member_strings(doc) {
            Some(members) => members.iter().map(|m| parse_number(m)).collect(),
            None => vec![v.to_number()],
        }
    };
    let ls = numbers(left);
    let rs = numbers(right);
    ls.iter().any(|&l| rs.iter().any(|&r| cmp(l, r)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    fn eval(doc: &XmlDocument, xpath: &str) -> Result<NodeSetResult, EvaluationError> {
        evaluate(doc, &mut ExprCache::default(), xpath)
    }

    fn names(doc: &XmlDocument, xpath: &str) -> Vec<String> {
        eval(doc, xpath)
            .unwrap()
            .elements
            .iter()
            .map(|&id| doc.node_name(id).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_simple_path() {
        let doc = XmlDocument::parse("<root><child/></root>").unwrap();
        assert_eq!(eval(&doc, "/root/child").unwrap().total, 1);
        assert_eq!(eval(&doc, "//child").unwrap().total, 1);
    }

    #[test]
    fn test_step_predicates_are_per_parent() {
        let doc = XmlDocument::parse("<r><g><i>1</i><i>2</i></g><g><i>3</i></g></r>").unwrap();
        let result = eval(&doc, "//i[1]").unwrap();
        assert_eq!(result.total, 2);
        let texts: Vec<_> = result
            .elements
            .iter()
            .map(|&id| crate::dom::node_string_value(&doc, id))
            .collect();
        assert_eq!(texts, vec!["1", "3"]);
        assert_eq!(eval(&doc, "(//i)[3]").unwrap().total, 1);
        assert_eq!(eval(&doc, "/r/g[last()]/i").unwrap().total, 1);
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = XmlDocument::parse("<r><a/><b/><c/></r>").unwrap();
        assert_eq!(names(&doc, "//c/preceding-sibling::*[1]"), vec!["b"]);
        assert_eq!(names(&doc, "//c/ancestor::*[1]"), vec!["r"]);
    }

    #[test]
    fn test_attribute_predicates_and_values() {
        let doc = XmlDocument::parse(r#"<r><i id="a"/><i id="b" x="1"/><i/></r>"#).unwrap();
        assert_eq!(eval(&doc, "//i[@id='b']").unwrap().total, 1);
        assert_eq!(eval(&doc, "//i[@id]").unwrap().total, 2);
        let attrs = eval(&doc, "//i/@id").unwrap();
        assert_eq!(attrs.total, 2);
        assert!(attrs.elements.is_empty());
        assert_eq!(eval(&doc, "//i[count(@*) = 2]").unwrap().total, 1);
        assert!(eval(&doc, "//i/@id[1]").is_err());
    }

    #[test]
    fn test_text_nodes_counted_not_mapped() {
        let doc = XmlDocument::parse("<r><a>x</a><a>y</a></r>").unwrap();
        let result = eval(&doc, "//a/text()").unwrap();
        assert_eq!(result.total, 2);
        assert!(result.elements.is_empty());
        assert_eq!(eval(&doc, "//a[text()='y']").unwrap().total, 1);
    }

    #[test]
    fn test_comparisons() {
        let doc = XmlDocument::parse("<r><p>5</p><p>12</p></r>").unwrap();
        assert_eq!(eval(&doc, "//p[. > 10]").unwrap().total, 1);
        assert_eq!(eval(&doc, "//p[. = 5]").unwrap().total, 1);
        assert_eq!(eval(&doc, "/r[p = '12']").unwrap().total, 1);
        assert_eq!(eval(&doc, "/r[p != '12']").unwrap().total, 1);
        assert_eq!(eval(&doc, "//p[number(.) + 1 = 6]").unwrap().total, 1);
    }

    #[test]
    fn test_namespace_name_tests() {
        let doc = XmlDocument::parse(r#"<r xmlns="urn:d" xmlns:x="urn:x"><x:i/><i/><x:j/></r>"#).unwrap();
        assert_eq!(names(&doc, "//i"), vec!["i"]);
        assert_eq!(names(&doc, "//x:i"), vec!["x:i"]);
        assert_eq!(names(&doc, "//x:*"), vec!["x:i", "x:j"]);
        assert_eq!(
            eval(&doc, "//y:i"),
            Err(EvaluationError::UnboundPrefix("y".to_string()))
        );
    }

    #[test]
    fn test_error_kinds() {
        let doc = XmlDocument::parse("<root><a/><b/><c/></root>").unwrap();
        assert_eq!(eval(&doc, "   "), Err(EvaluationError::Empty));
        assert!(matches!(eval(&doc, "//a["), Err(EvaluationError::Syntax(_))));
        assert_eq!(eval(&doc, "count(/root/*)"), Err(EvaluationError::NotNodeSet("number")));
        assert_eq!(eval(&doc, "'x'"), Err(EvaluationError::NotNodeSet("string")));
        assert!(matches!(eval(&doc, "//a[nope()]"), Err(EvaluationError::Evaluation(_))));
    }
}
