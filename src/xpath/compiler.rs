//! XPath Expression Compiler
//!
//! Compiles parsed XPath expressions into a flat stack-machine program,
//! and caches compiled programs by expression text.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};
use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Default capacity of the compiled-expression cache
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document node onto the stack
    Root,
    /// Push context node onto the stack
    Context,
    /// Navigate along an axis, filtering each context node's result by the step's predicates
    Step {
        axis: Axis,
        test: CompiledNodeTest,
        predicates: Vec<CompiledExpr>,
    },
    /// Apply a predicate to the whole node-set on the stack
    Predicate(Box<CompiledExpr>),
    /// Union two node sets
    Union,
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Call function
    Call(String, usize), // name, arg count
    /// Binary operation
    Binary(BinaryOp),
    /// Negate
    Negate,
    /// Variable reference
    Variable(String),
}

/// Compiled node test
#[derive(Debug, Clone)]
pub enum CompiledNodeTest {
    Any,
    Name(String),
    /// Prefix and local name; the prefix is resolved against the document at evaluation time
    QName(String, String),
    NamespaceWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledNodeTest {
    fn prefix(&self) -> Option<&str> {
        match self {
            CompiledNodeTest::QName(prefix, _) | CompiledNodeTest::NamespaceWildcard(prefix) => {
                Some(prefix)
            }
            _ => None,
        }
    }
}

impl CompiledExpr {
    /// Compile an XPath expression
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => ops.push(Op::Root),
            Expr::Context => ops.push(Op::Context),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops);
                ops.push(Self::compile_step(step));
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops);
                ops.push(Op::Predicate(Box::new(CompiledExpr::compile(pred))));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                ops.push(Self::compile_step(step));
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step) -> Op {
        let test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::QName(prefix, local) => CompiledNodeTest::QName(prefix.clone(), local.clone()),
            NodeTest::NamespaceWildcard(prefix) => CompiledNodeTest::NamespaceWildcard(prefix.clone()),
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(arg) => CompiledNodeTest::ProcessingInstruction(arg.clone()),
        };

        Op::Step {
            axis: step.axis,
            test,
            predicates: step.predicates.iter().map(CompiledExpr::compile).collect(),
        }
    }

    /// Every namespace prefix used by a name test, predicates included
    pub fn prefixes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut pending: Vec<&CompiledExpr> = vec![self];
        while let Some(expr) = pending.pop() {
            for op in &expr.ops {
                match op {
                    Op::Step { test, predicates, .. } => {
                        if let Some(prefix) = test.prefix() {
                            if !out.contains(&prefix) {
                                out.push(prefix);
                            }
                        }
                        pending.extend(predicates.iter());
                    }
                    Op::Predicate(pred) => pending.push(pred),
                    _ => {}
                }
            }
        }
        out
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, String> {
    let expr = super::parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr))
}

/// LRU cache of compiled expressions, keyed by expression text
#[derive(Debug)]
pub struct ExprCache {
    entries: LruCache<String, Rc<CompiledExpr>>,
}

impl ExprCache {
    /// A cache holding at most `capacity` programs (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ExprCache {
            entries: LruCache::new(capacity),
        }
    }

    /// Fetch a compiled program, compiling and caching it on a miss
    pub fn get_or_compile(&mut self, xpath: &str) -> Result<Rc<CompiledExpr>, String> {
        if let Some(compiled) = self.entries.get(xpath) {
            return Ok(Rc::clone(compiled));
        }
        debug!("xpath cache miss: {}", xpath);
        let compiled = Rc::new(compile(xpath)?);
        self.entries.put(xpath.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ExprCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple() {
        let compiled = compile("/root").unwrap();
        assert!(matches!(compiled.ops[0], Op::Root));
        assert!(matches!(compiled.ops[1], Op::Step { axis: Axis::Child, .. }));
    }

    #[test]
    fn test_step_predicates_stay_on_step() {
        let compiled = compile("//item[2]").unwrap();
        match compiled.ops.last() {
            Some(Op::Step { predicates, .. }) => assert_eq!(predicates.len(), 1),
            other => panic!("expected a step, got {:?}", other),
        }
        let filtered = compile("(//item)[2]").unwrap();
        assert!(matches!(filtered.ops.last(), Some(Op::Predicate(_))));
    }

    #[test]
    fn test_prefixes_include_predicates() {
        let compiled = compile("//a:item[b:child]/c:*").unwrap();
        let mut prefixes = compiled.prefixes();
        prefixes.sort_unstable();
        assert_eq!(prefixes, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cache_reuses_and_evicts() {
        let mut cache = ExprCache::new(2);
        let first = cache.get_or_compile("//a").unwrap();
        let again = cache.get_or_compile("//a").unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        cache.get_or_compile("//b").unwrap();
        cache.get_or_compile("//c").unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get_or_compile("//[").is_err());
        assert_eq!(cache.len(), 2);
    }
}
