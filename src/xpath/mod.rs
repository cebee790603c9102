//! XPath 1.0 Engine
//!
//! Evaluates against the source document:
//! - All 13 axes, with per-step predicates in proximity order
//! - The XPath 1.0 core function library
//! - Compiled expressions cached by text in an LRU
//!
//! On top of evaluation sit [`generate`], which builds an expression for a
//! selected node, and [`matches`], which maps results onto display lines.

pub mod lexer;
pub mod parser;
pub mod compiler;
pub mod eval;
pub mod axes;
pub mod functions;
pub mod value;
pub mod generate;
pub mod matches;

pub use compiler::{ExprCache, DEFAULT_CACHE_SIZE};
pub use eval::{evaluate, NodeSetResult};
pub use generate::{generate_xpath, quote_literal, XPathStrategy};
pub use matches::{focus, map_matches, MatchMapping, MatchState, NavigationTarget, MAX_MAPPED_MATCHES};
pub use value::XPathValue;
