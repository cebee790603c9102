//! Normalized Tree
//!
//! The display-oriented projection of a parsed document:
//! - [`TreeNode`]: one record per element, with direct text and copied attributes
//! - [`ParseStatistics`]: counters gathered while building
//! - [`NamespaceRegistry`]: first-seen colour and prefix per namespace URI
//! - [`TreeIndex`]: pre-order references and parent links for line lookups
//! - [`export`]: the JSON record format

pub mod builder;
pub mod export;
pub mod index;
pub mod node;
pub mod registry;
pub mod stats;

pub use builder::{build_tree, BuiltTree};
pub use index::TreeIndex;
pub use node::TreeNode;
pub use registry::{ColorToken, NamespaceEntry, NamespaceRegistry};
pub use stats::ParseStatistics;
