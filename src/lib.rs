//! xmlscope - XML inspection engine
//!
//! Layers:
//! - Strict reader: namespace-aware pull parser (`core`, `reader`)
//! - Source document: arena DOM the XPath engine and schema inference run on (`dom`)
//! - Normalized tree: display records, statistics, namespace colours (`tree`)
//! - View: display lines, filters, search highlights (`view`)
//! - Schema: element profiles and XSD output (`schema`)
//! - XPath: evaluation, expression generation, match mapping (`xpath`)
//!
//! [`Session`] ties them together for one loaded document.

pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod schema;
pub mod session;
pub mod tree;
pub mod view;
pub mod xpath;

pub use dom::XmlDocument;
pub use error::{Error, EvaluationError, ParseError, Result};
pub use schema::{SchemaAnalysis, XsdOptions};
pub use session::{EvaluateOptions, Session, SessionConfig, XPathReport};
pub use tree::{NamespaceRegistry, ParseStatistics, TreeNode};
pub use view::{DisplayList, FilterState, FilterSummary, SearchScope};
pub use xpath::{MatchMapping, NavigationTarget, XPathStrategy};
