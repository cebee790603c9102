//! Schema Inferencer
//!
//! Profiles each distinct element name of the source document and renders
//! the profiles as an XSD:
//! - [`infer`]: scalar type of a single value
//! - [`analysis`]: attribute, content and child-occurrence profiles
//! - [`xsd`]: schema text

pub mod analysis;
pub mod infer;
pub mod xsd;

pub use analysis::{analyze, AttributeProfile, ChildOccurs, ElementProfile, SchemaAnalysis};
pub use infer::{infer_type, ScalarType};
pub use xsd::{generate_xsd, generate_xsd_at, XsdOptions};
