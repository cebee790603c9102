//! Tree Renderer / Filter Engine
//!
//! Projects the normalized tree into a flat [`DisplayList`] and applies
//! visibility filters, search highlighting and collapse state to it.

pub mod display;
pub mod filter;
pub mod highlight;

pub use display::{DisplayLine, DisplayList};
pub use filter::{FilterState, FilterSummary, SearchMatcher, SearchScope};
pub use highlight::{mark, Highlight, HighlightField};
