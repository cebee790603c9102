//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: lexical tokens with local well-formedness checks
//! - Entities: XML entity decoding with Cow (zero-copy when possible)
//! - Attributes: strict attribute parsing
//! - DTD: internal general entity declarations

pub mod attributes;
pub mod dtd;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
