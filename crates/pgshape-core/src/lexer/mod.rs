//! Query template scanner.
//!
//! Splits SQL text into segments, each ending at a word boundary, and
//! extracts the template symbols (`&Model`, `:Field`, `:Model.Field`, ...)
//! that the query template engine substitutes.

mod tokenizer;

pub use tokenizer::{Scanner, Segment, is_boundary, segments, symbols};
