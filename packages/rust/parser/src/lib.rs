//! Text-to-structure parsing of `kubectl explain` documents.
//!
//! This crate provides:
//! - [`document`] — splits a schema document into description and field-block
//! - [`fields`] — decomposes a field-block into sibling fields and their nested blocks
//!
//! Everything here is pure and synchronous; querying and enrichment live in
//! `kexplain-core`.

pub mod document;
pub mod fields;

pub use document::{SplitDocument, extract_field_description, split_document};
pub use fields::{RawField, decompose, validate_tree};

/// Lines of `text` with blank and whitespace-only lines dropped; they carry
/// no structure.
pub fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.trim().is_empty())
}
