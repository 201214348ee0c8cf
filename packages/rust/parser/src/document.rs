//! Schema document splitter.
//!
//! A recursive `kubectl explain` document has exactly two sections:
//!
//! ```text
//! DESCRIPTION:
//!      <5-space padded prose lines>
//! FIELDS:
//!    <3-space padded field-block lines>
//! ```
//!
//! Anything else (missing section, empty section, trailing text) is a
//! [`StructuralError`].

use std::iter::Peekable;

use kexplain_shared::{StructuralError, snippet};

use crate::non_blank_lines;

/// Marker opening the description section.
pub const DESCRIPTION_LABEL: &str = "DESCRIPTION:";

/// Padding prefix of every description line.
pub const DESCRIPTION_PADDING: &str = "     ";

/// Marker opening the fields section.
pub const FIELDS_LABEL: &str = "FIELDS:";

/// Padding prefix of every line in the fields section.
pub const FIELDS_PADDING: &str = "   ";

/// Header lines preceding the description in a single-field document
/// (`FIELD:`/`RESOURCE:` and `DESCRIPTION:`).
const FIELD_HEADER_LINES: usize = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A schema document split into its two sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDocument {
    /// Description lines, padding stripped, joined with single spaces.
    pub description: String,
    /// Field-block lines, section padding stripped, joined with `\n`.
    pub field_block: String,
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Split a recursive schema document for `full_name` into description and field-block.
pub fn split_document(raw: &str, full_name: &str) -> Result<SplitDocument, StructuralError> {
    let mut lines = non_blank_lines(raw).peekable();

    // DESCRIPTION
    if !next_is_label(&mut lines, DESCRIPTION_LABEL) {
        return Err(StructuralError::MissingDescriptionSection {
            full_name: full_name.to_string(),
            snippet: snippet(raw),
        });
    }
    let description_lines = take_padded(&mut lines, DESCRIPTION_PADDING);
    if description_lines.is_empty() {
        return Err(StructuralError::MissingDescriptionSection {
            full_name: full_name.to_string(),
            snippet: snippet(lines.peek().copied().unwrap_or_default()),
        });
    }

    // FIELDS
    let at = lines.peek().copied().unwrap_or_default();
    if !next_is_label(&mut lines, FIELDS_LABEL) {
        return Err(StructuralError::MissingFieldsSection {
            full_name: full_name.to_string(),
            snippet: snippet(at),
        });
    }
    let field_lines = take_padded(&mut lines, FIELDS_PADDING);
    if field_lines.is_empty() {
        return Err(StructuralError::MissingFieldsSection {
            full_name: full_name.to_string(),
            snippet: snippet(lines.peek().copied().unwrap_or_default()),
        });
    }

    if let Some(rest) = lines.next() {
        return Err(StructuralError::TrailingUnparsedContent {
            full_name: full_name.to_string(),
            snippet: snippet(rest),
        });
    }

    Ok(SplitDocument {
        description: description_lines.join(" "),
        field_block: field_lines.join("\n"),
    })
}

/// Extract the description from a single-field (non-recursive) document.
///
/// Skips the fixed header lines and joins the padded lines that follow.
/// A document too short to carry a description yields an empty string.
pub fn extract_field_description(raw: &str) -> String {
    non_blank_lines(raw)
        .skip(FIELD_HEADER_LINES)
        .map_while(|line| line.strip_prefix(DESCRIPTION_PADDING))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Consume the next line if it is exactly `label`.
fn next_is_label<'a, I>(lines: &mut Peekable<I>, label: &str) -> bool
where
    I: Iterator<Item = &'a str>,
{
    lines
        .next_if(|line| line.trim_end() == label)
        .is_some()
}

/// Consume consecutive lines carrying `padding`, returning them stripped.
fn take_padded<'a, I>(lines: &mut Peekable<I>, padding: &str) -> Vec<&'a str>
where
    I: Iterator<Item = &'a str>,
{
    let mut taken = Vec::new();
    while let Some(stripped) = lines.peek().copied().and_then(|line| line.strip_prefix(padding)) {
        taken.push(stripped);
        lines.next();
    }
    taken
}
