//! Field-block decomposition.
//!
//! A field-block lists sibling fields one per line as `name<TAB><type>`.
//! Lines indented by one level belong to the nested block of the closest
//! preceding top-level field:
//!
//! ```text
//! status	<Object>
//!    conditions	<[]Object>
//!       type	<string>
//!    phase	<string>
//! kind	<string>
//! ```
//!
//! [`decompose`] only splits off one level; callers recurse into
//! [`RawField::nested_block`] to go deeper.

use std::collections::HashSet;

use kexplain_shared::{StructuralError, is_scalar_kind, snippet};

use crate::non_blank_lines;

/// One level of nesting inside a field-block.
pub const NEST_INDENT: &str = "   ";

/// A field parsed out of a field-block, not yet enriched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// Local field name.
    pub name: String,
    /// Type label with angle brackets stripped.
    pub kind: String,
    /// `parent + "." + name`.
    pub full_name: String,
    /// Lines nested under this field, one indent level stripped, joined with `\n`.
    pub nested_block: String,
}

impl RawField {
    /// True when the kind is a leaf scalar, so there is nothing to recurse into.
    pub fn is_scalar(&self) -> bool {
        is_scalar_kind(&self.kind)
    }

    /// Attach the lines nested under this field.
    ///
    /// A scalar field cannot own nested lines.
    fn attach_nested(&mut self, nested: &[&str]) -> Result<(), StructuralError> {
        if let Some(first) = nested.first().filter(|_| self.is_scalar()) {
            return Err(StructuralError::MalformedFieldLine {
                full_name: self.full_name.clone(),
                snippet: snippet(first),
            });
        }
        self.nested_block = nested.join("\n");
        Ok(())
    }
}

/// Split `block` into its top-level fields, in source order.
///
/// An empty block yields no fields. A scalar-kinded field with nested lines
/// is a [`StructuralError::MalformedFieldLine`] at that field.
pub fn decompose(block: &str, parent_full_name: &str) -> Result<Vec<RawField>, StructuralError> {
    let mut lines = non_blank_lines(block).peekable();

    if let Some(first) = lines.peek().filter(|line| line.starts_with(NEST_INDENT)) {
        return Err(StructuralError::UnexpectedLeadingIndent {
            full_name: parent_full_name.to_string(),
            snippet: snippet(first),
        });
    }

    let mut fields: Vec<RawField> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut nested: Vec<&str> = Vec::new();

    for line in lines {
        if let Some(stripped) = line.strip_prefix(NEST_INDENT) {
            nested.push(stripped);
            continue;
        }

        if let Some(previous) = fields.last_mut() {
            previous.attach_nested(&nested)?;
        }
        nested.clear();

        let (name, kind) = parse_field_line(line).ok_or_else(|| StructuralError::MalformedFieldLine {
            full_name: parent_full_name.to_string(),
            snippet: snippet(line),
        })?;

        if !seen.insert(name) {
            return Err(StructuralError::DuplicateFieldName {
                full_name: format!("{parent_full_name}.{name}"),
                snippet: snippet(line),
            });
        }

        fields.push(RawField {
            name: name.to_string(),
            kind: kind.to_string(),
            full_name: format!("{parent_full_name}.{name}"),
            nested_block: String::new(),
        });
    }

    if let Some(last) = fields.last_mut() {
        last.attach_nested(&nested)?;
    }

    Ok(fields)
}

/// Decompose `block` and every nested block below it, returning the total
/// number of fields.
///
/// Surfaces any structural error in the whole subtree without side effects.
pub fn validate_tree(block: &str, parent_full_name: &str) -> Result<usize, StructuralError> {
    let mut count = 0;
    for field in decompose(block, parent_full_name)? {
        count += 1 + validate_tree(&field.nested_block, &field.full_name)?;
    }
    Ok(count)
}

/// Split `name<TAB><type>` into `(name, kind)`.
fn parse_field_line(line: &str) -> Option<(&str, &str)> {
    let mut columns = line.split('\t');
    let name = columns.next()?;
    let kind = columns.next()?;
    if columns.next().is_some() || name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, kind.trim().trim_matches(|c| c == '<' || c == '>')))
}
