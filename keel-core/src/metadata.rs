//! Declarative metadata for reference fields.
//!
//! A reference field may carry more than one metadata fragment (composition
//! over shared field definitions). Fragments are merged in declaration
//! order: for each attribute, the last fragment with a non-empty value wins.

use serde::{Deserialize, Serialize};

/// Metadata attached to a reference field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Entity tables this field may resolve against.
    pub tables: Vec<String>,
    /// Logical name of the resolved relation. Defaults to the field name
    /// with a trailing `_key` suffix stripped, see [`FieldMetadata::relation_name_for`].
    pub relation_name: Option<String>,
}

impl FieldMetadata {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the referenced tables.
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single referenced table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.tables.push(table.into());
        self
    }

    /// Set the relation name.
    pub fn with_relation_name(mut self, name: impl Into<String>) -> Self {
        self.relation_name = Some(name.into());
        self
    }

    /// Whether the fragment sets no attribute at all.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.relation_name.is_none()
    }

    /// Merge fragments in declaration order. Each non-empty attribute of a
    /// later fragment overwrites the value accumulated so far; empty
    /// attributes leave earlier values in place. Deterministic and
    /// order-preserving.
    pub fn merge<'a, I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = &'a FieldMetadata>,
    {
        let mut merged = Self::default();
        for fragment in fragments {
            if !fragment.tables.is_empty() {
                merged.tables = fragment.tables.clone();
            }
            if fragment.relation_name.is_some() {
                merged.relation_name = fragment.relation_name.clone();
            }
        }
        merged
    }

    /// The relation name for a field carrying this (merged) metadata: the
    /// explicit name if set, else `field_name` with one trailing `_key`
    /// suffix stripped.
    pub fn relation_name_for(&self, field_name: &str) -> String {
        match &self.relation_name {
            Some(name) => name.clone(),
            None => field_name
                .strip_suffix("_key")
                .unwrap_or(field_name)
                .to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
