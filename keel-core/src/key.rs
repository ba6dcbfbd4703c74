//! Key addresses for record references.
//!
//! A reference field carries either a bare identifier (`abc123`) or a
//! composite `table.identifier` address (`person.abc123`). Both forms parse
//! into a [`KeyAddress`] variant through a single normalizing parser;
//! malformed input normalizes to the empty address instead of failing, so
//! "no reference set" and "malformed reference" are only distinguishable by
//! callers that check the raw value themselves.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

static TABLE_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\w+)\.)?(\w+)$").expect("Invalid table.key regex"));

/// Address of a stored record.
///
/// Equality and hashing are by canonical text form: two addresses compare
/// equal exactly when [`KeyAddress::as_text`] agrees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyAddress {
    /// Bare identifier; the owning table is known from context.
    Key { id: String },
    /// Identifier bound to an explicit table, textual form `table.id`.
    TableKey { table: String, id: String },
    /// Normalized form of a missing or malformed address.
    Empty,
}

impl KeyAddress {
    /// Parse a raw value into whichever variant its shape names: a
    /// `table.id` composite, a bare identifier, or the empty address.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.is_empty()) else {
            return Self::Empty;
        };
        match TABLE_KEY_PATTERN.captures(raw) {
            Some(caps) => match (caps.get(1), caps.get(2)) {
                (Some(table), Some(id)) => Self::TableKey {
                    table: table.as_str().to_string(),
                    id: id.as_str().to_string(),
                },
                (None, Some(id)) => Self::Key {
                    id: id.as_str().to_string(),
                },
                _ => Self::Empty,
            },
            None => Self::Empty,
        }
    }

    /// Parse a raw value as a bare key. A leading `table.` prefix is
    /// tolerated for legacy composite strings, but only the identifier is
    /// kept: the table does not participate in equality or the text form.
    pub fn key(raw: Option<&str>) -> Self {
        match Self::parse(raw) {
            Self::TableKey { id, .. } | Self::Key { id } => Self::Key { id },
            Self::Empty => Self::Empty,
        }
    }

    /// Parse a raw value as a composite `table.id` address. Valid only when
    /// both parts are non-empty after parsing; anything else normalizes to
    /// the empty address.
    pub fn table_key(raw: Option<&str>) -> Self {
        match Self::parse(raw) {
            addr @ Self::TableKey { .. } => addr,
            _ => Self::Empty,
        }
    }

    /// Parse a list of raw values as bare keys, dropping entries that
    /// normalize to empty.
    pub fn keys<I, S>(values: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .map(|v| Self::key(Some(v.as_ref())))
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Parse a list of raw values as composite addresses, dropping entries
    /// that normalize to empty.
    pub fn table_keys<I, S>(values: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .map(|v| Self::table_key(Some(v.as_ref())))
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// The table part, present only on composite addresses.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::TableKey { table, .. } => Some(table),
            _ => None,
        }
    }

    /// The record identifier, absent on the empty address.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Key { id } | Self::TableKey { id, .. } => Some(id),
            Self::Empty => None,
        }
    }

    /// Whether this is the empty address.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Canonical text form: `id`, `table.id`, or `""`.
    pub fn as_text(&self) -> String {
        match self {
            Self::Key { id } => id.clone(),
            Self::TableKey { table, id } => format!("{}.{}", table, id),
            Self::Empty => String::new(),
        }
    }
}

impl fmt::Display for KeyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key { id } => write!(f, "{}", id),
            Self::TableKey { table, id } => write!(f, "{}.{}", table, id),
            Self::Empty => Ok(()),
        }
    }
}

impl Serialize for KeyAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_text())
    }
}

impl<'de> Deserialize<'de> for KeyAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::parse(raw.as_deref()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
