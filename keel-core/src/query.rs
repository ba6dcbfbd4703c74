//! Fetch queries.
//!
//! A query is either one flat set of equality criteria or a list of
//! alternative criteria sets (disjunctive candidates). The serialized form
//! is exactly what the store adapter consumes: a JSON object or a JSON
//! array of objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Record;

/// Equality criteria applied to bulk fetches and existence checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    /// One flat criteria set; every named field must match.
    Single(Map<String, Value>),
    /// Alternative criteria sets; a record matches if any set matches.
    Any(Vec<Map<String, Value>>),
}

impl Query {
    /// Single-field equality query.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut criteria = Map::new();
        criteria.insert(field.into(), value.into());
        Self::Single(criteria)
    }

    /// Flat equality query over several fields.
    pub fn fields<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        Self::Single(
            pairs
                .into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }

    /// Disjunctive query over alternative criteria sets.
    pub fn any(alternatives: Vec<Map<String, Value>>) -> Self {
        Self::Any(alternatives)
    }

    /// Whether the query constrains nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(criteria) => criteria.is_empty(),
            Self::Any(alternatives) => alternatives.iter().all(Map::is_empty),
        }
    }

    /// Evaluate the query against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Single(criteria) => Self::criteria_match(criteria, record),
            Self::Any(alternatives) => alternatives
                .iter()
                .any(|criteria| Self::criteria_match(criteria, record)),
        }
    }

    fn criteria_match(criteria: &Map<String, Value>, record: &Record) -> bool {
        criteria
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }
}

// =============================================================================
// TESTS
// =============================================================================
