//! Duplicate detection before insert.
//!
//! Builds a uniqueness query from an entity type's declared exist fields
//! and the candidate record's serialized values, then probes the store. A
//! probe that matches more than one stored record is fatal to the calling
//! operation: the candidate is not safely identifiable and must not be
//! silently merged with either match.

use serde_json::{Map, Value};

use keel_core::{record_key, ContextError, EntityDescriptor, ExistSpec, KeelResult, Query, Record};
use keel_store::{ExistOutcome, Store};

/// Resolves whether a candidate record already exists in the store.
pub struct ExistenceResolver {
    store: Store,
}

impl ExistenceResolver {
    /// Create a resolver over a store.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Build the uniqueness query for `record` from `entity`'s declared
    /// exist fields. Fields whose value is empty are omitted; a criteria
    /// set left with no field constrains nothing and is dropped. Returns
    /// `None` when no usable query remains, in which case the existence
    /// check is skipped.
    pub fn exist_query(entity: &EntityDescriptor, record: &Record) -> Option<Query> {
        match entity.exist_query()? {
            ExistSpec::Fields(fields) => {
                let criteria = criteria_from(fields, record);
                if criteria.is_empty() {
                    None
                } else {
                    Some(Query::Single(criteria))
                }
            }
            ExistSpec::AnyOf(lists) => {
                let alternatives: Vec<Map<String, Value>> = lists
                    .iter()
                    .map(|fields| criteria_from(fields, record))
                    .filter(|criteria| !criteria.is_empty())
                    .collect();
                if alternatives.is_empty() {
                    None
                } else {
                    Some(Query::Any(alternatives))
                }
            }
        }
    }

    /// Probe the store for records matching `record`'s uniqueness query.
    /// Returns the single match if one exists, `None` if no query applies
    /// or nothing matches, and fails on an ambiguous match.
    pub async fn check_exist(
        &self,
        entity: &EntityDescriptor,
        record: &Record,
    ) -> KeelResult<Option<Record>> {
        let Some(query) = Self::exist_query(entity, record) else {
            return Ok(None);
        };
        let outcome = self
            .store
            .exist(entity.table(), &query)
            .await
            .map_err(|source| ContextError::FetchFailure {
                entity: entity.slug().to_string(),
                source,
            })?;
        match outcome {
            ExistOutcome::None => Ok(None),
            ExistOutcome::One(found) => Ok(Some(found)),
            ExistOutcome::Many(matches) => {
                let keys = matches
                    .iter()
                    .filter_map(|m| record_key(m).map(str::to_string))
                    .collect();
                Err(ContextError::AmbiguousMatch {
                    entity: entity.slug().to_string(),
                    keys,
                }
                .into())
            }
        }
    }
}

fn criteria_from(fields: &str, record: &Record) -> Map<String, Value> {
    fields
        .split_whitespace()
        .filter_map(|field| {
            record
                .get(field)
                .filter(|value| !is_empty_value(value))
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================
