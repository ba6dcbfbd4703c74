//! Context population.
//!
//! Orchestrates the bulk fetches that fill a [`ScopeCache`]: computes the
//! root type's dependency closure, decides which types still need a fetch,
//! and fans the fetches out concurrently. The fan-out is a structured join:
//! the caller resumes only when every fetch has completed, and the first
//! failure cancels the fetches still in flight and fails the whole call.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::try_join_all;

use keel_core::{record_key, ContextError, EntityDescriptor, KeelResult, Query, Record};
use keel_store::Store;

use crate::deps::DependencyResolver;
use crate::scope::ScopeCache;

/// Caller-supplied fetch queries, keyed by entity slug.
pub type QueryOverrides = HashMap<String, Query>;

/// Populates scope caches for a root entity type and its dependencies.
pub struct ContextPopulator {
    resolver: Arc<DependencyResolver>,
    store: Store,
}

impl ContextPopulator {
    /// Create a populator over a resolver and a store.
    pub fn new(resolver: Arc<DependencyResolver>, store: Store) -> Self {
        Self { resolver, store }
    }

    /// The dependency resolver in use.
    pub fn resolver(&self) -> &Arc<DependencyResolver> {
        &self.resolver
    }

    /// Populate `scope` for `root` and every type in its dependency
    /// closure.
    ///
    /// Each type's fetch query is the caller override for that type if
    /// present, else the type's declared fetch query, else unfiltered.
    /// With `lazy` set, types whose slot already holds entries are trusted
    /// as-is and skipped; otherwise every type is refetched and its slot
    /// replaced wholesale.
    ///
    /// All required fetches run concurrently. Completion is all-or-nothing
    /// per call: on the first fetch failure the remaining fetches are
    /// cancelled and the error propagates, leaving slots of never-completed
    /// types untouched (a slot committed before the failure stays).
    pub async fn populate(
        &self,
        scope: &ScopeCache,
        root: &Arc<EntityDescriptor>,
        queries: Option<&QueryOverrides>,
        lazy: bool,
    ) -> KeelResult<()> {
        let mut targets: Vec<Arc<EntityDescriptor>> = vec![root.clone()];
        for dependency in self.resolver.closure(root).iter() {
            if !targets.iter().any(|t| t.slug() == dependency.slug()) {
                targets.push(dependency.clone());
            }
        }

        let pending: Vec<Arc<EntityDescriptor>> = targets
            .into_iter()
            .filter(|entity| !(lazy && scope.has_entries(entity)))
            .collect();
        tracing::debug!(
            root = root.slug(),
            fetches = pending.len(),
            lazy = lazy,
            "populating scope"
        );

        let fetches = pending.into_iter().map(|entity| {
            let query = queries
                .and_then(|overrides| overrides.get(entity.slug()))
                .or_else(|| entity.fetch_query())
                .cloned();
            async move { self.fetch_into_slot(scope, &entity, query.as_ref()).await }
        });
        try_join_all(fetches).await?;
        Ok(())
    }

    /// Populate `scope` for every member of a registry group, dependencies
    /// included, and collect the members' cached records. Unknown group
    /// names have no members and yield an empty collection.
    pub async fn populate_group(
        &self,
        scope: &ScopeCache,
        group: &str,
        lazy: bool,
    ) -> KeelResult<Vec<Record>> {
        let members = self.resolver.registry().group(group);
        let fetches = members
            .iter()
            .map(|entity| self.populate(scope, entity, None, lazy));
        try_join_all(fetches).await?;

        let mut records = Vec::new();
        for entity in &members {
            records.extend(scope.records(entity)?);
        }
        Ok(records)
    }

    /// Populate `scope` for a single type, without its dependencies.
    pub async fn populate_one(
        &self,
        scope: &ScopeCache,
        entity: &Arc<EntityDescriptor>,
        query: Option<&Query>,
        lazy: bool,
    ) -> KeelResult<()> {
        if lazy && scope.has_entries(entity) {
            return Ok(());
        }
        let query = query.or_else(|| entity.fetch_query()).cloned();
        self.fetch_into_slot(scope, entity, query.as_ref()).await
    }

    /// Fetch every record of `entity` and commit the slot. The commit is
    /// the task's only write, so concurrent fetches of distinct types never
    /// interleave within one slot.
    async fn fetch_into_slot(
        &self,
        scope: &ScopeCache,
        entity: &EntityDescriptor,
        query: Option<&Query>,
    ) -> KeelResult<()> {
        let records = self
            .store
            .fetch_all(entity.table(), query)
            .await
            .map_err(|source| ContextError::FetchFailure {
                entity: entity.slug().to_string(),
                source,
            })?;
        scope.commit(entity.slug(), index_by_key(entity, records));
        Ok(())
    }
}

/// Index records by their `key` attribute. Records without a usable key
/// cannot be addressed and are dropped.
fn index_by_key(entity: &EntityDescriptor, records: Vec<Record>) -> HashMap<String, Record> {
    let mut indexed = HashMap::with_capacity(records.len());
    for record in records {
        match record_key(&record) {
            Some(key) => {
                indexed.insert(key.to_string(), record);
            }
            None => tracing::debug!(
                entity = entity.slug(),
                "dropping fetched record without a usable key"
            ),
        }
    }
    indexed
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{FieldMetadata, ReferenceField, ReferenceKind, Registry};
    use keel_store::{MemoryStore, StoreConfig};
    use serde_json::json;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), json!(value)))
            .collect()
    }

    fn harness() -> (Arc<Registry>, Arc<MemoryStore>, ContextPopulator) {
        let registry = Arc::new(Registry::new());
        let adapter = Arc::new(MemoryStore::new());
        let store = Store::with_config(adapter.clone(), StoreConfig::default());
        let resolver = Arc::new(DependencyResolver::new(registry.clone()));
        let populator = ContextPopulator::new(resolver, store);
        (registry, adapter, populator)
    }

    fn register_person_patient(registry: &Registry) {
        registry.register(EntityDescriptor::new("Person")).unwrap();
        registry
            .register(EntityDescriptor::new("Patient").with_reference_field(
                ReferenceField::new("person_key", ReferenceKind::Key)
                    .with_metadata(FieldMetadata::new().with_table("person")),
            ))
            .unwrap();
    }

    #[tokio::test]
    async fn test_populate_fills_root_and_closure() {
        let (registry, adapter, populator) = harness();
        register_person_patient(&registry);
        adapter.seed("person", vec![record(&[("key", "abc"), ("fname", "Ana")])]);
        adapter.seed("patient", vec![record(&[("key", "p1"), ("person_key", "abc")])]);

        let patient = registry.lookup("Patient").unwrap();
        let person = registry.lookup("Person").unwrap();
        let scope = ScopeCache::new();
        populator.populate(&scope, &patient, None, false).await.unwrap();

        assert!(scope.lookup(&patient, "p1").unwrap().is_some());
        let hit = scope.lookup(&person, "abc").unwrap().unwrap();
        assert_eq!(hit.get("fname"), Some(&json!("Ana")));
        assert_eq!(scope.lookup(&person, "zzz").unwrap(), None);
    }

    #[tokio::test]
    async fn test_lazy_populate_skips_populated_slots() {
        let (registry, adapter, populator) = harness();
        register_person_patient(&registry);
        adapter.seed("person", vec![record(&[("key", "abc")])]);
        adapter.seed("patient", vec![record(&[("key", "p1")])]);

        let patient = registry.lookup("Patient").unwrap();
        let scope = ScopeCache::new();
        populator.populate(&scope, &patient, None, true).await.unwrap();
        populator.populate(&scope, &patient, None, true).await.unwrap();

        assert_eq!(adapter.fetch_calls("person"), 1);
        assert_eq!(adapter.fetch_calls("patient"), 1);
    }

    #[tokio::test]
    async fn test_eager_populate_refetches_and_replaces() {
        let (registry, adapter, populator) = harness();
        register_person_patient(&registry);
        adapter.seed("person", vec![record(&[("key", "abc")])]);

        let patient = registry.lookup("Patient").unwrap();
        let person = registry.lookup("Person").unwrap();
        let scope = ScopeCache::new();
        populator.populate(&scope, &patient, None, false).await.unwrap();

        // the store changes between populations
        adapter.seed("person", vec![record(&[("key", "def")])]);
        populator.populate(&scope, &patient, None, false).await.unwrap();

        assert_eq!(adapter.fetch_calls("person"), 2);
        assert_eq!(adapter.fetch_calls("patient"), 2);
        assert_eq!(scope.len(&person).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_fails_call_and_leaves_slot_uninitialized() {
        let (registry, adapter, populator) = harness();
        register_person_patient(&registry);
        adapter.seed("patient", vec![record(&[("key", "p1")])]);
        adapter.fail_table("person");

        let patient = registry.lookup("Patient").unwrap();
        let person = registry.lookup("Person").unwrap();
        let scope = ScopeCache::new();
        let err = populator
            .populate(&scope, &patient, None, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            keel_core::KeelError::Context(ContextError::FetchFailure { .. })
        ));

        // the failed type's slot is never stale data: it is uninitialized
        assert!(!scope.is_initialized(&person));
    }

    #[tokio::test]
    async fn test_query_override_beats_declared_fetch_query() {
        let (registry, adapter, populator) = harness();
        registry
            .register(
                EntityDescriptor::new("Person").with_fetch_query(Query::eq("active", true)),
            )
            .unwrap();
        let mut active = record(&[("key", "a")]);
        active.insert("active".to_string(), json!(true));
        let mut inactive = record(&[("key", "b")]);
        inactive.insert("active".to_string(), json!(false));
        adapter.seed("person", vec![active, inactive]);

        let person = registry.lookup("Person").unwrap();

        // declared fetch query filters to active records
        let scope = ScopeCache::new();
        populator.populate(&scope, &person, None, false).await.unwrap();
        assert_eq!(scope.len(&person).unwrap(), 1);

        // caller override widens the fetch
        let overrides: QueryOverrides =
            [("person".to_string(), Query::Single(serde_json::Map::new()))].into();
        populator
            .populate(&scope, &person, Some(&overrides), false)
            .await
            .unwrap();
        assert_eq!(scope.len(&person).unwrap(), 2);
    }

    #[test]
    fn test_records_without_keys_are_dropped_at_indexing() {
        let person = EntityDescriptor::new("Person");
        let keyed = record(&[("key", "a"), ("fname", "Ana")]);
        let keyless = record(&[("fname", "Bia")]);
        let blank_key = record(&[("key", ""), ("fname", "Caio")]);
        let indexed = index_by_key(&person, vec![keyed, keyless, blank_key]);
        assert_eq!(indexed.len(), 1);
        assert!(indexed.contains_key("a"));
    }

    #[tokio::test]
    async fn test_populate_group_collects_member_records() {
        let (registry, adapter, populator) = harness();
        registry
            .register(EntityDescriptor::new("Person").with_group("people"))
            .unwrap();
        registry
            .register(
                EntityDescriptor::new("Doctor")
                    .with_group("people")
                    .with_reference_field(
                        ReferenceField::new("person_key", ReferenceKind::Key)
                            .with_metadata(FieldMetadata::new().with_table("person")),
                    ),
            )
            .unwrap();
        adapter.seed(
            "person",
            vec![record(&[("key", "a")]), record(&[("key", "b")]),],
        );
        adapter.seed("doctor", vec![record(&[("key", "d1"), ("person_key", "a")])]);

        let scope = ScopeCache::new();
        let records = populator
            .populate_group(&scope, "people", false)
            .await
            .unwrap();
        assert_eq!(records.len(), 3);

        let empty = populator
            .populate_group(&scope, "nobody", false)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_populate_one_respects_lazy() {
        let (registry, adapter, populator) = harness();
        registry.register(EntityDescriptor::new("Person")).unwrap();
        adapter.seed("person", vec![record(&[("key", "a")])]);
        let person = registry.lookup("Person").unwrap();

        let scope = ScopeCache::new();
        populator.populate_one(&scope, &person, None, true).await.unwrap();
        populator.populate_one(&scope, &person, None, true).await.unwrap();
        assert_eq!(adapter.fetch_calls("person"), 1);

        populator.populate_one(&scope, &person, None, false).await.unwrap();
        assert_eq!(adapter.fetch_calls("person"), 2);
    }
}
