//! Dependency graph resolution.
//!
//! Discovers, from reference-field metadata, which entity types a given
//! type depends on, and expands that into the transitive closure used to
//! decide what a scope must be populated with. Both computations are
//! memoized for the process lifetime: registration is assumed complete
//! before the first resolution, and re-registering a type afterwards is
//! undefined behavior.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use keel_core::{EntityDescriptor, Registry};

type DependencySet = Arc<Vec<Arc<EntityDescriptor>>>;

/// Resolves direct dependencies and transitive closures over a registry.
pub struct DependencyResolver {
    registry: Arc<Registry>,
    direct: RwLock<HashMap<String, DependencySet>>,
    closures: RwLock<HashMap<String, DependencySet>>,
}

impl DependencyResolver {
    /// Create a resolver over a registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            direct: RwLock::new(HashMap::new()),
            closures: RwLock::new(HashMap::new()),
        }
    }

    /// The registry this resolver reads.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The entity types directly referenced by `entity`'s reference fields,
    /// first-seen order, de-duplicated. Table names that resolve to no
    /// registered entity are skipped, not errors.
    pub fn direct_dependencies(&self, entity: &EntityDescriptor) -> DependencySet {
        if let Some(hit) = self.direct.read().unwrap().get(entity.slug()) {
            return hit.clone();
        }

        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for field in entity.reference_fields() {
            for table in &field.metadata().tables {
                match self.registry.lookup(table) {
                    Some(dependency) => {
                        if seen.insert(dependency.slug().to_string()) {
                            result.push(dependency);
                        }
                    }
                    None => tracing::debug!(
                        entity = entity.slug(),
                        field = %field.name,
                        table = %table,
                        "reference field names an unregistered entity, skipping"
                    ),
                }
            }
        }

        let result: DependencySet = Arc::new(result);
        self.direct
            .write()
            .unwrap()
            .entry(entity.slug().to_string())
            .or_insert_with(|| result.clone())
            .clone()
    }

    /// The transitive closure of `entity`'s dependencies: a depth-first
    /// expansion seeded with its direct dependencies plus any declared
    /// extra dependencies. Each type is visited exactly once and never
    /// re-expanded, so the traversal terminates on any finite registry
    /// regardless of reference cycles.
    pub fn closure(&self, entity: &EntityDescriptor) -> DependencySet {
        if let Some(hit) = self.closures.read().unwrap().get(entity.slug()) {
            return hit.clone();
        }

        let mut visited = HashSet::new();
        let mut result = Vec::new();
        for seed in self.direct_dependencies(entity).iter() {
            self.visit(seed.clone(), &mut visited, &mut result);
        }
        for name in entity.extra_dependencies() {
            match self.registry.lookup(name) {
                Some(extra) => self.visit(extra, &mut visited, &mut result),
                None => tracing::debug!(
                    entity = entity.slug(),
                    name = %name,
                    "extra dependency names an unregistered entity, skipping"
                ),
            }
        }

        let result: DependencySet = Arc::new(result);
        self.closures
            .write()
            .unwrap()
            .entry(entity.slug().to_string())
            .or_insert_with(|| result.clone())
            .clone()
    }

    fn visit(
        &self,
        entity: Arc<EntityDescriptor>,
        visited: &mut HashSet<String>,
        result: &mut Vec<Arc<EntityDescriptor>>,
    ) {
        if !visited.insert(entity.slug().to_string()) {
            return;
        }
        let dependencies = self.direct_dependencies(&entity);
        result.push(entity);
        for dependency in dependencies.iter() {
            self.visit(dependency.clone(), visited, result);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
