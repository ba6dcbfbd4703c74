//! Entity registry.
//!
//! An explicit registry object owned by the process composition root; every
//! resolver and populator is constructed over one. Registration happens at
//! program start and is expected to be complete before the first dependency
//! resolution. Lookups are read-many and safe for concurrent use.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{name_to_slug, EntityDescriptor, KeelResult};

#[derive(Default)]
struct RegistryEntries {
    by_slug: HashMap<String, Arc<EntityDescriptor>>,
    /// Slugs in first-registration order.
    order: Vec<String>,
}

/// Process-wide map from canonical slug to entity descriptor.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<RegistryEntries>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its canonical slug. Registering the same
    /// slug twice replaces the previous entry (last registration wins).
    pub fn register(&self, descriptor: EntityDescriptor) -> KeelResult<Arc<EntityDescriptor>> {
        descriptor.validate()?;
        let descriptor = Arc::new(descriptor);
        let mut entries = self.entries.write().unwrap();
        let slug = descriptor.slug().to_string();
        if entries.by_slug.insert(slug.clone(), descriptor.clone()).is_some() {
            tracing::debug!(slug = %slug, "replacing registered entity");
        } else {
            entries.order.push(slug);
        }
        Ok(descriptor)
    }

    /// Look up a descriptor by name. A class-style name (uppercase first
    /// character) is converted to its slug; any other name is taken as a
    /// slug with an optional trailing `_key` suffix stripped. Unknown names
    /// yield `None`, never an error.
    pub fn lookup(&self, name: &str) -> Option<Arc<EntityDescriptor>> {
        let slug = if name.chars().next().is_some_and(char::is_uppercase) {
            name_to_slug(name)
        } else {
            name.strip_suffix("_key").unwrap_or(name).to_string()
        };
        self.entries.read().unwrap().by_slug.get(&slug).cloned()
    }

    /// Look up a descriptor by the table its records live in. Falls back to
    /// a name lookup first, since tables default to canonical slugs.
    pub fn lookup_table(&self, table: &str) -> Option<Arc<EntityDescriptor>> {
        if let Some(descriptor) = self.lookup(table) {
            return Some(descriptor);
        }
        let entries = self.entries.read().unwrap();
        entries
            .order
            .iter()
            .filter_map(|slug| entries.by_slug.get(slug))
            .find(|descriptor| descriptor.table() == table)
            .cloned()
    }

    /// All registered descriptors, in first-registration order.
    pub fn descriptors(&self) -> Vec<Arc<EntityDescriptor>> {
        let entries = self.entries.read().unwrap();
        entries
            .order
            .iter()
            .filter_map(|slug| entries.by_slug.get(slug).cloned())
            .collect()
    }

    /// Group label -> member descriptors, insertion-ordered.
    pub fn groups(&self) -> Vec<(String, Vec<Arc<EntityDescriptor>>)> {
        let mut order: Vec<String> = Vec::new();
        let mut members: HashMap<String, Vec<Arc<EntityDescriptor>>> = HashMap::new();
        for descriptor in self.descriptors() {
            for group in descriptor.groups() {
                if !members.contains_key(group) {
                    order.push(group.clone());
                }
                members.entry(group.clone()).or_default().push(descriptor.clone());
            }
        }
        order
            .into_iter()
            .map(|group| {
                let descriptors = members.remove(&group).unwrap_or_default();
                (group, descriptors)
            })
            .collect()
    }

    /// Members of one group, in registration order.
    pub fn group(&self, name: &str) -> Vec<Arc<EntityDescriptor>> {
        self.descriptors()
            .into_iter()
            .filter(|descriptor| descriptor.groups().iter().any(|g| g == name))
            .collect()
    }

    /// Number of registered entity types.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().by_slug.len()
    }

    /// Whether no entity type is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_class_name_and_slug() {
        let registry = Registry::new();
        registry
            .register(EntityDescriptor::new("PatientRecord"))
            .unwrap();
        assert!(registry.lookup("PatientRecord").is_some());
        assert!(registry.lookup("patient_record").is_some());
        assert!(registry.lookup("patient_record_key").is_some());
        assert!(registry.lookup("Unknown").is_none());
        assert!(registry.lookup("unknown_key").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = Registry::new();
        registry.register(EntityDescriptor::new("Person")).unwrap();
        registry
            .register(EntityDescriptor::new("Person").with_table("people"))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("Person").unwrap().table(), "people");
    }

    #[test]
    fn test_register_rejects_invalid_descriptor() {
        let registry = Registry::new();
        assert!(registry.register(EntityDescriptor::new("person")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_table_falls_back_to_declared_table() {
        let registry = Registry::new();
        registry
            .register(EntityDescriptor::new("Person").with_table("people"))
            .unwrap();
        assert!(registry.lookup_table("people").is_some());
        assert!(registry.lookup_table("person").is_some());
        assert!(registry.lookup_table("nowhere").is_none());
    }

    #[test]
    fn test_descriptors_keep_first_registration_order() {
        let registry = Registry::new();
        registry.register(EntityDescriptor::new("Person")).unwrap();
        registry.register(EntityDescriptor::new("Patient")).unwrap();
        registry
            .register(EntityDescriptor::new("Person").with_table("people"))
            .unwrap();
        let slugs: Vec<_> = registry
            .descriptors()
            .iter()
            .map(|d| d.slug().to_string())
            .collect();
        assert_eq!(slugs, vec!["person".to_string(), "patient".to_string()]);
    }

    #[test]
    fn test_groups_index() {
        let registry = Registry::new();
        registry
            .register(EntityDescriptor::new("Person").with_group("people"))
            .unwrap();
        registry
            .register(EntityDescriptor::new("Patient").with_group("people").with_group("clinic"))
            .unwrap();
        let groups = registry.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "people");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(registry.group("clinic").len(), 1);
        assert!(registry.group("nothing").is_empty());
    }
}
