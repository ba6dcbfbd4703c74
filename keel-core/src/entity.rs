//! Entity type descriptors.
//!
//! An [`EntityDescriptor`] is the declarative surface of one entity type:
//! canonical name, table, reference fields with their metadata, and the
//! exist/fetch query specifications. Descriptors are built once at program
//! start, validated on registration, and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::{FieldMetadata, KeyAddress, Query, RegistryError};

/// Convert a class-style name to its canonical slug:
/// `PatientRecord` -> `patient_record`, `HTTPServer` -> `http_server`.
pub fn name_to_slug(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut slug = String::with_capacity(name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let after_lower = chars[i - 1].is_lowercase();
            let acronym_end = chars[i - 1].is_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if after_lower || acronym_end {
                slug.push('_');
            }
        }
        slug.extend(c.to_lowercase());
    }
    slug
}

/// Inverse of [`name_to_slug`]: `patient_record` -> `PatientRecord`.
pub fn slug_to_name(slug: &str) -> String {
    slug.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Shape of a reference field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Single bare identifier.
    Key,
    /// List of bare identifiers.
    KeyList,
    /// Single `table.id` composite address.
    TableKey,
    /// List of composite addresses.
    TableKeyList,
}

/// One declared reference field with its metadata fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceField {
    pub name: String,
    pub kind: ReferenceKind,
    pub fragments: Vec<FieldMetadata>,
}

impl ReferenceField {
    /// Declare a reference field.
    pub fn new(name: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fragments: Vec::new(),
        }
    }

    /// Attach a metadata fragment. Fragments merge in attachment order.
    pub fn with_metadata(mut self, fragment: FieldMetadata) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// The merged metadata of all attached fragments.
    pub fn metadata(&self) -> FieldMetadata {
        FieldMetadata::merge(&self.fragments)
    }

    /// The logical name of the resolved relation.
    pub fn relation_name(&self) -> String {
        self.metadata().relation_name_for(&self.name)
    }
}

/// Uniqueness specification used to detect duplicates before insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExistSpec {
    /// One space-separated field list, checked as a single flat query.
    Fields(String),
    /// Several field lists, checked as disjunctive candidates.
    AnyOf(Vec<String>),
}

/// Declarative descriptor of one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    name: String,
    slug: String,
    table: Option<String>,
    singular: Option<String>,
    plural: Option<String>,
    reference_fields: Vec<ReferenceField>,
    exist_query: Option<ExistSpec>,
    fetch_query: Option<Query>,
    extra_dependencies: Vec<String>,
    groups: Vec<String>,
}

impl EntityDescriptor {
    /// Start a descriptor for a class-style name, e.g. `"Patient"`. The
    /// canonical slug is derived immediately and never changes.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = name_to_slug(&name);
        Self {
            name,
            slug,
            table: None,
            singular: None,
            plural: None,
            reference_fields: Vec::new(),
            exist_query: None,
            fetch_query: None,
            extra_dependencies: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Override the store table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Override the singular display name.
    pub fn with_singular(mut self, singular: impl Into<String>) -> Self {
        self.singular = Some(singular.into());
        self
    }

    /// Override the plural display name.
    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    /// Declare a reference field. Declaration order is preserved and drives
    /// dependency discovery order.
    pub fn with_reference_field(mut self, field: ReferenceField) -> Self {
        self.reference_fields.push(field);
        self
    }

    /// Uniqueness check over one space-separated field list.
    pub fn with_exist_fields(mut self, fields: impl Into<String>) -> Self {
        self.exist_query = Some(ExistSpec::Fields(fields.into()));
        self
    }

    /// Uniqueness check over alternative field lists.
    pub fn with_exist_any<I, S>(mut self, lists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exist_query = Some(ExistSpec::AnyOf(lists.into_iter().map(Into::into).collect()));
        self
    }

    /// Default filter applied whenever records are bulk-fetched.
    pub fn with_fetch_query(mut self, query: Query) -> Self {
        self.fetch_query = Some(query);
        self
    }

    /// Force a type into this type's dependency closure even without a
    /// direct field reference.
    pub fn with_extra_dependency(mut self, name: impl Into<String>) -> Self {
        self.extra_dependencies.push(name.into());
        self
    }

    /// Add the type to a logical group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Class-style name, e.g. `Patient`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical slug, e.g. `patient`.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Store table name; defaults to the canonical slug.
    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.slug)
    }

    /// Singular display name; defaults to the class-style name.
    pub fn singular(&self) -> &str {
        self.singular.as_deref().unwrap_or(&self.name)
    }

    /// Plural display name; defaults to the singular with an `s` appended.
    pub fn plural(&self) -> String {
        match &self.plural {
            Some(plural) => plural.clone(),
            None => format!("{}s", self.singular()),
        }
    }

    /// The field name other entities use to reference this type.
    pub fn key_field_name(&self) -> String {
        format!("{}_key", self.slug)
    }

    /// The table-qualified address of one of this type's records.
    pub fn address_for(&self, key: &str) -> KeyAddress {
        KeyAddress::table_key(Some(&format!("{}.{}", self.table(), key)))
    }

    /// Declared reference fields, in declaration order.
    pub fn reference_fields(&self) -> &[ReferenceField] {
        &self.reference_fields
    }

    /// Merged metadata for a named reference field, if declared.
    pub fn metadata_for(&self, field_name: &str) -> Option<FieldMetadata> {
        self.reference_fields
            .iter()
            .find(|f| f.name == field_name)
            .map(ReferenceField::metadata)
    }

    /// Uniqueness specification, if declared.
    pub fn exist_query(&self) -> Option<&ExistSpec> {
        self.exist_query.as_ref()
    }

    /// Default bulk-fetch filter, if declared.
    pub fn fetch_query(&self) -> Option<&Query> {
        self.fetch_query.as_ref()
    }

    /// Extra dependency names, in declaration order.
    pub fn extra_dependencies(&self) -> &[String] {
        &self.extra_dependencies
    }

    /// Logical group labels.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Validate the descriptor for registration.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.is_empty() {
            return Err(RegistryError::InvalidDescriptor {
                name: self.name.clone(),
                reason: "name is empty".to_string(),
            });
        }
        if !self.name.chars().next().is_some_and(char::is_uppercase) {
            return Err(RegistryError::InvalidDescriptor {
                name: self.name.clone(),
                reason: "name must start with an uppercase letter".to_string(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.reference_fields {
            if field.name.is_empty() {
                return Err(RegistryError::InvalidDescriptor {
                    name: self.name.clone(),
                    reason: "reference field with empty name".to_string(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(RegistryError::InvalidDescriptor {
                    name: self.name.clone(),
                    reason: format!("duplicate reference field {}", field.name),
                });
            }
        }
        if let Some(ExistSpec::Fields(fields)) = &self.exist_query {
            if fields.split_whitespace().next().is_none() {
                return Err(RegistryError::InvalidDescriptor {
                    name: self.name.clone(),
                    reason: "exist query names no fields".to_string(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_to_slug() {
        assert_eq!(name_to_slug("Patient"), "patient");
        assert_eq!(name_to_slug("PatientRecord"), "patient_record");
        assert_eq!(name_to_slug("HTTPServer"), "http_server");
        assert_eq!(name_to_slug("A"), "a");
    }

    #[test]
    fn test_slug_to_name() {
        assert_eq!(slug_to_name("patient"), "Patient");
        assert_eq!(slug_to_name("patient_record"), "PatientRecord");
    }

    #[test]
    fn test_descriptor_defaults() {
        let entity = EntityDescriptor::new("PatientRecord");
        assert_eq!(entity.slug(), "patient_record");
        assert_eq!(entity.table(), "patient_record");
        assert_eq!(entity.singular(), "PatientRecord");
        assert_eq!(entity.plural(), "PatientRecords");
        assert_eq!(entity.key_field_name(), "patient_record_key");
    }

    #[test]
    fn test_descriptor_overrides() {
        let entity = EntityDescriptor::new("Person")
            .with_table("people")
            .with_singular("Pessoa")
            .with_plural("Pessoas");
        assert_eq!(entity.table(), "people");
        assert_eq!(entity.singular(), "Pessoa");
        assert_eq!(entity.plural(), "Pessoas");
    }

    #[test]
    fn test_metadata_for_merges_fragments() {
        let entity = EntityDescriptor::new("Patient").with_reference_field(
            ReferenceField::new("person_key", ReferenceKind::Key)
                .with_metadata(FieldMetadata::new().with_table("person"))
                .with_metadata(FieldMetadata::new().with_relation_name("subject")),
        );
        let meta = entity.metadata_for("person_key").unwrap();
        assert_eq!(meta.tables, vec!["person".to_string()]);
        assert_eq!(meta.relation_name.as_deref(), Some("subject"));
        assert!(entity.metadata_for("missing").is_none());
    }

    #[test]
    fn test_address_for_is_table_qualified() {
        let entity = EntityDescriptor::new("Person").with_table("people");
        let address = entity.address_for("abc");
        assert_eq!(address.as_text(), "people.abc");
    }

    #[test]
    fn test_relation_name_default() {
        let field = ReferenceField::new("person_key", ReferenceKind::Key)
            .with_metadata(FieldMetadata::new().with_table("person"));
        assert_eq!(field.relation_name(), "person");
    }

    #[test]
    fn test_validate_rejects_lowercase_name() {
        let err = EntityDescriptor::new("patient").validate().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_validate_rejects_duplicate_fields() {
        let entity = EntityDescriptor::new("Patient")
            .with_reference_field(ReferenceField::new("person_key", ReferenceKind::Key))
            .with_reference_field(ReferenceField::new("person_key", ReferenceKind::Key));
        assert!(entity.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_exist_fields() {
        let entity = EntityDescriptor::new("Patient").with_exist_fields("  ");
        assert!(entity.validate().is_err());
    }
}
