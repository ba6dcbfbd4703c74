//! Keel Context - Dependency-Aware Context Population
//!
//! The core of keel's read path: resolves an entity type's transitive
//! dependency closure, fans out concurrent bulk fetches of every type in
//! it, and fills a scope-local cache that entity construction resolves
//! reference fields against without per-field network calls. Also hosts
//! the pre-insert existence probe.

pub mod deps;
pub mod exist;
pub mod populate;
pub mod scope;

pub use deps::DependencyResolver;
pub use exist::ExistenceResolver;
pub use populate::{ContextPopulator, QueryOverrides};
pub use scope::ScopeCache;
