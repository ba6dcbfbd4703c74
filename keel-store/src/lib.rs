//! Keel Store - Store Adapter and Wrapper
//!
//! Defines the adapter abstraction over the remote key-value document
//! store, the pagination-transparent [`Store`] front-end, and an in-memory
//! backend used by tests and as the reference adapter implementation.

pub mod adapter;
pub mod config;
pub mod memory;
pub mod store;

pub use adapter::{Page, PutOptions, PutOutcome, StoreAdapter, PUT_BATCH_LIMIT};
pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use store::{ExistOutcome, Store};
