//! Persistence adapter and storage backends.
//!
//! The adapter (`MemoryAdapter`) is the engine's only path to storage and
//! swallows every backend failure. Backends implement the narrow
//! `MemoryStore` contract.

mod adapter;
mod store;

pub use adapter::MemoryAdapter;
pub use store::{FailingStore, InMemoryStore, JsonFileStore, MemoryStore, StoredRecord};
