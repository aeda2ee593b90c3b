// Adapters layer: concrete implementations of the storage port.

pub mod memory_store;
pub mod redb_store;

pub use memory_store::MemoryStore;
pub use redb_store::RedbStore;
