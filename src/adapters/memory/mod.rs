//! In-memory storage backend

pub mod storage;

pub use storage::MemoryStorage;
