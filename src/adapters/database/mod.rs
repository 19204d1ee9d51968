//! Storage abstraction layer
//!
//! Repositories are trait objects so the engine can run against any backend
//! (in-memory, PostgreSQL). [`Storage`] bundles the three repositories one
//! backend provides.

pub mod deadline;
pub mod factory;
pub mod traits;

pub use deadline::{bounded, spawn_bounded, with_read_retries};
pub use factory::create_storage;
pub use traits::{AuditRepository, RecordRepository, UserRepository};

use std::sync::Arc;

/// The repositories of one storage backend
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub records: Arc<dyn RecordRepository>,
    pub audit: Arc<dyn AuditRepository>,
    backend: &'static str,
}

impl Storage {
    /// Bundles a backend that implements all three repositories
    pub fn from_backend<B>(backend: Arc<B>, name: &'static str) -> Self
    where
        B: UserRepository + RecordRepository + AuditRepository + 'static,
    {
        Self {
            users: Arc::clone(&backend) as Arc<dyn UserRepository>,
            records: Arc::clone(&backend) as Arc<dyn RecordRepository>,
            audit: backend as Arc<dyn AuditRepository>,
            backend: name,
        }
    }

    /// Fresh in-memory storage, also returning the backend for outage control
    pub fn memory() -> (Self, Arc<crate::adapters::memory::MemoryStorage>) {
        let backend = Arc::new(crate::adapters::memory::MemoryStorage::new());
        (Self::from_backend(Arc::clone(&backend), "memory"), backend)
    }

    /// Name of the backend, for logs
    pub fn backend_name(&self) -> &'static str {
        self.backend
    }
}
