//! Storage module for the API.
//!
//! Provides the datastore trait plus two backends: SQLite (sqlx,
//! selected when DATABASE_URL is set) and in-memory (fallback, also
//! used by the test suite). Attachment files live in the upload store,
//! outside the datastore proper.

pub mod error;
pub mod seed;
pub mod traits;
pub mod uploads;

// Storage backend implementations
pub mod memory;
pub mod sqlite;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{FormFilter, StatusCounts, StorageBackend};
pub use uploads::UploadStore;
