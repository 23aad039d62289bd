//! Key/value backends for the cookie manager.
//!
//! The cookie manager only needs a small subset of what a shared cache such as
//! Redis offers: a hash value per key with field-level writes, and a TTL per key.
//! That subset is the [`HashStore`] trait.
//!
//! # Available backends
//!
//! - [`InMemoryHashStore`]: process-local, used by tests and single-process setups.
//!   Deadlines use `tokio::time`, so tests can pause and advance the clock.
//! - [`SqliteHashStore`]: a SQLite database file shared by every process that opens
//!   it. Requires the `sqlite_store` feature (enabled by default).
//!
//! # Consistency
//!
//! Each call is atomic on its own. A field write followed by an `expire` is two
//! separate operations; callers must not rely on them being applied together.
//!
//! ```no_run
//! use std::sync::Arc;
//! use crawl_session::storage::{HashStore, InMemoryHashStore};
//!
//! let store: Arc<dyn HashStore> = Arc::new(InMemoryHashStore::new());
//! ```

/// Hash store trait.
pub mod area;
/// In-memory hash store implementation.
pub mod in_memory;
/// SQLite-backed hash store implementation.
#[cfg(feature = "sqlite_store")]
pub mod sqlite_store;

pub use area::{HashStore, HashStoreHandle};
pub use in_memory::InMemoryHashStore;
#[cfg(feature = "sqlite_store")]
pub use sqlite_store::SqliteHashStore;
