use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::cookies::DEFAULT_BUCKET_TTL;
use crate::errors::Result;
use crate::storage::{HashStoreHandle, InMemoryHashStore};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7070";
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Which [`HashStore`](crate::storage::HashStore) backs the cookie manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Process-local; buckets are lost on restart.
    InMemory,
    /// SQLite database file shared by every process that opens it.
    #[cfg(feature = "sqlite_store")]
    Sqlite(PathBuf),
}

impl BackendConfig {
    /// Parses `memory` or `sqlite:<path>`.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.split_once(':') {
            None if s == "memory" => Ok(BackendConfig::InMemory),
            #[cfg(feature = "sqlite_store")]
            Some(("sqlite", path)) if !path.is_empty() => Ok(BackendConfig::Sqlite(PathBuf::from(path))),
            _ => Err(anyhow!("unknown backend {s:?}, expected \"memory\" or \"sqlite:<path>\"")),
        }
    }

    /// Opens the configured backend.
    pub fn build(&self) -> Result<HashStoreHandle> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemoryHashStore::new())),
            #[cfg(feature = "sqlite_store")]
            BackendConfig::Sqlite(path) => Ok(Arc::new(crate::storage::SqliteHashStore::new(path)?)),
        }
    }
}

/// Session service configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address the RPC server listens on
    pub listen_addr: SocketAddr,
    /// Storage backend for cookie buckets
    pub backend: BackendConfig,
    /// Lifetime of a bucket after its last write
    pub bucket_ttl: Duration,
    /// Per-call timeout used by clients
    pub rpc_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 7070)),
            backend: BackendConfig::InMemory,
            bucket_ttl: DEFAULT_BUCKET_TTL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Reads the configuration from `SESSION_*` environment variables, falling
    /// back to the defaults for unset ones.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("SESSION_LISTEN_ADDR") {
            config.listen_addr = addr
                .parse()
                .with_context(|| format!("SESSION_LISTEN_ADDR={addr:?} (e.g. {DEFAULT_LISTEN_ADDR})"))?;
        }
        if let Some(backend) = lookup("SESSION_BACKEND") {
            config.backend = BackendConfig::parse(&backend)?;
        }
        if let Some(secs) = lookup("SESSION_BUCKET_TTL_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("SESSION_BUCKET_TTL_SECS={secs:?}"))?;
            config.bucket_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("SESSION_RPC_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("SESSION_RPC_TIMEOUT_SECS={secs:?}"))?;
            config.rpc_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
