//! Cookie manager: domain buckets on top of a [`HashStore`].
//!
//! All cookies of one *registrable domain* and one tracing id live in a single
//! hash (a **bucket**) keyed by
//!
//! ```text
//! cookies://domain/<reversed-two-label-domain>/trace/<tracing-id>
//! ```
//!
//! e.g. `shop.example.com` with tracing id `run-1` maps to
//! `cookies://domain/com.example/trace/run-1`. Subdomains therefore share a
//! bucket, so a cookie set on `www.example.com` is visible when crawling
//! `checkout.example.com`.
//!
//! Each field of the bucket is one JSON-encoded [`Cookie`] keyed by its
//! [`Cookie::id`]. The bucket has a single TTL which every [`CookieManager::save`]
//! resets to the full window; reads never touch it.
//!
//! The key format is shared with other implementations of the session service and
//! must not change.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::context::with_cancel;
use crate::cookies::unix_now;
use crate::cookies::Cookie;
use crate::errors::{Result, SessionError};
use crate::storage::HashStoreHandle;

/// Default bucket lifetime: seven days, refreshed on every save.
pub const DEFAULT_BUCKET_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const KEY_PREFIX: &str = "cookies://domain/";

/// Persists cookies per (registrable domain, tracing id) bucket.
///
/// The manager holds no state of its own; it is safe to share one instance
/// between any number of concurrent callers.
#[derive(Clone)]
pub struct CookieManager {
    store: HashStoreHandle,
    ttl: Duration,
}

impl CookieManager {
    /// Creates a manager using the default seven day bucket TTL.
    pub fn new(store: HashStoreHandle) -> Self {
        Self::with_ttl(store, DEFAULT_BUCKET_TTL)
    }

    pub fn with_ttl(store: HashStoreHandle, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &HashStoreHandle {
        &self.store
    }

    /// Bucket key for `host` and `tracing_id`.
    ///
    /// The host is split on `.` and the two rightmost labels are kept in reversed
    /// order (`shop.example.com` becomes `com.example`). Hosts with a single label
    /// keep just that label.
    pub fn bucket_key(host: &str, tracing_id: &str) -> String {
        let domain = host.split('.').rev().take(2).collect::<Vec<_>>().join(".");
        format!("{KEY_PREFIX}{domain}/trace/{tracing_id}")
    }

    /// Returns the live cookies of the bucket `url` falls into.
    ///
    /// Expired cookies and cookies whose path is not a prefix of the URL path are
    /// left out. A missing bucket yields an empty list. A stored value that no
    /// longer decodes is reported as [`SessionError::DataLoss`]; the bucket is
    /// left untouched and must be cleared explicitly.
    pub async fn list(
        &self,
        ctx: &CancellationToken,
        url: &Url,
        tracing_id: &str,
    ) -> Result<Vec<Cookie>> {
        self.list_for_path(ctx, url, url.path(), tracing_id).await
    }

    /// Like [`list`](Self::list), but filters on `path` instead of the URL path.
    ///
    /// An empty `path` (a bare-host request such as `https://shop.test`) disables
    /// path filtering, so every live cookie of the bucket is returned.
    pub async fn list_for_path(
        &self,
        ctx: &CancellationToken,
        url: &Url,
        path: &str,
        tracing_id: &str,
    ) -> Result<Vec<Cookie>> {
        let key = Self::bucket_key(url.host_str().unwrap_or_default(), tracing_id);
        let values = with_cancel(ctx, self.store.hvals(&key)).await?;

        let now = unix_now();
        let mut cookies = Vec::with_capacity(values.len());
        for value in values {
            let cookie: Cookie = serde_json::from_str(&value).map_err(|e| {
                SessionError::data_loss(format!("corrupt cookie in bucket {key}: {e}"))
            })?;

            if cookie.is_expired_at(now) {
                continue;
            }
            if !path.is_empty() && !path.starts_with(&cookie.path) {
                continue;
            }
            cookies.push(cookie);
        }

        log::debug!("bucket {key}: {} cookies match {}", cookies.len(), url);
        Ok(cookies)
    }

    /// Writes `cookie` into its bucket and refreshes the bucket TTL.
    ///
    /// The field write and the TTL refresh are two backend calls. If the refresh
    /// fails the error is returned, but the field write stays in place.
    pub async fn save(&self, ctx: &CancellationToken, cookie: &Cookie) -> Result<()> {
        cookie.validate()?;

        let key = Self::bucket_key(&cookie.domain, &cookie.tracing_id);
        let field = cookie.id().to_string();
        let value = serde_json::to_string(cookie)
            .map_err(|e| SessionError::internal(format!("cannot encode cookie: {e}")))?;

        with_cancel(ctx, self.store.hset(&key, &field, &value)).await?;

        let refreshed = with_cancel(ctx, self.store.expire(&key, self.ttl))
            .await
            .inspect_err(|e| log::warn!("bucket {key}: ttl refresh failed after write: {e}"))?;
        if !refreshed {
            // Deleted or expired between the two calls.
            log::debug!("bucket {key}: vanished before ttl refresh");
        }

        log::debug!("bucket {key}: saved cookie {} ({field})", cookie.name);
        Ok(())
    }

    /// Drops the whole bucket `url` falls into, for every cookie name and path.
    pub async fn delete(&self, ctx: &CancellationToken, url: &Url, tracing_id: &str) -> Result<()> {
        let key = Self::bucket_key(url.host_str().unwrap_or_default(), tracing_id);
        with_cancel(ctx, self.store.del(&key)).await?;
        log::debug!("bucket {key}: deleted");
        Ok(())
    }
}

/// Convenience for building a manager over an in-memory store.
impl Default for CookieManager {
    fn default() -> Self {
        Self::new(Arc::new(crate::storage::InMemoryHashStore::new()))
    }
}
