//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** is what a crawl worker's HTTP client consults around each
//! request: [`CookieJar::cookies`] before sending, [`CookieJar::set_cookies`]
//! with the `Set-Cookie` values of the response.
//!
//! Every call names the crawl run it belongs to through an explicit tracing id.
//! An empty tracing id is valid and means "no session scoping".
//!
//! Two implementations exist:
//! - [`DefaultCookieJar`]: in-memory only, for tests and single-process crawls.
//! - [`RemoteCookieJar`](crate::cookies::RemoteCookieJar): backed by the session
//!   service, shared between processes.
//!
//! ## Notes & limitations of [`DefaultCookieJar`]
//! - Cookies are bucketed by tracing id; within a bucket, host/subdomain and path
//!   prefix checks are applied on read.
//! - `Max-Age` is turned into an absolute expiry when the cookie is stored.
//! - `Secure` is not enforced.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::errors::{Result, SessionError};

/// The HTTP client's native cookie type.
pub type HttpCookie = cookie::Cookie<'static>;

/// A shared, type-erased cookie jar.
pub type CookieJarHandle = Arc<dyn CookieJar>;

/// Read/write access to the cookies of a crawl run.
///
/// Both methods treat a `None` URL as a no-op rather than an error.
#[async_trait]
pub trait CookieJar: Send + Sync {
    /// Returns the cookies to send with a request to `url`.
    async fn cookies(
        &self,
        ctx: &CancellationToken,
        tracing_id: &str,
        url: Option<&Url>,
    ) -> Result<Vec<HttpCookie>>;

    /// Stores cookies received in a response from `url`.
    async fn set_cookies(
        &self,
        ctx: &CancellationToken,
        tracing_id: &str,
        url: Option<&Url>,
        cookies: &[HttpCookie],
    ) -> Result<()>;
}

/// In-memory cookie jar, bucketed by tracing id.
///
/// Cookies replace each other when name, domain and path agree.
#[derive(Debug, Default)]
pub struct DefaultCookieJar {
    entries: RwLock<HashMap<String, Vec<HttpCookie>>>,
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every cookie of `tracing_id`.
    pub fn clear(&self, tracing_id: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| SessionError::internal("cookie jar lock poisoned"))?
            .remove(tracing_id);
        Ok(())
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// `now + max_age`, clamped to the representable date range.
fn expiry_after(now: OffsetDateTime, max_age: time::Duration) -> OffsetDateTime {
    now.checked_add(max_age).unwrap_or_else(|| {
        if max_age.is_negative() {
            OffsetDateTime::UNIX_EPOCH
        } else {
            PrimitiveDateTime::MAX.assume_utc()
        }
    })
}

fn is_expired(cookie: &HttpCookie, now: OffsetDateTime) -> bool {
    matches!(cookie.expires_datetime(), Some(at) if at <= now)
}

#[async_trait]
impl CookieJar for DefaultCookieJar {
    async fn cookies(
        &self,
        _ctx: &CancellationToken,
        tracing_id: &str,
        url: Option<&Url>,
    ) -> Result<Vec<HttpCookie>> {
        let Some(url) = url else {
            return Ok(Vec::new());
        };
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        let now = OffsetDateTime::now_utc();

        let entries = self
            .entries
            .read()
            .map_err(|_| SessionError::internal("cookie jar lock poisoned"))?;
        let Some(bucket) = entries.get(tracing_id) else {
            return Ok(Vec::new());
        };

        Ok(bucket
            .iter()
            .filter(|c| c.domain().map_or(true, |d| domain_matches(host, d)))
            .filter(|c| c.path().map_or(true, |p| path.starts_with(p)))
            .filter(|c| !is_expired(c, now))
            .cloned()
            .collect())
    }

    async fn set_cookies(
        &self,
        _ctx: &CancellationToken,
        tracing_id: &str,
        url: Option<&Url>,
        cookies: &[HttpCookie],
    ) -> Result<()> {
        let Some(url) = url else {
            return Ok(());
        };
        let host = url.host_str().unwrap_or_default().to_string();
        let now = OffsetDateTime::now_utc();

        let mut entries = self
            .entries
            .write()
            .map_err(|_| SessionError::internal("cookie jar lock poisoned"))?;
        let bucket = entries.entry(tracing_id.to_string()).or_default();

        for cookie in cookies {
            let mut cookie = cookie.clone();
            if cookie.domain().is_none() {
                cookie.set_domain(host.clone());
            }
            if cookie.path().is_none() {
                cookie.set_path("/");
            }
            if let Some(max_age) = cookie.max_age() {
                cookie.set_expires(expiry_after(now, max_age));
            }

            // Replace existing cookie with same name, domain and path
            bucket.retain(|c| {
                !(c.name() == cookie.name()
                    && c.domain() == cookie.domain()
                    && c.path() == cookie.path())
            });
            if !is_expired(&cookie, now) {
                bucket.push(cookie);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid URL")
    }

    fn parse(s: &str) -> HttpCookie {
        cookie::Cookie::parse(s.to_string()).expect("valid cookie")
    }

    #[tokio::test]
    async fn stores_and_matches_by_host_and_path() {
        let jar = DefaultCookieJar::new();
        let ctx = CancellationToken::new();
        let origin = url("https://www.example.com/login");

        jar.set_cookies(
            &ctx,
            "run-1",
            Some(&origin),
            &[
                parse("sid=abc; Domain=example.com; Path=/"),
                parse("cart=1; Path=/cart"),
            ],
        )
        .await
        .unwrap();

        let names = |cookies: Vec<HttpCookie>| {
            let mut n: Vec<String> = cookies.iter().map(|c| c.name().to_string()).collect();
            n.sort();
            n
        };

        let at_cart = jar.cookies(&ctx, "run-1", Some(&url("https://www.example.com/cart"))).await.unwrap();
        assert_eq!(names(at_cart), vec!["cart", "sid"]);

        let other_sub = jar.cookies(&ctx, "run-1", Some(&url("https://api.example.com/cart"))).await.unwrap();
        assert_eq!(names(other_sub), vec!["sid"]);

        let other_run = jar.cookies(&ctx, "run-2", Some(&url("https://www.example.com/"))).await.unwrap();
        assert!(other_run.is_empty());
    }

    #[tokio::test]
    async fn none_url_is_a_no_op() {
        let jar = DefaultCookieJar::new();
        let ctx = CancellationToken::new();

        jar.set_cookies(&ctx, "run-1", None, &[parse("sid=abc")]).await.unwrap();
        assert!(jar.cookies(&ctx, "run-1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_write_wins_and_expiry_removes() {
        let jar = DefaultCookieJar::new();
        let ctx = CancellationToken::new();
        let origin = url("https://shop.test/");

        jar.set_cookies(&ctx, "run-1", Some(&origin), &[parse("sid=one")]).await.unwrap();
        jar.set_cookies(&ctx, "run-1", Some(&origin), &[parse("sid=two")]).await.unwrap();

        let cookies = jar.cookies(&ctx, "run-1", Some(&origin)).await.unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value(), "two");

        jar.set_cookies(&ctx, "run-1", Some(&origin), &[parse("sid=gone; Max-Age=0")]).await.unwrap();
        assert!(jar.cookies(&ctx, "run-1", Some(&origin)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn huge_max_age_is_clamped() {
        let jar = DefaultCookieJar::new();
        let ctx = CancellationToken::new();
        let origin = url("https://shop.test/");

        jar.set_cookies(&ctx, "run-1", Some(&origin), &[parse("sid=abc; Max-Age=9223372036854775807")])
            .await
            .unwrap();

        let cookies = jar.cookies(&ctx, "run-1", Some(&origin)).await.unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].expires_datetime().map(|t| t.year()), Some(9999));
    }

    #[test]
    fn expiry_after_clamps_both_ways() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(expiry_after(now, time::Duration::MAX), PrimitiveDateTime::MAX.assume_utc());
        assert_eq!(expiry_after(now, time::Duration::MIN), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(expiry_after(now, time::Duration::seconds(60)), now + time::Duration::seconds(60));
    }

    #[tokio::test]
    async fn clear_drops_one_run() {
        let jar = DefaultCookieJar::new();
        let ctx = CancellationToken::new();
        let origin = url("https://shop.test/");

        jar.set_cookies(&ctx, "run-1", Some(&origin), &[parse("a=1")]).await.unwrap();
        jar.set_cookies(&ctx, "run-2", Some(&origin), &[parse("b=2")]).await.unwrap();
        jar.clear("run-1").unwrap();

        assert!(jar.cookies(&ctx, "run-1", Some(&origin)).await.unwrap().is_empty());
        assert_eq!(jar.cookies(&ctx, "run-2", Some(&origin)).await.unwrap().len(), 1);
    }
}
