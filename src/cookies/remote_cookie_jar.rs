use async_trait::async_trait;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cookies::cookie_jar::{CookieJar, HttpCookie};
use crate::cookies::unix_now;
use crate::cookies::SameSite;
use crate::errors::Result;
use crate::service::{GetCookiesRequest, SessionRpcHandle, SetCookiesRequest, WireCookie};

/// A [`CookieJar`] that keeps no state of its own and forwards every call to the
/// session service.
///
/// Errors from the service are returned to the caller unchanged, so the crawl
/// worker decides whether to retry or abandon the request.
#[derive(Clone)]
pub struct RemoteCookieJar {
    rpc: SessionRpcHandle,
}

impl RemoteCookieJar {
    pub fn new(rpc: SessionRpcHandle) -> Self {
        Self { rpc }
    }
}

/// Converts a cookie received from the service into the HTTP client's type.
///
/// An absolute expiry is only set if the wire value is positive and still in the
/// future relative to `now`.
pub(crate) fn from_wire(wire: &WireCookie, now: i64) -> HttpCookie {
    let mut builder = cookie::Cookie::build((wire.name.clone(), wire.value.clone()))
        .path(wire.path.clone())
        .http_only(wire.http_only);
    if !wire.domain.is_empty() {
        builder = builder.domain(wire.domain.clone());
    }
    if let Some(same_site) = wire.same_site.to_http() {
        builder = builder.same_site(same_site);
    }
    if wire.expires > 0 && wire.expires > now {
        // Beyond the representable range means "never" for practical purposes.
        let at = OffsetDateTime::from_unix_timestamp(wire.expires)
            .unwrap_or_else(|_| PrimitiveDateTime::MAX.assume_utc());
        builder = builder.expires(at);
    }
    builder.build()
}

/// Converts a response cookie into its wire form.
///
/// A positive `Max-Age` wins over `Expires`; both become absolute Unix seconds.
/// A cookie with neither is a session cookie (`expires == 0`).
///
/// `Max-Age=0` or a negative `Max-Age` is not treated as a deletion: the cookie
/// falls back to its `Expires` attribute, or to a session cookie without one.
/// Buckets are cleared through `ClearCookies` instead.
pub(crate) fn to_wire(cookie: &HttpCookie, now: i64) -> WireCookie {
    let expires = match cookie.max_age() {
        Some(max_age) if max_age.is_positive() => now.saturating_add(max_age.whole_seconds()),
        _ => cookie
            .expires_datetime()
            .map(|at| at.unix_timestamp())
            .unwrap_or(0),
    };

    WireCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie.domain().unwrap_or_default().to_string(),
        path: cookie.path().unwrap_or_default().to_string(),
        expires,
        size: i32::try_from(cookie.value().len()).unwrap_or(i32::MAX),
        http_only: cookie.http_only().unwrap_or(false),
        session: expires == 0,
        same_site: SameSite::from_http(cookie.same_site()),
        priority: String::new(),
    }
}

#[async_trait]
impl CookieJar for RemoteCookieJar {
    async fn cookies(
        &self,
        ctx: &CancellationToken,
        tracing_id: &str,
        url: Option<&Url>,
    ) -> Result<Vec<HttpCookie>> {
        let Some(url) = url else {
            return Ok(Vec::new());
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            return Ok(Vec::new());
        }

        let resp = self
            .rpc
            .get_cookies(
                ctx,
                GetCookiesRequest {
                    tracing_id: tracing_id.to_string(),
                    url: url.to_string(),
                },
            )
            .await?;

        let now = unix_now();
        Ok(resp.data.iter().map(|w| from_wire(w, now)).collect())
    }

    async fn set_cookies(
        &self,
        ctx: &CancellationToken,
        tracing_id: &str,
        url: Option<&Url>,
        cookies: &[HttpCookie],
    ) -> Result<()> {
        let Some(url) = url else {
            return Ok(());
        };

        let now = unix_now();
        self.rpc
            .set_cookies(
                ctx,
                SetCookiesRequest {
                    tracing_id: tracing_id.to_string(),
                    url: url.to_string(),
                    cookies: cookies.iter().map(|c| to_wire(c, now)).collect(),
                },
            )
            .await?;
        Ok(())
    }
}
