use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cookies::{Cookie, CookieManager};
use crate::errors::Result;
use crate::service::wire::{
    ClearCookiesRequest, Empty, GetCookiesRequest, GetCookiesResponse, SetCookiesRequest,
};

/// A shared, type-erased session service.
pub type SessionRpcHandle = Arc<dyn SessionRpc>;

/// The three operations of the session service.
///
/// Implemented in process by [`SessionService`] and over HTTP by
/// [`SessionClient`](crate::service::SessionClient).
#[async_trait]
pub trait SessionRpc: Send + Sync {
    /// Cookies of the bucket `req.url` falls into. Never fails just because the
    /// bucket is empty.
    async fn get_cookies(&self, ctx: &CancellationToken, req: GetCookiesRequest) -> Result<GetCookiesResponse>;

    /// Validates and stores the cookies of a response from `req.url`.
    async fn set_cookies(&self, ctx: &CancellationToken, req: SetCookiesRequest) -> Result<Empty>;

    /// Drops the bucket `req.url` falls into.
    async fn clear_cookies(&self, ctx: &CancellationToken, req: ClearCookiesRequest) -> Result<Empty>;
}

/// Session service backed by a [`CookieManager`].
///
/// Validates requests, applies the cross-domain policy on writes and translates
/// between wire cookies and [`Cookie`]s.
#[derive(Clone)]
pub struct SessionService {
    manager: Arc<CookieManager>,
}

impl SessionService {
    pub fn new(manager: Arc<CookieManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<CookieManager> {
        &self.manager
    }
}

/// Path of the request as the caller wrote it.
///
/// `Url` normalises a bare host (`https://shop.test`) to the path `/`; that case
/// is reported as an empty path instead.
fn request_path<'a>(raw: &str, url: &'a Url) -> &'a str {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    match rest.find(['/', '?', '#']) {
        Some(i) if rest[i..].starts_with('/') => url.path(),
        _ => "",
    }
}

#[async_trait]
impl SessionRpc for SessionService {
    async fn get_cookies(&self, ctx: &CancellationToken, req: GetCookiesRequest) -> Result<GetCookiesResponse> {
        let url = Url::parse(&req.url)?;
        let path = request_path(&req.url, &url);
        let cookies = self.manager.list_for_path(ctx, &url, path, &req.tracing_id).await?;
        Ok(GetCookiesResponse {
            data: cookies.iter().map(Cookie::to_wire).collect(),
        })
    }

    /// Cookies declaring a domain the response host does not belong to are
    /// dropped without error. Cookies without a domain get the response host.
    ///
    /// The first invalid cookie or failed save aborts the call; cookies saved
    /// before it stay saved.
    async fn set_cookies(&self, ctx: &CancellationToken, req: SetCookiesRequest) -> Result<Empty> {
        let url = Url::parse(&req.url)?;
        let default_domain = url.host_str().unwrap_or_default();

        for mut raw in req.cookies {
            if raw.domain.is_empty() {
                raw.domain = default_domain.to_string();
            } else if !default_domain.ends_with(&raw.domain) {
                log::debug!(
                    "dropping cookie {} for domain {}: set by {}",
                    raw.name,
                    raw.domain,
                    default_domain
                );
                continue;
            }

            let cookie = Cookie::new(req.tracing_id.as_str(), &raw)?;
            self.manager.save(ctx, &cookie).await?;
        }
        Ok(Empty {})
    }

    async fn clear_cookies(&self, ctx: &CancellationToken, req: ClearCookiesRequest) -> Result<Empty> {
        let url = Url::parse(&req.url)?;
        self.manager.delete(ctx, &url, &req.tracing_id).await?;
        Ok(Empty {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::unix_now;
    use crate::errors::SessionError;
    use crate::service::WireCookie;

    fn service() -> SessionService {
        SessionService::new(Arc::new(CookieManager::default()))
    }

    fn wire(name: &str, value: &str, domain: &str) -> WireCookie {
        WireCookie {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".into(),
            expires: unix_now() + 3600,
            ..Default::default()
        }
    }

    async fn get(svc: &SessionService, tracing_id: &str, url: &str) -> Vec<WireCookie> {
        svc.get_cookies(
            &CancellationToken::new(),
            GetCookiesRequest {
                tracing_id: tracing_id.into(),
                url: url.into(),
            },
        )
        .await
        .unwrap()
        .data
    }

    async fn set(svc: &SessionService, tracing_id: &str, url: &str, cookies: Vec<WireCookie>) -> Result<Empty> {
        svc.set_cookies(
            &CancellationToken::new(),
            SetCookiesRequest {
                tracing_id: tracing_id.into(),
                url: url.into(),
                cookies,
            },
        )
        .await
    }

    #[tokio::test]
    async fn shop_session_scenario() {
        let svc = service();

        set(&svc, "run-1", "https://shop.test/", vec![wire("sid", "abc", "shop.test")])
            .await
            .unwrap();

        let found = get(&svc, "run-1", "https://shop.test/cart").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "sid");
        assert_eq!(found[0].value, "abc");
        assert_eq!(found[0].size, 3);

        assert!(get(&svc, "run-2", "https://shop.test/cart").await.is_empty());

        svc.clear_cookies(
            &CancellationToken::new(),
            ClearCookiesRequest {
                tracing_id: "run-1".into(),
                url: "https://shop.test/".into(),
            },
        )
        .await
        .unwrap();
        assert!(get(&svc, "run-1", "https://shop.test/cart").await.is_empty());
    }

    #[tokio::test]
    async fn cross_domain_cookies_are_dropped_silently() {
        let svc = service();

        set(
            &svc,
            "run-1",
            "https://a.com/x",
            vec![wire("evil", "1", "evil.com"), wire("ok", "2", "a.com")],
        )
        .await
        .unwrap();

        assert!(get(&svc, "run-1", "https://evil.com/").await.is_empty());
        let kept = get(&svc, "run-1", "https://a.com/").await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "ok");
    }

    #[tokio::test]
    async fn parent_domain_is_accepted_and_missing_domain_defaults_to_host() {
        let svc = service();

        set(
            &svc,
            "run-1",
            "https://www.example.com/login",
            vec![wire("parent", "1", "example.com"), wire("host", "2", "")],
        )
        .await
        .unwrap();

        let mut found = get(&svc, "run-1", "https://checkout.example.com/").await;
        found.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "host");
        assert_eq!(found[0].domain, "www.example.com");
        assert_eq!(found[1].domain, "example.com");
    }

    #[tokio::test]
    async fn domain_check_is_case_sensitive() {
        let svc = service();
        set(&svc, "run-1", "https://shop.test/", vec![wire("sid", "abc", "SHOP.TEST")])
            .await
            .unwrap();
        assert!(get(&svc, "run-1", "https://shop.test/").await.is_empty());
    }

    #[test]
    fn bare_host_has_an_empty_request_path() {
        let cases = [
            ("https://shop.test", ""),
            ("https://shop.test:8443", ""),
            ("https://shop.test?q=/cart", ""),
            ("https://shop.test#/cart", ""),
            ("https://shop.test/", "/"),
            ("https://shop.test/cart?x=1", "/cart"),
        ];
        for (raw, want) in cases {
            let url = Url::parse(raw).unwrap();
            assert_eq!(request_path(raw, &url), want, "{raw}");
        }
    }

    #[tokio::test]
    async fn bare_host_lists_every_path() {
        let svc = service();
        let mut cart = wire("cart", "1", "shop.test");
        cart.path = "/cart".into();
        set(&svc, "run-1", "https://shop.test/cart", vec![cart]).await.unwrap();

        assert!(get(&svc, "run-1", "https://shop.test/").await.is_empty());
        let all = get(&svc, "run-1", "https://shop.test").await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, "/cart");
    }

    #[tokio::test]
    async fn invalid_url_is_invalid_argument() {
        let svc = service();
        let ctx = CancellationToken::new();

        let err = svc
            .get_cookies(&ctx, GetCookiesRequest { tracing_id: "t".into(), url: "::not a url".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));

        let err = set(&svc, "t", "", vec![]).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));

        let err = svc
            .clear_cookies(&ctx, ClearCookiesRequest { tracing_id: "t".into(), url: "nope".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn first_invalid_cookie_aborts_but_keeps_earlier_saves() {
        let svc = service();

        let mut expired = wire("old", "x", "shop.test");
        expired.expires = unix_now() - 10;
        let err = set(
            &svc,
            "run-1",
            "https://shop.test/",
            vec![wire("first", "1", "shop.test"), expired, wire("last", "3", "shop.test")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));

        let found = get(&svc, "run-1", "https://shop.test/").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "first");
    }

    #[tokio::test]
    async fn nameless_cookie_is_rejected() {
        let svc = service();
        let err = set(&svc, "run-1", "https://shop.test/", vec![wire("", "x", "")])
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
    }
}
