use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::SessionConfig;
use crate::context::with_cancel;
use crate::errors::{Result, SessionError};
use crate::service::session::SessionRpc;
use crate::service::wire::{
    ClearCookiesRequest, Empty, ErrorBody, GetCookiesRequest, GetCookiesResponse,
    SetCookiesRequest, CLEAR_COOKIES_PATH, GET_COOKIES_PATH, SET_COOKIES_PATH,
};

/// Talks to a session service exposed by [`server`](crate::service::server).
#[derive(Debug, Clone)]
pub struct SessionClient {
    remote: Url,
    client: Client,
}

impl SessionClient {
    /// Creates a client for the service at `remote`. `timeout` bounds each call.
    pub fn new(remote: &Url, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Creates a client for the service at `remote` using the configured
    /// per-call timeout.
    pub fn from_config(remote: &Url, config: &SessionConfig) -> Result<Self> {
        Self::new(remote, config.rpc_timeout)
    }

    /// Base URL of the remote service.
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    async fn call<Req, Resp>(&self, ctx: &CancellationToken, path: &str, req: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let url = self
            .remote
            .join(path)
            .map_err(|e| SessionError::internal(format!("cannot build rpc url: {e}")))?;

        with_cancel(ctx, async {
            let response = self
                .client
                .post(url)
                .json(req)
                .send()
                .await
                .map_err(classify)?;

            let status = response.status();
            if status.is_success() {
                return response.json::<Resp>().await.map_err(classify);
            }

            let text = response.text().await.map_err(classify)?;
            match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => Err(SessionError::from_code(body.code, body.message)),
                Err(_) => Err(SessionError::internal(format!("HTTP status {status}: {text}"))),
            }
        })
        .await
    }
}

/// Timeouts are reported like cancellations; everything else is a transport error.
fn classify(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Cancelled
    } else {
        SessionError::Transport(err)
    }
}

#[async_trait]
impl SessionRpc for SessionClient {
    async fn get_cookies(&self, ctx: &CancellationToken, req: GetCookiesRequest) -> Result<GetCookiesResponse> {
        self.call(ctx, GET_COOKIES_PATH, &req).await
    }

    async fn set_cookies(&self, ctx: &CancellationToken, req: SetCookiesRequest) -> Result<Empty> {
        self.call(ctx, SET_COOKIES_PATH, &req).await
    }

    async fn clear_cookies(&self, ctx: &CancellationToken, req: ClearCookiesRequest) -> Result<Empty> {
        self.call(ctx, CLEAR_COOKIES_PATH, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::{CookieJar, CookieManager, HttpCookie, RemoteCookieJar};
    use crate::service::server::serve;
    use crate::service::SessionService;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn spawn_server() -> (Url, CancellationToken) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = SessionService::new(Arc::new(CookieManager::default()));
        let shutdown = CancellationToken::new();
        tokio::spawn(serve(listener, service, shutdown.clone()));
        (Url::parse(&format!("http://{addr}")).unwrap(), shutdown)
    }

    fn parse(s: &str) -> HttpCookie {
        cookie::Cookie::parse(s.to_string()).expect("valid cookie")
    }

    #[tokio::test]
    async fn remote_jar_over_http() {
        let (base, shutdown) = spawn_server().await;
        let client = SessionClient::new(&base, Duration::from_secs(5)).unwrap();
        let jar = RemoteCookieJar::new(Arc::new(client.clone()));
        let ctx = CancellationToken::new();

        let page = Url::parse("https://shop.test/login").unwrap();
        jar.set_cookies(
            &ctx,
            "run-1",
            Some(&page),
            &[parse("sid=abc; Path=/; Max-Age=3600"), parse("evil=1; Domain=evil.com")],
        )
        .await
        .unwrap();

        let cart = Url::parse("https://shop.test/cart").unwrap();
        let cookies = jar.cookies(&ctx, "run-1", Some(&cart)).await.unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "sid");
        assert_eq!(cookies[0].value(), "abc");

        let evil = Url::parse("https://evil.com/").unwrap();
        assert!(jar.cookies(&ctx, "run-1", Some(&evil)).await.unwrap().is_empty());
        assert!(jar.cookies(&ctx, "run-2", Some(&cart)).await.unwrap().is_empty());

        client
            .clear_cookies(
                &ctx,
                ClearCookiesRequest {
                    tracing_id: "run-1".into(),
                    url: "https://shop.test/".into(),
                },
            )
            .await
            .unwrap();
        assert!(jar.cookies(&ctx, "run-1", Some(&cart)).await.unwrap().is_empty());

        shutdown.cancel();
    }

    #[tokio::test]
    async fn server_errors_keep_their_kind() {
        let (base, shutdown) = spawn_server().await;
        let client = SessionClient::new(&base, Duration::from_secs(5)).unwrap();
        let ctx = CancellationToken::new();

        let err = client
            .get_cookies(
                &ctx,
                GetCookiesRequest {
                    tracing_id: "run-1".into(),
                    url: "not a url".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(ref m) if m.starts_with("invalid url")));

        shutdown.cancel();
    }

    #[tokio::test]
    async fn configured_timeout_is_reported_as_cancelled() {
        // Accepted by the kernel backlog but never answered.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = SessionConfig {
            rpc_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let client = SessionClient::from_config(&base, &config).unwrap();
        assert_eq!(client.base_url(), &base);

        let err = client
            .get_cookies(
                &CancellationToken::new(),
                GetCookiesRequest {
                    tracing_id: "run-1".into(),
                    url: "https://shop.test/".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
        drop(listener);
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Bind and drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let client = SessionClient::new(&base, Duration::from_secs(5)).unwrap();
        let err = client
            .get_cookies(
                &CancellationToken::new(),
                GetCookiesRequest {
                    tracing_id: String::new(),
                    url: "https://shop.test/".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
        assert!(err.is_retryable());
    }
}
