//! Session service: the RPC facade in front of the [`CookieManager`](crate::cookies::CookieManager).
//!
//! The service exposes three unary operations, described by the [`SessionRpc`]
//! trait:
//!
//! - `GetCookies(tracingId, url)`: cookies of the URL's bucket.
//! - `SetCookies(tracingId, url, cookies)`: validates and stores response cookies.
//! - `ClearCookies(tracingId, url)`: drops the URL's bucket.
//!
//! [`SessionService`] implements them in process. [`server`] exposes a
//! `SessionService` as JSON over HTTP, and [`SessionClient`] implements
//! [`SessionRpc`] against such a server, so a
//! [`RemoteCookieJar`](crate::cookies::RemoteCookieJar) works the same with either.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use crawl_session::cookies::RemoteCookieJar;
//! use crawl_session::service::SessionClient;
//!
//! let client = SessionClient::new(&"http://127.0.0.1:7070".parse().unwrap(), Duration::from_secs(10)).unwrap();
//! let jar = RemoteCookieJar::new(Arc::new(client));
//! ```

/// HTTP client for a remote session service.
pub mod client;
/// HTTP server exposing a session service.
pub mod server;
/// In-process session service.
pub mod session;
/// Request, response and cookie messages.
pub mod wire;

pub use client::SessionClient;
pub use session::{SessionRpc, SessionRpcHandle, SessionService};
pub use wire::{
    ClearCookiesRequest, Empty, ErrorBody, GetCookiesRequest, GetCookiesResponse,
    SetCookiesRequest, WireCookie,
};
