//! Shared cookie storage for distributed crawl workers.
//!
//! Workers that belong to the same crawl run (a *trace*) share their cookies
//! through a central [`service::SessionService`]. Each worker plugs a
//! [`cookies::RemoteCookieJar`] into its HTTP client; the service persists the
//! cookies through a [`cookies::CookieManager`] on top of a [`storage::HashStore`].

pub mod config;
pub mod context;
pub mod cookies;
pub mod errors;
pub mod service;
pub mod storage;

pub use errors::{Result, SessionError};
