//! Cookie core types.
//!
//! A [`Cookie`] is one HTTP cookie scoped to a crawl session (its *tracing id*).
//! Cookies are identified by [`Cookie::id`], a UUIDv5 over
//! `(tracing_id, domain, name, path)`: two cookies agreeing on those four fields
//! are the same cookie, and the later write replaces the earlier one.
//!
//! Cookies are validated on construction ([`Cookie::new`]) and again before they
//! are persisted ([`Cookie::validate`]). A cookie without a name or domain, or one
//! that has already expired, is rejected with
//! [`SessionError::InvalidArgument`](crate::errors::SessionError::InvalidArgument).
//!
//! ```rust
//! use crawl_session::cookies::Cookie;
//! use crawl_session::service::WireCookie;
//!
//! let raw = WireCookie {
//!     name: "sid".into(),
//!     value: "abc".into(),
//!     domain: "shop.test".into(),
//!     ..Default::default()
//! };
//! let cookie = Cookie::new("run-1", &raw).unwrap();
//! assert_eq!(cookie.path, "/");
//! ```

use crate::errors::{Result, SessionError};
use crate::service::WireCookie;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// SameSite attribute as carried on the wire (an integer enum).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SameSite {
    #[default]
    Unspecified,
    /// Attribute present but empty or unrecognised.
    DefaultMode,
    Lax,
    Strict,
    None,
}

impl From<i32> for SameSite {
    fn from(v: i32) -> Self {
        match v {
            1 => SameSite::DefaultMode,
            2 => SameSite::Lax,
            3 => SameSite::Strict,
            4 => SameSite::None,
            _ => SameSite::Unspecified,
        }
    }
}

impl From<SameSite> for i32 {
    fn from(s: SameSite) -> Self {
        match s {
            SameSite::Unspecified => 0,
            SameSite::DefaultMode => 1,
            SameSite::Lax => 2,
            SameSite::Strict => 3,
            SameSite::None => 4,
        }
    }
}

impl SameSite {
    pub fn from_http(same_site: Option<cookie::SameSite>) -> Self {
        match same_site {
            Some(cookie::SameSite::Lax) => SameSite::Lax,
            Some(cookie::SameSite::Strict) => SameSite::Strict,
            Some(cookie::SameSite::None) => SameSite::None,
            None => SameSite::Unspecified,
        }
    }

    pub fn to_http(self) -> Option<cookie::SameSite> {
        match self {
            SameSite::Lax => Some(cookie::SameSite::Lax),
            SameSite::Strict => Some(cookie::SameSite::Strict),
            SameSite::None => Some(cookie::SameSite::None),
            SameSite::Unspecified | SameSite::DefaultMode => None,
        }
    }
}

/// A cookie as stored by the cookie manager.
///
/// This is also the serialized form written into a domain bucket, so renaming
/// fields breaks compatibility with already stored data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Crawl run this cookie belongs to. May be empty (no session scoping).
    pub tracing_id: String,

    /// Cookie name (case-sensitive, non-empty).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Matching domain; may be a parent of the host that set it.
    pub domain: String,

    /// Path scoping, `"/"` unless the cookie says otherwise.
    pub path: String,

    /// Absolute expiry in Unix seconds. `0` marks a session cookie.
    #[serde(default)]
    pub expires: i64,

    #[serde(default)]
    pub http_only: bool,

    #[serde(default)]
    pub session: bool,

    #[serde(default)]
    pub same_site: SameSite,

    #[serde(default)]
    pub priority: String,
}

/// Current wall-clock time in Unix seconds.
pub(crate) fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

impl Cookie {
    /// Builds a cookie for `tracing_id` from its wire form and validates it.
    pub fn new(tracing_id: impl Into<String>, raw: &WireCookie) -> Result<Self> {
        let path = if raw.path.is_empty() {
            "/".to_string()
        } else {
            raw.path.clone()
        };

        let cookie = Cookie {
            tracing_id: tracing_id.into(),
            name: raw.name.clone(),
            value: raw.value.clone(),
            domain: raw.domain.clone(),
            path,
            expires: raw.expires,
            http_only: raw.http_only,
            session: raw.session,
            same_site: raw.same_site,
            priority: raw.priority.clone(),
        };
        cookie.validate()?;
        Ok(cookie)
    }

    /// Deterministic identity of this cookie within its bucket.
    pub fn id(&self) -> Uuid {
        let mut key = Vec::with_capacity(
            self.tracing_id.len() + self.domain.len() + self.name.len() + self.path.len() + 3,
        );
        for (i, part) in [&self.tracing_id, &self.domain, &self.name, &self.path]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                key.push(0);
            }
            key.extend_from_slice(part.as_bytes());
        }
        Uuid::new_v5(&Uuid::NAMESPACE_OID, &key)
    }

    /// `true` if the cookie carries an expiry that is not after `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    /// Re-checks the construction invariants against the current time.
    pub fn validate(&self) -> Result<()> {
        if self.id().is_nil() {
            return Err(SessionError::invalid_argument("cookie id is empty"));
        }
        if self.name.is_empty() {
            return Err(SessionError::invalid_argument("cookie name is empty"));
        }
        if self.domain.is_empty() {
            return Err(SessionError::invalid_argument(format!(
                "cookie {} has no domain",
                self.name
            )));
        }
        if self.is_expired_at(unix_now()) {
            return Err(SessionError::invalid_argument(format!(
                "cookie {} expired at {}",
                self.name, self.expires
            )));
        }
        Ok(())
    }

    /// Wire form of this cookie. `size` is the value length, for observability.
    pub fn to_wire(&self) -> WireCookie {
        WireCookie {
            name: self.name.clone(),
            value: self.value.clone(),
            domain: self.domain.clone(),
            path: self.path.clone(),
            expires: self.expires,
            size: i32::try_from(self.value.len()).unwrap_or(i32::MAX),
            http_only: self.http_only,
            session: self.session,
            same_site: self.same_site,
            priority: self.priority.clone(),
        }
    }
}
