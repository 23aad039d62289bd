use crate::cookies::SameSite;
use crate::errors::ErrorCode;
use serde::{Deserialize, Serialize};

pub const GET_COOKIES_PATH: &str = "/session.v1.SessionService/GetCookies";
pub const SET_COOKIES_PATH: &str = "/session.v1.SessionService/SetCookies";
pub const CLEAR_COOKIES_PATH: &str = "/session.v1.SessionService/ClearCookies";

/// A cookie as exchanged with the session service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Absolute expiry in Unix seconds, `0` for session cookies.
    pub expires: i64,
    /// Length of `value`; informational only.
    pub size: i32,
    pub http_only: bool,
    pub session: bool,
    pub same_site: SameSite,
    pub priority: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCookiesRequest {
    #[serde(default)]
    pub tracing_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetCookiesResponse {
    #[serde(default)]
    pub data: Vec<WireCookie>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookiesRequest {
    #[serde(default)]
    pub tracing_id: String,
    pub url: String,
    #[serde(default)]
    pub cookies: Vec<WireCookie>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCookiesRequest {
    #[serde(default)]
    pub tracing_id: String,
    pub url: String,
}

/// Acknowledgement without payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}
