//! Cookies: the [`Cookie`] entity, the [`CookieManager`] and the [`CookieJar`]s
//! crawl workers talk to.

mod cookies;
mod cookie_jar;
mod remote_cookie_jar;
mod store;

pub use cookies::Cookie;
pub use cookies::SameSite;
pub(crate) use cookies::unix_now;

pub use cookie_jar::CookieJar;
pub use cookie_jar::CookieJarHandle;
pub use cookie_jar::DefaultCookieJar;
pub use cookie_jar::HttpCookie;
pub use remote_cookie_jar::RemoteCookieJar;

pub use store::CookieManager;
pub use store::DEFAULT_BUCKET_TTL;
