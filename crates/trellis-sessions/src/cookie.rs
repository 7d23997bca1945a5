//! Reading the session cookie from request headers.

use http::header::{self, HeaderMap};

/// Returns the value of the cookie called `name`, if the request sent one.
///
/// All `Cookie` headers are searched. Surrounding quotes are stripped.
///
/// ```
/// use http::{header, HeaderMap, HeaderValue};
/// use trellis_sessions::cookie::cookie_value;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; web=\"abc\""));
///
/// assert_eq!(cookie_value(&headers, "web").as_deref(), Some("abc"));
/// assert_eq!(cookie_value(&headers, "missing"), None);
/// ```
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}
