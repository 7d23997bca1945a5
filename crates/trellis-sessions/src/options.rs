//! Cookie options for sessions.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// Attribute omitted; the browser default applies.
    #[default]
    Default,
    /// Sent with same-site requests and top-level navigations.
    Lax,
    /// Sent with same-site requests only.
    Strict,
    /// Sent with cross-site requests. Browsers require `Secure`.
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => Ok(()),
            Self::Lax => write!(f, "Lax"),
            Self::Strict => write!(f, "Strict"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Cookie and lifetime settings for a session.
///
/// `max_age` is in seconds: `0` leaves it unset (a browser-session cookie),
/// a negative value expires the cookie and the stored record immediately.
///
/// # Example
///
/// ```
/// use trellis_sessions::{Options, SameSite};
///
/// let options = Options {
///     max_age: 3600,
///     http_only: true,
///     same_site: SameSite::Strict,
///     ..Options::default()
/// };
///
/// let header = options.set_cookie("web", "abc123");
/// assert_eq!(header, "web=abc123; Path=/; Max-Age=3600; HttpOnly; SameSite=Strict");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Cookie path.
    pub path: String,
    /// Cookie domain. Omitted when empty.
    pub domain: Option<String>,
    /// Lifetime in seconds.
    pub max_age: i64,
    /// Only send over HTTPS.
    pub secure: bool,
    /// Hide from client-side scripts.
    pub http_only: bool,
    /// Cross-site policy.
    pub same_site: SameSite,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: 0,
            secure: false,
            http_only: false,
            same_site: SameSite::Default,
        }
    }
}

impl Options {
    /// Returns true if these options expire the session.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.max_age < 0
    }

    /// Renders a `Set-Cookie` header value.
    #[must_use]
    pub fn set_cookie(&self, name: &str, value: &str) -> String {
        let mut out = format!("{name}={value}");

        if !self.path.is_empty() {
            let _ = write!(out, "; Path={}", self.path);
        }
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, "; Domain={domain}");
        }
        match self.max_age {
            0 => {}
            n if n < 0 => out.push_str("; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"),
            n => {
                let _ = write!(out, "; Max-Age={n}");
            }
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.same_site != SameSite::Default {
            let _ = write!(out, "; SameSite={}", self.same_site);
        }

        out
    }
}
