//! Session state for a single authentication run
//!
//! The session owns the `auth_token` credential, every cookie the server sets
//! while the flow runs (notably the `ct0` CSRF cookie), and knows how to
//! assemble the two header sets the flows send.

use crate::config::ProviderConfig;
use crate::error::{XAuthError, XAuthResult};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, ORIGIN, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;

/// Name of the session credential cookie
pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Header carrying the CSRF token
pub const CSRF_HEADER: &str = "x-csrf-token";

/// A cookie scoped to a domain and path
///
/// A host-only cookie (one set without a `Domain` attribute) is sent to its
/// exact host only; a domain cookie is also sent to subdomains.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub host_only: bool,
}

impl Cookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let domain: String = domain.into();
        let path: String = path.into();
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.trim_start_matches('.').to_ascii_lowercase(),
            path: if path.is_empty() { "/".to_string() } else { path },
            host_only: false,
        }
    }

    /// Restrict the cookie to its exact host
    pub fn host_only(mut self) -> Self {
        self.host_only = true;
        self
    }

    /// Whether this cookie should be sent to `host` for a request to `path`.
    ///
    /// Host-only cookies need an exact host; domain cookies also match as a
    /// dot-separated suffix. The cookie path must be a prefix of `path` that
    /// ends on a `/` boundary.
    pub fn matches(&self, host: &str, path: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let domain_ok = host == self.domain
            || (!self.host_only
                && host
                    .strip_suffix(self.domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')));
        let path_ok = path.strip_prefix(self.path.as_str()).is_some_and(|rest| {
            rest.is_empty() || rest.starts_with('/') || self.path.ends_with('/')
        });
        domain_ok && path_ok
    }

    fn same_slot(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

// Cookie values are credentials; keep them out of debug output.
impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("host_only", &self.host_only)
            .finish_non_exhaustive()
    }
}

/// Cookie jar and header sets for one authentication run
pub struct SessionContext {
    credential: SecretString,
    cookies: Vec<Cookie>,
    config: Arc<ProviderConfig>,
}

impl SessionContext {
    /// Create a session for the given `auth_token` cookie value.
    ///
    /// The credential is seeded as a cookie for every configured domain and is
    /// stored exactly as given.
    pub fn new(credential: &str, config: Arc<ProviderConfig>) -> XAuthResult<Self> {
        if credential.trim().is_empty() {
            return Err(XAuthError::invalid_input("auth_token must not be empty"));
        }

        let mut session = Self {
            credential: SecretString::from(credential.to_string()),
            cookies: Vec::new(),
            config,
        };

        let domains = session.config.cookie_domains.clone();
        for domain in domains {
            session.add_cookie(AUTH_TOKEN_COOKIE, credential, &domain, "/");
        }

        Ok(session)
    }

    /// The `auth_token` value this session was created with
    pub fn credential(&self) -> &str {
        self.credential.expose_secret()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Add a domain cookie, replacing any cookie with the same name, domain
    /// and path
    pub fn add_cookie(&mut self, name: &str, value: &str, domain: &str, path: &str) {
        self.set_cookie(Cookie::new(name, value, domain, path));
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.retain(|existing| !existing.same_slot(&cookie));
        self.cookies.push(cookie);
    }

    /// Drop the cookie stored under `name`, `domain` and `path`, if any
    pub fn remove_cookie(&mut self, name: &str, domain: &str, path: &str) {
        let slot = Cookie::new(name, "", domain, path);
        self.cookies.retain(|existing| !existing.same_slot(&slot));
    }

    /// Most recently written value for `name`, on any domain
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rev()
            .find(|cookie| cookie.name == name)
            .map(|cookie| cookie.value.as_str())
    }

    /// The CSRF token, if the server has issued a non-empty one
    pub fn csrf_token(&self) -> Option<&str> {
        self.cookie(&self.config.csrf_cookie).filter(|token| !token.is_empty())
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// `Cookie` header value for a request to `host` and `path`
    pub fn cookie_header(&self, host: &str, path: &str) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|cookie| cookie.matches(host, path))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Headers for a request.
    ///
    /// The baseline set only carries the browser user agent. The provider set
    /// adds the web client markers, the bearer token and, once a CSRF cookie
    /// exists, the CSRF header.
    pub fn headers(&self, include_provider_headers: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, USER_AGENT, &self.config.user_agent);

        if include_provider_headers {
            insert_header(
                &mut headers,
                HeaderName::from_static("authority"),
                &self.config.authority,
            );
            insert_header(&mut headers, ORIGIN, &self.config.origin);
            insert_header(
                &mut headers,
                HeaderName::from_static("x-twitter-auth-type"),
                "OAuth2Session",
            );
            insert_header(
                &mut headers,
                HeaderName::from_static("x-twitter-active-user"),
                "yes",
            );
            insert_header(&mut headers, AUTHORIZATION, &self.config.authorization());

            if let Some(csrf) = self.csrf_token() {
                insert_header(&mut headers, HeaderName::from_static(CSRF_HEADER), csrf);
            }
        }

        headers
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("credential", &self.credential)
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!("Skipping header {} with a non-visible-ASCII value", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionContext {
        SessionContext::new("secret-auth-token", Arc::new(ProviderConfig::default())).unwrap()
    }

    #[test]
    fn test_empty_credential_rejected() {
        let config = Arc::new(ProviderConfig::default());
        assert!(matches!(
            SessionContext::new("", config.clone()),
            Err(XAuthError::InvalidInput(_))
        ));
        assert!(matches!(
            SessionContext::new("   ", config),
            Err(XAuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_credential_stored_verbatim() {
        let session = SessionContext::new(" tok ", Arc::new(ProviderConfig::default())).unwrap();
        assert_eq!(session.credential(), " tok ");
        assert_eq!(session.cookie(AUTH_TOKEN_COOKIE), Some(" tok "));
    }

    #[test]
    fn test_credential_seeded_for_each_domain() {
        let session = session();
        assert_eq!(session.credential(), "secret-auth-token");
        assert_eq!(session.cookie(AUTH_TOKEN_COOKIE), Some("secret-auth-token"));
        assert_eq!(session.cookies().len(), 2);
        assert_eq!(
            session.cookie_header("api.x.com", "/oauth/authenticate"),
            Some("auth_token=secret-auth-token".to_string())
        );
        assert_eq!(
            session.cookie_header("twitter.com", "/i/api/2/oauth2/authorize"),
            Some("auth_token=secret-auth-token".to_string())
        );
        assert_eq!(session.cookie_header("example.com", "/"), None);
    }

    #[test]
    fn test_add_cookie_last_write_wins() {
        let mut session = session();
        session.add_cookie("ct0", "first", "twitter.com", "/");
        session.add_cookie("ct0", "second", "twitter.com", "/");

        assert_eq!(session.cookie("ct0"), Some("second"));
        assert_eq!(
            session
                .cookies()
                .iter()
                .filter(|cookie| cookie.name == "ct0")
                .count(),
            1
        );
    }

    #[test]
    fn test_cookie_domain_and_path_matching() {
        let cookie = Cookie::new("a", "1", ".x.com", "/oauth");
        assert_eq!(cookie.domain, "x.com");
        assert!(cookie.matches("x.com", "/oauth/authorize"));
        assert!(cookie.matches("api.x.com", "/oauth"));
        assert!(!cookie.matches("notx.com", "/oauth"));
        assert!(!cookie.matches("x.com", "/i/api"));
        assert!(!cookie.matches("x.com", "/oauthx"));

        let root = Cookie::new("a", "1", "x.com", "/");
        assert!(root.matches("x.com", "/oauth"));
    }

    #[test]
    fn test_host_only_cookie_skips_subdomains() {
        let cookie = Cookie::new("ct0", "1", "x.com", "/").host_only();
        assert!(cookie.matches("x.com", "/"));
        assert!(cookie.matches("X.com", "/"));
        assert!(!cookie.matches("api.x.com", "/"));
    }

    #[test]
    fn test_remove_cookie() {
        let mut session = session();
        session.set_cookie(Cookie::new("ct0", "csrf-value", "twitter.com", "/").host_only());
        assert_eq!(session.csrf_token(), Some("csrf-value"));

        session.remove_cookie("ct0", "twitter.com", "/");
        assert_eq!(session.csrf_token(), None);
        assert!(!session.headers(true).contains_key(CSRF_HEADER));
        // Other cookies in the jar are untouched
        assert_eq!(session.cookie(AUTH_TOKEN_COOKIE), Some("secret-auth-token"));
    }

    #[test]
    fn test_empty_csrf_cookie_is_absent() {
        let mut session = session();
        session.add_cookie("ct0", "", "twitter.com", "/");
        assert_eq!(session.cookie("ct0"), Some(""));
        assert_eq!(session.csrf_token(), None);
        assert!(!session.headers(true).contains_key(CSRF_HEADER));
    }

    #[test]
    fn test_baseline_headers() {
        let headers = session().headers(false);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(USER_AGENT));
    }

    #[test]
    fn test_provider_headers() {
        let mut session = session();
        let headers = session.headers(true);
        assert_eq!(headers["authority"], "twitter.com");
        assert_eq!(headers[ORIGIN], "https://twitter.com");
        assert_eq!(headers["x-twitter-auth-type"], "OAuth2Session");
        assert_eq!(headers["x-twitter-active-user"], "yes");
        assert!(
            headers[AUTHORIZATION]
                .to_str()
                .unwrap()
                .starts_with("Bearer ")
        );
        assert!(!headers.contains_key(CSRF_HEADER));

        session.add_cookie("ct0", "csrf-value", "twitter.com", "/");
        let headers = session.headers(true);
        assert_eq!(headers[CSRF_HEADER], "csrf-value");

        // The baseline set never carries the CSRF token
        assert!(!session.headers(false).contains_key(CSRF_HEADER));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let mut session = session();
        session.add_cookie("ct0", "csrf-secret", "twitter.com", "/");
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret-auth-token"));
        assert!(!debug.contains("csrf-secret"));
        assert!(debug.contains("ct0"));
    }
}
