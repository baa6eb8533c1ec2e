//! HTTP transport
//!
//! [`Transport`] is the seam between the request sequencing and the network.
//! [`ReqwestTransport`] is the production implementation: it attaches the
//! session's cookies to each request and records every `Set-Cookie` the server
//! answers with back into the session.

use crate::config::ProviderConfig;
use crate::error::{XAuthError, XAuthResult};
use crate::session::{Cookie, SessionContext};
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap};
use reqwest::{Client, StatusCode, Url};
use rustls_platform_verifier::BuilderVerifierExt;
use std::time::{Duration, SystemTime};

/// HTTP method of a flow request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One request of an authentication stage
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub method: Method,
    pub url: String,
    /// Query string parameters, in order
    pub query: Vec<(String, String)>,
    /// Form body parameters, in order (sent url-encoded)
    pub form: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl AuthRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Status and body of a flow response
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub status: StatusCode,
    pub body: String,
}

impl AuthResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }
}

/// Performs a single HTTP exchange on behalf of a session.
///
/// Implementations must send the session's applicable cookies and store any
/// cookies the server sets back into the session before returning.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: &AuthRequest,
        session: &mut SessionContext,
    ) -> XAuthResult<AuthResponse>;
}

/// Create an HTTP client configured with platform-verified TLS.
///
/// Uses `rustls` with the OS-provided CA certificate store via
/// `rustls-platform-verifier`. Cookies are not stored by the client; the
/// session owns them.
pub fn create_platform_tls_client(timeout: Duration) -> XAuthResult<Client> {
    let arc_crypto_provider = std::sync::Arc::new(rustls::crypto::ring::default_provider());
    let tls_config = rustls::ClientConfig::builder_with_provider(arc_crypto_provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| XAuthError::Tls(format!("Failed to build TLS config: {}", e)))?
        .with_platform_verifier()
        .with_no_client_auth();

    Client::builder()
        .use_preconfigured_tls(tls_config)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| XAuthError::Tls(format!("Failed to create TLS HTTP client: {}", e)))
}

/// [`Transport`] backed by a single `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ProviderConfig) -> XAuthResult<Self> {
        Ok(Self {
            client: create_platform_tls_client(config.timeout())?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &AuthRequest,
        session: &mut SessionContext,
    ) -> XAuthResult<AuthResponse> {
        let url = Url::parse(&request.url)
            .map_err(|e| XAuthError::invalid_input(format!("URL '{}': {}", request.url, e)))?;
        let host = url.host_str().unwrap_or_default().to_string();

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, url.clone())
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if request.method == Method::Post {
            builder = builder.form(&request.form);
        }
        if let Some(cookies) = session.cookie_header(&host, url.path()) {
            builder = builder.header(COOKIE, cookies);
        }

        let response = builder.send().await?;
        let status = response.status();

        let now = SystemTime::now();
        let set_cookies: Vec<(Cookie, bool)> = response
            .cookies()
            .map(|cookie| {
                let expired = cookie.max_age().is_some_and(|max_age| max_age.is_zero())
                    || cookie.expires().is_some_and(|expires| expires <= now);
                let stored = match cookie.domain() {
                    Some(domain) => Cookie::new(
                        cookie.name(),
                        cookie.value(),
                        domain,
                        cookie.path().unwrap_or("/"),
                    ),
                    None => Cookie::new(
                        cookie.name(),
                        cookie.value(),
                        host.as_str(),
                        cookie.path().unwrap_or("/"),
                    )
                    .host_only(),
                };
                (stored, expired)
            })
            .collect();
        for (cookie, expired) in set_cookies {
            if expired {
                tracing::debug!("Server expired cookie {} for {}", cookie.name, host);
                session.remove_cookie(&cookie.name, &cookie.domain, &cookie.path);
            } else {
                tracing::debug!("Server set cookie {} for {}", cookie.name, host);
                session.set_cookie(cookie);
            }
        }

        let body = response.text().await?;
        Ok(AuthResponse { status, body })
    }
}
