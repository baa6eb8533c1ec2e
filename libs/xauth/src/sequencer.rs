//! OAuth1 and OAuth2 authorization sequences
//!
//! Each flow is a short chain of browser-like requests:
//!
//! - OAuth1: fetch the authenticate page and scrape its authenticity token,
//!   then submit the authorize form and scrape the `oauth_verifier`.
//! - OAuth2: ask the authorize API for an auth code (answering its CSRF
//!   challenge once if needed), then approve that code.

use crate::config::{ProviderConfig, RateLimitPolicy};
use crate::error::{XAuthError, XAuthResult};
use crate::parser::{self, AuthCodeOutcome};
use crate::session::{CSRF_HEADER, SessionContext};
use crate::transport::{AuthRequest, AuthResponse, ReqwestTransport, Transport};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;

const INVALID_REQUEST_TOKEN_MARKER: &str = "The request token for this page is invalid";
const SUSPENDED_MARKER: &str = "This account is suspended.";

/// Drives the authorization flows for one account
pub struct XAuth<T: Transport = ReqwestTransport> {
    config: Arc<ProviderConfig>,
    session: SessionContext,
    transport: T,
}

impl XAuth<ReqwestTransport> {
    /// Create a client for the account behind `auth_token`, with the default
    /// provider configuration
    pub fn new(auth_token: &str) -> XAuthResult<Self> {
        Self::with_config(auth_token, ProviderConfig::default())
    }

    /// Create a client with a custom provider configuration
    pub fn with_config(auth_token: &str, config: ProviderConfig) -> XAuthResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let session = SessionContext::new(auth_token, config.clone())?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self {
            config,
            session,
            transport,
        })
    }
}

impl<T: Transport> XAuth<T> {
    /// Create a client that sends its requests through `transport`
    pub fn with_transport(
        auth_token: &str,
        config: ProviderConfig,
        transport: T,
    ) -> XAuthResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let session = SessionContext::new(auth_token, config.clone())?;
        Ok(Self {
            config,
            session,
            transport,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Fetch the OAuth1 authenticate page and scrape its authenticity token
    pub async fn get_twitter_token(&mut self, oauth_token: &str) -> XAuthResult<String> {
        if oauth_token.is_empty() {
            return Err(XAuthError::invalid_input("oauth_token must not be empty"));
        }

        let request = AuthRequest::get(self.config.authenticate_url.as_str())
            .with_query("oauth_token", oauth_token)
            .with_headers(self.session.headers(false));
        let response = self.exchange(&request).await?;

        if !response.body.contains("authenticity_token") {
            if response.body.contains(INVALID_REQUEST_TOKEN_MARKER) {
                return Err(XAuthError::InvalidOAuthToken);
            }
            return Err(XAuthError::extraction("authenticity_token not found in response"));
        }

        parser::authenticity_token(&response.body)
    }

    /// Complete the OAuth1 authorize dialog and return the `oauth_verifier`
    pub async fn oauth1(&mut self, oauth_token: &str) -> XAuthResult<String> {
        let authenticity_token = self.get_twitter_token(oauth_token).await?;

        let request = AuthRequest::post(self.config.authorize_url.as_str())
            .with_form("authenticity_token", authenticity_token)
            .with_form("oauth_token", oauth_token)
            .with_headers(self.session.headers(false));
        let response = self.exchange(&request).await?;

        if !response.body.contains("oauth_verifier") {
            if response.body.contains(SUSPENDED_MARKER) {
                return Err(XAuthError::AccountSuspended);
            }
            return Err(XAuthError::extraction("oauth_verifier not found in response"));
        }

        let verifier = parser::oauth_verifier(&response.body)?;
        tracing::info!("OAuth1 authorization completed");
        Ok(verifier)
    }

    /// Request an OAuth2 auth code for the given authorize parameters.
    ///
    /// Parameters are passed through verbatim as the query string.
    pub async fn get_auth_code<I, K, V>(&mut self, params: I) -> XAuthResult<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let params = collect_params(params);
        self.fetch_auth_code(&params).await
    }

    /// Complete the OAuth2 authorize dialog and return the auth code
    pub async fn oauth2<I, K, V>(&mut self, params: I) -> XAuthResult<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let params = collect_params(params);
        let auth_code = self.fetch_auth_code(&params).await?;

        // Provider headers already carry the CSRF token once ct0 is set
        let request = AuthRequest::post(self.config.oauth2_authorize_url.as_str())
            .with_form("approval", "true")
            .with_form("code", auth_code.as_str())
            .with_headers(self.session.headers(true));
        let response = self.exchange(&request).await?;

        if !response.body.contains("redirect_uri") {
            return Err(XAuthError::extraction("redirect_uri not found in response"));
        }

        tracing::info!("OAuth2 authorization completed");
        Ok(auth_code)
    }

    async fn fetch_auth_code(&mut self, params: &[(String, String)]) -> XAuthResult<String> {
        if params.is_empty() {
            return Err(XAuthError::invalid_input("params must not be empty"));
        }

        let mut request = AuthRequest::get(self.config.oauth2_authorize_url.as_str())
            .with_headers(self.session.headers(true));
        request.query = params.to_vec();

        let response = self.exchange(&request).await?;
        let json = parser::parse_json(&response.body)?;

        if let AuthCodeOutcome::Code(code) =
            parser::classify_auth_code(&json, self.config.csrf_sentinel_code)?
        {
            return Ok(code);
        }

        let csrf = self
            .session
            .csrf_token()
            .ok_or(XAuthError::MissingCsrfCookie)?;
        let csrf = HeaderValue::from_str(csrf)
            .map_err(|_| XAuthError::extraction("ct0 cookie is not a valid header value"))?;

        // One retry only; a second challenge surfaces as a missing auth code
        tracing::debug!("Repeating auth code request with CSRF token");
        let mut csrf_header = HeaderMap::new();
        csrf_header.insert(HeaderName::from_static(CSRF_HEADER), csrf);
        let retry = request.with_headers(csrf_header);

        let response = self.exchange(&retry).await?;
        let json = parser::parse_json(&response.body)?;
        parser::auth_code(&json)
    }

    /// Send one request, applying the rate-limit policy.
    ///
    /// A `429` always pauses for the retry interval. Under
    /// [`RateLimitPolicy::Pause`] the rate-limited response is then returned as
    /// is; under [`RateLimitPolicy::Resend`] the request is sent again, at most
    /// `max_retries` times.
    async fn exchange(&mut self, request: &AuthRequest) -> XAuthResult<AuthResponse> {
        let mut resent = 0;
        loop {
            let response = self.transport.execute(request, &mut self.session).await?;
            tracing::debug!("{:?} {} -> {}", request.method, request.url, response.status);

            if !response.is_rate_limited() {
                return Ok(response);
            }

            tracing::warn!(
                "Rate limited by {}, pausing for {:?}",
                request.url,
                self.config.retry_interval()
            );
            tokio::time::sleep(self.config.retry_interval()).await;

            match self.config.rate_limit {
                RateLimitPolicy::Resend if resent < self.config.max_retries => resent += 1,
                _ => return Ok(response),
            }
        }
    }
}

fn collect_params<I, K, V>(params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .into_iter()
        .map(|(key, value)| (key.as_ref().to_string(), value.as_ref().to_string()))
        .collect()
}
