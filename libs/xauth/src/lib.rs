//! Cookie-driven OAuth consent for X (Twitter)
//!
//! This crate completes the platform's web OAuth1 and OAuth2 authorization
//! dialogs on behalf of an account that is already signed in, using only the
//! account's `auth_token` session cookie. It replays the requests a browser
//! would make and scrapes the resulting tokens out of HTML and JSON bodies.
//!
//! # Architecture
//!
//! - `account`: account-state classification of provider error codes
//! - `config`: provider endpoints, header constants and retry policy
//! - `error`: Error types for the authentication flows
//! - `parser`: token, verifier and auth-code extraction
//! - `sequencer`: the ordered OAuth1 / OAuth2 request chains
//! - `session`: cookie jar and header sets for one authentication run
//! - `transport`: HTTP transport trait and the reqwest implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use xauth::XAuth;
//!
//! # async fn run() -> xauth::XAuthResult<()> {
//! let mut auth = XAuth::new("auth-token-cookie-value")?;
//!
//! let verifier = auth.oauth1("request-token").await?;
//!
//! let code = auth
//!     .oauth2([
//!         ("client_id", "my-client"),
//!         ("redirect_uri", "https://example.com/callback"),
//!         ("response_type", "code"),
//!         ("scope", "tweet.read users.read"),
//!         ("state", "state"),
//!         ("code_challenge", "challenge"),
//!         ("code_challenge_method", "plain"),
//!     ])
//!     .await?;
//! # let _ = (verifier, code);
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod config;
pub mod error;
pub mod parser;
pub mod sequencer;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use account::AccountState;
pub use config::{ProviderConfig, RateLimitPolicy};
pub use error::{XAuthError, XAuthResult};
pub use parser::AuthCodeOutcome;
pub use sequencer::XAuth;
pub use session::{Cookie, SessionContext};
pub use transport::{AuthRequest, AuthResponse, Method, ReqwestTransport, Transport};
