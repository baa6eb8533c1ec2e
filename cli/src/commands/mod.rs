//! Authorization commands
//!
//! - `xauth oauth1` - Approve an OAuth1 request token and print the verifier
//! - `xauth oauth2` - Approve an OAuth2 authorize request and print the auth code

use clap::Subcommand;
use xauth::{ProviderConfig, XAuth};

#[derive(Subcommand, PartialEq, Debug)]
pub enum Commands {
    /// Authorize an OAuth1 request token and print the oauth_verifier
    Oauth1 {
        /// The oauth_token issued to the application
        #[arg(long = "oauth-token")]
        oauth_token: String,
    },

    /// Authorize an OAuth2 client and print the auth code
    Oauth2 {
        /// Authorize request parameter as key=value (repeatable), e.g.
        /// client_id, redirect_uri, response_type, scope, state, code_challenge
        #[arg(short = 'p', long = "param", required = true, value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

impl Commands {
    /// Run the command, returning the artifact to print
    pub async fn run(self, auth_token: &str, config: ProviderConfig) -> Result<String, String> {
        let mut auth = XAuth::with_config(auth_token, config).map_err(|e| e.to_string())?;

        match self {
            Commands::Oauth1 { oauth_token } => auth
                .oauth1(&oauth_token)
                .await
                .map_err(|e| format!("OAuth1 authorization failed: {}", e)),
            Commands::Oauth2 { params } => auth
                .oauth2(params)
                .await
                .map_err(|e| format!("OAuth2 authorization failed: {}", e)),
        }
    }
}

/// Parse a `key=value` argument. The value may itself contain `=`.
fn parse_key_val(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", arg)),
    }
}
