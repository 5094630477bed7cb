//! OAuth2 authentication for the Circuit API.
//!
//! Only the client-credentials grant is supported. The token is fetched on
//! the first API call and reused until the client is dropped; there is no
//! expiry tracking or refresh.

use log::debug;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};

use crate::circuit::client::CircuitClient;
use crate::circuit::middleware::{check_response, decode_body};
use crate::circuit::models::AccessTokenResponse;
use crate::config::AuthMethod;
use crate::error::{CircuitError, Result};

/// Path of the token endpoint, relative to the host root.
pub const TOKEN_PATH: &str = "/oauth/token";

impl CircuitClient {
    /// The bearer token for API calls, fetched with the configured auth
    /// method on first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unsupported auth method (before
    /// any network call), or whatever the token request fails with.
    pub fn access_token(&self) -> Result<&str> {
        if let Some(token) = self.access_token.get() {
            return Ok(token.expose_secret());
        }

        let token = match &self.config.auth_method {
            AuthMethod::ClientCredentials => self.auth_client_credentials()?,
            AuthMethod::Other(name) => {
                return Err(CircuitError::Config(format!(
                    "unknown auth_method: {name}"
                )));
            }
        };

        let cached = self.access_token.get_or_init(|| SecretString::from(token));
        Ok(cached.expose_secret())
    }

    /// Request a new token with the client-credentials grant.
    ///
    /// This always hits the token endpoint; [`CircuitClient::access_token`]
    /// is the cached entry point.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `client_id` or `client_secret` is
    /// unset, otherwise any HTTP or decoding failure of the token request.
    pub fn auth_client_credentials(&self) -> Result<String> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| CircuitError::Config("client_id parameter required".to_string()))?;
        let client_secret = self
            .config
            .client_secret
            .as_ref()
            .ok_or_else(|| CircuitError::Config("client_secret parameter required".to_string()))?;

        let url = self.config.build_uri(TOKEN_PATH)?;
        debug!("requesting access token for client {client_id} from {url}");

        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
            ("grant_type", "client_credentials"),
            ("scope", self.config.auth_scope.as_str()),
        ];

        let response = self
            .connection()?
            .post(url)
            .timeout(self.config.timeout)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()?;

        let token: AccessTokenResponse =
            decode_body(check_response(response)?, "POST /oauth/token", false)?;
        debug!(
            "obtained {} token (expires in {:?}s)",
            token.token_type.as_deref().unwrap_or("bearer"),
            token.expires_in
        );
        Ok(token.access_token)
    }
}
