//! Client-credentials authentication
//!
//! The crawler requests one bearer token at the start of a run and attaches
//! it to every catalog request.

use crate::CatalogError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;

/// Environment variables holding the API credentials, in lookup order
const CLIENT_ID_VARS: [&str; 2] = ["CLIENT_ID", "client_id"];
const CLIENT_SECRET_VARS: [&str; 2] = ["CLIENT_SECRET", "client_secret"];

/// Application credentials for the client-credentials grant
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads credentials from the process environment
    ///
    /// Callers that want `.env` support load it first (see `main.rs`).
    pub fn from_env() -> Result<Self, CatalogError> {
        Ok(Self {
            client_id: read_var(&CLIENT_ID_VARS)?,
            client_secret: read_var(&CLIENT_SECRET_VARS)?,
        })
    }
}

fn read_var(names: &[&str]) -> Result<String, CatalogError> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| CatalogError::MissingCredential(names[0].to_string()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// A bearer token obtained for this run
#[derive(Clone)]
pub struct AccessToken(String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Headers sent with every catalog request
    pub fn auth_headers(&self) -> Result<HeaderMap, CatalogError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .map_err(|e| CatalogError::Auth(format!("token is not a valid header value: {}", e)))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Exchanges the client credentials for a bearer token
///
/// # Arguments
///
/// * `client` - HTTP client to use
/// * `token_url` - The provider's token endpoint
/// * `credentials` - Application id and secret
///
/// # Returns
///
/// * `Ok(AccessToken)` - Token to reuse for the rest of the run
/// * `Err(CatalogError)` - Transport failure, rejected credentials or malformed response
pub async fn request_token(
    client: &Client,
    token_url: &str,
    credentials: &Credentials,
) -> Result<AccessToken, CatalogError> {
    let response = client
        .post(token_url)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|source| CatalogError::Http {
            url: token_url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::Auth(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body.trim()
        )));
    }

    let token: TokenResponse = response.json().await.map_err(|source| CatalogError::Http {
        url: token_url.to_string(),
        source,
    })?;

    tracing::info!(
        "Obtained {} token (expires in {}s)",
        token.token_type.as_deref().unwrap_or("bearer"),
        token
            .expires_in
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string())
    );

    Ok(AccessToken(token.access_token))
}
