use crate::config::ConfigError;

use jwt_simple::algorithms::{RS256KeyPair, RSAKeyPairLike};
use jwt_simple::prelude::{Claims, Duration as JwtDuration};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase.messaging",
    "https://www.googleapis.com/auth/firebase.remoteconfig",
];
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid service account key: {0}")]
    InvalidKey(String),
    #[error("failed to sign token request: {0}")]
    Signing(String),
    #[error("token endpoint rejected the request ({status}): {message}")]
    Exchange { status: u16, message: String },
    #[error("token request timed out")]
    Timeout,
    #[error("token request failed: {0}")]
    Transport(String),
}

/// Google service account key file. Intentionally not `Debug`.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::ServiceAccount {
            path: path.to_path_buf(),
            message,
        };
        let raw = std::fs::read_to_string(path).map_err(|err| invalid(err.to_string()))?;
        serde_json::from_str(&raw).map_err(|err| invalid(err.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct ScopeClaims {
    scope: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

struct TokenSourceInner {
    client_email: String,
    token_uri: String,
    signing_key: RS256KeyPair,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

/// Mints OAuth2 access tokens for Google APIs from a service account key and
/// caches them until shortly before they expire.
#[derive(Clone)]
pub struct AccessTokenSource {
    inner: Arc<TokenSourceInner>,
}

impl AccessTokenSource {
    pub fn new(key: ServiceAccountKey, http: Client) -> Result<Self, TokenError> {
        let mut signing_key = RS256KeyPair::from_pem(&key.private_key)
            .map_err(|err| TokenError::InvalidKey(err.to_string()))?;
        if let Some(key_id) = key.private_key_id.as_deref() {
            signing_key = signing_key.with_key_id(key_id);
        }
        Ok(Self {
            inner: Arc::new(TokenSourceInner {
                client_email: key.client_email,
                token_uri: key.token_uri,
                signing_key,
                http,
                cached: Mutex::new(None),
            }),
        })
    }

    pub async fn access_token(&self) -> Result<String, TokenError> {
        let mut cached = self.inner.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now() + REFRESH_MARGIN
        {
            return Ok(token.value.clone());
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self) -> Result<CachedToken, TokenError> {
        let claims = Claims::with_custom_claims(
            ScopeClaims {
                scope: SCOPES.join(" "),
            },
            JwtDuration::from_hours(1),
        )
        .with_issuer(&self.inner.client_email)
        .with_audience(&self.inner.token_uri);
        let assertion = self
            .inner
            .signing_key
            .sign(claims)
            .map_err(|err| TokenError::Signing(err.to_string()))?;

        let response = self
            .inner
            .http
            .post(&self.inner.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(token_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Exchange {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }
        let token: TokenResponse = response.json().await.map_err(token_transport_error)?;
        tracing::debug!(expires_in = token.expires_in, "minted access token");
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

fn token_transport_error(err: reqwest::Error) -> TokenError {
    if err.is_timeout() {
        TokenError::Timeout
    } else {
        TokenError::Transport(err.to_string())
    }
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Extracts the human-readable part of a Google API error body.
pub(crate) fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<GoogleErrorBody>(body) {
        Ok(parsed) if !parsed.error.status.is_empty() => {
            format!("{}: {}", parsed.error.status, parsed.error.message)
        }
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().chars().take(MAX_ERROR_BODY).collect(),
    }
}
