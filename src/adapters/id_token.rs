use crate::auth::{IdentityError, VerifiedToken};
use crate::ports::PortFuture;
use crate::ports::identity::IdentityVerifier;

use base64::{URL_SAFE_NO_PAD, decode_config};
use jwt_simple::algorithms::{RS256PublicKey, RSAPublicKeyLike};
use jwt_simple::prelude::VerificationOptions;
use jwt_simple::token::Token;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const EXPECTED_ALGORITHM: &str = "RS256";
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(60 * 60);
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, Arc<RS256PublicKey>>,
    expires_at: Option<Instant>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at > now)
    }

    fn fresh_key(&self, key_id: &str, now: Instant) -> Option<Arc<RS256PublicKey>> {
        if !self.is_fresh(now) {
            return None;
        }
        self.keys.get(key_id).cloned()
    }

    fn fetched_recently(&self, now: Instant) -> bool {
        self.fetched_at
            .is_some_and(|fetched_at| now.duration_since(fetched_at) < MIN_REFRESH_INTERVAL)
    }
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct Jwk {
    kid: String,
    #[serde(default)]
    kty: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

#[derive(Serialize, Deserialize)]
struct FirebaseClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Verifies Firebase ID tokens against the securetoken signing keys.
#[derive(Clone)]
pub struct FirebaseIdTokenVerifier {
    project_id: String,
    issuer: String,
    keys_url: String,
    http: Client,
    cache: Arc<RwLock<KeyCache>>,
}

impl FirebaseIdTokenVerifier {
    pub fn new(project_id: impl Into<String>, keys_url: impl Into<String>, http: Client) -> Self {
        let project_id = project_id.into();
        Self {
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            project_id,
            keys_url: keys_url.into(),
            http,
            cache: Arc::new(RwLock::new(KeyCache::default())),
        }
    }

    async fn verify_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        let metadata = Token::decode_metadata(token).map_err(IdentityError::invalid)?;
        if metadata.algorithm() != EXPECTED_ALGORITHM {
            return Err(IdentityError::invalid(format!(
                "unexpected algorithm {}",
                metadata.algorithm()
            )));
        }
        let key_id = metadata
            .key_id()
            .ok_or_else(|| IdentityError::invalid("missing key id"))?;
        let key = self.signing_key(key_id).await?;

        let mut options = VerificationOptions::default();
        options.allowed_issuers = Some(HashSet::from([self.issuer.clone()]));
        options.allowed_audiences = Some(HashSet::from([self.project_id.clone()]));

        let claims = key
            .verify_token::<FirebaseClaims>(token, Some(options))
            .map_err(IdentityError::invalid)?;
        if claims.expires_at.is_none() {
            return Err(IdentityError::invalid("missing expiry"));
        }
        let subject = claims
            .subject
            .filter(|subject| !subject.trim().is_empty())
            .ok_or_else(|| IdentityError::invalid("missing subject"))?;

        Ok(VerifiedToken {
            subject,
            email: claims.custom.email,
            claims: claims.custom.extra,
        })
    }

    async fn signing_key(&self, key_id: &str) -> Result<Arc<RS256PublicKey>, IdentityError> {
        if let Some(key) = self.cache.read().await.fresh_key(key_id, Instant::now()) {
            return Ok(key);
        }

        let mut cache = self.cache.write().await;
        let now = Instant::now();
        if let Some(key) = cache.fresh_key(key_id, now) {
            return Ok(key);
        }
        if cache.is_fresh(now) && cache.fetched_recently(now) {
            return Err(IdentityError::invalid("unknown signing key"));
        }
        *cache = self.fetch_keys().await?;
        cache
            .keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| IdentityError::invalid("unknown signing key"))
    }

    async fn fetch_keys(&self) -> Result<KeyCache, IdentityError> {
        let response = self
            .http
            .get(&self.keys_url)
            .send()
            .await
            .map_err(|err| IdentityError::ProviderUnavailable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::ProviderUnavailable(format!(
                "signing key endpoint returned {status}"
            )));
        }
        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEY_TTL);
        let set: JwkSet = response
            .json()
            .await
            .map_err(|err| IdentityError::ProviderUnavailable(err.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in set.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            match decode_jwk(&jwk) {
                Ok(key) => {
                    keys.insert(jwk.kid, Arc::new(key));
                }
                Err(err) => tracing::warn!(kid = %jwk.kid, error = %err, "skipping unusable signing key"),
            }
        }
        tracing::debug!(keys = keys.len(), ttl_secs = ttl.as_secs(), "refreshed identity signing keys");

        let now = Instant::now();
        Ok(KeyCache {
            keys,
            expires_at: Some(now + ttl),
            fetched_at: Some(now),
        })
    }
}

impl IdentityVerifier for FirebaseIdTokenVerifier {
    fn verify<'a>(&'a self, token: &'a str) -> PortFuture<'a, VerifiedToken, IdentityError> {
        Box::pin(self.verify_token(token))
    }
}

fn decode_jwk(jwk: &Jwk) -> Result<RS256PublicKey, String> {
    let n = decode_config(&jwk.n, URL_SAFE_NO_PAD).map_err(|err| err.to_string())?;
    let e = decode_config(&jwk.e, URL_SAFE_NO_PAD).map_err(|err| err.to_string())?;
    RS256PublicKey::from_components(&n, &e).map_err(|err| err.to_string())
}

fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}
