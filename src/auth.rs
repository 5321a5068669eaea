use crate::ports::identity::IdentityVerifier;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde_json::{Map, Value};
use thiserror::Error;

use std::collections::BTreeSet;
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Unauthorized: No token provided")]
    NoCredential,
    #[error("Invalid token")]
    InvalidCredential { reason: String },
    #[error("Unauthorized: No email in token")]
    NoEmailClaim,
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl IdentityError {
    pub(crate) fn invalid(reason: impl std::fmt::Display) -> Self {
        IdentityError::InvalidCredential {
            reason: reason.to_string(),
        }
    }
}

/// Claims of a credential the identity provider vouched for.
#[derive(Debug, Clone, Default)]
pub struct VerifiedToken {
    pub subject: String,
    pub email: Option<String>,
    pub claims: Map<String, Value>,
}

impl VerifiedToken {
    pub fn into_principal(self) -> Result<Principal, IdentityError> {
        match self.email {
            Some(email) if !email.is_empty() => Ok(Principal {
                email,
                claims: self.claims,
            }),
            _ => Err(IdentityError::NoEmailClaim),
        }
    }
}

/// The verified caller of a single request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub email: String,
    pub claims: Map<String, Value>,
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(IdentityError::NoCredential)?;
    let token = raw
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .ok_or(IdentityError::NoCredential)?;
    if token.is_empty() {
        return Err(IdentityError::NoCredential);
    }
    Ok(token)
}

pub async fn verify_identity(
    headers: &HeaderMap,
    verifier: &dyn IdentityVerifier,
) -> Result<Principal, IdentityError> {
    let token = bearer_token(headers)?;
    verifier.verify(token).await?.into_principal()
}

/// Emails allowed to use the admin surface. Fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct AllowList {
    emails: Arc<BTreeSet<String>>,
}

#[derive(Debug)]
pub enum AccessDecision {
    Authorized(Principal),
    Unauthenticated(IdentityError),
    Forbidden(String),
}

impl AllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: Arc::new(emails.into_iter().map(Into::into).collect()),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn authorize(&self, identity: Result<Principal, IdentityError>) -> AccessDecision {
        match identity {
            Ok(principal) if self.contains(&principal.email) => {
                AccessDecision::Authorized(principal)
            }
            Ok(principal) => AccessDecision::Forbidden(principal.email),
            Err(err) => AccessDecision::Unauthenticated(err),
        }
    }
}
