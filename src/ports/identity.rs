use crate::auth::{IdentityError, VerifiedToken};
use crate::ports::PortFuture;

/// Cryptographic check of a bearer credential against the identity provider.
pub trait IdentityVerifier: Send + Sync + 'static {
    fn verify<'a>(&'a self, token: &'a str) -> PortFuture<'a, VerifiedToken, IdentityError>;
}
