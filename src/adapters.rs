use crate::ports;

use time::OffsetDateTime;

mod google;
mod id_token;
mod messaging;
mod remote_config;

pub use google::{AccessTokenSource, ServiceAccountKey, TokenError};
pub use id_token::{FirebaseIdTokenVerifier, SECURETOKEN_JWKS_URL};
pub use messaging::{FCM_BASE_URL, FcmDispatcher};
pub use remote_config::{REMOTE_CONFIG_BASE_URL, RemoteConfigClient};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl ports::time::TimeProvider for SystemTimeProvider {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
