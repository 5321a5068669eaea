use crate::adapters::{
    AccessTokenSource, FcmDispatcher, FirebaseIdTokenVerifier, RemoteConfigClient,
    ServiceAccountKey, SystemTimeProvider,
};
use crate::auth::AllowList;
use crate::config::{AppConfig, ConfigError};
use crate::ports::identity::IdentityVerifier;
use crate::ports::push::PushDispatcher;
use crate::ports::time::TimeProvider;
use crate::store::ConfigRepository;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub allow_list: AllowList,
    pub identity: Arc<dyn IdentityVerifier>,
    pub repository: ConfigRepository,
    pub dispatcher: Arc<dyn PushDispatcher>,
    pub clock: Arc<dyn TimeProvider>,
}

impl AppState {
    /// Wires the Google-backed adapters from a resolved configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let key_path = config
            .service_account
            .as_deref()
            .ok_or(ConfigError::MissingServiceAccount)?;
        let key = ServiceAccountKey::load(key_path)?;
        let project_id = config
            .project_id
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or(ConfigError::MissingProjectId)?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;
        let tokens = AccessTokenSource::new(key, http.clone()).map_err(|err| {
            ConfigError::ServiceAccount {
                path: key_path.to_path_buf(),
                message: err.to_string(),
            }
        })?;

        let endpoints = &config.endpoints;
        let store = RemoteConfigClient::new(
            &endpoints.remote_config,
            &project_id,
            http.clone(),
            tokens.clone(),
        );
        let dispatcher = FcmDispatcher::new(&endpoints.messaging, &project_id, http.clone(), tokens);
        let identity = FirebaseIdTokenVerifier::new(&project_id, &endpoints.id_token_keys, http);

        tracing::info!(
            project_id = %project_id,
            parameter = %config.remote_config.key,
            allowed = config.allow_list.len(),
            "admin state ready"
        );

        Ok(Self {
            allow_list: config.allow_list.clone(),
            identity: Arc::new(identity),
            repository: ConfigRepository::new(Arc::new(store), config.remote_config.clone()),
            dispatcher: Arc::new(dispatcher),
            clock: Arc::new(SystemTimeProvider),
        })
    }
}
