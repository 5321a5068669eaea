use crate::adapters::{FCM_BASE_URL, REMOTE_CONFIG_BASE_URL, SECURETOKEN_JWKS_URL};
use crate::auth::AllowList;

use serde::Deserialize;
use thiserror::Error;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_PARAMETER_KEY: &str = "config_holiday_offset";
pub const DEFAULT_PARAMETER_DESCRIPTION: &str = "Holiday offset configuration array for EthioCal";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid listen address '{0}'")]
    ListenAddr(String),
    #[error("allow-list is empty; configure allowed_emails or pass --allow-email")]
    EmptyAllowList,
    #[error("allow-list entries cannot be empty")]
    BlankEmail,
    #[error("request timeout must be greater than 0")]
    ZeroTimeout,
    #[error("no service account configured; set service_account or GOOGLE_APPLICATION_CREDENTIALS")]
    MissingServiceAccount,
    #[error("invalid service account key {path}: {message}")]
    ServiceAccount { path: PathBuf, message: String },
    #[error("project id is unknown; set project_id or use a key with project_id")]
    MissingProjectId,
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Contents of the TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub project_id: Option<String>,
    pub service_account: Option<PathBuf>,
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    #[serde(default)]
    pub remote_config: RemoteConfigSettings,
    #[serde(default)]
    pub endpoints: Endpoints,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfigSettings {
    pub key: String,
    pub description: String,
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_PARAMETER_KEY.to_string(),
            description: DEFAULT_PARAMETER_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    pub remote_config: String,
    pub messaging: String,
    pub id_token_keys: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            remote_config: REMOTE_CONFIG_BASE_URL.to_string(),
            messaging: FCM_BASE_URL.to_string(),
            id_token_keys: SECURETOKEN_JWKS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub project_id: Option<String>,
    pub service_account: Option<PathBuf>,
    pub allow_list: AllowList,
    pub remote_config: RemoteConfigSettings,
    pub endpoints: Endpoints,
    pub request_timeout: Duration,
}

/// Values given on the command line or through the environment. They win over
/// the file; extra emails are added to the file's allow-list.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub allow_emails: Vec<String>,
    pub service_account: Option<PathBuf>,
}

impl AppConfig {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let listen_raw = overrides
            .listen
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::ListenAddr(listen_raw.clone()))?;

        let allow_list = allow_list_from(file.allowed_emails.into_iter().chain(overrides.allow_emails))?;

        let timeout_secs = file
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let project_id = file
            .project_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        Ok(Self {
            listen,
            project_id,
            service_account: overrides.service_account.or(file.service_account),
            allow_list,
            remote_config: file.remote_config,
            endpoints: file.endpoints,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

pub fn allow_list_from<I>(emails: I) -> Result<AllowList, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let emails = emails
        .into_iter()
        .map(|email| {
            let email = email.trim().to_string();
            if email.is_empty() {
                Err(ConfigError::BlankEmail)
            } else {
                Ok(email)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    if emails.is_empty() {
        return Err(ConfigError::EmptyAllowList);
    }
    Ok(AllowList::new(emails))
}
