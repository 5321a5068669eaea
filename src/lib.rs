pub mod adapters;
mod app;
pub mod auth;
pub mod compose;
pub mod config;
pub mod error;
pub mod ports;
pub mod state;
pub mod store;
#[cfg(test)]
mod testing;
pub mod types;
pub mod validate;

pub use app::app;

use config::{AppConfig, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn serve(config: AppConfig) -> Result<(), ServeError> {
    let state = state::AppState::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.listen,
            source,
        })?;
    tracing::info!(addr = %config.listen, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
