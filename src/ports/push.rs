use crate::ports::PortFuture;
use crate::types::message::NotificationPayload;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("push channel rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("push channel request timed out")]
    Timeout,
    #[error("push channel request failed: {0}")]
    Transport(String),
    #[error("failed to obtain push channel credentials: {0}")]
    Credentials(String),
    #[error("push channel response carried no message id")]
    MissingMessageId,
}

/// Hands a composed payload to the push channel once and returns the
/// channel-assigned message id.
pub trait PushDispatcher: Send + Sync + 'static {
    fn send<'a>(&'a self, payload: &'a NotificationPayload) -> PortFuture<'a, String, DispatchError>;
}
