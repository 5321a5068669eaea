use crate::adapters::google::{AccessTokenSource, api_error_message};
use crate::ports::PortFuture;
use crate::ports::push::{DispatchError, PushDispatcher};
use crate::types::message::NotificationPayload;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const FCM_BASE_URL: &str = "https://fcm.googleapis.com";

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a NotificationPayload,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    name: Option<String>,
}

/// Sends composed payloads through FCM HTTP v1. One attempt per message.
#[derive(Clone)]
pub struct FcmDispatcher {
    url: String,
    http: Client,
    tokens: AccessTokenSource,
}

impl FcmDispatcher {
    pub fn new(base_url: &str, project_id: &str, http: Client, tokens: AccessTokenSource) -> Self {
        Self {
            url: send_url(base_url, project_id),
            http,
            tokens,
        }
    }

    async fn send_payload(&self, payload: &NotificationPayload) -> Result<String, DispatchError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|err| DispatchError::Credentials(err.to_string()))?;
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .json(&SendRequest { message: payload })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::GATEWAY_TIMEOUT {
            return Err(DispatchError::Timeout);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }
        let body: SendResponse = response.json().await.map_err(transport_error)?;
        body.name
            .filter(|name| !name.is_empty())
            .ok_or(DispatchError::MissingMessageId)
    }
}

impl PushDispatcher for FcmDispatcher {
    fn send<'a>(&'a self, payload: &'a NotificationPayload) -> PortFuture<'a, String, DispatchError> {
        Box::pin(self.send_payload(payload))
    }
}

fn send_url(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/v1/projects/{project_id}/messages:send",
        base_url.trim_end_matches('/')
    )
}

fn transport_error(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Timeout
    } else {
        DispatchError::Transport(err.to_string())
    }
}
