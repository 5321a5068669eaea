use crate::app::extract::JsonBody;
use crate::auth::Principal;
use crate::compose::compose;
use crate::error::ApiError;
use crate::state;
use crate::types::message::MessageRequest;

use axum::Extension;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendResponse {
    success: bool,
    message_id: String,
    sent_to: String,
    email: String,
}

pub(crate) async fn send_message(
    State(state): State<state::AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(request): JsonBody<MessageRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let payload = compose(&request)?;
    let message_id = state.dispatcher.send(&payload).await?;
    let sent_to = payload.target.address().to_string();
    tracing::info!(
        email = %principal.email,
        sent_to = %sent_to,
        message_id = %message_id,
        "message sent"
    );
    Ok(Json(SendResponse {
        success: true,
        message_id,
        sent_to,
        email: principal.email,
    }))
}
