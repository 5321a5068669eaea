use crate::auth::{AccessDecision, verify_identity};
use crate::error::ApiError;
use crate::state;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub(crate) async fn auth_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = verify_identity(req.headers(), state.identity.as_ref()).await;
    match state.allow_list.authorize(identity) {
        AccessDecision::Authorized(principal) => {
            tracing::debug!(email = %principal.email, path = %req.uri().path(), "authorized");
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        AccessDecision::Forbidden(email) => {
            tracing::warn!(email = %email, path = %req.uri().path(), "email not on allow-list");
            ApiError::Forbidden(email).into_response()
        }
        AccessDecision::Unauthenticated(err) => ApiError::Unauthenticated(err).into_response(),
    }
}
