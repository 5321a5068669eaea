use crate::auth::IdentityError;
use crate::compose::ComposeError;
use crate::ports::push::DispatchError;
use crate::store::{EditError, StoreError};
use crate::validate::ValidationError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Unauthenticated(#[from] IdentityError),
    #[error("Forbidden: {0} is not authorized")]
    Forbidden(String),
    #[error(transparent)]
    InvalidConfig(#[from] ValidationError),
    #[error(transparent)]
    InvalidMessage(#[from] ComposeError),
    #[error("Invalid request body: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Route not found")]
    RouteNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    Dependency,
    MethodNotAllowed,
}

impl ErrorClass {
    pub fn code(self) -> &'static str {
        match self {
            ErrorClass::Authentication => "authentication_error",
            ErrorClass::Authorization => "authorization_error",
            ErrorClass::Validation => "validation_error",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Conflict => "conflict",
            ErrorClass::Dependency => "dependency_error",
            ErrorClass::MethodNotAllowed => "method_not_allowed",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ApiError::Unauthenticated(IdentityError::ProviderUnavailable(_)) => ErrorClass::Dependency,
            ApiError::Unauthenticated(_) => ErrorClass::Authentication,
            ApiError::Forbidden(_) => ErrorClass::Authorization,
            ApiError::InvalidConfig(_) | ApiError::InvalidMessage(_) | ApiError::MalformedBody(_) => {
                ErrorClass::Validation
            }
            ApiError::Edit(_)
            | ApiError::Store(StoreError::KeyNotFound { .. })
            | ApiError::RouteNotFound => ErrorClass::NotFound,
            ApiError::Store(StoreError::PublishConflict) => ErrorClass::Conflict,
            ApiError::Store(_) | ApiError::Dispatch(_) => ErrorClass::Dependency,
            ApiError::MethodNotAllowed => ErrorClass::MethodNotAllowed,
        }
    }

    pub fn status(&self) -> StatusCode {
        if matches!(
            self,
            ApiError::Store(StoreError::Timeout) | ApiError::Dispatch(DispatchError::Timeout)
        ) {
            return StatusCode::GATEWAY_TIMEOUT;
        }
        match self.class() {
            ErrorClass::Authentication => StatusCode::UNAUTHORIZED,
            ErrorClass::Authorization => StatusCode::FORBIDDEN,
            ErrorClass::Validation => StatusCode::BAD_REQUEST,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Conflict => StatusCode::CONFLICT,
            ErrorClass::Dependency => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorClass::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn summary(&self) -> String {
        match self {
            ApiError::Unauthenticated(IdentityError::ProviderUnavailable(_)) => {
                "Identity provider unavailable".to_string()
            }
            ApiError::Store(
                StoreError::KeyNotFound { .. }
                | StoreError::PublishConflict
                | StoreError::CorruptDocument(_),
            ) => {
                self.to_string()
            }
            ApiError::Store(_) => "Remote config request failed".to_string(),
            ApiError::Dispatch(_) => "Failed to send message".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::Unauthenticated(IdentityError::InvalidCredential { reason }) => {
                Some(reason.clone())
            }
            ApiError::Unauthenticated(IdentityError::ProviderUnavailable(detail)) => {
                Some(detail.clone())
            }
            ApiError::Store(StoreError::KeyNotFound { key }) => Some(key.clone()),
            ApiError::Store(StoreError::PublishConflict | StoreError::CorruptDocument(_)) => None,
            ApiError::Store(err) => Some(err.to_string()),
            ApiError::Dispatch(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let class = self.class();
        let body = ErrorBody {
            error: self.summary(),
            code: class.code(),
            details: self.details(),
        };
        if status.is_server_error() {
            tracing::error!(code = class.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = class.code(), error = %self, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
