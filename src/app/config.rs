use crate::app::extract::{JsonBody, PathParam};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::state;
use crate::store;
use crate::types::holiday::HolidayOffsetConfig;
use crate::validate::{validate_config_array, validate_entry};

use axum::Extension;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UPDATED_MESSAGE: &str = "Remote config updated successfully";

#[derive(Serialize)]
pub(crate) struct ConfigResponse {
    success: bool,
    data: Vec<HolidayOffsetConfig>,
    email: String,
}

#[derive(Deserialize)]
pub(crate) struct ConfigUpdateRequest {
    #[serde(rename = "configArray", default)]
    config_array: Value,
}

#[derive(Serialize)]
pub(crate) struct UpdateResponse {
    success: bool,
    message: &'static str,
    version: String,
    email: String,
}

#[derive(Deserialize)]
pub(crate) struct EntryRequest {
    #[serde(default)]
    entry: Value,
}

#[derive(Serialize)]
pub(crate) struct EntryResponse {
    success: bool,
    message: &'static str,
    index: usize,
    version: String,
    email: String,
}

pub(crate) async fn get_config(
    State(state): State<state::AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let document = state.repository.read().await?;
    tracing::info!(
        email = %principal.email,
        entries = document.entries.len(),
        "remote config read"
    );
    Ok(Json(ConfigResponse {
        success: true,
        data: document.entries,
        email: principal.email,
    }))
}

pub(crate) async fn update_config(
    State(state): State<state::AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(request): JsonBody<ConfigUpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let submitted = validate_config_array(&request.config_array)?;
    let current = state.repository.read_for_replace().await?;
    let now = store::unix_millis(state.clock.now());
    let entries = store::stamp_submitted(&current.entries, submitted, now);
    let version = state.repository.write(&entries, &current.revision).await?;
    tracing::info!(
        email = %principal.email,
        version = %version,
        entries = entries.len(),
        "remote config updated"
    );
    Ok(Json(UpdateResponse {
        success: true,
        message: UPDATED_MESSAGE,
        version,
        email: principal.email,
    }))
}

pub(crate) async fn append_entry(
    State(state): State<state::AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(request): JsonBody<EntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = validate_entry(0, &request.entry)?;
    let mut document = state.repository.read_or_empty().await?;
    let now = store::unix_millis(state.clock.now());
    let index = store::append_entry(&mut document.entries, entry, now);
    let version = state
        .repository
        .write(&document.entries, &document.revision)
        .await?;
    tracing::info!(email = %principal.email, index, version = %version, "config entry added");
    Ok(Json(EntryResponse {
        success: true,
        message: "Config entry added",
        index,
        version,
        email: principal.email,
    }))
}

pub(crate) async fn replace_entry(
    State(state): State<state::AppState>,
    Extension(principal): Extension<Principal>,
    PathParam(index): PathParam<usize>,
    JsonBody(request): JsonBody<EntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = validate_entry(index, &request.entry)?;
    let mut document = state.repository.read().await?;
    let now = store::unix_millis(state.clock.now());
    store::replace_entry(&mut document.entries, index, entry, now)?;
    let version = state
        .repository
        .write(&document.entries, &document.revision)
        .await?;
    tracing::info!(email = %principal.email, index, version = %version, "config entry updated");
    Ok(Json(EntryResponse {
        success: true,
        message: "Config entry updated",
        index,
        version,
        email: principal.email,
    }))
}

pub(crate) async fn delete_entry(
    State(state): State<state::AppState>,
    Extension(principal): Extension<Principal>,
    PathParam(index): PathParam<usize>,
) -> Result<Json<EntryResponse>, ApiError> {
    let mut document = state.repository.read().await?;
    let removed = store::remove_entry(&mut document.entries, index)?;
    let version = state
        .repository
        .write(&document.entries, &document.revision)
        .await?;
    tracing::info!(
        email = %principal.email,
        index,
        description = removed.description().unwrap_or_default(),
        version = %version,
        "config entry deleted"
    );
    Ok(Json(EntryResponse {
        success: true,
        message: "Config entry deleted",
        index,
        version,
        email: principal.email,
    }))
}
