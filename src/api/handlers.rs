//! HTTP handlers for connections and profiles

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::ApiError;
use super::AppState;
use crate::connection::{ConnectRequest, ConnectionDto};
use crate::error::{VpnctlError, VpnctlResult};
use crate::profile::{CreateProfileRequest, Profile, UpdateProfileRequest};
use crate::validation;

/// Decode a JSON body; undecodable input is a ParseError (400)
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> VpnctlResult<T> {
    if body.is_empty() {
        return Err(VpnctlError::ParseError("request body is empty".to_string()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Connection Endpoints
// ============================================================================

pub async fn list_connections(State(state): State<AppState>) -> Json<Vec<ConnectionDto>> {
    debug!("Listing connections");
    Json(state.connections.list().await)
}

pub async fn get_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionDto>, ApiError> {
    validation::validate_connection_id(&id)?;
    let connection = state
        .connections
        .get(&id)
        .await
        .ok_or_else(|| VpnctlError::NotFound(format!("connection {} not found", id)))?;
    Ok(Json(connection))
}

pub async fn connect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ConnectionDto>, ApiError> {
    let req: ConnectRequest = parse_body(&body)?;
    info!("Connect request for {} (profile {})", id, req.profile_id);

    let connection = state.connections.connect(&id, &req.profile_id).await?;
    Ok(Json(connection))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionDto>, ApiError> {
    validation::validate_connection_id(&id)?;
    info!("Disconnect request for {}", id);

    let connection = state
        .connections
        .disconnect(&id)
        .await?
        .ok_or_else(|| VpnctlError::NotFound(format!("connection {} not found", id)))?;
    Ok(Json(connection))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionDto>, ApiError> {
    validation::validate_connection_id(&id)?;
    info!("Cancel request for {}", id);

    let connection = state.connections.cancel(&id).await?;
    Ok(Json(connection))
}

// ============================================================================
// Profile Endpoints
// ============================================================================

pub async fn list_profiles(State(state): State<AppState>) -> Json<Vec<Profile>> {
    debug!("Listing profiles");
    Json(state.profiles.list().await)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state
        .profiles
        .get(&id)
        .await
        .ok_or_else(|| VpnctlError::NotFound(format!("profile {} not found", id)))?;
    Ok(Json(profile))
}

pub async fn create_profile(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: CreateProfileRequest = parse_body(&body)?;
    let profile = state.profiles.create(req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Profile>, ApiError> {
    let req: UpdateProfileRequest = parse_body(&body)?;
    let profile = state.profiles.update(&id, req).await?;
    Ok(Json(profile))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.profiles.delete(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(VpnctlError::NotFound(format!("profile {} not found", id)).into())
    }
}
