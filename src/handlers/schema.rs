//! OpenAPI document for the mounted routes.

use crate::error::AppError;
use crate::openapi;
use crate::state::AppState;
use axum::{extract::State, Json};
use utoipa::openapi::OpenApi;

pub async fn schema(State(state): State<AppState>) -> Result<Json<OpenApi>, AppError> {
    Ok(Json(openapi::document(&state.model)?))
}
