//! Application acceptance.

use crate::config::Query;
use crate::error::AppError;
use crate::handlers::entity::parse_id;
use crate::language::Language;
use crate::response::success_one_ok;
use crate::service::{shopping::accept_application, CrudService, ReadSpec};
use crate::state::AppState;
use axum::response::{IntoResponse, Response};

pub async fn accept(state: AppState, lang: Language, id: String) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    accept_application(&state.pool, id).await?;
    let query = Query::new();
    let spec = ReadSpec {
        table: "applications",
        serializer: "Application",
        query: &query,
    };
    let row = CrudService::retrieve(&state.pool, &state.model, spec, lang, id).await?;
    Ok(success_one_ok(row).into_response())
}
