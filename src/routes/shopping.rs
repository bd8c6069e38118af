//! Shopping actions outside the generated routes.

use crate::apps::shopping::ACCEPT_PATH;
use crate::extractors::RequestLanguage;
use crate::handlers::shopping::accept;
use crate::routes::entity::axum_path;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Router,
};

pub fn shopping_routes() -> Router<AppState> {
    Router::new().route(
        &axum_path(ACCEPT_PATH),
        post(
            |State(state): State<AppState>, RequestLanguage(lang): RequestLanguage, Path(id): Path<String>| async move {
                accept(state, lang, id).await
            },
        ),
    )
}
