//! Routes generated from the model's viewsets and views.

use crate::config::{ResolvedModel, ViewKind};
use crate::extractors::RequestLanguage;
use crate::handlers::entity;
use crate::serializer::Mode;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;

type Params = Query<HashMap<String, String>>;
type Body = Result<Json<Value>, JsonRejection>;

/// Model paths write the id segment as `{id}`.
pub fn axum_path(path: &str) -> String {
    path.replace("{id}", ":id")
}

fn collection(key: String) -> MethodRouter<AppState> {
    let create_key = key.clone();
    get(
        move |State(state): State<AppState>, RequestLanguage(lang): RequestLanguage, Query(raw): Params| async move {
            entity::list(state, key, lang, raw).await
        },
    )
    .post(
        move |State(state): State<AppState>, RequestLanguage(lang): RequestLanguage, payload: Body| async move {
            entity::create(state, create_key, lang, payload).await
        },
    )
}

fn detail(key: String) -> MethodRouter<AppState> {
    let (put_key, patch_key, delete_key) = (key.clone(), key.clone(), key.clone());
    get(
        move |State(state): State<AppState>, RequestLanguage(lang): RequestLanguage, Path(id): Path<String>| async move {
            entity::retrieve(state, key, lang, id).await
        },
    )
    .put(
        move |State(state): State<AppState>,
              RequestLanguage(lang): RequestLanguage,
              Path(id): Path<String>,
              payload: Body| async move {
            entity::update(state, put_key, lang, id, payload, Mode::Update).await
        },
    )
    .patch(
        move |State(state): State<AppState>,
              RequestLanguage(lang): RequestLanguage,
              Path(id): Path<String>,
              payload: Body| async move {
            entity::update(state, patch_key, lang, id, payload, Mode::PartialUpdate).await
        },
    )
    .delete(move |State(state): State<AppState>, Path(id): Path<String>| async move {
        entity::destroy(state, delete_key, id).await
    })
}

fn view(key: String, kind: ViewKind) -> MethodRouter<AppState> {
    match kind {
        ViewKind::List => get(
            move |State(state): State<AppState>, RequestLanguage(lang): RequestLanguage, Query(raw): Params| async move {
                entity::view_list(state, key, lang, raw).await
            },
        ),
        ViewKind::Retrieve => get(
            move |State(state): State<AppState>, RequestLanguage(lang): RequestLanguage, Path(id): Path<String>| async move {
                entity::view_retrieve(state, key, lang, id).await
            },
        ),
        ViewKind::Create => post(
            move |State(state): State<AppState>, RequestLanguage(lang): RequestLanguage, payload: Body| async move {
                entity::view_create(state, key, lang, payload).await
            },
        ),
    }
}

/// Collection and detail routes per viewset plus one route per view.
pub fn entity_routes(model: &ResolvedModel) -> Router<AppState> {
    let mut router = Router::new();
    for vs in &model.viewsets {
        router = router
            .route(&axum_path(&vs.path), collection(vs.key.clone()))
            .route(&axum_path(&vs.detail_path()), detail(vs.key.clone()));
    }
    for v in &model.views {
        router = router.route(&axum_path(&v.path), view(v.key.clone(), v.kind));
    }
    router
}
