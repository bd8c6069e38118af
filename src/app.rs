//! Router assembly and the middleware stack.

use crate::error::ConfigError;
use crate::handlers::schema::schema;
use crate::openapi::API_PREFIX;
use crate::routes::{common_routes, entity_routes, shopping_routes};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT_LANGUAGE, CONTENT_TYPE},
        HeaderValue, Method, Request,
    },
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

#[derive(Clone, Copy, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string()).ok().map(RequestId::new)
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, ACCEPT_LANGUAGE]);
    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| ConfigError::Env {
                key: "CORS_ORIGINS",
                message: format!("invalid origin: {}", origin),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(origins))
}

/// All routes without middleware: common routes at the root, the API under `/api/v1`.
pub fn router(state: AppState) -> Router {
    let api = entity_routes(&state.model)
        .merge(shopping_routes())
        .route("/schema/", get(schema));
    Router::new()
        .merge(common_routes())
        .nest(API_PREFIX, api)
        .with_state(state)
}

/// Router with request ids, tracing, CORS and the body size limit.
pub fn build(state: AppState) -> Result<Router, ConfigError> {
    let cors = cors_layer(&state.settings.cors_origins)?;
    let max_body_size = state.settings.max_body_size;
    Ok(router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(max_body_size))
            .layer(cors),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_rejects_bad_origins() {
        assert!(cors_layer(&[]).is_ok());
        assert!(cors_layer(&["https://shop.uz".to_string()]).is_ok());
        assert!(matches!(
            cors_layer(&["bad\norigin".to_string()]),
            Err(ConfigError::Env { key: "CORS_ORIGINS", .. })
        ));
    }
}
