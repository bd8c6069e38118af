//! Extract the response language from the `Accept-Language` header.

use crate::language::Language;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header::ACCEPT_LANGUAGE, http::request::Parts};

/// Best supported language the client accepts, else the configured default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestLanguage(pub Language);

#[async_trait]
impl FromRequestParts<AppState> for RequestLanguage {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(Language::negotiate)
            .unwrap_or(state.settings.default_language);
        Ok(RequestLanguage(lang))
    }
}
