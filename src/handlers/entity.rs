//! Generic handlers for viewsets and declarative views.

use crate::config::{Query, TableDef, View, ViewSet};
use crate::error::{AppError, ConfigError};
use crate::language::Language;
use crate::response::{success_many, success_one, success_one_ok, success_page, MetaPage};
use crate::serializer::{parse, write::coerce, Mode, ValidationErrors};
use crate::service::{nested, CrudService, ListParams, PageRequest, ReadSpec};
use crate::settings::Settings;
use crate::state::AppState;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

/// Ids in paths must be integers; anything else names no row.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("no row with id '{}'", raw)))
}

pub fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn viewset<'a>(state: &'a AppState, key: &str) -> Result<&'a ViewSet, AppError> {
    state.model.viewset(key).ok_or_else(|| {
        AppError::Config(ConfigError::MissingReference {
            kind: "viewset",
            id: key.to_string(),
        })
    })
}

fn view<'a>(state: &'a AppState, key: &str) -> Result<&'a View, AppError> {
    state.model.view(key).ok_or_else(|| {
        AppError::Config(ConfigError::MissingReference {
            kind: "view",
            id: key.to_string(),
        })
    })
}

/// Filters, search terms and ordering a list request asks for. Unknown parameters are ignored.
pub fn list_params(table: &TableDef, query: &Query, raw: &HashMap<String, String>) -> Result<ListParams, AppError> {
    let mut params = ListParams::default();
    let mut errors = ValidationErrors::new();
    for (param, column) in &query.filter_fields {
        let Some(value) = raw.get(param).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let def = table.get(column).ok_or_else(|| ConfigError::MissingReference {
            kind: "column",
            id: format!("{}.{}", table.name, column),
        })?;
        match coerce(def, &Value::String(value.clone())) {
            Ok(v) => params.equals.push((column.clone(), v)),
            Err(message) => errors.add(param, message),
        }
    }
    if !query.search_fields.is_empty() {
        if let Some(search) = raw.get("search") {
            params.search_terms = search
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
    }
    if let Some(ordering) = raw.get("ordering") {
        params.ordering = ordering
            .split(',')
            .map(str::trim)
            .filter(|o| query.ordering_fields.iter().any(|f| f == o.trim_start_matches('-')))
            .map(String::from)
            .collect();
    }
    errors.into_result()?;
    Ok(params)
}

/// `page` must be a positive integer; `page_size` falls back to the default and is capped.
pub fn page_request(settings: &Settings, raw: &HashMap<String, String>) -> Result<PageRequest, AppError> {
    let page = match raw.get("page") {
        None => 1,
        Some(p) => p
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| AppError::NotFound("Invalid page.".into()))?,
    };
    let page_size = raw
        .get("page_size")
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.min(settings.max_page_size))
        .unwrap_or(settings.page_size);
    Ok(PageRequest { page, page_size })
}

async fn read_list(
    state: &AppState,
    spec: ReadSpec<'_>,
    lang: Language,
    raw: &HashMap<String, String>,
) -> Result<Response, AppError> {
    let table = state.model.table(spec.table)?;
    let params = list_params(table, spec.query, raw)?;
    if spec.query.paginate {
        let page = page_request(&state.settings, raw)?;
        let (rows, total) = CrudService::list_page(&state.pool, &state.model, spec, lang, &params, page).await?;
        Ok(success_page(rows, MetaPage::new(total, page.page, page.page_size)).into_response())
    } else {
        let rows = CrudService::list(&state.pool, &state.model, spec, lang, &params).await?;
        Ok(success_many(rows).into_response())
    }
}

/// Renders a freshly written row with the write serializer.
async fn written(state: &AppState, table: &str, serializer: &str, lang: Language, id: i64) -> Result<Value, AppError> {
    let unscoped = Query::new();
    let spec = ReadSpec {
        table,
        serializer,
        query: &unscoped,
    };
    CrudService::retrieve(&state.pool, &state.model, spec, lang, id).await
}

pub async fn list(state: AppState, key: String, lang: Language, raw: HashMap<String, String>) -> Result<Response, AppError> {
    let vs = viewset(&state, &key)?;
    let spec = ReadSpec {
        table: &vs.table,
        serializer: &vs.list,
        query: &vs.query,
    };
    read_list(&state, spec, lang, &raw).await
}

pub async fn retrieve(state: AppState, key: String, lang: Language, id: String) -> Result<Response, AppError> {
    let vs = viewset(&state, &key)?;
    let id = parse_id(&id)?;
    let spec = ReadSpec {
        table: &vs.table,
        serializer: &vs.retrieve,
        query: &vs.query,
    };
    let row = CrudService::retrieve(&state.pool, &state.model, spec, lang, id).await?;
    Ok(success_one_ok(row).into_response())
}

pub async fn create(
    state: AppState,
    key: String,
    lang: Language,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let vs = viewset(&state, &key)?;
    let data = parse(&state.model, &vs.write, &body(payload)?, Mode::Create)?;
    let id = nested::create(&state.pool, &state.model, &vs.table, &data).await?;
    let row = written(&state, &vs.table, &vs.write, lang, id).await?;
    Ok(success_one(row).into_response())
}

pub async fn update(
    state: AppState,
    key: String,
    lang: Language,
    id: String,
    payload: Result<Json<Value>, JsonRejection>,
    mode: Mode,
) -> Result<Response, AppError> {
    let vs = viewset(&state, &key)?;
    let id = parse_id(&id)?;
    let data = parse(&state.model, &vs.write, &body(payload)?, mode)?;
    nested::update(&state.pool, &state.model, &vs.table, id, &data).await?;
    let row = written(&state, &vs.table, &vs.write, lang, id).await?;
    Ok(success_one_ok(row).into_response())
}

pub async fn destroy(state: AppState, key: String, id: String) -> Result<Response, AppError> {
    let vs = viewset(&state, &key)?;
    let id = parse_id(&id)?;
    CrudService::delete(&state.pool, &state.model, &vs.table, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn view_list(state: AppState, key: String, lang: Language, raw: HashMap<String, String>) -> Result<Response, AppError> {
    let v = view(&state, &key)?;
    let spec = ReadSpec {
        table: &v.table,
        serializer: &v.serializer,
        query: &v.query,
    };
    read_list(&state, spec, lang, &raw).await
}

pub async fn view_retrieve(state: AppState, key: String, lang: Language, id: String) -> Result<Response, AppError> {
    let v = view(&state, &key)?;
    let id = parse_id(&id)?;
    let spec = ReadSpec {
        table: &v.table,
        serializer: &v.serializer,
        query: &v.query,
    };
    let row = CrudService::retrieve(&state.pool, &state.model, spec, lang, id).await?;
    Ok(success_one_ok(row).into_response())
}

pub async fn view_create(
    state: AppState,
    key: String,
    lang: Language,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let v = view(&state, &key)?;
    let data = parse(&state.model, &v.serializer, &body(payload)?, Mode::Create)?;
    let id = nested::create(&state.pool, &state.model, &v.table, &data).await?;
    let row = written(&state, &v.table, &v.serializer, lang, id).await?;
    Ok(success_one(row).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn settings() -> Settings {
        Settings::from_lookup(|k| (k == "DATABASE_URL").then(|| "postgres://localhost/test".to_string())).unwrap()
    }

    #[test]
    fn filters_are_coerced_to_column_types() {
        let model = load().unwrap();
        let vs = model.viewset("catalog.specification").unwrap();
        let table = model.table(&vs.table).unwrap();
        let p = list_params(table, &vs.query, &raw(&[("catalog", "4"), ("is_active", "True"), ("x", "1")])).unwrap();
        assert!(p.equals.contains(&("catalog_id".to_string(), json!(4))));
        assert!(p.equals.contains(&("is_active".to_string(), json!(true))));
        assert_eq!(p.equals.len(), 2);
    }

    #[test]
    fn bad_filter_values_are_validation_errors() {
        let model = load().unwrap();
        let vs = model.viewset("catalog.specification").unwrap();
        let table = model.table(&vs.table).unwrap();
        for bad in ["abc", "1e30", "2.5"] {
            match list_params(table, &vs.query, &raw(&[("catalog", bad)])) {
                Err(AppError::Validation(e)) => assert_eq!(e.messages("catalog"), ["A valid integer is required."]),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn search_and_ordering_only_where_declared() {
        let model = load().unwrap();
        let page = model.view("content.news.page").unwrap();
        let table = model.table(&page.table).unwrap();
        let p = list_params(table, &page.query, &raw(&[("search", "a b"), ("ordering", "-created_at,title_uz")])).unwrap();
        assert!(p.search_terms.is_empty());
        assert_eq!(p.ordering, ["-created_at"]);

        let search = model.view("catalog.search").unwrap();
        let table = model.table(&search.table).unwrap();
        let p = list_params(table, &search.query, &raw(&[("search", "ko'ylak, qizil")])).unwrap();
        assert_eq!(p.search_terms, ["ko'ylak", "qizil"]);
    }

    #[test]
    fn page_size_is_capped() {
        let s = settings();
        assert_eq!(page_request(&s, &raw(&[])).unwrap(), PageRequest { page: 1, page_size: 10 });
        assert_eq!(
            page_request(&s, &raw(&[("page", "3"), ("page_size", "1000")])).unwrap(),
            PageRequest { page: 3, page_size: 100 }
        );
        assert!(matches!(page_request(&s, &raw(&[("page", "0")])), Err(AppError::NotFound(_))));
    }

    #[test]
    fn non_numeric_ids_are_not_found() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert!(matches!(parse_id("abc"), Err(AppError::NotFound(_))));
    }
}
