//! Generic reads and deletes rendered through serializers.

use crate::config::{Query, ResolvedModel};
use crate::error::AppError;
use crate::language::Language;
use crate::serializer::json_object;
use crate::sql::{count, delete, select_json, Criteria};
use serde_json::Value;
use sqlx::PgPool;

/// Table, serializer and fixed query a read runs against.
#[derive(Clone, Copy, Debug)]
pub struct ReadSpec<'a> {
    pub table: &'a str,
    pub serializer: &'a str,
    pub query: &'a Query,
}

/// What a list request adds on top of the view's own query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListParams {
    pub equals: Vec<(String, Value)>,
    pub search_terms: Vec<String>,
    /// Replaces the default ordering when set.
    pub ordering: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

pub struct CrudService;

impl CrudService {
    fn criteria(query: &Query, params: &ListParams) -> Criteria {
        let mut equals = query.scope.clone();
        equals.extend(params.equals.iter().cloned());
        let ordering = if params.ordering.is_empty() {
            query.ordering.clone()
        } else {
            params.ordering.clone()
        };
        Criteria {
            id: None,
            equals,
            search_terms: params.search_terms.clone(),
            search_columns: query.search_fields.clone(),
            ordering,
        }
    }

    /// Unpaginated list, capped by the view's own limit.
    pub async fn list(
        pool: &PgPool,
        model: &ResolvedModel,
        spec: ReadSpec<'_>,
        lang: Language,
        params: &ListParams,
    ) -> Result<Vec<Value>, AppError> {
        let table = model.table(spec.table)?;
        let projection = json_object(model, spec.serializer, lang)?;
        let q = select_json(table, &projection, &Self::criteria(spec.query, params), spec.query.limit, None);
        Ok(q.scalar::<Value>().fetch_all(pool).await?)
    }

    /// One page plus the total row count. Pages past the end are not found.
    pub async fn list_page(
        pool: &PgPool,
        model: &ResolvedModel,
        spec: ReadSpec<'_>,
        lang: Language,
        params: &ListParams,
        page: PageRequest,
    ) -> Result<(Vec<Value>, u64), AppError> {
        let table = model.table(spec.table)?;
        let criteria = Self::criteria(spec.query, params);
        let total: i64 = count(table, &criteria).scalar::<i64>().fetch_one(pool).await?;
        let total = total.max(0) as u64;
        let offset = u64::from(page.page - 1) * u64::from(page.page_size);
        if page.page > 1 && offset >= total {
            return Err(AppError::NotFound("Invalid page.".into()));
        }
        let projection = json_object(model, spec.serializer, lang)?;
        let q = select_json(
            table,
            &projection,
            &criteria,
            Some(page.page_size),
            Some(u32::try_from(offset).unwrap_or(u32::MAX)),
        );
        let rows = q.scalar::<Value>().fetch_all(pool).await?;
        Ok((rows, total))
    }

    /// One row within the view's scope.
    pub async fn retrieve(
        pool: &PgPool,
        model: &ResolvedModel,
        spec: ReadSpec<'_>,
        lang: Language,
        id: i64,
    ) -> Result<Value, AppError> {
        let table = model.table(spec.table)?;
        let projection = json_object(model, spec.serializer, lang)?;
        let criteria = Criteria {
            id: Some(id),
            equals: spec.query.scope.clone(),
            ..Criteria::default()
        };
        let q = select_json(table, &projection, &criteria, None, None);
        q.scalar::<Value>()
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", table.name, id)))
    }

    /// Delete by id; children and join rows follow their ON DELETE rules.
    pub async fn delete(pool: &PgPool, model: &ResolvedModel, table: &str, id: i64) -> Result<(), AppError> {
        let table = model.table(table)?;
        delete(table, id)
            .scalar::<i64>()
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", table.name, id)))?;
        tracing::info!(table = %table.name, id, "deleted");
        Ok(())
    }
}
