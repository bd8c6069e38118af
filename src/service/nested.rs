//! Transactional writes: parent row, join-table links and replaced child sets.
//!
//! A create or update either applies completely or not at all. Every referenced
//! id is checked inside the transaction before anything is written.

use crate::config::{ResolvedModel, TableDef};
use crate::error::AppError;
use crate::serializer::{Link, Reference, ValidationErrors, WriteData};
use crate::sql::{delete_children, existing_ids, insert, link, unlink, update as update_row};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

/// Insert the parent, its links and every child; returns the new id.
pub async fn create(pool: &PgPool, model: &ResolvedModel, table: &str, data: &WriteData) -> Result<i64, AppError> {
    let table = model.table(table)?;
    let mut tx = pool.begin().await?;
    check_references(&mut tx, data).await?;
    let id = insert_one(&mut tx, model, table, data.columns.clone(), &data.links).await?;
    create_children(&mut tx, model, id, data).await?;
    tx.commit().await?;
    tracing::info!(table = %table.name, id, children = child_count(data), "created");
    Ok(id)
}

/// Update the parent; present links and child sets replace the stored ones.
pub async fn update(
    pool: &PgPool,
    model: &ResolvedModel,
    table: &str,
    id: i64,
    data: &WriteData,
) -> Result<(), AppError> {
    let table = model.table(table)?;
    let mut tx = pool.begin().await?;
    check_references(&mut tx, data).await?;
    update_row(table, id, &data.columns)
        .scalar::<i64>()
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", table.name, id)))?;
    for l in &data.links {
        let m = model.through(&l.through)?;
        unlink(m, id).query().execute(&mut *tx).await?;
        link_ids(&mut tx, model, id, l).await?;
    }
    for set in &data.children {
        let child = model.table(&set.table)?;
        let removed = delete_children(child, &set.fk, id).query().execute(&mut *tx).await?;
        tracing::debug!(table = %child.name, parent = id, removed = removed.rows_affected(), "children cleared");
    }
    create_children(&mut tx, model, id, data).await?;
    tx.commit().await?;
    tracing::info!(table = %table.name, id, children = child_count(data), "updated");
    Ok(())
}

fn child_count(data: &WriteData) -> usize {
    data.children.iter().map(|s| s.items.len()).sum()
}

async fn create_children(
    conn: &mut PgConnection,
    model: &ResolvedModel,
    parent_id: i64,
    data: &WriteData,
) -> Result<(), AppError> {
    for set in &data.children {
        let child = model.table(&set.table)?;
        for item in &set.items {
            let mut columns = item.columns.clone();
            columns.push((set.fk.clone(), Value::from(parent_id)));
            insert_one(conn, model, child, columns, &item.links).await?;
        }
    }
    Ok(())
}

async fn insert_one(
    conn: &mut PgConnection,
    model: &ResolvedModel,
    table: &TableDef,
    columns: Vec<(String, Value)>,
    links: &[Link],
) -> Result<i64, AppError> {
    let id = insert(table, &columns).scalar::<i64>().fetch_one(&mut *conn).await?;
    for l in links {
        link_ids(conn, model, id, l).await?;
    }
    Ok(id)
}

async fn link_ids(conn: &mut PgConnection, model: &ResolvedModel, owner_id: i64, l: &Link) -> Result<(), AppError> {
    if l.ids.is_empty() {
        return Ok(());
    }
    let m = model.through(&l.through)?;
    link(m, owner_id, &l.ids).query().execute(&mut *conn).await?;
    Ok(())
}

/// Message for the first id of `r` that does not exist, if any.
async fn missing(conn: &mut PgConnection, r: &Reference) -> Result<Option<String>, AppError> {
    if r.ids.is_empty() {
        return Ok(None);
    }
    let found: Vec<i64> = existing_ids(&r.table, &r.ids).scalar::<i64>().fetch_all(&mut *conn).await?;
    Ok(r
        .ids
        .iter()
        .find(|id| !found.contains(id))
        .map(|id| format!("Invalid pk \"{}\" - object does not exist.", id)))
}

async fn check_references(conn: &mut PgConnection, data: &WriteData) -> Result<(), AppError> {
    let mut errors = ValidationErrors::new();
    for r in &data.references {
        if let Some(message) = missing(conn, r).await? {
            errors.add(&r.field, message);
        }
    }
    for set in &data.children {
        let mut items = Vec::with_capacity(set.items.len());
        for item in &set.items {
            let mut e = ValidationErrors::new();
            for r in &item.references {
                if let Some(message) = missing(conn, r).await? {
                    e.add(&r.field, message);
                }
            }
            items.push(e);
        }
        errors.add_items(&set.field, items);
    }
    if !errors.is_empty() {
        tracing::debug!(fields = %errors, "unknown references");
    }
    errors.into_result()?;
    Ok(())
}
