//! Schema DDL generated from the model: tables in dependency order, join tables, FK indexes.

use crate::config::{ColumnDef, ManyToManyDef, ResolvedModel, TableDef};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::PgPool;

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn column_ddl(c: &ColumnDef) -> String {
    let mut def = format!("{} {}", quoted(&c.name), c.ty.ddl());
    if !c.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = &c.default {
        def.push_str(" DEFAULT ");
        def.push_str(d);
    }
    if let Some(fk) = &c.references {
        def.push_str(&format!(
            " REFERENCES {} (\"id\") ON DELETE {}",
            quoted(&fk.table),
            fk.on_delete.sql()
        ));
    }
    def
}

fn create_table(t: &TableDef) -> String {
    let mut defs: Vec<String> = t.columns.iter().map(column_ddl).collect();
    defs.push("PRIMARY KEY (\"id\")".to_string());
    for c in &t.columns {
        if let Some(choices) = c.choices {
            let values: Vec<String> = choices.iter().map(|ch| literal(ch.value)).collect();
            defs.push(format!(
                "CONSTRAINT {} CHECK ({} IN ({}))",
                quoted(&format!("{}_{}_check", t.name, c.name)),
                quoted(&c.name),
                values.join(", ")
            ));
        }
        if let Some(min) = c.rule.minimum {
            defs.push(format!(
                "CONSTRAINT {} CHECK ({} >= {})",
                quoted(&format!("{}_{}_min", t.name, c.name)),
                quoted(&c.name),
                min
            ));
        }
    }
    format!("CREATE TABLE IF NOT EXISTS {} ({})", quoted(&t.name), defs.join(", "))
}

fn create_join_table(m: &ManyToManyDef) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} BIGINT NOT NULL REFERENCES {} (\"id\") ON DELETE CASCADE, \
         {} BIGINT NOT NULL REFERENCES {} (\"id\") ON DELETE CASCADE, PRIMARY KEY ({}, {}))",
        quoted(&m.table),
        quoted(&m.owner_column),
        quoted(&m.owner),
        quoted(&m.target_column),
        quoted(&m.target),
        quoted(&m.owner_column),
        quoted(&m.target_column)
    )
}

fn create_index(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        quoted(&format!("{}_{}_idx", table, column)),
        quoted(table),
        quoted(column)
    )
}

/// Every statement needed to bring an empty database to the model. Idempotent.
pub fn ddl_statements(model: &ResolvedModel) -> Vec<String> {
    let mut out: Vec<String> = model.tables.iter().map(create_table).collect();
    out.extend(model.many_to_many.iter().map(create_join_table));
    for t in &model.tables {
        for c in t.columns.iter().filter(|c| c.references.is_some()) {
            out.push(create_index(&t.name, &c.name));
        }
    }
    // The composite primary key already covers lookups by owner.
    for m in &model.many_to_many {
        out.push(create_index(&m.table, &m.target_column));
    }
    out
}

/// Apply the generated DDL in one transaction.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let statements = ddl_statements(model);
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(statements = statements.len(), "schema up to date");
    Ok(())
}
