//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and join-table statements.

use crate::config::{ManyToManyDef, TableDef};
use crate::serializer::read::ROOT_ALIAS;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from the model).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn root(column: &str) -> String {
    format!("{}.{}", ROOT_ALIAS, quoted(column))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter and returns its placeholder with `cast`.
    fn bind(&mut self, v: Value, cast: &str) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), cast)
    }
}

fn cast_of<'a>(table: &'a TableDef, column: &str) -> &'a str {
    table.get(column).map(|c| c.ty.cast()).unwrap_or("text")
}

/// Which rows of a table a read covers, and in what order.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    pub id: Option<i64>,
    /// Exact matches; a null value matches NULL.
    pub equals: Vec<(String, Value)>,
    /// Every term must appear, case-insensitively, in one of `search_columns`.
    pub search_terms: Vec<String>,
    pub search_columns: Vec<String>,
    /// Column names, `-` prefix for descending.
    pub ordering: Vec<String>,
}

/// Escape LIKE wildcards so a term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

fn where_clause(q: &mut QueryBuf, table: &TableDef, c: &Criteria) -> String {
    let mut parts = Vec::new();
    if let Some(id) = c.id {
        let ph = q.bind(Value::from(id), "bigint");
        parts.push(format!("{} = {}", root("id"), ph));
    }
    for (col, val) in &c.equals {
        if val.is_null() {
            parts.push(format!("{} IS NULL", root(col)));
        } else {
            let ph = q.bind(val.clone(), cast_of(table, col));
            parts.push(format!("{} = {}", root(col), ph));
        }
    }
    if !c.search_columns.is_empty() {
        for term in &c.search_terms {
            let ph = q.bind(Value::String(like_pattern(term)), "text");
            let any: Vec<String> = c
                .search_columns
                .iter()
                .map(|col| format!("{} ILIKE {}", root(col), ph))
                .collect();
            parts.push(format!("({})", any.join(" OR ")));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn order_clause(c: &Criteria) -> String {
    let mut keys: Vec<String> = Vec::new();
    let mut has_id = false;
    for o in &c.ordering {
        let (col, dir) = match o.strip_prefix('-') {
            Some(col) => (col, "DESC"),
            None => (o.as_str(), "ASC"),
        };
        has_id |= col == "id";
        keys.push(format!("{} {}", root(col), dir));
    }
    // Stable pages need a unique tiebreaker.
    if !has_id {
        keys.push(format!("{} ASC", root("id")));
    }
    format!(" ORDER BY {}", keys.join(", "))
}

/// One JSON document per row, built by `projection` over alias `t0`.
pub fn select_json(
    table: &TableDef,
    projection: &str,
    criteria: &Criteria,
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, table, criteria);
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = offset.filter(|n| *n > 0).map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} AS \"data\" FROM {} {}{}{}{}{}",
        projection,
        quoted(&table.name),
        ROOT_ALIAS,
        where_clause,
        order_clause(criteria),
        limit_clause,
        offset_clause
    );
    q
}

pub fn count(table: &TableDef, criteria: &Criteria) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, table, criteria);
    q.sql = format!("SELECT COUNT(*) FROM {} {}{}", quoted(&table.name), ROOT_ALIAS, where_clause);
    q
}

/// INSERT returning the new id. Omitted columns take their defaults.
pub fn insert(table: &TableDef, columns: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    if columns.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING \"id\"", quoted(&table.name));
        return q;
    }
    let mut cols = Vec::with_capacity(columns.len());
    let mut placeholders = Vec::with_capacity(columns.len());
    for (col, val) in columns {
        placeholders.push(q.bind(val.clone(), cast_of(table, col)));
        cols.push(quoted(col));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING \"id\"",
        quoted(&table.name),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by id returning the id; with nothing to set it only checks the row exists.
pub fn update(table: &TableDef, id: i64, columns: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(columns.len());
    for (col, val) in columns {
        let ph = q.bind(val.clone(), cast_of(table, col));
        sets.push(format!("{} = {}", quoted(col), ph));
    }
    let id_ph = q.bind(Value::from(id), "bigint");
    q.sql = if sets.is_empty() {
        format!("SELECT \"id\" FROM {} WHERE \"id\" = {}", quoted(&table.name), id_ph)
    } else {
        format!(
            "UPDATE {} SET {} WHERE \"id\" = {} RETURNING \"id\"",
            quoted(&table.name),
            sets.join(", "),
            id_ph
        )
    };
    q
}

/// DELETE by id returning the id.
pub fn delete(table: &TableDef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.bind(Value::from(id), "bigint");
    q.sql = format!("DELETE FROM {} WHERE \"id\" = {} RETURNING \"id\"", quoted(&table.name), ph);
    q
}

/// Link `owner_id` to every id in `ids`.
pub fn link(m: &ManyToManyDef, owner_id: i64, ids: &[i64]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let owner = q.bind(Value::from(owner_id), "bigint");
    let targets = q.bind(Value::from(ids.to_vec()), "bigint[]");
    q.sql = format!(
        "INSERT INTO {} ({}, {}) SELECT {}, UNNEST({}) ON CONFLICT DO NOTHING",
        quoted(&m.table),
        quoted(&m.owner_column),
        quoted(&m.target_column),
        owner,
        targets
    );
    q
}

/// Remove every link of `owner_id`.
pub fn unlink(m: &ManyToManyDef, owner_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.bind(Value::from(owner_id), "bigint");
    q.sql = format!("DELETE FROM {} WHERE {} = {}", quoted(&m.table), quoted(&m.owner_column), ph);
    q
}

/// Delete every row of `table` whose `fk` points at `parent_id`.
pub fn delete_children(table: &TableDef, fk: &str, parent_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.bind(Value::from(parent_id), "bigint");
    q.sql = format!("DELETE FROM {} WHERE {} = {}", quoted(&table.name), quoted(fk), ph);
    q
}

/// Which of `ids` exist in `table`.
pub fn existing_ids(table: &str, ids: &[i64]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.bind(Value::from(ids.to_vec()), "bigint[]");
    q.sql = format!("SELECT \"id\" FROM {} WHERE \"id\" = ANY({})", quoted(table), ph);
    q
}
