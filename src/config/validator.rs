//! Model validation: referential integrity, serializer shapes and route consistency.

use crate::config::{ColumnType, ModelDef, Query, TableDef, ViewKind};
use crate::error::ConfigError;
use crate::language::Language;
use crate::serializer::{Attr, Field, Serializer};
use std::collections::{HashMap, HashSet};

pub fn validate(def: &ModelDef) -> Result<(), ConfigError> {
    let tables = check_tables(def)?;
    check_many_to_many(def, &tables)?;
    let serializers = unique("serializer", def.serializers.iter().map(|s| (s.name.as_str(), s)))?;
    for s in &def.serializers {
        check_serializer(def, s, &tables, &serializers)?;
    }
    check_acyclic(&serializers)?;
    check_routes(def, &tables, &serializers)?;
    Ok(())
}

fn unique<'a, T>(
    kind: &'static str,
    items: impl Iterator<Item = (&'a str, T)>,
) -> Result<HashMap<&'a str, T>, ConfigError> {
    let mut out = HashMap::new();
    for (name, item) in items {
        if out.insert(name, item).is_some() {
            return Err(ConfigError::Duplicate {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(out)
}

fn missing(kind: &'static str, id: impl Into<String>) -> ConfigError {
    ConfigError::MissingReference { kind, id: id.into() }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

fn check_tables(def: &ModelDef) -> Result<HashMap<&str, &TableDef>, ConfigError> {
    let mut seen: HashMap<&str, &TableDef> = HashMap::new();
    for t in &def.tables {
        unique("column", t.columns.iter().map(|c| (c.name.as_str(), ())))?;
        for c in &t.columns {
            if let Some(fk) = &c.references {
                if !seen.contains_key(fk.table.as_str()) && fk.table != t.name {
                    return Err(missing("table", format!("{} (from {}.{})", fk.table, t.name, c.name)));
                }
                if !c.nullable && fk.on_delete == crate::config::OnDelete::SetNull {
                    return Err(invalid(format!("{}.{} is SET NULL but not nullable", t.name, c.name)));
                }
            }
            if let Some(pattern) = &c.rule.pattern {
                regex::Regex::new(pattern)
                    .map_err(|e| invalid(format!("{}.{} pattern: {}", t.name, c.name, e)))?;
            }
            if c.choices.is_some() && !c.ty.is_textual() {
                return Err(invalid(format!("{}.{} has choices but is not text", t.name, c.name)));
            }
        }
        if seen.insert(t.name.as_str(), t).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "table",
                name: t.name.clone(),
            });
        }
    }
    Ok(seen)
}

fn check_many_to_many(def: &ModelDef, tables: &HashMap<&str, &TableDef>) -> Result<(), ConfigError> {
    unique("join table", def.many_to_many.iter().map(|m| (m.table.as_str(), ())))?;
    for m in &def.many_to_many {
        if tables.contains_key(m.table.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "table",
                name: m.table.clone(),
            });
        }
        for t in [&m.owner, &m.target] {
            if !tables.contains_key(t.as_str()) {
                return Err(missing("table", format!("{} (from {})", t, m.table)));
            }
        }
        if m.owner_column == m.target_column {
            return Err(invalid(format!("{} uses the same column for both sides", m.table)));
        }
    }
    Ok(())
}

fn column<'a>(table: &'a TableDef, name: &str) -> Result<&'a crate::config::ColumnDef, ConfigError> {
    table
        .get(name)
        .ok_or_else(|| missing("column", format!("{}.{}", table.name, name)))
}

fn references<'a>(
    tables: &HashMap<&str, &'a TableDef>,
    table: &TableDef,
    fk: &str,
) -> Result<&'a TableDef, ConfigError> {
    let target = column(table, fk)?
        .references
        .as_ref()
        .ok_or_else(|| invalid(format!("{}.{} is not a foreign key", table.name, fk)))?;
    tables
        .get(target.table.as_str())
        .copied()
        .ok_or_else(|| missing("table", target.table.clone()))
}

fn has_translations(table: &TableDef, base: &str) -> Result<(), ConfigError> {
    for lang in Language::ALL {
        column(table, &lang.column(base))?;
    }
    Ok(())
}

fn serializer_over<'a>(
    serializers: &HashMap<&str, &'a Serializer>,
    name: &str,
    table: &str,
) -> Result<&'a Serializer, ConfigError> {
    let s = serializers
        .get(name)
        .copied()
        .ok_or_else(|| missing("serializer", name))?;
    if s.table != table {
        return Err(invalid(format!("serializer {} is over {}, expected {}", name, s.table, table)));
    }
    Ok(s)
}

fn check_serializer(
    def: &ModelDef,
    s: &Serializer,
    tables: &HashMap<&str, &TableDef>,
    serializers: &HashMap<&str, &Serializer>,
) -> Result<(), ConfigError> {
    let table = tables
        .get(s.table.as_str())
        .copied()
        .ok_or_else(|| missing("table", format!("{} (from serializer {})", s.table, s.name)))?;
    unique("field", s.fields.iter().map(|f| (f.name(), ())))
        .map_err(|e| invalid(format!("serializer {}: {}", s.name, e)))?;
    for field in &s.fields {
        match field {
            Field::Column { name, .. } => {
                column(table, name)?;
            }
            Field::Localized { name } => has_translations(table, name)?,
            Field::Display { source, .. } => {
                if column(table, source)?.choices.is_none() {
                    return Err(invalid(format!("{}.{} has no choices", table.name, source)));
                }
            }
            Field::Related { fk, attr, .. } => {
                let target = references(tables, table, fk)?;
                match attr {
                    Attr::Column(c) => {
                        column(target, c)?;
                    }
                    Attr::Localized(base) => has_translations(target, base)?,
                }
            }
            Field::Nested { fk, serializer, .. } => {
                let target = references(tables, table, fk)?;
                serializer_over(serializers, serializer, &target.name)?;
            }
            Field::ForeignKey { fk, .. } => {
                references(tables, table, fk)?;
            }
            Field::ManyNested { through, serializer, .. } => {
                let m = owned_join(def, through, &s.table)?;
                serializer_over(serializers, serializer, &m.target)?;
            }
            Field::ManyIds { through, .. } => {
                owned_join(def, through, &s.table)?;
            }
            Field::Children {
                name,
                table: child,
                fk,
                serializer,
                only_where,
                writable,
            } => {
                let child_table = tables
                    .get(child.as_str())
                    .copied()
                    .ok_or_else(|| missing("table", child.clone()))?;
                if references(tables, child_table, fk)?.name != s.table {
                    return Err(invalid(format!("{}.{} does not point at {}", child, fk, s.table)));
                }
                let child_ser = serializer_over(serializers, serializer, child)?;
                if let Some(flag) = only_where {
                    if column(child_table, flag)?.ty != ColumnType::Bool {
                        return Err(invalid(format!("{}.{} is not boolean", child, flag)));
                    }
                }
                if *writable
                    && child_ser
                        .fields
                        .iter()
                        .any(|f| matches!(f, Field::Children { writable: true, .. }))
                {
                    return Err(invalid(format!(
                        "{}.{}: writable children nest one level only",
                        s.name, name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn owned_join<'a>(def: &'a ModelDef, through: &str, owner: &str) -> Result<&'a crate::config::ManyToManyDef, ConfigError> {
    let m = def
        .many_to_many
        .iter()
        .find(|m| m.table == through)
        .ok_or_else(|| missing("join table", through))?;
    if m.owner != owner {
        return Err(invalid(format!("{} is owned by {}, not {}", through, m.owner, owner)));
    }
    Ok(m)
}

/// Nested serializers compile to nested sub-selects, so references must not loop.
fn check_acyclic(serializers: &HashMap<&str, &Serializer>) -> Result<(), ConfigError> {
    fn visit<'a>(
        name: &'a str,
        serializers: &HashMap<&str, &'a Serializer>,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), ConfigError> {
        if done.contains(name) {
            return Ok(());
        }
        if stack.contains(&name) {
            return Err(invalid(format!("serializer cycle through {}", name)));
        }
        stack.push(name);
        if let Some(s) = serializers.get(name) {
            for f in &s.fields {
                match f {
                    Field::Nested { serializer, .. }
                    | Field::ManyNested { serializer, .. }
                    | Field::Children { serializer, .. } => visit(serializer, serializers, stack, done)?,
                    _ => {}
                }
            }
        }
        stack.pop();
        done.insert(name);
        Ok(())
    }
    let mut done = HashSet::new();
    let mut names: Vec<&str> = serializers.keys().copied().collect();
    names.sort_unstable();
    for name in names {
        visit(name, serializers, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}

fn check_query(table: &TableDef, query: &Query) -> Result<(), ConfigError> {
    for (c, _) in &query.scope {
        column(table, c)?;
    }
    for o in query.ordering.iter().chain(&query.ordering_fields) {
        column(table, o.trim_start_matches('-'))?;
    }
    for c in &query.search_fields {
        if !column(table, c)?.ty.is_textual() {
            return Err(invalid(format!("{}.{} is not searchable text", table.name, c)));
        }
    }
    for (_, c) in &query.filter_fields {
        column(table, c)?;
    }
    Ok(())
}

fn check_routes(
    def: &ModelDef,
    tables: &HashMap<&str, &TableDef>,
    serializers: &HashMap<&str, &Serializer>,
) -> Result<(), ConfigError> {
    let mut paths: HashSet<String> = HashSet::new();
    let mut claim = |path: String| -> Result<(), ConfigError> {
        if !path.starts_with('/') || !path.ends_with('/') {
            return Err(invalid(format!("path {} must start and end with '/'", path)));
        }
        if !paths.insert(path.clone()) {
            return Err(ConfigError::Duplicate { kind: "path", name: path });
        }
        Ok(())
    };
    unique("viewset", def.viewsets.iter().map(|v| (v.key.as_str(), ())))?;
    for v in &def.viewsets {
        let table = tables
            .get(v.table.as_str())
            .copied()
            .ok_or_else(|| missing("table", v.table.clone()))?;
        for name in [&v.list, &v.retrieve, &v.write] {
            serializer_over(serializers, name, &v.table)?;
        }
        check_query(table, &v.query)?;
        claim(v.path.clone())?;
        claim(v.detail_path())?;
    }
    unique("view", def.views.iter().map(|v| (v.key.as_str(), ())))?;
    for v in &def.views {
        let table = tables
            .get(v.table.as_str())
            .copied()
            .ok_or_else(|| missing("table", v.table.clone()))?;
        serializer_over(serializers, &v.serializer, &v.table)?;
        check_query(table, &v.query)?;
        let has_id = v.path.contains("{id}");
        if has_id != (v.kind == ViewKind::Retrieve) {
            return Err(invalid(format!("view {}: only retrieves take {{id}}", v.key)));
        }
        claim(v.path.clone())?;
    }
    Ok(())
}
