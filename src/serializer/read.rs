//! Compiles a serializer into one SQL expression that builds the row's JSON document.

use crate::config::{ColumnType, ResolvedModel, TableDef};
use crate::error::ConfigError;
use crate::language::Language;
use crate::serializer::{Attr, Field, Serializer};
use crate::sql::quoted;

/// Alias the outer query gives the serialized table.
pub const ROOT_ALIAS: &str = "t0";

/// `json_build_object(...)` over alias `t0` for `serializer`, in `lang`.
pub fn json_object(model: &ResolvedModel, serializer: &str, lang: Language) -> Result<String, ConfigError> {
    let mut c = Compiler { model, lang, next: 0 };
    let alias = c.alias();
    let ser = model.serializer(serializer)?;
    c.object(ser, &alias)
}

struct Compiler<'m> {
    model: &'m ResolvedModel,
    lang: Language,
    next: usize,
}

fn col(alias: &str, name: &str) -> String {
    format!("{}.{}", alias, quoted(name))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl<'m> Compiler<'m> {
    fn alias(&mut self) -> String {
        let a = format!("t{}", self.next);
        self.next += 1;
        a
    }

    fn object(&mut self, ser: &Serializer, alias: &str) -> Result<String, ConfigError> {
        let table = self.model.table(&ser.table)?;
        let mut parts = Vec::with_capacity(ser.fields.len());
        for field in &ser.fields {
            let expr = self.field(table, field, alias)?;
            parts.push(format!("{}, {}", literal(field.name()), expr));
        }
        Ok(format!("json_build_object({})", parts.join(", ")))
    }

    fn column(&self, table: &TableDef, name: &str, alias: &str) -> Result<String, ConfigError> {
        let def = table.get(name).ok_or_else(|| ConfigError::MissingReference {
            kind: "column",
            id: format!("{}.{}", table.name, name),
        })?;
        Ok(match def.ty {
            // Decimals render as strings to keep their scale.
            ColumnType::Numeric(_, _) => format!("{}::text", col(alias, name)),
            _ => col(alias, name),
        })
    }

    /// Requested translation, falling back to the primary one when empty.
    fn localized(&self, base: &str, alias: &str) -> String {
        let primary = col(alias, &Language::PRIMARY.column(base));
        if self.lang == Language::PRIMARY {
            primary
        } else {
            format!("COALESCE(NULLIF({}, ''), {})", col(alias, &self.lang.column(base)), primary)
        }
    }

    fn field(&mut self, table: &TableDef, field: &Field, alias: &str) -> Result<String, ConfigError> {
        Ok(match field {
            Field::Column { name, .. } => self.column(table, name, alias)?,
            Field::Localized { name } => self.localized(name, alias),
            Field::Display { source, .. } => {
                let choices = table.get(source).and_then(|c| c.choices).unwrap_or(&[]);
                let arms: String = choices
                    .iter()
                    .map(|c| format!(" WHEN {} THEN {}", literal(c.value), literal(c.label)))
                    .collect();
                format!("CASE {}{} ELSE {} END", col(alias, source), arms, col(alias, source))
            }
            Field::Related { fk, attr, .. } => {
                let target = self.model.referenced(table, fk)?;
                let r = self.alias();
                let value = match attr {
                    Attr::Column(name) => self.column(target, name, &r)?,
                    Attr::Localized(base) => self.localized(base, &r),
                };
                format!(
                    "(SELECT {} FROM {} {} WHERE {} = {})",
                    value,
                    quoted(&target.name),
                    r,
                    col(&r, "id"),
                    col(alias, fk)
                )
            }
            Field::Nested { fk, serializer, .. } => {
                let target = self.model.referenced(table, fk)?;
                let ser = self.model.serializer(serializer)?;
                let r = self.alias();
                let obj = self.object(ser, &r)?;
                format!(
                    "(SELECT {} FROM {} {} WHERE {} = {})",
                    obj,
                    quoted(&target.name),
                    r,
                    col(&r, "id"),
                    col(alias, fk)
                )
            }
            Field::ForeignKey { fk, .. } => col(alias, fk),
            Field::ManyNested { through, serializer, .. } => {
                let m = self.model.through(through)?;
                let ser = self.model.serializer(serializer)?;
                let j = self.alias();
                let r = self.alias();
                let obj = self.object(ser, &r)?;
                format!(
                    "COALESCE((SELECT json_agg({} ORDER BY {}) FROM {} {} JOIN {} {} ON {} = {} WHERE {} = {}), '[]'::json)",
                    obj,
                    col(&r, "id"),
                    quoted(&m.table),
                    j,
                    quoted(&m.target),
                    r,
                    col(&r, "id"),
                    col(&j, &m.target_column),
                    col(&j, &m.owner_column),
                    col(alias, "id")
                )
            }
            Field::ManyIds { through, .. } => {
                let m = self.model.through(through)?;
                let j = self.alias();
                let target = col(&j, &m.target_column);
                format!(
                    "COALESCE((SELECT json_agg({} ORDER BY {}) FROM {} {} WHERE {} = {}), '[]'::json)",
                    target,
                    target,
                    quoted(&m.table),
                    j,
                    col(&j, &m.owner_column),
                    col(alias, "id")
                )
            }
            Field::Children {
                table: child,
                fk,
                serializer,
                only_where,
                ..
            } => {
                let ser = self.model.serializer(serializer)?;
                let r = self.alias();
                let obj = self.object(ser, &r)?;
                let flag = only_where
                    .as_ref()
                    .map(|f| format!(" AND {}", col(&r, f)))
                    .unwrap_or_default();
                format!(
                    "COALESCE((SELECT json_agg({} ORDER BY {}) FROM {} {} WHERE {} = {}{}), '[]'::json)",
                    obj,
                    col(&r, "id"),
                    quoted(child),
                    r,
                    col(&r, fk),
                    col(alias, "id"),
                    flag
                )
            }
        })
    }
}
