//! Table, column and relation definitions that make up the data model.

use crate::language::Language;
use crate::serializer::Serializer;

/// Storage type of a column. Every primary key is `Id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Id,
    Text,
    Varchar(u32),
    Bool,
    BigInt,
    /// Precision and scale.
    Numeric(u8, u8),
    Timestamptz,
}

impl ColumnType {
    /// Type used in CREATE TABLE.
    pub fn ddl(&self) -> String {
        match self {
            ColumnType::Id => "BIGSERIAL".into(),
            ColumnType::Text => "TEXT".into(),
            ColumnType::Varchar(n) => format!("VARCHAR({})", n),
            ColumnType::Bool => "BOOLEAN".into(),
            ColumnType::BigInt => "BIGINT".into(),
            ColumnType::Numeric(p, s) => format!("NUMERIC({}, {})", p, s),
            ColumnType::Timestamptz => "TIMESTAMPTZ".into(),
        }
    }

    /// Cast applied to every bound parameter; values travel as text.
    pub fn cast(&self) -> &'static str {
        match self {
            ColumnType::Id | ColumnType::BigInt => "bigint",
            ColumnType::Text | ColumnType::Varchar(_) => "text",
            ColumnType::Bool => "boolean",
            ColumnType::Numeric(_, _) => "numeric",
            ColumnType::Timestamptz => "timestamptz",
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Varchar(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
            OnDelete::Restrict => "RESTRICT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub on_delete: OnDelete,
}

/// One allowed value of a choice column and its human label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub min_length: Option<u32>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    /// SQL expression used as DEFAULT.
    pub default: Option<String>,
    pub references: Option<ForeignKey>,
    pub choices: Option<&'static [Choice]>,
    pub rule: ValidationRule,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            ty,
            nullable: false,
            default: None,
            references: None,
            choices: None,
            rule: ValidationRule::default(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_sql(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn references(mut self, table: impl Into<String>, on_delete: OnDelete) -> Self {
        self.references = Some(ForeignKey {
            table: table.into(),
            on_delete,
        });
        self
    }

    pub fn choices(mut self, choices: &'static [Choice]) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rule.pattern = Some(pattern.into());
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.rule.minimum = Some(min);
        self
    }

    pub fn min_length(mut self, len: u32) -> Self {
        self.rule.min_length = Some(len);
        self
    }

    /// Must be supplied on create: not null and no default.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none() && self.ty != ColumnType::Id
    }

    pub fn label(&self, value: &str) -> Option<&'static str> {
        self.choices?
            .iter()
            .find(|c| c.value == value)
            .map(|c| c.label)
    }
}

#[derive(Clone, Debug)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    /// New table with a generated `id` primary key.
    pub fn new(name: impl Into<String>) -> Self {
        TableDef {
            name: name.into(),
            columns: vec![ColumnDef::new("id", ColumnType::Id)],
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// One column per language; only the primary translation is required.
    pub fn translated(mut self, base: &str, ty: ColumnType) -> Self {
        for lang in Language::ALL {
            let mut col = ColumnDef::new(lang.column(base), ty);
            if lang != Language::PRIMARY {
                col = col.nullable();
            }
            self.columns.push(col);
        }
        self
    }

    pub fn created_at(self) -> Self {
        self.column(ColumnDef::new("created_at", ColumnType::Timestamptz).default_sql("NOW()"))
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == column)
    }
}

/// Join table linking `owner` rows to `target` rows.
#[derive(Clone, Debug)]
pub struct ManyToManyDef {
    pub table: String,
    pub owner: String,
    pub owner_column: String,
    pub target: String,
    pub target_column: String,
}

impl ManyToManyDef {
    pub fn new(
        table: impl Into<String>,
        (owner, owner_column): (&str, &str),
        (target, target_column): (&str, &str),
    ) -> Self {
        ManyToManyDef {
            table: table.into(),
            owner: owner.to_string(),
            owner_column: owner_column.to_string(),
            target: target.to_string(),
            target_column: target_column.to_string(),
        }
    }
}

/// Fixed filters, default ordering and the query parameters a list accepts.
#[derive(Clone, Debug, Default)]
pub struct Query {
    /// `column = value` conditions always applied, also to retrieves.
    pub scope: Vec<(String, serde_json::Value)>,
    /// Column names, `-` prefix for descending. Empty means by id.
    pub ordering: Vec<String>,
    pub limit: Option<u32>,
    pub search_fields: Vec<String>,
    pub ordering_fields: Vec<String>,
    /// Query parameter name and the column it filters.
    pub filter_fields: Vec<(String, String)>,
    pub paginate: bool,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn scope(mut self, column: &str, value: serde_json::Value) -> Self {
        self.scope.push((column.into(), value));
        self
    }

    pub fn order_by(mut self, ordering: &str) -> Self {
        self.ordering.push(ordering.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn search(mut self, fields: &[String]) -> Self {
        self.search_fields.extend(fields.iter().cloned());
        self
    }

    pub fn orderable(mut self, column: &str) -> Self {
        self.ordering_fields.push(column.into());
        self
    }

    pub fn filter(mut self, param: &str, column: &str) -> Self {
        self.filter_fields.push((param.into(), column.into()));
        self
    }

    pub fn paginated(mut self) -> Self {
        self.paginate = true;
        self
    }
}

/// Collection + detail routes over one table.
#[derive(Clone, Debug)]
pub struct ViewSet {
    pub key: String,
    /// Collection path relative to the API root, e.g. `/catalog/category/`.
    pub path: String,
    pub table: String,
    pub list: String,
    pub retrieve: String,
    pub write: String,
    pub query: Query,
}

impl ViewSet {
    pub fn new(key: &str, path: &str, table: &str) -> Self {
        ViewSet {
            key: key.into(),
            path: path.into(),
            table: table.into(),
            list: String::new(),
            retrieve: String::new(),
            write: String::new(),
            query: Query::new().paginated(),
        }
    }

    /// `read` renders list and retrieve, `write` parses bodies and renders write responses.
    pub fn serializers(mut self, read: &str, write: &str) -> Self {
        self.list = read.into();
        self.retrieve = read.into();
        self.write = write.into();
        self
    }

    pub fn retrieve_with(mut self, serializer: &str) -> Self {
        self.retrieve = serializer.into();
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn detail_path(&self) -> String {
        format!("{}{{id}}/", self.path)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewKind {
    List,
    Retrieve,
    Create,
}

/// Single-purpose route; `{id}` in the path marks the row id for retrieves.
#[derive(Clone, Debug)]
pub struct View {
    pub key: String,
    pub path: String,
    pub kind: ViewKind,
    pub table: String,
    pub serializer: String,
    pub query: Query,
}

impl View {
    pub fn list(key: &str, path: &str, table: &str, serializer: &str, query: Query) -> Self {
        View::new(key, path, ViewKind::List, table, serializer, query)
    }

    pub fn retrieve(key: &str, path: &str, table: &str, serializer: &str, query: Query) -> Self {
        View::new(key, path, ViewKind::Retrieve, table, serializer, query)
    }

    pub fn create(key: &str, path: &str, table: &str, serializer: &str) -> Self {
        View::new(key, path, ViewKind::Create, table, serializer, Query::new())
    }

    fn new(key: &str, path: &str, kind: ViewKind, table: &str, serializer: &str, query: Query) -> Self {
        View {
            key: key.into(),
            path: path.into(),
            kind,
            table: table.into(),
            serializer: serializer.into(),
            query,
        }
    }
}

/// Everything one app contributes to the model. Tables are created in order.
#[derive(Clone, Debug, Default)]
pub struct ModelDef {
    pub tables: Vec<TableDef>,
    pub many_to_many: Vec<ManyToManyDef>,
    pub serializers: Vec<Serializer>,
    pub viewsets: Vec<ViewSet>,
    pub views: Vec<View>,
}

impl ModelDef {
    pub fn merge(mut self, other: ModelDef) -> Self {
        self.tables.extend(other.tables);
        self.many_to_many.extend(other.many_to_many);
        self.serializers.extend(other.serializers);
        self.viewsets.extend(other.viewsets);
        self.views.extend(other.views);
        self
    }
}
