//! Declarative field mappings between table rows and wire JSON.

use crate::language::Language;

/// Attribute read from a related row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attr {
    Column(String),
    Localized(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    /// Column under its own name. Writable unless `read_only`.
    Column { name: String, read_only: bool },
    /// Translated column rendered in the request language.
    Localized { name: String },
    /// Label of the choice stored in `source`.
    Display { name: String, source: String },
    /// One attribute of the row `fk` points at.
    Related { name: String, fk: String, attr: Attr },
    /// Row `fk` points at, rendered with another serializer.
    Nested { name: String, fk: String, serializer: String },
    /// Foreign key exposed as the referenced id.
    /// With `omit_blank` a null or empty value is dropped instead of written.
    ForeignKey { name: String, fk: String, omit_blank: bool },
    /// Rows linked through a join table, rendered with another serializer.
    ManyNested { name: String, through: String, serializer: String },
    /// Rows linked through a join table, exposed as ids.
    ManyIds { name: String, through: String },
    /// Rows of `table` whose `fk` points back at this row.
    Children {
        name: String,
        table: String,
        fk: String,
        serializer: String,
        /// Only rows where this boolean column is true.
        only_where: Option<String>,
        writable: bool,
    },
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Column { name, .. }
            | Field::Localized { name }
            | Field::Display { name, .. }
            | Field::Related { name, .. }
            | Field::Nested { name, .. }
            | Field::ForeignKey { name, .. }
            | Field::ManyNested { name, .. }
            | Field::ManyIds { name, .. }
            | Field::Children { name, .. } => name,
        }
    }

    pub fn is_writable(&self) -> bool {
        match self {
            Field::Column { read_only, .. } => !read_only,
            Field::ForeignKey { .. } | Field::ManyIds { .. } => true,
            Field::Children { writable, .. } => *writable,
            _ => false,
        }
    }
}

/// Named, ordered list of fields over one table.
#[derive(Clone, Debug)]
pub struct Serializer {
    pub name: String,
    pub table: String,
    pub fields: Vec<Field>,
}

impl Serializer {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Serializer {
            name: name.into(),
            table: table.into(),
            fields: Vec::new(),
        }
    }

    fn push(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn id(self) -> Self {
        self.read_only("id")
    }

    pub fn column(self, name: &str) -> Self {
        self.push(Field::Column {
            name: name.into(),
            read_only: false,
        })
    }

    pub fn read_only(self, name: &str) -> Self {
        self.push(Field::Column {
            name: name.into(),
            read_only: true,
        })
    }

    pub fn localized(self, name: &str) -> Self {
        self.push(Field::Localized { name: name.into() })
    }

    /// Every translation of `base` as its own writable column.
    pub fn translations(mut self, base: &str) -> Self {
        for lang in Language::ALL {
            self = self.column(&lang.column(base));
        }
        self
    }

    pub fn display(self, name: &str, source: &str) -> Self {
        self.push(Field::Display {
            name: name.into(),
            source: source.into(),
        })
    }

    pub fn related(self, name: &str, fk: &str, attr: &str) -> Self {
        self.push(Field::Related {
            name: name.into(),
            fk: fk.into(),
            attr: Attr::Column(attr.into()),
        })
    }

    pub fn related_localized(self, name: &str, fk: &str, attr: &str) -> Self {
        self.push(Field::Related {
            name: name.into(),
            fk: fk.into(),
            attr: Attr::Localized(attr.into()),
        })
    }

    pub fn nested(self, name: &str, fk: &str, serializer: &str) -> Self {
        self.push(Field::Nested {
            name: name.into(),
            fk: fk.into(),
            serializer: serializer.into(),
        })
    }

    pub fn foreign_key(self, name: &str, fk: &str) -> Self {
        self.push(Field::ForeignKey {
            name: name.into(),
            fk: fk.into(),
            omit_blank: false,
        })
    }

    pub fn optional_foreign_key(self, name: &str, fk: &str) -> Self {
        self.push(Field::ForeignKey {
            name: name.into(),
            fk: fk.into(),
            omit_blank: true,
        })
    }

    pub fn many_nested(self, name: &str, through: &str, serializer: &str) -> Self {
        self.push(Field::ManyNested {
            name: name.into(),
            through: through.into(),
            serializer: serializer.into(),
        })
    }

    pub fn many_ids(self, name: &str, through: &str) -> Self {
        self.push(Field::ManyIds {
            name: name.into(),
            through: through.into(),
        })
    }

    pub fn children(self, name: &str, table: &str, fk: &str, serializer: &str) -> Self {
        self.push(Field::Children {
            name: name.into(),
            table: table.into(),
            fk: fk.into(),
            serializer: serializer.into(),
            only_where: None,
            writable: false,
        })
    }

    pub fn writable_children(self, name: &str, table: &str, fk: &str, serializer: &str) -> Self {
        self.push(Field::Children {
            name: name.into(),
            table: table.into(),
            fk: fk.into(),
            serializer: serializer.into(),
            only_where: None,
            writable: true,
        })
    }

    pub fn children_where(self, name: &str, table: &str, fk: &str, serializer: &str, flag: &str) -> Self {
        self.push(Field::Children {
            name: name.into(),
            table: table.into(),
            fk: fk.into(),
            serializer: serializer.into(),
            only_where: Some(flag.into()),
            writable: false,
        })
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }
}
