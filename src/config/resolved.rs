//! Resolved model: definitions validated and indexed for runtime lookups.

use crate::config::{ManyToManyDef, TableDef, View, ViewSet};
use crate::error::ConfigError;
use crate::serializer::Serializer;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    /// In creation order; a table only references tables before it.
    pub tables: Vec<TableDef>,
    pub many_to_many: Vec<ManyToManyDef>,
    pub viewsets: Vec<ViewSet>,
    pub views: Vec<View>,
    pub(crate) table_index: HashMap<String, usize>,
    pub(crate) through_index: HashMap<String, usize>,
    pub(crate) serializers: HashMap<String, Serializer>,
}

impl ResolvedModel {
    pub fn table(&self, name: &str) -> Result<&TableDef, ConfigError> {
        self.table_index
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| missing("table", name))
    }

    pub fn through(&self, name: &str) -> Result<&ManyToManyDef, ConfigError> {
        self.through_index
            .get(name)
            .map(|&i| &self.many_to_many[i])
            .ok_or_else(|| missing("join table", name))
    }

    pub fn serializer(&self, name: &str) -> Result<&Serializer, ConfigError> {
        self.serializers.get(name).ok_or_else(|| missing("serializer", name))
    }

    /// All serializers sorted by name.
    pub fn serializers(&self) -> Vec<&Serializer> {
        let mut all: Vec<&Serializer> = self.serializers.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn viewset(&self, key: &str) -> Option<&ViewSet> {
        self.viewsets.iter().find(|v| v.key == key)
    }

    pub fn view(&self, key: &str) -> Option<&View> {
        self.views.iter().find(|v| v.key == key)
    }

    /// Table the foreign key column `fk` of `table` points at.
    pub fn referenced(&self, table: &TableDef, fk: &str) -> Result<&TableDef, ConfigError> {
        let target = table
            .get(fk)
            .and_then(|c| c.references.as_ref())
            .ok_or_else(|| missing("foreign key", &format!("{}.{}", table.name, fk)))?;
        self.table(&target.table)
    }
}

fn missing(kind: &'static str, id: &str) -> ConfigError {
    ConfigError::MissingReference {
        kind,
        id: id.to_string(),
    }
}
