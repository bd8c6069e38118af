//! Assemble the built-in model and resolve it for runtime use.

use crate::apps;
use crate::config::{validate, ModelDef, ResolvedModel};
use crate::error::ConfigError;

/// Every app's definitions, tables in creation order.
pub fn builtin_model() -> ModelDef {
    apps::files::model()
        .merge(apps::catalog::model())
        .merge(apps::content::model())
        .merge(apps::shopping::model())
}

/// Validate and index a model definition.
pub fn resolve(def: ModelDef) -> Result<ResolvedModel, ConfigError> {
    validate(&def)?;
    let table_index = def
        .tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.clone(), i))
        .collect();
    let through_index = def
        .many_to_many
        .iter()
        .enumerate()
        .map(|(i, m)| (m.table.clone(), i))
        .collect();
    let serializers = def
        .serializers
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();
    tracing::debug!(
        tables = def.tables.len(),
        viewsets = def.viewsets.len(),
        views = def.views.len(),
        "model resolved"
    );
    Ok(ResolvedModel {
        tables: def.tables,
        many_to_many: def.many_to_many,
        viewsets: def.viewsets,
        views: def.views,
        table_index,
        through_index,
        serializers,
    })
}

/// The built-in model, resolved.
pub fn load() -> Result<ResolvedModel, ConfigError> {
    resolve(builtin_model())
}
