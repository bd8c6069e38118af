//! Uploaded file records. Storage lives elsewhere; rows are only referenced by id.

use crate::config::{ColumnDef, ColumnType, ModelDef, TableDef};
use crate::serializer::Serializer;

pub fn model() -> ModelDef {
    ModelDef {
        tables: vec![TableDef::new("files")
            .column(ColumnDef::new("path", ColumnType::Varchar(500)))
            .column(ColumnDef::new("name", ColumnType::Varchar(255)).nullable())
            .created_at()],
        serializers: vec![Serializer::new("File", "files").id().column("name").column("path")],
        ..ModelDef::default()
    }
}
