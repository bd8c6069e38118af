//! Physical stores and customer applications.

use crate::config::{ColumnDef, ColumnType, ModelDef, OnDelete, Query, TableDef, View, ViewSet};
use crate::serializer::Serializer;

/// Marks one application accepted; handled outside the generic views.
pub const ACCEPT_PATH: &str = "/shopping/accept/application/{id}/";

pub const PHONE_PATTERN: &str = r"^\+?[0-9]{7,15}$";

pub fn model() -> ModelDef {
    ModelDef {
        tables: vec![
            TableDef::new("stores")
                .translated("name", ColumnType::Varchar(255))
                .translated("address", ColumnType::Varchar(500))
                .column(ColumnDef::new("phone", ColumnType::Varchar(32)).nullable())
                .column(ColumnDef::new("work_time", ColumnType::Varchar(100)).nullable())
                .created_at(),
            TableDef::new("applications")
                .column(ColumnDef::new("full_name", ColumnType::Varchar(255)))
                .column(ColumnDef::new("phone", ColumnType::Varchar(20)).pattern(PHONE_PATTERN))
                .column(ColumnDef::new("comment", ColumnType::Text).nullable())
                .column(
                    ColumnDef::new("specification_id", ColumnType::BigInt)
                        .nullable()
                        .references("specifications", OnDelete::SetNull),
                )
                .column(ColumnDef::new("is_accepted", ColumnType::Bool).default_sql("FALSE"))
                .column(ColumnDef::new("accepted_at", ColumnType::Timestamptz).nullable())
                .created_at(),
        ],
        many_to_many: Vec::new(),
        serializers: vec![
            Serializer::new("GetStore", "stores")
                .id()
                .localized("name")
                .localized("address")
                .column("phone")
                .column("work_time"),
            Serializer::new("PostStore", "stores")
                .id()
                .translations("name")
                .translations("address")
                .column("phone")
                .column("work_time"),
            Serializer::new("GiveApplication", "applications")
                .id()
                .column("full_name")
                .column("phone")
                .column("comment")
                .foreign_key("specification", "specification_id"),
            Serializer::new("Application", "applications")
                .id()
                .read_only("full_name")
                .read_only("phone")
                .read_only("comment")
                .nested("specification", "specification_id", "GetSpecification")
                .read_only("is_accepted")
                .read_only("accepted_at")
                .read_only("created_at"),
        ],
        viewsets: vec![ViewSet::new("shopping.store", "/shopping/store/", "stores").serializers("GetStore", "PostStore")],
        views: vec![
            View::create("shopping.apply", "/shopping/apply/", "applications", "GiveApplication"),
            View::list(
                "shopping.applications",
                "/shopping/applications/",
                "applications",
                "Application",
                Query::new()
                    .paginated()
                    .order_by("-id")
                    .filter("is_accepted", "is_accepted")
                    .orderable("created_at"),
            ),
        ],
    }
}
