//! Products: categories, colors, sizes, catalogs and their specifications.

use crate::config::{
    Choice, ColumnDef, ColumnType, ManyToManyDef, ModelDef, OnDelete, Query, TableDef, View, ViewSet,
};
use crate::language::Language;
use crate::serializer::Serializer;

pub const SIZE_TYPES: &[Choice] = &[
    Choice { value: "clothes", label: "Clothes" },
    Choice { value: "shoes", label: "Shoes" },
    Choice { value: "other", label: "Other" },
];

const NAME: ColumnType = ColumnType::Varchar(255);

fn all(base: &str) -> Vec<String> {
    Language::ALL.iter().map(|l| l.column(base)).collect()
}

fn tables() -> Vec<TableDef> {
    vec![
        TableDef::new("categories").translated("name", NAME).created_at(),
        TableDef::new("colors").translated("name", NAME).created_at(),
        TableDef::new("sizes")
            .translated("name", NAME)
            .column(ColumnDef::new("size_type", ColumnType::Varchar(20)).choices(SIZE_TYPES))
            .created_at(),
        TableDef::new("catalogs")
            .translated("name", NAME)
            .translated("description", ColumnType::Text)
            .translated("shape", NAME)
            .translated("material", NAME)
            .column(
                ColumnDef::new("category_id", ColumnType::BigInt)
                    .nullable()
                    .references("categories", OnDelete::SetNull),
            )
            .created_at(),
        TableDef::new("specifications")
            .column(ColumnDef::new("catalog_id", ColumnType::BigInt).references("catalogs", OnDelete::Cascade))
            .column(ColumnDef::new("is_active", ColumnType::Bool).default_sql("TRUE"))
            .column(ColumnDef::new("vendor_code", ColumnType::Varchar(100)))
            .column(ColumnDef::new("price", ColumnType::Numeric(12, 2)).minimum(0.0))
            .column(
                ColumnDef::new("discount", ColumnType::Numeric(12, 2))
                    .default_sql("0")
                    .minimum(0.0),
            )
            .column(ColumnDef::new("color_id", ColumnType::BigInt).references("colors", OnDelete::Restrict))
            .column(
                ColumnDef::new("miniature_id", ColumnType::BigInt)
                    .nullable()
                    .references("files", OnDelete::SetNull),
            )
            .created_at(),
    ]
}

fn many_to_many() -> Vec<ManyToManyDef> {
    vec![
        ManyToManyDef::new("catalog_files", ("catalogs", "catalog_id"), ("files", "file_id")),
        ManyToManyDef::new("specification_sizes", ("specifications", "specification_id"), ("sizes", "size_id")),
        ManyToManyDef::new("specification_files", ("specifications", "specification_id"), ("files", "file_id")),
    ]
}

fn serializers() -> Vec<Serializer> {
    vec![
        Serializer::new("GetCategory", "categories").id().localized("name"),
        Serializer::new("MultiLanguageCategory", "categories").id().translations("name"),
        Serializer::new("PostCategory", "categories").translations("name"),
        Serializer::new("GetColor", "colors").id().localized("name"),
        Serializer::new("PostColor", "colors").id().translations("name"),
        Serializer::new("GetSize", "sizes")
            .id()
            .localized("name")
            .column("size_type")
            .display("size_type_display", "size_type"),
        Serializer::new("PostSize", "sizes").id().translations("name").column("size_type"),
        Serializer::new("GetCatalog", "catalogs")
            .id()
            .localized("name")
            .localized("description")
            .many_nested("files", "catalog_files", "File")
            .localized("shape")
            .localized("material")
            .related_localized("category", "category_id", "name"),
        Serializer::new("GetSpecification", "specifications")
            .id()
            .column("is_active")
            .column("vendor_code")
            .column("price")
            .column("discount")
            .related("miniature", "miniature_id", "path")
            .related_localized("catalog", "catalog_id", "name")
            .many_nested("size", "specification_sizes", "GetSize")
            .related_localized("color", "color_id", "name")
            .many_nested("files", "specification_files", "File"),
        Serializer::new("PostSpecification", "specifications")
            .id()
            .column("is_active")
            .column("vendor_code")
            .column("price")
            .column("discount")
            .foreign_key("miniature", "miniature_id")
            .foreign_key("catalog", "catalog_id")
            .many_ids("size", "specification_sizes")
            .foreign_key("color", "color_id")
            .many_ids("files", "specification_files"),
        Serializer::new("InsideCatalogSpecification", "specifications")
            .id()
            .column("is_active")
            .column("vendor_code")
            .column("price")
            .column("discount")
            .optional_foreign_key("miniature", "miniature_id")
            .many_ids("size", "specification_sizes")
            .foreign_key("color", "color_id")
            .many_ids("files", "specification_files"),
        Serializer::new("ProductSpecification", "specifications")
            .column("price")
            .column("discount")
            .related_localized("color", "color_id", "name")
            .many_nested("size", "specification_sizes", "GetSize")
            .column("vendor_code")
            .nested("miniature", "miniature_id", "File"),
        Serializer::new("SearchProduct", "catalogs")
            .id()
            .localized("name")
            .localized("description")
            .many_nested("files", "catalog_files", "File")
            .related_localized("category", "category_id", "name")
            .children_where("specs", "specifications", "catalog_id", "ProductSpecification", "is_active"),
        Serializer::new("PostCatalog", "catalogs")
            .id()
            .translations("name")
            .translations("description")
            .translations("shape")
            .translations("material")
            .many_ids("files", "catalog_files")
            .writable_children("specs", "specifications", "catalog_id", "InsideCatalogSpecification")
            .foreign_key("category", "category_id"),
        Serializer::new("RetrieveCatalog", "catalogs")
            .id()
            .translations("name")
            .translations("description")
            .many_nested("files", "catalog_files", "File")
            .translations("shape")
            .translations("material")
            .nested("category", "category_id", "MultiLanguageCategory")
            .children("specs", "specifications", "catalog_id", "GetSpecification"),
        Serializer::new("MultiLanguageCatalog", "catalogs")
            .id()
            .translations("name")
            .translations("description")
            .translations("shape")
            .translations("material")
            .children("specs", "specifications", "catalog_id", "GetSpecification")
            .many_nested("files", "catalog_files", "File")
            .nested("category", "category_id", "MultiLanguageCategory"),
    ]
}

pub fn model() -> ModelDef {
    let names = all("name");
    ModelDef {
        tables: tables(),
        many_to_many: many_to_many(),
        serializers: serializers(),
        viewsets: vec![
            ViewSet::new("catalog.category", "/catalog/category/", "categories")
                .serializers("GetCategory", "PostCategory"),
            ViewSet::new("catalog.color", "/catalog/color/", "colors").serializers("GetColor", "PostColor"),
            ViewSet::new("catalog.size", "/catalog/size/", "sizes")
                .serializers("GetSize", "PostSize")
                .query(Query::new().paginated().filter("size_type", "size_type")),
            ViewSet::new("catalog.catalog", "/catalog/catalog/", "catalogs")
                .serializers("GetCatalog", "PostCatalog")
                .retrieve_with("RetrieveCatalog")
                .query(
                    Query::new()
                        .paginated()
                        .search(&names)
                        .filter("category", "category_id")
                        .order_by("-id"),
                ),
            ViewSet::new("catalog.specification", "/catalog/specification/", "specifications")
                .serializers("GetSpecification", "PostSpecification")
                .query(
                    Query::new()
                        .paginated()
                        .filter("catalog", "catalog_id")
                        .filter("color", "color_id")
                        .filter("is_active", "is_active"),
                ),
        ],
        views: vec![
            View::retrieve(
                "catalog.catalog.all",
                "/catalog/catalog/{id}/all/",
                "catalogs",
                "MultiLanguageCatalog",
                Query::new(),
            ),
            View::list(
                "catalog.search",
                "/catalog/search/",
                "catalogs",
                "SearchProduct",
                Query::new()
                    .paginated()
                    .search(&names)
                    .search(&all("description"))
                    .filter("category", "category_id")
                    .orderable("created_at")
                    .order_by("-id"),
            ),
        ],
    }
}
