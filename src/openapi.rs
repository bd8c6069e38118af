//! OpenAPI document generated from the resolved model.

use crate::apps::shopping::ACCEPT_PATH;
use crate::config::{ColumnDef, ColumnType, Query, ResolvedModel, ViewKind};
use crate::error::ConfigError;
use crate::language::Language;
use crate::serializer::{Field, Serializer};
use utoipa::openapi::path::{HttpMethod, Operation, OperationBuilder, Parameter, ParameterBuilder, ParameterIn, PathItemBuilder};
use utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};
use utoipa::openapi::response::ResponseBuilder;
use utoipa::openapi::schema::{Array, KnownFormat, ObjectBuilder, Schema, SchemaFormat, SchemaType, Type};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr, Required,
    Response,
};

pub const API_PREFIX: &str = "/api/v1";

fn schema_type(ty: Type, nullable: bool) -> SchemaType {
    if nullable {
        SchemaType::Array(vec![ty, Type::Null])
    } else {
        SchemaType::Type(ty)
    }
}

fn scalar(ty: Type) -> RefOr<Schema> {
    Schema::Object(ObjectBuilder::new().schema_type(SchemaType::Type(ty)).build()).into()
}

fn reference(serializer: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(serializer))
}

fn array(items: RefOr<Schema>) -> RefOr<Schema> {
    Schema::Array(Array::new(items)).into()
}

fn column_schema(col: &ColumnDef, read_only: bool) -> RefOr<Schema> {
    let (ty, format) = match col.ty {
        ColumnType::Id | ColumnType::BigInt => (Type::Integer, Some(SchemaFormat::KnownFormat(KnownFormat::Int64))),
        ColumnType::Bool => (Type::Boolean, None),
        ColumnType::Numeric(_, _) => (Type::String, Some(SchemaFormat::Custom("decimal".into()))),
        ColumnType::Timestamptz => (Type::String, Some(SchemaFormat::KnownFormat(KnownFormat::DateTime))),
        ColumnType::Text | ColumnType::Varchar(_) => (Type::String, None),
    };
    let mut builder = ObjectBuilder::new()
        .schema_type(schema_type(ty, col.nullable))
        .format(format)
        .read_only(read_only.then_some(true));
    if let ColumnType::Varchar(n) = col.ty {
        builder = builder.max_length(Some(n as usize));
    }
    if let Some(choices) = col.choices {
        builder = builder.enum_values(Some(choices.iter().map(|c| c.value)));
    }
    Schema::Object(builder.build()).into()
}

/// Component schema for one serializer, with the fields a create must supply marked required.
fn serializer_schema(model: &ResolvedModel, ser: &Serializer) -> Result<Schema, ConfigError> {
    let table = model.table(&ser.table)?;
    let column = |name: &str| {
        table.get(name).ok_or_else(|| ConfigError::MissingReference {
            kind: "column",
            id: format!("{}.{}", table.name, name),
        })
    };
    let mut object = ObjectBuilder::new().schema_type(SchemaType::Type(Type::Object));
    for field in &ser.fields {
        let (schema, required) = match field {
            Field::Column { name, read_only } => {
                let col = column(name)?;
                let read_only = *read_only || col.ty == ColumnType::Id;
                (column_schema(col, read_only), !read_only && col.is_required())
            }
            Field::Localized { name } => (column_schema(column(&Language::PRIMARY.column(name))?, true), false),
            Field::Display { .. } => (
                Schema::Object(ObjectBuilder::new().schema_type(Type::String).read_only(Some(true)).build()).into(),
                false,
            ),
            Field::Related { .. } => (
                Schema::Object(
                    ObjectBuilder::new()
                        .schema_type(schema_type(Type::String, true))
                        .read_only(Some(true))
                        .build(),
                )
                .into(),
                false,
            ),
            Field::Nested { serializer, .. } => (reference(serializer), false),
            Field::ForeignKey { fk, omit_blank, .. } => {
                let col = column(fk)?;
                (column_schema(col, false), !omit_blank && col.is_required())
            }
            Field::ManyNested { serializer, .. } => (array(reference(serializer)), false),
            Field::ManyIds { .. } => (array(scalar(Type::Integer)), false),
            Field::Children {
                serializer, writable, ..
            } => (array(reference(serializer)), *writable),
        };
        object = object.property(field.name(), schema);
        if required {
            object = object.required(field.name());
        }
    }
    Ok(Schema::Object(object.build()))
}

/// `{"data": ..., "meta": {...}}` around the payload.
fn envelope(data: RefOr<Schema>) -> RefOr<Schema> {
    Schema::Object(
        ObjectBuilder::new()
            .schema_type(SchemaType::Type(Type::Object))
            .property("data", data)
            .property("meta", scalar(Type::Object))
            .required("data")
            .build(),
    )
    .into()
}

fn response(description: &str, schema: Option<RefOr<Schema>>) -> RefOr<Response> {
    let mut builder = ResponseBuilder::new().description(description);
    if let Some(s) = schema {
        builder = builder.content("application/json", ContentBuilder::new().schema(Some(s)).build());
    }
    RefOr::T(builder.build())
}

fn request_body(serializer: &str) -> RequestBody {
    RequestBodyBuilder::new()
        .content("application/json", ContentBuilder::new().schema(Some(reference(serializer))).build())
        .required(Some(Required::True))
        .build()
}

fn query_parameter(name: &str, ty: Type) -> Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .schema(Some(scalar(ty)))
        .build()
}

fn id_parameter() -> Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(scalar(Type::Integer)))
        .build()
}

fn list_parameters(query: &Query) -> Vec<Parameter> {
    let mut params = Vec::new();
    if query.paginate {
        params.push(query_parameter("page", Type::Integer));
        params.push(query_parameter("page_size", Type::Integer));
    }
    if !query.search_fields.is_empty() {
        params.push(query_parameter("search", Type::String));
    }
    if !query.ordering_fields.is_empty() {
        params.push(query_parameter("ordering", Type::String));
    }
    for (param, _) in &query.filter_fields {
        params.push(query_parameter(param, Type::String));
    }
    params
}

/// First path segment, e.g. `catalog` for `/catalog/color/`.
fn tag(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

fn operation(path: &str, id: String, summary: &str) -> OperationBuilder {
    OperationBuilder::new()
        .tag(tag(path))
        .operation_id(Some(id.replace('.', "_")))
        .summary(Some(summary))
}

fn list_operation(path: &str, id: String, serializer: &str, query: &Query) -> Operation {
    let mut builder = operation(path, id, "List").response("200", response("List", Some(envelope(array(reference(serializer))))));
    for p in list_parameters(query) {
        builder = builder.parameter(p);
    }
    builder.build()
}

fn retrieve_operation(path: &str, id: String, serializer: &str) -> Operation {
    operation(path, id, "Retrieve")
        .parameter(id_parameter())
        .response("200", response("Item", Some(envelope(reference(serializer)))))
        .response("404", response("Not found", None))
        .build()
}

fn create_operation(path: &str, id: String, serializer: &str) -> Operation {
    operation(path, id, "Create")
        .request_body(Some(request_body(serializer)))
        .response("201", response("Created", Some(envelope(reference(serializer)))))
        .response("400", response("Validation error", None))
        .build()
}

fn update_operation(path: &str, id: String, serializer: &str, summary: &str) -> Operation {
    operation(path, id, summary)
        .parameter(id_parameter())
        .request_body(Some(request_body(serializer)))
        .response("200", response("Updated", Some(envelope(reference(serializer)))))
        .response("400", response("Validation error", None))
        .response("404", response("Not found", None))
        .build()
}

pub fn document(model: &ResolvedModel) -> Result<OpenApi, ConfigError> {
    let mut components = ComponentsBuilder::new();
    for ser in model.serializers() {
        components = components.schema(ser.name.clone(), serializer_schema(model, ser)?);
    }

    let mut paths = PathsBuilder::new();
    for vs in &model.viewsets {
        let collection = PathItemBuilder::new()
            .operation(HttpMethod::Get, list_operation(&vs.path, format!("{}.list", vs.key), &vs.list, &vs.query))
            .operation(HttpMethod::Post, create_operation(&vs.path, format!("{}.create", vs.key), &vs.write))
            .build();
        let detail = PathItemBuilder::new()
            .operation(HttpMethod::Get, retrieve_operation(&vs.path, format!("{}.retrieve", vs.key), &vs.retrieve))
            .operation(
                HttpMethod::Put,
                update_operation(&vs.path, format!("{}.update", vs.key), &vs.write, "Update"),
            )
            .operation(
                HttpMethod::Patch,
                update_operation(&vs.path, format!("{}.partial_update", vs.key), &vs.write, "Partial update"),
            )
            .operation(
                HttpMethod::Delete,
                operation(&vs.path, format!("{}.destroy", vs.key), "Delete")
                    .parameter(id_parameter())
                    .response("204", response("Deleted", None))
                    .response("404", response("Not found", None))
                    .response("409", response("Still referenced", None))
                    .build(),
            )
            .build();
        paths = paths
            .path(format!("{}{}", API_PREFIX, vs.path), collection)
            .path(format!("{}{}", API_PREFIX, vs.detail_path()), detail);
    }
    for v in &model.views {
        let (method, op) = match v.kind {
            ViewKind::List => (HttpMethod::Get, list_operation(&v.path, v.key.clone(), &v.serializer, &v.query)),
            ViewKind::Retrieve => (HttpMethod::Get, retrieve_operation(&v.path, v.key.clone(), &v.serializer)),
            ViewKind::Create => (HttpMethod::Post, create_operation(&v.path, v.key.clone(), &v.serializer)),
        };
        paths = paths.path(format!("{}{}", API_PREFIX, v.path), PathItemBuilder::new().operation(method, op).build());
    }
    let accept = operation(ACCEPT_PATH, "shopping.accept".to_string(), "Accept application")
        .parameter(id_parameter())
        .response("200", response("Accepted", Some(envelope(reference("Application")))))
        .response("404", response("Not found", None))
        .build();
    paths = paths.path(
        format!("{}{}", API_PREFIX, ACCEPT_PATH),
        PathItemBuilder::new().operation(HttpMethod::Post, accept).build(),
    );

    Ok(OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths)
        .components(Some(components.build()))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load;
    use serde_json::Value;

    fn doc() -> Value {
        serde_json::to_value(document(&load().unwrap()).unwrap()).unwrap()
    }

    #[test]
    fn viewsets_expose_collection_and_detail() {
        let v = doc();
        let detail = &v["paths"]["/api/v1/catalog/catalog/{id}/"];
        for method in ["get", "put", "patch", "delete"] {
            assert!(detail[method].is_object(), "missing {}", method);
        }
        assert!(v["paths"]["/api/v1/catalog/catalog/"]["post"].is_object());
        assert!(v["paths"]["/api/v1/shopping/accept/application/{id}/"]["post"].is_object());
    }

    #[test]
    fn serializers_become_components() {
        let v = doc();
        let catalog = &v["components"]["schemas"]["PostCatalog"];
        assert_eq!(catalog["properties"]["specs"]["type"], "array");
        let required: Vec<&str> = catalog["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"name_uz"));
        assert!(required.contains(&"specs"));
        assert!(!required.contains(&"name_ru"));
    }

    #[test]
    fn list_parameters_follow_query() {
        let q = Query::new().paginated().orderable("created_at").filter("is_accepted", "is_accepted");
        let names: Vec<String> = list_parameters(&q).into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["page", "page_size", "ordering", "is_accepted"]);
    }
}
