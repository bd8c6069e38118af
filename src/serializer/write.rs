//! Parses request bodies into write plans, collecting field errors the way
//! clients of the REST API expect them.

use crate::config::{ColumnDef, ColumnType, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::serializer::{Field, Serializer, ValidationErrors, NON_FIELD_ERRORS};
use regex::Regex;
use serde_json::{Map, Value};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";
const NOT_INTEGER: &str = "A valid integer is required.";
const NOT_NUMBER: &str = "A valid number is required.";
const NOT_BOOLEAN: &str = "Must be a valid boolean.";
const NOT_STRING: &str = "Not a valid string.";
const NO_MATCH: &str = "Enter a valid value.";
const BAD_DATETIME: &str =
    "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Create,
    /// PUT: required fields must be present.
    Update,
    /// PATCH: only present fields are validated and written.
    PartialUpdate,
}

impl Mode {
    fn enforces_required(self) -> bool {
        self != Mode::PartialUpdate
    }
}

/// Rows linked through a join table; replaces the current links when written.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub field: String,
    pub through: String,
    pub ids: Vec<i64>,
}

/// Child rows that replace every existing child of the parent.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildSet {
    pub field: String,
    pub table: String,
    pub fk: String,
    pub items: Vec<WriteData>,
}

/// Ids a field points at; all must exist before anything is written.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub field: String,
    pub table: String,
    pub ids: Vec<i64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteData {
    pub columns: Vec<(String, Value)>,
    pub links: Vec<Link>,
    pub children: Vec<ChildSet>,
    pub references: Vec<Reference>,
}

impl WriteData {
    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(c, _)| c == name).map(|(_, v)| v)
    }
}

/// Validate `body` against the writable fields of `serializer`.
pub fn parse(model: &ResolvedModel, serializer: &str, body: &Value, mode: Mode) -> Result<WriteData, AppError> {
    let ser = model.serializer(serializer)?;
    let Value::Object(map) = body else {
        return Err(ValidationErrors::non_field(expected_dict(body)).into());
    };
    let mut errors = ValidationErrors::new();
    let data = parse_object(model, ser, map, mode, &mut errors)?;
    errors.into_result()?;
    Ok(data)
}

fn parse_object(
    model: &ResolvedModel,
    ser: &Serializer,
    body: &Map<String, Value>,
    mode: Mode,
    errors: &mut ValidationErrors,
) -> Result<WriteData, ConfigError> {
    let table = model.table(&ser.table)?;
    let mut data = WriteData::default();
    for field in ser.fields.iter().filter(|f| f.is_writable()) {
        let name = field.name();
        let value = body.get(name);
        match field {
            Field::Column { .. } => {
                let def = column(table, name)?;
                match value {
                    None => {
                        if mode.enforces_required() && def.is_required() {
                            errors.add(name, REQUIRED);
                        }
                    }
                    Some(Value::Null) if def.nullable => data.columns.push((name.to_string(), Value::Null)),
                    Some(Value::Null) => errors.add(name, NOT_NULL),
                    Some(v) => match coerce(def, v) {
                        Ok(v) => data.columns.push((name.to_string(), v)),
                        Err(message) => errors.add(name, message),
                    },
                }
            }
            Field::ForeignKey { fk, omit_blank, .. } => {
                let def = column(table, fk)?;
                let target = model.referenced(table, fk)?;
                match value {
                    None => {
                        if mode.enforces_required() && def.is_required() {
                            errors.add(name, REQUIRED);
                        }
                    }
                    Some(v) if is_blank(v) && *omit_blank => {}
                    Some(v) if is_blank(v) => {
                        if def.nullable {
                            data.columns.push((fk.clone(), Value::Null));
                        } else {
                            errors.add(name, NOT_NULL);
                        }
                    }
                    Some(v) => match primary_key(v) {
                        Ok(id) => {
                            data.columns.push((fk.clone(), Value::from(id)));
                            data.references.push(Reference {
                                field: name.to_string(),
                                table: target.name.clone(),
                                ids: vec![id],
                            });
                        }
                        Err(message) => errors.add(name, message),
                    },
                }
            }
            Field::ManyIds { through, .. } => {
                let m = model.through(through)?;
                match value {
                    None => {
                        if mode.enforces_required() {
                            errors.add(name, REQUIRED);
                        }
                    }
                    Some(Value::Array(items)) => match items.iter().map(primary_key).collect::<Result<Vec<_>, _>>() {
                        Ok(mut ids) => {
                            dedup(&mut ids);
                            data.references.push(Reference {
                                field: name.to_string(),
                                table: m.target.clone(),
                                ids: ids.clone(),
                            });
                            data.links.push(Link {
                                field: name.to_string(),
                                through: through.clone(),
                                ids,
                            });
                        }
                        Err(message) => errors.add(name, message),
                    },
                    Some(Value::Null) => errors.add(name, NOT_NULL),
                    Some(other) => errors.add(name, expected_list(other)),
                }
            }
            Field::Children {
                table: child,
                fk,
                serializer,
                ..
            } => match value {
                None if mode.enforces_required() => errors.add(name, REQUIRED),
                // Omitted on PATCH: the stored children are still replaced, by nothing.
                None => data.children.push(ChildSet {
                    field: name.to_string(),
                    table: child.clone(),
                    fk: fk.clone(),
                    items: Vec::new(),
                }),
                Some(Value::Array(items)) => {
                    let child_ser = model.serializer(serializer)?;
                    let mut item_errors = Vec::with_capacity(items.len());
                    let mut parsed = Vec::with_capacity(items.len());
                    for item in items {
                        let mut e = ValidationErrors::new();
                        match item {
                            Value::Object(obj) => parsed.push(parse_object(model, child_ser, obj, Mode::Create, &mut e)?),
                            other => e.add(NON_FIELD_ERRORS, expected_dict(other)),
                        }
                        item_errors.push(e);
                    }
                    errors.add_items(name, item_errors);
                    data.children.push(ChildSet {
                        field: name.to_string(),
                        table: child.clone(),
                        fk: fk.clone(),
                        items: parsed,
                    });
                }
                Some(Value::Null) => errors.add(name, NOT_NULL),
                Some(other) => errors.add(name, expected_list(other)),
            },
            _ => {}
        }
    }
    Ok(data)
}

fn column<'a>(table: &'a crate::config::TableDef, name: &str) -> Result<&'a ColumnDef, ConfigError> {
    table.get(name).ok_or_else(|| ConfigError::MissingReference {
        kind: "column",
        id: format!("{}.{}", table.name, name),
    })
}

fn dedup(ids: &mut Vec<i64>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
}

/// Name of the JSON value's type as API clients see it in messages.
fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn expected_dict(v: &Value) -> String {
    format!("Invalid data. Expected a dictionary, but got {}.", type_name(v))
}

fn expected_list(v: &Value) -> String {
    format!("Expected a list of items but got type \"{}\".", type_name(v))
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn primary_key(v: &Value) -> Result<i64, String> {
    let id = match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| format!("Incorrect type. Expected pk value, received {}.", type_name(v)))
}

/// Checks `v` against the column's type and rules; returns the value to store.
pub fn coerce(def: &ColumnDef, v: &Value) -> Result<Value, String> {
    match def.ty {
        ColumnType::Id | ColumnType::BigInt => integer(v).map(Value::from),
        ColumnType::Bool => boolean(v).map(Value::Bool),
        ColumnType::Numeric(precision, scale) => decimal(def, v, precision, scale).map(Value::String),
        ColumnType::Timestamptz => datetime(v).map(Value::String),
        ColumnType::Text | ColumnType::Varchar(_) => text(def, v).map(Value::String),
    }
}

fn integer(v: &Value) -> Result<i64, String> {
    let parsed = match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    };
    parsed.ok_or_else(|| NOT_INTEGER.to_string())
}

/// `f` as an integer when it has no fraction and fits in `i64`.
fn whole_number(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it overflows.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then(|| f as i64)
}

fn boolean(v: &Value) -> Result<bool, String> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
            _ => Err(NOT_BOOLEAN.to_string()),
        },
        _ => Err(NOT_BOOLEAN.to_string()),
    }
}

/// Digits and an optional single decimal point, with an optional sign.
fn is_plain_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    !(int_part.is_empty() && frac_part.is_empty())
        && int_part.chars().all(|c| c.is_ascii_digit())
        && frac_part.chars().all(|c| c.is_ascii_digit())
}

fn decimal(def: &ColumnDef, v: &Value, precision: u8, scale: u8) -> Result<String, String> {
    let raw = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(NOT_NUMBER.to_string()),
    };
    let value: f64 = raw.parse().map_err(|_| NOT_NUMBER.to_string())?;
    if !value.is_finite() {
        return Err(NOT_NUMBER.to_string());
    }
    let plain = if is_plain_decimal(&raw) { raw } else { value.to_string() };
    let unsigned = plain.strip_prefix(['-', '+']).unwrap_or(&plain);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let int_digits = int_part.trim_start_matches('0').len();
    let frac_digits = frac_part.len();
    let (precision, scale) = (usize::from(precision), usize::from(scale));
    if int_digits + frac_digits > precision {
        return Err(format!("Ensure that there are no more than {} digits in total.", precision));
    }
    if frac_digits > scale {
        return Err(format!("Ensure that there are no more than {} decimal places.", scale));
    }
    if int_digits > precision - scale {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            precision - scale
        ));
    }
    if let Some(min) = def.rule.minimum {
        if value < min {
            return Err(format!("Ensure this value is greater than or equal to {}.", min));
        }
    }
    Ok(plain)
}

fn datetime(v: &Value) -> Result<String, String> {
    v.as_str()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.to_rfc3339())
        .ok_or_else(|| BAD_DATETIME.to_string())
}

fn text(def: &ColumnDef, v: &Value) -> Result<String, String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_STRING.to_string()),
    };
    if s.is_empty() {
        return if def.nullable { Ok(s) } else { Err(BLANK.to_string()) };
    }
    let len = s.chars().count();
    if let ColumnType::Varchar(max) = def.ty {
        if len > max as usize {
            return Err(format!("Ensure this field has no more than {} characters.", max));
        }
    }
    if let Some(min) = def.rule.min_length {
        if len < min as usize {
            return Err(format!("Ensure this field has at least {} characters.", min));
        }
    }
    if def.choices.is_some() && def.label(&s).is_none() {
        return Err(format!("\"{}\" is not a valid choice.", s));
    }
    if let Some(pattern) = &def.rule.pattern {
        // Patterns are checked to compile when the model is resolved.
        if let Ok(re) = Regex::new(pattern) {
            if !re.is_match(&s) {
                return Err(NO_MATCH.to_string());
            }
        }
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load;
    use serde_json::json;

    fn errors(model: &ResolvedModel, ser: &str, body: Value, mode: Mode) -> ValidationErrors {
        match parse(model, ser, &body, mode) {
            Err(AppError::Validation(e)) => e,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    fn catalog_body() -> Value {
        json!({
            "name_uz": "Ko'ylak",
            "description_uz": "Paxta",
            "shape_uz": "To'g'ri",
            "material_uz": "Paxta",
            "files": [4, "5", 4],
            "category": 1,
            "specs": [
                {"vendor_code": "A-1", "price": "120.50", "color": 2, "size": ["2", 3], "files": [], "miniature": ""},
                {"vendor_code": "A-2", "price": 99, "discount": 5, "color": 3, "size": [], "files": [8], "miniature": 7}
            ]
        })
    }

    #[test]
    fn required_translation_is_enforced_on_create_only() {
        let model = load().unwrap();
        let e = errors(&model, "PostColor", json!({"name_ru": "Красный"}), Mode::Create);
        assert_eq!(e.messages("name_uz"), [REQUIRED]);
        assert!(!e.contains("name_ru"));
        let data = parse(&model, "PostColor", &json!({"name_ru": "Красный"}), Mode::PartialUpdate).unwrap();
        assert_eq!(data.columns, vec![("name_ru".to_string(), json!("Красный"))]);
    }

    #[test]
    fn read_only_and_unknown_keys_are_ignored() {
        let model = load().unwrap();
        let data = parse(&model, "PostColor", &json!({"id": 9, "name_uz": " Qizil ", "x": 1}), Mode::Create).unwrap();
        assert_eq!(data.columns, vec![("name_uz".to_string(), json!("Qizil"))]);
    }

    #[test]
    fn blank_and_null_are_distinguished() {
        let model = load().unwrap();
        let e = errors(&model, "PostColor", json!({"name_uz": "  "}), Mode::Create);
        assert_eq!(e.messages("name_uz"), [BLANK]);
        let e = errors(&model, "PostColor", json!({"name_uz": null}), Mode::Create);
        assert_eq!(e.messages("name_uz"), [NOT_NULL]);
        let data = parse(&model, "PostColor", &json!({"name_uz": "a", "name_en": null}), Mode::Create).unwrap();
        assert_eq!(data.column("name_en"), Some(&Value::Null));
    }

    #[test]
    fn choices_are_checked() {
        let model = load().unwrap();
        let e = errors(&model, "PostSize", json!({"name_uz": "XL", "size_type": "hat"}), Mode::Create);
        assert_eq!(e.messages("size_type"), ["\"hat\" is not a valid choice."]);
    }

    #[test]
    fn decimals_are_validated() {
        let model = load().unwrap();
        let body = |price: Value| {
            json!({"vendor_code": "v", "price": price, "color": 1, "catalog": 1, "size": [], "files": []})
        };
        let e = errors(&model, "PostSpecification", body(json!("abc")), Mode::Create);
        assert_eq!(e.messages("price"), [NOT_NUMBER]);
        let e = errors(&model, "PostSpecification", body(json!("-1")), Mode::Create);
        assert_eq!(e.messages("price"), ["Ensure this value is greater than or equal to 0."]);
        let e = errors(&model, "PostSpecification", body(json!("1.005")), Mode::Create);
        assert_eq!(e.messages("price"), ["Ensure that there are no more than 2 decimal places."]);
        let e = errors(&model, "PostSpecification", body(json!("1234567890123")), Mode::Create);
        assert_eq!(e.messages("price"), ["Ensure that there are no more than 12 digits in total."]);
        let data = parse(&model, "PostSpecification", &body(json!(10.5)), Mode::Create).unwrap();
        assert_eq!(data.column("price"), Some(&json!("10.5")));
    }

    #[test]
    fn phone_pattern_applies() {
        let model = load().unwrap();
        let e = errors(&model, "GiveApplication", json!({"full_name": "Ali", "phone": "call me"}), Mode::Create);
        assert_eq!(e.messages("phone"), [NO_MATCH]);
        let data = parse(&model, "GiveApplication", &json!({"full_name": "Ali", "phone": "+998901234567"}), Mode::Create)
            .unwrap();
        assert_eq!(data.column("phone"), Some(&json!("+998901234567")));
    }

    #[test]
    fn catalog_with_specs_builds_child_plan() {
        let model = load().unwrap();
        let data = parse(&model, "PostCatalog", &catalog_body(), Mode::Create).unwrap();
        assert_eq!(data.column("category_id"), Some(&json!(1)));
        assert_eq!(data.links, vec![Link {
            field: "files".into(),
            through: "catalog_files".into(),
            ids: vec![4, 5],
        }]);
        let specs = &data.children[0];
        assert_eq!((specs.table.as_str(), specs.fk.as_str()), ("specifications", "catalog_id"));
        assert_eq!(specs.items.len(), 2);
        let first = &specs.items[0];
        assert_eq!(first.column("miniature_id"), None);
        assert_eq!(first.column("catalog_id"), None);
        assert_eq!(first.column("price"), Some(&json!("120.50")));
        assert_eq!(first.links[0].ids, vec![2, 3]);
        assert!(first.references.iter().any(|r| r.table == "sizes" && r.ids == vec![2, 3]));
        assert_eq!(specs.items[1].column("miniature_id"), Some(&json!(7)));
    }

    #[test]
    fn child_errors_keep_their_position() {
        let model = load().unwrap();
        let mut body = catalog_body();
        body["specs"][1] = json!({"color": "red", "price": "1"});
        let e = errors(&model, "PostCatalog", body, Mode::Create);
        let specs = e.get("specs").unwrap().as_array().unwrap();
        assert_eq!(specs[0], json!({}));
        assert_eq!(specs[1]["color"], json!(["Incorrect type. Expected pk value, received str."]));
        assert_eq!(specs[1]["vendor_code"], json!([REQUIRED]));
    }

    #[test]
    fn specs_are_required_except_on_patch() {
        let model = load().unwrap();
        let mut body = catalog_body();
        body.as_object_mut().unwrap().remove("specs");
        let e = errors(&model, "PostCatalog", body.clone(), Mode::Update);
        assert_eq!(e.messages("specs"), [REQUIRED]);
        let data = parse(&model, "PostCatalog", &body, Mode::PartialUpdate).unwrap();
        assert_eq!(data.children.len(), 1);
        assert_eq!(data.children[0].table, "specifications");
        assert!(data.children[0].items.is_empty());
    }

    #[test]
    fn id_lists_are_required_on_create_and_put() {
        let model = load().unwrap();
        let mut body = catalog_body();
        body.as_object_mut().unwrap().remove("files");
        body["specs"][0].as_object_mut().unwrap().remove("size");
        let e = errors(&model, "PostCatalog", body.clone(), Mode::Create);
        assert_eq!(e.messages("files"), [REQUIRED]);
        let specs = e.get("specs").unwrap().as_array().unwrap();
        assert_eq!(specs[0]["size"], json!([REQUIRED]));
        assert_eq!(specs[1], json!({}));
        let e = errors(&model, "PostCatalog", body, Mode::Update);
        assert_eq!(e.messages("files"), [REQUIRED]);

        let spec = json!({"vendor_code": "v", "price": 1, "color": 1, "catalog": 1});
        let e = errors(&model, "PostSpecification", spec.clone(), Mode::Create);
        assert_eq!(e.messages("size"), [REQUIRED]);
        assert_eq!(e.messages("files"), [REQUIRED]);
        let data = parse(&model, "PostSpecification", &json!({"price": 2}), Mode::PartialUpdate).unwrap();
        assert!(data.links.is_empty());
    }

    #[test]
    fn empty_id_lists_are_allowed() {
        let model = load().unwrap();
        let mut body = catalog_body();
        body["files"] = json!([]);
        let data = parse(&model, "PostCatalog", &body, Mode::Create).unwrap();
        assert_eq!(data.links[0].ids, Vec::<i64>::new());
    }

    #[test]
    fn integers_outside_i64_are_rejected() {
        let model = load().unwrap();
        let id = model.table("specifications").unwrap().get("catalog_id").unwrap();
        assert_eq!(coerce(id, &json!("1e30")), Err(NOT_INTEGER.to_string()));
        assert_eq!(coerce(id, &json!(1e30)), Err(NOT_INTEGER.to_string()));
        assert_eq!(coerce(id, &json!("9223372036854775808")), Err(NOT_INTEGER.to_string()));
        assert_eq!(coerce(id, &json!("4.0")), Ok(json!(4)));
        assert_eq!(coerce(id, &json!("9223372036854775807")), Ok(json!(i64::MAX)));
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        let model = load().unwrap();
        let e = errors(&model, "PostColor", json!([1, 2]), Mode::Create);
        assert_eq!(
            e.messages(NON_FIELD_ERRORS),
            ["Invalid data. Expected a dictionary, but got list."]
        );
        let e = errors(&model, "PostCatalog", json!({"specs": {"a": 1}}), Mode::PartialUpdate);
        assert_eq!(e.messages("specs"), ["Expected a list of items but got type \"dict\"."]);
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let model = load().unwrap();
        let body = json!({
            "vendor_code": "v", "price": 1, "color": 1, "catalog": 1, "size": [], "files": [], "is_active": "false"
        });
        let data = parse(&model, "PostSpecification", &body, Mode::Create).unwrap();
        assert_eq!(data.column("is_active"), Some(&json!(false)));
        let mut bad = body.clone();
        bad["is_active"] = json!("maybe");
        assert_eq!(errors(&model, "PostSpecification", bad, Mode::Create).messages("is_active"), [NOT_BOOLEAN]);
    }
}
