//! Field-keyed validation errors in the shape REST clients already expect.

use serde_json::{Map, Value};
use std::fmt;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Messages per field. Nested child lists hold one error object per item,
/// `{}` for items that passed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationErrors {
    fields: Map<String, Value>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let entry = self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            list.push(Value::String(message.into()));
        }
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(NON_FIELD_ERRORS, message);
        errors
    }

    /// Records per-item errors of a nested list; nothing is recorded when every item passed.
    pub fn add_items(&mut self, field: &str, items: Vec<ValidationErrors>) {
        if items.iter().all(ValidationErrors::is_empty) {
            return;
        }
        let list = items.into_iter().map(ValidationErrors::into_value).collect();
        self.fields.insert(field.to_string(), Value::Array(list));
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Plain messages recorded for `field`.
    pub fn messages(&self, field: &str) -> Vec<&str> {
        match self.fields.get(field) {
            Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Err with the collected errors, or Ok when there are none.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "{}", fields.join(", "))
    }
}
