//! Binds JSON values as PostgreSQL text parameters.

use crate::sql::QueryBuf;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgArguments, PgRow, PgTypeInfo, Postgres};
use sqlx::query::{Query, QueryScalar};
use sqlx::{Database, FromRow};

/// Every parameter travels as text; placeholders carry an explicit `::type`
/// cast so the server converts it to the column type.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Text(String),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Text(b.to_string()),
            Value::Number(n) => PgBindValue::Text(n.to_string()),
            Value::String(s) => PgBindValue::Text(s.clone()),
            Value::Array(items) => PgBindValue::Text(array_literal(items)),
            Value::Object(_) => PgBindValue::Text(v.to_string()),
        }
    }
}

/// `{1,2,3}` array literal; only scalar items are expected.
fn array_literal(items: &[Value]) -> String {
    let inner: Vec<String> = items
        .iter()
        .map(|v| match v {
            Value::Null => "NULL".to_string(),
            Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            other => other.to_string(),
        })
        .collect();
    format!("{{{}}}", inner.join(","))
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            PgBindValue::Null => Ok(IsNull::Yes),
            PgBindValue::Text(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf),
        }
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl QueryBuf {
    /// Statement with every parameter bound, for execute or row fetches.
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %self.sql, params = ?self.params, "query");
        let mut query = sqlx::query(&self.sql);
        for p in &self.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    /// Same as [`QueryBuf::query`] but decoding the first column as `O`.
    pub fn scalar<O>(&self) -> QueryScalar<'_, Postgres, O, PgArguments>
    where
        (O,): for<'r> FromRow<'r, PgRow>,
    {
        tracing::debug!(sql = %self.sql, params = ?self.params, "query");
        let mut query = sqlx::query_scalar::<_, O>(&self.sql);
        for p in &self.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_become_text() {
        assert_eq!(PgBindValue::from_json(&json!(true)), PgBindValue::Text("true".into()));
        assert_eq!(PgBindValue::from_json(&json!(12)), PgBindValue::Text("12".into()));
        assert_eq!(PgBindValue::from_json(&json!(null)), PgBindValue::Null);
    }

    #[test]
    fn id_lists_become_array_literals() {
        assert_eq!(PgBindValue::from_json(&json!([1, 2, 3])), PgBindValue::Text("{1,2,3}".into()));
        assert_eq!(PgBindValue::from_json(&json!([])), PgBindValue::Text("{}".into()));
    }
}
