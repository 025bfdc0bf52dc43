//! Convert serde_json::Value to types that sqlx can bind.

use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;

/// A value that can be bound to a MySQL `?` placeholder. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    Json(Value),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    BindValue::U64(u)
                } else {
                    BindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => BindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }

    /// Bind onto a query in placeholder order.
    pub fn bind_to<'q>(self, query: Query<'q, MySql, MySqlArguments>) -> Query<'q, MySql, MySqlArguments> {
        match self {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(b),
            BindValue::I64(n) => query.bind(n),
            BindValue::U64(n) => query.bind(n),
            BindValue::F64(n) => query.bind(n),
            BindValue::String(s) => query.bind(s),
            BindValue::Json(v) => query.bind(sqlx::types::Json(v)),
        }
    }
}

/// Bind every arg in order.
pub fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for a in args {
        query = BindValue::from_json(a).bind_to(query);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_keep_their_width() {
        assert_eq!(BindValue::from_json(&json!(5)), BindValue::I64(5));
        assert_eq!(BindValue::from_json(&json!(u64::MAX)), BindValue::U64(u64::MAX));
        assert_eq!(BindValue::from_json(&json!(1.5)), BindValue::F64(1.5));
    }

    #[test]
    fn composites_bind_as_json() {
        let v = json!({ "a": [1, 2] });
        assert_eq!(BindValue::from_json(&v), BindValue::Json(v.clone()));
        assert_eq!(BindValue::from_json(&Value::Null), BindValue::Null);
        assert_eq!(BindValue::from_json(&json!("x")), BindValue::String("x".into()));
    }
}
