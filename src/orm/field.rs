//! Field descriptors: one mapped column each.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Column type. `Varchar` carries its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Varchar(u32),
    BigInt,
    Boolean,
    Real,
    Text,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Varchar(n) => write!(f, "varchar({})", n),
            SqlType::BigInt => f.write_str("bigint"),
            SqlType::Boolean => f.write_str("boolean"),
            SqlType::Real => f.write_str("real"),
            SqlType::Text => f.write_str("text"),
        }
    }
}

/// Default used by `save` for a field left unset.
#[derive(Clone, Default)]
pub enum FieldDefault {
    #[default]
    None,
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    /// The producer is called on every resolve; literals are cloned verbatim.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Value(v) => Some(v.clone()),
            FieldDefault::Producer(f) => Some(f()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FieldDefault::None)
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::None => f.write_str("None"),
            FieldDefault::Value(v) => write!(f, "Value({})", v),
            FieldDefault::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub default: FieldDefault,
}

impl Field {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Field {
            name: name.into(),
            sql_type,
            primary_key: false,
            default: FieldDefault::None,
        }
    }

    /// `varchar(50)`, no default.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Varchar(50))
    }

    /// `boolean`, defaults to false.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Boolean).default_value(false)
    }

    /// `bigint`, defaults to 0.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::BigInt).default_value(0)
    }

    /// `real`, defaults to 0.0.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Real).default_value(0.0)
    }

    /// `text`, no default.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Text)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = sql_type;
        self
    }

    pub fn default_value(mut self, v: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(v.into());
        self
    }

    /// Default computed at save time, e.g. [`next_id`] or [`now_ts`].
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = FieldDefault::Producer(Arc::new(f));
        self
    }
}

/// Time-ordered 50-character id: 15-digit milliseconds, 32 hex chars of a v4 uuid, `000`.
pub fn next_id() -> Value {
    let millis = chrono::Utc::now().timestamp_millis();
    Value::String(format!("{:015}{}000", millis, uuid::Uuid::new_v4().simple()))
}

/// Seconds since the epoch as a float.
pub fn now_ts() -> Value {
    let now = chrono::Utc::now();
    let secs = now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0;
    Value::from(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn typed_constructors_carry_defaults() {
        assert_eq!(Field::boolean("admin").default.resolve(), Some(Value::Bool(false)));
        assert_eq!(Field::integer("n").default.resolve(), Some(Value::from(0)));
        assert_eq!(Field::float("created_at").default.resolve(), Some(Value::from(0.0)));
        assert!(Field::string("name").default.is_none());
        assert_eq!(Field::string("name").sql_type.to_string(), "varchar(50)");
        assert_eq!(Field::text("content").sql_type.to_string(), "text");
    }

    #[test]
    fn producer_runs_on_each_resolve() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let f = Field::string("id").default_with(move || Value::from(c.fetch_add(1, Ordering::SeqCst)));
        assert_eq!(f.default.resolve(), Some(Value::from(0)));
        assert_eq!(f.default.resolve(), Some(Value::from(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn next_id_shape() {
        let id = next_id();
        let s = id.as_str().unwrap();
        assert_eq!(s.len(), 50);
        assert!(s.ends_with("000"));
        assert!(s[..15].chars().all(|c| c.is_ascii_digit()));
        assert_ne!(next_id(), next_id());
    }

    #[test]
    fn now_ts_is_positive_float() {
        assert!(now_ts().as_f64().unwrap() > 1_600_000_000.0);
    }
}
