//! Builds the per-entity SQL templates and the dynamic find_all / find_number statements.
//! Identifiers come from registered schemas only; values always travel as `?` parameters.

use crate::error::OrmError;
use serde_json::Value;

/// Quote identifier for MySQL.
pub fn quoted(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Statements compiled once per entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlTemplates {
    pub select: String,
    /// `select` restricted to one primary key.
    pub find: String,
    /// `from <table>`, the tail of find_number statements.
    pub from: String,
    pub insert: String,
    pub update: String,
    pub delete: String,
}

impl SqlTemplates {
    /// Compile from table name, primary key and the non-key columns in declaration order.
    pub fn compile(table: &str, pk: &str, non_key: &[String]) -> Self {
        let table = quoted(table);
        let pk = quoted(pk);
        let cols: Vec<String> = non_key.iter().map(|c| quoted(c)).collect();

        let mut select_cols = Vec::with_capacity(cols.len() + 1);
        select_cols.push(pk.clone());
        select_cols.extend(cols.iter().cloned());
        let from = format!("from {}", table);
        let select = format!("select {} {}", select_cols.join(", "), from);
        let find = format!("{} where {}=?", select, pk);

        let mut insert_cols = cols.clone();
        insert_cols.push(pk.clone());
        let insert = format!(
            "insert into {} ({}) values ({})",
            table,
            insert_cols.join(", "),
            placeholders(insert_cols.len())
        );

        let sets: Vec<String> = cols.iter().map(|c| format!("{}=?", c)).collect();
        let update = format!("update {} set {} where {}=?", table, sets.join(", "), pk);

        let delete = format!("delete from {} where {}=?", table, pk);

        SqlTemplates {
            select,
            find,
            from,
            insert,
            update,
            delete,
        }
    }
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

/// `limit ?` or `limit ?, ?` (offset, count).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Range { offset: u64, count: u64 },
}

impl TryFrom<&Value> for Limit {
    type Error = OrmError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Number(n) => n
                .as_u64()
                .map(Limit::Count)
                .ok_or_else(|| OrmError::InvalidLimit(v.to_string())),
            Value::Array(items) if items.len() == 2 => match (items[0].as_u64(), items[1].as_u64()) {
                (Some(offset), Some(count)) => Ok(Limit::Range { offset, count }),
                _ => Err(OrmError::InvalidLimit(v.to_string())),
            },
            _ => Err(OrmError::InvalidLimit(v.to_string())),
        }
    }
}

impl From<Limit> for Value {
    fn from(l: Limit) -> Self {
        match l {
            Limit::Count(n) => Value::from(n),
            Limit::Range { offset, count } => Value::from(vec![offset, count]),
        }
    }
}

/// Options for find_all. `limit` is kept as a raw value and checked when the statement is built.
#[derive(Clone, Debug, Default)]
pub struct FindAll {
    pub where_: Option<String>,
    pub args: Vec<Value>,
    pub order_by: Option<String>,
    pub limit: Option<Value>,
}

impl FindAll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw `where` clause with `?` placeholders and its args.
    pub fn filter(mut self, where_: impl Into<String>, args: Vec<Value>) -> Self {
        self.where_ = Some(where_.into());
        self.args = args;
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// An integer count or a two-element `[offset, count]` array.
    pub fn limit(mut self, limit: impl Into<Value>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn limit_range(self, offset: u64, count: u64) -> Self {
        self.limit(Limit::Range { offset, count })
    }
}

/// Append optional `where`, `order by` and `limit` to a compiled select.
pub fn select_all(select: &str, opts: &FindAll) -> Result<QueryBuf, OrmError> {
    let mut sql = vec![select.to_string()];
    let mut params = opts.args.clone();
    if let Some(w) = opts.where_.as_deref().filter(|w| !w.is_empty()) {
        sql.push("where".into());
        sql.push(w.to_string());
    }
    if let Some(o) = opts.order_by.as_deref().filter(|o| !o.is_empty()) {
        sql.push("order by".into());
        sql.push(o.to_string());
    }
    if let Some(raw) = &opts.limit {
        sql.push("limit".into());
        match Limit::try_from(raw)? {
            Limit::Count(n) => {
                sql.push("?".into());
                params.push(Value::from(n));
            }
            Limit::Range { offset, count } => {
                sql.push("?, ?".into());
                params.push(Value::from(offset));
                params.push(Value::from(count));
            }
        }
    }
    Ok(QueryBuf {
        sql: sql.join(" "),
        params,
    })
}

/// `select <expr> as _num_ from <table> [where ...]`, given the compiled `from <table>`.
pub fn select_number(from: &str, select_expr: &str, where_: Option<&str>, args: &[Value]) -> QueryBuf {
    let mut sql = vec![format!("select {} as _num_ {}", select_expr, from)];
    if let Some(w) = where_.filter(|w| !w.is_empty()) {
        sql.push("where".into());
        sql.push(w.to_string());
    }
    QueryBuf {
        sql: sql.join(" "),
        params: args.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> SqlTemplates {
        SqlTemplates::compile("users", "id", &["email".into(), "passwd".into(), "admin".into()])
    }

    #[test]
    fn compiles_four_templates() {
        let t = users();
        assert_eq!(t.select, "select `id`, `email`, `passwd`, `admin` from `users`");
        assert_eq!(t.find, "select `id`, `email`, `passwd`, `admin` from `users` where `id`=?");
        assert_eq!(t.from, "from `users`");
        assert_eq!(
            t.insert,
            "insert into `users` (`email`, `passwd`, `admin`, `id`) values (?, ?, ?, ?)"
        );
        assert_eq!(t.update, "update `users` set `email`=?, `passwd`=?, `admin`=? where `id`=?");
        assert_eq!(t.delete, "delete from `users` where `id`=?");
    }

    #[test]
    fn insert_has_one_placeholder_per_column_with_pk_last() {
        for n in 0..5 {
            let cols: Vec<String> = (0..n).map(|i| format!("c{}", i)).collect();
            let t = SqlTemplates::compile("t", "pk", &cols);
            assert_eq!(t.insert.matches('?').count(), n + 1);
            assert!(t.insert.contains("`pk`) values"));
        }
    }

    #[test]
    fn limit_count_appends_one_placeholder() {
        let opts = FindAll::new().filter("`user_id`=?", vec![json!("u1")]).limit(5);
        let q = select_all("select `id` from `blogs`", &opts).unwrap();
        assert_eq!(q.sql, "select `id` from `blogs` where `user_id`=? limit ?");
        assert_eq!(q.params, vec![json!("u1"), json!(5)]);
    }

    #[test]
    fn limit_range_appends_offset_then_count() {
        let opts = FindAll::new().order_by("created_at desc").limit_range(10, 20);
        let q = select_all("select `id` from `blogs`", &opts).unwrap();
        assert_eq!(q.sql, "select `id` from `blogs` order by created_at desc limit ?, ?");
        assert_eq!(q.params, vec![json!(10), json!(20)]);
    }

    #[test]
    fn other_limit_shapes_fail() {
        for bad in [json!("x"), json!([1, 2, 3]), json!([1]), json!(-1), json!(1.5), json!({})] {
            let opts = FindAll::new().limit(bad);
            assert!(matches!(
                select_all("select 1", &opts),
                Err(OrmError::InvalidLimit(_))
            ));
        }
    }

    #[test]
    fn number_query_aliases_result() {
        let q = select_number("from `blogs`", "count(id)", Some("`user_id`=?"), &[json!("u1")]);
        assert_eq!(q.sql, "select count(id) as _num_ from `blogs` where `user_id`=?");
        assert_eq!(q.params.len(), 1);
        let q = select_number("from `blogs`", "count(id)", None, &[]);
        assert_eq!(q.sql, "select count(id) as _num_ from `blogs`");
    }
}
