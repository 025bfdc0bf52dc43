//! Process-wide MySQL connection pool with query/execute primitives.
//! Every call borrows one connection for its duration; the guard returns it on every exit path,
//! including errors and cancellation of the calling task.

use crate::config::DbConfig;
use crate::error::AppError;
use crate::sql::bind_all;
use futures::TryStreamExt;
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::{Connection, MySqlPool};

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Clone, Debug)]
pub struct Pool {
    inner: MySqlPool,
    /// Connection-level autocommit. When off, ORM writes run in explicit transactions.
    autocommit: bool,
}

impl Pool {
    /// Validate credentials and open the pool with `min_size` connections up front.
    pub async fn initialize(config: &DbConfig) -> Result<Self, AppError> {
        let creds = config.validate()?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = creds.database,
            min = config.min_size,
            max = config.max_size,
            "create database connection pool..."
        );
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(creds.user)
            .password(creds.password)
            .database(creds.database)
            .charset(&config.charset);
        let mut pool_options = MySqlPoolOptions::new()
            .min_connections(config.min_size)
            .max_connections(config.max_size);
        if !config.autocommit {
            pool_options = pool_options
                .after_connect(|conn, _meta| {
                    Box::pin(async move {
                        sqlx::query("SET autocommit = 0").execute(&mut *conn).await?;
                        Ok(())
                    })
                })
                // Uncommitted work never outlives the borrow that started it.
                .after_release(|conn, _meta| {
                    Box::pin(async move {
                        sqlx::query("ROLLBACK").execute(&mut *conn).await?;
                        Ok(true)
                    })
                });
        }
        let inner = pool_options.connect_with(options).await?;
        Ok(Pool {
            inner,
            autocommit: config.autocommit,
        })
    }

    /// Wrap an already-built sqlx pool. Its connections are assumed to autocommit.
    pub fn from_pool(inner: MySqlPool) -> Self {
        Pool {
            inner,
            autocommit: true,
        }
    }

    /// Record the connection-level autocommit setting of a wrapped pool.
    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    pub fn inner(&self) -> &MySqlPool {
        &self.inner
    }

    /// Run a select and return rows as column-name maps. With `limit`, stop after that many rows.
    pub async fn query(&self, sql: &str, args: &[Value], limit: Option<usize>) -> Result<Vec<Row>, sqlx::Error> {
        tracing::info!(sql = %sql, "SQL");
        let mut conn = self.inner.acquire().await?;
        let query = bind_all(sqlx::query(sql), args);
        let rows = match limit {
            Some(n) => {
                let mut out = Vec::with_capacity(n.min(64));
                let mut stream = query.fetch(&mut *conn);
                while out.len() < n {
                    match stream.try_next().await? {
                        Some(row) => out.push(row_to_map(&row)),
                        None => break,
                    }
                }
                out
            }
            None => query.fetch_all(&mut *conn).await?.iter().map(row_to_map).collect(),
        };
        tracing::info!(rows = rows.len(), "rows returned");
        Ok(rows)
    }

    /// Run an insert/update/delete and return the affected row count.
    /// With `autocommit == false` the statement runs in an explicit transaction that is committed on
    /// success and rolled back before the error is returned.
    pub async fn execute(&self, sql: &str, args: &[Value], autocommit: bool) -> Result<u64, sqlx::Error> {
        tracing::info!(sql = %sql, "SQL");
        let mut conn = self.inner.acquire().await?;
        if autocommit {
            let done = bind_all(sqlx::query(sql), args).execute(&mut *conn).await?;
            return Ok(done.rows_affected());
        }
        let mut tx = Connection::begin(&mut *conn).await?;
        match bind_all(sqlx::query(sql), args).execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(e) => {
                tracing::warn!(error = %e, "statement failed, rolling back");
                if let Err(rb) = tx.rollback().await {
                    tracing::error!(error = %rb, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Round-trip one connection.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.inner.acquire().await?;
        conn.ping().await
    }

    /// Close every connection. Later calls fail with `PoolClosed`.
    pub async fn close(&self) {
        tracing::info!("close database connection pool");
        self.inner.close().await;
    }
}

fn row_to_map(row: &MySqlRow) -> Row {
    use sqlx::{Column, Row as _, TypeInfo};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        let v = if col.type_info().name() == "BOOLEAN" {
            match row.try_get::<Option<bool>, _>(name) {
                Ok(Some(b)) => Value::Bool(b),
                _ => Value::Null,
            }
        } else {
            cell_to_value(row, name)
        };
        map.insert(name.to_string(), v);
    }
    map
}

fn cell_to_value(row: &MySqlRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(d)) = row.try_get::<Option<sqlx::types::Decimal>, _>(name) {
        return decimal_to_value(d);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

/// DECIMAL as a JSON number when it fits one, else its exact text.
fn decimal_to_value(d: sqlx::types::Decimal) -> Value {
    let text = d.normalize().to_string();
    match text.parse::<serde_json::Number>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(text),
    }
}
